//! OxiBV Core - Expression DAG for a Bit-Vector and Array Solver
//!
//! This crate is the expression layer of a bit-precise SMT solver:
//! - Hash-consed terms: syntactic equality is handle equality
//! - Reference-counted node lifetimes with iterative reclamation
//! - Per-child-slot parent lists for O(1) consumer traversal
//! - Local rewriting at construction time (level 0 disables it)
//! - A small primitive kernel; everything else is a derived encoding
//!
//! # Examples
//!
//! ## Creating Terms
//!
//! ```
//! use oxibv::ExprManager;
//!
//! let mut em = ExprManager::new();
//!
//! let bv8 = em.sorts.bitvec(8);
//! let x = em.mk_var(bv8, Some("x"));
//! let y = em.mk_var(bv8, Some("y"));
//!
//! // x + y, shared and canonicalized
//! let sum = em.mk_add(x, y);
//! let sum2 = em.mk_add(x, y);
//! assert_eq!(sum, sum2);
//!
//! // Negation is an edge attribute; no node is allocated.
//! let not_x = em.mk_not(x);
//! assert_eq!(em.mk_not(not_x), x);
//!
//! em.release(not_x);
//! em.release(sum2);
//! em.release(sum);
//! em.release(y);
//! em.release(x);
//! ```
//!
//! ## Arrays as Functions
//!
//! ```
//! use oxibv::ExprManager;
//!
//! let mut em = ExprManager::new();
//! let bv8 = em.sorts.bitvec(8);
//! let arr_sort = em.sorts.array(bv8, bv8);
//!
//! let a = em.mk_array(arr_sort, Some("a"));
//! let i = em.mk_var(bv8, Some("i"));
//! let v = em.mk_var(bv8, Some("v"));
//!
//! let stored = em.mk_write(a, i, v);
//! let read_back = em.mk_read(stored, i);
//!
//! em.release(read_back);
//! em.release(stored);
//! em.release(v);
//! em.release(i);
//! em.release(a);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bv;
pub mod mgr;
pub mod node;
pub mod options;
pub mod sort;

mod beta;
mod construct;
mod derived;
mod lambda;
mod rewrite;
mod unique;

pub use bv::BitVector;
pub use mgr::{ExprManager, Stats};
pub use node::{Edge, Node, NodeId, NodeKind};
pub use options::{OptionError, Options};
pub use sort::{SortId, SortStore};
