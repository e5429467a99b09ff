//! Property-based tests for the expression DAG
//!
//! This module tests fundamental properties of the hash-consed DAG:
//! - Structural uniqueness: equal shapes share one node
//! - Edge inversion: double negation is the identity
//! - Commutative canonicalization under the sort option
//! - Reference-count balance across copy/release sequences

use oxibv::{BitVector, ExprManager};
use proptest::prelude::*;

fn small_width_strategy() -> impl Strategy<Value = u32> {
    1u32..16
}

proptest! {
    /// Building the same constant twice yields the same handle.
    #[test]
    fn constant_uniqueness(value in any::<u64>(), width in small_width_strategy()) {
        let mut em = ExprManager::new();
        let bits = BitVector::from_u64(value, width);
        let c1 = em.mk_const(&bits);
        let c2 = em.mk_const(&bits);
        prop_assert_eq!(c1, c2);
        em.release(c1);
        em.release(c2);
        prop_assert_eq!(em.live_node_count(), 0);
    }

    /// The complement constant is the inverted handle of the original:
    /// one node serves both polarities.
    #[test]
    fn constant_complement_shares_node(value in any::<u64>(), width in small_width_strategy()) {
        let mut em = ExprManager::new();
        let bits = BitVector::from_u64(value, width);
        let c = em.mk_const(&bits);
        let complement = bits.bvnot();
        let not_c = em.mk_const(&complement);
        prop_assert_eq!(not_c, c.invert());
        prop_assert_eq!(em.live_node_count(), 1);
        em.release(c);
        em.release(not_c);
    }

    /// `not(not(h)) == h` at handle equality, and no node is allocated
    /// for either negation.
    #[test]
    fn double_negation(width in small_width_strategy()) {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        let x = em.mk_var(sort, None);
        let live = em.live_node_count();
        let not_x = em.mk_not(x);
        let not_not_x = em.mk_not(not_x);
        prop_assert_eq!(not_not_x, x);
        prop_assert_eq!(em.live_node_count(), live);
        em.release(not_x);
        em.release(not_not_x);
        em.release(x);
    }

    /// Commutative operators canonicalize operand order, so both
    /// argument orders return the same node.
    #[test]
    fn commutative_pointer_equality(width in small_width_strategy(), op in 0usize..3) {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        let x = em.mk_var(sort, None);
        let y = em.mk_var(sort, None);
        let (a, b) = match op {
            0 => (em.mk_and(x, y), em.mk_and(y, x)),
            1 => (em.mk_add(x, y), em.mk_add(y, x)),
            _ => (em.mk_mul(x, y), em.mk_mul(y, x)),
        };
        prop_assert_eq!(a, b);
        em.release(a);
        em.release(b);
        em.release(x);
        em.release(y);
        prop_assert_eq!(em.live_node_count(), 0);
    }

    /// Constant folding agrees with the value-level arithmetic.
    #[test]
    fn constant_folding_matches_bv(
        a in any::<u64>(),
        b in any::<u64>(),
        width in 1u32..8,
        op in 0usize..8,
    ) {
        let mut em = ExprManager::new();
        let bva = BitVector::from_u64(a, width);
        let bvb = BitVector::from_u64(b, width);
        let ca = em.mk_const(&bva);
        let cb = em.mk_const(&bvb);
        let (result, expected) = match op {
            0 => (em.mk_and(ca, cb), BitVector::from_biguint(bva.value() & bvb.value(), width)),
            1 => (em.mk_add(ca, cb), bva.bvadd(&bvb)),
            2 => (em.mk_mul(ca, cb), bva.bvmul(&bvb)),
            3 => (em.mk_udiv(ca, cb), bva.bvudiv(&bvb)),
            4 => (em.mk_urem(ca, cb), bva.bvurem(&bvb)),
            5 => (em.mk_sub(ca, cb), bva.bvadd(&bvb.bvneg())),
            6 => {
                let xor = BitVector::from_biguint(bva.value() ^ bvb.value(), width);
                (em.mk_xor(ca, cb), xor)
            }
            _ => {
                let or = BitVector::from_biguint(bva.value() | bvb.value(), width);
                (em.mk_or(ca, cb), or)
            }
        };
        prop_assert_eq!(em.const_value(result).cloned(), Some(expected));
        em.release(result);
        em.release(ca);
        em.release(cb);
        prop_assert_eq!(em.live_node_count(), 0);
    }

    /// A copy/release pair is a no-op on the reference count and on the
    /// unique-table population.
    #[test]
    fn copy_release_balance(width in small_width_strategy(), rounds in 1usize..64) {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        let x = em.mk_var(sort, None);
        let y = em.mk_var(sort, None);
        let node = em.mk_add(x, y);
        let refs_before = em.get(node).refs();
        let live_before = em.live_node_count();
        for _ in 0..rounds {
            let held = em.copy(node);
            em.release(held);
        }
        prop_assert_eq!(em.get(node).refs(), refs_before);
        prop_assert_eq!(em.live_node_count(), live_before);
        em.release(node);
        em.release(x);
        em.release(y);
    }

    /// Any sequence of same-width operations, fully released, drains the
    /// id table back to empty.
    #[test]
    fn release_drains_everything(
        width in small_width_strategy(),
        ops in prop::collection::vec(0usize..8, 1..24),
    ) {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        let x = em.mk_var(sort, None);
        let y = em.mk_var(sort, None);
        let mut acc = em.copy(x);
        for op in ops {
            let next = match op {
                0 => em.mk_and(acc, y),
                1 => em.mk_or(acc, y),
                2 => em.mk_xor(acc, y),
                3 => em.mk_add(acc, y),
                4 => em.mk_sub(acc, y),
                5 => em.mk_mul(acc, y),
                6 => em.mk_udiv(acc, y),
                _ => em.mk_urem(acc, y),
            };
            em.release(acc);
            acc = next;
        }
        em.release(acc);
        em.release(x);
        em.release(y);
        assert_eq!(em.live_node_count(), 0);
        assert_eq!(em.external_ref_count(), 0);
    }

    /// Structural sharing: two independently built copies of the same
    /// tree resolve to the same root node.
    #[test]
    fn independent_builds_share(width in small_width_strategy()) {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        let x = em.mk_var(sort, None);
        let y = em.mk_var(sort, None);

        let first = {
            let sum = em.mk_add(x, y);
            let out = em.mk_and(sum, x.invert());
            em.release(sum);
            out
        };
        let second = {
            let sum = em.mk_add(y, x);
            let out = em.mk_and(sum, x.invert());
            em.release(sum);
            out
        };
        prop_assert_eq!(first, second);
        em.release(first);
        em.release(second);
        em.release(x);
        em.release(y);
    }
}
