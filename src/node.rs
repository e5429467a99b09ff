//! Node Records, Handles and Parent References.
//!
//! A term handle is an [`Edge`]: a node id with an inversion bit packed
//! into the low bit, so that bitwise NOT costs nothing and double negation
//! is the identity. The node record itself carries the DAG structure:
//! child edges, the per-slot parent list links, reference counts, state
//! flags and a kind-specific payload.

use crate::bv::BitVector;
use crate::sort::SortId;
use rustc_hash::FxHashMap;
use std::fmt;
use std::num::NonZeroU32;

/// Largest node id; ids are packed into edges with one bit to spare.
pub(crate) const MAX_NODE_ID: u32 = u32::MAX >> 1;

/// Identifier of a node in the id table. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    pub(crate) fn new(raw: u32) -> Self {
        assert!(raw <= MAX_NODE_ID, "expression id overflow");
        Self(NonZeroU32::new(raw).expect("node id must be positive"))
    }

    /// The raw positive id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    pub(crate) fn index(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A term handle: a node reference with an inversion bit.
///
/// The inversion bit flips the semantic value at this edge. Canonical
/// nodes are stored uninverted; negation lives on edges only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge(NonZeroU32);

impl Edge {
    /// The uninverted edge to `node`.
    #[must_use]
    pub fn regular(node: NodeId) -> Self {
        Self(NonZeroU32::new(node.get() << 1).expect("node id must be positive"))
    }

    /// The node this edge points at, inversion stripped.
    #[must_use]
    pub fn node(self) -> NodeId {
        NodeId::new(self.0.get() >> 1)
    }

    /// Is the inversion bit set on this edge?
    #[must_use]
    pub const fn is_inverted(self) -> bool {
        (self.0.get() & 1) != 0
    }

    /// This edge with the inversion bit flipped.
    #[must_use]
    pub const fn invert(self) -> Self {
        // XOR of the low bit keeps the value nonzero (id >= 1).
        Self(match NonZeroU32::new(self.0.get() ^ 1) {
            Some(raw) => raw,
            None => unreachable!(),
        })
    }

    /// This edge with the inversion bit cleared.
    #[must_use]
    pub fn strip(self) -> Self {
        Self::regular(self.node())
    }

    /// Apply this edge's inversion to `other`.
    #[must_use]
    pub const fn cond_invert(self, other: Edge) -> Edge {
        if self.is_inverted() {
            other.invert()
        } else {
            other
        }
    }

    /// Signed id: negative when inverted. Feeds structural hashing.
    #[must_use]
    pub fn signed_id(self) -> i64 {
        let id = i64::from(self.node().get());
        if self.is_inverted() {
            -id
        } else {
            id
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inverted() {
            write!(f, "-{}", self.node())
        } else {
            write!(f, "{}", self.node())
        }
    }
}

/// A tagged entry in a child's parent list: the consuming node together
/// with the child slot it consumes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentRef {
    /// The consuming node.
    pub parent: NodeId,
    /// Which of the parent's child slots points at the child (0..=2).
    pub slot: u8,
}

impl ParentRef {
    pub(crate) fn new(parent: NodeId, slot: usize) -> Self {
        debug_assert!(slot <= 2);
        Self {
            parent,
            slot: slot as u8,
        }
    }
}

/// Operator tag of a node.
///
/// The primitive kernel is exactly this list; every other operator of the
/// public surface is a derived encoding over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    /// Freed slot in the id table.
    Invalid,
    /// Bit-vector constant.
    BvConst,
    /// Bit-vector variable.
    BvVar,
    /// Lambda-bound parameter.
    Param,
    /// Bit range extraction.
    Slice,
    /// Bitwise conjunction.
    And,
    /// Bit-vector equality.
    BvEq,
    /// Function equality.
    FunEq,
    /// Addition.
    Add,
    /// Multiplication.
    Mul,
    /// Unsigned less-than.
    Ult,
    /// Logical shift left.
    Sll,
    /// Logical shift right.
    Srl,
    /// Unsigned division.
    Udiv,
    /// Unsigned remainder.
    Urem,
    /// Concatenation.
    Concat,
    /// Function application.
    Apply,
    /// Binder.
    Lambda,
    /// If-then-else.
    Cond,
    /// Argument tuple.
    Args,
    /// Uninterpreted function.
    Uf,
    /// Functional array update.
    Update,
    /// Forwarder to a rewritten replacement.
    Proxy,
}

/// Number of node kinds, for per-kind statistics.
pub(crate) const NUM_KINDS: usize = NodeKind::Proxy as usize + 1;

impl NodeKind {
    /// Commutative binary kinds whose operands are kept sorted under the
    /// `sort-exp` option.
    #[must_use]
    pub const fn is_binary_commutative(self) -> bool {
        matches!(
            self,
            NodeKind::And | NodeKind::BvEq | NodeKind::FunEq | NodeKind::Add | NodeKind::Mul
        )
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Default)]
pub(crate) enum Payload {
    /// No extra data.
    #[default]
    None,
    /// Constant bits plus their cached complement.
    Const {
        bits: BitVector,
        inv_bits: BitVector,
    },
    /// Slice bounds, both inclusive.
    Slice { upper: u32, lower: u32 },
    /// Lambda body (the innermost body for curried chains) and the
    /// static-rho cache seeded by array-write encodings. Both sides of a
    /// rho pair hold a reference.
    Lambda {
        body: Edge,
        static_rho: Option<FxHashMap<NodeId, Edge>>,
    },
    /// Parameter back-pointer to its binding lambda and the argument
    /// currently assigned during beta reduction.
    Param {
        binder: Option<NodeId>,
        assigned: Option<Edge>,
    },
}

/// A node of the expression DAG.
///
/// Nodes are created by constructors and mutated only through reference
/// count changes, parent-list splicing, the one-shot `simplified` link,
/// and conversion to a proxy.
#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) sort: SortId,
    pub(crate) arity: u8,
    pub(crate) refs: u32,
    pub(crate) ext_refs: u32,
    pub(crate) parents: u32,
    pub(crate) unique: bool,
    pub(crate) erased: bool,
    pub(crate) disconnected: bool,
    pub(crate) parameterized: bool,
    pub(crate) lambda_below: bool,
    pub(crate) apply_below: bool,
    pub(crate) is_array: bool,
    pub(crate) e: [Option<Edge>; 3],
    pub(crate) prev_parent: [Option<ParentRef>; 3],
    pub(crate) next_parent: [Option<ParentRef>; 3],
    pub(crate) first_parent: Option<ParentRef>,
    pub(crate) last_parent: Option<ParentRef>,
    pub(crate) next_unique: Option<NodeId>,
    pub(crate) simplified: Option<Edge>,
    pub(crate) payload: Payload,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, sort: SortId, arity: usize) -> Self {
        debug_assert!(arity <= 3);
        Self {
            id,
            kind,
            sort,
            arity: arity as u8,
            refs: 1,
            ext_refs: 0,
            parents: 0,
            unique: false,
            erased: false,
            disconnected: false,
            parameterized: false,
            lambda_below: false,
            apply_below: false,
            is_array: false,
            e: [None; 3],
            prev_parent: [None; 3],
            next_parent: [None; 3],
            first_parent: None,
            last_parent: None,
            next_unique: None,
            simplified: None,
            payload: Payload::None,
        }
    }

    /// The node's id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The node's sort.
    #[must_use]
    pub fn sort(&self) -> SortId {
        self.sort
    }

    /// Number of child slots in use.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity as usize
    }

    /// Child edge in slot `i`.
    #[must_use]
    pub fn child(&self, i: usize) -> Edge {
        self.e[i].expect("child slot is empty")
    }

    /// Iterator over the populated child slots.
    pub fn children(&self) -> impl Iterator<Item = Edge> + '_ {
        self.e[..self.arity()].iter().map(|c| c.expect("child slot is empty"))
    }

    /// Internal reference count.
    #[must_use]
    pub fn refs(&self) -> u32 {
        self.refs
    }

    /// External (client-facing) reference count.
    #[must_use]
    pub fn ext_refs(&self) -> u32 {
        self.ext_refs
    }

    /// Number of live parents consuming this node.
    #[must_use]
    pub fn parent_count(&self) -> u32 {
        self.parents
    }

    /// Is this node currently registered in the unique table?
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Does a bound parameter occur free below this node?
    #[must_use]
    pub fn is_parameterized(&self) -> bool {
        self.parameterized
    }

    /// Does a lambda occur at or below this node?
    #[must_use]
    pub fn lambda_below(&self) -> bool {
        self.lambda_below
    }

    /// Does an apply occur at or below this node?
    #[must_use]
    pub fn apply_below(&self) -> bool {
        self.apply_below
    }

    /// Is this node array-typed (an array variable, write or conditional)?
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// The forward link to this node's canonical replacement, if set.
    #[must_use]
    pub fn simplified(&self) -> Option<Edge> {
        self.simplified
    }

    /// Is this a function-sorted node (lambda or uninterpreted function)?
    #[must_use]
    pub fn is_fun(&self) -> bool {
        matches!(self.kind, NodeKind::Lambda | NodeKind::Uf)
    }

    /// Constant payload bits.
    #[must_use]
    pub fn const_bits(&self) -> &BitVector {
        match &self.payload {
            Payload::Const { bits, .. } => bits,
            _ => panic!("constant bits of a non-constant node"),
        }
    }

    /// Cached complement of the constant payload bits.
    #[must_use]
    pub fn const_inv_bits(&self) -> &BitVector {
        match &self.payload {
            Payload::Const { inv_bits, .. } => inv_bits,
            _ => panic!("constant bits of a non-constant node"),
        }
    }

    /// Upper slice bound (inclusive).
    #[must_use]
    pub fn slice_upper(&self) -> u32 {
        match self.payload {
            Payload::Slice { upper, .. } => upper,
            _ => panic!("slice bound of a non-slice node"),
        }
    }

    /// Lower slice bound (inclusive).
    #[must_use]
    pub fn slice_lower(&self) -> u32 {
        match self.payload {
            Payload::Slice { lower, .. } => lower,
            _ => panic!("slice bound of a non-slice node"),
        }
    }

    /// Body of a lambda; for curried chains, the innermost body.
    #[must_use]
    pub fn lambda_body(&self) -> Edge {
        match self.payload {
            Payload::Lambda { body, .. } => body,
            _ => panic!("body of a non-lambda node"),
        }
    }

    /// The static-rho cache of a lambda: known `args -> value` pairs.
    #[must_use]
    pub fn static_rho(&self) -> Option<&FxHashMap<NodeId, Edge>> {
        match &self.payload {
            Payload::Lambda { static_rho, .. } => static_rho.as_ref(),
            _ => panic!("static rho of a non-lambda node"),
        }
    }

    /// The lambda binding this parameter, if any.
    #[must_use]
    pub fn param_binder(&self) -> Option<NodeId> {
        match self.payload {
            Payload::Param { binder, .. } => binder,
            _ => panic!("binder of a non-parameter node"),
        }
    }

    /// The argument currently assigned to this parameter.
    #[must_use]
    pub fn param_assigned(&self) -> Option<Edge> {
        match self.payload {
            Payload::Param { assigned, .. } => assigned,
            _ => panic!("assignment of a non-parameter node"),
        }
    }
}
