//! The Unique Table.
//!
//! Enforces structural singleton-ness: every constructor probes here
//! before allocating, so a term shape exists at most once per manager
//! (modulo the sign bit, which lives on edges). The table is an array of
//! singly linked chains threaded through the nodes themselves
//! (`next_unique`); the size is always a power of two and doubles when
//! the element count reaches it, up to a cap.

use crate::bv::BitVector;
use crate::mgr::ExprManager;
use crate::node::{Edge, NodeId, NodeKind};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

/// Fixed hashing primes, one per child slot.
const HASH_PRIMES: [u32; 3] = [333_444_569, 76_891_121, 456_790_003];

/// Growth stops once the chain array reaches `2^MAX_LOG2_SIZE`.
const MAX_LOG2_SIZE: u32 = 30;

const INITIAL_SIZE: usize = 16;

/// Chain heads of the unique table. Links are woven through the nodes.
#[derive(Debug)]
pub(crate) struct UniqueTable {
    pub(crate) chains: Vec<Option<NodeId>>,
    pub(crate) num_elements: usize,
}

impl UniqueTable {
    pub(crate) fn new() -> Self {
        Self {
            chains: vec![None; INITIAL_SIZE],
            num_elements: 0,
        }
    }

    fn mask(&self) -> u32 {
        (self.chains.len() - 1) as u32
    }

    fn is_full(&self) -> bool {
        self.num_elements >= self.chains.len()
    }

    fn log2_size(&self) -> u32 {
        self.chains.len().trailing_zeros()
    }
}

pub(crate) fn hash_slice(e0: Edge, upper: u32, lower: u32) -> u32 {
    HASH_PRIMES[0]
        .wrapping_mul(e0.node().get())
        .wrapping_add(HASH_PRIMES[1].wrapping_mul(upper))
        .wrapping_add(HASH_PRIMES[2].wrapping_mul(lower))
}

pub(crate) fn hash_children(e: &[Edge]) -> u32 {
    debug_assert!(e.len() <= HASH_PRIMES.len());
    let mut hash = 0u32;
    for (i, c) in e.iter().enumerate() {
        hash = hash.wrapping_add(HASH_PRIMES[i].wrapping_mul(c.node().get()));
    }
    hash
}

impl ExprManager {
    /// Keep commutative operands in ascending id order under the
    /// `sort-exp` option. A `(x, not x)` pair with the inversion on the
    /// right is already canonical.
    pub(crate) fn sort_commutative(&self, kind: NodeKind, e: &mut [Edge]) {
        if !self.options.sort_exp || !kind.is_binary_commutative() {
            return;
        }
        debug_assert_eq!(e.len(), 2);
        if e[0] == e[1] {
            return;
        }
        if e[0].invert() == e[1] && e[1].is_inverted() {
            return;
        }
        if e[0].node().get() > e[1].node().get() {
            e.swap(0, 1);
        }
    }

    /// Structural hash of an installed node, for removal and rehashing.
    /// Lambda hashes are the cached alpha-invariant hashes: recomputing
    /// them later could disagree, since they depend on reachable
    /// parameterized terms.
    fn compute_node_hash(&self, id: NodeId) -> u32 {
        let n = self.node(id);
        match n.kind {
            NodeKind::BvConst => n.const_bits().uhash(),
            NodeKind::Lambda => *self.lambdas.get(&id).expect("lambda without a cached hash"),
            NodeKind::Slice => hash_slice(n.child(0), n.slice_upper(), n.slice_lower()),
            _ => {
                let children: SmallVec<[Edge; 3]> = n.children().collect();
                hash_children(&children)
            }
        }
    }

    fn chain_head(&self, hash: u32) -> Option<NodeId> {
        self.unique.chains[(hash & self.unique.mask()) as usize]
    }

    /// Probe for a constant with exactly these (complement-normalized)
    /// bits.
    pub(crate) fn unique_find_const(&self, bits: &BitVector) -> Option<NodeId> {
        let mut cur = self.chain_head(bits.uhash());
        while let Some(id) = cur {
            let n = self.node(id);
            if n.kind == NodeKind::BvConst && n.const_bits() == bits {
                return Some(id);
            }
            cur = n.next_unique;
        }
        None
    }

    /// Probe for a slice of `e0` with the given bounds.
    pub(crate) fn unique_find_slice(&self, e0: Edge, upper: u32, lower: u32) -> Option<NodeId> {
        let mut cur = self.chain_head(hash_slice(e0, upper, lower));
        while let Some(id) = cur {
            let n = self.node(id);
            if n.kind == NodeKind::Slice
                && n.child(0) == e0
                && n.slice_upper() == upper
                && n.slice_lower() == lower
            {
                return Some(id);
            }
            cur = n.next_unique;
        }
        None
    }

    /// Probe for a binary/ternary node. Children must already be in
    /// canonical (sorted) order. A bit-vector equality also matches its
    /// double-inverted form: `(= (not a) (not b))` is `(= a b)`.
    pub(crate) fn unique_find_children(&self, kind: NodeKind, e: &[Edge]) -> Option<NodeId> {
        debug_assert!(kind != NodeKind::Slice && kind != NodeKind::BvConst);
        let mut cur = self.chain_head(hash_children(e));
        while let Some(id) = cur {
            let n = self.node(id);
            if n.kind == kind && n.arity() == e.len() {
                if kind == NodeKind::BvEq
                    && n.child(0) == e[0].invert()
                    && n.child(1) == e[1].invert()
                {
                    return Some(id);
                }
                if (0..e.len()).all(|i| n.child(i) == e[i]) {
                    return Some(id);
                }
            }
            cur = n.next_unique;
        }
        None
    }

    /// Probe for a lambda binding `param` over `body`. Returns the
    /// alpha-invariant hash alongside the result so creation can cache
    /// it. When `collect` is given, parameters other than `param` that
    /// occur free in `body` are gathered into it. When `deep_compare` is
    /// set, alpha-equivalent lambdas match, not just identical ones.
    pub(crate) fn unique_find_lambda(
        &self,
        param: NodeId,
        body: Edge,
        collect: Option<&mut FxHashSet<NodeId>>,
        deep_compare: bool,
    ) -> (u32, Option<NodeId>) {
        let hash = self.hash_lambda(param, body, collect);
        let mut cur = self.chain_head(hash);
        while let Some(id) = cur {
            let n = self.node(id);
            if n.kind == NodeKind::Lambda {
                let exact = n.child(0) == Edge::regular(param) && n.child(1) == body;
                if exact
                    || (!n.parameterized
                        && deep_compare
                        && self.compare_lambda(param, body, id))
                {
                    return (hash, Some(id));
                }
            }
            cur = n.next_unique;
        }
        (hash, None)
    }

    /// Install a freshly allocated node, growing the table first when the
    /// load factor has reached one.
    pub(crate) fn unique_insert(&mut self, id: NodeId) {
        debug_assert!(!self.node(id).unique);
        if self.unique.is_full() && self.unique.log2_size() < MAX_LOG2_SIZE {
            self.unique_grow();
        }
        let slot = (self.compute_node_hash(id) & self.unique.mask()) as usize;
        let head = self.unique.chains[slot];
        let n = self.node_mut(id);
        n.next_unique = head;
        n.unique = true;
        self.unique.chains[slot] = Some(id);
        self.unique.num_elements += 1;
    }

    /// Unlink a node from its chain; no-op if it is not installed.
    pub(crate) fn unique_remove(&mut self, id: NodeId) {
        if !self.node(id).unique {
            return;
        }
        debug_assert!(self.unique.num_elements > 0);
        let slot = (self.compute_node_hash(id) & self.unique.mask()) as usize;
        let mut prev: Option<NodeId> = None;
        let mut cur = self.unique.chains[slot];
        while cur != Some(id) {
            let link = cur.expect("node missing from its unique chain");
            prev = cur;
            cur = self.node(link).next_unique;
        }
        let next = self.node(id).next_unique;
        match prev {
            None => self.unique.chains[slot] = next,
            Some(prev) => self.node_mut(prev).next_unique = next,
        }
        self.unique.num_elements -= 1;
        let n = self.node_mut(id);
        n.unique = false;
        n.next_unique = None;
    }

    /// Double the chain array and redistribute every installed node by a
    /// freshly computed hash.
    fn unique_grow(&mut self) {
        let new_size = self.unique.chains.len() * 2;
        debug!(new_size, "growing unique table");
        let old_chains = std::mem::replace(&mut self.unique.chains, vec![None; new_size]);
        let mask = (new_size - 1) as u32;
        for head in old_chains {
            let mut cur = head;
            while let Some(id) = cur {
                let next = self.node(id).next_unique;
                let slot = (self.compute_node_hash(id) & mask) as usize;
                let new_head = self.unique.chains[slot];
                self.node_mut(id).next_unique = new_head;
                self.unique.chains[slot] = Some(id);
                cur = next;
            }
        }
    }
}
