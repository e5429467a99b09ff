//! The Expression Manager.
//!
//! One [`ExprManager`] owns everything belonging to a solver context: the
//! id table, the unique table, the kind-specific side maps, symbols and
//! options. All DAG mutation is funneled through the constructor/release
//! pair so that the structural invariants hold at every public entry.
//!
//! A manager is single-threaded; distinct managers are fully independent.

use crate::bv::BitVector;
use crate::node::{Edge, Node, NodeId, NodeKind, ParentRef, Payload, NUM_KINDS};
use crate::options::Options;
use crate::sort::SortStore;
use crate::unique::UniqueTable;
use lasso::{Rodeo, Spur};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Node creation and per-kind population statistics.
#[derive(Debug, Clone)]
pub struct Stats {
    /// Total nodes ever created in this manager.
    pub expressions: u64,
    ops_cur: [u32; NUM_KINDS],
    ops_max: [u32; NUM_KINDS],
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            expressions: 0,
            ops_cur: [0; NUM_KINDS],
            ops_max: [0; NUM_KINDS],
        }
    }
}

impl Stats {
    /// Nodes of the given kind currently alive.
    #[must_use]
    pub fn live(&self, kind: NodeKind) -> u32 {
        self.ops_cur[kind as usize]
    }

    /// High-water mark of nodes of the given kind.
    #[must_use]
    pub fn peak(&self, kind: NodeKind) -> u32 {
        self.ops_max[kind as usize]
    }
}

/// The expression DAG and all of its bookkeeping.
pub struct ExprManager {
    /// Sort interner. Public like the options: sorts are made through it.
    pub sorts: SortStore,
    /// Options read by the core (sorting, rewrite level, store encoding).
    pub options: Options,
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) unique: UniqueTable,
    pub(crate) bv_vars: FxHashSet<NodeId>,
    pub(crate) ufs: FxHashSet<NodeId>,
    pub(crate) feqs: FxHashSet<NodeId>,
    /// Lambda node to its cached alpha-invariant structural hash.
    pub(crate) lambdas: FxHashMap<NodeId, u32>,
    /// Function-body nodes to the parameters occurring free below them.
    pub(crate) parameterized: FxHashMap<NodeId, FxHashSet<NodeId>>,
    pub(crate) input_ids: FxHashMap<NodeId, i32>,
    symbols: Rodeo,
    symbol_to_node: FxHashMap<Spur, NodeId>,
    node_to_symbol: FxHashMap<NodeId, Spur>,
    external_refs: u64,
    stats: Stats,
}

impl Default for ExprManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprManager {
    /// Create an empty manager with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sorts: SortStore::new(),
            options: Options::default(),
            nodes: vec![None],
            unique: UniqueTable::new(),
            bv_vars: FxHashSet::default(),
            ufs: FxHashSet::default(),
            feqs: FxHashSet::default(),
            lambdas: FxHashMap::default(),
            parameterized: FxHashMap::default(),
            input_ids: FxHashMap::default(),
            symbols: Rodeo::default(),
            symbol_to_node: FxHashMap::default(),
            node_to_symbol: FxHashMap::default(),
            external_refs: 0,
            stats: Stats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------

    /// The node record for an id. Panics on a freed or invalid id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.index()].as_ref().expect("stale node id")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.index()].as_mut().expect("stale node id")
    }

    /// The node a handle points at, inversion stripped.
    #[must_use]
    pub fn get(&self, e: Edge) -> &Node {
        self.node(e.node())
    }

    /// The node with the given raw id, if it is still alive.
    #[must_use]
    pub fn node_by_id(&self, id: u32) -> Option<&Node> {
        self.nodes.get(id as usize)?.as_ref()
    }

    /// Bit width of a handle; for function-sorted handles, the codomain
    /// width.
    #[must_use]
    pub fn width(&self, e: Edge) -> u32 {
        let sort = self.get(e).sort;
        if self.sorts.is_fun(sort) {
            self.sorts.width(self.sorts.fun_codomain(sort))
        } else {
            self.sorts.width(sort)
        }
    }

    /// Constant value at this edge: the node's bits, complemented when the
    /// edge is inverted. `None` for non-constant handles.
    #[must_use]
    pub fn const_value(&self, e: Edge) -> Option<&BitVector> {
        let n = self.get(e);
        if n.kind != NodeKind::BvConst {
            return None;
        }
        Some(if e.is_inverted() {
            n.const_inv_bits()
        } else {
            n.const_bits()
        })
    }

    /// Number of live nodes in the id table.
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Sum of all external references handed across the client boundary.
    #[must_use]
    pub fn external_ref_count(&self) -> u64 {
        self.external_refs
    }

    /// Creation and per-kind population statistics.
    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    pub(crate) fn add_node(
        &mut self,
        kind: NodeKind,
        sort: crate::sort::SortId,
        arity: usize,
    ) -> NodeId {
        let id = NodeId::new(u32::try_from(self.nodes.len()).expect("expression id overflow"));
        let mut node = Node::new(id, kind, sort, arity);
        if kind == NodeKind::Apply {
            node.apply_below = true;
        }
        self.nodes.push(Some(node));
        self.stats.expressions += 1;
        self.count_kind(kind, 1);
        trace!(id = id.get(), ?kind, "new node");
        id
    }

    fn count_kind(&mut self, kind: NodeKind, delta: i32) {
        if kind == NodeKind::Invalid {
            return;
        }
        let slot = &mut self.stats.ops_cur[kind as usize];
        *slot = slot.checked_add_signed(delta).expect("operator count underflow");
        if *slot > self.stats.ops_max[kind as usize] {
            self.stats.ops_max[kind as usize] = *slot;
        }
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        let old = self.node(id).kind;
        self.count_kind(old, -1);
        self.count_kind(kind, 1);
        self.node_mut(id).kind = kind;
    }

    // ------------------------------------------------------------------
    // Reference counting
    // ------------------------------------------------------------------

    pub(crate) fn inc_ref_node(&mut self, id: NodeId) {
        let n = self.node_mut(id);
        n.refs = n.refs.checked_add(1).expect("node reference counter overflow");
    }

    /// Take an additional reference on a handle.
    pub fn copy(&mut self, e: Edge) -> Edge {
        self.inc_ref_node(e.node());
        e
    }

    /// Record a reference handed across the client boundary.
    pub fn inc_ext_ref(&mut self, e: Edge) {
        let n = self.node_mut(e.node());
        n.ext_refs = n
            .ext_refs
            .checked_add(1)
            .expect("node reference counter overflow");
        self.external_refs += 1;
    }

    /// Drop the record of a client-boundary reference.
    pub fn dec_ext_ref(&mut self, e: Edge) {
        let n = self.node_mut(e.node());
        assert!(n.ext_refs > 0, "external reference counter underflow");
        n.ext_refs -= 1;
        self.external_refs -= 1;
    }

    /// Drop a reference; reclaims the node (and, cascading, its children)
    /// when the last one goes.
    pub fn release(&mut self, e: Edge) {
        let id = e.node();
        let refs = self.node(id).refs;
        assert!(refs > 0, "released a dead handle");
        if refs > 1 {
            self.node_mut(id).refs = refs - 1;
        } else {
            self.recursively_release(id);
        }
    }

    /// Iterative releaser: an explicit worklist instead of call-stack
    /// recursion, so arbitrarily deep DAGs cannot overflow the stack.
    fn recursively_release(&mut self, root: NodeId) {
        let mut worklist: Vec<Edge> = Vec::new();
        self.reclaim_node(root, &mut worklist);
        while let Some(cur) = worklist.pop() {
            let id = cur.node();
            let refs = self.node(id).refs;
            if refs > 1 {
                self.node_mut(id).refs = refs - 1;
            } else {
                self.reclaim_node(id, &mut worklist);
            }
        }
    }

    /// Tear one node down. Children, the simplified successor and the
    /// static-rho contents are pushed onto the worklist; each push stands
    /// for one reference to drop.
    fn reclaim_node(&mut self, id: NodeId, worklist: &mut Vec<Edge>) {
        debug_assert_eq!(self.node(id).refs, 1);
        debug_assert_eq!(self.node(id).parents, 0);
        debug_assert!(self.node(id).ext_refs <= 1);

        let arity = self.node(id).arity();
        for i in (0..arity).rev() {
            worklist.push(self.node(id).child(i));
        }
        if let Some(simplified) = self.node_mut(id).simplified.take() {
            worklist.push(simplified);
        }

        self.unique_remove(id);
        self.erase_local_data(id, worklist);
        self.remove_from_side_maps(id, false);
        self.disconnect_children(id);
        self.deallocate(id);
    }

    /// Free a node's local payload. References held by the payload are
    /// pushed into `sink` for the caller to drop.
    pub(crate) fn erase_local_data(&mut self, id: NodeId, sink: &mut Vec<Edge>) {
        let n = self.node_mut(id);
        debug_assert!(!n.unique && !n.erased && !n.disconnected);
        let payload = std::mem::take(&mut n.payload);
        if let Payload::Lambda {
            static_rho: Some(rho),
            ..
        } = payload
        {
            for (args, value) in rho {
                sink.push(Edge::regular(args));
                sink.push(value);
            }
        }
        self.node_mut(id).erased = true;
    }

    pub(crate) fn remove_from_side_maps(&mut self, id: NodeId, keep_symbol: bool) {
        match self.node(id).kind {
            NodeKind::BvVar => {
                self.bv_vars.remove(&id);
            }
            NodeKind::Lambda => {
                self.lambdas.remove(&id);
            }
            NodeKind::Uf => {
                self.ufs.remove(&id);
            }
            NodeKind::FunEq => {
                self.feqs.remove(&id);
            }
            _ => {}
        }
        if !keep_symbol {
            if let Some(spur) = self.node_to_symbol.remove(&id) {
                self.symbol_to_node.remove(&spur);
            }
        }
        self.parameterized.remove(&id);
        self.input_ids.remove(&id);
    }

    fn deallocate(&mut self, id: NodeId) {
        let n = self.node(id);
        debug_assert!(!n.unique && n.erased && n.disconnected);
        self.set_kind(id, NodeKind::Invalid);
        self.nodes[id.index()] = None;
    }

    // ------------------------------------------------------------------
    // Parent lists
    // ------------------------------------------------------------------

    /// Connect `child` into `parent`'s slot `pos`, propagate the derived
    /// flags and splice the parent into the child's parent list. Apply
    /// parents are appended so traversals see a function before its
    /// arguments; everything else is prepended.
    pub(crate) fn connect_child(&mut self, parent: NodeId, child: Edge, pos: usize) {
        debug_assert!(pos <= 2);
        debug_assert!(self.get(child).simplified.is_none());

        let child_id = child.node();
        let (c_param, c_array, c_lambda_below, c_apply_below) = {
            let c = self.node(child_id);
            (c.parameterized, c.is_array, c.lambda_below, c.apply_below)
        };

        {
            let p = self.node_mut(parent);
            if p.kind != NodeKind::Lambda && c_param {
                p.parameterized = true;
            }
            if c_lambda_below {
                p.lambda_below = true;
            }
            if c_apply_below {
                p.apply_below = true;
            }
        }
        let parent_is_fun_cond = {
            let p = self.node(parent);
            p.kind == NodeKind::Cond && self.sorts.is_fun(p.sort)
        };
        if parent_is_fun_cond && c_array {
            self.node_mut(parent).is_array = true;
        }

        self.node_mut(child_id).parents += 1;
        self.inc_ref_node(child_id);

        let insert_beginning = self.node(parent).kind != NodeKind::Apply;
        self.node_mut(parent).e[pos] = Some(child);
        let tagged = ParentRef::new(parent, pos);
        debug_assert!(self.node(parent).prev_parent[pos].is_none());
        debug_assert!(self.node(parent).next_parent[pos].is_none());

        let (first, last) = {
            let c = self.node(child_id);
            (c.first_parent, c.last_parent)
        };
        match (first, insert_beginning) {
            (None, _) => {
                debug_assert!(last.is_none());
                let c = self.node_mut(child_id);
                c.first_parent = Some(tagged);
                c.last_parent = Some(tagged);
            }
            (Some(head), true) => {
                self.node_mut(parent).next_parent[pos] = Some(head);
                self.node_mut(head.parent).prev_parent[head.slot as usize] = Some(tagged);
                self.node_mut(child_id).first_parent = Some(tagged);
            }
            (Some(_), false) => {
                let tail = last.expect("parent list has a head but no tail");
                self.node_mut(parent).prev_parent[pos] = Some(tail);
                self.node_mut(tail.parent).next_parent[tail.slot as usize] = Some(tagged);
                self.node_mut(child_id).last_parent = Some(tagged);
            }
        }
    }

    /// Splice `parent` out of the parent list of the child in slot `pos`
    /// and clear the slot. Handles the empty, head, tail and interior
    /// cases.
    fn disconnect_child(&mut self, parent: NodeId, pos: usize) {
        let parent_kind = self.node(parent).kind;
        let child = self.node(parent).e[pos].expect("disconnecting an empty child slot");
        let child_id = child.node();
        let tagged = ParentRef::new(parent, pos);

        // A parameter losing its binding lambda goes back to unbound,
        // unless a rebuild has already rebound it elsewhere.
        if parent_kind == NodeKind::Lambda && pos == 0 {
            let c = self.node_mut(child_id);
            if let Payload::Param { binder, .. } = &mut c.payload {
                if *binder == Some(parent) {
                    *binder = None;
                }
            }
        }

        self.node_mut(child_id).parents -= 1;
        let (first, last) = {
            let c = self.node(child_id);
            (c.first_parent, c.last_parent)
        };
        debug_assert!(first.is_some() && last.is_some());

        if first == Some(tagged) && last == Some(tagged) {
            let c = self.node_mut(child_id);
            c.first_parent = None;
            c.last_parent = None;
        } else if first == Some(tagged) {
            let next = self.node(parent).next_parent[pos].expect("head without successor");
            self.node_mut(next.parent).prev_parent[next.slot as usize] = None;
            self.node_mut(child_id).first_parent = Some(next);
        } else if last == Some(tagged) {
            let prev = self.node(parent).prev_parent[pos].expect("tail without predecessor");
            self.node_mut(prev.parent).next_parent[prev.slot as usize] = None;
            self.node_mut(child_id).last_parent = Some(prev);
        } else {
            let next = self.node(parent).next_parent[pos].expect("interior without successor");
            let prev = self.node(parent).prev_parent[pos].expect("interior without predecessor");
            self.node_mut(next.parent).prev_parent[next.slot as usize] = Some(prev);
            self.node_mut(prev.parent).next_parent[prev.slot as usize] = Some(next);
        }
        let p = self.node_mut(parent);
        p.next_parent[pos] = None;
        p.prev_parent[pos] = None;
        p.e[pos] = None;
    }

    pub(crate) fn disconnect_children(&mut self, id: NodeId) {
        debug_assert!(!self.node(id).unique);
        debug_assert!(self.node(id).erased);
        debug_assert!(!self.node(id).disconnected);
        for i in 0..self.node(id).arity() {
            self.disconnect_child(id, i);
        }
        self.node_mut(id).disconnected = true;
    }

    /// Iterate the consumers of a node: every (parent, slot) pair whose
    /// child slot points at it.
    #[must_use]
    pub fn parents_of(&self, id: NodeId) -> ParentIter<'_> {
        ParentIter {
            mgr: self,
            cur: self.node(id).first_parent,
        }
    }

    // ------------------------------------------------------------------
    // Simplified chain and proxy conversion
    // ------------------------------------------------------------------

    /// Chase a handle to its canonical representative, compressing the
    /// forward chain on the way.
    pub fn simplify(&mut self, e: Edge) -> Edge {
        let real = e.node();
        let Some(direct) = self.node(real).simplified else {
            return e;
        };
        if self.node(direct.node()).simplified.is_some() {
            self.pointer_chase(real);
        }
        let direct = self.node(real).simplified.expect("chain lost its head");
        e.cond_invert(direct)
    }

    /// Path compression over the simplified chain. Every node on the path
    /// is retargeted to the final representative; reference counts follow
    /// the links.
    fn pointer_chase(&mut self, start: NodeId) {
        // Find the final representative relative to `start`.
        let mut invert = false;
        let mut cur = self.node(start).simplified.expect("chase without a chain");
        while self.node(cur.node()).simplified.is_some() {
            if cur.is_inverted() {
                invert = !invert;
            }
            cur = self.node(cur.node()).simplified.expect("chain step vanished");
        }
        let simplified = if invert { cur.invert() } else { cur };
        let not_simplified = simplified.invert();

        // Retarget everything on the path. The old link is kept alive
        // until the walk has moved past it.
        let mut invert = false;
        let mut walk = Edge::regular(start);
        self.inc_ref_node(start);
        loop {
            if walk.is_inverted() {
                invert = !invert;
            }
            let walk_id = walk.node();
            let old = self.node(walk_id).simplified.expect("path node lost its link");
            let next = old;
            self.inc_ref_node(next.node());
            let target = if invert { not_simplified } else { simplified };
            self.inc_ref_node(target.node());
            self.node_mut(walk_id).simplified = Some(target);
            self.release(old);
            self.release(walk);
            walk = next;
            if self.node(walk.node()).simplified.is_none() {
                break;
            }
        }
        self.release(walk);
    }

    /// Install `replacement` as the canonical form of `exp` and convert
    /// the node to a proxy in place. Outstanding handles stay valid; any
    /// future query chases the forward link.
    pub fn set_simplified(&mut self, exp: Edge, replacement: Edge) {
        let real = exp.node();
        assert!(real != replacement.node(), "node cannot simplify to itself");
        assert_eq!(
            self.node(real).sort,
            self.get(replacement).sort,
            "replacement changes the sort"
        );
        let target = exp.cond_invert(replacement);
        self.inc_ref_node(target.node());
        let old = self.node_mut(real).simplified.replace(target);
        if let Some(old) = old {
            self.release(old);
        }
        self.set_to_proxy(real);
    }

    /// In-place conversion to a proxy: drop structure and local data,
    /// keep id, sort and the simplified link.
    fn set_to_proxy(&mut self, id: NodeId) {
        assert!(
            self.node(id).simplified.is_some(),
            "proxy conversion without a replacement"
        );
        trace!(id = id.get(), "proxy conversion");

        self.unique_remove(id);
        let mut sink: Vec<Edge> = Vec::new();
        self.erase_local_data(id, &mut sink);
        let arity = self.node(id).arity();
        let children: smallvec::SmallVec<[Edge; 3]> =
            (0..arity).map(|i| self.node(id).child(i)).collect();
        self.remove_from_side_maps(id, true);
        self.disconnect_children(id);
        for child in children {
            self.release(child);
        }
        for held in sink {
            self.release(held);
        }
        self.set_kind(id, NodeKind::Proxy);
        let n = self.node_mut(id);
        n.disconnected = false;
        n.erased = false;
        n.arity = 0;
        n.parameterized = false;
    }

    // ------------------------------------------------------------------
    // Symbols and input ids
    // ------------------------------------------------------------------

    /// Associate a symbol with a node, replacing any previous association
    /// in both directions.
    pub fn set_symbol(&mut self, e: Edge, symbol: &str) {
        let id = e.node();
        let spur = self.symbols.get_or_intern(symbol);
        if let Some(prev_node) = self.symbol_to_node.remove(&spur) {
            self.node_to_symbol.remove(&prev_node);
        }
        if let Some(prev_sym) = self.node_to_symbol.insert(id, spur) {
            self.symbol_to_node.remove(&prev_sym);
        }
        self.symbol_to_node.insert(spur, id);
    }

    /// The symbol of a node, if any.
    #[must_use]
    pub fn symbol(&self, e: Edge) -> Option<&str> {
        let spur = self.node_to_symbol.get(&e.node())?;
        Some(self.symbols.resolve(spur))
    }

    /// The node carrying a symbol, if any.
    #[must_use]
    pub fn node_by_symbol(&self, symbol: &str) -> Option<Edge> {
        let spur = self.symbols.get(symbol)?;
        let id = *self.symbol_to_node.get(&spur)?;
        Some(Edge::regular(id))
    }

    /// Assign the client-facing input id of a variable or array.
    pub fn set_input_id(&mut self, e: Edge, input_id: i32) {
        let id = e.node();
        let slot = self
            .input_ids
            .get_mut(&id)
            .expect("input id on a non-input node");
        *slot = input_id;
    }

    /// The client-facing input id; negated for inverted handles.
    #[must_use]
    pub fn input_id(&self, e: Edge) -> i32 {
        let id = self.input_ids.get(&e.node()).copied().unwrap_or(0);
        if e.is_inverted() {
            -id
        } else {
            id
        }
    }
}

/// Iterator over the (parent, slot) consumers of a node.
pub struct ParentIter<'a> {
    mgr: &'a ExprManager,
    cur: Option<ParentRef>,
}

impl Iterator for ParentIter<'_> {
    type Item = ParentRef;

    fn next(&mut self) -> Option<ParentRef> {
        let pr = self.cur?;
        self.cur = self.mgr.node(pr.parent).next_parent[pr.slot as usize];
        Some(pr)
    }
}
