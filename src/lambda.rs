//! Alpha-Equivalence Machinery for Lambdas.
//!
//! Two lambdas are the same term when they bind parameters of the same
//! sort over structurally equal bodies, modulo the bound parameter's
//! identity. The hash walks the body and deliberately ignores the bound
//! parameter; the structural test rebuilds one body under a parameter
//! substitution by probing the unique table without inserting.

use crate::mgr::ExprManager;
use crate::node::{Edge, NodeId, NodeKind};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

impl ExprManager {
    /// Alpha-invariant hash of `lambda param . body`.
    ///
    /// Non-parameterized subterms contribute their (signed) ids: they are
    /// shared, so their identity is stable. Reachable lambdas contribute
    /// their cached hash. Every other parameterized subterm contributes
    /// only its kind, which is what makes the hash invariant under
    /// renaming of `param`. Free parameters other than `param` are
    /// gathered into `collect` when given.
    pub(crate) fn hash_lambda(
        &self,
        param: NodeId,
        body: Edge,
        mut collect: Option<&mut FxHashSet<NodeId>>,
    ) -> u32 {
        debug_assert_eq!(self.node(param).kind, NodeKind::Param);

        let mut hash = 0u32;
        let mut marked: FxHashSet<NodeId> = FxHashSet::default();
        let mut visit: Vec<Edge> = vec![body];

        while let Some(cur) = visit.pop() {
            let real = cur.node();
            if marked.contains(&real) {
                continue;
            }
            let n = self.node(real);
            if !n.parameterized {
                hash = hash.wrapping_add(cur.signed_id() as i32 as u32);
                continue;
            }
            if n.kind == NodeKind::Lambda {
                // Already hashed at its own creation; reuse the cached
                // value instead of descending into the nested body.
                hash = hash.wrapping_add(
                    *self.lambdas.get(&real).expect("lambda without a cached hash"),
                );
                hash = hash.wrapping_add(n.kind as u32);
                hash = hash.wrapping_add(self.get(n.child(0)).kind as u32);
                continue;
            }
            if n.kind == NodeKind::Param && real != param {
                if let Some(set) = collect.as_deref_mut() {
                    set.insert(real);
                }
            }
            marked.insert(real);
            hash = hash.wrapping_add(if cur.is_inverted() {
                (n.kind as u32).wrapping_neg()
            } else {
                n.kind as u32
            });
            for i in 0..n.arity() {
                visit.push(n.child(i));
            }
        }
        hash
    }

    /// Structural equality of `lambda param . body` against an installed
    /// lambda, under the substitution `param -> lambda's parameter`.
    ///
    /// The candidate body is rebuilt bottom-up by consulting the unique
    /// table without inserting; any missing subterm proves inequality.
    /// Curried chains extend the substitution one binder at a time and
    /// must have the same length on both sides.
    pub(crate) fn compare_lambda(&self, param: NodeId, body: Edge, lambda: NodeId) -> bool {
        debug_assert_eq!(self.node(lambda).kind, NodeKind::Lambda);
        debug_assert!(!self.node(lambda).parameterized);

        let subst_param = self.node(lambda).child(0).node();
        let lambda_body = self.node(lambda).child(1);
        if self.node(subst_param).sort != self.node(param).sort
            || self.get(body).sort != self.get(lambda_body).sort
        {
            return false;
        }

        let mut param_map: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        param_map.insert(param, subst_param);

        let body_is_lambda = !body.is_inverted() && self.get(body).kind == NodeKind::Lambda;
        let other_is_lambda =
            !lambda_body.is_inverted() && self.get(lambda_body).kind == NodeKind::Lambda;
        if body_is_lambda != other_is_lambda {
            return false;
        }
        if body_is_lambda {
            // Walk both curried chains in lockstep, mapping binder to
            // binder.
            let mut l0 = Some(body.node());
            let mut l1 = Some(lambda_body.node());
            loop {
                match (l0, l1) {
                    (None, None) => break,
                    (Some(a), Some(b)) => {
                        if self.node(a).sort != self.node(b).sort {
                            return false;
                        }
                        let pa = self.node(a).child(0).node();
                        let pb = self.node(b).child(0).node();
                        if self.node(pa).sort != self.node(pb).sort {
                            return false;
                        }
                        param_map.insert(pa, pb);
                        l0 = self.next_in_chain(a);
                        l1 = self.next_in_chain(b);
                    }
                    _ => return false,
                }
            }
        }

        // Post-order rebuild of `body` under the substitution. `None` in
        // the cache marks a node whose children are still pending.
        let mut cache: FxHashMap<NodeId, Option<Edge>> = FxHashMap::default();
        let mut stack: Vec<Edge> = vec![body];
        let mut results: Vec<Edge> = Vec::new();

        while let Some(cur) = stack.pop() {
            let real = cur.node();
            let n = self.node(real);
            if !n.parameterized {
                results.push(cur);
                continue;
            }
            match cache.get(&real).copied() {
                None => {
                    cache.insert(real, None);
                    stack.push(cur);
                    for i in (0..n.arity()).rev() {
                        stack.push(n.child(i));
                    }
                }
                Some(None) => {
                    let arity = n.arity();
                    debug_assert!(results.len() >= arity);
                    let e: SmallVec<[Edge; 3]> =
                        results.split_off(results.len() - arity).into();
                    let found: Option<NodeId> = match n.kind {
                        NodeKind::Slice => {
                            self.unique_find_slice(e[0], n.slice_upper(), n.slice_lower())
                        }
                        NodeKind::Lambda => {
                            self.unique_find_lambda(e[0].node(), e[1], None, false).1
                        }
                        NodeKind::Param => {
                            Some(param_map.get(&real).copied().unwrap_or(real))
                        }
                        _ => {
                            let mut e = e.clone();
                            self.sort_commutative(n.kind, &mut e);
                            self.unique_find_children(n.kind, &e)
                        }
                    };
                    let Some(found) = found else {
                        return false;
                    };
                    results.push(cur.cond_invert(Edge::regular(found)));
                    cache.insert(real, Some(Edge::regular(found)));
                }
                Some(Some(mapped)) => {
                    results.push(cur.cond_invert(mapped));
                }
            }
        }

        debug_assert_eq!(results.len(), 1);
        results.last() == Some(&lambda_body)
    }

    /// The next lambda of a curried chain, entered through the body slot.
    fn next_in_chain(&self, lambda: NodeId) -> Option<NodeId> {
        let body = self.node(lambda).child(1);
        if !body.is_inverted() && self.get(body).kind == NodeKind::Lambda {
            Some(body.node())
        } else {
            None
        }
    }
}
