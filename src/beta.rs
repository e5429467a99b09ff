//! Bounded Beta Reduction.
//!
//! Used by the apply constructor to eliminate lambda callees: arguments
//! are installed in the bound parameters (stack discipline: assign
//! before, unassign after), the body is rebuilt bottom-up under the
//! assignment, and the result replaces the application. Only subterms
//! under a binder are rebuilt; shared ground terms are reused as-is.

use crate::mgr::ExprManager;
use crate::node::{Edge, NodeId, NodeKind, Payload};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

impl ExprManager {
    fn param_set_assigned(&mut self, param: NodeId, value: Option<Edge>) {
        match &mut self.node_mut(param).payload {
            Payload::Param { assigned, .. } => *assigned = value,
            _ => panic!("assignment on a non-parameter node"),
        }
    }

    /// The flattened elements of an argument tuple, in argument order.
    pub(crate) fn args_elements(&self, args: NodeId) -> Vec<Edge> {
        debug_assert_eq!(self.node(args).kind, NodeKind::Args);
        let mut elements = Vec::new();
        let mut cur = args;
        loop {
            let n = self.node(cur);
            let mut chained = None;
            for i in 0..n.arity() {
                let child = n.child(i);
                if i == 2 && !child.is_inverted() && self.get(child).kind == NodeKind::Args {
                    chained = Some(child.node());
                } else {
                    elements.push(child);
                }
            }
            match chained {
                Some(next) => cur = next,
                None => break,
            }
        }
        elements
    }

    /// Install the elements of `args` in the parameters bound along the
    /// curried chain of `fun`.
    pub(crate) fn assign_args(&mut self, fun: NodeId, args: NodeId) {
        debug_assert_eq!(self.node(fun).kind, NodeKind::Lambda);
        let elements = self.args_elements(args);
        debug_assert_eq!(
            elements.len() as u32,
            self.sorts.fun_arity(self.node(fun).sort),
            "argument count does not match the function arity"
        );
        let mut lambda = Some(fun);
        for arg in elements {
            let cur = lambda.expect("more arguments than binders");
            let param = self.node(cur).child(0).node();
            debug_assert!(self.node(param).param_assigned().is_none());
            self.param_set_assigned(param, Some(arg));
            lambda = self.next_bound_lambda(cur);
        }
    }

    /// Clear the assignments installed along the curried chain of `fun`.
    pub(crate) fn unassign_params(&mut self, fun: NodeId) {
        let mut lambda = Some(fun);
        while let Some(cur) = lambda {
            let param = self.node(cur).child(0).node();
            if self.node(param).param_assigned().is_none() {
                break;
            }
            self.param_set_assigned(param, None);
            lambda = self.next_bound_lambda(cur);
        }
    }

    fn next_bound_lambda(&self, lambda: NodeId) -> Option<NodeId> {
        let body = self.node(lambda).child(1);
        if !body.is_inverted() && self.get(body).kind == NodeKind::Lambda {
            Some(body.node())
        } else {
            None
        }
    }

    /// Reduce the application of `fun` to its currently assigned
    /// arguments: rebuild the innermost body with every assigned
    /// parameter replaced by its argument. Nested lambdas that are not
    /// part of the assignment are rebuilt over fresh parameters.
    pub(crate) fn beta_reduce_bounded(&mut self, fun: Edge, _bound: u32) -> Edge {
        debug_assert!(!fun.is_inverted());
        debug_assert_eq!(self.get(fun).kind, NodeKind::Lambda);
        let body = self.get(fun).lambda_body();
        self.rebuild_under_assignment(body)
    }

    fn rebuild_under_assignment(&mut self, root: Edge) -> Edge {
        // `None` in the cache marks a node whose children are pending.
        // Every cached edge owns a reference, dropped at the end.
        let mut cache: FxHashMap<NodeId, Option<Edge>> = FxHashMap::default();
        let mut fresh_params: Vec<(NodeId, Edge)> = Vec::new();
        let mut stack: Vec<Edge> = vec![root];

        while let Some(cur) = stack.pop() {
            let real = cur.node();
            if matches!(cache.get(&real), Some(Some(_))) {
                continue;
            }
            let kind = self.node(real).kind;

            if !self.node(real).is_parameterized() {
                let copied = self.copy(Edge::regular(real));
                cache.insert(real, Some(copied));
                continue;
            }
            if kind == NodeKind::Param {
                let result = match self.node(real).param_assigned() {
                    Some(value) => self.copy(value),
                    None => self.copy(Edge::regular(real)),
                };
                cache.insert(real, Some(result));
                continue;
            }

            match cache.get(&real).copied() {
                None => {
                    cache.insert(real, None);
                    if kind == NodeKind::Lambda {
                        // This binder survives the reduction; rebuild it
                        // over a fresh parameter so the old one stays
                        // bound to the original lambda.
                        let param = self.node(real).child(0).node();
                        if self.node(param).param_assigned().is_none() {
                            let sort = self.node(param).sort;
                            let fresh = self.mk_param(sort, None);
                            self.param_set_assigned(param, Some(fresh));
                            fresh_params.push((param, fresh));
                        }
                    }
                    stack.push(cur);
                    for i in (0..self.node(real).arity()).rev() {
                        stack.push(self.node(real).child(i));
                    }
                }
                Some(None) => {
                    let arity = self.node(real).arity();
                    let rebuilt: SmallVec<[Edge; 3]> = (0..arity)
                        .map(|i| {
                            let child = self.node(real).child(i);
                            let mapped = cache[&child.node()].expect("child not rebuilt");
                            child.cond_invert(mapped)
                        })
                        .collect();
                    let result = match kind {
                        NodeKind::Slice => {
                            let upper = self.node(real).slice_upper();
                            let lower = self.node(real).slice_lower();
                            self.mk_slice(rebuilt[0], upper, lower)
                        }
                        NodeKind::And => self.mk_and(rebuilt[0], rebuilt[1]),
                        NodeKind::BvEq | NodeKind::FunEq => self.mk_eq(rebuilt[0], rebuilt[1]),
                        NodeKind::Add => self.mk_add(rebuilt[0], rebuilt[1]),
                        NodeKind::Mul => self.mk_mul(rebuilt[0], rebuilt[1]),
                        NodeKind::Ult => self.mk_ult(rebuilt[0], rebuilt[1]),
                        NodeKind::Sll => self.mk_sll(rebuilt[0], rebuilt[1]),
                        NodeKind::Srl => self.mk_srl(rebuilt[0], rebuilt[1]),
                        NodeKind::Udiv => self.mk_udiv(rebuilt[0], rebuilt[1]),
                        NodeKind::Urem => self.mk_urem(rebuilt[0], rebuilt[1]),
                        NodeKind::Concat => self.mk_concat(rebuilt[0], rebuilt[1]),
                        NodeKind::Cond => self.mk_cond(rebuilt[0], rebuilt[1], rebuilt[2]),
                        NodeKind::Args => self.create_exp(NodeKind::Args, &rebuilt),
                        NodeKind::Apply => self.mk_apply(rebuilt[0], rebuilt[1]),
                        NodeKind::Update => self.mk_update(rebuilt[0], rebuilt[1], rebuilt[2]),
                        NodeKind::Lambda => self.mk_lambda(rebuilt[0], rebuilt[1]),
                        _ => unreachable!("kind cannot be parameterized"),
                    };
                    cache.insert(real, Some(result));
                }
                Some(Some(_)) => {}
            }
        }

        let final_edge = {
            let mapped = cache[&root.node()].expect("root not rebuilt");
            root.cond_invert(mapped)
        };
        let result = self.copy(final_edge);
        for (_, held) in cache {
            if let Some(held) = held {
                self.release(held);
            }
        }
        for (param, fresh) in fresh_params {
            self.param_set_assigned(param, None);
            self.release(fresh);
        }
        result
    }
}
