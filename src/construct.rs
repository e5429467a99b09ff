//! Primitive Constructors.
//!
//! Every constructor canonicalizes its children by chasing the simplified
//! chain, probes the unique table, and only allocates on a miss. The
//! `mk_*_node` entry points bypass the rewriter; the `mk_*` façades call
//! into it when the rewrite level is positive. Constructors return owned
//! handles: the caller releases what it is handed.

use crate::bv::BitVector;
use crate::mgr::ExprManager;
use crate::node::{Edge, NodeId, NodeKind, Payload};
use crate::sort::SortId;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Argument spines chain through the third child slot; two low bits in
/// the parent tag leave room for exactly three slots.
const ARGS_MAX_CHILDREN: usize = 3;

impl ExprManager {
    // ------------------------------------------------------------------
    // Preconditions
    // ------------------------------------------------------------------

    fn assert_bv(&self, e: Edge) {
        assert!(
            self.sorts.is_bitvec(self.get(e).sort),
            "operand is not a bit-vector"
        );
    }

    fn assert_same_width_bv(&self, e0: Edge, e1: Edge) {
        self.assert_bv(e0);
        self.assert_bv(e1);
        assert_eq!(
            self.get(e0).sort,
            self.get(e1).sort,
            "operand widths differ"
        );
    }

    fn assert_shift(&self, e0: Edge, e1: Edge) {
        self.assert_bv(e0);
        self.assert_bv(e1);
        let w0 = self.width(e0);
        let w1 = self.width(e1);
        assert!(
            w0 > 1 && w0.is_power_of_two(),
            "shiftee width must be a power of two greater than one"
        );
        assert_eq!(
            w1,
            w0.trailing_zeros(),
            "shift amount width must be log2 of the shiftee width"
        );
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    /// Constant node for a bit string.
    ///
    /// Constants with the low bit set are stored complemented and handed
    /// back through an inverted edge, halving the constant population.
    pub fn mk_const(&mut self, bits: &BitVector) -> Edge {
        let (lookup, inverted) = if bits.bit(0) {
            (bits.bvnot(), true)
        } else {
            (bits.clone(), false)
        };
        let result = match self.unique_find_const(&lookup) {
            Some(hit) => {
                self.inc_ref_node(hit);
                Edge::regular(hit)
            }
            None => {
                let sort = self.sorts.bitvec(lookup.width());
                let id = self.add_node(NodeKind::BvConst, sort, 0);
                self.node_mut(id).payload = Payload::Const {
                    inv_bits: lookup.bvnot(),
                    bits: lookup,
                };
                self.unique_insert(id);
                Edge::regular(id)
            }
        };
        if inverted {
            result.invert()
        } else {
            result
        }
    }

    /// The all-zero constant of a bit-vector sort.
    pub fn mk_zero(&mut self, sort: SortId) -> Edge {
        let bits = BitVector::zeros(self.sorts.width(sort));
        self.mk_const(&bits)
    }

    /// The all-one constant of a bit-vector sort.
    pub fn mk_ones(&mut self, sort: SortId) -> Edge {
        let bits = BitVector::ones(self.sorts.width(sort));
        self.mk_const(&bits)
    }

    /// The constant one of a bit-vector sort.
    pub fn mk_one(&mut self, sort: SortId) -> Edge {
        let bits = BitVector::one(self.sorts.width(sort));
        self.mk_const(&bits)
    }

    /// A signed integer constant, two's-complement truncated to the sort.
    pub fn mk_int(&mut self, value: i64, sort: SortId) -> Edge {
        let bits = BitVector::from_i64(value, self.sorts.width(sort));
        self.mk_const(&bits)
    }

    /// An unsigned integer constant truncated to the sort.
    pub fn mk_unsigned(&mut self, value: u64, sort: SortId) -> Edge {
        let bits = BitVector::from_u64(value, self.sorts.width(sort));
        self.mk_const(&bits)
    }

    /// The true constant (one-bit one).
    pub fn mk_true(&mut self) -> Edge {
        let sort = self.sorts.bool_sort();
        self.mk_one(sort)
    }

    /// The false constant (one-bit zero).
    pub fn mk_false(&mut self) -> Edge {
        let sort = self.sorts.bool_sort();
        self.mk_zero(sort)
    }

    /// The minimum signed value of the given width: only the sign bit set.
    pub(crate) fn mk_int_min(&mut self, width: u32) -> Edge {
        let mut bits = BitVector::zeros(width);
        bits.set_bit(width - 1, true);
        self.mk_const(&bits)
    }

    // ------------------------------------------------------------------
    // Symbols: variables, parameters, uninterpreted functions
    // ------------------------------------------------------------------

    fn claim_symbol(&mut self, id: NodeId, symbol: Option<&str>) {
        if let Some(symbol) = symbol {
            assert!(
                self.node_by_symbol(symbol).is_none(),
                "symbol is already in use"
            );
            self.set_symbol(Edge::regular(id), symbol);
        }
    }

    /// A fresh bit-vector variable. Never shared: each call creates a new
    /// node.
    pub fn mk_var(&mut self, sort: SortId, symbol: Option<&str>) -> Edge {
        assert!(self.sorts.is_bitvec(sort), "variables are bit-vectors");
        let id = self.add_node(NodeKind::BvVar, sort, 0);
        self.bv_vars.insert(id);
        self.input_ids.insert(id, 0);
        self.claim_symbol(id, symbol);
        Edge::regular(id)
    }

    /// A fresh parameter, to be bound by a lambda.
    pub fn mk_param(&mut self, sort: SortId, symbol: Option<&str>) -> Edge {
        assert!(self.sorts.is_bitvec(sort), "parameters are bit-vectors");
        let id = self.add_node(NodeKind::Param, sort, 0);
        {
            let n = self.node_mut(id);
            n.parameterized = true;
            n.payload = Payload::Param {
                binder: None,
                assigned: None,
            };
        }
        self.claim_symbol(id, symbol);
        Edge::regular(id)
    }

    /// A fresh uninterpreted function of the given function sort.
    pub fn mk_uf(&mut self, sort: SortId, symbol: Option<&str>) -> Edge {
        assert!(self.sorts.is_fun(sort), "uf requires a function sort");
        let id = self.add_node(NodeKind::Uf, sort, 0);
        self.ufs.insert(id);
        self.input_ids.insert(id, 0);
        self.claim_symbol(id, symbol);
        Edge::regular(id)
    }

    /// A fresh array: an uninterpreted function with a unary domain,
    /// flagged as an array.
    pub fn mk_array(&mut self, sort: SortId, symbol: Option<&str>) -> Edge {
        assert!(self.sorts.is_fun(sort), "arrays carry a function sort");
        assert_eq!(self.sorts.fun_arity(sort), 1, "arrays index by one value");
        let e = self.mk_uf(sort, symbol);
        self.node_mut(e.node()).is_array = true;
        e
    }

    // ------------------------------------------------------------------
    // Negation
    // ------------------------------------------------------------------

    /// Bitwise NOT: flips the inversion bit on the edge. No node is
    /// allocated.
    pub fn mk_not(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        self.assert_bv(e);
        self.inc_ref_node(e.node());
        e.invert()
    }

    // ------------------------------------------------------------------
    // The shared creation path
    // ------------------------------------------------------------------

    /// Canonicalize children, probe the unique table, allocate on miss.
    /// The returned edge is always regular.
    pub(crate) fn create_exp(&mut self, kind: NodeKind, children: &[Edge]) -> Edge {
        let arity = children.len();
        debug_assert!((1..=3).contains(&arity));
        let mut e: SmallVec<[Edge; 3]> =
            children.iter().map(|&c| self.simplify(c)).collect();
        self.sort_commutative(kind, &mut e);

        if kind == NodeKind::Lambda {
            return self.create_lambda(e[0], e[1]);
        }

        match self.unique_find_children(kind, &e) {
            Some(hit) => {
                self.inc_ref_node(hit);
                Edge::regular(hit)
            }
            None => {
                let id = match kind {
                    NodeKind::Args => self.new_args_node(&e),
                    _ => self.new_node(kind, &e),
                };
                self.unique_insert(id);
                Edge::regular(id)
            }
        }
    }

    fn create_lambda(&mut self, param: Edge, body: Edge) -> Edge {
        assert!(!param.is_inverted(), "lambda parameter must be regular");
        let param_id = param.node();
        assert_eq!(
            self.node(param_id).kind,
            NodeKind::Param,
            "lambda binds a parameter"
        );

        // Free parameters are collected while hashing, but only for
        // innermost bodies; curried chains inherit the inner set.
        let body_is_lambda = !body.is_inverted() && self.get(body).kind == NodeKind::Lambda;
        let mut free_params: Option<FxHashSet<NodeId>> =
            if body_is_lambda { None } else { Some(FxHashSet::default()) };

        let (hash, found) =
            self.unique_find_lambda(param_id, body, free_params.as_mut(), true);
        if let Some(hit) = found {
            self.inc_ref_node(hit);
            return Edge::regular(hit);
        }

        let id = self.new_lambda_node(param_id, body, hash);
        if let Some(set) = free_params {
            if !set.is_empty() {
                self.parameterized.insert(id, set);
                self.node_mut(id).parameterized = true;
            }
        }
        self.unique_insert(id);
        Edge::regular(id)
    }

    fn new_node(&mut self, kind: NodeKind, e: &[Edge]) -> NodeId {
        let sort = match kind {
            NodeKind::Cond => self.get(e[1]).sort,
            NodeKind::Update => self.get(e[0]).sort,
            NodeKind::Concat => {
                let width = self
                    .width(e[0])
                    .checked_add(self.width(e[1]))
                    .expect("concat width overflow");
                self.sorts.bitvec(width)
            }
            NodeKind::BvEq | NodeKind::FunEq | NodeKind::Ult => self.sorts.bool_sort(),
            NodeKind::Apply => self.sorts.fun_codomain(self.get(e[0]).sort),
            NodeKind::And
            | NodeKind::Add
            | NodeKind::Mul
            | NodeKind::Sll
            | NodeKind::Srl
            | NodeKind::Udiv
            | NodeKind::Urem => self.get(e[0]).sort,
            _ => unreachable!("not a generic node kind"),
        };
        let id = self.add_node(kind, sort, e.len());
        for (i, &c) in e.iter().enumerate() {
            self.connect_child(id, c, i);
        }
        if kind == NodeKind::FunEq {
            self.feqs.insert(id);
        }
        id
    }

    fn new_args_node(&mut self, e: &[Edge]) -> NodeId {
        // The tuple sort flattens a chained spine in the last slot.
        let mut element_sorts: Vec<SortId> = Vec::new();
        for (i, &c) in e.iter().enumerate() {
            let n = self.get(c);
            if n.kind == NodeKind::Args {
                debug_assert_eq!(i, 2, "spines chain through the last slot");
                element_sorts.extend_from_slice(self.sorts.tuple_elements(n.sort));
            } else {
                element_sorts.push(n.sort);
            }
        }
        let sort = self.sorts.tuple(&element_sorts);
        let id = self.add_node(NodeKind::Args, sort, e.len());
        for (i, &c) in e.iter().enumerate() {
            self.connect_child(id, c, i);
        }
        id
    }

    fn new_lambda_node(&mut self, param: NodeId, body: Edge, hash: u32) -> NodeId {
        assert!(
            self.node(param).param_binder().is_none(),
            "parameter is already bound"
        );

        let body_real = body.node();
        let body_is_lambda = !body.is_inverted() && self.node(body_real).kind == NodeKind::Lambda;
        let param_sort = self.node(param).sort;

        let (inner_body, domain_sorts, codomain) = if body_is_lambda {
            let inner_sort = self.node(body_real).sort;
            let mut sorts = vec![param_sort];
            sorts.extend_from_slice(
                self.sorts
                    .tuple_elements(self.sorts.fun_domain(inner_sort)),
            );
            let inner = self.node(body_real).lambda_body();
            let inner = self.simplify(inner);
            (inner, sorts, self.sorts.fun_codomain(inner_sort))
        } else {
            (body, vec![param_sort], self.get(body).sort)
        };
        let domain = self.sorts.tuple(&domain_sorts);
        let sort = self.sorts.fun(domain, codomain);

        let id = self.add_node(NodeKind::Lambda, sort, 2);
        self.node_mut(id).lambda_below = true;
        self.connect_child(id, Edge::regular(param), 0);
        self.connect_child(id, body, 1);
        self.node_mut(id).payload = Payload::Lambda {
            body: inner_body,
            static_rho: None,
        };

        // Currying consumes the inner lambda's binder: its remaining free
        // parameters move up to this one.
        if body_is_lambda {
            if let Some(mut set) = self.parameterized.remove(&body_real) {
                set.remove(&param);
                if !set.is_empty() {
                    self.parameterized.insert(id, set);
                    self.node_mut(id).parameterized = true;
                }
            }
        }

        self.lambdas.insert(id, hash);
        if let Payload::Param { binder, .. } = &mut self.node_mut(param).payload {
            *binder = Some(id);
        }
        id
    }

    pub(crate) fn lambda_set_static_rho(&mut self, id: NodeId, rho: FxHashMap<NodeId, Edge>) {
        match &mut self.node_mut(id).payload {
            Payload::Lambda { static_rho, .. } => {
                debug_assert!(static_rho.is_none());
                *static_rho = Some(rho);
            }
            _ => panic!("static rho on a non-lambda node"),
        }
    }

    // ------------------------------------------------------------------
    // Primitive kernel constructors (rewriter bypassed)
    // ------------------------------------------------------------------

    /// Slice node, normalizing over inverted operands when rewriting is
    /// enabled: slicing a complement is the complement of the slice.
    pub fn mk_slice_node(&mut self, e: Edge, upper: u32, lower: u32) -> Edge {
        let mut e = self.simplify(e);
        self.assert_bv(e);
        assert!(upper >= lower, "slice bounds are inverted");
        assert!(upper < self.width(e), "slice upper bound out of range");

        let inverted = self.options.rewrite_level > 0 && e.is_inverted();
        if inverted {
            e = e.strip();
        }
        let result = match self.unique_find_slice(e, upper, lower) {
            Some(hit) => {
                self.inc_ref_node(hit);
                Edge::regular(hit)
            }
            None => {
                let sort = self.sorts.bitvec(upper - lower + 1);
                let id = self.add_node(NodeKind::Slice, sort, 1);
                self.node_mut(id).payload = Payload::Slice { upper, lower };
                self.connect_child(id, e, 0);
                self.unique_insert(id);
                Edge::regular(id)
            }
        };
        if inverted {
            result.invert()
        } else {
            result
        }
    }

    /// Conjunction node.
    pub fn mk_and_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_same_width_bv(e0, e1);
        self.create_exp(NodeKind::And, &[e0, e1])
    }

    /// Equality node; function operands produce a function equality.
    pub fn mk_eq_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        assert_eq!(self.get(e0).sort, self.get(e1).sort, "equality over distinct sorts");
        // Equality dispatches on the operand sort: array-typed terms carry
        // function sorts and compare as functions.
        let kind = if self.sorts.is_fun(self.get(e0).sort) {
            assert!(!e0.is_inverted() && !e1.is_inverted(), "function handles are regular");
            NodeKind::FunEq
        } else {
            NodeKind::BvEq
        };
        self.create_exp(kind, &[e0, e1])
    }

    /// Addition node.
    pub fn mk_add_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_same_width_bv(e0, e1);
        self.create_exp(NodeKind::Add, &[e0, e1])
    }

    /// Multiplication node.
    pub fn mk_mul_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_same_width_bv(e0, e1);
        self.create_exp(NodeKind::Mul, &[e0, e1])
    }

    /// Unsigned less-than node.
    pub fn mk_ult_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_same_width_bv(e0, e1);
        self.create_exp(NodeKind::Ult, &[e0, e1])
    }

    /// Shift-left node.
    pub fn mk_sll_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_shift(e0, e1);
        self.create_exp(NodeKind::Sll, &[e0, e1])
    }

    /// Logical shift-right node.
    pub fn mk_srl_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_shift(e0, e1);
        self.create_exp(NodeKind::Srl, &[e0, e1])
    }

    /// Unsigned division node.
    pub fn mk_udiv_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_same_width_bv(e0, e1);
        self.create_exp(NodeKind::Udiv, &[e0, e1])
    }

    /// Unsigned remainder node.
    pub fn mk_urem_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_same_width_bv(e0, e1);
        self.create_exp(NodeKind::Urem, &[e0, e1])
    }

    /// Concatenation node, `e0` supplying the most significant bits.
    pub fn mk_concat_node(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.assert_bv(e0);
        self.assert_bv(e1);
        assert!(
            self.width(e0).checked_add(self.width(e1)).is_some(),
            "concat width overflow"
        );
        self.create_exp(NodeKind::Concat, &[e0, e1])
    }

    /// Lambda node.
    pub fn mk_lambda_node(&mut self, param: Edge, body: Edge) -> Edge {
        let param = self.simplify(param);
        let body = self.simplify(body);
        self.create_exp(NodeKind::Lambda, &[param, body])
    }

    /// Application node. A parameterized lambda callee is eliminated on
    /// the spot: arguments are installed in the bound parameters and the
    /// bounded beta reducer builds the result (stack discipline: assign
    /// before, unassign after).
    pub fn mk_apply_node(&mut self, fun: Edge, args: Edge) -> Edge {
        let fun = self.simplify(fun);
        let args = self.simplify(args);
        assert!(!fun.is_inverted() && !args.is_inverted(), "function handles are regular");
        assert!(
            self.sorts.is_fun(self.get(fun).sort),
            "apply requires a function"
        );
        assert_eq!(self.get(args).kind, NodeKind::Args, "apply requires an argument tuple");
        assert_eq!(
            self.sorts.fun_domain(self.get(fun).sort),
            self.get(args).sort,
            "argument tuple does not match the function domain"
        );

        if self.get(fun).kind == NodeKind::Lambda && self.get(fun).is_parameterized() {
            self.assign_args(fun.node(), args.node());
            let result = self.beta_reduce_bounded(fun, 1);
            self.unassign_params(fun.node());
            return result;
        }
        self.create_exp(NodeKind::Apply, &[fun, args])
    }

    /// Conditional node. A conditional over parameterized functions is
    /// lambda-lifted: fresh parameters are applied to both branches and
    /// the conditional is rebuilt under a function binder, so that the
    /// beta path in apply can see through it.
    pub fn mk_cond_node(&mut self, e_cond: Edge, e_if: Edge, e_else: Edge) -> Edge {
        let c = self.simplify(e_cond);
        let t = self.simplify(e_if);
        let e = self.simplify(e_else);
        self.assert_bv(c);
        assert_eq!(self.width(c), 1, "condition must be one bit wide");
        assert_eq!(self.get(t).sort, self.get(e).sort, "branch sorts differ");

        if self.get(t).is_fun()
            && (self.get(t).is_parameterized() || self.get(e).is_parameterized())
        {
            let fun_sort = self.get(t).sort;
            let domain = self.sorts.fun_domain(fun_sort);
            let element_sorts: Vec<SortId> = self.sorts.tuple_elements(domain).to_vec();
            let params: Vec<Edge> = element_sorts
                .iter()
                .map(|&s| self.mk_param(s, None))
                .collect();
            let app_if = self.mk_apply_exps(&params, t);
            let app_else = self.mk_apply_exps(&params, e);
            let cond = self.create_exp(NodeKind::Cond, &[c, app_if, app_else]);
            let lambda = self.mk_fun(&params, cond);
            for p in &params {
                self.release(*p);
            }
            self.release(app_if);
            self.release(app_else);
            self.release(cond);
            return lambda;
        }
        self.create_exp(NodeKind::Cond, &[c, t, e])
    }

    // ------------------------------------------------------------------
    // Façades with rewriter callout
    // ------------------------------------------------------------------

    /// Slice of `e` down to bits `[upper, lower]`.
    pub fn mk_slice(&mut self, e: Edge, upper: u32, lower: u32) -> Edge {
        let e = self.simplify(e);
        if self.options.rewrite_level > 0 {
            self.rewrite_slice_exp(e, upper, lower)
        } else {
            self.mk_slice_node(e, upper, lower)
        }
    }

    /// Bitwise conjunction.
    pub fn mk_and(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::And, e0, e1)
        } else {
            self.mk_and_node(e0, e1)
        }
    }

    /// Equality; dispatches to function equality on function sorts.
    pub fn mk_eq(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            let kind = if self.sorts.is_fun(self.get(e0).sort) {
                NodeKind::FunEq
            } else {
                NodeKind::BvEq
            };
            self.rewrite_binary_exp(kind, e0, e1)
        } else {
            self.mk_eq_node(e0, e1)
        }
    }

    /// Addition modulo the operand width.
    pub fn mk_add(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Add, e0, e1)
        } else {
            self.mk_add_node(e0, e1)
        }
    }

    /// Multiplication modulo the operand width.
    pub fn mk_mul(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Mul, e0, e1)
        } else {
            self.mk_mul_node(e0, e1)
        }
    }

    /// Unsigned less-than.
    pub fn mk_ult(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Ult, e0, e1)
        } else {
            self.mk_ult_node(e0, e1)
        }
    }

    /// Logical shift left.
    pub fn mk_sll(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Sll, e0, e1)
        } else {
            self.mk_sll_node(e0, e1)
        }
    }

    /// Logical shift right.
    pub fn mk_srl(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Srl, e0, e1)
        } else {
            self.mk_srl_node(e0, e1)
        }
    }

    /// Unsigned division (total: division by zero is all-ones).
    pub fn mk_udiv(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Udiv, e0, e1)
        } else {
            self.mk_udiv_node(e0, e1)
        }
    }

    /// Unsigned remainder (total: remainder by zero is the dividend).
    pub fn mk_urem(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Urem, e0, e1)
        } else {
            self.mk_urem_node(e0, e1)
        }
    }

    /// Concatenation, `e0` supplying the most significant bits.
    pub fn mk_concat(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Concat, e0, e1)
        } else {
            self.mk_concat_node(e0, e1)
        }
    }

    /// If-then-else over a one-bit condition.
    pub fn mk_cond(&mut self, e_cond: Edge, e_if: Edge, e_else: Edge) -> Edge {
        if self.options.rewrite_level > 0 {
            self.rewrite_ternary_exp(NodeKind::Cond, e_cond, e_if, e_else)
        } else {
            self.mk_cond_node(e_cond, e_if, e_else)
        }
    }

    /// Bind `param` over `body`.
    pub fn mk_lambda(&mut self, param: Edge, body: Edge) -> Edge {
        assert!(!param.is_inverted(), "lambda parameter must be regular");
        assert_eq!(self.get(param).kind, NodeKind::Param, "lambda binds a parameter");
        assert!(
            self.get(param).param_binder().is_none(),
            "parameter is already bound"
        );
        let result = if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Lambda, param, body)
        } else {
            self.mk_lambda_node(param, body)
        };
        debug_assert!(self.get(result).is_fun());
        result
    }

    /// Bind a parameter list over `body`, innermost parameter last.
    pub fn mk_fun(&mut self, params: &[Edge], body: Edge) -> Edge {
        assert!(!params.is_empty(), "function without parameters");
        assert!(self.get(body).kind != NodeKind::Uf, "function body cannot be a uf");
        let mut fun = self.simplify(body);
        let mut prev: Option<Edge> = None;
        for &param in params.iter().rev() {
            fun = self.mk_lambda(param, fun);
            if let Some(prev_fun) = prev {
                self.release(prev_fun);
            }
            prev = Some(fun);
        }
        fun
    }

    /// Build an argument tuple from a flat list. Spines of maximum arity
    /// three chain the overflow through the last slot.
    pub fn mk_args(&mut self, args: &[Edge]) -> Edge {
        assert!(!args.is_empty(), "empty argument tuple");
        let argc = args.len();

        let mut cur_argc = if argc <= ARGS_MAX_CHILDREN {
            argc
        } else {
            // Chained nodes carry two payload slots each; compute how
            // many arguments the innermost node takes.
            let per_node = ARGS_MAX_CHILDREN - 1;
            let mut num_nodes = argc / per_node;
            if argc % per_node > 1 {
                num_nodes += 1;
            }
            argc - (num_nodes - 1) * per_node
        };

        let mut e: [Option<Edge>; ARGS_MAX_CHILDREN] = [None; ARGS_MAX_CHILDREN];
        let mut slot = cur_argc as isize - 1;
        let mut result: Option<Edge> = None;
        let mut last: Option<Edge> = None;

        for i in (0..argc).rev() {
            assert!(!self.get(args[i]).is_fun(), "functions cannot be arguments");
            e[slot as usize] = Some(self.simplify(args[i]));
            slot -= 1;
            if slot < 0 {
                let chunk: SmallVec<[Edge; 3]> =
                    e[..cur_argc].iter().map(|c| c.expect("slot filled")).collect();
                let next = self.create_exp(NodeKind::Args, &chunk);
                cur_argc = ARGS_MAX_CHILDREN;
                e[2] = Some(next);
                slot = 1;
                if let Some(prev) = last {
                    self.release(prev);
                }
                last = Some(next);
                result = Some(next);
            }
        }
        result.expect("argument tuple construction left no result")
    }

    /// Apply a function to an argument tuple.
    pub fn mk_apply(&mut self, fun: Edge, args: Edge) -> Edge {
        let fun = self.simplify(fun);
        let args = self.simplify(args);
        if self.options.rewrite_level > 0 {
            self.rewrite_binary_exp(NodeKind::Apply, fun, args)
        } else {
            self.mk_apply_node(fun, args)
        }
    }

    /// Apply a function to a flat argument list.
    pub fn mk_apply_exps(&mut self, args: &[Edge], fun: Edge) -> Edge {
        let args = self.mk_args(args);
        let fun = self.simplify(fun);
        let result = self.mk_apply(fun, args);
        self.release(args);
        result
    }

    /// Functional update `fun` with `args` remapped to `value`. Any
    /// parameterized operand degrades to the store-lambda encoding.
    pub fn mk_update(&mut self, fun: Edge, args: Edge, value: Edge) -> Edge {
        let f = self.simplify(fun);
        let a = self.simplify(args);
        let v = self.simplify(value);
        assert!(
            self.sorts.is_fun(self.get(f).sort),
            "update requires a function"
        );
        assert_eq!(self.get(a).kind, NodeKind::Args, "update requires an argument tuple");
        assert!(
            !self.sorts.is_fun(self.get(v).sort),
            "update value must be a bit-vector"
        );

        if self.get(f).is_parameterized()
            || self.get(a).is_parameterized()
            || self.get(v).is_parameterized()
        {
            assert_eq!(
                self.sorts.tuple_arity(self.get(a).sort),
                1,
                "parameterized update requires a unary index"
            );
            let index = self.get(a).child(0);
            return self.mk_lambda_write(f, index, v);
        }

        let result = self.create_exp(NodeKind::Update, &[f, a, v]);
        if self.get(f).is_array() {
            self.node_mut(result.node()).is_array = true;
        }
        result
    }

    /// Read `array` at `index`: an application of the array function.
    pub fn mk_read(&mut self, array: Edge, index: Edge) -> Edge {
        let array = self.simplify(array);
        let index = self.simplify(index);
        assert!(
            self.sorts.is_fun(self.get(array).sort),
            "read requires an array"
        );
        self.mk_apply_exps(&[index], array)
    }

    /// Write `value` to `array` at `index`.
    ///
    /// Under `fun-store-lambdas`, or whenever index or value sit under a
    /// binder, the write is encoded as the lambda
    /// `\p . p = index ? value : array[p]`; otherwise a primitive update
    /// node is built.
    pub fn mk_write(&mut self, array: Edge, index: Edge, value: Edge) -> Edge {
        let array = self.simplify(array);
        let index = self.simplify(index);
        let value = self.simplify(value);
        assert!(self.get(array).is_array(), "write requires an array");
        self.assert_bv(index);
        self.assert_bv(value);
        assert_eq!(
            self.sorts.tuple_elements(self.sorts.fun_domain(self.get(array).sort))[0],
            self.get(index).sort,
            "index sort does not match the array domain"
        );
        assert_eq!(
            self.sorts.fun_codomain(self.get(array).sort),
            self.get(value).sort,
            "value sort does not match the array codomain"
        );

        if self.options.fun_store_lambdas
            || self.get(index).is_parameterized()
            || self.get(value).is_parameterized()
        {
            self.mk_lambda_write(array, index, value)
        } else {
            let args = self.mk_args(&[index]);
            let result = self.mk_update(array, args, value);
            self.release(args);
            self.node_mut(result.node()).is_array = true;
            result
        }
    }

    /// The store-lambda encoding of a write, seeding the lambda's
    /// static-rho with the written pair.
    fn mk_lambda_write(&mut self, array: Edge, index: Edge, value: Edge) -> Edge {
        let param = self.mk_param(self.get(index).sort, None);
        let e_cond = self.mk_eq(param, index);
        let e_if = self.copy(value);
        let e_else = self.mk_read(array, param);
        let bvcond = self.mk_cond(e_cond, e_if, e_else);
        let lambda = self.mk_lambda(param, bvcond);

        let lambda_id = lambda.node();
        if self.node(lambda_id).static_rho().is_none() {
            let args = self.mk_args(&[index]);
            let held_value = self.copy(value);
            let mut rho: FxHashMap<NodeId, Edge> = FxHashMap::default();
            rho.insert(args.node(), held_value);
            self.lambda_set_static_rho(lambda_id, rho);
        }

        self.release(e_if);
        self.release(e_else);
        self.release(e_cond);
        self.release(bvcond);
        self.release(param);

        self.node_mut(lambda_id).is_array = true;
        lambda
    }
}
