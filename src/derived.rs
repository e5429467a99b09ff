//! Derived Operator Expansions.
//!
//! Everything outside the primitive kernel is a fixed macro expansion
//! over it: signed arithmetic normalizes by absolute value, overflow
//! predicates are carry networks, rotations shift both ways, reductions
//! compare against distinguished constants. Each expansion chooses
//! structure only; the rewriter may simplify the pieces as they are
//! built.

use crate::mgr::ExprManager;
use crate::node::Edge;

impl ExprManager {
    /// Disjunction: `or(a, b) = not(and(not a, not b))`.
    pub fn mk_or(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_and(e0.invert(), e1.invert()).invert()
    }

    /// Exclusive or: `and(or(a, b), not(and(a, b)))`.
    pub fn mk_xor(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let or = self.mk_or(e0, e1);
        let and = self.mk_and(e0, e1);
        let result = self.mk_and(or, and.invert());
        self.release(or);
        self.release(and);
        result
    }

    /// Exclusive nor.
    pub fn mk_xnor(&mut self, e0: Edge, e1: Edge) -> Edge {
        self.mk_xor(e0, e1).invert()
    }

    /// Negated conjunction.
    pub fn mk_nand(&mut self, e0: Edge, e1: Edge) -> Edge {
        self.mk_and(e0, e1).invert()
    }

    /// Negated disjunction.
    pub fn mk_nor(&mut self, e0: Edge, e1: Edge) -> Edge {
        self.mk_or(e0, e1).invert()
    }

    /// Boolean implication; one-bit operands only.
    pub fn mk_implies(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        assert_eq!(self.width(e0), 1, "implication is Boolean");
        self.mk_and(e0, e1.invert()).invert()
    }

    /// Boolean equivalence; one-bit operands only.
    pub fn mk_iff(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        assert_eq!(self.width(e0), 1, "equivalence is Boolean");
        self.mk_eq(e0, e1)
    }

    /// Disequality.
    pub fn mk_ne(&mut self, e0: Edge, e1: Edge) -> Edge {
        self.mk_eq(e0, e1).invert()
    }

    /// Two's-complement negation: `add(not a, 1)`.
    pub fn mk_neg(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        let one = self.mk_one(self.get(e).sort);
        let result = self.mk_add(e.invert(), one);
        self.release(one);
        result
    }

    /// Subtraction: `add(a, neg b)`.
    pub fn mk_sub(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let neg = self.mk_neg(e1);
        let result = self.mk_add(e0, neg);
        self.release(neg);
        result
    }

    /// Increment by one.
    pub fn mk_inc(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        let one = self.mk_one(self.get(e).sort);
        let result = self.mk_add(e, one);
        self.release(one);
        result
    }

    /// Decrement by one.
    pub fn mk_dec(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        let one = self.mk_one(self.get(e).sort);
        let result = self.mk_sub(e, one);
        self.release(one);
        result
    }

    /// Zero extension by `width` bits.
    pub fn mk_uext(&mut self, e: Edge, width: u32) -> Edge {
        let e = self.simplify(e);
        if width == 0 {
            return self.copy(e);
        }
        let sort = self.sorts.bitvec(width);
        let zero = self.mk_zero(sort);
        let result = self.mk_concat(zero, e);
        self.release(zero);
        result
    }

    /// Sign extension by `width` bits: the top bit selects the padding.
    pub fn mk_sext(&mut self, e: Edge, width: u32) -> Edge {
        let e = self.simplify(e);
        if width == 0 {
            return self.copy(e);
        }
        let sort = self.sorts.bitvec(width);
        let zero = self.mk_zero(sort);
        let ones = self.mk_ones(sort);
        let msb = self.width(e) - 1;
        let sign = self.mk_slice(e, msb, msb);
        let pad = self.mk_cond(sign, ones, zero);
        let result = self.mk_concat(pad, e);
        self.release(zero);
        self.release(ones);
        self.release(sign);
        self.release(pad);
        result
    }

    /// Arithmetic shift right: case split on the sign bit, shifting the
    /// complement for negative values.
    pub fn mk_sra(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let msb = self.width(e0) - 1;
        let sign = self.mk_slice(e0, msb, msb);
        let srl_pos = self.mk_srl(e0, e1);
        let srl_neg = self.mk_srl(e0.invert(), e1);
        let result = self.mk_cond(sign, srl_neg.invert(), srl_pos);
        self.release(sign);
        self.release(srl_pos);
        self.release(srl_neg);
        result
    }

    /// Rotate left: shift both ways and merge.
    pub fn mk_rol(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let sll = self.mk_sll(e0, e1);
        let neg = self.mk_neg(e1);
        let srl = self.mk_srl(e0, neg);
        let result = self.mk_or(sll, srl);
        self.release(sll);
        self.release(neg);
        self.release(srl);
        result
    }

    /// Rotate right: shift both ways and merge.
    pub fn mk_ror(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let srl = self.mk_srl(e0, e1);
        let neg = self.mk_neg(e1);
        let sll = self.mk_sll(e0, neg);
        let result = self.mk_or(srl, sll);
        self.release(srl);
        self.release(neg);
        self.release(sll);
        result
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    /// Unsigned less-or-equal: `not(ult(b, a))`.
    pub fn mk_ulte(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_ult(e1, e0).invert()
    }

    /// Unsigned greater-than.
    pub fn mk_ugt(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_ult(e1, e0)
    }

    /// Unsigned greater-or-equal.
    pub fn mk_ugte(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_ult(e0, e1).invert()
    }

    /// Signed less-than: sign-bit case analysis over the unsigned
    /// comparison of the remainders.
    pub fn mk_slt(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        if width == 1 {
            return self.mk_and(e0, e1.invert());
        }
        let s0 = self.mk_slice(e0, width - 1, width - 1);
        let s1 = self.mk_slice(e1, width - 1, width - 1);
        let r0 = self.mk_slice(e0, width - 2, 0);
        let r1 = self.mk_slice(e1, width - 2, 0);
        let ult = self.mk_ult(r0, r1);
        let determined_by_sign = self.mk_and(s0, s1.invert());
        let l = self.copy(determined_by_sign);
        let r = self.mk_and(s0.invert(), s1);
        let eq_sign = self.mk_and(l.invert(), r.invert());
        let eq_sign_and_ult = self.mk_and(eq_sign, ult);
        let result = self.mk_or(determined_by_sign, eq_sign_and_ult);
        self.release(s0);
        self.release(s1);
        self.release(r0);
        self.release(r1);
        self.release(ult);
        self.release(determined_by_sign);
        self.release(l);
        self.release(r);
        self.release(eq_sign);
        self.release(eq_sign_and_ult);
        result
    }

    /// Signed less-or-equal.
    pub fn mk_slte(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_slt(e1, e0).invert()
    }

    /// Signed greater-than.
    pub fn mk_sgt(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_slt(e1, e0)
    }

    /// Signed greater-or-equal.
    pub fn mk_sgte(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        self.mk_slt(e0, e1).invert()
    }

    // ------------------------------------------------------------------
    // Overflow predicates
    // ------------------------------------------------------------------

    /// Unsigned addition overflow: the carry out of a one-bit-extended
    /// addition.
    pub fn mk_uaddo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        let x0 = self.mk_uext(e0, 1);
        let x1 = self.mk_uext(e1, 1);
        let add = self.mk_add(x0, x1);
        let result = self.mk_slice(add, width, width);
        self.release(x0);
        self.release(x1);
        self.release(add);
        result
    }

    /// Signed addition overflow: both operands share a sign the sum does
    /// not.
    pub fn mk_saddo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        let sign0 = self.mk_slice(e0, width - 1, width - 1);
        let sign1 = self.mk_slice(e1, width - 1, width - 1);
        let add = self.mk_add(e0, e1);
        let sign_result = self.mk_slice(add, width - 1, width - 1);
        let both_neg = self.mk_and(sign0, sign1);
        let neg_overflow = self.mk_and(both_neg, sign_result.invert());
        let both_pos = self.mk_and(sign0.invert(), sign1.invert());
        let pos_overflow = self.mk_and(both_pos, sign_result);
        let result = self.mk_or(neg_overflow, pos_overflow);
        self.release(both_neg);
        self.release(both_pos);
        self.release(neg_overflow);
        self.release(pos_overflow);
        self.release(add);
        self.release(sign0);
        self.release(sign1);
        self.release(sign_result);
        result
    }

    /// Unsigned subtraction overflow (borrow): the complemented carry of
    /// `a + not b + 1` over the extended width.
    pub fn mk_usubo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        let x0 = self.mk_uext(e0, 1);
        let x1 = self.mk_uext(e1.invert(), 1);
        let sort = self.sorts.bitvec(width + 1);
        let one = self.mk_one(sort);
        let add1 = self.mk_add(x1, one);
        let add2 = self.mk_add(x0, add1);
        let result = self.mk_slice(add2, width, width).invert();
        self.release(x0);
        self.release(x1);
        self.release(add1);
        self.release(add2);
        self.release(one);
        result
    }

    /// Signed subtraction overflow: operand signs differ and the result
    /// sign follows the subtrahend.
    pub fn mk_ssubo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        let sign0 = self.mk_slice(e0, width - 1, width - 1);
        let sign1 = self.mk_slice(e1, width - 1, width - 1);
        let sub = self.mk_sub(e0, e1);
        let sign_result = self.mk_slice(sub, width - 1, width - 1);
        let pos_neg = self.mk_and(sign0.invert(), sign1);
        let pos_overflow = self.mk_and(pos_neg, sign_result);
        let neg_pos = self.mk_and(sign0, sign1.invert());
        let neg_overflow = self.mk_and(neg_pos, sign_result.invert());
        let result = self.mk_or(pos_overflow, neg_overflow);
        self.release(pos_neg);
        self.release(neg_pos);
        self.release(pos_overflow);
        self.release(neg_overflow);
        self.release(sub);
        self.release(sign0);
        self.release(sign1);
        self.release(sign_result);
        result
    }

    /// Unsigned multiplication overflow: a prefix-or carry network plus
    /// the top bit of the extended product. Width one cannot overflow.
    pub fn mk_umulo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        if width == 1 {
            let sort = self.sorts.bool_sort();
            return self.mk_zero(sort);
        }

        let mut prefix: Vec<Edge> = Vec::with_capacity(width as usize - 1);
        let top = self.mk_slice(e1, width - 1, width - 1);
        prefix.push(top);
        for i in 1..width - 1 {
            let slice = self.mk_slice(e1, width - 1 - i, width - 1 - i);
            let or = self.mk_or(prefix[i as usize - 1], slice);
            self.release(slice);
            prefix.push(or);
        }

        let slice = self.mk_slice(e0, 1, 1);
        let mut result = self.mk_and(slice, prefix[0]);
        self.release(slice);
        for i in 1..width - 1 {
            let slice = self.mk_slice(e0, i + 1, i + 1);
            let and = self.mk_and(slice, prefix[i as usize]);
            let or = self.mk_or(result, and);
            self.release(slice);
            self.release(and);
            self.release(result);
            result = or;
        }

        let x0 = self.mk_uext(e0, 1);
        let x1 = self.mk_uext(e1, 1);
        let mul = self.mk_mul(x0, x1);
        let msb = self.mk_slice(mul, width, width);
        let or = self.mk_or(result, msb);
        self.release(x0);
        self.release(x1);
        self.release(mul);
        self.release(msb);
        self.release(result);
        for p in prefix {
            self.release(p);
        }
        or
    }

    /// Signed multiplication overflow. Width one overflows exactly for
    /// `-1 * -1`; width two checks the top two product bits; larger
    /// widths run the carry network over sign-normalized operands.
    pub fn mk_smulo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        if width == 1 {
            return self.mk_and(e0, e1);
        }
        if width == 2 {
            let sext0 = self.mk_sext(e0, 1);
            let sext1 = self.mk_sext(e1, 1);
            let mul = self.mk_mul(sext0, sext1);
            let msb = self.mk_slice(mul, width, width);
            let below = self.mk_slice(mul, width - 1, width - 1);
            let result = self.mk_xor(msb, below);
            self.release(sext0);
            self.release(sext1);
            self.release(mul);
            self.release(msb);
            self.release(below);
            return result;
        }

        let sign0 = self.mk_slice(e0, width - 1, width - 1);
        let sign1 = self.mk_slice(e1, width - 1, width - 1);
        let sext_sign0 = self.mk_sext(sign0, width - 1);
        let sext_sign1 = self.mk_sext(sign1, width - 1);
        let norm0 = self.mk_xor(e0, sext_sign0);
        let norm1 = self.mk_xor(e1, sext_sign1);

        let mut prefix: Vec<Edge> = Vec::with_capacity(width as usize - 2);
        let top = self.mk_slice(norm1, width - 2, width - 2);
        prefix.push(top);
        for i in 1..width - 2 {
            let slice = self.mk_slice(norm1, width - 2 - i, width - 2 - i);
            let or = self.mk_or(prefix[i as usize - 1], slice);
            self.release(slice);
            prefix.push(or);
        }

        let slice = self.mk_slice(norm0, 1, 1);
        let mut result = self.mk_and(slice, prefix[0]);
        self.release(slice);
        for i in 1..width - 2 {
            let slice = self.mk_slice(norm0, i + 1, i + 1);
            let and = self.mk_and(slice, prefix[i as usize]);
            let or = self.mk_or(result, and);
            self.release(slice);
            self.release(and);
            self.release(result);
            result = or;
        }

        let sext0 = self.mk_sext(e0, 1);
        let sext1 = self.mk_sext(e1, 1);
        let mul = self.mk_mul(sext0, sext1);
        let msb = self.mk_slice(mul, width, width);
        let below = self.mk_slice(mul, width - 1, width - 1);
        let xor = self.mk_xor(msb, below);
        let or = self.mk_or(result, xor);
        self.release(sext0);
        self.release(sext1);
        self.release(sign0);
        self.release(sign1);
        self.release(sext_sign0);
        self.release(sext_sign1);
        self.release(norm0);
        self.release(norm1);
        self.release(mul);
        self.release(msb);
        self.release(below);
        self.release(xor);
        self.release(result);
        for p in prefix {
            self.release(p);
        }
        or
    }

    /// Signed division overflow: exactly `INT_MIN / -1`.
    pub fn mk_sdivo(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let int_min = self.mk_int_min(self.width(e0));
        let ones = self.mk_ones(self.get(e1).sort);
        let eq0 = self.mk_eq(e0, int_min);
        let eq1 = self.mk_eq(e1, ones);
        let result = self.mk_and(eq0, eq1);
        self.release(int_min);
        self.release(ones);
        self.release(eq0);
        self.release(eq1);
        result
    }

    // ------------------------------------------------------------------
    // Signed division and remainder
    // ------------------------------------------------------------------

    /// Signed division: normalize by absolute value, divide unsigned,
    /// restore the sign of the quotient.
    pub fn mk_sdiv(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        if width == 1 {
            return self.mk_and(e0.invert(), e1).invert();
        }
        let sign0 = self.mk_slice(e0, width - 1, width - 1);
        let sign1 = self.mk_slice(e1, width - 1, width - 1);
        let signs_differ = self.mk_xor(sign0, sign1);
        let neg0 = self.mk_neg(e0);
        let neg1 = self.mk_neg(e1);
        let abs0 = self.mk_cond(sign0, neg0, e0);
        let abs1 = self.mk_cond(sign1, neg1, e1);
        let udiv = self.mk_udiv(abs0, abs1);
        let neg_udiv = self.mk_neg(udiv);
        let result = self.mk_cond(signs_differ, neg_udiv, udiv);
        self.release(sign0);
        self.release(sign1);
        self.release(signs_differ);
        self.release(neg0);
        self.release(neg1);
        self.release(abs0);
        self.release(abs1);
        self.release(udiv);
        self.release(neg_udiv);
        result
    }

    /// Signed remainder: the result follows the sign of the dividend.
    pub fn mk_srem(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        if width == 1 {
            return self.mk_and(e0, e1.invert());
        }
        let sign0 = self.mk_slice(e0, width - 1, width - 1);
        let sign1 = self.mk_slice(e1, width - 1, width - 1);
        let neg0 = self.mk_neg(e0);
        let neg1 = self.mk_neg(e1);
        let abs0 = self.mk_cond(sign0, neg0, e0);
        let abs1 = self.mk_cond(sign1, neg1, e1);
        let urem = self.mk_urem(abs0, abs1);
        let neg_urem = self.mk_neg(urem);
        let result = self.mk_cond(sign0, neg_urem, urem);
        self.release(sign0);
        self.release(sign1);
        self.release(neg0);
        self.release(neg1);
        self.release(abs0);
        self.release(abs1);
        self.release(urem);
        self.release(neg_urem);
        result
    }

    /// Signed modulo: the result follows the sign of the divisor. The
    /// four sign cases are built separately and merged; when the signs
    /// disagree and the remainder is nonzero, the divisor is added back.
    pub fn mk_smod(&mut self, e0: Edge, e1: Edge) -> Edge {
        let e0 = self.simplify(e0);
        let e1 = self.simplify(e1);
        let width = self.width(e0);
        let zero = self.mk_zero(self.get(e0).sort);
        let sign0 = self.mk_slice(e0, width - 1, width - 1);
        let sign1 = self.mk_slice(e1, width - 1, width - 1);
        let neg0 = self.mk_neg(e0);
        let neg1 = self.mk_neg(e1);
        let pos_pos = self.mk_and(sign0.invert(), sign1.invert());
        let pos_neg = self.mk_and(sign0.invert(), sign1);
        let neg_pos = self.mk_and(sign0, sign1.invert());
        let neg_neg = self.mk_and(sign0, sign1);
        let abs0 = self.mk_cond(sign0, neg0, e0);
        let abs1 = self.mk_cond(sign1, neg1, e1);
        let urem = self.mk_urem(abs0, abs1);
        let urem_is_zero = self.mk_eq(urem, zero);
        let neg_urem = self.mk_neg(urem);
        let add_neg = self.mk_add(neg_urem, e1);
        let add_pos = self.mk_add(urem, e1);
        let guarded_neg = self.mk_cond(urem_is_zero, zero, add_neg);
        let guarded_pos = self.mk_cond(urem_is_zero, zero, add_pos);
        let case1 = self.mk_cond(pos_pos, urem, zero);
        let case2 = self.mk_cond(neg_pos, guarded_neg, zero);
        let case3 = self.mk_cond(pos_neg, guarded_pos, zero);
        let case4 = self.mk_cond(neg_neg, neg_urem, zero);
        let or1 = self.mk_or(case1, case2);
        let or2 = self.mk_or(case3, case4);
        let result = self.mk_or(or1, or2);
        self.release(zero);
        self.release(sign0);
        self.release(sign1);
        self.release(neg0);
        self.release(neg1);
        self.release(abs0);
        self.release(abs1);
        self.release(urem_is_zero);
        self.release(case1);
        self.release(case2);
        self.release(case3);
        self.release(case4);
        self.release(urem);
        self.release(neg_urem);
        self.release(add_neg);
        self.release(add_pos);
        self.release(guarded_neg);
        self.release(guarded_pos);
        self.release(or1);
        self.release(or2);
        self.release(pos_pos);
        self.release(pos_neg);
        self.release(neg_pos);
        self.release(neg_neg);
        result
    }

    // ------------------------------------------------------------------
    // Reductions
    // ------------------------------------------------------------------

    /// Or-reduction: `not(eq(a, 0))`.
    pub fn mk_redor(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        let zero = self.mk_zero(self.get(e).sort);
        let result = self.mk_eq(e, zero).invert();
        self.release(zero);
        result
    }

    /// And-reduction: `eq(a, ones)`.
    pub fn mk_redand(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        let ones = self.mk_ones(self.get(e).sort);
        let result = self.mk_eq(e, ones);
        self.release(ones);
        result
    }

    /// Xor-reduction: iterated xor over the individual bits.
    pub fn mk_redxor(&mut self, e: Edge) -> Edge {
        let e = self.simplify(e);
        let width = self.width(e);
        let mut result = self.mk_slice(e, 0, 0);
        for i in 1..width {
            let slice = self.mk_slice(e, i, i);
            let xor = self.mk_xor(result, slice);
            self.release(slice);
            self.release(result);
            result = xor;
        }
        result
    }

    // ------------------------------------------------------------------
    // N-ary helpers
    // ------------------------------------------------------------------

    /// Left fold of conjunction over a nonempty list.
    pub fn mk_and_n(&mut self, args: &[Edge]) -> Edge {
        assert!(!args.is_empty(), "empty conjunction");
        let mut result: Option<Edge> = None;
        for &arg in args {
            result = Some(match result {
                None => self.copy(arg),
                Some(acc) => {
                    let next = self.mk_and(arg, acc);
                    self.release(acc);
                    next
                }
            });
        }
        result.expect("nonempty fold")
    }
}
