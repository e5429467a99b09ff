//! Brute-force validation of the derived encodings at small widths.
//!
//! Every signed operator, overflow predicate, shift, extension and
//! reduction is applied to all constant operand pairs; constant folding
//! collapses the expansion to a constant, which is compared against a
//! direct two's-complement reference. This pins down the carry networks
//! that differ per width (umulo/smulo) and the sign-adjustment cases of
//! sdiv/srem/smod.

use oxibv::{BitVector, Edge, ExprManager};

fn to_signed(value: u64, width: u32) -> i64 {
    if (value >> (width - 1)) & 1 == 1 {
        value as i64 - (1i64 << width)
    } else {
        value as i64
    }
}

fn signed_min(width: u32) -> i64 {
    -(1i64 << (width - 1))
}

fn signed_max(width: u32) -> i64 {
    (1i64 << (width - 1)) - 1
}

fn expect_bool(em: &ExprManager, result: Edge, expected: bool) {
    let bits = em
        .const_value(result)
        .cloned()
        .expect("expansion folds to a constant");
    assert_eq!(bits.is_one(), expected);
}

fn expect_value(em: &ExprManager, result: Edge, expected: &BitVector) {
    let bits = em
        .const_value(result)
        .cloned()
        .expect("expansion folds to a constant");
    assert_eq!(&bits, expected);
}

/// Run `check` over every operand pair of every width in 1..=4.
fn for_all_pairs(check: impl Fn(&mut ExprManager, u32, u64, u64, Edge, Edge)) {
    for width in 1..=4u32 {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        for a in 0..1u64 << width {
            for b in 0..1u64 << width {
                let ca = em.mk_const(&BitVector::from_u64(a, width));
                let cb = em.mk_const(&BitVector::from_u64(b, width));
                check(&mut em, width, a, b, ca, cb);
                em.release(ca);
                em.release(cb);
            }
        }
        assert_eq!(em.live_node_count(), 0, "width {width} leaked nodes");
    }
}

#[test]
fn signed_comparisons() {
    for_all_pairs(|em, w, a, b, ca, cb| {
        let (sa, sb) = (to_signed(a, w), to_signed(b, w));
        let slt = em.mk_slt(ca, cb);
        expect_bool(em, slt, sa < sb);
        em.release(slt);
        let slte = em.mk_slte(ca, cb);
        expect_bool(em, slte, sa <= sb);
        em.release(slte);
        let sgt = em.mk_sgt(ca, cb);
        expect_bool(em, sgt, sa > sb);
        em.release(sgt);
        let sgte = em.mk_sgte(ca, cb);
        expect_bool(em, sgte, sa >= sb);
        em.release(sgte);
    });
}

#[test]
fn unsigned_comparisons() {
    for_all_pairs(|em, _w, a, b, ca, cb| {
        let ult = em.mk_ult(ca, cb);
        expect_bool(em, ult, a < b);
        em.release(ult);
        let ulte = em.mk_ulte(ca, cb);
        expect_bool(em, ulte, a <= b);
        em.release(ulte);
        let ugt = em.mk_ugt(ca, cb);
        expect_bool(em, ugt, a > b);
        em.release(ugt);
        let ugte = em.mk_ugte(ca, cb);
        expect_bool(em, ugte, a >= b);
        em.release(ugte);
    });
}

fn ref_sdiv(a: &BitVector, b: &BitVector) -> BitVector {
    let w = a.width();
    let sign = |x: &BitVector| x.bit(w - 1);
    let abs = |x: &BitVector| if sign(x) { x.bvneg() } else { x.clone() };
    let quotient = abs(a).bvudiv(&abs(b));
    if sign(a) != sign(b) {
        quotient.bvneg()
    } else {
        quotient
    }
}

fn ref_srem(a: &BitVector, b: &BitVector) -> BitVector {
    let w = a.width();
    let sign = |x: &BitVector| x.bit(w - 1);
    let abs = |x: &BitVector| if sign(x) { x.bvneg() } else { x.clone() };
    let remainder = abs(a).bvurem(&abs(b));
    if sign(a) {
        remainder.bvneg()
    } else {
        remainder
    }
}

fn ref_smod(a: &BitVector, b: &BitVector) -> BitVector {
    let w = a.width();
    let sign = |x: &BitVector| x.bit(w - 1);
    let abs = |x: &BitVector| if sign(x) { x.bvneg() } else { x.clone() };
    let remainder = abs(a).bvurem(&abs(b));
    match (sign(a), sign(b)) {
        (false, false) => remainder,
        (true, true) => remainder.bvneg(),
        (true, false) => {
            if remainder.is_zero() {
                remainder
            } else {
                remainder.bvneg().bvadd(b)
            }
        }
        (false, true) => {
            if remainder.is_zero() {
                remainder
            } else {
                remainder.bvadd(b)
            }
        }
    }
}

#[test]
fn signed_division_remainder_modulo() {
    for_all_pairs(|em, w, a, b, ca, cb| {
        let bva = BitVector::from_u64(a, w);
        let bvb = BitVector::from_u64(b, w);
        let sdiv = em.mk_sdiv(ca, cb);
        expect_value(em, sdiv, &ref_sdiv(&bva, &bvb));
        em.release(sdiv);
        let srem = em.mk_srem(ca, cb);
        expect_value(em, srem, &ref_srem(&bva, &bvb));
        em.release(srem);
        let smod = em.mk_smod(ca, cb);
        expect_value(em, smod, &ref_smod(&bva, &bvb));
        em.release(smod);
    });
}

#[test]
fn addition_and_subtraction_overflow() {
    for_all_pairs(|em, w, a, b, ca, cb| {
        let (sa, sb) = (to_signed(a, w), to_signed(b, w));
        let uaddo = em.mk_uaddo(ca, cb);
        expect_bool(em, uaddo, a + b >= 1 << w);
        em.release(uaddo);
        let usubo = em.mk_usubo(ca, cb);
        expect_bool(em, usubo, a < b);
        em.release(usubo);
        let saddo = em.mk_saddo(ca, cb);
        expect_bool(em, saddo, sa + sb < signed_min(w) || sa + sb > signed_max(w));
        em.release(saddo);
        let ssubo = em.mk_ssubo(ca, cb);
        expect_bool(em, ssubo, sa - sb < signed_min(w) || sa - sb > signed_max(w));
        em.release(ssubo);
    });
}

#[test]
fn multiplication_and_division_overflow() {
    for_all_pairs(|em, w, a, b, ca, cb| {
        let (sa, sb) = (to_signed(a, w), to_signed(b, w));
        let umulo = em.mk_umulo(ca, cb);
        expect_bool(em, umulo, a * b >= 1 << w);
        em.release(umulo);
        let smulo = em.mk_smulo(ca, cb);
        expect_bool(
            em,
            smulo,
            sa * sb < signed_min(w) || sa * sb > signed_max(w),
        );
        em.release(smulo);
        let sdivo = em.mk_sdivo(ca, cb);
        expect_bool(em, sdivo, sa == signed_min(w) && sb == -1);
        em.release(sdivo);
    });
}

#[test]
fn shifts_and_rotates() {
    for width in [2u32, 4] {
        let mut em = ExprManager::new();
        let sort = em.sorts.bitvec(width);
        let shift_sort = em.sorts.bitvec(width.trailing_zeros());
        for a in 0..1u64 << width {
            for sh in 0..u64::from(width) {
                let ca = em.mk_const(&BitVector::from_u64(a, width));
                let csh = em.mk_const(&BitVector::from_u64(sh, width.trailing_zeros()));
                let mask = (1u64 << width) - 1;

                let sra = em.mk_sra(ca, csh);
                let expected = ((to_signed(a, width) >> sh) as u64) & mask;
                expect_value(&em, sra, &BitVector::from_u64(expected, width));
                em.release(sra);

                let rol = em.mk_rol(ca, csh);
                let rolled = if sh == 0 {
                    a
                } else {
                    ((a << sh) | (a >> (u64::from(width) - sh))) & mask
                };
                expect_value(&em, rol, &BitVector::from_u64(rolled, width));
                em.release(rol);

                let ror = em.mk_ror(ca, csh);
                let rored = if sh == 0 {
                    a
                } else {
                    ((a >> sh) | (a << (u64::from(width) - sh))) & mask
                };
                expect_value(&em, ror, &BitVector::from_u64(rored, width));
                em.release(ror);

                em.release(ca);
                em.release(csh);
            }
        }
        assert_eq!(em.live_node_count(), 0);
    }
}

#[test]
fn extensions() {
    for width in 1..=4u32 {
        let mut em = ExprManager::new();
        for a in 0..1u64 << width {
            for ext in 0..=3u32 {
                let ca = em.mk_const(&BitVector::from_u64(a, width));
                let uext = em.mk_uext(ca, ext);
                expect_value(&em, uext, &BitVector::from_u64(a, width + ext));
                em.release(uext);

                let sext = em.mk_sext(ca, ext);
                let expected =
                    BitVector::from_i64(to_signed(a, width), width + ext);
                expect_value(&em, sext, &expected);
                em.release(sext);
                em.release(ca);
            }
        }
        assert_eq!(em.live_node_count(), 0);
    }
}

#[test]
fn reductions() {
    for width in 1..=5u32 {
        let mut em = ExprManager::new();
        for a in 0..1u64 << width {
            let ca = em.mk_const(&BitVector::from_u64(a, width));
            let redor = em.mk_redor(ca);
            expect_bool(&em, redor, a != 0);
            em.release(redor);
            let redand = em.mk_redand(ca);
            expect_bool(&em, redand, a == (1 << width) - 1);
            em.release(redand);
            let redxor = em.mk_redxor(ca);
            expect_bool(&em, redxor, a.count_ones() % 2 == 1);
            em.release(redxor);
            em.release(ca);
        }
        assert_eq!(em.live_node_count(), 0);
    }
}

#[test]
fn increments_decrements() {
    for_all_pairs(|em, w, a, _b, ca, _cb| {
        let inc = em.mk_inc(ca);
        expect_value(em, inc, &BitVector::from_u64(a + 1, w));
        em.release(inc);
        let dec = em.mk_dec(ca);
        expect_value(em, dec, &BitVector::from_u64(a.wrapping_sub(1), w));
        em.release(dec);
    });
}

#[test]
fn boolean_connectives() {
    let mut em = ExprManager::new();
    for a in [false, true] {
        for b in [false, true] {
            let ca = if a { em.mk_true() } else { em.mk_false() };
            let cb = if b { em.mk_true() } else { em.mk_false() };
            let implies = em.mk_implies(ca, cb);
            expect_bool(&em, implies, !a || b);
            em.release(implies);
            let iff = em.mk_iff(ca, cb);
            expect_bool(&em, iff, a == b);
            em.release(iff);
            let nand = em.mk_nand(ca, cb);
            expect_bool(&em, nand, !(a && b));
            em.release(nand);
            let nor = em.mk_nor(ca, cb);
            expect_bool(&em, nor, !(a || b));
            em.release(nor);
            let xnor = em.mk_xnor(ca, cb);
            expect_bool(&em, xnor, a == b);
            em.release(xnor);
            let ne = em.mk_ne(ca, cb);
            expect_bool(&em, ne, a != b);
            em.release(ne);
            em.release(ca);
            em.release(cb);
        }
    }
    assert_eq!(em.live_node_count(), 0);
}
