//! Scenario tests for constructors, rewriting, parent lists and proxies.

use oxibv::{BitVector, Edge, ExprManager, NodeKind};

fn bv8(em: &mut ExprManager) -> oxibv::SortId {
    em.sorts.bitvec(8)
}

#[test]
fn and_of_equal_operands_rewrites_to_operand() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let and = em.mk_and(x, x);
    assert_eq!(and, x);
    em.release(and);
    em.release(x);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn and_of_equal_operands_without_rewriting() {
    let mut em = ExprManager::new();
    em.options.rewrite_level = 0;
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let and = em.mk_and(x, x);
    assert_ne!(and, x);
    assert_eq!(em.get(and).kind(), NodeKind::And);
    assert_eq!(em.get(and).child(0), x);
    assert_eq!(em.get(and).child(1), x);
    // Canonical operand order makes both argument orders hit this node.
    let and2 = em.mk_and(x, x);
    assert_eq!(and, and2);
    em.release(and2);
    em.release(and);
    em.release(x);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn and_with_complement_is_zero() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let not_x = em.mk_not(x);
    let and = em.mk_and(x, not_x);
    assert_eq!(em.const_value(and).cloned(), Some(BitVector::zeros(8)));
    em.release(and);
    em.release(not_x);
    em.release(x);
}

#[test]
fn sub_of_equal_operands_without_rewriting_builds_add_chain() {
    let mut em = ExprManager::new();
    em.options.rewrite_level = 0;
    let sort = em.sorts.bitvec(4);
    let x = em.mk_var(sort, Some("x"));
    let sub = em.mk_sub(x, x);

    // add(x, add(not x, 1)): the variable, one constant node (the
    // complement-normalized one), and two add nodes.
    assert_eq!(em.live_node_count(), 4);
    let outer = em.get(sub);
    assert_eq!(outer.kind(), NodeKind::Add);
    assert_eq!(outer.child(0), x);
    let inner = em.get(outer.child(1));
    assert_eq!(inner.kind(), NodeKind::Add);
    assert_eq!(inner.child(0), x.invert());
    assert_eq!(em.const_value(inner.child(1)).cloned(), Some(BitVector::one(4)));

    em.release(sub);
    em.release(x);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn cond_with_equal_arms_rewrites_to_arm() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let bool_sort = em.sorts.bool_sort();
    let c = em.mk_var(bool_sort, Some("c"));
    let t = em.mk_var(sort, Some("t"));
    let cond = em.mk_cond(c, t, t);
    assert_eq!(cond, t);
    em.release(cond);
    em.release(c);
    em.release(t);
}

#[test]
fn cond_with_equal_arms_without_rewriting_builds_node() {
    let mut em = ExprManager::new();
    em.options.rewrite_level = 0;
    let sort = bv8(&mut em);
    let bool_sort = em.sorts.bool_sort();
    let c = em.mk_var(bool_sort, Some("c"));
    let t = em.mk_var(sort, Some("t"));
    let cond = em.mk_cond(c, t, t);
    assert_ne!(cond, t);
    assert_eq!(em.get(cond).kind(), NodeKind::Cond);
    em.release(cond);
    em.release(c);
    em.release(t);
}

#[test]
fn write_as_update_node() {
    let mut em = ExprManager::new();
    let bv8 = em.sorts.bitvec(8);
    let arr_sort = em.sorts.array(bv8, bv8);
    let a = em.mk_array(arr_sort, Some("a"));
    let i = em.mk_unsigned(0x01, bv8);
    let v = em.mk_unsigned(0xff, bv8);

    let stored = em.mk_write(a, i, v);
    let node = em.get(stored);
    assert_eq!(node.kind(), NodeKind::Update);
    assert!(node.is_array());
    assert_eq!(node.child(0), a);
    assert_eq!(node.child(2), v);
    let args = em.get(node.child(1));
    assert_eq!(args.kind(), NodeKind::Args);
    assert_eq!(args.child(0), i);

    em.release(stored);
    em.release(v);
    em.release(i);
    em.release(a);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn write_as_store_lambda_seeds_static_rho() {
    let mut em = ExprManager::new();
    em.options.set("fun-store-lambdas", 1).unwrap();
    let bv8 = em.sorts.bitvec(8);
    let arr_sort = em.sorts.array(bv8, bv8);
    let a = em.mk_array(arr_sort, Some("a"));
    let i = em.mk_unsigned(0x01, bv8);
    let v = em.mk_unsigned(0xff, bv8);

    let stored = em.mk_write(a, i, v);
    let node = em.get(stored);
    assert_eq!(node.kind(), NodeKind::Lambda);
    assert!(node.is_array());

    let rho = node.static_rho().expect("store lambda seeds its rho");
    assert_eq!(rho.len(), 1);
    let (&args_id, &value) = rho.iter().next().unwrap();
    assert_eq!(value, v);
    let args = em.node(args_id);
    assert_eq!(args.kind(), NodeKind::Args);
    assert_eq!(args.child(0), i);

    em.release(stored);
    em.release(v);
    em.release(i);
    em.release(a);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn parent_lists_track_every_consumer() {
    let mut em = ExprManager::new();
    em.options.rewrite_level = 0;
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let y = em.mk_var(sort, Some("y"));
    let and = em.mk_and(x, y);
    let add = em.mk_add(x, y);
    let both = em.mk_mul(x, x);

    let parents: Vec<_> = em.parents_of(x.node()).collect();
    assert_eq!(parents.len() as u32, em.get(x).parent_count());
    // mul(x, x) consumes x through two distinct slots.
    assert_eq!(parents.len(), 4);
    for pr in &parents {
        let parent = em.node(pr.parent);
        assert_eq!(parent.child(pr.slot as usize).node(), x.node());
    }
    // Each (parent, slot) pair occurs exactly once.
    let mut seen = parents.clone();
    seen.sort_by_key(|p| (p.parent.get(), p.slot));
    seen.dedup();
    assert_eq!(seen.len(), parents.len());

    em.release(both);
    em.release(add);
    em.release(and);
    em.release(y);
    em.release(x);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn apply_parents_append_while_others_prepend() {
    let mut em = ExprManager::new();
    let bv8 = em.sorts.bitvec(8);
    let arr_sort = em.sorts.array(bv8, bv8);
    let f = em.mk_array(arr_sort, Some("f"));
    let i = em.mk_var(bv8, Some("i"));
    let j = em.mk_var(bv8, Some("j"));

    let first = em.mk_read(f, i);
    let second = em.mk_read(f, j);
    let applies: Vec<_> = em.parents_of(f.node()).collect();
    assert_eq!(applies.len(), 2);
    // Appended: creation order is preserved for apply parents.
    assert_eq!(applies[0].parent, first.node());
    assert_eq!(applies[1].parent, second.node());

    em.release(second);
    em.release(first);
    em.release(j);
    em.release(i);
    em.release(f);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn proxy_conversion_keeps_handles_valid() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let y = em.mk_var(sort, Some("y"));
    let a = em.mk_and(x, y);

    em.set_simplified(a, x);
    assert_eq!(em.get(a).kind(), NodeKind::Proxy);
    assert_eq!(em.simplify(a), x);
    // Constructors chase the chain: a proxy is never a child.
    let b = em.mk_add(a, y);
    assert_eq!(em.get(b).kind(), NodeKind::Add);
    assert_eq!(em.get(b).child(0), x);
    assert_eq!(em.get(b).child(1), y);

    em.release(b);
    em.release(a);
    em.release(x);
    em.release(y);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn simplified_chains_compress_to_the_representative() {
    let mut em = ExprManager::new();
    em.options.rewrite_level = 0;
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let y = em.mk_var(sort, Some("y"));
    let a = em.mk_and(x, y);
    let b = em.mk_add(x, y);

    em.set_simplified(a, b);
    em.set_simplified(b, x);
    assert_eq!(em.simplify(a), x);
    assert_eq!(em.simplify(b), x);
    // After compression, the first hop points at the representative.
    assert_eq!(em.get(a).simplified(), Some(x));

    em.release(b);
    em.release(a);
    em.release(x);
    em.release(y);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn unique_table_growth_preserves_sharing() {
    let mut em = ExprManager::new();
    let sort = em.sorts.bitvec(16);
    let mut handles: Vec<Edge> = Vec::new();
    for value in 0..200u64 {
        handles.push(em.mk_unsigned(value * 2, sort));
    }
    // Re-probing after several growths still hits the same nodes.
    for (value, &h) in handles.iter().enumerate() {
        let again = em.mk_unsigned(value as u64 * 2, sort);
        assert_eq!(again, h);
        em.release(again);
    }
    for h in handles {
        em.release(h);
    }
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn long_copy_release_sequence_is_stable() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let y = em.mk_var(sort, Some("y"));
    let node = em.mk_add(x, y);
    let refs = em.get(node).refs();
    let live = em.live_node_count();
    for _ in 0..10_000 {
        let held = em.copy(node);
        em.release(held);
    }
    assert_eq!(em.get(node).refs(), refs);
    assert_eq!(em.live_node_count(), live);
    em.release(node);
    em.release(y);
    em.release(x);
}

#[test]
fn external_refs_audit_the_client_boundary() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    em.inc_ext_ref(x);
    assert_eq!(em.external_ref_count(), 1);
    assert_eq!(em.get(x).ext_refs(), 1);
    em.dec_ext_ref(x);
    assert_eq!(em.external_ref_count(), 0);
    em.release(x);
    assert_eq!(em.live_node_count(), 0);
}

#[test]
fn symbols_resolve_both_ways() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    assert_eq!(em.symbol(x), Some("x"));
    assert_eq!(em.node_by_symbol("x"), Some(x));
    assert_eq!(em.node_by_symbol("y"), None);

    em.set_symbol(x, "renamed");
    assert_eq!(em.symbol(x), Some("renamed"));
    assert_eq!(em.node_by_symbol("x"), None);

    em.release(x);
    assert_eq!(em.node_by_symbol("renamed"), None);
}

#[test]
fn input_ids_negate_through_inversion() {
    let mut em = ExprManager::new();
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    em.set_input_id(x, 7);
    assert_eq!(em.input_id(x), 7);
    assert_eq!(em.input_id(x.invert()), -7);
    em.release(x);
}

#[test]
fn true_and_false_share_one_node() {
    let mut em = ExprManager::new();
    let t = em.mk_true();
    let f = em.mk_false();
    assert_eq!(t, f.invert());
    assert_eq!(em.live_node_count(), 1);
    em.release(t);
    em.release(f);
}

#[test]
fn operator_stats_follow_population() {
    let mut em = ExprManager::new();
    em.options.rewrite_level = 0;
    let sort = bv8(&mut em);
    let x = em.mk_var(sort, Some("x"));
    let y = em.mk_var(sort, Some("y"));
    let a = em.mk_and(x, y);
    assert_eq!(em.stats().live(NodeKind::And), 1);
    assert_eq!(em.stats().live(NodeKind::BvVar), 2);
    em.release(a);
    assert_eq!(em.stats().live(NodeKind::And), 0);
    assert_eq!(em.stats().peak(NodeKind::And), 1);
    em.release(x);
    em.release(y);
}

#[test]
#[should_panic(expected = "stale node id")]
fn releasing_a_dead_handle_panics() {
    let mut em = ExprManager::new();
    let sort = em.sorts.bitvec(8);
    let x = em.mk_var(sort, None);
    em.release(x);
    em.release(x);
}

#[test]
#[should_panic(expected = "operand widths differ")]
fn width_mismatch_is_a_contract_violation() {
    let mut em = ExprManager::new();
    let a = em.sorts.bitvec(8);
    let b = em.sorts.bitvec(4);
    let x = em.mk_var(a, None);
    let y = em.mk_var(b, None);
    em.mk_add(x, y);
}

#[test]
#[should_panic(expected = "power of two")]
fn bad_shift_width_is_a_contract_violation() {
    let mut em = ExprManager::new();
    let a = em.sorts.bitvec(6);
    let b = em.sorts.bitvec(3);
    let x = em.mk_var(a, None);
    let s = em.mk_var(b, None);
    em.mk_sll(x, s);
}
