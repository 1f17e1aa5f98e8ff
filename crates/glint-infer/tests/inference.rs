//! Black-box integration tests over hand-built ASTs, covering §8's
//! invariants and end-to-end scenarios. Each test builds a small program
//! with `glint_ast::build`, runs `glint_infer::infer`, and asserts on the
//! resulting type cells -- the same `check_source`-by-AST style the
//! teacher's `tests/sum_types.rs` uses, minus a real parser front end.

use glint_ast::build::*;
use glint_common::NodeId;
use glint_infer::session::InferSession;
use glint_infer::{infer, TypeError};
use glint_types::{Primitive, Restriction, Ty};

fn result_type(session: &InferSession, node: NodeId) -> Ty {
    session.type_of(node)
}

// ── Scenario 1: `a = 1 || 'c'` widens to a canonical Union ──────────────

#[test]
fn or_of_mismatched_primitives_widens_to_union() {
    let mut session = InferSession::new();
    let one = int(&mut session.ast, 1);
    let c = char_(&mut session.ast, 'c');
    let or_expr = or(&mut session.ast, one, c);
    let a = var(&mut session.ast, "a");
    let assign_node = assign(&mut session.ast, a, or_expr);
    let prog = program(&mut session.ast, vec![assign_node]);

    infer(&mut session, prog);

    assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
    let ty = result_type(&session, a);
    match &ty {
        Ty::Union(members) => {
            assert_eq!(members.len(), 2);
            assert!(members.contains(&Ty::Primitive(Primitive::Int32)));
            assert!(members.contains(&Ty::Primitive(Primitive::Char)));
        }
        other => panic!("expected Union{{Int32, Char}}, got {other}"),
    }
    assert!(ty.is_canonical());
}

// ── Scenario 2: Hierarchy-receiver dispatch, distinct overrides ────────

#[test]
fn hierarchy_dispatch_unions_overridden_results_and_counts_targets() {
    let mut session = InferSession::new();
    let root = session.registry.root();

    let foo = session.registry.define_class(root, "Foo", None, false, false);
    let foo_body = int(&mut session.ast, 1);
    let foo_method = method_def(&mut session.ast, "foo", vec![], None, foo_body);
    glint_infer::visitor::register_method_def(&mut session, foo, foo_method);

    let bar = session.registry.define_class(root, "Bar", Some(foo), false, false);
    let bar_body = float(&mut session.ast, 1.5);
    let bar_method = method_def(&mut session.ast, "foo", vec![], None, bar_body);
    glint_infer::visitor::register_method_def(&mut session, bar, bar_method);

    // `(Foo.new || Bar.new).foo`
    let foo_const = var(&mut session.ast, "Foo");
    let foo_new = call(&mut session.ast, Some(foo_const), "new", vec![]);
    let bar_const = var(&mut session.ast, "Bar");
    let bar_new = call(&mut session.ast, Some(bar_const), "new", vec![]);
    let receiver = or(&mut session.ast, foo_new, bar_new);
    let call_node = call(&mut session.ast, Some(receiver), "foo", vec![]);
    let prog = program(&mut session.ast, vec![call_node]);

    infer(&mut session, prog);

    assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
    let ty = result_type(&session, call_node);
    match &ty {
        Ty::Union(members) => {
            assert_eq!(members.len(), 2);
            assert!(members.contains(&Ty::Primitive(Primitive::Int32)));
            assert!(members.contains(&Ty::Primitive(Primitive::Float64)));
        }
        other => panic!("expected Union{{Int32, Float64}}, got {other}"),
    }
    assert_eq!(session.target_defs.get(&call_node).map(Vec::len), Some(2));
}

// ── Scenario 3: Hierarchy collapse over an open superclass's siblings ──

#[test]
fn sibling_instances_collapse_to_hierarchy() {
    let mut session = InferSession::new();
    let root = session.registry.root();
    let foo = session.registry.define_class(root, "Foo", None, false, false);
    let bar = session.registry.define_class(root, "Bar", Some(foo), false, false);
    let baz = session.registry.define_class(root, "Baz", Some(foo), false, false);
    let _ = (bar, baz);

    let foo_const = var(&mut session.ast, "Foo");
    let foo_new = call(&mut session.ast, Some(foo_const), "new", vec![]);
    let bar_const = var(&mut session.ast, "Bar");
    let bar_new = call(&mut session.ast, Some(bar_const), "new", vec![]);
    let baz_const = var(&mut session.ast, "Baz");
    let baz_new = call(&mut session.ast, Some(baz_const), "new", vec![]);

    let or1 = or(&mut session.ast, foo_new, bar_new);
    let or2 = or(&mut session.ast, or1, baz_new);
    let a = var(&mut session.ast, "a");
    let assign_node = assign(&mut session.ast, a, or2);
    let prog = program(&mut session.ast, vec![assign_node]);

    infer(&mut session, prog);

    assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
    assert_eq!(result_type(&session, a), Ty::Hierarchy(foo));
}

// ── Scenario 4: instance-var hoisting to the writing ancestor ──────────

#[test]
fn instance_var_written_by_both_hoists_to_superclass() {
    let mut session = InferSession::new();
    let root = session.registry.root();

    // class Var < Base; def x=(x); @x = x; end; end
    let param_x = var(&mut session.ast, "x");
    let ivar_x = ivar(&mut session.ast, "x");
    let write = assign(&mut session.ast, ivar_x, param_x);
    let setter = method_def(
        &mut session.ast,
        "x=",
        vec![param("x", None)],
        None,
        write,
    );
    let var_class_body = vec![setter];
    let var_class = class_def(&mut session.ast, "Var", Some("Base"), false, var_class_body);

    // class Base; def x=(x); @x = x; end; end
    let param_x2 = var(&mut session.ast, "x");
    let ivar_x2 = ivar(&mut session.ast, "x");
    let write2 = assign(&mut session.ast, ivar_x2, param_x2);
    let setter2 = method_def(&mut session.ast, "x=", vec![param("x", None)], None, write2);
    let base_class = class_def(&mut session.ast, "Base", None, false, vec![setter2]);

    // v = Var.new; v.x = 1
    let var_const = var(&mut session.ast, "Var");
    let var_new = call(&mut session.ast, Some(var_const), "new", vec![]);
    let v = var(&mut session.ast, "v");
    let v_assign = assign(&mut session.ast, v, var_new);
    let v_read = var(&mut session.ast, "v");
    let one = int(&mut session.ast, 1);
    let setter_call = call(&mut session.ast, Some(v_read), "x=", vec![one]);

    // `Base` must be registered before `Var` re-resolves its superclass, so
    // declare it first in program order.
    let prog = program(&mut session.ast, vec![base_class, var_class, v_assign, setter_call]);

    infer(&mut session, prog);

    assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
    let base_id = session.registry.resolve_path(root, "Base").unwrap();
    let var_id = session.registry.resolve_path(root, "Var").unwrap();
    assert!(session.registry.class(var_id).instance_vars.is_empty());
    let base_ivar = *session.registry.class(base_id).instance_vars.get("x").unwrap();
    match session.type_of(base_ivar) {
        Ty::Union(members) => {
            assert_eq!(members.len(), 2);
            assert!(members.contains(&Ty::nil()));
            assert!(members.contains(&Ty::Primitive(Primitive::Int32)));
        }
        other => panic!("expected Union{{Nil, Int32}}, got {other}"),
    }
}

// ── Scenario 5: begin/rescue, both arms join to the same primitive ─────

#[test]
fn rescue_and_body_join_to_same_result_type() {
    let mut session = InferSession::new();
    let two = int(&mut session.ast, 1);
    let three = int(&mut session.ast, 2);
    let rescue = rescue_clause(vec![], None, three);
    let begin_node = begin(&mut session.ast, two, vec![rescue], None, None);
    let prog = program(&mut session.ast, vec![begin_node]);

    infer(&mut session, prog);

    assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
    assert_eq!(result_type(&session, begin_node), Ty::Primitive(Primitive::Int32));
}

// ── Scenario 6: hash literal `of` annotation resolves to Hash(K, V) ────

#[test]
fn hash_of_annotation_resolves_generic_instance() {
    let mut session = InferSession::new();
    let key = int(&mut session.ast, 1);
    let value = float(&mut session.ast, 1.5);
    let hash_node = hash_of(
        &mut session.ast,
        vec![(key, value)],
        Restriction::Path("Int32".to_string()),
        Restriction::Path("Float64".to_string()),
    );
    let prog = program(&mut session.ast, vec![hash_node]);

    infer(&mut session, prog);

    assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
    match result_type(&session, hash_node) {
        Ty::Generic(class_id, args) => {
            assert_eq!(class_id, session.builtins.hash);
            assert_eq!(args, vec![Ty::Primitive(Primitive::Int32), Ty::Primitive(Primitive::Float64)]);
        }
        other => panic!("expected Hash(Int32, Float64), got {other}"),
    }
}

// ── Invariant 1: monotonicity / replay stability ────────────────────────

#[test]
fn replaying_inference_reaches_the_same_fixpoint() {
    let mut session = InferSession::new();
    let one = int(&mut session.ast, 1);
    let c = char_(&mut session.ast, 'c');
    let or_expr = or(&mut session.ast, one, c);
    let a = var(&mut session.ast, "a");
    let assign_node = assign(&mut session.ast, a, or_expr);
    let prog = program(&mut session.ast, vec![assign_node]);

    infer(&mut session, prog);
    let first = result_type(&session, a);

    let mut session2 = InferSession::new();
    let one2 = int(&mut session2.ast, 1);
    let c2 = char_(&mut session2.ast, 'c');
    let or_expr2 = or(&mut session2.ast, one2, c2);
    let a2 = var(&mut session2.ast, "a");
    let assign_node2 = assign(&mut session2.ast, a2, or_expr2);
    let prog2 = program(&mut session2.ast, vec![assign_node2]);
    infer(&mut session2, prog2);
    let second = result_type(&session2, a2);

    assert_eq!(first, second);
}

// ── Invariant 6: abstract-class exemption ───────────────────────────────

#[test]
fn abstract_superclass_is_excluded_from_concrete_dispatch() {
    let mut session = InferSession::new();
    let root = session.registry.root();
    let shape = session.registry.define_class(root, "Shape", None, true, false);
    let circle = session.registry.define_class(root, "Circle", Some(shape), false, false);

    let body = int(&mut session.ast, 1);
    session.registry.define_method(circle, "area", vec![], None, None, body, true);

    let call_node = call(&mut session.ast, None, "area", vec![]);
    let result = glint_infer::resolver::resolve_call(&mut session, call_node, Some(Ty::Hierarchy(shape)), "area", &[]);

    assert_eq!(result, Ty::Primitive(Primitive::Int32));
    let targets = session.target_defs.get(&call_node).expect("one concrete target");
    assert_eq!(targets.len(), 1);
    assert_eq!(session.registry.method(targets[0]).owner, circle);
}

// ── Undefined-name diagnostics ───────────────────────────────────────────

#[test]
fn reading_an_unbound_name_raises_undefined_name() {
    let mut session = InferSession::new();
    let bogus = var(&mut session.ast, "totallyUndefined");
    let prog = program(&mut session.ast, vec![bogus]);

    infer(&mut session, prog);

    assert!(session.errors.iter().any(|e| matches!(e, TypeError::UndefinedName { name, .. } if name == "totallyUndefined")));
}
