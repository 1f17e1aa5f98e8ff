//! The Call Resolver (§4.5): overload filtering, hierarchy fan-out,
//! instantiation caching, and re-resolution on argument widening.

use glint_ast::clone_subtree;
use glint_common::{ClassId, MethodId, NodeId, Span};
use glint_types::{Instantiation, InstantiationKey, Ty, TypeRegistry};

use crate::error::{CallStackFrame, TypeError};
use crate::graph;
use crate::session::InferSession;
use crate::visitor;

/// `C` and every transitive subclass that is not itself `abstract`, per
/// §3's "Hierarchy(C) ≡ Union of {C ∪ all transitive concrete subclasses
/// of C}".
fn concrete_descendants(registry: &TypeRegistry, c: ClassId) -> Vec<ClassId> {
    let mut out = Vec::new();
    let mut stack = vec![c];
    while let Some(id) = stack.pop() {
        if !registry.class(id).is_abstract {
            out.push(id);
        }
        stack.extend(registry.class(id).subclasses.iter().copied());
    }
    out
}

/// Flatten a receiver type into the concrete, single-class branches the
/// resolver dispatches to independently. A plain `Instance`/`Primitive`/
/// `Generic`/`Metaclass` is already one branch; `Hierarchy` and `Union`
/// fan out (recursively, since a union member can itself be a `Hierarchy`).
fn receiver_branches(registry: &TypeRegistry, ty: &Ty) -> Vec<Ty> {
    match ty {
        Ty::Hierarchy(c) => concrete_descendants(registry, *c).into_iter().map(Ty::Instance).collect(),
        Ty::Union(members) => members.iter().flat_map(|m| receiver_branches(registry, m)).collect(),
        other => vec![other.clone()],
    }
}

fn owner_class(session: &InferSession, ty: &Ty) -> Option<ClassId> {
    match ty {
        Ty::Instance(c) | Ty::Generic(c, _) | Ty::Hierarchy(c) | Ty::Metaclass(c) => Some(*c),
        Ty::Primitive(p) => session.builtins.class_for_primitive(*p),
    }
}

/// A body id no real method ever uses; marks a builtin operator overload
/// whose return type comes from `declared_return` instead of a traversal
/// (§4.5: "Primitive bodies... are opaque to inference").
fn is_primitive_owner(body: NodeId) -> bool {
    body == NodeId(u32::MAX)
}

/// Entry point from the visitor's `Call` wiring. `receiver_ty` is `None`
/// for an implicit-`self` call.
pub fn resolve_call(
    session: &mut InferSession,
    call_node: NodeId,
    receiver_ty: Option<Ty>,
    name: &str,
    arg_nodes: &[NodeId],
) -> Ty {
    for &arg in arg_nodes {
        let observers = session.call_arg_observers.entry(arg).or_default();
        if !observers.contains(&call_node) {
            observers.push(call_node);
        }
    }

    let receiver = receiver_ty.unwrap_or_else(|| session.current_self());
    let branches = receiver_branches(&session.registry, &receiver);
    let span = session.ast.node(call_node).span;
    // More than one concrete branch means a real hierarchy dispatch: every
    // branch that actually has the method establishes it as part of the
    // receiver's required interface, so a sibling branch that lacks it is
    // missing an abstract-class obligation (§7, §8 property 6) rather than
    // simply calling an undefined name.
    let is_dispatch = branches.len() > 1;
    let availability: Vec<bool> = branches
        .iter()
        .map(|b| owner_class(session, b).is_some_and(|c| !session.registry.lookup_methods(c, name).is_empty()))
        .collect();
    let any_found = availability.iter().any(|&found| found);

    let mut targets = Vec::new();
    for (branch, has_method) in branches.iter().zip(availability.iter()) {
        if is_dispatch && any_found && !has_method {
            if let Some(class_id) = owner_class(session, branch) {
                session.errors.push(TypeError::AbstractMethodMissing {
                    class_name: session.registry.class(class_id).name.clone(),
                    method: name.to_string(),
                    span,
                });
            }
            continue;
        }
        let (_, method_id) = resolve_direct(session, call_node, branch, name, arg_nodes, span);
        if let Some(id) = method_id {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
    }
    if !targets.is_empty() {
        session.target_defs.insert(call_node, targets);
    }
    // Each branch already folded its result into `call_node`'s cell via
    // `bind_to`'s merge-on-rebind, so the cell itself is the answer.
    session.type_of(call_node)
}

/// Resolve against a single concrete (non-hierarchy, non-union) receiver
/// type. Returns the call's result type and, on success, the chosen
/// overload's id (for `target_defs` / dispatch-completeness bookkeeping).
fn resolve_direct(
    session: &mut InferSession,
    call_node: NodeId,
    owner_ty: &Ty,
    name: &str,
    arg_nodes: &[NodeId],
    span: Span,
) -> (Ty, Option<MethodId>) {
    if name == "new" {
        if let Ty::Metaclass(class_id) = owner_ty {
            return resolve_new(session, call_node, *class_id, arg_nodes, span);
        }
    }

    let Some(owner) = owner_class(session, owner_ty) else {
        session.errors.push(TypeError::UndefinedName { name: name.to_string(), span });
        return (Ty::nil(), None);
    };

    let overloads = session.registry.lookup_methods(owner, name);
    if overloads.is_empty() {
        session.errors.push(TypeError::UndefinedName { name: name.to_string(), span });
        return (Ty::nil(), None);
    }

    let arg_types: Vec<Ty> = arg_nodes.iter().map(|n| session.type_of(*n)).collect();

    let chosen = overloads
        .iter()
        .copied()
        .find(|&id| overload_matches(session, id, owner_ty, &arg_types))
        .or_else(|| overloads.iter().copied().find(|&id| session.registry.method(id).is_catch_all));

    let Some(method_id) = chosen else {
        session.errors.push(TypeError::NoOverloadMatches {
            method: name.to_string(),
            receiver: owner_ty.clone(),
            args: arg_types,
            span,
        });
        return (Ty::nil(), None);
    };

    let ty = instantiate(session, call_node, owner_ty, method_id, &arg_types, span);
    (ty, Some(method_id))
}

/// `ClassName.new(...)`: not a real overload lookup (no `new` is ever
/// `define_method`'d), but `initialize`, if the class declares one, is
/// type-checked against `arg_nodes` the same way any overload would be --
/// its body is inferred for instance-var side effects, but the call's own
/// result is always `Instance(class_id)`, never `initialize`'s own return
/// type (§9: "instantiate lazily on first `Foo.new`").
fn resolve_new(
    session: &mut InferSession,
    call_node: NodeId,
    class_id: ClassId,
    arg_nodes: &[NodeId],
    span: Span,
) -> (Ty, Option<MethodId>) {
    let arg_types: Vec<Ty> = arg_nodes.iter().map(|n| session.type_of(*n)).collect();
    let owner_ty = Ty::Instance(class_id);
    let overloads = session.registry.lookup_methods(class_id, "initialize");
    let method_id = overloads
        .iter()
        .copied()
        .find(|&id| overload_matches(session, id, &owner_ty, &arg_types))
        .or_else(|| overloads.iter().copied().find(|&id| session.registry.method(id).is_catch_all));

    if let Some(id) = method_id {
        // `initialize`'s return channel is wired to a throwaway sink, not to
        // `call_node`: `new` always yields an instance, regardless of what
        // the last expression in `initialize`'s body happens to be.
        let sink = session.ast.push(glint_ast::NodeKind::LitNil, Span::synthetic());
        instantiate(session, sink, &owner_ty, id, &arg_types, span);
    }
    bind_branch_result(session, call_node, owner_ty.clone());
    (owner_ty, method_id)
}

fn overload_matches(session: &InferSession, method_id: MethodId, owner_ty: &Ty, arg_types: &[Ty]) -> bool {
    let method = session.registry.method(method_id);
    let required = method.params.iter().filter(|p| p.default.is_none()).count();
    if arg_types.len() < required || arg_types.len() > method.params.len() {
        return false;
    }
    for (param, arg_ty) in method.params.iter().zip(arg_types.iter()) {
        let Some(restriction) = &param.restriction else { continue };
        let Some(expected) = session.registry.resolve_restriction(method.owner, restriction, owner_ty) else {
            return false;
        };
        if !session.registry.subtype(arg_ty, &expected) {
            return false;
        }
    }
    true
}

/// Bind any defaulted trailing parameters' expressions so they carry a
/// type, then either reuse a cached instantiation or clone-and-infer a
/// fresh one, per §4.5 steps 3-4.
fn instantiate(
    session: &mut InferSession,
    call_node: NodeId,
    owner_ty: &Ty,
    method_id: MethodId,
    arg_types: &[Ty],
    span: Span,
) -> Ty {
    let method = session.registry.method(method_id).clone();

    if is_primitive_owner(method.body) {
        let ret = method
            .declared_return
            .as_ref()
            .and_then(|r| session.registry.resolve_restriction(method.owner, r, owner_ty))
            .unwrap_or_else(Ty::nil);
        bind_branch_result(session, call_node, ret.clone());
        return ret;
    }

    let mut full_args = arg_types.to_vec();
    for param in method.params.iter().skip(arg_types.len()) {
        if let Some(default) = param.default {
            visitor::visit(session, default);
            full_args.push(session.type_of(default));
        }
    }

    let key = InstantiationKey { owner: owner_ty.clone(), args: full_args.clone(), block_sig: None };
    if let Some(inst) = session.registry.class(method.owner).instantiation_cache.get(&(method_id, key.clone())).copied() {
        bind(session, call_node, inst.return_cell);
        return session.type_of(inst.return_cell);
    }

    if session.instantiation_depth >= session.config.max_instantiation_depth {
        let mut trace = session.call_stack.clone();
        trace.reverse();
        session.errors.push(TypeError::RecursionWithoutBaseCase { method: method.name.clone(), span, trace });
        return Ty::nil();
    }

    let body_clone = clone_subtree(&mut session.ast, method.body);
    let return_cell = session.ast.push(glint_ast::NodeKind::LitNil, glint_common::Span::synthetic());

    // Insert the provisional instantiation *before* visiting the body: a
    // recursive call to the same (owner, args) key during this visit hits
    // the cache and binds to `return_cell` immediately, so the eventual
    // `propagate` on `return_cell` reaches it too (§4.3 cycle tolerance).
    session.registry.class_mut(method.owner).instantiation_cache.insert(
        (method_id, key),
        Instantiation { body: body_clone, return_cell },
    );

    bind(session, call_node, return_cell);

    // A method's own locals are an isolated scope root: the call site's and
    // top level's bindings must not leak in (§4.4 "Unknown name is a
    // diagnostic"), unlike a block, which keeps the enclosing chain.
    session.push_scope_barrier();
    session.push_scope();
    for (param, arg_ty) in method.params.iter().zip(full_args.iter()) {
        let cell = session.ast.push(glint_ast::NodeKind::VarRef(param.name.clone()), glint_common::Span::synthetic());
        set(session, cell, arg_ty.clone());
        session.bind_var(&param.name, cell);
    }
    session.self_stack.push(owner_ty.clone());
    session.class_stack.push(method.owner);
    session.return_channel_stack.push(return_cell);
    session.instantiation_depth += 1;
    session.call_stack.push(CallStackFrame { call_site: call_node, span });

    visitor::visit(session, body_clone);
    bind(session, return_cell, body_clone);

    session.call_stack.pop();
    session.instantiation_depth -= 1;
    session.return_channel_stack.pop();
    session.class_stack.pop();
    session.self_stack.pop();
    session.pop_scope();
    session.pop_scope_barrier();

    let inferred = session.type_of(return_cell);
    if let Some(declared) = method.declared_return.as_ref() {
        if let Some(expected) = session.registry.resolve_restriction(method.owner, declared, owner_ty) {
            if !session.registry.subtype(&inferred, &expected) {
                session.errors.push(TypeError::TypeMismatch { expected, found: inferred.clone(), span });
            }
        }
    }
    inferred
}

/// Fold one branch's result into `call_node` via a fresh one-shot cell,
/// rather than overwriting the call's type directly -- a `Hierarchy` or
/// `Union` receiver resolves several branches against the same call node,
/// and `bind_to`'s merge-on-rebind is what accumulates them correctly.
fn bind_branch_result(session: &mut InferSession, call_node: NodeId, ty: Ty) {
    let cell = session.ast.push(glint_ast::NodeKind::LitNil, glint_common::Span::synthetic());
    set(session, cell, ty);
    bind(session, call_node, cell);
}

/// `graph::set_type` + `propagate`, wired through [`notify_changed`] so a
/// widening that reaches a registered call argument re-enters the
/// resolver. The resolver's own graph writes go through this (and [`bind`])
/// rather than calling `graph` directly, mirroring the visitor's `set`.
fn set(session: &mut InferSession, node: NodeId, ty: Ty) {
    graph::set_type(&mut session.ast, node, ty);
    let mut changed = Vec::new();
    graph::propagate(&mut session.ast, &session.registry, node, &mut changed);
    notify_changed(session, &changed);
}

/// `graph::bind_to` wired through [`notify_changed`]; see `set`.
fn bind(session: &mut InferSession, node: NodeId, source: NodeId) {
    let mut changed = Vec::new();
    graph::bind_to(&mut session.ast, &session.registry, node, source, &mut changed);
    notify_changed(session, &changed);
}

/// The §4.5 step-6 hook: for every node a propagation pass actually
/// recomputed, re-resolve any call that read it as an argument. A call
/// re-registers its argument nodes each time it resolves, so a cache hit in
/// `instantiate` (the common case once a fixpoint is reached) makes this a
/// cheap no-op rather than a repeated full re-instantiation.
pub(crate) fn notify_changed(session: &mut InferSession, changed: &[NodeId]) {
    let mut to_reresolve: Vec<NodeId> = Vec::new();
    for &node in changed {
        if let Some(calls) = session.call_arg_observers.get(&node) {
            for &call_node in calls {
                if !to_reresolve.contains(&call_node) {
                    to_reresolve.push(call_node);
                }
            }
        }
    }
    for call_node in to_reresolve {
        reresolve(session, call_node);
    }
}

/// Recompute a call's result after one of its argument nodes widened,
/// per §4.5 step 6. Safe to call repeatedly; a cache hit short-circuits to
/// a `bind_to` against the existing instantiation. Driven automatically by
/// [`notify_changed`] once an argument node is registered in
/// `session.call_arg_observers` (done by every `resolve_call`), so callers
/// outside this module should not need to call it directly.
pub fn reresolve(session: &mut InferSession, call_node: NodeId) {
    let (receiver_ty, name, arg_nodes) = match &session.ast.node(call_node).kind {
        glint_ast::NodeKind::Call { receiver, name, args, .. } => {
            let receiver_ty = receiver.map(|r| session.type_of(r));
            (receiver_ty, name.clone(), args.clone())
        }
        _ => return,
    };
    resolve_call(session, call_node, receiver_ty, &name, &arg_nodes);
}
