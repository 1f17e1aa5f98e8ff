//! The Inference Visitor (§4.4): a single walk that registers classes,
//! wires dependency edges per construct, and delegates `Call` to the
//! [`crate::resolver`].

use std::collections::HashSet;

use glint_ast::{child_ids, NodeKind};
use glint_common::{ClassId, NodeId, Span};
use glint_types::{Param, Primitive, Restriction, Ty};

use crate::error::TypeError;
use crate::graph;
use crate::resolver;
use crate::session::InferSession;

/// Entry point: register every class/module in `program`, scan method
/// bodies for instance-variable usage (needed up front for the hoisting
/// decision), then run the real inference walk.
pub fn infer_program(session: &mut InferSession, program: NodeId) {
    let root = session.registry.root();
    register_classes(session, program, root);
    visit(session, program);
}

// ── Pass 1: class registration + instance-var usage scan ───────────────

fn register_classes(session: &mut InferSession, node: NodeId, scope: ClassId) {
    let kind = session.ast.node(node).kind.clone();
    match kind {
        NodeKind::Program(stmts) => {
            for stmt in stmts {
                register_classes(session, stmt, scope);
            }
        }
        NodeKind::ClassDef { name, superclass, is_abstract, body } => {
            let super_id = superclass.as_deref().and_then(|p| session.registry.resolve_path(scope, p));
            let id = session.registry.define_class(scope, &name, super_id, is_abstract, false);
            scan_class_body(session, &body, id);
            for stmt in &body {
                register_classes(session, *stmt, id);
            }
        }
        NodeKind::ModuleDef { name, body } => {
            let id = session.registry.define_class(scope, &name, None, false, true);
            scan_class_body(session, &body, id);
            for stmt in &body {
                register_classes(session, *stmt, id);
            }
        }
        NodeKind::LibDef { name, items } => {
            let id = session.registry.define_lib(scope, &name);
            for item in items {
                session.registry.add_foreign(id, item);
            }
        }
        _ => {}
    }
}

/// Scan every `MethodDef` directly in a class/module body for `@ivar`
/// reads and writes, accumulating into `session.ivar_writers`/`readers`.
fn scan_class_body(session: &mut InferSession, body: &[NodeId], class_id: ClassId) {
    for &stmt in body {
        if let NodeKind::MethodDef { body: method_body, .. } = session.ast.node(stmt).kind.clone() {
            register_method_def(session, class_id, stmt);
            let mut writers = HashSet::new();
            let mut readers = HashSet::new();
            scan_ivar_usage(session, method_body, &mut writers, &mut readers);
            session.ivar_writers.entry(class_id).or_default().extend(writers);
            session.ivar_readers.entry(class_id).or_default().extend(readers);
        }
    }
}

fn scan_ivar_usage(session: &InferSession, node: NodeId, writers: &mut HashSet<String>, readers: &mut HashSet<String>) {
    let kind = session.ast.node(node).kind.clone();
    if let NodeKind::Assign { target, value } = &kind {
        if let NodeKind::IVarRef(name) = &session.ast.node(*target).kind {
            writers.insert(name.clone());
        } else {
            scan_ivar_usage(session, *target, writers, readers);
        }
        scan_ivar_usage(session, *value, writers, readers);
        return;
    }
    if let NodeKind::IVarRef(name) = &kind {
        readers.insert(name.clone());
    }
    for child in child_ids(&kind) {
        scan_ivar_usage(session, child, writers, readers);
    }
}

/// Decide which class owns `name`'s instance-var cell for a write
/// occurring in `writer`: the topmost ancestor (inclusive of `writer`)
/// that also writes `name` anywhere, per §8 property 4 and §9's stricter
/// open-question resolution. `Err` carries the offending read-only
/// ancestor when a subclass alone writes while an ancestor merely reads.
fn ivar_owner(session: &InferSession, writer: ClassId, name: &str) -> Result<ClassId, ClassId> {
    let chain = session.registry.ancestor_chain(writer);
    let mut owner = writer;
    for &ancestor in chain.iter().skip(1) {
        if session.ivar_writers.get(&ancestor).is_some_and(|s| s.contains(name)) {
            owner = ancestor;
        }
    }
    if owner == writer {
        for &ancestor in chain.iter().skip(1) {
            let reads = session.ivar_readers.get(&ancestor).is_some_and(|s| s.contains(name));
            let writes = session.ivar_writers.get(&ancestor).is_some_and(|s| s.contains(name));
            if reads && !writes {
                return Err(ancestor);
            }
        }
    }
    Ok(owner)
}

/// An instance variable reads as `nil` before its first write, so a fresh
/// cell starts with a synthetic `nil` dependency already bound -- the first
/// real write then *widens* the cell (`Union{Nil, ...}`) rather than
/// adopting its type outright, matching scenario 4's expected
/// `Union{Nil, Int32}` for a name written exactly once.
fn ivar_cell(session: &mut InferSession, owner: ClassId, name: &str) -> NodeId {
    if let Some(existing) = session.registry.class(owner).instance_vars.get(name) {
        return *existing;
    }
    let cell = session.ast.push(NodeKind::IVarRef(name.to_string()), Span::synthetic());
    let nil_source = session.ast.push(NodeKind::LitNil, Span::synthetic());
    set(session, nil_source, Ty::nil());
    bind(session, cell, nil_source);
    session.registry.class_mut(owner).instance_vars.insert(name.to_string(), cell);
    cell
}

// ── Pass 2: the real inference walk ─────────────────────────────────────

/// Visit `node`, wiring its dependency edges and returning its resulting
/// type (also left in its type cell).
pub fn visit(session: &mut InferSession, node: NodeId) -> Ty {
    let kind = session.ast.node(node).kind.clone();
    match kind {
        NodeKind::LitNil => set(session, node, Ty::nil()),
        NodeKind::LitBool(_) => set(session, node, Ty::bool()),
        NodeKind::LitChar(_) => set(session, node, Ty::Primitive(Primitive::Char)),
        NodeKind::LitInt { suffix, .. } => set(session, node, Ty::Primitive(suffix.unwrap_or(Primitive::default_int()))),
        NodeKind::LitFloat { suffix, .. } => {
            set(session, node, Ty::Primitive(suffix.unwrap_or(Primitive::default_float())))
        }
        NodeKind::LitString { parts } => {
            for part in &parts {
                if let glint_ast::StringPart::Interpolated(id) = part {
                    visit(session, *id);
                }
            }
            set(session, node, Ty::Primitive(Primitive::String))
        }
        NodeKind::LitSymbol(_) => set(session, node, Ty::Primitive(Primitive::Symbol)),
        NodeKind::LitRegex(_) => set(session, node, Ty::Primitive(Primitive::String)),
        NodeKind::LitRange { from, to, .. } => {
            visit(session, from);
            visit(session, to);
            set(session, node, Ty::Primitive(Primitive::Int32))
        }
        NodeKind::LitArray { elements, of } => visit_array(session, node, &elements, of.as_ref()),
        NodeKind::LitHash { entries, of } => visit_hash(session, node, &entries, of.as_ref()),

        NodeKind::VarRef(name) => visit_var_ref(session, node, &name),
        NodeKind::IVarRef(name) => visit_ivar_ref(session, node, &name),
        NodeKind::OutArg(name) => visit_out_arg(session, node, &name),

        NodeKind::Assign { target, value } => visit_assign(session, node, target, value),

        NodeKind::If { cond, then_branch, else_branch } => visit_if(session, node, cond, then_branch, else_branch),
        NodeKind::Case { subject, whens, else_branch } => visit_case(session, node, subject, &whens, else_branch),
        NodeKind::While { cond, body } => {
            visit(session, cond);
            visit(session, body);
            set(session, node, Ty::nil())
        }
        NodeKind::And { lhs, rhs } | NodeKind::Or { lhs, rhs } => {
            visit(session, lhs);
            visit(session, rhs);
            bind(session, node, lhs);
            bind(session, node, rhs);
            session.type_of(node)
        }
        NodeKind::Begin { body, rescues, else_branch, ensure } => {
            visit_begin(session, node, body, &rescues, else_branch, ensure)
        }

        NodeKind::Return(value) => visit_jump(session, node, value.into_iter().collect()),
        NodeKind::Break(value) => visit_jump(session, node, value.into_iter().collect()),
        NodeKind::Next(value) => visit_jump(session, node, value.into_iter().collect()),
        NodeKind::Yield(args) => visit_jump(session, node, args),

        NodeKind::Block { params, body } => visit_block(session, node, &params, body),
        NodeKind::Call { receiver, name, args, block } => visit_call(session, node, receiver, &name, &args, block),

        NodeKind::MethodDef { .. } => set(session, node, Ty::nil()),
        NodeKind::ClassDef { name, body, .. } => visit_class_def(session, node, &name, &body),
        NodeKind::ModuleDef { name, body } => visit_module_def(session, node, &name, &body),
        NodeKind::LibDef { .. } => set(session, node, Ty::nil()),
        NodeKind::Include(path) => visit_include(session, node, &path),

        NodeKind::IsA { value, .. } => {
            visit(session, value);
            set(session, node, Ty::bool())
        }
        NodeKind::PointerOf(inner) => {
            let ty = visit(session, inner);
            set(session, node, ty)
        }
        NodeKind::Program(stmts) => visit_program(session, node, &stmts),
    }
}

fn set(session: &mut InferSession, node: NodeId, ty: Ty) -> Ty {
    graph::set_type(&mut session.ast, node, ty.clone());
    let mut changed = Vec::new();
    graph::propagate(&mut session.ast, &session.registry, node, &mut changed);
    resolver::notify_changed(session, &changed);
    ty
}

fn bind(session: &mut InferSession, node: NodeId, source: NodeId) {
    let mut changed = Vec::new();
    graph::bind_to(&mut session.ast, &session.registry, node, source, &mut changed);
    resolver::notify_changed(session, &changed);
}

fn visit_program(session: &mut InferSession, node: NodeId, stmts: &[NodeId]) -> Ty {
    let mut last = Ty::nil();
    for &stmt in stmts {
        last = visit(session, stmt);
    }
    set(session, node, last)
}

fn visit_array(session: &mut InferSession, node: NodeId, elements: &[NodeId], of: Option<&Restriction>) -> Ty {
    for &e in elements {
        visit(session, e);
    }
    let elem_ty = if let Some(r) = of {
        let self_ty = session.current_self();
        session.registry.resolve_restriction(session.current_class(), r, &self_ty).unwrap_or_else(Ty::nil)
    } else if elements.is_empty() {
        Ty::nil()
    } else {
        let tys: Vec<Ty> = elements.iter().map(|e| session.type_of(*e)).collect();
        session.registry.merge(tys)
    };
    let array_class = session.builtins.array;
    set(session, node, Ty::Generic(array_class, vec![elem_ty]))
}

fn visit_hash(
    session: &mut InferSession,
    node: NodeId,
    entries: &[(NodeId, NodeId)],
    of: Option<&(Restriction, Restriction)>,
) -> Ty {
    for &(k, v) in entries {
        visit(session, k);
        visit(session, v);
    }
    let (key_ty, value_ty) = if let Some((kr, vr)) = of {
        let self_ty = session.current_self();
        let class = session.current_class();
        (
            session.registry.resolve_restriction(class, kr, &self_ty).unwrap_or_else(Ty::nil),
            session.registry.resolve_restriction(class, vr, &self_ty).unwrap_or_else(Ty::nil),
        )
    } else if entries.is_empty() {
        (Ty::nil(), Ty::nil())
    } else {
        let keys: Vec<Ty> = entries.iter().map(|(k, _)| session.type_of(*k)).collect();
        let values: Vec<Ty> = entries.iter().map(|(_, v)| session.type_of(*v)).collect();
        (session.registry.merge(keys), session.registry.merge(values))
    };
    let hash_class = session.builtins.hash;
    set(session, node, Ty::Generic(hash_class, vec![key_ty, value_ty]))
}

fn visit_var_ref(session: &mut InferSession, node: NodeId, name: &str) -> Ty {
    if let Some(cell) = session.lookup_var(name) {
        bind(session, node, cell);
        return session.type_of(node);
    }
    // Not a local: the parser hands classes/modules the same `VarRef` shape
    // as locals (§9 -- closed tagged union, no separate constant-ref kind),
    // so a bare capitalized name that isn't bound falls back to a class
    // lookup and types as that class's metaclass (e.g. `Foo` in `Foo.new`).
    if let Some(class_id) = session.registry.resolve_path(session.current_class(), name) {
        return set(session, node, Ty::Metaclass(class_id));
    }
    session.errors.push(TypeError::UndefinedName { name: name.to_string(), span: session.ast.node(node).span });
    set(session, node, Ty::nil())
}

fn visit_ivar_ref(session: &mut InferSession, node: NodeId, name: &str) -> Ty {
    let owner = resolve_ivar_owner_or_report(session, node, name);
    let cell = ivar_cell(session, owner, name);
    if cell != node {
        bind(session, node, cell);
    }
    session.type_of(node)
}

fn resolve_ivar_owner_or_report(session: &mut InferSession, node: NodeId, name: &str) -> ClassId {
    let writer = session.current_class();
    match ivar_owner(session, writer, name) {
        Ok(owner) => owner,
        Err(_reader_ancestor) => {
            session
                .errors
                .push(TypeError::AmbiguousInstanceVarOwner { name: name.to_string(), span: session.ast.node(node).span });
            writer
        }
    }
}

fn visit_out_arg(session: &mut InferSession, node: NodeId, name: &str) -> Ty {
    // `out x`: declares `x` in the enclosing scope; its cell starts
    // untyped and widens from whatever the call eventually binds to it.
    let cell = session.ast.push(NodeKind::VarRef(name.to_string()), Span::synthetic());
    session.bind_var(name, cell);
    bind(session, node, cell);
    set(session, node, Ty::nil())
}

fn visit_assign(session: &mut InferSession, node: NodeId, target: NodeId, value: NodeId) -> Ty {
    visit(session, value);
    let target_kind = session.ast.node(target).kind.clone();
    match target_kind {
        NodeKind::VarRef(name) => {
            let cell = match session.lookup_var(&name) {
                Some(existing) => existing,
                None => {
                    let fresh = session.ast.push(NodeKind::VarRef(name.clone()), session.ast.node(target).span);
                    session.bind_var(&name, fresh);
                    fresh
                }
            };
            bind(session, cell, value);
            set(session, target, session.type_of(cell));
            bind(session, node, cell);
        }
        NodeKind::IVarRef(name) => {
            let owner = resolve_ivar_owner_or_report(session, target, &name);
            let cell = ivar_cell(session, owner, &name);
            bind(session, cell, value);
            set(session, target, session.type_of(cell));
            bind(session, node, cell);
        }
        NodeKind::OutArg(name) => {
            let cell = session.ast.push(NodeKind::VarRef(name.clone()), session.ast.node(target).span);
            session.bind_var(&name, cell);
            bind(session, cell, value);
            bind(session, node, cell);
        }
        _ => {
            visit(session, target);
            bind(session, node, value);
        }
    }
    session.type_of(node)
}

fn visit_if(session: &mut InferSession, node: NodeId, cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId>) -> Ty {
    visit(session, cond);
    visit(session, then_branch);
    bind(session, node, then_branch);
    match else_branch {
        Some(e) => {
            visit(session, e);
            bind(session, node, e);
        }
        None => bind_nil(session, node),
    }
    session.type_of(node)
}

fn visit_case(
    session: &mut InferSession,
    node: NodeId,
    subject: Option<NodeId>,
    whens: &[(Vec<NodeId>, NodeId)],
    else_branch: Option<NodeId>,
) -> Ty {
    if let Some(s) = subject {
        visit(session, s);
    }
    for (conds, body) in whens {
        for &c in conds {
            visit(session, c);
        }
        visit(session, *body);
        bind(session, node, *body);
    }
    match else_branch {
        Some(e) => {
            visit(session, e);
            bind(session, node, e);
        }
        None => bind_nil(session, node),
    }
    session.type_of(node)
}

fn bind_nil(session: &mut InferSession, node: NodeId) {
    let cell = session.ast.push(NodeKind::LitNil, Span::synthetic());
    set(session, cell, Ty::nil());
    bind(session, node, cell);
}

fn visit_begin(
    session: &mut InferSession,
    node: NodeId,
    body: NodeId,
    rescues: &[glint_ast::RescueClause],
    else_branch: Option<NodeId>,
    ensure: Option<NodeId>,
) -> Ty {
    visit(session, body);
    bind(session, node, body);
    let self_ty = session.current_self();
    let class = session.current_class();
    for rescue in rescues {
        if let Some(binding_name) = &rescue.binding_name {
            let exc_ty = if rescue.exception_types.is_empty() {
                Ty::Instance(session.builtins.exception)
            } else {
                let resolved: Vec<Ty> = rescue
                    .exception_types
                    .iter()
                    .filter_map(|r| session.registry.resolve_restriction(class, r, &self_ty))
                    .collect();
                Ty::union(resolved)
            };
            let cell = session.ast.push(NodeKind::VarRef(binding_name.clone()), Span::synthetic());
            set(session, cell, exc_ty);
            session.bind_var(binding_name, cell);
        }
        visit(session, rescue.body);
        bind(session, node, rescue.body);
    }
    // `else` contributes only when no rescue fires: still a possible path
    // through the expression, so it still widens the result (§4.4).
    if let Some(e) = else_branch {
        visit(session, e);
        bind(session, node, e);
    }
    if let Some(ens) = ensure {
        visit(session, ens);
    }
    session.type_of(node)
}

fn visit_jump(session: &mut InferSession, node: NodeId, values: Vec<NodeId>) -> Ty {
    for &v in &values {
        visit(session, v);
    }
    if let Some(&channel) = session.return_channel_stack.last() {
        for &v in &values {
            bind(session, channel, v);
        }
    }
    set(session, node, Ty::nil())
}

fn visit_block(session: &mut InferSession, node: NodeId, params: &[NodeId], body: NodeId) -> Ty {
    session.push_scope();
    for &p in params {
        if let NodeKind::VarRef(name) = session.ast.node(p).kind.clone() {
            session.bind_var(&name, p);
        }
        set(session, p, Ty::nil());
    }
    let channel = session.ast.push(NodeKind::LitNil, Span::synthetic());
    session.return_channel_stack.push(channel);
    visit(session, body);
    bind(session, channel, body);
    session.return_channel_stack.pop();
    session.pop_scope();
    set(session, node, session.type_of(channel))
}

fn visit_call(
    session: &mut InferSession,
    node: NodeId,
    receiver: Option<NodeId>,
    name: &str,
    args: &[NodeId],
    block: Option<NodeId>,
) -> Ty {
    let receiver_ty = receiver.map(|r| visit(session, r));
    for &a in args {
        visit(session, a);
    }
    if let Some(b) = block {
        visit(session, b);
    }
    resolver::resolve_call(session, node, receiver_ty, name, args)
}

fn visit_class_def(session: &mut InferSession, node: NodeId, name: &str, body: &[NodeId]) -> Ty {
    let scope = session.current_class();
    let class_id = session
        .registry
        .resolve_path(scope, name)
        .unwrap_or_else(|| session.registry.define_class(scope, name, None, false, false));
    session.class_stack.push(class_id);
    session.self_stack.push(Ty::Instance(class_id));
    for &stmt in body {
        visit(session, stmt);
    }
    session.self_stack.pop();
    session.class_stack.pop();
    set(session, node, Ty::nil())
}

fn visit_module_def(session: &mut InferSession, node: NodeId, name: &str, body: &[NodeId]) -> Ty {
    let scope = session.current_class();
    let class_id = session
        .registry
        .resolve_path(scope, name)
        .unwrap_or_else(|| session.registry.define_class(scope, name, None, false, true));
    session.class_stack.push(class_id);
    session.self_stack.push(Ty::Instance(class_id));
    for &stmt in body {
        visit(session, stmt);
    }
    session.self_stack.pop();
    session.class_stack.pop();
    set(session, node, Ty::nil())
}

fn visit_include(session: &mut InferSession, node: NodeId, module_path: &str) -> Ty {
    let scope = session.current_class();
    if let Some(module_id) = session.registry.resolve_path(scope, module_path) {
        session.registry.include_module(scope, module_id);
    } else {
        session.errors.push(TypeError::UndefinedName {
            name: module_path.to_string(),
            span: session.ast.node(node).span,
        });
    }
    set(session, node, Ty::nil())
}

/// Register a `MethodDef` found while visiting a class body: interns its
/// overload and does *not* immediately infer the body -- bodies are typed
/// lazily, once per concrete call site, by the Call Resolver (§4.5 step 4).
pub fn register_method_def(session: &mut InferSession, owner: ClassId, node: NodeId) {
    let NodeKind::MethodDef { name, params, block_param, return_type, body } = session.ast.node(node).kind.clone()
    else {
        return;
    };
    let is_catch_all = params.iter().all(|p| p.restriction.is_none());
    let resolved_params: Vec<Param> = params
        .iter()
        .map(|p| Param { name: p.name.clone(), restriction: p.restriction.clone(), default: p.default })
        .collect();
    let resolved_block = block_param.map(|b| glint_types::BlockParam { param_types: b.param_types, return_type: b.return_type });
    session.registry.define_method(owner, &name, resolved_params, resolved_block, return_type, body, is_catch_all);
}
