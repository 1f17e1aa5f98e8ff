//! The Dependency Graph (§4.3): the five operations every AST node
//! supports uniformly, realized as free functions over an [`Ast`] arena
//! rather than per-variant trait methods (§9 design note: "the shared
//! propagation protocol is best realized by implementing the five
//! operations on the union").
//!
//! Termination relies on monotone widening over a finite lattice (§4.3):
//! [`set_type`] only ever replaces a cell with `registry.merge(old, new)`,
//! never a narrower value, so a node's type stabilizes after finitely many
//! widenings and `propagate`'s recursion bottoms out.

use glint_ast::Ast;
use glint_common::{Diagnostic, NodeId};
use glint_types::{Ty, TypeRegistry};

/// Write `new_ty` into `node`'s type cell if it differs from the current
/// value, marking the node dirty. Returns whether the cell changed.
pub fn set_type(ast: &mut Ast, node: NodeId, new_ty: Ty) -> bool {
    let changed = ast.node(node).type_cell.as_ref() != Some(&new_ty);
    if changed {
        ast.node_mut(node).type_cell = Some(new_ty);
        ast.node_mut(node).dirty = true;
    }
    changed
}

/// Add `source` as a dependency of `node` and `node` as an observer of
/// `source`. Adopts or merges `source`'s current type into `node`, and
/// propagates if that changed anything. Every node reached by that
/// propagation (including `node` itself, if it changed) is appended to
/// `changed`, innermost first -- callers that need to react to a widening
/// (the Call Resolver's re-resolution hook, §4.5 step 6) read it from there
/// rather than `bind_to` knowing anything about calls.
pub fn bind_to(ast: &mut Ast, registry: &TypeRegistry, node: NodeId, source: NodeId, changed: &mut Vec<NodeId>) {
    if node == source {
        return;
    }
    let is_first_dep = ast.node(node).deps.is_empty();
    if !ast.node(node).deps.contains(&source) {
        ast.node_mut(node).deps.push(source);
    }
    if !ast.node(source).observers.contains(&node) {
        ast.node_mut(source).observers.push(node);
    }
    let Some(source_ty) = ast.node(source).type_cell.clone() else {
        return;
    };
    let current = ast.node(node).type_cell.clone();
    let widened = if is_first_dep || current.is_none() {
        source_ty
    } else {
        registry.merge([current.unwrap(), source_ty])
    };
    if set_type(ast, node, widened) {
        propagate(ast, registry, node, changed);
    }
}

/// Recompute `node`'s type cell after its dependency `from` changed.
/// Adopts `from`'s type outright if `node` has no type yet or only one
/// dependency; otherwise widens via `merge`.
pub fn update(ast: &mut Ast, registry: &TypeRegistry, node: NodeId, from: NodeId) {
    let Some(from_ty) = ast.node(from).type_cell.clone() else {
        return;
    };
    let current = ast.node(node).type_cell.clone();
    let single_dep = ast.node(node).deps.len() <= 1;
    let widened = if current.is_none() || single_dep { from_ty } else { registry.merge([current.unwrap(), from_ty]) };
    set_type(ast, node, widened);
}

/// Two-phase notification: if `node` is dirty, clear the flag, `update`
/// every observer (phase one), then recursively `propagate` every observer
/// (phase two). Phase one completing before phase two begins is what keeps
/// an observer from seeing a partially-updated sibling (§4.3 ordering
/// guarantee). Every node whose dirty flag this call clears (i.e. every
/// node actually recomputed) is pushed onto `changed`.
pub fn propagate(ast: &mut Ast, registry: &TypeRegistry, node: NodeId, changed: &mut Vec<NodeId>) {
    if !ast.node(node).dirty {
        return;
    }
    ast.node_mut(node).dirty = false;
    changed.push(node);
    let observers = ast.node(node).observers.clone();
    for &obs in &observers {
        update(ast, registry, obs, node);
    }
    for &obs in &observers {
        propagate(ast, registry, obs, changed);
    }
}

/// Emit a diagnostic anchored at `node`'s source location.
pub fn raise(ast: &Ast, node: NodeId, code: &'static str, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(code, message, ast.node(node).span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ast::NodeKind;
    use glint_common::Span;
    use glint_types::Primitive;

    fn leaf(ast: &mut Ast, ty: Ty) -> NodeId {
        let id = ast.push(NodeKind::LitNil, Span::synthetic());
        set_type(ast, id, ty);
        id
    }

    #[test]
    fn bind_to_adopts_single_source_type() {
        let mut ast = Ast::new();
        let registry = TypeRegistry::new();
        let source = leaf(&mut ast, Ty::Primitive(Primitive::Int32));
        let node = ast.push(NodeKind::VarRef("a".into()), Span::synthetic());
        bind_to(&mut ast, &registry, node, source, &mut Vec::new());
        assert_eq!(ast.node(node).type_cell, Some(Ty::Primitive(Primitive::Int32)));
    }

    #[test]
    fn bind_to_second_source_widens_to_union() {
        let mut ast = Ast::new();
        let registry = TypeRegistry::new();
        let a = leaf(&mut ast, Ty::Primitive(Primitive::Int32));
        let b = leaf(&mut ast, Ty::Primitive(Primitive::Char));
        let node = ast.push(NodeKind::VarRef("a".into()), Span::synthetic());
        bind_to(&mut ast, &registry, node, a, &mut Vec::new());
        bind_to(&mut ast, &registry, node, b, &mut Vec::new());
        match ast.node(node).type_cell.clone().unwrap() {
            Ty::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn propagate_reaches_transitive_observers() {
        let mut ast = Ast::new();
        let registry = TypeRegistry::new();
        let source = ast.push(NodeKind::VarRef("x".into()), Span::synthetic());
        let mid = ast.push(NodeKind::VarRef("y".into()), Span::synthetic());
        let leaf_node = ast.push(NodeKind::VarRef("z".into()), Span::synthetic());
        bind_to(&mut ast, &registry, mid, source, &mut Vec::new());
        bind_to(&mut ast, &registry, leaf_node, mid, &mut Vec::new());

        set_type(&mut ast, source, Ty::Primitive(Primitive::Int32));
        let mut changed = Vec::new();
        propagate(&mut ast, &registry, source, &mut changed);

        assert_eq!(ast.node(mid).type_cell, Some(Ty::Primitive(Primitive::Int32)));
        assert_eq!(ast.node(leaf_node).type_cell, Some(Ty::Primitive(Primitive::Int32)));
        assert_eq!(changed.len(), 3);
    }

    #[test]
    fn propagate_is_idempotent_once_clean() {
        let mut ast = Ast::new();
        let registry = TypeRegistry::new();
        let source = leaf(&mut ast, Ty::Primitive(Primitive::Int32));
        let node = ast.push(NodeKind::VarRef("a".into()), Span::synthetic());
        bind_to(&mut ast, &registry, node, source, &mut Vec::new());
        assert!(!ast.node(source).dirty);
        // No-op: nothing changed, so re-propagating must not panic or loop.
        let mut changed = Vec::new();
        propagate(&mut ast, &registry, source, &mut changed);
        assert_eq!(ast.node(node).type_cell, Some(Ty::Primitive(Primitive::Int32)));
        assert!(changed.is_empty());
    }

    #[test]
    fn cyclic_observers_reach_fixpoint() {
        // a binds to b, b binds to a -- a mutually recursive pair.
        let mut ast = Ast::new();
        let registry = TypeRegistry::new();
        let a = ast.push(NodeKind::VarRef("a".into()), Span::synthetic());
        let b = ast.push(NodeKind::VarRef("b".into()), Span::synthetic());
        bind_to(&mut ast, &registry, a, b, &mut Vec::new());
        bind_to(&mut ast, &registry, b, a, &mut Vec::new());

        set_type(&mut ast, a, Ty::Primitive(Primitive::Int32));
        propagate(&mut ast, &registry, a, &mut Vec::new());

        assert_eq!(ast.node(b).type_cell, Some(Ty::Primitive(Primitive::Int32)));
        assert_eq!(ast.node(a).type_cell, Some(Ty::Primitive(Primitive::Int32)));
    }
}
