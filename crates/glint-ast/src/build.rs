//! A small free-function builder DSL for hand-assembling ASTs in tests.
//!
//! §9's design notes call out that the reference implementation's test
//! suite monkey-patches primitive types with AST-construction conveniences
//! (`1.int32`, `"a".var`); Rust cannot extend primitives that way, so this
//! module offers the same convenience as plain functions over an [`Ast`]
//! arena instead.

use glint_common::{NodeId, Span};
use glint_types::{Primitive, Restriction};

use crate::node::{Ast, NodeKind, ParamSyntax, RescueClause};

fn push(ast: &mut Ast, kind: NodeKind) -> NodeId {
    ast.push(kind, Span::synthetic())
}

pub fn nil(ast: &mut Ast) -> NodeId {
    push(ast, NodeKind::LitNil)
}

pub fn bool_(ast: &mut Ast, value: bool) -> NodeId {
    push(ast, NodeKind::LitBool(value))
}

pub fn char_(ast: &mut Ast, value: char) -> NodeId {
    push(ast, NodeKind::LitChar(value))
}

/// A bare integer literal: types as `Int32` (§4.1).
pub fn int(ast: &mut Ast, value: i64) -> NodeId {
    push(ast, NodeKind::LitInt { value, suffix: None })
}

pub fn int_suffixed(ast: &mut Ast, value: i64, suffix: Primitive) -> NodeId {
    push(ast, NodeKind::LitInt { value, suffix: Some(suffix) })
}

/// A bare float literal: types as `Float64` (§4.1).
pub fn float(ast: &mut Ast, value: f64) -> NodeId {
    push(ast, NodeKind::LitFloat { value, suffix: None })
}

pub fn float_suffixed(ast: &mut Ast, value: f64, suffix: Primitive) -> NodeId {
    push(ast, NodeKind::LitFloat { value, suffix: Some(suffix) })
}

pub fn string(ast: &mut Ast, text: &str) -> NodeId {
    push(ast, NodeKind::LitString { parts: vec![crate::node::StringPart::Literal(text.to_string())] })
}

pub fn symbol(ast: &mut Ast, name: &str) -> NodeId {
    push(ast, NodeKind::LitSymbol(name.to_string()))
}

pub fn array(ast: &mut Ast, elements: Vec<NodeId>) -> NodeId {
    push(ast, NodeKind::LitArray { elements, of: None })
}

pub fn hash(ast: &mut Ast, entries: Vec<(NodeId, NodeId)>) -> NodeId {
    push(ast, NodeKind::LitHash { entries, of: None })
}

pub fn hash_of(ast: &mut Ast, entries: Vec<(NodeId, NodeId)>, key: Restriction, value: Restriction) -> NodeId {
    push(ast, NodeKind::LitHash { entries, of: Some((key, value)) })
}

pub fn var(ast: &mut Ast, name: &str) -> NodeId {
    push(ast, NodeKind::VarRef(name.to_string()))
}

pub fn ivar(ast: &mut Ast, name: &str) -> NodeId {
    push(ast, NodeKind::IVarRef(name.to_string()))
}

pub fn assign(ast: &mut Ast, target: NodeId, value: NodeId) -> NodeId {
    push(ast, NodeKind::Assign { target, value })
}

pub fn if_(ast: &mut Ast, cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId>) -> NodeId {
    push(ast, NodeKind::If { cond, then_branch, else_branch })
}

pub fn while_(ast: &mut Ast, cond: NodeId, body: NodeId) -> NodeId {
    push(ast, NodeKind::While { cond, body })
}

pub fn and(ast: &mut Ast, lhs: NodeId, rhs: NodeId) -> NodeId {
    push(ast, NodeKind::And { lhs, rhs })
}

pub fn or(ast: &mut Ast, lhs: NodeId, rhs: NodeId) -> NodeId {
    push(ast, NodeKind::Or { lhs, rhs })
}

pub fn begin(
    ast: &mut Ast,
    body: NodeId,
    rescues: Vec<RescueClause>,
    else_branch: Option<NodeId>,
    ensure: Option<NodeId>,
) -> NodeId {
    push(ast, NodeKind::Begin { body, rescues, else_branch, ensure })
}

pub fn rescue_clause(exception_types: Vec<Restriction>, binding_name: Option<&str>, body: NodeId) -> RescueClause {
    RescueClause { exception_types, binding_name: binding_name.map(str::to_string), body }
}

pub fn return_(ast: &mut Ast, value: Option<NodeId>) -> NodeId {
    push(ast, NodeKind::Return(value))
}

pub fn block(ast: &mut Ast, params: Vec<NodeId>, body: NodeId) -> NodeId {
    push(ast, NodeKind::Block { params, body })
}

pub fn call(ast: &mut Ast, receiver: Option<NodeId>, name: &str, args: Vec<NodeId>) -> NodeId {
    push(ast, NodeKind::Call { receiver, name: name.to_string(), args, block: None })
}

pub fn call_with_block(ast: &mut Ast, receiver: Option<NodeId>, name: &str, args: Vec<NodeId>, blk: NodeId) -> NodeId {
    push(ast, NodeKind::Call { receiver, name: name.to_string(), args, block: Some(blk) })
}

pub fn param(name: &str, restriction: Option<Restriction>) -> ParamSyntax {
    ParamSyntax { name: name.to_string(), restriction, default: None, is_out: false }
}

pub fn param_with_default(name: &str, restriction: Option<Restriction>, default: NodeId) -> ParamSyntax {
    ParamSyntax { name: name.to_string(), restriction, default: Some(default), is_out: false }
}

#[allow(clippy::too_many_arguments)]
pub fn method_def(
    ast: &mut Ast,
    name: &str,
    params: Vec<ParamSyntax>,
    return_type: Option<Restriction>,
    body: NodeId,
) -> NodeId {
    push(ast, NodeKind::MethodDef { name: name.to_string(), params, block_param: None, return_type, body })
}

pub fn class_def(ast: &mut Ast, name: &str, superclass: Option<&str>, is_abstract: bool, body: Vec<NodeId>) -> NodeId {
    push(
        ast,
        NodeKind::ClassDef { name: name.to_string(), superclass: superclass.map(str::to_string), is_abstract, body },
    )
}

pub fn module_def(ast: &mut Ast, name: &str, body: Vec<NodeId>) -> NodeId {
    push(ast, NodeKind::ModuleDef { name: name.to_string(), body })
}

pub fn include(ast: &mut Ast, module_path: &str) -> NodeId {
    push(ast, NodeKind::Include(module_path.to_string()))
}

pub fn program(ast: &mut Ast, stmts: Vec<NodeId>) -> NodeId {
    push(ast, NodeKind::Program(stmts))
}
