//! The AST arena: a closed tagged union of node kinds (§9 design note),
//! each carrying the type cell and two adjacency lists the Dependency Graph
//! (§4.3) operates on uniformly regardless of kind.
//!
//! By the time a tree reaches inference, macros have already been expanded
//! by the parser collaborator (§4.4's "Macro: deferred expansion before
//! inference of the enclosing scope" describes parser-side behavior); this
//! arena's closed union therefore has no `Macro` variant.

use glint_common::{NodeId, Span};
use glint_types::class::ForeignItem;
use glint_types::{Primitive, Restriction, Ty};

/// One segment of an interpolated string literal.
#[derive(Debug, Clone)]
pub enum StringPart {
    Literal(String),
    Interpolated(NodeId),
}

/// A formal parameter as written in source, before the restriction is
/// resolved to a concrete `Ty`.
#[derive(Debug, Clone)]
pub struct ParamSyntax {
    pub name: String,
    pub restriction: Option<Restriction>,
    pub default: Option<NodeId>,
    /// `out x` -- the argument position declares `x` rather than reading it.
    pub is_out: bool,
}

#[derive(Debug, Clone)]
pub struct BlockParamSyntax {
    pub param_types: Vec<Restriction>,
    pub return_type: Option<Restriction>,
}

#[derive(Debug, Clone)]
pub struct RescueClause {
    pub exception_types: Vec<Restriction>,
    pub binding_name: Option<String>,
    pub body: NodeId,
}

/// The closed union of every expression/statement/declaration shape the
/// Inference Visitor wires edges for, per §4.4.
#[derive(Debug, Clone)]
pub enum NodeKind {
    LitNil,
    LitBool(bool),
    LitChar(char),
    LitInt { value: i64, suffix: Option<Primitive> },
    LitFloat { value: f64, suffix: Option<Primitive> },
    LitString { parts: Vec<StringPart> },
    LitSymbol(String),
    LitRegex(String),
    LitRange { from: NodeId, to: NodeId, exclusive: bool },
    LitArray { elements: Vec<NodeId>, of: Option<Restriction> },
    LitHash { entries: Vec<(NodeId, NodeId)>, of: Option<(Restriction, Restriction)> },

    VarRef(String),
    IVarRef(String),
    /// An `out x` argument: declares `x` in the enclosing scope rather than
    /// reading it.
    OutArg(String),

    Assign { target: NodeId, value: NodeId },

    If { cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId> },
    Case { subject: Option<NodeId>, whens: Vec<(Vec<NodeId>, NodeId)>, else_branch: Option<NodeId> },
    While { cond: NodeId, body: NodeId },
    And { lhs: NodeId, rhs: NodeId },
    Or { lhs: NodeId, rhs: NodeId },
    Begin { body: NodeId, rescues: Vec<RescueClause>, else_branch: Option<NodeId>, ensure: Option<NodeId> },

    Return(Option<NodeId>),
    Break(Option<NodeId>),
    Next(Option<NodeId>),
    Yield(Vec<NodeId>),

    Block { params: Vec<NodeId>, body: NodeId },
    Call { receiver: Option<NodeId>, name: String, args: Vec<NodeId>, block: Option<NodeId> },

    MethodDef {
        name: String,
        params: Vec<ParamSyntax>,
        block_param: Option<BlockParamSyntax>,
        return_type: Option<Restriction>,
        body: NodeId,
    },
    ClassDef { name: String, superclass: Option<String>, is_abstract: bool, body: Vec<NodeId> },
    ModuleDef { name: String, body: Vec<NodeId> },
    LibDef { name: String, items: Vec<ForeignItem> },
    Include(String),

    IsA { value: NodeId, type_name: Restriction },
    PointerOf(NodeId),

    /// The whole program: top-level statements, run in the root scope.
    Program(Vec<NodeId>),
}

/// One AST node: its shape (`kind`), its source location, and the
/// propagation bookkeeping from §3/§4.3.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub type_cell: Option<Ty>,
    pub deps: Vec<NodeId>,
    pub observers: Vec<NodeId>,
    pub dirty: bool,
}

impl Node {
    fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span, type_cell: None, deps: Vec::new(), observers: Vec::new(), dirty: false }
    }
}

/// Owns every node for one compilation unit. Nodes are never removed; a
/// "clone" during generic/overload instantiation (§4.5 step 4) pushes fresh
/// nodes and returns their new ids, leaving the original untouched.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Ast { nodes: Vec::new() }
    }

    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, span));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Deep-copy the subtree rooted at `root` into fresh nodes, remapping every
/// internal `NodeId` reference. Used by the Call Resolver (§4.5 step 4) to
/// give each generic/overload instantiation its own body to infer against,
/// leaving the original method definition untouched for the next call site.
///
/// The clone's nodes start with empty type cells and adjacency lists --
/// only the syntactic shape is copied, never the previous inference result.
pub fn clone_subtree(ast: &mut Ast, root: NodeId) -> NodeId {
    let original = ast.node(root);
    let span = original.span;
    let kind = original.kind.clone();
    let cloned_kind = clone_kind(ast, &kind);
    ast.push(cloned_kind, span)
}

fn clone_opt(ast: &mut Ast, id: Option<NodeId>) -> Option<NodeId> {
    id.map(|id| clone_subtree(ast, id))
}

fn clone_kind(ast: &mut Ast, kind: &NodeKind) -> NodeKind {
    match kind {
        NodeKind::LitNil => NodeKind::LitNil,
        NodeKind::LitBool(b) => NodeKind::LitBool(*b),
        NodeKind::LitChar(c) => NodeKind::LitChar(*c),
        NodeKind::LitInt { value, suffix } => NodeKind::LitInt { value: *value, suffix: *suffix },
        NodeKind::LitFloat { value, suffix } => NodeKind::LitFloat { value: *value, suffix: *suffix },
        NodeKind::LitString { parts } => NodeKind::LitString {
            parts: parts
                .iter()
                .map(|p| match p {
                    StringPart::Literal(s) => StringPart::Literal(s.clone()),
                    StringPart::Interpolated(id) => StringPart::Interpolated(clone_subtree(ast, *id)),
                })
                .collect(),
        },
        NodeKind::LitSymbol(s) => NodeKind::LitSymbol(s.clone()),
        NodeKind::LitRegex(s) => NodeKind::LitRegex(s.clone()),
        NodeKind::LitRange { from, to, exclusive } => {
            NodeKind::LitRange { from: clone_subtree(ast, *from), to: clone_subtree(ast, *to), exclusive: *exclusive }
        }
        NodeKind::LitArray { elements, of } => NodeKind::LitArray {
            elements: elements.iter().map(|e| clone_subtree(ast, *e)).collect(),
            of: of.clone(),
        },
        NodeKind::LitHash { entries, of } => NodeKind::LitHash {
            entries: entries.iter().map(|(k, v)| (clone_subtree(ast, *k), clone_subtree(ast, *v))).collect(),
            of: of.clone(),
        },
        NodeKind::VarRef(name) => NodeKind::VarRef(name.clone()),
        NodeKind::IVarRef(name) => NodeKind::IVarRef(name.clone()),
        NodeKind::OutArg(name) => NodeKind::OutArg(name.clone()),
        NodeKind::Assign { target, value } => {
            NodeKind::Assign { target: clone_subtree(ast, *target), value: clone_subtree(ast, *value) }
        }
        NodeKind::If { cond, then_branch, else_branch } => NodeKind::If {
            cond: clone_subtree(ast, *cond),
            then_branch: clone_subtree(ast, *then_branch),
            else_branch: clone_opt(ast, *else_branch),
        },
        NodeKind::Case { subject, whens, else_branch } => NodeKind::Case {
            subject: clone_opt(ast, *subject),
            whens: whens
                .iter()
                .map(|(conds, body)| (conds.iter().map(|c| clone_subtree(ast, *c)).collect(), clone_subtree(ast, *body)))
                .collect(),
            else_branch: clone_opt(ast, *else_branch),
        },
        NodeKind::While { cond, body } => {
            NodeKind::While { cond: clone_subtree(ast, *cond), body: clone_subtree(ast, *body) }
        }
        NodeKind::And { lhs, rhs } => NodeKind::And { lhs: clone_subtree(ast, *lhs), rhs: clone_subtree(ast, *rhs) },
        NodeKind::Or { lhs, rhs } => NodeKind::Or { lhs: clone_subtree(ast, *lhs), rhs: clone_subtree(ast, *rhs) },
        NodeKind::Begin { body, rescues, else_branch, ensure } => NodeKind::Begin {
            body: clone_subtree(ast, *body),
            rescues: rescues
                .iter()
                .map(|r| RescueClause {
                    exception_types: r.exception_types.clone(),
                    binding_name: r.binding_name.clone(),
                    body: clone_subtree(ast, r.body),
                })
                .collect(),
            else_branch: clone_opt(ast, *else_branch),
            ensure: clone_opt(ast, *ensure),
        },
        NodeKind::Return(v) => NodeKind::Return(clone_opt(ast, *v)),
        NodeKind::Break(v) => NodeKind::Break(clone_opt(ast, *v)),
        NodeKind::Next(v) => NodeKind::Next(clone_opt(ast, *v)),
        NodeKind::Yield(args) => NodeKind::Yield(args.iter().map(|a| clone_subtree(ast, *a)).collect()),
        NodeKind::Block { params, body } => {
            NodeKind::Block { params: params.iter().map(|p| clone_subtree(ast, *p)).collect(), body: clone_subtree(ast, *body) }
        }
        NodeKind::Call { receiver, name, args, block } => NodeKind::Call {
            receiver: clone_opt(ast, *receiver),
            name: name.clone(),
            args: args.iter().map(|a| clone_subtree(ast, *a)).collect(),
            block: clone_opt(ast, *block),
        },
        NodeKind::MethodDef { name, params, block_param, return_type, body } => NodeKind::MethodDef {
            name: name.clone(),
            params: params
                .iter()
                .map(|p| ParamSyntax {
                    name: p.name.clone(),
                    restriction: p.restriction.clone(),
                    default: clone_opt(ast, p.default),
                    is_out: p.is_out,
                })
                .collect(),
            block_param: block_param.clone(),
            return_type: return_type.clone(),
            body: clone_subtree(ast, *body),
        },
        NodeKind::ClassDef { name, superclass, is_abstract, body } => NodeKind::ClassDef {
            name: name.clone(),
            superclass: superclass.clone(),
            is_abstract: *is_abstract,
            body: body.iter().map(|n| clone_subtree(ast, *n)).collect(),
        },
        NodeKind::ModuleDef { name, body } => {
            NodeKind::ModuleDef { name: name.clone(), body: body.iter().map(|n| clone_subtree(ast, *n)).collect() }
        }
        NodeKind::LibDef { name, items } => NodeKind::LibDef { name: name.clone(), items: items.clone() },
        NodeKind::Include(path) => NodeKind::Include(path.clone()),
        NodeKind::IsA { value, type_name } => {
            NodeKind::IsA { value: clone_subtree(ast, *value), type_name: type_name.clone() }
        }
        NodeKind::PointerOf(id) => NodeKind::PointerOf(clone_subtree(ast, *id)),
        NodeKind::Program(stmts) => NodeKind::Program(stmts.iter().map(|n| clone_subtree(ast, *n)).collect()),
    }
}

/// The `NodeId`s `kind` references directly, in evaluation order. Used by
/// passes that need to walk the tree generically (the instance-var usage
/// scan in `glint-infer`) rather than wire per-construct dependency edges.
pub fn child_ids(kind: &NodeKind) -> Vec<NodeId> {
    match kind {
        NodeKind::LitNil
        | NodeKind::LitBool(_)
        | NodeKind::LitChar(_)
        | NodeKind::LitInt { .. }
        | NodeKind::LitFloat { .. }
        | NodeKind::LitSymbol(_)
        | NodeKind::LitRegex(_)
        | NodeKind::VarRef(_)
        | NodeKind::IVarRef(_)
        | NodeKind::OutArg(_)
        | NodeKind::Include(_) => Vec::new(),
        NodeKind::LitString { parts } => {
            parts.iter().filter_map(|p| if let StringPart::Interpolated(id) = p { Some(*id) } else { None }).collect()
        }
        NodeKind::LitRange { from, to, .. } => vec![*from, *to],
        NodeKind::LitArray { elements, .. } => elements.clone(),
        NodeKind::LitHash { entries, .. } => entries.iter().flat_map(|(k, v)| [*k, *v]).collect(),
        NodeKind::Assign { target, value } => vec![*target, *value],
        NodeKind::If { cond, then_branch, else_branch } => {
            let mut ids = vec![*cond, *then_branch];
            ids.extend(*else_branch);
            ids
        }
        NodeKind::Case { subject, whens, else_branch } => {
            let mut ids: Vec<NodeId> = subject.into_iter().collect();
            for (conds, body) in whens {
                ids.extend(conds.iter().copied());
                ids.push(*body);
            }
            ids.extend(*else_branch);
            ids
        }
        NodeKind::While { cond, body } => vec![*cond, *body],
        NodeKind::And { lhs, rhs } | NodeKind::Or { lhs, rhs } => vec![*lhs, *rhs],
        NodeKind::Begin { body, rescues, else_branch, ensure } => {
            let mut ids = vec![*body];
            ids.extend(rescues.iter().map(|r| r.body));
            ids.extend(*else_branch);
            ids.extend(*ensure);
            ids
        }
        NodeKind::Return(v) | NodeKind::Break(v) | NodeKind::Next(v) => v.into_iter().collect(),
        NodeKind::Yield(args) => args.clone(),
        NodeKind::Block { params, body } => {
            let mut ids = params.clone();
            ids.push(*body);
            ids
        }
        NodeKind::Call { receiver, args, block, .. } => {
            let mut ids: Vec<NodeId> = receiver.into_iter().collect();
            ids.extend(args.iter().copied());
            ids.extend(*block);
            ids
        }
        NodeKind::MethodDef { params, body, .. } => {
            let mut ids: Vec<NodeId> = params.iter().filter_map(|p| p.default).collect();
            ids.push(*body);
            ids
        }
        NodeKind::ClassDef { body, .. } | NodeKind::ModuleDef { body, .. } => body.clone(),
        NodeKind::LibDef { .. } => Vec::new(),
        NodeKind::IsA { value, .. } => vec![*value],
        NodeKind::PointerOf(id) => vec![*id],
        NodeKind::Program(stmts) => stmts.clone(),
    }
}
