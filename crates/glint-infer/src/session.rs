//! Top-level entry point: owns the AST arena, the type registry, and the
//! accumulated diagnostics for one compilation, per §5 ("the Type Registry
//! and the Class descriptors' instance-var tables are process-wide for the
//! compilation, mutated only by the inference visitor... no locking is
//! required because there is exactly one mutator").

use rustc_hash::FxHashMap;

use glint_ast::Ast;
use glint_common::{ClassId, MethodId, NodeId};
use glint_types::Ty;

use crate::builtins::{self, Builtins};
use crate::error::{CallStackFrame, TypeError};

/// Tunables that bound otherwise-unbounded recursion, per §7 "Recursion
/// without base case... guarded by a depth limit" and §9's instantiation
/// cache note.
#[derive(Debug, Clone, Copy)]
pub struct InferConfig {
    /// Maximum nested generic/method instantiation depth before the
    /// resolver gives up and raises `RecursionWithoutBaseCase`.
    pub max_instantiation_depth: usize,
    /// Treat warnings (currently none are emitted) as errors. Carried for
    /// parity with the compiler driver's `-Werror`-style flag; unused until
    /// a warning-producing check is added.
    pub warnings_as_errors: bool,
}

impl Default for InferConfig {
    fn default() -> Self {
        InferConfig { max_instantiation_depth: 256, warnings_as_errors: false }
    }
}

/// One lexical scope's variable bindings: name -> the cell that holds its
/// type (typically the most recent assignment's node, or a block/method
/// parameter node).
pub(crate) type VarScope = FxHashMap<String, NodeId>;

/// Everything the Inference Visitor (§4.4) and Call Resolver (§4.5) share
/// and mutate while walking one compilation unit.
pub struct InferSession {
    pub ast: Ast,
    pub registry: glint_types::TypeRegistry,
    pub builtins: Builtins,
    pub config: InferConfig,
    pub errors: Vec<TypeError>,

    pub(crate) scopes: Vec<VarScope>,
    /// Floors below which `lookup_var` may not descend, pushed by a method
    /// instantiation's scope root (§4.4: "blocks may keep the outer chain,
    /// methods may not"). A block's `push_scope` pushes no barrier, so it
    /// still sees every enclosing scope.
    pub(crate) scope_barriers: Vec<usize>,
    pub(crate) self_stack: Vec<Ty>,
    pub(crate) class_stack: Vec<ClassId>,
    /// The enclosing Def/Block's "return channel" cell that `return` /
    /// implicit tail expressions / `yield` widen, per §4.4.
    pub(crate) return_channel_stack: Vec<NodeId>,
    pub(crate) instantiation_depth: usize,
    /// Active instantiations, innermost last, for `RecursionWithoutBaseCase`
    /// to report a traceback from (§6: "innermost call, outer call,
    /// top-level").
    pub(crate) call_stack: Vec<CallStackFrame>,

    /// For each call node, the instantiations the resolver chose -- one per
    /// concrete receiver for a `Hierarchy` dispatch, per §6's `target_def`.
    pub target_defs: FxHashMap<NodeId, Vec<MethodId>>,

    /// Which classes syntactically assign (resp. merely read) which
    /// instance-variable names anywhere in their own method bodies, built
    /// by a pre-pass over the whole program before the real inference walk.
    /// Drives the hoisting decision in `visitor::ivar_owner`.
    pub(crate) ivar_writers: FxHashMap<ClassId, std::collections::HashSet<String>>,
    pub(crate) ivar_readers: FxHashMap<ClassId, std::collections::HashSet<String>>,

    /// Argument-node -> the call nodes that read it at resolution time.
    /// When one of those argument nodes later widens (an expected event in
    /// cyclic/mutually-recursive dataflow, §4.3), the Call Resolver looks
    /// here to know which calls to re-resolve (§4.5 step 6).
    pub(crate) call_arg_observers: FxHashMap<NodeId, Vec<NodeId>>,
}

impl InferSession {
    pub fn new() -> Self {
        Self::with_config(InferConfig::default())
    }

    pub fn with_config(config: InferConfig) -> Self {
        let mut registry = glint_types::TypeRegistry::new();
        let builtins = builtins::install(&mut registry);
        let object_ty = Ty::Instance(builtins.object);
        InferSession {
            ast: Ast::new(),
            registry,
            builtins,
            config,
            errors: Vec::new(),
            scopes: vec![VarScope::default()],
            scope_barriers: Vec::new(),
            self_stack: vec![object_ty],
            class_stack: vec![],
            return_channel_stack: Vec::new(),
            instantiation_depth: 0,
            call_stack: Vec::new(),
            target_defs: FxHashMap::default(),
            ivar_writers: FxHashMap::default(),
            ivar_readers: FxHashMap::default(),
            call_arg_observers: FxHashMap::default(),
        }
    }

    pub fn current_self(&self) -> Ty {
        self.self_stack.last().cloned().unwrap_or_else(Ty::nil)
    }

    pub fn current_class(&self) -> ClassId {
        self.class_stack.last().copied().unwrap_or(self.builtins.object)
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(VarScope::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Seal off every scope below the current depth from `lookup_var`. Call
    /// immediately before the `push_scope` that opens a method
    /// instantiation's body, so that scope (and anything nested under it)
    /// stays visible while everything outside the call does not.
    pub(crate) fn push_scope_barrier(&mut self) {
        self.scope_barriers.push(self.scopes.len());
    }

    pub(crate) fn pop_scope_barrier(&mut self) {
        self.scope_barriers.pop();
    }

    pub(crate) fn bind_var(&mut self, name: &str, cell: NodeId) {
        self.scopes.last_mut().expect("at least one scope").insert(name.to_string(), cell);
    }

    pub(crate) fn lookup_var(&self, name: &str) -> Option<NodeId> {
        let floor = self.scope_barriers.last().copied().unwrap_or(0);
        for scope in self.scopes[floor..].iter().rev() {
            if let Some(id) = scope.get(name) {
                return Some(*id);
            }
        }
        None
    }

    /// The type a node settled on, or `Nil` if inference never reached it
    /// (e.g. dead code past an unconditional `return`).
    pub fn type_of(&self, node: NodeId) -> Ty {
        self.ast.node(node).type_cell.clone().unwrap_or_else(Ty::nil)
    }
}

impl Default for InferSession {
    fn default() -> Self {
        Self::new()
    }
}
