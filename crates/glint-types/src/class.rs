//! Class descriptors and method definitions (§3 Data Model).

use rustc_hash::FxHashMap;

use glint_common::{ClassId, MethodId, NodeId};

use crate::restriction::Restriction;
use crate::ty::Ty;

/// A single formal parameter of a method.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// The declared type restriction, if any. Unrestricted parameters
    /// accept any argument type.
    pub restriction: Option<Restriction>,
    /// The default-value expression's AST node, evaluated in a scope where
    /// later parameters are visible, per §4.5 step 3.
    pub default: Option<NodeId>,
}

/// A block parameter's declared function-type signature, e.g.
/// `&block : (Int32) -> String`. `None` means the block is untyped (its
/// yielded-value type is inferred from the body instead).
#[derive(Debug, Clone)]
pub struct BlockParam {
    pub param_types: Vec<Restriction>,
    pub return_type: Option<Restriction>,
}

/// One overload of a method.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub id: MethodId,
    pub name: String,
    pub owner: ClassId,
    pub params: Vec<Param>,
    pub block_param: Option<BlockParam>,
    pub declared_return: Option<Restriction>,
    pub body: NodeId,
    /// `def`-level catch-all: no parameter has a restriction. Selected only
    /// when no more specific overload matches (§4.5 step 2).
    pub is_catch_all: bool,
}

/// The (owner-type, parameter-type-tuple, block-signature) key that
/// identifies one instantiation of a generic method or generic class
/// initializer, per §4.5 step 4 and §9's "method-instantiation cache" note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstantiationKey {
    pub owner: Ty,
    pub args: Vec<Ty>,
    pub block_sig: Option<(Vec<Ty>, Ty)>,
}

/// A resolved instantiation: the cloned, typed body and the node whose type
/// cell is the instantiation's return channel.
#[derive(Debug, Clone, Copy)]
pub struct Instantiation {
    pub body: NodeId,
    pub return_cell: NodeId,
}

/// A class, module, or `lib` scope descriptor.
///
/// Two descriptors are identical by `id` (object identity), per the data
/// model. `instance_vars` and `methods` are mutated in place by the
/// Inference Visitor as it walks bodies; they are never replaced wholesale.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub name: String,
    pub superclass: Option<ClassId>,
    pub type_params: Vec<String>,
    pub methods: FxHashMap<String, Vec<MethodId>>,
    /// Instance variable name -> the AST node that is its backing cell.
    /// Owned by the *nearest ancestor that also writes the name* (§3
    /// invariant, "instance-var hoisting"); a subclass that only reads or
    /// assigns a name also written by an ancestor has no entry here for it.
    pub instance_vars: FxHashMap<String, NodeId>,
    pub subclasses: Vec<ClassId>,
    /// Modules mixed in via `include`; consulted by method/ancestor lookup
    /// after the class's own methods and before the superclass's.
    pub includes: Vec<ClassId>,
    pub is_module: bool,
    pub is_abstract: bool,
    /// `true` for a `lib` scope: methods are not inferred, instance_vars
    /// unused, and fixed foreign members live in `foreign` instead.
    pub is_lib: bool,
    pub foreign: Vec<ForeignItem>,
    pub instantiation_cache: FxHashMap<(MethodId, InstantiationKey), Instantiation>,
}

impl ClassDescriptor {
    pub fn new(id: ClassId, name: impl Into<String>) -> Self {
        ClassDescriptor {
            id,
            name: name.into(),
            superclass: None,
            type_params: Vec::new(),
            methods: FxHashMap::default(),
            instance_vars: FxHashMap::default(),
            subclasses: Vec::new(),
            includes: Vec::new(),
            is_module: false,
            is_abstract: false,
            is_lib: false,
            foreign: Vec::new(),
            instantiation_cache: FxHashMap::default(),
        }
    }

    /// Whether this class is "open" for hierarchy-collapse purposes: it has
    /// at least one recorded concrete subclass (§4.1 rule iii).
    pub fn is_open(&self) -> bool {
        !self.subclasses.is_empty()
    }
}

/// A member of a `lib` (FFI) scope: `fun`, `type`, `struct`, `union`, or
/// `enum`. These are modeled like classes with fixed member lists and do
/// not participate in method inference (§4.2).
#[derive(Debug, Clone)]
pub enum ForeignItem {
    Fun {
        name: String,
        params: Vec<Restriction>,
        return_type: Option<Restriction>,
    },
    TypeAlias {
        name: String,
        target: Restriction,
    },
    Struct {
        name: String,
        fields: Vec<(String, Restriction)>,
    },
    Union {
        name: String,
        fields: Vec<(String, Restriction)>,
    },
    Enum {
        name: String,
        variants: Vec<String>,
    },
}
