//! The prelude (§8 scenario 6: "after prelude is required"): primitive
//! shadow classes so operator calls dispatch like any other method, plus
//! the `Array(T)` / `Hash(K, V)` generic containers and the root
//! `Exception` class rescue clauses default to.
//!
//! None of this is modeled as source text (the real prelude is consumed as
//! source by the parser collaborator, which is out of scope here); instead
//! it pre-populates the [`TypeRegistry`] the way a from-scratch compilation
//! would after requiring it, so tests can exercise generics and operators
//! without hand-writing class declarations every time.

use glint_common::ClassId;
use glint_types::{Param, Primitive, Restriction, TypeRegistry};
use rustc_hash::FxHashMap;

/// Handles into the registry for the types the Call Resolver and visitor
/// need to reference by name rather than by re-resolving a path each time.
pub struct Builtins {
    pub object: ClassId,
    pub exception: ClassId,
    pub array: ClassId,
    pub hash: ClassId,
    /// Shadow class standing in for each primitive as a method-dispatch
    /// receiver, e.g. arithmetic operators on `Int32`.
    primitive_classes: FxHashMap<Primitive, ClassId>,
}

impl Builtins {
    /// Class id backing primitive `p` for method lookup, if the prelude
    /// registered operators on it.
    pub fn class_for_primitive(&self, p: Primitive) -> Option<ClassId> {
        self.primitive_classes.get(&p).copied()
    }
}

/// Numeric primitives that get the standard arithmetic/comparison operator
/// suite; `Bool`/`Nil`/`Void`/`Symbol` are left without shadow classes since
/// no built-in method resolves through them in these scenarios.
const NUMERIC: &[Primitive] =
    &[Primitive::Int8, Primitive::Int16, Primitive::Int32, Primitive::Int64, Primitive::Float32, Primitive::Float64];

fn unrestricted_param(name: &str) -> Param {
    Param { name: name.to_string(), restriction: None, default: None }
}

/// Populate `registry` with the prelude's classes and operator overloads.
/// Operator bodies are "primitive" (§4.5: "opaque to inference... return
/// type comes from a declaration table"), so they're registered with a
/// `NodeId` that the resolver never actually type-infers through --
/// `define_method`'s `body` slot is unused by primitive overloads; the
/// resolver special-cases them by owner instead of invoking the
/// instantiation machinery. See [`crate::resolver::is_primitive_owner`].
pub fn install(registry: &mut TypeRegistry) -> Builtins {
    let root = registry.root();
    let object = root;
    let exception = registry.define_class(root, "Exception", Some(object), false, false);
    let array = registry.define_class(root, "Array", Some(object), false, false);
    registry.class_mut(array).type_params = vec!["T".to_string()];
    let hash = registry.define_class(root, "Hash", Some(object), false, false);
    registry.class_mut(hash).type_params = vec!["K".to_string(), "V".to_string()];

    let mut primitive_classes = FxHashMap::default();
    for &p in NUMERIC {
        let shadow = registry.define_class(root, p.name(), Some(object), false, false);
        install_numeric_operators(registry, shadow, p);
        primitive_classes.insert(p, shadow);
    }

    Builtins { object, exception, array, hash, primitive_classes }
}

fn install_numeric_operators(registry: &mut TypeRegistry, owner: ClassId, p: Primitive) {
    use glint_common::NodeId;
    // The body id is a placeholder: primitive overloads never visit a body
    // (see `install`'s doc comment), so any sentinel works as long as the
    // resolver never dereferences it for these owners. Their return type
    // instead comes from `declared_return`, the "declaration table" §4.5
    // describes for primitive bodies.
    let sentinel_body = NodeId(u32::MAX);
    let same_type = Restriction::Path(p.name().to_string());
    let arith = ["+", "-", "*", "/"];
    for op in arith {
        registry.define_method(
            owner,
            op,
            vec![unrestricted_param("other")],
            None,
            Some(same_type.clone()),
            sentinel_body,
            false,
        );
    }
    let compare = ["<", ">", "<=", ">=", "==", "!="];
    for op in compare {
        registry.define_method(
            owner,
            op,
            vec![unrestricted_param("other")],
            None,
            Some(Restriction::Path("Bool".to_string())),
            sentinel_body,
            false,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_array_and_hash_with_type_params() {
        let mut registry = TypeRegistry::new();
        let builtins = install(&mut registry);
        assert_eq!(registry.class(builtins.array).type_params, vec!["T".to_string()]);
        assert_eq!(registry.class(builtins.hash).type_params, vec!["K".to_string(), "V".to_string()]);
    }

    #[test]
    fn numeric_shadow_classes_carry_operators() {
        let mut registry = TypeRegistry::new();
        let builtins = install(&mut registry);
        let int32 = builtins.class_for_primitive(Primitive::Int32).unwrap();
        let overloads = registry.lookup_methods(int32, "+");
        assert_eq!(overloads.len(), 1);
    }
}
