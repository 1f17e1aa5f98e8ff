//! The type lattice: `Primitive`, `Ty`, and the canonicalization rules that
//! keep `Union`s flat and deduplicated.
//!
//! `merge`, `subtype`, and `llvm_name` need to consult the class hierarchy
//! (rule (iii) of merge, and the "is this class open" question) so they are
//! implemented as [`crate::registry::TypeRegistry`] methods rather than
//! free functions on `Ty`; this module owns only the data and the
//! hierarchy-independent parts of canonicalization.

use std::fmt;

use glint_common::ClassId;

/// One of the language's built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Nil,
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Symbol,
    Void,
}

impl Primitive {
    /// The primitive a bare (unsuffixed) integer literal types as.
    pub fn default_int() -> Primitive {
        Primitive::Int32
    }

    /// The primitive a bare (unsuffixed) float literal types as.
    pub fn default_float() -> Primitive {
        Primitive::Float64
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Nil => "Nil",
            Primitive::Bool => "Bool",
            Primitive::Char => "Char",
            Primitive::Int8 => "Int8",
            Primitive::Int16 => "Int16",
            Primitive::Int32 => "Int32",
            Primitive::Int64 => "Int64",
            Primitive::Float32 => "Float32",
            Primitive::Float64 => "Float64",
            Primitive::String => "String",
            Primitive::Symbol => "Symbol",
            Primitive::Void => "Void",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A Glint type, per §3 of the data model.
///
/// `PartialEq`/`Eq`/`Hash` are structural, but since `ClassId` is an interned
/// index, structural equality between two `Instance`/`Generic`/`Hierarchy`/
/// `Metaclass` values *is* identity equality over class descriptors, as the
/// data model requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A built-in scalar type.
    Primitive(Primitive),
    /// A single concrete class, with no type arguments.
    Instance(ClassId),
    /// A parametric class instantiated with concrete type arguments, in
    /// declaration order. `Generic(C, [])` is never constructed -- a
    /// zero-arity class is represented as `Instance(C)`.
    Generic(ClassId, Vec<Ty>),
    /// An unordered set of at least two distinct types. Always canonical:
    /// flattened (no member is itself a `Union`) and deduplicated. Construct
    /// only through [`Ty::union`] or [`crate::registry::TypeRegistry::merge`].
    Union(Vec<Ty>),
    /// "This class, or any of its transitive concrete subclasses." Collapsed
    /// into from a `Union` by [`crate::registry::TypeRegistry::merge`]; never
    /// constructed directly by the visitor.
    Hierarchy(ClassId),
    /// The type of a class value itself (as opposed to an instance of it).
    Metaclass(ClassId),
}

impl Ty {
    pub fn nil() -> Ty {
        Ty::Primitive(Primitive::Nil)
    }

    pub fn bool() -> Ty {
        Ty::Primitive(Primitive::Bool)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Ty::Primitive(Primitive::Nil))
    }

    /// Build a canonical union from a non-empty, non-canonical list of
    /// member types: flattens nested unions, drops duplicates, and
    /// collapses a singleton back down to its one member.
    ///
    /// Does not know about hierarchy collapse (rule (iii) of merge) -- that
    /// requires the class registry and lives in
    /// [`crate::registry::TypeRegistry::merge`].
    pub fn union(members: impl IntoIterator<Item = Ty>) -> Ty {
        let mut flat: Vec<Ty> = Vec::new();
        for m in members {
            match m {
                Ty::Union(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        let mut deduped: Vec<Ty> = Vec::new();
        for m in flat {
            if !deduped.contains(&m) {
                deduped.push(m);
            }
        }
        match deduped.len() {
            0 => Ty::Primitive(Primitive::Nil),
            1 => deduped.into_iter().next().unwrap(),
            _ => Ty::Union(deduped),
        }
    }

    /// Whether `self` is a canonical union with no nested unions and no
    /// fewer than two members. Used by invariant tests (§8 property 2).
    pub fn is_canonical(&self) -> bool {
        match self {
            Ty::Union(members) => {
                members.len() >= 2
                    && members.iter().all(|m| !matches!(m, Ty::Union(_)) && m.is_canonical())
            }
            Ty::Generic(_, args) => args.iter().all(Ty::is_canonical),
            _ => true,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Primitive(p) => write!(f, "{p}"),
            Ty::Instance(c) => write!(f, "#{}", c.0),
            Ty::Generic(c, args) => {
                write!(f, "#{}(", c.0)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Ty::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            Ty::Hierarchy(c) => write!(f, "#{}+", c.0),
            Ty::Metaclass(c) => write!(f, "#{}.class", c.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_one_collapses() {
        let ty = Ty::union(vec![Ty::Primitive(Primitive::Int32)]);
        assert_eq!(ty, Ty::Primitive(Primitive::Int32));
    }

    #[test]
    fn union_flattens_nested() {
        let inner = Ty::union(vec![Ty::Primitive(Primitive::Int32), Ty::Primitive(Primitive::Char)]);
        let outer = Ty::union(vec![inner, Ty::Primitive(Primitive::Bool)]);
        match outer {
            Ty::Union(members) => {
                assert_eq!(members.len(), 3);
                assert!(members.iter().all(|m| !matches!(m, Ty::Union(_))));
            }
            other => panic!("expected Union, got {other:?}"),
        }
    }

    #[test]
    fn union_dedups() {
        let ty = Ty::union(vec![
            Ty::Primitive(Primitive::Int32),
            Ty::Primitive(Primitive::Int32),
            Ty::Primitive(Primitive::Char),
        ]);
        match ty {
            Ty::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("expected Union, got {other:?}"),
        }
    }

    #[test]
    fn is_canonical_rejects_singleton_union() {
        let singleton = Ty::Union(vec![Ty::Primitive(Primitive::Int32)]);
        assert!(!singleton.is_canonical());
    }

    #[test]
    fn is_canonical_rejects_nested_union() {
        let nested = Ty::Union(vec![
            Ty::Union(vec![Ty::Primitive(Primitive::Int32), Ty::Primitive(Primitive::Char)]),
            Ty::Primitive(Primitive::Bool),
        ]);
        assert!(!nested.is_canonical());
    }
}
