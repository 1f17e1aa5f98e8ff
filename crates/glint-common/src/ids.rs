//! Small interned-index newtypes shared by `glint-ast` and `glint-types`.
//!
//! Keeping these here (rather than in either crate) lets `glint-types` store
//! `NodeId`s (e.g. an instance variable's backing cell) without depending on
//! `glint-ast`, while `glint-ast` stores `ClassId`/`MethodId` (e.g. on a call
//! node's resolved target) without depending on `glint-types`.

/// Index of an AST node within a compilation's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Index of a class (or module, or lib scope) descriptor within a
/// [`TypeRegistry`](../glint_types/registry/struct.TypeRegistry.html)'s
/// class arena. Two descriptors are identical iff their `ClassId`s match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Index of a method definition (one overload) within a class's method
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);
