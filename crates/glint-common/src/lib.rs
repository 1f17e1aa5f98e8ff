//! Shared infrastructure for the Glint compiler's front end: source spans,
//! rendered diagnostics, and the cross-file module dependency graph.
//!
//! Everything in this crate is domain-agnostic with respect to the Glint
//! language itself; `glint-ast`, `glint-types`, and `glint-infer` build on
//! top of it.

pub mod diagnostic;
pub mod ids;
pub mod module_graph;
pub mod span;

pub use diagnostic::{Diagnostic, Severity};
pub use ids::{ClassId, MethodId, NodeId};
pub use module_graph::{CycleError, ModuleGraph, ModuleId, ModuleInfo};
pub use span::{LineIndex, Span};
