//! Dependency-graph type inference for the Glint compiler: the Type
//! Lattice and Type Registry ([`glint_types`]), the Dependency Graph
//! ([`graph`]), the Inference Visitor ([`visitor`]), and the Call Resolver
//! ([`resolver`]) that together turn an untyped [`glint_ast::Ast`] into one
//! with every node's type cell settled at a fixpoint.
//!
//! Out of scope here, per the surrounding compiler's module boundaries:
//! lexing/parsing (the `Ast` arrives already built), LLVM codegen (consumes
//! `target_defs` and `TypeRegistry::mangle_method` once inference is done),
//! the stdlib prelude as source text (modeled instead by [`builtins`]), and
//! the CLI driver.

pub mod builtins;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod session;
pub mod visitor;

pub use builtins::Builtins;
pub use error::TypeError;
pub use session::{InferConfig, InferSession};

/// Run inference over a whole compilation unit: register every class and
/// module, then walk the program wiring dependency edges to a fixpoint.
/// Returns the accumulated [`TypeError`]s, if any; the typed `Ast` and
/// `TypeRegistry` remain on `session` for the codegen collaborator to read.
pub fn infer(session: &mut InferSession, program: glint_common::NodeId) -> &[TypeError] {
    visitor::infer_program(session, program);
    &session.errors
}
