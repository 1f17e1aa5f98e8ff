//! The AST data contract (§1, §6): the shape the parser collaborator hands
//! to the type-inference core, and nothing about how it got there.

pub mod build;
pub mod node;

pub use node::{child_ids, clone_subtree, Ast, BlockParamSyntax, Node, NodeKind, ParamSyntax, RescueClause, StringPart};
