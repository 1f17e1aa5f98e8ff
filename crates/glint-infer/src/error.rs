//! The error taxonomy of §7, and conversion into renderable
//! [`glint_common::Diagnostic`]s.
//!
//! These are accumulated on the [`crate::session::InferSession`] rather than
//! returned as `Result`s: a type error does not unwind the visitor, so later
//! nodes can still widen and later errors can still be found in the same
//! pass. The *compiler* (not modeled in this repo) is what stops at the
//! first one, per §6/§7's "exits non-zero on the first error".

use glint_common::{Diagnostic, NodeId, Span};
use glint_types::Ty;

#[derive(Debug, Clone)]
pub enum TypeError {
    /// A variable, constant, or method could not be resolved.
    UndefinedName { name: String, span: Span },
    /// A call's argument types satisfy no overload's restrictions.
    NoOverloadMatches { method: String, receiver: Ty, args: Vec<Ty>, span: Span },
    /// A declared return type conflicts with the inferred body type, or an
    /// instance-var declaration conflicts with an assignment.
    TypeMismatch { expected: Ty, found: Ty, span: Span },
    /// A concrete subclass of an abstract class omits an overload required
    /// by the dispatch tables of sibling concrete subclasses.
    AbstractMethodMissing { class_name: String, method: String, span: Span },
    /// Inference widened past the configured instantiation-depth limit
    /// without reaching a fixpoint (§7: "guarded by a depth limit"). `trace`
    /// is the call stack at the point the limit was hit, innermost call
    /// first, per §6's "innermost call, outer call, top-level" contract.
    RecursionWithoutBaseCase { method: String, span: Span, trace: Vec<CallStackFrame> },
    /// A subclass alone writes `@x` while an ancestor only reads it; per
    /// §9's open question, the stricter hoist-on-write-in-both rule means
    /// this is an error rather than a silent non-hoist.
    AmbiguousInstanceVarOwner { name: String, span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::UndefinedName { span, .. }
            | TypeError::NoOverloadMatches { span, .. }
            | TypeError::TypeMismatch { span, .. }
            | TypeError::AbstractMethodMissing { span, .. }
            | TypeError::RecursionWithoutBaseCase { span, .. }
            | TypeError::AmbiguousInstanceVarOwner { span, .. } => *span,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            TypeError::UndefinedName { .. } => "E0001",
            TypeError::NoOverloadMatches { .. } => "E0002",
            TypeError::TypeMismatch { .. } => "E0003",
            TypeError::AbstractMethodMissing { .. } => "E0004",
            TypeError::RecursionWithoutBaseCase { .. } => "E0005",
            TypeError::AmbiguousInstanceVarOwner { .. } => "E0006",
        }
    }

    /// Render into the generic diagnostic record `glint-common` knows how
    /// to pretty-print with `ariadne`. Type names are rendered with the
    /// registry's `llvm_name` by the caller before this point where a
    /// human-facing name is needed -- here we use `Display` on `Ty`, which
    /// is good enough for a message but not stable enough for codegen.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match self {
            TypeError::UndefinedName { name, .. } => format!("undefined name `{name}`"),
            TypeError::NoOverloadMatches { method, receiver, args, .. } => {
                let arg_list: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                format!("no overload of `{method}` on `{receiver}` matches ({})", arg_list.join(", "))
            }
            TypeError::TypeMismatch { expected, found, .. } => {
                format!("expected `{expected}`, found `{found}`")
            }
            TypeError::AbstractMethodMissing { class_name, method, .. } => {
                format!("`{class_name}` does not implement abstract method `{method}`")
            }
            TypeError::RecursionWithoutBaseCase { method, trace, .. } => {
                let mut msg = format!("`{method}` widens indefinitely: no fixpoint within the instantiation-depth limit");
                for (depth, frame) in trace.iter().enumerate() {
                    msg.push_str(&format!("\n  [{depth}] called from {:?}", frame.call_site));
                }
                msg
            }
            TypeError::AmbiguousInstanceVarOwner { name, .. } => {
                format!("`@{name}` is written only by a subclass while an ancestor reads it; move the write up or the read down")
            }
        };
        Diagnostic::error(self.code(), message, self.span())
    }
}

/// A node reference attached to an error for traceback purposes: "innermost
/// call, outer call, top-level" per §6's diagnostics contract.
#[derive(Debug, Clone)]
pub struct CallStackFrame {
    pub call_site: NodeId,
    pub span: Span,
}
