//! Error types shared across the crate.

use thiserror::Error;

/// Errors produced by the reactive core and the expression layer.
///
/// Unresolvable binding paths are deliberately NOT represented here: a path
/// that cannot be resolved is an ordinary `None` result, not a failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A primitive was passed to [`reactive`](crate::reactive::reactive).
    /// Only objects and lists can be tracked.
    #[error("cannot make a `{kind}` value reactive: expected an object or a list")]
    NotTrackable {
        /// Type name of the rejected value.
        kind: &'static str,
    },

    /// The expression text falls outside the binding grammar.
    #[error("syntax error at {start}..{end}: {message}")]
    Syntax {
        /// Byte offset where the offending token starts.
        start: usize,
        /// Byte offset where the offending token ends.
        end: usize,
        /// Human-readable description of the violation.
        message: String,
    },

    /// An index segment in a binding path is not a non-negative integer.
    #[error("invalid index at {start}..{end}: {message}")]
    BadIndex {
        start: usize,
        end: usize,
        message: String,
    },
}

impl Error {
    pub(crate) fn syntax(span: crate::expr::Span, message: impl Into<String>) -> Self {
        Self::Syntax {
            start: span.start,
            end: span.end,
            message: message.into(),
        }
    }

    pub(crate) fn bad_index(span: crate::expr::Span, message: impl Into<String>) -> Self {
        Self::BadIndex {
            start: span.start,
            end: span.end,
            message: message.into(),
        }
    }
}
