//! Compile-time and match-time error types.
//!
//! [`TemplateError`] aborts loading of a template set; nothing is matched
//! against a partially compiled library. [`MatchError`] is reserved for
//! malformed inputs and exhausted resource bounds. An utterance that simply
//! fits no command is not an error (see
//! [`MatchOutcome::NoMatch`](crate::matcher::MatchOutcome::NoMatch)).

use thiserror::Error;

/// Errors produced by the template compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The document is not well-formed XML or does not have the expected
    /// element structure.
    #[error("{file}@{position}: syntax error: {message}")]
    Syntax {
        file: String,
        position: u64,
        message: String,
    },

    /// Two commands share a name.
    #[error("{file}@{position}: duplicate command '{name}'")]
    DuplicateCommand {
        file: String,
        position: u64,
        name: String,
    },

    /// Two components share an `id`.
    #[error("{file}@{position}: duplicate id '{id}'")]
    DuplicateIdentifier {
        file: String,
        position: u64,
        id: String,
    },

    /// A `from_id` names no component.
    #[error("{file}@{position}: from_id '{id}' does not name any component")]
    UnresolvedReference {
        file: String,
        position: u64,
        id: String,
    },

    /// Following `from_id` references leads back to a component that is
    /// still being resolved.
    #[error("cyclic from_id reference: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// An attribute or element content violates the template rules.
    #[error("{file}@{position}: invalid {attribute} on <{element}>: {reason}")]
    InvalidAttribute {
        file: String,
        position: u64,
        element: String,
        attribute: String,
        reason: String,
    },
}

/// Errors produced by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The logical form has no root, or an edge points at a missing node.
    #[error("malformed logical form: {reason}")]
    MalformedGraph { reason: String },

    #[error("recursion depth limit ({limit}) exceeded")]
    DepthLimitExceeded { limit: usize },

    #[error("step budget ({limit}) exhausted")]
    StepBudgetExhausted { limit: usize },
}
