//! Explain-mode reporting: why a command did not match.

use std::fmt;

use serde::Serialize;

use vcf_core::id::NodeId;

use crate::model::PatternId;

/// The deepest point at which a command's pattern failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub pattern: PatternId,
    pub node: NodeId,
    /// Nesting depth of `pattern` below the command root.
    pub depth: usize,
    pub reason: MismatchReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchReason {
    Indicator {
        expected: String,
        found: Option<String>,
    },
    Type {
        expected: String,
        found: Option<String>,
    },
    Word {
        expected: String,
        found: Option<String>,
    },
    MissingRole {
        role: String,
    },
    Literal {
        role: String,
        expected: String,
    },
    NoAlternative {
        tried: usize,
    },
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn found(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("nothing")
        }
        match self {
            MismatchReason::Indicator { expected, found: got } => {
                write!(f, "indicator {} expected, found {}", expected, found(got))
            }
            MismatchReason::Type { expected, found: got } => {
                write!(f, "type {} expected, found {}", expected, found(got))
            }
            MismatchReason::Word { expected, found: got } => {
                write!(f, "word in [{}] expected, found {}", expected, found(got))
            }
            MismatchReason::MissingRole { role } => write!(f, "no :{} role", role),
            MismatchReason::Literal { role, expected } => {
                write!(f, ":{} does not carry {}", role, expected)
            }
            MismatchReason::NoAlternative { tried } => {
                write!(f, "none of {} rolegroup alternatives matched", tried)
            }
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pattern {} vs node {} (depth {}): {}",
            self.pattern, self.node, self.depth, self.reason
        )
    }
}

/// Outcome of trying one command in explain mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTrial {
    pub command: String,
    pub matched: bool,
    /// Deepest failure across all roots; `None` when matched.
    pub mismatch: Option<Mismatch>,
}
