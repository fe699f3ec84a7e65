//! Logical-form graph nodes.
//!
//! An [`LfNode`] is one term of a parsed utterance: a speech act, an event, a
//! referent, or a closed-class literal such as a tense value. Nodes carry the
//! parser's metadata only; their relations live on the role edges of the
//! owning [`LogicalForm`](crate::graph::LogicalForm).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Character offsets of the utterance text a node covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

/// A node of the logical-form graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfNode {
    /// Parser-assigned identifier (`V12345` in TRIPS output).
    pub var: Option<String>,
    /// Lexical indicator: `SPEECHACT`, `F`, `BARE`, `THE`, ...
    pub indicator: Option<String>,
    /// Semantic type tag, e.g. `SA_REQUEST` or `PERSON`.
    #[serde(rename = "type")]
    pub lf_type: Option<String>,
    /// Surface word this node was built from.
    pub word: Option<String>,
    /// Closed-class literal value (tense, modality, ...).
    pub literal: Option<String>,
    /// Surface span, when the parser reports one.
    pub span: Option<Span>,
}

impl LfNode {
    /// Creates a node with an indicator and a type tag.
    pub fn new(indicator: impl Into<String>, lf_type: impl Into<String>) -> Self {
        LfNode {
            indicator: Some(indicator.into()),
            lf_type: Some(lf_type.into()),
            ..LfNode::default()
        }
    }

    /// Creates a literal-only node, the target of a closed-class role.
    pub fn literal(value: impl Into<String>) -> Self {
        LfNode {
            literal: Some(value.into()),
            ..LfNode::default()
        }
    }

    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.word = Some(word.into());
        self
    }

    pub fn with_var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    pub fn with_span(mut self, start: u32, end: u32) -> Self {
        self.span = Some(Span { start, end });
        self
    }

    /// Returns `true` if this node only carries a literal value.
    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
            && self.indicator.is_none()
            && self.lf_type.is_none()
            && self.word.is_none()
    }

    /// The value a template binds for this node: its word, else its literal,
    /// else its type tag.
    pub fn value(&self) -> Option<&str> {
        self.word
            .as_deref()
            .or(self.literal.as_deref())
            .or(self.lf_type.as_deref())
    }
}

impl fmt::Display for LfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(literal) = &self.literal {
            if self.is_literal() {
                return write!(f, "{}", literal);
            }
        }
        write!(f, "(")?;
        let mut first = true;
        for part in [&self.indicator, &self.lf_type, &self.word].into_iter().flatten() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", part)?;
            first = false;
        }
        write!(f, ")")
    }
}
