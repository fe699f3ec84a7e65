//! Core error types for vcf-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering graph
//! construction and the logical-form input adapters.

use crate::id::NodeId;
use thiserror::Error;

/// Errors produced while building or decoding a logical form.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node index was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A role edge was declared with an empty name.
    #[error("role name must not be empty (from node {from})")]
    EmptyRoleName { from: NodeId },

    /// The XML reader rejected the input.
    #[error("malformed xml at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// The RDF document is well-formed XML but not a usable logical form.
    #[error("invalid logical form: {reason}")]
    InvalidLogicalForm { reason: String },

    /// The JSON encoding of a logical form could not be decoded.
    #[error("malformed logical-form json at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    /// A `rdf:resource` reference names a description that does not exist.
    #[error("role '{role}' of '{from}' references unknown description '{target}'")]
    DanglingResource {
        from: String,
        role: String,
        target: String,
    },
}
