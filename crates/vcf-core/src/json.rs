//! JSON encoding of a [`LogicalForm`].
//!
//! The format is the serde representation of the graph. Decoding checks that
//! the declared root exists, since serde alone cannot.

use crate::error::CoreError;
use crate::graph::LogicalForm;

/// Decodes a logical form from JSON.
pub fn parse_json(src: &str) -> Result<LogicalForm, CoreError> {
    let lf: LogicalForm = serde_json::from_str(src).map_err(|err| CoreError::Json {
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
    })?;
    if let Some(root) = lf.root() {
        if lf.node(root).is_none() {
            return Err(CoreError::InvalidLogicalForm {
                reason: format!("root {} is not a node of the graph", root),
            });
        }
    }
    Ok(lf)
}

/// Encodes a logical form as pretty-printed JSON.
pub fn to_json(lf: &LogicalForm) -> Result<String, CoreError> {
    serde_json::to_string_pretty(lf).map_err(|err| CoreError::Json {
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
    })
}
