//! Role edges of the logical-form graph.
//!
//! A [`RoleEdge`] connects a node to one of its arguments under a named role
//! (`AGENT`, `CONTENT`, `MOD`, ...). A node may have several edges with the
//! same role name, e.g. conjunction or coreference.

use serde::{Deserialize, Serialize};

/// A named relation from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEdge {
    pub role: String,
}

impl RoleEdge {
    pub fn new(role: impl Into<String>) -> Self {
        RoleEdge { role: role.into() }
    }

    /// Role names compare ASCII case-insensitively: TRIPS prints them upper
    /// case, templates are written by hand.
    pub fn is(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}
