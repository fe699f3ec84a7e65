//! Stable ID newtypes for logical-form graph entities.
//!
//! Both IDs are distinct newtype wrappers over `u32`, so a `NodeId` cannot be
//! accidentally used where an `EdgeId` is expected.

use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

/// Stable node identifier. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Stable role-edge identifier. Maps to a petgraph `EdgeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeIndex<u32>> for NodeId {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeId(idx.index() as u32)
    }
}

impl From<NodeId> for NodeIndex<u32> {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

impl From<EdgeIndex<u32>> for EdgeId {
    fn from(idx: EdgeIndex<u32>) -> Self {
        EdgeId(idx.index() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LogicalForm;
    use crate::node::LfNode;

    #[test]
    fn logical_form_ids_follow_insertion_order() {
        let mut lf = LogicalForm::new();
        let sa = lf.add_node(LfNode::new("SPEECHACT", "SA_REQUEST"));
        let verb = lf.add_node(LfNode::new("F", "MOVE"));
        assert_eq!((sa, verb), (NodeId(0), NodeId(1)));
        assert_eq!(NodeIndex::<u32>::from(verb).index(), 1);

        let edge = lf.add_role(sa, "CONTENT", verb).unwrap();
        assert_eq!(edge, EdgeId::from(EdgeIndex::<u32>::new(0)));
    }

    #[test]
    fn ids_render_as_bare_numbers() {
        assert_eq!(NodeId(7).to_string(), "7");
        assert_eq!(EdgeId(99).to_string(), "99");
        assert_eq!(serde_json::to_string(&NodeId(42)).unwrap(), "42");
        assert_eq!(serde_json::from_str::<NodeId>("3").unwrap(), NodeId(3));
    }
}
