pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod json;
pub mod node;
pub mod rdf;
pub mod xml;

// Re-export commonly used types
pub use edge::RoleEdge;
pub use error::CoreError;
pub use graph::LogicalForm;
pub use id::{EdgeId, NodeId};
pub use node::{LfNode, Span};
