/// Workflow definition layer
///
/// The wire types the visual editor produces, their petgraph projection for
/// traversal, SQLite persistence, and the hot-reload in-memory registry.

// Wire format types
pub mod types;

// petgraph projection of a definition
pub mod graph;

// SQLite persistence
pub mod storage;

// ArcSwap hot-reload registry
pub mod registry;

pub use graph::WorkflowGraph;
pub use registry::{CompiledWorkflow, WorkflowRegistry};
pub use storage::{WorkflowMetadata, WorkflowStorage};
pub use types::{NodeType, StoredWorkflow, WorkflowDefinition, WorkflowEdge, WorkflowNode};
