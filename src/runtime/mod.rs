/// Runtime execution layer
///
/// Everything that happens between "a run request was dequeued" and "a
/// context map came back":
/// - worklist graph traversal with branching, looping and error routing
/// - per-type node effect handlers
/// - expression token resolution against accumulated outputs
/// - background cron firing for schedule-trigger nodes

// FIFO worklist traversal over the workflow graph
pub mod engine;

// Per-type node effect handlers
pub mod executor;

// {{nodeId.path}} token resolution
pub mod expression;

// Loose value comparison helpers shared by engine and executor
pub mod coerce;

// Engine error taxonomy
pub mod error;

// Background scheduler for schedule-trigger nodes
pub mod scheduler;

pub use engine::{ExecutionEngine, MAX_STEPS};
pub use error::EngineError;
pub use executor::NodeExecutor;
pub use scheduler::ScheduleService;
