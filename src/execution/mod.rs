/// Execution persistence layer
///
/// Durable records of runs (executions table) and their append-only log
/// trail (execution_logs table), plus the log sink abstraction the engine
/// writes through.

// Log entry type, sink trait and in-memory sink
pub mod log;

// SQLite execution store and log sink
pub mod store;

pub use log::{ExecutionLogEntry, ExecutionLogSink, LogLevel, MemoryLogSink};
pub use store::{ExecutionRecord, ExecutionStatus, ExecutionStore, SqliteLogSink};
