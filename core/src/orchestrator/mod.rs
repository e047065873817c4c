//! Batch orchestration: the engine, progress display, and run reports.

mod engine;
mod progress;
mod report;

pub use engine::Orchestrator;
pub use progress::ProgressMonitor;
pub use report::{RunReport, RunSummary, TaskRow};
