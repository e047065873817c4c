//! Core engine for orchestrating batches of heterogeneous subagent tasks.
//!
//! The model is deliberately small: a [`task::Task`] describes one unit of
//! work, an [`executor::TaskExecutor`] knows how to run one task kind, and
//! the [`orchestrator::Orchestrator`] runs a batch under a bounded-parallelism
//! profile with dependency gating and per-task deadlines. Every task ends in
//! exactly one terminal [`task::TaskResult`]; a failing task never aborts the
//! batch.
//!
//! Consumers should import from [`api`], which re-exports the stable surface
//! and provides one-shot helpers for the common single-task flows.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod runner;
pub mod store;
pub mod task;
