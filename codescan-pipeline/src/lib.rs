//! Codescan Pipeline - Per-unit staged plugin execution
//!
//! This crate owns everything that runs inside one worker process:
//!
//! - [`pipeline`] — the four-phase tap pipeline (code → project →
//!   dependency → quality)
//! - [`context`] — the per-unit execution context threaded through every tap
//! - [`plugin`] — the [`ScanPlugin`] trait all analyzers implement
//! - [`registry`] — the explicit name → factory registry for built-in
//!   plugins, plus external executable resolution
//! - [`plugins`] — reference built-in analyzers and the external-command
//!   plugin
//!
//! The companion `codescan-worker` binary (`src/bin/worker.rs`) wires
//! these together for one unit: decode start arguments, construct plugins,
//! run the pipeline, persist results, flush the log, exit.
//!
//! # Execution contract
//!
//! Phases run strictly in order; within a phase, taps run strictly in
//! registration order, each fully awaited before the next starts. Later
//! taps may read result namespaces earlier taps populated — this ordering
//! is a contract, not an accident. Plugins self-isolate: a well-behaved
//! tap never lets an error escape, it logs the failure and records `null`
//! under its own namespace. The pipeline provides no safety net — an
//! error escaping a tap aborts all remaining phases and fails the unit.

pub mod context;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod registry;

pub use context::ExecutionContext;
pub use pipeline::{BoxFuture, Phase, PipelineError, PluginPipeline};
pub use plugin::{PluginError, ScanPlugin};
pub use registry::PluginRegistry;
