//! Parent-side scheduling of per-unit analysis processes.
//!
//! [`ProcessWorkerPool`] takes a list of units and runs one worker process
//! per unit, never more than a configured number at once. Admission is
//! first-in-first-out: when a slot frees up, the next unsubmitted unit in
//! the original list takes it. Every worker either settles into a
//! [`codescan_core::domain::ManifestEntry`] or rejects with a logged
//! error; one failing unit never aborts the run.

pub mod pool;

pub use pool::{PoolError, ProcessWorkerPool, UnitError};
