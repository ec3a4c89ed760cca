//! Reference built-in plugins and the external-command plugin
//!
//! Analyzer internals are deliberately small here: these plugins exist to
//! exercise the orchestration contract end to end. Each one registers a
//! single tap, catches its own failures, and records `null` under its
//! namespace when it fails.

pub mod count;
pub mod deps;
pub mod external;
pub mod quality;
