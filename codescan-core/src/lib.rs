//! Codescan Core - Foundation crate for the codescan analysis platform
//!
//! This crate provides the shared building blocks used by the worker pool
//! and the per-unit analysis pipeline:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with file and environment variable support
//! - [`domain`] — Units, plugin descriptors, scan results, and the run manifest
//! - [`ipc`] — The pool↔worker protocol: start arguments, pattern-safe config codec, log envelope
//! - [`logging`] — Per-process structured logging with file, console, and forwarding sinks
//!
//! # Architecture
//!
//! ```text
//! codescan-core/
//! ├── domain/           # Unit, PluginDescriptor, ScanResults, Manifest
//! ├── ipc/              # ConfigValue/Pattern codec, WorkerMessage, WorkerArgs
//! ├── logging/          # Logger + sinks (console, file, stdout forwarding)
//! └── config/           # Configuration loading and validation
//! ```
//!
//! # Configuration
//!
//! Environment variables use the `CODESCAN__` prefix with double underscore
//! separators:
//!
//! ```bash
//! CODESCAN__SCAN__MAX_CONCURRENT_UNITS=8
//! CODESCAN__SCAN__OUTPUT_ROOT=/var/lib/codescan
//! ```

pub mod config;
pub mod domain;
pub mod ipc;
pub mod logging;

pub use config::Config;
pub use logging::{LogLevel, Logger};
