//! Pool↔worker IPC protocol
//!
//! The protocol has exactly three surfaces:
//!
//! - **Start arguments** ([`args`]): three positional strings — the JSON
//!   unit descriptor, the plain output directory, and the JSON plugin
//!   descriptor list.
//! - **Config codec** ([`codec`]): a tagged union that lets regular
//!   expressions inside plugin configuration round-trip through JSON.
//! - **Log envelope** ([`envelope`]): the only child→parent message shape.
//!   Analysis results never cross IPC; they are exchanged through the
//!   filesystem, which avoids transport size and fidelity limits.

pub mod args;
pub mod codec;
pub mod envelope;

pub use args::{ArgsError, WorkerArgs};
pub use codec::{ConfigValue, Pattern, PatternError};
pub use envelope::WorkerMessage;
