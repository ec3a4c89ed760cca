//! Child→parent log envelope

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Message sent from a worker process to the pool, one JSON object per
/// stdout line.
///
/// The protocol is log-only. The pool ignores any line that does not
/// parse as this envelope, so worker code is free to print diagnostics to
/// stderr and the envelope channel stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Log { level: LogLevel, text: String },
}

impl WorkerMessage {
    /// Parse one stdout line; `None` for anything that is not an envelope.
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    /// Encode as a single line for the stdout channel.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
