//! Per-process structured logging
//!
//! Each process owns exactly one [`Logger`] for its whole lifetime; there
//! is no global singleton. The pool process logs to console plus the
//! aggregate `scanner.log`; each worker process logs to its private
//! `worker.log` and forwards every call to the pool through the stdout
//! log envelope, so the aggregate log interleaves all units by real-time
//! arrival.
//!
//! Sinks write and flush per line, so the on-disk log stays ordered and
//! durable even when the owning process crashes mid-run. [`Logger::flush`]
//! is still called explicitly before a worker exits so buffered writes
//! settle before the exit code is observed.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ipc::envelope::WorkerMessage;

/// Log severity. Tagging only; no filtering happens at any level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output target of a logger.
///
/// `log` receives both the raw text (for the forwarding sink, which
/// re-wraps it in the IPC envelope) and the timestamped line.
trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, text: &str, formatted: &str);
    fn flush(&self) -> io::Result<()>;
}

/// Console sink for the pool process.
struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, _level: LogLevel, _text: &str, formatted: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{formatted}");
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// File sink; truncates the target on creation so each run owns its log.
struct FileSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl LogSink for FileSink {
    fn log(&self, _level: LogLevel, _text: &str, formatted: &str) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{formatted}");
            // Flush per line so the log survives a crash of this process
            let _ = writer.flush();
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.writer.lock() {
            Ok(mut writer) => writer.flush(),
            Err(_) => Err(io::Error::other("log writer poisoned")),
        }
    }
}

/// Forwarding sink for worker processes: wraps every call in the IPC log
/// envelope and writes it as one line to the given writer (stdout in
/// production; injectable for tests).
struct ForwardSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ForwardSink {
    fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl LogSink for ForwardSink {
    fn log(&self, level: LogLevel, text: &str, _formatted: &str) {
        let message = WorkerMessage::Log {
            level,
            text: text.to_string(),
        };
        let Ok(line) = message.to_line() else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.writer.lock() {
            Ok(mut writer) => writer.flush(),
            Err(_) => Err(io::Error::other("forward writer poisoned")),
        }
    }
}

/// Per-process log sink with a fixed set of outputs.
pub struct Logger {
    sinks: Vec<Box<dyn LogSink>>,
}

impl Logger {
    /// Pool-side logger: console plus the aggregate run log file,
    /// truncated per run.
    pub fn for_pool(log_file: &Path) -> io::Result<Self> {
        Ok(Self {
            sinks: vec![Box::new(ConsoleSink), Box::new(FileSink::create(log_file)?)],
        })
    }

    /// Worker-side logger: private log file plus stdout envelope
    /// forwarding to the parent pool.
    pub fn for_worker(log_file: &Path) -> io::Result<Self> {
        Ok(Self {
            sinks: vec![
                Box::new(FileSink::create(log_file)?),
                Box::new(ForwardSink::stdout()),
            ],
        })
    }

    /// Worker-side logger with an injected forwarding writer. Test seam.
    pub fn for_worker_with_forward(
        log_file: &Path,
        forward: Box<dyn Write + Send>,
    ) -> io::Result<Self> {
        Ok(Self {
            sinks: vec![
                Box::new(FileSink::create(log_file)?),
                Box::new(ForwardSink::with_writer(forward)),
            ],
        })
    }

    pub fn log(&self, level: LogLevel, text: &str) {
        let formatted = format!(
            "[{}] [{}] {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            text
        );
        for sink in &self.sinks {
            sink.log(level, text, &formatted);
        }
    }

    pub fn info(&self, text: &str) {
        self.log(LogLevel::Info, text);
    }

    pub fn warn(&self, text: &str) {
        self.log(LogLevel::Warn, text);
    }

    pub fn error(&self, text: &str) {
        self.log(LogLevel::Error, text);
    }

    /// Flush every sink; returns once all buffered writes have settled.
    pub fn flush(&self) -> io::Result<()> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
