//! Bounded-concurrency worker pool
//!
//! One worker process per unit, at most `max_concurrent` alive at once.
//! The pool owns three responsibilities per unit: spawn the worker with
//! its three positional startup arguments, drain the stdout envelope
//! channel into the aggregate log, and validate the outcome (exit code
//! plus on-disk artifacts) before admitting it to the manifest.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tracing::debug;

use codescan_core::config::Config;
use codescan_core::domain::{
    MANIFEST_FILE, Manifest, ManifestEntry, PluginDescriptor, POOL_LOG_FILE, RESULT_FILE, Unit,
    WORKER_LOG_FILE,
};
use codescan_core::ipc::args::WorkerArgs;
use codescan_core::ipc::envelope::WorkerMessage;
use codescan_core::logging::Logger;

/// Name of the worker binary, used for discovery when no explicit path is
/// configured.
pub const WORKER_BINARY: &str = "codescan-worker";

/// Run-fatal pool errors. Anything here aborts the whole run; per-unit
/// failures are [`UnitError`]s and never surface through this type.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("cannot create output root {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot open pool log: {0}")]
    Logger(std::io::Error),

    #[error("worker binary not found; set worker.worker_path or put `{WORKER_BINARY}` on PATH")]
    WorkerNotFound,

    #[error("JSON encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot write manifest: {0}")]
    Manifest(std::io::Error),
}

/// Why a single unit rejected. Logged at the pool and omitted from the
/// manifest; the rest of the run continues.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("cannot create unit output directory: {0}")]
    OutputDir(std::io::Error),

    #[error("failed to spawn worker: {0}")]
    Spawn(std::io::Error),

    #[error("failed to wait on worker: {0}")]
    Wait(std::io::Error),

    #[error("worker exited with code {code:?}")]
    Failed { code: Option<i32> },

    #[error("worker exited cleanly but artifacts are missing: {0}")]
    MissingArtifacts(&'static str),
}

/// Pool of worker processes, one per submitted unit.
pub struct ProcessWorkerPool {
    worker_path: PathBuf,
    output_root: PathBuf,
    logger: Arc<Logger>,
}

impl ProcessWorkerPool {
    /// Build a pool from configuration: create the output root, open the
    /// aggregate log, and resolve the worker binary.
    pub fn new(config: &Config) -> Result<Self, PoolError> {
        let output_root = config.scan.output_root.clone();
        std::fs::create_dir_all(&output_root).map_err(|source| PoolError::OutputRoot {
            path: output_root.clone(),
            source,
        })?;

        let worker_path = match &config.worker.worker_path {
            Some(path) => path.clone(),
            None => discover_worker_path().ok_or(PoolError::WorkerNotFound)?,
        };

        let logger =
            Logger::for_pool(&output_root.join(POOL_LOG_FILE)).map_err(PoolError::Logger)?;
        Ok(Self {
            worker_path,
            output_root,
            logger: Arc::new(logger),
        })
    }

    /// Build a pool with an explicit worker binary, bypassing discovery.
    pub fn with_worker_path(
        output_root: impl Into<PathBuf>,
        worker_path: impl Into<PathBuf>,
    ) -> Result<Self, PoolError> {
        let output_root = output_root.into();
        std::fs::create_dir_all(&output_root).map_err(|source| PoolError::OutputRoot {
            path: output_root.clone(),
            source,
        })?;
        let logger =
            Logger::for_pool(&output_root.join(POOL_LOG_FILE)).map_err(PoolError::Logger)?;
        Ok(Self {
            worker_path: worker_path.into(),
            output_root,
            logger: Arc::new(logger),
        })
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Run every unit through a worker process, at most `max_concurrent`
    /// alive at any instant, admitting units in submission order.
    ///
    /// Returns the run manifest, which is also written to
    /// `manifest.json` under the output root, replacing any previous
    /// run's manifest. Units that reject are logged and left out of the
    /// manifest; only run-level failures return an error.
    pub async fn submit(
        &self,
        units: Vec<Unit>,
        plugins: &[PluginDescriptor],
        max_concurrent: usize,
    ) -> Result<Manifest, PoolError> {
        let max_concurrent = max_concurrent.max(1);
        let run_start = Instant::now();
        self.logger.info(&format!(
            "run started: {} units, at most {} concurrent",
            units.len(),
            max_concurrent
        ));

        let mut entries = Vec::new();
        let mut in_flight = JoinSet::new();
        for unit in units {
            // FIFO admission: the next unit waits until a slot frees up,
            // so at most `max_concurrent` workers are ever alive.
            while in_flight.len() >= max_concurrent {
                if let Some(settled) = in_flight.join_next().await {
                    self.settle(settled, &mut entries);
                }
            }

            let name = unit.name.clone();
            let output_dir = self.output_root.join(&unit.name);
            let args = WorkerArgs {
                output_dir: output_dir.clone(),
                unit,
                plugins: plugins.to_vec(),
            };
            let argv = args.encode()?;

            // Spawn here in the admission loop, not inside the task, so
            // worker processes start in strict submission order.
            self.logger.info(&format!("[{name}] admitted"));
            let start = Instant::now();
            let child = match spawn_worker(&self.worker_path, &output_dir, argv).await {
                Ok(child) => child,
                Err(e) => {
                    self.logger.error(&format!("[{name}] rejected: {e}"));
                    continue;
                }
            };

            let logger = self.logger.clone();
            in_flight.spawn(async move {
                let outcome = drive_worker(child, &output_dir, &name, start, &logger).await;
                (name, outcome)
            });
        }
        while let Some(settled) = in_flight.join_next().await {
            self.settle(settled, &mut entries);
        }

        let manifest = Manifest {
            entries,
            total_duration_ms: run_start.elapsed().as_millis() as u64,
            log_file: self.output_root.join(POOL_LOG_FILE),
        };
        self.write_manifest(&manifest).await?;

        self.logger.info(&format!(
            "run finished: {} of the submitted units settled in {} ms",
            manifest.entries.len(),
            manifest.total_duration_ms
        ));
        if let Err(e) = self.logger.flush() {
            debug!("pool log flush failed: {e}");
        }
        Ok(manifest)
    }

    /// Fold one joined worker task into the manifest entry list.
    fn settle(
        &self,
        settled: Result<(String, Result<ManifestEntry, UnitError>), tokio::task::JoinError>,
        entries: &mut Vec<ManifestEntry>,
    ) {
        match settled {
            Ok((name, Ok(entry))) => {
                self.logger
                    .info(&format!("[{name}] completed in {} ms", entry.duration_ms));
                entries.push(entry);
            }
            Ok((name, Err(e))) => {
                self.logger.error(&format!("[{name}] rejected: {e}"));
            }
            Err(e) => {
                self.logger.error(&format!("worker task panicked: {e}"));
            }
        }
    }

    async fn write_manifest(&self, manifest: &Manifest) -> Result<(), PoolError> {
        let body = serde_json::to_vec_pretty(manifest)?;
        let path = self.output_root.join(MANIFEST_FILE);
        tokio::fs::write(&path, body)
            .await
            .map_err(PoolError::Manifest)
    }
}

/// Prepare the unit output directory and start its worker process.
async fn spawn_worker(
    worker_path: &Path,
    output_dir: &Path,
    argv: [String; 3],
) -> Result<Child, UnitError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(UnitError::OutputDir)?;

    Command::new(worker_path)
        .args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(UnitError::Spawn)
}

/// See a running worker through to a settled outcome.
///
/// The worker's stdout is the envelope channel: every line that parses as
/// a log envelope is re-emitted through the pool logger tagged with the
/// unit name, and everything else is dropped. stderr passes through for
/// diagnostics. Success requires a zero exit code AND both per-unit
/// artifacts on disk.
async fn drive_worker(
    mut child: Child,
    output_dir: &Path,
    name: &str,
    start: Instant,
    logger: &Logger,
) -> Result<ManifestEntry, UnitError> {
    // stdout is drained before wait(), so the pipe cannot fill up and
    // stall the child
    let stdout = child.stdout.take();
    let forward = async {
        let Some(stdout) = stdout else { return };
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match WorkerMessage::parse(&line) {
                Some(WorkerMessage::Log { level, text }) => {
                    logger.log(level, &format!("[{name}] {text}"));
                }
                None => debug!(unit = name, "ignoring non-envelope stdout line"),
            }
        }
    };
    let (status, ()) = tokio::join!(child.wait(), forward);
    let status = status.map_err(UnitError::Wait)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    if !status.success() {
        return Err(UnitError::Failed {
            code: status.code(),
        });
    }

    let result_file = output_dir.join(RESULT_FILE);
    let log_file = output_dir.join(WORKER_LOG_FILE);
    if !result_file.is_file() {
        return Err(UnitError::MissingArtifacts(RESULT_FILE));
    }
    if !log_file.is_file() {
        return Err(UnitError::MissingArtifacts(WORKER_LOG_FILE));
    }

    Ok(ManifestEntry {
        unit_name: name.to_string(),
        duration_ms,
        result_file,
        log_file,
    })
}

/// Locate the worker binary: build-tree candidates next to the current
/// executable first, then `PATH`.
pub fn discover_worker_path() -> Option<PathBuf> {
    if let Ok(current) = std::env::current_exe()
        && let Some(dir) = current.parent()
    {
        let sibling = dir.join(WORKER_BINARY);
        if sibling.is_file() {
            return Some(sibling);
        }
    }
    for profile in ["debug", "release"] {
        let candidate = PathBuf::from("target").join(profile).join(WORKER_BINARY);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    which::which(WORKER_BINARY).ok()
}
