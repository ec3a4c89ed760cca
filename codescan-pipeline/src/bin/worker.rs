//! Codescan worker - isolated per-unit analysis process
//!
//! Spawned by the pool with three positional arguments: the JSON unit
//! descriptor, the output directory, and the JSON plugin descriptor list.
//! The workflow is:
//!
//! 1. Decode the start arguments
//! 2. Construct every plugin and apply it to a fresh pipeline
//! 3. Run the four phases against the execution context
//! 4. Persist ScanResults to `result.json` (also after an abort)
//! 5. Flush the log and exit (0 on completion, 1 on a fatal failure)
//!
//! stdout is reserved for the log envelope channel to the pool; tracing
//! diagnostics go to stderr.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::fmt;

use codescan_core::Logger;
use codescan_core::domain::WORKER_LOG_FILE;
use codescan_core::ipc::args::WorkerArgs;
use codescan_pipeline::{ExecutionContext, PluginPipeline, PluginRegistry};

/// Worker CLI arguments
#[derive(Parser, Debug)]
#[command(name = "codescan-worker")]
#[command(about = "Per-unit analysis worker for the codescan pool")]
struct Args {
    /// JSON-serialized unit descriptor
    unit: String,

    /// Output directory for this unit's artifacts
    output_dir: PathBuf,

    /// JSON-serialized plugin descriptor list
    plugins: String,

    /// Enable verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr) // stdout belongs to the envelope channel
        .init();

    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    // The output directory must exist before anything else: the private
    // log lives there, and the pool checks for it at exit.
    if let Err(e) = tokio::fs::create_dir_all(&args.output_dir).await {
        eprintln!(
            "fatal: cannot create output directory {}: {e}",
            args.output_dir.display()
        );
        return 1;
    }

    let logger = match Logger::for_worker(&args.output_dir.join(WORKER_LOG_FILE)) {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            eprintln!("fatal: cannot open worker log: {e}");
            return 1;
        }
    };

    let decoded = WorkerArgs::decode(&args.unit, args.output_dir.clone(), &args.plugins);
    let WorkerArgs { unit, output_dir, plugins } = match decoded {
        Ok(decoded) => decoded,
        Err(e) => {
            return fail(&logger, &format!("invalid start arguments: {e}"));
        }
    };

    logger.info(&format!(
        "worker started: unit {}, {} plugins",
        unit.name,
        plugins.len()
    ));

    // Plugin construction is all-or-nothing: a bad descriptor is a fatal
    // configuration error, not an isolated plugin failure.
    let registry = PluginRegistry::with_builtins();
    let mut pipeline = PluginPipeline::new();
    for descriptor in &plugins {
        let plugin = match registry.instantiate(descriptor) {
            Ok(plugin) => plugin,
            Err(e) => {
                return fail(
                    &logger,
                    &format!("failed to construct plugin `{}`: {e}", descriptor.name),
                );
            }
        };
        if let Err(e) = plugin.apply(&mut pipeline) {
            return fail(
                &logger,
                &format!("failed to register plugin `{}`: {e}", descriptor.name),
            );
        }
    }

    let mut ctx = ExecutionContext::new(unit, output_dir, logger.clone());
    let outcome = pipeline.run(&mut ctx).await;

    // Persist whatever settled, completed run or not: partial results
    // from finished taps are still useful for diagnosis.
    let mut code = match &outcome {
        Ok(()) => 0,
        Err(e) => {
            logger.error(&format!("pipeline aborted: {e}"));
            1
        }
    };
    match ctx.persist_results().await {
        Ok(path) => {
            logger.info(&format!("results written to {}", path.display()));
        }
        Err(e) => {
            logger.error(&format!("failed to persist results: {e}"));
            code = 1;
        }
    }

    if code == 0 {
        logger.info("worker finished");
    }
    if let Err(e) = logger.flush() {
        eprintln!("warning: log flush failed: {e}");
    }
    code
}

/// Log a fatal error, flush, and return the failure exit code.
fn fail(logger: &Logger, message: &str) -> i32 {
    logger.error(&format!("fatal: {message}"));
    if let Err(e) = logger.flush() {
        eprintln!("warning: log flush failed: {e}");
    }
    1
}
