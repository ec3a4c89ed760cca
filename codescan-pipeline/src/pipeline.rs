//! The four-phase tap pipeline

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::context::ExecutionContext;

/// Type alias for boxed futures returned by tap callbacks.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Errors that abort a pipeline run.
///
/// Reference plugins never surface these from inside a tap — they
/// self-isolate. An error reaching the pipeline means a plugin let an
/// exception escape, which fails the whole unit by design.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("tap `{tap}` failed during {phase} phase: {message}")]
    TapFailed {
        phase: Phase,
        tap: String,
        message: String,
    },
}

/// The four fixed pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Code,
    Project,
    Dependency,
    Quality,
}

impl Phase {
    /// Execution order: code → project → dependency → quality.
    pub const ORDER: [Phase; 4] = [Phase::Code, Phase::Project, Phase::Dependency, Phase::Quality];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Project => "project",
            Self::Dependency => "dependency",
            Self::Quality => "quality",
        }
    }

    /// Parse a phase name as it appears in plugin configuration.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "code" => Some(Self::Code),
            "project" => Some(Self::Project),
            "dependency" => Some(Self::Dependency),
            "quality" => Some(Self::Quality),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type TapFn = Box<
    dyn for<'a> Fn(&'a mut ExecutionContext) -> BoxFuture<'a, Result<(), PipelineError>>
        + Send
        + Sync,
>;

/// One plugin's registered callback on a specific phase.
struct Tap {
    name: String,
    run: TapFn,
}

/// Sequences registered plugins into four ordered phases.
///
/// One pipeline instance is owned per execution context, constructed per
/// worker process and passed explicitly to each plugin's `apply` — there
/// is no global hook registry. Each phase is an independent, append-only,
/// ordered tap list.
#[derive(Default)]
pub struct PluginPipeline {
    code: Vec<Tap>,
    project: Vec<Tap>,
    dependency: Vec<Tap>,
    quality: Vec<Tap>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tap to a phase. Taps run in registration order.
    pub fn tap<F>(&mut self, phase: Phase, name: impl Into<String>, run: F)
    where
        F: for<'a> Fn(&'a mut ExecutionContext) -> BoxFuture<'a, Result<(), PipelineError>>
            + Send
            + Sync
            + 'static,
    {
        self.taps_mut(phase).push(Tap {
            name: name.into(),
            run: Box::new(run),
        });
    }

    pub fn tap_count(&self, phase: Phase) -> usize {
        self.taps(phase).len()
    }

    /// Run all phases in order against the context.
    ///
    /// A later phase never starts until every tap of the previous phase
    /// has settled; within a phase each tap is fully awaited before the
    /// next begins. The first escaping error aborts the run.
    pub async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        for phase in Phase::ORDER {
            let taps = self.taps(phase);
            ctx.logger.info(&format!(
                "phase {} started ({} taps)",
                phase,
                taps.len()
            ));
            for tap in taps {
                debug!(phase = %phase, tap = %tap.name, "running tap");
                (tap.run)(ctx).await?;
            }
            ctx.logger.info(&format!("phase {} finished", phase));
        }
        Ok(())
    }

    fn taps(&self, phase: Phase) -> &[Tap] {
        match phase {
            Phase::Code => &self.code,
            Phase::Project => &self.project,
            Phase::Dependency => &self.dependency,
            Phase::Quality => &self.quality,
        }
    }

    fn taps_mut(&mut self, phase: Phase) -> &mut Vec<Tap> {
        match phase {
            Phase::Code => &mut self.code,
            Phase::Project => &mut self.project,
            Phase::Dependency => &mut self.dependency,
            Phase::Quality => &mut self.quality,
        }
    }
}

impl fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginPipeline")
            .field("code", &self.code.len())
            .field("project", &self.project.len())
            .field("dependency", &self.dependency.len())
            .field("quality", &self.quality.len())
            .finish()
    }
}
