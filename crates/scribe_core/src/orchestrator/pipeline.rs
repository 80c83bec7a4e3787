//! Pipeline runner that executes steps in sequence for one source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PipelineStep;
use super::types::{Context, SourceState, StepOutcome};

/// Ordered sequence of steps a source runs through.
///
/// Steps execute strictly in order with validation before and after
/// each one. Cancellation is checked at step boundaries; a shared flag
/// lets one handle stop every in-flight pipeline of a run.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create an empty pipeline with its own cancellation flag.
    pub fn new() -> Self {
        Self::with_cancel_flag(Arc::new(AtomicBool::new(false)))
    }

    /// Create an empty pipeline sharing an existing cancellation flag.
    pub fn with_cancel_flag(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            steps: Vec::new(),
            cancelled,
        }
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Get a cancellation handle for this pipeline's flag.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step for one source.
    pub fn run(&self, ctx: &Context, state: &mut SourceState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult {
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
        };

        let total_steps = self.steps.len();
        let name = state.logical_name.clone();

        for (i, step) in self.steps.iter().enumerate() {
            if self.is_cancelled() {
                ctx.logger
                    .warn(&format!("{}: cancelled before step '{}'", name, step.name()));
                return Err(PipelineError::cancelled(&name));
            }

            let step_name = step.name();
            ctx.logger
                .debug(&format!("{}: {} ({}/{})", name, step_name, i + 1, total_steps));

            if let Err(e) = step.validate_input(ctx, state) {
                ctx.logger
                    .error(&format!("{}: {} input validation failed: {}", name, step_name, e));
                return Err(PipelineError::step_failed(&name, step_name, e));
            }

            let outcome = step.execute(ctx, state).map_err(|e| {
                // Command failures carry the tool's whole stderr; log a
                // bounded excerpt instead of the full blob.
                if let StepError::CommandFailed { tool, message, .. } = &e {
                    ctx.logger
                        .tool_failure(&format!("{name}: {step_name}: {tool} failed"), message);
                } else {
                    ctx.logger
                        .error(&format!("{}: {} failed: {}", name, step_name, e));
                }
                PipelineError::step_failed(&name, step_name, e)
            })?;

            match outcome {
                StepOutcome::Success => {
                    if let Err(e) = step.validate_output(ctx, state) {
                        ctx.logger.error(&format!(
                            "{}: {} output validation failed: {}",
                            name, step_name, e
                        ));
                        return Err(PipelineError::step_failed(&name, step_name, e));
                    }
                    ctx.logger
                        .debug(&format!("{}: {} completed", name, step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger
                        .debug(&format!("{}: {} skipped: {}", name, step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
            }
        }

        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for cancelling running pipelines.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub(crate) fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Request cancellation; pipelines stop at the next step boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of one source's pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    /// Steps that completed and produced output.
    pub steps_completed: Vec<String>,
    /// Steps that had nothing to do.
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    /// Whether every step was skipped (the source was already done).
    pub fn fully_skipped(&self) -> bool {
        self.steps_completed.is_empty() && !self.steps_skipped.is_empty()
    }

    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}
