//! Pipeline step trait definition.

use super::errors::StepResult;
use super::types::{Context, SourceState, StepOutcome};

/// One stage-advancing step of a source's pipeline.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - check preconditions
/// 2. `execute` - do the work
/// 3. `validate_output` - verify results (after `Success` only)
///
/// A step that finds its output already committed returns
/// [`StepOutcome::Skipped`]; that is how finished stores rerun without
/// doing any work.
pub trait PipelineStep: Send + Sync {
    /// Step name, used in logs and error context.
    fn name(&self) -> &str;

    /// Validate preconditions before execution.
    fn validate_input(&self, ctx: &Context, state: &SourceState) -> StepResult<()>;

    /// Execute the step's work, recording results in `state`.
    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome>;

    /// Verify the step's output after a successful execution.
    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
