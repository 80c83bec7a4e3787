//! Transcription via an external command template.
//!
//! The template is a whitespace-separated command line containing
//! `{input}` and `{output}` placeholders, e.g.
//! `whisper-cli --file {input} --out {output} --format html`.

use std::path::Path;
use std::process::Command;

use crate::engine::types::{run_command, EngineError, EngineResult, TranscriptionBackend};

/// Transcription backend that shells out to a configured command.
pub struct CommandTranscriber {
    template: String,
}

impl CommandTranscriber {
    /// Validate and store the command template. Both placeholders must
    /// be present so every run names its own input and output.
    pub fn new(template: impl Into<String>) -> EngineResult<Self> {
        let template = template.into();
        if !template.contains("{input}") || !template.contains("{output}") {
            return Err(EngineError::BadTemplate);
        }
        Ok(Self { template })
    }

    /// Expand the template into argv, substituting placeholders inside
    /// each token.
    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input_str = input.display().to_string();
        let output_str = output.display().to_string();
        self.template
            .split_whitespace()
            .map(|token| {
                token
                    .replace("{input}", &input_str)
                    .replace("{output}", &output_str)
            })
            .collect()
    }
}

impl TranscriptionBackend for CommandTranscriber {
    fn transcribe(&self, input: &Path, output: &Path) -> EngineResult<()> {
        if !input.exists() {
            return Err(EngineError::FileNotFound(input.to_path_buf()));
        }

        let argv = self.build_args(input, output);
        let (program, rest) = argv.split_first().ok_or(EngineError::BadTemplate)?;

        let mut cmd = Command::new(program);
        cmd.args(rest);

        run_command(cmd, program)?;

        let ok = std::fs::metadata(output).map(|m| m.len() > 0).unwrap_or(false);
        if !ok {
            return Err(EngineError::OutputMissing(output.to_path_buf()));
        }

        tracing::info!(
            "Transcribed {} to {}",
            input.display(),
            output.display()
        );

        Ok(())
    }
}
