//! Pipeline step implementations.
//!
//! Each step advances one source by exactly one stage of its pipeline.

mod assemble;
mod convert;
mod direct;
mod enhance;
mod extract;
mod split;
mod transcribe;

pub use assemble::AssembleStep;
pub use convert::{ConvertStep, RenderStep};
pub use direct::{HtmlTranscriptStep, JsonTranscriptStep};
pub use enhance::EnhanceStep;
pub use extract::ExtractStep;
pub use split::SplitStep;
pub use transcribe::TranscribeStep;
