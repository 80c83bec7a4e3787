//! Fragment assembly into final transcripts.
//!
//! A source's per-segment transcriptions come back as [`Fragment`]s
//! keyed by segment index. Assembly joins them into one
//! [`TranscriptRecord`] covering segment `0..expected`; what happens
//! on a gap depends on the policy.

use thiserror::Error;

use crate::models::{AssemblyPolicy, Fragment, TranscriptRecord};

/// Error type for assembly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    /// Fragments are missing and the policy is strict.
    #[error("{logical}: missing fragment(s) {missing:?} of {expected}")]
    Incomplete {
        logical: String,
        expected: usize,
        missing: Vec<usize>,
    },

    /// Nothing to assemble at all.
    #[error("{0}: no fragments to assemble")]
    Empty(String),
}

/// Result type for assembly.
pub type AssembleResult<T> = Result<T, AssembleError>;

/// Join fragments into a transcript record covering `0..expected`.
///
/// Fragments arrive in any order and are sorted by index; a duplicate
/// index keeps the first occurrence. Under [`AssemblyPolicy::Strict`]
/// any gap fails the whole record. Under [`AssemblyPolicy::Lenient`]
/// gaps become placeholder fragments so one lost segment does not
/// discard an otherwise good transcript.
pub fn assemble(
    logical: &str,
    expected: usize,
    fragments: Vec<Fragment>,
    policy: AssemblyPolicy,
) -> AssembleResult<TranscriptRecord> {
    if fragments.is_empty() {
        return Err(AssembleError::Empty(logical.to_string()));
    }

    let mut ordered: Vec<Fragment> = Vec::with_capacity(fragments.len());
    let mut sorted = fragments;
    sorted.sort_by_key(|f| f.index);
    for fragment in sorted {
        if ordered.last().is_some_and(|prev: &Fragment| prev.index == fragment.index) {
            tracing::warn!(
                "{}: duplicate fragment index {}, keeping the first",
                logical,
                fragment.index
            );
            continue;
        }
        ordered.push(fragment);
    }

    let missing: Vec<usize> = (0..expected)
        .filter(|index| !ordered.iter().any(|f| f.index == *index))
        .collect();

    if !missing.is_empty() {
        match policy {
            AssemblyPolicy::Strict => {
                return Err(AssembleError::Incomplete {
                    logical: logical.to_string(),
                    expected,
                    missing,
                });
            }
            AssemblyPolicy::Lenient => {
                tracing::warn!(
                    "{}: filling {} missing fragment(s) with placeholders",
                    logical,
                    missing.len()
                );
                for index in missing {
                    ordered.push(Fragment::new(
                        index,
                        "",
                        format!("[missing segment {index}]"),
                    ));
                }
                ordered.sort_by_key(|f| f.index);
            }
        }
    }

    Ok(TranscriptRecord::new(logical, ordered))
}
