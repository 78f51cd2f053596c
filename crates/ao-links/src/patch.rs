//! Patch applier
//!
//! Edits are applied from the end of the document toward the start, so the
//! offsets of edits not yet applied stay valid.

use thiserror::Error;

use crate::reference::ReplacementSpan;

/// Patch errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Span {start}..{end} is outside the text (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("Span {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },
    #[error("Spans {first_start}..{first_end} and {second_start}..{second_end} overlap")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

pub type PatchResult<T> = Result<T, PatchError>;

/// Apply `replacements` to `text` in one pass.
///
/// Replacements may be given in any order but must not overlap. Bytes outside
/// the replaced spans are copied unchanged.
pub fn apply_replacements(text: &str, mut replacements: Vec<ReplacementSpan>) -> PatchResult<String> {
    replacements.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut lower_bound = text.len();
    for span in &replacements {
        if span.start > span.end || span.end > text.len() {
            return Err(PatchError::OutOfBounds {
                start: span.start,
                end: span.end,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
            return Err(PatchError::NotCharBoundary {
                start: span.start,
                end: span.end,
            });
        }
        // Descending order: every span must end where the previous one starts, or earlier
        if span.end > lower_bound {
            return Err(PatchError::Overlap {
                first_start: span.start,
                first_end: span.end,
                second_start: lower_bound,
                second_end: overlapping_end(&replacements, lower_bound),
            });
        }
        lower_bound = span.start;
    }

    let mut patched = text.to_string();
    for span in &replacements {
        patched.replace_range(span.start..span.end, &span.new_text);
    }
    Ok(patched)
}

fn overlapping_end(replacements: &[ReplacementSpan], start: usize) -> usize {
    replacements
        .iter()
        .find(|span| span.start == start)
        .map(|span| span.end)
        .unwrap_or(start)
}
