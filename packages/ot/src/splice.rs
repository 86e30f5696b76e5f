//! # Splice
//!
//! Replaces the operations of one resolved span with another operation list
//! and re-bases every later operation so the log stays replayable.
//!
//! ## Re-basing
//!
//! The replaced operations resolve to the *original* span `[of, ot)`, the
//! replacement to the *new* span of length `new_len`, anchored at `of`. With
//! `delta = new_len - (ot - of)`, later operations are walked in order while
//! the original span is tracked through them:
//!
//! - `text` before the span: unchanged, the span moves by the op's own delta
//! - `text` after the span: both positions move by `delta`
//! - `text` inside the span: unchanged, the span grows or shrinks with it
//! - `text` across a span edge: cannot be re-based
//!
//! Selections are clamped against the span edges instead of rejected.

use crate::log::OperationLog;
use crate::operation::{OpKind, Operation};
use crate::regions::{Region, RegionBuilder, RegionError, RegionKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error("Range {start}..{end} is outside of the log (length {len})")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("Operation {index} edits [{from}, {to}) across the edge of the replaced span [{span_from}, {span_to})")]
    Straddle {
        index: usize,
        from: usize,
        to: usize,
        span_from: usize,
        span_to: usize,
    },
}

/// Outcome of a splice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpliceReport {
    /// Span of the replaced operations, in the coordinates they were recorded in
    pub original: Region,
    pub replacement: Region,
    pub delta: isize,
    /// Number of later operations whose positions changed
    pub adjusted: usize,
}

/// Replace `log[start..start + amount]` with `new_ops` and re-base the rest
/// of the log. The log is left untouched on error.
pub fn replace_partial_ops(
    builder: &RegionBuilder,
    log: &mut OperationLog,
    start: usize,
    amount: usize,
    new_ops: Vec<Operation>,
) -> Result<SpliceReport, SpliceError> {
    let end = start + amount;
    if end > log.len() {
        return Err(SpliceError::OutOfRange {
            start,
            end,
            len: log.len(),
        });
    }

    let original = single_area(builder, &log.as_slice()[start..end])?;
    let replacement = single_area(builder, &new_ops)?;

    let (original, replacement) = match (original, replacement) {
        (Some(original), Some(replacement)) => (original, replacement),
        (Some(original), None) => (original, empty_at(original.from_pos)),
        (None, Some(replacement)) => (empty_at(replacement.from_pos), replacement),
        (None, None) => {
            log.splice(start..end, new_ops);
            return Ok(SpliceReport {
                original: empty_at(0),
                replacement: empty_at(0),
                delta: 0,
                adjusted: 0,
            });
        }
    };

    let delta = replacement.len() as isize - original.len() as isize;

    let mut tail = log.as_slice()[end..].to_vec();
    let adjusted = rebase(&mut tail, end, original, replacement.len(), delta)?;

    let new_len = new_ops.len();
    log.splice(start..log.len(), new_ops.into_iter().chain(tail).collect());

    info!(
        start,
        replaced = amount,
        inserted = new_len,
        delta,
        adjusted,
        "Spliced operations"
    );

    Ok(SpliceReport {
        original,
        replacement,
        delta,
        adjusted,
    })
}

fn single_area(builder: &RegionBuilder, ops: &[Operation]) -> Result<Option<Region>, RegionError> {
    let areas = builder.build_enclosed(ops, RegionKind::ExerciseBuild)?;
    match areas.as_slice() {
        [] => Ok(None),
        [area] => Ok(Some(*area)),
        areas => Err(RegionError::Inconsistent {
            kind: "solution",
            count: areas.len(),
        }),
    }
}

fn empty_at(pos: usize) -> Region {
    Region::new(RegionKind::ExerciseBuild, pos, pos)
}

/// Re-base `ops` (the operations following the replaced range, the first of
/// them at log index `first_index`). Returns how many were changed.
fn rebase(
    ops: &mut [Operation],
    first_index: usize,
    original: Region,
    new_len: usize,
    delta: isize,
) -> Result<usize, SpliceError> {
    let mut span_from = original.from_pos;
    let mut span_to = original.to_pos;
    let mut adjusted = 0;

    for (offset, op) in ops.iter_mut().enumerate() {
        let range = match op.kind() {
            OpKind::Text { from_pos, to_pos, .. } => {
                let (from, to) = (*from_pos, *to_pos);
                let net = op.text_delta();

                if to <= span_from {
                    span_from = shift(span_from, net);
                    span_to = shift(span_to, net);
                    None
                } else if from >= span_to {
                    Some((shift(from, delta), shift(to, delta)))
                } else if span_from <= from && to <= span_to {
                    warn!(index = first_index + offset, from, to, "Text edit inside of the replaced span");
                    span_to = shift(span_to, net);
                    None
                } else {
                    return Err(SpliceError::Straddle {
                        index: first_index + offset,
                        from,
                        to,
                        span_from,
                        span_to,
                    });
                }
            }
            OpKind::Selection { from_pos, to_pos } => {
                let (lo, hi) = ((*from_pos).min(*to_pos), (*from_pos).max(*to_pos));
                let new_end = span_from + new_len;

                let clamped = if lo >= span_to {
                    (shift(lo, delta), shift(hi, delta))
                } else if hi <= span_from {
                    (lo, hi)
                } else if lo <= span_from && span_to <= hi {
                    (lo, shift(hi, delta))
                } else if lo > span_from && hi >= span_to {
                    (new_end, shift(hi, delta))
                } else if lo <= span_from {
                    (lo, span_from)
                } else {
                    (
                        span_from + (lo - span_from).min(new_len),
                        span_from + (hi - span_from).min(new_len),
                    )
                };

                let reversed = from_pos > to_pos;
                Some(if reversed { (clamped.1, clamped.0) } else { clamped })
            }
            _ => None,
        };

        if let Some((from, to)) = range {
            if op.kind().range() != Some((from, to)) {
                op.set_range(from, to);
                adjusted += 1;
            }
        }
    }

    Ok(adjusted)
}

fn shift(pos: usize, delta: isize) -> usize {
    pos.saturating_add_signed(delta)
}
