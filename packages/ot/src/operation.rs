//! # Operations
//!
//! The timestamped records that make up an elicast log.
//!
//! ## Wire format
//!
//! Every operation serializes to a flat JSON record:
//!
//! ```text
//! { "ts": 1200, "kind": "text", "fromPos": 4, "toPos": 4, "insertedText": "x", "removedText": "" }
//! ```
//!
//! `kind` is one of `nop`, `record_start`, `record_end`, `selection`, `text`,
//! `exPlaceholder`, `exShow`, `run` or `assert`. Deserialization validates the
//! record exactly like the constructors do, so a malformed record never enters
//! a log.
//!
//! ## Positions
//!
//! Positions are 0-based offsets counted in `char`s into the document as it
//! exists immediately before the operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an exercise region (`exId` on the wire)
pub type ExerciseId = u32;

/// One timestamped record of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedOperation")]
pub struct Operation {
    ts: i64,

    #[serde(flatten)]
    kind: OpKind,
}

/// Variant payload of an [`Operation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OpKind {
    /// No-op marker carrying the wall-clock time it was captured at
    #[serde(rename = "nop")]
    Nop { time: i64 },

    /// Start of an audio take; indexes an externally owned chunk list
    #[serde(rename = "record_start", rename_all = "camelCase")]
    RecordStart { sound_chunk_idx: usize, time: i64 },

    /// End of an audio take
    #[serde(rename = "record_end")]
    RecordEnd,

    /// Cursor/selection change (anchor, head)
    #[serde(rename = "selection", rename_all = "camelCase")]
    Selection { from_pos: usize, to_pos: usize },

    /// Replace `[from_pos, to_pos)` (equal to `removed_text`) with `inserted_text`
    #[serde(rename = "text", rename_all = "camelCase")]
    Text {
        from_pos: usize,
        to_pos: usize,
        inserted_text: String,
        removed_text: String,
    },

    /// Paired start/end marker of an exercise region
    #[serde(rename = "exPlaceholder", rename_all = "camelCase")]
    Exercise { ex_id: ExerciseId },

    /// Exercise metadata; inert for region computation
    #[serde(rename = "exShow", rename_all = "camelCase")]
    ExerciseShow { ex_id: ExerciseId, description: String },

    /// Execution record. `exit_code` is absent while the program runs.
    #[serde(rename = "run", rename_all = "camelCase")]
    Run {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    /// Paired start/end marker of an assertion region
    #[serde(rename = "assert")]
    Assert { time: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Invalid range: fromPos {from} is greater than toPos {to}")]
    InvertedRange { from: usize, to: usize },

    #[error("Removed text has {actual} chars but the range covers {expected}")]
    RemovedTextLength { expected: usize, actual: usize },

    #[error("Run output is only allowed together with an exit code")]
    OutputWithoutExitCode,
}

#[derive(Deserialize)]
struct UncheckedOperation {
    ts: i64,

    #[serde(flatten)]
    kind: OpKind,
}

impl TryFrom<UncheckedOperation> for Operation {
    type Error = OperationError;

    fn try_from(raw: UncheckedOperation) -> Result<Self, Self::Error> {
        Operation::new(raw.ts, raw.kind)
    }
}

impl Operation {
    /// Build an operation from a raw payload, validating its fields
    pub fn new(ts: i64, kind: OpKind) -> Result<Self, OperationError> {
        kind.validate()?;
        Ok(Self { ts, kind })
    }

    pub fn nop(ts: i64, time: i64) -> Self {
        Self { ts, kind: OpKind::Nop { time } }
    }

    pub fn record_start(ts: i64, sound_chunk_idx: usize, time: i64) -> Self {
        Self {
            ts,
            kind: OpKind::RecordStart { sound_chunk_idx, time },
        }
    }

    pub fn record_end(ts: i64) -> Self {
        Self { ts, kind: OpKind::RecordEnd }
    }

    pub fn selection(ts: i64, from_pos: usize, to_pos: usize) -> Self {
        Self {
            ts,
            kind: OpKind::Selection { from_pos, to_pos },
        }
    }

    /// Text replacement. Fails if the range is inverted or does not match `removed_text`.
    pub fn text(
        ts: i64,
        from_pos: usize,
        to_pos: usize,
        inserted_text: impl Into<String>,
        removed_text: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            ts,
            OpKind::Text {
                from_pos,
                to_pos,
                inserted_text: inserted_text.into(),
                removed_text: removed_text.into(),
            },
        )
    }

    /// Pure insertion at `pos`
    pub fn insertion(ts: i64, pos: usize, text: impl Into<String>) -> Self {
        Self {
            ts,
            kind: OpKind::Text {
                from_pos: pos,
                to_pos: pos,
                inserted_text: text.into(),
                removed_text: String::new(),
            },
        }
    }

    /// Pure deletion of `removed` starting at `pos`
    pub fn deletion(ts: i64, pos: usize, removed: impl Into<String>) -> Self {
        let removed = removed.into();
        Self {
            ts,
            kind: OpKind::Text {
                from_pos: pos,
                to_pos: pos + char_len(&removed),
                inserted_text: String::new(),
                removed_text: removed,
            },
        }
    }

    pub fn exercise(ts: i64, ex_id: ExerciseId) -> Self {
        Self { ts, kind: OpKind::Exercise { ex_id } }
    }

    pub fn exercise_show(ts: i64, ex_id: ExerciseId, description: impl Into<String>) -> Self {
        Self {
            ts,
            kind: OpKind::ExerciseShow {
                ex_id,
                description: description.into(),
            },
        }
    }

    /// Finished run
    pub fn run(ts: i64, exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            ts,
            kind: OpKind::Run {
                exit_code: Some(exit_code),
                output: Some(output.into()),
            },
        }
    }

    /// Run that has started but not reported yet
    pub fn run_started(ts: i64) -> Self {
        Self {
            ts,
            kind: OpKind::Run {
                exit_code: None,
                output: None,
            },
        }
    }

    pub fn assert(ts: i64, time: i64) -> Self {
        Self { ts, kind: OpKind::Assert { time } }
    }

    pub fn ts(&self) -> i64 {
        self.ts
    }

    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    /// Wire name of the variant
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Recording time elapsed since this marker was captured, projected onto
    /// the virtual timeline: `ts + now - time`.
    ///
    /// Only markers that carry a capture time (`nop`, `record_start`, `assert`)
    /// answer; everything else returns `None`.
    pub fn relative_ts(&self, now: i64) -> Option<i64> {
        match self.kind {
            OpKind::Nop { time } | OpKind::RecordStart { time, .. } | OpKind::Assert { time } => {
                Some(self.ts + now - time)
            }
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, OpKind::Text { .. })
    }

    pub fn is_selection(&self) -> bool {
        matches!(self.kind, OpKind::Selection { .. })
    }

    pub fn is_exercise_marker(&self) -> bool {
        matches!(self.kind, OpKind::Exercise { .. })
    }

    pub fn is_assert_marker(&self) -> bool {
        matches!(self.kind, OpKind::Assert { .. })
    }

    /// True for a `run` whose result has not arrived yet
    pub fn is_running(&self) -> bool {
        matches!(self.kind, OpKind::Run { exit_code: None, .. })
    }

    /// Net change in document length caused by a `text` op (0 for anything else)
    pub fn text_delta(&self) -> isize {
        match &self.kind {
            OpKind::Text {
                inserted_text,
                removed_text,
                ..
            } => char_len(inserted_text) as isize - char_len(removed_text) as isize,
            _ => 0,
        }
    }

    /// Rewrite the position pair of a `text` or `selection` op.
    ///
    /// Used when re-basing a log; a `text` op keeps its removed text so the
    /// new range must have the same length.
    pub(crate) fn set_range(&mut self, from: usize, to: usize) {
        match &mut self.kind {
            OpKind::Text { from_pos, to_pos, .. } => {
                debug_assert_eq!(to - from, *to_pos - *from_pos);
                *from_pos = from;
                *to_pos = to;
            }
            OpKind::Selection { from_pos, to_pos } => {
                *from_pos = from;
                *to_pos = to;
            }
            _ => {}
        }
    }
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Nop { .. } => "nop",
            OpKind::RecordStart { .. } => "record_start",
            OpKind::RecordEnd => "record_end",
            OpKind::Selection { .. } => "selection",
            OpKind::Text { .. } => "text",
            OpKind::Exercise { .. } => "exPlaceholder",
            OpKind::ExerciseShow { .. } => "exShow",
            OpKind::Run { .. } => "run",
            OpKind::Assert { .. } => "assert",
        }
    }

    /// Position pair of a `text` or `selection` op
    pub fn range(&self) -> Option<(usize, usize)> {
        match self {
            OpKind::Text { from_pos, to_pos, .. } | OpKind::Selection { from_pos, to_pos } => {
                Some((*from_pos, *to_pos))
            }
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), OperationError> {
        match self {
            OpKind::Text {
                from_pos,
                to_pos,
                removed_text,
                ..
            } => {
                if from_pos > to_pos {
                    return Err(OperationError::InvertedRange {
                        from: *from_pos,
                        to: *to_pos,
                    });
                }
                let actual = char_len(removed_text);
                if actual != to_pos - from_pos {
                    return Err(OperationError::RemovedTextLength {
                        expected: to_pos - from_pos,
                        actual,
                    });
                }
                Ok(())
            }
            OpKind::Run {
                exit_code: None,
                output: Some(_),
            } => Err(OperationError::OutputWithoutExitCode),
            _ => Ok(()),
        }
    }
}

/// Length of `s` in document positions
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_serializes_flat() {
        let op = Operation::text(1200, 4, 5, "xy", "a").unwrap();
        let value = serde_json::to_value(&op).unwrap();

        assert_eq!(
            value,
            json!({
                "ts": 1200,
                "kind": "text",
                "fromPos": 4,
                "toPos": 5,
                "insertedText": "xy",
                "removedText": "a"
            })
        );
    }

    #[test]
    fn test_every_kind_deserializes() {
        let raw = json!([
            { "ts": 0, "kind": "nop", "time": 100 },
            { "ts": 0, "kind": "record_start", "soundChunkIdx": 2, "time": 100 },
            { "ts": 1, "kind": "selection", "fromPos": 3, "toPos": 1 },
            { "ts": 2, "kind": "exPlaceholder", "exId": 7 },
            { "ts": 3, "kind": "exShow", "exId": 7, "description": "sum a list" },
            { "ts": 4, "kind": "run" },
            { "ts": 5, "kind": "run", "exitCode": 1, "output": "boom" },
            { "ts": 6, "kind": "assert", "time": 300 },
            { "ts": 7, "kind": "record_end" }
        ]);

        let ops: Vec<Operation> = serde_json::from_value(raw).unwrap();
        let names: Vec<_> = ops.iter().map(|op| op.kind_name()).collect();

        assert_eq!(
            names,
            vec![
                "nop",
                "record_start",
                "selection",
                "exPlaceholder",
                "exShow",
                "run",
                "run",
                "assert",
                "record_end"
            ]
        );
        assert!(ops[5].is_running());
        assert!(!ops[6].is_running());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<Operation, _> =
            serde_json::from_value(json!({ "ts": 0, "kind": "teleport" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_position_is_rejected() {
        let result: Result<Operation, _> = serde_json::from_value(
            json!({ "ts": 0, "kind": "selection", "fromPos": -1, "toPos": 0 }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_text_range_is_rejected() {
        assert_eq!(
            Operation::text(0, 5, 3, "", "ab"),
            Err(OperationError::InvertedRange { from: 5, to: 3 })
        );

        let result: Result<Operation, _> = serde_json::from_value(json!({
            "ts": 0, "kind": "text", "fromPos": 5, "toPos": 3,
            "insertedText": "", "removedText": "ab"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_removed_text_must_match_range() {
        assert_eq!(
            Operation::text(0, 0, 3, "", "ab"),
            Err(OperationError::RemovedTextLength {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_run_output_requires_exit_code() {
        let kind = OpKind::Run {
            exit_code: None,
            output: Some("hi".to_string()),
        };
        assert_eq!(
            Operation::new(0, kind),
            Err(OperationError::OutputWithoutExitCode)
        );
    }

    #[test]
    fn test_relative_ts() {
        let nop = Operation::nop(1_000, 50_000);
        assert_eq!(nop.relative_ts(50_750), Some(1_750));

        let assert = Operation::assert(200, 10);
        assert_eq!(assert.relative_ts(40), Some(230));

        assert_eq!(Operation::selection(0, 0, 0).relative_ts(10), None);
    }

    #[test]
    fn test_text_delta_counts_chars() {
        let op = Operation::text(0, 0, 1, "héllo", "é").unwrap();
        assert_eq!(op.text_delta(), 4);
        assert_eq!(Operation::deletion(0, 2, "λμ").text_delta(), -2);
    }
}
