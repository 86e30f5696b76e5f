//! # Operation Log
//!
//! The ordered, timestamped record of a whole session. Every other module
//! reads slices of it; only the [`Timeline`](crate::Timeline) and the
//! recording sessions append to it.
//!
//! ## Invariants
//!
//! - `ts` never decreases from one operation to the next
//! - Every operation was validated when it was built or parsed

use crate::operation::{OpKind, Operation};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to parse operation log: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Operation {index} has ts {ts}, earlier than the previous ts {previous}")]
    OutOfOrder { index: usize, ts: i64, previous: i64 },

    #[error("Cannot cut inside of exercise {0}")]
    CutInsideExercise(crate::ExerciseId),

    #[error("Cannot cut inside of assert")]
    CutInsideAssert,
}

/// Append-only (outside of splices and cuts) list of operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog {
    #[serde(deserialize_with = "deserialize_ordered")]
    ops: Vec<Operation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Wrap existing operations, checking that their timestamps are ordered
    pub fn from_ops(ops: Vec<Operation>) -> Result<Self, LogError> {
        check_order(&ops)?;
        Ok(Self { ops })
    }

    /// Parse a JSON array of flat operation records
    pub fn from_json(json: &str) -> Result<Self, LogError> {
        let ops: Vec<Operation> = serde_json::from_str(json)?;
        Self::from_ops(ops)
    }

    pub fn to_json(&self) -> Result<String, LogError> {
        Ok(serde_json::to_string(&self.ops)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, LogError> {
        Ok(serde_json::to_string_pretty(&self.ops)?)
    }

    /// Append an operation, returning its index
    pub fn push(&mut self, op: Operation) -> Result<usize, LogError> {
        if let Some(last) = self.ops.last() {
            if op.ts() < last.ts() {
                return Err(LogError::OutOfOrder {
                    index: self.ops.len(),
                    ts: op.ts(),
                    previous: last.ts(),
                });
            }
        }
        self.ops.push(op);
        Ok(self.ops.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn as_slice(&self) -> &[Operation] {
        &self.ops
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.ops.get(index)
    }

    pub fn last(&self) -> Option<&Operation> {
        self.ops.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    /// Number of operations with `op.ts <= ts`, i.e. the length of the prefix
    /// that is applied when the document is shown at `ts`
    pub fn index_at_ts(&self, ts: i64) -> usize {
        self.ops.partition_point(|op| op.ts() <= ts)
    }

    /// Last operation at or before `ts` matching `predicate`
    pub fn last_before(&self, ts: i64, predicate: impl Fn(&OpKind) -> bool) -> Option<(usize, &Operation)> {
        self.ops[..self.index_at_ts(ts)]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, op)| predicate(op.kind()))
    }

    /// Timestamp of the last operation, or 0 for an empty log
    pub fn last_ts(&self) -> i64 {
        self.ops.last().map(Operation::ts).unwrap_or(0)
    }

    /// End of the playable part of the log. Assertion regions are appended
    /// after the lecture and are never played back, so playback stops at the
    /// operation preceding the first `assert` marker.
    pub fn max_ts(&self) -> i64 {
        match self.ops.iter().position(Operation::is_assert_marker) {
            Some(0) => 0,
            Some(index) => self.ops[index - 1].ts(),
            None => self.last_ts(),
        }
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.ops.truncate(len);
    }

    /// Replace `range` with `replacement` in place
    pub(crate) fn splice(&mut self, range: Range<usize>, replacement: Vec<Operation>) {
        self.ops.splice(range, replacement);
    }
}

impl<'a> IntoIterator for &'a OperationLog {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

fn check_order(ops: &[Operation]) -> Result<(), LogError> {
    for (index, pair) in ops.windows(2).enumerate() {
        if pair[1].ts() < pair[0].ts() {
            return Err(LogError::OutOfOrder {
                index: index + 1,
                ts: pair[1].ts(),
                previous: pair[0].ts(),
            });
        }
    }
    Ok(())
}

fn deserialize_ordered<'de, D>(deserializer: D) -> Result<Vec<Operation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ops = Vec::<Operation>::deserialize(deserializer)?;
    check_order(&ops).map_err(serde::de::Error::custom)?;
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> OperationLog {
        OperationLog::from_ops(vec![
            Operation::record_start(0, 0, 1000),
            Operation::insertion(100, 0, "ab"),
            Operation::selection(150, 2, 2),
            Operation::insertion(200, 2, "c"),
            Operation::selection(200, 3, 3),
            Operation::record_end(300),
        ])
        .unwrap()
    }

    #[test]
    fn test_push_rejects_earlier_ts() {
        let mut log = sample_log();

        let err = log.push(Operation::nop(299, 0)).unwrap_err();
        assert!(matches!(err, LogError::OutOfOrder { index: 6, ts: 299, previous: 300 }));

        assert_eq!(log.push(Operation::nop(300, 0)).unwrap(), 6);
    }

    #[test]
    fn test_index_at_ts() {
        let log = sample_log();

        assert_eq!(log.index_at_ts(-1), 0);
        assert_eq!(log.index_at_ts(0), 1);
        assert_eq!(log.index_at_ts(199), 3);
        assert_eq!(log.index_at_ts(200), 5);
        assert_eq!(log.index_at_ts(10_000), 6);
    }

    #[test]
    fn test_last_before() {
        let log = sample_log();

        let (index, op) = log
            .last_before(199, |kind| matches!(kind, OpKind::Selection { .. }))
            .unwrap();
        assert_eq!(index, 2);
        assert_eq!(op.ts(), 150);

        assert!(log
            .last_before(99, |kind| matches!(kind, OpKind::Selection { .. }))
            .is_none());
    }

    #[test]
    fn test_max_ts_stops_before_first_assert() {
        let mut log = sample_log();
        assert_eq!(log.max_ts(), 300);

        log.push(Operation::assert(300, 0)).unwrap();
        log.push(Operation::insertion(350, 3, "d")).unwrap();
        log.push(Operation::assert(400, 0)).unwrap();

        assert_eq!(log.max_ts(), 300);
        assert_eq!(log.last_ts(), 400);
    }

    #[test]
    fn test_empty_log_times() {
        let log = OperationLog::new();
        assert_eq!(log.max_ts(), 0);
        assert_eq!(log.last_ts(), 0);
        assert_eq!(log.index_at_ts(0), 0);
    }

    #[test]
    fn test_json_roundtrip_keeps_order_check() {
        let log = sample_log();
        let json = log.to_json().unwrap();
        assert_eq!(OperationLog::from_json(&json).unwrap(), log);

        let unordered = r#"[
            { "ts": 10, "kind": "nop", "time": 0 },
            { "ts": 5, "kind": "nop", "time": 0 }
        ]"#;
        assert!(matches!(
            OperationLog::from_json(unordered),
            Err(LogError::OutOfOrder { index: 1, .. })
        ));
        assert!(serde_json::from_str::<OperationLog>(unordered).is_err());
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let json = r#"[{ "ts": 0, "kind": "teleport" }]"#;
        assert!(matches!(OperationLog::from_json(json), Err(LogError::Parse(_))));
    }
}
