//! # Scrubber
//!
//! Moves a [`TextBuffer`] to the state of the log at an arbitrary timestamp.
//!
//! ## Seeking
//!
//! The document shown at `ts` is the replay of every operation with
//! `op.ts <= ts`. Short seeks apply (forward) or revert (backward) the
//! crossed `text` operations one by one; seeks crossing more than
//! `bigJumpThreshold` operations rebuild the document from scratch. Both
//! paths produce the same text.
//!
//! Every seek returns a [`SeekReport`] telling the UI what it has to redraw.

use crate::buffer::TextBuffer;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::log::OperationLog;
use crate::operation::{char_len, OpKind, Operation};
use crate::owners::{OwnerTable, SegmentKind};
use crate::regions::{Region, RegionBuilder};
use crate::replay::{apply, build_text, revert};
use serde::Serialize;
use tracing::{debug, instrument};

/// Latest execution state at a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutput {
    Empty,
    Running,
    Finished { exit_code: i32, output: String },
}

impl RunOutput {
    /// Run state after replaying `ops`
    pub fn at(ops: &[Operation]) -> Self {
        let last_run = ops.iter().rev().find_map(|op| match op.kind() {
            OpKind::Run { exit_code, output } => Some((*exit_code, output.clone())),
            _ => None,
        });

        match last_run {
            None => RunOutput::Empty,
            Some((None, _)) => RunOutput::Running,
            Some((Some(exit_code), output)) => RunOutput::Finished {
                exit_code,
                output: output.unwrap_or_default(),
            },
        }
    }
}

/// Audio take to restart and where to start it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoundCue {
    pub sound_chunk_idx: usize,
    /// Milliseconds into the take
    pub offset: i64,
}

/// What changed during a seek
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeekReport {
    pub ts: i64,
    /// Number of operations applied at `ts`
    pub index: usize,
    pub rebuilt: bool,
    /// Recomputed regions, when a region-owned edit was crossed
    pub regions: Option<Vec<Region>>,
    /// Run state, when a run was crossed
    pub run_output: Option<RunOutput>,
    /// Region of the last applied operation
    pub play_area: SegmentKind,
    /// Start marker of the first unsolved exercise crossed forward
    pub unsolved_exercise: Option<usize>,
    /// Audio take to restart, when a take start was crossed forward
    pub sound: Option<SoundCue>,
}

/// Keeps a buffer in step with a position on the timeline
#[derive(Debug, Clone)]
pub struct Scrubber {
    big_jump_threshold: usize,
    builder: RegionBuilder,
    ts: i64,
    applied: usize,
    dirty: bool,
}

impl Scrubber {
    /// A scrubber for an empty buffer positioned before the first operation
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            big_jump_threshold: config.big_jump_threshold,
            builder: RegionBuilder::new(config),
            ts: i64::MIN,
            applied: 0,
            dirty: false,
        }
    }

    pub fn ts(&self) -> i64 {
        self.ts
    }

    /// Number of operations currently applied to the buffer
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Force the next seek to rebuild, e.g. after the buffer was edited
    /// outside of the scrubber
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Move `buffer` to the state of `log` at `ts`
    #[instrument(level = "debug", skip_all, fields(from = self.ts, to = ts))]
    pub fn seek(
        &mut self,
        log: &OperationLog,
        owners: &OwnerTable,
        buffer: &mut impl TextBuffer,
        ts: i64,
    ) -> Result<SeekReport> {
        let ops = log.as_slice();
        let prev = self.applied.min(ops.len());
        let next = log.index_at_ts(ts);

        let rebuilt = self.dirty || prev.abs_diff(next) > self.big_jump_threshold;
        if rebuilt {
            debug!(prev, next, "Rebuilding document");
            let text = build_text(&ops[..next])?;
            let len = char_len(&buffer.text());
            buffer.replace(0, len, &text);
        }

        let mut redraw_regions = rebuilt;
        let mut redraw_run = rebuilt;
        let mut unsolved_exercise = None;
        let mut restart_sound = false;

        for (index, op) in ops.iter().enumerate().take(next).skip(prev) {
            if op.is_selection() {
                continue;
            }
            if !rebuilt && op.is_text() {
                apply(buffer, op)?;
            }

            match op.kind() {
                OpKind::Text { .. } => redraw_regions |= is_region_owned(owners, index),
                OpKind::Run { .. } => redraw_run = true,
                OpKind::Exercise { .. } if unsolved_exercise.is_none() && owners.is_unsolved_marker(op) => {
                    unsolved_exercise = Some(index)
                }
                OpKind::RecordStart { .. } => restart_sound = true,
                _ => {}
            }
        }

        for (index, op) in ops.iter().enumerate().take(prev).skip(next).rev() {
            if op.is_selection() {
                continue;
            }
            if !rebuilt && op.is_text() {
                revert(buffer, op)?;
            }

            match op.kind() {
                OpKind::Text { .. } => redraw_regions |= is_region_owned(owners, index),
                OpKind::Run { .. } => redraw_run = true,
                _ => {}
            }
        }

        // Later edits may have shortened the document since the selection was made
        if let Some((from_pos, to_pos)) = log
            .last_before(ts, |kind| matches!(kind, OpKind::Selection { .. }))
            .and_then(|(_, op)| op.kind().range())
        {
            let len = char_len(&buffer.text());
            buffer.set_selection(from_pos.min(len), to_pos.min(len));
        }

        let regions = if redraw_regions {
            Some(self.builder.build(&ops[..next])?)
        } else {
            None
        };

        let run_output = redraw_run.then(|| RunOutput::at(&ops[..next]));

        let sound = if restart_sound { sound_cue(log, ts) } else { None };

        let play_area = match next.checked_sub(1) {
            Some(last) => owners.segment_kind(last, &ops[last]),
            None => SegmentKind::Text,
        };

        self.ts = ts;
        self.applied = next;
        self.dirty = false;

        Ok(SeekReport {
            ts,
            index: next,
            rebuilt,
            regions,
            run_output,
            play_area,
            unsolved_exercise,
            sound,
        })
    }
}

/// Target a viewer may seek to from `current`. Moving forward stops just
/// before the start marker of the first unsolved exercise in between.
pub fn clamp_seek_target(log: &OperationLog, owners: &OwnerTable, current: i64, target: i64) -> i64 {
    if target <= current {
        return target;
    }

    let ops = log.as_slice();
    let prev = log.index_at_ts(current);
    let next = log.index_at_ts(target);

    ops[prev..next]
        .iter()
        .find(|op| owners.is_unsolved_marker(op))
        .map(|marker| marker.ts() - 1)
        .unwrap_or(target)
}

/// Audio take playing at `ts`, with the offset into it
pub fn sound_cue(log: &OperationLog, ts: i64) -> Option<SoundCue> {
    log.last_before(ts, |kind| matches!(kind, OpKind::RecordStart { .. }))
        .and_then(|(_, op)| match op.kind() {
            OpKind::RecordStart { sound_chunk_idx, .. } => Some(SoundCue {
                sound_chunk_idx: *sound_chunk_idx,
                offset: ts - op.ts(),
            }),
            _ => None,
        })
}

fn is_region_owned(owners: &OwnerTable, index: usize) -> bool {
    let owner = owners.owner(index);
    owner.exercise.is_some() || owner.assert
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MemoryBuffer;

    fn lecture() -> OperationLog {
        OperationLog::from_ops(vec![
            Operation::record_start(0, 0, 5000),
            Operation::insertion(100, 0, "x = "),
            Operation::selection(101, 4, 4),
            Operation::run_started(150),
            Operation::run(180, 0, "ok"),
            Operation::exercise(200, 1),
            Operation::insertion(210, 4, "42"),
            Operation::selection(211, 6, 6),
            Operation::exercise(300, 1),
            Operation::insertion(310, 6, "\n"),
            Operation::record_end(400),
        ])
        .unwrap()
    }

    #[test]
    fn test_forward_and_backward_seek() {
        let log = lecture();
        let owners = OwnerTable::from_ops(log.as_slice());
        let mut scrubber = Scrubber::new(&EngineConfig::default());
        let mut buffer = MemoryBuffer::new();

        let report = scrubber.seek(&log, &owners, &mut buffer, 120).unwrap();
        assert!(!report.rebuilt);
        assert_eq!(report.index, 3);
        assert_eq!(buffer.as_str(), "x = ");
        assert_eq!(report.regions, None);
        assert_eq!(report.sound, Some(SoundCue { sound_chunk_idx: 0, offset: 120 }));

        let report = scrubber.seek(&log, &owners, &mut buffer, 250).unwrap();
        assert_eq!(buffer.as_str(), "x = 42");
        assert_eq!(buffer.selection(), (6, 6));
        assert_eq!(report.unsolved_exercise, Some(5));
        assert_eq!(report.play_area, SegmentKind::Exercise(1));
        assert_eq!(
            report.run_output,
            Some(RunOutput::Finished {
                exit_code: 0,
                output: "ok".into()
            })
        );
        assert!(report.regions.is_some());
        assert_eq!(report.sound, None);

        let report = scrubber.seek(&log, &owners, &mut buffer, 160).unwrap();
        assert_eq!(buffer.as_str(), "x = ");
        assert_eq!(buffer.selection(), (4, 4));
        assert_eq!(report.run_output, Some(RunOutput::Running));
        assert_eq!(report.play_area, SegmentKind::Text);
        assert_eq!(report.unsolved_exercise, None);
    }

    #[test]
    fn test_big_jump_rebuilds() {
        let log = lecture();
        let owners = OwnerTable::from_ops(log.as_slice());
        let config = EngineConfig {
            big_jump_threshold: 3,
            ..EngineConfig::default()
        };
        let mut scrubber = Scrubber::new(&config);
        let mut buffer = MemoryBuffer::with_text("stale");

        let report = scrubber.seek(&log, &owners, &mut buffer, 1000).unwrap();
        assert!(report.rebuilt);
        assert_eq!(buffer.as_str(), "x = 42\n");
        assert!(report.regions.is_some());

        let report = scrubber.seek(&log, &owners, &mut buffer, 305).unwrap();
        assert!(!report.rebuilt);
        assert_eq!(buffer.as_str(), "x = 42");
    }

    #[test]
    fn test_dirty_scrubber_rebuilds() {
        let log = lecture();
        let owners = OwnerTable::from_ops(log.as_slice());
        let mut scrubber = Scrubber::new(&EngineConfig::default());
        let mut buffer = MemoryBuffer::new();

        scrubber.seek(&log, &owners, &mut buffer, 120).unwrap();
        buffer.set_text("x = something else");
        scrubber.mark_dirty();

        let report = scrubber.seek(&log, &owners, &mut buffer, 120).unwrap();
        assert!(report.rebuilt);
        assert_eq!(buffer.as_str(), "x = ");
    }

    #[test]
    fn test_clamp_stops_before_unsolved_exercise() {
        let log = lecture();
        let mut owners = OwnerTable::from_ops(log.as_slice());

        assert_eq!(clamp_seek_target(&log, &owners, 0, 350), 199);
        assert_eq!(clamp_seek_target(&log, &owners, 0, 150), 150);
        assert_eq!(clamp_seek_target(&log, &owners, 350, 0), 0);

        owners.mark_solved(1);
        assert_eq!(clamp_seek_target(&log, &owners, 0, 350), 350);
    }

    #[test]
    fn test_run_output_at() {
        assert_eq!(RunOutput::at(&[]), RunOutput::Empty);
        assert_eq!(RunOutput::at(&[Operation::run_started(0)]), RunOutput::Running);
    }
}
