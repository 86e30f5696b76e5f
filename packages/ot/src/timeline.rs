//! # Timeline
//!
//! Recorder and solver front-end over one [`OperationLog`].
//!
//! The timeline owns the log, the derived [`OwnerTable`] and the exercise id
//! generator, and is the only writer of the log. It records takes, text and
//! selection changes and runs, opens and closes exercise and assertion
//! sessions, and drives a viewer's attempt at an exercise through to the
//! splice that replaces the recorded answer with the viewer's.
//!
//! ## Time
//!
//! Timestamps are virtual. When a take starts, the timeline remembers the
//! last timestamp of the log and the wall clock; every operation of the take
//! is stamped `anchor.ts + now - anchor.time`.

use crate::authorize::EditAuthorizer;
use crate::buffer::{char_slice, TextBuffer};
use crate::config::EngineConfig;
use crate::errors::{ElicastError, Result};
use crate::log::{LogError, OperationLog};
use crate::operation::{char_len, ExerciseId, OpKind, Operation};
use crate::owners::OwnerTable;
use crate::player::{clamp_seek_target, Scrubber};
use crate::regions::{Region, RegionBuilder};
use crate::replay::{apply, build_text, ReplayError};
use crate::session::{RecordAssertSession, RecordExerciseSession, RegionSession, SessionError, SolveExerciseSession};
use crate::splice::{replace_partial_ops, SpliceReport};
use std::ops::Range;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    ts: i64,
    time: i64,
}

#[derive(Debug)]
enum Mode {
    Idle,
    Exercise(RecordExerciseSession),
    Assert(RecordAssertSession),
    Solve(SolveExerciseSession),
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Exercise(_) => "exercise",
            Mode::Assert(_) => "assert",
            Mode::Solve(_) => "solve",
        }
    }
}

#[derive(Debug)]
pub struct Timeline {
    config: EngineConfig,
    builder: RegionBuilder,
    authorizer: EditAuthorizer,
    log: OperationLog,
    owners: OwnerTable,
    next_ex_id: ExerciseId,
    anchor: Option<Anchor>,
    mode: Mode,
}

impl Timeline {
    pub fn new(config: EngineConfig) -> Self {
        Self::from_log(OperationLog::new(), config)
    }

    /// Continue working on an existing log
    pub fn from_log(log: OperationLog, config: EngineConfig) -> Self {
        let builder = RegionBuilder::new(&config);
        let owners = OwnerTable::from_ops(log.as_slice());
        let next_ex_id = log
            .iter()
            .filter_map(|op| match op.kind() {
                OpKind::Exercise { ex_id } => Some(*ex_id),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            config,
            authorizer: EditAuthorizer::new(builder.clone()),
            builder,
            log,
            owners,
            next_ex_id,
            anchor: None,
            mode: Mode::Idle,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn owners(&self) -> &OwnerTable {
        &self.owners
    }

    pub fn into_log(self) -> OperationLog {
        self.log
    }

    pub fn is_recording(&self) -> bool {
        self.anchor.is_some()
    }

    /// A scrubber configured like this timeline
    pub fn scrubber(&self) -> Scrubber {
        Scrubber::new(&self.config)
    }

    /// Regions of the document at `ts`
    pub fn regions_at(&self, ts: i64) -> Result<Vec<Region>> {
        let index = self.log.index_at_ts(ts);
        Ok(self.builder.build(&self.log.as_slice()[..index])?)
    }

    /// See [`clamp_seek_target`]
    pub fn clamp_seek(&self, current: i64, target: i64) -> i64 {
        clamp_seek_target(&self.log, &self.owners, current, target)
    }

    /// Virtual timestamp of wall-clock time `now` in the current take
    pub fn current_ts(&self, now: i64) -> Result<i64> {
        let anchor = self.anchor.ok_or(ElicastError::NotRecording)?;
        Ok((anchor.ts + now - anchor.time).max(self.log.last_ts()))
    }

    /// Start an audio take
    pub fn start_recording(&mut self, sound_chunk_idx: usize, now: i64) -> Result<()> {
        if self.anchor.is_some() {
            return Err(ElicastError::AlreadyRecording);
        }
        self.expect_idle()?;

        let ts = self.log.last_ts();
        self.log.push(Operation::record_start(ts, sound_chunk_idx, now))?;
        self.anchor = Some(Anchor { ts, time: now });

        info!(ts, sound_chunk_idx, "Started recording");
        Ok(())
    }

    /// End the current take. Returns its final timestamp.
    pub fn stop_recording(&mut self, now: i64) -> Result<i64> {
        let ts = self.current_ts(now)?;
        self.expect_idle()?;

        self.log.push(Operation::record_end(ts))?;
        self.anchor = None;

        info!(ts, ops = self.log.len(), "Stopped recording");
        Ok(ts)
    }

    /// Record replacing `[from_pos, to_pos)` of `buffer` with `inserted`.
    ///
    /// Returns `Ok(false)` without touching the buffer or the log if the edit
    /// is not allowed where it happens.
    pub fn record_text(
        &mut self,
        buffer: &mut impl TextBuffer,
        from_pos: usize,
        to_pos: usize,
        inserted: &str,
        now: i64,
    ) -> Result<bool> {
        let ts = self.current_ts(now)?;

        let allowed = match &self.mode {
            Mode::Idle => self.authorizer.check_record(self.log.as_slice(), from_pos, to_pos)?,
            Mode::Exercise(session) => self.authorizer.check_session(&self.log, session, from_pos, to_pos)?,
            Mode::Assert(session) => self.authorizer.check_session(&self.log, session, from_pos, to_pos)?,
            Mode::Solve(_) => return Err(ElicastError::SessionOpen("solve")),
        };
        if !allowed {
            return Ok(false);
        }

        let op = text_op(buffer, ts, from_pos, to_pos, inserted)?;
        apply(buffer, &op)?;
        match &self.mode {
            Mode::Exercise(session) => session.push_op(&mut self.log, op)?,
            Mode::Assert(session) => session.push_op(&mut self.log, op)?,
            _ => self.log.push(op)?,
        };
        Ok(true)
    }

    pub fn record_selection(&mut self, buffer: &mut impl TextBuffer, from_pos: usize, to_pos: usize, now: i64) -> Result<()> {
        let ts = self.current_ts(now)?;
        let op = Operation::selection(ts, from_pos, to_pos);
        apply(buffer, &op)?;
        self.log.push(op)?;
        Ok(())
    }

    pub fn record_run_started(&mut self, now: i64) -> Result<()> {
        let ts = self.current_ts(now)?;
        self.log.push(Operation::run_started(ts))?;
        Ok(())
    }

    pub fn record_run_result(&mut self, exit_code: i32, output: &str, now: i64) -> Result<()> {
        let ts = self.current_ts(now)?;
        self.log.push(Operation::run(ts, exit_code, output))?;
        Ok(())
    }

    /// Open an exercise inside the current take, returning its id
    pub fn start_exercise(&mut self, now: i64) -> Result<ExerciseId> {
        let ts = self.current_ts(now)?;
        self.expect_idle()?;

        let ex_id = self.next_ex_id;
        let session = RecordExerciseSession::start(&mut self.log, ex_id, ts)?;
        self.next_ex_id += 1;
        self.mode = Mode::Exercise(session);
        Ok(ex_id)
    }

    /// Close the open exercise. Returns the index range of its body.
    pub fn finish_exercise(&mut self, now: i64) -> Result<Range<usize>> {
        let ts = self.current_ts(now)?;
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Exercise(session) => Ok(session.finish(&mut self.log, &mut self.owners, ts)?),
            other => {
                self.mode = other;
                Err(ElicastError::NoSession("exercise"))
            }
        }
    }

    /// Drop the open exercise if nothing was typed in it yet
    pub fn abort_exercise(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Exercise(session) => {
                if session.is_initiated(&self.log) {
                    self.mode = Mode::Exercise(session);
                    return Err(SessionError::AlreadyInitiated.into());
                }
                Ok(session.abort(&mut self.log)?)
            }
            other => {
                self.mode = other;
                Err(ElicastError::NoSession("exercise"))
            }
        }
    }

    /// Open an assertion region. Assertions are recorded as their own take,
    /// anchored at the end of the log.
    pub fn start_assert(&mut self, now: i64) -> Result<()> {
        if self.anchor.is_some() {
            return Err(ElicastError::AlreadyRecording);
        }
        self.expect_idle()?;

        let ts = self.log.last_ts();
        let session = RecordAssertSession::start(&mut self.log, ts, now)?;
        self.anchor = Some(Anchor { ts, time: now });
        self.mode = Mode::Assert(session);
        Ok(())
    }

    /// Close the assertion region and its take
    pub fn finish_assert(&mut self, now: i64) -> Result<Range<usize>> {
        let ts = self.current_ts(now)?;
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Assert(session) => {
                let body = session.finish(&mut self.log, &mut self.owners, ts, now)?;
                self.anchor = None;
                Ok(body)
            }
            other => {
                self.mode = other;
                Err(ElicastError::NoSession("assert"))
            }
        }
    }

    /// Drop every operation after `ts`. Returns the number of dropped
    /// operations. Refused when `ts` falls inside an exercise or assertion.
    pub fn cut(&mut self, ts: i64) -> Result<usize> {
        if self.anchor.is_some() {
            return Err(ElicastError::AlreadyRecording);
        }
        self.expect_idle()?;

        let keep = self.log.index_at_ts(ts);
        if keep == 0 || keep == self.log.len() {
            return Ok(0);
        }

        let kept = &self.log.as_slice()[..keep];
        let exercise_markers: Vec<&Operation> = kept.iter().filter(|op| op.is_exercise_marker()).collect();
        if exercise_markers.len() % 2 == 1 {
            let ex_id = match exercise_markers.last().map(|op| op.kind()) {
                Some(OpKind::Exercise { ex_id }) => *ex_id,
                _ => 0,
            };
            return Err(LogError::CutInsideExercise(ex_id).into());
        }
        if kept.iter().filter(|op| op.is_assert_marker()).count() % 2 == 1 {
            return Err(LogError::CutInsideAssert.into());
        }

        let dropped = self.log.len() - keep;
        self.log.truncate(keep);
        self.owners.refresh(self.log.as_slice());

        info!(ts, dropped, "Cut log");
        Ok(dropped)
    }

    /// Start solving the exercise whose start marker is at `start_index`.
    /// `buffer` is reset to the document as it was at the marker.
    pub fn begin_solve(&mut self, buffer: &mut impl TextBuffer, start_index: usize) -> Result<()> {
        if self.anchor.is_some() {
            return Err(ElicastError::AlreadyRecording);
        }
        self.expect_idle()?;

        let session = SolveExerciseSession::begin(&self.log, start_index)?;

        let text = build_text(&self.log.as_slice()[..=start_index])?;
        let len = char_len(&buffer.text());
        buffer.replace(0, len, &text);
        if let Some(first) = session.first_exercise_text_op(&self.log).and_then(|op| op.kind().range()) {
            buffer.set_selection(first.0, first.0);
        }

        debug!(ex_id = session.ex_id(), "Solving exercise");
        self.mode = Mode::Solve(session);
        Ok(())
    }

    pub fn solve_session(&self) -> Option<&SolveExerciseSession> {
        match &self.mode {
            Mode::Solve(session) => Some(session),
            _ => None,
        }
    }

    /// Record a viewer edit while solving. `Ok(false)` if outside of the answer.
    pub fn solve_edit(&mut self, buffer: &mut impl TextBuffer, from_pos: usize, to_pos: usize, inserted: &str) -> Result<bool> {
        let session = match &mut self.mode {
            Mode::Solve(session) => session,
            _ => return Err(ElicastError::NoSession("solve")),
        };

        if !self.authorizer.check_solve(&self.log, session, from_pos, to_pos)? {
            return Ok(false);
        }

        let op = text_op(buffer, session.ts(), from_pos, to_pos, inserted)?;
        apply(buffer, &op)?;
        session.push_op(op);
        Ok(true)
    }

    /// Whole program as it would read with the viewer's answer in place
    pub fn solution_preview(&self) -> Result<String> {
        let session = self.solve_session().ok_or(ElicastError::NoSession("solve"))?;

        let mut log = self.log.clone();
        let range = session.solution_range();
        replace_partial_ops(&self.builder, &mut log, range.start, range.len(), session.solve_ops().to_vec())?;
        Ok(build_text(log.as_slice())?)
    }

    /// Accept the viewer's answer: splice it into the log in place of the
    /// recorded one and mark the exercise solved
    pub fn submit_solution(&mut self) -> Result<SpliceReport> {
        let session = match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Solve(session) => session,
            other => {
                self.mode = other;
                return Err(ElicastError::NoSession("solve"));
            }
        };

        let range = session.solution_range();
        let report = match replace_partial_ops(
            &self.builder,
            &mut self.log,
            range.start,
            range.len(),
            session.solve_ops().to_vec(),
        ) {
            Ok(report) => report,
            Err(err) => {
                self.mode = Mode::Solve(session);
                return Err(err.into());
            }
        };

        session.finish(&mut self.owners);
        self.owners.refresh(self.log.as_slice());
        Ok(report)
    }

    /// Give up on the exercise; it counts as solved and the recorded answer stays
    pub fn skip_exercise(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Solve(session) => {
                session.finish(&mut self.owners);
                Ok(())
            }
            other => {
                self.mode = other;
                Err(ElicastError::NoSession("solve"))
            }
        }
    }

    fn expect_idle(&self) -> Result<()> {
        match self.mode {
            Mode::Idle => Ok(()),
            ref mode => Err(ElicastError::SessionOpen(mode.name())),
        }
    }
}

/// `text` op replacing `[from_pos, to_pos)` of the current buffer content
fn text_op(buffer: &impl TextBuffer, ts: i64, from_pos: usize, to_pos: usize, inserted: &str) -> Result<Operation> {
    let text = buffer.text();
    let removed = char_slice(&text, from_pos, to_pos).ok_or(ReplayError::RangeOutOfBounds {
        from: from_pos,
        to: to_pos,
        len: char_len(&text),
    })?;
    Ok(Operation::text(ts, from_pos, to_pos, inserted, removed)?)
}
