//! # Edit Authorization
//!
//! Decides whether a proposed edit `[from_pos, to_pos)` may be recorded.
//!
//! - Free recording: anything outside of a closed exercise region
//! - Recording an exercise: any first insertion starts the answer, later
//!   edits stay inside it
//! - Recording an assertion: inside an assertion span, or a fresh insertion
//! - Solving: only inside the viewer's own answer
//!
//! `Ok(false)` is a denial the caller handles by dropping the edit. `Err`
//! means the log itself is inconsistent.

use crate::area::Area;
use crate::log::OperationLog;
use crate::operation::{OpKind, Operation};
use crate::regions::{Region, RegionBuilder, RegionError, RegionKind};
use crate::session::{RegionSession, SolveExerciseSession};
use tracing::debug;

/// Checks edits against the regions of a log
#[derive(Debug, Clone, Default)]
pub struct EditAuthorizer {
    builder: RegionBuilder,
}

impl EditAuthorizer {
    pub fn new(builder: RegionBuilder) -> Self {
        Self { builder }
    }

    /// Free recording: deny edits touching an existing exercise region
    pub fn check_record(&self, ops: &[Operation], from_pos: usize, to_pos: usize) -> Result<bool, RegionError> {
        let regions = self.builder.build(ops)?;
        let allowed = !conflicts_with_exercise(&regions, from_pos, to_pos);

        if !allowed {
            debug!(from_pos, to_pos, "Denied edit inside of an exercise");
        }
        Ok(allowed)
    }

    /// Recording inside an open exercise or assertion session
    pub fn check_session(
        &self,
        log: &OperationLog,
        session: &impl RegionSession,
        from_pos: usize,
        to_pos: usize,
    ) -> Result<bool, RegionError> {
        if !session.is_initiated(log) {
            // A region is started by writing into it, never by deleting
            if from_pos != to_pos {
                debug!(from_pos, to_pos, "Denied removal before the region was initiated");
                return Ok(false);
            }
            return Ok(true);
        }

        let regions = self.builder.build(session.ops(log))?;

        let allowed = match session.region_kind() {
            RegionKind::Exercise => {
                let exercises: Vec<&Region> = regions
                    .iter()
                    .filter(|region| region.kind == RegionKind::Exercise)
                    .collect();

                match exercises.as_slice() {
                    [] => true,
                    [area] => area.contains_range(from_pos, to_pos),
                    areas => {
                        return Err(RegionError::Inconsistent {
                            kind: "exercise",
                            count: areas.len(),
                        })
                    }
                }
            }
            _ => {
                let asserts: Vec<&Region> = regions
                    .iter()
                    .filter(|region| region.kind == RegionKind::Assert)
                    .collect();

                if asserts.iter().any(|area| area.contains_range(from_pos, to_pos)) {
                    true
                } else if from_pos == to_pos {
                    !asserts.iter().any(|area| area.conflicts_with(from_pos, to_pos))
                        && !conflicts_with_exercise(&self.builder.build(log.as_slice())?, from_pos, to_pos)
                } else {
                    false
                }
            }
        };

        if !allowed {
            debug!(from_pos, to_pos, "Denied edit outside of the recording region");
        }
        Ok(allowed)
    }

    /// Solving an exercise: the first edit has to start where the recorded
    /// answer starts, later edits have to stay inside the viewer's answer
    pub fn check_solve(
        &self,
        log: &OperationLog,
        session: &SolveExerciseSession,
        from_pos: usize,
        to_pos: usize,
    ) -> Result<bool, RegionError> {
        let answer = if session.is_initiated() {
            let regions = self
                .builder
                .build_enclosed(session.solve_ops(), RegionKind::ExerciseBuild)?;
            match regions.as_slice() {
                [] => None,
                [area] => Some(*area),
                areas => {
                    return Err(RegionError::NotContiguous {
                        ex_id: session.ex_id(),
                        count: areas.len(),
                    })
                }
            }
        } else {
            None
        };

        let answer = match answer {
            Some(area) => area,
            None => match session.first_exercise_text_op(log).map(Operation::kind) {
                Some(OpKind::Text { from_pos, to_pos, .. }) => {
                    Area::new(RegionKind::ExerciseBuild, *from_pos, *to_pos)
                }
                _ => {
                    debug!(ex_id = session.ex_id(), "Denied edit in an exercise without an answer");
                    return Ok(false);
                }
            },
        };

        let allowed = answer.contains_range(from_pos, to_pos);
        if !allowed {
            debug!(
                from_pos,
                to_pos,
                answer_from = answer.from_pos,
                answer_to = answer.to_pos,
                "Denied edit outside of the answer"
            );
        }
        Ok(allowed)
    }
}

fn conflicts_with_exercise(regions: &[Region], from_pos: usize, to_pos: usize) -> bool {
    regions
        .iter()
        .any(|region| region.kind == RegionKind::Exercise && region.conflicts_with(from_pos, to_pos))
}
