//! # Region Builder
//!
//! Replays a slice of the log against a fresh [`AreaSet`] to find out which
//! spans of the current document are plain text, exercises or assertions.
//!
//! ## Nesting
//!
//! `exPlaceholder` and `assert` markers come in start/end pairs. The builder
//! is a small recursive-descent parser over the operation stream: on a start
//! marker it finds the next marker of the same variant, builds the enclosed
//! slice with a "build" area kind, and inserts the result into the outer set
//! as a single non-mergeable region. A start marker without an end marker is
//! a region that is still being recorded; it encloses the rest of the slice.
//!
//! - An exercise must resolve to exactly one contiguous span
//! - An assertion may resolve to any number of spans

use crate::area::{Area, AreaError, AreaKind, AreaSet};
use crate::config::EngineConfig;
use crate::operation::{char_len, ExerciseId, OpKind, Operation};
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Semantic kind of a document span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Text,
    Exercise,
    ExerciseBuild,
    Assert,
    AssertBuild,
}

impl AreaKind for RegionKind {
    fn name(&self) -> &str {
        match self {
            RegionKind::Text => "text",
            RegionKind::Exercise => "exercise",
            RegionKind::ExerciseBuild => "exercise_build",
            RegionKind::Assert => "assert",
            RegionKind::AssertBuild => "assert_build",
        }
    }

    fn mergeable(&self) -> bool {
        matches!(
            self,
            RegionKind::Text | RegionKind::ExerciseBuild | RegionKind::AssertBuild
        )
    }

    fn remove_on_empty(&self) -> bool {
        matches!(self, RegionKind::Text)
    }
}

/// A typed span of the document
pub type Region = Area<RegionKind>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error(transparent)]
    Area(#[from] AreaError),

    #[error("Solution must be a single contiguous region (exercise {ex_id} resolved to {count} areas)")]
    NotContiguous { ex_id: ExerciseId, count: usize },

    #[error("Exercise {ex_id} edits text but resolves to no region")]
    EmptyRegion { ex_id: ExerciseId },

    #[error("Exercise {expected} is closed by the marker of exercise {found}")]
    MismatchedMarker { expected: ExerciseId, found: ExerciseId },

    #[error("Recording region resolved to {count} {kind} areas")]
    Inconsistent { kind: &'static str, count: usize },

    #[error("Regions nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Computes regions by replaying operations
#[derive(Debug, Clone)]
pub struct RegionBuilder {
    max_depth: usize,
}

impl RegionBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_region_depth,
        }
    }

    /// Regions of the document after replaying `ops`, in document order
    pub fn build(&self, ops: &[Operation]) -> Result<Vec<Region>, RegionError> {
        Ok(self.build_in(ops, RegionKind::Text, 0)?.into_vec())
    }

    /// Regions produced by `ops` when they are the body of an open region
    /// whose edits are tagged `text_kind`
    pub fn build_enclosed(&self, ops: &[Operation], text_kind: RegionKind) -> Result<Vec<Region>, RegionError> {
        Ok(self.build_in(ops, text_kind, 1)?.into_vec())
    }

    fn build_in(
        &self,
        ops: &[Operation],
        text_kind: RegionKind,
        depth: usize,
    ) -> Result<AreaSet<RegionKind>, RegionError> {
        if depth > self.max_depth {
            return Err(RegionError::TooDeep(self.max_depth));
        }

        let mut set = AreaSet::new();

        let mut i = 0;
        while i < ops.len() {
            match ops[i].kind() {
                OpKind::Text {
                    from_pos,
                    inserted_text,
                    removed_text,
                    ..
                } => {
                    if !removed_text.is_empty() {
                        set.remove(text_kind, *from_pos, from_pos + char_len(removed_text))?;
                    }
                    if !inserted_text.is_empty() {
                        set.insert(text_kind, *from_pos, from_pos + char_len(inserted_text), true);
                    }
                }
                OpKind::Exercise { ex_id } => {
                    let end = find_closing(ops, i, Operation::is_exercise_marker);
                    if let Some(end) = end {
                        if let OpKind::Exercise { ex_id: found } = ops[end].kind() {
                            if found != ex_id {
                                return Err(RegionError::MismatchedMarker {
                                    expected: *ex_id,
                                    found: *found,
                                });
                            }
                        }
                    }

                    let body = &ops[i + 1..end.unwrap_or(ops.len())];
                    trace!(ex_id, depth, ops = body.len(), "Resolving exercise region");
                    let inner = self.build_in(body, RegionKind::ExerciseBuild, depth + 1)?;

                    match inner.as_slice() {
                        [] => {
                            if end.is_some() && body.iter().any(Operation::is_text) {
                                return Err(RegionError::EmptyRegion { ex_id: *ex_id });
                            }
                        }
                        [area] => {
                            set.insert(RegionKind::Exercise, area.from_pos, area.to_pos, false);
                        }
                        areas => {
                            return Err(RegionError::NotContiguous {
                                ex_id: *ex_id,
                                count: areas.len(),
                            });
                        }
                    }

                    i = end.unwrap_or(ops.len());
                }
                OpKind::Assert { .. } => {
                    let end = find_closing(ops, i, Operation::is_assert_marker);
                    let body = &ops[i + 1..end.unwrap_or(ops.len())];
                    trace!(depth, ops = body.len(), "Resolving assert region");
                    let inner = self.build_in(body, RegionKind::AssertBuild, depth + 1)?;

                    for area in inner.iter() {
                        set.insert(RegionKind::Assert, area.from_pos, area.to_pos, false);
                    }

                    i = end.unwrap_or(ops.len());
                }
                _ => {}
            }
            i += 1;
        }

        Ok(set)
    }
}

impl Default for RegionBuilder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// Regions of the document after replaying `ops`, with default limits
pub fn get_areas(ops: &[Operation]) -> Result<Vec<Region>, RegionError> {
    RegionBuilder::default().build(ops)
}

/// Index of the marker closing the one at `start`
pub(crate) fn find_closing(ops: &[Operation], start: usize, is_marker: fn(&Operation) -> bool) -> Option<usize> {
    ops.iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, op)| is_marker(op))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(kind: RegionKind, from: usize, to: usize) -> Region {
        Area::new(kind, from, to)
    }

    #[test]
    fn test_plain_typing_is_one_text_region() {
        let ops = vec![
            Operation::insertion(0, 0, "def f():"),
            Operation::selection(1, 8, 8),
            Operation::insertion(2, 8, "\n    "),
        ];

        assert_eq!(get_areas(&ops).unwrap(), vec![region(RegionKind::Text, 0, 13)]);
    }

    #[test]
    fn test_closed_exercise_becomes_single_region() {
        let ops = vec![
            Operation::insertion(0, 0, "x = "),
            Operation::exercise(10, 1),
            Operation::insertion(11, 4, "4"),
            Operation::insertion(12, 5, "2"),
            Operation::exercise(20, 1),
            Operation::insertion(21, 6, "\n"),
        ];

        assert_eq!(
            get_areas(&ops).unwrap(),
            vec![
                region(RegionKind::Text, 0, 4),
                region(RegionKind::Exercise, 4, 6),
                region(RegionKind::Text, 6, 7),
            ]
        );
    }

    #[test]
    fn test_open_exercise_encloses_rest_of_log() {
        let ops = vec![
            Operation::insertion(0, 0, "ab"),
            Operation::exercise(10, 3),
            Operation::insertion(11, 1, "XY"),
        ];

        assert_eq!(
            get_areas(&ops).unwrap(),
            vec![
                region(RegionKind::Text, 0, 1),
                region(RegionKind::Exercise, 1, 3),
                region(RegionKind::Text, 3, 4),
            ]
        );
    }

    #[test]
    fn test_open_exercise_without_edits_has_no_region() {
        let ops = vec![Operation::insertion(0, 0, "ab"), Operation::exercise(10, 3)];

        assert_eq!(get_areas(&ops).unwrap(), vec![region(RegionKind::Text, 0, 2)]);
    }

    #[test]
    fn test_closed_exercise_without_text_is_an_empty_placeholder() {
        let ops = vec![
            Operation::insertion(0, 0, "ab"),
            Operation::exercise(10, 3),
            Operation::selection(11, 1, 1),
            Operation::exercise(12, 3),
        ];

        assert_eq!(get_areas(&ops).unwrap(), vec![region(RegionKind::Text, 0, 2)]);
    }

    #[test]
    fn test_disjoint_exercise_edits_are_rejected() {
        let ops = vec![
            Operation::insertion(0, 0, "abcdef"),
            Operation::exercise(10, 1),
            Operation::insertion(11, 1, "X"),
            Operation::insertion(12, 5, "Y"),
            Operation::exercise(20, 1),
        ];

        assert_eq!(
            get_areas(&ops),
            Err(RegionError::NotContiguous { ex_id: 1, count: 2 })
        );
    }

    #[test]
    fn test_mismatched_exercise_markers_are_rejected() {
        let ops = vec![
            Operation::exercise(0, 1),
            Operation::insertion(1, 0, "a"),
            Operation::exercise(2, 2),
        ];

        assert_eq!(
            get_areas(&ops),
            Err(RegionError::MismatchedMarker { expected: 1, found: 2 })
        );
    }

    #[test]
    fn test_assert_regions_may_be_disjoint() {
        let ops = vec![
            Operation::insertion(0, 0, "abcdef"),
            Operation::assert(10, 0),
            Operation::insertion(11, 1, "X"),
            Operation::insertion(12, 5, "Y"),
            Operation::assert(20, 10),
        ];

        assert_eq!(
            get_areas(&ops).unwrap(),
            vec![
                region(RegionKind::Text, 0, 1),
                region(RegionKind::Assert, 1, 2),
                region(RegionKind::Text, 2, 5),
                region(RegionKind::Assert, 5, 6),
                region(RegionKind::Text, 6, 8),
            ]
        );
    }

    #[test]
    fn test_exercise_region_tracks_later_edits_around_it() {
        let ops = vec![
            Operation::insertion(0, 0, "abc"),
            Operation::exercise(10, 1),
            Operation::insertion(11, 3, "XYZ"),
            Operation::exercise(12, 1),
            Operation::insertion(13, 0, "__"),
            Operation::deletion(14, 4, "c"),
        ];

        let areas = get_areas(&ops).unwrap();
        let exercise = areas
            .iter()
            .find(|area| area.kind == RegionKind::Exercise)
            .unwrap();
        assert_eq!((exercise.from_pos, exercise.to_pos), (4, 7));
    }

    #[test]
    fn test_depth_cap() {
        let config = EngineConfig {
            max_region_depth: 1,
            ..EngineConfig::default()
        };
        let ops = vec![
            Operation::assert(0, 0),
            Operation::exercise(1, 1),
            Operation::insertion(2, 0, "a"),
            Operation::exercise(3, 1),
            Operation::assert(4, 0),
        ];

        assert_eq!(
            RegionBuilder::new(&config).build(&ops),
            Err(RegionError::TooDeep(1))
        );
        assert!(get_areas(&ops).is_ok());
    }
}
