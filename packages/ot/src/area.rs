//! # Area Sets
//!
//! An ordered, non-overlapping set of typed intervals over the document's
//! current coordinate space.
//!
//! ## Design
//!
//! - Every edit is modeled as "everything downstream moves": inserting `len`
//!   chars shifts all later areas right, removing shifts them left
//! - Untyped text is represented by gaps between areas
//! - Adjacent areas of the same mergeable kind are always collapsed into one
//! - Areas of a `remove_on_empty` kind disappear when they shrink to nothing;
//!   other kinds stay as zero-length markers
//!
//! ## Example
//!
//! ```rust
//! use elicast_ot::{Area, AreaSet, AreaType};
//!
//! const TEXT: AreaType = AreaType::new("text", true, true);
//! const EXERCISE: AreaType = AreaType::new("exercise", false, false);
//!
//! let mut set = AreaSet::new();
//! set.insert(TEXT, 10, 15, true);
//! set.insert(EXERCISE, 12, 13, false);
//!
//! assert_eq!(set.as_slice(), &[
//!     Area::new(TEXT, 10, 12),
//!     Area::new(EXERCISE, 12, 13),
//!     Area::new(TEXT, 13, 16),
//! ]);
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Behaviour of one kind of area
pub trait AreaKind: Copy + Eq + fmt::Debug {
    /// Display name used in errors and logs
    fn name(&self) -> &str;

    /// Whether two touching areas of this kind collapse into one
    fn mergeable(&self) -> bool;

    /// Whether an area of this kind is dropped when it shrinks to zero length
    fn remove_on_empty(&self) -> bool;
}

/// Free-form area kind, identified by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AreaType {
    pub name: &'static str,
    pub mergeable: bool,
    pub remove_on_empty: bool,
}

impl AreaType {
    pub const fn new(name: &'static str, mergeable: bool, remove_on_empty: bool) -> Self {
        Self {
            name,
            mergeable,
            remove_on_empty,
        }
    }
}

impl AreaKind for AreaType {
    fn name(&self) -> &str {
        self.name
    }

    fn mergeable(&self) -> bool {
        self.mergeable
    }

    fn remove_on_empty(&self) -> bool {
        self.remove_on_empty
    }
}

/// Half-open typed span `[from_pos, to_pos)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Area<K> {
    pub kind: K,
    pub from_pos: usize,
    pub to_pos: usize,
}

impl<K: AreaKind> Area<K> {
    pub fn new(kind: K, from_pos: usize, to_pos: usize) -> Self {
        debug_assert!(from_pos <= to_pos);
        Self {
            kind,
            from_pos,
            to_pos,
        }
    }

    pub fn len(&self) -> usize {
        self.to_pos - self.from_pos
    }

    pub fn is_empty(&self) -> bool {
        self.from_pos == self.to_pos
    }

    /// Half-open overlap test used to guard existing areas against edits
    pub fn conflicts_with(&self, from_pos: usize, to_pos: usize) -> bool {
        (from_pos <= self.from_pos && self.from_pos < to_pos)
            || (self.from_pos < from_pos && from_pos < self.to_pos)
    }

    /// True if `[from_pos, to_pos]` lies inside this area (edges included)
    pub fn contains_range(&self, from_pos: usize, to_pos: usize) -> bool {
        self.from_pos <= from_pos && to_pos <= self.to_pos
    }

    fn shift_right(&mut self, delta: usize) {
        self.from_pos += delta;
        self.to_pos += delta;
    }

    fn shift_left(&mut self, delta: usize) {
        self.from_pos -= delta;
        self.to_pos -= delta;
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AreaError {
    #[error("Failed to remove area due to type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Removal of mixed area not supported ({0})")]
    MixedRemoval(&'static str),
}

/// Ordered, non-overlapping collection of areas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSet<K> {
    areas: Vec<Area<K>>,
}

impl<K: AreaKind> AreaSet<K> {
    pub fn new() -> Self {
        Self { areas: Vec::new() }
    }

    pub fn as_slice(&self) -> &[Area<K>] {
        &self.areas
    }

    pub fn into_vec(self) -> Vec<Area<K>> {
        self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Area<K>> {
        self.areas.iter()
    }

    /// Insert `[from_pos, to_pos)` of `kind` as freshly inserted text.
    ///
    /// Everything after the insertion point moves right by the span length.
    /// Inserting strictly inside an existing area splits it around the new
    /// span. With `allow_merge`, a mergeable area of the same kind ending at
    /// `from_pos` is extended in place. Either way the result is collapsed
    /// into touching neighbours of the same mergeable kind.
    pub fn insert(&mut self, kind: K, from_pos: usize, to_pos: usize, allow_merge: bool) -> &mut Self {
        let new_area = Area::new(kind, from_pos, to_pos);
        let len = new_area.len();

        if allow_merge && kind.mergeable() {
            let touching = self
                .areas
                .iter()
                .position(|area| area.kind == kind && area.to_pos == from_pos);
            if let Some(i) = touching {
                self.areas[i].to_pos += len;
                self.shift_right_from(i + 1, len);
                self.merge_adjacent(i);
                return self;
            }
        }

        let mut new_index = None;
        for i in 0..self.areas.len() {
            let area = self.areas[i];

            if from_pos <= area.from_pos {
                // Lands in the gap before this area (or on its left edge)
                self.areas.insert(i, new_area);
                self.shift_right_from(i + 1, len);
                new_index = Some(i);
                break;
            } else if area.from_pos < from_pos && from_pos <= area.to_pos {
                // Split the enclosing area around the new span
                let right = Area::new(area.kind, to_pos, area.to_pos + len);

                self.areas[i].to_pos = from_pos;
                self.areas.insert(i + 1, new_area);
                new_index = Some(i + 1);

                if right.is_empty() {
                    self.shift_right_from(i + 2, len);
                } else {
                    self.areas.insert(i + 2, right);
                    self.shift_right_from(i + 3, len);
                }
                break;
            }
        }

        let index = match new_index {
            Some(index) => index,
            None => {
                self.areas.push(new_area);
                self.areas.len() - 1
            }
        };

        self.merge_adjacent(index);
        self
    }

    /// Remove `[from_pos, to_pos)` from the document.
    ///
    /// The span must lie in a single area of the same kind, or entirely in an
    /// untyped gap. Everything after it moves left by the span length.
    pub fn remove(&mut self, kind: K, from_pos: usize, to_pos: usize) -> Result<&mut Self, AreaError> {
        let len = to_pos - from_pos;

        let mut merge_index = None;
        for i in 0..self.areas.len() {
            let area = self.areas[i];

            if from_pos < area.from_pos {
                if area.from_pos < to_pos {
                    return Err(AreaError::MixedRemoval("untyped area + typed area"));
                }

                self.shift_left_from(i, len);
                merge_index = Some(i);
                break;
            } else if area.from_pos <= from_pos && from_pos < area.to_pos {
                if kind != area.kind {
                    return Err(AreaError::TypeMismatch {
                        expected: area.kind.name().to_string(),
                        found: kind.name().to_string(),
                    });
                }
                if area.to_pos < to_pos {
                    return Err(AreaError::MixedRemoval("typed area + untyped area"));
                }

                self.areas[i].to_pos -= len;
                self.shift_left_from(i + 1, len);

                if self.areas[i].is_empty() && area.kind.remove_on_empty() {
                    self.areas.remove(i);
                    merge_index = Some(i);
                } else {
                    merge_index = Some(i + 1);
                }
                break;
            }
        }

        if let Some(index) = merge_index {
            if index < self.areas.len() {
                self.merge_adjacent(index);
            }
        }

        Ok(self)
    }

    /// Collapse the area at `index` into touching neighbours where allowed.
    /// Returns the index the area ends up at.
    fn merge_adjacent(&mut self, mut index: usize) -> usize {
        if index > 0 && can_merge(&self.areas[index - 1], &self.areas[index]) {
            let left = self.areas.remove(index - 1);
            index -= 1;
            self.areas[index].from_pos = left.from_pos;
        }

        if index + 1 < self.areas.len() && can_merge(&self.areas[index], &self.areas[index + 1]) {
            let right = self.areas.remove(index + 1);
            self.areas[index].to_pos = right.to_pos;
        }

        index
    }

    fn shift_right_from(&mut self, index: usize, delta: usize) {
        for area in self.areas.iter_mut().skip(index) {
            area.shift_right(delta);
        }
    }

    fn shift_left_from(&mut self, index: usize, delta: usize) {
        for area in self.areas.iter_mut().skip(index) {
            area.shift_left(delta);
        }
    }
}

impl<K: AreaKind> Default for AreaSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn can_merge<K: AreaKind>(left: &Area<K>, right: &Area<K>) -> bool {
    left.kind == right.kind && left.to_pos == right.from_pos && left.kind.mergeable()
}
