//! The flattened choice space of a factory tree.
//!
//! Every position in the tree that makes a discrete selection becomes one
//! `ChoicePoint`, numbered in preorder:
//! - a Variable contributes one point with one level per value;
//! - an Interleaving contributes one point with one level per branch,
//!   followed by the points of its branches;
//! - a Synthesis contributes the points of its children in order, then
//!   `n - 1` arrangement points when it also permutes its `n` children.
//!
//! A point is *active* on a path only when every Interleaving above it
//! selected the branch containing it. A `CasePath` assigns a level to every
//! active point and nothing to the inactive ones.

use serde::{Deserialize, Serialize};

use crate::tree::{Combiner, Node, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path has {actual} choice points but the tree has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("choice point {point} is active but has no level")]
    MissingLevel { point: usize },

    #[error("level {level} at choice point {point} exceeds its {levels} levels")]
    LevelOutOfRange {
        point: usize,
        level: usize,
        levels: usize,
    },

    #[error("choice point {point} is unreachable on this path but has a level")]
    UnreachableLevel { point: usize },
}

/// What kind of selection a choice point makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceKind {
    /// Index into a Variable's values.
    Value,
    /// Branch selected by an Interleaving.
    Branch,
    /// One Lehmer digit of a permuting Synthesis.
    Arrangement { slot: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoicePoint {
    pub kind: ChoiceKind,
    /// Local cardinality; always at least 1.
    pub levels: usize,
    /// `(branch point, branch)` for every enclosing Interleaving, outermost first.
    pub requires: Vec<(usize, usize)>,
}

/// All choice points of one tree, in preorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSpace {
    points: Vec<ChoicePoint>,
}

impl ChoiceSpace {
    pub(crate) fn of(root: &Node) -> Self {
        let mut points = Vec::with_capacity(root.dimensions);
        flatten(root, &mut Vec::new(), &mut points);
        debug_assert_eq!(points.len(), root.dimensions);
        Self { points }
    }

    pub fn points(&self) -> &[ChoicePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether `point` is reachable given the branch levels already in `levels`.
    ///
    /// Only branch points that precede `point` are consulted, so this is
    /// valid while a path is being filled in preorder.
    pub fn is_active(&self, point: usize, levels: &[Option<usize>]) -> bool {
        self.points[point]
            .requires
            .iter()
            .all(|&(branch_point, branch)| levels[branch_point] == Some(branch))
    }

    /// The first case in traversal order: level 0 everywhere it is reachable.
    pub fn first_path(&self) -> CasePath {
        let mut levels = vec![None; self.points.len()];
        for point in 0..self.points.len() {
            if self.is_active(point, &levels) {
                levels[point] = Some(0);
            }
        }
        CasePath { levels }
    }

    /// Check that `path` assigns exactly the active points, each within range.
    pub fn validate(&self, path: &CasePath) -> Result<(), PathError> {
        if path.levels.len() != self.points.len() {
            return Err(PathError::ShapeMismatch {
                expected: self.points.len(),
                actual: path.levels.len(),
            });
        }
        for (point, choice) in self.points.iter().enumerate() {
            match (self.is_active(point, &path.levels), path.levels[point]) {
                (true, None) => return Err(PathError::MissingLevel { point }),
                (true, Some(level)) if level >= choice.levels => {
                    return Err(PathError::LevelOutOfRange {
                        point,
                        level,
                        levels: choice.levels,
                    })
                }
                (false, Some(_)) => return Err(PathError::UnreachableLevel { point }),
                _ => {}
            }
        }
        Ok(())
    }

    /// Largest number of choice points active together on one path.
    ///
    /// Any strength at or above this enumerates the tree exhaustively.
    pub fn maximum_active(&self) -> usize {
        self.widest(0, self.points.len())
    }

    /// Widest path through the points in `start..end`, which must form a
    /// run of whole sibling subtrees.
    fn widest(&self, start: usize, end: usize) -> usize {
        let mut total = 0;
        let mut point = start;
        while point < end {
            let subtree_end = self.subtree_end(point);
            total += match self.points[point].kind {
                ChoiceKind::Branch => {
                    let branches = self.branch_ranges(point);
                    1 + branches
                        .into_iter()
                        .map(|(from, to)| self.widest(from, to))
                        .max()
                        .unwrap_or(0)
                }
                _ => 1,
            };
            point = subtree_end;
        }
        total
    }

    /// One past the last point nested under `point`.
    pub fn subtree_end(&self, point: usize) -> usize {
        let depth = self.points[point].requires.len();
        let mut end = point + 1;
        while end < self.points.len() {
            let requires = &self.points[end].requires;
            let nested = requires.len() > depth && requires[depth].0 == point;
            if !nested {
                break;
            }
            end += 1;
        }
        end
    }

    /// The point ranges of each branch of the branch point `point`.
    pub fn branch_ranges(&self, point: usize) -> Vec<(usize, usize)> {
        let depth = self.points[point].requires.len();
        let mut ranges = vec![(0, 0); self.points[point].levels];
        let mut cursor = point + 1;
        let end = self.subtree_end(point);
        for (branch, range) in ranges.iter_mut().enumerate() {
            let from = cursor;
            while cursor < end && self.points[cursor].requires[depth] == (point, branch) {
                cursor += 1;
            }
            *range = (from, cursor);
        }
        ranges
    }
}

fn flatten(node: &Node, requires: &mut Vec<(usize, usize)>, points: &mut Vec<ChoicePoint>) {
    match &node.kind {
        NodeKind::Singleton { .. } => {}
        NodeKind::Variable { levels, .. } => points.push(ChoicePoint {
            kind: ChoiceKind::Value,
            levels: *levels,
            requires: requires.clone(),
        }),
        NodeKind::Interleaving { branches } => {
            let branch_point = points.len();
            points.push(ChoicePoint {
                kind: ChoiceKind::Branch,
                levels: branches.len(),
                requires: requires.clone(),
            });
            for (branch, child) in branches.iter().enumerate() {
                requires.push((branch_point, branch));
                flatten(child, requires, points);
                requires.pop();
            }
        }
        NodeKind::Synthesis { children, combiner } => {
            for child in children {
                flatten(child, requires, points);
            }
            if let Combiner::WithPermutation(_) = combiner {
                let len = children.len();
                for slot in 0..len.saturating_sub(1) {
                    points.push(ChoicePoint {
                        kind: ChoiceKind::Arrangement { slot },
                        levels: len - slot,
                        requires: requires.clone(),
                    });
                }
            }
        }
    }
}

/// One concrete path through a tree: a level for each active choice point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CasePath {
    levels: Vec<Option<usize>>,
}

impl CasePath {
    pub fn new(levels: Vec<Option<usize>>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[Option<usize>] {
        &self.levels
    }

    /// `(point, level)` for every active point, in preorder.
    pub fn choices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .filter_map(|(point, level)| level.map(|l| (point, l)))
    }

    pub(crate) fn checked_level(&self, point: usize, levels: usize) -> Result<usize, PathError> {
        let level = self
            .levels
            .get(point)
            .copied()
            .flatten()
            .ok_or(PathError::MissingLevel { point })?;
        if level >= levels {
            return Err(PathError::LevelOutOfRange {
                point,
                level,
                levels,
            });
        }
        Ok(level)
    }
}
