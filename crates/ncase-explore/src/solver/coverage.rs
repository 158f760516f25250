//! Coverage targets for strength-bounded generation.
//!
//! For strength `s` a generated case set must realize:
//! - **every realizable `s`-tuple**: each combination of levels over any `s`
//!   choice points that can be active together on one path;
//! - **every short path**: each complete path with fewer than `s` active
//!   points. Without these, a narrow Interleaving branch (a lone Singleton,
//!   say) could never appear at high strength, and a strength at or above
//!   the widest path would not enumerate the tree exhaustively.
//!
//! Any realizable combination of at most `s` choices then lies inside some
//! target, so covering the targets covers it too.

use std::collections::BTreeSet;

use ncase_factory::{CasePath, ChoiceKind, ChoiceSpace};

use super::{Choice, Interaction};

/// Result of auditing a set of cases against the targets of one strength.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub strength: usize,
    /// Targets realized by at least one case.
    pub covered: BTreeSet<Interaction>,
    /// Targets no case realizes.
    pub uncovered: BTreeSet<Interaction>,
}

impl CoverageReport {
    pub fn total_targets(&self) -> usize {
        self.covered.len() + self.uncovered.len()
    }

    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }

    pub fn coverage_fraction(&self) -> f64 {
        match self.total_targets() {
            0 => 1.0,
            total => self.covered.len() as f64 / total as f64,
        }
    }
}

/// All coverage targets of `space` at `strength`.
pub fn coverage_targets(space: &ChoiceSpace, strength: usize) -> BTreeSet<Interaction> {
    let mut targets = BTreeSet::new();
    if strength == 0 {
        // Any single case covers the empty interaction.
        targets.insert(Interaction::new(Vec::new()));
        return targets;
    }

    collect_tuples(space, strength, 0, &mut Vec::new(), &mut targets);

    let mut levels = vec![None; space.len()];
    collect_short_paths(space, strength, 0, &mut levels, 0, &mut targets);

    targets
}

/// Whether `path` realizes every choice of `interaction`.
pub fn realizes(path: &CasePath, interaction: &Interaction) -> bool {
    interaction
        .choices()
        .iter()
        .all(|c| path.levels().get(c.point).copied().flatten() == Some(c.level))
}

/// Audit which targets of `strength` the given cases realize.
pub fn check_coverage(space: &ChoiceSpace, paths: &[CasePath], strength: usize) -> CoverageReport {
    let (covered, uncovered) = coverage_targets(space, strength)
        .into_iter()
        .partition(|target| paths.iter().any(|p| realizes(p, target)));

    CoverageReport {
        strength,
        covered,
        uncovered,
    }
}

/// Whether `candidate` can be active on the same path as every choice in `chosen`.
///
/// `chosen` holds only points that precede `candidate` in preorder, so the
/// candidate can never be one of their enclosing branch points.
fn compatible(space: &ChoiceSpace, chosen: &[Choice], candidate: usize) -> bool {
    let points = space.points();
    points[candidate].requires.iter().all(|&(branch_point, branch)| {
        chosen.iter().all(|c| {
            let selects_other = c.point == branch_point && c.level != branch;
            let nested_elsewhere = points[c.point]
                .requires
                .iter()
                .any(|&(bp, b)| bp == branch_point && b != branch);
            !selects_other && !nested_elsewhere
        })
    })
}

fn collect_tuples(
    space: &ChoiceSpace,
    strength: usize,
    start: usize,
    chosen: &mut Vec<Choice>,
    out: &mut BTreeSet<Interaction>,
) {
    if chosen.len() == strength {
        out.insert(Interaction::new(chosen.clone()));
        return;
    }
    let needed = strength - chosen.len();
    // Leave room for the remaining picks.
    for point in start..space.len().saturating_sub(needed - 1) {
        if !compatible(space, chosen, point) {
            continue;
        }
        for level in 0..space.points()[point].levels {
            chosen.push(Choice::new(point, level));
            collect_tuples(space, strength, point + 1, chosen, out);
            chosen.pop();
        }
    }
}

fn collect_short_paths(
    space: &ChoiceSpace,
    strength: usize,
    point: usize,
    levels: &mut Vec<Option<usize>>,
    assigned: usize,
    out: &mut BTreeSet<Interaction>,
) {
    if point == space.len() {
        let choices = CasePath::new(levels.clone())
            .choices()
            .map(|(p, l)| Choice::new(p, l))
            .collect();
        out.insert(Interaction::new(choices));
        return;
    }
    if !space.is_active(point, levels) {
        collect_short_paths(space, strength, point + 1, levels, assigned, out);
        return;
    }
    if assigned + 1 >= strength {
        return;
    }
    for level in 0..space.points()[point].levels {
        levels[point] = Some(level);
        collect_short_paths(space, strength, point + 1, levels, assigned + 1, out);
    }
    levels[point] = None;
}

/// Call `visit` with every `size`-element subset of `items`, in lexicographic order.
pub(crate) fn for_each_subset(items: &[Choice], size: usize, mut visit: impl FnMut(&[Choice])) {
    if size > items.len() {
        return;
    }
    let mut indices: Vec<usize> = (0..size).collect();
    let mut subset: Vec<Choice> = Vec::with_capacity(size);
    loop {
        subset.clear();
        subset.extend(indices.iter().map(|&i| items[i]));
        visit(&subset);

        // Advance the rightmost index that still has room.
        let mut slot = size;
        loop {
            if slot == 0 {
                return;
            }
            slot -= 1;
            if indices[slot] < items.len() - size + slot {
                break;
            }
        }
        indices[slot] += 1;
        for later in slot + 1..size {
            indices[later] = indices[later - 1] + 1;
        }
    }
}

/// Number of arrangement points in `space`, for logging.
pub(crate) fn arrangement_points(space: &ChoiceSpace) -> usize {
    space
        .points()
        .iter()
        .filter(|p| matches!(p.kind, ChoiceKind::Arrangement { .. }))
        .count()
}
