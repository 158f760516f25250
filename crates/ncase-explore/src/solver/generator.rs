//! Greedy strength-bounded case generation.
//!
//! Builds one case at a time until every coverage target is realized:
//! 1. Seed the case with the first outstanding target (in `Interaction`
//!    order) and the branch selections it needs.
//! 2. Walk the choice points in preorder. Each free, reachable point takes
//!    the level that completes the most outstanding `strength`-tuples
//!    together with the choices already made; ties go to the level that
//!    appears in the most outstanding targets, then to the lowest level.
//! 3. Retire every target the finished case realizes.
//!
//! The seed target is always realized, so every case makes progress and no
//! case repeats. All state is ordered or only ever looked up, so the output
//! is a pure function of the choice space and the strength.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ncase_factory::{CasePath, ChoiceSpace};

use super::coverage::{arrangement_points, coverage_targets, for_each_subset};
use super::{Choice, Interaction};

/// Lazily yields the case paths achieving coverage of one strength.
#[derive(Debug, Clone)]
pub struct CaseGenerator {
    space: ChoiceSpace,
    strength: usize,
    outstanding: BTreeSet<Interaction>,
    /// Outstanding targets each choice appears in.
    demand: HashMap<Choice, usize>,
    emitted: usize,
    total_targets: usize,
}

impl CaseGenerator {
    pub fn new(space: ChoiceSpace, strength: usize) -> Self {
        let outstanding = coverage_targets(&space, strength);
        let mut demand = HashMap::new();
        for target in &outstanding {
            for choice in target.choices() {
                *demand.entry(*choice).or_insert(0) += 1;
            }
        }

        tracing::debug!(
            choice_points = space.len(),
            arrangement_points = arrangement_points(&space),
            strength,
            targets = outstanding.len(),
            "coverage targets enumerated"
        );

        Self {
            total_targets: outstanding.len(),
            space,
            strength,
            outstanding,
            demand,
            emitted: 0,
        }
    }

    pub fn space(&self) -> &ChoiceSpace {
        &self.space
    }

    pub fn strength(&self) -> usize {
        self.strength
    }

    pub fn total_targets(&self) -> usize {
        self.total_targets
    }

    pub fn outstanding_targets(&self) -> usize {
        self.outstanding.len()
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn build_case(&self, seed: &Interaction) -> CasePath {
        let points = self.space.points();

        let mut fixed: BTreeMap<usize, usize> = BTreeMap::new();
        for choice in seed.choices() {
            fixed.insert(choice.point, choice.level);
            for &(branch_point, branch) in &points[choice.point].requires {
                fixed.insert(branch_point, branch);
            }
        }

        // Choices whose levels are settled: everything fixed up front plus
        // every point decided so far.
        let mut known = fixed.clone();
        let mut levels = vec![None; points.len()];
        for point in 0..points.len() {
            if !self.space.is_active(point, &levels) {
                continue;
            }
            let level = match fixed.get(&point) {
                Some(&level) => level,
                None => self.best_level(point, &known),
            };
            levels[point] = Some(level);
            known.insert(point, level);
        }
        CasePath::new(levels)
    }

    fn best_level(&self, point: usize, known: &BTreeMap<usize, usize>) -> usize {
        let others: Vec<Choice> = known.iter().map(|(&p, &l)| Choice::new(p, l)).collect();
        let partners = self.strength - 1;

        let mut best: Option<(usize, usize, usize)> = None;
        for level in 0..self.space.points()[point].levels {
            let candidate = Choice::new(point, level);

            let mut gain = 0;
            for_each_subset(&others, partners, |subset| {
                let mut choices = subset.to_vec();
                choices.push(candidate);
                if self.outstanding.contains(&Interaction::new(choices)) {
                    gain += 1;
                }
            });
            let demand = self.demand.get(&candidate).copied().unwrap_or(0);

            match best {
                Some((best_gain, best_demand, _)) if (gain, demand) <= (best_gain, best_demand) => {}
                _ => best = Some((gain, demand, level)),
            }
        }
        best.map(|(_, _, level)| level).unwrap_or(0)
    }

    fn retire(&mut self, path: &CasePath) {
        let choices: Vec<Choice> = path.choices().map(|(p, l)| Choice::new(p, l)).collect();

        let mut realized = Vec::new();
        if choices.len() < self.strength {
            realized.push(Interaction::new(choices));
        } else {
            for_each_subset(&choices, self.strength, |subset| {
                realized.push(Interaction::new(subset.to_vec()));
            });
        }

        for target in realized {
            if self.outstanding.remove(&target) {
                for choice in target.choices() {
                    if let Some(count) = self.demand.get_mut(choice) {
                        *count -= 1;
                    }
                }
            }
        }
    }
}

impl Iterator for CaseGenerator {
    type Item = CasePath;

    fn next(&mut self) -> Option<CasePath> {
        if self.strength == 0 {
            // Any one case covers everything; take the first in traversal order.
            if self.emitted > 0 {
                return None;
            }
            self.outstanding.clear();
            self.emitted = 1;
            return Some(self.space.first_path());
        }

        let seed = self.outstanding.iter().next()?.clone();
        let path = self.build_case(&seed);
        self.retire(&path);
        self.emitted += 1;

        tracing::trace!(
            case = self.emitted,
            outstanding = self.outstanding.len(),
            "case generated"
        );
        if self.outstanding.is_empty() {
            tracing::debug!(
                cases = self.emitted,
                targets = self.total_targets,
                strength = self.strength,
                "coverage complete"
            );
        }
        Some(path)
    }
}
