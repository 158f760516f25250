pub mod coverage;
pub mod generator;

/// One choice point set to one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Choice {
    pub point: usize,
    pub level: usize,
}

impl Choice {
    pub fn new(point: usize, level: usize) -> Self {
        Self { point, level }
    }
}

/// A combination of choices that some generated case must realize.
///
/// Choices are kept sorted by point, so equal combinations compare equal
/// and the set of outstanding interactions has a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interaction {
    choices: Vec<Choice>,
}

impl Interaction {
    pub fn new(mut choices: Vec<Choice>) -> Self {
        choices.sort();
        Self { choices }
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

impl std::fmt::Display for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .choices
            .iter()
            .map(|c| format!("#{}={}", c.point, c.level))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
