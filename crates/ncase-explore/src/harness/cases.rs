//! Lazy case iterators over a factory, without executing anything.

use ncase_factory::{Factory, ReproductionKey};

use crate::solver::generator::CaseGenerator;

/// Cases of a factory in generation order.
pub struct Cases<T> {
    factory: Factory<T>,
    generator: CaseGenerator,
}

impl<T: Send + 'static> Cases<T> {
    pub fn new(factory: &Factory<T>, strength: usize) -> Self {
        Self {
            generator: CaseGenerator::new(factory.choice_space(), strength),
            factory: factory.clone(),
        }
    }

    /// Attach the reproduction key of each case.
    pub fn with_keys(self) -> KeyedCases<T> {
        KeyedCases { inner: self }
    }

    fn next_keyed(&mut self, want_key: bool) -> Option<(Option<ReproductionKey>, T)> {
        loop {
            let path = self.generator.next()?;
            match self.factory.materialize(&path) {
                Ok(case) => {
                    let key = want_key.then(|| ReproductionKey::encode(self.generator.space(), &path));
                    return Some((key, case));
                }
                // Generated paths always fit their own tree.
                Err(err) => tracing::error!(%err, "generated path does not fit its factory"),
            }
        }
    }
}

impl<T: Send + 'static> Iterator for Cases<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.next_keyed(false).map(|(_, case)| case)
    }
}

/// Cases of a factory paired with their reproduction keys.
pub struct KeyedCases<T> {
    inner: Cases<T>,
}

impl<T: Send + 'static> Iterator for KeyedCases<T> {
    type Item = (ReproductionKey, T);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, case) = self.inner.next_keyed(true)?;
        key.map(|key| (key, case))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncase_factory::{Synthesis, Variable};

    #[test]
    fn test_cases_follow_generation_order() {
        let f = Synthesis::create(
            (Variable::create(0..3).unwrap(), Variable::create(0..2).unwrap()),
            |(a, b)| a * 10 + b,
        );
        let cases: Vec<i32> = Cases::new(&f, 2).collect();
        let mut sorted = cases.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 10, 11, 20, 21]);
    }

    #[test]
    fn test_keyed_cases_reproduce_themselves() {
        let f = Synthesis::create(
            (Variable::create(["a", "b", "c"]).unwrap(), Variable::create([1, 2]).unwrap()),
            |(s, n)| format!("{s}{n}"),
        );
        let keyed: Vec<_> = Cases::new(&f, 2).with_keys().collect();
        assert_eq!(keyed.len(), 6);
        for (key, case) in keyed {
            assert_eq!(f.reproduce(&key.to_string()).unwrap(), case);
        }
    }
}
