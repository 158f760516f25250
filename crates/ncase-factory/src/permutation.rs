//! Invertible rearrangements of a fixed-length sequence.
//!
//! A `Permutation` of length `n` is a bijection over `{0..n-1}`.
//! Applying it reads `result[i] = sequence[bijection[i]]`, so the
//! bijection lists, for each output slot, which input position feeds it.
//!
//! Permutations are also addressable by their Lehmer code: `n - 1` digits
//! where digit `slot` lies in `0..n - slot`. The coverage generator treats
//! each digit as an independent choice point, which keeps the arrangement
//! space of a synthesized sequence tractable at low strength.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermutationError {
    #[error("permutation of length {expected} applied to a sequence of length {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("not a bijection over 0..{len}")]
    NotABijection { len: usize },

    #[error("Lehmer digit {digit} at slot {slot} must be below {limit}")]
    InvalidLehmerDigit { slot: usize, digit: usize, limit: usize },
}

/// A bijection from `{0..n-1}` onto itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permutation {
    bijection: Vec<usize>,
}

impl Permutation {
    /// Build from an explicit bijection, rejecting repeats and out-of-range entries.
    pub fn new(bijection: Vec<usize>) -> Result<Self, PermutationError> {
        let len = bijection.len();
        let mut seen = vec![false; len];
        for &target in &bijection {
            if target >= len || seen[target] {
                return Err(PermutationError::NotABijection { len });
            }
            seen[target] = true;
        }
        Ok(Self { bijection })
    }

    pub fn identity(len: usize) -> Self {
        Self {
            bijection: (0..len).collect(),
        }
    }

    /// Build the permutation of length `len` named by a Lehmer code.
    ///
    /// The code must hold `len - 1` digits (or none when `len <= 1`).
    pub fn from_lehmer_code(len: usize, code: &[usize]) -> Result<Self, PermutationError> {
        let expected = len.saturating_sub(1);
        if code.len() != expected {
            return Err(PermutationError::LengthMismatch {
                expected,
                actual: code.len(),
            });
        }
        for (slot, &digit) in code.iter().enumerate() {
            let limit = len - slot;
            if digit >= limit {
                return Err(PermutationError::InvalidLehmerDigit { slot, digit, limit });
            }
        }
        Ok(Self::from_valid_lehmer_code(len, code))
    }

    /// Caller guarantees every digit is in range.
    pub(crate) fn from_valid_lehmer_code(len: usize, code: &[usize]) -> Self {
        let mut available: Vec<usize> = (0..len).collect();
        let mut bijection = Vec::with_capacity(len);
        for &digit in code {
            bijection.push(available.remove(digit.min(available.len() - 1)));
        }
        bijection.extend(available);
        Self { bijection }
    }

    /// The Lehmer code of this permutation; inverse of `from_lehmer_code`.
    pub fn lehmer_code(&self) -> Vec<usize> {
        let len = self.bijection.len();
        (0..len.saturating_sub(1))
            .map(|slot| {
                let target = self.bijection[slot];
                self.bijection[slot + 1..]
                    .iter()
                    .filter(|&&later| later < target)
                    .count()
            })
            .collect()
    }

    /// All `len!` permutations, in Lehmer-code order starting from the identity.
    pub fn enumerate(len: usize) -> impl Iterator<Item = Permutation> {
        let mut code = Some(vec![0usize; len.saturating_sub(1)]);
        std::iter::from_fn(move || {
            let current = code.take()?;
            let permutation = Self::from_valid_lehmer_code(len, &current);

            // Odometer step, last slot fastest.
            let mut next = current;
            let mut slot = next.len();
            loop {
                if slot == 0 {
                    break;
                }
                slot -= 1;
                next[slot] += 1;
                if next[slot] < len - slot {
                    code = Some(next);
                    break;
                }
                next[slot] = 0;
            }
            Some(permutation)
        })
    }

    pub fn len(&self) -> usize {
        self.bijection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bijection.is_empty()
    }

    pub fn bijection(&self) -> &[usize] {
        &self.bijection
    }

    /// Rearrange `sequence`: `result[i] = sequence[bijection[i]]`.
    pub fn apply<V: Clone>(&self, sequence: &[V]) -> Result<Vec<V>, PermutationError> {
        if sequence.len() != self.bijection.len() {
            return Err(PermutationError::LengthMismatch {
                expected: self.bijection.len(),
                actual: sequence.len(),
            });
        }
        Ok(self
            .bijection
            .iter()
            .map(|&source| sequence[source].clone())
            .collect())
    }

    /// The bijection `b'` with `b'[b[i]] = i`.
    pub fn invert(&self) -> Self {
        let mut inverse = vec![0; self.bijection.len()];
        for (slot, &target) in self.bijection.iter().enumerate() {
            inverse[target] = slot;
        }
        Self { bijection: inverse }
    }

    /// The permutation equivalent to applying `self` and then `then`.
    pub fn compose(&self, then: &Permutation) -> Result<Self, PermutationError> {
        Ok(Self {
            bijection: then.apply(&self.bijection)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_reads_through_bijection() {
        let p = Permutation::new(vec![2, 0, 1]).unwrap();
        assert_eq!(p.apply(&['a', 'b', 'c']).unwrap(), vec!['c', 'a', 'b']);
    }

    #[test]
    fn test_apply_rejects_wrong_length() {
        let p = Permutation::identity(3);
        let err = p.apply(&[1, 2]).unwrap_err();
        assert_eq!(
            err,
            PermutationError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_new_rejects_non_bijection() {
        assert!(Permutation::new(vec![0, 0]).is_err());
        assert!(Permutation::new(vec![0, 2]).is_err());
        assert!(Permutation::new(vec![]).is_ok());
    }

    #[test]
    fn test_invert_undoes_apply_for_all_small_permutations() {
        for len in 0..=5 {
            let sequence: Vec<u32> = (0..len as u32).map(|x| x * 7 + 1).collect();
            for p in Permutation::enumerate(len) {
                let shuffled = p.apply(&sequence).unwrap();
                assert_eq!(p.invert().apply(&shuffled).unwrap(), sequence);
            }
        }
    }

    #[test]
    fn test_enumerate_yields_factorial_distinct_permutations() {
        let all: Vec<Permutation> = Permutation::enumerate(4).collect();
        assert_eq!(all.len(), 24);
        let unique: std::collections::HashSet<_> = all.iter().cloned().collect();
        assert_eq!(unique.len(), 24);
        assert_eq!(all[0], Permutation::identity(4));
    }

    #[test]
    fn test_enumerate_degenerate_lengths() {
        assert_eq!(Permutation::enumerate(0).count(), 1);
        assert_eq!(Permutation::enumerate(1).count(), 1);
    }

    #[test]
    fn test_lehmer_code_round_trip() {
        for p in Permutation::enumerate(5) {
            let code = p.lehmer_code();
            assert_eq!(Permutation::from_lehmer_code(5, &code).unwrap(), p);
        }
    }

    #[test]
    fn test_from_lehmer_code_rejects_bad_digits() {
        assert!(matches!(
            Permutation::from_lehmer_code(3, &[3, 0]),
            Err(PermutationError::InvalidLehmerDigit { slot: 0, .. })
        ));
        assert!(matches!(
            Permutation::from_lehmer_code(3, &[0]),
            Err(PermutationError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_compose_matches_sequential_application() {
        let first = Permutation::new(vec![1, 2, 0]).unwrap();
        let second = Permutation::new(vec![0, 2, 1]).unwrap();
        let both = first.compose(&second).unwrap();
        let sequence = ['x', 'y', 'z'];
        let stepwise = second.apply(&first.apply(&sequence).unwrap()).unwrap();
        assert_eq!(both.apply(&sequence).unwrap(), stepwise);
    }
}
