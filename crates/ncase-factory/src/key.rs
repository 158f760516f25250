//! Reproduction keys.
//!
//! A key is the mixed-radix integer formed by the levels of a path's active
//! choice points, taken in preorder with the first point as the least
//! significant digit and each point's local cardinality as its radix.
//! Decoding peels digits off in the same order, consulting the tree only to
//! learn which point comes next, so one case is rebuilt without enumerating
//! any other. Keys are written as plain decimal; deep trees give keys
//! thousands of digits long.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::space::{CasePath, ChoiceSpace, PathError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("malformed reproduction key {0:?}: expected ASCII decimal digits")]
    Malformed(String),

    #[error(
        "reproduction key exceeds the {cardinality} cases reachable along its path; \
         the factory has changed since the key was captured"
    )]
    OutOfRange { cardinality: BigUint },

    #[error("reproduced path does not fit the factory: {0}")]
    Path(#[from] PathError),
}

/// Opaque serialized identity of one generated case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReproductionKey(BigUint);

impl ReproductionKey {
    /// Fold the active levels of `path` into a key. The path must fit `space`.
    pub fn encode(space: &ChoiceSpace, path: &CasePath) -> Self {
        let points = space.points();
        let mut value = BigUint::zero();
        for (point, level) in path.choices().collect::<Vec<_>>().into_iter().rev() {
            value = value * BigUint::from(points[point].levels) + BigUint::from(level);
        }
        Self(value)
    }

    /// Recover the path this key names in `space`.
    pub fn decode(&self, space: &ChoiceSpace) -> Result<CasePath, KeyError> {
        let points = space.points();
        let mut remaining = self.0.clone();
        let mut cardinality = BigUint::one();
        let mut levels = vec![None; points.len()];

        for point in 0..points.len() {
            if !space.is_active(point, &levels) {
                continue;
            }
            let radix = BigUint::from(points[point].levels);
            let digit = (&remaining % &radix).to_usize().unwrap_or_default();
            remaining /= &radix;
            cardinality *= &radix;
            levels[point] = Some(digit);
        }

        if !remaining.is_zero() {
            return Err(KeyError::OutOfRange { cardinality });
        }
        Ok(CasePath::new(levels))
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for ReproductionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReproductionKey {
    type Err = KeyError;

    /// Accepts ASCII digits only; leading zeros are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KeyError::Malformed(s.to_string()));
        }
        let significant = s.trim_start_matches('0');
        if significant.is_empty() {
            return Ok(Self(BigUint::zero()));
        }
        BigUint::parse_bytes(significant.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| KeyError::Malformed(s.to_string()))
    }
}

impl Serialize for ReproductionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReproductionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{Interleaving, Synthesis, Variable};

    #[test]
    fn test_leading_zeros_are_insignificant() {
        let a: ReproductionKey = "000123".parse().unwrap();
        let b: ReproductionKey = "123".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!("000".parse::<ReproductionKey>().unwrap().to_string(), "0");
    }

    #[test]
    fn test_rejects_non_digit_keys() {
        for bad in ["abc", "", "+12", "-1", "1_000", " 12", "12 "] {
            assert!(
                matches!(bad.parse::<ReproductionKey>(), Err(KeyError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_key_one_past_a_three_way_variable_is_out_of_range() {
        let space = Variable::create(vec!['a', 'b', 'c']).unwrap().choice_space();
        let last: ReproductionKey = "2".parse().unwrap();
        assert_eq!(last.decode(&space).unwrap().levels(), &[Some(2)]);

        let past: ReproductionKey = "3".parse().unwrap();
        assert!(matches!(past.decode(&space), Err(KeyError::OutOfRange { .. })));
    }

    #[test]
    fn test_first_point_is_least_significant() {
        let f = Synthesis::create(
            (Variable::create(0..3).unwrap(), Variable::create(0..2).unwrap()),
            |(a, b)| a * 10 + b,
        );
        let space = f.choice_space();
        let path = CasePath::new(vec![Some(2), Some(1)]);
        let key = ReproductionKey::encode(&space, &path);
        // 2 + 3 * 1
        assert_eq!(key.to_string(), "5");
        assert_eq!(key.decode(&space).unwrap(), path);
    }

    #[test]
    fn test_branch_digit_selects_branch_before_its_points() {
        let f = Interleaving::create(vec![
            Variable::create(vec![1, 2]).unwrap(),
            Variable::create(vec![3, 4, 5]).unwrap(),
        ])
        .unwrap();
        let space = f.choice_space();

        // branch 1 then level 2: 1 + 2 * 2
        let key: ReproductionKey = "5".parse().unwrap();
        assert_eq!(
            key.decode(&space).unwrap().levels(),
            &[Some(1), None, Some(2)]
        );
        assert_eq!(f.reproduce("5").unwrap(), 5);
        assert_eq!(f.reproduce("0").unwrap(), 1);
    }

    #[test]
    fn test_every_exhaustive_path_has_a_distinct_key() {
        let digit = Variable::create(0..3).unwrap();
        let f = Interleaving::create(vec![
            Synthesis::create((digit.clone(), digit.clone()), |(a, b)| a * 3 + b),
            Synthesis::create((digit,), |(a,)| 100 + a),
        ])
        .unwrap();
        let space = f.choice_space();

        // Keys are dense per branch, not overall: the widest branch bounds them.
        let mut seen = std::collections::HashSet::new();
        for raw in 0..2 * 9 {
            let key: ReproductionKey = raw.to_string().parse().unwrap();
            let Ok(path) = key.decode(&space) else {
                continue;
            };
            assert_eq!(ReproductionKey::encode(&space, &path), key);
            assert!(seen.insert(f.materialize(&path).unwrap()));
        }
        assert_eq!(seen.len(), f.exhaustive_case_count().to_usize().unwrap());
    }

    #[test]
    fn test_serde_uses_decimal_string() {
        let key: ReproductionKey = "98765432109876543210987654321".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"98765432109876543210987654321\"");
        let back: ReproductionKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<ReproductionKey>("\"12a\"").is_err());
    }
}
