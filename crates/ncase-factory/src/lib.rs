//! Composable generators of structured test cases.
//!
//! Build a tree of factories bottom-up with [`Singleton`], [`Variable`],
//! [`Synthesis`] and [`Interleaving`]. Every case the tree can produce is
//! traceable to exactly one [`CasePath`] through its [`ChoiceSpace`], and
//! every path has a short [`ReproductionKey`] that rebuilds that one case.

pub mod factory;
pub mod key;
pub mod permutation;
pub mod space;
mod tree;

pub use factory::{Factory, FactoryError, FactoryTuple, Interleaving, Singleton, Synthesis, Variable};
pub use key::{KeyError, ReproductionKey};
pub use permutation::{Permutation, PermutationError};
pub use space::{CasePath, ChoiceKind, ChoicePoint, ChoiceSpace, PathError};
