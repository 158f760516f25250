//! Typed factory combinators.
//!
//! A `Factory<T>` is an immutable description of a finite domain of `T`
//! cases. Leaves are built with `Singleton` and `Variable`; `Synthesis`
//! combines sub-factories into a cross product and `Interleaving` unions
//! alternative sub-factories. Factories are cheap to clone and may be reused
//! at several places in one tree.

use std::marker::PhantomData;
use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::One;

use crate::key::{KeyError, ReproductionKey};
use crate::permutation::Permutation;
use crate::space::{CasePath, ChoiceSpace, PathError};
use crate::tree::{next_case, unbox, AnyCase, Combiner, Node, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("a variable needs at least one value")]
    EmptyDomain,

    #[error("an interleaving needs at least one branch")]
    NoBranches,
}

/// An immutable, finite, deterministically ordered domain of `T` cases.
pub struct Factory<T> {
    node: Arc<Node>,
    _case: PhantomData<fn() -> T>,
}

impl<T> Clone for Factory<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            _case: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("case_type", &std::any::type_name::<T>())
            .field("choice_points", &self.node.dimensions)
            .finish()
    }
}

impl<T: Send + 'static> Factory<T> {
    fn from_node(node: Node) -> Self {
        Self {
            node: Arc::new(node),
            _case: PhantomData,
        }
    }

    /// The flattened choice points of this tree, in preorder.
    pub fn choice_space(&self) -> ChoiceSpace {
        ChoiceSpace::of(&self.node)
    }

    /// Build the case selected by `path`.
    ///
    /// Only the points the path actually visits are checked; use
    /// `ChoiceSpace::validate` for a full check.
    pub fn materialize(&self, path: &CasePath) -> Result<T, PathError> {
        if path.levels().len() != self.node.dimensions {
            return Err(PathError::ShapeMismatch {
                expected: self.node.dimensions,
                actual: path.levels().len(),
            });
        }
        Ok(unbox(self.node.materialize(path, 0)?))
    }

    /// The reproduction key naming `path` in this tree.
    pub fn reproduction_key(&self, path: &CasePath) -> Result<ReproductionKey, PathError> {
        let space = self.choice_space();
        space.validate(path)?;
        Ok(ReproductionKey::encode(&space, path))
    }

    /// Rebuild exactly the case named by `key`, without enumerating any other case.
    pub fn reproduce(&self, key: &str) -> Result<T, KeyError> {
        let key: ReproductionKey = key.parse()?;
        let path = key.decode(&self.choice_space())?;
        Ok(self.materialize(&path)?)
    }

    /// Strength at and above which generation is exhaustive.
    pub fn maximum_strength(&self) -> usize {
        self.choice_space().maximum_active()
    }

    /// Number of cases in the full enumeration of this tree.
    pub fn exhaustive_case_count(&self) -> BigUint {
        exhaustive_count(&self.node)
    }
}

fn exhaustive_count(node: &Node) -> BigUint {
    match &node.kind {
        NodeKind::Singleton { .. } => BigUint::one(),
        NodeKind::Variable { levels, .. } => BigUint::from(*levels),
        NodeKind::Interleaving { branches } => branches.iter().map(|b| exhaustive_count(b)).sum(),
        NodeKind::Synthesis { children, combiner } => {
            let product: BigUint = children.iter().map(|c| exhaustive_count(c)).product();
            match combiner {
                Combiner::Plain(_) => product,
                Combiner::WithPermutation(_) => {
                    let arrangements: BigUint = (1..=children.len()).map(BigUint::from).product();
                    product * arrangements
                }
            }
        }
    }
}

/// Factory whose only case is one fixed value.
pub struct Singleton;

impl Singleton {
    pub fn create<T: Clone + Send + Sync + 'static>(value: T) -> Factory<T> {
        Factory::from_node(Node::singleton(Arc::new(move || {
            Box::new(value.clone()) as AnyCase
        })))
    }
}

/// Factory whose cases are exactly a given list of values, in order.
pub struct Variable;

impl Variable {
    pub fn create<V, I>(values: I) -> Result<Factory<V>, FactoryError>
    where
        V: Clone + Send + Sync + 'static,
        I: IntoIterator<Item = V>,
    {
        let values: Arc<[V]> = values.into_iter().collect();
        if values.is_empty() {
            return Err(FactoryError::EmptyDomain);
        }
        Ok(Factory::from_node(Node::variable(
            values.len(),
            Arc::new(move |level: usize| Box::new(values[level].clone()) as AnyCase),
        )))
    }
}

/// Cross-product combinator.
pub struct Synthesis;

impl Synthesis {
    /// Combine a tuple of factories, e.g. `(ages, names)`, through `combine`.
    pub fn create<F, T, C>(factories: F, combine: C) -> Factory<T>
    where
        F: FactoryTuple + 'static,
        T: Send + 'static,
        C: Fn(F::Cases) -> T + Send + Sync + 'static,
    {
        let children = factories.into_nodes().into_iter().map(|n| n.0).collect();
        Factory::from_node(Node::synthesis(
            children,
            Combiner::Plain(Arc::new(move |cases: Vec<AnyCase>| {
                Box::new(combine(F::unbox_cases(cases))) as AnyCase
            })),
        ))
    }

    /// Combine a runtime-sized list of same-typed factories.
    pub fn create_sequence<V, T, C, I>(factories: I, combine: C) -> Factory<T>
    where
        V: Send + 'static,
        T: Send + 'static,
        C: Fn(Vec<V>) -> T + Send + Sync + 'static,
        I: IntoIterator<Item = Factory<V>>,
    {
        let children = factories.into_iter().map(|f| f.node).collect();
        Factory::from_node(Node::synthesis(
            children,
            Combiner::Plain(Arc::new(move |cases: Vec<AnyCase>| {
                Box::new(combine(cases.into_iter().map(unbox::<V>).collect())) as AnyCase
            })),
        ))
    }

    /// Combine same-typed factories and also vary an arrangement of them.
    ///
    /// Each case is the sub-factory values in sub-factory order together with
    /// a permutation of that many items. The arrangement is covered like any
    /// other dimension, so a consumer can test its value content and its
    /// ordering independently.
    pub fn create_with_permutation<V, I>(factories: I) -> Factory<(Vec<V>, Permutation)>
    where
        V: Send + 'static,
        I: IntoIterator<Item = Factory<V>>,
    {
        let children = factories.into_iter().map(|f| f.node).collect();
        Factory::from_node(Node::synthesis(
            children,
            Combiner::WithPermutation(Arc::new(|cases: Vec<AnyCase>, permutation: Permutation| {
                let values: Vec<V> = cases.into_iter().map(unbox::<V>).collect();
                Box::new((values, permutation)) as AnyCase
            })),
        ))
    }
}

/// Union combinator over alternative factories of one case type.
pub struct Interleaving;

impl Interleaving {
    pub fn create<T, I>(factories: I) -> Result<Factory<T>, FactoryError>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Factory<T>>,
    {
        let branches: Vec<Arc<Node>> = factories.into_iter().map(|f| f.node).collect();
        if branches.is_empty() {
            return Err(FactoryError::NoBranches);
        }
        Ok(Factory::from_node(Node::interleaving(branches)))
    }
}

/// Opaque handle to an erased sub-tree, used by `FactoryTuple`.
#[doc(hidden)]
pub struct NodeHandle(Arc<Node>);

/// A tuple of factories that `Synthesis::create` can combine.
///
/// Implemented for tuples of one to eight `Factory` values.
pub trait FactoryTuple {
    /// The tuple of case values handed to the combining function.
    type Cases;

    #[doc(hidden)]
    fn into_nodes(self) -> Vec<NodeHandle>;

    #[doc(hidden)]
    fn unbox_cases(cases: Vec<AnyCase>) -> Self::Cases;
}

macro_rules! impl_factory_tuple {
    ($($case:ident . $idx:tt),+) => {
        impl<$($case: Send + 'static),+> FactoryTuple for ($(Factory<$case>,)+) {
            type Cases = ($($case,)+);

            fn into_nodes(self) -> Vec<NodeHandle> {
                vec![$(NodeHandle(self.$idx.node)),+]
            }

            fn unbox_cases(cases: Vec<AnyCase>) -> Self::Cases {
                let mut cases = cases.into_iter();
                ($(next_case::<$case>(&mut cases),)+)
            }
        }
    };
}

impl_factory_tuple!(A.0);
impl_factory_tuple!(A.0, B.1);
impl_factory_tuple!(A.0, B.1, C.2);
impl_factory_tuple!(A.0, B.1, C.2, D.3);
impl_factory_tuple!(A.0, B.1, C.2, D.3, E.4);
impl_factory_tuple!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_factory_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_factory_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
