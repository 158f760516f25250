//! Type-erased factory tree shared by every typed `Factory<T>` handle.
//!
//! Nodes are immutable once built and shared through `Arc`, so one node may
//! sit at several positions of a tree. Choice points belong to positions, not
//! to nodes: every position is walked in preorder and `dimensions` records
//! how many choice points a subtree contributes, letting a walker skip the
//! branches an Interleaving did not select.

use std::any::Any;
use std::sync::Arc;

use crate::permutation::Permutation;
use crate::space::{CasePath, PathError};

/// A case value with its static type erased.
pub type AnyCase = Box<dyn Any + Send>;

pub type MakeCase = Arc<dyn Fn() -> AnyCase + Send + Sync>;
pub type MakeLevel = Arc<dyn Fn(usize) -> AnyCase + Send + Sync>;
pub type Combine = Arc<dyn Fn(Vec<AnyCase>) -> AnyCase + Send + Sync>;
pub type CombinePermuted = Arc<dyn Fn(Vec<AnyCase>, Permutation) -> AnyCase + Send + Sync>;

pub enum Combiner {
    Plain(Combine),
    /// Sub-factory values plus the arrangement picked by the trailing
    /// `children.len() - 1` Lehmer choice points.
    WithPermutation(CombinePermuted),
}

pub enum NodeKind {
    Singleton {
        make: MakeCase,
    },
    Variable {
        levels: usize,
        make: MakeLevel,
    },
    Synthesis {
        children: Vec<Arc<Node>>,
        combiner: Combiner,
    },
    Interleaving {
        branches: Vec<Arc<Node>>,
    },
}

pub struct Node {
    pub kind: NodeKind,
    pub dimensions: usize,
}

impl Node {
    pub fn singleton(make: MakeCase) -> Self {
        Self {
            kind: NodeKind::Singleton { make },
            dimensions: 0,
        }
    }

    pub fn variable(levels: usize, make: MakeLevel) -> Self {
        Self {
            kind: NodeKind::Variable { levels, make },
            dimensions: 1,
        }
    }

    pub fn synthesis(children: Vec<Arc<Node>>, combiner: Combiner) -> Self {
        let arrangement = match combiner {
            Combiner::Plain(_) => 0,
            Combiner::WithPermutation(_) => children.len().saturating_sub(1),
        };
        let dimensions = children.iter().map(|c| c.dimensions).sum::<usize>() + arrangement;
        Self {
            kind: NodeKind::Synthesis { children, combiner },
            dimensions,
        }
    }

    pub fn interleaving(branches: Vec<Arc<Node>>) -> Self {
        let dimensions = 1 + branches.iter().map(|b| b.dimensions).sum::<usize>();
        Self {
            kind: NodeKind::Interleaving { branches },
            dimensions,
        }
    }

    /// Build the case selected by `path`, whose choice points for this
    /// subtree start at `offset`.
    pub fn materialize(&self, path: &CasePath, offset: usize) -> Result<AnyCase, PathError> {
        match &self.kind {
            NodeKind::Singleton { make } => Ok(make()),
            NodeKind::Variable { levels, make } => {
                let level = path.checked_level(offset, *levels)?;
                Ok(make(level))
            }
            NodeKind::Interleaving { branches } => {
                let branch = path.checked_level(offset, branches.len())?;
                let skipped: usize = branches[..branch].iter().map(|b| b.dimensions).sum();
                branches[branch].materialize(path, offset + 1 + skipped)
            }
            NodeKind::Synthesis { children, combiner } => {
                let mut cursor = offset;
                let mut cases = Vec::with_capacity(children.len());
                for child in children {
                    cases.push(child.materialize(path, cursor)?);
                    cursor += child.dimensions;
                }
                match combiner {
                    Combiner::Plain(combine) => Ok(combine(cases)),
                    Combiner::WithPermutation(combine) => {
                        let len = children.len();
                        let code = (0..len.saturating_sub(1))
                            .map(|slot| path.checked_level(cursor + slot, len - slot))
                            .collect::<Result<Vec<_>, _>>()?;
                        let permutation = Permutation::from_valid_lehmer_code(len, &code);
                        Ok(combine(cases, permutation))
                    }
                }
            }
        }
    }
}

/// Recover a typed case; the typed factory API guarantees the type.
pub fn unbox<V: 'static>(case: AnyCase) -> V {
    match case.downcast::<V>() {
        Ok(value) => *value,
        Err(_) => unreachable!("factory produced a case of an unexpected type"),
    }
}

/// Pull the next typed case from a synthesis argument list.
pub fn next_case<V: 'static>(cases: &mut std::vec::IntoIter<AnyCase>) -> V {
    match cases.next() {
        Some(case) => unbox(case),
        None => unreachable!("synthesis received fewer cases than sub-factories"),
    }
}
