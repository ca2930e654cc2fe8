//! Access paths
//!
//! A [`Path`] is the ordered list of atomic steps leading from a tree's root
//! to one node (or to one element inside a leaf container). The empty path
//! denotes the root itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::table::Label;

/// One atomic index or key.
///
/// A step is only meaningful relative to the kind of node it was produced
/// against; replaying it against another kind is a [`PathError`](crate::PathError).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// Map key, also accepted as a record field name or a table column label
    Key(String),
    /// Ordinal position; negative values count from the end
    Position(isize),
    /// Record field name
    FieldName(String),
    /// Negative-aware, possibly partial, per-axis array index
    ArrayIndex(Vec<isize>),
    /// Full array coordinates, one per axis
    ArrayFlatIndex(Vec<usize>),
    /// Positional table cell
    TableCell { row: usize, col: usize },
    /// Table column by label
    Column(Label),
    /// Table row by label
    Row(Label),
}

impl PathStep {
    pub fn key(key: impl Into<String>) -> Self {
        PathStep::Key(key.into())
    }

    pub fn field(name: impl Into<String>) -> Self {
        PathStep::FieldName(name.into())
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_string())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        PathStep::Key(key)
    }
}

impl From<isize> for PathStep {
    fn from(position: isize) -> Self {
        PathStep::Position(position)
    }
}

fn write_axes<T: fmt::Display>(f: &mut fmt::Formatter<'_>, axes: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, axis) in axes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", axis)?;
    }
    f.write_str("]")
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(k) => write!(f, "[{:?}]", k),
            PathStep::Position(i) => write!(f, "[{}]", i),
            PathStep::FieldName(name) => write!(f, ".{}", name),
            PathStep::ArrayIndex(ix) => write_axes(f, ix),
            PathStep::ArrayFlatIndex(ix) => write_axes(f, ix),
            PathStep::TableCell { row, col } => write!(f, ".iloc[{}, {}]", row, col),
            PathStep::Column(label) => write!(f, "[{}]", label),
            PathStep::Row(label) => write!(f, ".loc[{}]", label),
        }
    }
}

/// Route from the root to a node, shallowest step first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    #[inline]
    #[must_use]
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// The empty path
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Copy of this path extended by one step
    #[must_use]
    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push(step);
        Self { steps }
    }

    /// Path of the enclosing node, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        match self.steps.split_last() {
            Some((_, rest)) => Some(Self { steps: rest.to_vec() }),
            None => None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[inline]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    #[inline]
    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathStep> {
        self.steps.iter()
    }

    pub fn into_steps(self) -> Vec<PathStep> {
        self.steps
    }
}

impl From<Vec<PathStep>> for Path {
    fn from(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }
}

impl From<&[PathStep]> for Path {
    fn from(steps: &[PathStep]) -> Self {
        Self { steps: steps.to_vec() }
    }
}

impl FromIterator<PathStep> for Path {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Path {
    type Item = PathStep;
    type IntoIter = std::vec::IntoIter<PathStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathStep;
    type IntoIter = std::slice::Iter<'a, PathStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Build a [`Path`] from a list of steps.
///
/// String literals become [`PathStep::Key`], integers [`PathStep::Position`];
/// any other expression must already be a `PathStep`.
#[macro_export]
macro_rules! path {
    () => { $crate::Path::root() };
    ($($step:expr),+ $(,)?) => {
        $crate::Path::new(vec![$($crate::PathStep::from($step)),+])
    };
}
