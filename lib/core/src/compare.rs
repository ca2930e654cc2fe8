//! Pluggable equality used by value search
//!
//! Every comparator is total: values of incompatible kinds are simply
//! "not equal", nothing here returns an error or panics. By convention the
//! first argument comes from the searched tree and the second is the target.

use ahash::AHashSet;
use regex::{Regex, RegexBuilder};

use crate::array::FlatArray;
use crate::value::{NodeId, NodeRef, Scalar, Value, View};
use crate::{Error, Result};

pub trait Comparator {
    /// Atom equality; exact numeric equality by default
    fn scalars(&self, a: Scalar, b: Scalar) -> bool {
        scalar_eq(a, b)
    }

    /// Text equality; exact by default
    fn texts(&self, a: &str, b: &str) -> bool {
        a == b
    }

    /// Flat array equality; same dtype, shape and element bits by default
    fn arrays(&self, a: &FlatArray, b: &FlatArray) -> bool {
        a.same_bytes(b)
    }

    /// Whole-value equality; deep structural comparison by default
    fn compare(&self, a: View<'_>, b: View<'_>) -> bool {
        structural(self, a, b)
    }
}

impl<C: Comparator + ?Sized> Comparator for &C {
    fn scalars(&self, a: Scalar, b: Scalar) -> bool {
        (**self).scalars(a, b)
    }

    fn texts(&self, a: &str, b: &str) -> bool {
        (**self).texts(a, b)
    }

    fn arrays(&self, a: &FlatArray, b: &FlatArray) -> bool {
        (**self).arrays(a, b)
    }

    fn compare(&self, a: View<'_>, b: View<'_>) -> bool {
        (**self).compare(a, b)
    }
}

impl<C: Comparator + ?Sized> Comparator for Box<C> {
    fn scalars(&self, a: Scalar, b: Scalar) -> bool {
        (**self).scalars(a, b)
    }

    fn texts(&self, a: &str, b: &str) -> bool {
        (**self).texts(a, b)
    }

    fn arrays(&self, a: &FlatArray, b: &FlatArray) -> bool {
        (**self).arrays(a, b)
    }

    fn compare(&self, a: View<'_>, b: View<'_>) -> bool {
        (**self).compare(a, b)
    }
}

/// Exact numeric equality: `Int` and `Float` compare by value, `Bool` and
/// `Null` only equal themselves, NaN equals nothing.
pub fn scalar_eq(a: Scalar, b: Scalar) -> bool {
    match (a, b) {
        (Scalar::Null, Scalar::Null) => true,
        (Scalar::Bool(x), Scalar::Bool(y)) => x == y,
        (Scalar::Int(x), Scalar::Int(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Same dtype and shape, elements compared with `cmp`'s scalar rule
pub fn elementwise<C: Comparator + ?Sized>(cmp: &C, a: &FlatArray, b: &FlatArray) -> bool {
    a.dtype() == b.dtype()
        && a.shape() == b.shape()
        && a.iter().zip(b.iter()).all(|(p, q)| cmp.scalars(p, q))
}

/// Deep structural equality driven by `cmp`'s atom rules.
///
/// Maps compare by key set, sequences and records position by position.
/// Cyclic graphs terminate: a pair of nodes met again while already being
/// compared is taken as equal.
pub fn structural<C: Comparator + ?Sized>(cmp: &C, a: View<'_>, b: View<'_>) -> bool {
    let mut walk = Structural {
        cmp,
        seen: AHashSet::new(),
    };
    walk.eq(a, b)
}

struct Structural<'c, C: ?Sized> {
    cmp: &'c C,
    seen: AHashSet<(NodeId, NodeId)>,
}

impl<C: Comparator + ?Sized> Structural<'_, C> {
    fn eq(&mut self, a: View<'_>, b: View<'_>) -> bool {
        match (a, b) {
            (View::Scalar(x), View::Scalar(y)) => self.cmp.scalars(x, y),
            (View::Text(x), View::Text(y)) => self.cmp.texts(x, y),
            (View::Map(x), View::Map(y))
            | (View::Sequence(x), View::Sequence(y))
            | (View::Record(x), View::Record(y)) => self.nodes(x, y),
            (View::Array(x), View::Array(y)) => self.cmp.arrays(x, y),
            (View::Table(x), View::Table(y)) => {
                x.index() == y.index()
                    && x.columns() == y.columns()
                    && x.cells()
                        .zip(y.cells())
                        .all(|((_, _, p), (_, _, q))| self.eq(p.view(), q.view()))
            }
            (View::Series(x), View::Series(y)) => {
                x.labels() == y.labels()
                    && x.values()
                        .iter()
                        .zip(y.values())
                        .all(|(p, q)| self.eq(p.view(), q.view()))
            }
            _ => false,
        }
    }

    fn child(&mut self, a: NodeRef<'_>, ca: NodeId, b: NodeRef<'_>, cb: NodeId) -> bool {
        match (a.child(ca), b.child(cb)) {
            (Some(x), Some(y)) => self.eq(x.view(), y.view()),
            _ => false,
        }
    }

    fn nodes(&mut self, a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
        if !self.seen.insert((a.id(), b.id())) {
            return true;
        }
        match (a.value(), b.value()) {
            (Value::Map(x), Value::Map(y)) => {
                x.len() == y.len()
                    && x.iter().all(|(key, ca)| match y.get(key) {
                        Some(cb) => self.child(a, ca, b, cb),
                        None => false,
                    })
            }
            (Value::Sequence(x), Value::Sequence(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|(ca, cb)| self.child(a, *ca, b, *cb))
            }
            (Value::Record(x), Value::Record(y)) => {
                x.name() == y.name()
                    && x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|((fa, ca), (fb, cb))| fa == fb && self.child(a, ca, b, cb))
            }
            _ => false,
        }
    }
}

/// Structural equality with exact atoms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactComparator;

impl Comparator for ExactComparator {}

/// Numeric closeness in the manner of `math.isclose`:
/// `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxComparator {
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for ApproxComparator {
    fn default() -> Self {
        Self {
            rel_tol: 1e-9,
            abs_tol: 0.0,
        }
    }
}

impl ApproxComparator {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    /// Absolute tolerance only
    pub fn absolute(abs_tol: f64) -> Self {
        Self { rel_tol: 0.0, abs_tol }
    }

    pub fn is_close(&self, x: f64, y: f64) -> bool {
        if x == y {
            return true;
        }
        let diff = (x - y).abs();
        let tol = (self.rel_tol * x.abs().max(y.abs())).max(self.abs_tol);
        diff <= tol
    }
}

impl Comparator for ApproxComparator {
    fn scalars(&self, a: Scalar, b: Scalar) -> bool {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => self.is_close(x, y),
            _ => scalar_eq(a, b),
        }
    }

    fn arrays(&self, a: &FlatArray, b: &FlatArray) -> bool {
        elementwise(self, a, b)
    }
}

/// How a text target is matched against text in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMatch {
    #[default]
    Equal,
    Contains,
    WholeWord,
}

/// Text matching with case folding, substring, whole-word or regex modes.
///
/// When a regex is set it alone decides text matches and the target text is
/// ignored. Atoms other than text compare exactly.
#[derive(Debug, Clone, Default)]
pub struct TextComparator {
    mode: TextMatch,
    ignore_case: bool,
    regex: Option<Regex>,
}

impl TextComparator {
    pub fn new(mode: TextMatch) -> Self {
        Self {
            mode,
            ignore_case: false,
            regex: None,
        }
    }

    pub fn regex(pattern: &str, ignore_case: bool) -> Result<Self> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| Error::Pattern(e.to_string()))?;
        Ok(Self {
            mode: TextMatch::Equal,
            ignore_case,
            regex: Some(re),
        })
    }

    #[must_use]
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn mode(&self) -> TextMatch {
        self.mode
    }

    fn matches(&self, haystack: &str, needle: &str) -> bool {
        match self.mode {
            TextMatch::Equal => haystack == needle,
            TextMatch::Contains => haystack.contains(needle),
            TextMatch::WholeWord => haystack
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == needle),
        }
    }
}

impl Comparator for TextComparator {
    fn texts(&self, a: &str, b: &str) -> bool {
        if let Some(re) = &self.regex {
            return re.is_match(a);
        }
        if self.ignore_case {
            self.matches(&a.to_lowercase(), &b.to_lowercase())
        } else {
            self.matches(a, b)
        }
    }
}

/// Adapter turning any `Fn(View, View) -> bool` into a comparator
#[derive(Debug, Clone, Copy)]
pub struct FnComparator<F>(pub F);

impl<F> Comparator for FnComparator<F>
where
    F: Fn(View<'_>, View<'_>) -> bool,
{
    fn scalars(&self, a: Scalar, b: Scalar) -> bool {
        (self.0)(View::Scalar(a), View::Scalar(b))
    }

    fn texts(&self, a: &str, b: &str) -> bool {
        (self.0)(View::Text(a), View::Text(b))
    }

    fn compare(&self, a: View<'_>, b: View<'_>) -> bool {
        (self.0)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::FlatArray;
    use crate::value::Tree;
    use serde_json::json;

    #[test]
    fn test_scalar_numeric_equality() {
        assert!(scalar_eq(Scalar::Int(1), Scalar::Float(1.0)));
        assert!(!scalar_eq(Scalar::Bool(true), Scalar::Int(1)));
        assert!(!scalar_eq(Scalar::Float(f64::NAN), Scalar::Float(f64::NAN)));
        assert!(scalar_eq(Scalar::Null, Scalar::Null));
        assert!(!scalar_eq(Scalar::Null, Scalar::Int(0)));
    }

    #[test]
    fn test_structural_deep_equality() {
        let a = Tree::from_json(&json!({"x": [1, 2, {"y": "z"}], "w": null}));
        let b = Tree::from_json(&json!({"w": null, "x": [1, 2.0, {"y": "z"}]}));
        let c = Tree::from_json(&json!({"w": null, "x": [1, 2, {"y": "Z"}]}));
        let cmp = ExactComparator;
        assert!(cmp.compare(a.root().unwrap().view(), b.root().unwrap().view()));
        assert!(!cmp.compare(a.root().unwrap().view(), c.root().unwrap().view()));
    }

    #[test]
    fn test_incompatible_kinds_are_unequal() {
        let t = Tree::from_json(&json!([1]));
        let arr = FlatArray::from_ints(vec![1]);
        let cmp = ExactComparator;
        let seq = t.root().unwrap().view();
        assert!(!cmp.compare(seq, View::Array(&arr)));
        assert!(!cmp.compare(seq, View::Scalar(Scalar::Int(1))));
        assert!(!cmp.compare(View::Text("1"), View::Scalar(Scalar::Int(1))));
    }

    #[test]
    fn test_cyclic_structures_terminate() {
        let build = || {
            let mut tree = Tree::new();
            let leaf = tree.scalar(7);
            let m = tree.map([("v", leaf)]);
            tree.insert_entry(m, "me", m).unwrap();
            tree.set_root(m).unwrap();
            tree
        };
        let (a, b) = (build(), build());
        assert!(ExactComparator.compare(a.root().unwrap().view(), b.root().unwrap().view()));
    }

    #[test]
    fn test_array_equality_needs_dtype_and_shape() {
        let ints = FlatArray::from_ints(vec![1, 2]);
        let floats = FlatArray::from_floats(vec![1.0, 2.0]);
        let cmp = ExactComparator;
        assert!(cmp.compare(View::Array(&ints), View::Array(&ints.clone())));
        assert!(!cmp.compare(View::Array(&ints), View::Array(&floats)));
    }

    #[test]
    fn test_array_equality_is_bitwise_by_default() {
        let with_nan = FlatArray::from_floats(vec![1.0, f64::NAN]);
        assert!(ExactComparator.compare(View::Array(&with_nan), View::Array(&with_nan.clone())));

        let zero = FlatArray::from_floats(vec![0.0]);
        let neg_zero = FlatArray::from_floats(vec![-0.0]);
        assert!(!ExactComparator.compare(View::Array(&zero), View::Array(&neg_zero)));

        // tolerant comparators go element by element
        let near = FlatArray::from_floats(vec![1.001, 2.0]);
        let far = FlatArray::from_floats(vec![1.0, 2.0]);
        let approx = ApproxComparator::absolute(0.01);
        assert!(approx.compare(View::Array(&near), View::Array(&far)));
        assert!(!approx.compare(View::Array(&with_nan), View::Array(&with_nan.clone())));
    }

    #[test]
    fn test_approx() {
        let cmp = ApproxComparator::absolute(0.01);
        assert!(cmp.compare(View::from(1.005), View::from(1)));
        assert!(!cmp.compare(View::from(1.02), View::from(1)));
        assert!(!cmp.compare(View::from(f64::NAN), View::from(f64::NAN)));
        assert!(ApproxComparator::default().compare(View::from(0.1 + 0.2), View::from(0.3)));
        assert!(!cmp.compare(View::from(true), View::from(1)));
    }

    #[test]
    fn test_text_modes() {
        let contains = TextComparator::new(TextMatch::Contains).ignore_case(true);
        assert!(contains.compare(View::Text("Hello World"), View::Text("world")));

        let word = TextComparator::new(TextMatch::WholeWord);
        assert!(word.compare(View::Text("spike-rate high"), View::Text("rate")));
        assert!(!word.compare(View::Text("spikerate"), View::Text("rate")));

        let re = TextComparator::regex(r"^trace_\d+$", false).unwrap();
        assert!(re.compare(View::Text("trace_12"), View::Text("ignored")));
        assert!(!re.compare(View::Text("trace_x"), View::Text("ignored")));
        assert!(matches!(TextComparator::regex("(", false), Err(Error::Pattern(_))));
    }

    #[test]
    fn test_fn_comparator() {
        let parity = FnComparator(|a: View<'_>, b: View<'_>| match (a, b) {
            (View::Scalar(Scalar::Int(x)), View::Scalar(Scalar::Int(y))) => x % 2 == y % 2,
            _ => false,
        });
        assert!(parity.compare(View::from(4), View::from(10)));
        assert!(!parity.compare(View::from(3), View::from(10)));
    }
}
