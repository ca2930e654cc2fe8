//! Replaying paths
//!
//! [`Retriever`] walks a [`Path`] step by step from a root, fetching the value
//! at its end or rendering the path as a readable access expression.

use std::fmt::Write as _;
use tracing::debug;

use crate::array::{ArrayItem, FlatArray, IndexFault};
use crate::error::PathError;
use crate::path::{Path, PathStep};
use crate::table::{resolve_position, Label, Series, Table};
use crate::value::{Cell, Found, NodeKind, NodeRef, Value};

/// Why a single step failed, before depth and node kind are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Miss {
    Incompatible,
    OutOfRange,
}

impl Miss {
    fn into_error(self, step: PathStep, kind: NodeKind, depth: usize) -> PathError {
        match self {
            Miss::Incompatible => PathError::Incompatible { step, kind, depth },
            Miss::OutOfRange => PathError::OutOfRange { step, kind, depth },
        }
    }
}

impl From<IndexFault> for Miss {
    fn from(fault: IndexFault) -> Self {
        match fault {
            IndexFault::TooManyAxes => Miss::Incompatible,
            IndexFault::OutOfBounds => Miss::OutOfRange,
        }
    }
}

/// Apply one step to a value
pub(crate) fn step_into<'t>(current: &Found<'t>, step: &PathStep) -> Result<Found<'t>, Miss> {
    match current {
        Found::Node(node) => node_step(*node, step),
        Found::Array(array) => array_step(array, step),
        Found::Series(series) => series_step(series, step),
        Found::Cell(_) => Err(Miss::Incompatible),
    }
}

fn child<'t>(node: NodeRef<'t>, id: Option<crate::value::NodeId>) -> Result<Found<'t>, Miss> {
    id.and_then(|id| node.child(id))
        .map(Found::Node)
        .ok_or(Miss::OutOfRange)
}

fn node_step<'t>(node: NodeRef<'t>, step: &PathStep) -> Result<Found<'t>, Miss> {
    match (node.value(), step) {
        (Value::Map(m), PathStep::Key(k)) => child(node, m.get(k)),
        (Value::Record(r), PathStep::Key(f) | PathStep::FieldName(f)) => child(node, r.field(f)),
        (Value::Record(r), PathStep::Position(i)) => {
            let pos = resolve_position(*i, r.len());
            child(node, pos.and_then(|p| r.field_at(p)).map(|(_, id)| id))
        }
        (Value::Sequence(items), PathStep::Position(i)) => {
            let pos = resolve_position(*i, items.len());
            child(node, pos.and_then(|p| items.get(p).copied()))
        }
        (Value::FlatArray(a), _) => array_step(a, step),
        (Value::Table(t), _) => table_step(t, step),
        _ => Err(Miss::Incompatible),
    }
}

fn array_step<'t>(array: &FlatArray, step: &PathStep) -> Result<Found<'t>, Miss> {
    let item = match step {
        PathStep::Position(i) => array.index(&[*i])?,
        PathStep::ArrayIndex(ix) => array.index(ix)?,
        PathStep::ArrayFlatIndex(coords) => {
            if coords.len() != array.ndim() {
                return Err(Miss::Incompatible);
            }
            let ix = coords
                .iter()
                .map(|&c| isize::try_from(c).map_err(|_| Miss::OutOfRange))
                .collect::<Result<Vec<_>, _>>()?;
            array.index(&ix)?
        }
        _ => return Err(Miss::Incompatible),
    };
    Ok(match item {
        ArrayItem::Element(s) => Found::Cell(Cell::Scalar(s)),
        ArrayItem::SubArray(sub) => Found::Array(sub),
    })
}

fn table_step<'t>(table: &Table, step: &PathStep) -> Result<Found<'t>, Miss> {
    let found = match step {
        PathStep::Key(k) => table
            .column_by_label(&Label::Text(k.clone()))
            .map(Found::Series),
        PathStep::Column(label) => table.column_by_label(label).map(Found::Series),
        PathStep::Row(label) => table.row_by_label(label).map(Found::Series),
        PathStep::Position(i) => table.row(*i).map(Found::Series),
        PathStep::TableCell { row, col } => table.cell(*row, *col).cloned().map(Found::Cell),
        _ => return Err(Miss::Incompatible),
    };
    found.ok_or(Miss::OutOfRange)
}

fn series_step<'t>(series: &Series, step: &PathStep) -> Result<Found<'t>, Miss> {
    let cell = match step {
        PathStep::Position(i) => series.get(*i),
        PathStep::Key(k) => series.get_by_label(&Label::Text(k.clone())),
        _ => return Err(Miss::Incompatible),
    };
    cell.cloned().map(Found::Cell).ok_or(Miss::OutOfRange)
}

/// Replays paths against a root and renders them for display
#[derive(Debug, Clone)]
pub struct Retriever {
    root_name: String,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            root_name: "root".to_string(),
        }
    }
}

impl Retriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used for the root in rendered expressions
    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Fetch the value at `path`, starting from `root`
    pub fn get<'t>(&self, root: NodeRef<'t>, path: Path) -> Result<Found<'t>, PathError> {
        let mut current = Found::Node(root);
        for (depth, step) in path.into_iter().enumerate() {
            current = match step_into(&current, &step) {
                Ok(next) => next,
                Err(miss) => {
                    let err = miss.into_error(step, current.kind(), depth);
                    debug!(error = %err, "path replay failed");
                    return Err(err);
                }
            };
        }
        Ok(current)
    }

    /// [`get`](Self::get) for each path; one failing path does not affect the others
    pub fn get_many<'t, I>(&self, root: NodeRef<'t>, paths: I) -> Vec<Result<Found<'t>, PathError>>
    where
        I: IntoIterator<Item = Path>,
    {
        paths.into_iter().map(|path| self.get(root, path)).collect()
    }

    /// Source-like access expression such as `root["b"]["c"][2]`.
    ///
    /// Meant for display only; use [`get`](Self::get) to access values.
    pub fn render_expression(&self, root: NodeRef<'_>, path: &Path) -> String {
        let mut out = self.root_name.clone();
        let mut current = Some(Found::Node(root));
        for step in path {
            let kind = current.as_ref().map(|found| found.kind());
            render_step(&mut out, step, kind);
            current = current.and_then(|found| step_into(&found, step).ok());
        }
        out
    }
}

fn render_step(out: &mut String, step: &PathStep, kind: Option<NodeKind>) {
    let _ = match (step, kind) {
        (PathStep::Key(k), Some(NodeKind::Record)) if is_identifier(k) => write!(out, ".{}", k),
        (PathStep::FieldName(name), _) if !is_identifier(name) => write!(out, "[{:?}]", name),
        (PathStep::Position(i), Some(NodeKind::Table | NodeKind::Series)) => {
            write!(out, ".iloc[{}]", i)
        }
        _ => write!(out, "{}", step),
    };
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::value::{Scalar, Tree};
    use serde_json::json;

    fn sample() -> Tree {
        Tree::from_json(&json!({"a": 1, "b": {"c": 2}, "c": [1, 2, 3]}))
    }

    #[test]
    fn test_get_nested() {
        let tree = sample();
        let root = tree.root().unwrap();
        let r = Retriever::new();
        let found = r.get(root, path!["c", -1isize]).unwrap();
        assert_eq!(found.view().kind(), NodeKind::Scalar);
        assert_eq!(found.to_json(), json!(3));
        assert_eq!(r.get(root, Path::root()).unwrap(), Found::Node(root));
    }

    #[test]
    fn test_missing_key_is_out_of_range() {
        let tree = sample();
        let err = Retriever::new().get(tree.root().unwrap(), path!["x"]).unwrap_err();
        assert_eq!(
            err,
            PathError::OutOfRange {
                step: PathStep::key("x"),
                kind: NodeKind::Map,
                depth: 0
            }
        );
    }

    #[test]
    fn test_wrong_step_kind_is_incompatible() {
        let tree = sample();
        let root = tree.root().unwrap();
        let r = Retriever::new();
        let err = r.get(root, path!["c", "k"]).unwrap_err();
        assert!(matches!(err, PathError::Incompatible { kind: NodeKind::Sequence, depth: 1, .. }));
        let err = r.get(root, path!["a", 0isize]).unwrap_err();
        assert!(matches!(err, PathError::Incompatible { kind: NodeKind::Scalar, .. }));
        let err = r.get(root, path!["c", 3isize]).unwrap_err();
        assert!(matches!(err, PathError::OutOfRange { .. }));
    }

    #[test]
    fn test_get_many_isolates_failures() {
        let tree = sample();
        let results = Retriever::new().get_many(
            tree.root().unwrap(),
            vec![path!["a"], path!["zzz"], path!["b", "c"]],
        );
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().to_json(), json!(2));
    }

    #[test]
    fn test_array_steps() {
        let mut tree = Tree::new();
        let grid =
            FlatArray::new(vec![2, 2], crate::ArrayData::Float(vec![0.5, 1.5, 2.5, 3.5])).unwrap();
        let a = tree.flat_array(grid);
        tree.set_root(a).unwrap();
        let root = tree.root().unwrap();
        let r = Retriever::new();

        let cell = r.get(root, Path::new(vec![PathStep::ArrayFlatIndex(vec![1, 0])])).unwrap();
        assert_eq!(cell, Found::Cell(Cell::Scalar(Scalar::Float(2.5))));

        let row = r.get(root, path![-1isize]).unwrap();
        assert!(matches!(row, Found::Array(ref sub) if sub.shape() == [2]));

        let deep = r.get(root, Path::new(vec![PathStep::Position(0), PathStep::Position(1)]));
        assert_eq!(deep.unwrap(), Found::Cell(Cell::Scalar(Scalar::Float(1.5))));

        let err = r.get(root, Path::new(vec![PathStep::ArrayFlatIndex(vec![1])])).unwrap_err();
        assert!(matches!(err, PathError::Incompatible { kind: NodeKind::FlatArray, .. }));
        let err = r.get(root, Path::new(vec![PathStep::ArrayIndex(vec![0, 5])])).unwrap_err();
        assert!(matches!(err, PathError::OutOfRange { .. }));
    }

    #[test]
    fn test_table_steps_and_rendering() {
        let mut tree = Tree::new();
        let table = Table::from_rows(
            vec![Label::Int(10), Label::Int(20)],
            vec!["name".into(), "price".into()],
            vec![
                vec![Cell::from("apple"), Cell::from(1.5)],
                vec![Cell::from("pear"), Cell::from(2.0)],
            ],
        )
        .unwrap();
        let t = tree.table(table);
        let m = tree.map([("prices", t)]);
        tree.set_root(m).unwrap();
        let root = tree.root().unwrap();
        let r = Retriever::new().with_root_name("data");

        let p = path!["prices", "price", 1isize];
        assert_eq!(r.get(root, p.clone()).unwrap(), Found::Cell(Cell::from(2.0)));
        assert_eq!(r.render_expression(root, &p), "data[\"prices\"][\"price\"].iloc[1]");

        let cell = path!["prices", PathStep::TableCell { row: 0, col: 0 }];
        assert_eq!(r.get(root, cell.clone()).unwrap(), Found::Cell(Cell::from("apple")));
        assert_eq!(r.render_expression(root, &cell), "data[\"prices\"].iloc[0, 0]");

        let by_label = path!["prices", PathStep::Row(Label::Int(20)), "name"];
        assert_eq!(r.get(root, by_label).unwrap(), Found::Cell(Cell::from("pear")));

        let missing = path!["prices", PathStep::Column(Label::from("qty"))];
        assert!(matches!(
            r.get(root, missing),
            Err(PathError::OutOfRange { kind: NodeKind::Table, .. })
        ));
    }

    #[test]
    fn test_render_records_and_fallback() {
        let mut tree = Tree::new();
        let v = tree.scalar(3);
        let rec = tree.record("Sweep", [("gain", v), ("2nd", v)]).unwrap();
        let seq = tree.sequence([rec]);
        tree.set_root(seq).unwrap();
        let root = tree.root().unwrap();
        let r = Retriever::new();
        assert_eq!(r.render_expression(root, &path![0isize, "gain"]), "root[0].gain");
        assert_eq!(r.render_expression(root, &path![0isize, "2nd"]), "root[0][\"2nd\"]");
        assert_eq!(
            r.render_expression(root, &path![0isize, PathStep::field("gain")]),
            "root[0].gain"
        );
        assert_eq!(
            r.render_expression(root, &path![0isize, PathStep::field("2nd")]),
            "root[0][\"2nd\"]"
        );
        // replay fails at the first step; the rest is rendered generically
        assert_eq!(r.render_expression(root, &path![5isize, 1isize]), "root[5][1]");
    }
}
