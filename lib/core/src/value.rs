//! Tree representation
//!
//! A searched structure lives in a [`Tree`]: an arena of [`Value`] nodes in
//! which containers refer to their children by [`NodeId`]. Node identity is
//! the arena index, which makes shared and cyclic references explicit and
//! lets a search remember expanded containers in a plain bitset.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::array::FlatArray;
use crate::path::PathStep;
use crate::table::{Series, Table};
use crate::{Error, Result};

/// Index of a node inside its [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Numeric, boolean or null atom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Numeric value of `Int` and `Float`
    #[inline]
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(i as f64),
            Scalar::Float(x) => Some(x),
            Scalar::Null | Scalar::Bool(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

/// A table cell or array element once taken out of its leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Scalar(Scalar),
    Text(String),
}

impl Cell {
    pub fn view(&self) -> View<'_> {
        match self {
            Cell::Scalar(s) => View::Scalar(*s),
            Cell::Text(t) => View::Text(t),
        }
    }
}

impl From<Scalar> for Cell {
    fn from(s: Scalar) -> Self {
        Cell::Scalar(s)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Scalar(Scalar::Bool(b))
    }
}

impl From<i32> for Cell {
    fn from(i: i32) -> Self {
        Cell::Scalar(Scalar::from(i))
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// Insertion-ordered mapping with unique string keys
#[derive(Debug, Clone, Default)]
pub struct MapNode {
    entries: Vec<(String, NodeId)>,
    index: AHashMap<String, usize>,
}

impl MapNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, child: NodeId) -> Option<NodeId> {
        let key = key.into();
        if let Some(&pos) = self.index.get(&key) {
            let old = std::mem::replace(&mut self.entries[pos].1, child);
            return Some(old);
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, child));
        None
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).map(|&pos| self.entries[pos].1)
    }

    #[inline]
    pub fn entry_at(&self, pos: usize) -> Option<(&str, NodeId)> {
        self.entries.get(pos).map(|(k, id)| (k.as_str(), *id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.entries.iter().map(|(k, id)| (k.as_str(), *id))
    }
}

/// Named tuple: a type name plus fixed, uniquely named, ordered fields
#[derive(Debug, Clone)]
pub struct RecordNode {
    name: String,
    fields: Vec<(String, NodeId)>,
}

impl RecordNode {
    pub fn new(name: impl Into<String>, fields: Vec<(String, NodeId)>) -> Result<Self> {
        for (i, (field, _)) in fields.iter().enumerate() {
            if fields[..i].iter().any(|(f, _)| f == field) {
                return Err(Error::DuplicateField(field.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            fields,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<NodeId> {
        self.fields.iter().find(|(f, _)| f == name).map(|(_, id)| *id)
    }

    #[inline]
    pub fn field_at(&self, pos: usize) -> Option<(&str, NodeId)> {
        self.fields.get(pos).map(|(f, id)| (f.as_str(), *id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.fields.iter().map(|(f, id)| (f.as_str(), *id))
    }
}

/// Kind of a node or retrieved value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Text,
    Map,
    Sequence,
    Record,
    FlatArray,
    Table,
    Series,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Text => "text",
            NodeKind::Map => "map",
            NodeKind::Sequence => "sequence",
            NodeKind::Record => "record",
            NodeKind::FlatArray => "flat array",
            NodeKind::Table => "table",
            NodeKind::Series => "series",
        };
        f.write_str(name)
    }
}

/// One node of a [`Tree`]
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(Scalar),
    Text(String),
    Map(MapNode),
    Sequence(Vec<NodeId>),
    Record(RecordNode),
    FlatArray(FlatArray),
    Table(Table),
}

impl Value {
    pub fn kind(&self) -> NodeKind {
        match self {
            Value::Scalar(_) => NodeKind::Scalar,
            Value::Text(_) => NodeKind::Text,
            Value::Map(_) => NodeKind::Map,
            Value::Sequence(_) => NodeKind::Sequence,
            Value::Record(_) => NodeKind::Record,
            Value::FlatArray(_) => NodeKind::FlatArray,
            Value::Table(_) => NodeKind::Table,
        }
    }

    /// Map, Sequence and Record hold child nodes; everything else is a leaf
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Sequence(_) | Value::Record(_))
    }

    pub fn child_count(&self) -> usize {
        match self {
            Value::Map(m) => m.len(),
            Value::Sequence(items) => items.len(),
            Value::Record(r) => r.len(),
            _ => 0,
        }
    }

    /// The `pos`-th child in definition order together with the step reaching it
    pub fn child_at(&self, pos: usize) -> Option<(PathStep, NodeId)> {
        match self {
            Value::Map(m) => m
                .entry_at(pos)
                .map(|(k, id)| (PathStep::Key(k.to_string()), id)),
            Value::Sequence(items) => items
                .get(pos)
                .map(|id| (PathStep::Position(pos as isize), *id)),
            Value::Record(r) => r
                .field_at(pos)
                .map(|(f, id)| (PathStep::FieldName(f.to_string()), id)),
            _ => None,
        }
    }
}

/// Arena owning every node of one searched structure
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Value>,
    pub(crate) root: Option<NodeId>,
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    pub fn add(&mut self, value: Value) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(value);
        id
    }

    pub fn scalar(&mut self, value: impl Into<Scalar>) -> NodeId {
        self.add(Value::Scalar(value.into()))
    }

    pub fn text(&mut self, value: impl Into<String>) -> NodeId {
        self.add(Value::Text(value.into()))
    }

    /// Add a map; a repeated key replaces the earlier entry
    pub fn map<K, I>(&mut self, entries: I) -> NodeId
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, NodeId)>,
    {
        let mut map = MapNode::new();
        for (k, child) in entries {
            map.insert(k, child);
        }
        self.add(Value::Map(map))
    }

    pub fn sequence(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add(Value::Sequence(items.into_iter().collect()))
    }

    pub fn record<K, I>(&mut self, name: impl Into<String>, fields: I) -> Result<NodeId>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, NodeId)>,
    {
        let fields = fields.into_iter().map(|(k, id)| (k.into(), id)).collect();
        let record = RecordNode::new(name, fields)?;
        Ok(self.add(Value::Record(record)))
    }

    pub fn flat_array(&mut self, array: FlatArray) -> NodeId {
        self.add(Value::FlatArray(array))
    }

    pub fn table(&mut self, table: Table) -> NodeId {
        self.add(Value::Table(table))
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::UnknownNode(id))
        }
    }

    /// Insert into an existing map; this is how back-references are formed
    pub fn insert_entry(
        &mut self,
        map: NodeId,
        key: impl Into<String>,
        child: NodeId,
    ) -> Result<Option<NodeId>> {
        self.check(child)?;
        match self.nodes.get_mut(map.0) {
            Some(Value::Map(m)) => Ok(m.insert(key, child)),
            Some(other) => Err(Error::NotAContainer {
                id: map,
                kind: other.kind(),
            }),
            None => Err(Error::UnknownNode(map)),
        }
    }

    /// Append to an existing sequence
    pub fn push(&mut self, sequence: NodeId, child: NodeId) -> Result<()> {
        self.check(child)?;
        match self.nodes.get_mut(sequence.0) {
            Some(Value::Sequence(items)) => {
                items.push(child);
                Ok(())
            }
            Some(other) => Err(Error::NotAContainer {
                id: sequence,
                kind: other.kind(),
            }),
            None => Err(Error::UnknownNode(sequence)),
        }
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        self.root = Some(id);
        Ok(())
    }

    pub fn root(&self) -> Result<NodeRef<'_>> {
        self.root
            .and_then(|id| self.node(id))
            .ok_or(Error::EmptyTree)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        if id.0 < self.nodes.len() {
            Some(NodeRef { tree: self, id })
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Value> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed handle on one node of a tree.
///
/// Equality is identity: two handles are equal when they point at the same
/// node of the same tree.
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> NodeRef<'t> {
    #[inline]
    pub fn id(self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn tree(self) -> &'t Tree {
        self.tree
    }

    #[inline]
    pub fn value(self) -> &'t Value {
        // ids handed out by `Tree::node` are always in bounds and nodes are never removed
        &self.tree.nodes[self.id.0]
    }

    #[inline]
    pub fn kind(self) -> NodeKind {
        self.value().kind()
    }

    /// Child node handle, `None` when the id is dangling
    #[inline]
    pub fn child(self, id: NodeId) -> Option<NodeRef<'t>> {
        self.tree.node(id)
    }

    pub fn view(self) -> View<'t> {
        match self.value() {
            Value::Scalar(s) => View::Scalar(*s),
            Value::Text(t) => View::Text(t),
            Value::Map(_) => View::Map(self),
            Value::Sequence(_) => View::Sequence(self),
            Value::Record(_) => View::Record(self),
            Value::FlatArray(a) => View::Array(a),
            Value::Table(t) => View::Table(t),
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({} {})", self.id, self.kind())
    }
}

/// Normalised, borrowed form of anything a comparator can be asked about
#[derive(Debug, Clone, Copy)]
pub enum View<'a> {
    Scalar(Scalar),
    Text(&'a str),
    Map(NodeRef<'a>),
    Sequence(NodeRef<'a>),
    Record(NodeRef<'a>),
    Array(&'a FlatArray),
    Table(&'a Table),
    Series(&'a Series),
}

impl View<'_> {
    pub fn kind(&self) -> NodeKind {
        match self {
            View::Scalar(_) => NodeKind::Scalar,
            View::Text(_) => NodeKind::Text,
            View::Map(_) => NodeKind::Map,
            View::Sequence(_) => NodeKind::Sequence,
            View::Record(_) => NodeKind::Record,
            View::Array(_) => NodeKind::FlatArray,
            View::Table(_) => NodeKind::Table,
            View::Series(_) => NodeKind::Series,
        }
    }

    /// Scalars and text; the targets leaf scans understand
    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self, View::Scalar(_) | View::Text(_))
    }
}

impl<'a> From<NodeRef<'a>> for View<'a> {
    fn from(node: NodeRef<'a>) -> Self {
        node.view()
    }
}

impl From<Scalar> for View<'_> {
    fn from(s: Scalar) -> Self {
        View::Scalar(s)
    }
}

impl From<bool> for View<'_> {
    fn from(b: bool) -> Self {
        View::Scalar(Scalar::Bool(b))
    }
}

impl From<i32> for View<'_> {
    fn from(i: i32) -> Self {
        View::Scalar(Scalar::from(i))
    }
}

impl From<i64> for View<'_> {
    fn from(i: i64) -> Self {
        View::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for View<'_> {
    fn from(x: f64) -> Self {
        View::Scalar(Scalar::Float(x))
    }
}

impl<'a> From<&'a str> for View<'a> {
    fn from(s: &'a str) -> Self {
        View::Text(s)
    }
}

impl<'a> From<&'a Cell> for View<'a> {
    fn from(cell: &'a Cell) -> Self {
        cell.view()
    }
}

impl<'a> From<&'a FlatArray> for View<'a> {
    fn from(a: &'a FlatArray) -> Self {
        View::Array(a)
    }
}

impl<'a> From<&'a Table> for View<'a> {
    fn from(t: &'a Table) -> Self {
        View::Table(t)
    }
}

impl<'a> From<&'a Series> for View<'a> {
    fn from(s: &'a Series) -> Self {
        View::Series(s)
    }
}

/// Value reached through a path.
///
/// Containers and whole leaves are returned as tree handles; elements and
/// slices carved out of a leaf are returned owned.
#[derive(Debug, Clone, PartialEq)]
pub enum Found<'t> {
    Node(NodeRef<'t>),
    Cell(Cell),
    Array(FlatArray),
    Series(Series),
}

impl<'t> Found<'t> {
    pub fn view(&self) -> View<'_> {
        match self {
            Found::Node(n) => n.view(),
            Found::Cell(c) => c.view(),
            Found::Array(a) => View::Array(a),
            Found::Series(s) => View::Series(s),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Found::Node(n) => n.kind(),
            Found::Cell(Cell::Scalar(_)) => NodeKind::Scalar,
            Found::Cell(Cell::Text(_)) => NodeKind::Text,
            Found::Array(_) => NodeKind::FlatArray,
            Found::Series(_) => NodeKind::Series,
        }
    }

    pub fn as_node(&self) -> Option<NodeRef<'t>> {
        match self {
            Found::Node(n) => Some(*n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_order_and_replaces() {
        let mut tree = Tree::new();
        let one = tree.scalar(1);
        let two = tree.scalar(2);
        let three = tree.scalar(3);
        let m = tree.map([("b", one), ("a", two), ("b", three)]);
        let Value::Map(map) = tree.get(m).unwrap() else {
            panic!("expected map");
        };
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(map.get("b"), Some(three));
    }

    #[test]
    fn test_record_rejects_duplicate_fields() {
        let mut tree = Tree::new();
        let x = tree.scalar(1);
        let err = tree.record("Point", [("x", x), ("x", x)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateField(f) if f == "x"));
    }

    #[test]
    fn test_child_at_steps() {
        let mut tree = Tree::new();
        let a = tree.text("a");
        let seq = tree.sequence([a, a]);
        let rec = tree.record("R", [("f", seq)]).unwrap();
        assert_eq!(tree.get(seq).unwrap().child_at(1), Some((PathStep::Position(1), a)));
        assert_eq!(
            tree.get(rec).unwrap().child_at(0),
            Some((PathStep::FieldName("f".into()), seq))
        );
        assert_eq!(tree.get(a).unwrap().child_at(0), None);
    }

    #[test]
    fn test_back_reference_and_errors() {
        let mut tree = Tree::new();
        let root = tree.map(Vec::<(String, NodeId)>::new());
        tree.insert_entry(root, "self", root).unwrap();
        tree.set_root(root).unwrap();
        let r = tree.root().unwrap();
        assert_eq!(r.child(NodeId(0)), Some(r));

        let leaf = tree.scalar(true);
        assert!(matches!(
            tree.push(leaf, root),
            Err(Error::NotAContainer { kind: NodeKind::Scalar, .. })
        ));
        assert!(matches!(tree.set_root(NodeId(99)), Err(Error::UnknownNode(_))));
        assert!(matches!(Tree::new().root(), Err(Error::EmptyTree)));
    }

    #[test]
    fn test_node_identity() {
        let mut tree = Tree::new();
        let a = tree.scalar(1);
        let b = tree.scalar(1);
        assert_eq!(tree.node(a), tree.node(a));
        assert_ne!(tree.node(a), tree.node(b));
    }
}
