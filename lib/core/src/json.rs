//! Conversion between `serde_json` documents and [`Tree`]s

use ahash::AHashSet;
use serde_json::{Map, Number, Value as Json};

use crate::array::{ArrayData, FlatArray};
use crate::table::{Label, Series, Table};
use crate::value::{Cell, Found, NodeId, NodeRef, Scalar, Tree, Value};
use crate::Result;

/// Placeholder emitted for a back-reference to a node still being rendered
pub const CYCLE_MARKER: &str = "<cycle>";

/// Placeholder emitted for a container already rendered at an earlier path
pub const SHARED_MARKER: &str = "<shared>";

/// How JSON documents are mapped onto leaf kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Pack homogeneous numeric or bool lists, nested rectangular lists
    /// included, into flat arrays
    pub pack_arrays: bool,
    /// Turn `{"columns", "index", "data"}` objects into tables
    pub pack_tables: bool,
}

impl Tree {
    /// Build a tree of maps, sequences and atoms
    pub fn from_json(value: &Json) -> Tree {
        Self::from_json_with(value, JsonOptions::default())
    }

    pub fn from_json_with(value: &Json, options: JsonOptions) -> Tree {
        let mut builder = Builder {
            tree: Tree::new(),
            options,
        };
        let root = builder.build(value);
        let mut tree = builder.tree;
        tree.root = Some(root);
        tree
    }

    pub fn from_json_str(s: &str) -> Result<Tree> {
        let value: Json = serde_json::from_str(s)?;
        Ok(Self::from_json(&value))
    }
}

struct Builder {
    tree: Tree,
    options: JsonOptions,
}

impl Builder {
    fn build(&mut self, value: &Json) -> NodeId {
        match value {
            Json::Null => self.tree.scalar(Scalar::Null),
            Json::Bool(b) => self.tree.scalar(*b),
            Json::Number(n) => self.tree.scalar(number(n)),
            Json::String(s) => self.tree.text(s.as_str()),
            Json::Array(items) => {
                if self.options.pack_arrays {
                    if let Some(array) = pack_array(items) {
                        return self.tree.flat_array(array);
                    }
                }
                let children: Vec<NodeId> = items.iter().map(|item| self.build(item)).collect();
                self.tree.sequence(children)
            }
            Json::Object(obj) => {
                if self.options.pack_tables {
                    if let Some(table) = pack_table(obj) {
                        return self.tree.table(table);
                    }
                }
                let entries: Vec<(&str, NodeId)> = obj
                    .iter()
                    .map(|(k, v)| (k.as_str(), self.build(v)))
                    .collect();
                self.tree.map(entries)
            }
        }
    }
}

fn number(n: &Number) -> Scalar {
    match n.as_i64() {
        Some(i) => Scalar::Int(i),
        None => n.as_f64().map(Scalar::Float).unwrap_or(Scalar::Null),
    }
}

fn pack_array(items: &[Json]) -> Option<FlatArray> {
    let mut shape = Vec::new();
    let mut level = items;
    loop {
        shape.push(level.len());
        match level.first() {
            Some(Json::Array(inner)) => level = inner,
            _ => break,
        }
    }
    if shape.contains(&0) {
        return None;
    }

    let mut leaves = Vec::with_capacity(shape.iter().product());
    collect_leaves(items, &shape, &mut leaves)?;

    let data = if leaves.iter().all(|v| v.is_boolean()) {
        ArrayData::Bool(leaves.iter().filter_map(|v| v.as_bool()).collect())
    } else if leaves.iter().all(|v| v.is_i64()) {
        ArrayData::Int(leaves.iter().filter_map(|v| v.as_i64()).collect())
    } else if leaves.iter().all(|v| v.is_number()) {
        ArrayData::Float(leaves.iter().filter_map(|v| v.as_f64()).collect())
    } else {
        return None;
    };
    FlatArray::new(shape, data).ok()
}

/// Flatten `items` row-major, failing on ragged or mixed nesting
fn collect_leaves<'a>(items: &'a [Json], shape: &[usize], out: &mut Vec<&'a Json>) -> Option<()> {
    let (&len, rest) = shape.split_first()?;
    if items.len() != len {
        return None;
    }
    for item in items {
        match item {
            Json::Array(inner) if !rest.is_empty() => collect_leaves(inner, rest, out)?,
            Json::Array(_) => return None,
            _ if !rest.is_empty() => return None,
            leaf => out.push(leaf),
        }
    }
    Some(())
}

fn pack_table(obj: &Map<String, Json>) -> Option<Table> {
    if obj
        .keys()
        .any(|k| !matches!(k.as_str(), "columns" | "index" | "data"))
    {
        return None;
    }
    let columns = obj
        .get("columns")?
        .as_array()?
        .iter()
        .map(label)
        .collect::<Option<Vec<_>>>()?;
    let data = obj.get("data")?.as_array()?;
    let index = match obj.get("index") {
        Some(ix) => ix.as_array()?.iter().map(label).collect::<Option<Vec<_>>>()?,
        None => (0..data.len() as i64).map(Label::Int).collect(),
    };
    let rows = data
        .iter()
        .map(|row| row.as_array()?.iter().map(cell).collect::<Option<Vec<_>>>())
        .collect::<Option<Vec<_>>>()?;
    Table::from_rows(index, columns, rows).ok()
}

fn label(value: &Json) -> Option<Label> {
    match value {
        Json::String(s) => Some(Label::Text(s.clone())),
        Json::Number(n) => n.as_i64().map(Label::Int),
        _ => None,
    }
}

fn cell(value: &Json) -> Option<Cell> {
    match value {
        Json::Null => Some(Cell::Scalar(Scalar::Null)),
        Json::Bool(b) => Some(Cell::from(*b)),
        Json::Number(n) => Some(Cell::Scalar(number(n))),
        Json::String(s) => Some(Cell::Text(s.clone())),
        _ => None,
    }
}

fn scalar_json(s: Scalar) -> Json {
    match s {
        Scalar::Null => Json::Null,
        Scalar::Bool(b) => Json::Bool(b),
        Scalar::Int(i) => Json::from(i),
        Scalar::Float(x) => Number::from_f64(x).map(Json::Number).unwrap_or(Json::Null),
    }
}

fn cell_json(cell: &Cell) -> Json {
    match cell {
        Cell::Scalar(s) => scalar_json(*s),
        Cell::Text(t) => Json::String(t.clone()),
    }
}

fn label_json(label: &Label) -> Json {
    match label {
        Label::Int(i) => Json::from(*i),
        Label::Text(s) => Json::String(s.clone()),
    }
}

fn array_json(array: &FlatArray) -> Json {
    fn nest(shape: &[usize], flat: &mut impl Iterator<Item = Json>) -> Json {
        match shape.split_first() {
            None => flat.next().unwrap_or(Json::Null),
            Some((&len, rest)) => Json::Array((0..len).map(|_| nest(rest, flat)).collect()),
        }
    }
    let mut flat = array.iter().map(scalar_json);
    nest(array.shape(), &mut flat)
}

fn table_json(table: &Table) -> Json {
    let rows: Vec<Json> = (0..table.nrows())
        .map(|row| {
            Json::Array(
                (0..table.ncols())
                    .filter_map(|col| table.cell(row, col))
                    .map(cell_json)
                    .collect(),
            )
        })
        .collect();
    let mut obj = Map::new();
    obj.insert("columns".into(), table.columns().iter().map(label_json).collect());
    obj.insert("index".into(), table.index().iter().map(label_json).collect());
    obj.insert("data".into(), Json::Array(rows));
    Json::Object(obj)
}

fn series_json(series: &Series) -> Json {
    let mut obj = Map::new();
    if let Some(name) = series.name() {
        obj.insert("name".into(), label_json(name));
    }
    obj.insert("index".into(), series.labels().iter().map(label_json).collect());
    obj.insert("data".into(), series.values().iter().map(cell_json).collect());
    Json::Object(obj)
}

/// Containers seen by one `to_json` call
#[derive(Default)]
struct Rendered {
    on_path: AHashSet<NodeId>,
    done: AHashSet<NodeId>,
}

fn node_json(node: NodeRef<'_>, seen: &mut Rendered) -> Json {
    let value = node.value();
    match value {
        Value::Scalar(s) => return scalar_json(*s),
        Value::Text(t) => return Json::String(t.clone()),
        Value::FlatArray(a) => return array_json(a),
        Value::Table(t) => return table_json(t),
        Value::Map(_) | Value::Sequence(_) | Value::Record(_) => {}
    }
    if seen.on_path.contains(&node.id()) {
        return Json::String(CYCLE_MARKER.to_string());
    }
    if !seen.done.insert(node.id()) {
        return Json::String(SHARED_MARKER.to_string());
    }
    seen.on_path.insert(node.id());
    let mut child = |id: NodeId| {
        node.child(id)
            .map(|c| node_json(c, seen))
            .unwrap_or(Json::Null)
    };
    let json = match value {
        Value::Map(m) => Json::Object(m.iter().map(|(k, id)| (k.to_string(), child(id))).collect()),
        Value::Record(r) => {
            Json::Object(r.iter().map(|(f, id)| (f.to_string(), child(id))).collect())
        }
        Value::Sequence(items) => Json::Array(items.iter().map(|&id| child(id)).collect()),
        _ => Json::Null,
    };
    seen.on_path.remove(&node.id());
    json
}

impl NodeRef<'_> {
    /// Render the subtree as JSON; records become objects of their fields.
    ///
    /// Each container is written out once, at the first path that reaches it.
    /// Back-references to an enclosing node become [`CYCLE_MARKER`] and later
    /// aliases of an already written container become [`SHARED_MARKER`].
    pub fn to_json(self) -> Json {
        node_json(self, &mut Rendered::default())
    }
}

impl Found<'_> {
    pub fn to_json(&self) -> Json {
        match self {
            Found::Node(node) => node.to_json(),
            Found::Cell(c) => cell_json(c),
            Found::Array(a) => array_json(a),
            Found::Series(s) => series_json(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NodeKind;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_order_and_number_kinds() {
        let tree = Tree::from_json(&json!({"z": 1, "a": 1.5, "m": [true, null, "s"]}));
        let root = tree.root().unwrap();
        let Value::Map(map) = root.value() else {
            panic!("expected map");
        };
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert!(matches!(tree.get(map.get("z").unwrap()), Some(Value::Scalar(Scalar::Int(1)))));
        assert!(matches!(
            tree.get(map.get("a").unwrap()),
            Some(Value::Scalar(Scalar::Float(x))) if *x == 1.5
        ));
        assert_eq!(root.to_json(), json!({"z": 1, "a": 1.5, "m": [true, null, "s"]}));
    }

    #[test]
    fn test_pack_arrays() {
        let options = JsonOptions {
            pack_arrays: true,
            ..JsonOptions::default()
        };
        let tree = Tree::from_json_with(
            &json!({
                "grid": [[1, 2], [3, 4]],
                "ragged": [[1], [2, 3]],
                "mixed": [1, "x"],
                "empty": []
            }),
            options,
        );
        let root = tree.root().unwrap();
        let Value::Map(map) = root.value() else {
            panic!("expected map");
        };
        let kind = |key: &str| tree.get(map.get(key).unwrap()).unwrap().kind();

        let Some(Value::FlatArray(grid)) = tree.get(map.get("grid").unwrap()) else {
            panic!("expected flat array");
        };
        assert_eq!(grid.shape(), &[2, 2]);
        assert_eq!(grid.dtype(), crate::DType::Int64);
        assert_eq!(kind("ragged"), NodeKind::Sequence);
        assert_eq!(kind("mixed"), NodeKind::Sequence);
        assert_eq!(kind("empty"), NodeKind::Sequence);
        assert_eq!(root.to_json()["grid"], json!([[1, 2], [3, 4]]));
    }

    #[test]
    fn test_pack_tables() {
        let options = JsonOptions {
            pack_tables: true,
            ..JsonOptions::default()
        };
        let doc = json!({
            "columns": ["name", "price"],
            "index": [10, 20],
            "data": [["apple", 1.5], ["pear", 2.0]]
        });
        let tree = Tree::from_json_with(&json!({"prices": doc}), options);
        let root = tree.root().unwrap();
        let Value::Map(map) = root.value() else {
            panic!("expected map");
        };
        let Some(Value::Table(table)) = tree.get(map.get("prices").unwrap()) else {
            panic!("expected table");
        };
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(root.to_json()["prices"], doc);

        let not_a_table =
            Tree::from_json_with(&json!({"columns": ["a"], "data": [[1, 2]]}), options);
        assert_eq!(not_a_table.root().unwrap().kind(), NodeKind::Map);
    }

    #[test]
    fn test_cycle_renders_marker() {
        let mut tree = Tree::new();
        let one = tree.scalar(1);
        let m = tree.map([("a", one)]);
        tree.insert_entry(m, "me", m).unwrap();
        tree.set_root(m).unwrap();
        assert_eq!(tree.root().unwrap().to_json(), json!({"a": 1, "me": "<cycle>"}));
    }

    #[test]
    fn test_shared_node_is_written_once() {
        let mut tree = Tree::new();
        let one = tree.scalar(1);
        let inner = tree.sequence([one]);
        let root = tree.map([("x", inner), ("y", inner), ("z", one)]);
        tree.set_root(root).unwrap();
        assert_eq!(
            tree.root().unwrap().to_json(),
            json!({"x": [1], "y": "<shared>", "z": 1})
        );
    }

    #[test]
    fn test_deep_shared_tree_stays_linear() {
        let mut tree = Tree::new();
        let mut cur = tree.scalar(0);
        for _ in 0..64 {
            cur = tree.sequence([cur, cur]);
        }
        tree.set_root(cur).unwrap();
        let rendered = tree.root().unwrap().to_json().to_string();
        assert!(rendered.len() < 64 * 32);
        assert!(rendered.ends_with(&format!("0,0]{}", ",\"<shared>\"]".repeat(63))));
    }

    #[test]
    fn test_from_json_str_reports_errors() {
        assert!(matches!(Tree::from_json_str("{\"a\": "), Err(crate::Error::Json(_))));
        let tree = Tree::from_json_str("[1, 2]").unwrap();
        assert_eq!(tree.root().unwrap().kind(), NodeKind::Sequence);
    }
}
