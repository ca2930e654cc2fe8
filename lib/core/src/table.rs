//! Labelled two-dimensional tables
//!
//! Like [`FlatArray`](crate::FlatArray), a [`Table`] is a leaf: the engine
//! scans its cells and labels but never treats it as a container of nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::{Cell, Scalar, View};
use crate::{Error, Result};

/// Row or column label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl Label {
    pub fn view(&self) -> View<'_> {
        match self {
            Label::Int(i) => View::Scalar(Scalar::Int(*i)),
            Label::Text(s) => View::Text(s),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::Text(s) => Some(s),
            Label::Int(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(i) => write!(f, "{}", i),
            Label::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

impl From<i64> for Label {
    fn from(i: i64) -> Self {
        Label::Int(i)
    }
}

/// One labelled row or column taken out of a [`Table`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: Option<Label>,
    labels: Vec<Label>,
    values: Vec<Cell>,
}

impl Series {
    pub fn new(name: Option<Label>, labels: Vec<Label>, values: Vec<Cell>) -> Result<Self> {
        if labels.len() != values.len() {
            return Err(Error::ShapeMismatch {
                expected: labels.len(),
                actual: values.len(),
            });
        }
        Ok(Self { name, labels, values })
    }

    #[inline]
    pub fn name(&self) -> Option<&Label> {
        self.name.as_ref()
    }

    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[inline]
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Positional access; negative positions count from the end
    pub fn get(&self, pos: isize) -> Option<&Cell> {
        resolve_position(pos, self.len()).and_then(|i| self.values.get(i))
    }

    /// First value carrying `label`
    pub fn get_by_label(&self, label: &Label) -> Option<&Cell> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.values.get(i))
    }
}

/// Column-major table with row (`index`) and column labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    index: Vec<Label>,
    columns: Vec<Label>,
    /// `data[col][row]`
    data: Vec<Vec<Cell>>,
}

impl Table {
    /// Build from column-major data.
    ///
    /// Every column must hold one cell per row label and column labels must
    /// be unique.
    pub fn new(index: Vec<Label>, columns: Vec<Label>, data: Vec<Vec<Cell>>) -> Result<Self> {
        if data.len() != columns.len() {
            return Err(Error::ShapeMismatch {
                expected: columns.len(),
                actual: data.len(),
            });
        }
        if let Some(bad) = data.iter().find(|col| col.len() != index.len()) {
            return Err(Error::ShapeMismatch {
                expected: index.len(),
                actual: bad.len(),
            });
        }
        for (i, label) in columns.iter().enumerate() {
            if columns[..i].contains(label) {
                return Err(Error::DuplicateLabel(label.to_string()));
            }
        }
        Ok(Self { index, columns, data })
    }

    /// Build from row-major data
    pub fn from_rows(index: Vec<Label>, columns: Vec<Label>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if rows.len() != index.len() {
            return Err(Error::ShapeMismatch {
                expected: index.len(),
                actual: rows.len(),
            });
        }
        let mut data: Vec<Vec<Cell>> = (0..columns.len())
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in rows {
            if row.len() != columns.len() {
                return Err(Error::ShapeMismatch {
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (col, cell) in row.into_iter().enumerate() {
                data[col].push(cell);
            }
        }
        Self::new(index, columns, data)
    }

    #[inline]
    pub fn index(&self) -> &[Label] {
        &self.index
    }

    #[inline]
    pub fn columns(&self) -> &[Label] {
        &self.columns
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.data.get(col).and_then(|c| c.get(row))
    }

    /// Every cell in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> + '_ {
        (0..self.nrows()).flat_map(move |row| {
            (0..self.ncols()).filter_map(move |col| self.cell(row, col).map(|c| (row, col, c)))
        })
    }

    pub fn column_position(&self, label: &Label) -> Option<usize> {
        self.columns.iter().position(|l| l == label)
    }

    pub fn row_position(&self, label: &Label) -> Option<usize> {
        self.index.iter().position(|l| l == label)
    }

    /// Column at a position, labelled by the row index
    pub fn column(&self, col: usize) -> Option<Series> {
        let values = self.data.get(col)?.clone();
        Some(Series {
            name: self.columns.get(col).cloned(),
            labels: self.index.clone(),
            values,
        })
    }

    /// Row at a position; negative positions count from the end
    pub fn row(&self, pos: isize) -> Option<Series> {
        let row = resolve_position(pos, self.nrows())?;
        let values = self
            .data
            .iter()
            .map(|col| col.get(row).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(Series {
            name: self.index.get(row).cloned(),
            labels: self.columns.clone(),
            values,
        })
    }

    pub fn column_by_label(&self, label: &Label) -> Option<Series> {
        self.column_position(label).and_then(|col| self.column(col))
    }

    /// First row carrying `label`
    pub fn row_by_label(&self, label: &Label) -> Option<Series> {
        self.row_position(label).and_then(|row| self.row(row as isize))
    }
}

/// Map a possibly negative position onto `0..len`
pub(crate) fn resolve_position(pos: isize, len: usize) -> Option<usize> {
    let idx = if pos < 0 { len as isize + pos } else { pos };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> Table {
        Table::from_rows(
            vec![Label::Int(10), Label::Int(20)],
            vec!["name".into(), "price".into()],
            vec![
                vec![Cell::from("apple"), Cell::from(1.5)],
                vec![Cell::from("pear"), Cell::from(2i64)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_is_column_major() {
        let t = prices();
        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.cell(1, 0), Some(&Cell::from("pear")));
        assert_eq!(t.cell(0, 1), Some(&Cell::from(1.5)));
        assert_eq!(t.cell(2, 0), None);
    }

    #[test]
    fn test_rejects_ragged_and_duplicate_columns() {
        let ragged = Table::new(vec![Label::Int(0)], vec!["a".into()], vec![vec![]]);
        assert!(matches!(ragged, Err(Error::ShapeMismatch { expected: 1, actual: 0 })));

        let dup = Table::new(
            vec![],
            vec!["a".into(), "a".into()],
            vec![vec![], vec![]],
        );
        assert!(matches!(dup, Err(Error::DuplicateLabel(_))));
    }

    #[test]
    fn test_row_and_column_series() {
        let t = prices();
        let price = t.column_by_label(&"price".into()).unwrap();
        assert_eq!(price.name(), Some(&Label::from("price")));
        assert_eq!(price.get_by_label(&Label::Int(20)), Some(&Cell::from(2i64)));

        let last = t.row(-1).unwrap();
        assert_eq!(last.name(), Some(&Label::Int(20)));
        assert_eq!(last.get(0), Some(&Cell::from("pear")));
        assert!(t.row(2).is_none());
        assert_eq!(t.row_by_label(&Label::Int(10)).unwrap().get(-1), Some(&Cell::from(1.5)));
    }

    #[test]
    fn test_cells_row_major() {
        let t = prices();
        let order: Vec<(usize, usize)> = t.cells().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
