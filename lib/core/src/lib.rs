//! # deepfind Core
//!
//! Core library for searching nested value trees.
//!
//! This crate provides the data model and the search algorithms:
//!
//! - [`Tree`] - Arena of nodes; maps, sequences, records, flat arrays and tables
//! - [`Path`] - Sequence of [`PathStep`]s from a root to a value
//! - [`Comparator`] - Pluggable equality (exact, approximate, text, closure)
//! - [`SearchEngine`] - Lazy by-value and by-index search, safe on cycles
//! - [`Retriever`] - Replays paths and renders them as access expressions
//! - [`Session`] - Repeatable search with a cached result
//!
//! ## Example
//!
//! ```rust
//! use deepfind_core::{path, ExactComparator, Retriever, SearchEngine, Tree};
//! use serde_json::json;
//!
//! let tree = Tree::from_json(&json!({"a": 1, "b": {"c": 2}, "c": [1, 2, 3]}));
//! let root = tree.root().unwrap();
//!
//! // Search
//! let paths: Vec<_> = SearchEngine::new()
//!     .search_by_value(root, 1, &ExactComparator)
//!     .collect();
//! assert_eq!(paths, vec![path!["a"], path!["c", 0isize]]);
//!
//! // Retrieve
//! let retriever = Retriever::new();
//! let found = retriever.get(root, paths[1].clone()).unwrap();
//! assert_eq!(found.to_json(), json!(1));
//! assert_eq!(retriever.render_expression(root, &paths[1]), "root[\"c\"][0]");
//! ```

pub mod array;
pub mod compare;
pub mod error;
pub mod json;
pub mod path;
pub mod retrieve;
pub mod search;
pub mod session;
pub mod table;
pub mod value;

pub use array::{ArrayData, ArrayItem, DType, FlatArray, IndexFault};
pub use compare::{
    elementwise, scalar_eq, structural, ApproxComparator, Comparator, ExactComparator,
    FnComparator, TextComparator, TextMatch,
};
pub use error::{Error, PathError, Result};
pub use json::{JsonOptions, CYCLE_MARKER, SHARED_MARKER};
pub use path::{Path, PathStep};
pub use retrieve::Retriever;
pub use search::{IndexMatches, SearchConfig, SearchEngine, ValueMatches};
pub use session::{SearchMode, SearchResult, Session, Target};
pub use table::{Label, Series, Table};
pub use value::{
    Cell, Found, MapNode, NodeId, NodeKind, NodeRef, RecordNode, Scalar, Tree, Value, View,
};
