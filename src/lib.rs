//! # deepfind
//!
//! Search nested, heterogeneous data trees by value or by index.
//!
//! A tree mixes maps, sequences, named records, n-dimensional flat arrays
//! and labelled tables. deepfind reports every path at which a value
//! occurs, or every place a key, position or label applies, and replays
//! those paths to fetch the values behind them. Shared references and
//! cycles are followed once, so every search terminates.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! cargo install deepfind
//! deepfind data.json --value 2
//! deepfind data.json --key price --pack-tables
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use deepfind::prelude::*;
//! use serde_json::json;
//!
//! let tree = Tree::from_json(&json!({"a": 1, "b": {"c": 2}, "c": [1, 2, 3]}));
//! let root = tree.root().unwrap();
//!
//! // Every place the key "c" applies
//! let index = PathStep::key("c");
//! let hits: Vec<_> = SearchEngine::new()
//!     .search_by_index(root, &index, &ExactComparator)
//!     .collect();
//! assert_eq!(hits.len(), 2);
//!
//! // Repeatable searches
//! let mut session = Session::new(root);
//! let result = session.find_value(Tree::from_json(&json!(2))).unwrap();
//! assert_eq!(result.paths[0].to_string(), "[\"b\"][\"c\"]");
//! ```
//!
//! ## Crate Structure
//!
//! - [`deepfind-core`](https://docs.rs/deepfind-core) - Data model, comparators, search,
//!   retrieval and sessions
//!
//! ## Features
//!
//! - **Lazy search**: results are produced on demand by iterators
//! - **Cycle safety**: each container is expanded once per search
//! - **Leaf scanning**: matches inside flat arrays and table cells or labels
//! - **Pluggable equality**: exact, tolerance-based, text or closure comparators
//! - **Expressions**: paths render as `root["b"]["c"][2]`, `.iloc[r, c]` and friends

// Re-export core types
pub use deepfind_core::{
    path,
    ApproxComparator, Comparator, ExactComparator, FnComparator, TextComparator, TextMatch,
    ArrayData, DType, FlatArray,
    Cell, Found, NodeId, NodeKind, NodeRef, Scalar, Tree, Value, View,
    Label, Series, Table,
    Path, PathStep,
    IndexMatches, SearchConfig, SearchEngine, ValueMatches,
    Retriever,
    SearchMode, SearchResult, Session, Target,
    JsonOptions,
    Error, PathError, Result,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        path,
        ApproxComparator, Comparator, ExactComparator, FnComparator, TextComparator, TextMatch,
        FlatArray, Label, Table,
        Found, NodeRef, Tree, View,
        Path, PathStep,
        SearchConfig, SearchEngine,
        Retriever,
        Session, Target, SearchMode,
        JsonOptions,
        Error, PathError, Result,
    };
}
