//! Repeatable searches with a cached result
//!
//! A [`Session`] pins a root, a comparator and an engine configuration, and
//! remembers the last search so it can be re-run or its paths replayed
//! against another tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::compare::{Comparator, ExactComparator};
use crate::error::PathError;
use crate::path::{Path, PathStep};
use crate::retrieve::Retriever;
use crate::search::SearchEngine;
use crate::value::{Found, NodeRef, Tree};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    ByValue,
    ByIndex,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::ByValue => write!(f, "by value"),
            SearchMode::ByIndex => write!(f, "by index"),
        }
    }
}

/// What a session search looks for
#[derive(Debug, Clone)]
pub enum Target {
    /// Paths whose value equals the root of this tree
    Value(Tree),
    /// Every place this step applies
    Index(PathStep),
}

impl Target {
    pub fn mode(&self) -> SearchMode {
        match self {
            Target::Value(_) => SearchMode::ByValue,
            Target::Index(_) => SearchMode::ByIndex,
        }
    }
}

impl From<PathStep> for Target {
    fn from(step: PathStep) -> Self {
        Target::Index(step)
    }
}

impl From<Tree> for Target {
    fn from(tree: Tree) -> Self {
        Target::Value(tree)
    }
}

/// Outcome of one session search; `paths[i]` leads to `values[i]`
#[derive(Debug, Clone)]
pub struct SearchResult<'t> {
    pub mode: SearchMode,
    pub target: Target,
    pub paths: Vec<Path>,
    pub values: Vec<Found<'t>>,
}

impl SearchResult<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub struct Session<'t, C = ExactComparator> {
    root: NodeRef<'t>,
    engine: SearchEngine,
    retriever: Retriever,
    comparator: C,
    last: Option<SearchResult<'t>>,
}

impl<'t> Session<'t> {
    pub fn new(root: NodeRef<'t>) -> Self {
        Self::with_comparator(root, ExactComparator)
    }
}

impl<'t, C: Comparator> Session<'t, C> {
    pub fn with_comparator(root: NodeRef<'t>, comparator: C) -> Self {
        Self {
            root,
            engine: SearchEngine::new(),
            retriever: Retriever::new(),
            comparator,
            last: None,
        }
    }

    pub fn with_engine(mut self, engine: SearchEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = retriever;
        self
    }

    #[inline]
    pub fn root(&self) -> NodeRef<'t> {
        self.root
    }

    #[inline]
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Run a search and cache its result.
    ///
    /// `None` repeats the previous search verbatim.
    pub fn find(&mut self, target: Option<Target>) -> Result<&SearchResult<'t>> {
        let target = match target {
            Some(target) => target,
            None => self
                .last
                .as_ref()
                .map(|last| last.target.clone())
                .ok_or(Error::NoPreviousSearch)?,
        };
        let result = self.run(target)?;
        debug!(mode = %result.mode, matches = result.len(), "session search complete");
        Ok(self.last.insert(result))
    }

    pub fn find_value(&mut self, target: Tree) -> Result<&SearchResult<'t>> {
        self.find(Some(Target::Value(target)))
    }

    pub fn find_index(&mut self, index: PathStep) -> Result<&SearchResult<'t>> {
        self.find(Some(Target::Index(index)))
    }

    fn run(&self, target: Target) -> Result<SearchResult<'t>> {
        let (paths, values) = match &target {
            Target::Value(tree) => {
                let needle = tree.root()?;
                self.resolve(self.engine.search_by_value(self.root, needle, &self.comparator))?
            }
            Target::Index(step) => self
                .engine
                .search_by_index(self.root, step, &self.comparator)
                .unzip(),
        };
        Ok(SearchResult {
            mode: target.mode(),
            target,
            paths,
            values,
        })
    }

    /// Replay each path from the root; the first failing path is an error
    fn resolve<I>(&self, paths: I) -> Result<(Vec<Path>, Vec<Found<'t>>)>
    where
        I: IntoIterator<Item = Path>,
    {
        let mut resolved = Vec::new();
        let mut values = Vec::new();
        for path in paths {
            values.push(self.retriever.get(self.root, path.clone())?);
            resolved.push(path);
        }
        Ok((resolved, values))
    }

    pub fn last(&self) -> Option<&SearchResult<'t>> {
        self.last.as_ref()
    }

    pub fn paths(&self) -> &[Path] {
        self.last.as_ref().map(|r| r.paths.as_slice()).unwrap_or(&[])
    }

    pub fn values(&self) -> &[Found<'t>] {
        self.last.as_ref().map(|r| r.values.as_slice()).unwrap_or(&[])
    }

    pub fn mode(&self) -> Option<SearchMode> {
        self.last.as_ref().map(|r| r.mode)
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Fetch the cached paths from a different root, one result per path
    pub fn replay_on<'u>(
        &self,
        other: NodeRef<'u>,
    ) -> Result<Vec<std::result::Result<Found<'u>, PathError>>> {
        let last = self.last.as_ref().ok_or(Error::NoPreviousSearch)?;
        Ok(self.retriever.get_many(other, last.paths.iter().cloned()))
    }
}
