//! Depth-first search over a [`Tree`]
//!
//! Both search modes share one pre-order traversal: children are visited in
//! definition order, and every container is expanded at most once per
//! search, at the first path that reaches it. Shared references therefore
//! report their nested matches once, and cycles terminate.
//!
//! Searches are lazy. The returned iterators own all traversal state and
//! release it when dropped.

use ahash::AHashSet;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::trace;

use crate::array::FlatArray;
use crate::compare::Comparator;
use crate::path::{Path, PathStep};
use crate::retrieve::step_into;
use crate::table::{resolve_position, Label, Table};
use crate::value::{Found, NodeId, NodeRef, Tree, Value, View};

/// Bitset over arena indices recording which containers were expanded
#[derive(Debug, Clone)]
pub(crate) struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    pub(crate) fn new(capacity: usize) -> Self {
        let num_words = (capacity + 63) / 64;
        Self {
            bits: vec![0; num_words],
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, capacity: usize) {
        let num_words = (capacity + 63) / 64;
        if num_words > self.bits.len() {
            self.bits.resize(num_words, 0);
        }
    }

    /// Returns `true` when `id` was not yet present
    #[inline]
    pub(crate) fn insert(&mut self, id: NodeId) -> bool {
        let idx = id.index();
        let word_idx = idx / 64;
        let mask = 1u64 << (idx % 64);

        if word_idx >= self.bits.len() {
            self.ensure_capacity(idx + 1);
        }

        let word = &mut self.bits[word_idx];
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }

    #[inline]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        let idx = id.index();
        self.bits
            .get(idx / 64)
            .map(|word| word & (1u64 << (idx % 64)) != 0)
            .unwrap_or(false)
    }
}

/// Search tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Also compare atom targets against table row and column labels
    pub match_table_labels: bool,
    /// Containers are only expanded while the current path is shorter than this.
    /// `Some(0)` inspects the root's direct children only.
    pub max_depth: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_table_labels: true,
            max_depth: None,
        }
    }
}

/// One child handed out by [`Walk::next_child`]
struct Child<'t> {
    parent: &'t Value,
    pos: usize,
    step: PathStep,
    node: NodeRef<'t>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    next: usize,
}

/// Pre-order walk over containers shared by both search modes
#[derive(Debug, Clone)]
struct Walk {
    stack: Vec<Frame>,
    /// Steps leading to the container on top of `stack`
    frontier: Vec<PathStep>,
    visited: VisitedSet,
    max_depth: Option<usize>,
}

impl Walk {
    fn new(root: NodeRef<'_>, max_depth: Option<usize>) -> Self {
        let mut walk = Self {
            stack: Vec::new(),
            frontier: Vec::new(),
            visited: VisitedSet::new(root.tree().len()),
            max_depth,
        };
        if root.value().is_container() {
            walk.visited.insert(root.id());
            walk.stack.push(Frame {
                node: root.id(),
                next: 0,
            });
        }
        walk
    }

    /// Next child of the innermost open container, closing exhausted ones
    fn next_child<'t>(&mut self, tree: &'t Tree) -> Option<Child<'t>> {
        loop {
            let frame = self.stack.last_mut()?;
            let parent = tree.get(frame.node);
            let child = parent.and_then(|v| v.child_at(frame.next));
            match (parent, child) {
                (Some(parent), Some((step, id))) => {
                    let pos = frame.next;
                    frame.next += 1;
                    if let Some(node) = tree.node(id) {
                        return Some(Child {
                            parent,
                            pos,
                            step,
                            node,
                        });
                    }
                }
                _ => {
                    self.stack.pop();
                    self.frontier.pop();
                }
            }
        }
    }

    /// Open `child` for expansion unless it is no container, too deep, or
    /// already expanded
    fn descend(&mut self, step: PathStep, child: NodeRef<'_>) -> bool {
        if !child.value().is_container() {
            return false;
        }
        if let Some(max) = self.max_depth {
            if self.frontier.len() >= max {
                return false;
            }
        }
        if self.visited.contains(child.id()) {
            trace!(node = %child.id(), "container already expanded, skipping");
            return false;
        }
        self.visited.insert(child.id());
        self.frontier.push(step);
        self.stack.push(Frame {
            node: child.id(),
            next: 0,
        });
        true
    }

    fn prefix(&self, step: PathStep) -> Path {
        let mut steps = Vec::with_capacity(self.frontier.len() + 1);
        steps.extend_from_slice(&self.frontier);
        steps.push(step);
        Path::new(steps)
    }
}

/// Stateless search entry point
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchEngine {
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Every path below `root` whose value compares equal to `target`.
    ///
    /// The root itself is never reported. Matches inside flat arrays end in
    /// [`PathStep::ArrayFlatIndex`]; matches inside tables end in
    /// [`PathStep::TableCell`], [`PathStep::Row`] or [`PathStep::Column`].
    pub fn search_by_value<'t, 'q, C>(
        &self,
        root: NodeRef<'t>,
        target: impl Into<View<'q>>,
        cmp: &'q C,
    ) -> ValueMatches<'t, 'q, C>
    where
        C: Comparator + ?Sized,
    {
        let mut matches = ValueMatches {
            tree: root.tree(),
            target: target.into(),
            cmp,
            config: self.config,
            walk: Walk::new(root, self.config.max_depth),
            pending: VecDeque::new(),
        };
        matches.scan_leaf(root, Path::root());
        matches
    }

    /// Every `(path, value)` obtained by applying `index` to each compatible
    /// node of the tree, including the root.
    ///
    /// Keys and labels are matched through `cmp`, so the reported path holds
    /// the key that actually matched.
    pub fn search_by_index<'t, 'q, C>(
        &self,
        root: NodeRef<'t>,
        index: &'q PathStep,
        cmp: &'q C,
    ) -> IndexMatches<'t, 'q, C>
    where
        C: Comparator + ?Sized,
    {
        let mut matches = IndexMatches {
            tree: root.tree(),
            index,
            cmp,
            walk: Walk::new(root, self.config.max_depth),
            pending: VecDeque::new(),
        };
        matches.lookup(root, &Path::root());
        matches
    }

    /// Independent by-value searches for several targets, run in parallel.
    ///
    /// Results are returned in target order.
    pub fn par_search_by_value<C>(
        &self,
        root: NodeRef<'_>,
        targets: &[View<'_>],
        cmp: &C,
    ) -> Vec<Vec<Path>>
    where
        C: Comparator + Sync + ?Sized,
    {
        targets
            .par_iter()
            .map(|target| self.search_by_value(root, *target, cmp).collect())
            .collect()
    }
}

/// Lazy result of [`SearchEngine::search_by_value`]
pub struct ValueMatches<'t, 'q, C: ?Sized> {
    tree: &'t Tree,
    target: View<'q>,
    cmp: &'q C,
    config: SearchConfig,
    walk: Walk,
    pending: VecDeque<Path>,
}

impl<'t, 'q, C: Comparator + ?Sized> ValueMatches<'t, 'q, C> {
    /// Queue matches found inside a flat array or table; other nodes are ignored
    fn scan_leaf(&mut self, node: NodeRef<'t>, prefix: Path) {
        match node.value() {
            Value::FlatArray(array) => self.scan_array(array, &prefix),
            Value::Table(table) => self.scan_table(table, &prefix),
            _ => {}
        }
    }

    fn scan_array(&mut self, array: &FlatArray, prefix: &Path) {
        let View::Scalar(target) = self.target else {
            return;
        };
        let cmp = self.cmp;
        for coords in array.positions(|e| cmp.compare(View::Scalar(e), View::Scalar(target))) {
            self.pending
                .push_back(prefix.child(PathStep::ArrayFlatIndex(coords)));
        }
    }

    fn scan_table(&mut self, table: &Table, prefix: &Path) {
        if !self.target.is_atom() {
            return;
        }
        for (row, col, cell) in table.cells() {
            if self.cmp.compare(cell.view(), self.target) {
                self.pending
                    .push_back(prefix.child(PathStep::TableCell { row, col }));
            }
        }
        if !self.config.match_table_labels {
            return;
        }
        for label in distinct(table.index()) {
            if self.cmp.compare(label.view(), self.target) {
                self.pending.push_back(prefix.child(PathStep::Row(label.clone())));
            }
        }
        for label in table.columns() {
            if self.cmp.compare(label.view(), self.target) {
                self.pending
                    .push_back(prefix.child(PathStep::Column(label.clone())));
            }
        }
    }
}

impl<C: Comparator + ?Sized> Iterator for ValueMatches<'_, '_, C> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Some(path);
            }
            let Child { step, node: child, .. } = self.walk.next_child(self.tree)?;

            if self.cmp.compare(child.view(), self.target) {
                self.pending.push_back(self.walk.prefix(step.clone()));
            }
            if child.value().is_container() {
                self.walk.descend(step, child);
            } else {
                let prefix = self.walk.prefix(step);
                self.scan_leaf(child, prefix);
            }
        }
    }
}

impl<C: Comparator + ?Sized> FusedIterator for ValueMatches<'_, '_, C> {}

/// Lazy result of [`SearchEngine::search_by_index`]
pub struct IndexMatches<'t, 'q, C: ?Sized> {
    tree: &'t Tree,
    index: &'q PathStep,
    cmp: &'q C,
    walk: Walk,
    pending: VecDeque<(Path, Found<'t>)>,
}

impl<'t, 'q, C: Comparator + ?Sized> IndexMatches<'t, 'q, C> {
    /// The step under which `index` selects the child at `pos` of `parent`
    fn selects(&self, parent: &Value, pos: usize, step: &PathStep) -> Option<PathStep> {
        match (parent, self.index, step) {
            (Value::Map(_), PathStep::Key(key), PathStep::Key(actual)) => {
                self.cmp.texts(actual, key).then(|| step.clone())
            }
            (Value::Record(_), PathStep::Key(key), PathStep::FieldName(actual)) => {
                self.cmp.texts(actual, key).then(|| PathStep::key(actual.as_str()))
            }
            (Value::Record(_), PathStep::FieldName(name), PathStep::FieldName(actual)) => {
                self.cmp.texts(actual, name).then(|| step.clone())
            }
            (Value::Record(_) | Value::Sequence(_), PathStep::Position(i), _) => {
                let len = parent.child_count();
                (resolve_position(*i, len) == Some(pos)).then(|| self.index.clone())
            }
            _ => None,
        }
    }

    /// Queue every way `index` applies to a flat array or table leaf
    fn lookup(&mut self, node: NodeRef<'t>, base: &Path) {
        let cmp = self.cmp;
        let hits: Vec<(PathStep, Found<'t>)> = match (node.value(), self.index) {
            (Value::Table(table), PathStep::Key(key)) => table
                .columns()
                .iter()
                .filter_map(|label| {
                    let text = label.as_str()?;
                    if !cmp.texts(text, key) {
                        return None;
                    }
                    table
                        .column_by_label(label)
                        .map(|col| (PathStep::key(text), Found::Series(col)))
                })
                .collect(),
            (Value::Table(table), PathStep::Column(wanted)) => table
                .columns()
                .iter()
                .filter(|label| cmp.compare(label.view(), wanted.view()))
                .filter_map(|label| {
                    table
                        .column_by_label(label)
                        .map(|col| (PathStep::Column(label.clone()), Found::Series(col)))
                })
                .collect(),
            (Value::Table(table), PathStep::Row(wanted)) => distinct(table.index())
                .filter(|label| cmp.compare(label.view(), wanted.view()))
                .filter_map(|label| {
                    table
                        .row_by_label(label)
                        .map(|row| (PathStep::Row(label.clone()), Found::Series(row)))
                })
                .collect(),
            (Value::FlatArray(_) | Value::Table(_), _) => {
                match step_into(&Found::Node(node), self.index) {
                    Ok(found) => vec![(self.index.clone(), found)],
                    Err(_) => Vec::new(),
                }
            }
            _ => Vec::new(),
        };
        for (step, found) in hits {
            self.pending.push_back((base.child(step), found));
        }
    }
}

impl<'t, C: Comparator + ?Sized> Iterator for IndexMatches<'t, '_, C> {
    type Item = (Path, Found<'t>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(hit) = self.pending.pop_front() {
                return Some(hit);
            }
            let Child {
                parent,
                pos,
                step,
                node: child,
            } = self.walk.next_child(self.tree)?;

            if let Some(selected) = self.selects(parent, pos, &step) {
                self.pending
                    .push_back((self.walk.prefix(selected), Found::Node(child)));
            }
            if child.value().is_container() {
                self.walk.descend(step, child);
            } else {
                let base = self.walk.prefix(step);
                self.lookup(child, &base);
            }
        }
    }
}

impl<C: Comparator + ?Sized> FusedIterator for IndexMatches<'_, '_, C> {}

/// Labels in order of first appearance
fn distinct(labels: &[Label]) -> impl Iterator<Item = &Label> + '_ {
    let mut seen = AHashSet::with_capacity(labels.len());
    labels.iter().filter(move |label| seen.insert(*label))
}
