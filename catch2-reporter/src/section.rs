// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tree of sections executed across the runs of a test.
//!
//! Catch2 runs one path through a test's sections per execution, so repeated runs of the same
//! test each see part of the tree. [`SectionTree`] accumulates everything observed: sections are
//! stored in an arena and addressed by [`SectionId`], and each parent keeps its children in an
//! insertion-ordered map keyed by [`SectionKey`]. Merging a run is a key-based upsert; sections
//! are never removed.

use crate::helpers::normalize_filename;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, map::Entry};
use std::{borrow::Cow, fmt, ops::Index};

/// The identity of a section: two sections are the same across runs iff their keys are equal.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SectionKey {
    name: String,
    file: Option<Utf8PathBuf>,
    line: u32,
}

impl SectionKey {
    /// Creates a new key. The file is normalized, and an empty file is treated as absent.
    pub fn new(name: impl Into<String>, file: Option<&str>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: normalize_filename(file),
            line,
        }
    }

    /// Returns the section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the normalized source file, if known.
    pub fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }

    /// Returns the 1-based source line.
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// An index into a [`SectionTree`].
///
/// Ids are only meaningful for the tree that produced them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SectionId(usize);

/// Where a section hangs in the tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SectionParent {
    /// The section is directly under the test case.
    Root,
    /// The section is nested in another section.
    Section(SectionId),
}

impl From<SectionId> for SectionParent {
    fn from(id: SectionId) -> Self {
        SectionParent::Section(id)
    }
}

/// A node in the section tree.
#[derive(Clone, Debug)]
pub struct Section {
    key: SectionKey,
    children: IndexMap<SectionKey, SectionId>,
    failed: bool,
}

impl Section {
    fn new(key: SectionKey) -> Self {
        Self {
            key,
            children: IndexMap::new(),
            failed: false,
        }
    }

    /// Returns the identity of this section.
    pub fn key(&self) -> &SectionKey {
        &self.key
    }

    /// Returns the section name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Returns the section name with backticks escaped.
    ///
    /// Some debug adapters start the debuggee through a shell, which would otherwise execute
    /// backtick-quoted text in a section filter.
    pub fn escaped_name(&self) -> Cow<'_, str> {
        if self.key.name.contains('`') {
            Cow::Owned(self.key.name.replace('`', "\\`"))
        } else {
            Cow::Borrowed(&self.key.name)
        }
    }

    /// Returns the normalized source file, if known.
    pub fn file(&self) -> Option<&Utf8Path> {
        self.key.file()
    }

    /// Returns the 1-based source line.
    pub fn line(&self) -> u32 {
        self.key.line
    }

    /// Returns true if the last run that executed this section as a leaf reported failures.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Returns true if no run has ever reported sections nested in this one.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterates over the children of this section, in the order they were first seen.
    pub fn children(&self) -> impl ExactSizeIterator<Item = SectionId> + '_ {
        self.children.values().copied()
    }
}

/// The sections observed across all runs of one test.
#[derive(Clone, Debug, Default)]
pub struct SectionTree {
    sections: Vec<Section>,
    roots: IndexMap<SectionKey, SectionId>,
}

impl SectionTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no section has been recorded.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns the total number of sections in the tree.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns the section with the given id, if it belongs to this tree.
    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    /// Iterates over the sections directly under the test case, in the order they were first seen.
    pub fn roots(&self) -> impl ExactSizeIterator<Item = SectionId> + '_ {
        self.roots.values().copied()
    }

    /// Iterates over the children of `parent`, in the order they were first seen.
    pub fn children(&self, parent: SectionParent) -> impl ExactSizeIterator<Item = SectionId> + '_ {
        self.child_map(parent).values().copied()
    }

    /// Looks up the child of `parent` with the given key.
    pub fn find(&self, parent: SectionParent, key: &SectionKey) -> Option<SectionId> {
        self.child_map(parent).get(key).copied()
    }

    /// Returns the child of `parent` with the given key, creating it if it doesn't exist.
    ///
    /// New children are appended after existing ones. Calling this again with the same parent and
    /// key always returns the same id.
    pub fn find_or_create(&mut self, parent: SectionParent, key: SectionKey) -> SectionId {
        let next_id = SectionId(self.sections.len());
        let children = match parent {
            SectionParent::Root => &mut self.roots,
            SectionParent::Section(id) => &mut self.sections[id.0].children,
        };

        match children.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                entry.insert(next_id);
                self.sections.push(Section::new(key));
                next_id
            }
        }
    }

    /// Records the outcome of a run that executed `id`.
    ///
    /// The section is marked failed iff it had no nested sections in this run and the run reported
    /// failures for it. Sections a run doesn't execute keep their previous state.
    pub fn mark_failed_if_leaf(&mut self, id: SectionId, has_children: bool, failures: u64) {
        self.sections[id.0].failed = !has_children && failures != 0;
    }

    /// Counts the failed and succeeded leaves of the tree.
    ///
    /// Sections with children don't count themselves: only their descendants do.
    pub fn summarize(&self) -> BranchSummary {
        // Sections are never removed, so every section in the arena is reachable from a root.
        self.sections
            .iter()
            .filter(|section| section.is_leaf())
            .fold(BranchSummary::default(), |mut summary, section| {
                if section.failed {
                    summary.failed += 1;
                } else {
                    summary.succeeded += 1;
                }
                summary
            })
    }

    fn child_map(&self, parent: SectionParent) -> &IndexMap<SectionKey, SectionId> {
        match parent {
            SectionParent::Root => &self.roots,
            SectionParent::Section(id) => &self.sections[id.0].children,
        }
    }
}

impl Index<SectionId> for SectionTree {
    type Output = Section;

    /// # Panics
    ///
    /// Panics if `id` was produced by a different tree.
    fn index(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }
}

/// The number of failed and succeeded leaf sections of a [`SectionTree`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BranchSummary {
    /// Leaves whose last run reported failures.
    pub failed: usize,
    /// Leaves whose last run reported no failures.
    pub succeeded: usize,
}

impl fmt::Display for BranchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed != 0 {
            write!(f, "✘{}|", self.failed)?;
        }
        write!(f, "✔︎{}", self.succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn key(name: &str, line: u32) -> SectionKey {
        SectionKey::new(name, Some("test.cpp"), line)
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let mut tree = SectionTree::new();
        let a = tree.find_or_create(SectionParent::Root, key("a", 1));
        let b = tree.find_or_create(SectionParent::Root, key("b", 2));
        let a_again = tree.find_or_create(SectionParent::Root, key("a", 1));

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn keys_differ_by_any_component() {
        let mut tree = SectionTree::new();
        let base = tree.find_or_create(SectionParent::Root, SectionKey::new("a", Some("x.cpp"), 1));
        let other_line =
            tree.find_or_create(SectionParent::Root, SectionKey::new("a", Some("x.cpp"), 2));
        let other_file =
            tree.find_or_create(SectionParent::Root, SectionKey::new("a", Some("y.cpp"), 1));
        let no_file = tree.find_or_create(SectionParent::Root, SectionKey::new("a", None, 1));
        let normalized =
            tree.find_or_create(SectionParent::Root, SectionKey::new("a", Some("./x.cpp"), 1));

        assert_eq!(tree.roots().len(), 4);
        assert_eq!(base, normalized, "files are compared after normalization");
        for id in [other_line, other_file, no_file] {
            assert_ne!(base, id);
        }
    }

    #[test]
    fn same_key_under_different_parents() {
        let mut tree = SectionTree::new();
        let a = tree.find_or_create(SectionParent::Root, key("a", 1));
        let b = tree.find_or_create(SectionParent::Root, key("b", 5));
        let under_a = tree.find_or_create(a.into(), key("leaf", 2));
        let under_b = tree.find_or_create(b.into(), key("leaf", 2));

        assert_ne!(under_a, under_b);
        assert_eq!(tree.find(a.into(), &key("leaf", 2)), Some(under_a));
        assert_eq!(tree.find(SectionParent::Root, &key("leaf", 2)), None);
        assert!(!tree[a].is_leaf());
        assert!(tree[under_b].is_leaf());
    }

    #[test]
    fn mark_failed_if_leaf() {
        let mut tree = SectionTree::new();
        let leaf = tree.find_or_create(SectionParent::Root, key("leaf", 1));

        tree.mark_failed_if_leaf(leaf, false, 2);
        assert!(tree[leaf].failed());

        tree.mark_failed_if_leaf(leaf, false, 0);
        assert!(!tree[leaf].failed(), "a clean re-run clears the flag");

        tree.mark_failed_if_leaf(leaf, true, 3);
        assert!(!tree[leaf].failed(), "sections with children are never marked");
    }

    #[test]
    fn summarize_counts_only_leaves() {
        let mut tree = SectionTree::new();
        let outer = tree.find_or_create(SectionParent::Root, key("outer", 1));
        let failing = tree.find_or_create(outer.into(), key("failing", 2));
        let passing = tree.find_or_create(outer.into(), key("passing", 3));
        let lone = tree.find_or_create(SectionParent::Root, key("lone", 9));

        tree.mark_failed_if_leaf(outer, false, 1);
        tree.mark_failed_if_leaf(failing, false, 1);
        tree.mark_failed_if_leaf(passing, false, 0);
        tree.mark_failed_if_leaf(lone, false, 0);

        assert_eq!(
            tree.summarize(),
            BranchSummary {
                failed: 1,
                succeeded: 2
            }
        );
    }

    #[test]
    fn branch_summary_display() {
        let summary = BranchSummary {
            failed: 1,
            succeeded: 1,
        };
        assert_eq!(summary.to_string(), "✘1|✔︎1");

        let summary = BranchSummary {
            failed: 0,
            succeeded: 4,
        };
        assert_eq!(summary.to_string(), "✔︎4");
    }

    #[test]
    fn escaped_name() {
        let mut tree = SectionTree::new();
        let id = tree.find_or_create(SectionParent::Root, key("run `pwd`", 1));
        assert_eq!(tree[id].escaped_name(), "run \\`pwd\\`");

        let id = tree.find_or_create(SectionParent::Root, key("plain", 1));
        assert!(matches!(tree[id].escaped_name(), Cow::Borrowed("plain")));
    }

    #[proptest(cases = 64)]
    fn repeated_keys_never_duplicate(
        #[strategy(proptest::collection::vec(("[a-c]", 0u32..3), 0..32))] keys: Vec<(String, u32)>,
    ) {
        let mut tree = SectionTree::new();
        let mut first_ids = std::collections::HashMap::new();

        for (name, line) in &keys {
            let id = tree.find_or_create(SectionParent::Root, key(name, *line));
            let first = *first_ids.entry((name.clone(), *line)).or_insert(id);
            prop_assert_eq!(first, id);
        }

        prop_assert_eq!(tree.roots().len(), first_ids.len());
        prop_assert_eq!(tree.len(), first_ids.len());
    }

    #[proptest(cases = 64)]
    fn summarize_leaf_only_tree(#[strategy(proptest::collection::vec(any::<bool>(), 0..32))] failed: Vec<bool>) {
        let mut tree = SectionTree::new();
        for (line, failed) in failed.iter().enumerate() {
            let id = tree.find_or_create(SectionParent::Root, key("leaf", line as u32));
            tree.mark_failed_if_leaf(id, false, u64::from(*failed));
        }

        let summary = tree.summarize();
        prop_assert_eq!(summary.failed, failed.iter().filter(|f| **f).count());
        prop_assert_eq!(summary.failed + summary.succeeded, failed.len());
    }
}
