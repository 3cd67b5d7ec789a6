// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::DocumentId;

/// Posting list of a single word
///
/// Refs are kept strictly ascending.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WordEntry {
    word: String,
    refs: Vec<DocumentId>,
}

impl WordEntry {
    /// Creates an entry without refs.
    #[must_use]
    pub fn new<S: Into<String>>(word: S) -> Self {
        Self {
            word: word.into(),
            refs: Vec::new(),
        }
    }

    /// Creates an entry from refs, sorting and deduplicating them.
    #[must_use]
    pub fn with_refs<S: Into<String>>(word: S, mut refs: Vec<DocumentId>) -> Self {
        refs.sort_unstable();
        refs.dedup();

        Self {
            word: word.into(),
            refs,
        }
    }

    /// Returns the word.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Returns the ascending document refs.
    #[must_use]
    pub fn refs(&self) -> &[DocumentId] {
        &self.refs
    }

    /// Consumes the entry, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<DocumentId>) {
        (self.word, self.refs)
    }

    /// Returns the number of refs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns `true` if the entry has no refs (and will not be persisted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Adds a ref, keeping the list sorted and duplicate-free.
    pub fn add_ref(&mut self, id: DocumentId) {
        match self.refs.last() {
            Some(&last) if last < id => self.refs.push(id),
            None => self.refs.push(id),
            Some(_) => {
                if let Err(idx) = self.refs.binary_search(&id) {
                    self.refs.insert(idx, id);
                }
            }
        }
    }

    /// Adds all refs of another posting list.
    pub fn merge_refs(&mut self, refs: &[DocumentId]) {
        if refs.is_empty() {
            return;
        }

        self.refs.extend_from_slice(refs);
        self.refs.sort_unstable();
        self.refs.dedup();
    }

    /// Rewrites every ref through `mapping`, dropping refs that map to 0.
    ///
    /// The mapping is indexed by the old id; ids out of its range are dropped too.
    pub fn remap(&mut self, mapping: &[DocumentId]) {
        let mut refs = self
            .refs
            .iter()
            .filter_map(|&id| mapping.get(id as usize).copied())
            .filter(|&id| id > 0)
            .collect::<Vec<_>>();

        refs.sort_unstable();
        refs.dedup();
        self.refs = refs;
    }

    /// Splits off refs `at..`, returning them as a new entry of the same word.
    #[must_use]
    pub fn split_off(&mut self, at: usize) -> Self {
        Self {
            word: self.word.clone(),
            refs: self.refs.split_off(at),
        }
    }

    /// Rough heap size in bytes.
    #[must_use]
    pub fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.word.len()
            + self.refs.len() * std::mem::size_of::<DocumentId>()
    }
}
