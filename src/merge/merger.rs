// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{DocumentId, WordEntry};
use interval_heap::IntervalHeap as Heap;

pub type BoxedIterator<'a> = Box<dyn Iterator<Item = crate::Result<WordEntry>> + 'a>;

#[derive(Eq)]
struct HeapItem(usize, WordEntry);

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.1.word() == other.1.word() && self.0 == other.0
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.1.word(), self.0).cmp(&(other.1.word(), other.0))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges multiple word-sorted entry iterators
///
/// Equal words of different iterators are yielded back to back, in
/// iterator order.
pub struct Merger<'a> {
    iterators: Vec<BoxedIterator<'a>>,
    heap: Heap<HeapItem>,
    initialized: bool,
}

impl<'a> Merger<'a> {
    #[must_use]
    pub fn new(iterators: Vec<BoxedIterator<'a>>) -> Self {
        let heap = Heap::with_capacity(iterators.len());

        Self {
            iterators,
            heap,
            initialized: false,
        }
    }

    fn initialize(&mut self) -> crate::Result<()> {
        for (idx, iter) in self.iterators.iter_mut().enumerate() {
            if let Some(item) = iter.next() {
                self.heap.push(HeapItem(idx, item?));
            }
        }
        self.initialized = true;
        Ok(())
    }
}

impl Iterator for Merger<'_> {
    type Item = crate::Result<WordEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.initialized {
            fail_iter!(self.initialize());
        }

        let min_item = self.heap.pop_min()?;

        if let Some(next_item) = self
            .iterators
            .get_mut(min_item.0)
            .and_then(|iter| iter.next())
        {
            let next_item = fail_iter!(next_item);
            self.heap.push(HeapItem(min_item.0, next_item));
        }

        Some(Ok(min_item.1))
    }
}

/// Joins consecutive entries of the same word into one entry
pub struct Coalesce<I> {
    inner: I,
    pending: Option<(String, Vec<DocumentId>)>,
}

impl<I: Iterator<Item = crate::Result<WordEntry>>> Coalesce<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            pending: None,
        }
    }
}

impl<I: Iterator<Item = crate::Result<WordEntry>>> Iterator for Coalesce<I> {
    type Item = crate::Result<WordEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(entry) = self.inner.next() else {
                return self
                    .pending
                    .take()
                    .map(|(word, refs)| Ok(WordEntry::with_refs(word, refs)));
            };
            let (word, refs) = fail_iter!(entry).into_parts();

            match &mut self.pending {
                Some((pending_word, pending_refs)) if *pending_word == word => {
                    // Sorted once the word is complete
                    pending_refs.extend(refs);
                }
                pending => {
                    if let Some((prev_word, prev_refs)) = pending.replace((word, refs)) {
                        return Some(Ok(WordEntry::with_refs(prev_word, prev_refs)));
                    }
                }
            }
        }
    }
}
