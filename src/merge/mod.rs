// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Merges the on-disk generation and the memtable into a new generation
//!
//! Files of both inputs are walked in path order. Removed files are
//! skipped; if a path exists in both inputs, the memtable copy wins. Every
//! emitted file gets the next dense id, and the old ids of both inputs are
//! recorded in remap tables. The word streams are then merged in word order,
//! with every posting list rewritten through its input's remap table; refs
//! to files that were not emitted map to 0 and are dropped.

mod merger;

use crate::{
    memtable::Memtable, reader::IndexReader, summary::IndexSummary, writer::IndexWriter,
    DocumentId, HashMap, IndexedFile,
};
use merger::{BoxedIterator, Coalesce, Merger};

/// Returns `true` if `file` was removed from its generation.
fn is_removed(removed: &HashMap<String, DocumentId>, file: &IndexedFile) -> bool {
    removed
        .get(file.path())
        .is_some_and(|&removed_id| file.id() <= removed_id)
}

/// Returns the next file that was not removed.
fn next_live<I: Iterator<Item = crate::Result<IndexedFile>>>(
    files: &mut I,
    removed: &HashMap<String, DocumentId>,
) -> crate::Result<Option<IndexedFile>> {
    for file in files {
        let file = file?;

        if is_removed(removed, &file) {
            log::trace!("Dropping removed file {file}");
            continue;
        }

        return Ok(Some(file));
    }

    Ok(None)
}

fn set_slot(remap: &mut [DocumentId], old_id: DocumentId, new_id: DocumentId) {
    if let Some(slot) = remap.get_mut(old_id as usize) {
        *slot = new_id;
    }
}

/// Merges one on-disk generation and one memtable
pub struct MergeEngine<'a> {
    disk: &'a mut IndexReader,
    memtable: &'a mut Memtable,

    removed_on_disk: &'a HashMap<String, DocumentId>,
    removed_in_memtable: &'a HashMap<String, DocumentId>,

    /// Old disk id -> new id (0 = dropped)
    disk_remap: Vec<DocumentId>,

    /// Memtable id -> new id (0 = dropped)
    memtable_remap: Vec<DocumentId>,
}

impl<'a> MergeEngine<'a> {
    /// Prepares a merge.
    pub fn new(
        disk: &'a mut IndexReader,
        memtable: &'a mut Memtable,
        removed_on_disk: &'a HashMap<String, DocumentId>,
        removed_in_memtable: &'a HashMap<String, DocumentId>,
    ) -> Self {
        let disk_remap = vec![0; disk.num_files() as usize + 1];
        let memtable_remap = vec![0; memtable.last_id() as usize + 1];

        Self {
            disk,
            memtable,
            removed_on_disk,
            removed_in_memtable,
            disk_remap,
            memtable_remap,
        }
    }

    /// Returns the remap table of the on-disk generation.
    #[must_use]
    pub fn disk_remap(&self) -> &[DocumentId] {
        &self.disk_remap
    }

    /// Returns the remap table of the memtable.
    #[must_use]
    pub fn memtable_remap(&self) -> &[DocumentId] {
        &self.memtable_remap
    }

    /// Writes the merged generation and finishes the writer.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or an input is malformed.
    /// Neither input is modified in either case.
    pub fn run(&mut self, mut writer: IndexWriter) -> crate::Result<IndexSummary> {
        let start = std::time::Instant::now();

        self.merge_files(&mut writer)?;
        self.merge_words(&mut writer)?;

        let summary = writer.finish()?;

        log::debug!(
            "Merged {} disk files and {} memtable files into {} files, {} words in {:?}",
            self.disk.num_files(),
            self.memtable.num_files(),
            summary.num_files(),
            summary.num_words(),
            start.elapsed(),
        );

        Ok(summary)
    }

    fn merge_files(&mut self, writer: &mut IndexWriter) -> crate::Result<()> {
        let mut disk_files = self.disk.scan_files();
        let mut memtable_files = self
            .memtable
            .sorted_files()
            .iter()
            .cloned()
            .map(Ok::<_, crate::Error>);

        let mut next_disk = next_live(&mut disk_files, self.removed_on_disk)?;
        let mut next_memtable = next_live(&mut memtable_files, self.removed_in_memtable)?;

        let mut next_id: DocumentId = 0;

        loop {
            let order = match (&next_disk, &next_memtable) {
                (None, None) => break,
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some(disk), Some(memtable)) => disk.path().cmp(memtable.path()),
            };

            next_id += 1;

            if order.is_le() {
                if let Some(disk) = next_disk.take() {
                    if order.is_eq() {
                        log::trace!("Replacing {disk} with its memtable copy");
                    } else {
                        set_slot(&mut self.disk_remap, disk.id(), next_id);
                        writer.add_file(&IndexedFile::new(disk.into_path(), next_id))?;
                    }
                }
                next_disk = next_live(&mut disk_files, self.removed_on_disk)?;
            }

            if order.is_ge() {
                if let Some(memtable) = next_memtable.take() {
                    set_slot(&mut self.memtable_remap, memtable.id(), next_id);
                    writer.add_file(&IndexedFile::new(memtable.into_path(), next_id))?;
                }
                next_memtable = next_live(&mut memtable_files, self.removed_in_memtable)?;
            }
        }

        Ok(())
    }

    fn merge_words(&mut self, writer: &mut IndexWriter) -> crate::Result<()> {
        let disk_remap = &self.disk_remap;
        let memtable_remap = &self.memtable_remap;

        let disk_words: BoxedIterator<'_> = Box::new(self.disk.scan_words().map(|entry| {
            entry.map(|mut entry| {
                entry.remap(disk_remap);
                entry
            })
        }));

        let memtable_words: BoxedIterator<'_> = Box::new(
            self.memtable
                .sorted_word_entries()
                .iter()
                .map(|entry| {
                    let mut entry = entry.clone();
                    entry.remap(memtable_remap);
                    Ok(entry)
                }),
        );

        for entry in Coalesce::new(Merger::new(vec![disk_words, memtable_words])) {
            writer.add_word(&entry?)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{block::word::BlockFormat, WordEntry};
    use std::path::Path;
    use test_log::test;

    fn disk_generation(path: &Path) -> crate::Result<IndexReader> {
        let mut writer = IndexWriter::create(path, BlockFormat::default())?;
        writer.add_file(&IndexedFile::new("b", 1))?;
        writer.add_file(&IndexedFile::new("d", 2))?;
        writer.add_file(&IndexedFile::new("f", 3))?;
        writer.add_word(&WordEntry::with_refs("common", vec![1, 2, 3]))?;
        writer.add_word(&WordEntry::with_refs("dee", vec![2]))?;
        writer.finish()?;

        IndexReader::open(path, BlockFormat::default(), 16)
    }

    fn merge(
        disk: &mut IndexReader,
        memtable: &mut Memtable,
        removed_on_disk: &HashMap<String, DocumentId>,
        removed_in_memtable: &HashMap<String, DocumentId>,
        out: &Path,
    ) -> crate::Result<(Vec<DocumentId>, Vec<DocumentId>)> {
        let mut engine = MergeEngine::new(disk, memtable, removed_on_disk, removed_in_memtable);
        engine.run(IndexWriter::create(out, BlockFormat::default())?)?;
        Ok((engine.disk_remap().to_vec(), engine.memtable_remap().to_vec()))
    }

    #[test]
    fn merge_renumbers_in_path_order() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut disk = disk_generation(&dir.path().join("old"))?;

        let mut memtable = Memtable::default();
        let e = memtable.add_document("e");
        memtable.add_ref("common", e.id());
        let a = memtable.add_document("a");
        memtable.add_ref("common", a.id());
        memtable.add_ref("aye", a.id());

        let out = dir.path().join("new");
        let (disk_remap, memtable_remap) = merge(
            &mut disk,
            &mut memtable,
            &HashMap::default(),
            &HashMap::default(),
            &out,
        )?;

        // a b d e f
        assert_eq!(disk_remap, [0, 2, 3, 5]);
        assert_eq!(memtable_remap, [0, 4, 1]);

        let mut merged = IndexReader::open(&out, BlockFormat::default(), 16)?;
        assert_eq!(5, merged.num_files());

        let files = merged.files()?;
        assert_eq!(
            files,
            [
                IndexedFile::new("a", 1),
                IndexedFile::new("b", 2),
                IndexedFile::new("d", 3),
                IndexedFile::new("e", 4),
                IndexedFile::new("f", 5),
            ]
        );

        assert_eq!(
            merged.query_entry("common")?.map(|e| e.refs().to_vec()),
            Some(vec![1, 2, 3, 4, 5])
        );
        assert_eq!(
            merged.query_entry("dee")?.map(|e| e.refs().to_vec()),
            Some(vec![3])
        );

        Ok(())
    }

    #[test]
    fn merge_drops_removed_files() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut disk = disk_generation(&dir.path().join("old"))?;

        let mut memtable = Memtable::default();
        let c = memtable.add_document("c");
        memtable.add_ref("common", c.id());

        let mut removed_on_disk = HashMap::default();
        removed_on_disk.insert("d".to_owned(), 2);

        let mut removed_in_memtable = HashMap::default();
        removed_in_memtable.insert("c".to_owned(), c.id());

        let out = dir.path().join("new");
        let (disk_remap, _) = merge(
            &mut disk,
            &mut memtable,
            &removed_on_disk,
            &removed_in_memtable,
            &out,
        )?;
        assert_eq!(disk_remap, [0, 1, 0, 2]);

        let mut merged = IndexReader::open(&out, BlockFormat::default(), 16)?;
        assert_eq!(2, merged.num_files());
        assert_eq!(1, merged.num_words());
        assert_eq!(
            merged.query_entry("common")?.map(|e| e.refs().to_vec()),
            Some(vec![1, 2])
        );
        assert!(merged.query_entry("dee")?.is_none());

        Ok(())
    }

    #[test]
    fn merge_readded_file_takes_memtable_copy() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut disk = disk_generation(&dir.path().join("old"))?;

        let mut memtable = Memtable::default();
        let d = memtable.add_document("d");
        memtable.add_ref("fresh", d.id());

        let out = dir.path().join("new");
        let (disk_remap, memtable_remap) = merge(
            &mut disk,
            &mut memtable,
            &HashMap::default(),
            &HashMap::default(),
            &out,
        )?;
        assert_eq!(disk_remap, [0, 1, 0, 3]);
        assert_eq!(memtable_remap, [0, 2]);

        let mut merged = IndexReader::open(&out, BlockFormat::default(), 16)?;
        assert_eq!(3, merged.num_files());

        // The old postings of "d" are gone
        assert!(merged.query_entry("dee")?.is_none());
        assert_eq!(
            merged.query_entry("common")?.map(|e| e.refs().to_vec()),
            Some(vec![1, 3])
        );
        assert_eq!(
            merged.query_entry("fresh")?.map(|e| e.refs().to_vec()),
            Some(vec![2])
        );

        Ok(())
    }

    #[test]
    fn merge_coalesces_memtable_duplicates() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let empty = dir.path().join("empty");
        IndexWriter::create(&empty, BlockFormat::default())?.finish()?;
        let mut disk = IndexReader::open(&empty, BlockFormat::default(), 16)?;

        let mut memtable = Memtable::default();
        let a = memtable.add_document("a");
        let b = memtable.add_document("b");
        for _ in 0..3 {
            memtable.add_ref("dup", b.id());
            memtable.add_ref("dup", a.id());
        }

        let out = dir.path().join("new");
        merge(
            &mut disk,
            &mut memtable,
            &HashMap::default(),
            &HashMap::default(),
            &out,
        )?;

        let mut merged = IndexReader::open(&out, BlockFormat::default(), 16)?;
        assert_eq!(1, merged.num_words());
        assert_eq!(
            merged.query_entry("dup")?.map(|e| e.refs().to_vec()),
            Some(vec![1, 2])
        );

        Ok(())
    }
}
