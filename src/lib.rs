// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A persistent, block-based word index.
//!
//! ##### About
//!
//! This crate exports an `Index` that maps words to the documents containing
//! them, and answers exact, prefix and wildcard queries.
//!
//! The index lives in a single file of fixed-size blocks: a header block,
//! the sorted list of indexed documents, the sorted word posting lists, and a
//! summary that records the first document and the first word of every block.
//! A lookup only reads the summary and the few blocks it points to.
//!
//! Instead of updating the file in place, added documents and removals are
//! collected in an in-memory write buffer (`Memtable`). Pending changes are
//! then merged with the existing file into a new file that atomically
//! replaces it, renumbering documents densely along the way.
//!
//! Posting lists are stored either as plain `u32` lists, or as
//! Elias gamma-coded deltas in a bit stream (the default), with words
//! front-coded against their predecessor.
//!
//! Extracting words from documents is left to an [`Indexer`]; the crate
//! ships a simple [`WordSplitter`] for plain text.
//!
//! ```
//! use word_index::{Config, TextDocument, WordSplitter};
//! #
//! # let folder = tempfile::tempdir()?;
//!
//! let mut index = Config::new(folder.path().join("words.idx")).open()?;
//! let mut splitter = WordSplitter::new().lowercase(true);
//!
//! index.add(&TextDocument::new("a.txt", "Hello world"), &mut splitter)?;
//! index.add(&TextDocument::new("b.txt", "hello there"), &mut splitter)?;
//!
//! // Queries merge pending changes first
//! assert_eq!(index.query("hello")?, ["a.txt", "b.txt"]);
//! assert_eq!(index.query_files_referring_to_prefix("wor")?, ["a.txt"]);
//!
//! index.remove("a.txt")?;
//! assert_eq!(index.query("hello")?, ["b.txt"]);
//! #
//! # Ok::<(), word_index::Error>(())
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[doc(hidden)]
pub type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

macro_rules! fail_iter {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Some(Err(e.into())),
        }
    };
}

#[doc(hidden)]
pub mod bit_stream;

#[doc(hidden)]
pub mod block;

mod cache;

#[doc(hidden)]
pub mod coding;

/// Configuration
pub mod config;

mod error;

#[doc(hidden)]
pub mod field;

#[doc(hidden)]
pub mod file;

mod index;
mod indexed_file;
mod indexer;
mod memtable;

#[doc(hidden)]
pub mod merge;

#[doc(hidden)]
pub mod mutf8;

mod reader;

#[doc(hidden)]
pub mod summary;

/// Wildcard matching
pub mod wildcard;

mod word_entry;
mod writer;

/// Document number, dense from 1 inside an index file
pub type DocumentId = u32;

#[doc(hidden)]
pub use {memtable::Memtable, summary::IndexSummary};

pub use {
    block::word::BlockFormat,
    cache::BlockCache,
    config::Config,
    error::{Error, Result},
    index::{Index, IndexState},
    indexed_file::IndexedFile,
    indexer::{Document, Indexer, IndexerOutput, TextDocument, WordSplitter},
    reader::{IndexReader, Scanner},
    wildcard::WildcardPattern,
    word_entry::WordEntry,
    writer::IndexWriter,
};
