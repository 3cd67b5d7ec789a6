// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The boundary to whatever extracts words from documents.
//!
//! The index does not know how to read a document. An [`Indexer`] is handed
//! the document and an [`IndexerOutput`]; it must call
//! [`IndexerOutput::add_document`] at most once, followed by any number of
//! [`IndexerOutput::add_ref`] calls, before returning.

use crate::IndexedFile;

/// Something that can be indexed
pub trait Document {
    /// Path that identifies the document inside the index.
    fn path(&self) -> &str;
}

/// Sink an [`Indexer`] writes into
pub trait IndexerOutput {
    /// Registers the document, assigning it an id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ContractViolation`] when called twice.
    fn add_document(&mut self, path: &str) -> crate::Result<IndexedFile>;

    /// Adds a reference from `word` to the registered document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ContractViolation`] when no document was
    /// registered or the word is empty.
    fn add_ref(&mut self, word: &str) -> crate::Result<()>;
}

/// Extracts words from a document
pub trait Indexer<D: Document + ?Sized> {
    /// Indexes `document` into `output`.
    ///
    /// # Errors
    ///
    /// Propagates errors of the output or of reading the document.
    fn index(&mut self, document: &D, output: &mut dyn IndexerOutput) -> crate::Result<()>;
}

/// An in-memory text document
#[derive(Clone, Debug)]
pub struct TextDocument {
    path: String,
    text: String,
}

impl TextDocument {
    /// Creates a new text document.
    #[must_use]
    pub fn new<P: Into<String>, T: Into<String>>(path: P, text: T) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Returns the text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Document for TextDocument {
    fn path(&self) -> &str {
        &self.path
    }
}

/// Indexes every alphanumeric run of a [`TextDocument`] as a word
#[derive(Clone, Debug, Default)]
pub struct WordSplitter {
    lowercase: bool,
}

impl WordSplitter {
    /// Creates a splitter that keeps the original case.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercases every word before adding it.
    #[must_use]
    pub fn lowercase(mut self, flag: bool) -> Self {
        self.lowercase = flag;
        self
    }
}

impl Indexer<TextDocument> for WordSplitter {
    fn index(
        &mut self,
        document: &TextDocument,
        output: &mut dyn IndexerOutput,
    ) -> crate::Result<()> {
        output.add_document(document.path())?;

        for word in document
            .text()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if self.lowercase {
                output.add_ref(&word.to_lowercase())?;
            } else {
                output.add_ref(word)?;
            }
        }

        Ok(())
    }
}
