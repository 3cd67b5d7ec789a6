// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::DocumentId;

/// A document known to the index: its path and document id
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct IndexedFile {
    path: String,
    id: DocumentId,
}

impl IndexedFile {
    /// Creates a new indexed file.
    #[must_use]
    pub fn new<S: Into<String>>(path: S, id: DocumentId) -> Self {
        Self {
            path: path.into(),
            id,
        }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the document id.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Consumes the file, returning its path.
    #[must_use]
    pub fn into_path(self) -> String {
        self.path
    }

    pub(crate) fn footprint(&self) -> usize {
        std::mem::size_of::<Self>() + self.path.len()
    }
}

impl std::fmt::Display for IndexedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.path, self.id)
    }
}
