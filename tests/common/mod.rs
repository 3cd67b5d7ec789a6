use word_index::{Index, TextDocument, WordSplitter};

#[allow(dead_code)]
pub fn add_text(index: &mut Index, path: &str, text: &str) -> word_index::Result<()> {
    index.add(&TextDocument::new(path, text), &mut WordSplitter::new())
}

#[allow(dead_code)]
pub fn words(entries: &[word_index::WordEntry]) -> Vec<&str> {
    entries.iter().map(word_index::WordEntry::word).collect()
}
