mod common;

use common::add_text;
use test_log::test;
use word_index::{Config, IndexState};

#[test]
fn index_remove_after_merge() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "apple banana")?;
    add_text(&mut index, "b", "banana cherry")?;
    add_text(&mut index, "c", "cherry apple")?;
    index.save()?;
    assert_eq!(3, index.num_documents()?);

    index.remove("b")?;
    assert_eq!(IndexState::CanMerge, index.state());

    assert_eq!(2, index.num_documents()?);
    assert_eq!(index.query("banana")?, ["a"]);
    assert_eq!(index.query("cherry")?, ["c"]);

    // Remaining documents were renumbered densely
    let ids = index.documents()?.iter().map(|f| f.id()).collect::<Vec<_>>();
    assert_eq!(ids, [1, 2]);

    Ok(())
}

#[test]
fn index_remove_from_memtable() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "apple")?;
    add_text(&mut index, "b", "apple")?;
    index.remove("a")?;

    assert_eq!(index.query("apple")?, ["b"]);
    assert_eq!(1, index.num_documents()?);

    Ok(())
}

#[test]
fn index_remove_drops_orphan_words() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "unique shared")?;
    add_text(&mut index, "b", "shared")?;
    index.save()?;
    assert_eq!(2, index.num_words()?);

    index.remove("a")?;
    assert_eq!(1, index.num_words()?);
    assert!(index.query("unique")?.is_empty());

    Ok(())
}

#[test]
fn index_remove_unknown_document() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "apple")?;
    index.save()?;

    assert!(matches!(
        index.remove("b"),
        Err(word_index::Error::DocumentNotFound(path)) if path == "b"
    ));
    assert_eq!(IndexState::Merged, index.state());

    Ok(())
}

#[test]
fn index_remove_then_readd() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "old")?;
    index.save()?;

    index.remove("a")?;
    add_text(&mut index, "a", "new")?;

    assert!(index.query("old")?.is_empty());
    assert_eq!(index.query("new")?, ["a"]);
    assert_eq!(1, index.num_documents()?);

    Ok(())
}

#[test]
fn index_readd_replaces_merged_document() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "old common")?;
    add_text(&mut index, "b", "common")?;
    index.save()?;

    add_text(&mut index, "a", "new common")?;

    assert!(index.query("old")?.is_empty());
    assert_eq!(index.query("new")?, ["a"]);
    assert_eq!(index.query("common")?, ["a", "b"]);
    assert_eq!(2, index.num_documents()?);

    Ok(())
}

#[test]
fn index_remove_twice_before_merge() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    add_text(&mut index, "a", "apple")?;
    add_text(&mut index, "b", "apple")?;
    index.save()?;

    index.remove("a")?;
    index.remove("a")?;

    assert_eq!(index.query("apple")?, ["b"]);

    // Now it is gone for good
    assert!(matches!(
        index.remove("a"),
        Err(word_index::Error::DocumentNotFound(_))
    ));

    Ok(())
}
