use test_log::test;
use word_index::{Config, Document, Indexer, IndexerOutput};

struct Record {
    id: String,
    tags: Vec<&'static str>,
}

impl Document for Record {
    fn path(&self) -> &str {
        &self.id
    }
}

/// Indexes tags, skipping records without any
struct TagIndexer;

impl Indexer<Record> for TagIndexer {
    fn index(&mut self, record: &Record, output: &mut dyn IndexerOutput) -> word_index::Result<()> {
        if record.tags.is_empty() {
            return Ok(());
        }

        let file = output.add_document(record.path())?;
        assert!(file.id() > 0);

        for tag in &record.tags {
            output.add_ref(tag)?;
        }

        Ok(())
    }
}

/// Breaks the indexer contract
struct BrokenIndexer;

impl Indexer<Record> for BrokenIndexer {
    fn index(&mut self, _: &Record, output: &mut dyn IndexerOutput) -> word_index::Result<()> {
        output.add_ref("orphan")
    }
}

#[test]
fn index_custom_indexer() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    let records = [
        Record {
            id: "r1".into(),
            tags: vec!["red", "blue", "red"],
        },
        Record {
            id: "r2".into(),
            tags: vec![],
        },
        Record {
            id: "r3".into(),
            tags: vec!["blue"],
        },
    ];

    for record in &records {
        index.add(record, &mut TagIndexer)?;
    }

    assert_eq!(2, index.num_documents()?);
    assert_eq!(index.query("blue")?, ["r1", "r3"]);
    assert_eq!(index.query("red")?, ["r1"]);
    assert!(index.query_in_document_names("r2")?.is_empty());

    Ok(())
}

#[test]
fn index_indexer_contract_violation() -> word_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut index = Config::new(folder.path().join("index")).open()?;

    let record = Record {
        id: "r1".into(),
        tags: vec!["red"],
    };

    assert!(matches!(
        index.add(&record, &mut BrokenIndexer),
        Err(word_index::Error::ContractViolation(_))
    ));

    // Nothing was registered
    assert_eq!(0, index.num_documents()?);

    Ok(())
}
