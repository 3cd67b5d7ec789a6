use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::tempdir;
use word_index::{Config, Index, TextDocument, WordSplitter};

fn build(doc_count: usize, cache_reader: bool) -> (tempfile::TempDir, Index) {
    let folder = tempdir().unwrap();

    let mut index = Config::new(folder.path().join("index"))
        .cache_reader(cache_reader)
        .open()
        .unwrap();

    let mut splitter = WordSplitter::new();

    for i in 0..doc_count {
        let text = format!("common word{} unique{i} group{}", i % 100, i % 7);
        index
            .add(&TextDocument::new(format!("doc{i:07}"), text), &mut splitter)
            .unwrap();
    }
    index.save().unwrap();

    (folder, index)
}

fn merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.sample_size(10);

    for doc_count in [1_000, 10_000] {
        group.bench_function(format!("merge {doc_count} documents"), |b| {
            b.iter(|| build(doc_count, false));
        });
    }
}

fn query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for cache_reader in [false, true] {
        let (_folder, mut index) = build(10_000, cache_reader);

        group.bench_function(format!("exact, cached reader={cache_reader}"), |b| {
            b.iter(|| {
                assert_eq!(1, index.query("unique4242").unwrap().len());
            });
        });

        group.bench_function(format!("prefix, cached reader={cache_reader}"), |b| {
            b.iter(|| {
                assert_eq!(11, index.query_entries_prefixed_by("word4", true).unwrap().len());
            });
        });

        group.bench_function(format!("wildcard, cached reader={cache_reader}"), |b| {
            b.iter(|| {
                assert_eq!(9, index.query_entries_matching("word?2", true).unwrap().len());
            });
        });
    }
}

criterion_group!(benches, merge, query);
criterion_main!(benches);
