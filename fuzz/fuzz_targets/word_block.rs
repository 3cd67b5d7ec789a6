#![no_main]
use libfuzzer_sys::{
    arbitrary::{Arbitrary, Unstructured},
    fuzz_target,
};
use word_index::{
    block::word::{BlockFormat, EntryBlock},
    WordEntry,
};

#[derive(Arbitrary, Debug)]
struct FuzzEntry {
    word: String,
    refs: Vec<u32>,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);

    // Arbitrary bytes must decode or fail, never panic
    for format in [BlockFormat::Simple, BlockFormat::GammaCompressed] {
        let _ = format.decode(data);
    }

    if let Ok(mut items) = <Vec<FuzzEntry> as Arbitrary>::arbitrary(&mut unstructured) {
        items.retain(|item| !item.word.is_empty());
        items.sort_by(|a, b| a.word.cmp(&b.word));
        items.dedup_by(|a, b| a.word == b.word);

        let entries = items
            .into_iter()
            .map(|item| WordEntry::with_refs(item.word, item.refs))
            .filter(|entry| !entry.is_empty() && entry.refs().first() != Some(&0))
            .collect::<Vec<_>>();

        for format in [BlockFormat::Simple, BlockFormat::GammaCompressed] {
            let mut block = format.new_block();
            let mut written = vec![];

            for entry in &entries {
                match block.add_entry(entry) {
                    Ok(true) => written.push(entry.clone()),
                    Ok(false) | Err(_) => break,
                }
            }

            let decoded = format.decode(block.bytes()).unwrap();
            assert_eq!(written, decoded);
        }
    }
});
