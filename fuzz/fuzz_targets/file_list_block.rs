#![no_main]
use libfuzzer_sys::{
    arbitrary::{Arbitrary, Unstructured},
    fuzz_target,
};
use word_index::{block::file_list::FileListBlock, IndexedFile};

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);

    // Arbitrary bytes must decode or fail, never panic
    let _ = FileListBlock::decode(data.into());

    if let Ok(mut paths) = <Vec<String> as Arbitrary>::arbitrary(&mut unstructured) {
        paths.retain(|path| !path.is_empty());
        paths.sort();
        paths.dedup();

        let mut block = FileListBlock::new();
        let mut written = vec![];

        for (idx, path) in paths.into_iter().enumerate() {
            let file = IndexedFile::new(path, idx as u32 + 1);

            match block.add_file(&file) {
                Ok(true) => written.push(file),
                Ok(false) | Err(_) => break,
            }
        }

        let decoded = FileListBlock::decode(block.bytes().into()).unwrap();
        assert_eq!(written, decoded);
    }
});
