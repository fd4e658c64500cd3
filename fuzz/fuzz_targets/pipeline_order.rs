#![no_main]

use std::io::Cursor;

use blocksum::{Pipeline, PipelineConfig, digest_sequential};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, u8, Vec<u8>)| {
    let (block_size, workers, data) = input;
    let block_size = usize::from(block_size) + 1;
    let workers = usize::from(workers % 8) + 1;

    let mut expected = Vec::new();
    let reference = digest_sequential(Cursor::new(&data), &mut expected, block_size).unwrap();

    let config = PipelineConfig::new(block_size, workers).unwrap();
    let mut out = Vec::new();
    let summary = Pipeline::new(config)
        .unwrap()
        .run(Cursor::new(&data), &mut out)
        .unwrap();

    // Verify: identical bytes for every concurrency level
    assert_eq!(out, expected);
    assert_eq!(summary.blocks, reference.blocks);
    assert_eq!(summary.bytes, data.len() as u64);
    assert_eq!(out.len() as u64, 16 * summary.blocks);
    assert!(summary.max_pending < workers);
});
