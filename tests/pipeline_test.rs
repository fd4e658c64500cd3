// Integration tests for the concurrent digest pipeline
// Tests cover: ordering, determinism, boundaries, cancellation, stress

use std::io::{self, Cursor, Read, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use blocksum::{
    BlockHasher, Digest, DigestError, Md5Hasher, Pipeline, PipelineConfig, RunSummary,
    digest_sequential,
};

// ============================================================================
// Helpers
// ============================================================================

/// Deterministic pseudo-random bytes (64-bit LCG).
fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

/// Digests computed block by block, independent of the crate's chunker.
fn expected(data: &[u8], block_size: usize) -> Vec<u8> {
    data.chunks(block_size)
        .flat_map(|block| *Md5Hasher::hash(block).as_bytes())
        .collect()
}

fn run_pipeline(data: &[u8], block_size: usize, workers: usize) -> Vec<u8> {
    let config = PipelineConfig::new(block_size, workers).unwrap();
    let mut out = Vec::new();
    Pipeline::new(config)
        .unwrap()
        .run(Cursor::new(data), &mut out)
        .unwrap();
    out
}

/// Runs `f` on another thread and fails the test if it does not finish.
fn within<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(Duration::from_secs(30))
        .expect("pipeline did not terminate")
}

/// MD5 with a per-block delay derived from the block contents, so workers
/// finish in a scrambled order.
struct Jittery {
    max_micros: u64,
}

impl BlockHasher for Jittery {
    fn digest(&self, block: &[u8]) -> Digest {
        let digest = Md5Hasher::hash(block);
        let delay = u64::from(digest.as_bytes()[0]) * self.max_micros / 255;
        thread::sleep(Duration::from_micros(delay));
        digest
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("device removed"))
    }
}

/// Accepts `budget` bytes, then fails every write.
struct FullDisk {
    budget: usize,
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Order, Determinism, Completeness
// ============================================================================

#[test]
fn test_order_preserved_for_every_concurrency() {
    let data = pseudo_random(50_000, 1);

    for workers in [1, 2, 3, 4, 8, 16] {
        for block_size in [1, 7, 64, 4096] {
            let out = run_pipeline(&data, block_size, workers);
            assert_eq!(
                out,
                expected(&data, block_size),
                "workers={workers} block_size={block_size}"
            );
        }
    }
}

#[test]
fn test_deterministic_across_concurrency() {
    let data = pseudo_random(200_000, 42);
    assert_eq!(run_pipeline(&data, 1000, 1), run_pipeline(&data, 1000, 8));
}

#[test]
fn test_matches_sequential_reference() {
    let data = pseudo_random(123_457, 9);
    let mut sequential = Vec::new();
    let reference = digest_sequential(Cursor::new(&data), &mut sequential, 512).unwrap();

    let config = PipelineConfig::new(512, 4).unwrap();
    let mut concurrent = Vec::new();
    let summary = Pipeline::new(config)
        .unwrap()
        .run(Cursor::new(&data), &mut concurrent)
        .unwrap();

    assert_eq!(concurrent, sequential);
    assert_eq!(summary.blocks, reference.blocks);
    assert_eq!(summary.bytes, reference.bytes);
}

#[test]
fn test_output_length_is_sixteen_per_block() {
    for len in [1usize, 99, 100, 101, 1000, 1001] {
        let data = pseudo_random(len, len as u64);
        let out = run_pipeline(&data, 100, 4);
        assert_eq!(out.len(), 16 * len.div_ceil(100), "len={len}");
    }
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_empty_input() {
    let config = PipelineConfig::new(4, 4).unwrap();
    let mut out = Vec::new();
    let summary = Pipeline::new(config)
        .unwrap()
        .run(io::empty(), &mut out)
        .unwrap();

    assert!(out.is_empty());
    assert_eq!(
        summary,
        RunSummary {
            blocks: 0,
            bytes: 0,
            max_pending: 0
        }
    );
}

#[test]
fn test_exact_multiple_of_block_size() {
    let out = run_pipeline(b"ABCDEFGH", 4, 2);

    assert_eq!(out.len(), 32);
    assert_eq!(&out[..16], Md5Hasher::hash(b"ABCD").as_bytes());
    assert_eq!(&out[16..], Md5Hasher::hash(b"EFGH").as_bytes());
}

#[test]
fn test_short_final_block() {
    let out = run_pipeline(b"ABCDEFG", 4, 2);

    assert_eq!(out.len(), 32);
    assert_eq!(&out[..16], Md5Hasher::hash(b"ABCD").as_bytes());
    assert_eq!(&out[16..], Md5Hasher::hash(b"EFG").as_bytes());
}

#[test]
fn test_block_larger_than_input() {
    let out = run_pipeline(b"tiny", 1 << 20, 4);
    assert_eq!(out, Md5Hasher::hash(b"tiny").as_bytes());
}

// ============================================================================
// Cancellation and Errors
// ============================================================================

#[test]
fn test_read_failure_cancels_pipeline() {
    const GOOD_BLOCKS: usize = 25;
    let block_size = 64;

    let result = within(move || {
        let data = pseudo_random(GOOD_BLOCKS * block_size, 5);
        let reader = Cursor::new(data).chain(FailingReader);
        let config = PipelineConfig::new(block_size, 4).unwrap();
        let mut out = Vec::new();
        let result = Pipeline::new(config).unwrap().run(reader, &mut out);
        (result, out)
    });

    let (result, out) = result;
    assert!(matches!(result, Err(DigestError::Read(_))));
    assert!(out.len() <= GOOD_BLOCKS * 16);
    assert_eq!(out.len() % 16, 0);

    // Whatever was written is a correct prefix.
    let data = pseudo_random(GOOD_BLOCKS * block_size, 5);
    let reference = expected(&data, block_size);
    assert_eq!(&reference[..out.len()], &out[..]);
}

#[test]
fn test_read_failure_on_first_block() {
    let (result, out) = within(|| {
        let mut out = Vec::new();
        let result = Pipeline::new(PipelineConfig::new(16, 8).unwrap())
            .unwrap()
            .run(FailingReader, &mut out);
        (result, out)
    });

    assert!(result.unwrap_err().is_read());
    assert!(out.is_empty());
}

#[test]
fn test_write_failure_cancels_pipeline() {
    let result = within(|| {
        let data = pseudo_random(1 << 20, 11);
        let config = PipelineConfig::new(64, 4).unwrap();
        Pipeline::new(config)
            .unwrap()
            .run(Cursor::new(data), FullDisk { budget: 100 })
    });

    assert!(result.unwrap_err().is_write());
}

#[test]
fn test_panicking_hasher_does_not_hang() {
    struct Fragile;

    impl BlockHasher for Fragile {
        fn digest(&self, block: &[u8]) -> Digest {
            assert!(block[0] != 0xFF, "poisoned block");
            Md5Hasher::hash(block)
        }
    }

    let result = within(|| {
        let mut data = vec![0u8; 64 * 100];
        data[64 * 37] = 0xFF;
        let config = PipelineConfig::new(64, 4).unwrap();
        Pipeline::with_hasher(config, Fragile)
            .unwrap()
            .run(Cursor::new(data), io::sink())
    });

    assert!(matches!(
        result,
        Err(DigestError::WorkerPanicked { stage: "digest" })
    ));
}

// ============================================================================
// Concurrency Stress
// ============================================================================

#[test]
fn test_jittered_workers_stay_in_order() {
    let data = pseudo_random(300 * 128, 77);

    for workers in [2, 4, 8] {
        let config = PipelineConfig::new(128, workers).unwrap();
        let mut out = Vec::new();
        let summary = Pipeline::with_hasher(config, Jittery { max_micros: 500 })
            .unwrap()
            .run(Cursor::new(&data), &mut out)
            .unwrap();

        assert_eq!(out, expected(&data, 128), "workers={workers}");
        assert_eq!(summary.blocks, 300);
    }
}

#[test]
fn test_pending_set_bounded_by_window() {
    let data = pseudo_random(500 * 32, 3);

    for (workers, window) in [(4, 4), (4, 16), (8, 8)] {
        let config = PipelineConfig::new(32, workers).unwrap().with_window(window);
        let mut out = Vec::new();
        let summary = Pipeline::with_hasher(config, Jittery { max_micros: 300 })
            .unwrap()
            .run(Cursor::new(&data), &mut out)
            .unwrap();

        assert!(
            summary.max_pending < window,
            "max_pending={} window={window}",
            summary.max_pending
        );
        assert_eq!(out, expected(&data, 32));
    }
}

#[test]
fn test_window_smaller_than_pool() {
    let data = pseudo_random(10_000, 8);
    let config = PipelineConfig::new(100, 8).unwrap().with_window(2);
    let mut out = Vec::new();
    Pipeline::new(config)
        .unwrap()
        .run(Cursor::new(&data), &mut out)
        .unwrap();

    assert_eq!(out, expected(&data, 100));
}
