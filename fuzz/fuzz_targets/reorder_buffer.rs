#![no_main]

use blocksum::ReorderBuffer;
use libfuzzer_sys::fuzz_target;

// Arrival order is 0..n sorted by the fuzzer-chosen keys.
fuzz_target!(|keys: Vec<u16>| {
    let total = keys.len() as u64;
    let mut arrivals: Vec<(u16, u64)> = keys.into_iter().zip(0..total).collect();
    arrivals.sort();

    let mut buffer = ReorderBuffer::new();
    let mut released = Vec::with_capacity(arrivals.len());
    for (_, sequence) in arrivals {
        buffer.push(sequence, sequence).unwrap();
        released.extend(buffer.drain_ready());
        assert!(buffer.push(sequence, sequence).is_err());
    }

    assert!(released.into_iter().eq(0..total));
    assert_eq!(buffer.finish().unwrap(), total);
});
