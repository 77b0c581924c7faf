//! Property-based test generators using proptest.
//!
//! WAL traffic is modelled as a list of `(offset, bytes)` writes. The
//! strategies here only produce offsets a sequential write buffer accepts:
//! each write starts at or before the end of everything written so far.

use proptest::prelude::*;
use proptest::sample::Index;

/// One WAL write.
pub type Write = (u64, Vec<u8>);

/// Strategy for WAL file names accepted by the default suffix.
pub fn wal_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}\\.db-wal").expect("Invalid regex")
}

/// Strategy for a single write payload.
pub fn payload_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// Strategy for write sequences with no gaps.
///
/// Offsets are drawn uniformly from `0..=end`, where `end` is the logical
/// size after the preceding writes, so the sequence mixes overwrites and
/// appends.
pub fn gap_free_writes(max_writes: usize, max_len: usize) -> impl Strategy<Value = Vec<Write>> {
    prop::collection::vec((any::<Index>(), payload_strategy(max_len)), 1..=max_writes).prop_map(
        |raw| {
            let mut end = 0u64;
            raw.into_iter()
                .map(|(index, data)| {
                    let offset = index.index(end as usize + 1) as u64;
                    end = end.max(offset + data.len() as u64);
                    (offset, data)
                })
                .collect()
        },
    )
}

/// Strategy for append-only write sequences, as a WAL writing frames
/// back to back would produce.
pub fn append_writes(max_writes: usize, max_len: usize) -> impl Strategy<Value = Vec<Write>> {
    prop::collection::vec(payload_strategy(max_len), 1..=max_writes).prop_map(|payloads| {
        let mut end = 0u64;
        payloads
            .into_iter()
            .map(|data| {
                let offset = end;
                end += data.len() as u64;
                (offset, data)
            })
            .collect()
    })
}

/// Applies `writes` to a plain byte vector, producing the expected log.
pub fn apply_writes(writes: &[Write]) -> Vec<u8> {
    let mut model = Vec::new();
    for (offset, data) in writes {
        let start = *offset as usize;
        let end = start + data.len();
        if model.len() < end {
            model.resize(end, 0);
        }
        model[start..end].copy_from_slice(data);
    }
    model
}
