//! Seeded, reputation-weighted validator selection.
//!
//! Candidates are sampled without replacement with probability proportional
//! to their weight. Each draw hashes `seed || round` with Blake2b and locates
//! the draw in the cumulative weight table with a binary search, so the
//! result depends only on the seed and the (address-sorted) candidate list.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use oracle_types::Address;

type Blake2b256 = Blake2b<U32>;

/// Hash several byte slices into a 32-byte selection seed.
pub fn derive_seed(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

fn draw(seed: &[u8; 32], round: u32) -> u64 {
    let hash = derive_seed(&[seed, &round.to_le_bytes()]);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(bytes)
}

/// Pick up to `count` addresses from `candidates`, weighted, without replacement.
///
/// `candidates` must be sorted by address for the result to be reproducible
/// across nodes. Zero-weight candidates are only chosen once every weighted
/// candidate is exhausted, in list order.
pub fn weighted_sample(candidates: &[(Address, u64)], seed: &[u8; 32], count: usize) -> Vec<Address> {
    let mut remaining: Vec<&(Address, u64)> = candidates.iter().collect();
    let mut selected = Vec::with_capacity(count.min(candidates.len()));

    let mut round = 0u32;
    while selected.len() < count && !remaining.is_empty() {
        let mut cumulative = Vec::with_capacity(remaining.len());
        let mut total = 0u64;
        for (_, weight) in &remaining {
            total = total.saturating_add(*weight);
            cumulative.push(total);
        }

        let index = if total == 0 {
            0
        } else {
            let target = draw(seed, round) % total;
            cumulative.partition_point(|&upper| upper <= target)
        };
        selected.push(remaining.remove(index).0.clone());
        round += 1;
    }
    selected
}
