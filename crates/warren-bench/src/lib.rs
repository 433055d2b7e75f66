//! Benchmark profiles and utilities for Warren pools.
//!
//! Provides pre-built pool shapes so the benches measure access patterns,
//! not setup noise:
//!
//! - [`dense_pool`]: `n` live elements, no holes, slot order = insert order
//! - [`churned_pool`]: `n` live elements after heavy seeded remove/insert
//!   churn (holes, reused slots, stepped generations)
//! - [`handle_sample`]: deterministic sample of live handles for lookup
//!   benches

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use warren_pool::{Handle, Pool};

/// Build a dense pool: `n` elements inserted, none removed.
pub fn dense_pool(n: u32) -> Pool<u64> {
    let mut pool = Pool::new();
    for i in 0..n {
        pool.insert(u64::from(i)).expect("unbounded insert");
    }
    pool
}

/// Build a churned pool: grow to `n` live elements, then run `4 * n`
/// remove/insert pairs driven by a ChaCha8 RNG seeded from `seed`.
///
/// The result still holds exactly `n` live elements, but its free-list
/// history, slot generations, and occupancy holes resemble a pool that
/// has been in service for a while. Identical seeds produce identical
/// pools.
pub fn churned_pool(n: u32, seed: u64) -> Pool<u64> {
    let mut pool = dense_pool(n);
    let mut live: Vec<Handle> = pool.iter().map(|(h, _)| h).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for round in 0..(n as usize * 4) {
        let at = rng.random_range(0..live.len());
        let gone = live.swap_remove(at);
        pool.remove(gone);
        live.push(pool.insert(round as u64).expect("unbounded insert"));
    }
    pool
}

/// Deterministic sample of `k` live handles (with repetition) from `pool`.
pub fn handle_sample(pool: &Pool<u64>, k: usize, seed: u64) -> Vec<Handle> {
    let live: Vec<Handle> = pool.iter().map(|(h, _)| h).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..k)
        .map(|_| live[rng.random_range(0..live.len())])
        .collect()
}
