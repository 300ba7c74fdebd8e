//! Cross-scheduler equivalence on a sharded Collatz reduction.
//!
//! The same shard closures must produce a bit-identical total whether run
//! serially, serially in place, through the static-partition pool, or
//! through the work-stealing pool. Step counts are integers, so "identical"
//! really means identical — any lost, duplicated, or corrupted shard shows
//! up in the sum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use taskpool::{Pool, RawTask, SerialPool, SuapPool, Timer, WspdrPool};

/// Total Collatz steps to reach 1 for every number in `[lower, upper)`.
fn collatz_steps(lower: usize, upper: usize) -> usize {
    let mut steps = 0;
    for i in lower..upper {
        if i == 0 {
            continue;
        }
        let mut num = i;
        while num != 1 {
            if num % 2 == 0 {
                num /= 2;
            } else {
                num = num * 3 + 1;
            }
            steps += 1;
        }
    }
    steps
}

fn shard_batch(num_shards: usize, shard_size: usize, result: &Arc<AtomicUsize>) -> Vec<RawTask> {
    (0..num_shards)
        .map(|i| {
            let result = Arc::clone(result);
            Box::new(move || {
                result.fetch_add(
                    collatz_steps(i * shard_size, (i + 1) * shard_size),
                    Ordering::Relaxed,
                );
            }) as RawTask
        })
        .collect()
}

fn run_equivalence(num_shards: usize, shard_size: usize) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut timer = Timer::new("collatz_equivalence");
    let result = Arc::new(AtomicUsize::new(0));

    // Ground truth: one pass over the whole range.
    let serial_total = collatz_steps(0, num_shards * shard_size);
    timer.elapsed_previous("serial");

    // The same shard closures, run in place.
    result.store(0, Ordering::Relaxed);
    for task in shard_batch(num_shards, shard_size, &result) {
        task();
    }
    let serial_chunk_total = result.load(Ordering::Relaxed);
    timer.elapsed_previous("serial_chunk");

    // Static partition.
    result.store(0, Ordering::Relaxed);
    let mut suap = SuapPool::new(4);
    suap.start();
    suap.execute(shard_batch(num_shards, shard_size, &result));
    suap.terminate();
    let suap_total = result.load(Ordering::Relaxed);
    timer.elapsed_previous("suap");

    // Work stealing.
    result.store(0, Ordering::Relaxed);
    let mut wspdr = WspdrPool::new(4);
    wspdr.start();
    wspdr.execute(shard_batch(num_shards, shard_size, &result));
    wspdr.terminate();
    let wspdr_total = result.load(Ordering::Relaxed);
    timer.elapsed_previous("wspdr");

    assert_eq!(serial_total, serial_chunk_total);
    assert_eq!(serial_total, suap_total);
    assert_eq!(serial_total, wspdr_total);
}

#[test]
fn schedulers_agree_on_collatz_reduction() {
    run_equivalence(5_000, 40);
}

/// Full-size scenario: 50000 shards of 200 numbers each.
/// Expensive; run with `cargo test -- --ignored`.
#[test]
#[ignore]
fn schedulers_agree_on_collatz_reduction_full() {
    run_equivalence(50_000, 200);
}

/// The serial baseline pool is interchangeable with in-place execution.
#[test]
fn serial_pool_matches_inline_execution() {
    let result = Arc::new(AtomicUsize::new(0));
    let mut pool = SerialPool::new();
    pool.start();
    pool.execute(shard_batch(100, 50, &result));
    pool.terminate();
    assert_eq!(result.load(Ordering::Relaxed), collatz_steps(0, 100 * 50));
}
