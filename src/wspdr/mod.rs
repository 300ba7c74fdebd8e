//! WSPDR: Work-Stealing Private-Deque pool, receiver-initiated.
//!
//! The core scheduler of the family. Each worker owns a private deque and an
//! OS thread; idle workers issue randomized steal requests, and busy workers
//! answer them from inside their own run loop — see [`worker`] for the
//! protocol. The pool here is only orchestration: build the shared roster,
//! spawn the threads, seed each session, spin-wait for completion.
//!
//! # Session anatomy
//!
//! `execute` wraps every submitted task with a completion-counter increment,
//! packages the wrapped batch into a single worker-aware *scheduler task*,
//! and injects that task — anchored, so it cannot be stolen — into worker
//! 0's mailbox. When it runs, it fans the whole batch onto worker 0's deque
//! through its proxy, making the tasks stealable immediately; load then
//! spreads through the steal protocol. The submitting thread spins on the
//! counter until the batch is done. Spinning is a deliberate
//! latency/throughput tradeoff, not an oversight: the steal path never
//! blocks on an OS primitive.

mod slot;
mod worker;

use worker::{Roster, Worker, WorkerShared};

use crate::pool::{Pool, PoolStatus};
use crate::rng::XorShift64;
use crate::task::{RawTask, Task, WorkerProxy};
use crossbeam_utils::CachePadded;
use log::{debug, info};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// How much of a victim's eligible deque one granted request takes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StealPolicy {
    /// Exactly one task (the oldest).
    StealOne,
    /// Half the deque by integer division — the default. An eligible length
    /// of 1 yields an empty response; see the worker tests.
    #[default]
    StealHalf,
}

/// Pool configuration with conservative defaults.
#[derive(Clone, Copy, Debug)]
pub struct WspdrConfig {
    /// Number of workers, each bound to one OS thread.
    pub workers: usize,
    pub policy: StealPolicy,
    /// Master seed; per-worker victim-selection RNGs are forked from it,
    /// so a fixed seed gives a reproducible steal pattern (modulo timing).
    pub seed: u64,
}

impl Default for WspdrConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            policy: StealPolicy::default(),
            seed: 0x853c49e6748fea9b,
        }
    }
}

impl WspdrConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Panics on invalid values.
    pub fn validate(&self) {
        assert!(self.workers > 0, "workers must be > 0");
    }
}

/// Work-stealing pool.
///
/// # Lifecycle
///
/// `new` → `start` → any number of `execute` sessions → `terminate`
/// (explicit or via `Drop`). `start` after `terminate` is allowed.
pub struct WspdrPool {
    config: WspdrConfig,
    /// `Some` while started. Workers hold their own clones of the roster.
    roster: Option<Roster>,
    threads: Vec<JoinHandle<()>>,
}

impl WspdrPool {
    /// Pool with default policy and seed.
    pub fn new(workers: usize) -> Self {
        Self::with_config(WspdrConfig::new(workers))
    }

    pub fn with_config(config: WspdrConfig) -> Self {
        config.validate();
        Self {
            config,
            roster: None,
            threads: Vec::new(),
        }
    }
}

impl Pool for WspdrPool {
    fn start(&mut self) {
        assert!(self.roster.is_none(), "pool already started");
        assert!(self.threads.is_empty());

        let n = self.config.workers;
        info!("wspdr: starting {n} workers, policy {:?}", self.config.policy);

        let roster: Roster = Arc::new(
            (0..n)
                .map(|_| CachePadded::new(WorkerShared::new()))
                .collect(),
        );

        let mut seeder = XorShift64::new(self.config.seed);
        for worker_id in 0..n {
            let mut worker = Worker::new(
                worker_id,
                Arc::clone(&roster),
                seeder.fork(),
                self.config.policy,
            );
            let handle = thread::Builder::new()
                .name(format!("wspdr-worker-{worker_id}"))
                .spawn(move || worker.run())
                .expect("failed to spawn worker thread");
            self.threads.push(handle);
        }

        self.roster = Some(roster);
    }

    fn terminate(&mut self) {
        let Some(roster) = self.roster.take() else {
            return;
        };
        debug!("wspdr: terminating {} workers", roster.len());
        for shared in roster.iter() {
            shared.stop.store(true, Ordering::Release);
        }
        for handle in self.threads.drain(..) {
            handle.join().expect("wspdr worker thread panicked");
        }
    }

    fn execute(&mut self, tasks: Vec<RawTask>) {
        assert!(!tasks.is_empty(), "cannot execute an empty batch");
        let roster = self.roster.as_ref().expect("pool not started");

        let total = tasks.len();
        let done = Arc::new(AtomicUsize::new(0));

        // Fold session synchronization into the tasks themselves.
        let synced: Vec<Task> = tasks
            .into_iter()
            .map(|task| {
                let done = Arc::clone(&done);
                Box::new(move |_: &mut WorkerProxy| {
                    task();
                    done.fetch_add(1, Ordering::Release);
                }) as Task
            })
            .collect();

        // One scheduler task fans the batch out from worker 0's deque, where
        // every task is immediately up for stealing. It must be anchored:
        // were it stolen before running, the fan-out would race the session.
        let scheduler_task: Task = Box::new(move |proxy: &mut WorkerProxy| {
            for task in synced {
                proxy.spawn(task);
            }
            debug!("wspdr: session fan-out done, {} tasks queued", proxy.spawned());
        });
        roster[0].send_task(scheduler_task, true);

        // Session barrier: deliberate spin, see module docs.
        while done.load(Ordering::Acquire) != total {
            std::hint::spin_loop();
        }
        debug!("wspdr: session of {total} tasks complete");
    }

    fn status(&self) -> PoolStatus {
        let workers = match &self.roster {
            Some(roster) => roster
                .iter()
                .enumerate()
                .map(|(worker_id, shared)| shared.status(worker_id))
                .collect(),
            None => Vec::new(),
        };
        PoolStatus {
            pool: "wspdr",
            started: self.roster.is_some(),
            workers,
        }
    }

    fn workers(&self) -> usize {
        self.config.workers
    }
}

impl Drop for WspdrPool {
    fn drop(&mut self) {
        self.terminate();
    }
}
