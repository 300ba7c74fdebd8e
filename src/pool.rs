//! Common pool contract and diagnostic status snapshots.
//!
//! Every concrete pool — [`SerialPool`](crate::SerialPool),
//! [`SuapPool`](crate::SuapPool), [`WspdrPool`](crate::WspdrPool) —
//! implements [`Pool`]. The contract is intentionally narrow:
//!
//! - `start` spawns workers and their threads; calling it twice without an
//!   intervening `terminate` is a usage error (asserted).
//! - `execute` is one self-contained synchronous session: it returns only
//!   after every submitted task has run exactly once. Sessions may be
//!   repeated on a started pool.
//! - `terminate` is a cooperative shutdown: signal every worker, join every
//!   thread. Idempotent and safe from `Drop`.
//! - `status` reads atomics only and is safe concurrently with a running
//!   session.
//!
//! No error type crosses this API. Contract violations abort via assertion
//! and task bodies are trusted not to panic; see the crate docs.

use crate::task::RawTask;
use std::fmt;

/// Common contract for batch task-parallel pools.
pub trait Pool {
    /// Spawn workers and their OS threads. Panics if already started.
    fn start(&mut self);

    /// Signal every worker to stop and join every thread. Idempotent.
    fn terminate(&mut self);

    /// Run one session: block until every task in the batch has completed.
    ///
    /// Panics if the batch is empty or the pool is not started.
    fn execute(&mut self, tasks: Vec<RawTask>);

    /// Diagnostic snapshot of per-worker counters and flags.
    fn status(&self) -> PoolStatus;

    /// Configured worker count.
    fn workers(&self) -> usize;
}

/// Point-in-time diagnostic snapshot of a pool.
///
/// Built from atomic reads only; numbers from a running session are
/// best-effort, not a consistent cut.
#[derive(Debug, Clone, Default)]
pub struct PoolStatus {
    /// Pool flavor, e.g. `"wspdr"`.
    pub pool: &'static str,
    /// Whether worker threads are currently spawned.
    pub started: bool,
    pub workers: Vec<WorkerStatus>,
}

/// Per-worker slice of a [`PoolStatus`].
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub worker_id: usize,
    /// Run loop entered and not yet terminating.
    pub alive: bool,
    /// Best-effort hint that the worker's deque is non-empty.
    pub has_tasks: bool,
    /// Requester id currently parked in the steal-request slot, if any.
    pub pending_request: Option<usize>,
    /// A steal response is sitting unconsumed in the loot cell.
    pub loot_pending: bool,
    pub tasks_done: u64,
    pub steal_attempts: u64,
    pub steal_successes: u64,
}

impl PoolStatus {
    /// Sum of completed tasks across workers.
    pub fn tasks_done(&self) -> u64 {
        self.workers.iter().map(|w| w.tasks_done).sum()
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] started={} workers={}",
            self.pool,
            self.started,
            self.workers.len()
        )?;
        for w in &self.workers {
            writeln!(
                f,
                "  worker {}: alive={} has_tasks={} request={} loot_pending={} done={} steals={}/{}",
                w.worker_id,
                w.alive,
                w.has_tasks,
                w.pending_request
                    .map_or_else(|| "none".to_string(), |r| r.to_string()),
                w.loot_pending,
                w.tasks_done,
                w.steal_successes,
                w.steal_attempts,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_is_line_per_worker() {
        let status = PoolStatus {
            pool: "wspdr",
            started: true,
            workers: vec![
                WorkerStatus {
                    worker_id: 0,
                    alive: true,
                    tasks_done: 3,
                    ..Default::default()
                },
                WorkerStatus {
                    worker_id: 1,
                    pending_request: Some(0),
                    ..Default::default()
                },
            ],
        };
        let text = status.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("worker 1"));
        assert!(text.contains("request=0"));
        assert_eq!(status.tasks_done(), 3);
    }
}
