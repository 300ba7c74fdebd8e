//! Serial baseline pool: runs the batch in the calling thread.
//!
//! Reference implementation for the [`Pool`] contract and the yardstick the
//! equivalence tests compare the parallel pools against. Submission order is
//! execution order.

use crate::pool::{Pool, PoolStatus, WorkerStatus};
use crate::task::RawTask;

/// Trivial single-thread in-caller-thread executor.
#[derive(Default)]
pub struct SerialPool {
    started: bool,
    tasks_done: u64,
}

impl SerialPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pool for SerialPool {
    fn start(&mut self) {
        assert!(!self.started, "pool already started");
        self.started = true;
    }

    fn terminate(&mut self) {
        self.started = false;
    }

    fn execute(&mut self, tasks: Vec<RawTask>) {
        assert!(!tasks.is_empty(), "cannot execute an empty batch");
        assert!(self.started, "pool not started");

        for task in tasks {
            task();
            self.tasks_done += 1;
        }
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            pool: "serial",
            started: self.started,
            workers: vec![WorkerStatus {
                worker_id: 0,
                alive: self.started,
                tasks_done: self.tasks_done,
                ..Default::default()
            }],
        }
    }

    fn workers(&self) -> usize {
        1
    }
}
