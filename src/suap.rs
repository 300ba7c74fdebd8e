//! SUAP: Statically/Uniformly Assigned Private pool.
//!
//! The simplest threaded pool in the family. `execute` slices the batch into
//! even contiguous chunks up front and hands each launched worker exactly one
//! "master" closure over its chunk — after that there is no coordination
//! beyond a shared completion counter. No stealing, no rebalancing: a skewed
//! batch stays skewed, which is exactly what the work-stealing pool exists to
//! fix.
//!
//! Workers block between sessions on their single-slot [`Channel`], the one
//! OS-blocking wait in the crate. The submitting thread spin-waits on the
//! completion counter, same as the work-stealing pool's session wait.

use crate::channel::Channel;
use crate::pool::{Pool, PoolStatus, WorkerStatus};
use crate::task::RawTask;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Control message delivered through a worker's launch channel.
enum Directive {
    /// Run one session master closure, then return to waiting.
    Run(RawTask),
    /// Exit the worker loop.
    Quit,
}

/// Statically partitioned pool.
pub struct SuapPool {
    worker_count: usize,
    channels: Vec<Arc<Channel<Directive>>>,
    threads: Vec<JoinHandle<()>>,
    tasks_done: Vec<Arc<AtomicU64>>,
}

impl SuapPool {
    /// Create a pool with the given worker count. Panics if zero.
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0, "workers must be > 0");
        Self {
            worker_count: workers,
            channels: Vec::new(),
            threads: Vec::new(),
            tasks_done: Vec::new(),
        }
    }

    fn started(&self) -> bool {
        !self.threads.is_empty()
    }
}

impl Pool for SuapPool {
    fn start(&mut self) {
        assert!(!self.started(), "pool already started");
        assert!(self.channels.is_empty());

        info!("suap: starting {} workers", self.worker_count);
        for worker_id in 0..self.worker_count {
            let channel = Arc::new(Channel::new());
            self.channels.push(Arc::clone(&channel));
            self.tasks_done.push(Arc::new(AtomicU64::new(0)));

            let handle = thread::Builder::new()
                .name(format!("suap-worker-{worker_id}"))
                .spawn(move || loop {
                    match channel.recv() {
                        Directive::Run(master) => master(),
                        Directive::Quit => {
                            debug!("suap: worker {worker_id} quitting");
                            return;
                        }
                    }
                })
                .expect("failed to spawn worker thread");
            self.threads.push(handle);
        }
    }

    fn terminate(&mut self) {
        for channel in &self.channels {
            let sent = channel.try_send(Directive::Quit).is_ok();
            assert!(sent, "suap worker channel busy at terminate");
        }
        for handle in self.threads.drain(..) {
            handle.join().expect("suap worker thread panicked");
        }
        self.channels.clear();
        self.tasks_done.clear();
    }

    fn execute(&mut self, tasks: Vec<RawTask>) {
        assert!(!tasks.is_empty(), "cannot execute an empty batch");
        assert!(self.started(), "pool not started");

        let num_tasks = tasks.len();
        let chunk_size = (num_tasks - 1) / self.worker_count + 1;
        let workers_done = Arc::new(AtomicUsize::new(0));

        // Carve the batch into contiguous chunks and launch one master
        // closure per non-empty chunk. Trailing workers may get nothing this
        // session; they simply keep waiting on their channel.
        let mut launched = 0;
        let mut iter = tasks.into_iter();
        loop {
            let chunk: Vec<RawTask> = iter.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }

            let workers_done = Arc::clone(&workers_done);
            let counter = Arc::clone(&self.tasks_done[launched]);
            let master: RawTask = Box::new(move || {
                for task in chunk {
                    task();
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                workers_done.fetch_add(1, Ordering::Release);
            });

            let sent = self.channels[launched]
                .try_send(Directive::Run(master))
                .is_ok();
            assert!(sent, "suap worker {launched} still busy from a previous session");
            launched += 1;
        }
        debug!("suap: session launched on {launched} workers, {num_tasks} tasks");

        // Synchronize: the session ends when every launched master reports.
        while workers_done.load(Ordering::Acquire) != launched {
            std::hint::spin_loop();
        }
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            pool: "suap",
            started: self.started(),
            workers: self
                .tasks_done
                .iter()
                .enumerate()
                .map(|(worker_id, counter)| WorkerStatus {
                    worker_id,
                    alive: self.started(),
                    tasks_done: counter.load(Ordering::Relaxed),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn workers(&self) -> usize {
        self.worker_count
    }
}

impl Drop for SuapPool {
    fn drop(&mut self) {
        if self.started() {
            self.terminate();
        }
    }
}
