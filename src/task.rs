//! Task forms shared by every pool.
//!
//! Two shapes of work unit:
//!
//! - [`RawTask`]: a plain side-effecting closure, run at most once.
//! - [`Task`]: additionally receives a [`WorkerProxy`] through which it may
//!   enqueue follow-up tasks onto the worker executing it. This is what makes
//!   dynamic task graphs possible — the batch fan-out task in the
//!   work-stealing pool is itself a `Task` that spawns the whole session
//!   through its proxy.
//!
//! Ownership is strictly move-in: once submitted, the caller has no handle to
//! a task. Tasks cross threads when stolen, hence the `Send` bound.

/// A unit of work with no return value, invoked at most once.
pub type RawTask = Box<dyn FnOnce() + Send + 'static>;

/// A worker-aware task: runs like a [`RawTask`] but may spawn follow-ups
/// onto the executing worker via the proxy.
pub type Task = Box<dyn FnOnce(&mut WorkerProxy) + Send + 'static>;

/// Adapt a raw task into the worker-aware form (the proxy is ignored).
pub fn from_raw(raw: RawTask) -> Task {
    Box::new(move |_proxy: &mut WorkerProxy| raw())
}

/// Ephemeral per-invocation spawn buffer.
///
/// Created immediately before a task body runs, drained onto the executing
/// worker's deque immediately after. Never outlives the invocation.
#[derive(Default)]
pub struct WorkerProxy {
    tasks: Vec<Task>,
}

impl WorkerProxy {
    /// Enqueue a worker-aware follow-up task.
    pub fn spawn(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Enqueue a raw follow-up task.
    pub fn spawn_raw(&mut self, raw: RawTask) {
        self.tasks.push(from_raw(raw));
    }

    /// Number of tasks spawned so far in this invocation.
    pub fn spawned(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}
