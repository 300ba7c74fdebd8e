//! Batch task-parallel execution pools over fixed worker-thread sets.
//!
//! ## Scope
//! Three schedulers behind one [`Pool`] contract, each running a batch of
//! independent closures to completion before `execute` returns:
//!
//! - [`SerialPool`]: in-caller-thread baseline.
//! - [`SuapPool`]: static even partition, one master closure per worker,
//!   launched through a single-slot backpressured [`Channel`].
//! - [`WspdrPool`]: the core — work-stealing private deques with a
//!   receiver-initiated request/response protocol. Idle workers park steal
//!   requests in a victim's atomic slot (exclusive via CAS); the victim
//!   answers from inside its own run loop by popping its oldest tasks into
//!   the requester's handoff cell.
//!
//! ## Key invariants
//! - Every submitted task runs exactly once; `execute` returns only after
//!   the whole batch completed. No cross-worker ordering guarantees; a
//!   worker drains its own deque LIFO.
//! - A worker's deque is touched by its own thread only. Cross-thread
//!   coordination goes through single-word atomics and one-value handoff
//!   cells; the steal path takes no locks.
//! - Anchored tasks are never stolen — the session bootstrap relies on it.
//! - Shutdown is a CAS-guarded handshake, race-free against in-flight
//!   steal requests.
//!
//! ## Design trade-offs
//! Idle workers and the submitting thread spin on atomics instead of
//! parking; that burns CPU while idle but keeps steal and completion
//! latency free of wakeup costs. Task bodies are trusted: the scheduler
//! does not catch panics, retry failures, cancel, or prioritize.
//!
//! Contract violations (empty batch, double `start`, injecting into a busy
//! worker) are programmer errors and abort via assertion rather than
//! surfacing as `Result`s.

pub mod channel;
pub mod pool;
pub mod rng;
pub mod serial;
pub mod suap;
pub mod task;
pub mod timer;
pub mod wspdr;

pub use channel::Channel;
pub use pool::{Pool, PoolStatus, WorkerStatus};
pub use serial::SerialPool;
pub use suap::SuapPool;
pub use task::{from_raw, RawTask, Task, WorkerProxy};
pub use timer::Timer;
pub use wspdr::{StealPolicy, WspdrConfig, WspdrPool};
