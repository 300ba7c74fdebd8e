//! WSPDR worker: private deque plus the receiver-initiated steal protocol.
//!
//! # Ownership split
//!
//! Each worker is two halves:
//!
//! - [`Worker`]: thread-private state — the task deque, the RNG, the steal
//!   policy. The deque is a plain `VecDeque`; no other thread ever touches
//!   it. The owner pushes/pops at the back (LIFO, hot end) and pops from the
//!   front only while answering a steal request, so victims lose their
//!   *oldest* work, not their hottest.
//! - [`WorkerShared`]: the cross-thread face, held in the pool's roster.
//!   Everything here is a single-word atomic or a [`Slot`] handoff cell; the
//!   steal path takes no locks.
//!
//! # Steal protocol (receiver-initiated)
//!
//! ```text
//! requester                             victim
//! ─────────                             ──────
//! pick random victim
//! victim alive? advertises tasks?
//! CAS victim.steal_req: NONE -> my id   (exclusive: one requester at a time)
//! spin on own loot cell ──────────────► communicate():
//!   (interleaving communicate()          swap steal_req -> NONE
//!    to answer other requesters)         pop front (1 or len/2, stop at
//!                                        anchored), put into requester loot
//! drain loot into own deque ◄────────── refresh has_tasks hint
//! ```
//!
//! The victim services requests from inside its own run loop: once per task
//! execution while busy, and on every retry while idle — including while it
//! is itself waiting on a loot cell, which is what prevents circular waits.
//!
//! # Shutdown handshake
//!
//! A stopping worker must win its own request slot via CAS before declaring
//! itself dead. A peer that raced the alive check and parked a request gets
//! a response (the failed CAS routes through `communicate`), and once the
//! worker holds its own slot no later peer can register against it.

use super::slot::Slot;
use super::StealPolicy;
use crate::pool::WorkerStatus;
use crate::rng::XorShift64;
use crate::task::{Task, WorkerProxy};
use crossbeam_utils::CachePadded;
use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Sentinel for an empty steal-request slot.
pub(crate) const NO_REQUEST: usize = usize::MAX;

/// A queued task plus its steal eligibility.
///
/// Anchored holders are never handed to a requester — they exist so an
/// external thread can inject a bootstrap task knowing it will run on
/// exactly that worker.
pub(crate) struct TaskHolder {
    pub(crate) task: Task,
    pub(crate) anchored: bool,
}

/// Immutable-after-construction peer roster: one shared entry per worker,
/// addressed by worker id.
pub(crate) type Roster = Arc<Vec<CachePadded<WorkerShared>>>;

/// Cross-thread-visible half of a worker.
pub(crate) struct WorkerShared {
    /// Requester id parked here, or [`NO_REQUEST`]. Exclusive via CAS.
    pub(crate) steal_req: AtomicUsize,
    /// Best-effort hint that the deque is non-empty. Not authoritative.
    pub(crate) has_tasks: AtomicBool,
    /// Steal response delivered by a victim; owner spins on this while
    /// a request is outstanding.
    pub(crate) loot: Slot<Vec<Task>>,
    /// External task injection (see [`WorkerShared::send_task`]).
    pub(crate) mailbox: Slot<TaskHolder>,
    /// Cooperative stop signal, set by the pool at terminate.
    pub(crate) stop: AtomicBool,
    /// False until the run loop starts, false again once terminating.
    pub(crate) alive: AtomicBool,
    pub(crate) tasks_done: AtomicU64,
    pub(crate) steal_attempts: AtomicU64,
    pub(crate) steal_successes: AtomicU64,
}

impl WorkerShared {
    pub(crate) fn new() -> Self {
        Self {
            steal_req: AtomicUsize::new(NO_REQUEST),
            has_tasks: AtomicBool::new(false),
            loot: Slot::new(),
            mailbox: Slot::new(),
            stop: AtomicBool::new(false),
            alive: AtomicBool::new(false),
            tasks_done: AtomicU64::new(0),
            steal_attempts: AtomicU64::new(0),
            steal_successes: AtomicU64::new(0),
        }
    }

    /// Inject a task from outside the worker thread.
    ///
    /// Only legal against a worker with no queued work (idle or
    /// newly started); asserted via the `has_tasks` hint plus the mailbox's
    /// own single-pending assert. The run loop drains the mailbox before
    /// attempting any steal, so an anchored task runs on exactly this worker.
    pub(crate) fn send_task(&self, task: Task, anchored: bool) {
        assert!(
            !self.has_tasks.load(Ordering::Acquire),
            "send_task requires an idle worker with an empty deque"
        );
        self.mailbox.put(TaskHolder { task, anchored });
    }

    pub(crate) fn status(&self, worker_id: usize) -> WorkerStatus {
        let req = self.steal_req.load(Ordering::Relaxed);
        WorkerStatus {
            worker_id,
            alive: self.alive.load(Ordering::Relaxed),
            has_tasks: self.has_tasks.load(Ordering::Relaxed),
            // The slot holding the worker's own id is the termination guard,
            // not a pending request.
            pending_request: (req != NO_REQUEST && req != worker_id).then_some(req),
            loot_pending: self.loot.is_full(),
            tasks_done: self.tasks_done.load(Ordering::Relaxed),
            steal_attempts: self.steal_attempts.load(Ordering::Relaxed),
            steal_successes: self.steal_successes.load(Ordering::Relaxed),
        }
    }
}

/// Thread-private half of a worker; `run` is the thread body.
pub(crate) struct Worker {
    id: usize,
    deque: VecDeque<TaskHolder>,
    roster: Roster,
    rng: XorShift64,
    policy: StealPolicy,
}

impl Worker {
    pub(crate) fn new(id: usize, roster: Roster, rng: XorShift64, policy: StealPolicy) -> Self {
        debug_assert!(id < roster.len());
        Self {
            id,
            deque: VecDeque::new(),
            roster,
            rng,
            policy,
        }
    }

    fn shared(&self) -> &WorkerShared {
        &self.roster[self.id]
    }

    /// Worker event loop. Returns only after a stop signal is honored.
    pub(crate) fn run(&mut self) {
        self.shared().alive.store(true, Ordering::Release);
        debug!("wspdr: worker {} running", self.id);

        loop {
            // Acquire loop: leave only with local work, or for good.
            while self.deque.is_empty() {
                self.drain_mailbox();
                if !self.deque.is_empty() {
                    break;
                }
                if self.shared().stop.load(Ordering::Acquire) {
                    self.shutdown();
                    return;
                }
                self.try_acquire_once();
            }

            // Busy: newest-first for the owner (LIFO keeps the hot end
            // local; the front stays the steal end).
            let holder = self.deque.pop_back().expect("deque checked non-empty");
            self.refresh_has_tasks();
            // Service a pending request before the task body so requesters
            // see bounded latency even under long-running tasks.
            self.communicate();

            let mut proxy = WorkerProxy::default();
            (holder.task)(&mut proxy);
            for task in proxy.into_tasks() {
                self.push_task(task);
            }
            self.shared().tasks_done.fetch_add(1, Ordering::Relaxed);
            trace!(
                "wspdr: worker {} task done, {} queued",
                self.id,
                self.deque.len()
            );
        }
    }

    /// One randomized steal attempt. Returns true if tasks were acquired.
    ///
    /// Losing the CAS or receiving an empty response is normal control flow,
    /// answered by retrying with a fresh victim on the next call.
    fn try_acquire_once(&mut self) -> bool {
        let victim_id = self.rng.next_usize(self.roster.len());
        // Self-steal is not a thing.
        if victim_id != self.id {
            self.shared().steal_attempts.fetch_add(1, Ordering::Relaxed);
            let victim = &self.roster[victim_id];
            let granted = victim.alive.load(Ordering::Acquire)
                && victim.has_tasks.load(Ordering::Acquire)
                && victim
                    .steal_req
                    .compare_exchange(NO_REQUEST, self.id, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();

            if granted {
                // Request parked; spin for the response while still
                // answering peers who parked a request with us.
                let loot = loop {
                    if let Some(tasks) = self.shared().loot.take() {
                        break tasks;
                    }
                    self.communicate();
                    std::hint::spin_loop();
                };

                if !loot.is_empty() {
                    trace!(
                        "wspdr: worker {} acquired {} tasks from worker {}",
                        self.id,
                        loot.len(),
                        victim_id
                    );
                    for task in loot {
                        self.push_task(task);
                    }
                    self.shared().steal_successes.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
            }
        }
        // Keep the protocol live even on a wasted attempt.
        self.communicate();
        false
    }

    /// Answer a pending steal request, if any.
    ///
    /// Called from every scheduling edge: once per busy iteration, on every
    /// idle retry, and while waiting on our own loot cell or the shutdown
    /// guard.
    fn communicate(&mut self) {
        // Atomically read-and-claim the request.
        let requester = self.shared().steal_req.swap(NO_REQUEST, Ordering::AcqRel);
        if requester == NO_REQUEST {
            return;
        }
        debug_assert_ne!(requester, self.id);
        let loot = self.collect_loot();
        self.roster[requester].loot.put(loot);
        self.refresh_has_tasks();
    }

    /// Pop the front (oldest, steal-eligible end) of the deque per policy.
    ///
    /// An anchored holder halts the scan: the response may come back short
    /// or empty, never containing an anchored task.
    fn collect_loot(&mut self) -> Vec<Task> {
        if self.deque.is_empty() {
            return Vec::new();
        }
        let want = match self.policy {
            StealPolicy::StealOne => 1,
            // Integer division: an eligible length of 1 degenerates to an
            // empty response. Pinned by a test below.
            StealPolicy::StealHalf => self.deque.len() / 2,
        };
        let mut loot = Vec::with_capacity(want);
        for _ in 0..want {
            match self.deque.front() {
                Some(holder) if !holder.anchored => {
                    let holder = self.deque.pop_front().expect("front just checked");
                    loot.push(holder.task);
                }
                _ => break,
            }
        }
        loot
    }

    /// Move an externally injected task from the mailbox into the deque.
    fn drain_mailbox(&mut self) {
        if let Some(holder) = self.shared().mailbox.take() {
            debug_assert!(
                self.deque.is_empty(),
                "mailbox delivery into a non-empty deque"
            );
            self.deque.push_back(holder);
            self.refresh_has_tasks();
        }
    }

    /// Owner-side push to the back of the deque (never anchored).
    fn push_task(&mut self, task: Task) {
        self.deque.push_back(TaskHolder {
            task,
            anchored: false,
        });
        self.refresh_has_tasks();
    }

    fn refresh_has_tasks(&mut self) {
        let has = !self.deque.is_empty();
        if self.shared().has_tasks.load(Ordering::Relaxed) != has {
            self.shared().has_tasks.store(has, Ordering::Release);
        }
    }

    /// CAS-guarded termination: die only while holding our own request slot.
    fn shutdown(&mut self) {
        self.shared().alive.store(false, Ordering::Release);
        while self
            .shared()
            .steal_req
            .compare_exchange(NO_REQUEST, self.id, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // A peer raced us: answer it (empty — the deque is drained),
            // then try to take the slot again.
            self.communicate();
        }
        debug!("wspdr: worker {} terminated", self.id);
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::task::from_raw;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn roster(n: usize) -> Roster {
        Arc::new((0..n).map(|_| CachePadded::new(WorkerShared::new())).collect())
    }

    fn worker(id: usize, roster: &Roster, policy: StealPolicy) -> Worker {
        Worker::new(id, Arc::clone(roster), XorShift64::new(1), policy)
    }

    fn noop() -> Task {
        from_raw(Box::new(|| {}))
    }

    fn seed(w: &mut Worker, count: usize, anchored_first: bool) {
        for i in 0..count {
            w.deque.push_back(TaskHolder {
                task: noop(),
                anchored: anchored_first && i == 0,
            });
        }
        w.refresh_has_tasks();
    }

    #[test]
    fn communicate_hands_half_from_the_front() {
        let roster = roster(2);
        let mut victim = worker(0, &roster, StealPolicy::StealHalf);
        seed(&mut victim, 4, false);

        roster[0].steal_req.store(1, Ordering::Release);
        victim.communicate();

        let loot = roster[1].loot.take().expect("response delivered");
        assert_eq!(loot.len(), 2);
        assert_eq!(victim.deque.len(), 2);
        // Slot cleared for the next requester.
        assert_eq!(roster[0].steal_req.load(Ordering::Relaxed), NO_REQUEST);
        assert!(roster[0].has_tasks.load(Ordering::Relaxed));
    }

    #[test]
    fn steal_one_policy_takes_exactly_one() {
        let roster = roster(2);
        let mut victim = worker(0, &roster, StealPolicy::StealOne);
        seed(&mut victim, 4, false);

        roster[0].steal_req.store(1, Ordering::Release);
        victim.communicate();

        assert_eq!(roster[1].loot.take().expect("response").len(), 1);
        assert_eq!(victim.deque.len(), 3);
    }

    #[test]
    fn empty_deque_answers_with_empty_loot() {
        let roster = roster(2);
        let mut victim = worker(0, &roster, StealPolicy::StealHalf);

        roster[0].steal_req.store(1, Ordering::Release);
        victim.communicate();

        assert!(roster[1].loot.take().expect("response").is_empty());
    }

    #[test]
    fn anchored_holder_halts_the_scan() {
        let roster = roster(2);
        let mut victim = worker(0, &roster, StealPolicy::StealHalf);
        // Anchored bootstrap at the front plus stealable follow-ups behind.
        seed(&mut victim, 5, true);

        roster[0].steal_req.store(1, Ordering::Release);
        victim.communicate();

        // The anchored holder is first in steal order, so the response is
        // empty and the whole deque survives.
        assert!(roster[1].loot.take().expect("response").is_empty());
        assert_eq!(victim.deque.len(), 5);
        assert!(victim.deque.front().expect("front").anchored);
    }

    #[test]
    fn steal_half_single_task_yields_nothing() {
        // len / 2 == 0: the lone task stays put and the requester gets an
        // empty response. Known starvation edge of the half policy; this
        // test pins the behavior.
        let roster = roster(2);
        let mut victim = worker(0, &roster, StealPolicy::StealHalf);
        seed(&mut victim, 1, false);

        roster[0].steal_req.store(1, Ordering::Release);
        victim.communicate();

        assert!(roster[1].loot.take().expect("response").is_empty());
        assert_eq!(victim.deque.len(), 1);
    }

    #[test]
    fn request_slot_grants_exactly_one_requester() {
        let shared = WorkerShared::new();
        shared.has_tasks.store(true, Ordering::Release);

        let wins: usize = thread::scope(|s| {
            let handles: Vec<_> = (1..=2)
                .map(|requester| {
                    let shared = &shared;
                    s.spawn(move || {
                        shared
                            .steal_req
                            .compare_exchange(
                                NO_REQUEST,
                                requester,
                                Ordering::AcqRel,
                                Ordering::Acquire,
                            )
                            .is_ok() as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(wins, 1, "the request slot CAS must be exclusive");
    }

    #[test]
    fn run_executes_bootstrap_and_spawned_followups() {
        let roster = roster(1);
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let bootstrap: Task = Box::new(move |proxy| {
            h.fetch_add(1, Ordering::Relaxed);
            for _ in 0..3 {
                let h = Arc::clone(&h);
                proxy.spawn_raw(Box::new(move || {
                    h.fetch_add(1, Ordering::Relaxed);
                }));
            }
        });

        roster[0].send_task(bootstrap, true);
        // Stop is only honored once the deque drains, so all four tasks run.
        roster[0].stop.store(true, Ordering::Release);

        let mut w = worker(0, &roster, StealPolicy::StealHalf);
        let handle = thread::spawn(move || w.run());
        handle.join().unwrap();

        assert_eq!(hits.load(Ordering::Relaxed), 4);
        assert_eq!(roster[0].tasks_done.load(Ordering::Relaxed), 4);
        assert!(!roster[0].alive.load(Ordering::Relaxed));
        // Termination guard: the worker died holding its own slot.
        assert_eq!(roster[0].steal_req.load(Ordering::Relaxed), 0);
    }

    #[test]
    #[should_panic(expected = "idle worker")]
    fn send_task_against_busy_worker_asserts() {
        let roster = roster(1);
        roster[0].has_tasks.store(true, Ordering::Release);
        roster[0].send_task(noop(), false);
    }
}
