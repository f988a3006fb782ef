//! Unbounded max-priority queue shared by every worker of a pool.
//!
//! The queue also does the pool's thread accounting: the decision to spawn,
//! wake or retire a worker is taken under the same lock that guards the heap,
//! so a worker can never retire while a task it would have picked up is being
//! pushed.

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use parking_lot::{Condvar, Mutex};

use crate::task::PriorityTask;

/// Heap entry. Higher priority is greater; within a priority the older
/// submission is greater so that `BinaryHeap::pop` behaves as FIFO.
struct Entry(PriorityTask);

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority()
            .cmp(&other.0.priority())
            .then_with(|| other.0.seq().cmp(&self.0.seq()))
    }
}

/// What `push` asks the caller to do about worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Provision {
    /// A worker slot was reserved; the caller must spawn a thread for it.
    Spawn,
    /// An existing worker will pick the task up.
    Reuse,
}

struct State {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    workers: usize,
    /// Waiters in `pop` not yet claimed by a `push`.
    idle: usize,
    /// Waiters a `push` has woken that have not reacquired the lock yet.
    woken: usize,
    closed: bool,
}

pub(crate) struct TaskQueue {
    state: Mutex<State>,
    available: Condvar,
    core_size: usize,
    max_size: usize,
    keep_alive: Duration,
}

impl TaskQueue {
    pub fn new(core_size: usize, max_size: usize, keep_alive: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                next_seq: 0,
                workers: 0,
                idle: 0,
                woken: 0,
                closed: false,
            }),
            available: Condvar::new(),
            core_size,
            max_size,
            keep_alive,
        }
    }

    /// Enqueues a new task built from the next sequence number. Never blocks
    /// beyond the lock and never rejects.
    pub fn push<F>(&self, make: F) -> Provision
    where
        F: FnOnce(u64) -> PriorityTask,
    {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Entry(make(seq)));

        let spawn = state.workers < self.core_size
            || (state.idle == 0 && state.workers < self.max_size);
        if spawn {
            state.workers += 1;
            Provision::Spawn
        } else {
            // Claim the waiter now so a burst of pushes does not count the
            // same idle worker twice.
            if state.idle > 0 {
                state.idle -= 1;
                state.woken += 1;
            }
            drop(state);
            self.available.notify_one();
            Provision::Reuse
        }
    }

    /// Puts back a task that was dequeued but not started. Its original
    /// sequence number is kept so it does not lose its place.
    pub fn requeue(&self, task: PriorityTask) {
        self.state.lock().heap.push(Entry(task));
    }

    /// Blocks until a task is available and returns the highest priority one.
    ///
    /// Returns `None` when the calling worker must exit: either the queue was
    /// closed, or the worker sat idle for the keep-alive period while more
    /// than `core_size` workers were alive. The worker count is already
    /// decremented when `None` is returned.
    pub fn pop(&self) -> Option<PriorityTask> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                state.workers -= 1;
                return None;
            }
            if let Some(Entry(task)) = state.heap.pop() {
                return Some(task);
            }

            state.idle += 1;
            let timed_out = self
                .available
                .wait_for(&mut state, self.keep_alive)
                .timed_out();
            if state.woken > 0 {
                state.woken -= 1;
            } else {
                state.idle -= 1;
            }

            if timed_out
                && !state.closed
                && state.heap.is_empty()
                && state.workers > self.core_size
            {
                state.workers -= 1;
                return None;
            }
        }
    }

    /// Gives back a worker slot reserved by [`TaskQueue::push`] whose thread
    /// could not be spawned. Returns the number of workers still alive.
    pub fn release_slot(&self) -> usize {
        let mut state = self.state.lock();
        state.workers -= 1;
        state.workers
    }

    /// Wakes every waiting worker and makes them exit. Queued tasks are
    /// dropped without running.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.heap.clear();
        drop(state);
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn workers(&self) -> usize {
        self.state.lock().workers
    }

    pub fn idle(&self) -> usize {
        self.state.lock().idle
    }
}
