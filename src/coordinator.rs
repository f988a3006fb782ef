//! The coordinator is a single-threaded FIFO queue of notices, drained by
//! whichever thread owns the [`CoordinatorLoop`] (typically a UI or main
//! thread). Workers post callback notices onto it through a
//! [`CoordinatorHandle`].

use std::{
    cell::Cell, collections::VecDeque, fmt, marker::PhantomData, sync::Arc, time::Duration,
};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

pub type Notice = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a posted notice so it can be withdrawn before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(u64);

/// Something that runs posted closures on one fixed execution context.
pub trait Coordinator: Send + Sync {
    /// Enqueues `notice` without waiting for it to run.
    fn post(&self, notice: Notice) -> Result<NoticeId>;

    /// Withdraws a notice that has not started yet. Returns `false` if it
    /// already ran (or is running) or the coordinator is closed.
    fn cancel(&self, id: NoticeId) -> bool;
}

struct State {
    notices: VecDeque<(NoticeId, Notice)>,
    next_id: u64,
    closed: bool,
}

struct Inner {
    state: Mutex<State>,
    posted: Condvar,
}

/// Creates a coordinator. The handle side may be cloned and shared with any
/// number of pools; the loop side stays on the coordinating thread.
pub fn coordinator() -> (CoordinatorHandle, CoordinatorLoop) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State {
            notices: VecDeque::new(),
            next_id: 0,
            closed: false,
        }),
        posted: Condvar::new(),
    });
    (
        CoordinatorHandle {
            inner: Arc::clone(&inner),
        },
        CoordinatorLoop {
            inner,
            _not_sync: PhantomData,
        },
    )
}

#[derive(Clone)]
pub struct CoordinatorHandle {
    inner: Arc<Inner>,
}

impl Coordinator for CoordinatorHandle {
    fn post(&self, notice: Notice) -> Result<NoticeId> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(Error::CoordinatorClosed);
        }
        let id = NoticeId(state.next_id);
        state.next_id += 1;
        state.notices.push_back((id, notice));
        drop(state);
        self.inner.posted.notify_one();
        Ok(id)
    }

    fn cancel(&self, id: NoticeId) -> bool {
        let mut state = self.inner.state.lock();
        match state.notices.iter().position(|(queued, _)| *queued == id) {
            Some(index) => {
                state.notices.remove(index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorHandle").finish_non_exhaustive()
    }
}

/// The draining side of a coordinator. Notices run on the thread calling
/// [`CoordinatorLoop::run_pending`] or [`CoordinatorLoop::run_next`], one at a
/// time, in the order they were posted.
///
/// Dropping the loop closes the coordinator: pending notices are discarded
/// and further posts fail with [`Error::CoordinatorClosed`].
///
/// The loop can be moved to the thread that will drain it but not shared,
/// so notices never run on two threads at once:
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<tidepool::CoordinatorLoop>();
/// ```
pub struct CoordinatorLoop {
    inner: Arc<Inner>,
    _not_sync: PhantomData<Cell<()>>,
}

impl CoordinatorLoop {
    /// Runs every notice queued at the time of the call. Notices posted while
    /// draining are left for the next call. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let batch = self.inner.state.lock().notices.len();
        let mut ran = 0;
        for _ in 0..batch {
            let Some((_, notice)) = self.inner.state.lock().notices.pop_front() else {
                break;
            };
            notice();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for a notice and runs it. Returns `true` if one
    /// ran.
    pub fn run_next(&self, timeout: Duration) -> bool {
        let notice = {
            let mut state = self.inner.state.lock();
            if state.notices.is_empty() {
                let _ = self.inner.posted.wait_while_for(
                    &mut state,
                    |state| state.notices.is_empty(),
                    timeout,
                );
            }
            state.notices.pop_front()
        };
        match notice {
            Some((_, notice)) => {
                notice();
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.state.lock().notices.len()
    }
}

impl Drop for CoordinatorLoop {
    fn drop(&mut self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            std::mem::take(&mut state.notices)
        };
        // Notices may own values whose destructors take the lock again.
        drop(dropped);
    }
}

impl fmt::Debug for CoordinatorLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorLoop")
            .field("pending", &self.pending())
            .finish()
    }
}
