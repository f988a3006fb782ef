//! Background computations whose lifecycle is reported on a coordinator.
//!
//! A [`CallbackTask`] is run by a worker as follows:
//!
//! 1. the `prepare` hook is posted to the coordinator;
//! 2. `background` runs on the worker thread;
//! 3. if `prepare` is still waiting in the coordinator queue it is withdrawn;
//! 4. `complete` is posted with the value `background` returned.
//!
//! `complete` therefore runs exactly once, with the computed value, as long as
//! the coordinator keeps draining. `prepare` is best effort and runs at most
//! once: a fast background computation on a busy coordinator will skip it.
//! Do not rely on `prepare` having run when `complete` is called.
//!
//! If `background` panics the panic is contained by the worker and `complete`
//! is never called.

use std::{fmt, sync::Arc};

use tracing::warn;

use crate::{
    coordinator::Coordinator,
    task::{Job, Priority},
};

type Prepare = Box<dyn FnOnce() + Send + 'static>;

pub struct CallbackTask<T> {
    prepare: Option<Prepare>,
    background: Box<dyn FnOnce() -> T + Send + 'static>,
    complete: Box<dyn FnOnce(T) + Send + 'static>,
}

impl<T: Send + 'static> CallbackTask<T> {
    pub fn new<B, C>(background: B, complete: C) -> Self
    where
        B: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        Self {
            prepare: None,
            background: Box::new(background),
            complete: Box::new(complete),
        }
    }

    /// Sets the hook announced on the coordinator before `background` starts.
    pub fn on_prepare<P>(mut self, prepare: P) -> Self
    where
        P: FnOnce() + Send + 'static,
    {
        self.prepare = Some(Box::new(prepare));
        self
    }

    /// Erases the task into a pool job that reports to `coordinator`.
    pub(crate) fn into_job(self, priority: Priority, coordinator: Arc<dyn Coordinator>) -> Job {
        Box::new(move || self.dispatch(priority, coordinator.as_ref()))
    }

    fn dispatch(self, priority: Priority, coordinator: &dyn Coordinator) {
        let Self {
            prepare,
            background,
            complete,
        } = self;

        let prepared = prepare.and_then(|prepare| match coordinator.post(prepare) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(%priority, error = %err, "dropping prepare notice");
                None
            }
        });

        let value = background();

        if let Some(id) = prepared {
            coordinator.cancel(id);
        }
        if let Err(err) = coordinator.post(Box::new(move || complete(value))) {
            warn!(%priority, error = %err, "dropping completion notice");
        }
    }
}

impl<T> fmt::Debug for CallbackTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTask")
            .field("prepare", &self.prepare.is_some())
            .finish_non_exhaustive()
    }
}
