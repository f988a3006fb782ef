use std::sync::{atomic::AtomicUsize, Arc};

use tracing::{debug, warn};

use crate::{
    callback::CallbackTask,
    config::Config,
    error::{Error, Result},
    gate::{GateState, PauseGate},
    queue::{Provision, TaskQueue},
    task::{Job, Priority, PriorityTask},
    thread::Worker,
};

/// State shared between a [`Pool`] and its workers.
pub(crate) struct Shared {
    pub queue: TaskQueue,
    pub gate: PauseGate,
    pub config: Config,
    pub thread_counter: AtomicUsize,
}

impl Shared {
    pub fn new(config: Config) -> Self {
        Self {
            queue: TaskQueue::new(config.core_size, config.max_size, config.keep_alive),
            gate: PauseGate::new(),
            config,
            thread_counter: AtomicUsize::new(0),
        }
    }
}

/// A thread pool that runs queued work highest priority first.
///
/// Workers are started lazily as work is submitted, up to the configured
/// maximum, and workers above the core size exit after sitting idle for the
/// keep-alive period. Dropping the pool lets running tasks finish and discards
/// whatever is still queued.
pub struct Pool {
    shared: Arc<Shared>,
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shared.queue.close();
        self.shared.gate.close();
    }
}

impl Pool {
    pub(crate) fn with_config(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    /// Queue `f` at `priority`, which must lie in `0..=10`.
    pub fn submit<F>(&self, priority: u8, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let priority = Priority::new(priority)?;
        self.enqueue(priority, Box::new(f))
    }

    /// Queue `f` at the default priority.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(err) = self.enqueue(Priority::default(), Box::new(f)) {
            warn!(error = %err, "task queued without a live worker");
        }
    }

    /// Queue a computation whose `prepare` and `complete` hooks are delivered
    /// on the pool's coordinator. See [`CallbackTask`] for the delivery rules.
    pub fn submit_callback<T>(&self, priority: u8, task: CallbackTask<T>) -> Result<()>
    where
        T: Send + 'static,
    {
        let priority = Priority::new(priority)?;
        let coordinator = self
            .shared
            .config
            .coordinator
            .clone()
            .ok_or(Error::NoCoordinator)?;
        self.enqueue(priority, task.into_job(priority, coordinator))
    }

    /// Stop workers from starting queued tasks. Running tasks are not
    /// interrupted.
    pub fn pause(&self) {
        self.shared.gate.pause();
        debug!("pool paused");
    }

    /// Let every blocked worker continue.
    pub fn resume(&self) {
        self.shared.gate.resume();
        debug!("pool resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.shared.gate.is_paused()
    }

    pub fn state(&self) -> GateState {
        self.shared.gate.state()
    }

    /// Live worker threads, including ones blocked on a pause.
    pub fn worker_count(&self) -> usize {
        self.shared.queue.workers()
    }

    /// Workers waiting for a task to be submitted.
    pub fn idle_count(&self) -> usize {
        self.shared.queue.idle()
    }

    /// Tasks waiting to be started.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn core_size(&self) -> usize {
        self.shared.config.core_size
    }

    pub fn max_size(&self) -> usize {
        self.shared.config.max_size
    }

    fn enqueue(&self, priority: Priority, job: Job) -> Result<()> {
        let provision = self
            .shared
            .queue
            .push(|seq| PriorityTask::new(priority, seq, job));

        if provision == Provision::Spawn {
            if let Err(err) = Worker::spawn(Arc::clone(&self.shared)) {
                let alive = self.shared.queue.release_slot();
                warn!(error = %err, alive, "failed to spawn worker");
                if alive == 0 {
                    return Err(Error::Spawn(err));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("workers", &self.worker_count())
            .field("queued", &self.queued())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc::channel, time::Duration};

    use parking_lot::Mutex;

    use super::*;
    use crate::{config::Builder, coordinator::coordinator};

    #[test]
    fn spawn() {
        let shared = Arc::new(Mutex::new(vec![]));
        let pool = Builder::new().core_size(2).max_size(2).build().unwrap();
        let num_tasks = 10;
        let num_pushes = 10;

        for i in 0..num_tasks {
            let shared = Arc::clone(&shared);
            pool.submit(i, move || {
                for _ in 0..num_pushes {
                    let mut data = shared.lock();
                    data.push(());
                }
            })
            .unwrap();
        }

        while shared.lock().len() != num_tasks as usize * num_pushes {}
        assert!(pool.worker_count() <= 2);
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let pool = Builder::new().core_size(1).max_size(1).build().unwrap();
        assert!(matches!(
            pool.submit(11, || {}),
            Err(Error::InvalidPriority(11))
        ));
        assert_eq!(pool.queued(), 0);
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn callback_requires_coordinator() {
        let pool = Builder::new().core_size(1).max_size(1).build().unwrap();
        let task = CallbackTask::new(|| 1, |_| {});
        assert!(matches!(
            pool.submit_callback(0, task),
            Err(Error::NoCoordinator)
        ));
    }

    #[test]
    fn callback_round_trip() {
        let (handle, looper) = coordinator();
        let pool = Builder::new()
            .core_size(1)
            .max_size(2)
            .coordinator(handle)
            .build()
            .unwrap();
        let (tx, rx) = channel();

        pool.submit_callback(
            5,
            CallbackTask::new(|| (0..10_000u64).sum::<u64>(), move |v| {
                tx.send(v).unwrap()
            }),
        )
        .unwrap();

        let mut value = None;
        for _ in 0..500 {
            looper.run_next(Duration::from_millis(10));
            if let Ok(v) = rx.try_recv() {
                value = Some(v);
                break;
            }
        }
        assert_eq!(value, Some(49_995_000));
    }

    #[test]
    fn drop_discards_queued() {
        let pool = Builder::new().core_size(1).max_size(1).build().unwrap();
        pool.pause();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        pool.execute(move || *flag.lock() = true);
        assert_eq!(pool.queued(), 1);
        drop(pool);

        std::thread::sleep(Duration::from_millis(50));
        assert!(!*ran.lock());
    }
}
