use std::{
    io,
    sync::{atomic::Ordering, Arc},
    thread,
};

use tracing::{debug, error, trace};

use crate::pool::Shared;

pub(crate) struct Worker {
    shared: Arc<Shared>,
}

impl Worker {
    /// Start a named system thread serving the pool's queue. The caller must
    /// already hold a worker slot in the queue's accounting.
    pub fn spawn(shared: Arc<Shared>) -> io::Result<()> {
        let index = shared.thread_counter.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}", shared.config.thread_name_prefix, index);
        thread::Builder::new().name(name).spawn(move || {
            Worker { shared }.run();
        })?;
        Ok(())
    }

    fn run(self) {
        debug!("worker started");
        loop {
            self.shared.gate.wait_while_paused();

            let Some(task) = self.shared.queue.pop() else {
                break;
            };

            // A pause issued while we were waiting for work still holds this
            // task back.
            if self.shared.gate.is_paused() {
                self.shared.queue.requeue(task);
                continue;
            }

            let priority = task.priority();
            trace!(%priority, "running task");
            if let Err(panic) = task.run() {
                error!(%priority, "{panic}");
            }
        }
        debug!("worker exiting");
    }
}
