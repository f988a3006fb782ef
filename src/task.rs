//! A Task is the synchronous computational unit that runs on the pool.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::error::{Error, Result};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Execution precedence of a task. Higher values are dequeued first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(0);
    pub const MAX: Priority = Priority(10);

    /// Returns [`Error::InvalidPriority`] for values above [`Priority::MAX`].
    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX.0 {
            return Err(Error::InvalidPriority(value));
        }
        Ok(Self(value))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Priority {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A panic raised by a task body, caught before it could unwind a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanic {
    pub message: String,
}

impl TaskPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self { message }
    }
}

impl fmt::Display for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

pub(crate) struct PriorityTask {
    priority: Priority,
    seq: u64,
    job: Job,
}

impl PriorityTask {
    pub fn new(priority: Priority, seq: u64, job: Job) -> Self {
        Self { priority, seq, job }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Runs the body to completion on the current thread. A panic inside the
    /// body is returned rather than unwinding into the caller.
    pub fn run(self) -> std::result::Result<(), TaskPanic> {
        panic::catch_unwind(AssertUnwindSafe(self.job)).map_err(TaskPanic::from_payload)
    }
}

impl fmt::Debug for PriorityTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityTask")
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    #[test]
    fn run() {
        let (tx, rx) = channel();
        let value = 7;
        let task = PriorityTask::new(
            Priority::default(),
            0,
            Box::new(move || {
                tx.send(7).unwrap();
            }),
        );

        assert!(task.run().is_ok());
        assert_eq!(rx.recv(), Ok(value));
    }

    #[test]
    fn run_contains_panic() {
        let task = PriorityTask::new(Priority::MAX, 0, Box::new(|| panic!("boom")));

        let err = task.run().unwrap_err();
        assert_eq!(err.message, "boom");

        let task = PriorityTask::new(
            Priority::MAX,
            1,
            Box::new(|| std::panic::panic_any(format!("code {}", 3))),
        );
        assert_eq!(task.run().unwrap_err().message, "code 3");
    }

    #[test]
    fn priority_range() {
        assert_eq!(Priority::new(0).unwrap(), Priority::MIN);
        assert_eq!(Priority::new(10).unwrap(), Priority::MAX);
        assert!(matches!(Priority::new(11), Err(Error::InvalidPriority(11))));
        assert!(Priority::try_from(255).is_err());
        assert_eq!(Priority::default().get(), 0);
    }
}
