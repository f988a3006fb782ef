//! A priority-based thread pool with pause/resume and coordinator callbacks.
//!
//! # Examples
//! ```rust
//! use std::time::Duration;
//!
//! use tidepool::{coordinator, Builder, CallbackTask};
//!
//! let (handle, looper) = coordinator();
//! let pool = Builder::new().coordinator(handle).build().unwrap();
//!
//! // Higher priorities are started first.
//! pool.submit(1, || println!("later")).unwrap();
//! pool.submit(9, || println!("sooner")).unwrap();
//!
//! pool.pause();
//! pool.resume();
//!
//! let task = CallbackTask::new(|| 6 * 7, |value| println!("{value}"))
//!     .on_prepare(|| println!("starting"));
//! pool.submit_callback(0, task).unwrap();
//!
//! // Drive the coordinator from this thread.
//! while !looper.run_next(Duration::from_secs(1)) {}
//! ```

pub mod callback;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod pool;
pub(crate) mod queue;
pub mod task;
pub(crate) mod thread;

pub use callback::CallbackTask;
pub use config::Builder;
pub use coordinator::{coordinator, Coordinator, CoordinatorHandle, CoordinatorLoop, NoticeId};
pub use error::{Error, Result};
pub use gate::GateState;
pub use pool::Pool;
pub use task::{Priority, TaskPanic};
