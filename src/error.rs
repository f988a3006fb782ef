use std::io;

use crate::task::Priority;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("priority {0} is outside {min}..={max}", min = Priority::MIN.get(), max = Priority::MAX.get())]
    InvalidPriority(u8),

    #[error("invalid pool configuration: {0}")]
    Config(String),

    #[error("pool has no coordinator to deliver callbacks on")]
    NoCoordinator,

    #[error("coordinator is closed")]
    CoordinatorClosed,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
