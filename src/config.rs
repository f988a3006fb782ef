use std::{fmt, sync::Arc, time::Duration};

use crate::{
    coordinator::Coordinator,
    error::{Error, Result},
    pool::Pool,
};

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "tidepool-";

/// Settings a [`Pool`] is built from. Sizes are fixed for the lifetime of
/// the pool.
#[derive(Clone)]
pub(crate) struct Config {
    pub core_size: usize,
    pub max_size: usize,
    pub keep_alive: Duration,
    pub thread_name_prefix: String,
    pub coordinator: Option<Arc<dyn Coordinator>>,
}

impl Default for Config {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            core_size: cpus + 1,
            max_size: cpus * 2 + 1,
            keep_alive: DEFAULT_KEEP_ALIVE,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            coordinator: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::config("max_size must be > 0"));
        }
        if self.core_size > self.max_size {
            return Err(Error::config(format!(
                "core_size ({}) must not exceed max_size ({})",
                self.core_size, self.max_size
            )));
        }
        if self.keep_alive.is_zero() {
            return Err(Error::config("keep_alive must be > 0"));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("core_size", &self.core_size)
            .field("max_size", &self.max_size)
            .field("keep_alive", &self.keep_alive)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("coordinator", &self.coordinator.is_some())
            .finish()
    }
}

/// Builds a [`Pool`].
///
/// Defaults are derived from the number of logical CPUs `n`: `n + 1` core
/// workers, at most `2n + 1` workers, and a 30 second keep-alive for workers
/// above the core size.
///
/// ```rust
/// use tidepool::Builder;
///
/// let pool = Builder::new().core_size(2).max_size(4).build().unwrap();
/// pool.execute(|| println!("hello from a worker"));
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workers kept alive even when there is no work.
    pub fn core_size(mut self, n: usize) -> Self {
        self.config.core_size = n;
        self
    }

    /// Upper bound on live workers.
    pub fn max_size(mut self, n: usize) -> Self {
        self.config.max_size = n;
        self
    }

    /// How long a worker above the core size waits for work before exiting.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Context that callback tasks report to. Required for
    /// [`Pool::submit_callback`].
    pub fn coordinator<C>(mut self, coordinator: C) -> Self
    where
        C: Coordinator + 'static,
    {
        self.config.coordinator = Some(Arc::new(coordinator));
        self
    }

    pub fn build(self) -> Result<Pool> {
        self.config.validate()?;
        Ok(Pool::with_config(self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_cpu_count() {
        let config = Config::default();
        let cpus = num_cpus::get();
        assert_eq!(config.core_size, cpus + 1);
        assert_eq!(config.max_size, 2 * cpus + 1);
        assert_eq!(config.keep_alive, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(
            Builder::new().max_size(0).core_size(0).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Builder::new().core_size(4).max_size(2).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Builder::new().keep_alive(Duration::ZERO).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Builder::new().thread_name_prefix("").build(),
            Err(Error::Config(_))
        ));
    }
}
