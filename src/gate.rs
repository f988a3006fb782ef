//! Pool-wide pause switch consulted by every worker before it starts a task.

use parking_lot::{Condvar, Mutex};

/// Whether workers are allowed to start new tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Running,
    Paused,
}

struct Flags {
    paused: bool,
    closed: bool,
}

pub(crate) struct PauseGate {
    flags: Mutex<Flags>,
    resumed: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self {
            flags: Mutex::new(Flags {
                paused: false,
                closed: false,
            }),
            resumed: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        self.flags.lock().paused = true;
    }

    /// Clears the flag and wakes every blocked worker. The broadcast happens
    /// under the lock the waiters check the flag with, so a worker that saw
    /// `paused` is either already waiting or will see the cleared flag.
    pub fn resume(&self) {
        let mut flags = self.flags.lock();
        flags.paused = false;
        self.resumed.notify_all();
    }

    /// Blocks the calling worker while the gate is paused. The flag is
    /// re-checked after every wake-up since a `pause` may follow the `resume`
    /// that woke us.
    pub fn wait_while_paused(&self) {
        let mut flags = self.flags.lock();
        while flags.paused && !flags.closed {
            self.resumed.wait(&mut flags);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.flags.lock().paused
    }

    pub fn state(&self) -> GateState {
        if self.is_paused() {
            GateState::Paused
        } else {
            GateState::Running
        }
    }

    /// Releases all current and future waiters for good.
    pub fn close(&self) {
        let mut flags = self.flags.lock();
        flags.closed = true;
        self.resumed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc::channel,
            Arc,
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn state_machine() {
        let gate = PauseGate::new();
        assert_eq!(gate.state(), GateState::Running);
        gate.pause();
        gate.pause();
        assert_eq!(gate.state(), GateState::Paused);
        gate.resume();
        assert_eq!(gate.state(), GateState::Running);
        // Not paused, so this must return immediately.
        gate.wait_while_paused();
    }

    #[test]
    fn resume_wakes_every_waiter() {
        let gate = Arc::new(PauseGate::new());
        let passed = Arc::new(AtomicUsize::new(0));
        gate.pause();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let passed = Arc::clone(&passed);
                thread::spawn(move || {
                    gate.wait_while_paused();
                    passed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(passed.load(Ordering::SeqCst), 0);

        gate.resume();
        handles.into_iter().for_each(|h| h.join().unwrap());
        assert_eq!(passed.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn rapid_toggle_never_strands_a_waiter() {
        let gate = Arc::new(PauseGate::new());
        let (tx, rx) = channel();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    gate.wait_while_paused();
                }
                tx.send(()).unwrap();
            })
        };

        let toggler = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    gate.pause();
                    gate.resume();
                }
            })
        };

        toggler.join().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(10)).is_ok());
        waiter.join().unwrap();
    }

    #[test]
    fn close_releases_paused_waiters() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_while_paused())
        };
        thread::sleep(Duration::from_millis(20));
        gate.close();
        waiter.join().unwrap();
        assert!(gate.is_paused());
    }
}
