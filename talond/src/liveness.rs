//! Controller liveness detection.
//!
//! talon updates its time-of-day field every control cycle. The daemon keeps
//! a bounded window of recent values: if the clock stops moving for a whole
//! window, or the published pid no longer answers signal 0, the controller
//! is dead and recovery kicks in.

use std::collections::VecDeque;

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Sliding window over the controller's published clock and process id.
#[derive(Debug)]
pub struct LivenessMonitor {
    recent_tod: VecDeque<f64>,
    capacity: usize,
}

impl LivenessMonitor {
    /// Window over the last `capacity` observations; at least two are needed
    /// to see the clock move.
    pub fn new(capacity: usize) -> Self {
        Self {
            recent_tod: VecDeque::with_capacity(capacity.max(2)),
            capacity: capacity.max(2),
        }
    }

    /// Record one observation and report whether the controller is alive.
    ///
    /// Alive requires a positive clock that differs from at least one value
    /// already in the window, and a pid that still exists.
    pub fn observe(&mut self, tod: f64, pid: i32) -> bool {
        let clock_moving = tod > 0.0 && self.recent_tod.iter().any(|&seen| seen != tod);
        if self.recent_tod.len() == self.capacity {
            self.recent_tod.pop_front();
        }
        self.recent_tod.push_back(tod);
        clock_moving && pid > 0 && process_alive(pid)
    }

    /// Forget all observations, e.g. after the controller is replaced.
    pub fn reset(&mut self) {
        self.recent_tod.clear();
    }
}

/// `kill(pid, 0)` existence probe. EPERM means the process exists but is
/// owned by someone else, which still counts as alive.
pub fn process_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}
