//! Telemetry snapshot and the daemon-wide coordination gates.
//!
//! The snapshot is split into a pointing half and a focus half, each guarded
//! by its own mutex + condition variable so commands can block on exactly
//! the fields they care about. Only the poller writes either half, and only
//! while holding both locks.
//!
//! Lock order everywhere: command mutex → pointing → focus → shared memory
//! → offset.

use std::sync::atomic::AtomicBool;
use std::sync::{Condvar, Mutex, MutexGuard};

use talond_common::state::{FocusState, PointingState};

use crate::shm::ShmReader;

/// Observatory site captured when the controller first comes alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// Radians, north positive.
    pub latitude: f64,
    /// Radians, east positive.
    pub longitude: f64,
    /// Metres above sea level.
    pub elevation: f64,
}

/// Pointing half of the snapshot. Guarded by the pointing lock.
#[derive(Debug, Clone, Default)]
pub struct PointingTelemetry {
    pub state: PointingState,
    pub state_idx: i32,
    /// Radians.
    pub ra_j2000: f64,
    pub dec_j2000: f64,
    pub ha_apparent: f64,
    pub dec_apparent: f64,
    pub alt: f64,
    pub az: f64,
    pub lst: f64,
    pub axes_homed: bool,
    pub controller_pid: i32,
    pub tod_mjd: f64,
    pub site: Option<Site>,
    /// Prior-tick copies for edge detection.
    pub last_state: PointingState,
    pub last_state_idx: i32,
}

/// Focus half of the snapshot. Guarded by the focus lock.
#[derive(Debug, Clone, Default)]
pub struct FocusTelemetry {
    pub state: FocusState,
    /// Micrometres.
    pub focus_um: f64,
    /// Prior-tick copies for edge detection.
    pub last_state: FocusState,
    pub last_focus_um: f64,
}

/// Gate block shared between the poller and the command dispatcher.
pub struct TelemetryShared {
    pub pointing: Mutex<PointingTelemetry>,
    pub pointing_cond: Condvar,
    pub focus: Mutex<FocusTelemetry>,
    pub focus_cond: Condvar,
    /// Set by `stop`, cleared by `stop` once the command mutex is re-held.
    pub force_stopped: AtomicBool,
    /// Serializes segment access and reconnection.
    pub shm: Mutex<Option<ShmReader>>,
    /// Accumulated differential offset, (ra, dec) degrees. Mutated by
    /// commands under the command mutex; zeroed by the poller on controller
    /// death.
    pub offset: Mutex<(f64, f64)>,
}

impl TelemetryShared {
    pub fn new() -> Self {
        Self {
            pointing: Mutex::new(PointingTelemetry::default()),
            pointing_cond: Condvar::new(),
            focus: Mutex::new(FocusTelemetry::default()),
            focus_cond: Condvar::new(),
            force_stopped: AtomicBool::new(false),
            shm: Mutex::new(None),
            offset: Mutex::new((0.0, 0.0)),
        }
    }
}

impl Default for TelemetryShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a mutex, recovering the guard if a panicking thread poisoned it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
