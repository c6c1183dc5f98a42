//! Telemetry polling loop.
//!
//! A single long-lived thread refreshes the snapshot from shared memory at
//! the configured cadence, detects controller birth and death through the
//! liveness window, and wakes blocked commands through the condition
//! variables whenever an observable field changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use talond_common::config::Config;
use talond_common::state::{FocusState, PointingState};

use crate::liveness::LivenessMonitor;
use crate::shm::ShmReader;
use crate::spawn;
use crate::telemetry::{lock, Site, TelemetryShared};

/// Handle to the background polling thread.
pub struct TelemetryPoller {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl TelemetryPoller {
    /// Spawn the polling thread.
    pub fn start(config: Arc<Config>, shared: Arc<TelemetryShared>) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("telemetry-poller".into())
            .spawn(move || poll_loop(&config, &shared, &flag))?;
        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    /// Ask the thread to finish and wait for it.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn poll_loop(config: &Config, shared: &TelemetryShared, running: &AtomicBool) {
    let mut liveness = LivenessMonitor::new(config.query_timeout_iterations);
    let mut alive = false;
    let delay = Duration::from_secs_f64(config.query_delay);
    while running.load(Ordering::SeqCst) {
        tick(config, shared, &mut liveness, &mut alive);
        std::thread::sleep(delay);
    }
}

/// One polling cycle. Public so tests can drive the poller synchronously.
///
/// `alive` carries the previous tick's verdict so birth/death edges can be
/// acted on exactly once.
pub fn tick(
    config: &Config,
    shared: &TelemetryShared,
    liveness: &mut LivenessMonitor,
    alive: &mut bool,
) {
    let mut pointing = lock(&shared.pointing);
    let mut focus = lock(&shared.focus);

    pointing.last_state = pointing.state;
    pointing.last_state_idx = pointing.state_idx;
    focus.last_state = focus.state;
    focus.last_focus_um = focus.focus_um;

    let mut shm = lock(&shared.shm);
    if shm.is_none() {
        if let Ok(reader) = ShmReader::attach(config.shm_key) {
            *shm = Some(reader);
        }
    }

    let mut now_alive = false;
    if let Some(reader) = shm.as_ref() {
        let pid = reader.controller_pid();
        let tod = reader.mjd();
        now_alive = liveness.observe(tod, pid);
        pointing.controller_pid = pid;
        pointing.tod_mjd = tod;

        if now_alive {
            pointing.state = PointingState::from_i32(reader.pointing_state())
                .unwrap_or(PointingState::Absent);
            pointing.state_idx = reader.pointing_idx();
            pointing.ra_j2000 = reader.ra_j2000();
            pointing.dec_j2000 = reader.dec_j2000();
            pointing.ha_apparent = reader.ha_apparent();
            pointing.dec_apparent = reader.dec_apparent();
            pointing.alt = reader.alt();
            pointing.az = reader.az();
            pointing.lst = reader.lst();
            pointing.axes_homed = reader.axes_homed();
            focus.state = reader.focus_state();
            focus.focus_um = reader.focus_um();
        }
    }

    if *alive && !now_alive {
        warn!("controller died, cleaning up");
        spawn::kill_aux_processes();
        spawn::cleanup_comm_dir(&config.comm_dir);
        *shm = None;
        liveness.reset();
        pointing.controller_pid = 0;
        pointing.state = PointingState::Absent;
        pointing.axes_homed = false;
        focus.state = FocusState::Absent;
        *lock(&shared.offset) = (0.0, 0.0);
    } else if !*alive && now_alive {
        if let Some(reader) = shm.as_ref() {
            let site = Site {
                latitude: reader.site_latitude(),
                longitude: reader.site_longitude(),
                elevation: reader.site_elevation_m(),
            };
            info!(
                latitude = site.latitude.to_degrees(),
                longitude = site.longitude.to_degrees(),
                elevation = site.elevation,
                "controller alive"
            );
            pointing.site = Some(site);
        }
    }
    *alive = now_alive;
    drop(shm);

    if pointing.state_idx != pointing.last_state_idx || pointing.state != pointing.last_state {
        shared.pointing_cond.notify_all();
    }
    if focus.focus_um != focus.last_focus_um || focus.state != focus.last_state {
        shared.focus_cond.notify_all();
    }
}
