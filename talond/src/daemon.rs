//! Command dispatch and the public operation surface.
//!
//! Every mutating operation follows the same admission sequence: validate
//! the caller against the control list, then try the command mutex without
//! waiting. At most one motion command is in flight at a time; `stop` is the
//! one exception, writing its pipe commands first and only then queueing on
//! the command mutex so the interrupted command is guaranteed to observe
//! `force_stopped` before the next motion is admitted.

use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

use talond_common::config::{Config, Flavor, ParkPosition, SecuritySystemConfig};
use talond_common::consts::{FOCUS_FIFO, TEL_FIFO};
use talond_common::state::{FocusState, PointingState};
use talond_common::status::{CommandStatus, PointingStatus, SiteStatus, TelescopeStatus};

use crate::ephemeris::{self, EquatorialCoord};
use crate::fifo::FifoWriter;
use crate::spawn;
use crate::telemetry::{lock, TelemetryShared};

// ─── Security Interlock ─────────────────────────────────────────────

/// Transport failure while querying the security system.
#[derive(Debug, thiserror::Error)]
#[error("security system query failed: {0}")]
pub struct InterlockError(pub String);

/// External security interlock, polled before the controller may be
/// initialized.
///
/// Implementations map a missing safe key to `Ok(false)`; `Err` is reserved
/// for transport failures.
pub trait SecuritySystem: Send + Sync {
    fn is_safe(&self) -> Result<bool, InterlockError>;
}

/// Queries the security daemon's JSON status endpoint over HTTP.
pub struct HttpSecuritySystem {
    client: reqwest::blocking::Client,
    url: String,
    safe_key: String,
}

impl HttpSecuritySystem {
    pub fn new(config: &SecuritySystemConfig, timeout: Duration) -> Result<Self, InterlockError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InterlockError(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            safe_key: config.safe_key.clone(),
        })
    }
}

impl SecuritySystem for HttpSecuritySystem {
    fn is_safe(&self) -> Result<bool, InterlockError> {
        let payload: serde_json::Map<String, serde_json::Value> = self
            .client
            .get(&self.url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(|response| response.json())
            .map_err(|e| InterlockError(e.to_string()))?;
        Ok(payload
            .get(&self.safe_key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false))
    }
}

// ─── Daemon ─────────────────────────────────────────────────────────

/// The daemon's request/response surface.
///
/// An RPC transport dispatches one call per thread into these methods,
/// passing the caller's identity; every method returns a numeric
/// [`CommandStatus`].
pub struct TelescopeDaemon {
    config: Arc<Config>,
    shared: Arc<TelemetryShared>,
    fifo: FifoWriter,
    command_lock: Mutex<()>,
    security: Option<Box<dyn SecuritySystem>>,
}

impl TelescopeDaemon {
    pub fn new(
        config: Arc<Config>,
        shared: Arc<TelemetryShared>,
        security: Option<Box<dyn SecuritySystem>>,
    ) -> Self {
        let fifo = FifoWriter::new(config.comm_dir.clone());
        Self {
            config,
            shared,
            fifo,
            command_lock: Mutex::new(()),
            security,
        }
    }

    // ─── Admission ──────────────────────────────────────────────────

    fn check_access(&self, client: IpAddr) -> bool {
        self.config.control_ips.contains(&client)
    }

    /// Access check plus a non-blocking try on the command mutex.
    fn admit(&self, client: IpAddr) -> Result<MutexGuard<'_, ()>, CommandStatus> {
        if !self.check_access(client) {
            warn!(%client, "command rejected: not a control client");
            return Err(CommandStatus::InvalidControlIP);
        }
        match self.command_lock.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(CommandStatus::Blocked),
        }
    }

    fn pointing_state(&self) -> PointingState {
        lock(&self.shared.pointing).state
    }

    fn require_initialized(&self) -> Result<(), CommandStatus> {
        if self.pointing_state() == PointingState::Absent {
            Err(CommandStatus::TelescopeNotInitialized)
        } else {
            Ok(())
        }
    }

    fn require_homed(&self) -> Result<(), CommandStatus> {
        let pointing = lock(&self.shared.pointing);
        if pointing.state == PointingState::Absent {
            Err(CommandStatus::TelescopeNotInitialized)
        } else if !pointing.axes_homed {
            Err(CommandStatus::TelescopeNotHomed)
        } else {
            Ok(())
        }
    }

    /// Soft-limit pre-check. Nothing reaches a pipe unless the requested
    /// position lies inside the configured ranges.
    fn check_limits(&self, ha_deg: f64, dec_deg: f64) -> Result<(), CommandStatus> {
        let ha = wrap_degrees(ha_deg);
        let [ha_min, ha_max] = self.config.ha_soft_limits;
        if ha < ha_min || ha > ha_max {
            warn!(ha, ha_min, ha_max, "rejected: outside HA limits");
            return Err(CommandStatus::OutsideHALimits);
        }
        let [dec_min, dec_max] = self.config.dec_soft_limits;
        if dec_deg < dec_min || dec_deg > dec_max {
            warn!(dec = dec_deg, dec_min, dec_max, "rejected: outside Dec limits");
            return Err(CommandStatus::OutsideDecLimits);
        }
        Ok(())
    }

    // ─── Waits ──────────────────────────────────────────────────────

    /// Write a pointing command and follow it to a terminal state.
    ///
    /// The pointing index is sampled before the write; wake-ups are ignored
    /// until the controller has acknowledged the command by bumping it.
    /// After that the wait re-arms while the declared intermediate state is
    /// observed and breaks on anything else, succeeding only on the declared
    /// terminal with no force-stop and a live controller.
    fn command_and_wait_pointing(
        &self,
        fifo: &str,
        command: &str,
        intermediate: PointingState,
        terminal: PointingState,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pointing = lock(&self.shared.pointing);
        let start_idx = pointing.state_idx;
        if self.fifo.write(fifo, command).is_err() {
            return false;
        }
        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!(command, "timed out waiting for {:?}", terminal);
                return false;
            }
            let (guard, _) = self
                .shared
                .pointing_cond
                .wait_timeout(pointing, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pointing = guard;
            if self.shared.force_stopped.load(Ordering::SeqCst) {
                return false;
            }
            if pointing.state == PointingState::Absent {
                return false;
            }
            if pointing.state_idx == start_idx || pointing.state == intermediate {
                continue;
            }
            return pointing.state == terminal;
        }
    }

    /// Write a focus command and follow the focus state to `terminal`.
    fn command_and_wait_focus(
        &self,
        command: &str,
        intermediate: FocusState,
        terminal: FocusState,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut focus = lock(&self.shared.focus);
        let entry = focus.state;
        let mut progressed = false;
        if self.fifo.write(FOCUS_FIFO, command).is_err() {
            return false;
        }
        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!(command, "timed out waiting for {:?}", terminal);
                return false;
            }
            let (guard, _) = self
                .shared
                .focus_cond
                .wait_timeout(focus, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            focus = guard;
            if self.shared.force_stopped.load(Ordering::SeqCst) {
                return false;
            }
            if focus.state == intermediate {
                progressed = true;
                continue;
            }
            if focus.state == entry && !progressed {
                continue;
            }
            return focus.state == terminal;
        }
    }

    /// Follow the focuser towards `target_um`, one focus-timeout tick at a
    /// time. A full tick with no movement means the focuser has stalled.
    fn wait_focus_position(&self, target_um: f64) -> bool {
        let tolerance = self.config.focus_tolerance;
        let tick = Duration::from_secs_f64(self.config.focus_timeout);
        let mut focus = lock(&self.shared.focus);
        loop {
            let before = focus.focus_um;
            let (guard, wait_result) = self
                .shared
                .focus_cond
                .wait_timeout(focus, tick)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            focus = guard;
            if self.shared.force_stopped.load(Ordering::SeqCst) {
                return false;
            }
            if (focus.focus_um - target_um).abs() < tolerance {
                return true;
            }
            if wait_result.timed_out() && focus.focus_um == before {
                warn!(target_um, position = focus.focus_um, "focuser stalled");
                return false;
            }
        }
    }

    fn wait_until_initialized(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pointing = lock(&self.shared.pointing);
        while pointing.state == PointingState::Absent {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .pointing_cond
                .wait_timeout(pointing, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pointing = guard;
        }
        true
    }

    // ─── Motion building blocks ─────────────────────────────────────

    fn slew_to_hadec(&self, ha_rad: f64, dec_rad: f64) -> bool {
        self.command_and_wait_pointing(
            TEL_FIFO,
            &format!("HA: {ha_rad} Dec: {dec_rad}"),
            PointingState::Slewing,
            PointingState::Stopped,
            Duration::from_secs_f64(self.config.slew_timeout),
        )
    }

    fn slew_to_altaz(&self, alt_rad: f64, az_rad: f64) -> bool {
        self.command_and_wait_pointing(
            TEL_FIFO,
            &format!("Alt: {alt_rad} Az: {az_rad}"),
            PointingState::Slewing,
            PointingState::Stopped,
            Duration::from_secs_f64(self.config.slew_timeout),
        )
    }

    fn slew_to_zenith(&self) -> bool {
        self.slew_to_altaz(std::f64::consts::FRAC_PI_2, 0.0)
    }

    /// Cancel any outstanding differential offset after an absolute move.
    fn reset_offset(&self) {
        let _ = self.fifo.write(TEL_FIFO, "xdelta(0,0)");
        *lock(&self.shared.offset) = (0.0, 0.0);
    }

    fn site_latitude(&self) -> Option<f64> {
        lock(&self.shared.pointing).site.map(|site| site.latitude)
    }

    fn lst_degrees(&self) -> f64 {
        lock(&self.shared.pointing).lst.to_degrees()
    }

    // ─── Operations ─────────────────────────────────────────────────

    /// Start the controller and wait for it to come alive.
    pub fn initialize(&self, client: IpAddr) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if self.pointing_state() != PointingState::Absent {
            return CommandStatus::TelescopeNotUninitialized;
        }

        if self.config.flavor == Flavor::Full {
            let verdict = self.security.as_ref().map(|system| system.is_safe());
            match verdict {
                Some(Ok(true)) => {}
                Some(Ok(false)) => {
                    warn!("initialization rejected: security system tripped");
                    return CommandStatus::SecuritySystemTripped;
                }
                Some(Err(error)) => {
                    warn!(%error, "security system unreachable");
                    return CommandStatus::CannotCommunicateWithSecuritySystem;
                }
                None => return CommandStatus::CannotCommunicateWithSecuritySystem,
            }
        }

        info!("initializing telescope");
        let env = spawn::capture_profile_env(&self.config.profile_file);
        if let Err(error) = spawn::spawn_controller(&self.config, &env) {
            warn!(%error, "controller spawn failed");
            return CommandStatus::Failed;
        }

        let timeout = Duration::from_secs_f64(self.config.initialization_timeout);
        if self.wait_until_initialized(timeout) {
            info!("telescope initialized");
            CommandStatus::Succeeded
        } else {
            warn!("controller did not come alive in time");
            CommandStatus::Failed
        }
    }

    /// Ask the controller to exit; the poller observes the death and cleans
    /// up.
    pub fn shutdown(&self, client: IpAddr) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_initialized() {
            return status;
        }
        let pid = lock(&self.shared.pointing).controller_pid;
        if pid <= 0 {
            return CommandStatus::Failed;
        }
        info!(pid, "shutting down controller");
        match kill(Pid::from_raw(pid), Signal::SIGINT) {
            Ok(()) => CommandStatus::Succeeded,
            Err(error) => {
                warn!(pid, %error, "failed to signal controller");
                CommandStatus::Failed
            }
        }
    }

    /// Home the HA axis, the Dec axis, then the focuser if fitted.
    pub fn find_homes(&self, client: IpAddr) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_initialized() {
            return status;
        }
        let timeout = Duration::from_secs_f64(self.config.homing_timeout);

        info!("homing axes");
        for command in ["homeH", "homeD"] {
            if !self.command_and_wait_pointing(
                TEL_FIFO,
                command,
                PointingState::Homing,
                PointingState::Stopped,
                timeout,
            ) {
                return CommandStatus::Failed;
            }
        }
        if self.config.has_focus()
            && !self.command_and_wait_focus("home", FocusState::Homing, FocusState::Ready, timeout)
        {
            return CommandStatus::Failed;
        }
        CommandStatus::Succeeded
    }

    /// Run the limit searches, returning to zenith between axes.
    pub fn find_limits(&self, client: IpAddr) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }
        let timeout = Duration::from_secs_f64(self.config.limit_timeout);

        info!("searching axis limits");
        for command in ["limitsH", "limitsD"] {
            if !self.slew_to_zenith() {
                return CommandStatus::Failed;
            }
            if !self.command_and_wait_pointing(
                TEL_FIFO,
                command,
                PointingState::Limiting,
                PointingState::Stopped,
                timeout,
            ) {
                return CommandStatus::Failed;
            }
        }
        if !self.slew_to_zenith() {
            return CommandStatus::Failed;
        }
        if self.config.has_focus()
            && !self.command_and_wait_focus(
                "limits",
                FocusState::Limiting,
                FocusState::Ready,
                timeout,
            )
        {
            return CommandStatus::Failed;
        }
        CommandStatus::Succeeded
    }

    /// Slew to a horizon position given in degrees.
    pub fn slew_altaz(&self, client: IpAddr, alt_deg: f64, az_deg: f64) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }
        let latitude = match self.site_latitude() {
            Some(latitude) => latitude,
            None => return CommandStatus::Failed,
        };
        let (ha_rad, dec_rad) =
            ephemeris::altaz_to_hadec(alt_deg.to_radians(), az_deg.to_radians(), latitude);
        if let Err(status) = self.check_limits(ha_rad.to_degrees(), dec_rad.to_degrees()) {
            return status;
        }
        if !self.slew_to_altaz(alt_deg.to_radians(), az_deg.to_radians()) {
            return CommandStatus::Failed;
        }
        self.reset_offset();
        CommandStatus::Succeeded
    }

    /// Slew to an hour angle / declination given in degrees.
    pub fn slew_hadec(&self, client: IpAddr, ha_deg: f64, dec_deg: f64) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }
        if let Err(status) = self.check_limits(ha_deg, dec_deg) {
            return status;
        }
        if !self.slew_to_hadec(ha_deg.to_radians(), dec_deg.to_radians()) {
            return CommandStatus::Failed;
        }
        self.reset_offset();
        CommandStatus::Succeeded
    }

    /// Slew to a J2000 position given in degrees, without tracking.
    pub fn slew_radec(&self, client: IpAddr, ra_deg: f64, dec_deg: f64) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }
        let ha_deg = wrap_degrees(self.lst_degrees() - ra_deg);
        if let Err(status) = self.check_limits(ha_deg, dec_deg) {
            return status;
        }
        if !self.slew_to_hadec(ha_deg.to_radians(), dec_deg.to_radians()) {
            return CommandStatus::Failed;
        }
        self.reset_offset();
        CommandStatus::Succeeded
    }

    /// Slew to a J2000 position and start tracking it.
    pub fn track_radec(&self, client: IpAddr, ra_deg: f64, dec_deg: f64) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }
        let ha_deg = wrap_degrees(self.lst_degrees() - ra_deg);
        if let Err(status) = self.check_limits(ha_deg, dec_deg) {
            return status;
        }
        if !self.slew_to_hadec(ha_deg.to_radians(), dec_deg.to_radians()) {
            return CommandStatus::Failed;
        }
        self.reset_offset();

        let command = format!(
            "RA: {} Dec: {} Epoch: 2000",
            ra_deg.to_radians(),
            dec_deg.to_radians()
        );
        if self.command_and_wait_pointing(
            TEL_FIFO,
            &command,
            PointingState::Hunting,
            PointingState::Tracking,
            Duration::from_secs_f64(self.config.slew_timeout),
        ) {
            CommandStatus::Succeeded
        } else {
            CommandStatus::Failed
        }
    }

    /// Apply a differential offset, degrees.
    ///
    /// While tracking the accumulated offset is pushed straight to the
    /// controller; while stopped the mount is re-slewed to the shifted
    /// apparent position.
    pub fn offset_radec(&self, client: IpAddr, delta_ra_deg: f64, delta_dec_deg: f64) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }

        match self.pointing_state() {
            PointingState::Tracking | PointingState::Hunting => {
                let mut offset = lock(&self.shared.offset);
                let next = (offset.0 + delta_ra_deg, offset.1 + delta_dec_deg);
                let command = format!("xdelta({},{})", next.0, next.1);
                if self.fifo.write(TEL_FIFO, &command).is_err() {
                    return CommandStatus::Failed;
                }
                *offset = next;
                CommandStatus::Succeeded
            }
            PointingState::Stopped => {
                let (ha_deg, dec_deg) = {
                    let pointing = lock(&self.shared.pointing);
                    (
                        pointing.ha_apparent.to_degrees(),
                        pointing.dec_apparent.to_degrees(),
                    )
                };
                let target_ha = wrap_degrees(ha_deg + delta_ra_deg);
                let target_dec = dec_deg + delta_dec_deg;
                if let Err(status) = self.check_limits(target_ha, target_dec) {
                    return status;
                }
                if !self.slew_to_hadec(target_ha.to_radians(), target_dec.to_radians()) {
                    return CommandStatus::Failed;
                }
                let mut offset = lock(&self.shared.offset);
                *offset = (offset.0 + delta_ra_deg, offset.1 + delta_dec_deg);
                CommandStatus::Succeeded
            }
            other => {
                warn!(state = ?other, "offset rejected in this state");
                CommandStatus::Failed
            }
        }
    }

    /// Move to a named park pose.
    pub fn park(&self, client: IpAddr, name: &str) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if let Err(status) = self.require_homed() {
            return status;
        }
        let pose = match self.config.park_positions.get(name) {
            Some(pose) => pose.clone(),
            None => {
                warn!(name, "unknown park position");
                return CommandStatus::Failed;
            }
        };

        info!(name, desc = pose.desc(), "parking");
        self.reset_offset();
        let parked = match pose {
            ParkPosition::Encoder { ha_enc, dec_enc, .. } => self.command_and_wait_pointing(
                TEL_FIFO,
                &format!("park {ha_enc} {dec_enc}"),
                PointingState::Slewing,
                PointingState::Stopped,
                Duration::from_secs_f64(self.config.slew_timeout),
            ),
            ParkPosition::AltAz { alt, az, .. } => {
                self.slew_to_altaz(alt.to_radians(), az.to_radians())
            }
        };
        if parked {
            CommandStatus::Succeeded
        } else {
            CommandStatus::Failed
        }
    }

    /// Move the focuser to an absolute position in micrometres.
    pub fn telescope_focus(&self, client: IpAddr, target_um: f64) -> CommandStatus {
        let _guard = match self.admit(client) {
            Ok(guard) => guard,
            Err(status) => return status,
        };
        if !self.config.has_focus() {
            return CommandStatus::Failed;
        }
        if let Err(status) = self.require_homed() {
            return status;
        }
        let (focus_state, current_um) = {
            let focus = lock(&self.shared.focus);
            (focus.state, focus.focus_um)
        };
        if focus_state == FocusState::Absent {
            return CommandStatus::Failed;
        }
        if (current_um - target_um).abs() < self.config.focus_tolerance {
            return CommandStatus::Succeeded;
        }

        let delta = target_um - current_um;
        info!(target_um, delta, "moving focuser");
        if self.fifo.write(FOCUS_FIFO, &format!("{delta}")).is_err() {
            return CommandStatus::Failed;
        }
        if self.wait_focus_position(target_um) {
            CommandStatus::Succeeded
        } else {
            CommandStatus::Failed
        }
    }

    /// Pre-emptive stop. Bypasses the command mutex so it can interrupt an
    /// in-flight motion, then queues on it so the interrupted command is
    /// guaranteed to have returned before `stop` does.
    pub fn stop(&self, client: IpAddr) -> CommandStatus {
        if !self.check_access(client) {
            return CommandStatus::InvalidControlIP;
        }
        if let Err(status) = self.require_initialized() {
            return status;
        }

        info!("stop requested");
        self.shared.force_stopped.store(true, Ordering::SeqCst);
        let tel_ok = self.fifo.write(TEL_FIFO, "Stop").is_ok();
        let focus_ok = self.fifo.write(FOCUS_FIFO, "Stop").is_ok();

        let guard = self
            .command_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.shared.force_stopped.store(false, Ordering::SeqCst);
        drop(guard);

        if tel_ok && focus_ok {
            CommandStatus::Succeeded
        } else {
            CommandStatus::Failed
        }
    }

    /// Liveness probe for the daemon itself.
    pub fn ping(&self, client: IpAddr) -> CommandStatus {
        if !self.check_access(client) {
            return CommandStatus::InvalidControlIP;
        }
        CommandStatus::Succeeded
    }

    /// Project the current snapshot for clients. Never fails and takes no
    /// locks beyond the snapshot mutexes, so it cannot be blocked by an
    /// in-flight command.
    pub fn report_status(&self) -> TelescopeStatus {
        let pointing = lock(&self.shared.pointing).clone();
        let focus = lock(&self.shared.focus).clone();
        let offset = *lock(&self.shared.offset);

        let mut status = TelescopeStatus {
            state: pointing.state as i32,
            state_label: pointing.state.label().to_string(),
            site: None,
            axes_homed: None,
            lst: None,
            telescope_focus_state: None,
            pointing: None,
            telescope_focus_um: None,
        };

        if pointing.state != PointingState::Absent {
            if let Some(site) = pointing.site {
                status.site = Some(SiteStatus {
                    latitude: site.latitude.to_degrees(),
                    longitude: site.longitude.to_degrees(),
                    elevation: site.elevation,
                });
            }
            status.axes_homed = Some(pointing.axes_homed);
            status.lst = Some(pointing.lst.to_degrees());
        }

        if self.config.flavor == Flavor::Full {
            status.telescope_focus_state = Some(focus.state as i32);
        }

        if pointing.axes_homed {
            let target = EquatorialCoord {
                ra: pointing.ra_j2000,
                dec: pointing.dec_j2000,
            };
            let sun = ephemeris::sun_position(pointing.tod_mjd);
            let moon = ephemeris::moon_position(pointing.tod_mjd);
            status.pointing = Some(PointingStatus {
                ra: pointing.ra_j2000.to_degrees(),
                dec: pointing.dec_j2000.to_degrees(),
                offset_ra: offset.0,
                offset_dec: offset.1,
                ha: pointing.ha_apparent.to_degrees(),
                alt: pointing.alt.to_degrees(),
                az: pointing.az.to_degrees(),
                sun_separation: ephemeris::angular_separation(target, sun).to_degrees(),
                moon_separation: ephemeris::angular_separation(target, moon).to_degrees(),
            });
        }

        if focus.state != FocusState::Absent {
            status.telescope_focus_um = Some(focus.focus_um);
        }

        status
    }
}

/// Wrap an angle in degrees into [-180, 180).
fn wrap_degrees(angle: f64) -> f64 {
    let mut wrapped = angle % 360.0;
    if wrapped >= 180.0 {
        wrapped -= 360.0;
    } else if wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}
