//! Numeric command results and the client-facing status record.

use serde::Serialize;

// ─── Command Status ─────────────────────────────────────────────────

/// Numeric return codes shared with client tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CommandStatus {
    Succeeded = 0,
    /// Generic runtime failure: timeout, pipe error, controller death.
    Failed = 1,
    /// Another command is already running.
    Blocked = 2,
    /// Caller is not in the control list.
    InvalidControlIP = 5,
    /// Security system daemon did not answer.
    CannotCommunicateWithSecuritySystem = 6,
    /// Security system reports unsafe.
    SecuritySystemTripped = 7,
    TelescopeNotInitialized = 10,
    TelescopeNotHomed = 11,
    TelescopeNotUninitialized = 14,
    OutsideHALimits = 20,
    OutsideDecLimits = 21,
}

/// Client-side code: command terminated by the user.
pub const STOPPED_BY_USER: i32 = -100;

/// Client-side code: transport to the daemon failed.
pub const DAEMON_UNREACHABLE: i32 = -101;

impl CommandStatus {
    /// Human readable description of a numeric code, including the
    /// client-side transport codes.
    pub fn message(code: i32) -> &'static str {
        match code {
            0 => "command succeeded",
            1 => "error: command failed",
            2 => "error: another command is already running",
            5 => "error: command not accepted from this IP",
            6 => "error: telescope failed to communicate with security system daemon",
            7 => "error: hard limits (security system) have been tripped",
            10 => "error: telescope has not been initialized",
            11 => "error: telescope has not been homed",
            14 => "error: telescope has already been initialized",
            20 => "error: requested coordinates outside HA limits",
            21 => "error: requested coordinates outside Dec limits",
            STOPPED_BY_USER => "error: terminated by user",
            DAEMON_UNREACHABLE => "error: unable to communicate with telescope daemon",
            _ => "error: unknown error code",
        }
    }
}

// ─── Status Record ──────────────────────────────────────────────────

/// Observatory site, present once the controller has come alive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiteStatus {
    /// Degrees, north positive.
    pub latitude: f64,
    /// Degrees, east positive.
    pub longitude: f64,
    /// Metres above sea level.
    pub elevation: f64,
}

/// Pointing solution, present once the axes are homed. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointingStatus {
    pub ra: f64,
    pub dec: f64,
    pub offset_ra: f64,
    pub offset_dec: f64,
    pub ha: f64,
    pub alt: f64,
    pub az: f64,
    /// Separation from the Sun, degrees.
    pub sun_separation: f64,
    /// Separation from the Moon, degrees.
    pub moon_separation: f64,
}

/// Snapshot projection returned to clients.
///
/// `state` and `state_label` are always present; the optional blocks appear
/// as the controller comes alive, homes, and (on telescopes that have one)
/// reports a focuser.
#[derive(Debug, Clone, Serialize)]
pub struct TelescopeStatus {
    /// `PointingState` wire value.
    pub state: i32,
    pub state_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes_homed: Option<bool>,
    /// Local apparent sidereal time, degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lst: Option<f64>,
    /// `FocusState` wire value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telescope_focus_state: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointing: Option<PointingStatus>,
    /// Focuser position, micrometres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telescope_focus_um: Option<f64>,
}
