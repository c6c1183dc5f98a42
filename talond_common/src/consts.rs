//! Constants describing the talon controller's external surfaces.

/// Well-known SysV IPC key of talon's `TelStatShm` telemetry segment.
pub const TALON_SHM_KEY: i32 = 0x4e56361a;

/// Byte offsets into the `TelStatShm` segment.
///
/// Recovered from the talon headers by printing `offsetof()` values from one
/// of the talon utilities. They must track the deployed controller build
/// exactly; a talon rebuild that reorders `TelStatShm` requires updating
/// this table.
pub mod shm_offset {
    /// Controller time of day (f64, MJD).
    pub const MJD: usize = 0;
    /// Site latitude (f64, rad).
    pub const LATITUDE: usize = 8;
    /// Site longitude (f64, rad).
    pub const LONGITUDE: usize = 16;
    /// Site elevation (f64, Earth radii).
    pub const ELEVATION: usize = 48;
    /// J2000 right ascension (f64, rad).
    pub const RA_J2000: usize = 88;
    /// J2000 declination (f64, rad).
    pub const DEC_J2000: usize = 96;
    /// Apparent hour angle (f64, rad).
    pub const HA_APPARENT: usize = 112;
    /// Apparent declination (f64, rad).
    pub const DEC_APPARENT: usize = 120;
    /// Altitude (f64, rad).
    pub const ALT: usize = 128;
    /// Azimuth (f64, rad).
    pub const AZ: usize = 136;
    /// Local apparent sidereal time (f64, rad).
    pub const LST: usize = 152;
    /// HA axis motor flag word (u16).
    pub const RA_FLAGS: usize = 257;
    /// Dec axis motor flag word (u16).
    pub const DEC_FLAGS: usize = 377;
    /// Focus motor flag word (u16).
    pub const FOCUS_FLAGS: usize = 617;
    /// Focus microsteps per motor revolution (i32).
    pub const FOCUS_STEP: usize = 620;
    /// Focus travel per motor revolution (f64).
    pub const FOCUS_DF: usize = 696;
    /// Focus current position (f64, motor rad).
    pub const FOCUS_CPOS: usize = 712;
    /// Pointing state (i32, `PointingState` wire value).
    pub const TEL_STATE: usize = 808;
    /// Pointing state index, bumped on every accepted command (i32).
    pub const TEL_STATE_IDX: usize = 812;
    /// Controller process id (i32).
    pub const PID: usize = 840;
}

/// Every offset the daemon reads fits inside this many bytes.
pub const SHM_MIN_SIZE: usize = 1024;

/// Elevation in shared memory is expressed in Earth radii; multiply by this
/// to get metres.
pub const EARTH_RADIUS_M: f64 = 6.37816e6;

/// Pointing command pipe name under the communication directory.
pub const TEL_FIFO: &str = "Tel.in";

/// Focus command pipe name under the communication directory.
pub const FOCUS_FIFO: &str = "Focus.in";

/// Default talon communication directory.
pub const DEFAULT_COMM_DIR: &str = "/usr/local/telescope/comm";

/// Default profile file sourced to build the controller's environment.
pub const DEFAULT_PROFILE_FILE: &str = "/etc/profile.d/talon.sh";

/// Default command line used to start the controller.
pub const DEFAULT_CONTROLLER_COMMAND: &[&str] = &["rund", "telescoped"];

/// Auxiliary daemon launcher killed during crash cleanup.
pub const AUX_DAEMON: &str = "rund";
