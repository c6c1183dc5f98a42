//! Typed reads from talon's SysV shared-memory telemetry segment.
//!
//! The segment is created and written by the controller; the daemon only
//! attaches read-only and copies individual fields at fixed byte offsets.
//! Several of the offsets are unaligned (the flag words sit one byte into
//! packed `MotorInfo` records), so every read is an unaligned copy.

use std::io;

use talond_common::consts::{shm_offset, EARTH_RADIUS_M};
use talond_common::state::{self, AxisFlags, FocusState};

use crate::error::TalondError;

/// Read-only attachment to the controller's telemetry segment.
///
/// Stateless across calls: every accessor reads the live segment. Access is
/// serialized by the daemon's shared-memory mutex, not here.
#[derive(Debug)]
pub struct ShmReader {
    addr: *const u8,
}

// The attachment is only touched behind the shared-memory mutex.
unsafe impl Send for ShmReader {}

impl ShmReader {
    /// Attach to the segment under `key`.
    ///
    /// Fails with [`TalondError::ControllerAbsent`] when no segment exists,
    /// which is the normal state before the controller has been started.
    pub fn attach(key: i32) -> Result<Self, TalondError> {
        let id = unsafe { libc::shmget(key, 0, 0) };
        if id == -1 {
            return Err(TalondError::ControllerAbsent);
        }
        let addr = unsafe { libc::shmat(id, std::ptr::null(), libc::SHM_RDONLY) };
        if addr as isize == -1 {
            return Err(TalondError::ShmAttach(io::Error::last_os_error()));
        }
        Ok(Self { addr: addr as *const u8 })
    }

    fn read_f64(&self, offset: usize) -> f64 {
        unsafe { self.addr.add(offset).cast::<f64>().read_unaligned() }
    }

    fn read_i32(&self, offset: usize) -> i32 {
        unsafe { self.addr.add(offset).cast::<i32>().read_unaligned() }
    }

    fn read_u16(&self, offset: usize) -> u16 {
        unsafe { self.addr.add(offset).cast::<u16>().read_unaligned() }
    }

    /// An angle field, with NaN/infinity clamped to zero before anything
    /// downstream derives booleans from it.
    fn read_angle(&self, offset: usize) -> f64 {
        let value = self.read_f64(offset);
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    // ─── Controller identity ────────────────────────────────────────

    /// Controller process id.
    pub fn controller_pid(&self) -> i32 {
        self.read_i32(shm_offset::PID)
    }

    /// Controller time of day, MJD.
    pub fn mjd(&self) -> f64 {
        self.read_angle(shm_offset::MJD)
    }

    // ─── Pointing ───────────────────────────────────────────────────

    /// Raw pointing state wire value.
    pub fn pointing_state(&self) -> i32 {
        self.read_i32(shm_offset::TEL_STATE)
    }

    /// Pointing state index, bumped by the controller on every accepted
    /// command.
    pub fn pointing_idx(&self) -> i32 {
        self.read_i32(shm_offset::TEL_STATE_IDX)
    }

    /// J2000 right ascension, radians.
    pub fn ra_j2000(&self) -> f64 {
        self.read_angle(shm_offset::RA_J2000)
    }

    /// J2000 declination, radians.
    pub fn dec_j2000(&self) -> f64 {
        self.read_angle(shm_offset::DEC_J2000)
    }

    /// Apparent hour angle, radians.
    pub fn ha_apparent(&self) -> f64 {
        self.read_angle(shm_offset::HA_APPARENT)
    }

    /// Apparent declination, radians.
    pub fn dec_apparent(&self) -> f64 {
        self.read_angle(shm_offset::DEC_APPARENT)
    }

    /// Altitude, radians.
    pub fn alt(&self) -> f64 {
        self.read_angle(shm_offset::ALT)
    }

    /// Azimuth, radians.
    pub fn az(&self) -> f64 {
        self.read_angle(shm_offset::AZ)
    }

    /// Local apparent sidereal time, radians.
    pub fn lst(&self) -> f64 {
        self.read_angle(shm_offset::LST)
    }

    // ─── Motor flags ────────────────────────────────────────────────

    /// HA axis flag word.
    pub fn ra_flags(&self) -> AxisFlags {
        AxisFlags::from_bits_truncate(self.read_u16(shm_offset::RA_FLAGS))
    }

    /// Dec axis flag word.
    pub fn dec_flags(&self) -> AxisFlags {
        AxisFlags::from_bits_truncate(self.read_u16(shm_offset::DEC_FLAGS))
    }

    /// Focus motor flag word.
    pub fn focus_flags(&self) -> AxisFlags {
        AxisFlags::from_bits_truncate(self.read_u16(shm_offset::FOCUS_FLAGS))
    }

    /// Whether every fitted axis has a valid reference position.
    pub fn axes_homed(&self) -> bool {
        state::axes_homed(self.ra_flags(), self.dec_flags(), self.focus_flags())
    }

    /// Focuser state decoded from its flag word.
    pub fn focus_state(&self) -> FocusState {
        FocusState::from_flags(self.focus_flags())
    }

    // ─── Focus position ─────────────────────────────────────────────

    /// Focuser position in micrometres, derived from the motor step count,
    /// current motor angle, and travel-per-revolution constant.
    pub fn focus_um(&self) -> f64 {
        let step = self.read_i32(shm_offset::FOCUS_STEP) as f64;
        let cpos = self.read_angle(shm_offset::FOCUS_CPOS);
        let df = self.read_f64(shm_offset::FOCUS_DF);
        if !df.is_finite() || df == 0.0 {
            return 0.0;
        }
        step * cpos / (2.0 * std::f64::consts::PI * df)
    }

    // ─── Site ───────────────────────────────────────────────────────

    /// Site latitude, radians.
    pub fn site_latitude(&self) -> f64 {
        self.read_angle(shm_offset::LATITUDE)
    }

    /// Site longitude, radians.
    pub fn site_longitude(&self) -> f64 {
        self.read_angle(shm_offset::LONGITUDE)
    }

    /// Site elevation in metres (stored in Earth radii by the controller).
    pub fn site_elevation_m(&self) -> f64 {
        self.read_angle(shm_offset::ELEVATION) * EARTH_RADIUS_M
    }
}

impl Drop for ShmReader {
    fn drop(&mut self) {
        unsafe {
            libc::shmdt(self.addr as *const libc::c_void);
        }
    }
}
