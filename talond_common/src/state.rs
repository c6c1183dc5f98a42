//! Pointing and focus state enumerations decoded from talon telemetry.
//!
//! Both enums carry talon's integer wire values so the numbers reported to
//! clients stay stable; labels live in a separate method rather than in the
//! variant names.

use bitflags::bitflags;

// ─── Pointing State ─────────────────────────────────────────────────

/// Mount motion state as published in `TelStatShm.telstate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PointingState {
    /// Controller not running (or axes disabled).
    Absent = 0,
    /// Axes powered and idle.
    Stopped = 1,
    /// Closing in on a tracking target.
    Hunting = 2,
    /// Locked on a sky target.
    Tracking = 3,
    /// Moving to a fixed position.
    Slewing = 4,
    /// Seeking the home reference marks.
    Homing = 5,
    /// Seeking the limit switches.
    Limiting = 6,
}

impl PointingState {
    /// Convert from the raw wire value. Returns `None` for unknown values.
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Absent),
            1 => Some(Self::Stopped),
            2 => Some(Self::Hunting),
            3 => Some(Self::Tracking),
            4 => Some(Self::Slewing),
            5 => Some(Self::Homing),
            6 => Some(Self::Limiting),
            _ => None,
        }
    }

    /// Human readable label matching the talon display conventions.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Absent => "DISABLED",
            Self::Stopped => "STOPPED",
            Self::Hunting => "HUNTING",
            Self::Tracking => "TRACKING",
            Self::Slewing => "SLEWING",
            Self::Homing => "HOMING",
            Self::Limiting => "LIMITING",
        }
    }
}

impl Default for PointingState {
    fn default() -> Self {
        Self::Absent
    }
}

// ─── Focus State ────────────────────────────────────────────────────

/// Focuser state derived from the talon focus motor flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FocusState {
    /// No focuser fitted.
    Absent = 0,
    /// Fitted but not yet referenced.
    NotHomed = 1,
    /// Seeking the home reference mark.
    Homing = 2,
    /// Seeking the limit switches.
    Limiting = 3,
    /// Referenced and accepting moves.
    Ready = 4,
}

impl FocusState {
    /// Convert from the raw wire value. Returns `None` for unknown values.
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Absent),
            1 => Some(Self::NotHomed),
            2 => Some(Self::Homing),
            3 => Some(Self::Limiting),
            4 => Some(Self::Ready),
            _ => None,
        }
    }

    /// Decode the focus motor flag word.
    ///
    /// Homing takes priority over Limiting over Ready; a present focuser
    /// with none of those bits is fitted but unreferenced.
    pub const fn from_flags(flags: AxisFlags) -> Self {
        if !flags.contains(AxisFlags::PRESENT) {
            Self::Absent
        } else if flags.contains(AxisFlags::HOMING) {
            Self::Homing
        } else if flags.contains(AxisFlags::LIMITING) {
            Self::Limiting
        } else if flags.contains(AxisFlags::HOMED) {
            Self::Ready
        } else {
            Self::NotHomed
        }
    }

    /// Human readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Absent => "ABSENT",
            Self::NotHomed => "NOT_HOMED",
            Self::Homing => "HOMING",
            Self::Limiting => "LIMITING",
            Self::Ready => "READY",
        }
    }
}

impl Default for FocusState {
    fn default() -> Self {
        Self::Absent
    }
}

// ─── Motor Flags ────────────────────────────────────────────────────

bitflags! {
    /// Per-motor flag word from the talon `MotorInfo` records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AxisFlags: u16 {
        /// Motor is fitted.
        const PRESENT  = 0x0001;
        /// Homing procedure active.
        const HOMING   = 0x0080;
        /// Limit search active.
        const LIMITING = 0x0100;
        /// Reference position established.
        const HOMED    = 0x0200;
    }
}

/// Whether every mechanical axis has a valid reference position.
///
/// The focus axis only participates when fitted.
pub const fn axes_homed(ra: AxisFlags, dec: AxisFlags, focus: AxisFlags) -> bool {
    ra.contains(AxisFlags::HOMED)
        && dec.contains(AxisFlags::HOMED)
        && (!focus.contains(AxisFlags::PRESENT) || focus.contains(AxisFlags::HOMED))
}
