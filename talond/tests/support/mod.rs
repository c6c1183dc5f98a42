//! Shared helpers for the integration tests.
//!
//! `FakeController` stands in for talon: a writable SysV segment laid out at
//! the real offsets, plus a scratch communication directory whose pipes are
//! held open for reading so daemon-side writes succeed.

#![allow(dead_code)]

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tempfile::TempDir;

use talond_common::config::{Config, Flavor, LogLevel, ParkPosition};
use talond_common::consts::{shm_offset, FOCUS_FIFO, SHM_MIN_SIZE, TEL_FIFO};
use talond_common::state::PointingState;

pub struct FakeController {
    pub key: i32,
    shm_id: i32,
    addr: *mut u8,
    pub comm_dir: TempDir,
    tel_reader: File,
    focus_reader: File,
}

impl FakeController {
    pub fn new() -> Self {
        static NEXT: AtomicI32 = AtomicI32::new(0);
        let base = 0x54420000 | ((std::process::id() as i32 & 0xff) << 8);
        let (key, shm_id) = loop {
            let key = base + NEXT.fetch_add(1, Ordering::Relaxed);
            let id = unsafe {
                libc::shmget(key, SHM_MIN_SIZE, libc::IPC_CREAT | libc::IPC_EXCL | 0o600)
            };
            if id != -1 {
                break (key, id);
            }
        };
        let addr = unsafe { libc::shmat(shm_id, std::ptr::null(), 0) };
        assert_ne!(addr as isize, -1, "shmat failed");
        let addr = addr as *mut u8;
        unsafe { std::ptr::write_bytes(addr, 0, SHM_MIN_SIZE) };

        let comm_dir = TempDir::new().expect("tempdir");
        let tel_reader = Self::make_fifo(&comm_dir, TEL_FIFO);
        let focus_reader = Self::make_fifo(&comm_dir, FOCUS_FIFO);

        Self {
            key,
            shm_id,
            addr,
            comm_dir,
            tel_reader,
            focus_reader,
        }
    }

    fn make_fifo(dir: &TempDir, name: &str) -> File {
        let path = dir.path().join(name);
        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).expect("mkfifo");
        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .expect("open fifo reader")
    }

    // ─── Segment writes ─────────────────────────────────────────────

    pub fn set_f64(&self, offset: usize, value: f64) {
        unsafe { self.addr.add(offset).cast::<f64>().write_unaligned(value) };
    }

    pub fn set_i32(&self, offset: usize, value: i32) {
        unsafe { self.addr.add(offset).cast::<i32>().write_unaligned(value) };
    }

    pub fn set_u16(&self, offset: usize, value: u16) {
        unsafe { self.addr.add(offset).cast::<u16>().write_unaligned(value) };
    }

    /// Publish a live-looking controller: pid, clock, and a pointing state.
    pub fn publish(&self, pid: i32, mjd: f64, state: PointingState) {
        self.set_i32(shm_offset::PID, pid);
        self.set_f64(shm_offset::MJD, mjd);
        self.set_i32(shm_offset::TEL_STATE, state as i32);
    }

    /// Mark both mount axes (and the focuser) homed.
    pub fn set_homed(&self, with_focus: bool) {
        self.set_u16(shm_offset::RA_FLAGS, 0x0201);
        self.set_u16(shm_offset::DEC_FLAGS, 0x0201);
        self.set_u16(shm_offset::FOCUS_FLAGS, if with_focus { 0x0201 } else { 0 });
    }

    pub fn set_site(&self, latitude_rad: f64, longitude_rad: f64, elevation_earth_radii: f64) {
        self.set_f64(shm_offset::LATITUDE, latitude_rad);
        self.set_f64(shm_offset::LONGITUDE, longitude_rad);
        self.set_f64(shm_offset::ELEVATION, elevation_earth_radii);
    }

    // ─── Command pipe reads ─────────────────────────────────────────

    /// Drain every command written to a pipe so far.
    pub fn read_commands(&mut self, fifo: &str) -> Vec<String> {
        let reader = if fifo == TEL_FIFO {
            &mut self.tel_reader
        } else {
            &mut self.focus_reader
        };
        let mut buffer = String::new();
        let _ = reader.read_to_string(&mut buffer);
        buffer.lines().map(str::to_string).collect()
    }

    // ─── Config ─────────────────────────────────────────────────────

    /// A config pointing at this fake's segment and pipes.
    pub fn config(&self, flavor: Flavor) -> Config {
        Config {
            daemon: "test_telescope".to_string(),
            log_name: "teld".to_string(),
            log_level: LogLevel::Info,
            control_ips: vec!["127.0.0.1".parse().expect("ip")],
            flavor,
            virtual_hardware: true,
            query_delay: 0.05,
            query_timeout_iterations: 5,
            initialization_timeout: 5.0,
            slew_timeout: 5.0,
            focus_timeout: 0.2,
            homing_timeout: 5.0,
            limit_timeout: 5.0,
            cover_timeout: 5.0,
            ping_timeout: 1.0,
            focus_tolerance: 1.0,
            ha_soft_limits: [-72.0, 90.0],
            dec_soft_limits: [-30.0, 85.0],
            park_positions: [
                (
                    "stow".to_string(),
                    ParkPosition::AltAz {
                        desc: "Zenith".to_string(),
                        alt: 89.0,
                        az: 0.0,
                    },
                ),
                (
                    "service".to_string(),
                    ParkPosition::Encoder {
                        desc: "Maintenance".to_string(),
                        ha_enc: -1200,
                        dec_enc: 3400,
                    },
                ),
            ]
            .into_iter()
            .collect(),
            security_system: None,
            comm_dir: self.comm_dir.path().to_path_buf(),
            profile_file: "/nonexistent/talon.sh".into(),
            controller_command: vec!["/bin/true".to_string()],
            shm_key: self.key,
        }
    }
}

impl Drop for FakeController {
    fn drop(&mut self) {
        unsafe {
            libc::shmdt(self.addr as *const libc::c_void);
            libc::shmctl(self.shm_id, libc::IPC_RMID, std::ptr::null_mut());
        }
    }
}
