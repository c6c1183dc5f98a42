//! Single-shot writes to the controller's command pipes.
//!
//! Pipes are opened per command in write-only, non-creating, non-blocking
//! mode: if the controller is not holding its read end open the write fails
//! immediately (ENXIO) instead of wedging the daemon.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::TalondError;

/// Writes newline-terminated command strings to talon's named pipes.
#[derive(Debug, Clone)]
pub struct FifoWriter {
    comm_dir: PathBuf,
}

impl FifoWriter {
    pub fn new(comm_dir: impl Into<PathBuf>) -> Self {
        Self {
            comm_dir: comm_dir.into(),
        }
    }

    /// Append one command to the named pipe `fifo` under the communication
    /// directory.
    pub fn write(&self, fifo: &str, command: &str) -> Result<(), TalondError> {
        let path = self.comm_dir.join(fifo);
        let result = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .and_then(|mut pipe| pipe.write_all(format!("{command}\n").as_bytes()));

        match result {
            Ok(()) => {
                debug!(fifo, command, "command written");
                Ok(())
            }
            Err(source) => {
                warn!(fifo, command, error = %source, "command write failed");
                Err(TalondError::Fifo {
                    fifo: fifo.to_string(),
                    command: command.to_string(),
                    source,
                })
            }
        }
    }
}
