//! Daemon-internal error types.
//!
//! These never cross the client surface directly; the command dispatcher
//! folds them into numeric `CommandStatus` codes after logging.

use thiserror::Error;

/// Errors raised while talking to the controller's external surfaces.
#[derive(Debug, Error)]
pub enum TalondError {
    /// No shared-memory segment exists under the talon key.
    #[error("controller shared memory segment is absent")]
    ControllerAbsent,

    /// Segment exists but could not be attached.
    #[error("shared memory attach failed: {0}")]
    ShmAttach(#[source] std::io::Error),

    /// A command pipe write failed.
    #[error("failed to write {command:?} to {fifo}: {source}")]
    Fifo {
        fifo: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The controller process could not be started.
    #[error("failed to spawn controller: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TalondError>;
