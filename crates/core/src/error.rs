// Error handling for the engine bridge

use thiserror::Error;

/// Errors surfaced by the engine handle, the event bridge and the player facade
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MpvError {
    /// The native engine could not be loaded or instantiated
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine was created but failed its one-time startup
    #[error("engine initialization failed (status {0})")]
    InitFailed(i32),

    /// A command string was rejected by the engine
    #[error("command failed (status {0})")]
    CommandFailed(i32),

    /// A property or option write was rejected by the engine
    #[error("property write failed (status {0})")]
    PropertySetFailed(i32),

    /// Registering or removing a property observation failed
    #[error("property observation failed (status {0})")]
    ObserveFailed(i32),

    /// The player has not been (successfully) initialized
    #[error("player not initialized")]
    NotInitialized,

    /// The handle was terminated; no further calls are valid
    #[error("engine handle terminated")]
    Terminated,

    /// unobserve requested for a property that was never observed
    #[error("property not observed: {0}")]
    NotObserved(String),

    /// Input that cannot be passed to the engine safely
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Thread/synchronization error
    #[error("thread error: {0}")]
    Thread(String),
}

impl MpvError {
    /// Integer status for C/JNI callers. Engine failures keep the engine's
    /// own (negative) code; everything else maps to -1.
    pub fn status_code(&self) -> i32 {
        match self {
            MpvError::InitFailed(code)
            | MpvError::CommandFailed(code)
            | MpvError::PropertySetFailed(code)
            | MpvError::ObserveFailed(code)
                if *code < 0 =>
            {
                *code
            }
            _ => -1,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, MpvError>;

/// Thread spawn failures
impl From<std::io::Error> for MpvError {
    fn from(err: std::io::Error) -> Self {
        MpvError::Thread(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_codes_pass_through() {
        assert_eq!(MpvError::CommandFailed(-4).status_code(), -4);
        assert_eq!(MpvError::PropertySetFailed(-9).status_code(), -9);
        assert_eq!(MpvError::Terminated.status_code(), -1);
        assert_eq!(MpvError::NotInitialized.status_code(), -1);
    }

    #[test]
    fn non_negative_codes_still_report_failure() {
        // A failure must never look like success to a C caller
        assert_eq!(MpvError::InitFailed(0).status_code(), -1);
        assert_eq!(MpvError::ObserveFailed(3).status_code(), -1);
    }

    #[test]
    fn io_errors_become_thread_errors() {
        let err: MpvError = std::io::Error::new(std::io::ErrorKind::Other, "no threads").into();
        assert_eq!(err, MpvError::Thread("no threads".to_string()));
        assert_eq!(err.status_code(), -1);
    }
}
