use crate::shared::TransportStatus;

/// Everything a sequencer operation can refuse to do.
///
/// None of these leave the transport half-updated: the operation that
/// produced the error made no change.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A stopped-only operation was attempted while playing or paused.
    #[error("{operation} is only allowed while stopped (transport is {status:?})")]
    InvalidState {
        operation: &'static str,
        status: TransportStatus,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown track '{0}'")]
    UnknownTrack(String),

    /// Internal timing state is inconsistent; playback is halted.
    #[error("scheduler invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }
}
