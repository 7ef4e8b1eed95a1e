use pvoc_audioio::AudioError;
use thiserror::Error;

/// Errors raised by the processing core.
#[derive(Error, Debug)]
pub enum PvocError {
    /// Rejected configuration, reported synchronously at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An operation was called with out-of-range arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A reader or writer failure, surfaced unchanged.
    #[error(transparent)]
    Audio(#[from] AudioError),
}
