//! Error taxonomy shared by the scheduler, executor and collaborators.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VdqError {
    /// Job id unknown to the scheduler, or remote content that could not be located.
    #[error("not found: {0}")]
    NotFound(String),

    /// The located content is not a downloadable media document.
    #[error("not a downloadable media document: {0}")]
    InvalidMedia(String),

    /// Metadata store read or write failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// The naming collaborator gave up after its bounded attempts.
    #[error("name generation failed after {attempts} attempts: {last}")]
    GenerationFailed { attempts: u32, last: String },

    /// Malformed concurrency value or rename arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Network or source failure while fetching parts.
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VdqError>;

impl VdqError {
    /// True for errors that concern a single direct operation (stop, rename,
    /// set_concurrency) and never affect other jobs.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, VdqError::NotFound(_) | VdqError::InvalidArgument(_))
    }
}
