use thiserror::Error;

/// Dispatch-level errors, distinct from per-file import failures (which
/// are normalized into [`crate::ImportOutcome`]).
#[derive(Error, Debug)]
pub enum IngestError {
    /// The endpoint cannot be reached at all; critical for the whole run
    #[error("ingestion endpoint unreachable: {0}")]
    Unreachable(String),

    /// The file to dispatch could not be read
    #[error("cannot read {file}: {message}")]
    LocalFile { file: String, message: String },

    /// The endpoint answered with an unparsable payload
    #[error("unexpected ingestion response: {0}")]
    Protocol(String),
}

impl IngestError {
    /// True when the error invalidates the whole run rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Unreachable(_))
    }
}

impl From<IngestError> for pricescout_core::Error {
    fn from(e: IngestError) -> Self {
        if e.is_fatal() {
            pricescout_core::Error::fatal(e.to_string())
        } else {
            pricescout_core::Error::ingest(e.to_string())
        }
    }
}
