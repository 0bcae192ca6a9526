use thiserror::Error;

/// Result type for pricescout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pricescout operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote store errors that exhausted their retries
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Classification errors (bad pattern set, invalid weights)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Spreadsheet reading errors
    #[error("Spreadsheet error in {file}: {message}")]
    Sheet { file: String, message: String },

    /// Column-mapping resolution or store errors
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Ingestion dispatch errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Memory/disk ceiling reached
    #[error("Resource limit: {0}")]
    ResourceLimit(String),

    /// Critical errors that abort the entire run
    #[error("Fatal: {0}")]
    Fatal(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a remote store error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Creates a classification error
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Creates a spreadsheet error
    pub fn sheet(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sheet {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a mapping error
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    /// Creates an ingest error
    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest(msg.into())
    }

    /// Creates a resource-limit error
    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// Creates a fatal error that must abort the run
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// True for critical errors that abort the whole run rather than a
    /// single file, folder, or batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
