use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes surfaced over HTTP and logged at the call site that
/// first observes the failure. See SPEC_FULL.md section 7.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("permission denied: {resource}")]
    PermissionDenied { resource: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("vector store error: {message}")]
    VectorStore { message: String },

    #[error("embedding error: {message}")]
    Embedding { message: String },

    #[error("embedding quota exceeded")]
    QuotaExceeded,

    #[error("embedding provider authentication failed")]
    AuthFailed,

    #[error("search error: {message}")]
    Search { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error("operation cancelled: {message}")]
    Cancelled { message: String },
}

impl Error {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }

    pub fn permission_denied(resource: impl Into<String>) -> Self {
        Error::PermissionDenied {
            resource: resource.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn vector_store(message: impl Into<String>) -> Self {
        Error::VectorStore {
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Error::Embedding {
            message: message.into(),
        }
    }

    pub fn search(message: impl Into<String>) -> Self {
        Error::Search {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Error::Cache {
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Error::Cancelled {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used in HTTP error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io { .. } => "IO_ERROR",
            Error::Json { .. } => "JSON_ERROR",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::PermissionDenied { .. } => "PERMISSION_DENIED",
            Error::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Error::VectorStore { .. } => "VECTOR_STORE_ERROR",
            Error::Embedding { .. } => "EMBEDDING_ERROR",
            Error::QuotaExceeded => "QUOTA_EXCEEDED",
            Error::AuthFailed => "AUTH_FAILED",
            Error::Search { .. } => "SEARCH_ERROR",
            Error::Config { .. } => "CONFIG_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
            Error::Cache { .. } => "CACHE_ERROR",
            Error::Cancelled { .. } => "CANCELLED",
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal {
            message: s.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal { message: s }
    }
}
