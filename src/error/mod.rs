use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for the Catalyst library
///
/// Per-entity collaborator failures never surface as `CatalystError`; those are
/// classified into [`crate::batch::ErrorClass`] and recorded on the result set.
/// This type covers the things a caller cannot recover from inside a job:
/// broken configuration, unreachable sources, misuse of the ledger.
#[derive(Error, Debug)]
pub enum CatalystError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Entitlement error: {message}")]
    Entitlement {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Ledger error: {message}")]
    Ledger {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Collaborator error: {message}")]
    Collaborator {
        code: u16,
        message: String,
        endpoint: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Job error: {message}")]
    Job {
        code: u16,
        message: String,
        job_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Catalog error: {message}")]
    Catalog {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CatalystError {
    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an entitlement error with specific code
    pub fn entitlement(code: u16, message: impl Into<String>) -> Self {
        Self::Entitlement {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a ledger error with specific code
    pub fn ledger(code: u16, message: impl Into<String>) -> Self {
        Self::Ledger {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a collaborator error with specific code and endpoint
    pub fn collaborator(code: u16, message: impl Into<String>, endpoint: Option<String>) -> Self {
        Self::Collaborator {
            code,
            message: message.into(),
            endpoint,
            source: None,
        }
    }

    /// Create a job error with specific code
    pub fn job(code: u16, message: impl Into<String>, job_id: Option<String>) -> Self {
        Self::Job {
            code,
            message: message.into(),
            job_id,
            source: None,
        }
    }

    /// Create a catalog error with specific code and path
    pub fn catalog(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Catalog {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Entitlement { source: src, .. }
            | Self::Ledger { source: src, .. }
            | Self::Collaborator { source: src, .. }
            | Self::Job { source: src, .. }
            | Self::Catalog { source: src, .. }
            | Self::Validation { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Entitlement { message, .. }
            | Self::Ledger { message, .. }
            | Self::Collaborator { message, .. }
            | Self::Job { message, .. }
            | Self::Catalog { message, .. }
            | Self::Validation { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Entitlement { .. } => 3,
            Self::Ledger { .. } => 4,
            Self::Collaborator { .. } => 5,
            Self::Job { .. } => 6,
            Self::Catalog { .. } => 7,
            Self::Validation { .. } => 8,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Entitlement { code, .. }
            | Self::Ledger { code, .. }
            | Self::Collaborator { code, .. }
            | Self::Job { code, .. }
            | Self::Catalog { code, .. }
            | Self::Validation { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Entitlement { message, .. } => format!("Could not read your plan: {}", message),
            Self::Ledger { message, .. } => format!("Token balance problem: {}", message),
            Self::Collaborator {
                message, endpoint, ..
            } => match endpoint {
                Some(endpoint) => format!("Request to {} failed: {}", endpoint, message),
                None => format!("Request failed: {}", message),
            },
            Self::Job {
                message, job_id, ..
            } => match job_id {
                Some(id) => format!("Job {} error: {}", id, message),
                None => format!("Job error: {}", message),
            },
            Self::Catalog { message, path, .. } => match path {
                Some(p) => format!("Catalog error at {}: {}", p.display(), message),
                None => format!("Catalog error: {}", message),
            },
            Self::Validation { message, field, .. } => match field {
                Some(f) => format!("Validation error for '{}': {}", f, message),
                None => format!("Validation error: {}", message),
            },
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        use std::error::Error as _;

        let mut msg = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            msg.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        msg
    }
}

/// Type alias for Results using CatalystError
pub type Result<T> = std::result::Result<T, CatalystError>;

impl From<std::io::Error> for CatalystError {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::CATALOG_NOT_FOUND,
            _ => ErrorCode::CATALOG_IO_ERROR,
        };
        CatalystError::catalog(code, "I/O operation failed", None).with_source(err)
    }
}

impl From<serde_json::Error> for CatalystError {
    fn from(err: serde_json::Error) -> Self {
        CatalystError::catalog(ErrorCode::CATALOG_INVALID_FORMAT, "Invalid JSON", None)
            .with_source(err)
    }
}

impl From<serde_yaml::Error> for CatalystError {
    fn from(err: serde_yaml::Error) -> Self {
        CatalystError::catalog(ErrorCode::CATALOG_INVALID_FORMAT, "Invalid YAML", None)
            .with_source(err)
    }
}

impl From<toml::de::Error> for CatalystError {
    fn from(err: toml::de::Error) -> Self {
        CatalystError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}
