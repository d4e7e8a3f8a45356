use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The unified error type for the consensus engine and its consumers
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Job discovery error: {message}")]
    Discovery {
        code: u16,
        message: String,
        location: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Extraction error: {message}")]
    Extraction {
        code: u16,
        message: String,
        archive: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Mask error: {message}")]
    Mask {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Aggregation error: {message}")]
    Aggregation {
        code: u16,
        message: String,
        location: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Store error: {message}")]
    Store {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

}

impl ConsensusError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message, None)
    }

    /// Create a configuration error with specific code and file
    pub fn config_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn discovery(code: u16, message: impl Into<String>, location: Option<String>) -> Self {
        Self::Discovery {
            code,
            message: message.into(),
            location,
            source: None,
        }
    }

    pub fn extraction(code: u16, message: impl Into<String>, archive: Option<PathBuf>) -> Self {
        Self::Extraction {
            code,
            message: message.into(),
            archive,
            source: None,
        }
    }

    pub fn mask(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Mask {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn aggregation(code: u16, message: impl Into<String>, location: Option<String>) -> Self {
        Self::Aggregation {
            code,
            message: message.into(),
            location,
            source: None,
        }
    }

    pub fn store(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Store {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn validation(code: u16, message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// No job mask and no prior consensus mask: nothing fixes the image shape
    pub fn no_shape(location: &str) -> Self {
        Self::aggregation(
            ErrorCode::AGG_NO_SHAPE,
            format!(
                "location {} has no job masks and no prior consensus mask; image shape is unknown",
                location
            ),
            Some(location.to_string()),
        )
    }

    /// A rectangular dataset whose shape differs from the location shape
    pub fn shape_mismatch(
        path: &std::path::Path,
        class: &str,
        expected: impl Display,
        found: impl Display,
    ) -> Self {
        Self::aggregation(
            ErrorCode::AGG_SHAPE_MISMATCH,
            format!(
                "dataset '{}' in {} has shape {} but the location shape is {}",
                class,
                path.display(),
                found,
                expected
            ),
            None,
        )
    }

    pub fn cancelled() -> Self {
        Self::aggregation(
            ErrorCode::AGG_CANCELLED,
            "run cancelled before the consensus mask was written",
            None,
        )
    }

    pub fn location_busy(lock_path: PathBuf) -> Self {
        Self::store(
            ErrorCode::STORE_LOCK_BUSY,
            format!(
                "another run holds {}; remove it if no run is active",
                lock_path.display()
            ),
            Some(lock_path),
        )
    }

    pub fn not_aggregated(location: &str) -> Self {
        Self::store(
            ErrorCode::STORE_NOT_AGGREGATED,
            format!(
                "location {} has not been combined yet; combine it before viewing",
                location
            ),
            None,
        )
    }

    pub fn unknown_class<'a>(class: &str, known: impl IntoIterator<Item = &'a String>) -> Self {
        let known: Vec<&str> = known.into_iter().map(String::as_str).collect();
        Self::validation(
            ErrorCode::VALIDATION_UNKNOWN_CLASS,
            format!(
                "class '{}' does not exist, choose from [{}]",
                class,
                known.join(", ")
            ),
            Some("class".to_string()),
        )
    }

    pub fn too_few_classes(found: usize) -> Self {
        Self::validation(
            ErrorCode::VALIDATION_TOO_FEW_CLASSES,
            format!(
                "at least two classes are needed to measure performance, found {}",
                found
            ),
            Some("classes".to_string()),
        )
    }

    /// Add a source error to this error
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Discovery { source: src, .. }
            | Self::Extraction { source: src, .. }
            | Self::Mask { source: src, .. }
            | Self::Aggregation { source: src, .. }
            | Self::Store { source: src, .. }
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
            | Self::Discovery { message, .. }
            | Self::Extraction { message, .. }
            | Self::Mask { message, .. }
            | Self::Aggregation { message, .. }
            | Self::Store { message, .. }
            | Self::Validation { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() {
            return 130;
        }
        match self {
            Self::Config { .. } => 2,
            Self::Discovery { .. } => 3,
            Self::Extraction { .. } => 4,
            Self::Mask { .. } => 5,
            Self::Aggregation { .. } => 6,
            Self::Store { .. } => 7,
            Self::Validation { .. } => 8,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Discovery { code, .. }
            | Self::Extraction { code, .. }
            | Self::Mask { code, .. }
            | Self::Aggregation { code, .. }
            | Self::Store { code, .. }
            | Self::Validation { code, .. } => *code,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.code() == ErrorCode::AGG_CANCELLED
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, path, .. } => match path {
                Some(p) => format!("Configuration problem in {}: {}", p.display(), message),
                None => format!("Configuration problem: {}", message),
            },
            Self::Discovery {
                message, location, ..
            } => match location {
                Some(loc) => format!("Could not list jobs for location {}: {}", loc, message),
                None => format!("Could not list jobs: {}", message),
            },
            Self::Extraction {
                message, archive, ..
            } => match archive {
                Some(a) => format!("Could not extract {}: {}", a.display(), message),
                None => format!("Extraction failed: {}", message),
            },
            Self::Mask { message, .. } => format!("Mask error: {}", message),
            Self::Aggregation { message, .. } => format!("Aggregation stopped: {}", message),
            Self::Store { message, path, .. } => match path {
                Some(p) => format!("Store error at {}: {}", p.display(), message),
                None => format!("Store error: {}", message),
            },
            Self::Validation { message, .. } => message.clone(),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut out = format!("{}\n  kind: {}", self, describe_error_code(self.code()));
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }
}

/// Type alias for Results using ConsensusError
pub type Result<T> = std::result::Result<T, ConsensusError>;
