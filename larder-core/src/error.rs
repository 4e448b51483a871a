use serde::Serialize;
use thiserror::Error;

use crate::conversion::StoreError;
use crate::sanitize::SanitizeError;
use crate::validate::ValidationError;

/// Failure talking to an external service (generative model or label detector).
///
/// One attempt, classified. Retrying is the caller's decision.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("upstream rejected request: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("upstream response had no text payload")]
    Empty,

    #[error("upstream not configured: {0}")]
    NotConfigured(String),
}

/// Where in a resolution a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    CacheLookup,
    Labels,
    Model,
    Sanitize,
    Validate,
    CacheLearn,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::CacheLookup => "cache_lookup",
            Stage::Labels => "labels",
            Stage::Model => "model",
            Stage::Sanitize => "sanitize",
            Stage::Validate => "validate",
            Stage::CacheLearn => "cache_learn",
        }
    }
}

/// The oracle produced text that can't become a typed result.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Terminal failure of a resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{stage:?} stage failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: UpstreamError,
    },

    #[error("{stage:?} stage produced unusable output: {source}")]
    MalformedOutput {
        stage: Stage,
        #[source]
        source: OutputError,
    },

    #[error("{stage:?} stage store failure: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

/// Stable caller-facing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidArgument,
    Unavailable,
    ProcessingFailed,
    NotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::ProcessingFailed => "processing_failed",
            ErrorCode::NotFound => "not_found",
        }
    }
}

impl ResolveError {
    pub fn model(source: UpstreamError) -> Self {
        ResolveError::Upstream {
            stage: Stage::Model,
            source,
        }
    }

    pub fn output(stage: Stage, source: impl Into<OutputError>) -> Self {
        ResolveError::MalformedOutput {
            stage,
            source: source.into(),
        }
    }

    /// The stage this failure is tagged with.
    pub fn stage(&self) -> Stage {
        match self {
            ResolveError::InvalidInput(_) => Stage::Input,
            ResolveError::Upstream { stage, .. }
            | ResolveError::MalformedOutput { stage, .. }
            | ResolveError::Store { stage, .. } => *stage,
            ResolveError::NotFound(_) => Stage::Labels,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::InvalidInput(_) => ErrorCode::InvalidArgument,
            ResolveError::Upstream { .. } | ResolveError::Store { .. } => ErrorCode::Unavailable,
            ResolveError::MalformedOutput { .. } => ErrorCode::ProcessingFailed,
            ResolveError::NotFound(_) => ErrorCode::NotFound,
        }
    }

    /// Message safe to hand to an untrusted caller.
    ///
    /// Invalid-input and not-found messages are caller-authored context and pass
    /// through verbatim; everything else collapses to a fixed string.
    pub fn public_message(&self) -> String {
        match self {
            ResolveError::InvalidInput(msg) | ResolveError::NotFound(msg) => msg.clone(),
            ResolveError::Upstream { .. } | ResolveError::Store { .. } => {
                "Service temporarily unavailable, please retry.".to_string()
            }
            ResolveError::MalformedOutput { .. } => "Processing failed.".to_string(),
        }
    }
}
