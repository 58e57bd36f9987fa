//! Error types for kurl-installer

use crate::validate::ValidationError;
use kurl_versions::ResolutionError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using kurl-installer's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed installer document
#[derive(Error, Debug)]
pub enum ParseError {
    /// YAML syntax error
    #[error("YAML could not be parsed: {0}")]
    Syntax(#[from] serde_yaml_ng::Error),

    /// A value that must be a mapping is not one
    #[error("{path} must be a mapping")]
    NotAMapping { path: String },
}

impl ParseError {
    pub fn not_a_mapping(path: impl Into<String>) -> Self {
        Self::NotAMapping { path: path.into() }
    }
}

/// Installer store failures
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The slug is owned by another team
    #[error("installer {id} belongs to another team")]
    Forbidden { id: String },

    /// The row lock could not be acquired in time
    #[error("timed out after {waited:?} waiting for installer {id}")]
    Timeout { id: String, waited: Duration },

    /// The record does not fit the id space it is saved into
    #[error("{message}")]
    InvalidRecord { message: String },

    /// A stored document no longer parses
    #[error("stored installer {id} could not be read: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: ParseError,
    },
}

impl PersistenceError {
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

/// Installer service errors
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// One or more validation failures, first one first
    #[error("{}", render_validation(.0))]
    Validation(Vec<ValidationError>),

    /// A version token could not be resolved outside of validation
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Name is indistinguishable from a generated ID.")]
    GeneratedIdName,

    #[error("The requested custom installer name is reserved")]
    ReservedName,

    #[error("Installer names may only contain letters, digits, '-' and '_', up to 255 characters")]
    InvalidName,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("The requested installer does not exist")]
    NotFound { id: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Schema loading and other shared failures
    #[error(transparent)]
    Core(#[from] kurl_core::Error),
}

impl Error {
    /// Status code an HTTP front end should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Parse(_)
            | Self::Validation(_)
            | Self::Resolution(_)
            | Self::GeneratedIdName
            | Self::ReservedName
            | Self::InvalidName => 400,
            Self::Unauthenticated => 401,
            Self::Persistence(PersistenceError::Forbidden { .. }) => 403,
            Self::NotFound { .. } => 404,
            Self::Persistence(_) | Self::Core(_) => 500,
        }
    }

    /// Validation failures, if that is what this is
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn render_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
