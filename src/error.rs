//! Error handling for the module designer
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling.

use thiserror::Error;

/// Main error type for the designer
#[derive(Error, Debug)]
pub enum DesignerError {
    #[error("Design error: {0}")]
    Design(#[from] DesignError),

    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Prompt error: {message}")]
    Prompt { message: String },
}

impl DesignerError {
    pub fn template(message: impl Into<String>) -> Self {
        DesignerError::Template {
            message: message.into(),
        }
    }

    pub fn prompt(message: impl Into<String>) -> Self {
        DesignerError::Prompt {
            message: message.into(),
        }
    }

    /// Validation errors are recovered locally by re-prompting or
    /// returning to the action menu; everything else aborts the step.
    pub fn is_validation(&self) -> bool {
        matches!(self, DesignerError::Design(_))
    }
}

/// Validation errors raised while editing a design document
#[derive(Error, Debug)]
pub enum DesignError {
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Cannot add a {child}: create a {parent} first")]
    MissingParent { child: String, parent: String },

    #[error("A field called '{name}' already exists in this module")]
    DuplicateFieldName { name: String },

    #[error("{kind} '{identifier}' not found")]
    NotFound { kind: String, identifier: String },
}

impl DesignError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        DesignError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_parent(child: impl Into<String>, parent: impl Into<String>) -> Self {
        DesignError::MissingParent {
            child: child.into(),
            parent: parent.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, identifier: impl Into<String>) -> Self {
        DesignError::NotFound {
            kind: kind.into(),
            identifier: identifier.into(),
        }
    }
}

/// Errors raised while installing a design into storage
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Related module '{module}' does not exist in storage")]
    UnknownModule { module: String },

    #[error("Field '{field}' does not exist in module '{module}'")]
    UnknownField { module: String, field: String },

    #[error("Schema conflict on {table}.{column}: {message}")]
    SchemaConflict {
        table: String,
        column: String,
        message: String,
    },

    #[error("Artifact conflict at '{path}': {message}")]
    ArtifactWriteConflict { path: String, message: String },
}

/// Errors from the storage backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Draft '{name}' not found")]
    DraftNotFound { name: String },

    #[error("Module '{name}' is not installed")]
    ModuleNotInstalled { name: String },
}

impl StoreError {
    pub fn database(message: impl Into<String>) -> Self {
        StoreError::Database {
            message: message.into(),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Database {
            message: error.to_string(),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for DesignerError {
    fn from(error: sqlx::Error) -> Self {
        DesignerError::Store(StoreError::from(error))
    }
}

/// Result type aliases for convenience
pub type DesignerResult<T> = Result<T, DesignerError>;
pub type DesignResult<T> = Result<T, DesignError>;
pub type InstallResult<T> = Result<T, InstallError>;
pub type StoreResult<T> = Result<T, StoreError>;
