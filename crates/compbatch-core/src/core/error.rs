//! Compbatch Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::{FolderId, ItemId, JobId};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Document Errors
    // =========================================================================
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document file corrupted: {0}")]
    DocumentCorrupted(String),

    #[error("Failed to save document: {0}")]
    DocumentSaveFailed(String),

    #[error("Document has never been saved to disk")]
    DocumentUnsaved,

    // =========================================================================
    // Library Errors
    // =========================================================================
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Folder not found: {0}")]
    FolderNotFound(FolderId),

    #[error("Item is not a scene: {0}")]
    NotAScene(ItemId),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Footage import failed: {0}")]
    FootageImportFailed(String),

    // =========================================================================
    // Render Errors
    // =========================================================================
    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("No output destination resolved")]
    NoOutputDestination,

    // =========================================================================
    // Job Store Errors
    // =========================================================================
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job store corrupted: {0}")]
    JobStoreCorrupted(String),

    // =========================================================================
    // Watcher Errors
    // =========================================================================
    #[error("Watcher failed: {0}")]
    WatcherFailed(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
