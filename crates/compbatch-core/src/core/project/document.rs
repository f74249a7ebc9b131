//! Document State
//!
//! The in-memory working document: project metadata plus the scene library.
//! Persisted as pretty JSON through the crash-tolerant writer.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{fs::atomic_write_json_pretty, library::SceneLibrary, CoreError, CoreResult};

/// Document format version (for future migrations)
pub const DOCUMENT_VERSION: &str = "1.0.0";

// =============================================================================
// Document Metadata
// =============================================================================

/// Document metadata stored alongside the library
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Document name
    pub name: String,
    /// Format version
    pub version: String,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last modified timestamp (ISO 8601)
    pub modified_at: String,
}

impl DocumentMeta {
    /// Creates new document metadata
    pub fn new(name: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name: name.to_string(),
            version: DOCUMENT_VERSION.to_string(),
            created_at: now.clone(),
            modified_at: now,
        }
    }

    /// Updates the modified timestamp
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

// =============================================================================
// On-Disk Format
// =============================================================================

/// Serialized document file contents
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentData {
    meta: DocumentMeta,
    library: SceneLibrary,
}

// =============================================================================
// Project Document
// =============================================================================

/// The open working document
#[derive(Clone, Debug)]
pub struct ProjectDocument {
    /// Document metadata
    pub meta: DocumentMeta,
    /// The scene library
    pub library: SceneLibrary,
    /// Where the document lives on disk, once saved/opened
    pub path: Option<PathBuf>,
}

impl ProjectDocument {
    /// Creates a new unsaved document
    pub fn new(name: &str) -> Self {
        Self {
            meta: DocumentMeta::new(name),
            library: SceneLibrary::new(),
            path: None,
        }
    }

    /// Opens a document from disk
    pub fn open(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::DocumentNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let data: DocumentData = serde_json::from_reader(reader)
            .map_err(|e| CoreError::DocumentCorrupted(e.to_string()))?;

        Ok(Self {
            meta: data.meta,
            library: data.library,
            path: Some(path.to_path_buf()),
        })
    }

    /// Saves the document back to its file
    pub fn save(&mut self) -> CoreResult<()> {
        let path = self.path.clone().ok_or(CoreError::DocumentUnsaved)?;
        self.meta.touch();
        self.write_to(&path)
    }

    /// Saves the document to a new file and adopts that path
    pub fn save_as(&mut self, path: &Path) -> CoreResult<()> {
        self.meta.touch();
        self.write_to(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Writes a full copy to `path` without touching metadata or adopting
    /// the path. Used for archival copies.
    pub fn save_copy(&self, path: &Path) -> CoreResult<()> {
        self.write_to(path)
    }

    fn write_to(&self, path: &Path) -> CoreResult<()> {
        let data = DocumentData {
            meta: self.meta.clone(),
            library: self.library.clone(),
        };
        atomic_write_json_pretty(path, &data)
            .map_err(|e| CoreError::DocumentSaveFailed(e.to_string()))
    }
}
