//! Run Configuration
//!
//! Everything a batch run consults is carried in one explicit configuration
//! object handed to the orchestrator at start. There are no ambient
//! process-wide path variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{batch::DEFAULT_DELIMITER, duplicate::SubstitutionBindings};

/// Library folder that owns every clone of a run
pub const PROCESSING_CONTAINER: &str = "Render_Queue_Processed";

/// Configuration of one batch run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// The working document to open
    pub project_path: PathBuf,
    /// The batch sheet to process
    pub batch_path: PathBuf,
    /// Dashboard directory override. When unset, the dashboard is the
    /// grandparent of the project file (projects live one level below it).
    pub dashboard_dir: Option<PathBuf>,
    /// Explicit render output base directory; wins over the
    /// document-relative default
    pub output_base_dir: Option<PathBuf>,
    /// Batch sheet field delimiter
    pub delimiter: char,
    /// Layer-name to column bindings
    pub bindings: SubstitutionBindings,
    /// Name of the clone container folder
    pub container_name: String,
    /// Whether the caller should terminate the host process after the run
    pub request_shutdown: bool,
}

impl RunConfig {
    /// Creates a config with stock bindings and defaults
    pub fn new(project_path: PathBuf, batch_path: PathBuf) -> Self {
        Self {
            project_path,
            batch_path,
            dashboard_dir: None,
            output_base_dir: None,
            delimiter: DEFAULT_DELIMITER,
            bindings: SubstitutionBindings::default(),
            container_name: PROCESSING_CONTAINER.to_string(),
            request_shutdown: true,
        }
    }

    /// Corrects degenerate values instead of failing, so a bad config file
    /// cannot brick an unattended run.
    pub fn normalize(&mut self) {
        if self.container_name.trim().is_empty() {
            warn!("empty container name, falling back to default");
            self.container_name = PROCESSING_CONTAINER.to_string();
        }
        if self.delimiter == '\0' {
            warn!("NUL delimiter, falling back to tab");
            self.delimiter = DEFAULT_DELIMITER;
        }
    }

    /// The effective dashboard directory: the explicit override, else the
    /// grandparent of the project file. `None` disables the status file,
    /// run log and job store.
    pub fn dashboard_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.dashboard_dir {
            return Some(dir.clone());
        }
        self.project_path
            .parent()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("/d/projects/show.cbproj".into(), "/d/batch.txt".into());
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.container_name, PROCESSING_CONTAINER);
        assert!(config.request_shutdown);
    }

    #[test]
    fn test_dashboard_derived_from_project_path() {
        let config = RunConfig::new("/d/projects/show.cbproj".into(), "/d/batch.txt".into());
        assert_eq!(config.dashboard_dir(), Some(PathBuf::from("/d")));
    }

    #[test]
    fn test_dashboard_override_wins() {
        let mut config = RunConfig::new("/d/projects/show.cbproj".into(), "/d/batch.txt".into());
        config.dashboard_dir = Some("/elsewhere".into());
        assert_eq!(config.dashboard_dir(), Some(PathBuf::from("/elsewhere")));
    }

    #[test]
    fn test_shallow_project_path_has_no_dashboard() {
        let config = RunConfig::new("show.cbproj".into(), "batch.txt".into());
        assert_eq!(config.dashboard_dir(), None);
    }

    #[test]
    fn test_normalize_corrects_degenerate_values() {
        let mut config = RunConfig::new("a".into(), "b".into());
        config.container_name = "   ".to_string();
        config.delimiter = '\0';
        config.normalize();
        assert_eq!(config.container_name, PROCESSING_CONTAINER);
        assert_eq!(config.delimiter, '\t');
    }
}
