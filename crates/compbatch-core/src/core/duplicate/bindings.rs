//! Substitution Bindings
//!
//! Fixed tables mapping layer names to batch columns. A binding applies only
//! when the layer name matches exactly AND the job row supplies a non-empty
//! value for the bound column; every other layer is left untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Layer-name to column-name tables for text and footage substitution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionBindings {
    /// Text layers: layer name -> batch column
    pub text: HashMap<String, String>,
    /// Footage layers: layer name -> batch column holding a file path
    pub footage: HashMap<String, String>,
}

impl SubstitutionBindings {
    /// Creates empty binding tables
    pub fn empty() -> Self {
        Self {
            text: HashMap::new(),
            footage: HashMap::new(),
        }
    }

    /// Adds a text binding (builder style)
    pub fn with_text(mut self, layer: &str, column: &str) -> Self {
        self.text.insert(layer.to_string(), column.to_string());
        self
    }

    /// Adds a footage binding (builder style)
    pub fn with_footage(mut self, layer: &str, column: &str) -> Self {
        self.footage.insert(layer.to_string(), column.to_string());
        self
    }

    /// Column bound to a text layer name, if any
    pub fn text_column(&self, layer_name: &str) -> Option<&str> {
        self.text.get(layer_name).map(String::as_str)
    }

    /// Column bound to a footage layer name, if any
    pub fn footage_column(&self, layer_name: &str) -> Option<&str> {
        self.footage.get(layer_name).map(String::as_str)
    }
}

impl Default for SubstitutionBindings {
    /// The stock binding tables used by the standard batch sheets
    fn default() -> Self {
        Self::empty()
            .with_text("Titel1", "Titel1")
            .with_text("Titel2", "Titel2")
            .with_text("TuneIn", "TuneIn")
            .with_footage("Video", "Video")
            .with_footage("Packshot", "Packshot")
    }
}
