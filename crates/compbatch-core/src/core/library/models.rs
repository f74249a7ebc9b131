//! Scene Library Model Definitions
//!
//! Defines library items (scenes, footage), layers and folders. A scene owns
//! its layers; a layer may reference another library item by ID, which is
//! what makes the library a graph rather than a tree: the same scene can be
//! reachable through multiple referencing layers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{new_id, FolderId, ItemId, SceneFormat};

// =============================================================================
// Layer
// =============================================================================

/// Content source of a layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerSource {
    /// Inline text content
    Text { text: String },
    /// Reference to a footage item in the library
    Footage { item_id: ItemId },
    /// Reference to another scene in the library (not ownership)
    SceneRef { item_id: ItemId },
}

/// A single element inside a scene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Display name; substitution matching is by exact name equality
    pub name: String,
    /// Locked layers cannot be edited until unlocked
    pub locked: bool,
    /// What this layer shows
    pub source: LayerSource,
}

impl Layer {
    /// Creates a text layer
    pub fn text(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            locked: false,
            source: LayerSource::Text {
                text: text.to_string(),
            },
        }
    }

    /// Creates a footage layer pointing at a library item
    pub fn footage(name: &str, item_id: ItemId) -> Self {
        Self {
            name: name.to_string(),
            locked: false,
            source: LayerSource::Footage { item_id },
        }
    }

    /// Creates a layer referencing another scene
    pub fn scene_ref(name: &str, item_id: ItemId) -> Self {
        Self {
            name: name.to_string(),
            locked: false,
            source: LayerSource::SceneRef { item_id },
        }
    }

    /// Marks the layer as locked
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Returns the referenced scene ID, if this layer references one
    pub fn scene_target(&self) -> Option<&ItemId> {
        match &self.source {
            LayerSource::SceneRef { item_id } => Some(item_id),
            _ => None,
        }
    }
}

// =============================================================================
// Scene
// =============================================================================

/// A composable unit containing ordered layers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Output format
    pub format: SceneFormat,
    /// Ordered layer stack
    pub layers: Vec<Layer>,
}

impl Scene {
    /// Creates an empty scene with the given format
    pub fn new(format: SceneFormat) -> Self {
        Self {
            format,
            layers: vec![],
        }
    }

    /// Appends a layer
    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Builder-style layer append
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Gets a layer by exact name (first match in stacking order)
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneFormat::default())
    }
}

// =============================================================================
// Footage
// =============================================================================

/// An imported media asset. No format validation happens at import time;
/// the host's render facility is the arbiter of what it can decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootageAsset {
    /// Source file path
    pub path: PathBuf,
}

impl FootageAsset {
    /// Creates a footage asset for the given path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

// =============================================================================
// Item
// =============================================================================

/// Kind of a library item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemKind {
    /// A scene with layers
    Scene(Scene),
    /// An imported footage asset
    Footage(FootageAsset),
    /// Anything else the host may hold (solids, placeholders, ...)
    Other,
}

/// One entry of the scene library
///
/// The ID is the item's stable identity; the name is mutable display state
/// and is not guaranteed unique across the library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable identity (ULID)
    pub id: ItemId,
    /// Mutable display name
    pub name: String,
    /// Owning folder, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder: Option<FolderId>,
    /// Item payload
    pub kind: ItemKind,
}

impl Item {
    /// Creates a scene item
    pub fn scene(name: &str, scene: Scene) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            parent_folder: None,
            kind: ItemKind::Scene(scene),
        }
    }

    /// Creates a footage item
    pub fn footage(name: &str, asset: FootageAsset) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            parent_folder: None,
            kind: ItemKind::Footage(asset),
        }
    }

    /// Creates an opaque item
    pub fn other(name: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            parent_folder: None,
            kind: ItemKind::Other,
        }
    }

    /// Returns true when the item is a scene
    pub fn is_scene(&self) -> bool {
        matches!(self.kind, ItemKind::Scene(_))
    }
}

// =============================================================================
// Folder
// =============================================================================

/// A library folder/namespace; clones produced during a batch run are
/// parented to one so originals stay untouched and run artifacts are easy to
/// locate and clean up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Stable identity (ULID)
    pub id: FolderId,
    /// Display name
    pub name: String,
}

impl Folder {
    /// Creates a folder
    pub fn new(name: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
        }
    }
}
