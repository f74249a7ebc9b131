//! Scene Library Module
//!
//! Process-wide collection of named items (scenes, footage, folders).
//! Insertion order is preserved: names are not unique, and every by-name
//! lookup treats the first match in insertion order as canonical.

mod models;

pub use models::*;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CoreError, CoreResult, FolderId, ItemId};

/// The scene library: all items and folders of the open document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneLibrary {
    /// Items in insertion order
    items: Vec<Item>,
    /// Folders in insertion order
    folders: Vec<Folder>,
}

impl SceneLibrary {
    /// Creates an empty library
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds an item and returns its ID
    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = item.id.clone();
        self.items.push(item);
        id
    }

    /// Gets an item by ID
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Gets a mutable item by ID
    pub fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    /// Gets the scene payload of an item, or an error when the item is
    /// missing or not a scene
    pub fn scene(&self, id: &ItemId) -> CoreResult<&Scene> {
        let item = self
            .item(id)
            .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;
        match &item.kind {
            ItemKind::Scene(scene) => Ok(scene),
            _ => Err(CoreError::NotAScene(id.clone())),
        }
    }

    /// Mutable variant of [`SceneLibrary::scene`]
    pub fn scene_mut(&mut self, id: &ItemId) -> CoreResult<&mut Scene> {
        let item = self
            .item_mut(id)
            .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;
        match &mut item.kind {
            ItemKind::Scene(scene) => Ok(scene),
            _ => Err(CoreError::NotAScene(id.clone())),
        }
    }

    /// Renames an item
    pub fn rename_item(&mut self, id: &ItemId, name: &str) -> CoreResult<()> {
        let item = self
            .item_mut(id)
            .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;
        item.name = name.to_string();
        Ok(())
    }

    /// Finds the first scene item whose display name equals `name`.
    ///
    /// Names are not unique; the first match in insertion order is canonical.
    /// Items that carry the name but are not scenes are passed over. A miss
    /// is a `None`, never an error.
    pub fn find_scene_by_name(&self, name: &str) -> Option<ItemId> {
        self.items
            .iter()
            .find(|i| i.name == name && i.is_scene())
            .map(|i| i.id.clone())
    }

    /// Iterates over all items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Number of items in the library
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when the library holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // =========================================================================
    // Folders
    // =========================================================================

    /// Creates a folder and returns its ID
    pub fn add_folder(&mut self, name: &str) -> FolderId {
        let folder = Folder::new(name);
        let id = folder.id.clone();
        self.folders.push(folder);
        id
    }

    /// Gets a folder by ID
    pub fn folder(&self, id: &FolderId) -> Option<&Folder> {
        self.folders.iter().find(|f| &f.id == id)
    }

    /// Moves an item into a folder
    pub fn move_to_folder(&mut self, item_id: &ItemId, folder_id: &FolderId) -> CoreResult<()> {
        if self.folder(folder_id).is_none() {
            return Err(CoreError::FolderNotFound(folder_id.clone()));
        }
        let item = self
            .item_mut(item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.clone()))?;
        item.parent_folder = Some(folder_id.clone());
        Ok(())
    }

    /// Iterates over the items parented to a folder, in insertion order
    pub fn items_in_folder<'a>(
        &'a self,
        folder_id: &'a FolderId,
    ) -> impl Iterator<Item = &'a Item> + 'a {
        self.items
            .iter()
            .filter(move |i| i.parent_folder.as_ref() == Some(folder_id))
    }

    // =========================================================================
    // Footage Import
    // =========================================================================

    /// Imports an external file as a footage item and returns its ID.
    ///
    /// The file must exist; beyond that, no format validation is performed.
    /// Each call registers a fresh item even for a path imported before.
    pub fn import_footage(&mut self, path: &Path) -> CoreResult<ItemId> {
        if !path.is_file() {
            return Err(CoreError::FootageImportFailed(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let item = Item::footage(&name, FootageAsset::new(path.to_path_buf()));
        let id = self.add_item(item);
        debug!(path = %path.display(), item_id = %id, "imported footage");
        Ok(id)
    }
}
