//! Graph Duplication Engine
//!
//! Recursively clones a scene and every nested scene it references,
//! memoized through the per-job cache, applying field substitution and
//! rewiring references to point at clones. The clone is registered in the
//! cache before its layers are processed; a template whose reference graph
//! contains diamonds or cycles therefore resolves to the in-progress clone
//! instead of recursing forever.
//!
//! Per-layer failures degrade to recorded skip outcomes; one bad layer
//! never aborts the duplication.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{
    batch::BatchRow,
    library::{Item, ItemKind, LayerSource, SceneLibrary},
    CoreError, CoreResult, FolderId, ItemId,
};

use super::{DuplicationCache, SubstitutionBindings};

// =============================================================================
// Layer Outcomes
// =============================================================================

/// What happened to one layer during duplication
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOutcome {
    /// Source scene the layer belongs to
    pub scene: String,
    /// Layer name
    pub layer: String,
    /// Action taken
    pub action: LayerAction,
}

/// Action taken on a layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerAction {
    /// Text content overwritten from a batch column
    TextApplied { column: String },
    /// Layer repointed at freshly imported footage
    FootageApplied { column: String, path: String },
    /// Scene reference repointed at the per-job clone
    Rewired { target: ItemId },
    /// Processing was skipped; the layer keeps its previous state
    Skipped { reason: String },
}

/// Result of duplicating one template for one job
#[derive(Clone, Debug)]
pub struct DuplicationOutcome {
    /// The finished top-level clone
    pub clone_id: ItemId,
    /// Per-layer actions across the whole clone set
    pub layers: Vec<LayerOutcome>,
}

// =============================================================================
// Engine
// =============================================================================

/// Duplicates the template for one job row with a fresh cache and renames
/// the finished top-level clone to the row's output name.
pub fn duplicate_for_job(
    library: &mut SceneLibrary,
    template_id: &ItemId,
    row: &BatchRow,
    bindings: &SubstitutionBindings,
    container: &FolderId,
) -> CoreResult<DuplicationOutcome> {
    let mut cache = DuplicationCache::new();
    let mut layers = Vec::new();

    let clone_id = duplicate_hierarchy(
        library,
        template_id,
        row,
        bindings,
        &mut cache,
        container,
        &row.output_name,
        &mut layers,
    )?;

    // The internal discriminator naming is overridden on the root: the render
    // queue and the output watcher key on exactly the output name.
    library.rename_item(&clone_id, &row.output_name)?;

    debug!(
        template = %row.template_name,
        output = %row.output_name,
        clones = cache.len(),
        "duplicated template"
    );

    Ok(DuplicationOutcome {
        clone_id,
        layers,
    })
}

/// Clones `source_id` and, transitively, every scene it references.
///
/// Returns the already-registered clone when the cache holds one; this is
/// what bounds the work on shared sub-scenes and what terminates reference
/// cycles.
#[allow(clippy::too_many_arguments)]
pub fn duplicate_hierarchy(
    library: &mut SceneLibrary,
    source_id: &ItemId,
    row: &BatchRow,
    bindings: &SubstitutionBindings,
    cache: &mut DuplicationCache,
    container: &FolderId,
    suffix: &str,
    outcomes: &mut Vec<LayerOutcome>,
) -> CoreResult<ItemId> {
    // Memoization check.
    if let Some(clone_id) = cache.get(source_id) {
        trace!(source = %source_id, clone = %clone_id, "cache hit");
        return Ok(clone_id.clone());
    }

    // Shallow clone of the source scene, parented to the run container.
    let (source_name, scene) = {
        let item = library
            .item(source_id)
            .ok_or_else(|| CoreError::ItemNotFound(source_id.clone()))?;
        match &item.kind {
            ItemKind::Scene(scene) => (item.name.clone(), scene.clone()),
            _ => return Err(CoreError::NotAScene(source_id.clone())),
        }
    };

    let mut clone = Item::scene(&format!("{source_name}_{suffix}"), scene);
    clone.parent_folder = Some(container.clone());
    let clone_id = library.add_item(clone);

    // Registered before descending into layers. Mandatory ordering: a layer
    // that references this scene again (directly or through a cycle) must
    // resolve to this in-progress clone.
    cache.insert(source_id.clone(), clone_id.clone());

    // The layer stack is taken out of the clone while it is processed, so
    // recursion and footage import can mutate the library freely.
    let mut layers = std::mem::take(&mut library.scene_mut(&clone_id)?.layers);

    for layer in &mut layers {
        // Substitution needs mutability; unlocking is destructive to the
        // clone only.
        if layer.locked {
            layer.locked = false;
        }

        if let Some(column) = bindings.text_column(&layer.name) {
            let value = row.value(column);
            if !value.is_empty() {
                match &mut layer.source {
                    LayerSource::Text { text } => {
                        *text = value.to_string();
                        outcomes.push(LayerOutcome {
                            scene: source_name.clone(),
                            layer: layer.name.clone(),
                            action: LayerAction::TextApplied {
                                column: column.to_string(),
                            },
                        });
                    }
                    _ => outcomes.push(LayerOutcome {
                        scene: source_name.clone(),
                        layer: layer.name.clone(),
                        action: LayerAction::Skipped {
                            reason: "text binding matched a non-text layer".to_string(),
                        },
                    }),
                }
            }
        }

        if let Some(column) = bindings.footage_column(&layer.name) {
            let value = row.value(column).to_string();
            if !value.is_empty() {
                match library.import_footage(Path::new(&value)) {
                    Ok(item_id) => {
                        layer.source = LayerSource::Footage { item_id };
                        outcomes.push(LayerOutcome {
                            scene: source_name.clone(),
                            layer: layer.name.clone(),
                            action: LayerAction::FootageApplied {
                                column: column.to_string(),
                                path: value,
                            },
                        });
                    }
                    // Import failure keeps the layer's original source.
                    Err(e) => outcomes.push(LayerOutcome {
                        scene: source_name.clone(),
                        layer: layer.name.clone(),
                        action: LayerAction::Skipped {
                            reason: e.to_string(),
                        },
                    }),
                }
            }
        }

        if let Some(target) = layer.scene_target().cloned() {
            match duplicate_hierarchy(
                library, &target, row, bindings, cache, container, suffix, outcomes,
            ) {
                Ok(child_id) => {
                    if child_id != target {
                        layer.source = LayerSource::SceneRef {
                            item_id: child_id.clone(),
                        };
                        outcomes.push(LayerOutcome {
                            scene: source_name.clone(),
                            layer: layer.name.clone(),
                            action: LayerAction::Rewired { target: child_id },
                        });
                    }
                }
                // A broken reference skips this layer, not the duplication.
                Err(e) => outcomes.push(LayerOutcome {
                    scene: source_name.clone(),
                    layer: layer.name.clone(),
                    action: LayerAction::Skipped {
                        reason: format!("nested duplication failed: {e}"),
                    },
                }),
            }
        }
    }

    library.scene_mut(&clone_id)?.layers = layers;
    Ok(clone_id)
}
