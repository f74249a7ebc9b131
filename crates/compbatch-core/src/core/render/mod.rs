//! Render Queue Module
//!
//! Collects finished top-level clones as render queue entries, resolves
//! their output destinations, and hands the queue to the host's rendering
//! facility through the [`RenderHost`] seam. Queue execution is a single
//! blocking call that serializes all entries; the engine has no visibility
//! into the host's internal scheduling.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{
    fs::ensure_dir,
    library::{ItemKind, LayerSource, SceneLibrary},
    CoreError, CoreResult, ItemId,
};

/// Name of the render output directory next to the dashboard
pub const RENDERINGS_DIR: &str = "_Renderings";

// =============================================================================
// Queue Entries
// =============================================================================

/// Render status of a queue entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntryStatus {
    /// Waiting for queue execution
    #[default]
    Queued,
    /// Rendered successfully
    Rendered,
    /// Failed during queue execution
    Failed { error: String },
}

/// One finished clone scheduled for output rendering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderQueueEntry {
    /// The finished top-level clone
    pub scene_id: ItemId,
    /// Clone display name (the output key)
    pub scene_name: String,
    /// Resolved destination, extensionless; the host's output module owns
    /// the container format. `None` defers the failure to render time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Render status
    pub status: EntryStatus,
}

/// Totals of one queue execution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSummary {
    /// Entries rendered successfully
    pub rendered: usize,
    /// Entries that failed
    pub failed: usize,
}

// =============================================================================
// Output Path Policy
// =============================================================================

/// Resolves the render output directory.
///
/// Priority order: an explicitly supplied base directory, else a directory
/// named `_Renderings` beside the open document's parent directory. The
/// chosen directory is created when missing. `None` when neither source is
/// resolvable; entries then carry no destination and fail at render time.
pub fn resolve_render_dir(
    explicit_base: Option<&Path>,
    document_path: Option<&Path>,
) -> Option<PathBuf> {
    let dir = if let Some(base) = explicit_base {
        base.join(RENDERINGS_DIR)
    } else {
        let project_dir = document_path?.parent()?;
        project_dir.parent()?.join(RENDERINGS_DIR)
    };

    if let Err(e) = ensure_dir(&dir) {
        warn!(dir = %dir.display(), error = %e, "could not create render directory");
        return None;
    }
    Some(dir)
}

// =============================================================================
// Host Seam
// =============================================================================

/// The host facility that executes output rendering for one queue entry.
///
/// Implementations must treat the call as synchronous: when it returns, the
/// entry is either fully rendered or failed.
pub trait RenderHost {
    /// Renders one entry to its output path
    fn render(&mut self, library: &SceneLibrary, entry: &RenderQueueEntry) -> CoreResult<()>;
}

/// Render host that materializes the fully-resolved clone graph as a JSON
/// snapshot at `<output path>.json`. The file appearing under the render
/// directory is what downstream watching keys on.
#[derive(Debug, Default)]
pub struct SnapshotRenderer;

/// Snapshot written per rendered entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedSnapshot<'a> {
    scene: &'a str,
    items: Vec<&'a crate::core::library::Item>,
}

impl RenderHost for SnapshotRenderer {
    fn render(&mut self, library: &SceneLibrary, entry: &RenderQueueEntry) -> CoreResult<()> {
        let path = entry
            .output_path
            .as_ref()
            .ok_or(CoreError::NoOutputDestination)?;

        let items = collect_reachable(library, &entry.scene_id)?;
        let snapshot = RenderedSnapshot {
            scene: &entry.scene_name,
            items,
        };

        let file = path.with_extension("json");
        crate::core::fs::atomic_write_json_pretty(&file, &snapshot)
            .map_err(|e| CoreError::RenderFailed(e.to_string()))?;
        Ok(())
    }
}

/// Items reachable from a scene through layer sources, in traversal order.
/// The visited set bounds the walk on cyclic clone graphs.
fn collect_reachable<'a>(
    library: &'a SceneLibrary,
    root: &ItemId,
) -> CoreResult<Vec<&'a crate::core::library::Item>> {
    let mut visited: HashSet<ItemId> = HashSet::new();
    let mut queue = vec![root.clone()];
    let mut items = Vec::new();

    while let Some(id) = queue.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let item = library
            .item(&id)
            .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;
        items.push(item);

        if let ItemKind::Scene(scene) = &item.kind {
            for layer in &scene.layers {
                match &layer.source {
                    LayerSource::Footage { item_id } | LayerSource::SceneRef { item_id } => {
                        if !visited.contains(item_id) {
                            queue.push(item_id.clone());
                        }
                    }
                    LayerSource::Text { .. } => {}
                }
            }
        }
    }

    Ok(items)
}

// =============================================================================
// Render Queue
// =============================================================================

/// Ordered output queue of one batch run
#[derive(Clone, Debug, Default)]
pub struct RenderQueue {
    entries: Vec<RenderQueueEntry>,
}

impl RenderQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry for a finished clone and assigns its destination
    /// (`<dir>/<scene name>` when a directory was resolved). Returns a copy
    /// of the queued entry.
    pub fn submit(
        &mut self,
        scene_id: ItemId,
        scene_name: &str,
        render_dir: Option<&Path>,
    ) -> RenderQueueEntry {
        let output_path = render_dir.map(|dir| dir.join(scene_name));
        if output_path.is_none() {
            warn!(scene = scene_name, "enqueued without output destination");
        }

        let entry = RenderQueueEntry {
            scene_id,
            scene_name: scene_name.to_string(),
            output_path,
            status: EntryStatus::Queued,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[RenderQueueEntry] {
        &self.entries
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Executes the whole queue through the host, blocking until every entry
    /// has either rendered or failed. Per-entry failures are recorded on the
    /// entry and do not stop the queue.
    pub fn render_all(&mut self, host: &mut dyn RenderHost, library: &SceneLibrary) -> RenderSummary {
        let mut summary = RenderSummary::default();

        for entry in &mut self.entries {
            match host.render(library, entry) {
                Ok(()) => {
                    entry.status = EntryStatus::Rendered;
                    summary.rendered += 1;
                    info!(scene = %entry.scene_name, "rendered");
                }
                Err(e) => {
                    warn!(scene = %entry.scene_name, error = %e, "render failed");
                    entry.status = EntryStatus::Failed {
                        error: e.to_string(),
                    };
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::{Item, Layer, Scene, SceneLibrary};
    use tempfile::TempDir;

    /// Records rendered entries without touching the filesystem
    #[derive(Default)]
    struct RecordingHost {
        rendered: Vec<String>,
        fail: Vec<String>,
    }

    impl RenderHost for RecordingHost {
        fn render(&mut self, _library: &SceneLibrary, entry: &RenderQueueEntry) -> CoreResult<()> {
            if self.fail.contains(&entry.scene_name) {
                return Err(CoreError::RenderFailed("boom".to_string()));
            }
            if entry.output_path.is_none() {
                return Err(CoreError::NoOutputDestination);
            }
            self.rendered.push(entry.scene_name.clone());
            Ok(())
        }
    }

    // =========================================================================
    // Path Policy Tests
    // =========================================================================

    #[test]
    fn test_explicit_base_dir_wins() {
        let base = TempDir::new().unwrap();
        let doc_dir = TempDir::new().unwrap();
        let doc = doc_dir.path().join("projects").join("show.cbproj");

        let dir = resolve_render_dir(Some(base.path()), Some(&doc)).unwrap();
        assert_eq!(dir, base.path().join(RENDERINGS_DIR));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_document_relative_fallback() {
        let root = TempDir::new().unwrap();
        let project_dir = root.path().join("projects");
        std::fs::create_dir_all(&project_dir).unwrap();
        let doc = project_dir.join("show.cbproj");

        let dir = resolve_render_dir(None, Some(&doc)).unwrap();
        assert_eq!(dir, root.path().join(RENDERINGS_DIR));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_unresolvable_dir_is_none() {
        assert_eq!(resolve_render_dir(None, None), None);
    }

    // =========================================================================
    // Queue Tests
    // =========================================================================

    #[test]
    fn test_submit_assigns_destination() {
        let dir = TempDir::new().unwrap();
        let mut queue = RenderQueue::new();

        let entry = queue.submit("scene-1".to_string(), "Promo1", Some(dir.path()));
        assert_eq!(entry.output_path.as_deref(), Some(dir.path().join("Promo1").as_path()));
        assert_eq!(entry.status, EntryStatus::Queued);
    }

    #[test]
    fn test_submit_without_dir_defers_failure() {
        let mut queue = RenderQueue::new();
        let entry = queue.submit("scene-1".to_string(), "Promo1", None);
        assert_eq!(entry.output_path, None);

        let mut host = RecordingHost::default();
        let summary = queue.render_all(&mut host, &SceneLibrary::new());
        assert_eq!(summary.failed, 1);
        assert!(matches!(
            queue.entries()[0].status,
            EntryStatus::Failed { .. }
        ));
    }

    #[test]
    fn test_render_all_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let mut queue = RenderQueue::new();
        queue.submit("a".to_string(), "First", Some(dir.path()));
        queue.submit("b".to_string(), "Second", Some(dir.path()));

        let mut host = RecordingHost {
            fail: vec!["First".to_string()],
            ..Default::default()
        };
        let summary = queue.render_all(&mut host, &SceneLibrary::new());

        assert_eq!(summary.rendered, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(host.rendered, vec!["Second".to_string()]);
    }

    // =========================================================================
    // Snapshot Renderer Tests
    // =========================================================================

    #[test]
    fn test_snapshot_renderer_writes_reachable_graph() {
        let dir = TempDir::new().unwrap();
        let mut lib = SceneLibrary::new();
        let inner = lib.add_item(Item::scene(
            "Inner",
            Scene::default().with_layer(Layer::text("TuneIn", "x")),
        ));
        let root = lib.add_item(Item::scene(
            "Promo1",
            Scene::default().with_layer(Layer::scene_ref("Nested", inner)),
        ));
        // Unreachable item must not leak into the output.
        lib.add_item(Item::scene("Unrelated", Scene::default()));

        let mut queue = RenderQueue::new();
        queue.submit(root, "Promo1", Some(dir.path()));
        let summary = queue.render_all(&mut SnapshotRenderer, &lib);
        assert_eq!(summary.rendered, 1);

        let rendered = dir.path().join("Promo1.json");
        assert!(rendered.exists());
        let text = std::fs::read_to_string(&rendered).unwrap();
        assert!(text.contains("Inner"));
        assert!(!text.contains("Unrelated"));
    }

    #[test]
    fn test_snapshot_renderer_handles_cyclic_clone_graph() {
        let dir = TempDir::new().unwrap();
        let mut lib = SceneLibrary::new();
        let a = lib.add_item(Item::scene("A", Scene::default()));
        let b = lib.add_item(Item::scene(
            "B",
            Scene::default().with_layer(Layer::scene_ref("ToA", a.clone())),
        ));
        lib.scene_mut(&a)
            .unwrap()
            .push_layer(Layer::scene_ref("ToB", b));

        let mut queue = RenderQueue::new();
        queue.submit(a, "Loop", Some(dir.path()));
        let summary = queue.render_all(&mut SnapshotRenderer, &lib);
        assert_eq!(summary.rendered, 1);
    }
}
