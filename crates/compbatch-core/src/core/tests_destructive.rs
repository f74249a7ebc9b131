//! Destructive and Edge Case Tests for the Core Engine
//!
//! These tests verify robustness against hostile batch input, degenerate
//! template graphs and conflicting binding tables.

use std::collections::HashMap;

use crate::core::batch::{parse_batch, BatchRow};
use crate::core::duplicate::{duplicate_for_job, LayerAction, SubstitutionBindings};
use crate::core::library::{Item, Layer, LayerSource, Scene, SceneLibrary};
use crate::core::ItemId;

fn row_with(values: &[(&str, &str)]) -> BatchRow {
    let map: HashMap<String, String> = values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BatchRow {
        line: 2,
        template_name: map.get("Comp").cloned().unwrap_or_default(),
        output_name: map.get("NewComp").cloned().unwrap_or_default(),
        values: map,
    }
}

fn ref_target(lib: &SceneLibrary, scene_id: &ItemId, layer_name: &str) -> ItemId {
    lib.scene(scene_id)
        .unwrap()
        .layer(layer_name)
        .unwrap()
        .scene_target()
        .unwrap()
        .clone()
}

// =============================================================================
// Hostile Batch Input
// =============================================================================

#[test]
fn test_destructive_row_with_more_fields_than_headers() {
    let batch = parse_batch("Comp\tNewComp\nT\tOut\textra\tmore\teven more", '\t');
    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].output_name, "Out");
}

#[test]
fn test_destructive_duplicate_header_keeps_first_column() {
    let batch = parse_batch("Comp\tComp\tNewComp\nFirst\tSecond\tOut", '\t');
    assert_eq!(batch.rows[0].template_name, "First");
}

#[test]
fn test_destructive_whitespace_only_row_is_blank() {
    let batch = parse_batch("Comp\tNewComp\n \t \n", '\t');
    // The row splits into whitespace fields; both names trim to empty and
    // the line itself trims to blank, so it is silently skipped.
    assert!(batch.rows.is_empty());
}

#[test]
fn test_destructive_unicode_names_survive_parsing() {
    let batch = parse_batch("Comp\tNewComp\tTitel1\nVorschau\tgrößer_🎬\tÜberschrift", '\t');
    assert_eq!(batch.rows[0].output_name, "größer_🎬");
    assert_eq!(batch.rows[0].value("Titel1"), "Überschrift");
}

// =============================================================================
// Degenerate Template Graphs
// =============================================================================

#[test]
fn test_destructive_deep_reference_chain() {
    // A linear chain of 200 nested scenes must duplicate without blowing
    // the stack: recursion depth equals chain length, well within limits,
    // and every link is cloned exactly once.
    let mut lib = SceneLibrary::new();
    let mut prev: Option<ItemId> = None;
    for i in 0..200 {
        let mut scene = Scene::default();
        if let Some(child) = prev.take() {
            scene.push_layer(Layer::scene_ref("Next", child));
        }
        prev = Some(lib.add_item(Item::scene(&format!("Link{i}"), scene)));
    }
    let root = prev.unwrap();
    let before = lib.len();

    let container = lib.add_folder("Render_Queue_Processed");
    let row = row_with(&[("Comp", "Link199"), ("NewComp", "Chain")]);
    duplicate_for_job(&mut lib, &root, &row, &SubstitutionBindings::default(), &container)
        .unwrap();

    assert_eq!(lib.len(), before * 2);
}

#[test]
fn test_destructive_triangle_cycle_with_diamond() {
    // A -> B -> C -> A plus a direct A -> C edge: cycle and diamond at once.
    let mut lib = SceneLibrary::new();
    let a = lib.add_item(Item::scene("A", Scene::default()));
    let c = lib.add_item(Item::scene(
        "C",
        Scene::default().with_layer(Layer::scene_ref("ToA", a.clone())),
    ));
    let b = lib.add_item(Item::scene(
        "B",
        Scene::default().with_layer(Layer::scene_ref("ToC", c.clone())),
    ));
    {
        let scene = lib.scene_mut(&a).unwrap();
        scene.push_layer(Layer::scene_ref("ToB", b));
        scene.push_layer(Layer::scene_ref("ToCDirect", c));
    }

    let container = lib.add_folder("Render_Queue_Processed");
    let row = row_with(&[("Comp", "A"), ("NewComp", "Tri")]);
    let outcome =
        duplicate_for_job(&mut lib, &a, &row, &SubstitutionBindings::default(), &container)
            .unwrap();

    // Exactly three clones; both routes to C agree; the cycle closes on the
    // root clone.
    assert_eq!(lib.items_in_folder(&container).count(), 3);
    let b_clone = ref_target(&lib, &outcome.clone_id, "ToB");
    let c_via_b = ref_target(&lib, &b_clone, "ToC");
    let c_direct = ref_target(&lib, &outcome.clone_id, "ToCDirect");
    assert_eq!(c_via_b, c_direct);
    assert_eq!(ref_target(&lib, &c_direct, "ToA"), outcome.clone_id);
}

#[test]
fn test_destructive_template_with_zero_layers() {
    let mut lib = SceneLibrary::new();
    let empty = lib.add_item(Item::scene("Empty", Scene::default()));
    let container = lib.add_folder("Render_Queue_Processed");
    let row = row_with(&[("Comp", "Empty"), ("NewComp", "Out")]);

    let outcome =
        duplicate_for_job(&mut lib, &empty, &row, &SubstitutionBindings::default(), &container)
            .unwrap();
    assert!(lib.scene(&outcome.clone_id).unwrap().layers.is_empty());
    assert!(outcome.layers.is_empty());
}

// =============================================================================
// Conflicting Bindings
// =============================================================================

#[test]
fn test_destructive_layer_bound_as_text_and_footage() {
    // A layer name listed in both tables: the text branch skips (non-text
    // layer untouched by it), the footage branch applies.
    let dir = tempfile::TempDir::new().unwrap();
    let media = dir.path().join("clip.mov");
    std::fs::write(&media, b"\0").unwrap();

    let mut lib = SceneLibrary::new();
    let template = lib.add_item(Item::scene(
        "T",
        Scene::default().with_layer(Layer::footage("Both", "old-item".to_string())),
    ));
    let container = lib.add_folder("Render_Queue_Processed");

    let bindings = SubstitutionBindings::empty()
        .with_text("Both", "Both")
        .with_footage("Both", "Both");
    let row = row_with(&[("Comp", "T"), ("NewComp", "Out"), ("Both", media.to_str().unwrap())]);

    let outcome = duplicate_for_job(&mut lib, &template, &row, &bindings, &container).unwrap();

    let layer = lib.scene(&outcome.clone_id).unwrap().layer("Both").unwrap().clone();
    assert!(matches!(layer.source, LayerSource::Footage { ref item_id } if item_id != "old-item"));
    assert!(outcome
        .layers
        .iter()
        .any(|o| matches!(o.action, LayerAction::Skipped { .. })));
    assert!(outcome
        .layers
        .iter()
        .any(|o| matches!(o.action, LayerAction::FootageApplied { .. })));
}

#[test]
fn test_destructive_binding_name_collides_with_scene_ref_layer() {
    // A scene-reference layer named like a text binding: the text branch
    // records a skip, the reference is still rewired.
    let mut lib = SceneLibrary::new();
    let inner = lib.add_item(Item::scene("Inner", Scene::default()));
    let template = lib.add_item(Item::scene(
        "T",
        Scene::default().with_layer(Layer::scene_ref("Titel1", inner.clone())),
    ));
    let container = lib.add_folder("Render_Queue_Processed");
    let row = row_with(&[("Comp", "T"), ("NewComp", "Out"), ("Titel1", "Hello")]);

    let outcome =
        duplicate_for_job(&mut lib, &template, &row, &SubstitutionBindings::default(), &container)
            .unwrap();

    let rewired = ref_target(&lib, &outcome.clone_id, "Titel1");
    assert_ne!(rewired, inner);
    assert!(outcome.layers.iter().any(|o| {
        o.layer == "Titel1"
            && matches!(&o.action, LayerAction::Skipped { reason } if reason.contains("non-text"))
    }));
}

// =============================================================================
// Library Name Collisions
// =============================================================================

#[test]
fn test_destructive_clone_name_collision_with_existing_scene() {
    // A scene named like the upcoming output name already exists. The run
    // must still resolve the template by name (first match) and produce a
    // clone; the collision is tolerated, not detected.
    let mut lib = SceneLibrary::new();
    lib.add_item(Item::scene("Promo1", Scene::default()));
    let template = lib.add_item(Item::scene("T", Scene::default()));
    let container = lib.add_folder("Render_Queue_Processed");
    let row = row_with(&[("Comp", "T"), ("NewComp", "Promo1")]);

    let outcome =
        duplicate_for_job(&mut lib, &template, &row, &SubstitutionBindings::default(), &container)
            .unwrap();

    assert_eq!(lib.item(&outcome.clone_id).unwrap().name, "Promo1");
    // First-match lookup still finds the pre-existing scene, not the clone.
    assert_ne!(lib.find_scene_by_name("Promo1"), Some(outcome.clone_id));
}
