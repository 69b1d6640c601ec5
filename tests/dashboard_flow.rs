//! End-to-end: configuration → state → import → render.

use amr_dashboard::{DashboardConfig, DashboardState, DocumentKind, SessionStore};
use egui::{Pos2, Rect, Vec2};
use floorplan_model::{ProfileId, RobotPose};
use floorplan_view::{
    Layer, LayerVisibility, Primitive, RenderInputs, RetainedLayers, ViewAction,
};
use pretty_assertions::assert_eq;

const KEYED_MAP: &str = r#"{
    "nodeKeys": ["key", "x", "y", "type", "content", "name"],
    "lineKeys": ["startNode", "endNode", "leftWidth", "rightWidth", "path"],
    "nodeArr": [
        ["A", 0, 0, 0, "A", "Aisle A"],
        ["B", 10000, 0, 6, "B", "Dock B"],
        ["C", 10000, 10000, "special", "C", "Gate C"]
    ],
    "lineArr": [
        ["A", "B", 500, 500, [[0, 0], [5000, 800], [10000, 0]]],
        ["B", "C", 500, 500, []],
        ["B", "Z", 500, 500, []]
    ],
    "chargeCoor": [["C", 0]],
    "width": 20000,
    "height": 20000
}"#;

const POSITIONAL_MAP: &str = r#"{
    "nodeArr": [[100, 200, 0, "N1"], [3000, 200, 6, "N2", "Dock"]],
    "lineArr": [["N1", "N2"]],
    "width": 5000,
    "height": 5000
}"#;

const SECURITY: &str = r#"{"AvoidSceneSet": [
    {"id": "wide", "name": "Wide aisle", "config": {"noload": {"forward": 1200}, "loaded": {}}},
    {"id": "tight", "name": "Tight aisle", "config": {"noload": {"forward": 400}}}
]}"#;

fn viewport() -> Rect {
    Rect::from_min_size(Pos2::ZERO, Vec2::new(1000.0, 800.0))
}

fn render(state: &DashboardState) -> (RetainedLayers, floorplan_view::RenderReport) {
    let frame = state.frame();
    let inputs = RenderInputs {
        document: frame.document,
        security: frame.security,
        selected_profile: frame.selected_profile,
        pose: frame.pose,
        view: state.view(),
        visibility: frame.visibility,
        robot_sprite: false,
    };
    let mut retained = RetainedLayers::new();
    let report = state
        .config()
        .renderer()
        .render(&inputs, viewport(), &mut retained);
    (retained, report)
}

fn avoidance_radius_px(layers: &RetainedLayers) -> Option<f32> {
    layers.layer(Layer::Robot).iter().find_map(|p| match p {
        Primitive::Circle { radius, .. } => Some(*radius),
        _ => None,
    })
}

#[test]
fn keyed_map_renders_every_layer_and_skips_dangling_edge() {
    let config = DashboardConfig::default();
    let mut state = DashboardState::new(config, SessionStore::in_memory());
    state
        .import_text(DocumentKind::Map, "site.json", KEYED_MAP)
        .unwrap();

    let (layers, report) = render(&state);
    assert!(report.rendered);
    assert_eq!(report.skipped_elements, 1);
    for layer in Layer::ALL {
        assert!(
            !layers.layer(layer).is_empty(),
            "{} layer should have content",
            layer.name()
        );
    }
}

#[test]
fn positional_map_is_detected_without_key_lists() {
    let mut state = DashboardState::new(DashboardConfig::default(), SessionStore::in_memory());
    state
        .import_text(DocumentKind::Map, "legacy.json", POSITIONAL_MAP)
        .unwrap();

    let doc = state.document().unwrap();
    let keys: Vec<_> = doc.nodes().iter().map(|n| n.key.as_str()).collect();
    assert_eq!(keys, vec!["N1", "N2"]);
    assert_eq!(doc.nodes()[1].display_name(), "Dock");
    assert!(doc.edges()[0].path.is_empty());
}

#[test]
fn robot_is_drawn_with_every_layer_hidden() {
    let mut state = DashboardState::new(DashboardConfig::default(), SessionStore::in_memory());
    state
        .import_text(DocumentKind::Map, "site.json", KEYED_MAP)
        .unwrap();
    state.set_visibility(LayerVisibility::hidden());
    state.set_robot_pose(RobotPose::new(5_000.0, 5_000.0, 0.0));

    let (layers, _) = render(&state);
    assert_eq!(layers.visible_layers(), vec![Layer::Robot]);
    assert!(!layers.layer(Layer::Robot).is_empty());
}

#[test]
fn profile_selection_changes_avoidance_zone() {
    let mut state = DashboardState::new(DashboardConfig::default(), SessionStore::in_memory());
    state
        .import_text(DocumentKind::Map, "site.json", KEYED_MAP)
        .unwrap();

    let (layers, _) = render(&state);
    let default_px = avoidance_radius_px(&layers).unwrap();

    state
        .import_text(DocumentKind::Security, "avoid.json", SECURITY)
        .unwrap();
    assert_eq!(state.selected_profile(), Some(&ProfileId::from("wide")));
    let (layers, _) = render(&state);
    let wide_px = avoidance_radius_px(&layers).unwrap();

    state.select_profile(Some(ProfileId::from("tight")));
    let (layers, _) = render(&state);
    let tight_px = avoidance_radius_px(&layers).unwrap();

    // 500 default, 1200 wide, 400 tight, all at the same scale
    let scale = state.view().scale() as f32;
    assert!((default_px - 500.0 * scale).abs() < 1e-3);
    assert!((wide_px - 1200.0 * scale).abs() < 1e-3);
    assert!((tight_px - 400.0 * scale).abs() < 1e-3);
}

#[test]
fn view_actions_do_not_touch_the_document() {
    let mut state = DashboardState::new(DashboardConfig::default(), SessionStore::in_memory());
    state
        .import_text(DocumentKind::Map, "site.json", KEYED_MAP)
        .unwrap();
    let before = state.document().cloned();

    for action in [
        ViewAction::Zoom(1),
        ViewAction::Rotate(1),
        ViewAction::MirrorX,
        ViewAction::MirrorY,
        ViewAction::PanBy(Vec2::new(30.0, 30.0)),
    ] {
        state.apply_view_action(action);
        let _ = render(&state);
    }
    assert_eq!(state.document().cloned(), before);
    assert_eq!(state.view().rotation_deg(), 90.0);
    assert!(state.view().mirror_x() && state.view().mirror_y());
}
