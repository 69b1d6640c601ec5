//! View toolbar: zoom, rotate, mirror, reset and layer toggles.
//!
//! The toolbar never touches the view itself; it reports the clicked action
//! and lets the state owner apply it.

use crate::render::LayerVisibility;
use crate::transform::ViewAction;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToolbarResponse {
    pub action: Option<ViewAction>,
    pub visibility_changed: bool,
}

pub fn view_toolbar(ui: &mut egui::Ui, visibility: &mut LayerVisibility) -> ToolbarResponse {
    let mut action = None;
    let mut visibility_changed = false;

    ui.horizontal(|ui| {
        if ui.button("➕").on_hover_text("Zoom in").clicked() {
            action = Some(ViewAction::Zoom(1));
        }
        if ui.button("➖").on_hover_text("Zoom out").clicked() {
            action = Some(ViewAction::Zoom(-1));
        }

        ui.separator();

        if ui.button("⟲").on_hover_text("Rotate 90° left").clicked() {
            action = Some(ViewAction::Rotate(-1));
        }
        if ui.button("⟳").on_hover_text("Rotate 90° right").clicked() {
            action = Some(ViewAction::Rotate(1));
        }
        if ui.button("⇋").on_hover_text("Mirror horizontally").clicked() {
            action = Some(ViewAction::MirrorX);
        }
        if ui.button("⇅").on_hover_text("Mirror vertically").clicked() {
            action = Some(ViewAction::MirrorY);
        }
        if ui.button("Reset").on_hover_text("Reset view").clicked() {
            action = Some(ViewAction::Reset);
        }

        ui.separator();

        visibility_changed |= ui.checkbox(&mut visibility.grid, "Grid").changed();
        visibility_changed |= ui.checkbox(&mut visibility.nodes, "Waypoints").changed();
        ui.add_enabled_ui(visibility.nodes, |ui| {
            visibility_changed |= ui.checkbox(&mut visibility.node_labels, "Labels").changed();
        });
        visibility_changed |= ui.checkbox(&mut visibility.paths, "Paths").changed();
        visibility_changed |= ui
            .checkbox(&mut visibility.charge_stations, "Charge stations")
            .changed();
    });

    ToolbarResponse {
        action,
        visibility_changed,
    }
}
