//! Map tab UI
//!
//! Header (file import, status, safety profile), the view toolbar, any import
//! error, then the map canvas filling the rest of the panel. All mutations go
//! through [`DashboardState`].

use crate::config::DashboardConfig;
use crate::import::DocumentKind;
use crate::state::DashboardState;
use egui::Color32;
use floorplan_model::ProfileId;
use floorplan_view::render::pose_label;
use floorplan_view::{view_toolbar, MapCanvas, PickedWaypoint, RenderMode};
use std::path::PathBuf;
use tracing::debug;

const ERROR_COLOR: Color32 = Color32::from_rgb(214, 48, 49);

pub struct MapPanel {
    canvas: MapCanvas,
    path_input: String,
}

impl MapPanel {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            canvas: MapCanvas::new(config.renderer()),
            path_input: String::new(),
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.canvas.set_mode(mode);
        self
    }

    pub fn canvas(&self) -> &MapCanvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut MapCanvas {
        &mut self.canvas
    }

    /// Draw the panel; returns the waypoint under the pointer, if any.
    pub fn ui(&mut self, ui: &mut egui::Ui, state: &mut DashboardState) -> Option<PickedWaypoint> {
        if state.poll_imports() > 0 {
            debug!("background import applied");
        }
        if state.is_loading() {
            ui.ctx().request_repaint();
        }

        // =====================================================================
        // HEADER - file import
        // =====================================================================
        let mut requested: Option<DocumentKind> = None;
        ui.horizontal(|ui| {
            ui.label("File:");
            ui.add(
                egui::TextEdit::singleline(&mut self.path_input)
                    .hint_text("path to a map or security file")
                    .desired_width(280.0),
            );
            let has_path = !self.path_input.trim().is_empty();
            if ui
                .add_enabled(has_path, egui::Button::new("Import map"))
                .clicked()
            {
                requested = Some(DocumentKind::Map);
            }
            if ui
                .add_enabled(has_path, egui::Button::new("Import security"))
                .clicked()
            {
                requested = Some(DocumentKind::Security);
            }
            if state.is_loading() {
                ui.spinner();
                ui.label("Loading...");
            }
        });
        if let Some(kind) = requested {
            let path = PathBuf::from(self.path_input.trim());
            state.request_import(kind, path);
        }

        // =====================================================================
        // STATUS - documents, profile, robot
        // =====================================================================
        let mut chosen: Option<Option<ProfileId>> = None;
        ui.horizontal(|ui| {
            ui.label(format!("Map: {}", state.map_file_name().unwrap_or("none")));
            ui.separator();
            ui.label(format!(
                "Security: {}",
                state.security_file_name().unwrap_or("none")
            ));
            ui.separator();

            ui.label("Profile:");
            let selected_text = state
                .selected_profile()
                .and_then(|id| state.security()?.profile(id))
                .map(|p| p.label())
                .unwrap_or_else(|| "No profile".to_string());

            egui::ComboBox::from_id_salt("safety_profile")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    if ui
                        .selectable_label(state.selected_profile().is_none(), "No profile")
                        .clicked()
                    {
                        chosen = Some(None);
                    }
                    if let Some(doc) = state.security() {
                        for profile in &doc.profiles {
                            if ui
                                .selectable_label(
                                    state.selected_profile() == Some(&profile.id),
                                    profile.label(),
                                )
                                .clicked()
                            {
                                chosen = Some(Some(profile.id.clone()));
                            }
                        }
                    }
                });

            ui.separator();
            ui.label(format!(
                "Robot {}  clearance {:.0}",
                pose_label(&state.pose()),
                state.avoidance_radius()
            ));
        });
        if let Some(selection) = chosen {
            state.select_profile(selection);
        }

        if let Some(err) = state.last_error() {
            ui.colored_label(ERROR_COLOR, err);
        }

        // =====================================================================
        // TOOLBAR + CANVAS
        // =====================================================================
        let mut visibility = state.visibility();
        let toolbar = view_toolbar(ui, &mut visibility);
        if toolbar.visibility_changed {
            state.set_visibility(visibility);
        }
        if let Some(action) = toolbar.action {
            state.apply_view_action(action);
        }

        let (frame, view) = state.frame_and_view();
        let response = self.canvas.ui(ui, &frame, view);
        state.set_viewport(response.response.rect);
        if response.report.skipped_elements > 0 {
            debug!(
                skipped = response.report.skipped_elements,
                "map drawn with skipped elements"
            );
        }
        response.hovered
    }
}
