//! MapCanvas - the egui widget hosting the map
//!
//! # Frame flow
//! 1. Pointer input drives the drag state machine and wheel zoom, mutating
//!    the caller's [`ViewState`] (the only thing this widget writes).
//! 2. The scene is rendered through the selected back-end:
//!    - `Immediate`: straight to the painter every frame.
//!    - `Retained`: into a per-layer display list, rebuilt only when the
//!      frame revision, the view or the viewport changed, then replayed.
//! 3. The waypoint under the pointer is picked from an R-tree and labelled.

use crate::interaction::{DragController, ListenerRegistry, PointerEventKind};
use crate::render::{
    EguiLayerTarget, LayerRenderer, LayerVisibility, RenderInputs, RenderReport, RetainedLayers,
};
use crate::spatial::{PickedWaypoint, WaypointPicker};
use crate::transform::ViewState;
use egui::{
    Align2, Color32, ColorImage, FontId, PointerButton, Rect, Sense, TextureHandle, TextureOptions,
    Vec2,
};
use floorplan_model::{MapDocument, Point, ProfileId, RobotPose, SecurityDocument};
use tracing::debug;

/// What the canvas draws this frame, borrowed from the state owner.
#[derive(Debug, Clone, Copy)]
pub struct MapFrame<'a> {
    pub document: Option<&'a MapDocument>,
    pub security: Option<&'a SecurityDocument>,
    pub selected_profile: Option<&'a ProfileId>,
    pub pose: RobotPose,
    pub visibility: LayerVisibility,
    /// Changes whenever any field above changes.
    pub revision: u64,
    /// Changes whenever a new document is loaded.
    pub document_revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Immediate,
    Retained,
}

pub struct MapCanvasResponse {
    pub response: egui::Response,
    pub report: RenderReport,
    /// Pointer position in model units, when over the map.
    pub pointer_model: Option<Point>,
    pub hovered: Option<PickedWaypoint>,
    /// The view was panned or zoomed by pointer input this frame.
    pub view_changed: bool,
}

pub struct MapCanvas {
    renderer: LayerRenderer,
    mode: RenderMode,
    drag: DragController,
    listeners: ListenerRegistry,
    picker: WaypointPicker,
    picker_revision: Option<u64>,
    retained: RetainedLayers,
    retained_key: Option<(u64, ViewState, Rect)>,
    retained_report: RenderReport,
    sprite: Option<TextureHandle>,
    /// Wheel travel not yet turned into a zoom step.
    scroll_travel: f32,
    /// Hover pick radius in screen pixels.
    pub pick_radius_px: f32,
    pub background: Color32,
}

impl MapCanvas {
    pub fn new(renderer: LayerRenderer) -> Self {
        Self {
            renderer,
            mode: RenderMode::default(),
            drag: DragController::new(),
            listeners: ListenerRegistry::new(),
            picker: WaypointPicker::default(),
            picker_revision: None,
            retained: RetainedLayers::new(),
            retained_key: None,
            retained_report: RenderReport::default(),
            sprite: None,
            scroll_travel: 0.0,
            pick_radius_px: 8.0,
            background: Color32::WHITE,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.set_mode(mode);
        self
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        if self.mode != mode {
            self.mode = mode;
            self.retained.clear();
            self.retained_key = None;
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn renderer(&self) -> &LayerRenderer {
        &self.renderer
    }

    pub fn retained(&self) -> &RetainedLayers {
        &self.retained
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.active_count()
    }

    /// Register the robot image; without one the vector glyph is drawn.
    pub fn set_robot_sprite(&mut self, ctx: &egui::Context, image: ColorImage) {
        self.sprite = Some(ctx.load_texture("robot-sprite", image, TextureOptions::LINEAR));
        self.retained_key = None;
    }

    /// End any drag in progress and drop its listeners.
    pub fn teardown(&mut self) {
        self.drag.teardown(&mut self.listeners);
    }

    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        frame: &MapFrame<'_>,
        view: &mut ViewState,
    ) -> MapCanvasResponse {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, self.background);

        let view_changed = self.handle_pointer(ui, rect, &response, view);

        let inputs = RenderInputs {
            document: frame.document,
            security: frame.security,
            selected_profile: frame.selected_profile,
            pose: frame.pose,
            view: &*view,
            visibility: frame.visibility,
            robot_sprite: self.sprite.is_some(),
        };
        let mut target =
            EguiLayerTarget::new(&painter).with_sprite(self.sprite.as_ref().map(|t| t.id()));

        let report = match self.mode {
            RenderMode::Immediate => self.renderer.render(&inputs, rect, &mut target),
            RenderMode::Retained => {
                let key = (frame.revision, *view, rect);
                if self.retained_key != Some(key) {
                    self.retained_report = self.renderer.render(&inputs, rect, &mut self.retained);
                    if !self.retained_report.rendered {
                        self.retained.clear();
                    }
                    self.retained_key = Some(key);
                }
                self.retained.replay(&mut target);
                self.retained_report
            }
        };

        if self.picker_revision != Some(frame.document_revision) {
            self.picker = frame
                .document
                .map(WaypointPicker::build)
                .unwrap_or_default();
            self.picker_revision = Some(frame.document_revision);
            debug!(waypoints = self.picker.len(), "waypoint index rebuilt");
        }

        let mut pointer_model = None;
        let mut hovered = None;
        match frame.document {
            Some(doc) => {
                let transform = view.transform(rect, doc.half_extent());
                if let Some(pos) = response.hover_pos() {
                    pointer_model = transform.screen_to_model(pos);
                    if !self.drag.is_dragging() && frame.visibility.nodes {
                        let radius = f64::from(self.pick_radius_px) / view.scale();
                        hovered = pointer_model.and_then(|p| self.picker.pick(p, radius));
                    }
                    if let Some(picked) = &hovered {
                        painter.text(
                            pos + Vec2::new(12.0, -12.0),
                            Align2::LEFT_BOTTOM,
                            format!("{} ({})", picked.name, picked.key),
                            FontId::proportional(13.0),
                            Color32::from_rgb(45, 52, 54),
                        );
                    }
                }
                painter.text(
                    rect.left_bottom() + Vec2::new(8.0, -8.0),
                    Align2::LEFT_BOTTOM,
                    view_caption(view),
                    FontId::monospace(11.0),
                    Color32::GRAY,
                );
            }
            None => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "Import a map file to display the facility",
                    FontId::proportional(14.0),
                    Color32::GRAY,
                );
            }
        }

        MapCanvasResponse {
            response,
            report,
            pointer_model,
            hovered,
            view_changed,
        }
    }

    /// Press inside the map starts a drag; move/release are read from the
    /// whole window so the pointer may leave the map mid-drag.
    fn handle_pointer(
        &mut self,
        ui: &egui::Ui,
        rect: Rect,
        response: &egui::Response,
        view: &mut ViewState,
    ) -> bool {
        let (pressed, released, primary_down, latest) = ui.input(|i| {
            (
                i.pointer.button_pressed(PointerButton::Primary),
                i.pointer.button_released(PointerButton::Primary),
                i.pointer.primary_down(),
                i.pointer.latest_pos(),
            )
        });
        let mut changed = false;

        if pressed {
            if let Some(pos) = latest.filter(|p| rect.contains(*p)) {
                self.drag.press(&mut self.listeners, pos, view.offset());
            }
        }

        if self.listeners.is_listening(PointerEventKind::Move) {
            if let Some(offset) = latest.and_then(|p| self.drag.pointer_moved(p)) {
                if offset != view.offset() {
                    view.set_offset(offset);
                    changed = true;
                }
            }
        }

        if self.listeners.is_listening(PointerEventKind::Release) && (released || !primary_down) {
            self.drag.release(&mut self.listeners);
        }

        if response.hovered() && !self.drag.is_dragging() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            let notches = wheel_notches(&mut self.scroll_travel, scroll);
            for _ in 0..notches.unsigned_abs() {
                view.zoom(notches.signum());
            }
            changed |= notches != 0;
        } else {
            self.scroll_travel = 0.0;
        }

        changed
    }
}

impl Drop for MapCanvas {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Wheel travel, in points, of one zoom step. Matches one mouse-wheel line in egui.
const WHEEL_NOTCH: f32 = 40.0;

/// Add `delta` to the pending travel and take out the whole notches it now holds.
fn wheel_notches(travel: &mut f32, delta: f32) -> i32 {
    *travel += delta;
    let notches = (*travel / WHEEL_NOTCH).trunc();
    *travel -= notches * WHEEL_NOTCH;
    notches as i32
}

fn view_caption(view: &ViewState) -> String {
    let mut caption = format!("scale {:.4}  rot {}°", view.scale(), view.rotation_deg());
    if view.mirror_x() {
        caption.push_str("  mirror-x");
    }
    if view.mirror_y() {
        caption.push_str("  mirror-y");
    }
    caption
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Event, Modifiers, Pos2, RawInput};
    use floorplan_model::Node;

    fn document() -> MapDocument {
        MapDocument::new(
            20_000.0,
            20_000.0,
            vec![Node::new("A", 1_000.0, 1_000.0)],
            vec![],
            vec![],
        )
    }

    fn frame(doc: &MapDocument, revision: u64) -> MapFrame<'_> {
        MapFrame {
            document: Some(doc),
            security: None,
            selected_profile: None,
            pose: RobotPose::default(),
            visibility: LayerVisibility::default(),
            revision,
            document_revision: 1,
        }
    }

    fn run(
        ctx: &egui::Context,
        canvas: &mut MapCanvas,
        frame: &MapFrame<'_>,
        view: &mut ViewState,
        events: Vec<Event>,
    ) -> RenderReport {
        let input = RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))),
            events,
            ..Default::default()
        };
        let mut report = RenderReport::default();
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                report = canvas.ui(ui, frame, view).report;
            });
        });
        report
    }

    fn button(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn small_wheel_deltas_add_up_to_one_step() {
        let mut travel = 0.0;
        let steps: i32 = (0..8).map(|_| wheel_notches(&mut travel, 5.0)).sum();
        assert_eq!(steps, 1);
        assert_eq!(travel, 0.0);

        assert_eq!(wheel_notches(&mut travel, 39.0), 0);
        assert_eq!(wheel_notches(&mut travel, -100.0), -1);
        assert_eq!(travel, -21.0);
    }

    proptest::proptest! {
        #[test]
        fn wheel_steps_follow_total_travel(deltas in proptest::collection::vec(-12i32..=12, 0..64)) {
            let mut travel = 0.0;
            let steps: i32 = deltas
                .iter()
                .map(|d| wheel_notches(&mut travel, *d as f32))
                .sum();
            let total: i32 = deltas.iter().sum();
            proptest::prop_assert!((total as f32 - steps as f32 * WHEEL_NOTCH - travel).abs() < 1e-3);
            proptest::prop_assert!(travel.abs() < WHEEL_NOTCH);
        }
    }

    #[test]
    fn retained_mode_rebuilds_only_on_change() {
        let ctx = egui::Context::default();
        let doc = document();
        let mut canvas = MapCanvas::new(LayerRenderer::default()).with_mode(RenderMode::Retained);
        let mut view = ViewState::default();

        let report = run(&ctx, &mut canvas, &frame(&doc, 1), &mut view, vec![]);
        assert!(report.rendered);
        assert_eq!(canvas.retained().generation(), 1);

        run(&ctx, &mut canvas, &frame(&doc, 1), &mut view, vec![]);
        assert_eq!(canvas.retained().generation(), 1);

        run(&ctx, &mut canvas, &frame(&doc, 2), &mut view, vec![]);
        assert_eq!(canvas.retained().generation(), 2);

        view.zoom(1);
        run(&ctx, &mut canvas, &frame(&doc, 2), &mut view, vec![]);
        assert_eq!(canvas.retained().generation(), 3);
    }

    #[test]
    fn drag_pans_and_releases_listeners() {
        let ctx = egui::Context::default();
        let doc = document();
        let mut canvas = MapCanvas::new(LayerRenderer::default());
        let mut view = ViewState::default();
        let start = Pos2::new(300.0, 300.0);
        let end = Pos2::new(350.0, 280.0);

        run(
            &ctx,
            &mut canvas,
            &frame(&doc, 1),
            &mut view,
            vec![Event::PointerMoved(start), button(start, true)],
        );
        assert!(canvas.is_dragging());
        assert_eq!(canvas.active_listeners(), 2);

        run(
            &ctx,
            &mut canvas,
            &frame(&doc, 1),
            &mut view,
            vec![Event::PointerMoved(end)],
        );
        assert_eq!(view.offset(), Vec2::new(50.0, -20.0));

        run(
            &ctx,
            &mut canvas,
            &frame(&doc, 1),
            &mut view,
            vec![button(end, false)],
        );
        assert!(!canvas.is_dragging());
        assert_eq!(canvas.active_listeners(), 0);
    }

    #[test]
    fn teardown_mid_drag_drops_listeners() {
        let ctx = egui::Context::default();
        let doc = document();
        let mut canvas = MapCanvas::new(LayerRenderer::default());
        let mut view = ViewState::default();
        let start = Pos2::new(200.0, 200.0);
        run(
            &ctx,
            &mut canvas,
            &frame(&doc, 1),
            &mut view,
            vec![Event::PointerMoved(start), button(start, true)],
        );
        assert!(canvas.is_dragging());

        canvas.teardown();
        assert_eq!(canvas.active_listeners(), 0);
    }

    #[test]
    fn no_document_renders_nothing() {
        let ctx = egui::Context::default();
        let mut canvas = MapCanvas::new(LayerRenderer::default()).with_mode(RenderMode::Retained);
        let mut view = ViewState::default();
        let empty = MapFrame {
            document: None,
            security: None,
            selected_profile: None,
            pose: RobotPose::default(),
            visibility: LayerVisibility::default(),
            revision: 0,
            document_revision: 0,
        };
        let report = run(&ctx, &mut canvas, &empty, &mut view, vec![]);
        assert!(!report.rendered);
        assert!(canvas.retained().is_empty());
    }

    #[test]
    fn sprite_switches_robot_to_texture() {
        let ctx = egui::Context::default();
        let doc = document();
        let mut canvas = MapCanvas::new(LayerRenderer::default()).with_mode(RenderMode::Retained);
        let mut view = ViewState::default();
        canvas.set_robot_sprite(&ctx, ColorImage::new([2, 2], Color32::WHITE));

        run(&ctx, &mut canvas, &frame(&doc, 1), &mut view, vec![]);
        let robot = canvas.retained().layer(crate::render::Layer::Robot);
        assert!(robot
            .iter()
            .any(|p| matches!(p, crate::render::Primitive::Sprite { .. })));
    }
}
