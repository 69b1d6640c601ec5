//! LayerRenderer - paints the map scene layer by layer
//!
//! Paint order is fixed: grid → paths → waypoints → charge stations → robot.
//! The first four layers follow [`LayerVisibility`]; the robot layer is always
//! drawn. Every pass repaints everything; there is no incremental update.
//!
//! Problems with single elements (an edge naming an unknown node, a charge
//! anchor that resolves nowhere) are logged and counted, and the pass goes on.

use super::scene::{Layer, LayerTarget, Paint, Primitive};
use crate::colors;
use crate::smooth::PathSmoother;
use crate::style::RenderStyle;
use crate::transform::{Affine2, ViewState, ViewTransform};
use egui::{Align2, Color32, Pos2, Rect, Stroke};
use floorplan_model::{
    AvoidanceResolver, MapDocument, Point, ProfileId, RobotPose, SecurityDocument,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// =============================================================================
// INPUTS / OUTPUTS
// =============================================================================

/// Independent toggles for the map layers. The robot has no toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerVisibility {
    pub grid: bool,
    pub nodes: bool,
    /// Waypoint labels; only drawn while `nodes` is on.
    pub node_labels: bool,
    pub paths: bool,
    pub charge_stations: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            grid: true,
            nodes: true,
            node_labels: true,
            paths: true,
            charge_stations: true,
        }
    }
}

impl LayerVisibility {
    pub fn hidden() -> Self {
        Self {
            grid: false,
            nodes: false,
            node_labels: false,
            paths: false,
            charge_stations: false,
        }
    }

    pub fn shows(&self, layer: Layer) -> bool {
        match layer {
            Layer::Grid => self.grid,
            Layer::Paths => self.paths,
            Layer::Waypoints => self.nodes,
            Layer::ChargeStations => self.charge_stations,
            Layer::Robot => true,
        }
    }
}

/// Everything one render pass reads.
#[derive(Debug, Clone, Copy)]
pub struct RenderInputs<'a> {
    pub document: Option<&'a MapDocument>,
    pub security: Option<&'a SecurityDocument>,
    pub selected_profile: Option<&'a ProfileId>,
    pub pose: RobotPose,
    pub view: &'a ViewState,
    pub visibility: LayerVisibility,
    /// Draw the robot as a textured sprite instead of the vector glyph.
    pub robot_sprite: bool,
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// False when there was no document and nothing was drawn.
    pub rendered: bool,
    pub primitives: usize,
    /// Edges and charge anchors omitted because they could not be resolved.
    pub skipped_elements: usize,
}

/// Counts what goes through to the target.
struct Emitter<'t> {
    target: &'t mut dyn LayerTarget,
    primitives: usize,
    skipped: usize,
}

impl Emitter<'_> {
    fn emit(&mut self, primitive: Primitive) {
        self.primitives += 1;
        self.target.draw(primitive);
    }
}

// =============================================================================
// RENDERER
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct LayerRenderer {
    pub style: RenderStyle,
    pub smoother: PathSmoother,
    pub avoidance: AvoidanceResolver,
}

impl LayerRenderer {
    pub fn new(style: RenderStyle, smoother: PathSmoother, avoidance: AvoidanceResolver) -> Self {
        Self {
            style,
            smoother,
            avoidance,
        }
    }

    /// Render one full pass into `target`. Without a document nothing is touched.
    pub fn render(
        &self,
        inputs: &RenderInputs<'_>,
        viewport: Rect,
        target: &mut dyn LayerTarget,
    ) -> RenderReport {
        let Some(doc) = inputs.document else {
            debug!("no map document loaded, render skipped");
            return RenderReport::default();
        };

        let view = inputs.view.transform(viewport, doc.half_extent());
        target.begin_frame();
        let mut out = Emitter {
            target,
            primitives: 0,
            skipped: 0,
        };

        for layer in Layer::ALL {
            if !inputs.visibility.shows(layer) {
                out.target.hide_layer(layer);
                continue;
            }
            out.target.begin_layer(layer);
            match layer {
                Layer::Grid => self.grid(doc, &view, &mut out),
                Layer::Paths => self.paths(doc, &view, &mut out),
                Layer::Waypoints => {
                    self.waypoints(doc, &view, inputs.visibility.node_labels, &mut out)
                }
                Layer::ChargeStations => self.charge_stations(doc, &view, &mut out),
                Layer::Robot => self.robot(inputs, &view, &mut out),
            }
        }
        out.target.end_frame();

        let report = RenderReport {
            rendered: true,
            primitives: out.primitives,
            skipped_elements: out.skipped,
        };
        debug!(
            primitives = report.primitives,
            skipped = report.skipped_elements,
            "map rendered"
        );
        report
    }

    // =========================================================================
    // LAYERS
    // =========================================================================

    fn grid(&self, doc: &MapDocument, view: &ViewTransform, out: &mut Emitter<'_>) {
        let pitch = self.style.grid_pitch;
        if pitch.is_nan() || pitch <= 0.0 {
            return;
        }
        let stroke = Stroke::new(view.length(self.style.grid_line_width), colors::GRID);
        let (width, height) = (doc.width(), doc.height());

        let lines = |extent: f64| {
            let wanted = ((extent / pitch).floor() as usize).saturating_add(1);
            if wanted > self.style.max_grid_lines {
                debug!(wanted, cap = self.style.max_grid_lines, "grid truncated");
            }
            (0..wanted.min(self.style.max_grid_lines)).map(move |i| i as f64 * pitch)
        };

        for x in lines(width) {
            out.emit(Primitive::Line {
                points: [
                    view.model_to_screen(Point::new(x, 0.0)),
                    view.model_to_screen(Point::new(x, height)),
                ],
                stroke,
            });
        }
        for y in lines(height) {
            out.emit(Primitive::Line {
                points: [
                    view.model_to_screen(Point::new(0.0, y)),
                    view.model_to_screen(Point::new(width, y)),
                ],
                stroke,
            });
        }
    }

    fn paths(&self, doc: &MapDocument, view: &ViewTransform, out: &mut Emitter<'_>) {
        let width = view.length(self.style.path_width);
        let shadow_width = width + view.length(self.style.path_shadow_spread);

        for (index, edge) in doc.edges().iter().enumerate() {
            let Some((start, end)) = doc.endpoints(edge) else {
                warn!(
                    index,
                    start = %edge.start,
                    end = %edge.end,
                    "edge references an unknown node, skipped"
                );
                out.skipped += 1;
                continue;
            };

            let model_points = if edge.has_curve() {
                self.smoother.smooth(&edge.path)
            } else {
                vec![start.position(), end.position()]
            };
            let points: Vec<Pos2> = model_points
                .into_iter()
                .map(|p| view.model_to_screen(p))
                .collect();

            out.emit(Primitive::Polyline {
                points: points.clone(),
                width: shadow_width,
                paint: Paint::Solid(colors::PATH_SHADOW),
            });
            out.emit(Primitive::Polyline {
                points,
                width,
                paint: Paint::Gradient {
                    from: colors::PATH_START,
                    to: colors::PATH_END,
                },
            });
        }
    }

    fn waypoints(
        &self,
        doc: &MapDocument,
        view: &ViewTransform,
        labels: bool,
        out: &mut Emitter<'_>,
    ) {
        let style = &self.style;
        let radius = view.length(style.node_radius);
        let stroke = Stroke::new(view.length(style.node_stroke_width), colors::NODE_OUTLINE);
        let font = view.length(style.node_font_size);
        let labels = labels && font >= style.label_min_px;

        for node in doc.nodes() {
            out.emit(Primitive::Circle {
                center: view.model_to_screen(node.position()),
                radius,
                fill: colors::node_fill(node.class()),
                stroke,
            });
            if labels {
                let anchor = Point::new(node.x, node.y - style.node_radius - style.label_gap);
                out.emit(Primitive::Text {
                    pos: view.model_to_screen(anchor),
                    text: style.abbreviate(node.display_name()).to_string(),
                    size: font,
                    color: colors::NODE_OUTLINE,
                    anchor: Align2::CENTER_BOTTOM,
                });
            }
        }
    }

    fn charge_stations(&self, doc: &MapDocument, view: &ViewTransform, out: &mut Emitter<'_>) {
        let style = &self.style;
        for (index, anchor) in doc.charge_anchors().iter().enumerate() {
            let Some(node) = doc.anchor_node(anchor) else {
                warn!(index, node = %anchor.node, "charge anchor has no matching node, skipped");
                out.skipped += 1;
                continue;
            };
            out.emit(Primitive::Circle {
                center: view.model_to_screen(node.position()),
                radius: view.length(style.charge_radius),
                fill: colors::CHARGE_DISK,
                stroke: Stroke::NONE,
            });
            out.emit(Primitive::Text {
                pos: view.model_to_screen(Point::new(node.x, node.y + style.charge_glyph_offset)),
                text: style.charge_glyph.clone(),
                size: view.length(style.charge_glyph_size),
                color: colors::CHARGE_GLYPH,
                anchor: Align2::CENTER_BOTTOM,
            });
        }
    }

    fn robot(&self, inputs: &RenderInputs<'_>, view: &ViewTransform, out: &mut Emitter<'_>) {
        let style = &self.style;
        let pose = inputs.pose;
        let body = view.local(
            Affine2::translate(pose.x, pose.y) * Affine2::rotate(pose.heading.to_degrees()),
        );
        let local = |x: f64, y: f64| body.model_to_screen(Point::new(x, y));

        let clearance = self
            .avoidance
            .forward_clearance(inputs.security, inputs.selected_profile);
        out.emit(Primitive::Circle {
            center: local(0.0, 0.0),
            radius: body.length(clearance),
            fill: colors::AVOIDANCE_FILL,
            stroke: Stroke::new(
                body.length(style.avoidance_stroke_width),
                colors::AVOIDANCE_STROKE,
            ),
        });

        if inputs.robot_sprite {
            let h = style.robot_sprite_size / 2.0;
            out.emit(Primitive::Sprite {
                corners: [local(-h, -h), local(h, -h), local(h, h), local(-h, h)],
                tint: Color32::WHITE,
            });
        } else {
            let (hl, hw) = (style.robot_body_length / 2.0, style.robot_body_width / 2.0);
            out.emit(Primitive::Polygon {
                points: vec![local(-hl, -hw), local(hl, -hw), local(hl, hw), local(-hl, hw)],
                fill: colors::ROBOT_BODY,
            });
            // Heading arrow near the front edge, proportional to the body.
            let tip = style.robot_body_length * 0.4;
            let base = style.robot_body_length * 0.8 / 3.0;
            let spread = style.robot_body_width * 0.3;
            out.emit(Primitive::Polygon {
                points: vec![local(tip, 0.0), local(base, -spread), local(base, spread)],
                fill: colors::ROBOT_HEADING,
            });
        }

        out.emit(Primitive::Text {
            pos: view.model_to_screen(Point::new(pose.x, pose.y - style.robot_label_offset)),
            text: pose_label(&pose),
            size: view.length(style.robot_font_size),
            color: colors::ROBOT_LABEL,
            anchor: Align2::CENTER_BOTTOM,
        });

        if let Some(profile) = self
            .avoidance
            .active_profile(inputs.security, inputs.selected_profile)
        {
            out.emit(Primitive::Text {
                pos: view.model_to_screen(Point::new(pose.x, pose.y + style.profile_label_offset)),
                text: profile.label(),
                size: view.length(style.profile_font_size),
                color: colors::PROFILE_LABEL,
                anchor: Align2::CENTER_BOTTOM,
            });
        }
    }
}

/// Half-up: 1500 reads as 2k and -1500 as -1k.
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// `(Xk, Yk) H°` with position in thousands of model units.
pub fn pose_label(pose: &RobotPose) -> String {
    format!(
        "({}k, {}k) {}°",
        round_half_up(pose.x / 1000.0),
        round_half_up(pose.y / 1000.0),
        round_half_up(pose.heading_degrees()).rem_euclid(360)
    )
}
