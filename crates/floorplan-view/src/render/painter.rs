//! Immediate-mode back-end: primitives go straight to an egui `Painter`.

use super::scene::{Layer, LayerTarget, Paint, Primitive};
use crate::colors::lerp_color;
use egui::epaint::{Mesh, Vertex};
use egui::{FontId, Painter, Pos2, Shape, Stroke, TextureId};
use tracing::debug;

pub struct EguiLayerTarget<'p> {
    painter: &'p Painter,
    sprite: Option<TextureId>,
}

impl<'p> EguiLayerTarget<'p> {
    pub fn new(painter: &'p Painter) -> Self {
        Self {
            painter,
            sprite: None,
        }
    }

    /// Texture used for [`Primitive::Sprite`].
    pub fn with_sprite(mut self, texture: Option<TextureId>) -> Self {
        self.sprite = texture;
        self
    }

    fn polyline(&self, points: Vec<Pos2>, width: f32, paint: Paint) {
        match paint {
            Paint::Solid(color) => {
                self.painter.add(Shape::line(points, Stroke::new(width, color)));
            }
            Paint::Gradient { from, to } => {
                let spans = points.len().saturating_sub(1).max(1) as f32;
                for (i, pair) in points.windows(2).enumerate() {
                    let color = lerp_color(from, to, (i as f32 + 0.5) / spans);
                    self.painter
                        .line_segment([pair[0], pair[1]], Stroke::new(width, color));
                    // round joins
                    if i > 0 {
                        self.painter.circle_filled(pair[0], width / 2.0, color);
                    }
                }
            }
        }
    }

    fn sprite(&self, corners: [Pos2; 4], tint: egui::Color32) {
        let Some(texture) = self.sprite else {
            debug!("sprite primitive without a registered texture");
            return;
        };
        let uvs = [
            Pos2::new(0.0, 0.0),
            Pos2::new(1.0, 0.0),
            Pos2::new(1.0, 1.0),
            Pos2::new(0.0, 1.0),
        ];
        let mut mesh = Mesh::with_texture(texture);
        for (pos, uv) in corners.into_iter().zip(uvs) {
            mesh.vertices.push(Vertex {
                pos,
                uv,
                color: tint,
            });
        }
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        self.painter.add(Shape::mesh(mesh));
    }
}

/// Mirrored views flip polygon winding; the fill tessellator wants one orientation.
fn clockwise(mut points: Vec<Pos2>) -> Vec<Pos2> {
    let area: f32 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    if area < 0.0 {
        points.reverse();
    }
    points
}

impl LayerTarget for EguiLayerTarget<'_> {
    fn begin_layer(&mut self, _layer: Layer) {}

    fn draw(&mut self, primitive: Primitive) {
        match primitive {
            Primitive::Line { points, stroke } => {
                self.painter.line_segment(points, stroke);
            }
            Primitive::Polyline {
                points,
                width,
                paint,
            } => self.polyline(points, width, paint),
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                self.painter.circle(center, radius, fill, stroke);
            }
            Primitive::Polygon { points, fill } => {
                self.painter
                    .add(Shape::convex_polygon(clockwise(points), fill, Stroke::NONE));
            }
            Primitive::Text {
                pos,
                text,
                size,
                color,
                anchor,
            } => {
                self.painter
                    .text(pos, anchor, text, FontId::proportional(size), color);
            }
            Primitive::Sprite { corners, tint } => self.sprite(corners, tint),
        }
    }

    fn hide_layer(&mut self, _layer: Layer) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winding_is_normalised() {
        let ccw = vec![
            Pos2::new(0.0, 0.0),
            Pos2::new(0.0, 1.0),
            Pos2::new(1.0, 1.0),
            Pos2::new(1.0, 0.0),
        ];
        let cw = clockwise(ccw.clone());
        assert_eq!(cw.first(), ccw.last());
        assert_eq!(clockwise(cw.clone()), cw);
    }
}
