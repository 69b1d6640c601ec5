//! Screen-space primitives and the layer target seam
//!
//! The renderer speaks only in [`Primitive`]s grouped by [`Layer`]. A
//! [`LayerTarget`] decides what to do with them: paint immediately, or keep
//! them as a retained display list that is replaced layer by layer.

use egui::{Align2, Color32, Pos2, Stroke};
use std::collections::BTreeMap;
use tracing::debug;

/// Drawing layers, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Grid,
    Paths,
    Waypoints,
    ChargeStations,
    Robot,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Grid,
        Layer::Paths,
        Layer::Waypoints,
        Layer::ChargeStations,
        Layer::Robot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Grid => "grid",
            Layer::Paths => "paths",
            Layer::Waypoints => "waypoints",
            Layer::ChargeStations => "charge_stations",
            Layer::Robot => "robot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color32),
    /// Two-stop gradient running from the first point to the last.
    Gradient { from: Color32, to: Color32 },
}

/// A screen-space drawing instruction. Sizes are in pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        points: [Pos2; 2],
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Pos2>,
        width: f32,
        paint: Paint,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    /// Convex polygon.
    Polygon {
        points: Vec<Pos2>,
        fill: Color32,
    },
    Text {
        pos: Pos2,
        text: String,
        size: f32,
        color: Color32,
        anchor: Align2,
    },
    /// Textured quad; corners run top-left, top-right, bottom-right, bottom-left in texture space.
    Sprite {
        corners: [Pos2; 4],
        tint: Color32,
    },
}

/// Receiver of a render pass.
///
/// A pass is `begin_frame`, then for each layer in order either
/// `begin_layer` followed by its `draw` calls, or `hide_layer`, then
/// `end_frame`.
pub trait LayerTarget {
    fn begin_frame(&mut self) {}
    fn begin_layer(&mut self, layer: Layer);
    fn draw(&mut self, primitive: Primitive);
    fn hide_layer(&mut self, layer: Layer);
    fn end_frame(&mut self) {}
}

// =============================================================================
// RETAINED LAYERS
// =============================================================================

/// Retained display list, one element group per layer.
///
/// `begin_layer` discards the layer's previous elements, so every pass is a
/// full replace; hidden layers hold no elements at all.
#[derive(Debug, Default, Clone)]
pub struct RetainedLayers {
    layers: BTreeMap<Layer, Vec<Primitive>>,
    current: Option<Layer>,
    generation: u64,
}

impl RetainedLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed-or-started passes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn layer(&self, layer: Layer) -> &[Primitive] {
        self.layers.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_visible(&self, layer: Layer) -> bool {
        self.layers.contains_key(&layer)
    }

    pub fn visible_layers(&self) -> Vec<Layer> {
        self.layers.keys().copied().collect()
    }

    pub fn primitive_count(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.current = None;
    }

    /// Feed the retained elements into another target, layer by layer.
    pub fn replay(&self, target: &mut dyn LayerTarget) {
        target.begin_frame();
        for layer in Layer::ALL {
            match self.layers.get(&layer) {
                Some(primitives) => {
                    target.begin_layer(layer);
                    for primitive in primitives {
                        target.draw(primitive.clone());
                    }
                }
                None => target.hide_layer(layer),
            }
        }
        target.end_frame();
    }
}

impl LayerTarget for RetainedLayers {
    fn begin_frame(&mut self) {
        self.generation += 1;
        self.current = None;
    }

    fn begin_layer(&mut self, layer: Layer) {
        self.layers.insert(layer, Vec::new());
        self.current = Some(layer);
    }

    fn draw(&mut self, primitive: Primitive) {
        match self.current.and_then(|layer| self.layers.get_mut(&layer)) {
            Some(elements) => elements.push(primitive),
            None => debug!("primitive outside of a layer dropped"),
        }
    }

    fn hide_layer(&mut self, layer: Layer) {
        self.layers.remove(&layer);
        if self.current == Some(layer) {
            self.current = None;
        }
    }

    fn end_frame(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dot(x: f32) -> Primitive {
        Primitive::Circle {
            center: Pos2::new(x, 0.0),
            radius: 1.0,
            fill: Color32::RED,
            stroke: Stroke::NONE,
        }
    }

    #[test]
    fn begin_layer_replaces_elements() {
        let mut retained = RetainedLayers::new();
        retained.begin_frame();
        retained.begin_layer(Layer::Waypoints);
        retained.draw(dot(1.0));
        retained.draw(dot(2.0));
        retained.end_frame();

        retained.begin_frame();
        retained.begin_layer(Layer::Waypoints);
        retained.draw(dot(3.0));
        retained.end_frame();

        assert_eq!(retained.layer(Layer::Waypoints), &[dot(3.0)]);
        assert_eq!(retained.generation(), 2);
    }

    #[test]
    fn hidden_layers_are_cleared() {
        let mut retained = RetainedLayers::new();
        retained.begin_layer(Layer::Grid);
        retained.draw(dot(1.0));
        retained.hide_layer(Layer::Grid);
        retained.draw(dot(2.0));

        assert!(!retained.is_visible(Layer::Grid));
        assert_eq!(retained.primitive_count(), 0);
    }

    #[test]
    fn replay_reproduces_layers() {
        let mut source = RetainedLayers::new();
        source.begin_frame();
        source.begin_layer(Layer::Paths);
        source.draw(dot(1.0));
        source.begin_layer(Layer::Robot);
        source.draw(dot(2.0));
        source.end_frame();

        let mut copy = RetainedLayers::new();
        source.replay(&mut copy);
        assert_eq!(copy.visible_layers(), vec![Layer::Paths, Layer::Robot]);
        assert_eq!(copy.layer(Layer::Robot), source.layer(Layer::Robot));
    }

    #[test]
    fn layers_sort_in_paint_order() {
        let mut sorted = Layer::ALL.to_vec();
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, Layer::ALL.to_vec());
    }
}
