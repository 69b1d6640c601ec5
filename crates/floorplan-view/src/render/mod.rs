//! Layered map rendering
//!
//! [`LayerRenderer`] produces the scene; [`EguiLayerTarget`] paints it
//! immediately and [`RetainedLayers`] keeps it as a per-layer display list.
//! Both receive the same primitives for the same inputs.

mod painter;
mod renderer;
mod scene;

pub use painter::EguiLayerTarget;
pub use renderer::{pose_label, LayerRenderer, LayerVisibility, RenderInputs, RenderReport};
pub use scene::{Layer, LayerTarget, Paint, Primitive, RetainedLayers};
