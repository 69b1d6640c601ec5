//! Facility map view
//!
//! Everything between a [`floorplan_model::MapDocument`] and pixels:
//!
//! ```text
//!  ViewState ──► ViewTransform (model ↔ screen)
//!                     │
//!  MapDocument ──► LayerRenderer ──► LayerTarget
//!  RobotPose          │   ├── PathSmoother          ├── EguiLayerTarget  (immediate)
//!  SecurityDocument ──┘   └── AvoidanceResolver     └── RetainedLayers   (retained)
//! ```
//!
//! The renderer is a pure function of its inputs: it reads the document and
//! the view, emits screen-space primitives layer by layer, and never mutates
//! either. [`MapCanvas`] wires it into an egui `Ui` together with the pointer
//! drag state machine and waypoint picking.

pub mod colors;
pub mod controls;
pub mod interaction;
pub mod render;
pub mod smooth;
pub mod spatial;
pub mod style;
pub mod transform;
pub mod widget;

pub use controls::{view_toolbar, ToolbarResponse};
pub use interaction::{
    DragController, DragState, ListenerId, ListenerRegistry, PointerEventKind, PointerSurface,
};
pub use render::{
    EguiLayerTarget, Layer, LayerRenderer, LayerTarget, LayerVisibility, Paint, Primitive,
    RenderInputs, RenderReport, RetainedLayers,
};
pub use smooth::PathSmoother;
pub use spatial::{PickedWaypoint, WaypointPicker};
pub use style::RenderStyle;
pub use transform::{Affine2, FitTarget, ResetMode, ViewAction, ViewLimits, ViewState, ViewTransform};
pub use widget::{MapCanvas, MapCanvasResponse, MapFrame, RenderMode};
