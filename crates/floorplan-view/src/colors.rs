//! Color palettes for the map layers
//!
//! Waypoint colors are keyed by [`NodeClass`]; everything else is a fixed
//! layer color.

use egui::Color32;
use floorplan_model::NodeClass;

// =============================================================================
// WAYPOINTS
// =============================================================================

pub const NODE_REGULAR: Color32 = Color32::from_rgb(0, 184, 148); // #00b894
pub const NODE_TERMINAL: Color32 = Color32::from_rgb(225, 112, 85); // #e17055
pub const NODE_SPECIAL: Color32 = Color32::from_rgb(214, 48, 49); // #d63031
pub const NODE_CHARGE: Color32 = Color32::from_rgb(253, 203, 110); // #fdcb6e
pub const NODE_OTHER: Color32 = Color32::from_rgb(99, 110, 114); // #636e72
pub const NODE_OUTLINE: Color32 = Color32::from_rgb(45, 52, 54); // #2d3436

/// Fill color for a waypoint class
pub fn node_fill(class: NodeClass) -> Color32 {
    match class {
        NodeClass::Regular => NODE_REGULAR,
        NodeClass::Terminal => NODE_TERMINAL,
        NodeClass::Special => NODE_SPECIAL,
        NodeClass::Charge => NODE_CHARGE,
        NodeClass::Other => NODE_OTHER,
    }
}

// =============================================================================
// LAYERS
// =============================================================================

pub const GRID: Color32 = Color32::from_rgb(240, 240, 240);

pub const PATH_START: Color32 = Color32::from_rgb(116, 185, 255); // #74b9ff
pub const PATH_END: Color32 = Color32::from_rgb(9, 132, 227); // #0984e3
pub const PATH_SHADOW: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 77);

pub const CHARGE_DISK: Color32 = Color32::from_rgb(255, 234, 167); // #ffeaa7
pub const CHARGE_GLYPH: Color32 = Color32::from_rgb(253, 203, 110);

pub const ROBOT_BODY: Color32 = Color32::from_rgb(9, 132, 227);
pub const ROBOT_HEADING: Color32 = Color32::WHITE;
pub const ROBOT_LABEL: Color32 = NODE_OUTLINE;
pub const PROFILE_LABEL: Color32 = Color32::from_rgb(225, 112, 85);

// rgba(255, 107, 107, 0.1) and 0.3, premultiplied
pub const AVOIDANCE_FILL: Color32 = Color32::from_rgba_premultiplied(26, 11, 11, 26);
pub const AVOIDANCE_STROKE: Color32 = Color32::from_rgba_premultiplied(77, 32, 32, 77);

/// Linear interpolation in gamma space, matching a two-stop canvas gradient.
pub fn lerp_color(from: Color32, to: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
    Color32::from_rgba_premultiplied(
        mix(from.r(), to.r()),
        mix(from.g(), to.g()),
        mix(from.b(), to.b()),
        mix(from.a(), to.a()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_distinguishable() {
        let fills = [
            node_fill(NodeClass::Regular),
            node_fill(NodeClass::Terminal),
            node_fill(NodeClass::Special),
            node_fill(NodeClass::Other),
        ];
        for (i, a) in fills.iter().enumerate() {
            for b in &fills[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn lerp_hits_both_stops() {
        assert_eq!(lerp_color(PATH_START, PATH_END, 0.0), PATH_START);
        assert_eq!(lerp_color(PATH_START, PATH_END, 1.0), PATH_END);
        let mid = lerp_color(Color32::BLACK, Color32::WHITE, 0.5);
        assert_eq!(mid.r(), 128);
    }
}
