//! Render style - sizes of map elements in model units
//!
//! Every size scales with the view, so markers keep their proportions to the
//! facility at any zoom level.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub node_radius: f64,
    pub node_stroke_width: f64,
    pub node_font_size: f64,
    /// Trailing characters of the display name shown as a label.
    pub label_chars: usize,
    /// Gap between the top of a waypoint disk and its label baseline.
    pub label_gap: f64,
    /// Labels smaller than this many pixels are not drawn.
    pub label_min_px: f32,

    pub grid_pitch: f64,
    pub grid_line_width: f64,
    /// Upper bound on grid lines per axis, whatever the document size.
    pub max_grid_lines: usize,

    pub path_width: f64,
    /// Extra width of the shadow stroke under each path.
    pub path_shadow_spread: f64,

    pub charge_radius: f64,
    pub charge_glyph_size: f64,
    pub charge_glyph_offset: f64,
    pub charge_glyph: String,

    pub robot_body_length: f64,
    pub robot_body_width: f64,
    pub robot_sprite_size: f64,
    pub avoidance_stroke_width: f64,
    pub robot_font_size: f64,
    pub robot_label_offset: f64,
    pub profile_font_size: f64,
    pub profile_label_offset: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            node_radius: 100.0,
            node_stroke_width: 20.0,
            node_font_size: 500.0,
            label_chars: 3,
            label_gap: 200.0,
            label_min_px: 2.0,

            grid_pitch: 10_000.0,
            grid_line_width: 300.0,
            max_grid_lines: 2_000,

            path_width: 500.0,
            path_shadow_spread: 240.0,

            charge_radius: 1_200.0,
            charge_glyph_size: 2_000.0,
            charge_glyph_offset: 600.0,
            charge_glyph: "⚡".to_string(),

            robot_body_length: 3_000.0,
            robot_body_width: 2_000.0,
            robot_sprite_size: 3_000.0,
            avoidance_stroke_width: 200.0,
            robot_font_size: 1_000.0,
            robot_label_offset: 1_500.0,
            profile_font_size: 800.0,
            profile_label_offset: 2_000.0,
        }
    }
}

impl RenderStyle {
    /// Last `label_chars` characters of a name.
    pub fn abbreviate<'a>(&self, name: &'a str) -> &'a str {
        let count = name.chars().count();
        if count <= self.label_chars {
            return name;
        }
        let skip = count - self.label_chars;
        name.char_indices()
            .nth(skip)
            .map_or(name, |(byte, _)| &name[byte..])
    }
}
