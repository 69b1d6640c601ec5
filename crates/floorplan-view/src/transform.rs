//! ViewTransform - one composed model ↔ screen mapping for every layer
//!
//! The mapping is built in a fixed order, read left to right as successive
//! canvas operations:
//!
//! ```text
//! translate(offset + viewport/2) · scale(s) · translate(-extent/2) · rotate(θ) · mirrorX · mirrorY
//! ```
//!
//! A model point is therefore mirrored first and moved by the viewport
//! translation last. Rotation and mirroring do not commute with the
//! translations, so the order is part of the contract.

use egui::{Pos2, Rect, Vec2};
use floorplan_model::Point;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

// =============================================================================
// AFFINE MATRIX
// =============================================================================

/// 2D affine matrix with canvas layout: `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Rotation by `degrees`; positive turns clockwise on a y-down screen.
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn inverse(&self) -> Option<Affine2> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Affine2 {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    /// Length scale factor; exact for similarity transforms.
    pub fn uniform_scale(&self) -> f64 {
        self.determinant().abs().sqrt()
    }
}

/// `(m1 * m2).apply(p) == m1.apply(m2.apply(p))`
impl Mul for Affine2 {
    type Output = Affine2;

    fn mul(self, rhs: Affine2) -> Affine2 {
        Affine2 {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }
}

// =============================================================================
// LIMITS
// =============================================================================

/// What `reset` restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// Fixed defaults: default scale, zero offset, no rotation or mirroring.
    #[default]
    Fixed,
    /// Fit the whole document into the viewport with padding.
    Fit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewLimits {
    pub default_scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_step: f64,
    /// Screen padding (px) kept around the document when fitting.
    pub fit_padding: f64,
    pub reset_mode: ResetMode,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            default_scale: 0.008,
            min_scale: 0.001,
            max_scale: 0.05,
            zoom_step: 1.2,
            fit_padding: 50.0,
            reset_mode: ResetMode::Fixed,
        }
    }
}

impl ViewLimits {
    /// Never panics on inverted bounds; the upper bound wins.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.max(self.min_scale).min(self.max_scale)
    }
}

// =============================================================================
// VIEW STATE
// =============================================================================

/// User view manipulations, dispatched by toolbar buttons and input handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    /// Positive zooms in, negative zooms out, zero is ignored.
    Zoom(i32),
    /// Positive turns +90°, negative −90°, zero is ignored.
    Rotate(i32),
    MirrorX,
    MirrorY,
    Reset,
    /// Screen-space pan in pixels.
    PanBy(Vec2),
}

/// Viewport and document size needed for a fit-to-bounds reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTarget {
    pub viewport: Rect,
    pub width: f64,
    pub height: f64,
}

/// Pan, zoom, rotation and mirroring of the map view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    rotation_deg: f64,
    mirror_x: bool,
    mirror_y: bool,
    limits: ViewLimits,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(ViewLimits::default())
    }
}

impl ViewState {
    pub fn new(limits: ViewLimits) -> Self {
        Self {
            scale: limits.clamp_scale(limits.default_scale),
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_deg: 0.0,
            mirror_x: false,
            mirror_y: false,
            limits,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.offset_x as f32, self.offset_y as f32)
    }

    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    pub fn mirror_x(&self) -> bool {
        self.mirror_x
    }

    pub fn mirror_y(&self) -> bool {
        self.mirror_y
    }

    pub fn limits(&self) -> &ViewLimits {
        &self.limits
    }

    pub fn zoom(&mut self, direction: i32) {
        let factor = match direction.signum() {
            1 => self.limits.zoom_step,
            -1 => 1.0 / self.limits.zoom_step,
            _ => return,
        };
        self.scale = self.limits.clamp_scale(self.scale * factor);
    }

    pub fn rotate(&mut self, direction: i32) {
        let delta = match direction.signum() {
            1 => 90.0,
            -1 => -90.0,
            _ => return,
        };
        self.rotation_deg = (self.rotation_deg + delta).rem_euclid(360.0);
    }

    pub fn toggle_mirror_x(&mut self) {
        self.mirror_x = !self.mirror_x;
    }

    pub fn toggle_mirror_y(&mut self) {
        self.mirror_y = !self.mirror_y;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.offset_x += f64::from(delta.x);
        self.offset_y += f64::from(delta.y);
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset_x = f64::from(offset.x);
        self.offset_y = f64::from(offset.y);
    }

    /// Restore fixed defaults.
    pub fn reset(&mut self) {
        *self = Self::new(self.limits);
    }

    /// Centre the document and pick the largest scale that keeps it inside
    /// the padded viewport. Rotation and mirroring are cleared.
    pub fn fit_to_extent(&mut self, target: FitTarget) {
        self.reset();
        let pad = 2.0 * self.limits.fit_padding;
        let avail_w = f64::from(target.viewport.width()) - pad;
        let avail_h = f64::from(target.viewport.height()) - pad;
        if target.width <= 0.0 || target.height <= 0.0 || avail_w <= 0.0 || avail_h <= 0.0 {
            return;
        }
        let fit = (avail_w / target.width).min(avail_h / target.height);
        self.scale = self.limits.clamp_scale(fit);
    }

    /// Reset according to [`ResetMode`]; fit falls back to fixed without a target.
    pub fn reset_with(&mut self, target: Option<FitTarget>) {
        match (self.limits.reset_mode, target) {
            (ResetMode::Fit, Some(target)) => self.fit_to_extent(target),
            _ => self.reset(),
        }
    }

    pub fn apply(&mut self, action: ViewAction, fit: Option<FitTarget>) {
        match action {
            ViewAction::Zoom(direction) => self.zoom(direction),
            ViewAction::Rotate(direction) => self.rotate(direction),
            ViewAction::MirrorX => self.toggle_mirror_x(),
            ViewAction::MirrorY => self.toggle_mirror_y(),
            ViewAction::Reset => self.reset_with(fit),
            ViewAction::PanBy(delta) => self.pan_by(delta),
        }
    }

    /// Compose the mapping for a viewport and a document half-extent.
    pub fn transform(&self, viewport: Rect, half_extent: Point) -> ViewTransform {
        let center = viewport.center();
        let forward = Affine2::translate(
            self.offset_x + f64::from(center.x),
            self.offset_y + f64::from(center.y),
        ) * Affine2::scale(self.scale, self.scale)
            * Affine2::translate(-half_extent.x, -half_extent.y)
            * Affine2::rotate(self.rotation_deg)
            * Affine2::scale(if self.mirror_x { -1.0 } else { 1.0 }, 1.0)
            * Affine2::scale(1.0, if self.mirror_y { -1.0 } else { 1.0 });
        ViewTransform::new(forward)
    }
}

// =============================================================================
// VIEW TRANSFORM
// =============================================================================

/// A resolved model ↔ screen mapping for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    forward: Affine2,
    inverse: Option<Affine2>,
}

impl ViewTransform {
    pub fn new(forward: Affine2) -> Self {
        Self {
            forward,
            inverse: forward.inverse(),
        }
    }

    pub fn matrix(&self) -> &Affine2 {
        &self.forward
    }

    pub fn model_to_screen(&self, p: Point) -> Pos2 {
        let s = self.forward.apply(p);
        Pos2::new(s.x as f32, s.y as f32)
    }

    pub fn screen_to_model(&self, p: Pos2) -> Option<Point> {
        self.inverse
            .map(|inv| inv.apply(Point::new(f64::from(p.x), f64::from(p.y))))
    }

    /// Model length to screen pixels.
    pub fn length(&self, model: f64) -> f32 {
        (model * self.forward.uniform_scale()) as f32
    }

    /// Compose a model-local transform (e.g. a rotated robot) under this view.
    pub fn local(&self, local: Affine2) -> ViewTransform {
        ViewTransform::new(self.forward * local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    const HALF: Point = Point::new(50_000.0, 50_000.0);

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn default_view_centres_document() {
        let view = ViewState::default();
        let t = view.transform(viewport(), HALF);
        assert!(close(t.model_to_screen(HALF), Pos2::new(400.0, 300.0)));
        assert!(close(
            t.model_to_screen(Point::new(60_000.0, 50_000.0)),
            Pos2::new(480.0, 300.0)
        ));
    }

    #[test]
    fn rotation_pivots_on_model_origin() {
        let mut view = ViewState::default();
        view.rotate(1);
        let t = view.transform(viewport(), HALF);
        assert!(close(t.model_to_screen(HALF), Pos2::new(-400.0, 300.0)));
    }

    #[test]
    fn mirror_applies_before_rotation() {
        let mut view = ViewState::default();
        view.toggle_mirror_x();
        view.rotate(1);
        let t = view.transform(viewport(), Point::new(0.0, 0.0));
        // (1000, 0) -> mirror (-1000, 0) -> rotate 90 (0, -1000) -> scale (0, -8)
        assert!(close(
            t.model_to_screen(Point::new(1_000.0, 0.0)),
            Pos2::new(400.0, 292.0)
        ));
    }

    #[test]
    fn offset_pans_in_screen_space() {
        let mut view = ViewState::default();
        view.rotate(1);
        view.pan_by(Vec2::new(10.0, -20.0));
        let t = view.transform(viewport(), Point::new(0.0, 0.0));
        assert!(close(
            t.model_to_screen(Point::new(0.0, 0.0)),
            Pos2::new(410.0, 280.0)
        ));
    }

    #[test]
    fn zero_direction_is_ignored() {
        let mut view = ViewState::default();
        let before = view;
        view.zoom(0);
        view.rotate(0);
        assert_eq!(view, before);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut view = ViewState::default();
        view.zoom(3);
        view.rotate(-1);
        view.toggle_mirror_y();
        view.pan_by(Vec2::new(5.0, 5.0));
        view.apply(ViewAction::Reset, None);
        assert_eq!(view, ViewState::default());
        assert_eq!(view.scale(), 0.008);
    }

    #[test]
    fn fit_mode_scales_to_viewport() {
        let limits = ViewLimits {
            reset_mode: ResetMode::Fit,
            ..Default::default()
        };
        let mut view = ViewState::new(limits);
        view.rotate(1);
        view.apply(
            ViewAction::Reset,
            Some(FitTarget {
                viewport: viewport(),
                width: 100_000.0,
                height: 20_000.0,
            }),
        );
        // (800 - 100) / 100_000 beats (600 - 100) / 20_000
        assert!((view.scale() - 0.007).abs() < 1e-12);
        assert_eq!(view.rotation_deg(), 0.0);
    }

    #[test]
    fn fit_clamps_and_ignores_empty_documents() {
        let mut view = ViewState::default();
        view.fit_to_extent(FitTarget {
            viewport: viewport(),
            width: 10.0,
            height: 10.0,
        });
        assert_eq!(view.scale(), 0.05);

        view.fit_to_extent(FitTarget {
            viewport: viewport(),
            width: 0.0,
            height: 0.0,
        });
        assert_eq!(view.scale(), 0.008);
    }

    #[test]
    fn affine_product_applies_right_first() {
        let t = Affine2::translate(10.0, 0.0);
        let s = Affine2::scale(2.0, 2.0);
        let p = Point::new(1.0, 1.0);
        assert_eq!((t * s).apply(p), Point::new(12.0, 2.0));
        assert_eq!((s * t).apply(p), Point::new(22.0, 2.0));
    }

    proptest! {
        #[test]
        fn zoom_never_leaves_bounds(steps in proptest::collection::vec(-3i32..=3, 0..200)) {
            let mut view = ViewState::default();
            for step in steps {
                view.zoom(step);
                prop_assert!(view.scale() >= 0.001 && view.scale() <= 0.05);
            }
        }

        #[test]
        fn four_quarter_turns_are_identity(start in 0i32..4, dir in prop_oneof![Just(1), Just(-1)]) {
            let mut view = ViewState::default();
            for _ in 0..start {
                view.rotate(1);
            }
            let before = view.rotation_deg();
            for _ in 0..4 {
                view.rotate(dir);
            }
            prop_assert_eq!(view.rotation_deg(), before);
        }

        #[test]
        fn screen_to_model_inverts(
            x in -200_000.0f64..200_000.0,
            y in -200_000.0f64..200_000.0,
            zooms in -15i32..15,
            turns in 0i32..4,
            mx in any::<bool>(),
            my in any::<bool>(),
        ) {
            let mut view = ViewState::default();
            for _ in 0..zooms.abs() {
                view.zoom(zooms.signum());
            }
            for _ in 0..turns {
                view.rotate(1);
            }
            if mx { view.toggle_mirror_x(); }
            if my { view.toggle_mirror_y(); }
            view.pan_by(Vec2::new(33.0, -12.0));

            let t = view.transform(viewport(), HALF);
            let p = Point::new(x, y);
            let screen = t.forward.apply(p);
            let back = t.inverse.unwrap().apply(screen);
            prop_assert!((back.x - x).abs() < 1e-6 && (back.y - y).abs() < 1e-6);
        }
    }
}
