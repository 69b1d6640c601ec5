//! PathSmoother - Catmull-Rom resampling of edge control points
//!
//! Each span `p1 → p2` is evaluated at `segments` parameters `t = j/segments`,
//! with neighbours `p0`/`p3` clamped to the ends of the sequence. The
//! evaluation parameter is `t · tension`, so lower tension keeps each span
//! closer to its starting knot and `tension = 0` collapses every step onto it.
//!
//! Output layout for `n` input points:
//!
//! ```text
//! [first] ++ (n - 1) · segments evaluated points ++ [last]
//! ```

use floorplan_model::Point;
use serde::{Deserialize, Serialize};

/// Bow of the synthetic midpoint for two-point paths, as a share of the chord.
const TWO_POINT_BOW: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSmoother {
    /// Clamped to `[0, 1]` on use.
    pub tension: f64,
    /// Samples per span; zero is treated as one.
    pub segments: usize,
}

impl Default for PathSmoother {
    fn default() -> Self {
        Self {
            tension: 0.5,
            segments: 10,
        }
    }
}

impl PathSmoother {
    pub fn new(tension: f64, segments: usize) -> Self {
        Self { tension, segments }
    }

    fn tension(&self) -> f64 {
        if self.tension.is_finite() {
            self.tension.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Smooth a control polyline. Fewer than two points are returned as-is.
    pub fn smooth(&self, points: &[Point]) -> Vec<Point> {
        if points.len() < 2 {
            return points.to_vec();
        }
        let tension = self.tension();
        let segments = self.segments.max(1);

        let knots = if points.len() == 2 {
            bowed(points[0], points[1], tension)
        } else {
            points.to_vec()
        };

        let last = knots.len() - 1;
        let mut out = Vec::with_capacity(2 + last * segments);
        out.push(knots[0]);
        for i in 0..last {
            let p0 = knots[i.saturating_sub(1)];
            let p1 = knots[i];
            let p2 = knots[i + 1];
            let p3 = knots[(i + 2).min(last)];
            for j in 1..=segments {
                let t = j as f64 / segments as f64;
                out.push(catmull_rom(p0, p1, p2, p3, t * tension));
            }
        }
        out.push(knots[last]);
        out
    }
}

/// Insert a midpoint pushed off the chord so a two-point edge renders as a curve.
fn bowed(start: Point, end: Point, tension: f64) -> Vec<Point> {
    let mut mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
    let perp = Point::new(-(end.y - start.y), end.x - start.x);
    let chord = perp.x.hypot(perp.y);
    if chord > 0.0 {
        let offset = chord * TWO_POINT_BOW * tension;
        mid.x += perp.x / chord * offset;
        mid.y += perp.y / chord * offset;
    }
    vec![start, mid, end]
}

/// Uniform Catmull-Rom between `p1` (t = 0) and `p2` (t = 1).
pub fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    let axis = |a: f64, b: f64, c: f64, d: f64| {
        let v0 = (c - a) * 0.5;
        let v1 = (d - b) * 0.5;
        b + v0 * t + (3.0 * (c - b) - 2.0 * v0 - v1) * t2 + (2.0 * (b - c) + v0 + v1) * t3
    };
    Point::new(axis(p0.x, p1.x, p2.x, p3.x), axis(p0.y, p1.y, p2.y, p3.y))
}
