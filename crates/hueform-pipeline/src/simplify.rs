//! Polygon simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces a closed contour to a handful of vertices. The tolerance is
//! relative: `perimeter * epsilon_factor`, so small and large shapes in
//! the same frame simplify alike.
//!
//! This stage sits between contour extraction and shape classification.

use crate::types::{Contour, PipelineError, Point, Polygon};

/// Default fraction of the perimeter used as the RDP tolerance.
pub const DEFAULT_EPSILON_FACTOR: f64 = 0.02;

/// Simplify a closed contour with tolerance `perimeter * epsilon_factor`.
///
/// The contour is walked as the open polyline `p0 .. pn-1, p0`, so both
/// the first point and the wrap back to it are preserved; the
/// duplicated closing point is dropped from the result.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the contour has fewer than
/// two points.
pub fn simplify(contour: &Contour, epsilon_factor: f64) -> Result<Polygon, PipelineError> {
    if contour.len() < 2 {
        return Err(PipelineError::InvalidInput(format!(
            "contour has {} point(s), need at least 2",
            contour.len()
        )));
    }
    let tolerance = contour.perimeter() * epsilon_factor;
    Ok(simplify_closed(contour.points(), tolerance))
}

/// Simplify a closed loop with an absolute tolerance in pixels.
#[must_use = "returns the simplified polygon"]
pub fn simplify_closed(points: &[Point], tolerance: f64) -> Polygon {
    if points.len() < 3 {
        return Polygon::new(points.to_vec());
    }

    let mut ring = Vec::with_capacity(points.len() + 1);
    ring.extend_from_slice(points);
    ring.push(points[0]);

    let mut kept = vec![false; ring.len()];
    kept[0] = true;
    let last = ring.len() - 1;
    kept[last] = true;

    rdp_recurse(&ring, 0, last, tolerance, &mut kept);

    // Drop the closing duplicate of the first point.
    let simplified: Vec<Point> = ring[..last]
        .iter()
        .zip(&kept[..last])
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polygon::new(simplified)
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide (always true for the first split of a
/// closed loop), returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let (px, py) = (f64::from(p.x), f64::from(p.y));
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let dx = f64::from(b.x) - ax;
    let dy = f64::from(b.y) - ay;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(ay - py, -(dy * (ax - px)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Every boundary pixel of an axis-aligned square, clockwise from
    /// the top-left corner.
    fn square_outline(x0: i32, y0: i32, side: i32) -> Contour {
        let x1 = x0 + side - 1;
        let y1 = y0 + side - 1;
        let mut points = Vec::new();
        points.extend((x0..x1).map(|x| Point::new(x, y0)));
        points.extend((y0..y1).map(|y| Point::new(x1, y)));
        points.extend((x0 + 1..=x1).rev().map(|x| Point::new(x, y1)));
        points.extend((y0 + 1..=y1).rev().map(|y| Point::new(x0, y)));
        Contour::new(points)
    }

    #[test]
    fn fewer_than_two_points_is_invalid() {
        let result = simplify(&Contour::new(vec![Point::new(1, 1)]), DEFAULT_EPSILON_FACTOR);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
        let result = simplify(&Contour::new(vec![]), DEFAULT_EPSILON_FACTOR);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn two_points_unchanged() {
        let contour = Contour::new(vec![Point::new(0, 0), Point::new(10, 0)]);
        let result = simplify(&contour, DEFAULT_EPSILON_FACTOR).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn square_outline_reduces_to_corners() {
        let contour = square_outline(5, 5, 40);
        let polygon = simplify(&contour, DEFAULT_EPSILON_FACTOR).unwrap();
        assert_eq!(
            polygon.points(),
            &[
                Point::new(5, 5),
                Point::new(44, 5),
                Point::new(44, 44),
                Point::new(5, 44),
            ]
        );
    }

    #[test]
    fn first_point_is_preserved() {
        let contour = square_outline(0, 0, 25);
        let polygon = simplify(&contour, DEFAULT_EPSILON_FACTOR).unwrap();
        assert_eq!(polygon.points()[0], contour.points()[0]);
    }

    #[test]
    fn scale_relative_tolerance_treats_sizes_alike() {
        let small = simplify(&square_outline(0, 0, 12), DEFAULT_EPSILON_FACTOR).unwrap();
        let large = simplify(&square_outline(0, 0, 300), DEFAULT_EPSILON_FACTOR).unwrap();
        assert_eq!(small.len(), 4);
        assert_eq!(large.len(), 4);
    }

    #[test]
    fn output_never_longer_than_input() {
        let contours = [
            square_outline(0, 0, 3),
            square_outline(2, 7, 17),
            Contour::new(vec![Point::new(0, 0), Point::new(3, 1), Point::new(1, 4)]),
        ];
        for contour in &contours {
            for factor in [0.0, 0.01, 0.02, 0.5] {
                let polygon = simplify(contour, factor).unwrap();
                assert!(polygon.len() <= contour.len());
                assert!(!polygon.is_empty());
            }
        }
    }

    #[test]
    fn zero_tolerance_keeps_non_collinear_points() {
        let contour = Contour::new(vec![
            Point::new(0, 0),
            Point::new(10, 1),
            Point::new(20, 0),
            Point::new(10, 10),
        ]);
        let polygon = simplify_closed(contour.points(), 0.0);
        assert_eq!(polygon.len(), 4);
    }

    #[test]
    fn perpendicular_distance_on_axis() {
        let d = perpendicular_distance(Point::new(1, 3), Point::new(0, 0), Point::new(2, 0));
        assert!((d - 3.0).abs() < 1e-10);
    }

    #[test]
    fn perpendicular_distance_coincident_endpoints() {
        let d = perpendicular_distance(Point::new(3, 4), Point::new(0, 0), Point::new(0, 0));
        assert!((d - 5.0).abs() < 1e-10);
    }
}
