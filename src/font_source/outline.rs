//! Conversion between UFO contours and kurbo paths

use kurbo::{Affine, BezPath, Point, Rect, Shape};
use norad::{Contour, ContourPoint, PointType};

fn to_point(point: &ContourPoint) -> Point {
    Point::new(point.x, point.y)
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Emit the segment ending at `point`, consuming pending off-curve points
fn push_segment(path: &mut BezPath, pending: &mut Vec<Point>, point: &ContourPoint) {
    let end = to_point(point);
    match point.typ {
        PointType::OffCurve => {
            pending.push(end);
            return;
        }
        PointType::Move | PointType::Line => path.line_to(end),
        PointType::Curve => match pending.len() {
            0 => path.line_to(end),
            1 => path.quad_to(pending[0], end),
            n => path.curve_to(pending[n - 2], pending[n - 1], end),
        },
        PointType::QCurve => {
            if pending.is_empty() {
                path.line_to(end);
            } else {
                // consecutive quadratic controls have implied on-curve points
                // halfway between them
                for i in 0..pending.len() {
                    let control = pending[i];
                    let to = match pending.get(i + 1) {
                        Some(next) => midpoint(control, *next),
                        None => end,
                    };
                    path.quad_to(control, to);
                }
            }
        }
    }
    pending.clear();
}

/// Convert a UFO contour to a kurbo path
///
/// Closed contours start at their first on-curve point and wrap around to
/// it. A closed contour made of off-curve points only is a TrueType
/// quadratic loop.
pub fn contour_to_bezpath(contour: &Contour) -> BezPath {
    let points = &contour.points;
    let mut path = BezPath::new();
    if points.is_empty() {
        return path;
    }

    let closed = points[0].typ != PointType::Move;
    let start = if closed {
        points.iter().position(|p| p.typ != PointType::OffCurve)
    } else {
        Some(0)
    };

    let Some(start) = start else {
        let controls: Vec<Point> = points.iter().map(to_point).collect();
        let n = controls.len();
        path.move_to(midpoint(controls[n - 1], controls[0]));
        for i in 0..n {
            path.quad_to(controls[i], midpoint(controls[i], controls[(i + 1) % n]));
        }
        path.close_path();
        return path;
    };

    let n = points.len();
    path.move_to(to_point(&points[start]));
    let mut pending = Vec::new();
    for offset in 1..n {
        push_segment(&mut path, &mut pending, &points[(start + offset) % n]);
    }
    if closed {
        push_segment(&mut path, &mut pending, &points[start]);
        path.close_path();
    }
    path
}

/// Bounding box of a set of contours, `None` when they hold no points
pub fn contours_bounds(contours: &[Contour]) -> Option<Rect> {
    contours
        .iter()
        .filter(|contour| !contour.points.is_empty())
        .map(|contour| contour_to_bezpath(contour).bounding_box())
        .reduce(|acc, rect| acc.union(rect))
}

/// Apply an affine transform to every point of a contour in place
pub fn transform_contour(contour: &mut Contour, affine: Affine) {
    for point in contour.points.iter_mut() {
        let moved = affine * Point::new(point.x, point.y);
        point.x = moved.x;
        point.y = moved.y;
    }
}

pub fn affine_from_norad(transform: &norad::AffineTransform) -> Affine {
    Affine::new([
        transform.x_scale,
        transform.xy_scale,
        transform.yx_scale,
        transform.y_scale,
        transform.x_offset,
        transform.y_offset,
    ])
}

pub fn affine_to_norad(affine: Affine) -> norad::AffineTransform {
    let [x_scale, xy_scale, yx_scale, y_scale, x_offset, y_offset] = affine.as_coeffs();
    norad::AffineTransform {
        x_scale,
        xy_scale,
        yx_scale,
        y_scale,
        x_offset,
        y_offset,
    }
}
