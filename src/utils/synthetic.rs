//! Synthetic walls and screws with known geometry, used by the tests and the
//! demo fixtures.
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Grid of points on the plane `x = const`, spaced `spacing` apart in y and z.
pub fn plane_wall_x(
    x: f64,
    y_range: (f64, f64),
    z_range: (f64, f64),
    spacing: f64,
) -> Vec<Point3<f64>> {
    let ny = ((y_range.1 - y_range.0) / spacing).round() as usize + 1;
    let nz = ((z_range.1 - z_range.0) / spacing).round() as usize + 1;

    let mut points = Vec::with_capacity(ny * nz);
    for i in 0..ny {
        for j in 0..nz {
            points.push(Point3::new(
                x,
                y_range.0 + i as f64 * spacing,
                z_range.0 + j as f64 * spacing,
            ));
        }
    }
    points
}

/// Generates one ring of `num_points` around `center`, lying in the plane
/// spanned by `u` and `v`.
pub fn generate_ring_points(
    center: &Point3<f64>,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
    radius: f64,
    num_points: usize,
) -> Vec<Point3<f64>> {
    (0..num_points)
        .map(|i| {
            let theta = 2.0 * PI * (i as f64) / (num_points as f64);
            center + u * (radius * theta.cos()) + v * (radius * theta.sin())
        })
        .collect()
}

/// Surface points of a cylinder from `start` along `direction`.
///
/// Rings are at most one unit apart and include both end caps' rims, so the
/// projected length along the axis is exactly `length`.
pub fn cylinder_screw(
    start: Point3<f64>,
    direction: Vector3<f64>,
    length: f64,
    radius: f64,
    ring_points: usize,
) -> Vec<Point3<f64>> {
    let axis = direction.normalize();
    // any vector not parallel to the axis seeds the ring basis
    let seed = if axis.z.abs() < 0.9 {
        Vector3::z()
    } else {
        Vector3::x()
    };
    let u = axis.cross(&seed).normalize();
    let v = axis.cross(&u).normalize();

    let rings = length.ceil() as usize + 1;
    let mut points = Vec::with_capacity(rings * ring_points);
    for i in 0..rings {
        let t = length * i as f64 / (rings - 1) as f64;
        let center = start + axis * t;
        points.extend(generate_ring_points(&center, &u, &v, radius, ring_points));
    }
    points
}

/// Screw along +y at the given x with its axis in the z = 0 plane.
pub fn screw_along_y(x: f64, y_start: f64, length: f64) -> Vec<Point3<f64>> {
    cylinder_screw(
        Point3::new(x, y_start, 0.0),
        Vector3::y(),
        length,
        2.0,
        12,
    )
}
