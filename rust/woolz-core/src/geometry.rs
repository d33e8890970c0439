// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simplex measures and barycentric coordinates.

use nalgebra::{Point2, Point3, Vector3};

/// Measures below this are treated as degenerate.
pub const DEGENERATE_TOLERANCE: f64 = 1e-15;

/// Twice the signed area of triangle `abc`, positive when counter-clockwise.
#[inline]
pub fn signed_area2(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    let u = b - a;
    let v = c - a;
    u.x * v.y - u.y * v.x
}

/// Six times the signed volume of tetrahedron `abcd`.
#[inline]
pub fn signed_volume6(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    (b - a).dot(&(c - a).cross(&(d - a)))
}

/// Unnormalised normal of triangle `abc`.
#[inline]
pub fn triangle_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    (b - a).cross(&(c - a))
}

/// Barycentric coordinates of `p` with respect to a triangle in the plane.
pub fn barycentric_2d(tri: &[Point2<f64>; 3], p: &Point2<f64>) -> Option<[f64; 3]> {
    let d = signed_area2(&tri[0], &tri[1], &tri[2]);
    if d.abs() < DEGENERATE_TOLERANCE {
        return None;
    }
    let l0 = signed_area2(p, &tri[1], &tri[2]) / d;
    let l1 = signed_area2(&tri[0], p, &tri[2]) / d;
    Some([l0, l1, 1.0 - l0 - l1])
}

/// Barycentric coordinates of `p` with respect to a tetrahedron.
pub fn barycentric_3d(tet: &[Point3<f64>; 4], p: &Point3<f64>) -> Option<[f64; 4]> {
    let d = signed_volume6(&tet[0], &tet[1], &tet[2], &tet[3]);
    if d.abs() < DEGENERATE_TOLERANCE {
        return None;
    }
    let l0 = signed_volume6(p, &tet[1], &tet[2], &tet[3]) / d;
    let l1 = signed_volume6(&tet[0], p, &tet[2], &tet[3]) / d;
    let l2 = signed_volume6(&tet[0], &tet[1], p, &tet[3]) / d;
    Some([l0, l1, l2, 1.0 - l0 - l1 - l2])
}

/// Barycentric coordinates of the projection of `p` onto the plane of a
/// triangle in 3D, together with the signed distance of `p` from that plane.
pub fn barycentric_surface(tri: &[Point3<f64>; 3], p: &Point3<f64>) -> Option<([f64; 3], f64)> {
    let n = triangle_normal(&tri[0], &tri[1], &tri[2]);
    let nn = n.norm_squared();
    if nn < DEGENERATE_TOLERANCE {
        return None;
    }
    let len = nn.sqrt();
    let dist = (p - tri[0]).dot(&n) / len;
    let q = p - n * (dist / len);
    let l0 = (tri[2] - tri[1]).cross(&(q - tri[1])).dot(&n) / nn;
    let l1 = (tri[0] - tri[2]).cross(&(q - tri[2])).dot(&n) / nn;
    Some(([l0, l1, 1.0 - l0 - l1], dist))
}

/// Returns `true` when every coordinate is at least `-tol`.
#[inline]
pub fn inside_barycentric(lambda: &[f64], tol: f64) -> bool {
    lambda.iter().all(|&l| l >= -tol)
}
