// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-element affine maps.
//!
//! An element's map takes its source vertices exactly onto its destination
//! vertices. Elements whose signed area (or volume) is below the squash
//! tolerance get the translation between the vertex centroids instead, and
//! the solve reports them as squashed.

use nalgebra::{Matrix2, Matrix3, Point2, Point3, Vector2, Vector3};

/// 2D affine map: `x' = x[0] x + x[1] y + x[2]`, `y' = y[0] x + y[1] y + y[2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2D {
    pub x: [f64; 3],
    pub y: [f64; 3],
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        x: [1.0, 0.0, 0.0],
        y: [0.0, 1.0, 0.0],
    };

    pub fn translation(d: Vector2<f64>) -> Self {
        Self {
            x: [1.0, 0.0, d.x],
            y: [0.0, 1.0, d.y],
        }
    }

    fn from_parts(m: &Matrix2<f64>, t: &Vector2<f64>) -> Self {
        Self {
            x: [m[(0, 0)], m[(0, 1)], t.x],
            y: [m[(1, 0)], m[(1, 1)], t.y],
        }
    }

    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.x[0] * p.x + self.x[1] * p.y + self.x[2],
            self.y[0] * p.x + self.y[1] * p.y + self.y[2],
        )
    }
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 3D affine map stored as rows `(a, b, c, t)` for x, y and z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine3D {
    pub tr: [f64; 12],
}

impl Affine3D {
    pub const IDENTITY: Affine3D = Affine3D {
        tr: [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub fn translation(d: Vector3<f64>) -> Self {
        let mut a = Self::IDENTITY;
        a.tr[3] = d.x;
        a.tr[7] = d.y;
        a.tr[11] = d.z;
        a
    }

    fn from_parts(m: &Matrix3<f64>, t: &Vector3<f64>) -> Self {
        let mut tr = [0.0; 12];
        for r in 0..3 {
            tr[r * 4] = m[(r, 0)];
            tr[r * 4 + 1] = m[(r, 1)];
            tr[r * 4 + 2] = m[(r, 2)];
            tr[r * 4 + 3] = t[r];
        }
        Self { tr }
    }

    #[inline]
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        let t = &self.tr;
        Point3::new(
            t[0] * p.x + t[1] * p.y + t[2] * p.z + t[3],
            t[4] * p.x + t[5] * p.y + t[6] * p.z + t[7],
            t[8] * p.x + t[9] * p.y + t[10] * p.z + t[11],
        )
    }
}

impl Default for Affine3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A solved map and whether its source element was squashed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solved<A> {
    pub map: A,
    pub squashed: bool,
}

fn centroid2(p: &[Point2<f64>; 3]) -> Vector2<f64> {
    (p[0].coords + p[1].coords + p[2].coords) / 3.0
}

fn centroid3<const N: usize>(p: &[Point3<f64>; N]) -> Vector3<f64> {
    p.iter().fold(Vector3::zeros(), |acc, q| acc + q.coords) / N as f64
}

/// Solves the affine map taking triangle `src` onto triangle `dst`.
///
/// The source's twice-signed-area is computed from its two edge vectors;
/// below `tol` the element is squashed and the map is the translation taking
/// the source centroid to the destination centroid.
pub fn solve_triangle(
    src: &[Point2<f64>; 3],
    dst: &[Point2<f64>; 3],
    tol: f64,
) -> Solved<Affine2D> {
    let u = Matrix2::from_columns(&[src[1] - src[0], src[2] - src[0]]);
    let area2 = u.determinant();
    let squashed = Solved {
        map: Affine2D::translation(centroid2(dst) - centroid2(src)),
        squashed: true,
    };
    if !area2.is_finite() || area2.abs() < tol {
        return squashed;
    }
    let Some(u_inv) = u.try_inverse() else {
        return squashed;
    };
    let v = Matrix2::from_columns(&[dst[1] - dst[0], dst[2] - dst[0]]);
    let m = v * u_inv;
    let t = dst[0].coords - m * src[0].coords;
    Solved {
        map: Affine2D::from_parts(&m, &t),
        squashed: false,
    }
}

/// Solves the affine map taking tetrahedron `src` onto tetrahedron `dst`,
/// squashing below `tol` on six times the signed volume.
pub fn solve_tetrahedron(
    src: &[Point3<f64>; 4],
    dst: &[Point3<f64>; 4],
    tol: f64,
) -> Solved<Affine3D> {
    let u = Matrix3::from_columns(&[src[1] - src[0], src[2] - src[0], src[3] - src[0]]);
    let vol6 = u.determinant();
    let squashed = Solved {
        map: Affine3D::translation(centroid3(dst) - centroid3(src)),
        squashed: true,
    };
    if !vol6.is_finite() || vol6.abs() < tol {
        return squashed;
    }
    let Some(u_inv) = u.try_inverse() else {
        return squashed;
    };
    let v = Matrix3::from_columns(&[dst[1] - dst[0], dst[2] - dst[0], dst[3] - dst[0]]);
    let m = v * u_inv;
    let t = dst[0].coords - m * src[0].coords;
    Solved {
        map: Affine3D::from_parts(&m, &t),
        squashed: false,
    }
}

/// Appends a vertex off the triangle's plane: the centroid displaced by the
/// cross product of the two edge vectors.
fn lift(tri: &[Point3<f64>; 3]) -> [Point3<f64>; 4] {
    let n = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
    let apex = Point3::from(centroid3(tri) + n);
    [tri[0], tri[1], tri[2], apex]
}

/// Solves the map for a triangle embedded in 3D by lifting both triangles to
/// tetrahedra.
pub fn solve_surface_triangle(
    src: &[Point3<f64>; 3],
    dst: &[Point3<f64>; 3],
    tol: f64,
) -> Solved<Affine3D> {
    let s = lift(src);
    let d = lift(dst);
    let v = solve_tetrahedron(&s, &d, tol);
    if v.squashed {
        return Solved {
            map: Affine3D::translation(centroid3(dst) - centroid3(src)),
            squashed: true,
        };
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MESH_TOLERANCE_SQ;
    use approx::assert_relative_eq;

    #[test]
    fn triangle_solve_maps_vertices() {
        let src = [Point2::new(0.0, 0.0), Point2::new(3.0, 0.5), Point2::new(1.0, 2.0)];
        let dst = [Point2::new(1.0, 1.0), Point2::new(5.0, 0.0), Point2::new(2.5, 4.0)];
        let s = solve_triangle(&src, &dst, MESH_TOLERANCE_SQ);
        assert!(!s.squashed);
        for (p, q) in src.iter().zip(dst.iter()) {
            let r = s.map.apply(p);
            assert_relative_eq!(r.x, q.x, epsilon = 1e-10);
            assert_relative_eq!(r.y, q.y, epsilon = 1e-10);
        }
    }

    #[test]
    fn default_maps_are_identity() {
        assert_eq!(Affine2D::default(), Affine2D::IDENTITY);
        assert_eq!(Affine3D::default(), Affine3D::IDENTITY);
        let p = Point3::new(1.5, -2.0, 4.0);
        assert_eq!(Affine3D::default().apply(&p), p);
    }

    #[test]
    fn squashed_triangle_is_translation() {
        let src = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)];
        let dst = [Point2::new(1.0, 0.0), Point2::new(2.0, 1.0), Point2::new(3.0, 2.0)];
        let s = solve_triangle(&src, &dst, MESH_TOLERANCE_SQ);
        assert!(s.squashed);
        assert_eq!(s.map.x[..2], [1.0, 0.0]);
        assert_eq!(s.map.y[..2], [0.0, 1.0]);
        assert_relative_eq!(s.map.x[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.map.y[2], 0.0, epsilon = 1e-12);
        assert!(s.map.x.iter().chain(s.map.y.iter()).all(|v| v.is_finite()));
    }

    #[test]
    fn tetrahedron_solve_maps_vertices() {
        let src = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        let dst = [
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(3.5, 0.2, 0.0),
            Point3::new(0.5, 2.0, 1.0),
            Point3::new(1.0, 0.3, 3.0),
        ];
        let s = solve_tetrahedron(&src, &dst, MESH_TOLERANCE_SQ);
        assert!(!s.squashed);
        for (p, q) in src.iter().zip(dst.iter()) {
            let r = s.map.apply(p);
            assert_relative_eq!(r, *q, epsilon = 1e-10);
        }
    }

    #[test]
    fn flat_tetrahedron_is_squashed() {
        let src = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let s = solve_tetrahedron(&src, &src, MESH_TOLERANCE_SQ);
        assert!(s.squashed);
        assert_eq!(s.map, Affine3D::IDENTITY);
    }

    #[test]
    fn surface_triangle_solve_maps_vertices() {
        let src = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(0.0, 2.0, 1.0),
        ];
        let dst = [
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, 3.0),
            Point3::new(0.0, 2.0, 2.0),
        ];
        let s = solve_surface_triangle(&src, &dst, MESH_TOLERANCE_SQ);
        assert!(!s.squashed);
        for (p, q) in src.iter().zip(dst.iter()) {
            assert_relative_eq!(s.map.apply(p), *q, epsilon = 1e-10);
        }
    }
}
