// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Regular mesh builders.
//!
//! These produce conforming meshes over rectangular grids. Elements are
//! positively oriented.

use nalgebra::{Point2, Point3, Vector3};

use crate::error::Result;
use crate::geometry::signed_volume6;
use crate::keys::NodeIdx;
use crate::mesh::{CMesh2D, CMesh2D5, CMesh3D};

/// Triangulated `nx` by `ny` grid of square cells with the given spacing.
///
/// Nodes are numbered in raster order, `j * (nx + 1) + i`, and each cell is
/// split along its rising diagonal.
pub fn grid_2d(nx: usize, ny: usize, spacing: f64, origin: Point2<f64>) -> Result<CMesh2D> {
    let mut mesh = CMesh2D::new();
    for j in 0..=ny {
        for i in 0..=nx {
            mesh.add_node(Point2::new(
                origin.x + i as f64 * spacing,
                origin.y + j as f64 * spacing,
            ));
        }
    }
    let id = |i: usize, j: usize| NodeIdx(j * (nx + 1) + i);
    for j in 0..ny {
        for i in 0..nx {
            let (p00, p10, p11, p01) = (id(i, j), id(i + 1, j), id(i + 1, j + 1), id(i, j + 1));
            mesh.add_element([p00, p10, p11])?;
            mesh.add_element([p00, p11, p01])?;
        }
    }
    Ok(mesh)
}

/// Triangulated grid lying in the plane `z = origin.z`.
pub fn surface_grid(nx: usize, ny: usize, spacing: f64, origin: Point3<f64>) -> Result<CMesh2D5> {
    let mut mesh = CMesh2D5::new();
    for j in 0..=ny {
        for i in 0..=nx {
            mesh.add_node(Point3::new(
                origin.x + i as f64 * spacing,
                origin.y + j as f64 * spacing,
                origin.z,
            ));
        }
    }
    let id = |i: usize, j: usize| NodeIdx(j * (nx + 1) + i);
    for j in 0..ny {
        for i in 0..nx {
            mesh.add_element([id(i, j), id(i + 1, j), id(i + 1, j + 1)])?;
            mesh.add_element([id(i, j), id(i + 1, j + 1), id(i, j + 1)])?;
        }
    }
    Ok(mesh)
}

/// Tetrahedralised `nx` by `ny` by `nz` box grid of cubes.
///
/// Each cube is split into six tetrahedra that share its main diagonal, one
/// per axis permutation. Every cube is split the same way, so shared faces
/// match and the tiling is conforming.
pub fn box_grid_3d(
    nx: usize,
    ny: usize,
    nz: usize,
    spacing: f64,
    origin: Point3<f64>,
) -> Result<CMesh3D> {
    let mut mesh = CMesh3D::new();
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                mesh.add_node(origin + Vector3::new(i as f64, j as f64, k as f64) * spacing);
            }
        }
    }
    let id = |i: usize, j: usize, k: usize| NodeIdx((k * (ny + 1) + j) * (nx + 1) + i);
    const PERMUTATIONS: [[usize; 3]; 6] =
        [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for perm in PERMUTATIONS {
                    let mut c = [i, j, k];
                    let mut tet = [id(i, j, k); 4];
                    for (step, &axis) in perm.iter().enumerate() {
                        c[axis] += 1;
                        tet[step + 1] = id(c[0], c[1], c[2]);
                    }
                    orient_positive(&mesh, &mut tet);
                    mesh.add_element(tet)?;
                }
            }
        }
    }
    Ok(mesh)
}

fn orient_positive(mesh: &CMesh3D, tet: &mut [NodeIdx; 4]) {
    let p = tet.map(|n| mesh.node(n).copied().unwrap_or_else(Point3::origin));
    if signed_volume6(&p[0], &p[1], &p[2], &p[3]) < 0.0 {
        tet.swap(2, 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::signed_area2;
    use approx::assert_relative_eq;

    #[test]
    fn grid_2d_counts_and_orientation() {
        let m = grid_2d(3, 2, 1.0, Point2::origin()).unwrap();
        assert_eq!(m.num_nodes(), 12);
        assert_eq!(m.num_elements(), 12);
        let total: f64 = m
            .elements()
            .map(|(e, _)| {
                let t = m.element_positions(e).unwrap();
                let a = signed_area2(&t[0], &t[1], &t[2]);
                assert!(a > 0.0);
                a * 0.5
            })
            .sum();
        assert_relative_eq!(total, 6.0);
    }

    #[test]
    fn box_grid_volume_is_exact() {
        let m = box_grid_3d(2, 1, 1, 2.0, Point3::origin()).unwrap();
        assert_eq!(m.num_nodes(), 12);
        assert_eq!(m.num_elements(), 12);
        let total: f64 = m
            .elements()
            .map(|(e, _)| {
                let t = m.element_positions(e).unwrap();
                let v = signed_volume6(&t[0], &t[1], &t[2], &t[3]);
                assert!(v > 0.0);
                v / 6.0
            })
            .sum();
        assert_relative_eq!(total, 16.0, epsilon = 1e-12);
    }

    #[test]
    fn surface_grid_is_flat() {
        let m = surface_grid(1, 1, 1.0, Point3::new(0.0, 0.0, 5.0)).unwrap();
        assert!(m.nodes().all(|(_, p)| p.z == 5.0));
        assert_eq!(m.num_elements(), 2);
    }
}
