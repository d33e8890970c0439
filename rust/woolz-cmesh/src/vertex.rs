// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transforming loose vertices through a mesh transform.
//!
//! A vertex inside an element moves by that element's forward map. A vertex
//! outside every element moves by the displacement of the nearest node.

use nalgebra::{Point2, Point3, Vector2, Vector3};
use woolz_core::grey::nint;
use woolz_core::{
    CMesh2D, CMesh2D5, CMesh3D, CMeshDomain, ElemIdx, Error, IndexedValues, Location, MeshIndex,
    MeshKind, MeshObject, Result,
};

use crate::affine::{
    solve_surface_triangle, solve_tetrahedron, solve_triangle, Affine2D, Affine3D,
};
use crate::config::TransformConfig;
use crate::displacement::{dsp2, dsp3, element_pair_2d, element_pair_3d, require_displacements};

/// 2D vertex types accepted by [`transform_vertices_2d`].
pub trait Vertex2D: Copy {
    fn to_point(&self) -> Point2<f64>;

    /// Integer vertices round to nearest.
    fn from_point(p: &Point2<f64>) -> Self;
}

impl Vertex2D for Vector2<i32> {
    fn to_point(&self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }

    fn from_point(p: &Point2<f64>) -> Self {
        Vector2::new(nint(p.x) as i32, nint(p.y) as i32)
    }
}

impl Vertex2D for Vector2<f32> {
    fn to_point(&self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }

    fn from_point(p: &Point2<f64>) -> Self {
        Vector2::new(p.x as f32, p.y as f32)
    }
}

impl Vertex2D for Vector2<f64> {
    fn to_point(&self) -> Point2<f64> {
        Point2::from(*self)
    }

    fn from_point(p: &Point2<f64>) -> Self {
        p.coords
    }
}

/// 3D vertex types accepted by [`transform_vertices_3d`].
pub trait Vertex3D: Copy {
    fn to_point(&self) -> Point3<f64>;

    fn from_point(p: &Point3<f64>) -> Self;
}

impl Vertex3D for Vector3<i32> {
    fn to_point(&self) -> Point3<f64> {
        Point3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    fn from_point(p: &Point3<f64>) -> Self {
        Vector3::new(nint(p.x) as i32, nint(p.y) as i32, nint(p.z) as i32)
    }
}

impl Vertex3D for Vector3<f32> {
    fn to_point(&self) -> Point3<f64> {
        Point3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    fn from_point(p: &Point3<f64>) -> Self {
        Vector3::new(p.x as f32, p.y as f32, p.z as f32)
    }
}

impl Vertex3D for Vector3<f64> {
    fn to_point(&self) -> Point3<f64> {
        Point3::from(*self)
    }

    fn from_point(p: &Point3<f64>) -> Self {
        p.coords
    }
}

/// Maps points through a 2D mesh transform, keeping the last enclosing
/// element and its forward map between calls.
pub(crate) struct Mapper2D<'a> {
    mesh: &'a CMesh2D,
    index: MeshIndex,
    values: &'a IndexedValues,
    tol: f64,
    current: Option<(ElemIdx, Affine2D)>,
}

impl<'a> Mapper2D<'a> {
    pub(crate) fn new(obj: &'a MeshObject, config: &TransformConfig) -> Result<Self> {
        let CMeshDomain::Mesh2D(mesh) = &obj.mesh else {
            return Err(Error::ObjectType {
                expected: MeshKind::Mesh2D.as_str(),
                found: obj.kind().as_str(),
            });
        };
        let values = require_displacements(obj)?;
        if mesh.num_nodes() == 0 {
            return Err(Error::DomainData("mesh transform has no nodes".to_string()));
        }
        Ok(Self {
            mesh: mesh.as_ref(),
            index: MeshIndex::new(mesh.as_ref())?,
            values,
            tol: config.squash_tolerance,
            current: None,
        })
    }

    pub(crate) fn map(&mut self, p: &Point2<f64>) -> Result<Point2<f64>> {
        let hint = self.current.map(|(e, _)| e);
        match self.index.locate(self.mesh, p, hint) {
            Location::Element(e) => {
                let map = match self.current {
                    Some((c, map)) if c == e => map,
                    _ => {
                        let nodes = self.mesh.element(e).ok_or(Error::ElementNotFound(e))?;
                        let positions =
                            self.mesh.element_positions(e).ok_or(Error::ElementNotFound(e))?;
                        let (src, dst) = element_pair_2d(nodes, positions, Some(self.values));
                        let map = solve_triangle(&src, &dst, self.tol).map;
                        self.current = Some((e, map));
                        map
                    }
                };
                Ok(map.apply(p))
            }
            Location::Nearest(n) => Ok(p + dsp2(Some(self.values), n)),
            Location::Outside => {
                Err(Error::DomainData("no element or node for vertex".to_string()))
            }
        }
    }
}

enum Mesh3Ref<'a> {
    Surface(&'a CMesh2D5),
    Volume(&'a CMesh3D),
}

/// Maps points through a surface or tetrahedral mesh transform.
pub(crate) struct Mapper3D<'a> {
    mesh: Mesh3Ref<'a>,
    index: MeshIndex,
    values: &'a IndexedValues,
    tol: f64,
    current: Option<(ElemIdx, Affine3D)>,
}

impl<'a> Mapper3D<'a> {
    pub(crate) fn new(obj: &'a MeshObject, config: &TransformConfig) -> Result<Self> {
        let mesh = match &obj.mesh {
            CMeshDomain::Mesh2D5(m) => Mesh3Ref::Surface(m.as_ref()),
            CMeshDomain::Mesh3D(m) => Mesh3Ref::Volume(m.as_ref()),
            CMeshDomain::Mesh2D(_) => {
                return Err(Error::ObjectType {
                    expected: "CMesh2D5 or CMesh3D",
                    found: MeshKind::Mesh2D.as_str(),
                })
            }
        };
        let values = require_displacements(obj)?;
        if obj.mesh.num_nodes() == 0 {
            return Err(Error::DomainData("mesh transform has no nodes".to_string()));
        }
        let index = match &mesh {
            Mesh3Ref::Surface(m) => MeshIndex::new(*m)?,
            Mesh3Ref::Volume(m) => MeshIndex::new(*m)?,
        };
        Ok(Self {
            mesh,
            index,
            values,
            tol: config.squash_tolerance,
            current: None,
        })
    }

    fn solve(&self, e: ElemIdx) -> Result<Affine3D> {
        let values = Some(self.values);
        match &self.mesh {
            Mesh3Ref::Surface(m) => {
                let nodes = m.element(e).ok_or(Error::ElementNotFound(e))?;
                let positions = m.element_positions(e).ok_or(Error::ElementNotFound(e))?;
                let (src, dst) = element_pair_3d(nodes, positions, values);
                Ok(solve_surface_triangle(&src, &dst, self.tol).map)
            }
            Mesh3Ref::Volume(m) => {
                let nodes = m.element(e).ok_or(Error::ElementNotFound(e))?;
                let positions = m.element_positions(e).ok_or(Error::ElementNotFound(e))?;
                let (src, dst) = element_pair_3d(nodes, positions, values);
                Ok(solve_tetrahedron(&src, &dst, self.tol).map)
            }
        }
    }

    pub(crate) fn map(&mut self, p: &Point3<f64>) -> Result<Point3<f64>> {
        let hint = self.current.map(|(e, _)| e);
        let location = match &self.mesh {
            Mesh3Ref::Surface(m) => self.index.locate(*m, p, hint),
            Mesh3Ref::Volume(m) => self.index.locate(*m, p, hint),
        };
        match location {
            Location::Element(e) => {
                let map = match self.current {
                    Some((c, map)) if c == e => map,
                    _ => {
                        let map = self.solve(e)?;
                        self.current = Some((e, map));
                        map
                    }
                };
                Ok(map.apply(p))
            }
            Location::Nearest(n) => Ok(p + dsp3(Some(self.values), n)),
            Location::Outside => {
                Err(Error::DomainData("no element or node for vertex".to_string()))
            }
        }
    }
}

/// Transforms `vertices` in place through a 2D mesh transform.
pub fn transform_vertices_2d<V: Vertex2D>(obj: &MeshObject, vertices: &mut [V]) -> Result<()> {
    transform_vertices_2d_with(obj, vertices, &TransformConfig::default())
}

pub fn transform_vertices_2d_with<V: Vertex2D>(
    obj: &MeshObject,
    vertices: &mut [V],
    config: &TransformConfig,
) -> Result<()> {
    let mut mapper = Mapper2D::new(obj, config)?;
    for v in vertices.iter_mut() {
        *v = V::from_point(&mapper.map(&v.to_point())?);
    }
    Ok(())
}

/// Transforms `vertices` in place through a surface or tetrahedral mesh
/// transform.
pub fn transform_vertices_3d<V: Vertex3D>(obj: &MeshObject, vertices: &mut [V]) -> Result<()> {
    transform_vertices_3d_with(obj, vertices, &TransformConfig::default())
}

pub fn transform_vertices_3d_with<V: Vertex3D>(
    obj: &MeshObject,
    vertices: &mut [V],
    config: &TransformConfig,
) -> Result<()> {
    let mut mapper = Mapper3D::new(obj, config)?;
    for v in vertices.iter_mut() {
        *v = V::from_point(&mapper.map(&v.to_point())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use woolz_core::builders::{box_grid_3d, grid_2d, surface_grid};

    fn zero_2d() -> MeshObject {
        let mesh = grid_2d(1, 1, 1.0, Point2::origin()).unwrap();
        let values = IndexedValues::node_doubles(2, mesh.max_nodes()).unwrap();
        MeshObject::new(mesh, Some(values))
    }

    #[test]
    fn zero_displacement_keeps_the_centre() {
        let obj = zero_2d();
        let mut v = [Vector2::new(0.5f64, 0.5)];
        transform_vertices_2d(&obj, &mut v).unwrap();
        assert_relative_eq!(v[0], Vector2::new(0.5, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn outside_vertex_takes_nearest_node_displacement() {
        let mesh = grid_2d(1, 1, 1.0, Point2::origin()).unwrap();
        let mut values = IndexedValues::node_doubles(2, mesh.max_nodes()).unwrap();
        // Node 3 sits at (1, 1).
        values.set_f64(3, 0, 2.0);
        values.set_f64(3, 1, -1.0);
        let obj = MeshObject::new(mesh, Some(values));
        let mut v = [Vector2::new(5.0f32, 4.0)];
        transform_vertices_2d(&obj, &mut v).unwrap();
        assert_eq!(v[0], Vector2::new(7.0, 3.0));
    }

    #[test]
    fn integer_vertices_round() {
        let mesh = grid_2d(2, 2, 2.0, Point2::origin()).unwrap();
        let mut values = IndexedValues::node_doubles(2, mesh.max_nodes()).unwrap();
        for (n, p) in mesh.nodes() {
            values.set_f64(n.index(), 0, 0.25 * p.x);
        }
        let obj = MeshObject::new(mesh, Some(values));
        let mut v = [Vector2::new(2i32, 1), Vector2::new(3, 3)];
        transform_vertices_2d(&obj, &mut v).unwrap();
        assert_eq!(v, [Vector2::new(3, 1), Vector2::new(4, 3)]);
    }

    #[test]
    fn integer_z_displacement_uses_z() {
        let mesh = box_grid_3d(1, 1, 1, 2.0, Point3::origin()).unwrap();
        let mut values = IndexedValues::node_doubles(3, mesh.max_nodes()).unwrap();
        for (n, _) in mesh.nodes() {
            values.set_f64(n.index(), 1, 1.0);
            values.set_f64(n.index(), 2, 3.0);
        }
        let obj = MeshObject::new(mesh, Some(values));
        let mut v = [Vector3::new(1i32, 1, 1)];
        transform_vertices_3d(&obj, &mut v).unwrap();
        assert_eq!(v[0], Vector3::new(1, 2, 4));
    }

    #[test]
    fn surface_vertices_move_with_the_surface() {
        let mesh = surface_grid(1, 1, 2.0, Point3::new(0.0, 0.0, 1.0)).unwrap();
        let mut values = IndexedValues::node_doubles(3, mesh.max_nodes()).unwrap();
        for (n, _) in mesh.nodes() {
            values.set_f64(n.index(), 2, 0.5);
        }
        let obj = MeshObject::new(mesh, Some(values));
        let mut v = [Vector3::new(0.5f64, 0.5, 1.0)];
        transform_vertices_3d(&obj, &mut v).unwrap();
        assert_relative_eq!(v[0], Vector3::new(0.5, 0.5, 1.5), epsilon = 1e-9);
    }

    #[test]
    fn checks_before_touching_vertices() {
        let bare = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), None);
        let mut v = [Vector2::new(0.0f64, 0.0)];
        assert!(matches!(transform_vertices_2d(&bare, &mut v), Err(Error::ValuesNull)));
        let empty = MeshObject::new(
            CMesh2D::new(),
            Some(IndexedValues::node_doubles(2, 0).unwrap()),
        );
        assert!(matches!(transform_vertices_2d(&empty, &mut v), Err(Error::DomainData(_))));
        let tet = zero_2d();
        let mut w = [Vector3::new(0.0f64, 0.0, 0.0)];
        assert!(matches!(transform_vertices_3d(&tet, &mut w), Err(Error::ObjectType { .. })));
    }
}
