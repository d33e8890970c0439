// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Applying a mesh transform to Woolz objects.
//!
//! Domain objects are rebuilt from the displaced mesh and, when they carry
//! values, resampled through the reverse element maps. Vertex-based objects
//! (polygons, boundaries and meshes) move their vertices through the forward
//! maps.

use std::sync::Arc;

use nalgebra::Point3;
use woolz_core::mesh::MeshPoint;
use woolz_core::{
    BoundList, CMesh, CMeshDomain, DomainObject2D, DomainObject3D, Error, IntervalDomain, LineMask,
    MeshObject,
    NodeIdx, Object, PlaneDomain, PolygonDomain, PolygonVertices, Result,
};

use crate::cache::Direction;
use crate::config::{Interpolation, TransformConfig};
use crate::displacement::require_displacements;
use crate::resample::{resample_2d, resample_3d};
use crate::vertex::{Mapper2D, Mapper3D, Vertex2D};
use crate::workspace2d::ScanWorkspace2D;
use crate::workspace3d::ScanWorkspace3D;

/// Transforms `src` through the mesh transform `mesh_obj`.
///
/// The transform is validated before `src` is looked at, so a transform
/// without displacements fails even for an empty source.
pub fn transform_obj(src: &Object, mesh_obj: &MeshObject, interp: Interpolation) -> Result<Object> {
    transform_obj_with(src, mesh_obj, &TransformConfig::default().with_interpolation(interp))
}

pub fn transform_obj_with(
    src: &Object,
    mesh_obj: &MeshObject,
    config: &TransformConfig,
) -> Result<Object> {
    require_displacements(mesh_obj)?;
    tracing::debug!(
        source = src.kind_name(),
        transform = %mesh_obj.kind(),
        interpolation = %config.interpolation,
        "Transforming object"
    );
    match src {
        Object::Empty => Ok(Object::Empty),
        Object::Mesh(m) => {
            let mut out = m.clone();
            transform_mesh_in_place_with(&mut out, mesh_obj, config)?;
            Ok(Object::Mesh(out))
        }
        Object::Polygon(p) => {
            let mut mapper = Mapper2D::new(mesh_obj, config)?;
            Ok(Object::Polygon(transform_polygon(p, &mut mapper)?))
        }
        Object::Boundary(b) => {
            let mut mapper = Mapper2D::new(mesh_obj, config)?;
            Ok(Object::Boundary(transform_boundary(b, &mut mapper)?))
        }
        Object::Domain2D(d) => transform_domain_2d(d, mesh_obj, config),
        Object::Domain3D(d) => transform_domain_3d(d, mesh_obj, config),
        Object::Compound(_) => Err(Error::ObjectType {
            expected: "Empty, Domain2D, Domain3D, Polygon, Boundary or CMesh",
            found: src.kind_name(),
        }),
    }
}

/// Moves the nodes of `target` through the mesh transform `mesh_obj`.
///
/// Every node is mapped before any is written, so on error `target` is
/// unchanged. A mesh shared with other objects is copied first.
pub fn transform_mesh_in_place(target: &mut MeshObject, mesh_obj: &MeshObject) -> Result<()> {
    transform_mesh_in_place_with(target, mesh_obj, &TransformConfig::default())
}

pub fn transform_mesh_in_place_with(
    target: &mut MeshObject,
    mesh_obj: &MeshObject,
    config: &TransformConfig,
) -> Result<()> {
    if target.kind() != mesh_obj.kind() {
        return Err(Error::ObjectType {
            expected: mesh_obj.kind().as_str(),
            found: target.kind().as_str(),
        });
    }
    match &mut target.mesh {
        CMeshDomain::Mesh2D(m) => {
            let mut mapper = Mapper2D::new(mesh_obj, config)?;
            let moves = moved_nodes(m.as_ref(), |p| mapper.map(p))?;
            apply_moves(Arc::make_mut(m), moves)
        }
        CMeshDomain::Mesh2D5(m) => {
            let mut mapper = Mapper3D::new(mesh_obj, config)?;
            let moves = moved_nodes(m.as_ref(), |p| mapper.map(p))?;
            apply_moves(Arc::make_mut(m), moves)
        }
        CMeshDomain::Mesh3D(m) => {
            let mut mapper = Mapper3D::new(mesh_obj, config)?;
            let moves = moved_nodes(m.as_ref(), |p| mapper.map(p))?;
            apply_moves(Arc::make_mut(m), moves)
        }
    }
}

fn moved_nodes<P: MeshPoint, const V: usize>(
    mesh: &CMesh<P, V>,
    mut map: impl FnMut(&P) -> Result<P>,
) -> Result<Vec<(NodeIdx, P)>> {
    let mut moves = Vec::new();
    moves.try_reserve_exact(mesh.num_nodes())?;
    for (n, p) in mesh.nodes() {
        moves.push((n, map(p)?));
    }
    Ok(moves)
}

fn apply_moves<P: MeshPoint, const V: usize>(
    mesh: &mut CMesh<P, V>,
    moves: Vec<(NodeIdx, P)>,
) -> Result<()> {
    for (n, p) in moves {
        mesh.set_node(n, p)?;
    }
    Ok(())
}

fn map_vertices<V: Vertex2D>(vertices: &[V], mapper: &mut Mapper2D<'_>) -> Result<Vec<V>> {
    let mut out = Vec::new();
    out.try_reserve_exact(vertices.len())?;
    for v in vertices {
        out.push(V::from_point(&mapper.map(&v.to_point())?));
    }
    Ok(out)
}

fn transform_polygon(poly: &PolygonDomain, mapper: &mut Mapper2D<'_>) -> Result<PolygonDomain> {
    let vertices = match &poly.vertices {
        PolygonVertices::Int(v) => PolygonVertices::Int(map_vertices(v, mapper)?),
        PolygonVertices::Float(v) => PolygonVertices::Float(map_vertices(v, mapper)?),
        PolygonVertices::Double(v) => PolygonVertices::Double(map_vertices(v, mapper)?),
    };
    Ok(PolygonDomain::new(vertices))
}

fn transform_boundary(bound: &BoundList, mapper: &mut Mapper2D<'_>) -> Result<BoundList> {
    let poly = transform_polygon(&bound.poly.to_8_connected(bound.wrap), mapper)?;
    let mut out = BoundList::new(bound.kind, bound.wrap, poly);
    if let Some(next) = &bound.next {
        out.next = Some(Box::new(transform_boundary(next, mapper)?));
    }
    if let Some(down) = &bound.down {
        out.down = Some(Box::new(transform_boundary(down, mapper)?));
    }
    Ok(out)
}

fn transform_domain_2d(
    src: &DomainObject2D,
    mesh_obj: &MeshObject,
    config: &TransformConfig,
) -> Result<Object> {
    let mut ws = ScanWorkspace2D::new(mesh_obj, true, config)?;
    if ws.intervals().is_empty() {
        return Ok(Object::Empty);
    }
    let domain = ws.to_interval_domain()?;
    let values = match src.values {
        Some(_) => Some(resample_2d(
            src,
            &domain,
            &mut ws,
            config.interpolation,
            config.overlap,
        )?),
        None => None,
    };
    Ok(Object::Domain2D(DomainObject2D::new(domain, values)))
}

/// The displaced-mesh voxels whose floored source position lies inside
/// `src`.
fn restricted_plane_domain(ws: &mut ScanWorkspace3D<'_>, src: &PlaneDomain) -> Result<PlaneDomain> {
    let bbox = ws.bbox();
    let mut out = PlaneDomain::new(
        bbox.min[2],
        bbox.max[2],
        bbox.min[1],
        bbox.max[1],
        bbox.min[0],
        bbox.max[0],
    )?;
    let mut mask = LineMask::new(bbox.min[0], bbox.max[0]);
    let mut plane_dom: Option<(i32, IntervalDomain)> = None;
    let count = ws.intervals().len();

    for i in 0..count {
        let iv = ws.intervals()[i];
        let a = ws.element_affine(iv.element, Direction::Reverse)?;
        for k in iv.left..=iv.right {
            let sp = a.apply(&Point3::new(k as f64, iv.line as f64, iv.plane as f64));
            if src.is_inside(sp.z.floor() as i32, sp.y.floor() as i32, sp.x.floor() as i32) {
                mask.set(k);
            }
        }
        let next = ws.intervals().get(i + 1).map(|n| (n.plane, n.line));
        if next == Some((iv.plane, iv.line)) {
            continue;
        }
        if !mask.is_empty() {
            if !matches!(plane_dom, Some((p, _)) if p == iv.plane) {
                if let Some((p, dom)) = plane_dom.take() {
                    out.set_plane(p, dom)?;
                }
                let dom = IntervalDomain::new(bbox.min[1], bbox.max[1], bbox.min[0], bbox.max[0])?;
                plane_dom = Some((iv.plane, dom));
            }
            if let Some((_, dom)) = plane_dom.as_mut() {
                dom.push_mask(iv.line, &mask)?;
            }
            mask.clear();
        }
    }
    if let Some((p, dom)) = plane_dom.take() {
        out.set_plane(p, dom)?;
    }
    out.standardize();
    out.voxel_size = src.voxel_size;
    Ok(out)
}

fn transform_domain_3d(
    src: &DomainObject3D,
    mesh_obj: &MeshObject,
    config: &TransformConfig,
) -> Result<Object> {
    let mut ws = ScanWorkspace3D::new(mesh_obj, true, config)?;
    if ws.intervals().is_empty() {
        return Ok(Object::Empty);
    }
    let domain = restricted_plane_domain(&mut ws, &src.domain)?;
    if domain.is_empty() {
        return Ok(Object::Empty);
    }
    let values = match src.values {
        Some(_) => Some(resample_3d(
            src,
            &domain,
            &mut ws,
            config.interpolation,
            config.overlap,
        )?),
        None => None,
    };
    Ok(Object::Domain3D(DomainObject3D::new(domain, values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use woolz_core::builders::{box_grid_3d, grid_2d, surface_grid};
    use woolz_core::{
        BoundKind, GreyType, GreyValue, IndexedValues, Point2, ValueTable2D, Vector2, VoxelValues,
    };

    fn shift_2d(n: usize, spacing: f64, dx: f64, dy: f64) -> MeshObject {
        let mesh = grid_2d(n, n, spacing, Point2::origin()).unwrap();
        let mut v = IndexedValues::node_doubles(2, mesh.max_nodes()).unwrap();
        for (i, _) in mesh.nodes() {
            v.set_f64(i.index(), 0, dx);
            v.set_f64(i.index(), 1, dy);
        }
        MeshObject::new(mesh, Some(v))
    }

    fn shift_3d(n: usize, d: [f64; 3]) -> MeshObject {
        let mesh = box_grid_3d(n, n, n, 1.0, Point3::origin()).unwrap();
        let mut v = IndexedValues::node_doubles(3, mesh.max_nodes()).unwrap();
        for (i, _) in mesh.nodes() {
            for (c, dc) in d.iter().enumerate() {
                v.set_f64(i.index(), c, *dc);
            }
        }
        MeshObject::new(mesh, Some(v))
    }

    #[test]
    fn empty_maps_to_empty_but_transform_is_checked() {
        let tr = shift_2d(1, 1.0, 0.0, 0.0);
        assert!(transform_obj(&Object::Empty, &tr, Interpolation::Nearest).unwrap().is_empty());
        let bare = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), None);
        assert!(matches!(
            transform_obj(&Object::Empty, &bare, Interpolation::Nearest),
            Err(Error::ValuesNull)
        ));
    }

    #[test]
    fn polygon_keeps_vertex_type() {
        let tr = shift_2d(4, 1.0, 1.0, 2.0);
        let poly = PolygonDomain::new(PolygonVertices::Float(vec![
            Vector2::new(0.5, 0.5),
            Vector2::new(3.0, 1.0),
        ]));
        let out = transform_obj(&Object::Polygon(poly), &tr, Interpolation::Nearest).unwrap();
        let Object::Polygon(out) = out else {
            panic!("expected a polygon");
        };
        assert_eq!(
            out.vertices,
            PolygonVertices::Float(vec![Vector2::new(1.5, 2.5), Vector2::new(4.0, 3.0)])
        );
    }

    #[test]
    fn boundary_is_made_8_connected_then_moved() {
        let tr = shift_2d(4, 1.0, 1.0, 0.0);
        let square =
            PolygonVertices::Int(vec![Vector2::new(0, 0), Vector2::new(2, 0), Vector2::new(2, 2)]);
        let mut b = BoundList::new(BoundKind::Piece, true, PolygonDomain::new(square.clone()));
        b.down = Some(Box::new(BoundList::new(BoundKind::Hole, false, PolygonDomain::new(square))));
        let out = transform_obj(&Object::Boundary(b), &tr, Interpolation::Nearest).unwrap();
        let Object::Boundary(out) = out else {
            panic!("expected a boundary");
        };
        assert_eq!(out.count(), 2);
        let PolygonVertices::Int(v) = &out.poly.vertices else {
            panic!("expected integer vertices");
        };
        assert_eq!(v.first(), Some(&Vector2::new(1, 0)));
        assert_eq!(v.len(), 7);
        let down = out.down.as_ref().unwrap();
        assert_eq!(down.kind, BoundKind::Hole);
        assert_eq!(down.poly.vertices.len(), 5);
    }

    #[test]
    fn mesh_copy_moves_nodes_only() {
        let tr = shift_2d(2, 2.0, 0.5, -0.5);
        let src = MeshObject::new(grid_2d(1, 1, 1.0, Point2::new(1.0, 1.0)).unwrap(), None);
        let out = transform_obj(&Object::Mesh(src.clone()), &tr, Interpolation::Nearest).unwrap();
        let Object::Mesh(out) = out else {
            panic!("expected a mesh");
        };
        let (CMeshDomain::Mesh2D(a), CMeshDomain::Mesh2D(b)) = (&src.mesh, &out.mesh) else {
            panic!("expected 2D meshes");
        };
        assert_eq!(a.num_elements(), b.num_elements());
        for ((_, p), (_, q)) in a.nodes().zip(b.nodes()) {
            assert_relative_eq!(*q, p + Vector2::new(0.5, -0.5), epsilon = 1e-12);
        }
        let tet = shift_3d(1, [0.0; 3]);
        assert!(matches!(
            transform_obj(&Object::Mesh(src), &tet, Interpolation::Nearest),
            Err(Error::ObjectType { .. })
        ));
    }

    #[test]
    fn in_place_copies_a_shared_mesh() {
        let tr = shift_3d(2, [0.0, 0.0, 1.0]);
        let src = MeshObject::new(box_grid_3d(1, 1, 1, 1.0, Point3::origin()).unwrap(), None);
        let mut target = src.clone();
        transform_mesh_in_place(&mut target, &tr).unwrap();
        let (CMeshDomain::Mesh3D(a), CMeshDomain::Mesh3D(b)) = (&src.mesh, &target.mesh) else {
            panic!("expected 3D meshes");
        };
        assert!(!Arc::ptr_eq(a, b));
        assert_eq!(a.node(NodeIdx(7)), Some(&Point3::new(1.0, 1.0, 1.0)));
        assert_relative_eq!(
            *b.node(NodeIdx(7)).unwrap(),
            Point3::new(1.0, 1.0, 2.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn surface_mesh_follows_surface_transform() {
        let mesh = surface_grid(2, 2, 1.0, Point3::origin()).unwrap();
        let mut v = IndexedValues::node_doubles(3, mesh.max_nodes()).unwrap();
        for (i, _) in mesh.nodes() {
            v.set_f64(i.index(), 2, 2.0);
        }
        let tr = MeshObject::new(mesh, Some(v));
        let src = MeshObject::new(surface_grid(1, 1, 1.0, Point3::origin()).unwrap(), None);
        let out = transform_obj(&Object::Mesh(src), &tr, Interpolation::Nearest).unwrap();
        let Object::Mesh(out) = out else {
            panic!("expected a mesh");
        };
        let CMeshDomain::Mesh2D5(m) = &out.mesh else {
            panic!("expected a surface mesh");
        };
        assert!(m.nodes().all(|(_, p)| (p.z - 2.0).abs() < 1e-9));
    }

    #[test]
    fn domain_2d_values_follow_translation() {
        let domain = IntervalDomain::rect(0, 4, 0, 4).unwrap();
        let mut t =
            ValueTable2D::for_domain(&domain, GreyType::UByte, GreyValue::UByte(0)).unwrap();
        for l in 0..=4 {
            for k in 0..=4 {
                t.set_f64(l, k, (10 * l + k) as f64);
            }
        }
        let src = Object::Domain2D(DomainObject2D::new(domain, Some(t)));
        let tr = shift_2d(4, 1.0, 0.0, 2.0);
        let Object::Domain2D(out) = transform_obj(&src, &tr, Interpolation::Nearest).unwrap() else {
            panic!("expected a 2D domain");
        };
        assert_eq!((out.domain.line1(), out.domain.lastln()), (2, 6));
        let v = out.values.unwrap();
        assert_eq!(v.grey_type(), GreyType::UByte);
        assert_eq!(v.get(5, 3), Some(GreyValue::UByte(33)));
    }

    #[test]
    fn domain_2d_without_values_is_the_displaced_mesh_domain() {
        let src = Object::Domain2D(DomainObject2D::new(
            IntervalDomain::rect(0, 1, 0, 1).unwrap(),
            None,
        ));
        let tr = shift_2d(1, 1.0, 5.0, 0.0);
        let Object::Domain2D(out) = transform_obj(&src, &tr, Interpolation::Linear).unwrap() else {
            panic!("expected a 2D domain");
        };
        assert!(out.values.is_none());
        assert_eq!((out.domain.kol1(), out.domain.lastkl(), out.domain.area()), (5, 6, 4));
    }

    #[test]
    fn domain_3d_is_restricted_to_the_source() {
        let mut domain = PlaneDomain::cuboid(0, 3, 0, 3, 0, 3).unwrap();
        domain.voxel_size = [1.0, 1.0, 2.5];
        let mut vox = VoxelValues::for_domain(&domain, GreyType::Int, GreyValue::Int(0)).unwrap();
        for p in 0..=3 {
            for l in 0..=3 {
                for k in 0..=3 {
                    vox.set(p, l, k, GreyValue::Int(100 * p + 10 * l + k));
                }
            }
        }
        let src = Object::Domain3D(DomainObject3D::new(domain, Some(vox)));
        let tr = shift_3d(3, [1.0, 0.0, 0.0]);
        let Object::Domain3D(out) = transform_obj(&src, &tr, Interpolation::Nearest).unwrap() else {
            panic!("expected a 3D domain");
        };
        assert_eq!(out.domain.volume(), 64);
        assert_eq!((out.domain.kol1(), out.domain.lastkl()), (1, 4));
        assert_eq!(out.domain.voxel_size, [1.0, 1.0, 2.5]);
        let v = out.values.unwrap();
        assert_eq!(v.get(2, 1, 3), Some(GreyValue::Int(212)));

        // A source covering only the first plane keeps only that plane.
        let thin = Object::Domain3D(DomainObject3D::new(
            PlaneDomain::cuboid(0, 0, 0, 3, 0, 3).unwrap(),
            None,
        ));
        let out = transform_obj(&thin, &tr, Interpolation::Nearest).unwrap();
        let Object::Domain3D(out) = out else {
            panic!("expected a 3D domain");
        };
        assert_eq!((out.domain.plane1(), out.domain.lastpl()), (0, 0));
        assert_eq!(out.domain.volume(), 16);
    }

    #[test]
    fn compound_is_not_transformed() {
        let tr = shift_2d(1, 1.0, 0.0, 0.0);
        assert!(matches!(
            transform_obj(&Object::Compound(vec![]), &tr, Interpolation::Nearest),
            Err(Error::ObjectType { .. })
        ));
    }
}
