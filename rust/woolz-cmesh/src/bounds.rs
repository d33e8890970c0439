// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding boxes and compacted geometry of mesh transforms.

use nalgebra::{Point2, Point3, Vector2};
use woolz_core::{Aabb, CMeshDomain, Error, MeshKind, MeshObject, NodeIdx, Result};

use crate::displacement::{displacements, dsp2, dsp3};

/// Bounding box of the live nodes of a 2D mesh, at their displaced positions
/// when `displaced` is set and the mesh has values.
pub fn bounding_box_2d(mesh_obj: &MeshObject, displaced: bool) -> Result<Aabb<Point2<f64>>> {
    let CMeshDomain::Mesh2D(mesh) = &mesh_obj.mesh else {
        return Err(Error::ObjectType {
            expected: MeshKind::Mesh2D.as_str(),
            found: mesh_obj.kind().as_str(),
        });
    };
    if mesh.num_elements() == 0 {
        return Err(Error::DomainData("mesh has no elements".to_string()));
    }
    let values = displacements(mesh_obj)?.filter(|_| displaced);
    Aabb::from_points(mesh.nodes().map(|(n, p)| p + dsp2(values, n)))
        .ok_or_else(|| Error::DomainData("mesh has no nodes".to_string()))
}

/// Bounding box of the live nodes of a surface or tetrahedral mesh.
pub fn bounding_box_3d(mesh_obj: &MeshObject, displaced: bool) -> Result<Aabb<Point3<f64>>> {
    if let CMeshDomain::Mesh2D(_) = mesh_obj.mesh {
        return Err(Error::ObjectType {
            expected: "CMesh2D5 or CMesh3D",
            found: MeshKind::Mesh2D.as_str(),
        });
    }
    if mesh_obj.mesh.num_elements() == 0 {
        return Err(Error::DomainData("mesh has no elements".to_string()));
    }
    let values = displacements(mesh_obj)?.filter(|_| displaced);
    let shift = |(n, p): (NodeIdx, &Point3<f64>)| p + dsp3(values, n);
    let bbox = match &mesh_obj.mesh {
        CMeshDomain::Mesh2D5(m) => Aabb::from_points(m.nodes().map(shift)),
        CMeshDomain::Mesh3D(m) => Aabb::from_points(m.nodes().map(shift)),
        CMeshDomain::Mesh2D(_) => None,
    };
    bbox.ok_or_else(|| Error::DomainData("mesh has no nodes".to_string()))
}

/// Compacted geometry of a 2D mesh transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodesAndEdges {
    /// Live node positions in index order.
    pub nodes: Vec<Point2<f64>>,
    /// Displacement of each entry of `nodes`; zero without values.
    pub displacements: Vec<Vector2<f64>>,
    /// Element node triples as indices into `nodes`.
    pub elements: Vec<[usize; 3]>,
}

/// Live nodes, their displacements and the elements of a 2D mesh with the
/// deleted entities squeezed out.
pub fn nodes_and_edges(mesh_obj: &MeshObject) -> Result<NodesAndEdges> {
    let CMeshDomain::Mesh2D(mesh) = &mesh_obj.mesh else {
        return Err(Error::ObjectType {
            expected: MeshKind::Mesh2D.as_str(),
            found: mesh_obj.kind().as_str(),
        });
    };
    let values = displacements(mesh_obj)?;
    let mut out = NodesAndEdges::default();
    out.nodes.try_reserve_exact(mesh.num_nodes())?;
    out.displacements.try_reserve_exact(mesh.num_nodes())?;
    out.elements.try_reserve_exact(mesh.num_elements())?;

    let mut table = vec![0usize; mesh.max_nodes()];
    for (n, p) in mesh.nodes() {
        table[n.index()] = out.nodes.len();
        out.nodes.push(*p);
        out.displacements.push(dsp2(values, n));
    }
    for (_, nodes) in mesh.elements() {
        out.elements.push(nodes.map(|n| table[n.index()]));
    }
    Ok(out)
}
