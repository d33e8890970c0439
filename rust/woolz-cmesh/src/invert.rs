// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inverse and identity mesh transforms.

use rustc_hash::FxHashMap;
use woolz_core::mesh::MeshPoint;
use woolz_core::{
    CMesh, CMeshDomain, Error, GreyType, IndexedValues, MeshObject, NodeIdx, Result, ValueAttach,
};

use crate::displacement::require_displacements;

/// The inverse of a mesh transform.
///
/// The result's nodes sit at the displaced positions of the input's live
/// nodes and carry the negated displacements. Deleted nodes and elements are
/// squeezed out; element node order is kept.
pub fn invert(mesh_obj: &MeshObject) -> Result<MeshObject> {
    let values = require_displacements(mesh_obj)?;
    if mesh_obj.mesh.num_nodes() == 0 || mesh_obj.mesh.num_elements() == 0 {
        return Err(Error::DomainData(format!("cannot invert an empty {}", mesh_obj.kind())));
    }
    let dim = mesh_obj.kind().displacement_dim();
    let (mesh, values): (CMeshDomain, IndexedValues) = match &mesh_obj.mesh {
        CMeshDomain::Mesh2D(m) => {
            let (m, v) = invert_mesh(m, values, dim)?;
            (m.into(), v)
        }
        CMeshDomain::Mesh2D5(m) => {
            let (m, v) = invert_mesh(m, values, dim)?;
            (m.into(), v)
        }
        CMeshDomain::Mesh3D(m) => {
            let (m, v) = invert_mesh(m, values, dim)?;
            (m.into(), v)
        }
    };
    tracing::debug!(
        kind = %mesh_obj.kind(),
        nodes = mesh.num_nodes(),
        elements = mesh.num_elements(),
        "Inverted mesh transform"
    );
    Ok(MeshObject { mesh, values: Some(values) })
}

fn invert_mesh<P: MeshPoint, const V: usize>(
    mesh: &CMesh<P, V>,
    values: &IndexedValues,
    dim: usize,
) -> Result<(CMesh<P, V>, IndexedValues)> {
    let mut out = CMesh::<P, V>::new();
    let mut inv = IndexedValues::new(
        ValueAttach::Node,
        values.dims().to_vec(),
        GreyType::Double,
        mesh.num_nodes(),
    )?;
    let mut remap: FxHashMap<NodeIdx, NodeIdx> = FxHashMap::default();
    remap.try_reserve(mesh.num_nodes())?;

    for (n, p) in mesh.nodes() {
        let dsp = values
            .doubles(n.index())
            .ok_or_else(|| Error::ValuesData(format!("no displacement for node {}", n.index())))?;
        let mut pos = *p;
        for (c, d) in dsp.iter().take(dim).enumerate() {
            pos.set_coord(c, pos.coord(c) + d);
        }
        let m = out.add_node(pos);
        for (c, d) in dsp.iter().take(dim).enumerate() {
            inv.set_f64(m.index(), c, -d);
        }
        remap.insert(n, m);
    }
    for (e, nodes) in mesh.elements() {
        let mut mapped = [NodeIdx(0); V];
        for (dst, n) in mapped.iter_mut().zip(nodes.iter()) {
            *dst = *remap.get(n).ok_or(Error::ElementNotFound(e))?;
        }
        out.add_element(mapped)?;
    }
    Ok((out, inv))
}

/// A zero-displacement transform over the mesh of `mesh_obj`, sharing it.
pub fn identity_transform(mesh_obj: &MeshObject) -> Result<MeshObject> {
    let values =
        IndexedValues::node_doubles(mesh_obj.kind().displacement_dim(), mesh_obj.mesh.max_nodes())?;
    Ok(MeshObject {
        mesh: mesh_obj.mesh.clone(),
        values: Some(values),
    })
}
