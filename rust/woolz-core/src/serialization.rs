// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for mesh objects.
//!
//! Snapshots keep every slot of the node and element tables, with `null` for
//! tombstones, so entity indices and the flat indexed-value store survive a
//! round trip unchanged. The value store carries its grey-type tag.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{MeshKind, NodeIdx};
use crate::mesh::{CMesh, Element, MeshPoint, Node};
use crate::object::{CMeshDomain, MeshObject};
use crate::values::IndexedValues;

/// Serializable representation of a mesh object.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub kind: MeshKind,
    pub nodes: Vec<Option<Vec<f64>>>,
    pub elements: Vec<Option<Vec<usize>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<IndexedValues>,
}

fn snapshot_tables<P: MeshPoint, const V: usize>(
    mesh: &CMesh<P, V>,
) -> (Vec<Option<Vec<f64>>>, Vec<Option<Vec<usize>>>) {
    let nodes = mesh
        .node_table()
        .slots()
        .map(|s| s.map(|n| (0..P::DIM).map(|a| n.pos.coord(a)).collect()))
        .collect();
    let elements = mesh
        .element_table()
        .slots()
        .map(|s| s.map(|e| e.nodes.iter().map(|n| n.0).collect()))
        .collect();
    (nodes, elements)
}

fn restore_mesh<P: MeshPoint, const V: usize>(
    snap: &MeshSnapshot,
    make: impl Fn(&[f64]) -> Option<P>,
) -> Result<CMesh<P, V>> {
    let nodes = snap
        .nodes
        .iter()
        .enumerate()
        .map(|(i, s)| match s {
            Some(c) => make(c)
                .map(|pos| Some(Node { pos }))
                .ok_or_else(|| {
                    Error::Serialization(format!("node {} has {} coordinates", i, c.len()))
                }),
            None => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;
    let elements = snap
        .elements
        .iter()
        .enumerate()
        .map(|(i, s)| match s {
            Some(ids) => {
                let ids: Vec<NodeIdx> = ids.iter().map(|&n| NodeIdx(n)).collect();
                <[NodeIdx; V]>::try_from(ids)
                    .map(|nodes| Some(Element { nodes }))
                    .map_err(|v| {
                        Error::Serialization(format!("element {} has {} nodes", i, v.len()))
                    })
            }
            None => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;
    CMesh::from_tables(nodes.into_iter().collect(), elements.into_iter().collect())
}

impl MeshSnapshot {
    pub fn from_object(obj: &MeshObject) -> Self {
        let (nodes, elements) = match &obj.mesh {
            CMeshDomain::Mesh2D(m) => snapshot_tables(m.as_ref()),
            CMeshDomain::Mesh2D5(m) => snapshot_tables(m.as_ref()),
            CMeshDomain::Mesh3D(m) => snapshot_tables(m.as_ref()),
        };
        Self {
            kind: obj.kind(),
            nodes,
            elements,
            values: obj.values.clone(),
        }
    }

    pub fn to_object(&self) -> Result<MeshObject> {
        let p2 = |c: &[f64]| match c {
            [x, y] => Some(Point2::new(*x, *y)),
            _ => None,
        };
        let p3 = |c: &[f64]| match c {
            [x, y, z] => Some(Point3::new(*x, *y, *z)),
            _ => None,
        };
        let mesh = match self.kind {
            MeshKind::Mesh2D => CMeshDomain::from(restore_mesh::<_, 3>(self, p2)?),
            MeshKind::Mesh2D5 => CMeshDomain::from(restore_mesh::<_, 3>(self, p3)?),
            MeshKind::Mesh3D => CMeshDomain::from(restore_mesh::<_, 4>(self, p3)?),
        };
        Ok(MeshObject {
            mesh,
            values: self.values.clone(),
        })
    }
}

impl MeshObject {
    /// Serializes the mesh object to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&MeshSnapshot::from_object(self))?)
    }

    /// Restores a mesh object from JSON produced by [`MeshObject::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        let snap: MeshSnapshot = serde_json::from_str(json)?;
        snap.to_object()
    }
}
