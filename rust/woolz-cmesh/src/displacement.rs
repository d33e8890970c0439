// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation of, and access to, the node displacements of a mesh transform.

use nalgebra::{Point2, Point3, Vector2, Vector3};
use woolz_core::{Error, GreyType, IndexedValues, MeshObject, NodeIdx, Result, ValueAttach};

/// Checks that the values of `obj`, when present, can serve as node
/// displacements: node-attached, rank 1 doubles with at least the mesh
/// kind's dimension per node and a tuple for every node slot.
pub fn displacements(obj: &MeshObject) -> Result<Option<&IndexedValues>> {
    let Some(values) = obj.values.as_ref() else {
        return Ok(None);
    };
    let kind = obj.kind();
    if values.attach() != ValueAttach::Node {
        return Err(Error::ValuesData(format!(
            "{} displacements are attached to {}s",
            kind,
            values.attach().as_str()
        )));
    }
    if values.rank() != 1 || values.grey_type() != GreyType::Double {
        return Err(Error::ValuesData(format!(
            "{} displacements must be rank 1 doubles, found rank {} {}",
            kind,
            values.rank(),
            values.grey_type()
        )));
    }
    if values.dims()[0] < kind.displacement_dim() {
        return Err(Error::ValuesData(format!(
            "{} displacements need {} components, found {}",
            kind,
            kind.displacement_dim(),
            values.dims()[0]
        )));
    }
    if values.len() < obj.mesh.max_nodes() {
        return Err(Error::ValuesData(format!(
            "{} displacement values for {} node slots",
            values.len(),
            obj.mesh.max_nodes()
        )));
    }
    Ok(Some(values))
}

/// Like [`displacements`], but absent values are an error.
pub fn require_displacements(obj: &MeshObject) -> Result<&IndexedValues> {
    displacements(obj)?.ok_or(Error::ValuesNull)
}

#[inline]
pub(crate) fn dsp2(values: Option<&IndexedValues>, n: NodeIdx) -> Vector2<f64> {
    match values.and_then(|v| v.doubles(n.index())) {
        Some([x, y, ..]) => Vector2::new(*x, *y),
        _ => Vector2::zeros(),
    }
}

#[inline]
pub(crate) fn dsp3(values: Option<&IndexedValues>, n: NodeIdx) -> Vector3<f64> {
    match values.and_then(|v| v.doubles(n.index())) {
        Some([x, y, z, ..]) => Vector3::new(*x, *y, *z),
        _ => Vector3::zeros(),
    }
}

/// Source and displaced positions of an element's nodes.
pub(crate) fn element_pair_2d<const V: usize>(
    nodes: &[NodeIdx; V],
    positions: [Point2<f64>; V],
    values: Option<&IndexedValues>,
) -> ([Point2<f64>; V], [Point2<f64>; V]) {
    let mut dst = positions;
    for (p, n) in dst.iter_mut().zip(nodes.iter()) {
        *p += dsp2(values, *n);
    }
    (positions, dst)
}

pub(crate) fn element_pair_3d<const V: usize>(
    nodes: &[NodeIdx; V],
    positions: [Point3<f64>; V],
    values: Option<&IndexedValues>,
) -> ([Point3<f64>; V], [Point3<f64>; V]) {
    let mut dst = positions;
    for (p, n) in dst.iter_mut().zip(nodes.iter()) {
        *p += dsp3(values, *n);
    }
    (positions, dst)
}
