// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scaling of the values carried by a mesh object.

use woolz_core::mesh::MeshPoint;
use woolz_core::{
    CMesh, CMeshDomain, Error, GreyType, GreyValue, IndexedValues, MeshObject, Result, ValueAttach,
};

/// Multiplies every component of the values of live entities by `s`.
///
/// Integer stores round to nearest and clamp. RGBA values are scaled per
/// channel, alpha included. Values of deleted entities are left alone.
pub fn scale_values(mesh_obj: &mut MeshObject, s: f64) -> Result<()> {
    let live = live_entities(mesh_obj)?;
    let values = mesh_obj.values.as_mut().ok_or(Error::ValuesNull)?;
    scale_entities(values, &live, s)?;
    tracing::debug!(
        kind = %mesh_obj.mesh.kind(),
        entities = live.len(),
        scale = s,
        "Scaled mesh values"
    );
    Ok(())
}

/// A copy of `mesh_obj` with scaled values, sharing its mesh.
pub fn scaled_copy(mesh_obj: &MeshObject, s: f64) -> Result<MeshObject> {
    let mut out = mesh_obj.clone();
    scale_values(&mut out, s)?;
    Ok(out)
}

fn live_entities(mesh_obj: &MeshObject) -> Result<Vec<usize>> {
    let values = mesh_obj.values.as_ref().ok_or(Error::ValuesNull)?;
    let attach = values.attach();
    let (live, max) = match &mesh_obj.mesh {
        CMeshDomain::Mesh2D(m) => live_in(m, attach),
        CMeshDomain::Mesh2D5(m) => live_in(m, attach),
        CMeshDomain::Mesh3D(m) => live_in(m, attach),
    };
    if values.len() < max {
        return Err(Error::ValuesData(format!(
            "{} values cover {} of {} entities",
            attach.as_str(),
            values.len(),
            max
        )));
    }
    Ok(live)
}

fn live_in<P: MeshPoint, const V: usize>(
    mesh: &CMesh<P, V>,
    attach: ValueAttach,
) -> (Vec<usize>, usize) {
    match attach {
        ValueAttach::Node => (mesh.nodes().map(|(n, _)| n.index()).collect(), mesh.max_nodes()),
        ValueAttach::Element => (
            mesh.elements().map(|(e, _)| e.index()).collect(),
            mesh.max_elements(),
        ),
    }
}

fn scale_entities(values: &mut IndexedValues, live: &[usize], s: f64) -> Result<()> {
    let grey = values.grey_type();
    let tuple = values.tuple_len();
    for &i in live {
        for c in 0..tuple {
            let v = values
                .grey_value(i, c)
                .ok_or_else(|| Error::ValuesData(format!("no value for entity {}", i)))?;
            values.set_grey_value(i, c, scale_one(grey, v, s));
        }
    }
    Ok(())
}

fn scale_one(grey: GreyType, v: GreyValue, s: f64) -> GreyValue {
    match grey {
        GreyType::Rgba => GreyValue::from_channels(grey, v.channels().map(|ch| ch * s)),
        _ => GreyValue::from_f64(grey, v.to_f64() * s),
    }
}
