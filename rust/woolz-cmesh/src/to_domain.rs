// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster domains covered by meshes, and values interpolated from meshes.

use nalgebra::{Point2, Point3};
use woolz_core::geometry::{barycentric_2d, barycentric_3d};
use woolz_core::{
    CMesh2D, CMesh3D, CMeshDomain, DomainObject2D, DomainObject3D, Error, GreyType, GreyValue,
    IndexedValues, IntervalDomain, Location, MeshIndex, MeshObject, NodeIdx, Object, PlaneDomain,
    Result, ValueAttach, ValueTable2D, VoxelValues,
};

use crate::config::{Interpolation, TransformConfig};
use crate::workspace2d::ScanWorkspace2D;
use crate::workspace3d::ScanWorkspace3D;

/// Builds the domain covered by a mesh, displaced when `displaced` is set
/// and scaled about the origin by `scale`.
pub fn to_domain(obj: &MeshObject, displaced: bool, scale: f64) -> Result<Object> {
    to_domain_with(obj, displaced, scale, &TransformConfig::default())
}

pub fn to_domain_with(
    obj: &MeshObject,
    displaced: bool,
    scale: f64,
    config: &TransformConfig,
) -> Result<Object> {
    if !scale.is_finite() || scale.abs() < config.scale_epsilon {
        return Err(Error::ParamData(format!("scale {} is too small", scale)));
    }
    if matches!(obj.mesh, CMeshDomain::Mesh2D5(_)) {
        return Err(Error::DomainType("surface meshes have no raster domain"));
    }
    if displaced && obj.values.is_none() {
        return Err(Error::ValuesNull);
    }
    if obj.mesh.num_elements() == 0 {
        return Ok(Object::Empty);
    }
    let rescale = (scale - 1.0).abs() > config.scale_epsilon;
    match &obj.mesh {
        CMeshDomain::Mesh3D(_) => {
            let ws = ScanWorkspace3D::new(obj, displaced, config)?;
            let mut domain = ws.to_plane_domain()?;
            if rescale {
                domain = domain.scaled(scale)?;
            }
            Ok(Object::Domain3D(DomainObject3D::new(domain, None)))
        }
        _ => {
            let ws = ScanWorkspace2D::new(obj, displaced, config)?;
            let mut domain = ws.to_interval_domain()?;
            if rescale {
                domain = domain.scaled(scale)?;
            }
            Ok(Object::Domain2D(DomainObject2D::new(domain, None)))
        }
    }
}

/// Checks a mesh value store usable as a scalar field: node attached, a
/// tuple for every node slot, and a scalar grey type.
fn field_values(mesh_obj: &MeshObject) -> Result<&IndexedValues> {
    let values = mesh_obj.values.as_ref().ok_or(Error::ValuesNull)?;
    if values.attach() != ValueAttach::Node {
        return Err(Error::ValuesData(format!(
            "interpolation needs node values, found {} values",
            values.attach().as_str()
        )));
    }
    if values.len() < mesh_obj.mesh.max_nodes() {
        return Err(Error::ValuesData(format!(
            "{} values for {} node slots",
            values.len(),
            mesh_obj.mesh.max_nodes()
        )));
    }
    if values.grey_type() == GreyType::Rgba {
        return Err(Error::GreyType(GreyType::Rgba));
    }
    Ok(values)
}

fn node_value(values: &IndexedValues, n: NodeIdx) -> f64 {
    values.value_f64(n.index(), 0).unwrap_or(0.0)
}

/// New values over the domain of `dom_obj` interpolated from the node values
/// of `mesh_obj`.
///
/// Pixels inside an element take the barycentric blend of its node values;
/// pixels outside the mesh take the value of the nearest node. Only linear
/// interpolation is supported. The background is zero of the value type.
pub fn to_domain_values(
    dom_obj: &Object,
    mesh_obj: &MeshObject,
    interp: Interpolation,
) -> Result<Object> {
    let values = field_values(mesh_obj)?;
    if interp != Interpolation::Linear {
        return Err(Error::ParamType(format!("{} interpolation of mesh values", interp)));
    }
    let grey = values.grey_type();
    let background = GreyValue::zero(grey);
    match (dom_obj, &mesh_obj.mesh) {
        (Object::Domain2D(d), CMeshDomain::Mesh2D(mesh)) => {
            let table = interpolate_2d(&d.domain, mesh, values, grey, background)?;
            Ok(Object::Domain2D(DomainObject2D {
                domain: d.domain.clone(),
                values: Some(table),
            }))
        }
        (Object::Domain3D(d), CMeshDomain::Mesh3D(mesh)) => {
            let vox = interpolate_3d(&d.domain, mesh, values, grey, background)?;
            Ok(Object::Domain3D(DomainObject3D {
                domain: d.domain.clone(),
                values: Some(vox),
            }))
        }
        (other, mesh) => Err(Error::ObjectType {
            expected: "Domain2D with CMesh2D or Domain3D with CMesh3D",
            found: if matches!(other, Object::Domain2D(_) | Object::Domain3D(_)) {
                mesh.kind().as_str()
            } else {
                other.kind_name()
            },
        }),
    }
}

fn interpolate_2d(
    domain: &IntervalDomain,
    mesh: &CMesh2D,
    values: &IndexedValues,
    grey: GreyType,
    background: GreyValue,
) -> Result<ValueTable2D> {
    let mut table = ValueTable2D::for_domain(domain, grey, background)?;
    let index = MeshIndex::new(mesh)?;
    let mut hint = None;
    for (line, iv) in domain.intervals() {
        for k in iv.left..=iv.right {
            let pos = Point2::new(k as f64, line as f64);
            let v = match index.locate(mesh, &pos, hint) {
                Location::Element(e) => {
                    hint = Some(e);
                    let (Some(nodes), Some(tri)) = (mesh.element(e), mesh.element_positions(e))
                    else {
                        continue;
                    };
                    let Some(l) = barycentric_2d(&tri, &pos) else {
                        continue;
                    };
                    nodes
                        .iter()
                        .zip(l.iter())
                        .map(|(n, w)| w * node_value(values, *n))
                        .sum::<f64>()
                }
                Location::Nearest(n) => node_value(values, n),
                Location::Outside => continue,
            };
            table.set(line, k, GreyValue::from_f64(grey, v));
        }
    }
    Ok(table)
}

fn interpolate_3d(
    domain: &PlaneDomain,
    mesh: &CMesh3D,
    values: &IndexedValues,
    grey: GreyType,
    background: GreyValue,
) -> Result<VoxelValues> {
    let mut vox = VoxelValues::for_domain(domain, grey, background)?;
    let index = MeshIndex::new(mesh)?;
    let mut hint = None;
    for (plane, dom) in domain.planes() {
        for (line, iv) in dom.intervals() {
            for k in iv.left..=iv.right {
                let pos = Point3::new(k as f64, line as f64, plane as f64);
                let v = match index.locate(mesh, &pos, hint) {
                    Location::Element(e) => {
                        hint = Some(e);
                        let (Some(nodes), Some(tet)) = (mesh.element(e), mesh.element_positions(e))
                        else {
                            continue;
                        };
                        let Some(l) = barycentric_3d(&tet, &pos) else {
                            continue;
                        };
                        nodes
                            .iter()
                            .zip(l.iter())
                            .map(|(n, w)| w * node_value(values, *n))
                            .sum::<f64>()
                    }
                    Location::Nearest(n) => node_value(values, n),
                    Location::Outside => continue,
                };
                vox.set(plane, line, k, GreyValue::from_f64(grey, v));
            }
        }
    }
    Ok(vox)
}
