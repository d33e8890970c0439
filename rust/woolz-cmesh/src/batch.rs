// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transforming many domains with one pass of a mesh transform.
//!
//! The domains are packed into a single `Int` valued index object whose
//! value at a pixel is one plus the position of the domain covering it. The
//! index object is transformed with nearest interpolation and majority
//! voting, so every output pixel carries an index that was sampled there, and
//! then split back into one domain per index. Where domains overlap the later
//! one wins.

use rayon::prelude::*;
use woolz_core::{
    DomainObject2D, DomainObject3D, Error, GreyType, GreyValue, IntervalDomain, LineMask,
    MeshObject, Object, PlaneDomain, Result, ValueTable2D, VoxelValues,
};

use crate::config::{Interpolation, Overlap, TransformConfig};
use crate::transform::transform_obj_with;

/// Transforms each domain of `objects` through `mesh_obj`.
///
/// Entries may be `Empty`, or all 2D or all 3D domain objects; values are
/// ignored. The result has one entry per input, `Empty` where nothing of that
/// domain survives.
pub fn transform_many(objects: &[Object], mesh_obj: &MeshObject) -> Result<Vec<Object>> {
    transform_many_with(objects, mesh_obj, &TransformConfig::default())
}

pub fn transform_many_with(
    objects: &[Object],
    mesh_obj: &MeshObject,
    config: &TransformConfig,
) -> Result<Vec<Object>> {
    if objects.is_empty() {
        return Err(Error::ObjectType {
            expected: "at least one domain object",
            found: "Compound",
        });
    }
    let count = objects.len();
    if i32::try_from(count).is_err() {
        return Err(Error::ParamData(format!("{} objects exceed the index range", count)));
    }
    let is_3d = objects.iter().any(|o| matches!(o, Object::Domain3D(_)));
    for o in objects {
        match (o, is_3d) {
            (Object::Empty, _) | (Object::Domain2D(_), false) | (Object::Domain3D(_), true) => {}
            _ => {
                return Err(Error::ObjectType {
                    expected: "Empty and domain objects of one dimension",
                    found: o.kind_name(),
                })
            }
        }
    }

    let index = if is_3d { pack_3d(objects)? } else { pack_2d(objects)? };
    let Some(index) = index else {
        return Ok(vec![Object::Empty; count]);
    };
    let config = config
        .with_interpolation(Interpolation::Nearest)
        .with_overlap(Overlap::Majority);
    let moved = transform_obj_with(&index, mesh_obj, &config)?;
    tracing::debug!(
        objects = count,
        dimension = if is_3d { 3 } else { 2 },
        "Transformed index object"
    );

    match moved {
        Object::Domain2D(d) => {
            let Some(table) = d.values.as_ref() else {
                return Ok(vec![Object::Empty; count]);
            };
            (1..=count as i32)
                .into_par_iter()
                .map(|idx| unpack_2d(&d.domain, table, idx))
                .collect()
        }
        Object::Domain3D(d) => {
            let Some(vox) = d.values.as_ref() else {
                return Ok(vec![Object::Empty; count]);
            };
            (1..=count as i32)
                .into_par_iter()
                .map(|idx| unpack_3d(&d.domain, vox, idx))
                .collect()
        }
        _ => Ok(vec![Object::Empty; count]),
    }
}

fn index_value(i: usize) -> GreyValue {
    GreyValue::Int(i as i32 + 1)
}

fn warn_overwrites(overwritten: u64) {
    if overwritten > 0 {
        tracing::warn!(overwritten, "Overlapping domains, later entries win");
    }
}

/// Union of the interval domains on every line of `line1..=lastln`.
fn union_domain(
    domains: &[&IntervalDomain],
    (line1, lastln, kol1, lastkl): (i32, i32, i32, i32),
) -> Result<IntervalDomain> {
    let mut out = IntervalDomain::new(line1, lastln, kol1, lastkl)?;
    let mut mask = LineMask::new(kol1, lastkl);
    for line in line1..=lastln {
        mask.clear();
        for d in domains {
            for iv in d.line(line) {
                mask.set_run(iv.left, iv.right);
            }
        }
        out.push_mask(line, &mask)?;
    }
    Ok(out)
}

fn bounds_2d<'a>(
    domains: impl Iterator<Item = &'a IntervalDomain>,
) -> Option<(i32, i32, i32, i32)> {
    domains.filter(|d| !d.is_empty()).fold(None, |acc, d| {
        let b = (d.line1(), d.lastln(), d.kol1(), d.lastkl());
        Some(match acc {
            None => b,
            Some(a) => (a.0.min(b.0), a.1.max(b.1), a.2.min(b.2), a.3.max(b.3)),
        })
    })
}

fn pack_2d(objects: &[Object]) -> Result<Option<Object>> {
    let domains: Vec<(usize, &IntervalDomain)> = objects
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.as_domain_2d().map(|d| (i, d.domain.as_ref())))
        .collect();
    let Some(bounds) = bounds_2d(domains.iter().map(|(_, d)| *d)) else {
        return Ok(None);
    };
    let refs: Vec<&IntervalDomain> = domains.iter().map(|(_, d)| *d).collect();
    let domain = union_domain(&refs, bounds)?;
    let background = GreyValue::Int(0);
    let mut table = ValueTable2D::for_domain(&domain, GreyType::Int, background)?;
    let mut overwritten = 0u64;
    for &(i, d) in &domains {
        for (line, iv) in d.intervals() {
            for k in iv.left..=iv.right {
                if table.get(line, k) != Some(background) {
                    overwritten += 1;
                }
                table.set(line, k, index_value(i));
            }
        }
    }
    warn_overwrites(overwritten);
    Ok(Some(Object::Domain2D(DomainObject2D::new(domain, Some(table)))))
}

fn pack_3d(objects: &[Object]) -> Result<Option<Object>> {
    let domains: Vec<(usize, &PlaneDomain)> = objects
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.as_domain_3d().map(|d| (i, d.domain.as_ref())))
        .filter(|(_, d)| !d.is_empty())
        .collect();
    let Some(&(_, first)) = domains.first() else {
        return Ok(None);
    };
    let (plane1, lastpl) = domains
        .iter()
        .fold((i32::MAX, i32::MIN), |(a, b), (_, d)| (a.min(d.plane1()), b.max(d.lastpl())));
    let layers = domains.iter().flat_map(|&(_, d)| d.planes().map(|(_, p)| p));
    let Some(bounds) = bounds_2d(layers) else {
        return Ok(None);
    };
    let (line1, lastln, kol1, lastkl) = bounds;

    let mut domain = PlaneDomain::new(plane1, lastpl, line1, lastln, kol1, lastkl)?;
    domain.voxel_size = first.voxel_size;
    for p in plane1..=lastpl {
        let layer: Vec<&IntervalDomain> = domains.iter().filter_map(|(_, d)| d.plane(p)).collect();
        if layer.is_empty() {
            continue;
        }
        domain.set_plane(p, union_domain(&layer, bounds)?)?;
    }

    let background = GreyValue::Int(0);
    let mut vox = VoxelValues::for_domain(&domain, GreyType::Int, background)?;
    let mut overwritten = 0u64;
    for &(i, d) in &domains {
        for (p, dom) in d.planes() {
            for (line, iv) in dom.intervals() {
                for k in iv.left..=iv.right {
                    if vox.get(p, line, k) != Some(background) {
                        overwritten += 1;
                    }
                    vox.set(p, line, k, index_value(i));
                }
            }
        }
    }
    warn_overwrites(overwritten);
    Ok(Some(Object::Domain3D(DomainObject3D::new(domain, Some(vox)))))
}

/// Pixels of `domain` whose index value is `idx`, as a standardized domain.
fn select_2d(domain: &IntervalDomain, table: &ValueTable2D, idx: i32) -> Result<IntervalDomain> {
    let want = GreyValue::Int(idx);
    let mut out =
        IntervalDomain::new(domain.line1(), domain.lastln(), domain.kol1(), domain.lastkl())?;
    let mut mask = LineMask::new(domain.kol1(), domain.lastkl());
    for (line, runs) in domain.lines() {
        mask.clear();
        for iv in runs {
            for k in iv.left..=iv.right {
                if table.get(line, k) == Some(want) {
                    mask.set(k);
                }
            }
        }
        out.push_mask(line, &mask)?;
    }
    out.standardize();
    Ok(out)
}

fn unpack_2d(domain: &IntervalDomain, table: &ValueTable2D, idx: i32) -> Result<Object> {
    let out = select_2d(domain, table, idx)?;
    if out.is_empty() {
        return Ok(Object::Empty);
    }
    Ok(Object::Domain2D(DomainObject2D::new(out, None)))
}

fn unpack_3d(domain: &PlaneDomain, vox: &VoxelValues, idx: i32) -> Result<Object> {
    let mut out = PlaneDomain::new(
        domain.plane1(),
        domain.lastpl(),
        domain.line1(),
        domain.lastln(),
        domain.kol1(),
        domain.lastkl(),
    )?;
    out.voxel_size = domain.voxel_size;
    for (p, dom) in domain.planes() {
        let Some(table) = vox.plane(p) else {
            continue;
        };
        let sel = select_2d(dom, table, idx)?;
        if !sel.is_empty() {
            out.set_plane(p, sel)?;
        }
    }
    out.standardize();
    if out.is_empty() {
        return Ok(Object::Empty);
    }
    Ok(Object::Domain3D(DomainObject3D::new(out, None)))
}
