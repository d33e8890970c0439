// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grey value resampling through the reverse element maps.
//!
//! Every destination pixel covered by a scan interval is pulled back into
//! the source through its element's reverse map and sampled there. Samples
//! landing on one destination pixel from several elements are averaged (or
//! voted on, for label images), and pixels that receive no sample take the
//! source background.

use nalgebra::{Point2, Point3};
use woolz_core::grey::nint;
use woolz_core::{
    DomainObject2D, DomainObject3D, ElemIdx, Error, GreyLookup, GreyType, GreyValue,
    IntervalDomain, PlaneDomain, Result, ValueTable2D, VoxelValues,
};

use crate::cache::Direction;
use crate::config::{Interpolation, Overlap};
use crate::overlap::OverlapBuffer;
use crate::workspace2d::ScanWorkspace2D;
use crate::workspace3d::ScanWorkspace3D;

/// Elements and columns of the scan intervals clipped to one grey interval.
type Hits = Vec<(ElemIdx, i32, i32)>;

fn check_interpolation(interp: Interpolation) -> Result<()> {
    match interp {
        Interpolation::Nearest | Interpolation::Linear => Ok(()),
        Interpolation::Classify => Err(Error::Unimplemented("classify interpolation")),
    }
}

fn sample_nearest(
    lookup: &GreyLookup<'_>,
    plane: i32,
    line: f64,
    kol: f64,
) -> Option<GreyValue> {
    let s = lookup.get(plane, nint(line) as i32, nint(kol) as i32);
    (!s.background).then_some(s.value)
}

/// Clamps each channel to the type's range, rounding integer types.
fn finish_channels(grey: GreyType, mut ch: [f64; 4]) -> [f64; 4] {
    let (lo, hi) = grey.range();
    for c in ch.iter_mut().take(grey.channels()) {
        let v = c.clamp(lo, hi);
        *c = if grey.is_integral() { nint(v) } else { v };
    }
    ch
}

fn weighted<const N: usize>(values: &[GreyValue; N], weights: &[f64; N]) -> [f64; 4] {
    let mut ch = [0.0; 4];
    for (v, w) in values.iter().zip(weights.iter()) {
        for (acc, c) in ch.iter_mut().zip(v.channels()) {
            *acc += c * w;
        }
    }
    ch
}

fn sample_linear_2d(lookup: &GreyLookup<'_>, p: &Point2<f64>) -> Option<[f64; 4]> {
    let (fx, fy) = (p.x.floor(), p.y.floor());
    match lookup.get_con2(fy as i32, fx as i32) {
        Some(n) => {
            let (tx, ty) = (p.x - fx, p.y - fy);
            let w = [
                (1.0 - tx) * (1.0 - ty),
                tx * (1.0 - ty),
                (1.0 - tx) * ty,
                tx * ty,
            ];
            Some(finish_channels(lookup.grey_type(), weighted(&n, &w)))
        }
        None => sample_nearest(lookup, 0, p.y, p.x).map(|v| v.channels()),
    }
}

fn sample_linear_3d(lookup: &GreyLookup<'_>, p: &Point3<f64>) -> Option<[f64; 4]> {
    let (fx, fy, fz) = (p.x.floor(), p.y.floor(), p.z.floor());
    match lookup.get_con3(fz as i32, fy as i32, fx as i32) {
        Some(n) => {
            let t = [p.x - fx, p.y - fy, p.z - fz];
            let mut w = [0.0; 8];
            for (i, wi) in w.iter_mut().enumerate() {
                let f = |bit: usize, t: f64| if bit == 1 { t } else { 1.0 - t };
                *wi = f(i & 1, t[0]) * f((i >> 1) & 1, t[1]) * f(i >> 2, t[2]);
            }
            Some(finish_channels(lookup.grey_type(), weighted(&n, &w)))
        }
        None => sample_nearest(lookup, nint(p.z) as i32, p.y, p.x).map(|v| v.channels()),
    }
}

fn clip_hits(out: &mut Hits, runs: &[crate::scan::ScanInterval], left: i32, right: i32) {
    out.clear();
    out.extend(
        runs.iter()
            .filter_map(|s| s.clip(left, right).map(|(l, r)| (s.element, l, r))),
    );
}

/// Resamples `src` over `domain`, the displaced image of the workspace mesh.
///
/// The result has the source grey type and background.
pub fn resample_2d(
    src: &DomainObject2D,
    domain: &IntervalDomain,
    ws: &mut ScanWorkspace2D<'_>,
    interp: Interpolation,
    overlap: Overlap,
) -> Result<ValueTable2D> {
    check_interpolation(interp)?;
    let lookup = GreyLookup::new_2d(src)?;
    let grey = lookup.grey_type();
    let background = lookup.background();
    let mut table = ValueTable2D::for_domain(domain, grey, background)?;
    let mut buf = OverlapBuffer::new(grey, background, domain.width())?.with_overlap(overlap);
    let mut hits = Hits::new();

    for (line, iv) in domain.intervals() {
        buf.clear(iv.width() as usize);
        clip_hits(&mut hits, ws.cover_range(line), iv.left, iv.right);
        for &(e, l, r) in &hits {
            let a = ws.element_affine(e, Direction::Reverse)?;
            for k in l..=r {
                let sp = a.apply(&Point2::new(k as f64, line as f64));
                let col = (k - iv.left) as usize;
                match interp {
                    Interpolation::Linear => {
                        if let Some(ch) = sample_linear_2d(&lookup, &sp) {
                            buf.add_channels(col, ch);
                        }
                    }
                    _ => {
                        if let Some(v) = sample_nearest(&lookup, 0, sp.y, sp.x) {
                            buf.add(col, v);
                        }
                    }
                }
            }
        }
        for k in iv.left..=iv.right {
            table.set(line, k, buf.flush((k - iv.left) as usize));
        }
    }

    let squashed = ws.squashed_count();
    if squashed > 0 {
        tracing::warn!(squashed, "Squashed elements resampled as translations");
    }
    Ok(table)
}

/// Resamples `src` over the plane domain `domain` through the reverse
/// tetrahedron maps.
pub fn resample_3d(
    src: &DomainObject3D,
    domain: &PlaneDomain,
    ws: &mut ScanWorkspace3D<'_>,
    interp: Interpolation,
    overlap: Overlap,
) -> Result<VoxelValues> {
    check_interpolation(interp)?;
    let lookup = GreyLookup::new_3d(src)?;
    let grey = lookup.grey_type();
    let background = lookup.background();
    let mut values = VoxelValues::for_domain(domain, grey, background)?;
    let width = (domain.lastkl() as i64 - domain.kol1() as i64 + 1).max(0) as usize;
    let mut buf = OverlapBuffer::new(grey, background, width)?.with_overlap(overlap);
    let mut hits = Hits::new();

    for (plane, dom) in domain.planes() {
        for (line, iv) in dom.intervals() {
            buf.clear(iv.width() as usize);
            clip_hits(&mut hits, ws.cover_range(plane, line), iv.left, iv.right);
            for &(e, l, r) in &hits {
                let a = ws.element_affine(e, Direction::Reverse)?;
                for k in l..=r {
                    let sp = a.apply(&Point3::new(k as f64, line as f64, plane as f64));
                    let col = (k - iv.left) as usize;
                    match interp {
                        Interpolation::Linear => {
                            if let Some(ch) = sample_linear_3d(&lookup, &sp) {
                                buf.add_channels(col, ch);
                            }
                        }
                        _ => {
                            let sz = nint(sp.z) as i32;
                            if let Some(v) = sample_nearest(&lookup, sz, sp.y, sp.x) {
                                buf.add(col, v);
                            }
                        }
                    }
                }
            }
            for k in iv.left..=iv.right {
                values.set(plane, line, k, buf.flush((k - iv.left) as usize));
            }
        }
    }

    let squashed = ws.squashed_count();
    if squashed > 0 {
        tracing::warn!(squashed, "Squashed tetrahedra resampled as translations");
    }
    Ok(values)
}
