// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan workspace for 2D triangle meshes.

use woolz_core::{
    CMesh2D, CMeshDomain, ElemIdx, Error, IndexedValues, IntervalDomain, LineMask, MeshKind,
    MeshObject, Result,
};

use crate::affine::{solve_triangle, Affine2D, Solved};
use crate::cache::{Direction, ScanElement};
use crate::config::TransformConfig;
use crate::displacement::{displacements, element_pair_2d};
use crate::scan::{cmp_scan_2d, disjoin, scan_triangle, squeeze, union_area, ScanInterval};

/// The scan intervals of every element of a 2D mesh, in scan order, with a
/// lazily filled affine cache per element slot.
///
/// `intervals` are disjoint: each covered pixel belongs to one element.
/// `cover` keeps every element's full runs, so pixels where element images
/// overlap list all of them.
pub struct ScanWorkspace2D<'a> {
    mesh: &'a CMesh2D,
    values: Option<&'a IndexedValues>,
    displaced: bool,
    squash_tolerance: f64,
    intervals: Vec<ScanInterval>,
    cover: Vec<ScanInterval>,
    elements: Vec<ScanElement<Affine2D>>,
}

impl<'a> ScanWorkspace2D<'a> {
    /// Scans the mesh of `obj`, at its displaced positions when `displaced`
    /// is set.
    pub fn new(obj: &'a MeshObject, displaced: bool, config: &TransformConfig) -> Result<Self> {
        let mesh = match &obj.mesh {
            CMeshDomain::Mesh2D(m) => m.as_ref(),
            other => {
                return Err(Error::ObjectType {
                    expected: MeshKind::Mesh2D.as_str(),
                    found: other.kind().as_str(),
                })
            }
        };
        let values = displacements(obj)?;
        if displaced && values.is_none() {
            return Err(Error::ValuesNull);
        }

        let mut elements = Vec::new();
        elements.try_reserve_exact(mesh.max_elements())?;
        elements.resize(mesh.max_elements(), ScanElement::default());

        let mut intervals = Vec::new();
        intervals.try_reserve(mesh.num_elements().saturating_mul(2))?;
        let mut scratch = Vec::new();
        for (e, nodes) in mesh.elements() {
            let Some(positions) = mesh.element_positions(e) else {
                continue;
            };
            let (src, dst) = element_pair_2d(nodes, positions, values);
            let tri = if displaced { dst } else { src };
            scratch.clear();
            scan_triangle(&tri, e, 0, config.column_tolerance, &mut |i| scratch.push(i));
            tracing::trace!(
                element = e.index(),
                intervals = scratch.len(),
                "Scanned triangle"
            );
            intervals.try_reserve(scratch.len())?;
            intervals.extend_from_slice(&scratch);
        }
        let scanned = intervals.len();
        squeeze(&mut intervals, cmp_scan_2d);
        let mut cover = Vec::new();
        cover.try_reserve_exact(intervals.len())?;
        cover.extend_from_slice(&intervals);
        disjoin(&mut intervals);
        tracing::debug!(
            elements = mesh.num_elements(),
            scanned,
            squeezed = cover.len(),
            owned = intervals.len(),
            displaced,
            "Built 2D scan workspace"
        );

        Ok(Self {
            mesh,
            values,
            displaced,
            squash_tolerance: config.squash_tolerance,
            intervals,
            cover,
            elements,
        })
    }

    #[inline]
    pub fn mesh(&self) -> &'a CMesh2D {
        self.mesh
    }

    #[inline]
    pub fn is_displaced(&self) -> bool {
        self.displaced
    }

    #[inline]
    pub fn intervals(&self) -> &[ScanInterval] {
        &self.intervals
    }

    /// The disjoint intervals on `line`, in scan order.
    pub fn line_range(&self, line: i32) -> &[ScanInterval] {
        line_slice(&self.intervals, line)
    }

    /// Every element run on `line`, overlaps included.
    pub fn cover_range(&self, line: i32) -> &[ScanInterval] {
        line_slice(&self.cover, line)
    }

    /// Line and column bounds `(line1, lastln, kol1, lastkl)` of the
    /// intervals.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.intervals.first()?;
        let last = self.intervals.last()?;
        let kol1 = self.intervals.iter().map(|i| i.left).min()?;
        let lastkl = self.intervals.iter().map(|i| i.right).max()?;
        Some((first.line, last.line, kol1, lastkl))
    }

    /// Number of distinct pixels covered by the intervals.
    pub fn covered_area(&self) -> i64 {
        union_area(&self.intervals)
    }

    /// The affine map of element `e` in direction `dir`, through the cache.
    ///
    /// Without displacements every map is the identity.
    pub fn element_affine(&mut self, e: ElemIdx, dir: Direction) -> Result<Affine2D> {
        let mesh = self.mesh;
        let values = self.values;
        let tol = self.squash_tolerance;
        let nodes = mesh.element(e).ok_or(Error::ElementNotFound(e))?;
        let positions = mesh.element_positions(e).ok_or(Error::ElementNotFound(e))?;
        let slot = self.elements.get_mut(e.index()).ok_or(Error::ElementNotFound(e))?;
        Ok(slot.touch(dir, |dir| {
            if values.is_none() {
                return Solved {
                    map: Affine2D::IDENTITY,
                    squashed: false,
                };
            }
            let (src, dst) = element_pair_2d(nodes, positions, values);
            match dir {
                Direction::Forward => solve_triangle(&src, &dst, tol),
                Direction::Reverse => solve_triangle(&dst, &src, tol),
            }
        }))
    }

    /// Elements whose last solve was squashed.
    pub fn squashed_count(&self) -> usize {
        self.elements.iter().filter(|e| e.squashed).count()
    }

    /// Unions the intervals of each line into a standardized domain.
    pub fn to_interval_domain(&self) -> Result<IntervalDomain> {
        let Some((line1, lastln, kol1, lastkl)) = self.bounds() else {
            return Ok(IntervalDomain::empty());
        };
        let mut domain = IntervalDomain::new(line1, lastln, kol1, lastkl)?;
        let mut mask = LineMask::new(kol1, lastkl);
        for line in line1..=lastln {
            let runs = self.line_range(line);
            if runs.is_empty() {
                continue;
            }
            mask.clear();
            for r in runs {
                mask.set_run(r.left, r.right);
            }
            domain.push_mask(line, &mask)?;
        }
        domain.standardize();
        Ok(domain)
    }
}

fn line_slice(runs: &[ScanInterval], line: i32) -> &[ScanInterval] {
    let lo = runs.partition_point(|i| i.line < line);
    let hi = runs.partition_point(|i| i.line <= line);
    &runs[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use woolz_core::builders::{box_grid_3d, grid_2d};
    use woolz_core::{Point2, Point3, ValueAttach};

    fn shifted(nx: usize, ny: usize, dx: f64, dy: f64) -> MeshObject {
        let mesh = grid_2d(nx, ny, 1.0, Point2::origin()).unwrap();
        let mut values = IndexedValues::node_doubles(2, mesh.max_nodes()).unwrap();
        for (n, _) in mesh.nodes() {
            values.set_f64(n.index(), 0, dx);
            values.set_f64(n.index(), 1, dy);
        }
        MeshObject::new(mesh, Some(values))
    }

    #[test]
    fn unit_square_covers_four_pixels() {
        let obj = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), None);
        let ws = ScanWorkspace2D::new(&obj, false, &TransformConfig::default()).unwrap();
        assert_eq!(ws.covered_area(), 4);
        assert_eq!(ws.bounds(), Some((0, 1, 0, 1)));
        let d = ws.to_interval_domain().unwrap();
        assert_eq!(d.area(), 4);
        assert_eq!((d.line1(), d.lastln(), d.kol1(), d.lastkl()), (0, 1, 0, 1));
    }

    #[test]
    fn displaced_scan_follows_the_shift() {
        let obj = shifted(2, 1, 3.0, -1.0);
        let ws = ScanWorkspace2D::new(&obj, true, &TransformConfig::default()).unwrap();
        assert_eq!(ws.bounds(), Some((-1, 0, 3, 5)));
        assert_eq!(ws.covered_area(), 6);
        assert!(ws.line_range(-1).iter().all(|i| i.line == -1));
        assert!(ws.line_range(7).is_empty());
    }

    #[test]
    fn grid_runs_own_each_pixel_once() {
        let obj = MeshObject::new(grid_2d(2, 2, 1.0, Point2::origin()).unwrap(), None);
        let ws = ScanWorkspace2D::new(&obj, false, &TransformConfig::default()).unwrap();
        let summed: i64 = ws.intervals().iter().map(|i| i.width()).sum();
        assert_eq!((ws.covered_area(), summed), (9, 9));
        for line in 0..=2 {
            let owned: i64 = ws.line_range(line).iter().map(|i| i.width()).sum();
            let cover: i64 = ws.cover_range(line).iter().map(|i| i.width()).sum();
            assert_eq!(owned, 3);
            assert!(cover >= owned);
        }
        assert!(ws.cover_range(1).len() > ws.line_range(1).len());
    }

    #[test]
    fn maps_flip_with_direction() {
        let obj = shifted(1, 1, 2.0, 0.5);
        let mut ws = ScanWorkspace2D::new(&obj, true, &TransformConfig::default()).unwrap();
        let f = ws.element_affine(ElemIdx(0), Direction::Forward).unwrap();
        let p = f.apply(&Point2::new(0.25, 0.5));
        assert_relative_eq!(p, Point2::new(2.25, 1.0), epsilon = 1e-12);
        let r = ws.element_affine(ElemIdx(0), Direction::Reverse).unwrap();
        assert_relative_eq!(r.apply(&p), Point2::new(0.25, 0.5), epsilon = 1e-12);
        assert_eq!(ws.squashed_count(), 0);
    }

    #[test]
    fn no_values_is_identity() {
        let obj = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), None);
        let mut ws = ScanWorkspace2D::new(&obj, false, &TransformConfig::default()).unwrap();
        let identity = ws.element_affine(ElemIdx(1), Direction::Reverse).unwrap();
        assert_eq!(identity, Affine2D::IDENTITY);
        assert!(matches!(
            ws.element_affine(ElemIdx(9), Direction::Forward),
            Err(Error::ElementNotFound(ElemIdx(9)))
        ));
    }

    #[test]
    fn validation_happens_up_front() {
        let bare = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), None);
        assert!(matches!(
            ScanWorkspace2D::new(&bare, true, &TransformConfig::default()),
            Err(Error::ValuesNull)
        ));
        let tet = MeshObject::new(box_grid_3d(1, 1, 1, 1.0, Point3::origin()).unwrap(), None);
        assert!(matches!(
            ScanWorkspace2D::new(&tet, false, &TransformConfig::default()),
            Err(Error::ObjectType { .. })
        ));
        let values =
            IndexedValues::new(ValueAttach::Element, vec![2], woolz_core::GreyType::Double, 2)
                .unwrap();
        let wrong = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), Some(values));
        assert!(matches!(
            ScanWorkspace2D::new(&wrong, false, &TransformConfig::default()),
            Err(Error::ValuesData(_))
        ));
    }
}
