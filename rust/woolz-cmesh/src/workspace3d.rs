// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan workspace for tetrahedral meshes.

use woolz_core::{
    CMesh3D, CMeshDomain, ElemIdx, Error, IndexedValues, IntervalDomain, LineMask, MeshKind,
    MeshObject, PlaneDomain, Result,
};

use crate::affine::{solve_tetrahedron, Affine3D, Solved};
use crate::cache::{Direction, ScanElement};
use crate::config::TransformConfig;
use crate::displacement::{displacements, dsp3, element_pair_3d};
use crate::scan::{cmp_scan_3d, disjoin, squeeze, sweep_tetrahedron, union_area, ScanInterval};

/// Integer bounding box, inclusive, indexed `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelBox {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

/// The scan intervals of every tetrahedron, sorted by plane, line and
/// column, with the per-element affine cache.
///
/// As in 2D, `intervals` own each voxel once and `cover` keeps the full
/// runs of every tetrahedron.
pub struct ScanWorkspace3D<'a> {
    mesh: &'a CMesh3D,
    values: Option<&'a IndexedValues>,
    displaced: bool,
    squash_tolerance: f64,
    bbox: VoxelBox,
    intervals: Vec<ScanInterval>,
    cover: Vec<ScanInterval>,
    elements: Vec<ScanElement<Affine3D>>,
}

impl<'a> ScanWorkspace3D<'a> {
    pub fn new(obj: &'a MeshObject, displaced: bool, config: &TransformConfig) -> Result<Self> {
        let mesh = match &obj.mesh {
            CMeshDomain::Mesh3D(m) => m.as_ref(),
            other => {
                return Err(Error::ObjectType {
                    expected: MeshKind::Mesh3D.as_str(),
                    found: other.kind().as_str(),
                })
            }
        };
        let values = displacements(obj)?;
        if displaced && values.is_none() {
            return Err(Error::ValuesNull);
        }

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for (n, p) in mesh.nodes() {
            let q = if displaced { *p + dsp3(values, n) } else { *p };
            for a in 0..3 {
                min[a] = min[a].min(q[a]);
                max[a] = max[a].max(q[a]);
            }
        }
        let bbox = if mesh.num_nodes() == 0 {
            VoxelBox {
                min: [0; 3],
                max: [-1; 3],
            }
        } else {
            VoxelBox {
                min: min.map(|v| v.floor() as i32 - 1),
                max: max.map(|v| v.floor() as i32 + 1),
            }
        };

        let mut elements = Vec::new();
        elements.try_reserve_exact(mesh.max_elements())?;
        elements.resize(mesh.max_elements(), ScanElement::default());

        let mut intervals = Vec::new();
        intervals.try_reserve(mesh.num_elements().saturating_mul(4))?;
        let mut scratch = Vec::new();
        for (e, nodes) in mesh.elements() {
            let Some(positions) = mesh.element_positions(e) else {
                continue;
            };
            let (src, dst) = element_pair_3d(nodes, positions, values);
            let tet = if displaced { dst } else { src };
            scratch.clear();
            sweep_tetrahedron(
                &tet,
                e,
                config.plane_tolerance,
                config.column_tolerance,
                &mut |i| scratch.push(i),
            );
            tracing::trace!(
                element = e.index(),
                intervals = scratch.len(),
                "Swept tetrahedron"
            );
            intervals.try_reserve(scratch.len())?;
            intervals.extend_from_slice(&scratch);
        }
        let scanned = intervals.len();
        squeeze(&mut intervals, cmp_scan_3d);
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
            ?bbox,
            "Built 3D scan workspace"
        );

        Ok(Self {
            mesh,
            values,
            displaced,
            squash_tolerance: config.squash_tolerance,
            bbox,
            intervals,
            cover,
            elements,
        })
    }

    #[inline]
    pub fn mesh(&self) -> &'a CMesh3D {
        self.mesh
    }

    #[inline]
    pub fn is_displaced(&self) -> bool {
        self.displaced
    }

    /// Bounding box of the scanned node positions, padded by one voxel.
    #[inline]
    pub fn bbox(&self) -> VoxelBox {
        self.bbox
    }

    #[inline]
    pub fn intervals(&self) -> &[ScanInterval] {
        &self.intervals
    }

    pub fn plane_range(&self, plane: i32) -> &[ScanInterval] {
        let lo = self.intervals.partition_point(|i| i.plane < plane);
        let hi = self.intervals.partition_point(|i| i.plane <= plane);
        &self.intervals[lo..hi]
    }

    pub fn line_range(&self, plane: i32, line: i32) -> &[ScanInterval] {
        line_slice(&self.intervals, plane, line)
    }

    /// Every tetrahedron run on `(plane, line)`, overlaps included.
    pub fn cover_range(&self, plane: i32, line: i32) -> &[ScanInterval] {
        line_slice(&self.cover, plane, line)
    }

    /// Number of distinct voxels covered.
    pub fn covered_volume(&self) -> i64 {
        union_area(&self.intervals)
    }

    /// The affine map of tetrahedron `e` in direction `dir`.
    pub fn element_affine(&mut self, e: ElemIdx, dir: Direction) -> Result<Affine3D> {
        let mesh = self.mesh;
        let values = self.values;
        let tol = self.squash_tolerance;
        let nodes = mesh.element(e).ok_or(Error::ElementNotFound(e))?;
        let positions = mesh.element_positions(e).ok_or(Error::ElementNotFound(e))?;
        let slot = self.elements.get_mut(e.index()).ok_or(Error::ElementNotFound(e))?;
        Ok(slot.touch(dir, |dir| {
            if values.is_none() {
                return Solved {
                    map: Affine3D::IDENTITY,
                    squashed: false,
                };
            }
            let (src, dst) = element_pair_3d(nodes, positions, values);
            match dir {
                Direction::Forward => solve_tetrahedron(&src, &dst, tol),
                Direction::Reverse => solve_tetrahedron(&dst, &src, tol),
            }
        }))
    }

    pub fn squashed_count(&self) -> usize {
        self.elements.iter().filter(|e| e.squashed).count()
    }

    /// Unions the intervals into a standardized plane domain.
    pub fn to_plane_domain(&self) -> Result<PlaneDomain> {
        let (Some(first), Some(last)) = (self.intervals.first(), self.intervals.last()) else {
            return Ok(PlaneDomain::empty());
        };
        let (plane1, lastpl) = (first.plane, last.plane);
        let line1 = self.intervals.iter().map(|i| i.line).min().unwrap_or(0);
        let lastln = self.intervals.iter().map(|i| i.line).max().unwrap_or(0);
        let kol1 = self.intervals.iter().map(|i| i.left).min().unwrap_or(0);
        let lastkl = self.intervals.iter().map(|i| i.right).max().unwrap_or(0);

        let mut out = PlaneDomain::new(plane1, lastpl, line1, lastln, kol1, lastkl)?;
        let mut mask = LineMask::new(kol1, lastkl);
        for plane in plane1..=lastpl {
            let runs = self.plane_range(plane);
            if runs.is_empty() {
                continue;
            }
            let mut dom = IntervalDomain::new(line1, lastln, kol1, lastkl)?;
            for line in line1..=lastln {
                let lr = self.line_range(plane, line);
                if lr.is_empty() {
                    continue;
                }
                mask.clear();
                for r in lr {
                    mask.set_run(r.left, r.right);
                }
                dom.push_mask(line, &mask)?;
            }
            out.set_plane(plane, dom)?;
        }
        out.standardize();
        Ok(out)
    }
}

fn line_slice(runs: &[ScanInterval], plane: i32, line: i32) -> &[ScanInterval] {
    let key = |i: &ScanInterval| (i.plane, i.line);
    let lo = runs.partition_point(|i| key(i) < (plane, line));
    let hi = runs.partition_point(|i| key(i) <= (plane, line));
    &runs[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use woolz_core::builders::{box_grid_3d, grid_2d};
    use woolz_core::{Point2, Point3};

    fn cube(n: usize) -> MeshObject {
        MeshObject::new(box_grid_3d(n, n, n, 1.0, Point3::origin()).unwrap(), None)
    }

    #[test]
    fn unit_cube_covers_eight_voxels() {
        let obj = cube(1);
        let ws = ScanWorkspace3D::new(&obj, false, &TransformConfig::default()).unwrap();
        assert_eq!(ws.covered_volume(), 8);
        assert_eq!(
            ws.bbox(),
            VoxelBox {
                min: [-1; 3],
                max: [2; 3]
            }
        );
        let d = ws.to_plane_domain().unwrap();
        assert_eq!(d.volume(), 8);
        assert_eq!((d.plane1(), d.lastpl()), (0, 1));
    }

    #[test]
    fn box_grid_coverage() {
        let obj = cube(2);
        let ws = ScanWorkspace3D::new(&obj, false, &TransformConfig::default()).unwrap();
        assert_eq!(ws.covered_volume(), 27);
        let summed: i64 = ws.intervals().iter().map(|i| i.width()).sum();
        assert_eq!(summed, 27);
        assert!(ws.cover_range(1, 1).len() > ws.line_range(1, 1).len());
        assert!(ws.line_range(1, 1).iter().all(|i| i.plane == 1 && i.line == 1));
        assert!(!ws.plane_range(2).is_empty());
        assert!(ws.plane_range(3).is_empty());
    }

    #[test]
    fn forward_then_reverse_is_identity() {
        let mesh = box_grid_3d(1, 1, 1, 1.0, Point3::origin()).unwrap();
        let mut values = IndexedValues::node_doubles(3, mesh.max_nodes()).unwrap();
        for (n, p) in mesh.nodes() {
            values.set_f64(n.index(), 0, 0.2 * p.y);
            values.set_f64(n.index(), 2, 1.5);
        }
        let obj = MeshObject::new(mesh, Some(values));
        let mut ws = ScanWorkspace3D::new(&obj, true, &TransformConfig::default()).unwrap();
        let p = Point3::new(0.3, 0.2, 0.1);
        for e in 0..6 {
            let f = ws.element_affine(ElemIdx(e), Direction::Forward).unwrap();
            let q = f.apply(&p);
            assert_relative_eq!(q, Point3::new(0.34, 0.2, 1.6), epsilon = 1e-10);
            let r = ws.element_affine(ElemIdx(e), Direction::Reverse).unwrap();
            assert_relative_eq!(r.apply(&q), p, epsilon = 1e-10);
        }
    }

    #[test]
    fn rejects_triangle_mesh() {
        let obj = MeshObject::new(grid_2d(1, 1, 1.0, Point2::origin()).unwrap(), None);
        assert!(matches!(
            ScanWorkspace3D::new(&obj, false, &TransformConfig::default()),
            Err(Error::ObjectType { .. })
        ));
    }
}
