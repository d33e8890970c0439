// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for point location in conforming meshes.
//!
//! Space is divided into square (2D) or cubic (3D) cells of side
//! `cell_size`, keyed by integer cell coordinates. Each element is listed in
//! every cell its padded bounding box touches and each node in the cell that
//! holds it, so a location query only tests the elements of one cell and a
//! nearest-node query only walks the rings of cells around the query point.

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::keys::{ElemIdx, NodeIdx};
use crate::mesh::{Aabb, CMesh, ElementContains, Location, MeshPoint, SURFACE_TOLERANCE};

/// Elements whose box spans more cells than this are kept in a side list
/// tested by every query.
const MAX_ELEMENT_CELLS: i64 = 64;

type Cell = [i64; 3];

/// A grid over the elements and nodes of one mesh.
///
/// The index describes the mesh as it was when built; moving nodes or
/// editing elements afterwards needs a new index.
#[derive(Debug, Clone)]
pub struct MeshIndex {
    cell_size: f64,
    elements: FxHashMap<Cell, Vec<ElemIdx>>,
    oversized: Vec<ElemIdx>,
    nodes: FxHashMap<Cell, Vec<NodeIdx>>,
    node_cells: Option<(Cell, Cell)>,
    node_elements: Vec<Vec<ElemIdx>>,
}

/// Mean of the largest bounding box side over the live elements.
fn mean_extent<P: MeshPoint, const V: usize>(mesh: &CMesh<P, V>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for (e, _) in mesh.elements() {
        let Some(b) = mesh.element_positions(e).and_then(Aabb::from_points) else {
            continue;
        };
        let side = (0..P::DIM)
            .map(|a| b.max.coord(a) - b.min.coord(a))
            .fold(0.0, f64::max);
        if side.is_finite() {
            sum += side;
            n += 1;
        }
    }
    let mean = sum / n as f64;
    (n > 0 && mean.is_finite() && mean > 0.0).then_some(mean)
}

impl MeshIndex {
    /// Indexes the live elements and nodes of `mesh`.
    pub fn new<P: MeshPoint, const V: usize>(mesh: &CMesh<P, V>) -> Result<Self> {
        let cell_size = mean_extent(mesh).unwrap_or(1.0);
        let mut node_elements = Vec::new();
        node_elements.try_reserve_exact(mesh.max_nodes())?;
        node_elements.resize(mesh.max_nodes(), Vec::new());
        let mut index = Self {
            cell_size,
            elements: FxHashMap::default(),
            oversized: Vec::new(),
            nodes: FxHashMap::default(),
            node_cells: None,
            node_elements,
        };

        for (n, p) in mesh.nodes() {
            let c = index.cell_of(p);
            index.nodes.entry(c).or_default().push(n);
            index.node_cells = Some(match index.node_cells {
                None => (c, c),
                Some((lo, hi)) => (
                    [lo[0].min(c[0]), lo[1].min(c[1]), lo[2].min(c[2])],
                    [hi[0].max(c[0]), hi[1].max(c[1]), hi[2].max(c[2])],
                ),
            });
        }

        let pad = SURFACE_TOLERANCE.max(cell_size * 1.0e-6);
        for (e, nodes) in mesh.elements() {
            for n in nodes {
                if let Some(list) = index.node_elements.get_mut(n.index()) {
                    list.push(e);
                }
            }
            let Some(b) = mesh.element_positions(e).and_then(Aabb::from_points) else {
                continue;
            };
            let (lo, hi) = index.cell_span(&b, pad);
            let cells = (0..3).fold(1i64, |acc, a| {
                acc.saturating_mul(hi[a].saturating_sub(lo[a]).saturating_add(1))
            });
            if cells > MAX_ELEMENT_CELLS {
                index.oversized.push(e);
                continue;
            }
            for x in lo[0]..=hi[0] {
                for y in lo[1]..=hi[1] {
                    for z in lo[2]..=hi[2] {
                        index.elements.entry([x, y, z]).or_default().push(e);
                    }
                }
            }
        }
        Ok(index)
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn cell_of<P: MeshPoint>(&self, p: &P) -> Cell {
        let mut c = [0; 3];
        for (a, slot) in c.iter_mut().enumerate().take(P::DIM) {
            *slot = (p.coord(a) / self.cell_size).floor() as i64;
        }
        c
    }

    fn cell_span<P: MeshPoint>(&self, b: &Aabb<P>, pad: f64) -> (Cell, Cell) {
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for a in 0..P::DIM {
            lo[a] = ((b.min.coord(a) - pad) / self.cell_size).floor() as i64;
            hi[a] = ((b.max.coord(a) + pad) / self.cell_size).floor() as i64;
        }
        (lo, hi)
    }

    /// Finds the element enclosing `pos`.
    ///
    /// `hint` is tested first, then the elements sharing a node with it,
    /// then the elements of the cell holding `pos`. Falls back to the nearest
    /// live node when no element encloses it.
    pub fn locate<P: MeshPoint, const V: usize>(
        &self,
        mesh: &CMesh<P, V>,
        pos: &P,
        hint: Option<ElemIdx>,
    ) -> Location
    where
        CMesh<P, V>: ElementContains<P>,
    {
        if let Some(h) = hint {
            if mesh.element_contains(h, pos) {
                return Location::Element(h);
            }
            for n in mesh.element(h).into_iter().flatten() {
                let around = self.node_elements.get(n.index()).into_iter().flatten();
                for &e in around {
                    if e != h && mesh.element_contains(e, pos) {
                        return Location::Element(e);
                    }
                }
            }
        }
        let cell = self.cell_of(pos);
        let candidates = self
            .elements
            .get(&cell)
            .into_iter()
            .flatten()
            .chain(self.oversized.iter());
        for &e in candidates {
            if Some(e) != hint && mesh.element_contains(e, pos) {
                return Location::Element(e);
            }
        }
        match self.nearest_node(mesh, pos) {
            Some(n) => Location::Nearest(n),
            None => Location::Outside,
        }
    }

    /// Live node closest to `pos`; ties go to the lowest index.
    ///
    /// Rings of cells are searched outwards from the cell of `pos` until no
    /// unvisited cell can hold a closer node.
    pub fn nearest_node<P: MeshPoint, const V: usize>(
        &self,
        mesh: &CMesh<P, V>,
        pos: &P,
    ) -> Option<NodeIdx> {
        let (lo, hi) = self.node_cells?;
        let c = self.cell_of(pos);
        let gap = |a: usize| {
            lo[a]
                .saturating_sub(c[a])
                .max(c[a].saturating_sub(hi[a]))
                .max(0)
        };
        let reach = |a: usize| {
            c[a].saturating_sub(lo[a])
                .saturating_abs()
                .max(hi[a].saturating_sub(c[a]).saturating_abs())
        };
        let first = (0..3).map(gap).max().unwrap_or(0);
        let last = (0..3).map(reach).max().unwrap_or(0);

        let mut best: Option<(NodeIdx, f64)> = None;
        let mut r = first;
        while r <= last {
            self.visit_ring(c, r, (lo, hi), |cell| {
                for &n in self.nodes.get(&cell).into_iter().flatten() {
                    let Some(p) = mesh.node(n) else {
                        continue;
                    };
                    let d = p.distance_squared(pos);
                    let closer = match best {
                        None => true,
                        Some((bn, bd)) => d < bd || (d == bd && n < bn),
                    };
                    if closer {
                        best = Some((n, d));
                    }
                }
            });
            if let Some((_, bd)) = best {
                let cleared = r as f64 * self.cell_size;
                if bd < cleared * cleared {
                    break;
                }
            }
            r = r.saturating_add(1);
            if r == i64::MAX {
                break;
            }
        }
        best.map(|(n, _)| n)
    }

    /// Calls `f` for each cell at Chebyshev distance `r` from `c` that lies
    /// inside `bounds`.
    fn visit_ring(&self, c: Cell, r: i64, bounds: (Cell, Cell), mut f: impl FnMut(Cell)) {
        let (lo, hi) = bounds;
        let lo_a = |a: usize| lo[a].max(c[a].saturating_sub(r));
        let hi_a = |a: usize| hi[a].min(c[a].saturating_add(r));
        let on_ring = |a: usize, v: i64| v.abs_diff(c[a]) == r.unsigned_abs();
        let caps = [c[2].saturating_sub(r), c[2].saturating_add(r)];
        let caps = &caps[..if r > 0 { 2 } else { 1 }];
        for x in lo_a(0)..=hi_a(0) {
            for y in lo_a(1)..=hi_a(1) {
                if on_ring(0, x) || on_ring(1, y) {
                    for z in lo_a(2)..=hi_a(2) {
                        f([x, y, z]);
                    }
                } else {
                    for &z in caps.iter().filter(|&&z| z >= lo[2] && z <= hi[2]) {
                        f([x, y, z]);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{box_grid_3d, grid_2d};
    use nalgebra::{Point2, Point3};

    fn brute_nearest<P: MeshPoint, const V: usize>(
        mesh: &CMesh<P, V>,
        pos: &P,
    ) -> Option<NodeIdx> {
        let mut best: Option<(NodeIdx, f64)> = None;
        for (n, p) in mesh.nodes() {
            let d = p.distance_squared(pos);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((n, d));
            }
        }
        best.map(|(n, _)| n)
    }

    fn lcg(seed: &mut u64) -> f64 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (*seed >> 11) as f64 / (1u64 << 53) as f64
    }

    #[test]
    fn grid_locate_agrees_with_exhaustive_search() {
        let mesh = grid_2d(12, 7, 1.5, Point2::new(-3.0, 2.0)).unwrap();
        let index = MeshIndex::new(&mesh).unwrap();
        let mut seed = 7;
        let mut hint = None;
        for _ in 0..500 {
            let p = Point2::new(-6.0 + 24.0 * lcg(&mut seed), -1.0 + 17.0 * lcg(&mut seed));
            let inside = mesh.elements().any(|(e, _)| mesh.element_contains(e, &p));
            match index.locate(&mesh, &p, hint) {
                Location::Element(e) => {
                    assert!(inside);
                    assert!(mesh.element_contains(e, &p));
                    hint = Some(e);
                }
                Location::Nearest(n) => {
                    assert!(!inside, "{:?} missed", p);
                    assert_eq!(Some(n), brute_nearest(&mesh, &p));
                }
                Location::Outside => panic!("mesh has nodes"),
            }
        }
    }

    #[test]
    fn tetrahedra_locate_agrees_with_exhaustive_search() {
        let mesh = box_grid_3d(3, 2, 2, 2.0, Point3::origin()).unwrap();
        let index = MeshIndex::new(&mesh).unwrap();
        let mut seed = 11;
        for _ in 0..300 {
            let p = Point3::new(
                -2.0 + 10.0 * lcg(&mut seed),
                -2.0 + 8.0 * lcg(&mut seed),
                -2.0 + 8.0 * lcg(&mut seed),
            );
            let inside = mesh.elements().any(|(e, _)| mesh.element_contains(e, &p));
            match index.locate(&mesh, &p, Some(ElemIdx(0))) {
                Location::Element(e) => assert!(inside && mesh.element_contains(e, &p)),
                Location::Nearest(n) => {
                    assert!(!inside);
                    assert_eq!(Some(n), brute_nearest(&mesh, &p));
                }
                Location::Outside => panic!("mesh has nodes"),
            }
        }
    }

    #[test]
    fn far_points_and_ties_pick_the_lowest_node() {
        let mesh = grid_2d(2, 2, 1.0, Point2::origin()).unwrap();
        let index = MeshIndex::new(&mesh).unwrap();
        assert_eq!(index.nearest_node(&mesh, &Point2::new(1.0e6, -1.0e6)), Some(NodeIdx(2)));
        assert_eq!(index.nearest_node(&mesh, &Point2::new(0.5, -3.0)), Some(NodeIdx(0)));
        assert_eq!(
            index.locate(&mesh, &Point2::new(-50.0, 50.0), None),
            Location::Nearest(NodeIdx(6))
        );
    }

    #[test]
    fn tombstones_and_empty_meshes() {
        let mut mesh = grid_2d(1, 1, 1.0, Point2::origin()).unwrap();
        mesh.remove_element(ElemIdx(0)).unwrap();
        let index = MeshIndex::new(&mesh).unwrap();
        assert_eq!(
            index.locate(&mesh, &Point2::new(0.75, 0.25), Some(ElemIdx(0))),
            Location::Nearest(NodeIdx(1))
        );
        assert_eq!(
            index.locate(&mesh, &Point2::new(0.25, 0.75), Some(ElemIdx(0))),
            Location::Element(ElemIdx(1))
        );
        let empty = CMesh::<Point2<f64>, 3>::new();
        let index = MeshIndex::new(&empty).unwrap();
        assert_eq!(index.locate(&empty, &Point2::new(0.0, 0.0), None), Location::Outside);
    }
}
