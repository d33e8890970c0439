// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan conversion of triangles and tetrahedra into raster intervals.
//!
//! Vertex positions are quantised by flooring, so a pixel `(k, l)` covers
//! `[k, k + 1) x [l, l + 1)` and a unit square with integer corners scans to
//! a 2 by 2 block. Tetrahedra are swept through integer planes and each
//! cross-section is scanned with the triangle algorithm.

use std::cmp::Ordering;

use nalgebra::{Point2, Point3};
use smallvec::SmallVec;
use woolz_core::ElemIdx;

/// A run of columns on one line (and plane) belonging to one element's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanInterval {
    pub element: ElemIdx,
    pub plane: i32,
    pub line: i32,
    pub left: i32,
    pub right: i32,
}

impl ScanInterval {
    #[inline]
    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64 + 1
    }

    /// Columns shared with `left..=right`, if any.
    #[inline]
    pub fn clip(&self, left: i32, right: i32) -> Option<(i32, i32)> {
        let l = self.left.max(left);
        let r = self.right.min(right);
        (l <= r).then_some((l, r))
    }
}

#[derive(Clone, Copy)]
struct IVec {
    x: i32,
    y: i32,
}

/// Scan converts one triangle, calling `emit` for each non-empty line run.
///
/// `tol` is added to the interpolated edge columns before flooring.
pub fn scan_triangle(
    vertices: &[Point2<f64>; 3],
    element: ElemIdx,
    plane: i32,
    tol: f64,
    emit: &mut impl FnMut(ScanInterval),
) {
    let mut s = vertices.map(|v| IVec {
        x: v.x.floor() as i32,
        y: v.y.floor() as i32,
    });
    s.sort_by(|a, b| a.y.cmp(&b.y).then(a.x.cmp(&b.x)));
    let run = |line: i32, left: i32, right: i32| ScanInterval {
        element,
        plane,
        line,
        left,
        right,
    };

    let d0 = IVec {
        x: s[0].x - s[1].x,
        y: s[0].y - s[1].y,
    };
    let d1 = IVec {
        x: s[1].x - s[2].x,
        y: s[1].y - s[2].y,
    };
    let d2 = IVec {
        x: s[2].x - s[0].x,
        y: s[2].y - s[0].y,
    };

    if d2.y == 0 {
        let left = s[0].x.min(s[1].x).min(s[2].x);
        let right = s[0].x.max(s[1].x).max(s[2].x);
        emit(run(s[0].y, left, right));
        return;
    }
    if d0.x == 0 && d1.x == 0 {
        for line in s[0].y..=s[2].y {
            emit(run(line, s[0].x, s[0].x));
        }
        return;
    }

    let slope = |d: IVec| -> f64 {
        if d.y == 0 {
            0.0
        } else {
            d.x as f64 / d.y as f64
        }
    };
    let inc = [slope(d0), slope(d1), slope(d2)];
    let (x0s, y0s) = (s[0].x as f64, s[0].y);
    let (x1s, y1s) = (s[1].x as f64, s[1].y);

    for line in s[0].y..=s[2].y {
        let (mut a, mut b) = if line == y0s {
            let b = if line + 1 > y1s { x1s } else { x0s };
            (x0s, b)
        } else {
            let a = x0s + inc[2] * (line - y0s) as f64;
            let b = if line >= y1s {
                x1s + inc[1] * (line - y1s) as f64
            } else {
                x0s + inc[0] * (line - y0s) as f64
            };
            (a, b)
        };
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let left = (a + tol).floor() as i32;
        let right = (b + tol).floor() as i32;
        if left <= right {
            emit(run(line, left, right));
        }
    }
}

fn cmp_zyx(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    a.z.total_cmp(&b.z)
        .then(a.y.total_cmp(&b.y))
        .then(a.x.total_cmp(&b.x))
}

/// Sweeps one tetrahedron through the integer planes it spans.
///
/// The first plane also takes the lowest vertex; later planes take vertices
/// lying on them within `plane_tol` and the edge crossings strictly inside
/// each edge. Each cross-section is scanned as the union of the triangles
/// over its points, which for one or two points degenerates to a point or a
/// segment.
pub fn sweep_tetrahedron(
    vertices: &[Point3<f64>; 4],
    element: ElemIdx,
    plane_tol: f64,
    col_tol: f64,
    emit: &mut impl FnMut(ScanInterval),
) {
    let mut v = *vertices;
    v.sort_by(cmp_zyx);
    let z0 = v[0].z;
    let z3 = v[3].z;
    if !z0.is_finite() || !z3.is_finite() {
        return;
    }

    let mut plane = z0.floor() as i32;
    while (plane as f64) < z3 + plane_tol {
        let pz = plane as f64;
        let mut points: SmallVec<[Point2<f64>; 8]> = SmallVec::new();
        for (i, p) in v.iter().enumerate() {
            let on_plane = (p.z - pz).abs() <= plane_tol;
            if on_plane || (i == 0 && pz - plane_tol < z0) {
                points.push(Point2::new(p.x, p.y));
            }
        }
        for i in 0..3 {
            for j in (i + 1)..4 {
                let del = v[j] - v[i];
                if del.z > plane_tol {
                    let a = (pz - v[i].z) / del.z;
                    if a > plane_tol && a < 1.0 - plane_tol {
                        let c = v[i] + del * a;
                        points.push(Point2::new(c.x, c.y));
                    }
                }
            }
        }
        match points.len() {
            0 => {}
            1 => scan_triangle(&[points[0]; 3], element, plane, col_tol, emit),
            2 => {
                let seg = [points[0], points[1], points[1]];
                scan_triangle(&seg, element, plane, col_tol, emit);
            }
            n => {
                for a in 0..n - 2 {
                    for b in (a + 1)..n - 1 {
                        for c in (b + 1)..n {
                            let tri = [points[a], points[b], points[c]];
                            scan_triangle(&tri, element, plane, col_tol, emit);
                        }
                    }
                }
            }
        }
        plane += 1;
    }
}

fn cmp_squeeze(a: &ScanInterval, b: &ScanInterval) -> Ordering {
    a.plane
        .cmp(&b.plane)
        .then(a.line.cmp(&b.line))
        .then(a.element.cmp(&b.element))
        .then(a.left.cmp(&b.left))
}

/// Scan order for 2D workspaces: line, then left ascending, then right
/// descending.
pub fn cmp_scan_2d(a: &ScanInterval, b: &ScanInterval) -> Ordering {
    a.plane
        .cmp(&b.plane)
        .then(a.line.cmp(&b.line))
        .then(a.left.cmp(&b.left))
        .then(b.right.cmp(&a.right))
}

/// Scan order for 3D workspaces: plane, line, left, right.
pub fn cmp_scan_3d(a: &ScanInterval, b: &ScanInterval) -> Ordering {
    a.plane
        .cmp(&b.plane)
        .then(a.line.cmp(&b.line))
        .then(a.left.cmp(&b.left))
        .then(a.right.cmp(&b.right))
}

/// Merges touching or overlapping runs of the same element on the same line,
/// then sorts the survivors with `order`.
pub fn squeeze(
    intervals: &mut Vec<ScanInterval>,
    order: fn(&ScanInterval, &ScanInterval) -> Ordering,
) {
    intervals.sort_unstable_by(cmp_squeeze);
    let mut out = 0;
    for i in 0..intervals.len() {
        let cur = intervals[i];
        if out > 0 {
            let prev = &mut intervals[out - 1];
            if prev.element == cur.element
                && prev.plane == cur.plane
                && prev.line == cur.line
                && prev.right as i64 + 1 >= cur.left as i64
            {
                prev.right = prev.right.max(cur.right);
                continue;
            }
        }
        intervals[out] = cur;
        out += 1;
    }
    intervals.truncate(out);
    intervals.sort_unstable_by(order);
}

/// Clips runs of different elements against each other so that every pixel
/// of a line belongs to exactly one run.
///
/// `intervals` must be sorted by plane, line and left column. The earlier
/// run in that order keeps a shared pixel; runs left empty are dropped.
pub fn disjoin(intervals: &mut Vec<ScanInterval>) {
    let mut out = 0;
    let mut reach: Option<(i32, i32, i32)> = None;
    for i in 0..intervals.len() {
        let mut cur = intervals[i];
        if let Some((p, l, r)) = reach {
            if p == cur.plane && l == cur.line {
                if cur.right <= r {
                    continue;
                }
                cur.left = cur.left.max(r + 1);
            }
        }
        reach = Some((cur.plane, cur.line, cur.right));
        intervals[out] = cur;
        out += 1;
    }
    intervals.truncate(out);
}

/// Number of pixels covered by the union of `intervals`, which must be
/// sorted by plane, line and left column.
pub fn union_area(intervals: &[ScanInterval]) -> i64 {
    let mut area = 0;
    let mut cur: Option<(i32, i32, i32)> = None;
    for i in intervals {
        match cur.as_mut() {
            Some((p, l, r)) if *p == i.plane && *l == i.line => {
                if i.right > *r {
                    area += i.right as i64 - i.left.max(*r + 1) as i64 + 1;
                    *r = i.right;
                }
            }
            _ => {
                area += i.width();
                cur = Some((i.plane, i.line, i.right));
            }
        }
    }
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(tri: [(f64, f64); 3]) -> Vec<ScanInterval> {
        let mut out = Vec::new();
        let v = tri.map(|(x, y)| Point2::new(x, y));
        scan_triangle(&v, ElemIdx(0), 0, 1.0e-4, &mut |i| out.push(i));
        out
    }

    fn runs(v: &[ScanInterval]) -> Vec<(i32, i32, i32)> {
        v.iter().map(|i| (i.line, i.left, i.right)).collect()
    }

    #[test]
    fn unit_square_triangles() {
        let lower = scan([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(runs(&lower), vec![(0, 0, 1), (1, 1, 1)]);
        let upper = scan([(0.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert_eq!(runs(&upper), vec![(0, 0, 0), (1, 0, 1)]);
    }

    #[test]
    fn flat_triangle_is_one_run() {
        let v = scan([(3.2, 5.7), (0.5, 5.1), (7.9, 5.0)]);
        assert_eq!(runs(&v), vec![(5, 0, 7)]);
    }

    #[test]
    fn vertical_sliver_is_one_column() {
        let v = scan([(2.1, 0.0), (2.4, 3.5), (2.9, 1.0)]);
        assert_eq!(runs(&v), vec![(0, 2, 2), (1, 2, 2), (2, 2, 2), (3, 2, 2)]);
    }

    #[test]
    fn larger_triangle_edges() {
        let v = scan([(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        assert_eq!(
            runs(&v),
            vec![(0, 0, 4), (1, 0, 3), (2, 0, 2), (3, 0, 1), (4, 0, 0)]
        );
    }

    #[test]
    fn squeeze_merges_same_element() {
        let mk = |e, line, left, right| ScanInterval {
            element: ElemIdx(e),
            plane: 0,
            line,
            left,
            right,
        };
        let mut v = vec![
            mk(1, 0, 3, 4),
            mk(0, 0, 0, 1),
            mk(1, 0, 0, 2),
            mk(0, 0, 2, 2),
            mk(0, 1, 0, 0),
        ];
        squeeze(&mut v, cmp_scan_2d);
        assert_eq!(v, vec![mk(1, 0, 0, 4), mk(0, 0, 0, 2), mk(0, 1, 0, 0)]);
    }

    #[test]
    fn scan_2d_order_prefers_wider_runs() {
        let mk = |right| ScanInterval {
            element: ElemIdx(0),
            plane: 0,
            line: 0,
            left: 0,
            right,
        };
        assert_eq!(cmp_scan_2d(&mk(5), &mk(2)), Ordering::Less);
        assert_eq!(cmp_scan_3d(&mk(5), &mk(2)), Ordering::Greater);
    }

    #[test]
    fn unit_tetrahedron_sweep() {
        let tet = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let mut out = Vec::new();
        sweep_tetrahedron(&tet, ElemIdx(3), 1.0e-10, 1.0e-4, &mut |i| out.push(i));
        squeeze(&mut out, cmp_scan_3d);
        let planes: Vec<(i32, i32, i32, i32)> =
            out.iter().map(|i| (i.plane, i.line, i.left, i.right)).collect();
        assert_eq!(planes, vec![(0, 0, 0, 1), (0, 1, 0, 0), (1, 0, 0, 0)]);
        assert!(out.iter().all(|i| i.element == ElemIdx(3)));
    }

    #[test]
    fn union_area_counts_overlaps_once() {
        let mut v = scan([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        v.extend(scan([(0.0, 0.0), (1.0, 1.0), (0.0, 1.0)]));
        squeeze(&mut v, cmp_scan_2d);
        assert_eq!(union_area(&v), 4);
    }

    #[test]
    fn vertex_order_does_not_change_the_scan() {
        let tri = [(0.5, 0.2), (3.7, 0.9), (1.2, 3.4)];
        let expected = runs(&scan(tri));
        for perm in [[1, 0, 2], [2, 1, 0], [0, 2, 1], [1, 2, 0], [2, 0, 1]] {
            let p = perm.map(|i| tri[i]);
            assert_eq!(runs(&scan(p)), expected, "{:?}", perm);
        }
        let flat = [(4.0, 2.0), (0.0, 2.0), (2.0, 0.0)];
        let expected = runs(&scan(flat));
        assert_eq!(runs(&scan([flat[1], flat[0], flat[2]])), expected);
    }

    #[test]
    fn disjoin_gives_shared_pixels_to_the_first_run() {
        let mk = |e, line, left, right| ScanInterval {
            element: ElemIdx(e),
            plane: 0,
            line,
            left,
            right,
        };
        let mut v = vec![
            mk(0, 0, 0, 4),
            mk(1, 0, 2, 3),
            mk(2, 0, 4, 7),
            mk(3, 0, 9, 9),
            mk(1, 1, 3, 5),
            mk(0, 1, 5, 6),
        ];
        let before = union_area(&v);
        disjoin(&mut v);
        assert_eq!(
            v,
            vec![
                mk(0, 0, 0, 4),
                mk(2, 0, 5, 7),
                mk(3, 0, 9, 9),
                mk(1, 1, 3, 5),
                mk(0, 1, 6, 6),
            ]
        );
        assert_eq!(v.iter().map(|i| i.width()).sum::<i64>(), before);
    }

    #[test]
    fn tiled_squares_scan_without_double_counting() {
        let mut v = Vec::new();
        let mut e = 0;
        for y in 0..2 {
            for x in 0..2 {
                let (x, y) = (x as f64, y as f64);
                let lower = [(x, y), (x + 1.0, y), (x + 1.0, y + 1.0)];
                let upper = [(x, y), (x + 1.0, y + 1.0), (x, y + 1.0)];
                for tri in [lower, upper] {
                    let p = tri.map(|(a, b)| Point2::new(a, b));
                    scan_triangle(&p, ElemIdx(e), 0, 1.0e-4, &mut |i| v.push(i));
                    e += 1;
                }
            }
        }
        squeeze(&mut v, cmp_scan_2d);
        let area = union_area(&v);
        assert_eq!(area, 9);
        disjoin(&mut v);
        assert_eq!(v.iter().map(|i| i.width()).sum::<i64>(), area);
        for w in v.windows(2) {
            if w[0].line == w[1].line {
                assert!(w[0].right < w[1].left, "{:?}", w);
            }
        }
    }

    #[test]
    fn clip_to_columns() {
        let i = ScanInterval {
            element: ElemIdx(0),
            plane: 0,
            line: 0,
            left: 2,
            right: 6,
        };
        assert_eq!(i.clip(4, 9), Some((4, 6)));
        assert_eq!(i.clip(7, 9), None);
        assert_eq!(i.width(), 5);
    }
}
