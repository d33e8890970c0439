// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon domains and boundary lists.

use nalgebra::Vector2;

use crate::grey::nint;

/// Polygon vertices of one coordinate type.
#[derive(Debug, Clone, PartialEq)]
pub enum PolygonVertices {
    Int(Vec<Vector2<i32>>),
    Float(Vec<Vector2<f32>>),
    Double(Vec<Vector2<f64>>),
}

impl PolygonVertices {
    pub fn type_name(&self) -> &'static str {
        match self {
            PolygonVertices::Int(_) => "int",
            PolygonVertices::Float(_) => "float",
            PolygonVertices::Double(_) => "double",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PolygonVertices::Int(v) => v.len(),
            PolygonVertices::Float(v) => v.len(),
            PolygonVertices::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vertices as doubles.
    pub fn to_f64(&self) -> Vec<Vector2<f64>> {
        match self {
            PolygonVertices::Int(v) => v.iter().map(|p| p.cast::<f64>()).collect(),
            PolygonVertices::Float(v) => v.iter().map(|p| p.cast::<f64>()).collect(),
            PolygonVertices::Double(v) => v.clone(),
        }
    }
}

/// A 2D polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonDomain {
    pub vertices: PolygonVertices,
}

impl PolygonDomain {
    pub fn new(vertices: PolygonVertices) -> Self {
        Self { vertices }
    }

    /// Integer polygon in which consecutive vertices are 8-neighbours.
    ///
    /// Vertices are rounded to the nearest integer and the gaps between them
    /// are filled by stepping along the dominant axis. With `wrap` the result
    /// ends with a copy of its first vertex.
    pub fn to_8_connected(&self, wrap: bool) -> PolygonDomain {
        let pts: Vec<Vector2<i32>> = self
            .vertices
            .to_f64()
            .iter()
            .map(|p| Vector2::new(nint(p.x) as i32, nint(p.y) as i32))
            .collect();
        let mut out: Vec<Vector2<i32>> = Vec::with_capacity(pts.len());
        let Some(&first) = pts.first() else {
            return PolygonDomain::new(PolygonVertices::Int(out));
        };
        out.push(first);
        let closing = if wrap { Some(first) } else { None };
        for &b in pts.iter().skip(1).chain(closing.iter()) {
            let a = out[out.len() - 1];
            let d = b - a;
            let n = d.x.abs().max(d.y.abs());
            for s in 1..=n {
                let t = s as f64 / n as f64;
                let p = Vector2::new(
                    a.x + nint(t * d.x as f64) as i32,
                    a.y + nint(t * d.y as f64) as i32,
                );
                out.push(p);
            }
        }
        PolygonDomain::new(PolygonVertices::Int(out))
    }
}

/// Whether a boundary encloses foreground or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Piece,
    Hole,
}

/// A boundary tree: `next` links siblings, `down` links enclosed boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundList {
    pub kind: BoundKind,
    /// The polygon is closed, its last vertex repeating its first.
    pub wrap: bool,
    pub poly: PolygonDomain,
    pub next: Option<Box<BoundList>>,
    pub down: Option<Box<BoundList>>,
}

impl BoundList {
    pub fn new(kind: BoundKind, wrap: bool, poly: PolygonDomain) -> Self {
        Self {
            kind,
            wrap,
            poly,
            next: None,
            down: None,
        }
    }

    /// Number of boundaries in the tree.
    pub fn count(&self) -> usize {
        1 + self.next.as_ref().map_or(0, |n| n.count())
            + self.down.as_ref().map_or(0, |d| d.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_8_connected(v: &[Vector2<i32>]) -> bool {
        v.windows(2).all(|w| {
            let d = w[1] - w[0];
            d.x.abs() <= 1 && d.y.abs() <= 1
        })
    }

    #[test]
    fn eight_connected_fills_gaps() {
        let poly = PolygonDomain::new(PolygonVertices::Double(vec![
            Vector2::new(0.2, 0.1),
            Vector2::new(4.0, 1.0),
            Vector2::new(4.4, 5.0),
        ]));
        let out = poly.to_8_connected(true);
        let PolygonVertices::Int(v) = &out.vertices else {
            panic!("expected integer vertices");
        };
        assert!(is_8_connected(v));
        assert_eq!(v.first(), Some(&Vector2::new(0, 0)));
        assert_eq!(v.last(), Some(&Vector2::new(0, 0)));
        assert!(v.contains(&Vector2::new(4, 5)));
    }

    #[test]
    fn open_polygon_does_not_close() {
        let poly =
            PolygonDomain::new(PolygonVertices::Int(vec![Vector2::new(0, 0), Vector2::new(3, 0)]));
        let out = poly.to_8_connected(false);
        assert_eq!(out.vertices.len(), 4);
    }

    #[test]
    fn boundary_tree_count() {
        let poly = PolygonDomain::new(PolygonVertices::Int(vec![]));
        let mut root = BoundList::new(BoundKind::Piece, true, poly.clone());
        root.down = Some(Box::new(BoundList::new(BoundKind::Hole, true, poly.clone())));
        root.next = Some(Box::new(BoundList::new(BoundKind::Piece, true, poly)));
        assert_eq!(root.count(), 3);
    }
}
