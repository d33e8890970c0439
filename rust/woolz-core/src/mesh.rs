// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conforming simplicial meshes.
//!
//! A [`CMesh`] stores node positions and elements (node index tuples) in
//! [`EntityTable`]s. Three concrete kinds are used:
//!
//! - [`CMesh2D`]: triangles in the plane
//! - [`CMesh2D5`]: triangles embedded in 3D
//! - [`CMesh3D`]: tetrahedra
//!
//! Node and element indices are stable slot indices, so per-entity values can
//! be kept in flat stores outside the mesh.

use nalgebra::{Point2, Point3};

use crate::arena::EntityTable;
use crate::error::{Error, Result};
use crate::geometry::{barycentric_2d, barycentric_3d, barycentric_surface, inside_barycentric};
use crate::keys::{ElemIdx, MeshKind, NodeIdx};

/// Barycentric slack for point-in-element tests.
pub const INSIDE_TOLERANCE: f64 = 1.0e-10;

/// Distance from a surface triangle's plane within which a point is on it.
pub const SURFACE_TOLERANCE: f64 = 1.0e-4;

/// Position types usable as mesh nodes.
pub trait MeshPoint: Copy + std::fmt::Debug + PartialEq {
    /// Number of coordinates.
    const DIM: usize;

    fn coord(&self, axis: usize) -> f64;

    fn set_coord(&mut self, axis: usize, v: f64);

    fn distance_squared(&self, other: &Self) -> f64;

    /// Component-wise minimum.
    fn inf(&self, other: &Self) -> Self;

    /// Component-wise maximum.
    fn sup(&self, other: &Self) -> Self;
}

impl MeshPoint for Point2<f64> {
    const DIM: usize = 2;

    #[inline]
    fn coord(&self, axis: usize) -> f64 {
        self[axis]
    }

    #[inline]
    fn set_coord(&mut self, axis: usize, v: f64) {
        self[axis] = v;
    }

    #[inline]
    fn distance_squared(&self, other: &Self) -> f64 {
        nalgebra::distance_squared(self, other)
    }

    fn inf(&self, other: &Self) -> Self {
        Point2::inf(self, other)
    }

    fn sup(&self, other: &Self) -> Self {
        Point2::sup(self, other)
    }
}

impl MeshPoint for Point3<f64> {
    const DIM: usize = 3;

    #[inline]
    fn coord(&self, axis: usize) -> f64 {
        self[axis]
    }

    #[inline]
    fn set_coord(&mut self, axis: usize, v: f64) {
        self[axis] = v;
    }

    #[inline]
    fn distance_squared(&self, other: &Self) -> f64 {
        nalgebra::distance_squared(self, other)
    }

    fn inf(&self, other: &Self) -> Self {
        Point3::inf(self, other)
    }

    fn sup(&self, other: &Self) -> Self {
        Point3::sup(self, other)
    }
}

/// A mesh node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node<P> {
    pub pos: P,
}

/// A mesh element: `V` node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<const V: usize> {
    pub nodes: [NodeIdx; V],
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<P> {
    pub min: P,
    pub max: P,
}

impl<P: MeshPoint> Aabb<P> {
    /// Smallest box holding every point, or `None` for no points.
    pub fn from_points<I: IntoIterator<Item = P>>(points: I) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        Some(it.fold(Aabb { min: first, max: first }, |b, p| Aabb {
            min: b.min.inf(&p),
            max: b.max.sup(&p),
        }))
    }
}

/// Result of locating a position in a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The position lies in this element.
    Element(ElemIdx),
    /// The position is outside every element; this is the closest node.
    Nearest(NodeIdx),
    /// The mesh has no live nodes.
    Outside,
}

/// A conforming mesh of `V`-node simplices over positions `P`.
#[derive(Debug, Clone)]
pub struct CMesh<P, const V: usize> {
    nodes: EntityTable<Node<P>>,
    elements: EntityTable<Element<V>>,
}

impl<P: MeshPoint, const V: usize> Default for CMesh<P, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type CMesh2D = CMesh<Point2<f64>, 3>;
pub type CMesh2D5 = CMesh<Point3<f64>, 3>;
pub type CMesh3D = CMesh<Point3<f64>, 4>;

impl<P: MeshPoint, const V: usize> CMesh<P, V> {
    pub fn new() -> Self {
        Self {
            nodes: EntityTable::new(),
            elements: EntityTable::new(),
        }
    }

    /// Builds a mesh from slot tables, tombstones included.
    ///
    /// Every live element must reference live nodes.
    pub fn from_tables(
        nodes: EntityTable<Node<P>>,
        elements: EntityTable<Element<V>>,
    ) -> Result<Self> {
        for (_, el) in elements.iter() {
            for &n in &el.nodes {
                if !nodes.contains(n.0) {
                    return Err(Error::NodeNotFound(n));
                }
            }
        }
        Ok(Self { nodes, elements })
    }

    pub fn add_node(&mut self, pos: P) -> NodeIdx {
        NodeIdx(self.nodes.push(Node { pos }))
    }

    /// Adds an element over existing nodes.
    pub fn add_element(&mut self, nodes: [NodeIdx; V]) -> Result<ElemIdx> {
        for &n in &nodes {
            if !self.nodes.contains(n.0) {
                return Err(Error::NodeNotFound(n));
            }
        }
        Ok(ElemIdx(self.elements.push(Element { nodes })))
    }

    /// Removes a node that no live element references.
    pub fn remove_node(&mut self, n: NodeIdx) -> Result<P> {
        if !self.nodes.contains(n.0) {
            return Err(Error::NodeNotFound(n));
        }
        if self.elements.iter().any(|(_, el)| el.nodes.contains(&n)) {
            return Err(Error::DomainData(format!(
                "node {} is still used by an element",
                n.0
            )));
        }
        self.nodes
            .remove(n.0)
            .map(|node| node.pos)
            .ok_or(Error::NodeNotFound(n))
    }

    pub fn remove_element(&mut self, e: ElemIdx) -> Result<[NodeIdx; V]> {
        self.elements
            .remove(e.0)
            .map(|el| el.nodes)
            .ok_or(Error::ElementNotFound(e))
    }

    #[inline]
    pub fn node(&self, n: NodeIdx) -> Option<&P> {
        self.nodes.get(n.0).map(|node| &node.pos)
    }

    /// Moves a node.
    pub fn set_node(&mut self, n: NodeIdx, pos: P) -> Result<()> {
        let node = self.nodes.get_mut(n.0).ok_or(Error::NodeNotFound(n))?;
        node.pos = pos;
        Ok(())
    }

    #[inline]
    pub fn element(&self, e: ElemIdx) -> Option<&[NodeIdx; V]> {
        self.elements.get(e.0).map(|el| &el.nodes)
    }

    /// Node positions of an element, in element order.
    pub fn element_positions(&self, e: ElemIdx) -> Option<[P; V]> {
        let el = self.elements.get(e.0)?;
        let first = *self.node(el.nodes[0])?;
        let mut out = [first; V];
        for (slot, &n) in out.iter_mut().zip(el.nodes.iter()) {
            *slot = *self.node(n)?;
        }
        Some(out)
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.num_ent()
    }

    /// Node slots ever allocated.
    #[inline]
    pub fn max_nodes(&self) -> usize {
        self.nodes.max_ent()
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.elements.num_ent()
    }

    /// Element slots ever allocated.
    #[inline]
    pub fn max_elements(&self) -> usize {
        self.elements.max_ent()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &P)> {
        self.nodes.iter().map(|(i, n)| (NodeIdx(i), &n.pos))
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElemIdx, &[NodeIdx; V])> {
        self.elements.iter().map(|(i, el)| (ElemIdx(i), &el.nodes))
    }

    pub fn node_table(&self) -> &EntityTable<Node<P>> {
        &self.nodes
    }

    pub fn element_table(&self) -> &EntityTable<Element<V>> {
        &self.elements
    }

    /// Bounding box of the live nodes.
    pub fn bounding_box(&self) -> Option<Aabb<P>> {
        Aabb::from_points(self.nodes().map(|(_, p)| *p))
    }
}

/// Per-kind point-in-element test.
pub trait ElementContains<P> {
    fn kind() -> MeshKind;

    /// Returns `true` when the live element `e` encloses `pos`.
    fn element_contains(&self, e: ElemIdx, pos: &P) -> bool;
}

impl ElementContains<Point2<f64>> for CMesh2D {
    fn kind() -> MeshKind {
        MeshKind::Mesh2D
    }

    fn element_contains(&self, e: ElemIdx, pos: &Point2<f64>) -> bool {
        self.element_positions(e)
            .and_then(|tri| barycentric_2d(&tri, pos))
            .is_some_and(|l| inside_barycentric(&l, INSIDE_TOLERANCE))
    }
}

impl ElementContains<Point3<f64>> for CMesh2D5 {
    fn kind() -> MeshKind {
        MeshKind::Mesh2D5
    }

    fn element_contains(&self, e: ElemIdx, pos: &Point3<f64>) -> bool {
        self.element_positions(e)
            .and_then(|tri| barycentric_surface(&tri, pos))
            .is_some_and(|(l, d)| {
                d.abs() <= SURFACE_TOLERANCE && inside_barycentric(&l, INSIDE_TOLERANCE)
            })
    }
}

impl ElementContains<Point3<f64>> for CMesh3D {
    fn kind() -> MeshKind {
        MeshKind::Mesh3D
    }

    fn element_contains(&self, e: ElemIdx, pos: &Point3<f64>) -> bool {
        self.element_positions(e)
            .and_then(|tet| barycentric_3d(&tet, pos))
            .is_some_and(|l| inside_barycentric(&l, INSIDE_TOLERANCE))
    }
}

impl<P: MeshPoint, const V: usize> CMesh<P, V>
where
    Self: ElementContains<P>,
{
    pub fn mesh_kind(&self) -> MeshKind {
        <Self as ElementContains<P>>::kind()
    }
}
