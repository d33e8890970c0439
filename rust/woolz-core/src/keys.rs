// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Index types for mesh entities.
//!
//! Nodes and elements are addressed by the slot they occupy in an
//! [`EntityTable`](crate::arena::EntityTable). A slot index never changes
//! while the entity lives, so it can key out-of-band stores such as
//! [`IndexedValues`](crate::values::IndexedValues) directly.

use serde::{Deserialize, Serialize};

/// Index of a mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdx(pub usize);

/// Index of a mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElemIdx(pub usize);

impl NodeIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl ElemIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeIdx {
    fn from(i: usize) -> Self {
        NodeIdx(i)
    }
}

impl From<usize> for ElemIdx {
    fn from(i: usize) -> Self {
        ElemIdx(i)
    }
}

/// Discriminant for conforming mesh kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeshKind {
    /// Triangles in the plane.
    Mesh2D = 0,
    /// Triangles embedded in 3D (surfaces).
    Mesh2D5 = 1,
    /// Tetrahedra.
    Mesh3D = 2,
}

impl MeshKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeshKind::Mesh2D => "CMesh2D",
            MeshKind::Mesh2D5 => "CMesh2D5",
            MeshKind::Mesh3D => "CMesh3D",
        }
    }

    /// Minimum displacement tuple length for a transform over this kind.
    pub fn displacement_dim(&self) -> usize {
        match self {
            MeshKind::Mesh2D => 2,
            MeshKind::Mesh2D5 | MeshKind::Mesh3D => 3,
        }
    }
}

impl std::fmt::Display for MeshKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_kind_names() {
        assert_eq!(MeshKind::Mesh2D.to_string(), "CMesh2D");
        assert_eq!(MeshKind::Mesh2D5.as_str(), "CMesh2D5");
        assert_eq!(MeshKind::Mesh3D.displacement_dim(), 3);
        assert_eq!(MeshKind::Mesh2D.displacement_dim(), 2);
    }

    #[test]
    fn indices_order_by_slot() {
        assert!(NodeIdx(1) < NodeIdx(4));
        assert_eq!(ElemIdx::from(7).index(), 7);
    }
}
