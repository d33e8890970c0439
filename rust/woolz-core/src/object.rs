// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Woolz objects: a domain plus optional values.
//!
//! Domains and meshes are shared through [`Arc`], so a derived object (for
//! example a transform's inverse, or a domain built from a mesh) can refer to
//! the same storage as its source.

use std::sync::Arc;

use crate::domain::{IntervalDomain, PlaneDomain};
use crate::keys::MeshKind;
use crate::mesh::{CMesh2D, CMesh2D5, CMesh3D};
use crate::polygon::{BoundList, PolygonDomain};
use crate::table::{ValueTable2D, VoxelValues};
use crate::values::IndexedValues;

/// A shared conforming mesh of one of the three kinds.
#[derive(Debug, Clone)]
pub enum CMeshDomain {
    Mesh2D(Arc<CMesh2D>),
    Mesh2D5(Arc<CMesh2D5>),
    Mesh3D(Arc<CMesh3D>),
}

impl CMeshDomain {
    pub fn kind(&self) -> MeshKind {
        match self {
            CMeshDomain::Mesh2D(_) => MeshKind::Mesh2D,
            CMeshDomain::Mesh2D5(_) => MeshKind::Mesh2D5,
            CMeshDomain::Mesh3D(_) => MeshKind::Mesh3D,
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            CMeshDomain::Mesh2D(m) => m.num_nodes(),
            CMeshDomain::Mesh2D5(m) => m.num_nodes(),
            CMeshDomain::Mesh3D(m) => m.num_nodes(),
        }
    }

    pub fn max_nodes(&self) -> usize {
        match self {
            CMeshDomain::Mesh2D(m) => m.max_nodes(),
            CMeshDomain::Mesh2D5(m) => m.max_nodes(),
            CMeshDomain::Mesh3D(m) => m.max_nodes(),
        }
    }

    pub fn num_elements(&self) -> usize {
        match self {
            CMeshDomain::Mesh2D(m) => m.num_elements(),
            CMeshDomain::Mesh2D5(m) => m.num_elements(),
            CMeshDomain::Mesh3D(m) => m.num_elements(),
        }
    }

    pub fn max_elements(&self) -> usize {
        match self {
            CMeshDomain::Mesh2D(m) => m.max_elements(),
            CMeshDomain::Mesh2D5(m) => m.max_elements(),
            CMeshDomain::Mesh3D(m) => m.max_elements(),
        }
    }
}

impl From<CMesh2D> for CMeshDomain {
    fn from(m: CMesh2D) -> Self {
        CMeshDomain::Mesh2D(Arc::new(m))
    }
}

impl From<CMesh2D5> for CMeshDomain {
    fn from(m: CMesh2D5) -> Self {
        CMeshDomain::Mesh2D5(Arc::new(m))
    }
}

impl From<CMesh3D> for CMeshDomain {
    fn from(m: CMesh3D) -> Self {
        CMeshDomain::Mesh3D(Arc::new(m))
    }
}

/// A mesh with optional indexed values.
///
/// With node-attached double displacements this is a mesh transform.
#[derive(Debug, Clone)]
pub struct MeshObject {
    pub mesh: CMeshDomain,
    pub values: Option<IndexedValues>,
}

impl MeshObject {
    pub fn new(mesh: impl Into<CMeshDomain>, values: Option<IndexedValues>) -> Self {
        Self {
            mesh: mesh.into(),
            values,
        }
    }

    #[inline]
    pub fn kind(&self) -> MeshKind {
        self.mesh.kind()
    }
}

/// A 2D interval domain with an optional value table.
#[derive(Debug, Clone)]
pub struct DomainObject2D {
    pub domain: Arc<IntervalDomain>,
    pub values: Option<ValueTable2D>,
}

impl DomainObject2D {
    pub fn new(domain: IntervalDomain, values: Option<ValueTable2D>) -> Self {
        Self {
            domain: Arc::new(domain),
            values,
        }
    }
}

/// A 3D plane domain with optional voxel values.
#[derive(Debug, Clone)]
pub struct DomainObject3D {
    pub domain: Arc<PlaneDomain>,
    pub values: Option<VoxelValues>,
}

impl DomainObject3D {
    pub fn new(domain: PlaneDomain, values: Option<VoxelValues>) -> Self {
        Self {
            domain: Arc::new(domain),
            values,
        }
    }
}

/// A Woolz object.
#[derive(Debug, Clone)]
pub enum Object {
    Empty,
    Domain2D(DomainObject2D),
    Domain3D(DomainObject3D),
    Polygon(PolygonDomain),
    Boundary(BoundList),
    Mesh(MeshObject),
    Compound(Vec<Object>),
}

impl Object {
    /// Name of the object kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Empty => "Empty",
            Object::Domain2D(_) => "Domain2D",
            Object::Domain3D(_) => "Domain3D",
            Object::Polygon(_) => "Polygon",
            Object::Boundary(_) => "Boundary",
            Object::Mesh(m) => m.kind().as_str(),
            Object::Compound(_) => "Compound",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Object::Empty)
    }

    pub fn as_domain_2d(&self) -> Option<&DomainObject2D> {
        match self {
            Object::Domain2D(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_domain_3d(&self) -> Option<&DomainObject3D> {
        match self {
            Object::Domain3D(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshObject> {
        match self {
            Object::Mesh(m) => Some(m),
            _ => None,
        }
    }
}

impl From<DomainObject2D> for Object {
    fn from(d: DomainObject2D) -> Self {
        Object::Domain2D(d)
    }
}

impl From<DomainObject3D> for Object {
    fn from(d: DomainObject3D) -> Self {
        Object::Domain3D(d)
    }
}

impl From<MeshObject> for Object {
    fn from(m: MeshObject) -> Self {
        Object::Mesh(m)
    }
}
