// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Woolz Core
//!
//! Object model for Woolz image processing.
//!
//! Woolz objects pair a domain with optional values. Raster domains are
//! run-length interval lists in 2D ([`IntervalDomain`]) and stacks of them in
//! 3D ([`PlaneDomain`]), valued by rectangular grey tables. Conforming meshes
//! ([`CMesh2D`], [`CMesh2D5`], [`CMesh3D`]) store nodes and elements in slot
//! tables with stable indices, and [`IndexedValues`] attach fixed-shape
//! numeric tuples to those indices out of band.

pub mod arena;
pub mod builders;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod grey;
pub mod keys;
pub mod lookup;
pub mod mesh;
pub mod object;
pub mod polygon;
pub mod serialization;
pub mod spatial;
pub mod table;
pub mod values;

pub use arena::EntityTable;
pub use domain::{Interval, IntervalDomain, LineMask, PlaneDomain};
pub use error::{Error, ErrorKind, Result};
pub use grey::{GreyBuffer, GreyType, GreyValue};
pub use keys::{ElemIdx, MeshKind, NodeIdx};
pub use lookup::{GreyLookup, Sample};
pub use mesh::{Aabb, CMesh, CMesh2D, CMesh2D5, CMesh3D, ElementContains, Location, MeshPoint};
pub use object::{CMeshDomain, DomainObject2D, DomainObject3D, MeshObject, Object};
pub use polygon::{BoundKind, BoundList, PolygonDomain, PolygonVertices};
pub use serialization::MeshSnapshot;
pub use spatial::MeshIndex;
pub use table::{ValueTable2D, VoxelValues};
pub use values::{IndexedValues, ValueAttach};

pub use nalgebra::{Point2, Point3, Vector2, Vector3};
