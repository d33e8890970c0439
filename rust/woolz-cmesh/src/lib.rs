// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Woolz Conforming-Mesh Transforms
//!
//! Piecewise-affine warping of Woolz objects by conforming meshes that carry
//! per-node displacements.
//!
//! Each mesh element maps its source simplex onto the displaced one with an
//! affine transform. Raster domains are rebuilt by scan-converting the
//! displaced elements into column intervals, and grey values are pulled back
//! through the inverse maps. Vertex lists, polygons, boundaries and other
//! meshes have their coordinates pushed forward through the enclosing
//! element.
//!
//! ```rust,ignore
//! use woolz_cmesh::{transform_obj, Interpolation};
//!
//! let warped = transform_obj(&image, &mesh_transform, Interpolation::Linear)?;
//! ```

pub mod affine;
pub mod batch;
pub mod bounds;
pub mod cache;
pub mod config;
pub mod displacement;
pub mod invert;
pub mod overlap;
pub mod resample;
pub mod scale;
pub mod scan;
pub mod to_domain;
pub mod transform;
pub mod vertex;
pub mod workspace2d;
pub mod workspace3d;

pub use affine::{
    solve_surface_triangle, solve_tetrahedron, solve_triangle, Affine2D, Affine3D, Solved,
};
pub use batch::{transform_many, transform_many_with};
pub use bounds::{bounding_box_2d, bounding_box_3d, nodes_and_edges, NodesAndEdges};
pub use cache::{CacheState, Direction, ScanElement};
pub use config::{Interpolation, Overlap, TransformConfig};
pub use displacement::{displacements, require_displacements};
pub use invert::{identity_transform, invert};
pub use scale::{scale_values, scaled_copy};
pub use scan::ScanInterval;
pub use to_domain::{to_domain, to_domain_values, to_domain_with};
pub use transform::{
    transform_mesh_in_place, transform_mesh_in_place_with, transform_obj, transform_obj_with,
};
pub use vertex::{
    transform_vertices_2d, transform_vertices_2d_with, transform_vertices_3d,
    transform_vertices_3d_with, Vertex2D, Vertex3D,
};
pub use workspace2d::ScanWorkspace2D;
pub use workspace3d::{ScanWorkspace3D, VoxelBox};

pub use woolz_core::{Error, Result};
