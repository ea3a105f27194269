// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - meshes, topology and solid intersection

mod bbox;
pub mod boolean;
mod bvh;
mod mesh;
mod pool;
pub mod predicates;
pub mod primitives;
pub mod topology;
pub mod triangulate;

pub use bbox::BoundingBox;
pub use boolean::{
    intersect_all, BooleanConfig, BooleanEngine, BooleanOutput, BooleanStats, FaceLocation,
    MeshBooleanEngine,
};
pub use bvh::BVH;
pub use mesh::{edge_key, Mesh, Triangle};
pub use pool::PointPool;
pub use primitives::Primitive;
pub use topology::{TopologyCounts, TopologyReport};

/// A point in world space
pub type Vertex3D = nalgebra::Point3<f64>;
