// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyvis visibility kernel
//!
//! Decides, for each edge of a convex polygon of viewpoints, whether the
//! two endpoints see the environment the same way: whether the
//! intersection of their visibility volumes is a single genus-0 solid.
//! Edges that fail are bisected up to a depth bound, and the per-vertex
//! volumes are folded into one polygon-wide visibility volume.

pub mod analysis;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod visibility;

pub use analysis::{
    Edge, EdgeReport, InvocationBudget, Polygon, PolygonReport, PolygonVisibilityDriver, RunSummary,
    SegmentEquivalenceAnalyzer, SegmentRecord,
};
pub use config::AnalysisConfig;
pub use error::{BooleanFailure, Result, VisibilityError};
pub use geometry::{BooleanEngine, Mesh, MeshBooleanEngine, Primitive, Vertex3D};
pub use visibility::{ExternalRenderer, VisibilityVolumeProvider, VisibilityVolumeRequest, VolumeParameters};
