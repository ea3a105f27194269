// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Serializable run summary

use super::polygon::{Edge, PolygonReport};
use super::segment::{BranchFailure, EdgeReport, SegmentRecord};
use crate::geometry::{Mesh, TopologyCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON-friendly digest of a [`PolygonReport`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub polygon: Vec<[f64; 3]>,
    pub max_depth: u32,
    pub elapsed_seconds: f64,
    pub invocations: usize,
    pub leaf_count: usize,
    pub failure_count: usize,
    pub all_equivalent: bool,
    pub edges: Vec<EdgeSummary>,
    pub polygon_volume: VolumeSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSummary {
    pub edge: Edge,
    pub equivalent: bool,
    pub subdivided: bool,
    pub segments: Vec<SegmentSummary>,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub span: [f64; 2],
    pub depth: u32,
    pub equivalent: bool,
    pub topology: TopologyCounts,
    pub euler_characteristic: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    pub span: [f64; 2],
    pub depth: u32,
    pub kind: String,
    pub message: String,
}

/// Either the counts of a produced volume or the reason it is missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VolumeSummary {
    Computed {
        vertices: usize,
        triangles: usize,
        volume: f64,
    },
    Failed {
        kind: String,
        message: String,
    },
}

impl VolumeSummary {
    fn of(mesh: &Mesh) -> Self {
        Self::Computed {
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            volume: mesh.volume(),
        }
    }
}

impl From<&SegmentRecord> for SegmentSummary {
    fn from(record: &SegmentRecord) -> Self {
        let topology = TopologyCounts::of_mesh(&record.volume);
        Self {
            span: record.span,
            depth: record.depth,
            equivalent: record.equivalent,
            euler_characteristic: topology.euler_characteristic(),
            topology,
        }
    }
}

impl From<&BranchFailure> for FailureSummary {
    fn from(failure: &BranchFailure) -> Self {
        Self {
            span: failure.span,
            depth: failure.depth,
            kind: failure.error.kind().to_string(),
            message: failure.error.to_string(),
        }
    }
}

impl From<&EdgeReport> for EdgeSummary {
    fn from(report: &EdgeReport) -> Self {
        Self {
            edge: report.edge,
            equivalent: report.all_equivalent(),
            subdivided: report.subdivided(),
            segments: report.records.iter().map(SegmentSummary::from).collect(),
            failures: report.failures.iter().map(FailureSummary::from).collect(),
        }
    }
}

impl PolygonReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            generated_at: Utc::now(),
            polygon: self.polygon.vertices().iter().map(|v| [v.x, v.y, v.z]).collect(),
            max_depth: self.max_depth,
            elapsed_seconds: self.elapsed.as_secs_f64(),
            invocations: self.invocations,
            leaf_count: self.leaf_count(),
            failure_count: self.failure_count(),
            all_equivalent: self.all_equivalent(),
            edges: self.edges.iter().map(EdgeSummary::from).collect(),
            polygon_volume: match &self.polygon_volume {
                Ok(mesh) => VolumeSummary::of(mesh),
                Err(e) => VolumeSummary::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                },
            },
        }
    }
}

impl RunSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Polygon, PolygonVisibilityDriver};
    use crate::geometry::{MeshBooleanEngine, Primitive};
    use crate::visibility::{FnProvider, VisibilityVolumeRequest};
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use std::sync::Arc;

    #[test]
    fn test_summary_serializes() {
        let polygon =
            Polygon::from_coordinates(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();
        let provider = Arc::new(FnProvider::new(|_: &VisibilityVolumeRequest| {
            Ok(Primitive::cube(Point3::origin(), 2.0).to_mesh())
        }));
        let report = PolygonVisibilityDriver::new(polygon, provider, Arc::new(MeshBooleanEngine::default()))
            .evaluate();

        let summary = report.summary();
        assert_eq!(summary.leaf_count, 3);
        assert!(summary.all_equivalent);
        assert_eq!(summary.edges[1].segments[0].euler_characteristic, 2);
        match summary.polygon_volume {
            VolumeSummary::Computed {
                vertices,
                triangles,
                volume,
            } => {
                assert_eq!((vertices, triangles), (8, 12));
                assert_relative_eq!(volume, 8.0, epsilon = 1e-9);
            }
            ref other => panic!("unexpected polygon volume: {other:?}"),
        }

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["polygon_volume"]["status"], "computed");
        assert_eq!(json["edges"][2]["edge"]["a"], 2);
    }
}
