// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polygon-wide visibility evaluation

use super::budget::InvocationBudget;
use super::segment::{EdgeReport, SegmentEquivalenceAnalyzer, SegmentRecord};
use crate::error::{Result, VisibilityError};
use crate::geometry::{intersect_all, BooleanEngine, Mesh, Vertex3D};
use crate::visibility::{VisibilityVolumeProvider, VolumeParameters};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shortest polygon edge treated as non-degenerate
const MIN_EDGE_LENGTH: f64 = 1e-12;

/// A pair of adjacent polygon vertex indices, `b == (a + 1) % n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
}

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// The edge leaving vertex `index` of an `n`-gon
    pub fn of(index: usize, n: usize) -> Self {
        Self::new(index, (index + 1) % n)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// Closed loop of viewpoints, assumed convex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    vertices: Vec<Vertex3D>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vertex3D>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(VisibilityError::DegenerateInputFailure(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if let Some(i) = vertices.iter().position(|v| !v.coords.iter().all(|c| c.is_finite())) {
            return Err(VisibilityError::DegenerateInputFailure(format!(
                "polygon vertex {i} is not finite"
            )));
        }

        let n = vertices.len();
        for i in 0..n {
            let edge = Edge::of(i, n);
            if nalgebra::distance(&vertices[edge.a], &vertices[edge.b]) <= MIN_EDGE_LENGTH {
                return Err(VisibilityError::DegenerateInputFailure(format!(
                    "polygon edge {edge} has zero length"
                )));
            }
        }

        Ok(Self { vertices })
    }

    pub fn from_coordinates(coordinates: &[[f64; 3]]) -> Result<Self> {
        Self::new(coordinates.iter().map(|&c| Vertex3D::from(c)).collect())
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edges(&self) -> Vec<Edge> {
        (0..self.len()).map(|i| Edge::of(i, self.len())).collect()
    }

    pub fn endpoints(&self, edge: Edge) -> (Vertex3D, Vertex3D) {
        (self.vertices[edge.a], self.vertices[edge.b])
    }
}

type SharedVolume = std::result::Result<Arc<Mesh>, Arc<VisibilityError>>;

/// Runs the segment analysis over every edge and folds the vertex volumes.
pub struct PolygonVisibilityDriver {
    polygon: Polygon,
    provider: Arc<dyn VisibilityVolumeProvider>,
    engine: Arc<dyn BooleanEngine>,
    parameters: VolumeParameters,
    max_depth: u32,
    /// Limits applied afresh to every evaluation
    budget: InvocationBudget,
}

impl PolygonVisibilityDriver {
    pub fn new(
        polygon: Polygon,
        provider: Arc<dyn VisibilityVolumeProvider>,
        engine: Arc<dyn BooleanEngine>,
    ) -> Self {
        Self {
            polygon,
            provider,
            engine,
            parameters: VolumeParameters::default(),
            max_depth: 3,
            budget: InvocationBudget::unlimited(),
        }
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parameters(mut self, parameters: VolumeParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Limits for each call to [`evaluate`](Self::evaluate). Usage and the
    /// deadline restart with every call.
    pub fn budget(mut self, budget: InvocationBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Evaluate every edge and the polygon-wide volume.
    ///
    /// Each vertex volume is computed once and shared by both edges that
    /// touch it and by the fold.
    pub fn evaluate(&self) -> PolygonReport {
        let started = Instant::now();
        let budget = Arc::new(self.budget.renewed());
        let analyzer = SegmentEquivalenceAnalyzer::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.engine),
            self.parameters.clone(),
            self.max_depth,
        )
        .with_budget(Arc::clone(&budget));

        let n = self.polygon.len();
        let memo: Vec<OnceLock<SharedVolume>> = (0..n).map(|_| OnceLock::new()).collect();
        let vertex_volume = |index: usize| -> SharedVolume {
            memo[index]
                .get_or_init(|| {
                    analyzer
                        .volume_at(self.polygon.vertices[index], &format!("v{index}"))
                        .map(Arc::new)
                        .map_err(|e| {
                            warn!(vertex = index, error = %e, "vertex volume failed");
                            Arc::new(e)
                        })
                })
                .clone()
        };

        let (edges, polygon_volume) = rayon::join(
            || {
                self.polygon
                    .edges()
                    .into_par_iter()
                    .map(|edge| {
                        let (start, end) = self.polygon.endpoints(edge);
                        match (vertex_volume(edge.a), vertex_volume(edge.b)) {
                            (Ok(a), Ok(b)) => analyzer.analyze_with_volumes(edge, start, end, a, b),
                            (Err(e), _) | (_, Err(e)) => SegmentEquivalenceAnalyzer::failed_edge(edge, e),
                        }
                    })
                    .collect::<Vec<_>>()
            },
            || {
                let volumes = (0..n)
                    .into_par_iter()
                    .map(vertex_volume)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                intersect_all(analyzer.engine(), &volumes).map_err(Arc::new)
            },
        );

        let vertex_volumes: Vec<SharedVolume> = (0..n).map(vertex_volume).collect();
        let report = PolygonReport {
            polygon: self.polygon.clone(),
            edges,
            vertex_volumes,
            polygon_volume,
            max_depth: self.max_depth,
            elapsed: started.elapsed(),
            invocations: budget.used(),
        };

        info!(
            edges = report.edges.len(),
            leaves = report.leaf_count(),
            failures = report.failure_count(),
            invocations = report.invocations,
            elapsed_ms = report.elapsed.as_millis() as u64,
            polygon_volume = report.polygon_volume.is_ok(),
            "polygon evaluated"
        );
        report
    }
}

/// Everything one polygon evaluation produced
#[derive(Debug, Clone)]
pub struct PolygonReport {
    pub polygon: Polygon,
    /// One report per polygon edge, in edge order
    pub edges: Vec<EdgeReport>,
    pub vertex_volumes: Vec<std::result::Result<Arc<Mesh>, Arc<VisibilityError>>>,
    /// Intersection of all vertex volumes
    pub polygon_volume: std::result::Result<Mesh, Arc<VisibilityError>>,
    pub max_depth: u32,
    pub elapsed: Duration,
    /// Provider invocations charged to the budget
    pub invocations: usize,
}

impl PolygonReport {
    /// All leaf records, edge by edge, ordered along each edge
    pub fn records(&self) -> impl Iterator<Item = &SegmentRecord> {
        self.edges.iter().flat_map(|e| e.records.iter())
    }

    pub fn leaf_count(&self) -> usize {
        self.edges.iter().map(|e| e.records.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.edges.iter().map(|e| e.failures.len()).sum()
    }

    pub fn all_equivalent(&self) -> bool {
        self.edges.iter().all(EdgeReport::all_equivalent)
    }
}
