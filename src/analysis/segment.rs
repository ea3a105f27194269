// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Recursive visibility equivalence along one polygon edge
//!
//! Two viewpoints are equivalent when the intersection of their visibility
//! volumes is a single closed genus-0 solid. An edge whose endpoints are
//! not equivalent is bisected until every piece is, or the depth bound is
//! reached.

use super::budget::InvocationBudget;
use super::polygon::Edge;
use crate::error::{Result, VisibilityError};
use crate::geometry::{topology, BooleanEngine, Mesh, Vertex3D};
use crate::visibility::{VisibilityVolumeProvider, VolumeParameters};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A leaf of the subdivision of one polygon edge
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    pub edge: Edge,
    pub start: Vertex3D,
    pub end: Vertex3D,
    /// Parameter range `[t0, t1]` along the polygon edge
    pub span: [f64; 2],
    pub depth: u32,
    /// Intersection of the two endpoint volumes
    pub volume: Mesh,
    pub equivalent: bool,
}

/// A branch that could not be evaluated
#[derive(Debug, Clone)]
pub struct BranchFailure {
    pub edge: Edge,
    pub span: [f64; 2],
    pub depth: u32,
    pub error: Arc<VisibilityError>,
}

/// Leaves and failed branches of one polygon edge, ordered along the edge.
#[derive(Debug, Clone)]
pub struct EdgeReport {
    pub edge: Edge,
    pub records: Vec<SegmentRecord>,
    pub failures: Vec<BranchFailure>,
}

impl EdgeReport {
    fn empty(edge: Edge) -> Self {
        Self {
            edge,
            records: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn append(&mut self, other: EdgeReport) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }

    fn failed(edge: Edge, error: Arc<VisibilityError>) -> Self {
        Self {
            edge,
            records: Vec::new(),
            failures: vec![BranchFailure {
                edge,
                span: [0.0, 1.0],
                depth: 0,
                error,
            }],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every leaf reached equivalence and no branch failed
    pub fn all_equivalent(&self) -> bool {
        self.is_complete() && self.records.iter().all(|r| r.equivalent)
    }

    pub fn subdivided(&self) -> bool {
        self.records.iter().map(|r| r.depth).chain(self.failures.iter().map(|f| f.depth)).any(|d| d > 0)
    }

    pub fn max_depth(&self) -> u32 {
        self.records.iter().map(|r| r.depth).max().unwrap_or(0)
    }
}

/// A piece of a polygon edge awaiting a verdict
#[derive(Debug, Clone, Copy)]
struct Segment {
    edge: Edge,
    start: Vertex3D,
    end: Vertex3D,
    span: [f64; 2],
    depth: u32,
}

impl Segment {
    fn bisect(&self) -> (Vertex3D, Segment, Segment) {
        let mid = nalgebra::center(&self.start, &self.end);
        let t_mid = (self.span[0] + self.span[1]) / 2.0;
        let left = Segment {
            end: mid,
            span: [self.span[0], t_mid],
            depth: self.depth + 1,
            ..*self
        };
        let right = Segment {
            start: mid,
            span: [t_mid, self.span[1]],
            depth: self.depth + 1,
            ..*self
        };
        (mid, left, right)
    }

    /// Stable token for the midpoint: `e<edge>_<k>of<2^(depth+1)>`
    fn midpoint_token(&self) -> String {
        let denominator = 1u64 << (self.depth + 1).min(63);
        let t_mid = (self.span[0] + self.span[1]) / 2.0;
        let numerator = (t_mid * denominator as f64).round() as u64;
        format!("e{}_{}of{}", self.edge.a, numerator, denominator)
    }
}

/// The decision procedure over one polygon edge
pub struct SegmentEquivalenceAnalyzer {
    provider: Arc<dyn VisibilityVolumeProvider>,
    engine: Arc<dyn BooleanEngine>,
    parameters: VolumeParameters,
    max_depth: u32,
    budget: Arc<InvocationBudget>,
}

impl SegmentEquivalenceAnalyzer {
    pub fn new(
        provider: Arc<dyn VisibilityVolumeProvider>,
        engine: Arc<dyn BooleanEngine>,
        parameters: VolumeParameters,
        max_depth: u32,
    ) -> Self {
        Self {
            provider,
            engine,
            parameters,
            max_depth,
            budget: Arc::new(InvocationBudget::unlimited()),
        }
    }

    pub fn with_budget(mut self, budget: Arc<InvocationBudget>) -> Self {
        self.budget = budget;
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn engine(&self) -> &dyn BooleanEngine {
        self.engine.as_ref()
    }

    pub fn budget(&self) -> &InvocationBudget {
        &self.budget
    }

    /// Visibility volume of a single viewpoint, charged to the budget
    pub fn volume_at(&self, viewpoint: Vertex3D, token: &str) -> Result<Mesh> {
        self.budget.charge(token)?;
        let request = self.parameters.request_for(viewpoint, token);
        let mesh = self.provider.compute(&request)?;
        debug!(
            token,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "visibility volume computed"
        );
        Ok(mesh)
    }

    /// Analyze an edge, computing both endpoint volumes first
    pub fn analyze_edge(&self, edge: Edge, start: Vertex3D, end: Vertex3D) -> EdgeReport {
        let volumes = rayon::join(
            || self.volume_at(start, &format!("v{}", edge.a)),
            || self.volume_at(end, &format!("v{}", edge.b)),
        );
        match volumes {
            (Ok(a), Ok(b)) => self.analyze_with_volumes(edge, start, end, Arc::new(a), Arc::new(b)),
            (Err(e), _) | (_, Err(e)) => EdgeReport::failed(edge, Arc::new(e)),
        }
    }

    /// Analyze an edge whose endpoint volumes are already known
    pub fn analyze_with_volumes(
        &self,
        edge: Edge,
        start: Vertex3D,
        end: Vertex3D,
        start_volume: Arc<Mesh>,
        end_volume: Arc<Mesh>,
    ) -> EdgeReport {
        let root = Segment {
            edge,
            start,
            end,
            span: [0.0, 1.0],
            depth: 0,
        };
        let mut report = EdgeReport {
            edge,
            records: Vec::new(),
            failures: Vec::new(),
        };
        self.resolve(root, start_volume, end_volume, &mut report);

        info!(
            edge = %edge,
            leaves = report.records.len(),
            failures = report.failures.len(),
            equivalent = report.all_equivalent(),
            "edge analyzed"
        );
        report
    }

    pub(crate) fn failed_edge(edge: Edge, error: Arc<VisibilityError>) -> EdgeReport {
        EdgeReport::failed(edge, error)
    }

    fn resolve(&self, segment: Segment, start_volume: Arc<Mesh>, end_volume: Arc<Mesh>, report: &mut EdgeReport) {
        let fail = |report: &mut EdgeReport, error: VisibilityError| {
            warn!(
                edge = %segment.edge,
                depth = segment.depth,
                t0 = segment.span[0],
                t1 = segment.span[1],
                error = %error,
                "branch failed"
            );
            report.failures.push(BranchFailure {
                edge: segment.edge,
                span: segment.span,
                depth: segment.depth,
                error: Arc::new(error),
            });
        };

        let intersection = match self.engine.intersect(&start_volume, &end_volume) {
            Ok(mesh) => mesh,
            Err(e) => return fail(report, e),
        };

        let equivalent = topology::is_simply_connected(&intersection);
        if equivalent || segment.depth >= self.max_depth {
            info!(
                edge = %segment.edge,
                depth = segment.depth,
                t0 = segment.span[0],
                t1 = segment.span[1],
                equivalent,
                euler = topology::euler_characteristic(&intersection),
                "segment verdict"
            );
            report.records.push(SegmentRecord {
                edge: segment.edge,
                start: segment.start,
                end: segment.end,
                span: segment.span,
                depth: segment.depth,
                volume: intersection,
                equivalent,
            });
            return;
        }
        drop(intersection);

        let (mid, left, right) = segment.bisect();
        debug!(edge = %segment.edge, depth = segment.depth, "subdividing segment");
        let mid_volume = match self.volume_at(mid, &segment.midpoint_token()) {
            Ok(mesh) => Arc::new(mesh),
            Err(e) => return fail(report, e),
        };

        let (left_report, right_report) = rayon::join(
            || {
                let mut sub = EdgeReport::empty(segment.edge);
                self.resolve(left, start_volume, Arc::clone(&mid_volume), &mut sub);
                sub
            },
            || {
                let mut sub = EdgeReport::empty(segment.edge);
                self.resolve(right, Arc::clone(&mid_volume), end_volume, &mut sub);
                sub
            },
        );
        report.append(left_report);
        report.append(right_report);
    }
}
