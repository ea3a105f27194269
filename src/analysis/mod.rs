// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Visibility equivalence analysis over polygon edges

mod budget;
mod polygon;
mod report;
mod segment;

pub use budget::InvocationBudget;
pub use polygon::{Edge, Polygon, PolygonReport, PolygonVisibilityDriver};
pub use report::{EdgeSummary, FailureSummary, RunSummary, SegmentSummary, VolumeSummary};
pub use segment::{BranchFailure, EdgeReport, SegmentEquivalenceAnalyzer, SegmentRecord};
