// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boundary exports of an evaluated polygon

use super::obj::write_obj;
use crate::analysis::{PolygonReport, RunSummary};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write every leaf volume into `dir`.
///
/// An edge resolved at its root is written as
/// `segment<n>_visibility_volume.obj`; the pieces of a subdivided edge as
/// `segment<n>_<k>_visibility_volume.obj`. Edges are numbered from 1. `k`
/// is the position of the piece's start along the edge, counted in slots of
/// the edge's finest subdivision, so a failed branch leaves a gap instead
/// of renumbering the pieces after it.
pub fn export_segment_volumes(report: &PolygonReport, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(report.leaf_count());
    for edge_report in &report.edges {
        let number = edge_report.edge.a + 1;
        let finest = edge_report
            .records
            .iter()
            .map(|r| r.depth)
            .chain(edge_report.failures.iter().map(|f| f.depth))
            .max()
            .unwrap_or(0);
        let slots = 2f64.powi(finest.min(52) as i32);
        for record in &edge_report.records {
            let name = if edge_report.subdivided() {
                let k = (record.span[0] * slots).round() as u64 + 1;
                format!("segment{number}_{k}_visibility_volume.obj")
            } else {
                format!("segment{number}_visibility_volume.obj")
            };
            let path = dir.join(name);
            write_obj(&record.volume, &path)?;
            written.push(path);
        }
    }

    info!(dir = %dir.display(), files = written.len(), "segment volumes exported");
    Ok(written)
}

/// Write the folded polygon volume. Returns false if there is none.
pub fn export_polygon_volume(report: &PolygonReport, path: impl AsRef<Path>) -> Result<bool> {
    match &report.polygon_volume {
        Ok(mesh) => {
            write_obj(mesh, path.as_ref())?;
            info!(path = %path.as_ref().display(), "polygon volume exported");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

pub fn write_summary(summary: &RunSummary, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let text = summary.to_json().map_err(std::io::Error::other)?;
    fs::write(path, text)?;
    Ok(())
}
