// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Configuration to exported files

use anyhow::Result;
use nalgebra::Point3;
use polyvis::config::AnalysisConfig;
use polyvis::geometry::{topology, MeshBooleanEngine, Primitive};
use polyvis::io;
use polyvis::visibility::{FnProvider, VisibilityVolumeRequest};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[test]
fn test_configured_run_exports_everything() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = AnalysisConfig::default();
    config.max_depth = 1;
    config.renderer.world_mesh = dir.path().join("world.obj");
    config.volume.fov_degrees = 75.0;
    config.set_output_dir(dir.path().join("out"));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let provider = Arc::new(FnProvider::new(move |request: &VisibilityVolumeRequest| {
        log.lock().unwrap().push((request.token.clone(), request.environment.clone(), request.fov_degrees));
        Ok(Primitive::sphere(Point3::new(-90.0, 1.0, 1515.0), 50.0, 16).to_mesh())
    }));

    let report = config
        .driver_with(provider, Arc::new(MeshBooleanEngine::default()))?
        .evaluate();
    assert_eq!(report.leaf_count(), 3);
    assert!(report.all_equivalent());

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert!(requests
        .iter()
        .all(|(_, env, fov)| *env == config.renderer.world_mesh && *fov == 75.0));
    let mut tokens: Vec<_> = requests.into_iter().map(|(token, _, _)| token).collect();
    tokens.sort();
    assert_eq!(tokens, ["v0", "v1", "v2"]);

    let written = io::export_segment_volumes(&report, &config.output.segment_dir)?;
    assert_eq!(written.len(), 3);
    assert!(config.output.segment_dir.join("segment1_visibility_volume.obj").exists());

    assert!(io::export_polygon_volume(&report, &config.output.polygon_file)?);
    let polygon_volume = io::read_obj(&config.output.polygon_file)?;
    assert!(topology::is_simply_connected(&polygon_volume));

    let report_file = config.output.report_file.clone().unwrap();
    io::write_summary(&report.summary(), &report_file)?;
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_file)?)?;
    assert_eq!(json["leaf_count"], 3);
    assert_eq!(json["max_depth"], 1);
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected_before_running() {
    let mut config = AnalysisConfig::default();
    config.polygon = vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 1.0]];
    let provider = Arc::new(FnProvider::new(|_: &VisibilityVolumeRequest| {
        Ok(Primitive::cube(Point3::origin(), 1.0).to_mesh())
    }));

    let err = config
        .driver_with(provider, Arc::new(MeshBooleanEngine::default()))
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("zero length"));
}
