// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! External depth-renderer adapter
//!
//! Each call gets its own scratch directory holding the renderer
//! configuration and the mesh it writes. The directory is removed when the
//! call returns, on success and on failure alike.

use super::{VisibilityVolumeProvider, VisibilityVolumeRequest};
use crate::error::{Result, VisibilityError};
use crate::geometry::Mesh;
use crate::io::read_obj;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// File name of the configuration document inside the scratch directory
pub const CONFIG_FILE_NAME: &str = "visibility_config.yaml";

/// Longest slice of renderer output kept in a `RenderFailure`
const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// Runs `<binary> -c <config>` from the renderer's install root.
#[derive(Debug, Clone)]
pub struct ExternalRenderer {
    binary: PathBuf,
    install_root: PathBuf,
    archive_dir: Option<PathBuf>,
}

impl ExternalRenderer {
    pub fn new(binary: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            install_root: install_root.into(),
            archive_dir: None,
        }
    }

    /// Keep a copy of every produced volume as `<dir>/<token>.obj`
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, request: &VisibilityVolumeRequest, workdir: &Path) -> Result<Mesh> {
        let config_path = workdir.join(CONFIG_FILE_NAME);
        let output_path = workdir.join(format!("{}.obj", request.token));

        let document = renderer_document(request, &output_path);
        let text = serde_json::to_string_pretty(&document).map_err(std::io::Error::other)?;
        fs::write(&config_path, text)?;

        debug!(
            token = %request.token,
            binary = %self.binary.display(),
            config = %config_path.display(),
            "invoking renderer"
        );
        let output = Command::new(&self.binary)
            .arg("-c")
            .arg(&config_path)
            .current_dir(&self.install_root)
            .output()
            .map_err(|e| VisibilityError::RenderFailure {
                token: request.token.clone(),
                status: None,
                output: e.to_string(),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(VisibilityError::RenderFailure {
                token: request.token.clone(),
                status: output.status.code(),
                output: tail(&combined, MAX_DIAGNOSTIC_BYTES).to_string(),
            });
        }
        debug!(
            token = %request.token,
            stdout = %tail(&String::from_utf8_lossy(&output.stdout), MAX_DIAGNOSTIC_BYTES),
            "renderer finished"
        );

        let mesh = read_obj(&output_path)?;

        if let Some(dir) = &self.archive_dir {
            let archived = dir.join(format!("{}.obj", request.token));
            if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::copy(&output_path, &archived)) {
                warn!(path = %archived.display(), error = %e, "failed to archive visibility volume");
            }
        }

        Ok(mesh)
    }
}

impl VisibilityVolumeProvider for ExternalRenderer {
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh> {
        let workdir = tempfile::Builder::new().prefix("polyvis-").tempdir()?;
        self.run(request, workdir.path())
    }
}

fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[derive(Debug, Serialize)]
pub struct RendererDocument {
    world_coord_sys: CoordinateSystem,
    mesh: WorldMesh,
    visibility_vol: VolumeBlock,
}

#[derive(Debug, Serialize)]
struct CoordinateSystem {
    id: &'static str,
    origin: [f64; 3],
    up: [f64; 3],
    front: [f64; 3],
}

#[derive(Debug, Serialize)]
struct WorldMesh {
    id: &'static str,
    position: [f64; 3],
    scale: f64,
    #[serde(rename = "orientation axis, angle")]
    orientation: [f64; 4],
    format: &'static str,
    filename: String,
}

#[derive(Debug, Serialize)]
struct VolumeBlock {
    id: String,
    width: u32,
    height: u32,
    fov_degrees: f64,
    origin: [f64; 3],
    front: [f64; 3],
    up: [f64; 3],
    up_max: f64,
    up_min: f64,
    radius_max: f64,
    output_file: String,
}

/// Configuration document for one request.
///
/// Serialized as JSON, which the renderer's YAML reader accepts as a YAML
/// flow document.
pub fn renderer_document(request: &VisibilityVolumeRequest, output_file: &Path) -> RendererDocument {
    let v = &request.viewpoint;
    RendererDocument {
        world_coord_sys: CoordinateSystem {
            id: "world",
            origin: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            front: [1.0, 0.0, 0.0],
        },
        mesh: WorldMesh {
            id: "Mesh 1",
            position: [0.0, 0.0, 0.0],
            scale: 1.0,
            orientation: [1.0, 0.0, 0.0, 0.0],
            format: "OBJ",
            filename: request.environment.display().to_string(),
        },
        visibility_vol: VolumeBlock {
            id: format!("Volume {}", request.token),
            width: request.resolution.width,
            height: request.resolution.height,
            fov_degrees: request.fov_degrees,
            origin: [v.x, v.y, v.z],
            front: request.front.into(),
            up: request.up.into(),
            up_max: request.up_max,
            up_min: request.up_min,
            radius_max: request.radius_max,
            output_file: output_file.display().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::VolumeParameters;
    use nalgebra::Point3;

    fn request(token: &str) -> VisibilityVolumeRequest {
        VolumeParameters::default()
            .with_environment("/data/world.obj")
            .request_for(Point3::new(-110.5, 1.0, 1527.0), token)
    }

    #[test]
    fn test_document_fields() {
        let doc = renderer_document(&request("3"), Path::new("/tmp/out.obj"));
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["world_coord_sys"]["id"], "world");
        assert_eq!(value["mesh"]["filename"], "/data/world.obj");
        assert_eq!(value["mesh"]["orientation axis, angle"][0], 1.0);
        assert_eq!(value["visibility_vol"]["id"], "Volume 3");
        assert_eq!(value["visibility_vol"]["width"], 40);
        assert_eq!(value["visibility_vol"]["origin"][0], -110.5);
        assert_eq!(value["visibility_vol"]["up_min"], -4000.0);
        assert_eq!(value["visibility_vol"]["radius_max"], 100.0);
        assert_eq!(value["visibility_vol"]["output_file"], "/tmp/out.obj");
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("aé", 1), "");
    }

    #[test]
    fn test_missing_binary_is_render_failure() {
        let renderer = ExternalRenderer::new("/nonexistent/renderer", "/");
        let err = renderer.compute(&request("v0")).unwrap_err();
        assert_eq!(err.kind(), "RenderFailure");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::geometry::Primitive;
        use crate::io::to_obj_string;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Fake renderer: copies a canned OBJ to the configured output file.
        fn fake_renderer(dir: &Path, body: &str) -> PathBuf {
            let script = dir.join("renderer.sh");
            fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        #[test]
        fn test_runs_renderer_and_archives() {
            let dir = TempDir::new().unwrap();
            let cube = Primitive::cube(Point3::origin(), 2.0).to_mesh();
            let canned = dir.path().join("canned.obj");
            fs::write(&canned, to_obj_string(&cube)).unwrap();

            let script = fake_renderer(
                dir.path(),
                &format!(
                    "out=$(sed -n 's/.*\"output_file\": \"\\(.*\\)\".*/\\1/p' \"$2\")\ncp {} \"$out\"",
                    canned.display()
                ),
            );
            let archive = dir.path().join("archive");
            let renderer = ExternalRenderer::new(&script, dir.path()).with_archive_dir(&archive);

            let mesh = renderer.compute(&request("v1")).unwrap();
            assert_eq!(mesh, cube);
            assert!(archive.join("v1.obj").exists());
        }

        #[test]
        fn test_non_zero_exit_is_render_failure() {
            let dir = TempDir::new().unwrap();
            let script = fake_renderer(dir.path(), "echo 'no GL context' >&2\nexit 3");
            let renderer = ExternalRenderer::new(&script, dir.path());

            match renderer.compute(&request("v2")) {
                Err(VisibilityError::RenderFailure { token, status, output }) => {
                    assert_eq!(token, "v2");
                    assert_eq!(status, Some(3));
                    assert!(output.contains("no GL context"));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[test]
        fn test_missing_output_is_mesh_read_failure() {
            let dir = TempDir::new().unwrap();
            let script = fake_renderer(dir.path(), "exit 0");
            let renderer = ExternalRenderer::new(&script, dir.path());

            let err = renderer.compute(&request("v3")).unwrap_err();
            assert_eq!(err.kind(), "MeshReadFailure");
        }
    }
}
