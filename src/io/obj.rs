// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wavefront OBJ reading and writing
//!
//! Only geometry is kept: `v` positions and `f` faces. Polygonal faces are
//! fan-triangulated; texture and normal references are ignored.

use crate::error::{Result, VisibilityError};
use crate::geometry::{Mesh, Triangle};
use nalgebra::Point3;
use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ObjParseError {
    pub line: usize,
    pub message: String,
}

/// Parse OBJ text into a triangle mesh
pub fn parse_obj(source: &str) -> std::result::Result<Mesh, ObjParseError> {
    let mut mesh = Mesh::new();

    for (number, raw) in source.lines().enumerate() {
        let line = number + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        let mut tokens = content.split_whitespace();
        let error = |message: String| ObjParseError { line, message };

        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| t.parse::<f64>().map_err(|e| error(format!("bad coordinate '{t}': {e}"))))
                    .collect::<std::result::Result<_, _>>()?;
                if coords.len() != 3 {
                    return Err(error("vertex needs three coordinates".to_string()));
                }
                mesh.add_vertex(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let count = mesh.vertex_count();
                let corners: Vec<usize> = tokens
                    .map(|t| resolve_index(t, count).map_err(error))
                    .collect::<std::result::Result<_, _>>()?;
                if corners.len() < 3 {
                    return Err(error(format!("face has {} vertices", corners.len())));
                }
                for k in 1..corners.len() - 1 {
                    mesh.add_triangle(Triangle::new([corners[0], corners[k], corners[k + 1]]));
                }
            }
            _ => {}
        }
    }

    Ok(mesh)
}

/// Resolve a face token (`7`, `7/1`, `7//3`, `-1`) to a zero-based index.
fn resolve_index(token: &str, vertex_count: usize) -> std::result::Result<usize, String> {
    let head = token.split('/').next().unwrap_or(token);
    let index: i64 = head
        .parse()
        .map_err(|e| format!("bad face index '{token}': {e}"))?;

    let resolved = match index {
        0 => return Err("face index 0 is invalid".to_string()),
        i if i > 0 => i - 1,
        i => vertex_count as i64 + i,
    };
    if resolved < 0 || resolved as usize >= vertex_count {
        return Err(format!("face index {index} out of range ({vertex_count} vertices)"));
    }
    Ok(resolved as usize)
}

/// Read an OBJ file, mapping any failure to `MeshReadFailure`
pub fn read_obj(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let failure = |reason: String| VisibilityError::MeshReadFailure {
        path: path.to_path_buf(),
        reason,
    };

    let source = fs::read_to_string(path).map_err(|e| failure(e.to_string()))?;
    let mesh = parse_obj(&source).map_err(|e| failure(e.to_string()))?;
    if mesh.is_empty() {
        return Err(failure("no faces".to_string()));
    }
    Ok(mesh)
}

/// Render a mesh as OBJ text
pub fn to_obj_string(mesh: &Mesh) -> String {
    let mut out = String::with_capacity(mesh.vertex_count() * 40 + mesh.triangle_count() * 24);
    for v in &mesh.vertices {
        let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
    }
    for t in &mesh.triangles {
        let [a, b, c] = t.indices;
        let _ = writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1);
    }
    out
}

/// Write a mesh to an OBJ file, creating parent directories as needed
pub fn write_obj(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    writer.write_all(to_obj_string(mesh).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use tempfile::TempDir;

    #[test]
    fn test_parse_quads_and_slashes() {
        let source = "\
# unit square pyramid
o pyramid
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0.5 0.5 1
vn 0 0 1
f 4//1 3//1 2//1 1//1
f 1/1 2/1 5/1
f 2 3 5
f -3 -1 -2
f 4 1 5
";
        let mesh = parse_obj(source).unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.triangle_count(), 6);
        assert!(mesh.is_closed());
        assert_eq!(mesh.triangles[4].indices, [2, 4, 3]);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 3\n").unwrap_err();
        assert_eq!(err.line, 3);

        let err = parse_obj("v 0 zero 0\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cube.obj");
        let cube = Primitive::cube(Point3::new(1.0, 2.0, 3.0), 2.0).to_mesh();

        write_obj(&cube, &path).unwrap();
        let back = read_obj(&path).unwrap();
        assert_eq!(back, cube);
    }

    #[test]
    fn test_missing_file_is_mesh_read_failure() {
        let err = read_obj("/nonexistent/volume.obj").unwrap_err();
        assert_eq!(err.kind(), "MeshReadFailure");
    }
}
