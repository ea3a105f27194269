// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Visibility volume requests and the sampling parameters they share

use crate::error::{Result, VisibilityError};
use crate::geometry::Vertex3D;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Depth-image sampling resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 40,
            height: 40,
        }
    }
}

/// Everything about a visibility volume except where it is seen from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParameters {
    /// Environment mesh the volume is computed against
    #[serde(skip)]
    pub environment: PathBuf,
    pub fov_degrees: f64,
    pub resolution: Resolution,
    /// Vertical bounds of the volume
    pub up_min: f64,
    pub up_max: f64,
    /// Radial bound around the viewpoint
    pub radius_max: f64,
    pub front: [f64; 3],
    pub up: [f64; 3],
}

impl Default for VolumeParameters {
    fn default() -> Self {
        Self {
            environment: PathBuf::new(),
            fov_degrees: 90.0,
            resolution: Resolution::default(),
            up_min: -4000.0,
            up_max: 4000.0,
            radius_max: 100.0,
            front: [1.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

impl VolumeParameters {
    pub fn with_environment(mut self, environment: impl Into<PathBuf>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn request_for(&self, viewpoint: Vertex3D, token: impl Into<String>) -> VisibilityVolumeRequest {
        VisibilityVolumeRequest {
            viewpoint,
            environment: self.environment.clone(),
            fov_degrees: self.fov_degrees,
            resolution: self.resolution,
            up_min: self.up_min,
            up_max: self.up_max,
            radius_max: self.radius_max,
            front: Vector3::from(self.front),
            up: Vector3::from(self.up),
            token: token.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(VisibilityError::DegenerateInputFailure(reason));
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return invalid(format!(
                "resolution {}x{} must be positive",
                self.resolution.width, self.resolution.height
            ));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees <= 360.0) {
            return invalid(format!("field of view {} out of range", self.fov_degrees));
        }
        if self.up_min >= self.up_max {
            return invalid(format!("up_min {} must be below up_max {}", self.up_min, self.up_max));
        }
        if self.radius_max <= 0.0 {
            return invalid(format!("radius_max {} must be positive", self.radius_max));
        }
        let front = Vector3::from(self.front);
        let up = Vector3::from(self.up);
        if front.norm() == 0.0 || up.norm() == 0.0 || front.cross(&up).norm() == 0.0 {
            return invalid("front and up axes must be non-zero and not parallel".to_string());
        }
        Ok(())
    }
}

/// One visibility volume to compute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityVolumeRequest {
    pub viewpoint: Vertex3D,
    pub environment: PathBuf,
    pub fov_degrees: f64,
    pub resolution: Resolution,
    pub up_min: f64,
    pub up_max: f64,
    pub radius_max: f64,
    pub front: Vector3<f64>,
    pub up: Vector3<f64>,
    /// Identity of the output, unique per request within a run
    pub token: String,
}
