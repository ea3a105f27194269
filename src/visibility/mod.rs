// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-viewpoint visibility volumes
//!
//! The analyzers only see [`VisibilityVolumeProvider`]; the external depth
//! renderer is one implementation, in-memory closures are another.

mod exclusive;
mod renderer;
mod request;

pub use exclusive::Exclusive;
pub use renderer::{renderer_document, ExternalRenderer, CONFIG_FILE_NAME};
pub use request::{Resolution, VisibilityVolumeRequest, VolumeParameters};

use crate::error::Result;
use crate::geometry::Mesh;
use std::sync::Arc;

/// Produces the closed visibility volume for one viewpoint.
pub trait VisibilityVolumeProvider: Send + Sync {
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh>;
}

impl<P: VisibilityVolumeProvider + ?Sized> VisibilityVolumeProvider for &P {
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh> {
        (**self).compute(request)
    }
}

impl<P: VisibilityVolumeProvider + ?Sized> VisibilityVolumeProvider for Arc<P> {
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh> {
        (**self).compute(request)
    }
}

impl<P: VisibilityVolumeProvider + ?Sized> VisibilityVolumeProvider for Box<P> {
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh> {
        (**self).compute(request)
    }
}

/// Provider backed by a closure
pub struct FnProvider<F> {
    compute: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&VisibilityVolumeRequest) -> Result<Mesh> + Send + Sync,
{
    pub fn new(compute: F) -> Self {
        Self { compute }
    }
}

impl<F> VisibilityVolumeProvider for FnProvider<F>
where
    F: Fn(&VisibilityVolumeRequest) -> Result<Mesh> + Send + Sync,
{
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh> {
        (self.compute)(request)
    }
}
