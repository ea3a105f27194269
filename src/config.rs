// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Analysis configuration system

use crate::analysis::{InvocationBudget, Polygon, PolygonVisibilityDriver};
use crate::geometry::{BooleanConfig, BooleanEngine, MeshBooleanEngine};
use crate::visibility::{Exclusive, ExternalRenderer, VisibilityVolumeProvider, VolumeParameters};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// File picked up by [`AnalysisConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "polyvis.toml";

/// Full description of one polygon evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Subdivision depth bound per edge
    pub max_depth: u32,
    /// Polygon vertices in order
    pub polygon: Vec<[f64; 3]>,
    pub volume: VolumeParameters,
    pub renderer: RendererConfig,
    pub boolean: BooleanConfig,
    pub budget: BudgetConfig,
    pub output: OutputConfig,
}

/// External depth renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub binary: PathBuf,
    /// Working directory of every renderer process
    pub install_root: PathBuf,
    /// Environment mesh the volumes are computed against
    pub world_mesh: PathBuf,
    /// Keep a copy of every raw volume here
    pub archive_dir: Option<PathBuf>,
    /// Serialize renderer invocations
    pub exclusive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_invocations: Option<usize>,
    pub max_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub segment_dir: PathBuf,
    pub polygon_file: PathBuf,
    pub report_file: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            polygon: vec![
                [-110.965, 1.0, 1527.085],
                [-80.035, 1.0, 1526.637],
                [-88.306, 1.0, 1499.653],
            ],
            volume: VolumeParameters::default(),
            renderer: RendererConfig::default(),
            boolean: BooleanConfig::default(),
            budget: BudgetConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ogl_depthrenderer"),
            install_root: PathBuf::from("."),
            world_mesh: PathBuf::from("world.obj"),
            archive_dir: None,
            exclusive: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            segment_dir: PathBuf::from("output"),
            polygon_file: PathBuf::from("output/polygon_visibility_volume.obj"),
            report_file: Some(PathBuf::from("output/run_summary.json")),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `polyvis.toml` if present, then apply `POLYVIS_*` environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(binary) = lookup("POLYVIS_RENDERER") {
            self.renderer.binary = PathBuf::from(binary);
        }
        if let Some(root) = lookup("POLYVIS_INSTALL_ROOT") {
            self.renderer.install_root = PathBuf::from(root);
        }
        if let Some(world) = lookup("POLYVIS_WORLD_MESH") {
            self.renderer.world_mesh = PathBuf::from(world);
        }
        if let Some(depth) = lookup("POLYVIS_MAX_DEPTH") {
            self.max_depth = depth
                .trim()
                .parse()
                .with_context(|| format!("Invalid POLYVIS_MAX_DEPTH: {depth:?}"))?;
        }
        if let Some(dir) = lookup("POLYVIS_OUTPUT_DIR") {
            self.set_output_dir(dir);
        }
        Ok(())
    }

    /// Put every output under `dir`, keeping the file names
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let rebase = |path: &Path, fallback: &str| dir.join(path.file_name().unwrap_or(OsStr::new(fallback)));
        self.output.polygon_file = rebase(&self.output.polygon_file, "polygon_visibility_volume.obj");
        self.output.report_file = self
            .output
            .report_file
            .as_deref()
            .map(|p| rebase(p, "run_summary.json"));
        self.output.segment_dir = dir;
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.polygon.len() < 3 {
            bail!("polygon needs at least 3 vertices, got {}", self.polygon.len());
        }
        if self.max_depth > 16 {
            bail!("max_depth {} is too large (at most 16)", self.max_depth);
        }
        self.volume.validate().context("Invalid volume parameters")?;
        if self.boolean.weld_tolerance <= 0.0 {
            bail!("weld_tolerance must be positive, got {}", self.boolean.weld_tolerance);
        }
        Ok(())
    }

    pub fn polygon(&self) -> Result<Polygon> {
        Polygon::from_coordinates(&self.polygon).context("Invalid polygon")
    }

    /// Volume parameters bound to the configured world mesh
    pub fn volume_parameters(&self) -> VolumeParameters {
        self.volume.clone().with_environment(&self.renderer.world_mesh)
    }

    pub fn invocation_budget(&self) -> InvocationBudget {
        InvocationBudget::new(
            self.budget.max_invocations,
            self.budget.max_seconds.map(Duration::from_secs),
        )
    }

    pub fn engine(&self) -> MeshBooleanEngine {
        MeshBooleanEngine::new(self.boolean.clone())
    }

    pub fn renderer(&self) -> ExternalRenderer {
        let renderer = ExternalRenderer::new(&self.renderer.binary, &self.renderer.install_root);
        match &self.renderer.archive_dir {
            Some(dir) => renderer.with_archive_dir(dir),
            None => renderer,
        }
    }

    /// Driver wired to the external renderer
    pub fn driver(&self) -> Result<PolygonVisibilityDriver> {
        let provider: Arc<dyn VisibilityVolumeProvider> = if self.renderer.exclusive {
            Arc::new(Exclusive::new(self.renderer()))
        } else {
            Arc::new(self.renderer())
        };
        self.driver_with(provider, Arc::new(self.engine()))
    }

    /// Driver with caller-supplied provider and engine
    pub fn driver_with(
        &self,
        provider: Arc<dyn VisibilityVolumeProvider>,
        engine: Arc<dyn BooleanEngine>,
    ) -> Result<PolygonVisibilityDriver> {
        self.validate()?;
        Ok(PolygonVisibilityDriver::new(self.polygon()?, provider, engine)
            .max_depth(self.max_depth)
            .parameters(self.volume_parameters())
            .budget(self.invocation_budget()))
    }
}
