//! Dashboard configuration
//!
//! Loaded from YAML. Every field has a default, so a partial file (or no file
//! at all) still yields a working dashboard.
//!
//! Resolution order for [`DashboardConfig::from_env`]:
//! 1. `.env` in the working directory (via dotenvy), if present
//! 2. `AMR_DASHBOARD_CONFIG` pointing at a YAML file
//! 3. Built-in defaults
//!
//! `MEDIAMTX_URL` overrides the stream base URL in every case.

use crate::video::{VideoConfig, STREAM_BASE_ENV};
use anyhow::{ensure, Context, Result};
use floorplan_model::{AvoidanceResolver, DecodeOptions, RobotPose, DEFAULT_AVOIDANCE_RADIUS};
use floorplan_view::{LayerRenderer, PathSmoother, RenderStyle, ViewLimits};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "AMR_DASHBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub render: RenderStyle,
    pub smoothing: PathSmoother,
    pub view: ViewLimits,
    pub decode: DecodeOptions,
    pub avoidance: AvoidanceConfig,
    pub video: VideoConfig,
    pub persistence: PersistenceConfig,
    pub robot: RobotConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Clearance radius (model units) when no profile applies.
    pub default_radius: f64,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            default_radius: DEFAULT_AVOIDANCE_RADIUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory for the file-backed store; in-memory when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub initial_pose: RobotPose,
}

impl DashboardConfig {
    /// Load and validate a YAML file. `MEDIAMTX_URL` is applied on top.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading dashboard configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut config = Self::parse_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate YAML text. No environment overrides.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config = Self::parse_yaml(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(path);
        }

        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn parse_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup(STREAM_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.video.base_url = base;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let view = &self.view;
        ensure!(
            view.min_scale > 0.0 && view.min_scale <= view.max_scale,
            "view scale bounds must satisfy 0 < min_scale <= max_scale (got {} and {})",
            view.min_scale,
            view.max_scale
        );
        ensure!(
            (view.min_scale..=view.max_scale).contains(&view.default_scale),
            "view.default_scale {} is outside [{}, {}]",
            view.default_scale,
            view.min_scale,
            view.max_scale
        );
        ensure!(
            view.zoom_step > 1.0,
            "view.zoom_step must be greater than 1 (got {})",
            view.zoom_step
        );
        ensure!(
            (0.0..=1.0).contains(&self.smoothing.tension),
            "smoothing.tension must be within [0, 1] (got {})",
            self.smoothing.tension
        );
        ensure!(
            self.smoothing.segments >= 1,
            "smoothing.segments must be at least 1"
        );
        ensure!(
            self.render.grid_pitch > 0.0,
            "render.grid_pitch must be positive (got {})",
            self.render.grid_pitch
        );
        ensure!(
            self.avoidance.default_radius.is_finite() && self.avoidance.default_radius > 0.0,
            "avoidance.default_radius must be positive (got {})",
            self.avoidance.default_radius
        );
        Url::parse(self.video.base_url.trim())
            .with_context(|| format!("video.base_url `{}` is not a URL", self.video.base_url))?;
        Ok(())
    }

    pub fn renderer(&self) -> LayerRenderer {
        LayerRenderer::new(
            self.render.clone(),
            self.smoothing,
            AvoidanceResolver::new(self.avoidance.default_radius),
        )
    }
}
