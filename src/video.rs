//! Camera feed boundary
//!
//! The dashboard does not play video. It hands the player one HLS endpoint
//! per camera (`{base}/{camera}/index.m3u8`, as served by MediaMTX) and takes
//! back the player's status strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_STREAM_BASE: &str = "http://localhost:8888";

/// Environment variable overriding the stream server base URL.
pub const STREAM_BASE_ENV: &str = "MEDIAMTX_URL";

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("invalid stream base URL `{url}`: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("camera id `{0}` cannot be used in a stream path")]
    InvalidCameraId(String),

    #[error("unknown camera `{0}`")]
    UnknownCamera(String),

    #[error("unknown stream status `{0}`")]
    UnknownStatus(String),
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl CameraFeed {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: String::new(),
            description: String::new(),
        }
    }

    fn described(mut self, location: &str, description: &str) -> Self {
        self.location = location.to_string();
        self.description = description.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub base_url: String,
    pub cameras: Vec<CameraFeed>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STREAM_BASE.to_string(),
            cameras: default_cameras(),
        }
    }
}

fn default_cameras() -> Vec<CameraFeed> {
    vec![
        CameraFeed::new("cam1", "Supply camera").described(
            "Warehouse entrance",
            "Watches the main entrance",
        ),
        CameraFeed::new("cam2", "Returns camera").described(
            "Storage area",
            "Watches the goods storage area",
        ),
        CameraFeed::new("cam3", "Unnamed camera").described(
            "Robot operations area",
            "Follows the AMR robots",
        ),
        CameraFeed::new("cam4", "Empty cart camera").described(
            "Charging station",
            "Watches the robot charging station",
        ),
    ]
}

// =============================================================================
// ENDPOINTS
// =============================================================================

/// What the player needs to show one camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub camera_id: String,
    pub name: String,
    pub url: Url,
}

#[derive(Debug, Clone)]
pub struct VideoDirectory {
    base: String,
    cameras: Vec<CameraFeed>,
}

impl VideoDirectory {
    pub fn new(config: &VideoConfig) -> Result<Self, VideoError> {
        let base = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|source| VideoError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        Ok(Self {
            base,
            cameras: config.cameras.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn cameras(&self) -> &[CameraFeed] {
        &self.cameras
    }

    pub fn camera(&self, id: &str) -> Option<&CameraFeed> {
        self.cameras.iter().find(|c| c.id == id)
    }

    /// HLS playlist URL for a camera. Works for ids not in the camera list.
    pub fn stream_url(&self, camera_id: &str) -> Result<Url, VideoError> {
        if camera_id.is_empty()
            || camera_id
                .chars()
                .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            return Err(VideoError::InvalidCameraId(camera_id.to_string()));
        }
        let raw = format!("{}/{}/index.m3u8", self.base, camera_id);
        Url::parse(&raw).map_err(|source| VideoError::InvalidBaseUrl {
            url: self.base.clone(),
            source,
        })
    }

    pub fn endpoint(&self, camera_id: &str) -> Result<StreamEndpoint, VideoError> {
        let camera = self
            .camera(camera_id)
            .ok_or_else(|| VideoError::UnknownCamera(camera_id.to_string()))?;
        Ok(StreamEndpoint {
            camera_id: camera.id.clone(),
            name: camera.name.clone(),
            url: self.stream_url(&camera.id)?,
        })
    }

    /// Endpoints for every configured camera; unusable ids are logged and left out.
    pub fn endpoints(&self) -> Vec<StreamEndpoint> {
        self.cameras
            .iter()
            .filter_map(|camera| match self.endpoint(&camera.id) {
                Ok(endpoint) => Some(endpoint),
                Err(err) => {
                    warn!(camera = %camera.id, error = %err, "skipping camera");
                    None
                }
            })
            .collect()
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Playback status reported back by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamStatus {
    Loading,
    Playing,
    Error,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Loading => "loading",
            StreamStatus::Playing => "playing",
            StreamStatus::Error => "error",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamStatus {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "loading" => Ok(StreamStatus::Loading),
            "playing" => Ok(StreamStatus::Playing),
            "error" => Ok(StreamStatus::Error),
            other => Err(VideoError::UnknownStatus(other.to_string())),
        }
    }
}

/// Latest status per camera.
#[derive(Debug, Clone, Default)]
pub struct CameraStatusBoard {
    statuses: BTreeMap<String, StreamStatus>,
}

impl CameraStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status string from the player. Unknown strings leave the board unchanged.
    pub fn report(&mut self, camera_id: &str, status: &str) -> Result<StreamStatus, VideoError> {
        let status: StreamStatus = status.parse()?;
        let previous = self.statuses.insert(camera_id.to_string(), status);
        if previous != Some(status) {
            match status {
                StreamStatus::Error => warn!(camera = camera_id, "stream failed"),
                StreamStatus::Playing => info!(camera = camera_id, "stream playing"),
                StreamStatus::Loading => debug!(camera = camera_id, "stream loading"),
            }
        }
        Ok(status)
    }

    pub fn status(&self, camera_id: &str) -> Option<StreamStatus> {
        self.statuses.get(camera_id).copied()
    }

    pub fn count(&self, status: StreamStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    pub fn forget(&mut self, camera_id: &str) -> Option<StreamStatus> {
        self.statuses.remove(camera_id)
    }
}
