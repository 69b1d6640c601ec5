//! AMR dashboard
//!
//! Host-side glue around the facility map engine:
//!
//! ```text
//!  DashboardConfig (YAML + env) ──► DashboardState ◄── import (tokio read, sync decode)
//!                                      │     ▲
//!                                      │     └── SessionStore (restore / persist)
//!                                      ▼
//!                                  MapPanel ──► floorplan_view::MapCanvas
//!
//!  VideoDirectory ──► HLS endpoint per camera ──► player ──► CameraStatusBoard
//! ```
//!
//! The map engine itself lives in `floorplan-model` (documents, decoding,
//! safety profiles) and `floorplan-view` (transform, smoothing, rendering).

pub mod config;
pub mod import;
pub mod panel;
pub mod persist;
pub mod state;
pub mod telemetry;
pub mod video;

pub use config::{AvoidanceConfig, DashboardConfig, PersistenceConfig, RobotConfig, CONFIG_ENV};
pub use import::{
    decode_import, read_import, DocumentKind, ImportError, ImportQueue, Imported,
    ImportedDocument, RawImport,
};
pub use panel::MapPanel;
pub use persist::{
    FileStore, KeyValueStore, MemoryStore, RestoredSession, SessionStore, StoreError,
};
pub use state::DashboardState;
pub use telemetry::init_tracing;
pub use video::{
    CameraFeed, CameraStatusBoard, StreamEndpoint, StreamStatus, VideoConfig, VideoDirectory,
    VideoError,
};
