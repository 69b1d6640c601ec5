//! Loading DashboardConfig from YAML files.

use amr_dashboard::video::STREAM_BASE_ENV;
use amr_dashboard::{DashboardConfig, VideoDirectory, CONFIG_ENV};
use floorplan_model::{ElementPolicy, RobotPose};
use floorplan_view::ResetMode;
use pretty_assertions::assert_eq;
use std::io::Write;

const FULL: &str = r#"
render:
  node_radius: 120
  label_chars: 4
smoothing:
  tension: 0.3
  segments: 16
view:
  default_scale: 0.01
  reset_mode: fit
decode:
  malformed: skip
avoidance:
  default_radius: 800
video:
  base_url: http://cams.example:8888
  cameras:
    - id: dock
      name: Dock camera
persistence:
  dir: /var/lib/amr-dashboard
robot:
  initial_pose:
    x: 1000
    y: 2000
    heading: 1.5
"#;

fn write_yaml(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn full_file_loads() {
    let file = write_yaml(FULL);
    let config = DashboardConfig::load(file.path()).unwrap();

    assert_eq!(config.render.node_radius, 120.0);
    assert_eq!(config.render.label_chars, 4);
    assert_eq!(config.smoothing.segments, 16);
    assert_eq!(config.view.default_scale, 0.01);
    assert_eq!(config.view.reset_mode, ResetMode::Fit);
    assert_eq!(config.decode.malformed, ElementPolicy::Skip);
    assert_eq!(config.avoidance.default_radius, 800.0);
    assert_eq!(config.video.cameras.len(), 1);
    assert_eq!(
        config.persistence.dir.as_deref(),
        Some(std::path::Path::new("/var/lib/amr-dashboard"))
    );
    assert_eq!(config.robot.initial_pose, RobotPose::new(1000.0, 2000.0, 1.5));

    // unless the environment overrides it, the file's base URL wins
    if std::env::var(STREAM_BASE_ENV).is_err() {
        let directory = VideoDirectory::new(&config.video).unwrap();
        assert_eq!(
            directory.stream_url("dock").unwrap().as_str(),
            "http://cams.example:8888/dock/index.m3u8"
        );
    }
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = DashboardConfig::load(&path).unwrap_err();
    assert!(
        format!("{err:#}").contains("absent.yaml"),
        "unexpected error: {err:#}"
    );
}

#[test]
fn malformed_yaml_is_an_error() {
    let file = write_yaml("view: [not, a, map]\n");
    let err = DashboardConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse"));
}

#[test]
fn invalid_values_are_rejected_with_context() {
    let file = write_yaml("view:\n  zoom_step: 0.5\n");
    let err = DashboardConfig::load(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Invalid configuration"), "{message}");
    assert!(message.contains("zoom_step"), "{message}");
}

#[test]
fn env_var_points_at_config_file() {
    let file = write_yaml("avoidance:\n  default_radius: 640\n");
    std::env::set_var(CONFIG_ENV, file.path());
    let config = DashboardConfig::from_env();
    std::env::remove_var(CONFIG_ENV);
    assert_eq!(config.unwrap().avoidance.default_radius, 640.0);
}
