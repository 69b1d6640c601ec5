//! Safety profiles and avoidance clearance
//!
//! A security file lists avoidance scenes under `AvoidSceneSet`. Each scene
//! carries clearances for the unloaded and loaded robot; the map view only
//! draws the unloaded forward clearance around the robot.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const SCENE_SET: &str = "AvoidSceneSet";

/// Clearance radius used when no profile supplies a usable value.
pub const DEFAULT_AVOIDANCE_RADIUS: f64 = 500.0;

/// Profile identifier. Numeric and textual ids never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileId {
    Num(i64),
    Text(String),
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileId::Num(n) => write!(f, "{n}"),
            ProfileId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProfileId {
    fn from(n: i64) -> Self {
        ProfileId::Num(n)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        ProfileId::Text(s.to_string())
    }
}

/// Clearance distances for one load state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Clearance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub noload: Clearance,
    #[serde(default)]
    pub loaded: Clearance,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityProfile {
    pub id: ProfileId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: SceneConfig,
}

impl SecurityProfile {
    /// Label for pickers: the name, or the id when unnamed.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Parsed security file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecurityDocument {
    #[serde(rename = "AvoidSceneSet")]
    pub profiles: Vec<SecurityProfile>,
}

impl SecurityDocument {
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, FormatError> {
        let root = value.as_object().ok_or(FormatError::NotAnObject)?;
        let scenes = match root.get(SCENE_SET) {
            None | Some(Value::Null) => return Err(FormatError::MissingField(SCENE_SET)),
            Some(Value::Array(scenes)) => scenes,
            Some(_) => return Err(FormatError::invalid(SCENE_SET, "expected an array")),
        };

        let profiles = scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| {
                SecurityProfile::deserialize(scene)
                    .map_err(|e| FormatError::invalid(SCENE_SET, format!("profile #{i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(profiles = profiles.len(), "decoded security document");
        Ok(Self { profiles })
    }

    pub fn profile(&self, id: &ProfileId) -> Option<&SecurityProfile> {
        self.profiles.iter().find(|p| &p.id == id)
    }

    /// Profile selected right after an import.
    pub fn first_profile_id(&self) -> Option<&ProfileId> {
        self.profiles.first().map(|p| &p.id)
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves the avoidance-zone radius drawn around the robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceResolver {
    pub default_radius: f64,
}

impl Default for AvoidanceResolver {
    fn default() -> Self {
        Self {
            default_radius: DEFAULT_AVOIDANCE_RADIUS,
        }
    }
}

impl AvoidanceResolver {
    pub fn new(default_radius: f64) -> Self {
        Self { default_radius }
    }

    pub fn active_profile<'a>(
        &self,
        document: Option<&'a SecurityDocument>,
        selected: Option<&ProfileId>,
    ) -> Option<&'a SecurityProfile> {
        document?.profile(selected?)
    }

    /// Unloaded forward clearance of the selected profile.
    ///
    /// Falls back to the default when there is no document, no selection, no
    /// matching profile, or the value is missing, zero, negative or not finite.
    pub fn forward_clearance(
        &self,
        document: Option<&SecurityDocument>,
        selected: Option<&ProfileId>,
    ) -> f64 {
        self.active_profile(document, selected)
            .and_then(|p| p.config.noload.forward)
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(self.default_radius)
    }
}
