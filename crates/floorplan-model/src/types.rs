//! Map document types
//!
//! A [`MapDocument`] is immutable once built. Importing a new file replaces
//! the whole document; there is no merge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in model space (facility units, typically millimetres).
///
/// Serializes as a two-element `[x, y]` array, matching the map file format.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

// =============================================================================
// NODES
// =============================================================================

/// Identity of a waypoint, unique within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Raw node type as found in the file: a numeric code or a textual label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeType {
    Code(i64),
    Label(String),
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Code(0)
    }
}

impl NodeType {
    /// Interpret a JSON value as a node type. Integral floats become codes.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(NodeType::Code).or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| NodeType::Code(f as i64))
            }),
            Value::String(s) => Some(NodeType::Label(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            NodeType::Code(code) => Value::from(*code),
            NodeType::Label(label) => Value::String(label.clone()),
        }
    }
}

/// Rendering class of a waypoint, derived from its type and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// Ordinary waypoint (type code 0).
    Regular,
    /// Terminal / work station (type code 6).
    Terminal,
    /// Special-purpose node.
    Special,
    /// Charging point.
    Charge,
    /// Any other type code.
    Other,
}

/// Numeric code of terminal waypoints.
pub const TERMINAL_TYPE_CODE: i64 = 6;

/// A navigable point in the facility graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub node_type: NodeType,
    /// Content field of the file; doubles as the key when no explicit key exists.
    pub content: String,
    /// Display name when it differs from the content.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_turn: i64,
    #[serde(default)]
    pub shelf_is_turn: i64,
    #[serde(default)]
    pub extra_types: Vec<Value>,
    /// Fields of a keyed record this model does not interpret, kept verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// File values of interpreted fields that the typed form cannot reproduce,
    /// e.g. a numeric key or a boolean `isTurn`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub literals: Map<String, Value>,
}

impl Node {
    pub fn new(key: impl Into<NodeKey>, x: f64, y: f64) -> Self {
        let key = key.into();
        Self {
            content: key.as_str().to_string(),
            key,
            x,
            y,
            node_type: NodeType::default(),
            name: None,
            is_turn: 0,
            shelf_is_turn: 0,
            extra_types: Vec::new(),
            extra: Map::new(),
            literals: Map::new(),
        }
    }

    pub fn with_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Name shown to operators: the explicit name, falling back to content.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.content)
    }

    /// Classify for the waypoint palette.
    ///
    /// Textual types and keys mentioning `special` / `charge` win over codes.
    pub fn class(&self) -> NodeClass {
        let key = self.key.as_str().to_ascii_lowercase();
        if let NodeType::Label(label) = &self.node_type {
            let label = label.to_ascii_lowercase();
            if label.contains("charge") {
                return NodeClass::Charge;
            }
            if label.contains("special") {
                return NodeClass::Special;
            }
            if label.contains("terminal") {
                return NodeClass::Terminal;
            }
        }
        if key.contains("special") {
            return NodeClass::Special;
        }
        if key.contains("charge") {
            return NodeClass::Charge;
        }
        match self.node_type {
            NodeType::Code(0) | NodeType::Label(_) => NodeClass::Regular,
            NodeType::Code(TERMINAL_TYPE_CODE) => NodeClass::Terminal,
            NodeType::Code(_) => NodeClass::Other,
        }
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// A connector between two waypoints with optional curve control points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub start: NodeKey,
    pub end: NodeKey,
    #[serde(default)]
    pub left_width: f64,
    #[serde(default)]
    pub right_width: f64,
    #[serde(default)]
    pub start_expand: f64,
    #[serde(default)]
    pub end_expand: f64,
    /// Control points ordered start to end. Empty means "straight".
    #[serde(default)]
    pub path: Vec<Point>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub literals: Map<String, Value>,
}

impl Edge {
    pub fn new(start: impl Into<NodeKey>, end: impl Into<NodeKey>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            left_width: 0.0,
            right_width: 0.0,
            start_expand: 0.0,
            end_expand: 0.0,
            path: Vec::new(),
            extra: Map::new(),
            literals: Map::new(),
        }
    }

    pub fn with_path(mut self, path: Vec<Point>) -> Self {
        self.path = path;
        self
    }

    /// Whether the edge carries enough control points to be smoothed.
    pub fn has_curve(&self) -> bool {
        self.path.len() >= 2
    }
}

/// A charging point attached to a waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeAnchor {
    pub node: NodeKey,
    #[serde(default)]
    pub offset: f64,
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// Plain serde representation; [`MapDocument`] adds the key index on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentParts {
    width: f64,
    height: f64,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(default)]
    charge_anchors: Vec<ChargeAnchor>,
}

/// Parsed facility navigation graph plus its dimensions and charge anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentParts", into = "DocumentParts")]
pub struct MapDocument {
    width: f64,
    height: f64,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    charge_anchors: Vec<ChargeAnchor>,
    index: HashMap<NodeKey, usize>,
}

impl MapDocument {
    /// Build a document. Later nodes repeating an earlier key are dropped.
    pub fn new(
        width: f64,
        height: f64,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        charge_anchors: Vec<ChargeAnchor>,
    ) -> Self {
        let mut unique = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if index.contains_key(&node.key) {
                tracing::warn!(key = %node.key, "duplicate node key, keeping first occurrence");
                continue;
            }
            index.insert(node.key.clone(), unique.len());
            unique.push(node);
        }
        Self {
            width,
            height,
            nodes: unique,
            edges,
            charge_anchors,
            index,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Half the model extent; the view transform centres on this point.
    pub fn half_extent(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn charge_anchors(&self) -> &[ChargeAnchor] {
        &self.charge_anchors
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    /// Resolve a charge anchor: by key first, then by display name.
    pub fn anchor_node(&self, anchor: &ChargeAnchor) -> Option<&Node> {
        self.node(anchor.node.as_str()).or_else(|| {
            self.nodes
                .iter()
                .find(|n| n.display_name() == anchor.node.as_str())
        })
    }

    /// Both endpoints of an edge, or `None` if either key is unknown.
    pub fn endpoints(&self, edge: &Edge) -> Option<(&Node, &Node)> {
        Some((self.node(edge.start.as_str())?, self.node(edge.end.as_str())?))
    }

    /// Largest coordinates reached by nodes and path control points.
    pub fn content_extent(nodes: &[Node], edges: &[Edge]) -> Point {
        let points = nodes
            .iter()
            .map(Node::position)
            .chain(edges.iter().flat_map(|e| e.path.iter().copied()));
        points.fold(Point::default(), |acc, p| {
            Point::new(acc.x.max(p.x), acc.y.max(p.y))
        })
    }
}

impl From<DocumentParts> for MapDocument {
    fn from(parts: DocumentParts) -> Self {
        MapDocument::new(
            parts.width,
            parts.height,
            parts.nodes,
            parts.edges,
            parts.charge_anchors,
        )
    }
}

impl From<MapDocument> for DocumentParts {
    fn from(doc: MapDocument) -> Self {
        DocumentParts {
            width: doc.width,
            height: doc.height,
            nodes: doc.nodes,
            edges: doc.edges,
            charge_anchors: doc.charge_anchors,
        }
    }
}

// =============================================================================
// ROBOT
// =============================================================================

/// Live robot pose in model space. Heading is in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPose {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub heading: f64,
}

impl Default for RobotPose {
    fn default() -> Self {
        Self {
            x: 49_043.0,
            y: 74_172.0,
            heading: 0.0,
        }
    }
}

impl RobotPose {
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn heading_degrees(&self) -> f64 {
        self.heading.to_degrees().rem_euclid(360.0)
    }
}
