//! GraphDecoder - map file records into a [`MapDocument`]
//!
//! Two schemas exist in the wild, neither carrying a version tag:
//!
//! - **Keyed**: `nodeKeys` / `lineKeys` name the fields, `nodeArr` / `lineArr`
//!   hold same-length value tuples. Tuples are zipped positionally into records.
//! - **Positional**: no key lists. Node tuples are
//!   `[x, y, type, content, name?, isTurn?, shelfIsTurn?, extraTypes?]`,
//!   edge tuples `[startNode, endNode, leftWidth?, rightWidth?, startExpand?, endExpand?, path?]`.
//!
//! [`SchemaMode::Auto`] picks by the presence of the key lists. A file can be
//! forced into either schema through [`DecodeOptions`].

use crate::encode::{typed_edge_value, typed_node_value};
use crate::error::FormatError;
use crate::types::{ChargeAnchor, Edge, MapDocument, Node, NodeKey, NodeType, Point};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

// =============================================================================
// FIELD NAMES
// =============================================================================

pub(crate) const NODE_KEYS: &str = "nodeKeys";
pub(crate) const LINE_KEYS: &str = "lineKeys";
pub(crate) const NODE_ARR: &str = "nodeArr";
pub(crate) const LINE_ARR: &str = "lineArr";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const CHARGE_COOR: &str = "chargeCoor";

/// Minimum positional node tuple: x, y, type, content.
pub const MIN_NODE_TUPLE: usize = 4;
/// Minimum positional edge tuple: start, end.
pub const MIN_EDGE_TUPLE: usize = 2;

/// Node record fields understood by the decoder (keyed schema).
pub(crate) mod node_field {
    pub const KEY: &str = "key";
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const TYPE: &str = "type";
    pub const CONTENT: &str = "content";
    pub const NAME: &str = "name";
    pub const IS_TURN: &str = "isTurn";
    pub const SHELF_IS_TURN: &str = "shelfIsTurn";
    pub const EXTRA_TYPES: &str = "extraTypes";

    pub const ALL: &[&str] = &[
        KEY,
        X,
        Y,
        TYPE,
        CONTENT,
        NAME,
        IS_TURN,
        SHELF_IS_TURN,
        EXTRA_TYPES,
    ];
}

/// Edge record fields understood by the decoder (keyed schema).
pub(crate) mod edge_field {
    pub const START: &str = "startNode";
    pub const END: &str = "endNode";
    pub const LEFT_WIDTH: &str = "leftWidth";
    pub const RIGHT_WIDTH: &str = "rightWidth";
    pub const START_EXPAND: &str = "startExpandDistance";
    pub const START_EXPAND_SHORT: &str = "startExpand";
    pub const END_EXPAND: &str = "endExpandDistance";
    pub const END_EXPAND_SHORT: &str = "endExpand";
    pub const PATH: &str = "path";

    pub const ALL: &[&str] = &[
        START,
        END,
        LEFT_WIDTH,
        RIGHT_WIDTH,
        START_EXPAND,
        START_EXPAND_SHORT,
        END_EXPAND,
        END_EXPAND_SHORT,
        PATH,
    ];
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Which schema to decode with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Keyed when `nodeKeys` or `lineKeys` is present, positional otherwise.
    #[default]
    Auto,
    Keyed,
    /// Ignore any key lists and read tuples positionally.
    Positional,
}

/// What to do with a single node/edge that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementPolicy {
    /// Fail the whole document with a [`FormatError`].
    #[default]
    Reject,
    /// Log a warning and omit the element.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub schema: SchemaMode,
    pub malformed: ElementPolicy,
}

/// The schema a document was decoded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Keyed {
        node_keys: Vec<String>,
        line_keys: Vec<String>,
    },
    Positional,
}

// =============================================================================
// DECODER
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphDecoder {
    options: DecodeOptions,
}

impl GraphDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Decode map file text.
    pub fn decode_str(&self, text: &str) -> Result<MapDocument, FormatError> {
        let value: Value = serde_json::from_str(text)?;
        self.decode(&value)
    }

    /// Decode an already parsed map file.
    pub fn decode(&self, value: &Value) -> Result<MapDocument, FormatError> {
        let root = value.as_object().ok_or(FormatError::NotAnObject)?;
        let schema = self.detect(root)?;

        let node_tuples = tuples(root, NODE_ARR)?.ok_or(FormatError::MissingField(NODE_ARR))?;
        let edge_tuples = tuples(root, LINE_ARR)?.unwrap_or_default();

        let (nodes, edges) = match &schema {
            Schema::Keyed {
                node_keys,
                line_keys,
            } => (
                self.collect(node_tuples, |i, t| keyed_node(i, node_keys, t))?,
                self.collect(edge_tuples, |i, t| keyed_edge(i, line_keys, t))?,
            ),
            Schema::Positional => (
                self.collect(node_tuples, positional_node)?,
                self.collect(edge_tuples, positional_edge)?,
            ),
        };

        let charge_anchors = charge_anchors(root)?;

        let extent = MapDocument::content_extent(&nodes, &edges);
        let width = dimension(root, WIDTH)?.unwrap_or(extent.x);
        let height = dimension(root, HEIGHT)?.unwrap_or(extent.y);

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            anchors = charge_anchors.len(),
            keyed = matches!(schema, Schema::Keyed { .. }),
            "decoded map document"
        );

        Ok(MapDocument::new(
            width,
            height,
            nodes,
            edges,
            charge_anchors,
        ))
    }

    /// Decide which schema applies to a document root.
    pub fn detect(&self, root: &Map<String, Value>) -> Result<Schema, FormatError> {
        let has_keys = root.contains_key(NODE_KEYS) || root.contains_key(LINE_KEYS);
        match self.options.schema {
            SchemaMode::Positional => Ok(Schema::Positional),
            SchemaMode::Auto if !has_keys => Ok(Schema::Positional),
            SchemaMode::Auto | SchemaMode::Keyed => {
                let node_keys = key_list(root, NODE_KEYS)?;
                let line_keys = key_list(root, LINE_KEYS)?;
                if !root.contains_key(NODE_ARR) {
                    return Err(FormatError::MissingField(NODE_ARR));
                }
                Ok(Schema::Keyed {
                    node_keys,
                    line_keys,
                })
            }
        }
    }

    fn collect<T>(
        &self,
        tuples: &[Value],
        decode_one: impl Fn(usize, &Value) -> Result<T, FormatError>,
    ) -> Result<Vec<T>, FormatError> {
        let mut out = Vec::with_capacity(tuples.len());
        for (index, tuple) in tuples.iter().enumerate() {
            match decode_one(index, tuple) {
                Ok(item) => out.push(item),
                Err(err)
                    if err.is_element_error()
                        && self.options.malformed == ElementPolicy::Skip =>
                {
                    warn!(%err, "skipping malformed element");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }
}

// =============================================================================
// TOP-LEVEL FIELDS
// =============================================================================

fn key_list(root: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, FormatError> {
    let list = root
        .get(field)
        .ok_or(FormatError::MissingField(field))?
        .as_array()
        .ok_or_else(|| FormatError::invalid(field, "expected an array of field names"))?;
    list.iter()
        .map(|k| {
            k.as_str()
                .map(str::to_string)
                .ok_or_else(|| FormatError::invalid(field, format!("non-string key {k}")))
        })
        .collect()
}

fn tuples<'a>(
    root: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a [Value]>, FormatError> {
    match root.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.as_slice())),
        Some(_) => Err(FormatError::invalid(field, "expected an array")),
    }
}

fn dimension(root: &Map<String, Value>, field: &'static str) -> Result<Option<f64>, FormatError> {
    match root.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Some)
            .ok_or_else(|| FormatError::invalid(field, "expected a non-negative number")),
    }
}

fn charge_anchors(root: &Map<String, Value>) -> Result<Vec<ChargeAnchor>, FormatError> {
    let Some(entries) = tuples(root, CHARGE_COOR)? else {
        return Ok(Vec::new());
    };
    let mut anchors = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let parsed = entry.as_array().and_then(|pair| {
            let node = pair.first().and_then(key_text)?;
            let offset = pair.get(1).and_then(Value::as_f64).unwrap_or(0.0);
            Some(ChargeAnchor {
                node: NodeKey::new(node),
                offset,
            })
        });
        match parsed {
            Some(anchor) => anchors.push(anchor),
            None => warn!(index, "skipping malformed charge anchor"),
        }
    }
    Ok(anchors)
}

// =============================================================================
// VALUE HELPERS
// =============================================================================

/// Strings and integers are both accepted as keys.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

fn flag_or_zero(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Bool(b)) => i64::from(*b),
        Some(v) => v.as_i64().unwrap_or(0),
        None => 0,
    }
}

fn coordinate(value: Option<&Value>, what: &str) -> Result<f64, String> {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("`{what}` must be a number"))
}

fn path_points(value: Option<&Value>) -> Result<Vec<Point>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(points)) => points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let pair = p
                    .as_array()
                    .filter(|pair| pair.len() >= 2)
                    .ok_or_else(|| format!("path point {i} is not an [x, y] pair"))?;
                Ok(Point::new(
                    coordinate(pair.first(), "path x")?,
                    coordinate(pair.get(1), "path y")?,
                ))
            })
            .collect(),
        Some(_) => Err("`path` must be an array".to_string()),
    }
}

// =============================================================================
// POSITIONAL SCHEMA
// =============================================================================

fn positional_node(index: usize, tuple: &Value) -> Result<Node, FormatError> {
    let malformed = |reason: String| FormatError::MalformedNode { index, reason };
    let fields = tuple
        .as_array()
        .ok_or_else(|| malformed("expected an array".into()))?;
    if fields.len() < MIN_NODE_TUPLE {
        return Err(malformed(format!(
            "expected at least {MIN_NODE_TUPLE} fields, found {}",
            fields.len()
        )));
    }

    let x = coordinate(fields.first(), "x").map_err(malformed)?;
    let y = coordinate(fields.get(1), "y").map_err(malformed)?;
    let node_type = fields
        .get(2)
        .and_then(NodeType::from_value)
        .unwrap_or_default();
    let content = fields
        .get(3)
        .and_then(key_text)
        .ok_or_else(|| malformed("`content` must be a string or number".into()))?;
    let name = fields.get(4).and_then(key_text);
    if fields.len() > 8 {
        debug!(index, extra = fields.len() - 8, "ignoring trailing node fields");
    }

    Ok(Node {
        key: NodeKey::new(content.clone()),
        x,
        y,
        node_type,
        content,
        name,
        is_turn: flag_or_zero(fields.get(5)),
        shelf_is_turn: flag_or_zero(fields.get(6)),
        extra_types: fields
            .get(7)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        extra: Map::new(),
        literals: Map::new(),
    })
}

fn positional_edge(index: usize, tuple: &Value) -> Result<Edge, FormatError> {
    let malformed = |reason: String| FormatError::MalformedEdge { index, reason };
    let fields = tuple
        .as_array()
        .ok_or_else(|| malformed("expected an array".into()))?;
    if fields.len() < MIN_EDGE_TUPLE {
        return Err(malformed(format!(
            "expected at least {MIN_EDGE_TUPLE} fields, found {}",
            fields.len()
        )));
    }

    let start = fields
        .first()
        .and_then(key_text)
        .ok_or_else(|| malformed("missing start node".into()))?;
    let end = fields
        .get(1)
        .and_then(key_text)
        .ok_or_else(|| malformed("missing end node".into()))?;

    Ok(Edge {
        start: NodeKey::new(start),
        end: NodeKey::new(end),
        left_width: number_or_zero(fields.get(2)),
        right_width: number_or_zero(fields.get(3)),
        start_expand: number_or_zero(fields.get(4)),
        end_expand: number_or_zero(fields.get(5)),
        path: path_points(fields.get(6)).map_err(malformed)?,
        extra: Map::new(),
        literals: Map::new(),
    })
}

// =============================================================================
// KEYED SCHEMA
// =============================================================================

/// Zip a value tuple with its key list. Short tuples leave trailing keys unset.
fn zip_record<'a>(keys: &'a [String], tuple: &'a [Value]) -> HashMap<&'a str, &'a Value> {
    if tuple.len() != keys.len() {
        debug!(
            keys = keys.len(),
            values = tuple.len(),
            "record length differs from key list"
        );
    }
    keys.iter().map(String::as_str).zip(tuple.iter()).collect()
}

fn leftovers(record: &HashMap<&str, &Value>, known: &[&str]) -> Map<String, Value> {
    record
        .iter()
        .filter(|(k, _)| !known.contains(*k))
        .map(|(k, v)| (k.to_string(), (*v).clone()))
        .collect()
}

/// Interpreted fields whose file value differs from what the typed field encodes to.
fn literals(
    record: &HashMap<&str, &Value>,
    known: &[&str],
    typed: impl Fn(&str) -> Value,
) -> Map<String, Value> {
    record
        .iter()
        .filter(|(k, v)| known.contains(*k) && typed(**k) != ***v)
        .map(|(k, v)| (k.to_string(), (*v).clone()))
        .collect()
}

/// Whether a kept file value still reads back as the node's current field.
pub(crate) fn node_literal_holds(node: &Node, field: &str, literal: &Value) -> bool {
    use node_field as f;
    match field {
        f::KEY => key_text(literal).as_deref() == Some(node.key.as_str()),
        f::X => literal.as_f64() == Some(node.x),
        f::Y => literal.as_f64() == Some(node.y),
        f::TYPE => NodeType::from_value(literal).unwrap_or_default() == node.node_type,
        f::CONTENT => {
            key_text(literal).as_deref().unwrap_or(node.key.as_str()) == node.content
        }
        f::NAME => key_text(literal) == node.name,
        f::IS_TURN => flag_or_zero(Some(literal)) == node.is_turn,
        f::SHELF_IS_TURN => flag_or_zero(Some(literal)) == node.shelf_is_turn,
        f::EXTRA_TYPES => {
            literal.as_array().map_or(node.extra_types.is_empty(), |a| *a == node.extra_types)
        }
        _ => false,
    }
}

/// Whether a kept file value still reads back as the edge's current field.
pub(crate) fn edge_literal_holds(edge: &Edge, field: &str, literal: &Value) -> bool {
    use edge_field as f;
    match field {
        f::START => key_text(literal).as_deref() == Some(edge.start.as_str()),
        f::END => key_text(literal).as_deref() == Some(edge.end.as_str()),
        f::LEFT_WIDTH => number_or_zero(Some(literal)) == edge.left_width,
        f::RIGHT_WIDTH => number_or_zero(Some(literal)) == edge.right_width,
        f::START_EXPAND | f::START_EXPAND_SHORT => {
            number_or_zero(Some(literal)) == edge.start_expand
        }
        f::END_EXPAND | f::END_EXPAND_SHORT => number_or_zero(Some(literal)) == edge.end_expand,
        f::PATH => path_points(Some(literal)).is_ok_and(|path| path == edge.path),
        _ => false,
    }
}

fn keyed_node(index: usize, keys: &[String], tuple: &Value) -> Result<Node, FormatError> {
    use node_field as f;
    let malformed = |reason: String| FormatError::MalformedNode { index, reason };
    let values = tuple
        .as_array()
        .ok_or_else(|| malformed("expected an array".into()))?;
    let record = zip_record(keys, values);
    let get = |field: &str| record.get(field).copied();

    let x = coordinate(get(f::X), "x").map_err(malformed)?;
    let y = coordinate(get(f::Y), "y").map_err(malformed)?;

    let key = get(f::KEY)
        .and_then(key_text)
        .or_else(|| get(f::CONTENT).and_then(key_text))
        .or_else(|| get(f::NAME).and_then(key_text))
        .ok_or_else(|| malformed("no `key`, `content` or `name` field".into()))?;
    let content = get(f::CONTENT)
        .and_then(key_text)
        .unwrap_or_else(|| key.clone());

    let mut node = Node {
        key: NodeKey::new(key),
        x,
        y,
        node_type: get(f::TYPE)
            .and_then(NodeType::from_value)
            .unwrap_or_default(),
        content,
        name: get(f::NAME).and_then(key_text),
        is_turn: flag_or_zero(get(f::IS_TURN)),
        shelf_is_turn: flag_or_zero(get(f::SHELF_IS_TURN)),
        extra_types: get(f::EXTRA_TYPES)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        extra: leftovers(&record, f::ALL),
        literals: Map::new(),
    };
    node.literals = literals(&record, f::ALL, |k| typed_node_value(&node, k));
    Ok(node)
}

fn keyed_edge(index: usize, keys: &[String], tuple: &Value) -> Result<Edge, FormatError> {
    use edge_field as f;
    let malformed = |reason: String| FormatError::MalformedEdge { index, reason };
    let values = tuple
        .as_array()
        .ok_or_else(|| malformed("expected an array".into()))?;
    let record = zip_record(keys, values);
    let get = |field: &str| record.get(field).copied();

    let start = get(f::START)
        .and_then(key_text)
        .ok_or_else(|| malformed(format!("missing `{}`", f::START)))?;
    let end = get(f::END)
        .and_then(key_text)
        .ok_or_else(|| malformed(format!("missing `{}`", f::END)))?;

    let mut edge = Edge {
        start: NodeKey::new(start),
        end: NodeKey::new(end),
        left_width: number_or_zero(get(f::LEFT_WIDTH)),
        right_width: number_or_zero(get(f::RIGHT_WIDTH)),
        start_expand: number_or_zero(get(f::START_EXPAND).or_else(|| get(f::START_EXPAND_SHORT))),
        end_expand: number_or_zero(get(f::END_EXPAND).or_else(|| get(f::END_EXPAND_SHORT))),
        path: path_points(get(f::PATH)).map_err(malformed)?,
        extra: leftovers(&record, f::ALL),
        literals: Map::new(),
    };
    edge.literals = literals(&record, f::ALL, |k| typed_edge_value(&edge, k));
    Ok(edge)
}
