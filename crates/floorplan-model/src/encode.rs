//! Keyed-schema encoding
//!
//! The inverse of keyed decoding: each node/edge becomes a value tuple laid
//! out in key-list order. Fields the model does not interpret come back from
//! the record's `extra` map; anything unknown encodes as `null`. Interpreted
//! fields whose file value the typed form cannot reproduce (numeric keys,
//! boolean flags) go out as that value while the field still reads the same.

use crate::decode::{edge_field, edge_literal_holds, node_field, node_literal_holds};
use crate::types::{Edge, Node};
use serde_json::{Number, Value};

/// Largest magnitude still written as an integer literal.
const INTEGER_LIMIT: f64 = 9.0e15;

/// Whole numbers go out as integers so files survive a decode/encode cycle unchanged.
pub(crate) fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < INTEGER_LIMIT {
        Value::from(v as i64)
    } else {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

pub(crate) fn typed_node_value(node: &Node, key: &str) -> Value {
    use node_field as f;
    match key {
        f::KEY => Value::String(node.key.to_string()),
        f::X => number_value(node.x),
        f::Y => number_value(node.y),
        f::TYPE => node.node_type.to_value(),
        f::CONTENT => Value::String(node.content.clone()),
        f::NAME => node
            .name
            .as_ref()
            .map_or(Value::Null, |n| Value::String(n.clone())),
        f::IS_TURN => Value::from(node.is_turn),
        f::SHELF_IS_TURN => Value::from(node.shelf_is_turn),
        f::EXTRA_TYPES => Value::Array(node.extra_types.clone()),
        other => node.extra.get(other).cloned().unwrap_or(Value::Null),
    }
}

pub(crate) fn typed_edge_value(edge: &Edge, key: &str) -> Value {
    use edge_field as f;
    match key {
        f::START => Value::String(edge.start.to_string()),
        f::END => Value::String(edge.end.to_string()),
        f::LEFT_WIDTH => number_value(edge.left_width),
        f::RIGHT_WIDTH => number_value(edge.right_width),
        f::START_EXPAND | f::START_EXPAND_SHORT => number_value(edge.start_expand),
        f::END_EXPAND | f::END_EXPAND_SHORT => number_value(edge.end_expand),
        f::PATH => Value::Array(
            edge.path
                .iter()
                .map(|p| Value::Array(vec![number_value(p.x), number_value(p.y)]))
                .collect(),
        ),
        other => edge.extra.get(other).cloned().unwrap_or(Value::Null),
    }
}

fn node_value(node: &Node, key: &str) -> Value {
    match node.literals.get(key) {
        Some(literal) if node_literal_holds(node, key, literal) => literal.clone(),
        _ => typed_node_value(node, key),
    }
}

fn edge_value(edge: &Edge, key: &str) -> Value {
    match edge.literals.get(key) {
        Some(literal) if edge_literal_holds(edge, key, literal) => literal.clone(),
        _ => typed_edge_value(edge, key),
    }
}

/// Encode nodes as `nodeArr` tuples for the given `nodeKeys`.
pub fn encode_nodes(nodes: &[Node], keys: &[String]) -> Vec<Value> {
    nodes
        .iter()
        .map(|node| Value::Array(keys.iter().map(|k| node_value(node, k)).collect()))
        .collect()
}

/// Encode edges as `lineArr` tuples for the given `lineKeys`.
pub fn encode_edges(edges: &[Edge], keys: &[String]) -> Vec<Value> {
    edges
        .iter()
        .map(|edge| Value::Array(keys.iter().map(|k| edge_value(edge, k)).collect()))
        .collect()
}
