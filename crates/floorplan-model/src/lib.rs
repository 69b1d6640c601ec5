//! Facility navigation graph model
//!
//! Holds everything the map view reads but never mutates:
//!
//! ```text
//! map file (JSON) ──► GraphDecoder ──► MapDocument { nodes, edges, charge anchors }
//!                          ▲                 │
//!                          │                 └──► encode_nodes / encode_edges
//!                    DecodeOptions
//!                 (schema, element policy)
//!
//! security file (JSON) ──► SecurityDocument ──► AvoidanceResolver ──► clearance radius
//! ```
//!
//! Decoding is a pure transform. Malformed documents surface as [`FormatError`];
//! nothing in this crate panics on user input.

pub mod decode;
pub mod encode;
pub mod error;
pub mod security;
pub mod types;

pub use decode::{DecodeOptions, ElementPolicy, GraphDecoder, Schema, SchemaMode};
pub use encode::{encode_edges, encode_nodes};
pub use error::FormatError;
pub use security::{
    AvoidanceResolver, Clearance, ProfileId, SceneConfig, SecurityDocument, SecurityProfile,
    DEFAULT_AVOIDANCE_RADIUS,
};
pub use types::{
    ChargeAnchor, Edge, MapDocument, Node, NodeClass, NodeKey, NodeType, Point, RobotPose,
};
