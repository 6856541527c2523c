//! Spatial vertex store, routing network and network simplification

pub mod network;
pub mod optimizer;
pub mod shape;
pub mod vertices;

pub use network::{
    EdgeData, EdgeEnumerator, RoutingEdge, RoutingNetwork, DEFAULT_MAX_EDGE_DISTANCE,
    MAX_PROFILE_COUNT,
};
pub use shape::Shape;
pub use vertices::{VertexStore, NO_VERTEX};
