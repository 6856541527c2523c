//! # Butterfly-network
//!
//! Builds compact routing networks from OpenStreetMap data.
//!
//! Ways usable by at least one vehicle become edges between vertices at
//! their ends and junctions; intermediate nodes become shape points. Tags
//! are split into profile tags (what routing cost depends on) and meta
//! tags, both deduplicated into attribute indexes. The result is a
//! [`RouterDb`] that serializes to a versioned binary file.
//!
//! ## Building a network
//!
//! ```rust,no_run
//! use butterfly_network::{profiles, BuilderConfig, NetworkBuilder, PbfSource, RouterDb};
//!
//! # fn main() -> butterfly_network::Result<()> {
//! let config = BuilderConfig::default();
//! let mut db = RouterDb::new(config.max_edge_distance);
//! let mut builder = NetworkBuilder::new(config, vec![Box::new(profiles::car())]);
//! builder.build(&mut PbfSource::new("belgium.osm.pbf"), &mut db)?;
//! db.write_file("belgium.db")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Spatial queries
//!
//! Vertices are sorted along a Hilbert curve at the end of a build, which
//! turns the vertex array itself into a spatial index:
//!
//! ```rust,no_run
//! # use butterfly_network::RouterDb;
//! # fn main() -> butterfly_network::Result<()> {
//! let db = RouterDb::read_file("belgium.db")?;
//! let vertices = db.network().vertices();
//! let closest = vertices.search_closest(50.85, 4.35, 0.01, 0.01)?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod core;
pub mod formats;
pub mod geo;
pub mod graph;
pub mod hilbert;
pub mod ingest;
pub mod profiles;
pub mod router_db;

// Re-export the main API
pub use crate::attributes::{AttributeIndex, IndexMode, Tags};
pub use crate::core::{BuilderConfig, Error, Result};
pub use crate::geo::{BoundingBox, Coordinate};
pub use crate::graph::{EdgeData, RoutingNetwork, VertexStore};
pub use crate::ingest::{BuildProgress, BuildStats, EntitySource, MemorySource, NetworkBuilder, PbfSource};
pub use crate::profiles::Vehicle;
pub use crate::router_db::RouterDb;
