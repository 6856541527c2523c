//! OSM ingestion: entity sources, tag normalization and the network builder

pub mod builder;
pub mod normalize;
pub mod processor;
pub mod source;

pub use builder::{BuildProgress, BuildStats, NetworkBuilder};
pub use processor::{CycleNetworkProcessor, TwoPassProcessor};
pub use source::{Entity, EntitySource, Member, MemberType, MemorySource, Node, PbfSource, Relation, Way};
