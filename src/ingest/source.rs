//! OSM entity model and the sources the builder reads from
//!
//! The builder re-reads its input several times (once per pass and stage),
//! so a source must be able to stream every entity from the start on each
//! call.

use std::path::{Path, PathBuf};

use osmpbf::{Element, ElementReader, RelMemberType};

use crate::attributes::Tags;
use crate::core::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub member_type: MemberType,
    pub id: i64,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// A re-readable stream of OSM entities
pub trait EntitySource {
    /// Visit every entity from the beginning of the input, in input order
    ///
    /// The first error returned by `visit` stops the stream and is returned.
    fn stream(&mut self, visit: &mut dyn FnMut(Entity) -> Result<()>) -> Result<()>;
}

/// Entities held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entities: Vec<Entity>,
}

impl MemorySource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntitySource for MemorySource {
    fn stream(&mut self, visit: &mut dyn FnMut(Entity) -> Result<()>) -> Result<()> {
        for entity in &self.entities {
            visit(entity.clone())?;
        }
        Ok(())
    }
}

/// OSM PBF file, decoded with `osmpbf` on every pass
#[derive(Debug, Clone)]
pub struct PbfSource {
    path: PathBuf,
}

impl PbfSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl EntitySource for PbfSource {
    fn stream(&mut self, visit: &mut dyn FnMut(Entity) -> Result<()>) -> Result<()> {
        let reader = ElementReader::from_path(&self.path)?;

        // for_each cannot stop early; skip the rest after the first failure
        let mut failure = None;
        reader.for_each(|element| {
            if failure.is_some() {
                return;
            }
            let entity = match element {
                Element::Node(node) => Entity::Node(Node {
                    id: node.id(),
                    lat: node.lat(),
                    lon: node.lon(),
                    tags: node.tags().collect(),
                }),
                Element::DenseNode(node) => Entity::Node(Node {
                    id: node.id(),
                    lat: node.lat(),
                    lon: node.lon(),
                    tags: node.tags().collect(),
                }),
                Element::Way(way) => Entity::Way(Way {
                    id: way.id(),
                    nodes: way.refs().collect(),
                    tags: way.tags().collect(),
                }),
                Element::Relation(relation) => Entity::Relation(Relation {
                    id: relation.id(),
                    members: relation
                        .members()
                        .map(|member| Member {
                            member_type: match member.member_type {
                                RelMemberType::Node => MemberType::Node,
                                RelMemberType::Way => MemberType::Way,
                                RelMemberType::Relation => MemberType::Relation,
                            },
                            id: member.member_id,
                            role: member.role().unwrap_or("").to_string(),
                        })
                        .collect(),
                    tags: relation.tags().collect(),
                }),
            };
            if let Err(err) = visit(entity) {
                failure = Some(err);
            }
        })?;

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    fn node(id: i64) -> Entity {
        Entity::Node(Node {
            id,
            lat: 50.0,
            lon: 4.0,
            tags: Tags::new(),
        })
    }

    #[test]
    fn test_memory_source_streams_from_start_each_time() {
        let mut source = MemorySource::new(vec![node(1), node(2), node(3)]);
        assert_eq!(source.len(), 3);
        assert!(!source.is_empty());
        for _ in 0..2 {
            let mut ids = Vec::new();
            source
                .stream(&mut |entity| {
                    if let Entity::Node(n) = entity {
                        ids.push(n.id);
                    }
                    Ok(())
                })
                .unwrap();
            assert_eq!(ids, vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_visit_error_stops_the_stream() {
        let mut source = MemorySource::new(vec![node(1), node(2), node(3)]);
        let mut seen = 0;
        let result = source.stream(&mut |_| {
            seen += 1;
            if seen == 2 {
                return Err(Error::Capacity("stop".to_string()));
            }
            Ok(())
        });
        assert!(matches!(result, Err(Error::Capacity(_))));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_missing_pbf_is_an_error() {
        let mut source = PbfSource::new("/nonexistent/planet.osm.pbf");
        assert!(source.stream(&mut |_| Ok(())).is_err());
    }
}
