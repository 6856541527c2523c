//! Integration tests for butterfly-network builds
//!
//! Networks are built from in-memory entity streams, so these tests need
//! neither PBF fixtures nor network access.

use std::fs;

use butterfly_network::attributes::Tags;
use butterfly_network::graph::MAX_PROFILE_COUNT;
use butterfly_network::ingest::{Entity, Member, MemberType, Node, Relation, Way};
use butterfly_network::profiles::{bicycle, car, pedestrian};
use butterfly_network::{
    BuildStats, BuilderConfig, Error, MemorySource, NetworkBuilder, RouterDb, Vehicle,
};
use bytes::Bytes;
use tempfile::TempDir;

const SPACING: f64 = 0.01;

fn node(id: i64, lat: f64, lon: f64) -> Entity {
    Entity::Node(Node {
        id,
        lat,
        lon,
        tags: Tags::new(),
    })
}

fn way(id: i64, nodes: Vec<i64>, tags: &[(&str, &str)]) -> Entity {
    Entity::Way(Way {
        id,
        nodes,
        tags: tags.iter().copied().collect(),
    })
}

/// `size` x `size` nodes with one way per row and one per column
fn grid(size: i64) -> Vec<Entity> {
    let id = |row: i64, col: i64| row * size + col + 1;
    let mut entities = Vec::new();
    for row in 0..size {
        for col in 0..size {
            entities.push(node(
                id(row, col),
                50.0 + row as f64 * SPACING,
                4.0 + col as f64 * SPACING,
            ));
        }
    }
    for row in 0..size {
        let nodes = (0..size).map(|col| id(row, col)).collect();
        entities.push(way(1_000 + row, nodes, &[("highway", "residential")]));
    }
    for col in 0..size {
        let nodes = (0..size).map(|row| id(row, col)).collect();
        entities.push(way(2_000 + col, nodes, &[("highway", "tertiary"), ("name", "Avenue")]));
    }
    entities
}

fn build_with(
    entities: Vec<Entity>,
    config: BuilderConfig,
    vehicles: Vec<Box<dyn Vehicle>>,
) -> (RouterDb, BuildStats) {
    let mut db = RouterDb::new(config.max_edge_distance);
    let mut builder = NetworkBuilder::new(config, vehicles);
    let stats = builder
        .build(&mut MemorySource::new(entities), &mut db)
        .unwrap();
    (db, stats)
}

fn build_stages(entities: Vec<Entity>, stages: usize) -> (RouterDb, BuildStats) {
    let config = BuilderConfig {
        minimum_stages: stages,
        ..BuilderConfig::default()
    };
    build_with(entities, config, vec![Box::new(car())])
}

#[test]
fn test_stage_count_does_not_change_the_network() {
    let (single, single_stats) = build_stages(grid(6), 1);
    assert_eq!(single_stats.stages, 1);
    assert_eq!(single.network().vertex_count(), 36);
    assert_eq!(single.network().edge_count(), 60);

    for stages in [2, 4] {
        let (staged, stats) = build_stages(grid(6), stages);
        assert_eq!(stats.stages, stages);
        assert_eq!(stats.ways_added, single_stats.ways_added);
        assert_eq!(stats.ways_incomplete, 0);
        assert_eq!(staged.network().vertex_count(), single.network().vertex_count());
        assert_eq!(staged.network().edge_count(), single.network().edge_count());

        // both are Hilbert sorted, so the vertex arrays line up
        assert_eq!(
            staged.network().vertices().coordinates(),
            single.network().vertices().coordinates()
        );

        let total = |db: &RouterDb| -> f32 { db.network().iter_edges().map(|e| e.data.distance).sum() };
        assert!((total(&staged) - total(&single)).abs() < 1.0);
    }
}

#[test]
fn test_way_spanning_stages_is_completed_later() {
    // west and east ends are far outside each other's padded half
    let entities = vec![
        node(1, 50.0, 4.0),
        node(2, 50.0005, 4.01),
        node(3, 50.001, 4.02),
        way(10, vec![1, 2, 3], &[("highway", "primary")]),
    ];
    let (db, stats) = build_stages(entities, 2);
    assert_eq!(stats.stages, 2);
    assert_eq!(stats.ways_added, 1);
    assert_eq!(stats.ways_incomplete, 0);
    assert_eq!(db.network().vertex_count(), 2);
    assert_eq!(db.network().edge_count(), 1);

    let edge = db.network().iter_edges().next().unwrap();
    assert_eq!(edge.shape.map(|s| s.len()), Some(1));
}

#[test]
fn test_way_with_missing_node_is_dropped() {
    let entities = vec![
        node(1, 50.0, 4.0),
        node(2, 50.001, 4.0),
        node(3, 50.002, 4.0),
        way(10, vec![1, 2, 99], &[("highway", "residential")]),
        way(11, vec![2, 3], &[("highway", "residential")]),
    ];
    let (db, stats) = build_stages(entities, 1);
    assert_eq!(stats.ways_added, 1);
    assert_eq!(stats.ways_incomplete, 1);
    // nothing of way 10 made it in, not even the edge before the gap
    assert_eq!(db.network().edge_count(), 1);
    assert_eq!(db.network().vertex_count(), 2);
}

#[test]
fn test_file_round_trip() {
    let (mut db, _) = build_with(
        grid(4),
        BuilderConfig::default(),
        vec![Box::new(car()), Box::new(pedestrian())],
    );
    db.meta_mut().add("source", "grid");
    db.add_contracted("car", Bytes::from_static(b"contracted")).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid.db");
    let written = db.write_file(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), written);

    let read = RouterDb::read_file(&path).unwrap();
    assert_eq!(read.guid(), db.guid());
    assert_eq!(read.network().vertex_count(), db.network().vertex_count());
    assert_eq!(read.network().edge_count(), db.network().edge_count());
    assert_eq!(read.edge_profiles(), db.edge_profiles());
    assert_eq!(read.edge_meta(), db.edge_meta());
    assert_eq!(read.supported_profiles(), db.supported_profiles());
    assert!(read.supports("pedestrian.shortest"));
    assert_eq!(read.meta().get("source"), Some("grid"));
    assert_eq!(
        read.try_get_contracted("car").map(|g| g.as_ref()),
        Some(&b"contracted"[..])
    );

    let original: Vec<_> = db.network().iter_edges().map(|e| (e.from, e.to, e.data)).collect();
    let reloaded: Vec<_> = read.network().iter_edges().map(|e| (e.from, e.to, e.data)).collect();
    assert_eq!(original, reloaded);
}

#[test]
fn test_file_corruption_is_detected() {
    let (db, _) = build_stages(grid(3), 1);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid.db");
    db.write_file(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(RouterDb::read_file(&path), Err(Error::Checksum { .. })));

    fs::write(&path, &bytes[..6]).unwrap();
    assert!(RouterDb::read_file(&path).is_err());
}

#[test]
fn test_sorted_network_answers_spatial_queries() {
    let (db, _) = build_stages(grid(5), 1);
    let vertices = db.network().vertices();
    assert!(vertices.sorted_depth().is_some());

    let closest = vertices
        .search_closest(50.0201, 4.0199, 0.005, 0.005)
        .unwrap()
        .unwrap();
    let c = vertices.get(closest).unwrap();
    assert!((c.lat - 50.02).abs() < 1e-4 && (c.lon - 4.02).abs() < 1e-4);

    let found = vertices.search(49.99, 3.99, 50.015, 4.015).unwrap();
    assert_eq!(found.len(), 4);
}

#[test]
fn test_cycle_network_reaches_profile_tags() {
    let entities = vec![
        node(1, 50.0, 4.0),
        node(2, 50.001, 4.0),
        node(3, 50.002, 4.0),
        way(10, vec![1, 2], &[("highway", "residential")]),
        way(11, vec![2, 3], &[("highway", "residential")]),
        Entity::Relation(Relation {
            id: 100,
            members: vec![Member {
                member_type: MemberType::Way,
                id: 11,
                role: String::new(),
            }],
            tags: [("type", "route"), ("route", "bicycle")].into_iter().collect(),
        }),
    ];
    let config = BuilderConfig {
        sort_depth: None,
        ..BuilderConfig::default()
    };
    let (db, _) = build_with(entities, config, vec![Box::new(bicycle())]);

    let profiles: Vec<Tags> = db
        .network()
        .iter_edges()
        .map(|e| db.edge_profiles().get(e.data.profile as u32).unwrap())
        .collect();
    assert_eq!(profiles.len(), 2);
    assert!(!profiles[0].contains("cyclenetwork", "yes"));
    assert!(profiles[1].contains("cyclenetwork", "yes"));
}

#[test]
fn test_profile_capacity_is_enforced() {
    let mut db = RouterDb::default();
    {
        let profiles = db.edge_profiles_mut();
        let mut last = 0;
        for i in 0.. {
            let tags: Tags = [("highway", format!("class-{}", i))].into_iter().collect();
            last = profiles.add(&tags);
            if last == MAX_PROFILE_COUNT {
                break;
            }
        }
        assert_eq!(last, MAX_PROFILE_COUNT);
    }

    let entities = vec![
        node(1, 50.0, 4.0),
        node(2, 50.001, 4.0),
        way(10, vec![1, 2], &[("highway", "residential")]),
    ];
    let mut builder = NetworkBuilder::new(BuilderConfig::default(), vec![Box::new(car())]);
    let result = builder.build(&mut MemorySource::new(entities), &mut db);
    assert!(matches!(
        result,
        Err(Error::ProfileCapacity { max, .. }) if max == MAX_PROFILE_COUNT
    ));
}

#[test]
fn test_contracted_graph_from_another_build_is_rejected() {
    let (mut first, _) = build_stages(grid(3), 1);
    let (mut second, _) = build_stages(grid(3), 1);
    first.add_contracted("car", Bytes::from_static(b"ch")).unwrap();

    let mut buf = Vec::new();
    first.serialize_contracted("car", &mut buf).unwrap();
    assert!(matches!(
        second.deserialize_and_add_contracted(&mut buf.as_slice()),
        Err(Error::GuidMismatch { .. })
    ));
    assert!(matches!(
        second.add_contracted("bicycle", Bytes::new()),
        Err(Error::UnsupportedProfile(_))
    ));
}
