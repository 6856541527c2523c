//! Two-pass, staged network construction
//!
//! Pass 1 reads the whole input once to find routing nodes and decide which
//! of them become vertices. Pass 2 runs once per stage: it buffers the
//! coordinates of routing nodes inside the stage box and turns every way
//! whose nodes are all known into edges. A way with a node outside the box
//! flags all of its nodes so a later stage buffers them regardless of
//! position.

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use super::normalize::normalize;
use super::processor::{CycleNetworkProcessor, TwoPassProcessor};
use super::source::{Entity, EntitySource, Node, Way};
use crate::attributes::Tags;
use crate::core::{BuilderConfig, Error, Result};
use crate::geo::{BoundingBox, Coordinate};
use crate::graph::{EdgeData, RoutingNetwork, MAX_PROFILE_COUNT};
use crate::profiles::{any_can_traverse, any_relevant, any_relevant_for_profile, Vehicle};
use crate::router_db::RouterDb;

/// Build progress, reported through [`NetworkBuilder::on_progress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProgress {
    FirstPass,
    /// Zero-based stage index
    Stage { index: usize, count: usize },
    Done,
}

/// Counters gathered while building
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub nodes: u64,
    /// Ways at least one vehicle can traverse
    pub routable_ways: u64,
    pub stages: usize,
    pub ways_added: u64,
    /// Ways the tag normalizer rejected
    pub ways_rejected: u64,
    /// Ways never completed because a node was missing
    pub ways_incomplete: u64,
    pub vertices: u32,
    pub edges: u32,
}

/// Mutable bookkeeping shared by both passes
#[derive(Default)]
struct BuildState {
    node_count: u64,
    bounds: Option<BoundingBox>,
    routable_ways: u64,
    /// Nodes of any routable way
    routing_nodes: FxHashSet<i64>,
    /// Routing nodes that become vertices
    core_nodes: FxHashSet<i64>,
    /// Nodes every stage must buffer
    any_stage_nodes: FxHashSet<i64>,
    processed_ways: FxHashSet<i64>,
    deferred_ways: FxHashSet<i64>,
    core_vertices: FxHashMap<i64, u32>,
    stage_coordinates: FxHashMap<i64, Coordinate>,
    ways_added: u64,
    ways_rejected: u64,
}

pub struct NetworkBuilder {
    config: BuilderConfig,
    vehicles: Vec<Box<dyn Vehicle>>,
    processors: Vec<Box<dyn TwoPassProcessor>>,
    progress: Option<Box<dyn FnMut(BuildProgress)>>,
}

impl NetworkBuilder {
    pub fn new(config: BuilderConfig, vehicles: Vec<Box<dyn Vehicle>>) -> Self {
        Self {
            config,
            vehicles,
            processors: Vec::new(),
            progress: None,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn vehicles(&self) -> &[Box<dyn Vehicle>] {
        &self.vehicles
    }

    pub fn add_processor(&mut self, processor: Box<dyn TwoPassProcessor>) {
        self.processors.push(processor);
    }

    pub fn processors(&self) -> &[Box<dyn TwoPassProcessor>] {
        &self.processors
    }

    pub fn on_progress<F: FnMut(BuildProgress) + 'static>(&mut self, callback: F) {
        self.progress = Some(Box::new(callback));
    }

    fn report(&mut self, progress: BuildProgress) {
        if let Some(callback) = self.progress.as_mut() {
            callback(progress);
        }
    }

    /// Bicycle networks come from route relations
    fn register_default_processors(&mut self) {
        let has_bicycle = self.vehicles.iter().any(|v| v.name() == "bicycle");
        let registered = self
            .processors
            .iter()
            .any(|p| p.name() == CycleNetworkProcessor::NAME);
        if has_bicycle && !registered {
            self.processors.push(Box::new(CycleNetworkProcessor::new()));
        }
    }

    /// Read `source` and add its routable ways to `db`
    ///
    /// The source is streamed once for the first pass and once per stage.
    /// On error the database holds a partial network and should be
    /// discarded.
    pub fn build(&mut self, source: &mut dyn EntitySource, db: &mut RouterDb) -> Result<BuildStats> {
        self.config.validate()?;
        if self.config.max_edge_distance != db.network().max_edge_distance() {
            return Err(Error::Config(format!(
                "max_edge_distance {} m does not match the network's {} m",
                self.config.max_edge_distance,
                db.network().max_edge_distance()
            )));
        }
        self.register_default_processors();
        for vehicle in &self.vehicles {
            for profile in vehicle.profiles() {
                db.add_supported_profile(&profile.name);
            }
        }

        let mut state = BuildState::default();

        info!("Pass 1: classifying nodes");
        self.report(BuildProgress::FirstPass);
        {
            let vehicles = &self.vehicles;
            let processors = &mut self.processors;
            let all_core = self.config.all_core;
            source.stream(&mut |entity| {
                state.first_pass(entity, vehicles, processors.as_mut_slice(), all_core);
                Ok(())
            })?;
        }
        info!(
            "  ✓ {} nodes, {} routable ways, {} routing nodes, {} core nodes",
            state.node_count,
            state.routable_ways,
            state.routing_nodes.len(),
            state.core_nodes.len()
        );

        let stages = match state.bounds {
            Some(bounds) => stage_boxes(
                &bounds,
                stage_count(&self.config, state.node_count),
                self.config.stage_padding,
            ),
            None => Vec::new(),
        };

        for (index, stage) in stages.iter().enumerate() {
            info!("Pass 2: stage {}/{}", index + 1, stages.len());
            self.report(BuildProgress::Stage {
                index,
                count: stages.len(),
            });

            state.stage_coordinates.clear();
            let vehicles = &self.vehicles;
            let processors = &mut self.processors;
            let config = &self.config;
            source.stream(&mut |entity| {
                state.second_pass(entity, stage, vehicles, processors.as_mut_slice(), config, &mut *db)
            })?;
            info!(
                "  ✓ {} ways added, {} vertices, {} edges",
                state.ways_added,
                db.network().vertex_count(),
                db.network().edge_count()
            );
        }

        let incomplete = state
            .deferred_ways
            .iter()
            .filter(|id| !state.processed_ways.contains(id))
            .count() as u64;
        if incomplete > 0 {
            debug!("{} ways dropped with missing nodes", incomplete);
        }

        if let Some(depth) = self.config.sort_depth {
            info!("Sorting vertices along the Hilbert curve (depth {})", depth);
            db.network_mut().sort(depth);
        }

        self.report(BuildProgress::Done);
        let stats = BuildStats {
            nodes: state.node_count,
            routable_ways: state.routable_ways,
            stages: stages.len(),
            ways_added: state.ways_added,
            ways_rejected: state.ways_rejected,
            ways_incomplete: incomplete,
            vertices: db.network().vertex_count(),
            edges: db.network().edge_count(),
        };
        info!(
            "✅ Network built: {} vertices, {} edges from {} ways",
            stats.vertices, stats.edges, stats.ways_added
        );
        Ok(stats)
    }
}

/// Number of stages for `node_count` nodes: 1, 2 or 4
fn stage_count(config: &BuilderConfig, node_count: u64) -> usize {
    if node_count <= config.max_nodes_per_stage && config.minimum_stages <= 1 {
        return 1;
    }
    let needed = node_count.div_ceil(config.max_nodes_per_stage) as usize;
    match needed.max(config.minimum_stages) {
        n if n >= 3 => 4,
        2 => 2,
        _ => 1,
    }
}

/// Quadrants for 4 stages, west/east halves for 2; every box padded
fn stage_boxes(bounds: &BoundingBox, count: usize, padding: f64) -> Vec<BoundingBox> {
    let (center_lat, center_lon) = bounds.center();
    let boxes = match count {
        4 => vec![
            BoundingBox::new(bounds.min_lat, bounds.min_lon, center_lat, center_lon),
            BoundingBox::new(bounds.min_lat, center_lon, center_lat, bounds.max_lon),
            BoundingBox::new(center_lat, bounds.min_lon, bounds.max_lat, center_lon),
            BoundingBox::new(center_lat, center_lon, bounds.max_lat, bounds.max_lon),
        ],
        2 => vec![
            BoundingBox::new(bounds.min_lat, bounds.min_lon, bounds.max_lat, center_lon),
            BoundingBox::new(bounds.min_lat, center_lon, bounds.max_lat, bounds.max_lon),
        ],
        _ => vec![*bounds],
    };
    boxes.iter().map(|b| b.padded(padding)).collect()
}

impl BuildState {
    fn first_pass(
        &mut self,
        entity: Entity,
        vehicles: &[Box<dyn Vehicle>],
        processors: &mut [Box<dyn TwoPassProcessor>],
        all_core: bool,
    ) {
        match entity {
            Entity::Node(node) => {
                self.node_count += 1;
                match self.bounds.as_mut() {
                    Some(bounds) => bounds.expand(node.lat, node.lon),
                    None => self.bounds = Some(BoundingBox::from_point(node.lat, node.lon)),
                }
                for processor in processors.iter_mut() {
                    processor.first_pass_node(&node);
                }
            }
            Entity::Way(way) => {
                for processor in processors.iter_mut() {
                    processor.first_pass_way(&way);
                }
                self.classify_way(&way, vehicles, all_core);
            }
            Entity::Relation(relation) => {
                for processor in processors.iter_mut() {
                    processor.first_pass_relation(&relation);
                }
            }
        }
    }

    fn classify_way(&mut self, way: &Way, vehicles: &[Box<dyn Vehicle>], all_core: bool) {
        let (first, last) = match (way.nodes.first(), way.nodes.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return,
        };
        if !any_can_traverse(vehicles, &way.tags) {
            return;
        }
        self.routable_ways += 1;
        for node in &way.nodes {
            // shared with another routable way
            if all_core || self.routing_nodes.contains(node) {
                self.core_nodes.insert(*node);
            }
            self.routing_nodes.insert(*node);
        }
        self.core_nodes.insert(first);
        self.core_nodes.insert(last);
    }

    fn second_pass(
        &mut self,
        entity: Entity,
        stage: &BoundingBox,
        vehicles: &[Box<dyn Vehicle>],
        processors: &mut [Box<dyn TwoPassProcessor>],
        config: &BuilderConfig,
        db: &mut RouterDb,
    ) -> Result<()> {
        match entity {
            Entity::Node(node) => {
                for processor in processors.iter_mut() {
                    processor.second_pass_node(&node);
                }
                self.buffer_node(&node, stage);
                Ok(())
            }
            Entity::Way(mut way) => {
                for processor in processors.iter_mut() {
                    processor.second_pass_way(&mut way);
                }
                self.process_way(&way, vehicles, processors, config, db)
            }
            Entity::Relation(relation) => {
                for processor in processors.iter_mut() {
                    processor.second_pass_relation(&relation);
                }
                Ok(())
            }
        }
    }

    fn buffer_node(&mut self, node: &Node, stage: &BoundingBox) {
        if !self.routing_nodes.contains(&node.id) {
            return;
        }
        if stage.contains(node.lat, node.lon) || self.any_stage_nodes.contains(&node.id) {
            self.stage_coordinates.insert(
                node.id,
                Coordinate::new(node.lat as f32, node.lon as f32),
            );
        }
    }

    fn process_way(
        &mut self,
        way: &Way,
        vehicles: &[Box<dyn Vehicle>],
        processors: &[Box<dyn TwoPassProcessor>],
        config: &BuilderConfig,
        db: &mut RouterDb,
    ) -> Result<()> {
        if way.nodes.is_empty()
            || self.processed_ways.contains(&way.id)
            || !any_can_traverse(vehicles, &way.tags)
        {
            return Ok(());
        }

        // all coordinates must be known before the first edge is emitted
        let coordinates: Option<Vec<Coordinate>> = way
            .nodes
            .iter()
            .map(|node| self.stage_coordinates.get(node).copied())
            .collect();
        let coordinates = match coordinates {
            Some(coordinates) => coordinates,
            None => {
                self.any_stage_nodes.extend(way.nodes.iter().copied());
                self.deferred_ways.insert(way.id);
                return Ok(());
            }
        };

        let (profile_tags, meta_tags) = match split_tags(&way.tags, vehicles, processors, config) {
            Some(tags) => tags,
            None => {
                debug!("way {} rejected: {}", way.id, way.tags);
                self.ways_rejected += 1;
                self.processed_ways.insert(way.id);
                return Ok(());
            }
        };

        let profile = db.edge_profiles_mut().add(&profile_tags);
        if profile > MAX_PROFILE_COUNT {
            return Err(Error::ProfileCapacity {
                id: profile,
                max: MAX_PROFILE_COUNT,
            });
        }
        let meta_id = db.edge_meta_mut().add(&meta_tags);
        let template = EdgeData {
            distance: 0.0,
            profile: profile as u16,
            meta_id,
        };

        self.add_edges(way, &coordinates, template, db.network_mut());
        self.processed_ways.insert(way.id);
        self.ways_added += 1;
        Ok(())
    }

    /// Turn the way into core-to-core edges with intermediate shape points
    fn add_edges(
        &mut self,
        way: &Way,
        coordinates: &[Coordinate],
        template: EdgeData,
        network: &mut RoutingNetwork,
    ) {
        let last = way.nodes.len() - 1;
        let mut i = 0;
        while i < last {
            let from = self.core_vertex(way.nodes[i], coordinates[i], network);
            let mut shape = Vec::new();
            let mut distance = 0.0f32;
            i += 1;
            loop {
                distance += coordinates[i - 1].distance_to(&coordinates[i]);
                if i == last || self.core_nodes.contains(&way.nodes[i]) {
                    break;
                }
                shape.push(coordinates[i]);
                i += 1;
            }
            let to = self.core_vertex(way.nodes[i], coordinates[i], network);
            let data = EdgeData {
                distance,
                ..template
            };

            if from == to {
                add_loop(network, from, data, &shape);
            } else {
                add_core_edge(network, from, to, data, &shape);
            }
        }
    }

    fn core_vertex(&mut self, node: i64, coordinate: Coordinate, network: &mut RoutingNetwork) -> u32 {
        *self
            .core_vertices
            .entry(node)
            .or_insert_with(|| network.add_vertex(coordinate.lat, coordinate.lon))
    }
}

/// Partition way tags into normalized profile tags and meta tags
///
/// `None` when the normalizer rejects the way.
fn split_tags(
    tags: &Tags,
    vehicles: &[Box<dyn Vehicle>],
    processors: &[Box<dyn TwoPassProcessor>],
    config: &BuilderConfig,
) -> Option<(Tags, Tags)> {
    let mut profile_tags = Tags::with_capacity(tags.len());
    let mut meta_tags = Tags::with_capacity(tags.len());
    for (key, value) in tags.iter() {
        if any_relevant_for_profile(vehicles, key) {
            profile_tags.add(key, value);
        } else if !config.filter_non_routing_tags || any_relevant(vehicles, key) {
            meta_tags.add(key, value);
        }
    }

    if !config.normalize_tags {
        return Some((profile_tags, meta_tags));
    }
    let mut normalized = Tags::with_capacity(profile_tags.len());
    if !normalize(&profile_tags, &mut normalized, vehicles) {
        return None;
    }
    for processor in processors {
        processor.after_way_tags_normalize(&mut normalized, &profile_tags);
    }
    Some((normalized, meta_tags))
}

fn vertex_coordinate(network: &RoutingNetwork, vertex: u32) -> Coordinate {
    network
        .get_vertex(vertex)
        .unwrap_or_else(|| panic!("vertex {} out of range", vertex))
}

/// A way that returns to its start vertex
///
/// The loop itself cannot be stored; its intermediate points become
/// vertices instead. Without intermediate points it is dropped.
fn add_loop(network: &mut RoutingNetwork, vertex: u32, data: EdgeData, shape: &[Coordinate]) {
    let origin = vertex_coordinate(network, vertex);
    match shape {
        [] => {}
        [single] => {
            let middle = network.add_vertex(single.lat, single.lon);
            let distance = origin.distance_to(single);
            network.add_edge(vertex, middle, EdgeData { distance, ..data }, &[]);
        }
        [first, inner @ .., last] => {
            let v1 = network.add_vertex(first.lat, first.lon);
            let v2 = network.add_vertex(last.lat, last.lon);
            let d1 = origin.distance_to(first);
            let d2 = origin.distance_to(last);
            network.add_edge(vertex, v1, EdgeData { distance: d1, ..data }, &[]);
            network.add_edge(
                v1,
                v2,
                EdgeData {
                    distance: (data.distance - d1 - d2).max(0.0),
                    ..data
                },
                inner,
            );
            network.add_edge(v2, vertex, EdgeData { distance: d2, ..data }, &[]);
        }
    }
}

/// Add an edge between core vertices, resolving parallel edges
///
/// Only one edge may join two vertices, so a second one is split at a
/// shape point, or both endpoints are duplicated when neither edge has one.
fn add_core_edge(network: &mut RoutingNetwork, from: u32, to: u32, data: EdgeData, shape: &[Coordinate]) {
    let existing = network
        .edges(from)
        .find(|edge| edge.to == to)
        .map(|edge| edge.id);
    let existing = match existing.and_then(|id| network.get_edge(id)) {
        Some(edge) => edge,
        None => {
            network.add_edge(from, to, data, shape);
            return;
        }
    };
    if existing.data == data {
        return;
    }

    if !shape.is_empty() {
        add_split(network, from, to, data, shape);
        return;
    }

    if let Some(existing_shape) = existing.shape.map(|s| s.to_vec()) {
        let (id, old_from, old_to, old_data) =
            (existing.id, existing.from, existing.to, existing.data);
        network.remove_edge(id);
        network.add_edge(from, to, data, &[]);
        add_split(network, old_from, old_to, old_data, &existing_shape);
        return;
    }

    let from_coordinate = vertex_coordinate(network, from);
    let to_coordinate = vertex_coordinate(network, to);
    let new_from = network.add_vertex(from_coordinate.lat, from_coordinate.lon);
    let new_to = network.add_vertex(to_coordinate.lat, to_coordinate.lon);
    let zero = EdgeData {
        distance: 0.0,
        ..data
    };
    network.add_edge(from, new_from, zero, &[]);
    network.add_edge(new_to, to, zero, &[]);
    network.add_edge(new_from, new_to, data, &[]);
}

/// Add `from -> to` as two edges joined at the first shape point
fn add_split(network: &mut RoutingNetwork, from: u32, to: u32, data: EdgeData, shape: &[Coordinate]) {
    let (split_point, rest) = match shape.split_first() {
        Some(split) => split,
        None => {
            network.add_edge(from, to, data, &[]);
            return;
        }
    };
    let origin = vertex_coordinate(network, from);
    let split = network.add_vertex(split_point.lat, split_point.lon);
    let first = origin.distance_to(split_point);
    network.add_edge(from, split, EdgeData { distance: first, ..data }, &[]);
    network.add_edge(
        split,
        to,
        EdgeData {
            distance: (data.distance - first).max(0.0),
            ..data
        },
        rest,
    );
}
