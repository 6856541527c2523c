//! Routing network: edges with distance, attributes and shape on top of
//! the spatial vertex store
//!
//! Every edge is stored once and listed in the adjacency of both of its
//! endpoints. Enumerating from the `to` side reports the edge with
//! `data_inverted` set and its shape reversed.
//!
//! Binary block layout (little-endian):
//!
//! ```text
//! version: u8 | max_edge_distance: f32 | sorted_depth: u8 (0 = unsorted)
//! vertex_count: u32 | vertex_count * (lat: f32, lon: f32)
//! edge_count: u32 | edge_count * EdgeRecord (24 bytes)
//! shape blob: sum(shape_len) * (lat: f32, lon: f32)
//!
//! EdgeRecord:
//!   from: u32 | to: u32 | distance: f32 | profile: u16 | reserved: u16
//!   meta: u32 | shape_len: u32
//! ```

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::shape::Shape;
use super::vertices::VertexStore;
use crate::core::{Error, Result};
use crate::geo::Coordinate;

const VERSION: u8 = 1;
const HEADER_SIZE: u64 = 1 + 4 + 1 + 4 + 4;
const EDGE_RECORD_SIZE: u64 = 24;
const COORDINATE_SIZE: u64 = 8;

/// Default bound on a single edge's length in meters
pub const DEFAULT_MAX_EDGE_DISTANCE: f32 = 5_000.0;

/// Upper bound on the parts a single segment is halved into while splitting
const MAX_SEGMENT_PARTS: u32 = 1 << 20;

/// Largest profile attribute id the 16-bit edge field can hold
pub const MAX_PROFILE_COUNT: u32 = u16::MAX as u32;

/// Payload shared by both directions of an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeData {
    /// Length in meters
    pub distance: f32,
    /// Id in the profile attribute index
    pub profile: u16,
    /// Id in the meta attribute index
    pub meta_id: u32,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    from: u32,
    to: u32,
    data: EdgeData,
    shape: Option<Box<[Coordinate]>>,
}

/// One edge as seen from a vertex
#[derive(Debug, Clone, Copy)]
pub struct RoutingEdge<'a> {
    pub id: u32,
    pub from: u32,
    pub to: u32,
    pub data: EdgeData,
    /// Set when the edge is stored as `to -> from`
    pub data_inverted: bool,
    /// Intermediate points ordered from `from` to `to`
    pub shape: Option<Shape<'a>>,
}

#[derive(Debug, Clone)]
pub struct RoutingNetwork {
    vertices: VertexStore,
    edges: Vec<Option<StoredEdge>>,
    adjacency: Vec<Vec<u32>>,
    edge_count: u32,
    max_edge_distance: f32,
}

impl Default for RoutingNetwork {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDGE_DISTANCE)
    }
}

impl RoutingNetwork {
    pub fn new(max_edge_distance: f32) -> Self {
        assert!(
            max_edge_distance > 0.0,
            "max edge distance must be positive"
        );
        Self {
            vertices: VertexStore::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            edge_count: 0,
            max_edge_distance,
        }
    }

    pub fn max_edge_distance(&self) -> f32 {
        self.max_edge_distance
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.count()
    }

    /// Number of live edges
    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    pub fn vertices(&self) -> &VertexStore {
        &self.vertices
    }

    pub fn get_vertex(&self, vertex: u32) -> Option<Coordinate> {
        self.vertices.get(vertex)
    }

    /// Append a vertex and return its id
    pub fn add_vertex(&mut self, lat: f32, lon: f32) -> u32 {
        let id = self.vertices.count();
        self.vertices.add_vertex(id, lat, lon);
        self.adjacency.push(Vec::new());
        id
    }

    fn coordinate(&self, vertex: u32) -> Coordinate {
        match self.vertices.get(vertex) {
            Some(c) => c,
            None => panic!("vertex {} out of range", vertex),
        }
    }

    /// Add an edge, splitting it when it reaches the maximum distance
    ///
    /// Segment lengths are scaled so the full polyline measures
    /// `data.distance`; a polyline without length spreads it evenly. Each
    /// segment is halved until its parts are below the maximum, then the
    /// pieces are cut at those points. Every cut point becomes a new vertex
    /// and every piece carries the same profile and meta ids. The last
    /// piece takes the remaining distance, so the pieces add up to
    /// `data.distance`.
    pub fn add_edge(&mut self, from: u32, to: u32, data: EdgeData, shape: &[Coordinate]) {
        if data.distance < self.max_edge_distance {
            self.push_edge(from, to, data, shape);
            return;
        }

        let max = self.max_edge_distance as f64;
        let mut points = Vec::with_capacity(shape.len() + 2);
        points.push(self.coordinate(from));
        points.extend_from_slice(shape);
        points.push(self.coordinate(to));

        let lengths: Vec<f64> = points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]) as f64)
            .collect();
        let geometry: f64 = lengths.iter().sum();
        let total = data.distance as f64;

        // (point, scaled length of the step ending there)
        let mut dense: Vec<(Coordinate, f64)> = Vec::with_capacity(points.len());
        dense.push((points[0], 0.0));
        for (i, length) in lengths.iter().enumerate() {
            let step = if geometry > 0.0 {
                length * total / geometry
            } else {
                total / lengths.len() as f64
            };
            let mut parts = 1u32;
            while step / parts as f64 >= max && parts < MAX_SEGMENT_PARTS {
                parts *= 2;
            }
            let (a, b) = (points[i], points[i + 1]);
            for j in 1..parts {
                let t = j as f64 / parts as f64;
                let point = Coordinate::new(
                    (a.lat as f64 + (b.lat as f64 - a.lat as f64) * t) as f32,
                    (a.lon as f64 + (b.lon as f64 - a.lon as f64) * t) as f32,
                );
                dense.push((point, step / parts as f64));
            }
            dense.push((b, step / parts as f64));
        }

        let last = dense.len() - 1;
        let mut start = from;
        let mut piece_shape: Vec<Coordinate> = Vec::new();
        let mut piece_distance = 0.0f64;
        let mut emitted = 0.0f64;
        for i in 1..dense.len() {
            let step = dense[i].1;
            if piece_distance > 0.0 && piece_distance + step >= max {
                // the previous point closes this piece
                piece_shape.pop();
                let (cut, _) = dense[i - 1];
                let split = self.add_vertex(cut.lat, cut.lon);
                let piece = EdgeData {
                    distance: piece_distance as f32,
                    ..data
                };
                self.push_edge(start, split, piece, &piece_shape);
                emitted += piece_distance;
                start = split;
                piece_shape.clear();
                piece_distance = 0.0;
            }
            piece_distance += step;
            if i < last {
                piece_shape.push(dense[i].0);
            }
        }

        let rest = EdgeData {
            distance: (total - emitted).max(0.0) as f32,
            ..data
        };
        self.push_edge(start, to, rest, &piece_shape);
    }

    fn push_edge(&mut self, from: u32, to: u32, data: EdgeData, shape: &[Coordinate]) -> u32 {
        let count = self.vertices.count();
        assert!(
            from < count && to < count,
            "edge {} -> {} references a missing vertex",
            from,
            to
        );

        let id = self.edges.len() as u32;
        self.edges.push(Some(StoredEdge {
            from,
            to,
            data,
            shape: if shape.is_empty() {
                None
            } else {
                Some(shape.into())
            },
        }));
        self.adjacency[from as usize].push(id);
        if from != to {
            self.adjacency[to as usize].push(id);
        }
        self.edge_count += 1;
        id
    }

    /// Lazy, restartable enumeration of the edges at `vertex`
    pub fn edges(&self, vertex: u32) -> EdgeEnumerator<'_> {
        EdgeEnumerator {
            network: self,
            vertex,
            position: 0,
        }
    }

    /// Edge `id` seen from its stored `from` vertex
    pub fn get_edge(&self, id: u32) -> Option<RoutingEdge<'_>> {
        let stored = self.edges.get(id as usize)?.as_ref()?;
        Some(self.view(id, stored, stored.from))
    }

    /// All live edges in storage direction, ordered by id
    pub fn iter_edges(&self) -> impl Iterator<Item = RoutingEdge<'_>> + '_ {
        self.edges.iter().enumerate().filter_map(move |(id, stored)| {
            stored
                .as_ref()
                .map(|stored| self.view(id as u32, stored, stored.from))
        })
    }

    fn view<'a>(&'a self, id: u32, stored: &'a StoredEdge, vertex: u32) -> RoutingEdge<'a> {
        let inverted = stored.from != vertex;
        let shape = stored.shape.as_deref().map(|points| {
            let shape = Shape::new(points);
            if inverted {
                shape.reverse()
            } else {
                shape
            }
        });
        RoutingEdge {
            id,
            from: vertex,
            to: if inverted { stored.from } else { stored.to },
            data: stored.data,
            data_inverted: inverted,
            shape,
        }
    }

    /// Whether any edge joins `from` and `to`, in either storage direction
    pub fn contains_edge(&self, from: u32, to: u32) -> bool {
        self.edges(from).any(|edge| edge.to == to)
    }

    /// Remove one edge; returns false if it was already gone
    pub fn remove_edge(&mut self, id: u32) -> bool {
        let stored = match self.edges.get_mut(id as usize).and_then(Option::take) {
            Some(stored) => stored,
            None => return false,
        };
        self.adjacency[stored.from as usize].retain(|e| *e != id);
        self.adjacency[stored.to as usize].retain(|e| *e != id);
        self.edge_count -= 1;
        true
    }

    /// Remove every edge at `vertex`; returns how many were removed
    pub fn remove_edges(&mut self, vertex: u32) -> usize {
        let ids = std::mem::take(&mut self.adjacency[vertex as usize]);
        let mut removed = 0;
        for id in ids {
            if self.remove_edge(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Sort vertices along the Hilbert curve and remap every edge
    ///
    /// Returns the `old id -> new id` permutation.
    pub fn sort(&mut self, depth: u8) -> Vec<u32> {
        let permutation = self.vertices.sort(depth);

        let mut adjacency = vec![Vec::new(); self.adjacency.len()];
        for (id, stored) in self.edges.iter_mut().enumerate() {
            if let Some(stored) = stored {
                stored.from = permutation[stored.from as usize];
                stored.to = permutation[stored.to as usize];
                adjacency[stored.from as usize].push(id as u32);
                if stored.from != stored.to {
                    adjacency[stored.to as usize].push(id as u32);
                }
            }
        }
        self.adjacency = adjacency;
        permutation
    }

    fn shape_point_count(&self) -> u64 {
        self.edges
            .iter()
            .flatten()
            .map(|e| e.shape.as_ref().map_or(0, |s| s.len() as u64))
            .sum()
    }

    /// Bytes [`serialize`](Self::serialize) will write
    pub fn serialized_size(&self) -> u64 {
        HEADER_SIZE
            + self.vertices.count() as u64 * COORDINATE_SIZE
            + self.edge_count as u64 * EDGE_RECORD_SIZE
            + self.shape_point_count() * COORDINATE_SIZE
    }

    /// Write the network block; removed edges are compacted away
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<u64> {
        writer.write_u8(VERSION)?;
        writer.write_f32::<LittleEndian>(self.max_edge_distance)?;
        writer.write_u8(self.vertices.sorted_depth().unwrap_or(0))?;

        writer.write_u32::<LittleEndian>(self.vertices.count())?;
        for c in self.vertices.coordinates() {
            writer.write_f32::<LittleEndian>(c.lat)?;
            writer.write_f32::<LittleEndian>(c.lon)?;
        }

        writer.write_u32::<LittleEndian>(self.edge_count)?;
        for stored in self.edges.iter().flatten() {
            writer.write_u32::<LittleEndian>(stored.from)?;
            writer.write_u32::<LittleEndian>(stored.to)?;
            writer.write_f32::<LittleEndian>(stored.data.distance)?;
            writer.write_u16::<LittleEndian>(stored.data.profile)?;
            writer.write_u16::<LittleEndian>(0)?; // reserved
            writer.write_u32::<LittleEndian>(stored.data.meta_id)?;
            writer.write_u32::<LittleEndian>(stored.shape.as_ref().map_or(0, |s| s.len() as u32))?;
        }

        for shape in self.edges.iter().flatten().filter_map(|e| e.shape.as_ref()) {
            for c in shape.iter() {
                writer.write_f32::<LittleEndian>(c.lat)?;
                writer.write_f32::<LittleEndian>(c.lon)?;
            }
        }
        Ok(self.serialized_size())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion {
                what: "network",
                found: version,
                expected: VERSION,
            });
        }
        let max_edge_distance = reader.read_f32::<LittleEndian>()?;
        if !(max_edge_distance > 0.0) {
            return Err(Error::Format(format!(
                "invalid max edge distance {}",
                max_edge_distance
            )));
        }
        let sorted_depth = match reader.read_u8()? {
            0 => None,
            depth => Some(depth),
        };

        let vertex_count = reader.read_u32::<LittleEndian>()?;
        let mut coordinates = Vec::with_capacity(vertex_count.min(1 << 24) as usize);
        for _ in 0..vertex_count {
            let lat = reader.read_f32::<LittleEndian>()?;
            let lon = reader.read_f32::<LittleEndian>()?;
            coordinates.push(Coordinate::new(lat, lon));
        }

        let edge_count = reader.read_u32::<LittleEndian>()?;
        let mut records = Vec::with_capacity(edge_count.min(1 << 24) as usize);
        for _ in 0..edge_count {
            let from = reader.read_u32::<LittleEndian>()?;
            let to = reader.read_u32::<LittleEndian>()?;
            let distance = reader.read_f32::<LittleEndian>()?;
            let profile = reader.read_u16::<LittleEndian>()?;
            let _reserved = reader.read_u16::<LittleEndian>()?;
            let meta_id = reader.read_u32::<LittleEndian>()?;
            let shape_len = reader.read_u32::<LittleEndian>()?;
            if from >= vertex_count || to >= vertex_count {
                return Err(Error::Format(format!(
                    "edge {} -> {} references a missing vertex",
                    from, to
                )));
            }
            records.push((
                from,
                to,
                EdgeData {
                    distance,
                    profile,
                    meta_id,
                },
                shape_len,
            ));
        }

        let mut network = RoutingNetwork::new(max_edge_distance);
        network.vertices = VertexStore::from_parts(coordinates, sorted_depth);
        network.adjacency = vec![Vec::new(); vertex_count as usize];
        for (from, to, data, shape_len) in records {
            let mut shape = Vec::with_capacity(shape_len as usize);
            for _ in 0..shape_len {
                let lat = reader.read_f32::<LittleEndian>()?;
                let lon = reader.read_f32::<LittleEndian>()?;
                shape.push(Coordinate::new(lat, lon));
            }
            network.push_edge(from, to, data, &shape);
        }
        Ok(network)
    }
}

/// Edges at one vertex; `reset` restarts, `move_to` switches vertex
pub struct EdgeEnumerator<'a> {
    network: &'a RoutingNetwork,
    vertex: u32,
    position: usize,
}

impl<'a> EdgeEnumerator<'a> {
    pub fn vertex(&self) -> u32 {
        self.vertex
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn move_to(&mut self, vertex: u32) {
        self.vertex = vertex;
        self.position = 0;
    }

    /// Number of edges at the current vertex
    pub fn count_edges(&self) -> usize {
        self.network
            .adjacency
            .get(self.vertex as usize)
            .map_or(0, Vec::len)
    }
}

impl<'a> Iterator for EdgeEnumerator<'a> {
    type Item = RoutingEdge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let ids = self.network.adjacency.get(self.vertex as usize)?;
        while let Some(id) = ids.get(self.position) {
            self.position += 1;
            if let Some(stored) = &self.network.edges[*id as usize] {
                return Some(self.network.view(*id, stored, self.vertex));
            }
        }
        None
    }
}
