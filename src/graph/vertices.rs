//! Spatial vertex store
//!
//! Vertices are kept in a flat array. Once sorted along the Hilbert curve
//! the array itself is the spatial index: a query box is decomposed into
//! curve ranges and each range is located with a binary search.

use crate::core::{Error, Result};
use crate::geo::Coordinate;
use crate::hilbert;

/// Sentinel for "no vertex" in fixed-width fields
pub const NO_VERTEX: u32 = u32::MAX;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexStore {
    coordinates: Vec<Coordinate>,
    sorted_depth: Option<u8>,
}

impl VertexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            coordinates: Vec::with_capacity(capacity),
            sorted_depth: None,
        }
    }

    pub(crate) fn from_parts(coordinates: Vec<Coordinate>, sorted_depth: Option<u8>) -> Self {
        Self {
            coordinates,
            sorted_depth,
        }
    }

    pub fn count(&self) -> u32 {
        self.coordinates.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Append vertex `id`; ids are dense, so `id` must equal [`count`](Self::count)
    ///
    /// Appending invalidates a previous sort.
    pub fn add_vertex(&mut self, id: u32, lat: f32, lon: f32) {
        assert_eq!(
            id,
            self.count(),
            "vertex ids must be appended densely (expected {}, got {})",
            self.count(),
            id
        );
        self.coordinates.push(Coordinate::new(lat, lon));
        self.sorted_depth = None;
    }

    pub fn get(&self, vertex: u32) -> Option<Coordinate> {
        self.coordinates.get(vertex as usize).copied()
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    /// Depth of the last sort, `None` if unsorted
    pub fn sorted_depth(&self) -> Option<u8> {
        self.sorted_depth
    }

    pub fn hilbert_distance(&self, depth: u8, vertex: u32) -> u64 {
        let c = self.coordinates[vertex as usize];
        hilbert::distance(c.lat as f64, c.lon as f64, depth)
    }

    /// Reorder vertices along the Hilbert curve
    ///
    /// Returns the permutation `old id -> new id`. Every id held outside
    /// the store must be remapped through it.
    pub fn sort(&mut self, depth: u8) -> Vec<u32> {
        assert!(
            (1..=hilbert::MAX_DEPTH).contains(&depth),
            "hilbert depth must be in 1..={}",
            hilbert::MAX_DEPTH
        );

        let mut keyed: Vec<(u64, u32)> = (0..self.count())
            .map(|v| (self.hilbert_distance(depth, v), v))
            .collect();
        keyed.sort_unstable();

        let mut permutation = vec![0u32; keyed.len()];
        let mut sorted = Vec::with_capacity(keyed.len());
        for (new_id, (_, old_id)) in keyed.iter().enumerate() {
            permutation[*old_id as usize] = new_id as u32;
            sorted.push(self.coordinates[*old_id as usize]);
        }

        self.coordinates = sorted;
        self.sorted_depth = Some(depth);
        permutation
    }

    /// All vertices inside the closed box, in ascending id order
    pub fn search(&self, min_lat: f32, min_lon: f32, max_lat: f32, max_lon: f32) -> Result<Vec<u32>> {
        let depth = self.sorted_depth.ok_or(Error::NotSorted)?;
        let (min_lat, min_lon) = (min_lat as f64, min_lon as f64);
        let (max_lat, max_lon) = (max_lat as f64, max_lon as f64);

        let mut found = Vec::new();
        for (start, end) in hilbert::ranges(min_lat, min_lon, max_lat, max_lon, depth) {
            let mut vertex = self.lower_bound(depth, start);
            while vertex < self.count() && self.hilbert_distance(depth, vertex) <= end {
                let c = self.coordinates[vertex as usize];
                let (lat, lon) = (c.lat as f64, c.lon as f64);
                if lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon {
                    found.push(vertex);
                }
                vertex += 1;
            }
        }
        // ranges are disjoint and ascending, so `found` already is
        Ok(found)
    }

    /// Closest vertex by planar distance inside the offset window
    ///
    /// Ties go to the lowest id. Wide windows are decomposed into coarse
    /// curve blocks, so they cost more candidate checks rather than more
    /// range lookups.
    pub fn search_closest(
        &self,
        lat: f32,
        lon: f32,
        max_lat_offset: f32,
        max_lon_offset: f32,
    ) -> Result<Option<u32>> {
        let candidates = self.search(
            lat - max_lat_offset,
            lon - max_lon_offset,
            lat + max_lat_offset,
            lon + max_lon_offset,
        )?;

        let mut best: Option<(u32, f64)> = None;
        for vertex in candidates {
            let c = self.coordinates[vertex as usize];
            let d_lat = c.lat as f64 - lat as f64;
            let d_lon = c.lon as f64 - lon as f64;
            let distance = d_lat * d_lat + d_lon * d_lon;
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((vertex, distance)),
            }
        }
        Ok(best.map(|(vertex, _)| vertex))
    }

    /// First vertex whose curve distance is `>= target`
    fn lower_bound(&self, depth: u8, target: u64) -> u32 {
        let mut low = 0u32;
        let mut high = self.count();
        while low < high {
            let mid = low + (high - low) / 2;
            if self.hilbert_distance(depth, mid) < target {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn grid(count: u32, spacing: f32) -> VertexStore {
        let mut store = VertexStore::new();
        for i in 0..count {
            for j in 0..count {
                let id = store.count();
                store.add_vertex(id, i as f32 * spacing, j as f32 * spacing);
            }
        }
        store
    }

    #[test]
    fn test_sort_orders_by_hilbert_distance() {
        // one vertex per cell of a 4x4 curve
        let mut store = VertexStore::new();
        for row in 0..4 {
            for col in 0..4 {
                let lat = -90.0 + 45.0 * (row as f32 + 0.5);
                let lon = -180.0 + 90.0 * (col as f32 + 0.5);
                let id = store.count();
                store.add_vertex(id, lat, lon);
            }
        }
        let before = store.clone();

        let permutation = store.sort(2);
        assert_eq!(store.sorted_depth(), Some(2));
        for v in 0..store.count() - 1 {
            assert_eq!(store.hilbert_distance(2, v), v as u64);
            assert!(store.hilbert_distance(2, v) <= store.hilbert_distance(2, v + 1));
        }
        for old in 0..before.count() {
            assert_eq!(before.get(old), store.get(permutation[old as usize]));
        }
    }

    #[test]
    fn test_search_closest() {
        let mut store = VertexStore::new();
        store.add_vertex(0, 1.0, 1.0);
        store.add_vertex(1, 2.0, 2.0);
        let permutation = store.sort(hilbert::DEFAULT_DEPTH);

        assert_eq!(
            store.search_closest(1.0, 1.0, 1.0, 1.0).unwrap(),
            Some(permutation[0])
        );
        assert_eq!(
            store.search_closest(2.0, 2.0, 1.0, 1.0).unwrap(),
            Some(permutation[1])
        );
        assert_eq!(store.search_closest(3.0, 3.0, 0.5, 0.5).unwrap(), None);
    }

    #[test]
    fn test_search_closest_tie_takes_lowest_id() {
        let mut store = VertexStore::new();
        store.add_vertex(0, 0.5, 0.5);
        store.add_vertex(1, 0.5, 0.5);
        store.sort(hilbert::DEFAULT_DEPTH);
        assert_eq!(store.search_closest(0.5, 0.5, 0.1, 0.1).unwrap(), Some(0));
    }

    #[test]
    fn test_search_closest_in_wide_window() {
        let mut store = VertexStore::new();
        store.add_vertex(0, 12.5, -33.25);
        store.add_vertex(1, 60.0, 100.0);
        store.sort(hilbert::DEFAULT_DEPTH);

        let closest = store.search_closest(0.0, 0.0, 45.0, 90.0).unwrap();
        let c = store.get(closest.unwrap()).unwrap();
        assert_eq!((c.lat, c.lon), (12.5, -33.25));
    }

    #[test]
    fn test_search_grid() {
        let mut store = grid(5, 0.02);
        store.sort(hilbert::DEFAULT_DEPTH);

        assert_eq!(store.search(0.009, 0.009, 0.029, 0.029).unwrap().len(), 1);
        assert_eq!(store.search(0.009, 0.009, 0.099, 0.029).unwrap().len(), 4);
        assert_eq!(store.search(-0.001, -0.001, 0.09, 0.09).unwrap().len(), 25);
    }

    #[test]
    fn test_search_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut store = VertexStore::new();
        for id in 0..2_000 {
            let lat = rng.random_range(50.0f32..51.0);
            let lon = rng.random_range(4.0f32..5.0);
            store.add_vertex(id, lat, lon);
        }
        store.sort(16);

        for _ in 0..50 {
            let lat = rng.random_range(50.0f32..51.0);
            let lon = rng.random_range(4.0f32..5.0);
            let (min_lat, max_lat) = (lat - 0.05, lat + 0.05);
            let (min_lon, max_lon) = (lon - 0.08, lon + 0.08);

            let expected: Vec<u32> = (0..store.count())
                .filter(|v| {
                    let c = store.get(*v).unwrap();
                    c.lat >= min_lat && c.lat <= max_lat && c.lon >= min_lon && c.lon <= max_lon
                })
                .collect();
            let found = store.search(min_lat, min_lon, max_lat, max_lon).unwrap();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_unsorted_store_rejects_queries() {
        let mut store = grid(3, 0.1);
        assert!(matches!(
            store.search(0.0, 0.0, 1.0, 1.0),
            Err(Error::NotSorted)
        ));

        store.sort(hilbert::DEFAULT_DEPTH);
        assert!(store.search(0.0, 0.0, 1.0, 1.0).is_ok());

        // appending drops the sorted state again
        let id = store.count();
        store.add_vertex(id, 0.5, 0.5);
        assert!(matches!(
            store.search_closest(0.5, 0.5, 0.1, 0.1),
            Err(Error::NotSorted)
        ));
    }

    #[test]
    #[should_panic(expected = "densely")]
    fn test_sparse_ids_panic() {
        let mut store = VertexStore::new();
        store.add_vertex(3, 0.0, 0.0);
    }
}
