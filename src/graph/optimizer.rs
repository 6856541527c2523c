//! Network simplification: merge the two edges at degree-2 vertices
//!
//! A vertex with exactly two edges towards different neighbours is only a
//! bend in the road once the builder is done. When the merge function
//! accepts the pair, both edges are replaced by one edge between the
//! neighbours, with the vertex kept as a shape point. The vertex itself
//! stays in the store without edges.

use super::network::{EdgeData, RoutingNetwork};

/// Decides whether two consecutive edges can become one
///
/// Arguments are `(first, first_forward, second, second_forward)`, where
/// `forward` tells whether the edge is stored in the direction of travel
/// along `neighbour1 -> vertex -> neighbour2`. Returning `Some((data,
/// inverted))` merges them; `inverted` stores the result as
/// `neighbour2 -> neighbour1`.
pub trait MergeEdges {
    fn merge(
        &mut self,
        first: &EdgeData,
        first_forward: bool,
        second: &EdgeData,
        second_forward: bool,
    ) -> Option<(EdgeData, bool)>;
}

impl<F> MergeEdges for F
where
    F: FnMut(&EdgeData, bool, &EdgeData, bool) -> Option<(EdgeData, bool)>,
{
    fn merge(
        &mut self,
        first: &EdgeData,
        first_forward: bool,
        second: &EdgeData,
        second_forward: bool,
    ) -> Option<(EdgeData, bool)> {
        self(first, first_forward, second, second_forward)
    }
}

/// Merge edges with identical attributes stored in the same direction
pub fn merge_identical(
    first: &EdgeData,
    first_forward: bool,
    second: &EdgeData,
    second_forward: bool,
) -> Option<(EdgeData, bool)> {
    if first.profile != second.profile
        || first.meta_id != second.meta_id
        || first_forward != second_forward
    {
        return None;
    }
    let merged = EdgeData {
        distance: first.distance + second.distance,
        ..*first
    };
    Some((merged, !first_forward))
}

/// Merge degree-2 vertices; returns the number of merges
pub fn merge_degree_two<M: MergeEdges>(network: &mut RoutingNetwork, mut merge: M) -> usize {
    let mut merged = 0;
    for vertex in 0..network.vertex_count() {
        let mut edges = network.edges(vertex);
        if edges.count_edges() != 2 {
            continue;
        }
        let (first, second) = match (edges.next(), edges.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => continue,
        };
        if first.to == second.to || first.to == vertex || second.to == vertex {
            continue;
        }

        let (data, inverted) = match merge.merge(
            &first.data,
            first.data_inverted,
            &second.data,
            !second.data_inverted,
        ) {
            Some(result) => result,
            None => continue,
        };
        if data.distance >= network.max_edge_distance()
            || network.contains_edge(first.to, second.to)
        {
            continue;
        }

        // geometry from first.to through vertex to second.to
        let mut shape = Vec::new();
        if let Some(first_shape) = first.shape {
            shape.extend(first_shape.iter().rev());
        }
        if let Some(center) = network.get_vertex(vertex) {
            shape.push(center);
        }
        if let Some(second_shape) = second.shape {
            shape.extend(second_shape.iter());
        }
        let (start, end) = (first.to, second.to);

        network.remove_edges(vertex);
        if inverted {
            shape.reverse();
            network.add_edge(end, start, data, &shape);
        } else {
            network.add_edge(start, end, data, &shape);
        }
        merged += 1;
    }
    merged
}
