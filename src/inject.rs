// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Coordinate, Edge, Graph, Node, RoutingError};

/// Reserved id of the node injected at the snapped start position.
pub const START_NODE_ID: i64 = -1;

/// Reserved id of the node injected at the snapped end position.
pub const END_NODE_ID: i64 = -2;

/// Splices a temporary node at `coord` into the `segment_start`-`segment_end`
/// segment of the graph.
///
/// The endpoints are looked up as the nearest nodes within `tolerance` meters
/// (use [Config::merge_radius](crate::Config::merge_radius) to mirror
/// [build_graph](crate::build_graph)). The new node is connected in both directions
/// to both endpoints; the original `segment_start`-`segment_end` edge is kept.
///
/// The graph is modified in place and thus **must** be a private clone,
/// never the shared base graph. `id` must be one of the reserved ids
/// ([START_NODE_ID], [END_NODE_ID]) and not present in the graph yet.
///
/// Fails, leaving the graph untouched, with [RoutingError::InvalidCoordinate]
/// if `coord` is out of range, or with [RoutingError::GraphInconsistency]
/// if either endpoint has no corresponding node.
pub fn inject_node(
    g: &mut Graph,
    id: i64,
    coord: Coordinate,
    segment_start: Coordinate,
    segment_end: Coordinate,
    tolerance: f64,
) -> Result<i64, RoutingError> {
    debug_assert!(id < 0, "injected nodes must use reserved (negative) ids");
    debug_assert!(g.get_node(id).is_none());
    let coord = coord.validate()?;

    let inconsistency = || RoutingError::GraphInconsistency {
        start: segment_start,
        end: segment_end,
    };
    let start = g
        .find_node_near(segment_start, tolerance)
        .ok_or_else(inconsistency)?;
    let end = g
        .find_node_near(segment_end, tolerance)
        .ok_or_else(inconsistency)?;

    g.set_node(Node { id, coord });

    for endpoint in [start, end] {
        let cost = earth_distance(coord, endpoint.coord);
        g.set_edge(id, Edge { to: endpoint.id, cost });
        g.set_edge(endpoint.id, Edge { to: id, cost });
    }

    Ok(id)
}
