// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Coordinate, Edge, Node};
use std::collections::btree_map::{BTreeMap, Entry};

/// Represents a walkable path network as a set of [Nodes](Node)
/// and [Edges](Edge) between them.
///
/// The graph built from the static path dataset is treated as immutable.
/// Routing requests work on a [clone](Clone::clone), into which they inject
/// their own start and end nodes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph(BTreeMap<i64, (Node, Vec<Edge>)>);

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of directed edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.0.values().map(|(_, edges)| edges.len()).sum()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.values().map(|(node, _)| node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.0.get(&id).map(|&(node, _)| node)
    }

    /// Creates or updates a [Node] with `node.id`.
    ///
    /// All outgoing and incoming edges are preserved. Since edge costs are
    /// distances, moving an existing node would silently invalidate them,
    /// and is therefore disallowed (checked with a `debug_assert!`).
    pub fn set_node(&mut self, node: Node) {
        assert_ne!(node.id, 0);

        match self.0.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                debug_assert_eq!(e.get().0.coord, node.coord);
                e.get_mut().0 = node;
            }
        }
    }

    /// Finds the [Node] closest to the given position.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// which is fine for campus-sized networks.
    pub fn find_nearest_node(&self, coord: Coordinate) -> Option<Node> {
        self.0
            .values()
            .map(|&(nd, _)| (earth_distance(coord, nd.coord), nd))
            .min_by(|(a_dist, _), (b_dist, _)| a_dist.total_cmp(b_dist))
            .map(|(_, nd)| nd)
    }

    /// Finds the [Node] closest to the given position, but only if it
    /// lies within `tolerance` meters.
    pub fn find_node_near(&self, coord: Coordinate, tolerance: f64) -> Option<Node> {
        self.find_nearest_node(coord)
            .filter(|nd| earth_distance(coord, nd.coord) <= tolerance)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.0
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of an [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f64::INFINITY].
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> f64 {
        self.get_edges(from_id)
            .iter()
            .find_map(|edge| (edge.to == to_id).then_some(edge.cost))
            .unwrap_or(f64::INFINITY)
    }

    /// Creates an [Edge] from a node with a given id. If an edge to the same
    /// node already exists, the cheaper of the two costs is kept.
    ///
    /// Edges from unknown nodes are ignored.
    pub fn set_edge(&mut self, from_id: i64, edge: Edge) {
        assert_ne!(from_id, 0);
        assert_ne!(edge.to, 0);
        debug_assert!(edge.cost >= 0.0);

        if let Some((_, edges)) = self.0.get_mut(&from_id) {
            if let Some(candidate) = edges.iter_mut().find(|e| e.to == edge.to) {
                candidate.cost = candidate.cost.min(edge.cost);
            } else {
                edges.push(edge);
            }
        }
    }

    /// Creates a pair of [Edges](Edge) (`a`→`b` and `b`→`a`) with the
    /// great-circle distance between both nodes as the cost.
    /// Returns the cost, or `None` if either of the nodes doesn't exist.
    pub fn connect(&mut self, a: i64, b: i64) -> Option<f64> {
        let a_node = self.get_node(a)?;
        let b_node = self.get_node(b)?;
        let cost = earth_distance(a_node.coord, b_node.coord);

        self.set_edge(a, Edge { to: b, cost });
        self.set_edge(b, Edge { to: a, cost });
        Some(cost)
    }
}
