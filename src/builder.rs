// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{debug, warn};

use crate::{earth_distance, Config, Coordinate, Edge, Graph, Node, Path};

/// Converts walkable [Paths](Path) into a weighted, undirected [Graph].
///
/// Every pair of consecutive path vertices becomes a pair of edges (one in
/// each direction), costing the great-circle distance between the vertices.
///
/// Vertices are merged into nodes with a radius scan: a vertex lying within
/// [Config::merge_radius] of an already existing node re-uses that node,
/// otherwise a new node is created. The scan goes over nodes in creation
/// order and the first match wins, so with overlapping merge radii the result
/// depends on the order of `paths`. (An alternative policy would be to merge
/// only vertices with identical coordinates after rounding to ~7 decimal
/// places; this tolerates no drawing inaccuracies at all and is not used.)
///
/// After all paths are ingested, every two nodes closer than
/// [Config::link_radius] are additionally connected, even if they come from
/// different paths. This approximates intersections which were drawn without
/// a shared vertex.
///
/// Paths with fewer than 2 vertices or with invalid coordinates are skipped.
/// An empty `paths` slice results in an empty graph.
pub fn build_graph(paths: &[Path], config: &Config) -> Graph {
    let mut g = Graph::new();
    GraphBuilder::new(&mut g, config).add_paths(paths);
    g
}

/// Helper object used for storing state related to converting [Paths](Path)
/// into a [Graph].
struct GraphBuilder<'a> {
    g: &'a mut Graph,
    config: &'a Config,
    node_id_counter: i64,
}

impl<'a> GraphBuilder<'a> {
    fn new(g: &'a mut Graph, config: &'a Config) -> Self {
        let node_id_counter = g.iter().map(|n| n.id).max().unwrap_or(0).max(0);
        Self {
            g,
            config,
            node_id_counter,
        }
    }

    fn add_paths(&mut self, paths: &[Path]) {
        for path in paths {
            self.add_path(path);
        }
        let linked = self.link_nearby_nodes();

        debug!(
            "built graph with {} nodes and {} edges from {} paths ({} proximity links)",
            self.g.len(),
            self.g.edge_count(),
            paths.len(),
            linked,
        );
    }

    fn add_path(&mut self, path: &Path) {
        let name = path.name.as_deref().unwrap_or("<unnamed>");

        if path.coords.len() < 2 {
            warn!("skipping path {name}: fewer than 2 vertices");
            return;
        }

        if let Some(c) = path.coords.iter().find(|c| !c.is_valid()) {
            warn!("skipping path {name}: invalid coordinate {c}");
            return;
        }

        let nodes: Vec<i64> = path
            .coords
            .iter()
            .map(|&coord| self.find_or_create_node(coord))
            .collect();

        self.create_edges(&nodes);
    }

    fn find_or_create_node(&mut self, coord: Coordinate) -> i64 {
        let radius = self.config.merge_radius;
        if let Some(existing) = self
            .g
            .iter()
            .find(|n| earth_distance(n.coord, coord) <= radius)
        {
            return existing.id;
        }

        self.node_id_counter += 1;
        let id = self.node_id_counter;
        self.g.set_node(Node { id, coord });
        id
    }

    fn create_edges(&mut self, nodes: &[i64]) {
        debug_assert!(nodes.len() >= 2);

        for pair in nodes.windows(2) {
            // Both vertices collapsed into the same node
            if pair[0] == pair[1] {
                continue;
            }

            self.g
                .connect(pair[0], pair[1])
                .expect("find_or_create_node should only return nodes which exist");
        }
    }

    /// Connects every pair of nodes closer than [Config::link_radius].
    /// Returns the number of linked pairs.
    fn link_nearby_nodes(&mut self) -> usize {
        let radius = self.config.link_radius;
        if radius <= 0.0 {
            return 0;
        }

        let nodes: Vec<Node> = self.g.iter().cloned().collect();
        let mut linked = 0;

        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let cost = earth_distance(a.coord, b.coord);
                if cost <= radius {
                    self.g.set_edge(a.id, Edge { to: b.id, cost });
                    self.g.set_edge(b.id, Edge { to: a.id, cost });
                    linked += 1;
                }
            }
        }

        linked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination_point;

    const NO_LINKS: Config = Config {
        link_radius: 0.0,
        ..Config::DEFAULT
    };

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    fn assert_symmetric(g: &Graph) {
        for node in g.iter() {
            for edge in g.get_edges(node.id) {
                assert!(edge.cost >= 0.0);
                assert_eq!(
                    g.get_edge(edge.to, node.id),
                    edge.cost,
                    "edge {} -> {} has no twin",
                    node.id,
                    edge.to
                );
            }
        }
    }

    #[test]
    fn empty_input() {
        let g = build_graph(&[], &Config::DEFAULT);
        assert!(g.is_empty());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn single_path() {
        let g = build_graph(
            &[Path::new(vec![c(0.0, 0.0), c(0.001, 0.0), c(0.002, 0.0)])],
            &NO_LINKS,
        );

        assert_eq!(g.len(), 3);
        assert_eq!(g.edge_count(), 4);
        assert_almost_eq!(g.get_edge(1, 2), 111.19, 0.1);
        assert!(g.get_edge(1, 3).is_infinite());
        assert_symmetric(&g);
    }

    #[test]
    fn shared_endpoint_within_tolerance() {
        let junction = c(77.4373, 12.8628);
        let almost_junction = destination_point(junction, 45.0, 0.2);

        let g = build_graph(
            &[
                Path::new(vec![c(77.4363, 12.8628), junction]),
                Path::new(vec![almost_junction, c(77.4383, 12.8628)]),
            ],
            &NO_LINKS,
        );

        assert_eq!(g.len(), 3);
        let junction_node = g.find_nearest_node(junction).unwrap();
        assert_eq!(g.get_edges(junction_node.id).len(), 2);
        assert_symmetric(&g);
    }

    #[test]
    fn endpoints_outside_tolerance_are_not_merged() {
        let junction = c(77.4373, 12.8628);
        let near_junction = destination_point(junction, 45.0, 2.0);

        let paths = [
            Path::new(vec![c(77.4363, 12.8628), junction]),
            Path::new(vec![near_junction, c(77.4383, 12.8628)]),
        ];

        let unlinked = build_graph(&paths, &NO_LINKS);
        assert_eq!(unlinked.len(), 4);
        assert_eq!(unlinked.edge_count(), 4);

        let linked = build_graph(&paths, &Config::DEFAULT);
        assert_eq!(linked.len(), 4);
        assert_almost_eq!(linked.get_edge(2, 3), 2.0, 1e-3);
        assert_symmetric(&linked);
    }

    #[test]
    fn proximity_links_respect_radius() {
        let a = c(77.4373, 12.8628);
        let paths = [
            Path::new(vec![a, destination_point(a, 0.0, 100.0)]),
            Path::new(vec![
                destination_point(a, 90.0, 15.0),
                destination_point(a, 90.0, 200.0),
            ]),
            Path::new(vec![
                destination_point(a, 270.0, 30.0),
                destination_point(a, 270.0, 200.0),
            ]),
        ];

        let g = build_graph(&paths, &Config::DEFAULT);
        assert_eq!(g.len(), 6);
        assert_almost_eq!(g.get_edge(1, 3), 15.0, 1e-3);
        assert!(g.get_edge(1, 5).is_infinite());
        assert_symmetric(&g);
    }

    #[test]
    fn malformed_paths_are_skipped() {
        let g = build_graph(
            &[
                Path::new(vec![c(0.0, 0.0)]),
                Path::new(vec![c(0.0, 0.0), c(f64::NAN, 0.0)]),
                Path::new(vec![c(1.0, 1.0), c(1.001, 1.0)]),
            ],
            &NO_LINKS,
        );
        assert_eq!(g.len(), 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn closed_loop_reuses_first_node() {
        let g = build_graph(
            &[Path::new(vec![
                c(0.0, 0.0),
                c(0.001, 0.0),
                c(0.001, 0.001),
                c(0.0, 0.0),
            ])],
            &NO_LINKS,
        );
        assert_eq!(g.len(), 3);
        assert_eq!(g.edge_count(), 6);
        assert_symmetric(&g);
    }
}
