// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use log::debug;

use crate::{Edge, Graph};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    cost: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cost.eq(&other.cost)
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower costs are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.cost.total_cmp(&self.cost)
    }
}

fn reconstruct_path(came_from: &HashMap<i64, i64>, mut last: i64) -> Vec<i64> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    path
}

/// Uses [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// to find the shortest route between two nodes in the provided graph.
///
/// Returns the sequence of node ids from `from_id` to `to_id` (both inclusive),
/// or an empty vector if there is no route between the two nodes
/// (including when either of them doesn't exist in the graph).
/// Among equally short routes, any one may be returned.
///
/// All edge costs must be non-negative, which holds for every
/// graph created by [build_graph](crate::build_graph) and
/// [inject_node](crate::inject_node).
pub fn shortest_path(g: &Graph, from_id: i64, to_id: i64) -> Vec<i64> {
    if g.get_node(from_id).is_none() || g.get_node(to_id).is_none() {
        debug!("shortest_path: unknown node {from_id} or {to_id}");
        return vec![];
    }

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, i64> = HashMap::default();
    let mut known_costs: HashMap<i64, f64> = HashMap::default();

    queue.push(QueueItem {
        at: from_id,
        cost: 0.0,
    });
    known_costs.insert(from_id, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to_id {
            return reconstruct_path(&came_from, to_id);
        }

        // Instead of decreasing keys, we might keep multiple items in the queue for the same node.
        if item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY) {
            continue;
        }

        for &Edge {
            to: neighbor_id,
            cost: edge_cost,
        } in g.get_edges(item.at)
        {
            debug_assert!(edge_cost >= 0.0);

            // Check if this is the cheapest way to the neighbor
            let neighbor_cost = item.cost + edge_cost;
            if neighbor_cost
                >= known_costs
                    .get(&neighbor_id)
                    .cloned()
                    .unwrap_or(f64::INFINITY)
            {
                continue;
            }

            came_from.insert(neighbor_id, item.at);
            known_costs.insert(neighbor_id, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor_id,
                cost: neighbor_cost,
            });
        }
    }

    vec![]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, Node};

    /// Builds a graph with nodes `1..=n` (positions irrelevant)
    /// and the provided undirected, weighted edges.
    fn graph(n: i64, edges: &[(i64, i64, f64)]) -> Graph {
        let mut g = Graph::new();
        for id in 1..=n {
            g.set_node(Node {
                id,
                coord: Coordinate::new(id as f64 * 0.001, 0.0),
            });
        }
        for &(a, b, cost) in edges {
            g.set_edge(a, Edge { to: b, cost });
            g.set_edge(b, Edge { to: a, cost });
        }
        g
    }

    fn path_cost(g: &Graph, path: &[i64]) -> f64 {
        path.windows(2).map(|p| g.get_edge(p[0], p[1])).sum()
    }

    /// Exhaustively enumerates all simple paths to find the cheapest cost.
    fn brute_force(g: &Graph, at: i64, to: i64, visited: &mut Vec<i64>) -> f64 {
        if at == to {
            return 0.0;
        }
        visited.push(at);
        let mut best = f64::INFINITY;
        for edge in g.get_edges(at) {
            if !visited.contains(&edge.to) {
                best = best.min(edge.cost + brute_force(g, edge.to, to, visited));
            }
        }
        visited.pop();
        best
    }

    #[test]
    fn line_graph() {
        let g = graph(3, &[(1, 2, 10.0), (2, 3, 15.0)]);
        let path = shortest_path(&g, 1, 3);
        assert_eq!(path, vec![1, 2, 3]);
        assert_eq!(path_cost(&g, &path), 25.0);
    }

    #[test]
    fn prefers_cheaper_detour() {
        //   1 --100-- 4
        //   |         |
        //  10        10
        //   |         |
        //   2 --10--- 3
        let g = graph(4, &[(1, 4, 100.0), (1, 2, 10.0), (2, 3, 10.0), (3, 4, 10.0)]);
        assert_eq!(shortest_path(&g, 1, 4), vec![1, 2, 3, 4]);
        assert_eq!(shortest_path(&g, 4, 1), vec![4, 3, 2, 1]);
    }

    #[test]
    fn same_start_and_end() {
        let g = graph(2, &[(1, 2, 5.0)]);
        assert_eq!(shortest_path(&g, 1, 1), vec![1]);
    }

    #[test]
    fn disconnected() {
        let g = graph(4, &[(1, 2, 5.0), (3, 4, 5.0)]);
        assert!(shortest_path(&g, 1, 4).is_empty());
    }

    #[test]
    fn unknown_nodes() {
        let g = graph(2, &[(1, 2, 5.0)]);
        assert!(shortest_path(&g, 1, 9).is_empty());
        assert!(shortest_path(&g, 9, 1).is_empty());
    }

    #[test]
    fn optimal_against_brute_force() {
        let g = graph(
            7,
            &[
                (1, 2, 7.0),
                (1, 3, 9.0),
                (1, 6, 14.0),
                (2, 3, 10.0),
                (2, 4, 15.0),
                (3, 4, 11.0),
                (3, 6, 2.0),
                (4, 5, 6.0),
                (5, 6, 9.0),
                (6, 7, 0.0),
                (5, 7, 30.0),
            ],
        );

        for from in 1..=7 {
            for to in 1..=7 {
                let path = shortest_path(&g, from, to);
                assert_eq!(path.first(), Some(&from));
                assert_eq!(path.last(), Some(&to));

                // Every hop must be an existing edge
                for hop in path.windows(2) {
                    assert!(g.get_edge(hop[0], hop[1]).is_finite());
                }

                let expected = brute_force(&g, from, to, &mut vec![]);
                assert_almost_eq!(path_cost(&g, &path), expected);
            }
        }
    }
}
