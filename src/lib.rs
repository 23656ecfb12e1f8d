// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Pedestrian routing over small, hand-drawn campus path networks.
//!
//! Walkable paths (polylines) are converted into a weighted undirected [Graph],
//! arbitrary positions are snapped onto the network and spliced into a private
//! copy of the graph, Dijkstra finds the shortest node path, and the result is
//! turned into a [Route] with turn-by-turn [Instructions](Instruction).
//! A [NavigationSession] then follows a live position stream, tracking progress,
//! detecting off-route conditions and rerouting.
//!
//! # Example
//!
//! ```no_run
//! use campus_nav::{Config, Coordinate, Navigator, PathNetwork};
//!
//! let paths = campus_nav::dataset::paths_from_file(
//!     "path/to/paths.geojson",
//!     campus_nav::dataset::FileFormat::Unknown,
//! ).expect("failed to load paths");
//!
//! let network = PathNetwork::new(paths, vec![], &Config::DEFAULT);
//! let navigator = Navigator::new(network, Config::DEFAULT);
//!
//! let start = Coordinate::new(77.4350, 12.8638);
//! let end = Coordinate::new(77.4398, 12.8621);
//! let route = navigator.compute_route(start, end, "Sixth Block").expect("no route");
//!
//! println!("{} m, {} min", route.distance_meters, route.duration_minutes());
//! ```


mod builder;
mod config;
pub mod dataset;
mod dijkstra;
mod distance;
mod error;
mod graph;
mod inject;
mod navigator;
mod progress;
mod route;
mod snap;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::build_graph;
pub use config::Config;
pub use dijkstra::shortest_path;
pub use distance::{
    bearing, destination_point, earth_distance, line_length, project_onto_line, LineProjection,
};
pub use error::RoutingError;
pub use graph::Graph;
pub use inject::{inject_node, END_NODE_ID, START_NODE_ID};
pub use navigator::{
    DirectionsProvider, NavigationObserver, Navigator, NoDirections, NoopObserver, PathNetwork,
};
pub use progress::{Destination, NavigationSession, Progress, RerouteTicket, Tick};
pub use route::{assemble_route, Direction, Instruction, InstructionKind, Route};
pub use snap::{snap_to_network, Snap};

/// A `(longitude, latitude)` pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if both components are finite and within
    /// `[-180, 180]` (longitude) and `[-90, 90]` (latitude).
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.lon.abs() <= 180.0
            && self.lat.abs() <= 90.0
    }

    /// Returns the coordinate back if it [is valid](Coordinate::is_valid),
    /// or [RoutingError::InvalidCoordinate] otherwise.
    pub fn validate(self) -> Result<Self, RoutingError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(RoutingError::InvalidCoordinate(self))
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

/// Represents a vertex of the [Graph]: a path junction, a path endpoint,
/// or a point injected for a single routing request.
///
/// Nodes with `id == 0` are disallowed. Positive ids are assigned by
/// [build_graph], negative ids are reserved for injected nodes
/// ([START_NODE_ID], [END_NODE_ID]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub coord: Coordinate,
}

/// Represents an outgoing (one-way) connection from a specific [Node].
///
/// `cost` is the great-circle distance between the two nodes, in meters.
/// Walkways are bidirectional, so every edge has a twin going the other way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: i64,
    pub cost: f64,
}

/// A walkable polyline from the static path dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub name: Option<String>,
    pub coords: Vec<Coordinate>,
}

impl Path {
    pub fn new(coords: Vec<Coordinate>) -> Self {
        Self { name: None, coords }
    }

    pub fn named<S: Into<String>>(name: S, coords: Vec<Coordinate>) -> Self {
        Self {
            name: Some(name.into()),
            coords,
        }
    }
}

/// A named point of interest, used to mention landmarks in instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub coord: Coordinate,
}

impl Place {
    pub fn new<S: Into<String>>(name: S, coord: Coordinate) -> Self {
        Self {
            name: name.into(),
            coord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_validation() {
        assert!(Coordinate::new(77.43, 12.86).is_valid());
        assert!(Coordinate::new(-180.0, 90.0).is_valid());
        assert!(!Coordinate::new(180.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -90.1).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());

        assert_eq!(
            Coordinate::new(200.0, 0.0).validate(),
            Err(RoutingError::InvalidCoordinate(Coordinate::new(200.0, 0.0)))
        );
    }
}
