// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Coordinate;

/// Error conditions which may occur when computing a route.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    /// The path dataset is empty - no walkable route is available.
    #[error("no walkable path network available")]
    NoPathNetwork,

    /// A position couldn't be projected onto any path,
    /// usually because it's too far away from the network.
    #[error("position {0} is not reachable from the path network")]
    SnapFailed(Coordinate),

    /// Endpoints of a snapped segment don't correspond to any graph node.
    /// Routing recovers from this by using the nearest existing node instead.
    #[error("segment endpoints {start} - {end} not found in graph")]
    GraphInconsistency { start: Coordinate, end: Coordinate },

    /// The start and end positions lie on disconnected parts of the network.
    #[error("no route found")]
    Unreachable,

    /// A longitude or latitude is out of range or not finite.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(Coordinate),
}
