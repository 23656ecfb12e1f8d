// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{project_onto_line, Config, Coordinate, Path, RoutingError};

/// Result of snapping a position onto the path network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// The nearest point on the nearest path.
    pub coord: Coordinate,

    /// First vertex of the segment containing [Snap::coord].
    pub segment_start: Coordinate,

    /// Second vertex of the segment containing [Snap::coord].
    pub segment_end: Coordinate,

    /// Index of [Snap::segment_start] within the path;
    /// always in `[0, path.coords.len() - 2]`.
    pub segment_index: usize,

    /// Index of the path within the slice passed to [snap_to_network].
    pub path_index: usize,

    /// Distance between the snapped position and [Snap::coord], in meters.
    pub distance: f64,
}

/// Projects `point` onto the nearest point of the nearest [Path].
///
/// Ties between paths are resolved in favor of the earlier path, and ties between
/// segments of a single path in favor of the earlier segment - so a point lying
/// exactly on an interior vertex snaps to the segment ending at that vertex.
///
/// Fails with:
/// - [RoutingError::InvalidCoordinate] if `point` is out of range,
/// - [RoutingError::NoPathNetwork] if `paths` is empty,
/// - [RoutingError::SnapFailed] if no path has at least 2 vertices, or the nearest
///   path is farther away than [Config::max_snap_distance].
pub fn snap_to_network(
    point: Coordinate,
    paths: &[Path],
    config: &Config,
) -> Result<Snap, RoutingError> {
    let point = point.validate()?;
    if paths.is_empty() {
        return Err(RoutingError::NoPathNetwork);
    }

    let mut best: Option<Snap> = None;

    for (path_index, path) in paths.iter().enumerate() {
        let projection = match project_onto_line(point, &path.coords) {
            Some(p) => p,
            None => continue,
        };

        if best.map_or(false, |b| projection.distance >= b.distance) {
            continue;
        }

        let segment_index = projection.segment_index.min(path.coords.len() - 2);
        best = Some(Snap {
            coord: projection.coord,
            segment_start: path.coords[segment_index],
            segment_end: path.coords[segment_index + 1],
            segment_index,
            path_index,
            distance: projection.distance,
        });
    }

    match best {
        Some(snap) if snap.distance <= config.max_snap_distance => Ok(snap),
        _ => Err(RoutingError::SnapFailed(point)),
    }
}
