// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Coordinate;

/// Mean radius of Earth, in meters.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6_371_008.8;

/// Mean diameter of Earth, in meters.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Calculates the great-circle distance between two positions
/// on Earth using the `haversine formula <https://en.wikipedia.org/wiki/Haversine_formula>`_.
/// Returns the result in meters.
pub fn earth_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lon1 = a.lon.to_radians();
    let lat2 = b.lat.to_radians();
    let lon2 = b.lon.to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.min(1.0).sqrt().asin()
}

/// Calculates the initial bearing (forward azimuth) from `a` towards `b`,
/// in degrees within `(-180, 180]`, clockwise from north.
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_angle(y.atan2(x).to_degrees())
}

/// Normalizes an angle in degrees into `(-180, 180]`.
pub(crate) fn normalize_angle(degrees: f64) -> f64 {
    let mut d = degrees % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Calculates the position reached after travelling `distance` meters
/// from `origin` along a great circle with the given initial bearing (degrees).
pub fn destination_point(origin: Coordinate, bearing: f64, distance: f64) -> Coordinate {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let theta = bearing.to_radians();
    let delta = distance / EARTH_RADIUS;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    Coordinate {
        lon: normalize_angle(lon2.to_degrees()),
        lat: lat2.to_degrees(),
    }
}

/// Total length of a polyline, in meters.
pub fn line_length(line: &[Coordinate]) -> f64 {
    line.windows(2)
        .map(|pair| earth_distance(pair[0], pair[1]))
        .sum()
}

/// Result of projecting a position onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProjection {
    /// Nearest point on the polyline.
    pub coord: Coordinate,

    /// Index of the segment containing [LineProjection::coord];
    /// `segment_index` and `segment_index + 1` are valid vertex indices.
    pub segment_index: usize,

    /// Distance from the position to [LineProjection::coord], in meters.
    pub distance: f64,

    /// Distance along the polyline from its first vertex to
    /// [LineProjection::coord], in meters.
    pub along: f64,
}

/// Projects a position onto the nearest point of a polyline.
/// The projection is clamped to the polyline - it never extrapolates past its ends.
///
/// When multiple segments are equally close (e.g. the position lies exactly on
/// an interior vertex), the earliest segment wins.
///
/// Returns `None` if the polyline has fewer than 2 vertices.
pub fn project_onto_line(p: Coordinate, line: &[Coordinate]) -> Option<LineProjection> {
    if line.len() < 2 {
        return None;
    }

    let mut best: Option<LineProjection> = None;
    let mut cumulative = 0.0;

    for (i, segment) in line.windows(2).enumerate() {
        let (a, b) = (segment[0], segment[1]);
        let projected = project_onto_segment(p, a, b);
        let distance = earth_distance(p, projected);

        if best.map_or(true, |prev| distance < prev.distance) {
            best = Some(LineProjection {
                coord: projected,
                segment_index: i,
                distance,
                along: cumulative + earth_distance(a, projected),
            });
        }

        cumulative += earth_distance(a, b);
    }

    best
}

/// Projects a point onto the `a`-`b` segment, using a planar approximation
/// scaled by the cosine of the latitude. Accurate enough for segments
/// much shorter than the Earth's radius.
///
/// Projections beyond the endpoints return the endpoint itself (bit-for-bit).
fn project_onto_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> Coordinate {
    let cos_lat = ((a.lat + b.lat) * 0.5).to_radians().cos();

    let dx = (b.lon - a.lon) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lon - a.lon) * cos_lat;
    let py = p.lat - a.lat;

    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }

    let t = (px * dx + py * dy) / len_sq;
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        Coordinate {
            lon: a.lon + t * (b.lon - a.lon),
            lat: a.lat + t * (b.lat - a.lat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earth_distance_known() {
        // Vienna to Bratislava, ~55 km
        let vienna = Coordinate::new(16.3738, 48.2082);
        let bratislava = Coordinate::new(17.1077, 48.1486);
        let d = earth_distance(vienna, bratislava);
        assert!(d > 54_000.0 && d < 56_000.0, "got {d}");

        assert_eq!(earth_distance(vienna, vienna), 0.0);
        assert_almost_eq!(
            earth_distance(vienna, bratislava),
            earth_distance(bratislava, vienna)
        );
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        assert_almost_eq!(bearing(origin, Coordinate::new(0.0, 1.0)), 0.0);
        assert_almost_eq!(bearing(origin, Coordinate::new(1.0, 0.0)), 90.0);
        assert_almost_eq!(bearing(origin, Coordinate::new(-1.0, 0.0)), -90.0);
        assert_almost_eq!(bearing(origin, Coordinate::new(0.0, -1.0)), 180.0);
    }

    #[test]
    fn normalize_angle_range() {
        assert_almost_eq!(normalize_angle(190.0), -170.0);
        assert_almost_eq!(normalize_angle(-190.0), 170.0);
        assert_almost_eq!(normalize_angle(180.0), 180.0);
        assert_almost_eq!(normalize_angle(-180.0), 180.0);
        assert_almost_eq!(normalize_angle(540.0), 180.0);
        assert_almost_eq!(normalize_angle(29.0), 29.0);
    }

    #[test]
    fn destination_point_round_trip() {
        let origin = Coordinate::new(77.4348, 12.8638);
        let moved = destination_point(origin, 60.0, 250.0);
        assert_almost_eq!(earth_distance(origin, moved), 250.0, 1e-3);
        assert_almost_eq!(bearing(origin, moved), 60.0, 1e-3);
    }

    #[test]
    fn project_onto_line_midpoint() {
        let line = [Coordinate::new(16.0, 48.0), Coordinate::new(17.0, 48.0)];
        let p = project_onto_line(Coordinate::new(16.5, 48.1), &line).unwrap();

        assert_almost_eq!(p.coord.lat, 48.0, 0.01);
        assert_almost_eq!(p.coord.lon, 16.5, 0.01);
        assert_eq!(p.segment_index, 0);
        assert!(p.distance > 10_000.0);
        assert_almost_eq!(p.along, line_length(&line) / 2.0, 1_000.0);
    }

    #[test]
    fn project_onto_line_clamps_to_ends() {
        let line = [Coordinate::new(16.0, 48.0), Coordinate::new(17.0, 48.0)];

        let before = project_onto_line(Coordinate::new(15.5, 48.0), &line).unwrap();
        assert_eq!(before.coord, line[0]);
        assert_eq!(before.along, 0.0);

        let after = project_onto_line(Coordinate::new(17.5, 48.2), &line).unwrap();
        assert_eq!(after.coord, line[1]);
        assert_almost_eq!(after.along, line_length(&line));
    }

    #[test]
    fn project_onto_line_multi_segment() {
        // L-shaped: east, then north
        let line = [
            Coordinate::new(16.0, 48.0),
            Coordinate::new(17.0, 48.0),
            Coordinate::new(17.0, 49.0),
        ];
        let p = project_onto_line(Coordinate::new(17.1, 48.5), &line).unwrap();
        assert_eq!(p.segment_index, 1);
        assert!(p.along > earth_distance(line[0], line[1]));
    }

    #[test]
    fn project_onto_line_needs_two_vertices() {
        let line = [Coordinate::new(16.0, 48.0)];
        assert!(project_onto_line(Coordinate::new(16.0, 48.0), &line).is_none());
        assert!(project_onto_line(Coordinate::new(16.0, 48.0), &[]).is_none());
    }
}
