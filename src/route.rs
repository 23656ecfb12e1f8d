// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;

use geojson::{Feature, FeatureCollection, Geometry, Value};
use log::warn;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::distance::normalize_angle;
use crate::{bearing, earth_distance, Config, Coordinate, Graph, Place};

/// Kind of a navigation [Instruction].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionKind {
    Start,
    Continue,
    Turn,
    Arrive,
}

/// Direction of a navigation [Instruction].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Straight,
}

impl Direction {
    /// Classifies a bearing change (in degrees, positive clockwise) at a route vertex.
    /// Changes with an absolute value above `turn_angle` are turns.
    pub fn from_bearing_change(change: f64, turn_angle: f64) -> Self {
        let change = normalize_angle(change);
        if change.abs() <= turn_angle {
            Direction::Straight
        } else if change > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Straight => "straight",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step of turn-by-turn guidance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub id: String,
    pub text: String,

    /// Distance from this instruction's vertex to the next one, in meters.
    pub distance_meters: f64,

    /// Walking time from this instruction's vertex to the next one, in seconds.
    pub duration_seconds: f64,

    pub coord: Coordinate,
    pub kind: InstructionKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    /// Name of a point of interest near this instruction's vertex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

/// A walkable route with turn-by-turn instructions.
///
/// Routes are never modified - rerouting replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub coordinates: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,

    /// For routes with at least 2 coordinates, the first instruction is always
    /// [InstructionKind::Start] and the last is always [InstructionKind::Arrive],
    /// with one instruction per interior vertex in between.
    pub instructions: Vec<Instruction>,
}

impl Route {
    /// Creates a route following straight lines between `coordinates`,
    /// synthesizing instructions from bearing changes at every interior vertex.
    ///
    /// Invalid coordinates are dropped. Routes with fewer than 2 coordinates
    /// have zero length and no instructions.
    pub fn from_coordinates(
        mut coordinates: Vec<Coordinate>,
        destination_label: &str,
        places: &[Place],
        config: &Config,
    ) -> Self {
        let before = coordinates.len();
        coordinates.retain(|c| c.is_valid());
        if coordinates.len() != before {
            warn!(
                "dropped {} invalid route coordinate(s)",
                before - coordinates.len()
            );
        }

        if coordinates.len() < 2 {
            return Route {
                coordinates,
                ..Route::default()
            };
        }

        let distance_meters = crate::line_length(&coordinates);
        let instructions = generate_instructions(&coordinates, destination_label, places, config);

        Route {
            coordinates,
            distance_meters,
            duration_seconds: config.walking_time(distance_meters),
            instructions,
        }
    }

    /// Returns true if the route has at least 2 coordinates and can be followed.
    pub fn is_routable(&self) -> bool {
        self.coordinates.len() >= 2
    }

    /// Duration rounded to whole minutes, for display.
    pub fn duration_minutes(&self) -> u64 {
        (self.duration_seconds / 60.0).round() as u64
    }

    /// Distance in kilometers rounded to 2 decimal places, for display.
    pub fn distance_km(&self) -> f64 {
        (self.distance_meters / 10.0).round() / 100.0
    }

    /// Converts the route into a GeoJSON FeatureCollection: one LineString
    /// with the route geometry, followed by one Point per instruction.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.instructions.len() + 1);

        let mut properties = Map::new();
        properties.insert("distance".into(), self.distance_meters.into());
        properties.insert("duration".into(), self.duration_seconds.into());
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(
                self.coordinates.iter().map(|c| vec![c.lon, c.lat]).collect(),
            ))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });

        for instruction in &self.instructions {
            let properties = match serde_json::to_value(instruction) {
                Ok(JsonValue::Object(mut o)) => {
                    o.remove("coord");
                    Some(o)
                }
                _ => None,
            };

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    instruction.coord.lon,
                    instruction.coord.lat,
                ]))),
                id: None,
                properties,
                foreign_members: None,
            });
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Converts a node path (as returned by [shortest_path](crate::shortest_path))
/// into a [Route] through the nodes' positions.
///
/// Paths with fewer than 2 nodes produce a non-routable route with zero length
/// and no instructions. Unknown node ids are skipped, and consecutive nodes
/// within [Config::merge_radius] of each other (e.g. an injected node on top
/// of a path vertex) are collapsed into the first one.
pub fn assemble_route(
    node_path: &[i64],
    g: &Graph,
    destination_label: &str,
    places: &[Place],
    config: &Config,
) -> Route {
    let mut coordinates: Vec<Coordinate> = node_path
        .iter()
        .filter_map(|&id| {
            let node = g.get_node(id);
            if node.is_none() {
                warn!("assemble_route: skipping unknown node {id}");
            }
            node.map(|n| n.coord)
        })
        .collect();
    coordinates.dedup_by(|next, kept| earth_distance(*kept, *next) <= config.merge_radius);

    Route::from_coordinates(coordinates, destination_label, places, config)
}

fn generate_instructions(
    coordinates: &[Coordinate],
    destination_label: &str,
    places: &[Place],
    config: &Config,
) -> Vec<Instruction> {
    debug_assert!(coordinates.len() >= 2);
    let mut instructions = Vec::with_capacity(coordinates.len());

    instructions.push(Instruction {
        id: "start".into(),
        text: format!("Head towards {destination_label}"),
        distance_meters: 0.0,
        duration_seconds: 0.0,
        coord: coordinates[0],
        kind: InstructionKind::Start,
        direction: None,
        landmark: None,
    });

    for (i, window) in coordinates.windows(3).enumerate() {
        let (prev, current, next) = (window[0], window[1], window[2]);
        let distance = earth_distance(current, next);
        let landmark = find_landmark(current, places, config.landmark_radius);

        // Zero-length legs have no meaningful bearing
        let direction = if prev == current || current == next {
            Direction::Straight
        } else {
            let change = bearing(current, next) - bearing(prev, current);
            Direction::from_bearing_change(change, config.turn_angle)
        };

        let (kind, text) = match (direction, &landmark) {
            (Direction::Straight, Some(l)) => {
                (InstructionKind::Continue, format!("Continue straight past {l}"))
            }
            (Direction::Straight, None) => (InstructionKind::Continue, "Continue straight".into()),
            (d, Some(l)) => (InstructionKind::Turn, format!("Turn {d} towards {l}")),
            (d, None) => (InstructionKind::Turn, format!("Turn {d}")),
        };

        instructions.push(Instruction {
            id: format!("step-{}", i + 1),
            text,
            distance_meters: distance,
            duration_seconds: config.walking_time(distance),
            coord: current,
            kind,
            direction: Some(direction),
            landmark,
        });
    }

    instructions.push(Instruction {
        id: "arrive".into(),
        text: format!("Arrive at {destination_label}"),
        distance_meters: 0.0,
        duration_seconds: 0.0,
        coord: coordinates[coordinates.len() - 1],
        kind: InstructionKind::Arrive,
        direction: None,
        landmark: None,
    });

    instructions
}

/// Returns the name of the first place within `radius` meters of `coord`.
fn find_landmark(coord: Coordinate, places: &[Place], radius: f64) -> Option<String> {
    places
        .iter()
        .find(|p| earth_distance(coord, p.coord) <= radius)
        .map(|p| p.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{destination_point, shortest_path, Edge, Node};

    const ORIGIN: Coordinate = Coordinate::new(77.4370, 12.8630);

    /// Walks 50 meters north, then 50 meters in the given bearing.
    fn bent_line(second_bearing: f64) -> Vec<Coordinate> {
        let corner = destination_point(ORIGIN, 0.0, 50.0);
        vec![ORIGIN, corner, destination_point(corner, second_bearing, 50.0)]
    }

    fn route(coords: Vec<Coordinate>) -> Route {
        Route::from_coordinates(coords, "Library", &[], &Config::DEFAULT)
    }

    #[test]
    fn classify_bearing_change() {
        assert_eq!(Direction::from_bearing_change(29.0, 30.0), Direction::Straight);
        assert_eq!(Direction::from_bearing_change(30.0, 30.0), Direction::Straight);
        assert_eq!(Direction::from_bearing_change(31.0, 30.0), Direction::Right);
        assert_eq!(Direction::from_bearing_change(-31.0, 30.0), Direction::Left);
        assert_eq!(Direction::from_bearing_change(-29.0, 30.0), Direction::Straight);

        // Wrap-around: 170° -> -170° is a 20° right change
        assert_eq!(Direction::from_bearing_change(-170.0 - 170.0, 30.0), Direction::Straight);
        assert_eq!(Direction::from_bearing_change(350.0, 30.0), Direction::Straight);
        assert_eq!(Direction::from_bearing_change(270.0, 30.0), Direction::Left);
    }

    #[test]
    fn bearing_change_of_29_and_31_degrees() {
        let slight = route(bent_line(29.0));
        assert_eq!(slight.instructions[1].kind, InstructionKind::Continue);
        assert_eq!(slight.instructions[1].direction, Some(Direction::Straight));
        assert_eq!(slight.instructions[1].text, "Continue straight");

        let turn = route(bent_line(31.0));
        assert_eq!(turn.instructions[1].kind, InstructionKind::Turn);
        assert_eq!(turn.instructions[1].direction, Some(Direction::Right));
        assert_eq!(turn.instructions[1].text, "Turn right");

        let left = route(bent_line(-90.0));
        assert_eq!(left.instructions[1].kind, InstructionKind::Turn);
        assert_eq!(left.instructions[1].direction, Some(Direction::Left));
    }

    #[test]
    fn instruction_bookending() {
        let corner = destination_point(ORIGIN, 0.0, 50.0);
        let corner2 = destination_point(corner, 90.0, 30.0);
        let coords = vec![ORIGIN, corner, corner2, destination_point(corner2, 0.0, 20.0)];
        let r = route(coords.clone());

        assert_eq!(r.instructions.len(), coords.len());
        assert_eq!(r.instructions[0].kind, InstructionKind::Start);
        assert_eq!(r.instructions[0].text, "Head towards Library");
        assert_eq!(r.instructions[0].distance_meters, 0.0);
        assert_eq!(r.instructions[0].coord, ORIGIN);

        let last = r.instructions.last().unwrap();
        assert_eq!(last.kind, InstructionKind::Arrive);
        assert_eq!(last.text, "Arrive at Library");
        assert_eq!(last.duration_seconds, 0.0);
        assert_eq!(last.coord, coords[3]);

        assert_eq!(r.instructions[1].direction, Some(Direction::Right));
        assert_eq!(r.instructions[2].direction, Some(Direction::Left));
        assert_almost_eq!(r.instructions[1].distance_meters, 30.0, 1e-3);
        assert_almost_eq!(r.instructions[2].distance_meters, 20.0, 1e-3);
        assert_almost_eq!(r.instructions[1].duration_seconds, 30.0 / 1.4, 1e-3);
        assert_eq!(r.instructions[1].id, "step-1");
        assert_eq!(r.instructions[2].id, "step-2");
        assert_eq!(last.id, "arrive");

        assert_almost_eq!(r.distance_meters, 100.0, 1e-3);
        assert_almost_eq!(r.duration_seconds, 100.0 / 1.4, 1e-3);
        assert_eq!(r.duration_minutes(), 1);
        assert_eq!(r.distance_km(), 0.1);
    }

    #[test]
    fn two_point_route() {
        let r = route(vec![ORIGIN, destination_point(ORIGIN, 0.0, 10.0)]);
        assert_eq!(r.instructions.len(), 2);
        assert_eq!(r.instructions[0].kind, InstructionKind::Start);
        assert_eq!(r.instructions[1].kind, InstructionKind::Arrive);
    }

    #[test]
    fn landmarks() {
        let coords = bent_line(90.0);
        let places = [
            Place::new("Far Away Hall", destination_point(coords[1], 180.0, 500.0)),
            Place::new("Library", destination_point(coords[1], 45.0, 20.0)),
            Place::new("Canteen", destination_point(coords[1], 135.0, 30.0)),
        ];
        let r = Route::from_coordinates(coords, "Sixth Block", &places, &Config::DEFAULT);

        assert_eq!(r.instructions[1].landmark.as_deref(), Some("Library"));
        assert_eq!(r.instructions[1].text, "Turn right towards Library");

        let straight = Route::from_coordinates(bent_line(0.0), "X", &places, &Config::DEFAULT);
        assert_eq!(straight.instructions[1].text, "Continue straight past Library");
    }

    #[test]
    fn zero_length_leg_is_straight() {
        let corner = destination_point(ORIGIN, 0.0, 50.0);
        let r = route(vec![ORIGIN, corner, corner, destination_point(corner, 90.0, 10.0)]);
        assert_eq!(r.instructions.len(), 4);
        assert_eq!(r.instructions[2].kind, InstructionKind::Continue);
    }

    #[test]
    fn trivial_paths() {
        let mut g = Graph::new();
        g.set_node(Node {
            id: 1,
            coord: ORIGIN,
        });

        let empty = assemble_route(&[], &g, "Library", &[], &Config::DEFAULT);
        assert!(!empty.is_routable());
        assert!(empty.instructions.is_empty());
        assert_eq!(empty.distance_meters, 0.0);

        let single = assemble_route(&[1], &g, "Library", &[], &Config::DEFAULT);
        assert!(!single.is_routable());
        assert!(single.instructions.is_empty());
        assert_eq!(single.distance_meters, 0.0);
    }

    #[test]
    fn assemble_from_node_path() {
        let coords = bent_line(90.0);
        let mut g = Graph::new();
        for (i, &coord) in coords.iter().enumerate() {
            g.set_node(Node {
                id: i as i64 + 1,
                coord,
            });
        }
        g.connect(1, 2);
        g.connect(2, 3);
        g.set_edge(1, Edge { to: 3, cost: 1_000.0 });

        let path = shortest_path(&g, 1, 3);
        assert_eq!(path, vec![1, 2, 3]);

        let r = assemble_route(&path, &g, "Library", &[], &Config::DEFAULT);
        assert_eq!(r.coordinates, coords);
        assert_almost_eq!(r.distance_meters, 100.0, 1e-3);
        assert_eq!(r.instructions.len(), 3);
        assert_eq!(r.instructions[1].kind, InstructionKind::Turn);
    }

    #[test]
    fn assemble_collapses_coincident_nodes() {
        let coords = bent_line(90.0);
        let mut g = Graph::new();
        for (i, &coord) in coords.iter().enumerate() {
            g.set_node(Node {
                id: i as i64 + 1,
                coord,
            });
        }
        g.set_node(Node { id: -1, coord: coords[0] });
        g.set_node(Node { id: -2, coord: coords[2] });

        let r = assemble_route(&[-1, 1, 2, 3, -2], &g, "Library", &[], &Config::DEFAULT);
        assert_eq!(r.coordinates, coords);
        assert_eq!(r.instructions.len(), 3);
        assert_eq!(r.instructions[1].kind, InstructionKind::Turn);
        assert!(r.instructions.iter().all(|i| i.kind != InstructionKind::Continue));
    }

    #[test]
    fn invalid_coordinates_are_dropped() {
        let mut coords = bent_line(90.0);
        coords.insert(1, Coordinate::new(f64::NAN, 12.0));
        coords.push(Coordinate::new(0.0, 100.0));

        let r = route(coords);
        assert_eq!(r.coordinates, bent_line(90.0));
        assert!(r.distance_meters.is_finite());
        assert_almost_eq!(r.distance_meters, 100.0, 1e-3);
        assert_eq!(r.instructions.len(), 3);
    }

    #[test]
    fn geojson_export() {
        let r = route(bent_line(90.0));
        let fc = r.to_geojson();

        assert_eq!(fc.features.len(), 4);
        match &fc.features[0].geometry.as_ref().unwrap().value {
            Value::LineString(line) => assert_eq!(line.len(), 3),
            other => panic!("expected LineString, got {other:?}"),
        }

        let turn = fc.features[2].properties.as_ref().unwrap();
        assert_eq!(turn["kind"], "turn");
        assert_eq!(turn["direction"], "right");
        assert_eq!(turn["id"], "step-1");
        assert!(!turn.contains_key("landmark"));
        assert!(!turn.contains_key("coord"));
    }
}
