// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Tunable thresholds for graph building, routing and live navigation.
///
/// All distances are in meters, angles in degrees and speeds in meters per second.
/// [Config::DEFAULT] carries values suitable for a university campus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Polyline vertices closer than this to an existing node are merged into
    /// that node when [building the graph](crate::build_graph). Also used when
    /// looking up segment endpoints while [injecting nodes](crate::inject_node).
    pub merge_radius: f64,

    /// After all paths are ingested, any two nodes closer than this get linked
    /// directly, to approximate intersections which aren't exactly coincident.
    /// Zero disables the linking pass.
    pub link_radius: f64,

    /// Positions farther away from every path than this fail to snap.
    pub max_snap_distance: f64,

    /// Average walking speed used for all duration estimates.
    pub walking_speed: f64,

    /// Bearing changes with an absolute value above this angle are turns,
    /// anything else is "continue straight".
    pub turn_angle: f64,

    /// Points of interest within this radius of a route vertex
    /// are mentioned as landmarks in its instruction.
    pub landmark_radius: f64,

    /// Positions farther than this from the route polyline are off route.
    pub off_route_distance: f64,

    /// The current step is advanced once the user comes this close to it.
    pub step_advance_distance: f64,

    /// How long the user must stay off route (or keep moving away from the
    /// destination) before a reroute is triggered.
    pub reroute_delay: Duration,

    /// Remaining distance more than this margin above its smallest on-route
    /// value counts as moving away from the destination.
    pub receding_margin: f64,
}

impl Config {
    pub const DEFAULT: Self = Self {
        merge_radius: 0.5,
        link_radius: 20.0,
        max_snap_distance: 2_000.0,
        walking_speed: 1.4,
        turn_angle: 30.0,
        landmark_radius: 50.0,
        off_route_distance: 20.0,
        step_advance_distance: 10.0,
        reroute_delay: Duration::from_secs(5),
        receding_margin: 5.0,
    };

    /// Converts a walking distance (in meters) into a duration in seconds.
    pub fn walking_time(&self, meters: f64) -> f64 {
        if self.walking_speed > 0.0 {
            meters / self.walking_speed
        } else {
            0.0
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
