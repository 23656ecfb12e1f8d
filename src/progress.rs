// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::time::Instant;

use log::{debug, info, warn};

use crate::{earth_distance, project_onto_line, Config, Coordinate, Instruction, Route};

/// Where a navigation session is heading; kept around for rerouting.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub coord: Coordinate,
    pub label: String,
}

impl Destination {
    pub fn new<S: Into<String>>(coord: Coordinate, label: S) -> Self {
        Self {
            coord,
            label: label.into(),
        }
    }
}

/// Live progress along the current [Route].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub current_step_index: usize,

    /// Distance from the last position to the current instruction's vertex, in meters.
    pub distance_to_next_step_meters: f64,

    /// Distance left along the route, in meters.
    pub total_remaining_meters: f64,

    pub estimated_remaining_seconds: f64,

    /// Whether the last position was farther than
    /// [Config::off_route_distance] from the route.
    pub is_off_route: bool,
}

/// Permission to compute a replacement route, issued by
/// [NavigationSession::track] once the user has been deviating
/// for longer than [Config::reroute_delay].
///
/// The ticket is stamped with the session's generation. Its result can only be
/// [installed](NavigationSession::install_reroute) while no newer ticket was issued
/// and the navigation wasn't restarted or stopped in the meantime.
#[derive(Debug, Clone, PartialEq)]
pub struct RerouteTicket {
    generation: u64,

    /// Position from which the new route should start.
    pub from: Coordinate,

    pub destination: Destination,
}

impl RerouteTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of tracking a single position sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub progress: Progress,

    /// Whether [Progress::current_step_index] moved forward with this sample.
    pub advanced: bool,

    /// Set if a reroute should be computed now.
    pub reroute: Option<RerouteTicket>,
}

/// State of following a single route.
#[derive(Debug)]
struct ActiveNavigation {
    route: Route,
    destination: Destination,
    progress: Progress,
    route_length: f64,

    /// Distance along the route polyline to each instruction's vertex.
    step_offsets: Vec<Option<f64>>,

    last_raw_remaining: Option<f64>,
    last_reported_remaining: Option<f64>,

    /// Smallest remaining distance of an on-route sample since this route was installed.
    closest_remaining: Option<f64>,
    was_off_route: bool,

    /// When the user started to be off route (or to move away from the destination).
    deviating_since: Option<Instant>,

    /// Generation and issue time of the last reroute ticket.
    pending_reroute: Option<(u64, Instant)>,
}

impl ActiveNavigation {
    fn new(route: Route, destination: Destination) -> Self {
        let mut cumulative = Vec::with_capacity(route.coordinates.len());
        let mut total = 0.0;
        for (i, &c) in route.coordinates.iter().enumerate() {
            if i > 0 {
                total += earth_distance(route.coordinates[i - 1], c);
            }
            cumulative.push(total);
        }

        let step_offsets = route
            .instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| {
                if route.coordinates.get(i) == Some(&instruction.coord) {
                    Some(cumulative[i])
                } else {
                    project_onto_line(instruction.coord, &route.coordinates).map(|p| p.along)
                }
            })
            .collect();

        Self {
            route,
            destination,
            progress: Progress::default(),
            route_length: total,
            step_offsets,
            last_raw_remaining: None,
            last_reported_remaining: None,
            closest_remaining: None,
            was_off_route: false,
            deviating_since: None,
            pending_reroute: None,
        }
    }
}

/// A single navigation context: the route being followed, the user's progress
/// along it, and the bookkeeping needed to reroute safely.
///
/// The session is either idle or navigating. Every [start](NavigationSession::start),
/// [stop](NavigationSession::stop) and issued [RerouteTicket] bumps its generation,
/// which invalidates all previously issued tickets.
#[derive(Debug, Default)]
pub struct NavigationSession {
    generation: u64,
    active: Option<ActiveNavigation>,
}

impl NavigationSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts following `route`, replacing whatever was followed before.
    /// Resets [Progress] to zeros.
    pub fn start(&mut self, route: Route, destination: Destination) {
        self.generation += 1;
        info!(
            "navigation to {} started: {:.0} m, {} instructions",
            destination.label,
            route.distance_meters,
            route.instructions.len()
        );
        self.active = Some(ActiveNavigation::new(route, destination));
    }

    /// Stops navigation. Any outstanding [RerouteTicket] becomes stale.
    pub fn stop(&mut self) {
        self.generation += 1;
        if let Some(a) = self.active.take() {
            info!("navigation to {} stopped", a.destination.label);
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.active.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn route(&self) -> Option<&Route> {
        self.active.as_ref().map(|a| &a.route)
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.active.as_ref().map(|a| &a.destination)
    }

    /// Returns the last computed progress, or zeros if idle.
    pub fn progress(&self) -> Progress {
        self.active.as_ref().map(|a| a.progress).unwrap_or_default()
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.active
            .as_ref()
            .and_then(|a| a.route.instructions.get(a.progress.current_step_index))
    }

    /// Returns true if the last instruction is current and the user is within
    /// [Config::step_advance_distance] of it. Stopping is left to the caller.
    pub fn has_arrived(&self, config: &Config) -> bool {
        self.active.as_ref().map_or(false, |a| {
            let last = a.route.instructions.len().saturating_sub(1);
            !a.route.instructions.is_empty()
                && a.progress.current_step_index == last
                && a.last_raw_remaining.is_some()
                && a.progress.distance_to_next_step_meters <= config.step_advance_distance
        })
    }

    /// Updates progress with a new position sample.
    /// Returns `None`, leaving the session untouched, if it is idle
    /// or the position [is not valid](Coordinate::is_valid).
    ///
    /// The current step is advanced only while the user moves forward (the remaining
    /// distance shrinks), once they are within [Config::step_advance_distance]
    /// of the step's vertex or already past it by that much.
    ///
    /// While the user is off route, or the remaining distance is more than
    /// [Config::receding_margin] above the smallest one seen on this route, a deviation
    /// timer runs; once it
    /// exceeds [Config::reroute_delay], a [RerouteTicket] is issued. No further ticket
    /// is issued while the last one is younger than [Config::reroute_delay].
    /// Getting back on track cancels the outstanding ticket.
    ///
    /// The reported remaining distance never grows between two samples unless
    /// at least one of them was off route.
    pub fn track(&mut self, position: Coordinate, now: Instant, config: &Config) -> Option<Tick> {
        let a = self.active.as_mut()?;
        if !position.is_valid() {
            warn!("ignoring invalid position {position}");
            return None;
        }
        let instructions = &a.route.instructions;

        let (raw_remaining, along, perpendicular) =
            match project_onto_line(position, &a.route.coordinates) {
                Some(p) => (
                    (a.route_length - p.along).max(0.0),
                    Some(p.along),
                    Some(p.distance),
                ),
                None => (
                    remaining_by_instructions(
                        position,
                        instructions,
                        a.progress.current_step_index,
                    ),
                    None,
                    None,
                ),
            };

        // Advance the current step
        let moving_forward = a.last_raw_remaining.map_or(false, |prev| raw_remaining < prev);
        let last_index = instructions.len().saturating_sub(1);
        let mut index = a.progress.current_step_index.min(last_index);
        let mut advanced = false;

        while moving_forward && index < last_index {
            let near =
                earth_distance(position, instructions[index].coord) <= config.step_advance_distance;
            let passed = match (along, a.step_offsets[index]) {
                (Some(along), Some(offset)) => along >= offset + config.step_advance_distance,
                _ => false,
            };

            if !(near || passed) {
                break;
            }
            index += 1;
            advanced = true;
        }

        let distance_to_next = instructions
            .get(index)
            .map_or(0.0, |i| earth_distance(position, i.coord));

        let is_off_route = match perpendicular {
            Some(d) => d > config.off_route_distance,
            None => !instructions.is_empty() && distance_to_next > config.off_route_distance,
        };

        let total_remaining = match a.last_reported_remaining {
            Some(prev) if !is_off_route && !a.was_off_route => raw_remaining.min(prev),
            _ => raw_remaining,
        };

        // Deviation handling
        let receding = !is_off_route
            && a
                .closest_remaining
                .map_or(false, |closest| raw_remaining > closest + config.receding_margin);
        if !is_off_route {
            a.closest_remaining =
                Some(a.closest_remaining.map_or(raw_remaining, |c| c.min(raw_remaining)));
        }

        let mut reroute = None;
        if is_off_route || receding {
            let since = *a.deviating_since.get_or_insert(now);
            let in_flight = a.pending_reroute.map_or(false, |(generation, issued)| {
                generation == self.generation
                    && now.saturating_duration_since(issued) < config.reroute_delay
            });

            if !in_flight && now.saturating_duration_since(since) >= config.reroute_delay {
                self.generation += 1;
                a.pending_reroute = Some((self.generation, now));
                debug!(
                    "issuing reroute ticket {} from {} (off route: {}, receding: {})",
                    self.generation, position, is_off_route, receding
                );
                reroute = Some(RerouteTicket {
                    generation: self.generation,
                    from: position,
                    destination: a.destination.clone(),
                });
            }
        } else {
            a.deviating_since = None;
            if let Some((generation, _)) = a.pending_reroute.take() {
                if generation == self.generation {
                    debug!("back on track, cancelling reroute ticket {generation}");
                    self.generation += 1;
                }
            }
        }

        if advanced {
            info!(
                "advanced to step {}: {}",
                index, a.route.instructions[index].text
            );
        }

        a.last_raw_remaining = Some(raw_remaining);
        a.last_reported_remaining = Some(total_remaining);
        a.was_off_route = is_off_route;
        a.progress = Progress {
            current_step_index: index,
            distance_to_next_step_meters: distance_to_next,
            total_remaining_meters: total_remaining,
            estimated_remaining_seconds: config.walking_time(total_remaining),
            is_off_route,
        };

        Some(Tick {
            progress: a.progress,
            advanced,
            reroute,
        })
    }

    /// Replaces the followed route with the result of a reroute.
    ///
    /// Returns false, leaving the session untouched, if the ticket is stale:
    /// a newer ticket was issued, or navigation was restarted, stopped or got back
    /// on track since. Tickets are single-use.
    pub fn install_reroute(&mut self, ticket: &RerouteTicket, route: Route) -> bool {
        if ticket.generation != self.generation {
            warn!(
                "discarding stale reroute (ticket {}, current generation {})",
                ticket.generation, self.generation
            );
            return false;
        }

        let Some(a) = self.active.as_mut() else {
            return false;
        };

        self.generation += 1;
        info!(
            "rerouted to {}: {:.0} m, {} instructions",
            a.destination.label,
            route.distance_meters,
            route.instructions.len()
        );
        let destination = a.destination.clone();
        *a = ActiveNavigation::new(route, destination);
        true
    }

    /// Reports that computing the route for `ticket` failed. The last good route
    /// is kept, and the next sample still deviating issues a fresh ticket.
    pub fn reroute_failed(&mut self, ticket: &RerouteTicket) {
        if let Some(a) = self.active.as_mut() {
            if a.pending_reroute.map(|(generation, _)| generation) == Some(ticket.generation) {
                a.pending_reroute = None;
            }
        }
    }
}

/// Coarse remaining distance for routes without geometry: distance to the current
/// instruction, plus the straight-line distances between the remaining instructions.
fn remaining_by_instructions(position: Coordinate, instructions: &[Instruction], index: usize) -> f64 {
    let Some(current) = instructions.get(index) else {
        return 0.0;
    };

    earth_distance(position, current.coord)
        + instructions[index..]
            .windows(2)
            .map(|pair| earth_distance(pair[0].coord, pair[1].coord))
            .sum::<f64>()
}
