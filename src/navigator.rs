// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::time::Instant;

use log::{debug, info, warn};

use crate::{
    assemble_route, build_graph, earth_distance, inject_node, shortest_path, snap_to_network,
    Config, Coordinate, Destination, Graph, Instruction, NavigationSession, Path, Place, Progress,
    Route, RoutingError, Snap, END_NODE_ID, START_NODE_ID,
};

/// Source of routes for positions the path network can't connect,
/// e.g. an external street-level directions service.
pub trait DirectionsProvider {
    fn directions(&self, start: Coordinate, end: Coordinate, destination_label: &str)
        -> Option<Route>;
}

/// [DirectionsProvider] which never has any directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirections;

impl DirectionsProvider for NoDirections {
    fn directions(&self, _: Coordinate, _: Coordinate, _: &str) -> Option<Route> {
        None
    }
}

/// Receives navigation events from [Navigator::on_location_update].
/// All methods do nothing by default.
pub trait NavigationObserver {
    /// Called after a reroute replaced the followed route.
    fn route_replaced(&self, _route: &Route) {}

    /// Called when the current instruction changes.
    fn step_advanced(&self, _index: usize, _instruction: &Instruction) {}

    /// Called for every position sample which is off route.
    fn off_route(&self, _progress: &Progress) {}
}

/// [NavigationObserver] ignoring all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NavigationObserver for NoopObserver {}

/// The static path dataset together with the graph built from it.
///
/// Built once and only read afterwards; every routing request works
/// on its own clone of the graph.
#[derive(Debug, Clone, Default)]
pub struct PathNetwork {
    paths: Vec<Path>,
    places: Vec<Place>,
    graph: Graph,
}

impl PathNetwork {
    pub fn new(paths: Vec<Path>, places: Vec<Place>, config: &Config) -> Self {
        let graph = build_graph(&paths, config);
        info!(
            "path network: {} paths, {} places, {} nodes, {} edges",
            paths.len(),
            places.len(),
            graph.len(),
            graph.edge_count()
        );
        Self {
            paths,
            places,
            graph,
        }
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// Routing and navigation over a [PathNetwork].
pub struct Navigator {
    network: PathNetwork,
    config: Config,
    provider: Box<dyn DirectionsProvider>,
    observer: Box<dyn NavigationObserver>,
}

impl Navigator {
    pub fn new(network: PathNetwork, config: Config) -> Self {
        Self {
            network,
            config,
            provider: Box::new(NoDirections),
            observer: Box::new(NoopObserver),
        }
    }

    /// Sets the provider consulted when the path network has no route.
    pub fn with_provider<P: DirectionsProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn with_observer<O: NavigationObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn network(&self) -> &PathNetwork {
        &self.network
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Computes a walking route between two arbitrary positions.
    ///
    /// Both positions are snapped onto the path network and spliced into a private
    /// copy of the graph (falling back to the nearest graph node if splicing fails),
    /// and the shortest path between them becomes the [Route].
    ///
    /// If the network can't connect the positions, the [DirectionsProvider]
    /// is asked for a route before failing with [RoutingError::Unreachable].
    pub fn compute_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        destination_label: &str,
    ) -> Result<Route, RoutingError> {
        let start = start.validate()?;
        let end = end.validate()?;

        match self.route_on_network(start, end, destination_label) {
            Err(RoutingError::Unreachable) => {
                match self.provider.directions(start, end, destination_label) {
                    Some(route) if route.is_routable() => {
                        info!("no route on the path network, using provided directions");
                        Ok(route)
                    }
                    _ => Err(RoutingError::Unreachable),
                }
            }
            result => result,
        }
    }

    fn route_on_network(
        &self,
        start: Coordinate,
        end: Coordinate,
        destination_label: &str,
    ) -> Result<Route, RoutingError> {
        let paths = self.network.paths();
        let start_snap = snap_to_network(start, paths, &self.config)?;
        let end_snap = snap_to_network(end, paths, &self.config)?;
        debug!(
            "snapped start {} to {} ({:.1} m), end {} to {} ({:.1} m)",
            start, start_snap.coord, start_snap.distance, end, end_snap.coord, end_snap.distance
        );

        let mut g = self.network.graph().clone();
        let start_id = self.splice(&mut g, START_NODE_ID, start, &start_snap);
        let end_id = self.splice(&mut g, END_NODE_ID, end, &end_snap);

        let (Some(start_id), Some(end_id)) = (start_id, end_id) else {
            return Err(RoutingError::Unreachable);
        };

        // Both points on one segment - the walk between them doesn't need any graph node
        if start_id == START_NODE_ID
            && end_id == END_NODE_ID
            && start_snap.path_index == end_snap.path_index
            && start_snap.segment_index == end_snap.segment_index
        {
            g.connect(START_NODE_ID, END_NODE_ID);
        }

        let node_path = shortest_path(&g, start_id, end_id);
        if node_path.len() < 2 {
            debug!("no path between {start_id} and {end_id}");
            return Err(RoutingError::Unreachable);
        }

        let route = assemble_route(
            &node_path,
            &g,
            destination_label,
            self.network.places(),
            &self.config,
        );
        if !route.is_routable() {
            return Err(RoutingError::Unreachable);
        }

        debug!(
            "route to {destination_label}: {:.0} m through {} nodes",
            route.distance_meters,
            node_path.len()
        );
        Ok(route)
    }

    /// Injects a temporary node for a snapped position, or returns the node nearest
    /// to the raw position if the snapped segment isn't present in the graph.
    fn splice(&self, g: &mut Graph, id: i64, position: Coordinate, snap: &Snap) -> Option<i64> {
        match inject_node(
            g,
            id,
            snap.coord,
            snap.segment_start,
            snap.segment_end,
            self.config.merge_radius,
        ) {
            Ok(id) => Some(id),
            Err(e) => {
                let fallback = g.find_nearest_node(position).map(|n| n.id);
                warn!("{e} - falling back to nearest node {fallback:?}");
                fallback
            }
        }
    }

    /// Starts following a route. Fails if the route can't be followed
    /// or the destination is not a valid position.
    pub fn begin_navigation(
        &self,
        route: Route,
        destination: Destination,
    ) -> Result<NavigationSession, RoutingError> {
        destination.coord.validate()?;
        if !route.is_routable() {
            return Err(RoutingError::Unreachable);
        }

        let mut session = NavigationSession::new();
        session.start(route, destination);
        Ok(session)
    }

    pub fn end_navigation(&self, session: &mut NavigationSession) {
        session.stop();
    }

    /// Feeds a position sample into a navigation session.
    ///
    /// A missing sample returns the last known progress unchanged.
    /// If the session asks for a reroute, the new route is computed right away;
    /// on success it replaces the followed route and the sample is tracked again
    /// against it, on failure the old route is kept and a retry happens
    /// with the next deviating sample.
    pub fn on_location_update(
        &self,
        session: &mut NavigationSession,
        position: Option<Coordinate>,
        now: Instant,
    ) -> Result<Progress, RoutingError> {
        let Some(position) = position else {
            return Ok(session.progress());
        };
        let position = position.validate()?;

        let Some(tick) = session.track(position, now, &self.config) else {
            return Ok(Progress::default());
        };

        if tick.advanced {
            if let Some(instruction) = session.current_instruction() {
                self.observer
                    .step_advanced(tick.progress.current_step_index, instruction);
            }
        }
        if tick.progress.is_off_route {
            self.observer.off_route(&tick.progress);
        }

        let Some(ticket) = tick.reroute else {
            return Ok(tick.progress);
        };

        match self.compute_route(ticket.from, ticket.destination.coord, &ticket.destination.label) {
            Ok(route) => {
                let route = self.start_route_at(ticket.from, route, &ticket.destination.label);
                if !session.install_reroute(&ticket, route) {
                    return Ok(tick.progress);
                }
                if let Some(route) = session.route() {
                    self.observer.route_replaced(route);
                }
                Ok(session
                    .track(position, now, &self.config)
                    .map_or_else(|| session.progress(), |t| t.progress))
            }
            Err(e) => {
                warn!("reroute to {} failed: {e}", ticket.destination.label);
                session.reroute_failed(&ticket);
                Ok(tick.progress)
            }
        }
    }

    /// Prepends `position` to a route starting farther than
    /// [Config::off_route_distance] away from it, so that a user off the path
    /// network is on the new route right away.
    fn start_route_at(&self, position: Coordinate, route: Route, destination_label: &str) -> Route {
        match route.coordinates.first() {
            Some(&first) if earth_distance(position, first) > self.config.off_route_distance => {
                let mut coordinates = Vec::with_capacity(route.coordinates.len() + 1);
                coordinates.push(position);
                coordinates.extend(route.coordinates);
                Route::from_coordinates(
                    coordinates,
                    destination_label,
                    self.network.places(),
                    &self.config,
                )
            }
            _ => route,
        }
    }
}
