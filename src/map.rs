use crate::card::TrainColor;
use crate::city::{normalized, CityId, CityToCity};
use crate::error::{GameError, SetupError};
use crate::topology::{MapKind, Topology};

use serde::Serialize;
use smallvec::SmallVec;
use std::cmp::max;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

// Helena has the highest number of neighbors on the classic map, which is 7 adjacent cities.
const MAX_ROUTES_PER_CITY: usize = 7;

/// Index of a route in [`Map::routes`].
pub type RouteId = usize;

/// All lanes connecting two adjacent cities, in declaration order.
/// Lanes are paired two by two: 0 with 1, 2 with 3.
type ParallelRoutes = SmallVec<[RouteId; 4]>;

/// There can be multiple "parallel" routes between two cities.
/// `Route` represents one of them.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub start: CityId,
    pub end: CityId,
    /// The color of this specific route.
    /// The `Wild` color means that any color matches.
    pub color: TrainColor,
    /// The distance between two cities. This is analogous to the number of train cards needed to claim the route.
    pub length: u8,
    /// Claiming a tunnel reveals three cards which may raise its cost.
    pub tunnel: bool,
    /// Minimum number of wild cards needed to claim this route.
    pub locomotives: u8,
    /// By whom this route is claimed, if any.
    claimer: Option<usize>,
}

impl Route {
    /// The player ID claiming this route, if any.
    #[inline]
    pub fn claimer(&self) -> Option<usize> {
        self.claimer
    }

    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claimer.is_some()
    }

    /// Whether cards of the given (non-wild) color can pay for this route.
    #[inline]
    pub fn accepts(&self, color: TrainColor) -> bool {
        color.is_not_wild() && (self.color.is_wild() || self.color == color)
    }

    /// Whether the route connects these two cities, in either direction.
    #[inline]
    pub fn connects(&self, start: CityId, end: CityId) -> bool {
        (self.start == start && self.end == end) || (self.start == end && self.end == start)
    }
}

/// Holds the information about a route successfully claimed by a player.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimedRoute {
    pub route: CityToCity,
    pub route_id: RouteId,
    pub length: u8,
}

/// The authoritative state of the map, per game.
/// This is mutated as players claim routes throughout the game.
///
/// Cloning a `Map` yields a fully independent board: claims on the copy never show up on
/// the original.
#[derive(Clone, Debug)]
pub struct Map {
    kind: MapKind,
    num_cities: usize,
    routes: Vec<Route>,
    /// Maps two adjacent cities, smallest first, to the lanes between them.
    all_parallel_routes: BTreeMap<CityToCity, ParallelRoutes>,
    /// Depending on the number of players (>3), both lanes of a pair might be claimed.
    /// In all cases, both lanes of a pair cannot be claimed by the same player.
    parallel_routes_allowed: bool,
}

impl Map {
    fn get_range_of_routes_starting_at_city(city: CityId) -> RangeInclusive<CityToCity> {
        (city, CityId(0))..=(city, CityId(u16::MAX))
    }

    /// Generates a `Map` from a topology.
    ///
    /// Succeeds if the topology is valid and the given number of players is allowed
    /// (i.e. must be between two and five, inclusively). Otherwise, returns an error.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::map::Map;
    /// use ticket_to_ride_planner::topology::Topology;
    ///
    /// assert!(Map::new(&Topology::usa(), 5).is_ok());
    /// assert!(Map::new(&Topology::usa(), 1).is_err());
    /// ```
    pub fn new(topology: &Topology, num_players: usize) -> Result<Self, SetupError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
            return Err(GameError::InvalidPlayerCount(num_players).into());
        }
        topology.validate()?;

        let mut routes = Vec::with_capacity(topology.routes.len());
        let mut all_parallel_routes: BTreeMap<CityToCity, ParallelRoutes> = BTreeMap::new();
        for (id, spec) in topology.routes.iter().enumerate() {
            let start = topology.city(&spec.start)?;
            let end = topology.city(&spec.end)?;

            routes.push(Route {
                id,
                start,
                end,
                color: spec.color,
                length: spec.length,
                tunnel: spec.tunnel,
                locomotives: spec.locomotives,
                claimer: None,
            });
            all_parallel_routes
                .entry(normalized((start, end)))
                .or_default()
                .push(id);
        }

        Ok(Self {
            kind: topology.kind,
            num_cities: topology.num_cities(),
            routes,
            all_parallel_routes,
            // Parallel routes can be claimed iff there is more than three players.
            // Otherwise, only one of the routes connecting two cities can be claimed.
            parallel_routes_allowed: num_players > 3,
        })
    }

    #[inline]
    pub fn kind(&self) -> MapKind {
        self.kind
    }

    #[inline]
    pub fn num_cities(&self) -> usize {
        self.num_cities
    }

    #[inline]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, route_id: RouteId) -> Result<&Route, GameError> {
        self.routes
            .get(route_id)
            .ok_or(GameError::UnknownRoute(route_id))
    }

    /// Every lane between two cities, in either order.
    pub fn routes_between(&self, start: CityId, end: CityId) -> impl Iterator<Item = &Route> {
        self.all_parallel_routes
            .get(&normalized((start, end)))
            .into_iter()
            .flatten()
            .map(move |route_id| &self.routes[*route_id])
    }

    /// Every city adjacent to `city`, whether or not routes are claimed.
    pub fn neighbors(&self, city: CityId) -> impl Iterator<Item = CityId> + '_ {
        self.routes
            .iter()
            .filter_map(move |route| match route {
                route if route.start == city => Some(route.end),
                route if route.end == city => Some(route.start),
                _ => None,
            })
    }

    /// Edges of the route graph, for the distance oracle.
    pub fn edges(&self) -> impl Iterator<Item = (CityId, CityId, u8)> + '_ {
        self.routes
            .iter()
            .map(|route| (route.start, route.end, route.length))
    }

    /// The lane paired with `route_id`, if it has one.
    pub fn partner_lane(&self, route_id: RouteId) -> Option<RouteId> {
        let route = self.routes.get(route_id)?;
        let lanes = self
            .all_parallel_routes
            .get(&normalized((route.start, route.end)))?;
        let position = lanes.iter().position(|lane| *lane == route_id)?;
        lanes.get(position ^ 1).copied()
    }

    /// Points granted when claiming a route of the given length on this map.
    #[inline]
    pub fn calculate_points_for_claimed_route(&self, length: u8) -> u8 {
        self.kind.points_for_length(length).unwrap_or(0)
    }

    /// Whether `player_id` may claim this exact lane, regardless of their cards.
    pub fn can_route_be_claimed_by_player(
        &self,
        route_id: RouteId,
        player_id: usize,
    ) -> Result<&Route, GameError> {
        let route = self.route(route_id)?;
        if route.is_claimed() {
            return Err(GameError::RouteAlreadyClaimed(route.start, route.end));
        }

        if let Some(partner) = self.partner_lane(route_id) {
            match self.routes[partner].claimer() {
                Some(claimer) if claimer == player_id => {
                    return Err(GameError::ParallelRouteOwned(route.start, route.end));
                }
                Some(_) if !self.parallel_routes_allowed => {
                    return Err(GameError::ParallelRouteBlocked(route.start, route.end));
                }
                _ => {}
            }
        }

        Ok(route)
    }

    /// The lane a claim on `route_id` actually lands on.
    ///
    /// The named lane if it is free, otherwise its paired lane if that one is free. The
    /// result is still subject to [`Map::can_route_be_claimed_by_player`].
    pub fn resolve_lane(&self, route_id: RouteId) -> Result<RouteId, GameError> {
        let route = self.route(route_id)?;
        if !route.is_claimed() {
            return Ok(route_id);
        }

        match self.partner_lane(route_id) {
            Some(partner) if !self.routes[partner].is_claimed() => Ok(partner),
            _ => Err(GameError::RouteAlreadyClaimed(route.start, route.end)),
        }
    }

    /// Lanes that `player_id` could claim given enough cards.
    ///
    /// When both lanes of a pair are free and identical, only the first one is listed: a
    /// claim on it falls back to the other lane anyway.
    pub fn claimable_routes(&self, player_id: usize) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |route| {
            if self.can_route_be_claimed_by_player(route.id, player_id).is_err() {
                return false;
            }

            match self.partner_lane(route.id) {
                Some(partner) if partner < route.id => {
                    let partner = &self.routes[partner];
                    partner.is_claimed()
                        || partner.color != route.color
                        || partner.tunnel != route.tunnel
                        || partner.locomotives != route.locomotives
                }
                _ => true,
            }
        })
    }

    /// Marks the lane as claimed by `player_id`.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::card::TrainColor;
    /// use ticket_to_ride_planner::map::Map;
    /// use ticket_to_ride_planner::topology::{MapKind, Topology};
    ///
    /// let topology = Topology::new(MapKind::Usa)
    ///     .with_route("A", "B", 2, TrainColor::Red)
    ///     .with_route("A", "B", 2, TrainColor::Blue);
    /// let mut map = Map::new(&topology, 2).unwrap();
    ///
    /// assert!(map.claim_route_for_player(0, 0).is_ok());
    /// // With two players, the parallel lane is now closed.
    /// assert!(map.claim_route_for_player(1, 1).is_err());
    /// ```
    pub fn claim_route_for_player(
        &mut self,
        route_id: RouteId,
        player_id: usize,
    ) -> Result<ClaimedRoute, GameError> {
        let route = self.can_route_be_claimed_by_player(route_id, player_id)?;
        let claimed_route = ClaimedRoute {
            route: (route.start, route.end),
            route_id,
            length: route.length,
        };

        // Due diligence is done, the player can rightfully claim the route.
        self.routes[route_id].claimer = Some(player_id);
        Ok(claimed_route)
    }

    /// Returns the longest simple path spanned from the claimed routes.
    ///
    /// Every city with a claimed route is tried as a starting point, and the path is
    /// extended depth-first without revisiting a city.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::city::CityId;
    /// use ticket_to_ride_planner::map::{ClaimedRoute, Map};
    ///
    /// let claimed_routes = vec![
    ///     ClaimedRoute { route: (CityId(0), CityId(1)), route_id: 0, length: 3 },
    ///     ClaimedRoute { route: (CityId(2), CityId(1)), route_id: 1, length: 5 },
    /// ];
    ///
    /// assert_eq!(Map::get_longest_route(3, &claimed_routes), 8);
    /// ```
    pub fn get_longest_route(num_cities: usize, claimed_routes: &[ClaimedRoute]) -> u16 {
        // Maps each city to a list of adjacent cities, including the length of the route connecting the two.
        let mut all_routes: BTreeMap<CityToCity, u8> = BTreeMap::new();
        for claimed_route in claimed_routes {
            let (start, end) = claimed_route.route;
            if start.index() >= num_cities || end.index() >= num_cities {
                continue;
            }

            for key in [(start, end), (end, start)] {
                let length = all_routes.entry(key).or_insert(0);
                *length = max(*length, claimed_route.length);
            }
        }

        let mut cities_visited = vec![false; num_cities];
        let mut longest_route = 0;
        let starts: SmallVec<[CityId; 32]> = all_routes.keys().map(|(start, _)| *start).collect();
        for start in starts.into_iter() {
            longest_route = max(
                longest_route,
                Self::get_longest_route_from_city(start, &all_routes, &mut cities_visited),
            );
        }

        longest_route
    }

    fn get_longest_route_from_city(
        start: CityId,
        all_routes: &BTreeMap<CityToCity, u8>,
        cities_visited: &mut Vec<bool>,
    ) -> u16 {
        cities_visited[start.index()] = true;

        let neighbors: SmallVec<[(CityId, u8); MAX_ROUTES_PER_CITY]> = all_routes
            .range(Self::get_range_of_routes_starting_at_city(start))
            .map(|((_, end), length)| (*end, *length))
            .collect();

        let mut longest_route_from_city = 0;
        for (end, length) in neighbors {
            if cities_visited[end.index()] {
                continue;
            }

            longest_route_from_city = max(
                longest_route_from_city,
                length as u16 + Self::get_longest_route_from_city(end, all_routes, cities_visited),
            );
        }

        cities_visited[start.index()] = false;
        longest_route_from_city
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::TrainColor::*;

    use pretty_assertions::assert_eq;

    const A: CityId = CityId(0);
    const B: CityId = CityId(1);
    const C: CityId = CityId(2);
    const D: CityId = CityId(3);

    // A =2= B -3- C, with a double (red/blue) route between A and B and a quadruple A-D.
    fn topology() -> Topology {
        Topology::new(MapKind::Usa)
            .with_route("A", "B", 2, Red)
            .with_route("A", "B", 2, Blue)
            .with_route("B", "C", 3, Wild)
            .with_route("A", "D", 1, Wild)
            .with_route("A", "D", 1, Wild)
            .with_route("A", "D", 1, Green)
            .with_route("A", "D", 1, Green)
    }

    #[test]
    fn new_map() {
        for num_players in 0..=7 {
            assert_eq!(
                Map::new(&topology(), num_players).is_ok(),
                (MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players),
                "Fails with num_players={num_players}"
            );
        }
    }

    #[test]
    fn city_range_construction() {
        assert_eq!(
            Map::get_range_of_routes_starting_at_city(C),
            (C, CityId(0))..=(C, CityId(u16::MAX))
        );
    }

    #[test]
    fn routes_between_cities() {
        let map = Map::new(&topology(), 2).unwrap();

        let colors: Vec<_> = map.routes_between(B, A).map(|route| route.color).collect();
        assert_eq!(colors, vec![Red, Blue]);
        assert_eq!(map.routes_between(C, D).count(), 0);

        let mut neighbors: Vec<_> = map.neighbors(B).collect();
        neighbors.sort();
        assert_eq!(neighbors, vec![A, A, C]);
    }

    #[test]
    fn lanes_are_paired_two_by_two() {
        let map = Map::new(&topology(), 4).unwrap();

        assert_eq!(map.partner_lane(0), Some(1));
        assert_eq!(map.partner_lane(1), Some(0));
        assert_eq!(map.partner_lane(2), None);
        assert_eq!(map.partner_lane(3), Some(4));
        assert_eq!(map.partner_lane(5), Some(6));
        assert_eq!(map.partner_lane(6), Some(5));
        assert_eq!(map.partner_lane(42), None);
    }

    #[test]
    fn claim_unknown_route() {
        let mut map = Map::new(&topology(), 2).unwrap();
        assert_eq!(
            map.claim_route_for_player(42, 0),
            Err(GameError::UnknownRoute(42))
        );
    }

    #[test]
    fn claim_route_twice() {
        let mut map = Map::new(&topology(), 4).unwrap();

        assert_eq!(
            map.claim_route_for_player(2, 0),
            Ok(ClaimedRoute {
                route: (B, C),
                route_id: 2,
                length: 3
            })
        );
        assert_eq!(map.route(2).unwrap().claimer(), Some(0));
        assert_eq!(
            map.claim_route_for_player(2, 1),
            Err(GameError::RouteAlreadyClaimed(B, C))
        );
        assert_eq!(map.route(2).unwrap().claimer(), Some(0));
    }

    #[test]
    fn claim_both_lanes_by_same_player() {
        let mut map = Map::new(&topology(), 4).unwrap();

        assert!(map.claim_route_for_player(0, 0).is_ok());
        assert_eq!(
            map.claim_route_for_player(1, 0),
            Err(GameError::ParallelRouteOwned(A, B))
        );
    }

    #[test]
    fn claim_parallel_lane_depends_on_player_count() {
        let mut two_players = Map::new(&topology(), 2).unwrap();
        assert!(two_players.claim_route_for_player(0, 0).is_ok());
        assert_eq!(
            two_players.claim_route_for_player(1, 1),
            Err(GameError::ParallelRouteBlocked(A, B))
        );

        let mut four_players = Map::new(&topology(), 4).unwrap();
        assert!(four_players.claim_route_for_player(0, 0).is_ok());
        assert!(four_players.claim_route_for_player(1, 1).is_ok());
    }

    #[test]
    fn quadruple_routes_resolve_per_pair() {
        let mut map = Map::new(&topology(), 2).unwrap();

        assert!(map.claim_route_for_player(3, 0).is_ok());
        // The first pair falls back to its other lane, which is blocked with two players.
        assert_eq!(map.resolve_lane(3), Ok(4));
        assert_eq!(
            map.can_route_be_claimed_by_player(4, 1).map(|route| route.id),
            Err(GameError::ParallelRouteBlocked(A, D))
        );
        // The second pair is untouched.
        assert_eq!(map.resolve_lane(5), Ok(5));
        assert!(map.claim_route_for_player(5, 1).is_ok());
        assert_eq!(map.resolve_lane(5), Ok(6));
    }

    #[test]
    fn claimable_routes_skip_identical_lanes() {
        let mut map = Map::new(&topology(), 4).unwrap();

        let claimable: Vec<_> = map.claimable_routes(0).map(|route| route.id).collect();
        // Lanes 4 and 6 are identical to lanes 3 and 5.
        assert_eq!(claimable, vec![0, 1, 2, 3, 5]);

        assert!(map.claim_route_for_player(3, 1).is_ok());
        let claimable: Vec<_> = map.claimable_routes(0).map(|route| route.id).collect();
        assert_eq!(claimable, vec![0, 1, 2, 4, 5]);
        let claimable: Vec<_> = map.claimable_routes(1).map(|route| route.id).collect();
        assert_eq!(claimable, vec![0, 1, 2, 5]);
    }

    #[test]
    fn points_for_claimed_route() {
        let map = Map::new(&topology(), 2).unwrap();
        assert_eq!(map.calculate_points_for_claimed_route(1), 1);
        assert_eq!(map.calculate_points_for_claimed_route(3), 4);
        assert_eq!(map.calculate_points_for_claimed_route(6), 15);
    }

    // Tests for `Map::get_longest_route`.

    fn claimed(start: CityId, end: CityId, length: u8) -> ClaimedRoute {
        ClaimedRoute {
            route: (start, end),
            route_id: 0,
            length,
        }
    }

    #[test]
    fn longest_route_empty() {
        assert_eq!(Map::get_longest_route(4, &[]), 0);
    }

    #[test]
    fn longest_route_single() {
        assert_eq!(Map::get_longest_route(4, &[claimed(A, B, 4)]), 4);
    }

    #[test]
    fn longest_route_star() {
        // B is the center of a star: the longest path goes through the two longest branches.
        let claimed_routes = [claimed(A, B, 2), claimed(B, C, 5), claimed(B, D, 4)];
        assert_eq!(Map::get_longest_route(4, &claimed_routes), 9);
    }

    #[test]
    fn longest_route_cycle_does_not_revisit_cities() {
        let claimed_routes = [
            claimed(A, B, 1),
            claimed(B, C, 1),
            claimed(C, A, 1),
            claimed(A, D, 3),
        ];
        assert_eq!(Map::get_longest_route(4, &claimed_routes), 5);
    }

    #[test]
    fn longest_route_disconnected() {
        let claimed_routes = [claimed(A, B, 2), claimed(C, D, 6)];
        assert_eq!(Map::get_longest_route(4, &claimed_routes), 6);
    }
}
