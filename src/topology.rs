//! Static description of a map: its cities, routes and destination tickets.
//!
//! A [`Topology`] is what the outside world hands to the engine when a game starts. It can
//! be deserialized from JSON, assembled with the builder methods, or taken from the
//! built-in [`Topology::usa`] map.

use crate::card::{DestinationCard, TrainColor};
use crate::card::TrainColor::*;
use crate::city::CityId;
use crate::error::TopologyError;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// The kind of map being played, which decides how many points a claimed route is worth.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    #[default]
    Usa,
    Europe,
}

impl MapKind {
    /// Points granted when claiming a route of the given length, if this map supports it.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::topology::MapKind;
    ///
    /// assert_eq!(MapKind::Usa.points_for_length(6), Some(15));
    /// assert_eq!(MapKind::Usa.points_for_length(8), None);
    /// assert_eq!(MapKind::Europe.points_for_length(8), Some(21));
    /// ```
    pub fn points_for_length(self, length: u8) -> Option<u8> {
        const USA: [u8; 6] = [1, 2, 4, 7, 10, 15];
        const EUROPE: [u8; 8] = [1, 2, 4, 7, 10, 15, 18, 21];

        let table: &[u8] = match self {
            MapKind::Usa => &USA,
            MapKind::Europe => &EUROPE,
        };
        length
            .checked_sub(1)
            .and_then(|index| table.get(index as usize))
            .copied()
    }

    /// Bonus granted to the player(s) with the longest continuous path.
    #[inline]
    pub fn longest_path_bonus(self) -> i32 {
        10
    }
}

/// One route of the map, as described by a topology.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RouteSpec {
    pub start: String,
    pub end: String,
    pub length: u8,
    /// `wild` denotes a gray route.
    #[serde(default = "gray")]
    pub color: TrainColor,
    #[serde(default)]
    pub tunnel: bool,
    /// Minimum number of wild cards needed to claim the route (ferries).
    #[serde(default)]
    pub locomotives: u8,
}

fn gray() -> TrainColor {
    Wild
}

/// One destination ticket, as described by a topology.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TicketSpec {
    pub start: String,
    pub end: String,
    pub points: u8,
}

/// Immutable description of a map. Cities are identified by their position in `cities`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Topology {
    #[serde(default)]
    pub kind: MapKind,
    pub cities: Vec<String>,
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub tickets: Vec<TicketSpec>,
}

impl Topology {
    /// An empty topology, to be filled with [`Topology::with_route`] and [`Topology::with_ticket`].
    pub fn new(kind: MapKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Adds a route, declaring its cities on the fly.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::card::TrainColor;
    /// use ticket_to_ride_planner::topology::{MapKind, Topology};
    ///
    /// let topology = Topology::new(MapKind::Usa)
    ///     .with_route("A", "B", 2, TrainColor::Red)
    ///     .with_route("B", "C", 3, TrainColor::Wild)
    ///     .with_ticket("A", "C", 5);
    ///
    /// assert_eq!(topology.cities, vec!["A", "B", "C"]);
    /// ```
    pub fn with_route(mut self, start: &str, end: &str, length: u8, color: TrainColor) -> Self {
        self.push_route(RouteSpec {
            start: start.to_string(),
            end: end.to_string(),
            length,
            color,
            tunnel: false,
            locomotives: 0,
        });
        self
    }

    /// Adds a tunnel route.
    pub fn with_tunnel(mut self, start: &str, end: &str, length: u8, color: TrainColor) -> Self {
        self.push_route(RouteSpec {
            start: start.to_string(),
            end: end.to_string(),
            length,
            color,
            tunnel: true,
            locomotives: 0,
        });
        self
    }

    /// Adds a gray route that needs at least `locomotives` wild cards.
    pub fn with_ferry(mut self, start: &str, end: &str, length: u8, locomotives: u8) -> Self {
        self.push_route(RouteSpec {
            start: start.to_string(),
            end: end.to_string(),
            length,
            color: Wild,
            tunnel: false,
            locomotives,
        });
        self
    }

    pub fn with_ticket(mut self, start: &str, end: &str, points: u8) -> Self {
        self.declare_city(start);
        self.declare_city(end);
        self.tickets.push(TicketSpec {
            start: start.to_string(),
            end: end.to_string(),
            points,
        });
        self
    }

    fn push_route(&mut self, route: RouteSpec) {
        self.declare_city(&route.start);
        self.declare_city(&route.end);
        self.routes.push(route);
    }

    fn declare_city(&mut self, name: &str) {
        if !self.cities.iter().any(|city| city == name) {
            self.cities.push(name.to_string());
        }
    }

    /// Parses a topology from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self, TopologyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON topology file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    #[inline]
    pub fn num_cities(&self) -> usize {
        self.cities.len()
    }

    /// Looks up a city by name.
    pub fn city(&self, name: &str) -> Result<CityId, TopologyError> {
        self.cities
            .iter()
            .position(|city| city == name)
            .map(CityId::from)
            .ok_or_else(|| TopologyError::UnknownCity(name.to_string()))
    }

    /// The name of a city, if it belongs to this topology.
    pub fn city_name(&self, city: CityId) -> Option<&str> {
        self.cities.get(city.index()).map(String::as_str)
    }

    /// Checks that the topology can be played: unique city names, known endpoints,
    /// supported lengths, and at most four parallel routes between two cities.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut index = HashMap::with_capacity(self.cities.len());
        for (position, city) in self.cities.iter().enumerate() {
            if index.insert(city.as_str(), position).is_some() {
                return Err(TopologyError::DuplicateCity(city.clone()));
            }
        }

        if self.routes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut parallel_routes: HashMap<(CityId, CityId), usize> = HashMap::new();
        for route in &self.routes {
            let start = self.city(&route.start)?;
            let end = self.city(&route.end)?;
            if start == end {
                return Err(TopologyError::SelfLoop(route.start.clone()));
            }
            if self.kind.points_for_length(route.length).is_none() {
                return Err(TopologyError::InvalidLength {
                    start: route.start.clone(),
                    end: route.end.clone(),
                    length: route.length,
                });
            }

            let count = parallel_routes
                .entry(crate::city::normalized((start, end)))
                .or_insert(0);
            *count += 1;
            if *count > 4 {
                return Err(TopologyError::TooManyParallelRoutes(
                    route.start.clone(),
                    route.end.clone(),
                ));
            }
        }

        for ticket in &self.tickets {
            self.city(&ticket.start)?;
            self.city(&ticket.end)?;
        }

        Ok(())
    }

    /// All the destination cards of this topology.
    pub fn destination_cards(&self) -> Result<Vec<DestinationCard>, TopologyError> {
        self.tickets
            .iter()
            .map(|ticket| {
                Ok(DestinationCard {
                    destination: (self.city(&ticket.start)?, self.city(&ticket.end)?),
                    points: ticket.points,
                })
            })
            .collect()
    }

    /// The classic map of North America: 36 cities, 100 routes and 30 destination tickets.
    pub fn usa() -> Self {
        USA_TOPOLOGY.clone()
    }
}

// Parallel routes between two cities are listed as several colors of the same length.
const USA_ROUTES: &[(&str, &str, u8, &[TrainColor])] = &[
    ("Atlanta", "Charleston", 2, &[Wild]),
    ("Atlanta", "Miami", 5, &[Blue]),
    ("Atlanta", "Nashville", 1, &[Wild]),
    ("Atlanta", "New Orleans", 5, &[Orange, Yellow]),
    ("Atlanta", "Raleigh", 2, &[Wild, Wild]),
    ("Boston", "Montréal", 2, &[Wild, Wild]),
    ("Boston", "New York", 2, &[Yellow, Red]),
    ("Calgary", "Helena", 4, &[Wild]),
    ("Calgary", "Seattle", 4, &[Wild]),
    ("Calgary", "Vancouver", 3, &[Wild]),
    ("Calgary", "Winnipeg", 6, &[White]),
    ("Charleston", "Miami", 4, &[Pink]),
    ("Charleston", "Raleigh", 2, &[Wild]),
    ("Chicago", "Duluth", 3, &[Red]),
    ("Chicago", "Omaha", 4, &[Blue]),
    ("Chicago", "Pittsburgh", 3, &[Black, Orange]),
    ("Chicago", "Saint Louis", 2, &[Green, White]),
    ("Chicago", "Toronto", 4, &[White]),
    ("Dallas", "El Paso", 4, &[Red]),
    ("Dallas", "Houston", 1, &[Wild, Wild]),
    ("Dallas", "Little Rock", 2, &[Wild]),
    ("Dallas", "Oklahoma City", 2, &[Wild, Wild]),
    ("Denver", "Helena", 4, &[Green]),
    ("Denver", "Kansas City", 4, &[Black, Orange]),
    ("Denver", "Oklahoma City", 4, &[Red]),
    ("Denver", "Omaha", 4, &[Pink]),
    ("Denver", "Phoenix", 5, &[White]),
    ("Denver", "Salt Lake City", 3, &[Red, Yellow]),
    ("Denver", "Santa Fe", 2, &[Wild]),
    ("Duluth", "Helena", 6, &[Orange]),
    ("Duluth", "Omaha", 2, &[Wild, Wild]),
    ("Duluth", "Sault St. Marie", 3, &[Wild]),
    ("Duluth", "Toronto", 6, &[Pink]),
    ("Duluth", "Winnipeg", 4, &[Black]),
    ("El Paso", "Houston", 6, &[Green]),
    ("El Paso", "Los Angeles", 6, &[Black]),
    ("El Paso", "Oklahoma City", 5, &[Yellow]),
    ("El Paso", "Phoenix", 3, &[Wild]),
    ("El Paso", "Santa Fe", 2, &[Wild]),
    ("Helena", "Omaha", 5, &[Red]),
    ("Helena", "Salt Lake City", 3, &[Pink]),
    ("Helena", "Seattle", 6, &[Yellow]),
    ("Helena", "Winnipeg", 4, &[Blue]),
    ("Houston", "New Orleans", 2, &[Wild]),
    ("Kansas City", "Saint Louis", 2, &[Blue, Pink]),
    ("Kansas City", "Oklahoma City", 2, &[Wild, Wild]),
    ("Kansas City", "Omaha", 1, &[Wild, Wild]),
    ("Las Vegas", "Los Angeles", 2, &[Wild]),
    ("Las Vegas", "Salt Lake City", 3, &[Orange]),
    ("Little Rock", "Nashville", 3, &[White]),
    ("Little Rock", "New Orleans", 3, &[Wild]),
    ("Little Rock", "Oklahoma City", 2, &[Wild]),
    ("Little Rock", "Saint Louis", 2, &[Wild]),
    ("Los Angeles", "Phoenix", 3, &[Wild]),
    ("Los Angeles", "San Francisco", 3, &[Pink, Yellow]),
    ("Miami", "New Orleans", 6, &[Red]),
    ("Montréal", "New York", 3, &[Blue]),
    ("Montréal", "Sault St. Marie", 5, &[Black]),
    ("Montréal", "Toronto", 3, &[Wild]),
    ("Nashville", "Pittsburgh", 4, &[Yellow]),
    ("Nashville", "Raleigh", 3, &[Black]),
    ("Nashville", "Saint Louis", 2, &[Wild]),
    ("New York", "Pittsburgh", 2, &[Green, White]),
    ("New York", "Washington", 2, &[Black, Orange]),
    ("Oklahoma City", "Santa Fe", 3, &[Blue]),
    ("Phoenix", "Santa Fe", 3, &[Wild]),
    ("Pittsburgh", "Raleigh", 2, &[Wild]),
    ("Pittsburgh", "Saint Louis", 5, &[Green]),
    ("Pittsburgh", "Toronto", 2, &[Wild]),
    ("Pittsburgh", "Washington", 2, &[Wild]),
    ("Portland", "Salt Lake City", 6, &[Blue]),
    ("Portland", "San Francisco", 5, &[Green, Pink]),
    ("Raleigh", "Washington", 2, &[Wild, Wild]),
    ("Salt Lake City", "San Francisco", 5, &[Orange, White]),
    ("Sault St. Marie", "Toronto", 2, &[Wild]),
    ("Sault St. Marie", "Winnipeg", 6, &[Wild]),
    ("Seattle", "Portland", 1, &[Wild, Wild]),
    ("Seattle", "Vancouver", 1, &[Wild, Wild]),
];

const USA_TICKETS: &[(&str, &str, u8)] = &[
    ("Boston", "Miami", 12),
    ("Calgary", "Phoenix", 13),
    ("Calgary", "Salt Lake City", 7),
    ("Chicago", "New Orleans", 7),
    ("Chicago", "Santa Fe", 9),
    ("Dallas", "New York", 11),
    ("Denver", "El Paso", 4),
    ("Denver", "Pittsburgh", 11),
    ("Duluth", "El Paso", 10),
    ("Duluth", "Houston", 8),
    ("Helena", "Los Angeles", 8),
    ("Kansas City", "Houston", 5),
    ("Los Angeles", "Chicago", 16),
    ("Los Angeles", "Miami", 20),
    ("Los Angeles", "New York", 21),
    ("Montréal", "Atlanta", 9),
    ("Montréal", "New Orleans", 13),
    ("New York", "Atlanta", 6),
    ("Portland", "Nashville", 17),
    ("Portland", "Phoenix", 11),
    ("San Francisco", "Atlanta", 17),
    ("Sault St. Marie", "Nashville", 8),
    ("Sault St. Marie", "Oklahoma City", 9),
    ("Seattle", "Los Angeles", 9),
    ("Seattle", "New York", 22),
    ("Toronto", "Miami", 10),
    ("Vancouver", "Montréal", 20),
    ("Vancouver", "Santa Fe", 13),
    ("Winnipeg", "Houston", 12),
    ("Winnipeg", "Little Rock", 11),
];

lazy_static! {
    static ref USA_TOPOLOGY: Topology = {
        let mut topology = Topology::new(MapKind::Usa);
        for (start, end, length, colors) in USA_ROUTES {
            for color in *colors {
                topology = topology.with_route(start, end, *length, *color);
            }
        }
        for (start, end, points) in USA_TICKETS {
            topology = topology.with_ticket(start, end, *points);
        }
        topology
    };
}
