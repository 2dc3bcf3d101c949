use crate::city::CityId;

use smallvec::SmallVec;

/// Distance returned for cities that cannot reach each other.
pub const UNREACHABLE: u32 = u32::MAX;

/// All-pairs shortest distances over the route graph, weighted by route length.
///
/// Built once per game, before any route is claimed, and never mutated afterwards: every
/// copy of the game shares the same oracle.
#[derive(Debug, PartialEq)]
pub struct DistanceOracle {
    num_cities: usize,
    /// Row-major `num_cities × num_cities` matrix of shortest distances.
    distances: Vec<u32>,
    /// `next[a][b]` is the city following `a` on a shortest path to `b`.
    next: Vec<Option<CityId>>,
}

impl DistanceOracle {
    /// Runs Floyd-Warshall over the given undirected, possibly multi-edge, graph.
    ///
    /// Parallel edges keep their minimum length.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::city::CityId;
    /// use ticket_to_ride_planner::distance::DistanceOracle;
    ///
    /// let (a, b, c) = (CityId(0), CityId(1), CityId(2));
    /// let oracle = DistanceOracle::new(3, [(a, b, 2), (b, c, 3), (a, b, 4)]);
    ///
    /// assert_eq!(oracle.distance(a, c), 5);
    /// assert_eq!(oracle.path(a, c), vec![a, b, c]);
    /// ```
    pub fn new(num_cities: usize, edges: impl IntoIterator<Item = (CityId, CityId, u8)>) -> Self {
        let mut distances = vec![UNREACHABLE; num_cities * num_cities];
        let mut next = vec![None; num_cities * num_cities];

        for city in 0..num_cities {
            distances[city * num_cities + city] = 0;
            next[city * num_cities + city] = Some(CityId::from(city));
        }

        for (start, end, length) in edges {
            let (s, e) = (start.index(), end.index());
            if s >= num_cities || e >= num_cities || s == e {
                continue;
            }

            let length = length as u32;
            if length < distances[s * num_cities + e] {
                distances[s * num_cities + e] = length;
                distances[e * num_cities + s] = length;
                next[s * num_cities + e] = Some(end);
                next[e * num_cities + s] = Some(start);
            }
        }

        for k in 0..num_cities {
            for i in 0..num_cities {
                let through_k = distances[i * num_cities + k];
                if through_k == UNREACHABLE {
                    continue;
                }

                for j in 0..num_cities {
                    let from_k = distances[k * num_cities + j];
                    if from_k == UNREACHABLE {
                        continue;
                    }

                    let candidate = through_k + from_k;
                    if candidate < distances[i * num_cities + j] {
                        distances[i * num_cities + j] = candidate;
                        next[i * num_cities + j] = next[i * num_cities + k];
                    }
                }
            }
        }

        Self {
            num_cities,
            distances,
            next,
        }
    }

    #[inline]
    fn contains(&self, city: CityId) -> bool {
        city.index() < self.num_cities
    }

    /// Shortest distance between two cities, or [`UNREACHABLE`] if there is no path or
    /// either city is unknown.
    pub fn distance(&self, start: CityId, end: CityId) -> u32 {
        if !self.contains(start) || !self.contains(end) {
            return UNREACHABLE;
        }

        self.distances[start.index() * self.num_cities + end.index()]
    }

    /// The cities along a shortest path from `start` to `end`, both included.
    ///
    /// Empty if there is no path or either city is unknown.
    pub fn path(&self, start: CityId, end: CityId) -> Vec<CityId> {
        if self.distance(start, end) == UNREACHABLE {
            return Vec::new();
        }

        let mut path = vec![start];
        let mut current = start;
        while current != end {
            match self.next[current.index() * self.num_cities + end.index()] {
                Some(hop) => {
                    path.push(hop);
                    current = hop;
                }
                None => return Vec::new(),
            }
        }

        path
    }

    /// Whether `start` and `end` are consecutive cities on the shortest path between `from`
    /// and `to`, in either direction.
    pub fn is_on_shortest_path(&self, from: CityId, to: CityId, start: CityId, end: CityId) -> bool {
        self.path(from, to)
            .windows(2)
            .any(|hop| (hop[0] == start && hop[1] == end) || (hop[0] == end && hop[1] == start))
    }

    /// All cities exactly `distance` away from `city`.
    ///
    /// With `distance == 2`, this is used as a proxy for "one route away" by the planner.
    pub fn cities_at_distance(&self, city: CityId, distance: u32) -> SmallVec<[CityId; 8]> {
        if !self.contains(city) || distance == UNREACHABLE {
            return SmallVec::new();
        }

        let row = city.index() * self.num_cities;
        self.distances[row..row + self.num_cities]
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == distance)
            .map(|(other, _)| CityId::from(other))
            .collect()
    }

    #[inline]
    pub fn num_cities(&self) -> usize {
        self.num_cities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    use pretty_assertions::assert_eq;

    const A: CityId = CityId(0);
    const B: CityId = CityId(1);
    const C: CityId = CityId(2);
    const D: CityId = CityId(3);

    fn line() -> DistanceOracle {
        // A -2- B -3- C, and D isolated.
        DistanceOracle::new(4, [(A, B, 2), (B, C, 3)])
    }

    #[test]
    fn distance_to_self_is_zero() {
        let oracle = line();
        for city in [A, B, C, D] {
            assert_eq!(oracle.distance(city, city), 0);
            assert_eq!(oracle.path(city, city), vec![city]);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let oracle = line();
        assert_eq!(oracle.distance(A, C), 5);
        assert_eq!(oracle.distance(C, A), 5);
        assert_eq!(oracle.path(C, A), vec![C, B, A]);
    }

    #[test]
    fn unreachable_and_unknown_cities() {
        let oracle = line();
        assert_eq!(oracle.distance(A, D), UNREACHABLE);
        assert!(oracle.path(A, D).is_empty());
        assert_eq!(oracle.distance(A, CityId(40)), UNREACHABLE);
        assert!(oracle.path(CityId(40), A).is_empty());
        assert!(oracle.cities_at_distance(CityId(40), 2).is_empty());
    }

    #[test]
    fn parallel_routes_keep_the_shortest() {
        let oracle = DistanceOracle::new(3, [(A, B, 5), (A, B, 1), (B, C, 1), (A, C, 4)]);
        assert_eq!(oracle.distance(A, B), 1);
        assert_eq!(oracle.distance(A, C), 2);
        assert_eq!(oracle.path(A, C), vec![A, B, C]);
    }

    #[test]
    fn cities_at_distance() {
        let oracle = line();
        assert_eq!(oracle.cities_at_distance(A, 2).as_slice(), &[B]);
        assert_eq!(oracle.cities_at_distance(B, 2).as_slice(), &[A]);
        assert_eq!(oracle.cities_at_distance(A, 5).as_slice(), &[C]);
    }

    #[test]
    fn on_shortest_path() {
        let oracle = line();
        assert!(oracle.is_on_shortest_path(A, C, C, B));
        assert!(!oracle.is_on_shortest_path(A, B, B, C));
    }

    #[test]
    fn triangle_inequality_on_usa_map() {
        let topology = Topology::usa();
        let edges: Vec<_> = topology
            .routes
            .iter()
            .map(|route| {
                (
                    topology.city(&route.start).unwrap(),
                    topology.city(&route.end).unwrap(),
                    route.length,
                )
            })
            .collect();
        let oracle = DistanceOracle::new(topology.num_cities(), edges);
        let n = topology.num_cities();

        for a in 0..n {
            for b in 0..n {
                let (a, b) = (CityId::from(a), CityId::from(b));
                assert_eq!(oracle.distance(a, b), oracle.distance(b, a));
                assert_ne!(oracle.distance(a, b), UNREACHABLE);

                for c in 0..n {
                    let c = CityId::from(c);
                    assert!(oracle.distance(a, c) <= oracle.distance(a, b) + oracle.distance(b, c));
                }
            }
        }

        let seattle = topology.city("Seattle").unwrap();
        let miami = topology.city("Miami").unwrap();
        let path = oracle.path(seattle, miami);
        assert_eq!(path.first(), Some(&seattle));
        assert_eq!(path.last(), Some(&miami));
    }
}
