use crate::city::CityId;

/// Incremental connectivity of one player's claimed routes.
///
/// A disjoint-set forest over every city of the map, augmented with a dense reachability
/// matrix so that [`ConnectivityTracker::is_connected`] is a single lookup. Cities only ever
/// get merged: the matrix is the transitive closure of every `union` so far, and its bits
/// only flip from `false` to `true`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectivityTracker {
    num_cities: usize,
    parent: Vec<usize>,
    /// Members of each component, only meaningful at the component's root.
    members: Vec<Vec<usize>>,
    /// Row-major `num_cities × num_cities` reachability matrix.
    reachable: Vec<bool>,
}

impl ConnectivityTracker {
    /// Every city starts in its own component.
    pub fn new(num_cities: usize) -> Self {
        let mut reachable = vec![false; num_cities * num_cities];
        for city in 0..num_cities {
            reachable[city * num_cities + city] = true;
        }

        Self {
            num_cities,
            parent: (0..num_cities).collect(),
            members: (0..num_cities).map(|city| vec![city]).collect(),
            reachable,
        }
    }

    /// Rebuilds a tracker by replaying a history of connections.
    pub fn from_connections(
        num_cities: usize,
        connections: impl IntoIterator<Item = (CityId, CityId)>,
    ) -> Self {
        let mut tracker = Self::new(num_cities);
        for (start, end) in connections {
            tracker.union(start, end);
        }
        tracker
    }

    /// Root of the component holding `city`, compressing the path on the way.
    fn find(&mut self, city: usize) -> usize {
        let mut root = city;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = city;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Merges the components of `start` and `end`.
    ///
    /// The smaller component is merged into the larger one, and every pair of cities across
    /// the two components becomes reachable. Unknown cities are ignored.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::city::CityId;
    /// use ticket_to_ride_planner::connectivity::ConnectivityTracker;
    ///
    /// let mut tracker = ConnectivityTracker::new(3);
    /// tracker.union(CityId(0), CityId(1));
    /// tracker.union(CityId(1), CityId(2));
    ///
    /// assert!(tracker.is_connected(CityId(2), CityId(0)));
    /// ```
    pub fn union(&mut self, start: CityId, end: CityId) {
        let (start, end) = (start.index(), end.index());
        if start >= self.num_cities || end >= self.num_cities {
            return;
        }

        let (mut root, mut other) = (self.find(start), self.find(end));
        if root == other {
            return;
        }

        if self.members[root].len() < self.members[other].len() {
            std::mem::swap(&mut root, &mut other);
        }

        let merged = std::mem::take(&mut self.members[other]);
        for &a in &self.members[root] {
            for &b in &merged {
                self.reachable[a * self.num_cities + b] = true;
                self.reachable[b * self.num_cities + a] = true;
            }
        }

        self.parent[other] = root;
        self.members[root].extend(merged);
    }

    /// Whether both cities are in the same component. Reflexive and symmetric.
    #[inline]
    pub fn is_connected(&self, start: CityId, end: CityId) -> bool {
        if start == end {
            return true;
        }

        let (start, end) = (start.index(), end.index());
        start < self.num_cities
            && end < self.num_cities
            && self.reachable[start * self.num_cities + end]
    }

    #[inline]
    pub fn num_cities(&self) -> usize {
        self.num_cities
    }

    /// Size of the component holding `city`.
    pub fn component_size(&mut self, city: CityId) -> usize {
        if city.index() >= self.num_cities {
            return 0;
        }

        let root = self.find(city.index());
        self.members[root].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: CityId = CityId(0);
    const B: CityId = CityId(1);
    const C: CityId = CityId(2);
    const D: CityId = CityId(3);
    const E: CityId = CityId(4);

    #[test]
    fn new_tracker_is_disconnected() {
        let tracker = ConnectivityTracker::new(5);
        assert!(tracker.is_connected(A, A));
        assert!(!tracker.is_connected(A, B));
    }

    #[test]
    fn union_is_symmetric_and_transitive() {
        let mut tracker = ConnectivityTracker::new(5);
        tracker.union(A, B);
        tracker.union(D, C);
        assert!(tracker.is_connected(B, A));
        assert!(!tracker.is_connected(A, C));

        tracker.union(B, C);
        for x in [A, B, C, D] {
            for y in [A, B, C, D] {
                assert!(tracker.is_connected(x, y));
            }
            assert!(!tracker.is_connected(x, E));
        }
        assert_eq!(tracker.component_size(A), 4);
        assert_eq!(tracker.component_size(E), 1);
    }

    #[test]
    fn union_is_monotonic() {
        let mut tracker = ConnectivityTracker::new(5);
        tracker.union(A, B);
        tracker.union(A, B);
        tracker.union(C, D);
        tracker.union(B, A);
        assert!(tracker.is_connected(A, B));
        assert!(tracker.is_connected(C, D));
    }

    #[test]
    fn unknown_cities_are_ignored() {
        let mut tracker = ConnectivityTracker::new(2);
        tracker.union(A, CityId(9));
        assert!(!tracker.is_connected(A, CityId(9)));
        assert!(tracker.is_connected(CityId(9), CityId(9)));
        assert_eq!(tracker.component_size(CityId(9)), 0);
    }

    #[test]
    fn rebuilt_from_connections() {
        let mut tracker = ConnectivityTracker::new(5);
        tracker.union(A, B);
        tracker.union(C, B);

        let rebuilt = ConnectivityTracker::from_connections(5, [(A, B), (C, B)]);
        assert_eq!(rebuilt.reachable, tracker.reachable);
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 2_000;
        let mut tracker = ConnectivityTracker::new(n);
        for city in 1..n {
            tracker.union(CityId::from(city - 1), CityId::from(city));
        }
        assert!(tracker.is_connected(CityId(0), CityId::from(n - 1)));
    }
}
