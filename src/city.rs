use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a city on the map.
///
/// Cities are indices into the city table of the [`crate::topology::Topology`] the game was
/// built from. The name of a city lives in that table, not in the identifier.
///
/// # JSON
/// Cities are serialized as a 16-bit unsigned integer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CityId(pub u16);

impl CityId {
    /// Index of the city, usable to address dense per-city tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for CityId {
    fn from(index: usize) -> Self {
        Self(index as u16)
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Top-level representation of a connection between two cities.
pub type CityToCity = (CityId, CityId);

/// Returns the pair with the smallest city first, so that (A, B) and (B, A) share a key.
#[inline]
pub fn normalized((start, end): CityToCity) -> CityToCity {
    if start <= end {
        (start, end)
    } else {
        (end, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_index() {
        assert_eq!(CityId(7).index(), 7);
        assert_eq!(CityId::from(12), CityId(12));
    }

    #[test]
    fn city_to_string() {
        assert_eq!(CityId(3).to_string(), "#3");
    }

    #[test]
    fn city_to_json() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&CityId(7))?, "7");
        assert_eq!(serde_json::to_string(&CityId(16))?, "16");

        Ok(())
    }

    #[test]
    fn json_to_city() -> serde_json::Result<()> {
        assert_eq!(serde_json::from_str::<CityId>("15")?, CityId(15));

        Ok(())
    }

    #[test]
    fn invalid_json_to_city() {
        assert!(serde_json::from_str::<CityId>(r#""Miami""#).is_err());
    }

    #[test]
    fn normalized_pair() {
        assert_eq!(normalized((CityId(4), CityId(1))), (CityId(1), CityId(4)));
        assert_eq!(normalized((CityId(1), CityId(4))), (CityId(1), CityId(4)));
    }
}
