//! The actions a player can take on their turn.
//!
//! Computer and human players hand the game the same [`PlayerAction`], which the game
//! validates and applies identically regardless of its origin.

use crate::card::{TrainColor, NUM_DRAWN_DESTINATION_CARDS};
use crate::city::CityId;
use crate::map::RouteId;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use strum_macros::{Display, EnumIter};

/// Where a train card is drawn from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CardSource {
    /// One of the five face-up cards. `card` is the card expected in that slot.
    FaceUp { slot: usize, card: TrainColor },
    /// The top of the close deck.
    Deck,
}

impl fmt::Display for CardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardSource::FaceUp { slot, card } => write!(f, "a face-up {} card (slot {})", card, slot),
            CardSource::Deck => write!(f, "a card from the close deck"),
        }
    }
}

/// One whole turn of a player.
///
/// # JSON
/// ```
/// use ticket_to_ride_planner::action::Action;
///
/// let action: Action = serde_json::from_str(r#"{"kind": "draw_destinations", "keep": [true, false, true]}"#).unwrap();
/// assert_eq!(action, Action::DrawDestinations { keep: [true, false, true] });
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Claims `route` between `city1` and `city2`, paying with `wilds_used` wild cards and the
    /// rest in `color`, which must not be wild.
    ClaimRoute {
        route: RouteId,
        city1: CityId,
        city2: CityId,
        color: TrainColor,
        wilds_used: u8,
    },
    /// Draws one or two train cards. Drawing a face-up wild card first ends the draw.
    DrawTrainCards {
        first: CardSource,
        second: Option<CardSource>,
    },
    /// Reveals up to three destination cards, and keeps the ones flagged in `keep`.
    DrawDestinations {
        keep: [bool; NUM_DRAWN_DESTINATION_CARDS],
    },
}

impl Action {
    #[inline]
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::ClaimRoute { .. } => ActionKind::ClaimRoute,
            Action::DrawTrainCards { .. } => ActionKind::DrawTrainCards,
            Action::DrawDestinations { .. } => ActionKind::DrawDestinations,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ClaimRoute {
                city1,
                city2,
                color,
                wilds_used,
                ..
            } => write!(
                f,
                "claim the route between {} and {} using {} cards and {} wild cards",
                city1, city2, color, wilds_used
            ),
            Action::DrawTrainCards {
                first,
                second: Some(second),
            } => write!(f, "draw {} and {}", first, second),
            Action::DrawTrainCards {
                first,
                second: None,
            } => write!(f, "draw {}", first),
            Action::DrawDestinations { keep } => write!(
                f,
                "draw destination cards and keep {} of them",
                keep.iter().filter(|kept| **kept).count()
            ),
        }
    }
}

/// An action, alongside the player taking it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerAction {
    pub player: usize,
    pub action: Action,
}

/// The three disjoint families of actions.
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    ClaimRoute,
    DrawTrainCards,
    DrawDestinations,
}

/// All the actions the current player can take, grouped per family.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegalActions {
    pub claims: Vec<Action>,
    pub card_draws: Vec<Action>,
    pub destination_draws: Vec<Action>,
}

impl LegalActions {
    pub fn family(&self, kind: ActionKind) -> &[Action] {
        match kind {
            ActionKind::ClaimRoute => &self.claims,
            ActionKind::DrawTrainCards => &self.card_draws,
            ActionKind::DrawDestinations => &self.destination_draws,
        }
    }

    /// Families with at least one action, in a fixed order.
    pub fn non_empty_families(&self) -> SmallVec<[ActionKind; 3]> {
        [
            ActionKind::ClaimRoute,
            ActionKind::DrawTrainCards,
            ActionKind::DrawDestinations,
        ]
        .into_iter()
        .filter(|kind| !self.family(*kind).is_empty())
        .collect()
    }

    pub fn len(&self) -> usize {
        self.claims.len() + self.card_draws.len() + self.destination_draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.claims
            .iter()
            .chain(&self.card_draws)
            .chain(&self.destination_draws)
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.family(action.kind()).contains(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn claim_route_json() {
        let action = Action::ClaimRoute {
            route: 4,
            city1: CityId(1),
            city2: CityId(7),
            color: TrainColor::Red,
            wilds_used: 2,
        };

        assert_eq!(
            serde_json::to_value(action).unwrap(),
            serde_json::json!({
                "kind": "claim_route",
                "route": 4,
                "city1": 1,
                "city2": 7,
                "color": "red",
                "wilds_used": 2
            })
        );
    }

    #[test]
    fn draw_train_cards_json() {
        let action: Action = serde_json::from_str(
            r#"{
                "kind": "draw_train_cards",
                "first": {"source": "face_up", "slot": 2, "card": "blue"},
                "second": {"source": "deck"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            action,
            Action::DrawTrainCards {
                first: CardSource::FaceUp {
                    slot: 2,
                    card: TrainColor::Blue
                },
                second: Some(CardSource::Deck),
            }
        );
        assert_eq!(action.kind(), ActionKind::DrawTrainCards);
    }

    #[test]
    fn display() {
        let action = Action::DrawTrainCards {
            first: CardSource::Deck,
            second: None,
        };
        assert_eq!(action.to_string(), "draw a card from the close deck");
        assert_eq!(ActionKind::DrawDestinations.to_string(), "draw_destinations");
    }

    #[test]
    fn legal_actions_families() {
        let legal_actions = LegalActions {
            claims: Vec::new(),
            card_draws: vec![Action::DrawTrainCards {
                first: CardSource::Deck,
                second: Some(CardSource::Deck),
            }],
            destination_draws: vec![Action::DrawDestinations {
                keep: [true, false, false],
            }],
        };

        assert_eq!(legal_actions.len(), 2);
        assert_eq!(
            legal_actions.non_empty_families().as_slice(),
            &[ActionKind::DrawTrainCards, ActionKind::DrawDestinations]
        );
        assert!(legal_actions.contains(&Action::DrawDestinations {
            keep: [true, false, false]
        }));
        assert!(!legal_actions.contains(&Action::DrawDestinations {
            keep: [true, true, false]
        }));
    }
}
