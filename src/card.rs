use crate::city::CityToCity;
use crate::error::GameError;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::iter::repeat;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount, EnumIter};

pub const NUM_OPEN_TRAIN_CARDS: usize = 5;
pub const NUM_DRAWN_DESTINATION_CARDS: usize = 3;
pub const NUM_DRAWN_INITIAL_TRAIN_CARDS: usize = 4;
const NUM_WILD_CARDS: usize = 14;
const NUM_NON_WILD_CARDS: usize = 12;

/// The face-up row of train cards. A slot is `None` once both decks ran dry.
pub type FaceUpRow = SmallVec<[Option<TrainColor>; NUM_OPEN_TRAIN_CARDS]>;

/// Represents the different variants of train cards.
///
/// Routes reuse the same colors: a route of color `Wild` is a *gray* route, which can be
/// claimed with cards of any single color.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumCount,
    EnumIter,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrainColor {
    /// Also known as the *Hopper train*.
    Black,
    /// Also known as the *Tanker train*.
    Blue,
    /// Also known as the *Caboose train*.
    Green,
    /// Also known as the *Freight train*.
    Orange,
    /// Also known as the *Box train*.
    Pink,
    /// Also known as the *Coal train*.
    Red,
    /// Also known as the *Passenger train*.
    White,
    /// Also known as the *Locomotive*.
    /// This is a special train that matches with any color.
    Wild,
    /// Also known as the *Reefer train*.
    Yellow,
}

impl TrainColor {
    /// Whether the current color is wild, i.e. matches with any color.
    ///
    /// # Examples:
    /// ```
    /// use ticket_to_ride_planner::card::TrainColor;
    ///
    /// assert!(!TrainColor::Black.is_wild());
    /// assert!(TrainColor::Wild.is_wild());
    /// ```
    #[inline]
    pub fn is_wild(&self) -> bool {
        *self == TrainColor::Wild
    }

    /// The opposite of `is_wild`.
    #[inline]
    pub fn is_not_wild(&self) -> bool {
        !self.is_wild()
    }

    /// All the colors a gray route can be claimed with.
    pub fn non_wild() -> impl Iterator<Item = TrainColor> {
        TrainColor::iter().filter(TrainColor::is_not_wild)
    }
}

/// Encapsulates information about a destination card.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DestinationCard {
    /// The two cities that must be connected to fulfill the destination card.
    pub destination: CityToCity,
    /// How many points are granted once this card is fulfilled.
    /// If not fulfilled, the same amount will rather be substracted.
    pub points: u8,
}

/// Public information about the decks, shared with the display layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardDealerState {
    pub open_train_card_deck: FaceUpRow,
    pub close_train_card_deck_size: usize,
    pub discarded_train_card_deck_size: usize,
    pub destination_card_deck_size: usize,
    pub discarded_destination_card_deck_size: usize,
}

/// Entity in charge of dealing as well as shuffling destination and train cards.
///
/// The dealer never owns its randomness: every operation that may shuffle takes the
/// caller's RNG, so that a seeded game replays identically.
///
/// The dealer keeps one invariant at all times: the close deck is only empty when the
/// discarded deck is empty as well. Hence the next hidden card is always the top of the
/// close deck, which lets callers predict face-up refills.
#[derive(Clone, Debug)]
pub struct CardDealer {
    open_train_card_deck: FaceUpRow,
    close_train_card_deck: Vec<TrainColor>,
    discarded_train_card_deck: Vec<TrainColor>,
    destination_card_deck: VecDeque<DestinationCard>,
    discarded_destination_card_deck: Vec<DestinationCard>,
}

impl CardDealer {
    /// Creates a new `CardDealer`, with all 110 train cards and the given destination cards shuffled.
    ///
    /// # Example
    /// ```
    /// use rand::rngs::StdRng;
    /// use rand::SeedableRng;
    /// use ticket_to_ride_planner::card::CardDealer;
    ///
    /// let card_dealer = CardDealer::new(Vec::new(), &mut StdRng::seed_from_u64(7));
    /// assert_eq!(card_dealer.hidden_train_card_count(), 105);
    /// ```
    pub fn new<R: Rng + ?Sized>(destination_cards: Vec<DestinationCard>, rng: &mut R) -> Self {
        let mut all_train_cards = Vec::with_capacity(110);

        for color in TrainColor::iter() {
            let num_of_train_cards_per_color = if color.is_wild() {
                NUM_WILD_CARDS
            } else {
                NUM_NON_WILD_CARDS
            };
            all_train_cards.extend(repeat(color).take(num_of_train_cards_per_color));
        }

        all_train_cards.shuffle(rng);

        let mut destination_cards = destination_cards;
        destination_cards.shuffle(rng);

        let open_train_card_deck = all_train_cards
            .split_off(all_train_cards.len() - NUM_OPEN_TRAIN_CARDS)
            .into_iter()
            .map(Some)
            .collect();

        Self {
            open_train_card_deck,
            close_train_card_deck: all_train_cards,
            discarded_train_card_deck: Vec::new(),
            destination_card_deck: VecDeque::from(destination_cards),
            discarded_destination_card_deck: Vec::new(),
        }
    }

    /// Builds a dealer from explicit decks. The last element of each deck is its top.
    ///
    /// Mostly useful to set up precise situations, e.g. in tests.
    pub fn from_parts(
        open_train_card_deck: FaceUpRow,
        close_train_card_deck: Vec<TrainColor>,
        discarded_train_card_deck: Vec<TrainColor>,
        destination_card_deck: Vec<DestinationCard>,
    ) -> Self {
        let mut card_dealer = Self {
            open_train_card_deck,
            close_train_card_deck,
            discarded_train_card_deck,
            destination_card_deck: VecDeque::from(destination_card_deck),
            discarded_destination_card_deck: Vec::new(),
        };
        // No RNG here: keep the discarded order as is when it has to become the close deck.
        if card_dealer.close_train_card_deck.is_empty() {
            std::mem::swap(
                &mut card_dealer.close_train_card_deck,
                &mut card_dealer.discarded_train_card_deck,
            );
        }
        card_dealer
    }

    /// The face-up train cards.
    #[inline]
    pub fn face_up(&self) -> &FaceUpRow {
        &self.open_train_card_deck
    }

    /// The card at the top of the close deck, i.e. the next one to be drawn or to refill a slot.
    #[inline]
    pub fn peek_close_train_card(&self) -> Option<TrainColor> {
        self.close_train_card_deck.last().copied()
    }

    /// The `n` top cards of the close deck, top first.
    pub fn peek_close_train_cards(&self, n: usize) -> impl Iterator<Item = TrainColor> + '_ {
        self.close_train_card_deck.iter().rev().take(n).copied()
    }

    /// Cards that are neither face-up nor in a hand: close and discarded decks combined.
    #[inline]
    pub fn hidden_train_card_count(&self) -> usize {
        self.close_train_card_deck.len() + self.discarded_train_card_deck.len()
    }

    /// How many cards of the given color the dealer holds, over all of its decks.
    pub fn count_train_cards(&self, color: TrainColor) -> usize {
        self.open_train_card_deck
            .iter()
            .filter(|card| **card == Some(color))
            .count()
            + self
                .close_train_card_deck
                .iter()
                .chain(&self.discarded_train_card_deck)
                .filter(|card| **card == color)
                .count()
    }

    /// Draws from the top of the close train card deck, and returns the card.
    ///
    /// If there are no more cards left in that deck, returns an `Err`.
    ///
    /// If the close deck is empty after the draw is done, it will re-shuffle the discarded deck of train cards and swap it.
    pub fn draw_from_close_train_card_deck<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<TrainColor, GameError> {
        match self.close_train_card_deck.pop() {
            Some(card_drawn) => {
                self.maybe_reshuffle_and_swap_discarded_deck(rng);

                Ok(card_drawn)
            }
            None => Err(GameError::NoCardsLeft),
        }
    }

    /// Takes the face-up train card at `card_index`. The slot is refilled right away from the
    /// close deck, or left empty if there is no hidden card left.
    pub fn draw_from_open_train_card_deck<R: Rng + ?Sized>(
        &mut self,
        card_index: usize,
        rng: &mut R,
    ) -> Result<TrainColor, GameError> {
        let card = self.peek_at_open_train_card(card_index)?;
        self.open_train_card_deck[card_index] = self.draw_from_close_train_card_deck(rng).ok();

        Ok(card)
    }

    /// What the face-up row will look like once the card at `card_index` has been taken.
    ///
    /// Exact, because the close deck is never empty while hidden cards remain.
    pub fn face_up_after_taking(&self, card_index: usize) -> FaceUpRow {
        let mut row = self.open_train_card_deck.clone();
        if let Some(slot) = row.get_mut(card_index) {
            *slot = self.peek_close_train_card();
        }
        row
    }

    #[inline]
    pub fn peek_at_open_train_card(&self, card_index: usize) -> Result<TrainColor, GameError> {
        match self.open_train_card_deck.get(card_index) {
            None => Err(GameError::FaceUpSlotOutOfBounds(card_index)),
            Some(None) => Err(GameError::EmptyFaceUpSlot(card_index)),
            Some(Some(card)) => Ok(*card),
        }
    }

    /// Adds the given train cards to the deck of discarded train cards.
    ///
    /// If the close train card deck is empty, we re-shuffle the discarded deck and swap it.
    pub fn discard_train_cards<R: Rng + ?Sized>(
        &mut self,
        train_cards: impl IntoIterator<Item = TrainColor>,
        rng: &mut R,
    ) {
        // Note that insertion order in the discard deck does not matter.
        self.discarded_train_card_deck.extend(train_cards);

        self.maybe_reshuffle_and_swap_discarded_deck(rng);
    }

    /// Shuffles the discarded deck under the close deck when fewer than `n` cards are left in
    /// the latter, so that the `n` top cards can be revealed.
    pub fn top_up_close_train_card_deck<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) {
        if self.close_train_card_deck.len() >= n || self.discarded_train_card_deck.is_empty() {
            return;
        }

        let mut reshuffled = std::mem::take(&mut self.discarded_train_card_deck);
        reshuffled.shuffle(rng);
        // The cards left in the close deck stay on top.
        reshuffled.append(&mut self.close_train_card_deck);
        self.close_train_card_deck = reshuffled;
    }

    /// Moves the `n` top cards of the close deck to the discarded deck, e.g. after a tunnel reveal.
    pub fn discard_top_close_train_cards<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) {
        let keep = self.close_train_card_deck.len().saturating_sub(n);
        let revealed = self.close_train_card_deck.split_off(keep);
        self.discard_train_cards(revealed, rng);
    }

    #[inline]
    fn maybe_reshuffle_and_swap_discarded_deck<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.close_train_card_deck.is_empty() || self.discarded_train_card_deck.is_empty() {
            return;
        }

        self.discarded_train_card_deck.shuffle(rng);

        std::mem::swap(
            &mut self.close_train_card_deck,
            &mut self.discarded_train_card_deck,
        );
    }

    /// How many destination cards the next draw will reveal (at most three).
    #[inline]
    pub fn destination_cards_available(&self) -> usize {
        (self.destination_card_deck.len() + self.discarded_destination_card_deck.len())
            .min(NUM_DRAWN_DESTINATION_CARDS)
    }

    /// Reveals up to three destination cards from the top of the destination deck.
    ///
    /// When fewer than three cards are left, the discarded destination cards are shuffled and
    /// placed under the deck first. If both piles are empty, returns an `Err`.
    pub fn draw_from_destination_card_deck<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<SmallVec<[DestinationCard; NUM_DRAWN_DESTINATION_CARDS]>, GameError> {
        if self.destination_card_deck.len() < NUM_DRAWN_DESTINATION_CARDS
            && !self.discarded_destination_card_deck.is_empty()
        {
            self.discarded_destination_card_deck.shuffle(rng);
            for destination_card in self.discarded_destination_card_deck.drain(..) {
                self.destination_card_deck.push_front(destination_card);
            }
        }

        if self.destination_card_deck.is_empty() {
            return Err(GameError::NoDestinationsLeft);
        }

        let mut drawn_destination_cards = SmallVec::new();

        for _ in 0..NUM_DRAWN_DESTINATION_CARDS {
            match self.destination_card_deck.pop_back() {
                Some(destination_card) => drawn_destination_cards.push(destination_card),
                None => break,
            }
        }

        Ok(drawn_destination_cards)
    }

    /// Adds the given destination cards to the discarded destination pile.
    pub fn discard_destination_cards(
        &mut self,
        destination_cards: impl IntoIterator<Item = DestinationCard>,
    ) {
        self.discarded_destination_card_deck
            .extend(destination_cards);
    }

    /// Shuffles every card that is hidden to the players: the close train card deck and the
    /// destination deck. Used to hide the real deck order from a search.
    pub fn shuffle_hidden_cards<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.close_train_card_deck.shuffle(rng);
        self.destination_card_deck.make_contiguous().shuffle(rng);
    }

    pub fn get_state(&self) -> CardDealerState {
        CardDealerState {
            open_train_card_deck: self.open_train_card_deck.clone(),
            close_train_card_deck_size: self.close_train_card_deck.len(),
            discarded_train_card_deck_size: self.discarded_train_card_deck.len(),
            destination_card_deck_size: self.destination_card_deck.len(),
            discarded_destination_card_deck_size: self.discarded_destination_card_deck.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::CityId;

    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use smallvec::smallvec;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn destination(start: u16, end: u16, points: u8) -> DestinationCard {
        DestinationCard {
            destination: (CityId(start), CityId(end)),
            points,
        }
    }

    // Tests for `TrainColor`.

    #[test]
    fn train_color_to_string() {
        assert_eq!(TrainColor::Orange.to_string(), "orange");
        assert_eq!(TrainColor::Pink.to_string(), "pink");
    }

    #[test]
    fn train_color_to_json() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&TrainColor::Blue)?, r#""blue""#);
        assert_eq!(
            serde_json::from_str::<TrainColor>(r#""wild""#)?,
            TrainColor::Wild
        );
        Ok(())
    }

    #[test]
    fn invalid_json_to_train_color() {
        assert!(serde_json::from_str::<TrainColor>(r#""turquoise""#).is_err());
    }

    #[test]
    fn non_wild_colors() {
        assert_eq!(TrainColor::non_wild().count(), 8);
        assert!(TrainColor::non_wild().all(|color| color.is_not_wild()));
    }

    // Tests for `CardDealer`.

    #[test]
    fn new_card_dealer() {
        let card_dealer = CardDealer::new(vec![destination(0, 1, 5)], &mut rng());

        assert_eq!(card_dealer.face_up().len(), NUM_OPEN_TRAIN_CARDS);
        assert!(card_dealer.face_up().iter().all(Option::is_some));
        assert_eq!(card_dealer.hidden_train_card_count(), 105);
        assert_eq!(card_dealer.destination_cards_available(), 1);

        for color in TrainColor::iter() {
            let expected_num = if color.is_wild() {
                NUM_WILD_CARDS
            } else {
                NUM_NON_WILD_CARDS
            };
            assert_eq!(card_dealer.count_train_cards(color), expected_num);
        }
    }

    #[test]
    fn new_card_dealer_is_seeded() {
        let first_card_dealer = CardDealer::new(Vec::new(), &mut rng());
        let second_card_dealer = CardDealer::new(Vec::new(), &mut rng());

        assert_eq!(
            first_card_dealer.close_train_card_deck,
            second_card_dealer.close_train_card_deck
        );
    }

    #[test]
    fn card_dealer_draw_from_close_deck() {
        let mut card_dealer = CardDealer::from_parts(
            smallvec![None; NUM_OPEN_TRAIN_CARDS],
            vec![TrainColor::Blue],
            vec![TrainColor::Red],
            Vec::new(),
        );

        assert_eq!(
            card_dealer.draw_from_close_train_card_deck(&mut rng()),
            Ok(TrainColor::Blue)
        );
        assert!(card_dealer.discarded_train_card_deck.is_empty());
        assert_eq!(
            card_dealer.draw_from_close_train_card_deck(&mut rng()),
            Ok(TrainColor::Red)
        );
        assert_eq!(
            card_dealer.draw_from_close_train_card_deck(&mut rng()),
            Err(GameError::NoCardsLeft)
        );
    }

    #[test]
    fn card_dealer_draw_from_open_deck_err() {
        let mut card_dealer = CardDealer::from_parts(
            smallvec![Some(TrainColor::Blue), None],
            vec![TrainColor::Red],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(
            card_dealer.draw_from_open_train_card_deck(1, &mut rng()),
            Err(GameError::EmptyFaceUpSlot(1))
        );
        assert_eq!(
            card_dealer.draw_from_open_train_card_deck(6, &mut rng()),
            Err(GameError::FaceUpSlotOutOfBounds(6))
        );
    }

    #[test]
    fn card_dealer_draw_from_open_deck_refills_slot() {
        let mut card_dealer = CardDealer::from_parts(
            smallvec![Some(TrainColor::White), Some(TrainColor::Wild)],
            vec![TrainColor::Green, TrainColor::Pink],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(
            card_dealer.face_up_after_taking(0).as_slice(),
            &[Some(TrainColor::Pink), Some(TrainColor::Wild)]
        );
        assert_eq!(
            card_dealer.draw_from_open_train_card_deck(0, &mut rng()),
            Ok(TrainColor::White)
        );
        assert_eq!(
            card_dealer.face_up().as_slice(),
            &[Some(TrainColor::Pink), Some(TrainColor::Wild)]
        );
    }

    #[test]
    fn card_dealer_draw_from_open_deck_empty_close_deck() {
        let mut card_dealer = CardDealer::from_parts(
            smallvec![Some(TrainColor::White), Some(TrainColor::Black)],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(
            card_dealer.draw_from_open_train_card_deck(0, &mut rng()),
            Ok(TrainColor::White)
        );
        assert!(card_dealer.face_up()[0].is_none());
    }

    #[test]
    fn card_dealer_discard_train_card_with_non_empty_close_deck() {
        let mut card_dealer = CardDealer::from_parts(
            FaceUpRow::new(),
            vec![TrainColor::Pink],
            Vec::new(),
            Vec::new(),
        );

        card_dealer.discard_train_cards([TrainColor::Yellow], &mut rng());
        assert_eq!(card_dealer.close_train_card_deck, vec![TrainColor::Pink]);
        assert_eq!(
            card_dealer.discarded_train_card_deck,
            vec![TrainColor::Yellow]
        );
    }

    #[test]
    fn card_dealer_discard_train_card_with_empty_close_deck() {
        let mut card_dealer =
            CardDealer::from_parts(FaceUpRow::new(), Vec::new(), Vec::new(), Vec::new());

        card_dealer.discard_train_cards([TrainColor::Yellow], &mut rng());
        assert_eq!(card_dealer.close_train_card_deck, vec![TrainColor::Yellow]);
        assert!(card_dealer.discarded_train_card_deck.is_empty());
    }

    #[test]
    fn card_dealer_discard_top_close_cards() {
        let mut card_dealer = CardDealer::from_parts(
            FaceUpRow::new(),
            vec![TrainColor::Red, TrainColor::Blue, TrainColor::Green],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(
            card_dealer.peek_close_train_cards(2).collect::<Vec<_>>(),
            vec![TrainColor::Green, TrainColor::Blue]
        );
        card_dealer.discard_top_close_train_cards(2, &mut rng());
        assert_eq!(card_dealer.close_train_card_deck, vec![TrainColor::Red]);
        assert_eq!(card_dealer.discarded_train_card_deck.len(), 2);
    }

    #[test]
    fn card_dealer_top_up_close_deck() {
        let mut card_dealer = CardDealer::from_parts(
            FaceUpRow::new(),
            vec![TrainColor::Blue],
            vec![TrainColor::Red, TrainColor::Red],
            Vec::new(),
        );

        // Enough cards already: nothing moves.
        card_dealer.top_up_close_train_card_deck(1, &mut rng());
        assert_eq!(card_dealer.close_train_card_deck, vec![TrainColor::Blue]);

        card_dealer.top_up_close_train_card_deck(3, &mut rng());
        assert_eq!(
            card_dealer.peek_close_train_cards(3).collect::<Vec<_>>(),
            vec![TrainColor::Blue, TrainColor::Red, TrainColor::Red]
        );
        assert!(card_dealer.discarded_train_card_deck.is_empty());
    }

    #[test]
    fn card_dealer_draw_destination_card() {
        let cards = vec![
            destination(0, 1, 1),
            destination(0, 2, 2),
            destination(0, 3, 3),
            destination(0, 4, 4),
        ];
        let mut card_dealer =
            CardDealer::from_parts(FaceUpRow::new(), Vec::new(), Vec::new(), cards);

        let expected: SmallVec<[_; NUM_DRAWN_DESTINATION_CARDS]> = smallvec![
            destination(0, 4, 4),
            destination(0, 3, 3),
            destination(0, 2, 2)
        ];
        assert_eq!(
            card_dealer.draw_from_destination_card_deck(&mut rng()),
            Ok(expected)
        );
        assert_eq!(card_dealer.destination_card_deck.len(), 1);
    }

    #[test]
    fn card_dealer_draw_destination_card_use_discarded_cards() {
        let only_destination_card = destination(1, 2, 5);
        let mut card_dealer = CardDealer::from_parts(
            FaceUpRow::new(),
            Vec::new(),
            Vec::new(),
            vec![only_destination_card.clone()],
        );
        card_dealer.discard_destination_cards([destination(3, 4, 15), destination(5, 6, 6)]);
        assert_eq!(card_dealer.destination_cards_available(), 3);

        let drawn = card_dealer
            .draw_from_destination_card_deck(&mut rng())
            .unwrap();
        assert_eq!(drawn.len(), 3);
        assert_eq!(drawn[0], only_destination_card);
        assert!(card_dealer.discarded_destination_card_deck.is_empty());
    }

    #[test]
    fn card_dealer_draw_destination_empty() {
        let mut card_dealer =
            CardDealer::from_parts(FaceUpRow::new(), Vec::new(), Vec::new(), Vec::new());

        assert_eq!(card_dealer.destination_cards_available(), 0);
        assert_eq!(
            card_dealer.draw_from_destination_card_deck(&mut rng()),
            Err(GameError::NoDestinationsLeft)
        );
    }

    #[test]
    fn shuffle_hidden_cards_keeps_counts() {
        let mut card_dealer = CardDealer::new(Vec::new(), &mut rng());
        let face_up = card_dealer.face_up().clone();

        card_dealer.shuffle_hidden_cards(&mut StdRng::seed_from_u64(3));
        assert_eq!(card_dealer.face_up(), &face_up);
        assert_eq!(card_dealer.count_train_cards(TrainColor::Wild), NUM_WILD_CARDS);
    }
}
