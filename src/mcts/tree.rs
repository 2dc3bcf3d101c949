//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous `Vec` and referenced by [`NodeId`] indices. The tree is
//! only ever touched by the thread running the search.

use crate::action::{Action, ActionKind, LegalActions};
use crate::game_state::GameState;
use crate::mcts::config::SelectionBias;

use rand::seq::SliceRandom;
use rand::Rng;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A decision point of the searching player.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub parent: Option<NodeId>,

    /// Action of the searching player that led to this node from its parent.
    pub action: Option<Action>,

    /// State at this node, with the searching player to play unless the game is over.
    pub state: GameState,

    pub children: Vec<NodeId>,

    /// Number of rollouts backpropagated through this node.
    pub visits: u32,

    /// Sum of the rewards backpropagated through this node.
    pub value: f64,

    /// Rollouts issued through this node in the current round, not backpropagated yet.
    pub pending: u32,

    /// Static selection adjustment, computed once from the action that led here.
    pub bias: f64,

    /// Actions not tried yet, per family.
    untried: LegalActions,

    /// Number of legal actions when the node was created.
    num_legal_actions: usize,
}

impl SearchNode {
    fn new(
        parent: Option<NodeId>,
        action: Option<Action>,
        mut state: GameState,
        acting_player: usize,
        bias: f64,
    ) -> Self {
        let untried = if state.current_player() == acting_player {
            state.legal_actions()
        } else {
            LegalActions::default()
        };

        Self::with_untried(parent, action, state, untried, bias)
    }

    fn with_untried(
        parent: Option<NodeId>,
        action: Option<Action>,
        state: GameState,
        untried: LegalActions,
        bias: f64,
    ) -> Self {
        Self {
            parent,
            action,
            num_legal_actions: untried.len(),
            untried,
            state,
            children: Vec::new(),
            visits: 0,
            value: 0.0,
            pending: 0,
            bias,
        }
    }

    #[inline]
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value / self.visits as f64
        }
    }

    /// Visits counting the rollouts still in flight.
    #[inline]
    pub fn effective_visits(&self) -> u32 {
        self.visits + self.pending
    }

    /// UCT score from the parent's point of view, bias included.
    ///
    /// Nodes neither visited nor pending always come first. Pending rollouts only count in
    /// the exploration term, so that a round spreads over the children.
    pub fn uct_score(&self, parent_visits: u32, exploration: f64) -> f64 {
        if self.effective_visits() == 0 {
            return f64::INFINITY;
        }

        let visits = self.effective_visits() as f64;
        let parent_visits = (parent_visits.max(1)) as f64;
        self.mean_value() + exploration * (2.0 * parent_visits.ln() / visits).sqrt() + self.bias
    }

    /// Whether this node may not grow more children for now.
    ///
    /// A node with `n` visits, pending ones included, may have up to `ceil(k * sqrt(n))`
    /// children, and at least one.
    pub fn is_fully_expanded(&self, widening: f64) -> bool {
        if self.untried.is_empty() {
            return true;
        }

        let visits = self.effective_visits() as f64;
        let allowed = ((widening * visits.sqrt()).ceil() as usize).max(1);
        self.children.len() >= allowed.min(self.num_legal_actions)
    }

    #[inline]
    pub fn num_untried(&self) -> usize {
        self.untried.len()
    }

    /// Removes an untried action: a family is drawn uniformly first, then an action within it.
    pub fn take_untried<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Action> {
        let kind = *self.untried.non_empty_families().choose(rng)?;
        let family = match kind {
            ActionKind::ClaimRoute => &mut self.untried.claims,
            ActionKind::DrawTrainCards => &mut self.untried.card_draws,
            ActionKind::DrawDestinations => &mut self.untried.destination_draws,
        };

        let index = rng.gen_range(0..family.len());
        Some(family.swap_remove(index))
    }
}

/// Adjustment added to the selection score of the child reached by `action` from `state`.
///
/// Claims are favored when they serve an unfulfilled destination card of the acting player;
/// destination draws are disfavored while destination cards are pending; card draws are
/// disfavored with a large hand.
pub fn selection_bias(state: &GameState, action: &Action, bias: &SelectionBias) -> f64 {
    let player = state.player(state.current_player());

    match *action {
        Action::ClaimRoute { city1, city2, .. } => {
            let distance_oracle = state.distance_oracle();
            player
                .incomplete_destination_cards()
                .map(|destination_card| {
                    let (start, end) = destination_card.destination;
                    let completes = (player.is_connected(start, city1)
                        && player.is_connected(city2, end))
                        || (player.is_connected(start, city2) && player.is_connected(city1, end));

                    if completes {
                        bias.claim_completes_destination
                    } else if distance_oracle.is_on_shortest_path(start, end, city1, city2) {
                        bias.claim_on_shortest_path
                    } else if [start, end].into_iter().any(|city| {
                        let near = distance_oracle.cities_at_distance(city, 2);
                        near.contains(&city1) || near.contains(&city2)
                    }) {
                        bias.claim_near_destination
                    } else {
                        0.0
                    }
                })
                .sum()
        }
        Action::DrawDestinations { .. } => {
            let incomplete = player.incomplete_destination_cards().count();
            let mut score = -bias.destination_draw_penalty * incomplete as f64;
            if player.cars() >= bias.plentiful_cars
                && player.destination_cards().len() <= bias.few_destinations
            {
                score += bias.destination_draw_bonus;
            }
            score
        }
        Action::DrawTrainCards { .. } => {
            if player.train_cards().len() >= bias.large_hand {
                -bias.card_draw_penalty
            } else {
                0.0
            }
        }
    }
}

/// Search tree with arena-based node storage. The root is always the first node.
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    acting_player: usize,
}

impl SearchTree {
    /// Create a new tree rooted at `state`, searching on behalf of its current player.
    pub fn new(state: GameState) -> Self {
        let acting_player = state.current_player();
        Self {
            nodes: vec![SearchNode::new(None, None, state, acting_player, 0.0)],
            acting_player,
        }
    }

    /// Same as [`SearchTree::new`], with the actions to try at the root given explicitly.
    ///
    /// The root state of a search is determinized, so its legal actions may differ from the
    /// ones of the actual game: only the latter can be decided on.
    pub fn with_root_actions(state: GameState, root_actions: LegalActions) -> Self {
        let acting_player = state.current_player();
        Self {
            nodes: vec![SearchNode::with_untried(None, None, state, root_actions, 0.0)],
            acting_player,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn acting_player(&self) -> usize {
        self.acting_player
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a child reached by `action`, and return its id.
    pub fn add_child(&mut self, parent: NodeId, action: Action, state: GameState, bias: f64) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SearchNode::new(
            Some(parent),
            Some(action),
            state,
            self.acting_player,
            bias,
        ));
        self.get_mut(parent).children.push(id);
        id
    }

    /// Child with the best UCT score, the first one on ties.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &node.children {
            let score = self.get(child).uct_score(node.effective_visits(), exploration);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child, score)),
            }
        }
        best.map(|(child, _)| child)
    }

    /// Child of the root with the best mean value, the first one on ties. Unvisited children
    /// are ignored.
    pub fn best_child(&self) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self.get(self.root()).children {
            let node = self.get(child);
            if node.visits == 0 {
                continue;
            }
            match best {
                Some((_, best_value)) if node.mean_value() <= best_value => {}
                _ => best = Some((child, node.mean_value())),
            }
        }
        best.map(|(child, _)| child)
    }

    /// Marks a rollout from `leaf` as in flight, on the leaf and every one of its ancestors.
    pub fn add_pending(&mut self, leaf: NodeId) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.pending += 1;
            current = node.parent;
        }
    }

    /// Undoes [`SearchTree::add_pending`], whether the rollout came back or not.
    pub fn release_pending(&mut self, leaf: NodeId) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.pending = node.pending.saturating_sub(1);
            current = node.parent;
        }
    }

    /// Add `reward` to the node and every one of its ancestors.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.visits += 1;
            node.value += reward;
            current = node.parent;
        }
    }
}
