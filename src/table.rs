use crate::agent::PlayerAgent;
use crate::cards::{Card, Deck, DeckSeed};
use crate::events::{Event, EventBus, EventKind, StartFailureReason, SubscriberId};
use crate::hand::{HandController, HandCtx, HandResult};
use crate::player::{Seat, SeatFilter, SeatStatus, Seats};
use crate::position::RotationMemory;
use crate::{Chips, GameError, HandNo, PlayerId, SeatIdx, MAX_SEATS};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonStart {
    Seat(SeatIdx),
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub min_buy_in: Chips,
    pub max_buy_in: Chips,
    pub min_players: usize,
    pub max_players: usize,
    pub button_start: ButtonStart,
    /// Table-level shuffle seed; per-hand decks derive from it. Without one
    /// (and without an injected deck) the table refuses to start a hand.
    pub deck_seed: Option<DeckSeed>,
    pub decision_timeout_ms: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            small_blind: 5,
            big_blind: 10,
            min_buy_in: 100,
            max_buy_in: 10_000,
            min_players: 2,
            max_players: MAX_SEATS,
            button_start: ButtonStart::Random,
            deck_seed: None,
            decision_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum ConfigError {
    NonPositiveBlinds,
    BigBlindSmallerThanSmall,
    BadPlayerBounds,
    BadBuyInBounds,
}

impl std::error::Error for ConfigError {}

impl TableConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.small_blind <= 0 || self.big_blind <= 0 {
            return Err(ConfigError::NonPositiveBlinds);
        }
        if self.big_blind < self.small_blind {
            return Err(ConfigError::BigBlindSmallerThanSmall);
        }
        if self.min_players < 2 || self.max_players > MAX_SEATS || self.min_players > self.max_players
        {
            return Err(ConfigError::BadPlayerBounds);
        }
        if self.min_buy_in <= 0 || self.min_buy_in > self.max_buy_in {
            return Err(ConfigError::BadBuyInBounds);
        }
        Ok(())
    }
}

/// Outcome of [`Table::start_hand`]. Structural problems come back as a
/// value (and a `game.startFailed` event), never as a panic or error the
/// caller has to catch.
#[derive(Debug, Clone, PartialEq)]
pub enum StartResult {
    Started { hand_no: HandNo },
    Failed { reason: StartFailureReason, details: String },
}

impl StartResult {
    pub fn started(&self) -> bool {
        matches!(self, StartResult::Started { .. })
    }
}

/// The public face of the engine: one table, one hand at a time.
///
/// Seating changes only between hands; a hand runs to completion inside
/// `start_hand`, driving each agent in turn and emitting lifecycle events
/// along the way. Tables share nothing, so a multi-table host can own a map
/// of them and run each on its own thread.
pub struct Table {
    config: TableConfig,
    seats: Seats,
    agents: HashMap<PlayerId, Box<dyn PlayerAgent>>,
    bus: EventBus,
    memory: RotationMemory,
    injected_deck: Option<Vec<Card>>,
    forced_button: Option<SeatIdx>,
    first_hand_pending: bool,
    next_player_id: PlayerId,
    hand_no: HandNo,
    in_hand: bool,
    closed: bool,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("hand_no", &self.hand_no)
            .field("players", &self.seats.count(SeatFilter::ALL))
            .field("in_hand", &self.in_hand)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Table {
    pub fn new(config: TableConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            seats: Seats::default(),
            agents: HashMap::new(),
            bus: EventBus::default(),
            memory: RotationMemory::default(),
            injected_deck: None,
            forced_button: None,
            first_hand_pending: true,
            next_player_id: 1,
            hand_no: 0,
            in_hand: false,
            closed: false,
        })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Seat a new player with their agent and buy-in. Re-entry after
    /// elimination goes through here too and produces a brand new seat and
    /// player id.
    pub fn add_seat(
        &mut self,
        agent: Box<dyn PlayerAgent>,
        buy_in: Chips,
    ) -> Result<PlayerId, GameError> {
        if self.closed {
            return Err(GameError::TableClosed);
        }
        if self.in_hand {
            return Err(GameError::HandInProgress);
        }
        if self.seats.count(SeatFilter::ALL) >= self.config.max_players {
            return Err(GameError::TableFull);
        }
        if buy_in < self.config.min_buy_in || buy_in > self.config.max_buy_in {
            return Err(GameError::BuyInOutOfBounds);
        }
        let idx = self.seats.first_empty().ok_or(GameError::TableFull)?;
        let id = self.next_player_id;
        self.next_player_id += 1;
        self.seats.occupy(idx, Seat::new(id, buy_in));
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Cash the player out and free their seat. Between hands only.
    pub fn remove_seat(&mut self, id: PlayerId) -> Result<Chips, GameError> {
        if self.in_hand {
            return Err(GameError::HandInProgress);
        }
        let (idx, _) = self.seats.by_player(id).ok_or(GameError::UnknownPlayer)?;
        let seat = self.seats.vacate(idx).expect("seat occupied");
        self.agents.remove(&id);
        Ok(seat.chips)
    }

    /// Top up a stack between hands, bounded by the configured maximum. An
    /// eliminated seat cannot be revived; the player re-enters with
    /// [`Table::add_seat`] instead.
    pub fn add_chips(&mut self, id: PlayerId, amount: Chips) -> Result<Chips, GameError> {
        if self.in_hand {
            return Err(GameError::HandInProgress);
        }
        if amount <= 0 {
            return Err(GameError::BuyInOutOfBounds);
        }
        let (idx, seat) = self.seats.by_player(id).ok_or(GameError::UnknownPlayer)?;
        if seat.status == SeatStatus::Eliminated {
            return Err(GameError::PlayerEliminated);
        }
        if seat.chips + amount > self.config.max_buy_in {
            return Err(GameError::BuyInOutOfBounds);
        }
        let seat = self.seats.get_mut(idx).expect("seat occupied");
        seat.chips += amount;
        Ok(seat.chips)
    }

    /// Skip this player for upcoming hands without freeing the seat.
    pub fn sit_out(&mut self, id: PlayerId) -> Result<(), GameError> {
        if self.in_hand {
            return Err(GameError::HandInProgress);
        }
        let (idx, seat) = self.seats.by_player(id).ok_or(GameError::UnknownPlayer)?;
        if seat.status == SeatStatus::Eliminated {
            return Err(GameError::PlayerEliminated);
        }
        self.seats.get_mut(idx).expect("seat occupied").status = SeatStatus::SittingOut;
        Ok(())
    }

    /// Deal this player back in from the next hand on.
    pub fn sit_in(&mut self, id: PlayerId) -> Result<(), GameError> {
        if self.in_hand {
            return Err(GameError::HandInProgress);
        }
        let (idx, seat) = self.seats.by_player(id).ok_or(GameError::UnknownPlayer)?;
        if seat.status == SeatStatus::Eliminated {
            return Err(GameError::PlayerEliminated);
        }
        self.seats.get_mut(idx).expect("seat occupied").status = SeatStatus::Waiting;
        Ok(())
    }

    pub fn seats(&self) -> &Seats {
        &self.seats
    }

    pub fn chips(&self, id: PlayerId) -> Option<Chips> {
        self.seats.by_player(id).map(|(_, s)| s.chips)
    }

    pub fn on<F: FnMut(&Event) + Send + 'static>(&self, kind: EventKind, f: F) -> SubscriberId {
        self.bus.on(kind, f)
    }

    pub fn on_any<F: FnMut(&Event) + Send + 'static>(&self, f: F) -> SubscriberId {
        self.bus.on_any(f)
    }

    pub fn off(&self, id: SubscriberId) {
        self.bus.off(id)
    }

    /// Test hook: fix the next hand's deck to this exact card order.
    pub fn set_deck(&mut self, cards: Vec<Card>) {
        self.injected_deck = Some(cards);
    }

    /// Test hook: place the button for the next hand instead of rotating.
    pub fn set_button(&mut self, idx: SeatIdx) {
        self.forced_button = Some(idx);
    }

    pub fn is_hand_in_progress(&self) -> bool {
        self.in_hand
    }

    /// Stop the table: no further hands can start. Seated players keep
    /// their stacks and can still be cashed out.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run one complete hand. Blocks while agents decide; by the time this
    /// returns the hand has fully ended, awards are applied, and
    /// `is_hand_in_progress` is false again.
    pub fn start_hand(&mut self) -> StartResult {
        if self.in_hand {
            return self.fail(
                StartFailureReason::HandInProgress,
                "a hand is already running",
            );
        }
        if self.closed {
            return self.fail(StartFailureReason::TableClosed, "the table is closed");
        }
        let eligible = self.seats.count(SeatFilter::ELIGIBLE);
        let need = self.config.min_players;
        if eligible < need {
            return self.fail(
                StartFailureReason::NotEnoughPlayers,
                &format!("need {} players with chips, have {}", need, eligible),
            );
        }
        if self.injected_deck.is_none() && self.config.deck_seed.is_none() {
            return self.fail(
                StartFailureReason::MissingEntropySource,
                "no deck seed configured and no deck injected",
            );
        }

        let hint = self.button_hint();
        let positions = match self.memory.resolve(&self.seats, hint) {
            Ok(p) => p,
            Err(e) => {
                return self.fail(StartFailureReason::NotEnoughPlayers, &e.to_string());
            }
        };

        let hand_no = self.hand_no + 1;
        let deck = match self.injected_deck.take() {
            Some(cards) => Deck::from_ordered(cards),
            None => {
                let seed = self.config.deck_seed.expect("checked above");
                Deck::shuffled(&seed.for_hand(hand_no))
            }
        };

        self.hand_no = hand_no;
        self.first_hand_pending = false;
        self.in_hand = true;
        let controller = HandController::new(hand_no, positions, deck);
        let mut ctx = HandCtx {
            seats: &mut self.seats,
            agents: &mut self.agents,
            bus: &self.bus,
            small_blind: self.config.small_blind,
            big_blind: self.config.big_blind,
            timeout_ms: self.config.decision_timeout_ms,
        };
        let result = controller.run(&mut ctx);
        self.in_hand = false;
        if result == HandResult::Completed {
            // cancelled hands do not advance the blinds
            self.memory.record(&positions);
        }
        StartResult::Started { hand_no }
    }

    fn button_hint(&mut self) -> Option<SeatIdx> {
        if let Some(forced) = self.forced_button.take() {
            return Some(forced);
        }
        if self.first_hand_pending {
            return Some(match self.config.button_start {
                ButtonStart::Seat(idx) => idx,
                ButtonStart::Random => rand::thread_rng().gen_range(0..MAX_SEATS),
            });
        }
        None
    }

    fn fail(&self, reason: StartFailureReason, details: &str) -> StartResult {
        log::warn!("start_hand refused: {} ({})", reason, details);
        self.bus.emit(Event::StartFailed {
            reason,
            details: details.to_string(),
        });
        StartResult::Failed {
            reason,
            details: details.to_string(),
        }
    }
}
