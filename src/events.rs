use crate::bet::{ActionKind, BetAction};
use crate::cards::{Card, Ranking};
use crate::round::{RejectReason, Street};
use crate::{Chips, HandNo, PlayerId, SeatIdx};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Every observable moment in a hand's life, in emission order. The variant
/// tags and field names are the public contract: adding fields is backward
/// compatible, renaming or removing is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum Event {
    #[serde(rename = "hand.started")]
    HandStarted {
        hand_no: HandNo,
        button: SeatIdx,
        small_blind: Option<SeatIdx>,
        big_blind: SeatIdx,
        players: Vec<PlayerId>,
    },
    #[serde(rename = "round.started")]
    RoundStarted { street: Street },
    #[serde(rename = "prompt")]
    Prompt {
        seat_id: SeatIdx,
        player: PlayerId,
        to_call: Chips,
        min_raise: Chips,
        max_raise: Chips,
        legal: Vec<ActionKind>,
        timeout_ms: u64,
    },
    #[serde(rename = "player.action")]
    PlayerAction {
        seat_id: SeatIdx,
        player: PlayerId,
        action: BetAction,
    },
    #[serde(rename = "player.actionRejected")]
    ActionRejected {
        seat_id: SeatIdx,
        player: PlayerId,
        reason: RejectReason,
    },
    #[serde(rename = "pot.updated")]
    PotUpdated {
        total: Chips,
        dead_money: Option<Chips>,
    },
    #[serde(rename = "street.dealt")]
    StreetDealt { street: Street, cards: Vec<Card> },
    #[serde(rename = "showdown.revealed")]
    ShowdownRevealed {
        seat_id: SeatIdx,
        player: PlayerId,
        hole_cards: [Card; 2],
        ranking: Ranking,
        description: String,
    },
    #[serde(rename = "pot.awarded")]
    PotAwarded {
        pot_index: usize,
        winners: Vec<PlayerId>,
        amount: Chips,
    },
    #[serde(rename = "hand.ended")]
    HandEnded {
        winners: Vec<PlayerId>,
        total_pot: Chips,
    },
    #[serde(rename = "player.eliminated")]
    PlayerEliminated {
        seat_id: SeatIdx,
        player: PlayerId,
        final_chips: Chips,
    },
    #[serde(rename = "hand.cancelled")]
    HandCancelled { reason: String },
    #[serde(rename = "game.startFailed")]
    StartFailed {
        reason: StartFailureReason,
        details: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum StartFailureReason {
    NotEnoughPlayers,
    HandInProgress,
    TableClosed,
    MissingEntropySource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    HandStarted,
    RoundStarted,
    Prompt,
    PlayerAction,
    ActionRejected,
    PotUpdated,
    StreetDealt,
    ShowdownRevealed,
    PotAwarded,
    HandEnded,
    PlayerEliminated,
    HandCancelled,
    StartFailed,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::HandStarted { .. } => EventKind::HandStarted,
            Event::RoundStarted { .. } => EventKind::RoundStarted,
            Event::Prompt { .. } => EventKind::Prompt,
            Event::PlayerAction { .. } => EventKind::PlayerAction,
            Event::ActionRejected { .. } => EventKind::ActionRejected,
            Event::PotUpdated { .. } => EventKind::PotUpdated,
            Event::StreetDealt { .. } => EventKind::StreetDealt,
            Event::ShowdownRevealed { .. } => EventKind::ShowdownRevealed,
            Event::PotAwarded { .. } => EventKind::PotAwarded,
            Event::HandEnded { .. } => EventKind::HandEnded,
            Event::PlayerEliminated { .. } => EventKind::PlayerEliminated,
            Event::HandCancelled { .. } => EventKind::HandCancelled,
            Event::StartFailed { .. } => EventKind::StartFailed,
        }
    }
}

pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    kind: Option<EventKind>,
    handler: Box<dyn FnMut(&Event) + Send>,
}

/// Synchronous, ordered fan-out of [`Event`]s.
///
/// Handlers run on the emitting thread in registration order. A panicking
/// handler is caught and logged so one misbehaving listener cannot corrupt
/// the hand; it stays subscribed. Handlers may subscribe or unsubscribe
/// re-entrantly; such changes take effect from the next emission.
#[derive(Default)]
pub struct EventBus {
    subs: RefCell<Vec<Subscriber>>,
    pending_off: RefCell<Vec<SubscriberId>>,
    next_id: Cell<SubscriberId>,
    emitting: Cell<bool>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventBus({} subscribers)", self.subs.borrow().len())
    }
}

impl EventBus {
    /// Subscribe to one kind of event.
    pub fn on<F: FnMut(&Event) + Send + 'static>(&self, kind: EventKind, handler: F) -> SubscriberId {
        self.register(Some(kind), Box::new(handler))
    }

    /// Subscribe to the whole stream.
    pub fn on_any<F: FnMut(&Event) + Send + 'static>(&self, handler: F) -> SubscriberId {
        self.register(None, Box::new(handler))
    }

    /// Drop a subscription. During an emission the subscriber list is
    /// checked out of the bus, so removal is deferred until the fan-out
    /// completes; the handler still sees the current event.
    pub fn off(&self, id: SubscriberId) {
        if self.emitting.get() {
            self.pending_off.borrow_mut().push(id);
        } else {
            self.subs.borrow_mut().retain(|s| s.id != id);
        }
    }

    fn register(&self, kind: Option<EventKind>, handler: Box<dyn FnMut(&Event) + Send>) -> SubscriberId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subs.borrow_mut().push(Subscriber { id, kind, handler });
        id
    }

    pub(crate) fn emit(&self, event: Event) {
        log::trace!("event {:?}", event);
        // take the list out so handlers may re-enter on()/off(): additions
        // land in the fresh list, removals queue on pending_off, and both
        // merge once the fan-out is over
        self.emitting.set(true);
        let mut subs = self.subs.take();
        for sub in subs.iter_mut() {
            if sub.kind.is_some_and(|k| k != event.kind()) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| (sub.handler)(&event)));
            if outcome.is_err() {
                log::warn!(
                    "event subscriber {} panicked handling {:?}; continuing",
                    sub.id,
                    event.kind()
                );
            }
        }
        self.emitting.set(false);
        let added = self.subs.take();
        subs.extend(added);
        let dropped = self.pending_off.take();
        subs.retain(|s| !dropped.contains(&s.id));
        *self.subs.borrow_mut() = subs;
    }
}
