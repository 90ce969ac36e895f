use crate::agent::{ActionPrompt, Decision, HistoryEntry, PlayerAgent, PublicSeat};
use crate::bet::{BetAction, LastAction};
use crate::cards::{rank_hand, Card, Deck, DeckError, Ranking};
use crate::events::{Event, EventBus};
use crate::player::{SeatFilter, SeatStatus, Seats};
use crate::position::HandPositions;
use crate::pot::PotManager;
use crate::round::{BettingRound, RejectReason, Street};
use crate::{Chips, HandNo, PlayerId, SeatIdx};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

const STREETS: [Street; 4] = [Street::PreFlop, Street::Flop, Street::Turn, Street::River];

/// Lifecycle phases of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPhase {
    Idle,
    Dealing,
    Street(Street),
    Showdown,
    Payout,
}

/// Everything the controller borrows from the table while a hand runs. The
/// seats, agents, and bus are the table's; the controller owns the deck,
/// board, and pot for exactly one hand.
pub(crate) struct HandCtx<'a> {
    pub seats: &'a mut Seats,
    pub agents: &'a mut HashMap<PlayerId, Box<dyn PlayerAgent>>,
    pub bus: &'a EventBus,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub timeout_ms: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HandResult {
    Completed,
    Cancelled,
}

/// Runs one hand start to finish: posts blinds, deals, drives a betting
/// round per street, settles pots, evaluates the showdown, applies awards,
/// and emits the event stream in its contractual order.
pub(crate) struct HandController {
    hand_no: HandNo,
    positions: HandPositions,
    deck: Deck,
    community: Vec<Card>,
    pot: PotManager,
    history: Vec<HistoryEntry>,
    phase: HandPhase,
}

impl HandController {
    pub(crate) fn new(hand_no: HandNo, positions: HandPositions, deck: Deck) -> Self {
        Self {
            hand_no,
            positions,
            deck,
            community: Vec::with_capacity(5),
            pot: PotManager::default(),
            history: Vec::new(),
            phase: HandPhase::Idle,
        }
    }

    fn set_phase(&mut self, next: HandPhase) {
        log::trace!("hand {}: {:?} -> {:?}", self.hand_no, self.phase, next);
        self.phase = next;
    }

    pub(crate) fn run(mut self, ctx: &mut HandCtx) -> HandResult {
        match self.play(ctx) {
            Ok(()) => HandResult::Completed,
            Err(e) => {
                self.cancel(ctx, e);
                HandResult::Cancelled
            }
        }
    }

    fn play(&mut self, ctx: &mut HandCtx) -> Result<(), DeckError> {
        self.set_phase(HandPhase::Dealing);
        for (_, seat) in ctx.seats.iter_mut(SeatFilter::ELIGIBLE) {
            seat.status = SeatStatus::Active;
            seat.bet = 0;
            seat.total_committed = 0;
            seat.hole = None;
            seat.last_action = LastAction::None;
            seat.starting_stack = seat.chips;
        }
        let table_total = ctx.seats.total_chips();
        let players: Vec<PlayerId> = ctx
            .seats
            .iter(SeatFilter::IN_HAND)
            .map(|(_, s)| s.id)
            .collect();
        ctx.bus.emit(Event::HandStarted {
            hand_no: self.hand_no,
            button: self.positions.button,
            small_blind: self.positions.small_blind,
            big_blind: self.positions.big_blind,
            players,
        });

        self.post_blinds(ctx);
        self.deal_holes(ctx)?;

        let mut contested = true;
        'streets: for street in STREETS {
            self.set_phase(HandPhase::Street(street));
            match street {
                Street::PreFlop => {}
                Street::Flop => self.open_street(ctx, street, 3)?,
                Street::Turn | Street::River => self.open_street(ctx, street, 1)?,
            }
            if street == Street::PreFlop {
                ctx.bus.emit(Event::RoundStarted { street });
            }

            let stake = match street {
                Street::PreFlop => ctx.big_blind,
                _ => 0,
            };
            if !self.betting_possible(ctx.seats, stake) {
                continue;
            }
            let first = match street {
                Street::PreFlop => self.positions.first_to_act_preflop(ctx.seats),
                _ => self.positions.first_to_act_postflop(ctx.seats),
            };
            let Some(first) = first else {
                continue;
            };
            let mut round = match street {
                Street::PreFlop => BettingRound::preflop(ctx.big_blind, first),
                _ => BettingRound::postflop(street, ctx.big_blind, first),
            };
            while let Some(idx) = round.next_to_act(ctx.seats) {
                self.drive_one_decision(ctx, &mut round, idx);
                // a fold can end the hand outright; recheck before scanning
                // for the next actor
                if ctx.seats.count(SeatFilter::IN_HAND) == 1 {
                    contested = false;
                    break 'streets;
                }
            }
        }

        self.payout(ctx, contested, table_total);
        Ok(())
    }

    fn post_blinds(&mut self, ctx: &mut HandCtx) {
        if let Some(sb_idx) = self.positions.small_blind {
            let small_blind = ctx.small_blind;
            let seat = ctx.seats.get_mut(sb_idx).expect("sb seat occupied");
            let posted = seat.commit(small_blind);
            let id = seat.id;
            let all_in = seat.status == SeatStatus::AllIn;
            if posted < small_blind {
                log::trace!("seat {} posts short small blind {}", sb_idx, posted);
            }
            self.pot.contribute(sb_idx, id, posted, all_in);
        }
        let big_blind = ctx.big_blind;
        let bb_idx = self.positions.big_blind;
        let seat = ctx.seats.get_mut(bb_idx).expect("bb seat occupied");
        let posted = seat.commit(big_blind);
        let id = seat.id;
        let all_in = seat.status == SeatStatus::AllIn;
        self.pot.contribute(bb_idx, id, posted, all_in);
        self.emit_pot(ctx);
    }

    /// One card to each seat in the hand starting left of the button, then a
    /// second in the same order.
    fn deal_holes(&mut self, ctx: &mut HandCtx) -> Result<(), DeckError> {
        let order = ctx.seats.iter_after(self.positions.button, SeatFilter::IN_HAND);
        let mut firsts: BTreeMap<SeatIdx, Card> = BTreeMap::new();
        for &idx in &order {
            firsts.insert(idx, self.deck.draw()?);
        }
        for &idx in &order {
            let second = self.deck.draw()?;
            let first = firsts[&idx];
            ctx.seats.get_mut(idx).expect("dealt seat occupied").hole = Some([first, second]);
        }
        Ok(())
    }

    /// Settle the finished street, reset street bets, and burn-and-deal the
    /// next community cards.
    fn open_street(&mut self, ctx: &mut HandCtx, street: Street, n: usize) -> Result<(), DeckError> {
        for (_, seat) in ctx.seats.iter_mut(SeatFilter::ALL) {
            seat.bet = 0;
        }
        self.pot.settle_street();
        self.deck.burn()?;
        let mut dealt = Vec::with_capacity(n);
        for _ in 0..n {
            dealt.push(self.deck.draw()?);
        }
        self.community.extend_from_slice(&dealt);
        log::trace!("{}: {:?}", street, dealt);
        ctx.bus.emit(Event::RoundStarted { street });
        ctx.bus.emit(Event::StreetDealt {
            street,
            cards: dealt,
        });
        Ok(())
    }

    /// Whether this street needs any prompts at all. With at most one seat
    /// able to act and nothing left to call, the hand just runs out.
    fn betting_possible(&self, seats: &Seats, stake: Chips) -> bool {
        let may_act = seats.count(SeatFilter::MAY_ACT);
        if may_act >= 2 {
            return true;
        }
        may_act == 1
            && seats
                .iter(SeatFilter::MAY_ACT)
                .any(|(_, s)| s.bet < stake)
    }

    fn drive_one_decision(&mut self, ctx: &mut HandCtx, round: &mut BettingRound, idx: SeatIdx) {
        let constraints = round.constraints(ctx.seats, idx);
        let street = round.street();
        let player = ctx.seats.get(idx).expect("acting seat occupied").id;
        let prompt = self.build_prompt(ctx, street, idx, &constraints);
        ctx.bus.emit(Event::Prompt {
            seat_id: idx,
            player,
            to_call: constraints.to_call,
            min_raise: constraints.min_raise_to,
            max_raise: constraints.max_raise_to,
            legal: constraints.valid.clone(),
            timeout_ms: prompt.timeout_ms,
        });

        let action = match Self::ask_agent(ctx, &prompt).and_then(|d| constraints.admit(&d)) {
            Ok(action) => action,
            Err(reason) => {
                log::warn!(
                    "seat {} decision rejected ({}); substituting default",
                    idx,
                    reason
                );
                ctx.bus.emit(Event::ActionRejected {
                    seat_id: idx,
                    player,
                    reason,
                });
                constraints.default_action()
            }
        };

        let committed_before = ctx.seats.get(idx).expect("seat").total_committed;
        let applied = round.apply(ctx.seats, idx, action);
        let seat = ctx.seats.get(idx).expect("seat");
        match applied {
            BetAction::Fold => self.pot.fold(idx),
            BetAction::Check => {}
            _ => {
                let delta = seat.total_committed - committed_before;
                self.pot
                    .contribute(idx, player, delta, seat.status == SeatStatus::AllIn);
            }
        }
        log::trace!("seat {} {} on {}", idx, applied, street);
        self.history.push(HistoryEntry {
            street,
            seat: idx,
            player,
            action: applied,
        });
        ctx.bus.emit(Event::PlayerAction {
            seat_id: idx,
            player,
            action: applied,
        });
        self.emit_pot(ctx);
    }

    /// The only suspension point: hand the prompt to the agent. A panic or
    /// an over-deadline answer becomes a substituted default action.
    fn ask_agent(ctx: &mut HandCtx, prompt: &ActionPrompt) -> Result<Decision, RejectReason> {
        let agent = ctx
            .agents
            .get_mut(&prompt.player)
            .ok_or(RejectReason::AgentFailure)?;
        let begun = Instant::now();
        let decision = catch_unwind(AssertUnwindSafe(|| agent.decide(prompt)))
            .map_err(|_| RejectReason::AgentFailure)?;
        if prompt.timeout_ms > 0 && begun.elapsed().as_millis() > prompt.timeout_ms as u128 {
            return Err(RejectReason::Timeout);
        }
        Ok(decision)
    }

    fn build_prompt(
        &self,
        ctx: &HandCtx,
        street: Street,
        idx: SeatIdx,
        constraints: &crate::round::ActionConstraints,
    ) -> ActionPrompt {
        let me = ctx.seats.get(idx).expect("acting seat occupied");
        let seats = ctx
            .seats
            .iter(SeatFilter::ALL)
            .map(|(i, s)| PublicSeat {
                seat: i,
                player: s.id,
                chips: s.chips,
                bet: s.bet,
                total_committed: s.total_committed,
                status: s.status,
                last_action: s.last_action,
            })
            .collect();
        ActionPrompt {
            hand_no: self.hand_no,
            street,
            seat: idx,
            player: me.id,
            hole_cards: me.hole.expect("acting seat was dealt in"),
            community: self.community.clone(),
            pot: self.pot.total(),
            current_bet: constraints.current_bet,
            to_call: constraints.to_call,
            min_raise: constraints.min_raise_to,
            max_raise: constraints.max_raise_to,
            valid_actions: constraints.valid.clone(),
            seats,
            betting_history: self.history.clone(),
            timeout_ms: ctx.timeout_ms,
        }
    }

    fn emit_pot(&self, ctx: &HandCtx) {
        let dead = self.pot.dead_money();
        ctx.bus.emit(Event::PotUpdated {
            total: self.pot.total(),
            dead_money: (dead > 0).then_some(dead),
        });
    }

    /// Settle, evaluate, pay, and report, in the contractual order:
    /// `pot.awarded`* then `hand.ended` then `player.eliminated`*.
    fn payout(&mut self, ctx: &mut HandCtx, contested: bool, table_total: Chips) {
        for (_, seat) in ctx.seats.iter_mut(SeatFilter::ALL) {
            seat.bet = 0;
        }
        let gross_pot = self.pot.total();
        let order = ctx
            .seats
            .iter_after(self.positions.button, SeatFilter::ALL);

        let mut refunded = 0;
        let mut rankings: BTreeMap<SeatIdx, Ranking> = BTreeMap::new();
        if contested {
            self.set_phase(HandPhase::Showdown);
            // an uncalled tail of the biggest stack's bet goes back before
            // the pots are built, so it can never be won by anyone else
            if let Some((idx, _, excess)) = self.pot.refund_uncalled() {
                let seat = ctx.seats.get_mut(idx).expect("refund seat occupied");
                seat.chips += excess;
                seat.total_committed -= excess;
                refunded = excess;
                log::debug!("returned uncalled {} to seat {}", excess, idx);
            }
            self.pot.settle_street();
            for &idx in &order {
                let seat = ctx.seats.get(idx).expect("seat");
                if !seat.in_hand() {
                    continue;
                }
                let hole = seat.hole.expect("showdown seat has cards");
                let ranking = rank_hand(hole, &self.community)
                    .expect("full board at showdown");
                ctx.bus.emit(Event::ShowdownRevealed {
                    seat_id: idx,
                    player: seat.id,
                    hole_cards: hole,
                    ranking: ranking.clone(),
                    description: ranking.describe(),
                });
                rankings.insert(idx, ranking);
            }
        } else {
            self.pot.settle_street();
        }

        self.set_phase(HandPhase::Payout);
        let awards = self.pot.award(&rankings, &order);
        let paid: Chips = awards.iter().map(|a| a.amount).sum();
        assert_eq!(
            paid + refunded,
            gross_pot,
            "awards plus refunds must equal the chips committed"
        );
        for award in &awards {
            let seat = ctx.seats.get_mut(award.seat).expect("award seat occupied");
            seat.chips += award.amount;
        }
        let final_stacks: Chips = ctx.seats.iter(SeatFilter::ALL).map(|(_, s)| s.chips).sum();
        assert_eq!(
            final_stacks, table_total,
            "table chip total changed across the hand"
        );

        for (pot_index, pot) in self.pot.pots().iter().enumerate() {
            let winners: Vec<PlayerId> = awards
                .iter()
                .filter(|a| a.pot_index == pot_index)
                .map(|a| a.player)
                .collect();
            ctx.bus.emit(Event::PotAwarded {
                pot_index,
                winners,
                amount: pot.amount,
            });
        }
        let mut winners: Vec<PlayerId> = Vec::new();
        for award in &awards {
            if award.amount > 0 && !winners.contains(&award.player) {
                winners.push(award.player);
            }
        }
        ctx.bus.emit(Event::HandEnded {
            winners,
            total_pot: gross_pot,
        });

        self.eliminate_busted(ctx, &order);

        for (_, seat) in ctx.seats.iter_mut(SeatFilter::ALL) {
            if matches!(
                seat.status,
                SeatStatus::Active | SeatStatus::AllIn | SeatStatus::Folded
            ) {
                seat.status = SeatStatus::Waiting;
            }
            seat.hole = None;
            seat.bet = 0;
            seat.total_committed = 0;
        }
        self.set_phase(HandPhase::Idle);
    }

    /// Emit eliminations for every participant left with zero chips, in
    /// ascending order of starting stack (ties by seat order left of the
    /// button). This is the tournament finishing order.
    fn eliminate_busted(&self, ctx: &mut HandCtx, order: &[SeatIdx]) {
        let mut busted: Vec<(Chips, usize, SeatIdx, PlayerId)> = ctx
            .seats
            .iter(SeatFilter::ALL)
            .filter(|(_, s)| {
                s.chips == 0
                    && matches!(
                        s.status,
                        SeatStatus::Active | SeatStatus::AllIn | SeatStatus::Folded
                    )
            })
            .map(|(idx, s)| {
                let pos = order.iter().position(|o| *o == idx).unwrap_or(usize::MAX);
                (s.starting_stack, pos, idx, s.id)
            })
            .collect();
        busted.sort_unstable();
        for (_, _, idx, player) in busted {
            ctx.seats.get_mut(idx).expect("busted seat occupied").status = SeatStatus::Eliminated;
            ctx.bus.emit(Event::PlayerEliminated {
                seat_id: idx,
                player,
                final_chips: 0,
            });
        }
    }

    /// Deck exhaustion mid-hand (a misused injected deck) aborts the hand:
    /// commitments return to their seats so conservation survives, and a
    /// terminal cancellation event is the only thing observers see.
    fn cancel(&mut self, ctx: &mut HandCtx, err: DeckError) {
        log::warn!("hand {} cancelled: {}", self.hand_no, err);
        for (_, seat) in ctx.seats.iter_mut(SeatFilter::ALL) {
            seat.chips += seat.total_committed;
            seat.total_committed = 0;
            seat.bet = 0;
            seat.hole = None;
            if matches!(
                seat.status,
                SeatStatus::Active | SeatStatus::AllIn | SeatStatus::Folded
            ) {
                seat.status = SeatStatus::Waiting;
            }
        }
        ctx.bus.emit(Event::HandCancelled {
            reason: err.to_string(),
        });
        self.set_phase(HandPhase::Idle);
    }
}
