use crate::cards::Ranking;
use crate::{Chips, PlayerId, SeatIdx};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pool of chips and the seats allowed to win it. Pot 0 is the main
/// pot; each later pot is a side pot with strictly narrower eligibility.
/// Eligibility is fixed when the pot is built and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: Vec<SeatIdx>,
    /// The per-seat commitment level this pot covers up to.
    pub level: Chips,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    player: PlayerId,
    total: Chips,
    all_in: bool,
    folded: bool,
}

/// Why an award was paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AwardReason {
    BestHand(Ranking),
    /// Sole non-folded seat eligible for the pot; paid without ranking.
    Uncontested,
}

impl std::fmt::Display for AwardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AwardReason::BestHand(r) => write!(f, "{}", r.describe()),
            AwardReason::Uncontested => write!(f, "Won by fold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub seat: SeatIdx,
    pub player: PlayerId,
    pub pot_index: usize,
    pub amount: Chips,
    pub reason: AwardReason,
}

/// Tracks every seat's hand-long commitment and turns it into a correct
/// main/side pot structure.
///
/// Contributions accumulate as bets land; after each street (and before
/// awarding) [`PotManager::settle_street`] rebuilds the pot list from the
/// commitment levels. Folded seats' chips stay in the pots they helped
/// build but the seats are never eligible; a short all-in seat is eligible
/// for every pot at or below its commitment level.
#[derive(Debug, Default, Clone)]
pub struct PotManager {
    entries: BTreeMap<SeatIdx, Entry>,
    pots: Vec<Pot>,
}

impl PotManager {
    pub fn contribute(&mut self, seat: SeatIdx, player: PlayerId, amount: Chips, all_in: bool) {
        debug_assert!(amount >= 0);
        let e = self.entries.entry(seat).or_insert(Entry {
            player,
            total: 0,
            all_in: false,
            folded: false,
        });
        e.total += amount;
        e.all_in |= all_in;
    }

    pub fn fold(&mut self, seat: SeatIdx) {
        if let Some(e) = self.entries.get_mut(&seat) {
            e.folded = true;
        }
    }

    /// Everything committed this hand, settled or not.
    pub fn total(&self) -> Chips {
        self.entries.values().map(|e| e.total).sum()
    }

    /// Chips in the pot whose owners have folded.
    pub fn dead_money(&self) -> Chips {
        self.entries
            .values()
            .filter(|e| e.folded)
            .map(|e| e.total)
            .sum()
    }

    pub fn pots(&self) -> &[Pot] {
        &self.pots
    }

    /// Rebuild the pot structure from current commitments.
    ///
    /// Levels are the distinct commitment totals of the seats still in the
    /// hand (an all-in seat's total is its cap). Each level's pot collects
    /// every seat's chips between the previous level and this one, folded
    /// seats included; eligibility is the non-folded seats at or above the
    /// level.
    pub fn settle_street(&mut self) {
        let mut levels: Vec<Chips> = self
            .entries
            .values()
            .filter(|e| !e.folded && e.total > 0)
            .map(|e| e.total)
            .collect();
        levels.sort_unstable();
        levels.dedup();

        let mut pots = Vec::with_capacity(levels.len());
        let mut prev = 0;
        for &level in &levels {
            let amount = self
                .entries
                .values()
                .map(|e| e.total.min(level) - e.total.min(prev))
                .sum();
            let eligible = self
                .entries
                .iter()
                .filter(|(_, e)| !e.folded && e.total >= level)
                .map(|(&i, _)| i)
                .collect();
            pots.push(Pot {
                amount,
                eligible,
                level,
            });
            prev = level;
        }
        // a folded seat can only out-commit every live seat through deck or
        // caller misuse; sweep any such residue into the last pot rather
        // than leak it
        let banked: Chips = pots.iter().map(|p| p.amount).sum();
        let residue = self.total() - banked;
        if residue > 0 {
            if let Some(last) = pots.last_mut() {
                last.amount += residue;
            }
        }
        log::debug!("settled {} pot(s), {} chips", pots.len(), self.total());
        self.pots = pots;
    }

    /// Return the uncalled tail of the highest commitment to its seat, if
    /// any. Applied before showdown pots are built so the excess never
    /// reaches an award. Fold-through wins skip this and sweep whole pots.
    pub fn refund_uncalled(&mut self) -> Option<(SeatIdx, PlayerId, Chips)> {
        let (&top_seat, top) = self
            .entries
            .iter()
            .filter(|(_, e)| !e.folded)
            .max_by_key(|(_, e)| e.total)?;
        let top_total = top.total;
        let player = top.player;
        let matched = self
            .entries
            .iter()
            .filter(|(&i, _)| i != top_seat)
            .map(|(_, e)| e.total)
            .max()
            .unwrap_or(0);
        let excess = top_total - matched;
        if excess > 0 {
            self.entries.get_mut(&top_seat).expect("entry exists").total -= excess;
            Some((top_seat, player, excess))
        } else {
            None
        }
    }

    /// Pay out every pot. `rankings` maps the non-folded seats to their
    /// showdown rankings (absent for fold-through wins); `order` lists seats
    /// starting left of the button, which settles odd chips. The total paid
    /// must equal the total committed, and the engine refuses to continue
    /// otherwise.
    pub fn award(
        &self,
        rankings: &BTreeMap<SeatIdx, Ranking>,
        order: &[SeatIdx],
    ) -> Vec<Award> {
        let mut awards = Vec::new();
        for (pot_index, pot) in self.pots.iter().enumerate() {
            let eligible: Vec<SeatIdx> = pot
                .eligible
                .iter()
                .copied()
                .filter(|i| !self.entries[i].folded)
                .collect();
            match eligible.as_slice() {
                [] => unreachable!("pot built without eligible seats"),
                [lone] => awards.push(Award {
                    seat: *lone,
                    player: self.entries[lone].player,
                    pot_index,
                    amount: pot.amount,
                    reason: AwardReason::Uncontested,
                }),
                _ => {
                    let best = eligible
                        .iter()
                        .map(|i| &rankings[i])
                        .max()
                        .expect("eligible seats have rankings");
                    let mut winners: Vec<SeatIdx> = eligible
                        .iter()
                        .copied()
                        .filter(|i| &rankings[i] == best)
                        .collect();
                    // odd chips go to the earliest winner left of the button
                    winners.sort_by_key(|i| order.iter().position(|o| o == i));
                    let shares = split_x_by_y(pot.amount, winners.len() as Chips);
                    for (seat, share) in winners.into_iter().zip(shares) {
                        awards.push(Award {
                            seat,
                            player: self.entries[&seat].player,
                            pot_index,
                            amount: share,
                            reason: AwardReason::BestHand(rankings[&seat].clone()),
                        });
                    }
                }
            }
        }
        let paid: Chips = awards.iter().map(|a| a.amount).sum();
        assert_eq!(
            paid,
            self.total(),
            "chips out of the pots must equal chips in"
        );
        awards
    }
}

/// Divide `x` as evenly as possible `y` ways using only integers, largest
/// shares first. x=5, y=3 gives [2, 2, 1].
fn split_x_by_y(x: Chips, y: Chips) -> Vec<Chips> {
    assert!(x.is_positive());
    assert!(y.is_positive());
    let mut ret = Vec::with_capacity(y as usize);
    let mut frac_accum = 0;
    for i in 0..y {
        frac_accum += x % y;
        if frac_accum >= y || i == y - 1 && frac_accum > 0 {
            ret.push((x / y) + 1);
        } else {
            ret.push(x / y);
        }
        if frac_accum >= y {
            frac_accum -= y;
        }
    }
    ret.sort_unstable();
    ret.reverse();
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{cards_from_str, rank_hand};

    fn ranked(pairs: &[(SeatIdx, &str)], community: &str) -> BTreeMap<SeatIdx, Ranking> {
        let community = cards_from_str(community).unwrap();
        pairs
            .iter()
            .map(|(seat, hole)| {
                let h = cards_from_str(hole).unwrap();
                (*seat, rank_hand([h[0], h[1]], &community).unwrap())
            })
            .collect()
    }

    #[test]
    fn single_winner_takes_all() {
        let mut p = PotManager::default();
        for seat in 0..3 {
            p.contribute(seat, seat as PlayerId, 5, false);
        }
        p.settle_street();
        assert_eq!(p.pots().len(), 1);
        assert_eq!(p.pots()[0].amount, 15);
        // seat 0 holds the nuts
        let rankings = ranked(
            &[(0, "AsAd"), (1, "KsKd"), (2, "QsQd")],
            "Ah7c8d2s3h",
        );
        let awards = p.award(&rankings, &[1, 2, 0]);
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].seat, 0);
        assert_eq!(awards[0].amount, 15);
    }

    #[test]
    fn tie_splits_with_odd_chip_left_of_button() {
        // S3 shape: three seats in for 25 each, seats 0 and 2 tie with aces
        let mut p = PotManager::default();
        for seat in 0..3 {
            p.contribute(seat, seat as PlayerId, 25, false);
        }
        p.settle_street();
        let rankings = ranked(
            &[(0, "AsAh"), (1, "8c7d"), (2, "AcAd")],
            "KcQdJh9s2c",
        );
        // button at seat 1: position order starting left of it is [2, 0, 1]
        let awards = p.award(&rankings, &[2, 0, 1]);
        assert_eq!(awards.len(), 2);
        let by_seat: BTreeMap<SeatIdx, Chips> =
            awards.iter().map(|a| (a.seat, a.amount)).collect();
        assert_eq!(by_seat[&2], 38, "seat closest left of button gets the odd chip");
        assert_eq!(by_seat[&0], 37);
    }

    #[test]
    fn all_in_cascade_builds_side_pots() {
        // S4: stacks 100 / 300 / 1000, all in preflop, C called 300
        let mut p = PotManager::default();
        p.contribute(0, 0, 100, true);
        p.contribute(1, 1, 300, true);
        p.contribute(2, 2, 300, false);
        p.settle_street();
        assert_eq!(p.pots().len(), 2);
        assert_eq!(p.pots()[0].amount, 300);
        assert_eq!(p.pots()[0].eligible, vec![0, 1, 2]);
        assert_eq!(p.pots()[1].amount, 400);
        assert_eq!(p.pots()[1].eligible, vec![1, 2]);

        let rankings = ranked(
            &[(0, "AsAh"), (1, "KsKh"), (2, "QsQh")],
            "2c5d8h9sJc",
        );
        let awards = p.award(&rankings, &[1, 2, 0]);
        let by_seat: BTreeMap<SeatIdx, Chips> =
            awards.iter().map(|a| (a.seat, a.amount)).collect();
        assert_eq!(by_seat[&0], 300);
        assert_eq!(by_seat[&1], 400);
        assert_eq!(by_seat.get(&2), None);
    }

    #[test]
    fn overshove_refunds_before_award() {
        // as above but C shoved the full 1000: 700 was never called
        let mut p = PotManager::default();
        p.contribute(0, 0, 100, true);
        p.contribute(1, 1, 300, true);
        p.contribute(2, 2, 1000, true);
        let refund = p.refund_uncalled().unwrap();
        assert_eq!(refund, (2, 2, 700));
        p.settle_street();
        assert_eq!(p.total(), 700);
        let rankings = ranked(
            &[(0, "AsAh"), (1, "KsKh"), (2, "QsQh")],
            "2c5d8h9sJc",
        );
        let awards = p.award(&rankings, &[1, 2, 0]);
        let by_seat: BTreeMap<SeatIdx, Chips> =
            awards.iter().map(|a| (a.seat, a.amount)).collect();
        assert_eq!(by_seat[&0], 300);
        assert_eq!(by_seat[&1], 400);
        assert_eq!(by_seat.get(&2), None);
    }

    #[test]
    fn no_refund_when_top_bet_was_called() {
        let mut p = PotManager::default();
        p.contribute(0, 0, 50, false);
        p.contribute(1, 1, 50, false);
        assert_eq!(p.refund_uncalled(), None);
    }

    #[test]
    fn folded_chips_feed_pots_but_never_win() {
        // seat 1 folds after committing 60 across two streets
        let mut p = PotManager::default();
        p.contribute(0, 0, 100, false);
        p.contribute(1, 1, 60, false);
        p.contribute(2, 2, 100, false);
        p.fold(1);
        p.settle_street();
        assert_eq!(p.pots().len(), 1);
        assert_eq!(p.pots()[0].amount, 260);
        assert_eq!(p.pots()[0].eligible, vec![0, 2]);
        assert_eq!(p.dead_money(), 60);
    }

    /// A short stack that goes all-in is eligible for the main pot it
    /// helped build, even against much larger stacks.
    #[test]
    fn short_all_in_stays_eligible_for_main_pot() {
        let mut p = PotManager::default();
        p.contribute(0, 0, 25, true);
        p.contribute(1, 1, 200, false);
        p.contribute(2, 2, 200, false);
        p.settle_street();
        assert_eq!(p.pots()[0].eligible, vec![0, 1, 2]);
        assert_eq!(p.pots()[0].amount, 75);
        // and the short stack winning collects exactly the main pot
        let rankings = ranked(
            &[(0, "AsAh"), (1, "KsKh"), (2, "2c3d")],
            "4c5d8h9sJc",
        );
        let awards = p.award(&rankings, &[0, 1, 2]);
        let by_seat: BTreeMap<SeatIdx, Chips> =
            awards.iter().map(|a| (a.seat, a.amount)).collect();
        assert_eq!(by_seat[&0], 75);
        assert_eq!(by_seat[&1], 350);
    }

    #[test]
    fn ascending_all_ins_make_one_pot_per_level() {
        let mut p = PotManager::default();
        p.contribute(0, 0, 5, true);
        p.contribute(1, 1, 15, true);
        p.contribute(2, 2, 45, true);
        // nothing above 15 was matched by seat 1, nothing above 5 by seat 0;
        // seat 2's tail refunds
        assert_eq!(p.refund_uncalled(), Some((2, 2, 30)));
        p.settle_street();
        let pots = p.pots();
        assert_eq!(pots.len(), 2);
        assert_eq!((pots[0].amount, pots[0].eligible.len()), (15, 3));
        assert_eq!((pots[1].amount, pots[1].eligible.len()), (20, 2));
    }

    #[test]
    fn accumulates_across_streets() {
        let mut p = PotManager::default();
        for seat in 0..3 {
            p.contribute(seat, seat as PlayerId, 15, false);
        }
        p.settle_street();
        p.contribute(0, 0, 50, false);
        p.contribute(1, 1, 50, true);
        p.contribute(2, 2, 50, false);
        p.settle_street();
        assert_eq!(p.total(), 195);
        assert_eq!(p.pots().len(), 1, "equal levels merge into one pot");
        assert_eq!(p.pots()[0].amount, 195);
    }

    #[test]
    #[should_panic(expected = "chips out of the pots")]
    fn award_without_settle_fails_loud() {
        let mut p = PotManager::default();
        p.contribute(0, 0, 10, false);
        p.contribute(1, 1, 10, false);
        // settle_street deliberately skipped: pots are stale/empty
        let rankings = ranked(&[(0, "AsAh"), (1, "KsKh")], "2c5d8h9sJc");
        p.award(&rankings, &[0, 1]);
    }

    #[test]
    fn split_shares() {
        assert_eq!(split_x_by_y(5, 3), vec![2, 2, 1]);
        assert_eq!(split_x_by_y(6, 2), vec![3, 3]);
        assert_eq!(split_x_by_y(8, 5), vec![2, 2, 2, 1, 1]);
        assert_eq!(split_x_by_y(75, 2), vec![38, 37]);
    }
}
