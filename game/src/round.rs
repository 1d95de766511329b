use serde::{Deserialize, Serialize};

use crate::chest::ChestId;
use crate::reward::{Reward, RewardKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    AwaitingStart,
    /// Accepting picks.
    Active,
    /// One chest is mid-reveal; every other pick is refused.
    Revealing(ChestId),
    BonusInterrupt,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Ignored,
    Continue { total: u64 },
    BonusTriggered { value: u32, total: u64 },
    Complete { total: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusResolution {
    Resume { total: u64 },
    Complete { total: u64 },
}

/// Phase and tally of one round. Pure state: every call either transitions or
/// reports that it was ignored, and the caller drives the presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    phase: RoundPhase,
    chest_count: usize,
    opened: usize,
    total: u64,
    pending_bonus: Option<u32>,
}

impl Round {
    pub fn new(chest_count: usize) -> Self {
        Self {
            phase: RoundPhase::AwaitingStart,
            chest_count,
            opened: 0,
            total: 0,
            pending_bonus: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn chest_count(&self) -> usize {
        self.chest_count
    }

    pub fn opened(&self) -> usize {
        self.opened
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn bonus_pending(&self) -> bool {
        self.pending_bonus.is_some()
    }

    pub fn pending_bonus(&self) -> Option<u32> {
        self.pending_bonus
    }

    pub fn accepts_picks(&self) -> bool {
        self.phase == RoundPhase::Active
    }

    pub fn start(&mut self) -> bool {
        if self.phase != RoundPhase::AwaitingStart {
            return false;
        }
        self.phase = RoundPhase::Active;
        true
    }

    pub fn begin_reveal(&mut self, chest: ChestId) -> bool {
        if !self.accepts_picks() {
            return false;
        }
        self.phase = RoundPhase::Revealing(chest);
        true
    }

    pub fn record_reveal(&mut self, chest: ChestId, reward: Reward) -> RevealOutcome {
        if self.phase != RoundPhase::Revealing(chest) {
            return RevealOutcome::Ignored;
        }
        self.opened += 1;
        self.total += u64::from(reward.payout());

        if reward.kind() == RewardKind::Bonus {
            self.phase = RoundPhase::BonusInterrupt;
            self.pending_bonus = Some(reward.value());
            return RevealOutcome::BonusTriggered {
                value: reward.value(),
                total: self.total,
            };
        }
        if self.is_exhausted() {
            self.phase = RoundPhase::Complete;
            return RevealOutcome::Complete { total: self.total };
        }
        self.phase = RoundPhase::Active;
        RevealOutcome::Continue { total: self.total }
    }

    pub fn resolve_bonus(&mut self) -> Option<BonusResolution> {
        if self.phase != RoundPhase::BonusInterrupt {
            return None;
        }
        self.pending_bonus = None;
        if self.is_exhausted() {
            self.phase = RoundPhase::Complete;
            Some(BonusResolution::Complete { total: self.total })
        } else {
            self.phase = RoundPhase::Active;
            Some(BonusResolution::Resume { total: self.total })
        }
    }

    pub fn reset(&mut self) -> bool {
        if self.phase != RoundPhase::Complete {
            return false;
        }
        self.abort();
        true
    }

    /// Back to `AwaitingStart` from any phase.
    pub fn abort(&mut self) {
        *self = Self::new(self.chest_count);
    }

    fn is_exhausted(&self) -> bool {
        self.opened >= self.chest_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(chests: usize) -> Round {
        let mut round = Round::new(chests);
        assert!(round.start());
        round
    }

    #[test]
    fn new_round_awaits_start() {
        let round = Round::new(6);
        assert_eq!(round.phase(), RoundPhase::AwaitingStart);
        assert!(!round.accepts_picks());
    }

    #[test]
    fn start_only_from_awaiting_start() {
        let mut round = active(6);
        assert!(!round.start());
        assert_eq!(round.phase(), RoundPhase::Active);
    }

    #[test]
    fn second_pick_is_refused_while_revealing() {
        let mut round = active(6);
        assert!(round.begin_reveal(ChestId(0)));
        assert!(!round.begin_reveal(ChestId(1)));
        assert_eq!(round.phase(), RoundPhase::Revealing(ChestId(0)));
    }

    #[test]
    fn reveal_for_other_chest_is_ignored() {
        let mut round = active(6);
        round.begin_reveal(ChestId(0));
        assert_eq!(
            round.record_reveal(ChestId(1), Reward::win(70)),
            RevealOutcome::Ignored
        );
        assert_eq!(round.opened(), 0);
        assert_eq!(round.total(), 0);
    }

    #[test]
    fn win_adds_value_and_resumes() {
        let mut round = active(6);
        round.begin_reveal(ChestId(2));
        assert_eq!(
            round.record_reveal(ChestId(2), Reward::win(70)),
            RevealOutcome::Continue { total: 70 }
        );
        assert_eq!(round.phase(), RoundPhase::Active);
        assert_eq!(round.opened(), 1);
    }

    #[test]
    fn lose_never_adds_to_total() {
        let lose: Reward =
            serde_json::from_str(r#"{"kind":"Lose","value":40}"#).expect("deserialize reward");
        let mut round = active(6);
        round.begin_reveal(ChestId(0));
        assert_eq!(
            round.record_reveal(ChestId(0), lose),
            RevealOutcome::Continue { total: 0 }
        );
        assert_eq!(round.opened(), 1);
    }

    #[test]
    fn bonus_on_last_chest_defers_completion() {
        let mut round = active(1);
        round.begin_reveal(ChestId(0));
        assert_eq!(
            round.record_reveal(ChestId(0), Reward::bonus(800)),
            RevealOutcome::BonusTriggered {
                value: 800,
                total: 800
            }
        );
        assert_eq!(round.phase(), RoundPhase::BonusInterrupt);
        assert!(round.bonus_pending());
        assert!(!round.begin_reveal(ChestId(0)));

        assert_eq!(
            round.resolve_bonus(),
            Some(BonusResolution::Complete { total: 800 })
        );
        assert!(!round.bonus_pending());
        assert_eq!(round.resolve_bonus(), None);
    }

    #[test]
    fn bonus_mid_round_resumes() {
        let mut round = active(3);
        round.begin_reveal(ChestId(0));
        round.record_reveal(ChestId(0), Reward::bonus(600));
        assert_eq!(
            round.resolve_bonus(),
            Some(BonusResolution::Resume { total: 600 })
        );
        assert!(round.accepts_picks());
    }

    #[test]
    fn reset_only_from_complete() {
        let mut round = active(1);
        assert!(!round.reset());
        round.begin_reveal(ChestId(0));
        round.record_reveal(ChestId(0), Reward::win(55));
        assert_eq!(round.phase(), RoundPhase::Complete);
        assert!(round.reset());
        assert_eq!(round, Round::new(1));
    }

    #[test]
    fn abort_clears_from_any_phase() {
        let mut round = active(2);
        round.begin_reveal(ChestId(1));
        round.record_reveal(ChestId(1), Reward::bonus(900));
        round.abort();
        assert_eq!(round, Round::new(2));
    }
}
