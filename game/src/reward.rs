use std::collections::VecDeque;
use std::ops::Range;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Cumulative roll thresholds: `[0, 0.6)` lose, `[0.6, 0.9)` win, `[0.9, 1)` bonus.
pub const LOSE_THRESHOLD: f64 = 0.6;
pub const WIN_THRESHOLD: f64 = 0.9;

pub const WIN_VALUES: Range<u32> = 50..100;
pub const BONUS_VALUES: Range<u32> = 500..1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardKind {
    Lose,
    Win,
    Bonus,
}

impl RewardKind {
    /// Maps one uniform draw in `[0, 1)` onto a kind.
    pub fn from_draw(draw: f64) -> Self {
        if draw < LOSE_THRESHOLD {
            RewardKind::Lose
        } else if draw < WIN_THRESHOLD {
            RewardKind::Win
        } else {
            RewardKind::Bonus
        }
    }

    pub fn value_range(self) -> Option<Range<u32>> {
        match self {
            RewardKind::Lose => None,
            RewardKind::Win => Some(WIN_VALUES),
            RewardKind::Bonus => Some(BONUS_VALUES),
        }
    }
}

/// A resolved chest outcome. Built through [`Reward::LOSE`], [`Reward::win`]
/// and [`Reward::bonus`]; deserialized values go through [`Reward::normalized`]
/// before they reach a chest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reward {
    kind: RewardKind,
    value: u32,
}

impl Reward {
    pub const LOSE: Reward = Reward {
        kind: RewardKind::Lose,
        value: 0,
    };

    pub fn win(value: u32) -> Self {
        Self {
            kind: RewardKind::Win,
            value,
        }
    }

    pub fn bonus(value: u32) -> Self {
        Self {
            kind: RewardKind::Bonus,
            value,
        }
    }

    pub fn kind(&self) -> RewardKind {
        self.kind
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_bonus(&self) -> bool {
        self.kind == RewardKind::Bonus
    }

    /// What the reward adds to a round total. A `Lose` is worth nothing.
    pub fn payout(&self) -> u32 {
        match self.kind {
            RewardKind::Lose => 0,
            RewardKind::Win | RewardKind::Bonus => self.value,
        }
    }

    /// Drops any value carried by a `Lose`.
    pub fn normalized(self) -> Self {
        match self.kind {
            RewardKind::Lose => Self::LOSE,
            RewardKind::Win | RewardKind::Bonus => self,
        }
    }
}

/// Source of chest outcomes. Injected so rounds can be replayed deterministically.
pub trait RewardRoller {
    fn roll(&mut self) -> Reward;
}

/// Fixed-odds roller: one draw picks the kind, an independent draw picks the value.
#[derive(Debug, Clone)]
pub struct RandomRolls<R = StdRng> {
    rng: R,
}

impl RandomRolls<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomRolls<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RewardRoller for RandomRolls<R> {
    fn roll(&mut self) -> Reward {
        let kind = RewardKind::from_draw(self.rng.r#gen::<f64>());
        let value = match kind.value_range() {
            Some(range) => self.rng.gen_range(range),
            None => 0,
        };
        Reward { kind, value }
    }
}

/// Replays a fixed list of outcomes in order, then falls back to `Lose`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    queue: VecDeque<Reward>,
}

impl ScriptedRolls {
    pub fn new(rewards: impl IntoIterator<Item = Reward>) -> Self {
        Self {
            queue: rewards.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl RewardRoller for ScriptedRolls {
    fn roll(&mut self) -> Reward {
        self.queue.pop_front().unwrap_or(Reward::LOSE)
    }
}
