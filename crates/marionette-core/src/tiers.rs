//! The tier state machine.
//!
//! Fallthrough is an explicit, pure transition function over four
//! states. One attempt per tier, strictly increasing, always bounded:
//! any walk of `next` reaches `Done` within three transitions.

use serde::{Deserialize, Serialize};

/// The three automation strategies, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Pre-authored scripted template.
    Scripted,
    /// Vision-model plan replayed with input primitives.
    PlanGuided,
    /// Bare application launch.
    Generic,
}

impl Tier {
    pub fn number(&self) -> u8 {
        match self {
            Self::Scripted => 1,
            Self::PlanGuided => 2,
            Self::Generic => 3,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier{}", self.number())
    }
}

/// Where the fallthrough walk currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierState {
    Tier1,
    Tier2,
    Tier3,
    Done,
}

impl TierState {
    /// The tier to attempt in this state, if any.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Tier1 => Some(Tier::Scripted),
            Self::Tier2 => Some(Tier::PlanGuided),
            Self::Tier3 => Some(Tier::Generic),
            Self::Done => None,
        }
    }

    /// The state that attempts `tier` first.
    pub fn starting_at(tier: Tier) -> Self {
        match tier {
            Tier::Scripted => Self::Tier1,
            Tier::PlanGuided => Self::Tier2,
            Tier::Generic => Self::Tier3,
        }
    }
}

/// What one tier attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOutcome {
    Success,
    Failure,
}

/// Pure transition function. Success ends the walk; failure moves to
/// the next-cheapest tier, and a third failure ends it.
pub fn next(state: TierState, outcome: TierOutcome) -> TierState {
    match (state, outcome) {
        (_, TierOutcome::Success) => TierState::Done,
        (TierState::Tier1, TierOutcome::Failure) => TierState::Tier2,
        (TierState::Tier2, TierOutcome::Failure) => TierState::Tier3,
        (TierState::Tier3, TierOutcome::Failure) => TierState::Done,
        (TierState::Done, TierOutcome::Failure) => TierState::Done,
    }
}
