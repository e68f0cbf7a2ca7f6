//! Consensus calculation from team votes
//!
//! Agreement is measured per team side (clinical and industry) as the share
//! of that side's members who voted `agree`. The overall score is the lower of
//! the two sides when both have members, so a discussion only reaches high
//! consensus when both sides agree.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Score at which a decision record is created for a discussion
pub const DECISION_THRESHOLD: f64 = 80.0;

/// Score at or above which consensus is `high`
pub const HIGH_THRESHOLD: f64 = 80.0;

/// Score at or above which consensus is `medium`
pub const MEDIUM_THRESHOLD: f64 = 60.0;

/// Team side a member votes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Side {
    Clinical,
    Industry,
}

/// A single vote value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum VoteValue {
    Agree,
    Disagree,
    Abstain,
}

/// Consensus level stored on a discussion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ConsensusStatus {
    Pending,
    Low,
    Medium,
    High,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::Error;

            fn from_str(s: &str) -> $crate::Result<Self> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err($crate::Error::InvalidInput(format!(
                        "Invalid {}: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

pub(crate) use str_enum;

str_enum!(Side { Clinical => "clinical", Industry => "industry" });
str_enum!(VoteValue { Agree => "agree", Disagree => "disagree", Abstain => "abstain" });
str_enum!(ConsensusStatus {
    Pending => "pending",
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Vote counts for one team side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTally {
    pub team_size: u32,
    pub agree: u32,
    pub disagree: u32,
    pub abstain: u32,
}

impl SideTally {
    pub fn votes(&self) -> u32 {
        self.agree + self.disagree + self.abstain
    }

    /// Percentage of the side's members who agreed (0 for an empty side)
    pub fn agreement(&self) -> f64 {
        percentage(self.agree, self.team_size)
    }

    fn record(&mut self, vote: VoteValue) {
        match vote {
            VoteValue::Agree => self.agree += 1,
            VoteValue::Disagree => self.disagree += 1,
            VoteValue::Abstain => self.abstain += 1,
        }
    }
}

/// Vote counts for a whole discussion, split by side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTally {
    pub clinical: SideTally,
    pub industry: SideTally,
}

impl TeamTally {
    /// Build a tally from team sizes and the votes of current voting members
    ///
    /// Fails if either side has more votes than members.
    pub fn new(
        clinical_team: u32,
        industry_team: u32,
        votes: impl IntoIterator<Item = (Side, VoteValue)>,
    ) -> Result<Self> {
        let mut tally = TeamTally {
            clinical: SideTally {
                team_size: clinical_team,
                ..SideTally::default()
            },
            industry: SideTally {
                team_size: industry_team,
                ..SideTally::default()
            },
        };

        for (side, vote) in votes {
            match side {
                Side::Clinical => tally.clinical.record(vote),
                Side::Industry => tally.industry.record(vote),
            }
        }

        for (name, side) in [("clinical", &tally.clinical), ("industry", &tally.industry)] {
            if side.votes() > side.team_size {
                return Err(Error::Internal(format!(
                    "{} votes ({}) exceed {} team size ({})",
                    name,
                    side.votes(),
                    name,
                    side.team_size
                )));
            }
        }

        Ok(tally)
    }

    pub fn team_size(&self) -> u32 {
        self.clinical.team_size + self.industry.team_size
    }

    pub fn total_votes(&self) -> u32 {
        self.clinical.votes() + self.industry.votes()
    }
}

/// Consensus snapshot for a discussion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub status: ConsensusStatus,
    pub score: f64,
    pub clinical_agreement: f64,
    pub industry_agreement: f64,
    pub participation: f64,
    pub tally: TeamTally,
}

impl Consensus {
    /// Whether this snapshot warrants a decision record
    pub fn reaches_decision(&self) -> bool {
        self.total_votes() > 0 && self.score >= DECISION_THRESHOLD
    }

    pub fn total_votes(&self) -> u32 {
        self.tally.total_votes()
    }
}

/// Compute the consensus snapshot for a tally
pub fn calculate(tally: &TeamTally) -> Consensus {
    let clinical_agreement = tally.clinical.agreement();
    let industry_agreement = tally.industry.agreement();

    let score = match (tally.clinical.team_size > 0, tally.industry.team_size > 0) {
        (true, true) => clinical_agreement.min(industry_agreement),
        (true, false) => clinical_agreement,
        (false, true) => industry_agreement,
        (false, false) => 0.0,
    };

    Consensus {
        status: status_for(score, tally.total_votes()),
        score,
        clinical_agreement,
        industry_agreement,
        participation: percentage(tally.total_votes(), tally.team_size()),
        tally: *tally,
    }
}

/// Threshold a score into a status; no votes means `pending`
pub fn status_for(score: f64, total_votes: u32) -> ConsensusStatus {
    if total_votes == 0 {
        ConsensusStatus::Pending
    } else if score >= HIGH_THRESHOLD {
        ConsensusStatus::High
    } else if score >= MEDIUM_THRESHOLD {
        ConsensusStatus::Medium
    } else {
        ConsensusStatus::Low
    }
}

fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Side::*;
    use VoteValue::*;

    const NO_VOTES: [(Side, VoteValue); 0] = [];

    #[test]
    fn test_no_votes_is_pending() {
        let tally = TeamTally::new(3, 2, NO_VOTES).unwrap();
        let consensus = calculate(&tally);
        assert_eq!(consensus.status, ConsensusStatus::Pending);
        assert_eq!(consensus.score, 0.0);
        assert_eq!(consensus.participation, 0.0);
        assert!(!consensus.reaches_decision());
    }

    #[test]
    fn test_empty_team_has_zero_percentages() {
        let consensus = calculate(&TeamTally::default());
        assert_eq!(consensus.clinical_agreement, 0.0);
        assert_eq!(consensus.industry_agreement, 0.0);
        assert_eq!(consensus.status, ConsensusStatus::Pending);
    }

    #[test]
    fn test_score_is_lower_side_when_both_present() {
        // clinical 2/2 agree, industry 1/2 agree
        let tally = TeamTally::new(
            2,
            2,
            [(Clinical, Agree), (Clinical, Agree), (Industry, Agree), (Industry, Disagree)],
        )
        .unwrap();
        let consensus = calculate(&tally);
        assert_eq!(consensus.clinical_agreement, 100.0);
        assert_eq!(consensus.industry_agreement, 50.0);
        assert_eq!(consensus.score, 50.0);
        assert_eq!(consensus.status, ConsensusStatus::Low);
        assert_eq!(consensus.participation, 100.0);
    }

    #[test]
    fn test_single_side_team_uses_that_side() {
        let tally = TeamTally::new(5, 0, [(Clinical, Agree), (Clinical, Agree), (Clinical, Agree)])
            .unwrap();
        let consensus = calculate(&tally);
        assert_eq!(consensus.score, 60.0);
        assert_eq!(consensus.status, ConsensusStatus::Medium);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(status_for(80.0, 1), ConsensusStatus::High);
        assert_eq!(status_for(79.9, 1), ConsensusStatus::Medium);
        assert_eq!(status_for(60.0, 1), ConsensusStatus::Medium);
        assert_eq!(status_for(59.9, 1), ConsensusStatus::Low);
        assert_eq!(status_for(100.0, 0), ConsensusStatus::Pending);
    }

    #[test]
    fn test_abstain_counts_toward_participation_not_agreement() {
        let tally = TeamTally::new(2, 0, [(Clinical, Abstain), (Clinical, Agree)]).unwrap();
        let consensus = calculate(&tally);
        assert_eq!(consensus.clinical_agreement, 50.0);
        assert_eq!(consensus.participation, 100.0);
    }

    #[test]
    fn test_decision_threshold_reached() {
        let tally = TeamTally::new(1, 1, [(Clinical, Agree), (Industry, Agree)]).unwrap();
        let consensus = calculate(&tally);
        assert_eq!(consensus.status, ConsensusStatus::High);
        assert!(consensus.reaches_decision());
    }

    #[test]
    fn test_votes_exceeding_team_size_rejected() {
        let result = TeamTally::new(1, 0, [(Clinical, Agree), (Clinical, Disagree)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_string_round_trip_for_stored_values() {
        assert_eq!("medium".parse::<ConsensusStatus>().unwrap(), ConsensusStatus::Medium);
        assert_eq!(VoteValue::Abstain.as_str(), "abstain");
        assert!("maybe".parse::<VoteValue>().is_err());
    }
}
