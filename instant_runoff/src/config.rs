// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// An option of a poll, as loaded by the caller.
///
/// The order in which options are handed to the tally matters: it is the
/// order used to break full ties.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct PollOption {
    /// Opaque identifier, unique within a poll.
    pub id: String,
    /// The display text. Round tallies are reported under this name.
    pub text: String,
}

impl PollOption {
    pub fn new(id: &str, text: &str) -> PollOption {
        PollOption {
            id: id.to_string(),
            text: text.to_string(),
        }
    }
}

/// One (option, rank) pair of a ballot. Lower ranks are preferred.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Ranking {
    pub option_id: String,
    pub rank: u32,
}

/// A ballot: the rankings of one voter, in no particular order.
///
/// Only the relative order of the ranks matters. A ballot may rank any
/// subset of the options, including none of them.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub id: String,
    pub rankings: Vec<Ranking>,
}

// ******** Output data structures *********

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    /// 1-based, contiguous.
    pub round: u32,
    /// The tally of the options still running, in poll order.
    pub tally: Vec<(String, u64)>,
    /// Set when an option reached a majority in this round.
    pub elected: Option<String>,
    pub final_vote_count: Option<u64>,
    /// The options removed at the end of this round, in poll order.
    pub eliminated: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Winner {
    pub id: String,
    pub text: String,
    pub final_vote_count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyResult {
    pub winner: Option<Winner>,
    pub round_stats: Vec<RoundStats>,
    /// All the eliminated options, round after round.
    pub eliminated: Vec<String>,
}

/// Errors raised when a poll or a ballot does not pass the checks of the builder.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotErrors {
    DuplicateOptionId(String),
    EmptyOptionText(String),
    InvalidRank { ballot: String, rank: u32 },
    DuplicateRank { ballot: String, rank: u32 },
    UnknownOption { ballot: String, option: String },
    EmptyBallot(String),
}

impl Error for BallotErrors {}

impl Display for BallotErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotErrors::DuplicateOptionId(id) => write!(f, "option id {} is declared twice", id),
            BallotErrors::EmptyOptionText(id) => write!(f, "option {} has an empty text", id),
            BallotErrors::InvalidRank { ballot, rank } => {
                write!(f, "ballot {}: rank {} is not a positive rank", ballot, rank)
            }
            BallotErrors::DuplicateRank { ballot, rank } => {
                write!(f, "ballot {}: rank {} is used more than once", ballot, rank)
            }
            BallotErrors::UnknownOption { ballot, option } => {
                write!(f, "ballot {}: option {} is not part of the poll", ballot, option)
            }
            BallotErrors::EmptyBallot(ballot) => write!(f, "ballot {} ranks no option", ballot),
        }
    }
}

// ********* Configuration **********

/// What to do with a ranking that points to an option outside of the poll.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UnknownOptionRule {
    Reject,
    /// The ranking is kept. It never matches a running option during the tally.
    Ignore,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicateRankRule {
    Reject,
    /// Only the first ranking that uses a given rank is kept.
    KeepFirst,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum EmptyBallotRule {
    Reject,
    /// The ballot is counted in the total but never contributes a vote.
    Exhausted,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotRules {
    pub unknown_option_rule: UnknownOptionRule,
    pub duplicate_rank_rule: DuplicateRankRule,
    pub empty_ballot_rule: EmptyBallotRule,
}

impl BallotRules {
    /// The checks applied when a vote is submitted to a poll.
    pub const DEFAULT_RULES: BallotRules = BallotRules {
        unknown_option_rule: UnknownOptionRule::Reject,
        duplicate_rank_rule: DuplicateRankRule::Reject,
        empty_ballot_rule: EmptyBallotRule::Reject,
    };
}
