// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The votes recorded for one party in one district.
///
/// The count is signed: tallies come from external data entry and a negative
/// count must be representable to be rejected.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct PartyVoteInput {
    pub party_id: String,
    pub votes: i64,
}

/// Everything the allocator needs for one district in one year.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DistrictElectionContext {
    pub district_id: String,
    pub district_name: String,
    /// The number of seats apportioned to the district, bonus seat included.
    pub total_seats: i64,
    pub valid_votes: i64,
    pub invalid_votes: i64,
    /// In the order the parties were entered. This order breaks ties.
    pub party_votes: Vec<PartyVoteInput>,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PartyAllocationResult {
    pub party_id: String,
    pub votes: u64,
    pub qualifies: bool,
    pub seats_first_round: u32,
    /// Either 0 or 1.
    pub seats_second_round: u32,
    pub bonus_seat: bool,
    pub total_seats: u32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DistrictAllocationOutcome {
    pub district_id: String,
    pub district_name: String,
    pub total_seats: u32,
    pub valid_votes: u64,
    pub invalid_votes: u64,
    pub threshold_votes: u64,
    /// The quota of the proportional rounds, rounded down.
    pub votes_per_seat: u64,
    pub party_results: Vec<PartyAllocationResult>,
    pub disqualified_party_ids: Vec<String>,
    /// Seats that could not be handed out. Non-zero values point to
    /// inconsistent upstream data (too many seats for too few qualified parties).
    pub unassigned_seats: u32,
}

impl DistrictAllocationOutcome {
    /// True when some seats were left unassigned.
    pub fn has_overflow(&self) -> bool {
        self.unassigned_seats > 0
    }

    pub fn allocated_seats(&self) -> u32 {
        self.party_results.iter().map(|pr| pr.total_seats).sum()
    }

    /// The party that received the bonus seat, if any party qualified.
    pub fn bonus_seat_party(&self) -> Option<&PartyAllocationResult> {
        self.party_results.iter().find(|pr| pr.bonus_seat)
    }
}

/// Per-party rollup across several districts.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PartyNationalSummary {
    pub party_id: String,
    pub total_votes: u64,
    pub total_seats: u64,
    /// Number of districts in which the party won the bonus seat.
    pub bonus_seats: u32,
    pub districts_contested: u32,
}

/// Errors that prevent the allocation from starting.
///
/// They are all detected before any seat is handed out.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum InvalidInputError {
    NonPositiveSeatCount(i64),
    SeatCountOutOfRange(i64),
    NegativeValidVotes(i64),
    NegativeTotalVotes(i64),
    NegativeInvalidVotes(i64),
    InvalidVotesExceedTotal { total_votes: i64, invalid_votes: i64 },
    ZeroValidVotes,
    DuplicateParty(String),
    NegativeVotes { party_id: String, votes: i64 },
    PartyVotesExceedValidVotes { party_votes: u64, valid_votes: u64 },
    ThresholdOutOfRange(u32),
}

impl Error for InvalidInputError {}

impl Display for InvalidInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidInputError::NonPositiveSeatCount(n) => {
                write!(f, "seat count must be positive (got {})", n)
            }
            InvalidInputError::SeatCountOutOfRange(n) => {
                write!(f, "seat count is too large (got {})", n)
            }
            InvalidInputError::NegativeValidVotes(n) => {
                write!(f, "valid votes must not be negative (got {})", n)
            }
            InvalidInputError::NegativeTotalVotes(n) => {
                write!(f, "total votes must not be negative (got {})", n)
            }
            InvalidInputError::NegativeInvalidVotes(n) => {
                write!(f, "invalid votes must not be negative (got {})", n)
            }
            InvalidInputError::InvalidVotesExceedTotal {
                total_votes,
                invalid_votes,
            } => write!(
                f,
                "invalid votes ({}) exceed the total votes ({})",
                invalid_votes, total_votes
            ),
            InvalidInputError::ZeroValidVotes => write!(
                f,
                "cannot allocate seats with zero valid votes and nonzero party votes"
            ),
            InvalidInputError::DuplicateParty(party_id) => {
                write!(f, "duplicate party id in input: {}", party_id)
            }
            InvalidInputError::NegativeVotes { party_id, votes } => write!(
                f,
                "votes must not be negative (party {}: {})",
                party_id, votes
            ),
            InvalidInputError::PartyVotesExceedValidVotes {
                party_votes,
                valid_votes,
            } => write!(
                f,
                "party votes ({}) exceed the valid votes ({})",
                party_votes, valid_votes
            ),
            InvalidInputError::ThresholdOutOfRange(pct) => {
                write!(f, "threshold must be between 0 and 100 percent (got {})", pct)
            }
        }
    }
}

// ********* Configuration **********

/// How the qualification threshold is rounded.
///
/// - Floor: the threshold is `floor(valid_votes * pct / 100)` and a party
/// qualifies when it reaches it. This is the rule used by the seat calculator.
///
/// - Exact: the party must reach the untruncated share `valid_votes * pct / 100`.
/// The reported threshold is then the smallest whole number of votes that does.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ThresholdRounding {
    Floor,
    Exact,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AllocationRules {
    /// Share of the valid votes, in percent, a party needs to get any seat.
    pub threshold_percent: u32,
    pub threshold_rounding: ThresholdRounding,
}

impl AllocationRules {
    pub const DEFAULT_RULES: AllocationRules = AllocationRules {
        threshold_percent: 5,
        threshold_rounding: ThresholdRounding::Floor,
    };
}

impl Default for AllocationRules {
    fn default() -> Self {
        AllocationRules::DEFAULT_RULES
    }
}
