mod aggregate;
pub mod builder;
mod config;
pub mod manual;
pub mod store;

use log::{debug, info, warn};

use std::collections::HashSet;

pub use crate::aggregate::aggregate_across_districts;
pub use crate::config::*;

// **** Private structures ****

type SeatCount = u32;

// A party entry whose vote count has been checked.
#[derive(Eq, PartialEq, Debug, Clone)]
struct CheckedParty {
    party_id: String,
    votes: u64,
}

// All the counts are known to be in range and consistent with each other.
#[derive(Eq, PartialEq, Debug, Clone)]
struct CheckedContext {
    total_seats: SeatCount,
    valid_votes: u64,
    invalid_votes: u64,
    // Input order is preserved.
    parties: Vec<CheckedParty>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct Threshold {
    // The number of votes reported to the user.
    votes: u64,
    // Qualification test: votes * 100 >= bar, bar being scaled by 100.
    scaled_bar: u128,
}

impl Threshold {
    fn new(valid_votes: u64, rules: &AllocationRules) -> Threshold {
        let scaled = (valid_votes as u128) * (rules.threshold_percent as u128);
        match rules.threshold_rounding {
            ThresholdRounding::Floor => {
                let votes = (scaled / 100) as u64;
                Threshold {
                    votes,
                    scaled_bar: (votes as u128) * 100,
                }
            }
            ThresholdRounding::Exact => Threshold {
                votes: ((scaled + 99) / 100) as u64,
                scaled_bar: scaled,
            },
        }
    }

    fn admits(&self, votes: u64) -> bool {
        (votes as u128) * 100 >= self.scaled_bar
    }
}

/// Allocates the seats of one district with the default rules (5% threshold, floored).
///
/// ```
/// use seat_allocation::builder::Builder;
/// use seat_allocation::allocate_seats;
/// # use seat_allocation::InvalidInputError;
///
/// let context = Builder::new("colombo", 5)
///     .valid_votes(100_000)
///     .invalid_votes(5_000)
///     .add_party_votes("A", 60_000)
///     .add_party_votes("B", 30_000)
///     .add_party_votes("C", 10_000)
///     .build();
///
/// let outcome = allocate_seats(&context)?;
/// assert_eq!(outcome.party_results[0].total_seats, 4);
/// assert_eq!(outcome.party_results[1].total_seats, 1);
/// assert_eq!(outcome.party_results[2].total_seats, 0);
/// # Ok::<(), InvalidInputError>(())
/// ```
pub fn allocate_seats(
    context: &DistrictElectionContext,
) -> Result<DistrictAllocationOutcome, InvalidInputError> {
    allocate_seats_with_rules(context, &AllocationRules::DEFAULT_RULES)
}

/// Runs the allocation for one district with the given rules.
///
/// Steps, in order:
/// * parties under the threshold are disqualified and get nothing
/// * one seat is reserved for the qualified party with the most votes
/// * the other seats are handed out by quota (`valid_votes / remaining seats`)
/// * seats left after the quota round go to the largest remainders, at most one per party
///
/// Ties are broken by the order of `context.party_votes`.
pub fn allocate_seats_with_rules(
    context: &DistrictElectionContext,
    rules: &AllocationRules,
) -> Result<DistrictAllocationOutcome, InvalidInputError> {
    let checked = checks(context, rules)?;
    info!(
        "allocate_seats: district {:?}: {} seats, {} valid votes, {} parties",
        context.district_id,
        checked.total_seats,
        checked.valid_votes,
        checked.parties.len()
    );

    let threshold = Threshold::new(checked.valid_votes, rules);
    debug!(
        "allocate_seats: threshold: {:?} (rules: {:?})",
        threshold, rules
    );

    let mut results: Vec<PartyAllocationResult> = checked
        .parties
        .iter()
        .map(|p| PartyAllocationResult {
            party_id: p.party_id.clone(),
            votes: p.votes,
            qualifies: threshold.admits(p.votes),
            seats_first_round: 0,
            seats_second_round: 0,
            bonus_seat: false,
            total_seats: 0,
        })
        .collect();

    let disqualified_party_ids: Vec<String> = results
        .iter()
        .filter(|pr| !pr.qualifies)
        .map(|pr| pr.party_id.clone())
        .collect();
    if !disqualified_party_ids.is_empty() {
        info!(
            "allocate_seats: district {:?}: disqualified: {:?}",
            context.district_id, disqualified_party_ids
        );
    }

    // One seat is always kept for the bonus.
    let remaining_seats: SeatCount = checked.total_seats - 1;

    if let Some(idx) = find_bonus_seat_winner(&results) {
        debug!("allocate_seats: bonus seat: {}", results[idx].party_id);
        results[idx].bonus_seat = true;
    }

    let first_round_total = run_first_round(&mut results, checked.valid_votes, remaining_seats);
    let second_round_seats = remaining_seats.saturating_sub(first_round_total);
    debug!(
        "allocate_seats: first round: {} seats, second round: {} seats",
        first_round_total, second_round_seats
    );
    let left_over = run_second_round(
        &mut results,
        checked.valid_votes,
        remaining_seats,
        second_round_seats,
    );

    for pr in results.iter_mut() {
        pr.total_seats = pr.seats_first_round + pr.seats_second_round + u32::from(pr.bonus_seat);
    }

    let allocated: SeatCount = results.iter().map(|pr| pr.total_seats).sum();
    let unassigned_seats = checked.total_seats.saturating_sub(allocated);
    if unassigned_seats > 0 {
        warn!(
            "allocate_seats: district {:?}: {} of {} seats could not be assigned ({} left after the second round, {} qualified parties)",
            context.district_id,
            unassigned_seats,
            checked.total_seats,
            left_over,
            results.iter().filter(|pr| pr.qualifies).count()
        );
    }
    // Invariant: seats are conserved unless the second round ran out of parties.
    if left_over == 0 && results.iter().any(|pr| pr.bonus_seat) {
        debug_assert_eq!(allocated, checked.total_seats);
    }

    let votes_per_seat = if remaining_seats == 0 {
        0
    } else {
        checked.valid_votes / (remaining_seats as u64)
    };

    for pr in results.iter() {
        info!(
            "allocate_seats: {:>10} {} -> {} + {} + {} = {}",
            pr.votes,
            pr.party_id,
            pr.seats_first_round,
            pr.seats_second_round,
            u32::from(pr.bonus_seat),
            pr.total_seats
        );
    }

    Ok(DistrictAllocationOutcome {
        district_id: context.district_id.clone(),
        district_name: context.district_name.clone(),
        total_seats: checked.total_seats,
        valid_votes: checked.valid_votes,
        invalid_votes: checked.invalid_votes,
        threshold_votes: threshold.votes,
        votes_per_seat,
        party_results: results,
        disqualified_party_ids,
        unassigned_seats,
    })
}

/// The fallback used when no invalid count was recorded: 5% of the total votes, rounded down.
pub fn estimate_invalid_votes(total_votes: u64) -> u64 {
    ((total_votes as u128) * 5 / 100) as u64
}

/// Valid votes as the total votes minus the invalid (rejected) ballots.
pub fn derive_valid_votes(total_votes: i64, invalid_votes: i64) -> Result<i64, InvalidInputError> {
    if total_votes < 0 {
        return Err(InvalidInputError::NegativeTotalVotes(total_votes));
    }
    if invalid_votes < 0 {
        return Err(InvalidInputError::NegativeInvalidVotes(invalid_votes));
    }
    if invalid_votes > total_votes {
        return Err(InvalidInputError::InvalidVotesExceedTotal {
            total_votes,
            invalid_votes,
        });
    }
    Ok(total_votes - invalid_votes)
}

// All the input checks. Nothing is computed if any of them fails.
fn checks(
    context: &DistrictElectionContext,
    rules: &AllocationRules,
) -> Result<CheckedContext, InvalidInputError> {
    debug!(
        "checks: district {:?}: {} party entries",
        context.district_id,
        context.party_votes.len()
    );
    if context.total_seats < 1 {
        return Err(InvalidInputError::NonPositiveSeatCount(context.total_seats));
    }
    let total_seats = SeatCount::try_from(context.total_seats)
        .map_err(|_| InvalidInputError::SeatCountOutOfRange(context.total_seats))?;
    if context.valid_votes < 0 {
        return Err(InvalidInputError::NegativeValidVotes(context.valid_votes));
    }
    if context.invalid_votes < 0 {
        return Err(InvalidInputError::NegativeInvalidVotes(
            context.invalid_votes,
        ));
    }
    if rules.threshold_percent > 100 {
        return Err(InvalidInputError::ThresholdOutOfRange(
            rules.threshold_percent,
        ));
    }
    let valid_votes = context.valid_votes as u64;
    if valid_votes == 0 && !context.party_votes.is_empty() {
        return Err(InvalidInputError::ZeroValidVotes);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut parties: Vec<CheckedParty> = Vec::with_capacity(context.party_votes.len());
    for pv in context.party_votes.iter() {
        if !seen.insert(pv.party_id.as_str()) {
            return Err(InvalidInputError::DuplicateParty(pv.party_id.clone()));
        }
        if pv.votes < 0 {
            return Err(InvalidInputError::NegativeVotes {
                party_id: pv.party_id.clone(),
                votes: pv.votes,
            });
        }
        parties.push(CheckedParty {
            party_id: pv.party_id.clone(),
            votes: pv.votes as u64,
        });
    }

    let party_votes: u128 = parties.iter().map(|p| p.votes as u128).sum();
    if party_votes > valid_votes as u128 {
        return Err(InvalidInputError::PartyVotesExceedValidVotes {
            party_votes: u64::try_from(party_votes).unwrap_or(u64::MAX),
            valid_votes,
        });
    }

    Ok(CheckedContext {
        total_seats,
        valid_votes,
        invalid_votes: context.invalid_votes as u64,
        parties,
    })
}

// The first qualified party with the highest vote count.
fn find_bonus_seat_winner(results: &[PartyAllocationResult]) -> Option<usize> {
    let mut winner: Option<usize> = None;
    for (idx, pr) in results.iter().enumerate() {
        if !pr.qualifies {
            continue;
        }
        match winner {
            Some(w) if results[w].votes >= pr.votes => {}
            _ => winner = Some(idx),
        }
    }
    winner
}

// floor(votes / quota) with quota = valid_votes / remaining_seats, in exact integer arithmetic.
// Returns the number of seats handed out.
fn run_first_round(
    results: &mut [PartyAllocationResult],
    valid_votes: u64,
    remaining_seats: SeatCount,
) -> SeatCount {
    if remaining_seats == 0 || valid_votes == 0 {
        return 0;
    }
    let mut total: SeatCount = 0;
    for pr in results.iter_mut().filter(|pr| pr.qualifies) {
        let seats = (pr.votes as u128) * (remaining_seats as u128) / (valid_votes as u128);
        // Bounded by remaining_seats since party votes never exceed the valid votes.
        pr.seats_first_round = seats as SeatCount;
        total += pr.seats_first_round;
    }
    total
}

// Largest remainder, one seat per party at most.
// Returns the number of seats that could not be handed out.
fn run_second_round(
    results: &mut [PartyAllocationResult],
    valid_votes: u64,
    remaining_seats: SeatCount,
    seats: SeatCount,
) -> SeatCount {
    if seats == 0 {
        return 0;
    }
    // The remainder votes - seats_first_round * quota, scaled by remaining_seats to stay integral.
    let mut remainders: Vec<(usize, u128)> = results
        .iter()
        .enumerate()
        .filter(|(_, pr)| pr.qualifies)
        .map(|(idx, pr)| {
            let scaled_votes = (pr.votes as u128) * (remaining_seats as u128);
            let scaled_used = (pr.seats_first_round as u128) * (valid_votes as u128);
            (idx, scaled_votes - scaled_used)
        })
        .collect();
    // The sort is stable: equal remainders keep the input order.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    debug!("run_second_round: remainders: {:?}", remainders);

    let mut given: SeatCount = 0;
    for (idx, _) in remainders.iter().take(seats as usize) {
        results[*idx].seats_second_round = 1;
        given += 1;
    }
    seats - given
}
