use log::debug;

use std::collections::HashMap;

use crate::config::*;

/// Sums the votes and seats of each party over a set of district outcomes.
///
/// No seat is recalculated. Parties appear in the order in which they are first
/// seen in the outcomes; a party absent from a district contributes nothing for it.
pub fn aggregate_across_districts(outcomes: &[DistrictAllocationOutcome]) -> Vec<PartyNationalSummary> {
    let mut summaries: Vec<PartyNationalSummary> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for outcome in outcomes.iter() {
        for pr in outcome.party_results.iter() {
            let idx = *positions.entry(pr.party_id.as_str()).or_insert_with(|| {
                summaries.push(PartyNationalSummary {
                    party_id: pr.party_id.clone(),
                    total_votes: 0,
                    total_seats: 0,
                    bonus_seats: 0,
                    districts_contested: 0,
                });
                summaries.len() - 1
            });
            let summary = &mut summaries[idx];
            summary.total_votes += pr.votes;
            summary.total_seats += pr.total_seats as u64;
            summary.bonus_seats += u32::from(pr.bonus_seat);
            summary.districts_contested += 1;
        }
    }
    debug!(
        "aggregate_across_districts: {} outcomes, {} parties",
        outcomes.len(),
        summaries.len()
    );
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate_seats;
    use crate::builder::Builder;

    fn party(party_id: &str, votes: u64, total_seats: u32, bonus_seat: bool) -> PartyAllocationResult {
        PartyAllocationResult {
            party_id: party_id.to_string(),
            votes,
            qualifies: total_seats > 0,
            seats_first_round: total_seats - u32::from(bonus_seat),
            seats_second_round: 0,
            bonus_seat,
            total_seats,
        }
    }

    fn outcome(district_id: &str, party_results: Vec<PartyAllocationResult>) -> DistrictAllocationOutcome {
        let total_seats = party_results.iter().map(|pr| pr.total_seats).sum();
        let valid_votes = party_results.iter().map(|pr| pr.votes).sum();
        DistrictAllocationOutcome {
            district_id: district_id.to_string(),
            district_name: district_id.to_string(),
            total_seats,
            valid_votes,
            invalid_votes: 0,
            threshold_votes: 0,
            votes_per_seat: 0,
            party_results,
            disqualified_party_ids: vec![],
            unassigned_seats: 0,
        }
    }

    #[test]
    fn sums_over_two_districts() {
        let outcomes = vec![
            outcome("d1", vec![party("X", 40_000, 4, true), party("Y", 20_000, 2, false)]),
            outcome("d2", vec![party("X", 15_000, 2, false), party("Y", 25_000, 3, true)]),
        ];
        let summary = aggregate_across_districts(&outcomes);
        assert_eq!(
            summary,
            vec![
                PartyNationalSummary {
                    party_id: "X".to_string(),
                    total_votes: 55_000,
                    total_seats: 6,
                    bonus_seats: 1,
                    districts_contested: 2,
                },
                PartyNationalSummary {
                    party_id: "Y".to_string(),
                    total_votes: 45_000,
                    total_seats: 5,
                    bonus_seats: 1,
                    districts_contested: 2,
                },
            ]
        );
    }

    #[test]
    fn absent_parties_contribute_nothing() {
        let outcomes = vec![
            outcome("d1", vec![party("X", 10, 1, true)]),
            outcome("d2", vec![party("Z", 30, 2, true), party("X", 5, 1, false)]),
        ];
        let summary = aggregate_across_districts(&outcomes);
        let ids: Vec<&str> = summary.iter().map(|s| s.party_id.as_str()).collect();
        assert_eq!(ids, vec!["X", "Z"]);
        assert_eq!(summary[1].districts_contested, 1);
        assert_eq!(summary[1].total_seats, 2);
        assert!(aggregate_across_districts(&[]).is_empty());
    }

    #[test]
    fn national_seats_match_district_seats() {
        let d1 = Builder::new("colombo", 19)
            .valid_votes(900_000)
            .add_party_votes("unp", 400_000)
            .add_party_votes("slfp", 300_000)
            .add_party_votes("jvp", 150_000)
            .add_party_votes("nc", 20_000)
            .build();
        let d2 = Builder::new("jaffna", 10)
            .valid_votes(300_000)
            .add_party_votes("itak", 120_000)
            .add_party_votes("epdp", 80_000)
            .add_party_votes("unp", 60_000)
            .add_party_votes("actc", 40_000)
            .build();
        let outcomes = vec![allocate_seats(&d1).unwrap(), allocate_seats(&d2).unwrap()];
        let summary = aggregate_across_districts(&outcomes);
        let seats: u64 = summary.iter().map(|s| s.total_seats).sum();
        assert_eq!(seats, 29);
        let unp = summary.iter().find(|s| s.party_id == "unp").unwrap();
        assert_eq!(unp.total_votes, 460_000);
        // Disqualified in Colombo, still counted for its votes.
        let nc = summary.iter().find(|s| s.party_id == "nc").unwrap();
        assert_eq!((nc.total_votes, nc.total_seats), (20_000, 0));
    }
}
