pub use crate::config::*;

use crate::derive_valid_votes;

/// A builder for the context of one district.
///
/// ```
/// pub use seat_allocation::builder::Builder;
/// # use seat_allocation::InvalidInputError;
///
/// let context = Builder::new("galle", 12)
///     .district_name("Galle")
///     .total_votes(410_000, 9_000)?
///     .add_party_votes("unp", 180_000)
///     .add_party_votes("slfp", 150_000)
///     .build();
///
/// assert_eq!(context.valid_votes, 401_000);
///
/// # Ok::<(), InvalidInputError>(())
/// ```
pub struct Builder {
    pub(crate) _district_id: String,
    pub(crate) _district_name: Option<String>,
    pub(crate) _total_seats: i64,
    pub(crate) _valid_votes: i64,
    pub(crate) _invalid_votes: i64,
    pub(crate) _party_votes: Vec<PartyVoteInput>,
}

impl Builder {
    pub fn new(district_id: &str, total_seats: i64) -> Builder {
        Builder {
            _district_id: district_id.to_string(),
            _district_name: None,
            _total_seats: total_seats,
            _valid_votes: 0,
            _invalid_votes: 0,
            _party_votes: Vec::new(),
        }
    }

    /// The display name. Defaults to the district id.
    pub fn district_name(self, name: &str) -> Builder {
        Builder {
            _district_name: Some(name.to_string()),
            ..self
        }
    }

    pub fn valid_votes(self, valid_votes: i64) -> Builder {
        Builder {
            _valid_votes: valid_votes,
            ..self
        }
    }

    pub fn invalid_votes(self, invalid_votes: i64) -> Builder {
        Builder {
            _invalid_votes: invalid_votes,
            ..self
        }
    }

    /// Sets the invalid votes and derives the valid votes from the total.
    pub fn total_votes(
        self,
        total_votes: i64,
        invalid_votes: i64,
    ) -> Result<Builder, InvalidInputError> {
        let valid_votes = derive_valid_votes(total_votes, invalid_votes)?;
        Ok(Builder {
            _valid_votes: valid_votes,
            _invalid_votes: invalid_votes,
            ..self
        })
    }

    /// Adds the votes of one party. The order of the calls is the tie-break order.
    ///
    /// Duplicates are not checked here, the allocation rejects them.
    pub fn add_party_votes(mut self, party_id: &str, votes: i64) -> Builder {
        self._party_votes.push(PartyVoteInput {
            party_id: party_id.to_string(),
            votes,
        });
        self
    }

    pub fn build(self) -> DistrictElectionContext {
        DistrictElectionContext {
            district_name: self
                ._district_name
                .unwrap_or_else(|| self._district_id.clone()),
            district_id: self._district_id,
            total_seats: self._total_seats,
            valid_votes: self._valid_votes,
            invalid_votes: self._invalid_votes,
            party_votes: self._party_votes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_in_input_order() {
        let ctx = Builder::new("kandy", 16)
            .valid_votes(1_000)
            .add_party_votes("b", 10)
            .add_party_votes("a", 20)
            .build();
        assert_eq!(ctx.district_name, "kandy");
        let ids: Vec<&str> = ctx.party_votes.iter().map(|pv| pv.party_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn total_votes_checks_the_invalid_count() {
        let res = Builder::new("kandy", 16).total_votes(100, 101);
        assert!(matches!(
            res,
            Err(InvalidInputError::InvalidVotesExceedTotal { .. })
        ));
    }
}
