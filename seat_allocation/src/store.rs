//! The election data: provinces, districts and parties, and the results of each year.
//!
//! The store only records counts. [`ElectionStore::district_context`] turns them into
//! the input of [`crate::allocate_seats`].

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use log::debug;

use crate::builder::Builder;
use crate::config::*;
use crate::{derive_valid_votes, estimate_invalid_votes};

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Party {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub color: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct District {
    pub id: String,
    pub name: String,
    pub seat_allocation: i64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Province {
    pub id: String,
    pub name: String,
    pub districts: Vec<District>,
}

/// The recorded counts of one district. Party votes are kept in the order they were entered.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DistrictResult {
    pub district_id: String,
    pub total_votes: i64,
    pub invalid_votes: i64,
    pub valid_votes: Option<i64>,
    pub party_votes: Vec<PartyVoteInput>,
}

impl DistrictResult {
    fn new(district_id: &str) -> DistrictResult {
        DistrictResult {
            district_id: district_id.to_string(),
            total_votes: 0,
            invalid_votes: 0,
            valid_votes: None,
            party_votes: Vec::new(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    pub year: u32,
    pub district_results: Vec<DistrictResult>,
}

/// The counts of a district as they enter the allocation.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct DistrictCounts {
    pub total_votes: i64,
    pub invalid_votes: i64,
    pub valid_votes: i64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct YearSummary {
    pub year: u32,
    pub total_votes: i64,
    pub total_invalid_votes: i64,
    pub total_valid_votes: i64,
    pub districts: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StoreError {
    DuplicateRecord { kind: &'static str, id: String },
    UnknownProvince(String),
    UnknownDistrict(String),
    UnknownParty(String),
    MissingYear(u32),
    InvalidCounts {
        district_id: String,
        source: InvalidInputError,
    },
    VoteCountOverflow(String),
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::InvalidCounts { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateRecord { kind, id } => write!(f, "duplicate {} id {}", kind, id),
            StoreError::UnknownProvince(id) => write!(f, "unknown province {}", id),
            StoreError::UnknownDistrict(id) => write!(f, "unknown district {}", id),
            StoreError::UnknownParty(id) => write!(f, "unknown party {}", id),
            StoreError::MissingYear(year) => write!(f, "no results recorded for year {}", year),
            StoreError::InvalidCounts {
                district_id,
                source,
            } => write!(f, "district {}: {}", district_id, source),
            StoreError::VoteCountOverflow(id) => {
                write!(f, "district {}: the party votes do not fit in a vote count", id)
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionStore {
    parties: Vec<Party>,
    provinces: Vec<Province>,
    results: BTreeMap<u32, ElectionResult>,
}

impl ElectionStore {
    pub fn new() -> ElectionStore {
        ElectionStore::default()
    }

    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn party(&self, party_id: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.id == party_id)
    }

    // ********* Provinces *********

    pub fn add_province(&mut self, province: Province) -> Result<(), StoreError> {
        if self.provinces.iter().any(|p| p.id == province.id) {
            return Err(StoreError::DuplicateRecord {
                kind: "province",
                id: province.id,
            });
        }
        if let Some(d) = province
            .districts
            .iter()
            .find(|d| self.find_district(&d.id).is_some())
        {
            return Err(StoreError::DuplicateRecord {
                kind: "district",
                id: d.id.clone(),
            });
        }
        debug!("add_province: {}", province.id);
        self.provinces.push(province);
        Ok(())
    }

    pub fn update_province_name(&mut self, province_id: &str, name: &str) -> Result<(), StoreError> {
        let province = self.province_mut(province_id)?;
        province.name = name.to_string();
        Ok(())
    }

    /// Removes the province, its districts and their results.
    pub fn remove_province(&mut self, province_id: &str) -> Result<Province, StoreError> {
        let idx = self
            .provinces
            .iter()
            .position(|p| p.id == province_id)
            .ok_or_else(|| StoreError::UnknownProvince(province_id.to_string()))?;
        let province = self.provinces.remove(idx);
        for d in province.districts.iter() {
            self.remove_results_of(&d.id);
        }
        Ok(province)
    }

    // ********* Districts *********

    pub fn add_district(&mut self, province_id: &str, district: District) -> Result<(), StoreError> {
        if self.find_district(&district.id).is_some() {
            return Err(StoreError::DuplicateRecord {
                kind: "district",
                id: district.id,
            });
        }
        let province = self.province_mut(province_id)?;
        province.districts.push(district);
        Ok(())
    }

    pub fn update_district_seats(
        &mut self,
        district_id: &str,
        seat_allocation: i64,
    ) -> Result<(), StoreError> {
        let district = self
            .provinces
            .iter_mut()
            .flat_map(|p| p.districts.iter_mut())
            .find(|d| d.id == district_id)
            .ok_or_else(|| StoreError::UnknownDistrict(district_id.to_string()))?;
        district.seat_allocation = seat_allocation;
        Ok(())
    }

    /// Removes the district and its results of all the years.
    pub fn remove_district(&mut self, district_id: &str) -> Result<District, StoreError> {
        let mut removed: Option<District> = None;
        for province in self.provinces.iter_mut() {
            if let Some(idx) = province.districts.iter().position(|d| d.id == district_id) {
                removed = Some(province.districts.remove(idx));
                break;
            }
        }
        let district = removed.ok_or_else(|| StoreError::UnknownDistrict(district_id.to_string()))?;
        self.remove_results_of(district_id);
        Ok(district)
    }

    pub fn find_district(&self, district_id: &str) -> Option<&District> {
        self.provinces
            .iter()
            .flat_map(|p| p.districts.iter())
            .find(|d| d.id == district_id)
    }

    // ********* Parties *********

    pub fn add_party(&mut self, party: Party) -> Result<(), StoreError> {
        if self.party(&party.id).is_some() {
            return Err(StoreError::DuplicateRecord {
                kind: "party",
                id: party.id,
            });
        }
        self.parties.push(party);
        Ok(())
    }

    pub fn update_party(&mut self, party: Party) -> Result<(), StoreError> {
        match self.parties.iter_mut().find(|p| p.id == party.id) {
            Some(existing) => {
                *existing = party;
                Ok(())
            }
            None => Err(StoreError::UnknownParty(party.id)),
        }
    }

    /// Removes the party and its votes in all the recorded results.
    pub fn remove_party(&mut self, party_id: &str) -> Result<Party, StoreError> {
        let idx = self
            .parties
            .iter()
            .position(|p| p.id == party_id)
            .ok_or_else(|| StoreError::UnknownParty(party_id.to_string()))?;
        for er in self.results.values_mut() {
            for dr in er.district_results.iter_mut() {
                dr.party_votes.retain(|pv| pv.party_id != party_id);
            }
        }
        Ok(self.parties.remove(idx))
    }

    // ********* Results *********

    pub fn set_district_totals(
        &mut self,
        year: u32,
        district_id: &str,
        total_votes: i64,
        invalid_votes: i64,
        valid_votes: Option<i64>,
    ) -> Result<(), StoreError> {
        let dr = self.district_result_mut(year, district_id)?;
        dr.total_votes = total_votes;
        dr.invalid_votes = invalid_votes;
        dr.valid_votes = valid_votes;
        Ok(())
    }

    /// Inserts or replaces the votes of a party in a district.
    pub fn update_district_result(
        &mut self,
        year: u32,
        district_id: &str,
        party_id: &str,
        votes: i64,
    ) -> Result<(), StoreError> {
        if self.party(party_id).is_none() {
            return Err(StoreError::UnknownParty(party_id.to_string()));
        }
        let dr = self.district_result_mut(year, district_id)?;
        match dr.party_votes.iter_mut().find(|pv| pv.party_id == party_id) {
            Some(pv) => {
                debug!(
                    "update_district_result: {} {}: {} replaced by {}",
                    district_id, party_id, pv.votes, votes
                );
                pv.votes = votes;
            }
            None => dr.party_votes.push(PartyVoteInput {
                party_id: party_id.to_string(),
                votes,
            }),
        }
        Ok(())
    }

    pub fn results_by_year(&self, year: u32) -> Option<&ElectionResult> {
        self.results.get(&year)
    }

    pub fn district_result(&self, year: u32, district_id: &str) -> Option<&DistrictResult> {
        self.results_by_year(year)?
            .district_results
            .iter()
            .find(|dr| dr.district_id == district_id)
    }

    /// The allocation input of a district, or None if nothing was recorded for it this year.
    ///
    /// The counts are the ones of [`ElectionStore::district_counts`].
    pub fn district_context(
        &self,
        year: u32,
        district_id: &str,
        estimate_invalid: bool,
    ) -> Result<Option<DistrictElectionContext>, StoreError> {
        let district = self
            .find_district(district_id)
            .ok_or_else(|| StoreError::UnknownDistrict(district_id.to_string()))?;
        let dr = match self.district_result(year, district_id) {
            Some(dr) => dr,
            None => return Ok(None),
        };
        let counts = district_counts(dr, estimate_invalid)?;

        let builder = Builder::new(&district.id, district.seat_allocation)
            .district_name(&district.name)
            .valid_votes(counts.valid_votes)
            .invalid_votes(counts.invalid_votes);
        let builder = dr
            .party_votes
            .iter()
            .fold(builder, |b, pv| b.add_party_votes(&pv.party_id, pv.votes));
        Ok(Some(builder.build()))
    }

    /// The counts a district is allocated with.
    ///
    /// The valid votes are the recorded ones, otherwise the total minus the invalid votes.
    /// With `estimate_invalid`, a district without invalid votes is assumed to have 5% of
    /// its total votes invalid. A district with only party votes uses their sum.
    pub fn district_counts(
        &self,
        year: u32,
        district_id: &str,
        estimate_invalid: bool,
    ) -> Result<Option<DistrictCounts>, StoreError> {
        match self.district_result(year, district_id) {
            Some(dr) => Ok(Some(district_counts(dr, estimate_invalid)?)),
            None => Ok(None),
        }
    }

    /// Sums the counts of all the districts of a year, as they enter the allocation.
    pub fn year_summary(&self, year: u32, estimate_invalid: bool) -> Result<YearSummary, StoreError> {
        let er = self
            .results_by_year(year)
            .ok_or(StoreError::MissingYear(year))?;
        let mut summary = YearSummary {
            year,
            total_votes: 0,
            total_invalid_votes: 0,
            total_valid_votes: 0,
            districts: 0,
        };
        for dr in er.district_results.iter() {
            let counts = district_counts(dr, estimate_invalid)?;
            summary.total_votes += counts.total_votes;
            summary.total_invalid_votes += counts.invalid_votes;
            summary.total_valid_votes += counts.valid_votes;
            summary.districts += 1;
        }
        Ok(summary)
    }

    fn province_mut(&mut self, province_id: &str) -> Result<&mut Province, StoreError> {
        self.provinces
            .iter_mut()
            .find(|p| p.id == province_id)
            .ok_or_else(|| StoreError::UnknownProvince(province_id.to_string()))
    }

    fn district_result_mut(
        &mut self,
        year: u32,
        district_id: &str,
    ) -> Result<&mut DistrictResult, StoreError> {
        if self.find_district(district_id).is_none() {
            return Err(StoreError::UnknownDistrict(district_id.to_string()));
        }
        let er = self.results.entry(year).or_insert_with(|| ElectionResult {
            year,
            district_results: Vec::new(),
        });
        let idx = match er
            .district_results
            .iter()
            .position(|dr| dr.district_id == district_id)
        {
            Some(idx) => idx,
            None => {
                er.district_results.push(DistrictResult::new(district_id));
                er.district_results.len() - 1
            }
        };
        Ok(&mut er.district_results[idx])
    }

    fn remove_results_of(&mut self, district_id: &str) {
        for er in self.results.values_mut() {
            er.district_results.retain(|dr| dr.district_id != district_id);
        }
    }
}

fn district_counts(dr: &DistrictResult, estimate_invalid: bool) -> Result<DistrictCounts, StoreError> {
    let invalid_counts = |source| StoreError::InvalidCounts {
        district_id: dr.district_id.clone(),
        source,
    };
    if let Some(valid_votes) = dr.valid_votes {
        return Ok(DistrictCounts {
            total_votes: dr.total_votes,
            invalid_votes: dr.invalid_votes,
            valid_votes,
        });
    }
    if dr.total_votes == 0 && dr.invalid_votes == 0 {
        let mut sum: i64 = 0;
        for pv in dr.party_votes.iter() {
            sum = sum
                .checked_add(pv.votes)
                .ok_or_else(|| StoreError::VoteCountOverflow(dr.district_id.clone()))?;
        }
        return Ok(DistrictCounts {
            total_votes: sum,
            invalid_votes: 0,
            valid_votes: sum,
        });
    }
    let invalid_votes = if estimate_invalid && dr.invalid_votes == 0 && dr.total_votes > 0 {
        let estimated = estimate_invalid_votes(dr.total_votes as u64) as i64;
        debug!(
            "district_counts: {}: estimated {} invalid votes",
            dr.district_id, estimated
        );
        estimated
    } else {
        dr.invalid_votes
    };
    let valid_votes = derive_valid_votes(dr.total_votes, invalid_votes).map_err(invalid_counts)?;
    Ok(DistrictCounts {
        total_votes: dr.total_votes,
        invalid_votes,
        valid_votes,
    })
}
