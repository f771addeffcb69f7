use crate::seats::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub year: u32,
    pub threshold: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    pub color: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DistrictEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "seatAllocation")]
    pub seat_allocation: i64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ProvinceEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub districts: Vec<DistrictEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyVotesEntry {
    #[serde(rename = "partyId")]
    pub party_id: String,
    pub votes: i64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DistrictResultEntry {
    #[serde(rename = "districtId")]
    pub district_id: String,
    /// Defaults to the year of the configuration.
    pub year: Option<u32>,
    #[serde(rename = "totalVotes")]
    pub total_votes: Option<i64>,
    #[serde(rename = "invalidVotes")]
    pub invalid_votes: Option<i64>,
    #[serde(rename = "validVotes")]
    pub valid_votes: Option<i64>,
    #[serde(rename = "partyVotes", default)]
    pub party_votes: Vec<PartyVotesEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub year: Option<u32>,
    /// The district of all the rows, for files without a district column.
    #[serde(rename = "districtId")]
    pub district_id: Option<String>,
    #[serde(rename = "districtColumnIndex")]
    _district_column_index: Option<JSValue>,
    #[serde(rename = "partyColumnIndex")]
    _party_column_index: Option<JSValue>,
    #[serde(rename = "votesColumnIndex")]
    _votes_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    /// Zero-based. None when the rows carry no district.
    pub fn district_column_index(&self) -> SeatsResult<Option<usize>> {
        match read_column_index(&self._district_column_index)? {
            Some(x) => Ok(Some(x)),
            None if self.district_id.is_some() => Ok(None),
            None => Ok(Some(0)),
        }
    }

    /// Zero-based. By default the column after the district column.
    pub fn party_column_index(&self) -> SeatsResult<usize> {
        match read_column_index(&self._party_column_index)? {
            Some(x) => Ok(x),
            None => Ok(self.district_column_index()?.map_or(0, |x| x + 1)),
        }
    }

    /// Zero-based. By default the column after the party column.
    pub fn votes_column_index(&self) -> SeatsResult<usize> {
        match read_column_index(&self._votes_column_index)? {
            Some(x) => Ok(x),
            None => Ok(self.party_column_index()? + 1),
        }
    }

    /// One-based, like the rows of a spreadsheet. The first row is a header by default.
    pub fn first_vote_row_index(&self) -> SeatsResult<usize> {
        match read_column_index(&self._first_vote_row_index)? {
            Some(x) => Ok(x + 1),
            None => Ok(2),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatRules {
    #[serde(rename = "thresholdPercent")]
    pub threshold_percent: Option<u32>,
    #[serde(rename = "thresholdRounding")]
    pub threshold_rounding: Option<String>,
    #[serde(rename = "estimateInvalidVotes")]
    pub estimate_invalid_votes: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub year: u32,
    pub parties: Vec<PartyEntry>,
    pub provinces: Vec<ProvinceEntry>,
    #[serde(rename = "districtResults", default)]
    pub district_results: Vec<DistrictResultEntry>,
    #[serde(rename = "tallySources", default)]
    pub tally_sources: Vec<FileSource>,
    #[serde(default)]
    pub rules: SeatRules,
}

pub fn read_config(path: &str) -> SeatsResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> SeatsResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn validate_rules(seat_rules: &SeatRules) -> SeatsResult<AllocationRules> {
    let res = AllocationRules {
        threshold_percent: match seat_rules.threshold_percent {
            None => AllocationRules::DEFAULT_RULES.threshold_percent,
            Some(x) if x <= 100 => x,
            Some(x) => whatever!("thresholdPercent must be at most 100, got {}", x),
        },
        threshold_rounding: match seat_rules.threshold_rounding.as_deref() {
            None | Some("floor") => ThresholdRounding::Floor,
            Some("exact") => ThresholdRounding::Exact,
            Some(x) => whatever!("Unknown thresholdRounding {:?}", x),
        },
    };
    Ok(res)
}

// Column and row indexes follow the spreadsheet conventions: numbers start at 1,
// letters are column names ("A", "AB").
fn read_column_index(x: &Option<JSValue>) -> SeatsResult<Option<usize>> {
    match x {
        None | Some(JSValue::Null) => Ok(None),
        Some(JSValue::Number(n)) => match n.as_u64() {
            Some(i) if i >= 1 => Ok(Some((i - 1) as usize)),
            _ => ParsingJsonNumberSnafu {
                value: n.to_string(),
            }
            .fail(),
        },
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            let mut idx: usize = 0;
            for c in s.to_ascii_uppercase().chars() {
                let digit = (c as usize) - ('A' as usize) + 1;
                idx = idx
                    .checked_mul(26)
                    .and_then(|x| x.checked_add(digit))
                    .context(ParsingJsonNumberSnafu { value: s.clone() })?;
            }
            Ok(Some(idx - 1))
        }
        Some(JSValue::String(s)) => match s.trim().parse::<usize>() {
            Ok(i) if i >= 1 => Ok(Some(i - 1)),
            _ => ParsingJsonNumberSnafu { value: s.clone() }.fail(),
        },
        Some(v) => ParsingJsonNumberSnafu {
            value: v.to_string(),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(js: JSValue) -> FileSource {
        serde_json::from_value(js).unwrap()
    }

    #[test]
    fn column_indexes() {
        assert_eq!(read_column_index(&None).unwrap(), None);
        assert_eq!(read_column_index(&Some(json!(1))).unwrap(), Some(0));
        assert_eq!(read_column_index(&Some(json!("3"))).unwrap(), Some(2));
        assert_eq!(read_column_index(&Some(json!("C"))).unwrap(), Some(2));
        assert_eq!(read_column_index(&Some(json!("aa"))).unwrap(), Some(26));
        assert!(read_column_index(&Some(json!(0))).is_err());
        assert!(read_column_index(&Some(json!("C3"))).is_err());
        assert!(read_column_index(&Some(json!(true))).is_err());
        assert!(matches!(
            read_column_index(&Some(json!("AAAAAAAAAAAAAAAAAAAAAAAA"))),
            Err(SeatsError::ParsingJsonNumber { .. })
        ));
    }

    #[test]
    fn default_columns() {
        let with_district = source(json!({"provider": "csv", "filePath": "a.csv"}));
        assert_eq!(with_district.district_column_index().unwrap(), Some(0));
        assert_eq!(with_district.party_column_index().unwrap(), 1);
        assert_eq!(with_district.votes_column_index().unwrap(), 2);
        assert_eq!(with_district.first_vote_row_index().unwrap(), 2);

        let single = source(json!({"provider": "csv", "filePath": "a.csv", "districtId": "galle"}));
        assert_eq!(single.district_column_index().unwrap(), None);
        assert_eq!(single.party_column_index().unwrap(), 0);
        assert_eq!(single.votes_column_index().unwrap(), 1);

        let explicit = source(json!({
            "provider": "xlsx", "filePath": "a.xlsx",
            "districtColumnIndex": "B", "partyColumnIndex": 4, "votesColumnIndex": "F",
            "firstVoteRowIndex": 1
        }));
        assert_eq!(explicit.district_column_index().unwrap(), Some(1));
        assert_eq!(explicit.party_column_index().unwrap(), 3);
        assert_eq!(explicit.votes_column_index().unwrap(), 5);
        assert_eq!(explicit.first_vote_row_index().unwrap(), 1);
    }

    #[test]
    fn rules() {
        let r = validate_rules(&SeatRules::default()).unwrap();
        assert_eq!(r, AllocationRules::DEFAULT_RULES);

        let r = validate_rules(&SeatRules {
            threshold_percent: Some(12),
            threshold_rounding: Some("exact".to_string()),
            estimate_invalid_votes: None,
        })
        .unwrap();
        assert_eq!(r.threshold_percent, 12);
        assert_eq!(r.threshold_rounding, ThresholdRounding::Exact);

        assert!(validate_rules(&SeatRules {
            threshold_rounding: Some("ceiling".to_string()),
            ..SeatRules::default()
        })
        .is_err());
        assert!(validate_rules(&SeatRules {
            threshold_percent: Some(140),
            ..SeatRules::default()
        })
        .is_err());
    }
}
