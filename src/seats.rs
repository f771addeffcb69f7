use log::{debug, info, warn};

use seat_allocation::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::seats::config_reader::*;
use crate::seats::io_common::ParsedTally;
use seat_allocation::store::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SeatsError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No usable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Line {lineno}: could not understand cell {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Not a column index: {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line: {source}"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    LineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: cannot read a vote count from {content:?}"))]
    VoteCountParse { lineno: usize, content: String },
    #[snafu(display("Unknown district {district_id}"))]
    UnknownDistrict { district_id: String },
    #[snafu(display("Election data: {source}"))]
    Store { source: StoreError },
    #[snafu(display("District {district_id}: {source}"))]
    Allocation {
        source: InvalidInputError,
        district_id: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the calculated summary and the reference summary {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SeatsResult<T> = Result<T, SeatsError>;

/// What to run, as requested on the command line.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub config_path: String,
    pub reference: Option<String>,
    pub out: Option<String>,
    pub year: Option<u32>,
    pub district: Option<String>,
}

/// One calculated district, with the province it belongs to.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProvinceOutcome {
    pub province_id: String,
    pub outcome: DistrictAllocationOutcome,
}

fn party_results_to_json(store: &ElectionStore, outcome: &DistrictAllocationOutcome) -> Vec<JSValue> {
    outcome
        .party_results
        .iter()
        .map(|pr| {
            json!({
                "partyId": pr.party_id,
                "partyName": store.party(&pr.party_id).map(|p| p.name.clone()),
                "votes": pr.votes,
                "qualifies": pr.qualifies,
                "seatsFirstRound": pr.seats_first_round,
                "seatsSecondRound": pr.seats_second_round,
                "bonusSeat": pr.bonus_seat,
                "totalSeats": pr.total_seats,
            })
        })
        .collect()
}

fn outcome_to_json(store: &ElectionStore, po: &ProvinceOutcome) -> JSValue {
    let outcome = &po.outcome;
    json!({
        "districtId": outcome.district_id,
        "districtName": outcome.district_name,
        "provinceId": po.province_id,
        "totalSeats": outcome.total_seats,
        "validVotes": outcome.valid_votes,
        "invalidVotes": outcome.invalid_votes,
        "thresholdVotes": outcome.threshold_votes,
        "votesPerSeat": outcome.votes_per_seat,
        "unassignedSeats": outcome.unassigned_seats,
        "disqualifiedParties": outcome.disqualified_party_ids,
        "partyResults": party_results_to_json(store, outcome),
    })
}

fn summaries_to_json(store: &ElectionStore, summaries: &[PartyNationalSummary]) -> Vec<JSValue> {
    summaries
        .iter()
        .map(|s| {
            json!({
                "partyId": s.party_id,
                "partyName": store.party(&s.party_id).map(|p| p.name.clone()),
                "totalVotes": s.total_votes,
                "totalSeats": s.total_seats,
                "bonusSeats": s.bonus_seats,
                "districtsContested": s.districts_contested,
            })
        })
        .collect()
}

fn build_summary_js(
    config: &ElectionConfig,
    store: &ElectionStore,
    year: u32,
    rules: &AllocationRules,
    estimate_invalid: bool,
    outcomes: &[ProvinceOutcome],
) -> SeatsResult<JSValue> {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        year,
        threshold: format!(
            "{}% ({:?})",
            rules.threshold_percent, rules.threshold_rounding
        ),
    };
    let totals = store
        .year_summary(year, estimate_invalid)
        .context(StoreSnafu {})?;

    let mut provinces: Vec<JSValue> = Vec::new();
    for province in store.provinces() {
        let in_province: Vec<DistrictAllocationOutcome> = outcomes
            .iter()
            .filter(|po| po.province_id == province.id)
            .map(|po| po.outcome.clone())
            .collect();
        if in_province.is_empty() {
            continue;
        }
        let summaries = aggregate_across_districts(&in_province);
        provinces.push(json!({
            "provinceId": province.id,
            "provinceName": province.name,
            "parties": summaries_to_json(store, &summaries),
        }));
    }

    let all: Vec<DistrictAllocationOutcome> = outcomes.iter().map(|po| po.outcome.clone()).collect();
    let national = aggregate_across_districts(&all);

    Ok(json!({
        "config": c,
        "totals": {
            "totalVotes": totals.total_votes,
            "totalInvalidVotes": totals.total_invalid_votes,
            "totalValidVotes": totals.total_valid_votes,
            "districts": totals.districts,
        },
        "districts": outcomes.iter().map(|po| outcome_to_json(store, po)).collect::<Vec<JSValue>>(),
        "provinces": provinces,
        "national": summaries_to_json(store, &national),
    }))
}

fn read_tally_data(root_path: &Path, cfs: &FileSource) -> SeatsResult<Vec<ParsedTally>> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read tally file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_tally(&p2, cfs),
        "xlsx" | "excel" => io_xlsx::read_excel_tally(&p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

/// Loads the parties, districts and all the recorded tallies of a configuration.
pub fn load_store(config: &ElectionConfig, root_path: &Path) -> SeatsResult<ElectionStore> {
    let mut store = ElectionStore::new();
    for p in config.parties.iter() {
        store.add_party(Party {
            id: p.id.clone(),
            name: p.name.clone(),
            short_name: p.short_name.clone().unwrap_or_else(|| p.id.to_uppercase()),
            color: p.color.clone(),
        })
        .context(StoreSnafu {})?;
    }
    for prov in config.provinces.iter() {
        store.add_province(Province {
            id: prov.id.clone(),
            name: prov.name.clone(),
            districts: Vec::new(),
        })
        .context(StoreSnafu {})?;
        for d in prov.districts.iter() {
            store.add_district(
                &prov.id,
                District {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    seat_allocation: d.seat_allocation,
                },
            )
            .context(StoreSnafu {})?;
        }
    }

    for dr in config.district_results.iter() {
        let year = dr.year.unwrap_or(config.year);
        store.set_district_totals(
            year,
            &dr.district_id,
            dr.total_votes.unwrap_or(0),
            dr.invalid_votes.unwrap_or(0),
            dr.valid_votes,
        )
        .context(StoreSnafu {})?;
        for pv in dr.party_votes.iter() {
            store
                .update_district_result(year, &dr.district_id, &pv.party_id, pv.votes)
                .context(StoreSnafu {})?;
        }
    }

    debug!(
        "load_store: {} parties, {} provinces",
        store.parties().len(),
        store.provinces().len()
    );

    for cfs in config.tally_sources.iter() {
        let year = cfs.year.unwrap_or(config.year);
        let tallies = read_tally_data(root_path, cfs)?;
        debug!("load_store: {} rows read from {}", tallies.len(), cfs.file_path);
        for t in tallies {
            let district_id = match t.district_id.clone().or_else(|| cfs.district_id.clone()) {
                Some(x) => x,
                None => whatever!(
                    "{}: line {}: no district column and no districtId for this source",
                    cfs.file_path,
                    t.lineno
                ),
            };
            store
                .update_district_result(year, &district_id, &t.party_id, t.votes)
                .context(StoreSnafu {})?;
        }
    }
    Ok(store)
}

/// Calculates all the districts of a year, one task per district.
///
/// Districts without any recorded result for the year are skipped.
pub fn allocate_year(
    store: &ElectionStore,
    year: u32,
    only_district: Option<&str>,
    rules: &AllocationRules,
    estimate_invalid: bool,
) -> SeatsResult<Vec<ProvinceOutcome>> {
    if let Some(district_id) = only_district {
        ensure!(
            store.find_district(district_id).is_some(),
            UnknownDistrictSnafu { district_id }
        );
    }

    let mut contexts: Vec<(String, DistrictElectionContext)> = Vec::new();
    for province in store.provinces() {
        for district in province.districts.iter() {
            if only_district.map_or(false, |x| x != district.id) {
                continue;
            }
            match store
                .district_context(year, &district.id, estimate_invalid)
                .context(StoreSnafu {})?
            {
                Some(ctx) => contexts.push((province.id.clone(), ctx)),
                None => warn!(
                    "allocate_year: no results recorded for district {} in {}",
                    district.id, year
                ),
            }
        }
    }
    info!(
        "allocate_year: {}: calculating {} districts",
        year,
        contexts.len()
    );

    let outcomes: Result<Vec<ProvinceOutcome>, (String, InvalidInputError)> = contexts
        .par_iter()
        .map(|(province_id, ctx)| {
            allocate_seats_with_rules(ctx, rules)
                .map(|outcome| ProvinceOutcome {
                    province_id: province_id.clone(),
                    outcome,
                })
                .map_err(|e| (ctx.district_id.clone(), e))
        })
        .collect();
    outcomes.map_err(|(district_id, source)| SeatsError::Allocation {
        source,
        district_id,
    })
}

fn summary_path(settings: &RunSettings, config: &ElectionConfig, root_path: &Path) -> Option<String> {
    match settings.out.clone() {
        Some(x) => Some(x),
        None => config.output_settings.output_directory.clone().map(|dir| {
            let file_name = format!("{}_summary.json", config.output_settings.contest_name);
            root_path.join(dir).join(file_name).display().to_string()
        }),
    }
}

pub fn run_election(settings: &RunSettings) -> SeatsResult<JSValue> {
    let config = read_config(&settings.config_path)?;
    info!("config: {:?}", config.output_settings);

    let rules = validate_rules(&config.rules)?;
    let estimate_invalid = config.rules.estimate_invalid_votes.unwrap_or(false);
    let year = settings.year.unwrap_or(config.year);

    let root_p = Path::new(settings.config_path.as_str())
        .parent()
        .context(MissingParentDirSnafu {
            path: settings.config_path.clone(),
        })?;
    let store = load_store(&config, root_p)?;

    let outcomes = allocate_year(
        &store,
        year,
        settings.district.as_deref(),
        &rules,
        estimate_invalid,
    )?;
    for po in outcomes.iter().filter(|po| po.outcome.has_overflow()) {
        warn!(
            "District {}: {} seats left unassigned, check the seat allocation and the tallies",
            po.outcome.district_id, po.outcome.unassigned_seats
        );
    }

    // Assemble the final json
    let result_js = build_summary_js(&config, &store, year, &rules, estimate_invalid, &outcomes)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match summary_path(settings, &config, root_p) {
        Some(x) if x == "stdout" => println!("{}", pretty_js_stats),
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(&path, &pretty_js_stats).context(WritingOutputSnafu { path })?;
        }
        None => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = settings.reference.clone() {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu { path: summary_p }.fail();
        }
    }

    Ok(result_js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r##"{
        "outputSettings": { "contestName": "test", "contestDate": "2025-05-06" },
        "year": 2025,
        "parties": [
            { "id": "A", "name": "Party A", "shortName": "A", "color": "#909d54" },
            { "id": "B", "name": "Party B" },
            { "id": "C", "name": "Party C" }
        ],
        "provinces": [
            { "id": "p1", "name": "Province 1",
              "districts": [
                { "id": "d1", "name": "District 1", "seatAllocation": 5 },
                { "id": "d2", "name": "District 2", "seatAllocation": 3 }
              ] }
        ],
        "districtResults": [
            { "districtId": "d1", "totalVotes": 105000, "invalidVotes": 5000,
              "partyVotes": [
                { "partyId": "A", "votes": 60000 },
                { "partyId": "B", "votes": 30000 },
                { "partyId": "C", "votes": 10000 }
              ] },
            { "districtId": "d2", "totalVotes": 10000, "invalidVotes": 0 }
        ],
        "tallySources": [
            { "provider": "csv", "filePath": "d2.csv", "districtId": "d2" }
        ]
    }"##;

    fn write_file(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path.display().to_string()
    }

    fn settings(config_path: String, out: String) -> RunSettings {
        RunSettings {
            config_path,
            reference: None,
            out: Some(out),
            year: None,
            district: None,
        }
    }

    #[test]
    fn runs_a_full_election() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "d2.csv", "party,votes\nA,4000\nB,\"6,000\"\n");
        let config_path = write_file(dir.path(), "config.json", CONFIG);
        let out = dir.path().join("summary.json").display().to_string();

        let js = run_election(&settings(config_path, out.clone())).unwrap();

        let written: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, js);

        let d1 = &js["districts"][0];
        assert_eq!(d1["validVotes"], json!(100000));
        assert_eq!(d1["thresholdVotes"], json!(5000));
        assert_eq!(d1["partyResults"][0]["totalSeats"], json!(4));
        assert_eq!(d1["partyResults"][0]["partyName"], json!("Party A"));
        assert_eq!(d1["partyResults"][1]["totalSeats"], json!(1));

        // d2: B has the bonus seat, then 6000 * 2 / 10000 = 1 and 4000 * 2 / 10000 = 0,
        // A gets the second round seat.
        let d2 = &js["districts"][1];
        assert_eq!(d2["partyResults"][0]["partyId"], json!("A"));
        assert_eq!(d2["partyResults"][0]["totalSeats"], json!(1));
        assert_eq!(d2["partyResults"][1]["totalSeats"], json!(2));

        assert_eq!(js["totals"]["totalVotes"], json!(115000));
        assert_eq!(js["totals"]["totalValidVotes"], json!(110000));
        let national = js["national"].as_array().unwrap();
        assert_eq!(national[0]["partyId"], json!("A"));
        assert_eq!(national[0]["totalSeats"], json!(5));
        assert_eq!(national[0]["totalVotes"], json!(64000));
        assert_eq!(national[1]["totalSeats"], json!(3));
        assert_eq!(js["provinces"][0]["parties"], js["national"]);
    }

    #[test]
    fn matches_its_own_reference() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "d2.csv", "party,votes\nA,4000\nB,6000\n");
        let config_path = write_file(dir.path(), "config.json", CONFIG);
        let out = dir.path().join("summary.json").display().to_string();
        run_election(&settings(config_path.clone(), out.clone())).unwrap();

        let mut s = settings(config_path.clone(), dir.path().join("again.json").display().to_string());
        s.reference = Some(out);
        assert!(run_election(&s).is_ok());

        let other = write_file(dir.path(), "other.json", r#"{"results": []}"#);
        s.reference = Some(other);
        assert!(matches!(
            run_election(&s),
            Err(SeatsError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn restricts_to_one_district() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "d2.csv", "party,votes\nA,4000\nB,6000\n");
        let config_path = write_file(dir.path(), "config.json", CONFIG);
        let mut s = settings(config_path, dir.path().join("s.json").display().to_string());
        s.district = Some("d2".to_string());
        let js = run_election(&s).unwrap();
        assert_eq!(js["districts"].as_array().unwrap().len(), 1);
        assert_eq!(js["districts"][0]["districtId"], json!("d2"));

        s.district = Some("nowhere".to_string());
        assert!(matches!(
            run_election(&s),
            Err(SeatsError::UnknownDistrict { .. })
        ));
    }

    #[test]
    fn reports_the_district_of_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        // More party votes than valid votes in d2.
        write_file(dir.path(), "d2.csv", "party,votes\nA,8000\nB,6000\n");
        let config_path = write_file(dir.path(), "config.json", CONFIG);
        let s = settings(config_path, dir.path().join("s.json").display().to_string());
        match run_election(&s) {
            Err(SeatsError::Allocation {
                district_id,
                source: InvalidInputError::PartyVotesExceedValidVotes { .. },
            }) => assert_eq!(district_id, "d2"),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn tally_with_unknown_party_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "d2.csv", "party,votes\nZ,4000\n");
        let config_path = write_file(dir.path(), "config.json", CONFIG);
        let s = settings(config_path, dir.path().join("s.json").display().to_string());
        assert!(matches!(
            run_election(&s),
            Err(SeatsError::Store {
                source: StoreError::UnknownParty(_)
            })
        ));
    }

    #[test]
    fn totals_follow_the_allocated_counts() {
        let dir = tempfile::tempdir().unwrap();
        // d1 has no invalid count, d2 only party votes.
        let config = r#"{
            "outputSettings": { "contestName": "estimated" },
            "year": 2025,
            "parties": [ { "id": "A", "name": "Party A" }, { "id": "B", "name": "Party B" } ],
            "provinces": [
                { "id": "p1", "name": "Province 1",
                  "districts": [
                    { "id": "d1", "name": "District 1", "seatAllocation": 5 },
                    { "id": "d2", "name": "District 2", "seatAllocation": 3 }
                  ] }
            ],
            "districtResults": [
                { "districtId": "d1", "totalVotes": 100000,
                  "partyVotes": [ { "partyId": "A", "votes": 60000 }, { "partyId": "B", "votes": 30000 } ] },
                { "districtId": "d2",
                  "partyVotes": [ { "partyId": "A", "votes": 600 }, { "partyId": "B", "votes": 400 } ] }
            ],
            "rules": { "estimateInvalidVotes": true }
        }"#;
        let config_path = write_file(dir.path(), "config.json", config);
        let js = run_election(&settings(config_path, dir.path().join("s.json").display().to_string())).unwrap();

        let districts = js["districts"].as_array().unwrap();
        let valid: u64 = districts.iter().map(|d| d["validVotes"].as_u64().unwrap()).sum();
        let invalid: u64 = districts.iter().map(|d| d["invalidVotes"].as_u64().unwrap()).sum();
        assert_eq!(valid, 96000);
        assert_eq!(invalid, 5000);
        assert_eq!(js["totals"]["totalValidVotes"], json!(valid));
        assert_eq!(js["totals"]["totalInvalidVotes"], json!(invalid));
        assert_eq!(js["totals"]["totalVotes"], json!(101000));
    }
}
