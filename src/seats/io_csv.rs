// Primitives for reading CSV files.

use std::fs::File;

use crate::seats::{
    io_common::{simplify_file_name, ParsedTally, TallyColumns},
    *,
};

pub fn read_csv_tally(path: &str, cfs: &FileSource) -> SeatsResult<Vec<ParsedTally>> {
    let columns = TallyColumns::from_source(cfs)?;
    let (records, row_offset) = get_records(path, cfs)?;
    let file_name = simplify_file_name(path);

    let mut res: Vec<ParsedTally> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset;
        debug!("{}: {:?} {:?}", file_name, lineno, line_r);
        let line = line_r.context(CsvLineParseSnafu {})?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if let Some(t) = columns.read_row(&cells, lineno)? {
            res.push(t);
        }
    }
    Ok(res)
}

fn get_records(path: &str, cfs: &FileSource) -> SeatsResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
