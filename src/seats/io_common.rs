use std::path::Path;

use crate::seats::*;

/// One row of a tally file: the votes of a party, in a district if the file says which.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedTally {
    pub district_id: Option<String>,
    pub party_id: String,
    pub votes: i64,
    pub lineno: usize,
}

/// The zero-based columns read from each row.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TallyColumns {
    district: Option<usize>,
    party: usize,
    votes: usize,
}

impl TallyColumns {
    pub fn from_source(cfs: &FileSource) -> SeatsResult<TallyColumns> {
        Ok(TallyColumns {
            district: cfs.district_column_index()?,
            party: cfs.party_column_index()?,
            votes: cfs.votes_column_index()?,
        })
    }

    /// Returns None for the rows without a party, such as blank lines at the end of a sheet.
    pub fn read_row(&self, row: &[String], lineno: usize) -> SeatsResult<Option<ParsedTally>> {
        let cell = |idx: usize| -> SeatsResult<String> {
            row.get(idx)
                .map(|s| s.trim().to_string())
                .context(LineTooShortSnafu { lineno })
        };
        let party_id = match row.get(self.party) {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Ok(None),
        };
        let district_id = match self.district {
            Some(idx) => Some(cell(idx)?),
            None => None,
        };
        let votes = parse_votes(&cell(self.votes)?, lineno)?;
        Ok(Some(ParsedTally {
            district_id,
            party_id,
            votes,
            lineno,
        }))
    }
}

/// Vote counts are often typed with separators: "12,345" or "12 345".
pub fn parse_votes(content: &str, lineno: usize) -> SeatsResult<i64> {
    let cleaned: String = content
        .chars()
        .filter(|c| !(*c == ',' || *c == '_' || c.is_whitespace()))
        .collect();
    cleaned
        .parse::<i64>()
        .ok()
        .context(VoteCountParseSnafu {
            lineno,
            content: content.to_string(),
        })
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn vote_counts() {
        assert_eq!(parse_votes("12345", 1).unwrap(), 12345);
        assert_eq!(parse_votes(" 12,345 ", 1).unwrap(), 12345);
        assert_eq!(parse_votes("1 200_000", 1).unwrap(), 1200000);
        assert_eq!(parse_votes("-3", 1).unwrap(), -3);
        assert!(matches!(
            parse_votes("twelve", 7),
            Err(SeatsError::VoteCountParse { lineno: 7, .. })
        ));
        assert!(parse_votes("12.5", 1).is_err());
    }

    #[test]
    fn rows() {
        let cols = TallyColumns {
            district: Some(0),
            party: 1,
            votes: 2,
        };
        let t = cols.read_row(&row(&["galle", " unp ", "1,000"]), 4).unwrap();
        assert_eq!(
            t,
            Some(ParsedTally {
                district_id: Some("galle".to_string()),
                party_id: "unp".to_string(),
                votes: 1000,
                lineno: 4,
            })
        );
        assert_eq!(cols.read_row(&row(&["galle", "", ""]), 5).unwrap(), None);
        assert!(matches!(
            cols.read_row(&row(&["galle", "unp"]), 6),
            Err(SeatsError::LineTooShort { lineno: 6 })
        ));

        let single = TallyColumns {
            district: None,
            party: 0,
            votes: 1,
        };
        let t = single.read_row(&row(&["slfp", "42"]), 2).unwrap().unwrap();
        assert_eq!(t.district_id, None);
        assert_eq!(t.votes, 42);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/2025/galle.csv"), "galle.csv");
        assert_eq!(simplify_file_name("galle.xlsx"), "galle.xlsx");
    }
}
