use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::seats::{
    io_common::{simplify_file_name, ParsedTally, TallyColumns},
    *,
};

pub fn read_excel_tally(path: &str, cfs: &FileSource) -> SeatsResult<Vec<ParsedTally>> {
    let columns = TallyColumns::from_source(cfs)?;
    let first_row = cfs.first_vote_row_index()?;
    let wrange = get_range(path, cfs)?;
    // The range starts at the first non-empty cell, not at A1.
    let (start_row, start_col) = wrange.start().unwrap_or((0, 0));
    debug!(
        "read_excel_tally: {}: range starts at {:?}",
        simplify_file_name(path),
        (start_row, start_col)
    );

    let mut res: Vec<ParsedTally> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let lineno = start_row as usize + idx + 1;
        if lineno < first_row {
            continue;
        }
        let mut cells: Vec<String> = vec![String::new(); start_col as usize];
        for cell in row.iter() {
            cells.push(cell_to_string(cell, lineno)?);
        }
        if let Some(t) = columns.read_row(&cells, lineno)? {
            res.push(t);
        }
    }
    Ok(res)
}

fn cell_to_string(cell: &DataType, lineno: usize) -> SeatsResult<String> {
    match cell {
        DataType::Empty => Ok(String::new()),
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        x => ExcelWrongCellTypeSnafu {
            lineno: lineno as u64,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn get_range(path: &str, cfs: &FileSource) -> SeatsResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_excel_tally: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_tally: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            [] => EmptyExcelSnafu { path }.fail(),
            _ => whatever!(
                "{}: several worksheets, excelWorksheetName must be provided",
                path
            ),
        }
    }
}
