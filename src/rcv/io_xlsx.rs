use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::rcv::{io_common::parse_rank, *};

/// Reads the votes from an Excel worksheet with a header and the columns
/// `voter`, `candidate`, `rank`.
pub fn read_excel_votes(path: String, worksheet_name: Option<String>) -> RcvResult<Vec<VoteRow>> {
    let wrange = get_range(&path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu { path: path.clone() })?;
    debug!("read_excel_votes: header: {:?}", header);

    let mut res: Vec<VoteRow> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // The header is row 1.
        let lineno = idx + 2;
        debug!("read_excel_votes: row {:?}: {:?}", lineno, row);
        let voter = read_text(get_cell(row, 0, lineno)?, lineno)?;
        let candidate = read_text(get_cell(row, 1, lineno)?, lineno)?;
        if voter.is_empty() && candidate.is_empty() {
            // Trailing empty rows.
            continue;
        }
        let rank = match get_cell(row, 2, lineno)? {
            DataType::Int(i) => *i,
            DataType::Float(f) if f.fract() == 0.0 => *f as i64,
            DataType::String(s) => parse_rank(s, lineno)?,
            DataType::Empty => 0,
            x => {
                return Err(RcvError::ExcelWrongCellType {
                    lineno,
                    content: format!("{:?}", x),
                });
            }
        };
        res.push(VoteRow {
            voter,
            candidate,
            rank,
        });
    }
    Ok(res)
}

fn get_cell(row: &[DataType], col: usize, lineno: usize) -> RcvResult<&DataType> {
    row.get(col).context(ExcelWrongCellTypeSnafu {
        lineno,
        content: format!("{:?}", row),
    })
}

fn read_text(cell: &DataType, lineno: usize) -> RcvResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok((*f as i64).to_string()),
        DataType::Empty => Ok("".to_string()),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn get_range(path: &String, worksheet_name: Option<String>) -> RcvResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet) = worksheet_name {
        let wrange = workbook
            .worksheet_range(&worksheet)
            .context(MissingWorksheetSnafu {
                worksheet: worksheet.clone(),
                path: path.clone(),
            })?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path: path.clone() }.fail(),
            [(worksheet, wrange)] => {
                debug!("get_range: using worksheet {:?}", worksheet);
                Ok(wrange.clone())
            }
            _ => TooManyWorksheetsSnafu { path: path.clone() }.fail(),
        }
    }
}
