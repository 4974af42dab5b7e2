// Primitives for reading CSV files.

use crate::rcv::{io_common::parse_rank, *};

/// Reads the votes from a CSV file with a header and the columns
/// `voter,candidate,rank`.
pub fn read_csv_votes(path: String) -> RcvResult<Vec<VoteRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .context(CsvOpenSnafu { path: path.clone() })?;

    let mut res: Vec<VoteRow> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_votes: {:?} {:?}", lineno, line);
        let voter = line.get(0).context(CsvLineTooShortSnafu { lineno })?;
        let candidate = line.get(1).context(CsvLineTooShortSnafu { lineno })?;
        let rank = line.get(2).context(CsvLineTooShortSnafu { lineno })?;
        res.push(VoteRow {
            voter: voter.to_string(),
            candidate: candidate.to_string(),
            rank: parse_rank(rank, lineno)?,
        });
    }
    Ok(res)
}
