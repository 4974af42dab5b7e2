use serde::Deserialize;

use crate::rcv::*;

#[derive(Debug, Clone, Deserialize)]
struct JsonVote {
    voter: JSValue,
    candidate: String,
    rank: Option<i64>,
}

fn read_voter(voter: &JSValue, lineno: usize) -> RcvResult<String> {
    match voter {
        JSValue::String(s) => Ok(s.clone()),
        JSValue::Number(n) => Ok(n.to_string()),
        x => whatever!("Entry {}: cannot use {} as a voter", lineno, x),
    }
}

/// Reads the votes from a JSON array of `{"voter", "candidate", "rank"}` objects.
///
/// A missing or null rank is an unranked choice.
pub fn read_json_votes(path: String) -> RcvResult<Vec<VoteRow>> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let votes: Vec<JsonVote> = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let mut res: Vec<VoteRow> = Vec::new();
    for (idx, v) in votes.iter().enumerate() {
        res.push(VoteRow {
            voter: read_voter(&v.voter, idx + 1)?,
            candidate: v.candidate.clone(),
            rank: v.rank.unwrap_or(0),
        });
    }
    Ok(res)
}
