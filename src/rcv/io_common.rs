use std::path::Path;

use crate::rcv::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Reads a rank. An empty cell is an unranked choice.
pub fn parse_rank(content: &str, lineno: usize) -> RcvResult<i64> {
    let s = content.trim();
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<i64>().ok().context(InvalidRankSnafu {
        lineno,
        content: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/polls/lunch.csv"), "lunch.csv");
        assert_eq!(simplify_file_name("lunch.csv"), "lunch.csv");
    }

    #[test]
    fn ranks() {
        assert_eq!(parse_rank(" 2 ", 1).unwrap(), 2);
        assert_eq!(parse_rank("", 1).unwrap(), 0);
        assert_eq!(parse_rank("-1", 1).unwrap(), -1);
        assert!(matches!(
            parse_rank("first", 4),
            Err(RcvError::InvalidRank { lineno: 4, .. })
        ));
    }
}
