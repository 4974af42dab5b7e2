use log::{debug, info, warn};

use ranked_choice::builder::{candidate_digest, Builder};
use ranked_choice::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::rcv::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum RcvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet {worksheet} in {path}"))]
    MissingWorksheet { worksheet: String, path: String },
    #[snafu(display("The file {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The file {path} has several worksheets, one must be chosen"))]
    TooManyWorksheets { path: String },
    #[snafu(display("Row {lineno}: could not understand {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: {content:?} is not a rank"))]
    InvalidRank { lineno: usize, content: String },
    #[snafu(display("Unknown input type {input_type}"))]
    UnknownInputType { input_type: String },
    #[snafu(display("No input: either a configuration or a vote file is required"))]
    MissingInput {},
    #[snafu(display("Both a configuration {config} and a vote file {input} were given, only one is accepted"))]
    ConflictingInputs { config: String, input: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error while tabulating the poll: {source}"))]
    Tabulation { source: VotingErrors },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RcvResult<T> = Result<T, RcvError>;

/// One stored vote, as read from a vote file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRow {
    pub voter: String,
    pub candidate: String,
    pub rank: i64,
}

fn read_vote_rows(
    path: String,
    provider: &str,
    worksheet_name: Option<String>,
) -> RcvResult<Vec<VoteRow>> {
    info!("Attempting to read vote file {:?} ({})", path, provider);
    let rows = match provider {
        "csv" => io_csv::read_csv_votes(path),
        "json" => io_json::read_json_votes(path),
        "xlsx" => io_xlsx::read_excel_votes(path, worksheet_name),
        x => UnknownInputTypeSnafu { input_type: x }.fail(),
    }?;
    debug!("read_vote_rows: {} rows", rows.len());
    Ok(rows)
}

fn validate_candidates(candidates: &[RcvCandidate]) -> Vec<Candidate> {
    candidates
        .iter()
        .map(|c| Candidate {
            id: match c.id.clone() {
                Some(x) if !x.is_empty() => x,
                _ => candidate_digest(&c.label),
            },
            label: c.label.clone(),
        })
        .collect()
}

fn build_summary_js(output: &OutputConfig, outcome: &Outcome) -> RcvResult<JSValue> {
    let results = serde_json::to_value(outcome).context(ParsingJsonSnafu {})?;
    Ok(json!({
        "config": output,
        "results": results }))
}

fn write_summary(summary: &str, out_path: Option<String>) -> RcvResult<()> {
    match out_path {
        Some(p) if p != "stdout" => {
            info!("Writing summary to {:?}", p);
            fs::write(&p, summary).context(WritingOutputSnafu { path: p.clone() })
        }
        _ => {
            println!("{}", summary);
            Ok(())
        }
    }
}

fn check_reference(result_js: &JSValue, check_summary_path: Option<String>) -> RcvResult<()> {
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        debug!("summary: {:?}", summary_ref);
        if summary_ref != *result_js {
            let pretty_js_summary_ref =
                serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
            let pretty_js_stats =
                serde_json::to_string_pretty(result_js).context(ParsingJsonSnafu {})?;
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_str(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }
    Ok(())
}

fn tabulate(
    output: &OutputConfig,
    builder: &Builder,
    out_path: Option<String>,
    check_summary_path: Option<String>,
) -> RcvResult<()> {
    info!(
        "Tabulating {:?}: {} voters",
        output.contest,
        builder.num_voters()
    );
    let outcome = builder.run().context(TabulationSnafu {})?;

    match (&outcome.winning_candidate, &outcome.tied_candidates) {
        (Some(winner), _) => info!("Winner: {}", winner.label),
        (None, Some(tied)) => {
            let labels: Vec<&str> = tied.iter().map(|c| c.label.as_str()).collect();
            info!("Tie between: {}", labels.join(", "))
        }
        (None, None) => {}
    }

    let result_js = build_summary_js(output, &outcome)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_summary(&pretty_js_stats, out_path)?;

    check_reference(&result_js, check_summary_path)
}

fn add_rows(builder: &mut Builder, rows: &[VoteRow]) {
    for row in rows.iter() {
        builder.add_ranking(&row.voter, &row.candidate, row.rank);
    }
}

/// Runs a poll described by a configuration file.
pub fn run_election(
    config_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> RcvResult<()> {
    let config = read_config(config_path.clone())?;
    info!("config: {:?}", config);

    let rules = config.rules.tabulation_rules()?;

    if config.vote_file_sources.is_empty() {
        whatever!("No vote file source in {}", config_path)
    }

    let root_p = Path::new(config_path.as_str())
        .parent()
        .context(MissingParentDirSnafu {})?;

    let candidates = validate_candidates(&config.candidates);
    let mut builder = Builder::new(&rules)
        .context(TabulationSnafu {})?
        .candidates(&candidates)
        .context(TabulationSnafu {})?;

    for vfs in config.vote_file_sources.iter() {
        let p: PathBuf = root_p.join(&vfs.file_path);
        let rows = read_vote_rows(
            p.as_path().display().to_string(),
            vfs.provider.as_str(),
            vfs.excel_worksheet_name.clone(),
        )?;
        add_rows(&mut builder, &rows);
    }

    // The command line takes precedence over the configuration.
    let out = out_path.or_else(|| {
        config
            .output_settings
            .output_file
            .as_ref()
            .map(|f| root_p.join(f).display().to_string())
    });

    tabulate(
        &config.output_settings.output_config(),
        &builder,
        out,
        check_summary_path,
    )
}

/// Runs a poll from a single vote file. The candidates are inferred from the votes.
pub fn run_votes_file(
    input_path: String,
    input_type: Option<String>,
    worksheet_name: Option<String>,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> RcvResult<()> {
    let provider = input_type.unwrap_or_else(|| "csv".to_string());
    let rows = read_vote_rows(input_path.clone(), provider.as_str(), worksheet_name)?;

    let mut builder = Builder::new(&TabulationRules::DEFAULT_RULES).context(TabulationSnafu {})?;
    add_rows(&mut builder, &rows);

    let output = OutputConfig {
        contest: io_common::simplify_file_name(&input_path),
        date: None,
    };
    tabulate(&output, &builder, out_path, check_summary_path)
}

/// Runs the poll described either by a configuration file or by a single vote file.
pub fn run_command(
    config_path: Option<String>,
    input_path: Option<String>,
    input_type: Option<String>,
    worksheet_name: Option<String>,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> RcvResult<()> {
    match (config_path, input_path) {
        (Some(config), Some(input)) => ConflictingInputsSnafu { config, input }.fail(),
        (Some(config), None) => run_election(config, check_summary_path, out_path),
        (None, Some(input)) => run_votes_file(
            input,
            input_type,
            worksheet_name,
            check_summary_path,
            out_path,
        ),
        (None, None) => MissingInputSnafu {}.fail(),
    }
}

#[cfg(test)]
fn run_election_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> RcvResult<()> {
    let test_dir = option_env!("RCTALLY_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    info!("Running test {}", test_name);
    let res = run_election(
        format!("{}/{}/{}", test_dir, test_name, config_lpath),
        Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        Some("stdout".to_string()),
    );
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = snafu::ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        } else {
            eprintln!("No trace found");
        }
    }
    res
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) -> RcvResult<()> {
    run_election_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
