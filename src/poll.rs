use log::{debug, info, warn};

use instant_runoff::builder::Builder;
use instant_runoff::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use std::collections::{HashMap, HashSet};
use text_diff::print_diff;

use crate::args::Args;
use crate::poll::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum PollError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Expected a positive number or a column name"))]
    ParsingJsonNumber {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No ballot grid found in {path}"))]
    EmptyGrid { path: String },
    #[snafu(display("Line {lineno}: could not understand cell {content}"))]
    WrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Line {lineno}: error reading CSV"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno} is too short"))]
    LineTooShort { lineno: usize },
    #[snafu(display("Poll {title} is still open. Results available after closing."))]
    PollStillOpen { title: String },
    #[snafu(display("Invalid ballot: {source}"))]
    InvalidBallot { source: BallotErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PollResult<T> = Result<T, PollError>;

/// A poll, as parsed by the readers
/// This is before checking the ballots against the options.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedPoll {
    pub title: Option<String>,
    pub is_open: Option<bool>,
    pub options: Vec<PollOption>,
    pub ballots: Vec<Ballot>,
    // Grids refer to the options by their text, not by an id.
    pub keyed_by_text: bool,
}

fn result_stats_to_json(rs: &TallyResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.round_stats.iter() {
        let mut tallies: JSMap<String, JSValue> = JSMap::new();
        for (name, count) in round_stat.tally.iter() {
            tallies.insert(name.clone(), json!(count));
        }

        let mut js: JSMap<String, JSValue> = JSMap::new();
        js.insert("roundNumber".to_string(), json!(round_stat.round));
        js.insert("tallies".to_string(), JSValue::Object(tallies));
        if let Some(winner_name) = &round_stat.elected {
            js.insert("winner".to_string(), json!(winner_name));
        }
        if let Some(count) = round_stat.final_vote_count {
            js.insert("finalVoteCount".to_string(), json!(count));
        }
        if !round_stat.eliminated.is_empty() {
            js.insert("eliminated".to_string(), json!(round_stat.eliminated));
        }
        l.push(JSValue::Object(js));
    }
    l
}

fn build_summary_js(title: &str, total_ballots: usize, rv: &TallyResult) -> JSValue {
    let winner = match &rv.winner {
        Some(w) => json!({
            "id": w.id,
            "text": w.text,
            "finalVoteCount": w.final_vote_count,
        }),
        None => JSValue::Null,
    };
    json!({
        "poll": {
            "title": title,
            "totalBallots": total_ballots,
        },
        "winner": winner,
        "rounds": result_stats_to_json(rv),
        "eliminated": rv.eliminated,
        "totalBallots": total_ballots,
    })
}

fn read_poll_data(root_path: &Path, cfs: &FileSource) -> PollResult<ParsedPoll> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read ballot file {:?}", p2);
    match cfs.provider.as_str() {
        "json" => io_json::read_json_poll(p2),
        "csv" => io_csv::read_csv_grid(p2, cfs),
        "xlsx" => io_xlsx::read_xlsx_grid(p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

// The options of the poll: the configured ones, or all the ones found in the sources.
fn resolve_options(configured: &Option<Vec<ConfigOption>>, polls: &[ParsedPoll]) -> Vec<PollOption> {
    if let Some(opts) = configured {
        return opts
            .iter()
            .map(|o| PollOption::new(&o.id, &o.text))
            .collect();
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<PollOption> = Vec::new();
    for poll in polls.iter() {
        for o in poll.options.iter() {
            if seen.insert(o.id.clone()) {
                res.push(o.clone());
            }
        }
    }
    res
}

fn validate_ballots(
    options: &[PollOption],
    polls: &[ParsedPoll],
    rules: &BallotRules,
) -> PollResult<Builder> {
    let mut builder = Builder::new(rules)
        .context(InvalidBallotSnafu {})?
        .options(options)
        .context(InvalidBallotSnafu {})?;

    let ids_by_text: HashMap<&str, &str> = options
        .iter()
        .map(|o| (o.text.as_str(), o.id.as_str()))
        .collect();

    for poll in polls.iter() {
        for pb in poll.ballots.iter() {
            if poll.keyed_by_text {
                let rankings: Vec<Ranking> = pb
                    .rankings
                    .iter()
                    .map(|r| Ranking {
                        option_id: ids_by_text
                            .get(r.option_id.as_str())
                            .map_or(r.option_id.clone(), |id| id.to_string()),
                        rank: r.rank,
                    })
                    .collect();
                builder
                    .add_ballot(&Ballot {
                        id: pb.id.clone(),
                        rankings,
                    })
                    .context(InvalidBallotSnafu {})?;
            } else {
                builder.add_ballot(pb).context(InvalidBallotSnafu {})?;
            }
        }
    }
    Ok(builder)
}

fn write_summary(pretty_js: &str, out: Option<String>) -> PollResult<()> {
    match out.as_deref() {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js);
            Ok(())
        }
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, pretty_js).context(WritingSummarySnafu { path })
        }
    }
}

fn check_reference(summary_js: &JSValue, pretty_js: &str, summary_p: String) -> PollResult<()> {
    let summary_ref = read_summary(summary_p)?;
    debug!("summary: {:?}", summary_ref);
    if summary_ref != *summary_js {
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Counts a poll described by a configuration.
///
/// The paths of the ballot sources are relative to `root_path`.
pub fn run_poll_config(
    config: &PollConfig,
    root_path: &Path,
    check_summary_path: Option<String>,
    out: Option<String>,
) -> PollResult<JSValue> {
    let rules = config.rules.ballot_rules()?;
    let require_closed = config.rules.require_closed_poll.unwrap_or(true);

    if config.ballot_sources.is_empty() {
        whatever!("no ballot sources detected");
    }

    let mut polls: Vec<ParsedPoll> = Vec::new();
    for cfs in config.ballot_sources.iter() {
        polls.push(read_poll_data(root_path, cfs)?);
    }

    let title: String = config
        .output_settings
        .poll_title
        .clone()
        .or_else(|| polls.iter().find_map(|p| p.title.clone()))
        .unwrap_or_else(|| "Untitled poll".to_string());

    if require_closed && polls.iter().any(|p| p.is_open == Some(true)) {
        return PollStillOpenSnafu { title }.fail();
    }

    let options = resolve_options(&config.options, &polls);
    let builder = validate_ballots(&options, &polls, &rules)?;
    let total_ballots = builder.total_ballots();
    info!(
        "Poll {:?}: {} options, {} ballots",
        title,
        options.len(),
        total_ballots
    );

    let result = builder.tally();
    match &result.winner {
        Some(w) => info!("Winner: {} ({} votes)", w.text, w.final_vote_count),
        None => info!("No winner"),
    }

    let summary_js = build_summary_js(&title, total_ballots, &result);
    let pretty_js = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    write_summary(
        &pretty_js,
        out.or_else(|| config.output_settings.output_path.clone()),
    )?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        check_reference(&summary_js, &pretty_js, summary_p)?;
    }

    Ok(summary_js)
}

pub fn run_poll(
    config_path: String,
    check_summary_path: Option<String>,
    out: Option<String>,
) -> PollResult<JSValue> {
    let config = read_config(config_path.as_str())?;
    let config_p = Path::new(config_path.as_str());
    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    run_poll_config(&config, root_p, check_summary_path, out)
}

pub fn run_from_args(args: &Args) -> PollResult<()> {
    if let Some(config_path) = args.config.clone() {
        run_poll(config_path, args.reference.clone(), args.out.clone())?;
    } else if let Some(input) = args.input.clone() {
        let config = config_from_input(
            input.as_str(),
            args.input_type.as_deref(),
            args.excel_worksheet_name.clone(),
        );
        run_poll_config(
            &config,
            Path::new("."),
            args.reference.clone(),
            args.out.clone(),
        )?;
    } else {
        whatever!("One of --config or --input must be provided")
    }
    Ok(())
}
