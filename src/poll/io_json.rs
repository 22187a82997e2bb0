// Reader for the poll export of the poll service.

use serde::{Deserialize, Serialize};

use crate::poll::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ExportedOption {
    id: String,
    #[serde(rename = "optionText")]
    option_text: String,
    #[serde(rename = "displayOrder")]
    display_order: Option<i64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ExportedRanking {
    #[serde(rename = "pollOptionId")]
    poll_option_id: String,
    rank: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ExportedBallot {
    id: String,
    #[serde(default)]
    rankings: Vec<ExportedRanking>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct PollExport {
    title: Option<String>,
    #[serde(rename = "isOpen")]
    is_open: Option<bool>,
    options: Vec<ExportedOption>,
    #[serde(default)]
    ballots: Vec<ExportedBallot>,
}

pub fn read_json_poll(path: String) -> PollResult<ParsedPoll> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    parse_poll_export(contents.as_str())
}

fn parse_poll_export(contents: &str) -> PollResult<ParsedPoll> {
    let mut export: PollExport = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    debug!(
        "parse_poll_export: {:?}: {} options, {} ballots",
        export.title,
        export.options.len(),
        export.ballots.len()
    );

    // Display order first, the options without one last. The sort is stable.
    export
        .options
        .sort_by_key(|o| (o.display_order.is_none(), o.display_order));

    let options: Vec<PollOption> = export
        .options
        .iter()
        .map(|o| PollOption::new(&o.id, &o.option_text))
        .collect();
    let ballots: Vec<Ballot> = export
        .ballots
        .into_iter()
        .map(|b| Ballot {
            id: b.id,
            rankings: b
                .rankings
                .into_iter()
                .map(|r| Ranking {
                    option_id: r.poll_option_id,
                    rank: r.rank,
                })
                .collect(),
        })
        .collect();

    Ok(ParsedPoll {
        title: export.title,
        is_open: export.is_open,
        options,
        ballots,
        keyed_by_text: false,
    })
}
