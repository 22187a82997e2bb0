use crate::poll::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "pollTitle")]
    pub poll_title: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "idColumnIndex")]
    _id_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str, excel_worksheet_name: Option<String>) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _id_column_index: None,
            _first_vote_column_index: None,
            _first_vote_row_index: None,
            excel_worksheet_name,
        }
    }

    /// The 0-based column of the ballot ids, if any.
    pub fn id_column_index(&self) -> PollResult<Option<usize>> {
        Ok(read_js_int(&self._id_column_index)?.map(|x| x - 1))
    }

    /// The 0-based column of the first option. Defaults to the column after the ids.
    pub fn first_vote_column_index(&self) -> PollResult<usize> {
        match read_js_int(&self._first_vote_column_index)? {
            Some(x) => Ok(x - 1),
            None => Ok(self.id_column_index()?.map_or(0, |c| c + 1)),
        }
    }

    /// The 0-based row holding the names of the options.
    pub fn first_vote_row_index(&self) -> PollResult<usize> {
        Ok(read_js_int(&self._first_vote_row_index)?.map_or(0, |x| x - 1))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption {
    pub id: String,
    pub text: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollRules {
    #[serde(rename = "unknownOptionRule")]
    pub unknown_option_rule: Option<String>,
    #[serde(rename = "duplicateRankRule")]
    pub duplicate_rank_rule: Option<String>,
    #[serde(rename = "emptyBallotRule")]
    pub empty_ballot_rule: Option<String>,
    #[serde(rename = "requireClosedPoll")]
    pub require_closed_poll: Option<bool>,
}

impl PollRules {
    pub fn ballot_rules(&self) -> PollResult<BallotRules> {
        let defaults = BallotRules::DEFAULT_RULES;
        Ok(BallotRules {
            unknown_option_rule: match self.unknown_option_rule.as_deref() {
                None => defaults.unknown_option_rule,
                Some("reject") => UnknownOptionRule::Reject,
                Some("ignore") => UnknownOptionRule::Ignore,
                Some(x) => whatever!("unknown unknownOptionRule: {}", x),
            },
            duplicate_rank_rule: match self.duplicate_rank_rule.as_deref() {
                None => defaults.duplicate_rank_rule,
                Some("reject") => DuplicateRankRule::Reject,
                Some("keepFirst") => DuplicateRankRule::KeepFirst,
                Some(x) => whatever!("unknown duplicateRankRule: {}", x),
            },
            empty_ballot_rule: match self.empty_ballot_rule.as_deref() {
                None => defaults.empty_ballot_rule,
                Some("reject") => EmptyBallotRule::Reject,
                Some("exhausted") => EmptyBallotRule::Exhausted,
                Some(x) => whatever!("unknown emptyBallotRule: {}", x),
            },
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "ballotSources")]
    pub ballot_sources: Vec<FileSource>,
    pub options: Option<Vec<ConfigOption>>,
    #[serde(default)]
    pub rules: PollRules,
}

pub fn read_config(path: &str) -> PollResult<PollConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: PollConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// A configuration for a single input file, with the default rules.
/// A poll that is still open is not counted.
pub fn config_from_input(
    input: &str,
    input_type: Option<&str>,
    excel_worksheet_name: Option<String>,
) -> PollConfig {
    PollConfig {
        output_settings: OutputSettings::default(),
        ballot_sources: vec![FileSource::new(
            input_type.unwrap_or("json"),
            input,
            excel_worksheet_name,
        )],
        options: None,
        rules: PollRules::default(),
    }
}

pub fn read_summary(path: String) -> PollResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

// Reads a 1-based index. Excel-style column names (A, B, ..., AA) are accepted.
fn read_js_int(x: &Option<JSValue>) -> PollResult<Option<usize>> {
    let res = match x {
        None => return Ok(None),
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_lowercase().chars().try_fold(0usize, |acc, c| {
                acc.checked_mul(26)?
                    .checked_add((c as usize) - ('a' as usize) + 1)
            })
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok(),
        _ => None,
    };
    match res {
        Some(x) if x >= 1 => Ok(Some(x)),
        _ => ParsingJsonNumberSnafu {}.fail(),
    }
}
