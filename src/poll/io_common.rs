// Primitives shared by the readers of ballot grids (CSV, Excel).

use std::path::Path;

use crate::poll::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Reads the rank in a cell of a grid. An empty cell is an unranked option.
pub fn read_rank(cell: &str, lineno: usize) -> PollResult<Option<u32>> {
    let s = cell.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(rank) = s.parse::<u32>() {
        return Ok(Some(rank));
    }
    // Spreadsheets tend to write whole numbers as floats.
    match s.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(Some(f as u32)),
        _ => WrongCellTypeSnafu {
            lineno,
            content: cell,
        }
        .fail(),
    }
}

/// Turns the rows of a ballot grid into a poll.
///
/// The header row names the options. Every row after it is a ballot, with one rank
/// (or nothing) per option column. The options are identified by their names.
pub fn grid_to_poll(path: &str, rows: &[Vec<String>], cfs: &FileSource) -> PollResult<ParsedPoll> {
    let default_id = make_default_id(path);
    let header_idx = cfs.first_vote_row_index()?;
    let id_idx_o = cfs.id_column_index()?;
    let first_col = cfs.first_vote_column_index()?;

    let header = rows
        .get(header_idx)
        .context(EmptyGridSnafu { path })?;
    debug!("grid_to_poll: header: {:?}", header);
    if header.len() <= first_col {
        return LineTooShortSnafu {
            lineno: header_idx + 1,
        }
        .fail();
    }
    // Columns with a blank header are not options.
    let labels: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .skip(first_col)
        .map(|(col, s)| (col, s.trim().to_string()))
        .filter(|(_, s)| !s.is_empty())
        .collect();

    let mut ballots: Vec<Ballot> = Vec::new();
    for (idx, row) in rows.iter().enumerate().skip(header_idx + 1) {
        let lineno = idx + 1;
        let id = if let Some(id_idx) = id_idx_o {
            row.get(id_idx)
                .context(LineTooShortSnafu { lineno })?
                .trim()
                .to_string()
        } else {
            default_id(lineno)
        };

        let mut rankings: Vec<Ranking> = Vec::new();
        for (col, label) in labels.iter() {
            let cell = row.get(*col).map_or("", |s| s.as_str());
            if let Some(rank) = read_rank(cell, lineno)? {
                rankings.push(Ranking {
                    option_id: label.clone(),
                    rank,
                });
            }
        }
        debug!("grid_to_poll: lineno: {:?} id: {} rankings: {:?}", lineno, id, rankings);
        ballots.push(Ballot { id, rankings });
    }

    Ok(ParsedPoll {
        title: None,
        is_open: None,
        options: labels.iter().map(|(_, l)| PollOption::new(l, l)).collect(),
        ballots,
        keyed_by_text: true,
    })
}
