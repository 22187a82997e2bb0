// Primitives for reading CSV files.

use crate::poll::{io_common::grid_to_poll, *};

pub fn read_csv_grid(path: String, cfs: &FileSource) -> PollResult<ParsedPoll> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .context(CsvOpenSnafu { path: path.clone() })?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r.context(CsvLineParseSnafu { lineno: idx + 1 })?;
        rows.push(line.iter().map(|s| s.to_string()).collect());
    }
    debug!("read_csv_grid: {}: {} rows", path, rows.len());
    grid_to_poll(&path, &rows, cfs)
}
