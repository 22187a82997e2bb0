use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::poll::{io_common::grid_to_poll, *};

pub fn read_xlsx_grid(path: String, cfs: &FileSource) -> PollResult<ParsedPoll> {
    let mut workbook: Xlsx<_> =
        open_workbook(&path).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    }
    .context(EmptyGridSnafu { path: path.clone() })?
    .context(OpeningExcelSnafu { path: path.clone() })?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let cells = row
            .iter()
            .map(|cell| read_cell(cell, idx + 1))
            .collect::<PollResult<Vec<String>>>()?;
        rows.push(cells);
    }
    debug!("read_xlsx_grid: {}: {} rows", path, rows.len());
    grid_to_poll(&path, &rows, cfs)
}

fn read_cell(cell: &DataType, lineno: usize) -> PollResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Empty => Ok(String::new()),
        _ => WrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}
