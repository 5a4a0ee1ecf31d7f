use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::pv::{
    io_common::{normalize_header, parsed_pv_from_row},
    *,
};

/// Reads a PV sheet from an Excel workbook, laid out like the CSV sheets.
pub fn read_excel_pvs(path: &str, source: &PvSource) -> PvResult<Vec<ParsedPv>> {
    let wrange = get_range(path, source)?;
    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(h) => h
            .iter()
            .enumerate()
            .map(|(idx, c)| cell_to_string(c, 1, idx).map(|s| normalize_header(&s)))
            .collect::<PvResult<Vec<String>>>()?,
        None => return EmptyExcelSnafu { path }.fail(),
    };
    debug!("read_excel_pvs: header: {:?}", header);

    let mut res: Vec<ParsedPv> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, c)| cell_to_string(c, lineno, col))
            .collect::<PvResult<Vec<String>>>()?;
        debug!("read_excel_pvs: lineno: {:?} row: {:?}", lineno, &cells);
        if let Some(pv) = parsed_pv_from_row(&header, &cells, lineno)? {
            res.push(pv);
        }
    }
    Ok(res)
}

fn cell_to_string(cell: &DataType, lineno: usize, col: usize) -> PvResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok(String::new()),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("column {}: {:?}", col + 1, x),
        }
        .fail(),
    }
}

fn get_range(path: &str, source: &PvSource) -> PvResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &source.worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    if let Some(worksheet_name) = source.worksheet_name.as_ref() {
        workbook
            .worksheet_range(worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [(worksheet_name, wrange), ..] => {
                if all_worksheets.len() > 1 {
                    warn!(
                        "{}: several worksheets and no worksheetName, reading {:?}",
                        path, worksheet_name
                    );
                }
                Ok(wrange.clone())
            }
            [] => EmptyExcelSnafu { path }.fail(),
        }
    }
}
