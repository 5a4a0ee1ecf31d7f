// Primitives for reading CSV files.

use crate::pv::{
    io_common::{normalize_header, parsed_pv_from_row},
    *,
};

/// Reads a PV sheet with one header line and one bureau per line.
pub fn read_csv_pvs(path: &str) -> PvResult<Vec<ParsedPv>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(normalize_header)
        .collect();
    debug!("read_csv_pvs: header: {:?}", header);

    let mut res: Vec<ParsedPv> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let row: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        debug!("read_csv_pvs: lineno: {:?} row: {:?}", lineno, &row);
        if let Some(pv) = parsed_pv_from_row(&header, &row, lineno)? {
            res.push(pv);
        }
    }
    Ok(res)
}
