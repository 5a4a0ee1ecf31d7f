use crate::pv::*;

const BUREAU: &str = "bureau";
const SUBMITTER: &str = "submitter";
const DOCUMENT: &str = "document";
const REVIEW: &str = "review";

const RESERVED: &[&str] = &[
    BUREAU,
    SUBMITTER,
    DOCUMENT,
    REVIEW,
    "registered",
    "voters",
    "null",
    "valid",
];

/// The field a column header stands for. Reserved names are matched without
/// regard to case; anything else is a candidate identifier.
pub fn normalize_header(header: &str) -> String {
    let h = header.trim();
    let lower = h.to_lowercase();
    if RESERVED.contains(&lower.as_str()) {
        lower
    } else {
        h.to_string()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Turns a sheet row into a PV. Blank rows give `None`.
pub fn parsed_pv_from_row(
    header: &[String],
    row: &[String],
    lineno: usize,
) -> PvResult<Option<ParsedPv>> {
    if row.iter().all(|c| c.trim().is_empty()) {
        return Ok(None);
    }
    let mut bureau: Option<String> = None;
    let mut pv = ParsedPv {
        lineno,
        bureau: String::new(),
        counts: Vec::new(),
        submitter: None,
        document: None,
        review: None,
    };
    for (name, cell) in header.iter().zip(row.iter()) {
        match name.as_str() {
            BUREAU => bureau = non_empty(cell),
            SUBMITTER => pv.submitter = non_empty(cell),
            DOCUMENT => pv.document = non_empty(cell),
            REVIEW => pv.review = non_empty(cell).map(|s| s.to_lowercase()),
            "" => {}
            field => pv.counts.push((field.to_string(), cell.clone())),
        }
    }
    pv.bureau = bureau.context(MissingBureauSnafu { lineno })?;
    Ok(Some(pv))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reserved_headers() {
        assert_eq!(normalize_header(" Bureau "), "bureau");
        assert_eq!(normalize_header("NULL"), "null");
        assert_eq!(normalize_header("cand-A"), "cand-A");
    }

    #[test]
    fn row_to_pv() {
        let header = strings(&["bureau", "voters", "cand-a", "review"]);
        let pv = parsed_pv_from_row(&header, &strings(&["B01", "250", "140", "Validated"]), 2)
            .unwrap()
            .unwrap();
        assert_eq!(pv.bureau, "B01");
        assert_eq!(
            pv.counts,
            vec![
                ("voters".to_string(), "250".to_string()),
                ("cand-a".to_string(), "140".to_string())
            ]
        );
        assert_eq!(pv.review, Some("validated".to_string()));
    }

    #[test]
    fn blank_and_anonymous_rows() {
        let header = strings(&["bureau", "voters"]);
        assert_eq!(parsed_pv_from_row(&header, &strings(&["", " "]), 3).unwrap(), None);
        assert!(parsed_pv_from_row(&header, &strings(&["", "12"]), 4).is_err());
    }
}
