// PV sheets exported as JSON arrays.

use crate::pv::*;

#[derive(Debug, Clone, Deserialize)]
struct JsonCandidateVotes {
    candidate: String,
    votes: JSValue,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonPv {
    bureau: String,
    registered: Option<JSValue>,
    voters: Option<JSValue>,
    null: Option<JSValue>,
    valid: Option<JSValue>,
    submitter: Option<String>,
    document: Option<String>,
    review: Option<String>,
    #[serde(default)]
    results: Vec<JsonCandidateVotes>,
}

fn raw_count(v: &JSValue, field: &str, bureau: &str) -> PvResult<String> {
    match v {
        JSValue::Number(n) => Ok(n.to_string()),
        JSValue::String(s) => Ok(s.clone()),
        JSValue::Null => Ok(String::new()),
        _ => JsonWrongValueSnafu { field, bureau }.fail(),
    }
}

pub fn read_json_pvs(path: &str) -> PvResult<Vec<ParsedPv>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let records: Vec<JsonPv> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let mut res: Vec<ParsedPv> = Vec::new();
    for (idx, r) in records.iter().enumerate() {
        let fields = [
            ("registered", &r.registered),
            ("voters", &r.voters),
            ("null", &r.null),
            ("valid", &r.valid),
        ];
        let mut counts: Vec<(String, String)> = Vec::new();
        for (name, value) in fields {
            if let Some(v) = value {
                counts.push((name.to_string(), raw_count(v, name, &r.bureau)?));
            }
        }
        for cv in r.results.iter() {
            counts.push((
                cv.candidate.clone(),
                raw_count(&cv.votes, &cv.candidate, &r.bureau)?,
            ));
        }
        res.push(ParsedPv {
            lineno: idx + 1,
            bureau: r.bureau.trim().to_string(),
            counts,
            submitter: r.submitter.clone(),
            document: r.document.clone(),
            review: r.review.as_ref().map(|s| s.trim().to_lowercase()),
        });
    }
    Ok(res)
}
