pub use crate::config::*;

/// A builder for assembling a PV.
///
/// Readers of PV sheets receive the figures as text; `add_raw_count` parses them
/// and reports the offending field when a cell is not a number.
///
/// ```
/// pub use pv_results::builder::TallyBuilder;
/// # use pv_results::ResultsError;
///
/// let mut builder = TallyBuilder::new(&"legis-2023".into(), &"B-001".into())
///     .registered(300)
///     .voters(250);
///
/// builder.add_raw_count("null", "10")?;
/// builder.add_raw_count("valid", "240")?;
/// builder.add_raw_count("Alice", "140")?;
/// builder.add_raw_count("Bob", " 100 ")?;
///
/// let tally = builder.build();
/// assert_eq!(tally.candidate_sum(), 240);
///
/// # Ok::<(), ResultsError>(())
/// ```
pub struct TallyBuilder {
    pub(crate) _tally: Tally,
}

impl TallyBuilder {
    pub fn new(election_id: &ElectionId, bureau_id: &BureauId) -> TallyBuilder {
        TallyBuilder {
            _tally: Tally::new(election_id, bureau_id),
        }
    }

    pub fn registered(mut self, count: i64) -> TallyBuilder {
        self._tally.registered = count;
        self
    }

    pub fn voters(mut self, count: i64) -> TallyBuilder {
        self._tally.voters = count;
        self
    }

    pub fn null_ballots(mut self, count: i64) -> TallyBuilder {
        self._tally.null_ballots = count;
        self
    }

    pub fn valid_ballots(mut self, count: i64) -> TallyBuilder {
        self._tally.valid_ballots = count;
        self
    }

    pub fn submitter(mut self, name: &str) -> TallyBuilder {
        self._tally.submitter = Some(name.to_string());
        self
    }

    pub fn document(mut self, reference: &str) -> TallyBuilder {
        self._tally.document = Some(reference.to_string());
        self
    }

    /// Adds votes for a candidate. Repeated candidates accumulate.
    pub fn candidate(mut self, candidate_id: &CandidateId, votes: i64) -> TallyBuilder {
        self.add_candidate_votes(candidate_id, votes);
        self
    }

    pub fn add_candidate_votes(&mut self, candidate_id: &CandidateId, votes: i64) {
        if let Some(r) = self
            ._tally
            .results
            .iter_mut()
            .find(|r| r.candidate_id == *candidate_id)
        {
            r.votes = r.votes.saturating_add(votes);
        } else {
            self._tally.results.push(CandidateResult {
                candidate_id: candidate_id.clone(),
                votes,
            });
        }
    }

    /// Sets a figure from its textual form.
    ///
    /// `registered`, `voters`, `null` and `valid` name the PV figures; any other
    /// name is taken as a candidate identifier. An empty cell counts as zero.
    pub fn add_raw_count(&mut self, field: &str, raw: &str) -> Result<(), ResultsError> {
        let trimmed = raw.trim();
        let count: i64 = if trimmed.is_empty() {
            0
        } else {
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| parse_integral_float(trimmed))
                .ok_or_else(|| ResultsError::MalformedCount {
                    field: field.to_string(),
                    raw: raw.to_string(),
                })?
        };
        match field {
            "registered" => self._tally.registered = count,
            "voters" => self._tally.voters = count,
            "null" => self._tally.null_ballots = count,
            "valid" => self._tally.valid_ballots = count,
            name => self.add_candidate_votes(&CandidateId::new(name), count),
        }
        Ok(())
    }

    pub fn build(self) -> Tally {
        self._tally
    }
}

// Spreadsheets often store whole numbers as "240.0".
fn parse_integral_float(s: &str) -> Option<i64> {
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        Some(f as i64)
    } else {
        None
    }
}
