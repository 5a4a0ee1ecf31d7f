use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::config::*;
use crate::validation::ValidationResult;

/// Read access to the election data.
///
/// The computations of this crate only ever go through this interface, so
/// that they can be run against a database client or an in-memory store.
pub trait ResultsRepository {
    fn fetch_election(&self, id: &ElectionId) -> Option<Election>;

    fn fetch_elections(&self) -> Vec<Election>;

    /// The candidates running in an election, in registration order.
    fn fetch_candidates_for_election(&self, id: &ElectionId) -> Vec<Candidate>;

    fn fetch_center(&self, id: &CenterId) -> Option<VotingCenter>;

    fn fetch_center_bureaus(&self, id: &CenterId) -> Vec<Bureau>;

    /// The bureaus of all the centers taking part in an election.
    fn fetch_bureaus_for_election(&self, id: &ElectionId) -> Vec<Bureau>;

    /// The known bureaus among `ids`.
    fn fetch_bureaus(&self, ids: &BTreeSet<BureauId>) -> Vec<Bureau>;

    /// The current tallies of an election for the given bureaus.
    fn fetch_tallies_for_bureaus(
        &self,
        election: &ElectionId,
        bureaus: &BTreeSet<BureauId>,
    ) -> Vec<Tally>;
}

/// What a submission did to the stored tally.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SubmissionOutcome {
    Inserted,
    Updated,
    /// Same content as the stored tally: nothing was written.
    Unchanged,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SubmissionReceipt {
    pub outcome: SubmissionOutcome,
    pub report: ValidationResult,
    /// The status of the stored tally after the submission.
    pub status: TallyStatus,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct StoredTally {
    tally: Tally,
    fingerprint: String,
}

/// An in-memory election dataset.
///
/// Tallies are keyed by (election, bureau): submitting again for the same pair
/// replaces the previous tally.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    elections: BTreeMap<ElectionId, Election>,
    candidates: BTreeMap<CandidateId, Candidate>,
    centers: BTreeMap<CenterId, VotingCenter>,
    bureaus: BTreeMap<BureauId, Bureau>,
    election_candidates: BTreeMap<ElectionId, Vec<CandidateId>>,
    election_centers: BTreeMap<ElectionId, BTreeSet<CenterId>>,
    tallies: BTreeMap<TallyKey, StoredTally>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn add_election(&mut self, election: Election) {
        self.elections.insert(election.id.clone(), election);
    }

    pub fn add_candidate(&mut self, candidate: Candidate) {
        self.candidates.insert(candidate.id.clone(), candidate);
    }

    pub fn add_center(&mut self, center: VotingCenter) {
        self.centers.insert(center.id.clone(), center);
    }

    /// The parent center must already be known.
    pub fn add_bureau(&mut self, bureau: Bureau) -> Result<(), ResultsError> {
        if !self.centers.contains_key(&bureau.center_id) {
            return Err(ResultsError::UnknownCenter(bureau.center_id.clone()));
        }
        self.bureaus.insert(bureau.id.clone(), bureau);
        Ok(())
    }

    pub fn register_candidate(
        &mut self,
        election_id: &ElectionId,
        candidate_id: &CandidateId,
    ) -> Result<(), ResultsError> {
        self.check_election(election_id)?;
        if !self.candidates.contains_key(candidate_id) {
            return Err(ResultsError::UnknownCandidate(candidate_id.clone()));
        }
        let registered = self
            .election_candidates
            .entry(election_id.clone())
            .or_insert_with(Vec::new);
        if !registered.contains(candidate_id) {
            registered.push(candidate_id.clone());
        }
        Ok(())
    }

    pub fn register_center(
        &mut self,
        election_id: &ElectionId,
        center_id: &CenterId,
    ) -> Result<(), ResultsError> {
        self.check_election(election_id)?;
        if !self.centers.contains_key(center_id) {
            return Err(ResultsError::UnknownCenter(center_id.clone()));
        }
        self.election_centers
            .entry(election_id.clone())
            .or_insert_with(BTreeSet::new)
            .insert(center_id.clone());
        Ok(())
    }

    pub fn election(&self, id: &ElectionId) -> Option<&Election> {
        self.elections.get(id)
    }

    pub fn candidate(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.get(id)
    }

    pub fn tally(&self, key: &TallyKey) -> Option<&Tally> {
        self.tallies.get(key).map(|st| &st.tally)
    }

    pub fn tally_count(&self) -> usize {
        self.tallies.len()
    }

    fn check_election(&self, id: &ElectionId) -> Result<(), ResultsError> {
        if self.elections.contains_key(id) {
            Ok(())
        } else {
            Err(ResultsError::UnknownElection(id.clone()))
        }
    }

    /// Records the PV of a bureau.
    ///
    /// The PV is checked and stored as `entered`, or as `anomaly` when the
    /// checks find a problem; the report is returned either way. A PV with no
    /// voter is not filled yet and stays `pending`. A previous
    /// tally for the same (election, bureau) is replaced, which re-opens a
    /// validated tally. Published tallies cannot be submitted again.
    pub fn submit(
        &mut self,
        tally: Tally,
        now: NaiveDateTime,
    ) -> Result<SubmissionReceipt, ResultsError> {
        let key = tally.key();
        self.check_election(&key.election_id)?;
        let bureau = self
            .bureaus
            .get(&key.bureau_id)
            .ok_or_else(|| ResultsError::UnknownBureau(key.bureau_id.clone()))?;
        let takes_part = self
            .election_centers
            .get(&key.election_id)
            .map(|centers| centers.contains(&bureau.center_id))
            .unwrap_or(false);
        if !takes_part {
            return Err(ResultsError::BureauNotInElection(
                key.election_id.clone(),
                key.bureau_id.clone(),
            ));
        }

        let registered = self.election_candidates.get(&key.election_id);
        for r in tally.results.iter() {
            if !registered.map(|cs| cs.contains(&r.candidate_id)).unwrap_or(false) {
                warn!(
                    "submit: {}/{}: candidate {} is not registered in the election",
                    key.election_id, key.bureau_id, r.candidate_id
                );
            }
        }

        let report = crate::validation::validate(&tally);
        let fingerprint = tally.fingerprint();
        let outcome = match self.tallies.get(&key) {
            Some(stored) if stored.tally.status == TallyStatus::Published => {
                return Err(ResultsError::PublishedTally(key));
            }
            Some(stored) if stored.fingerprint == fingerprint => {
                info!(
                    "submit: {}/{}: same content as the stored tally",
                    key.election_id, key.bureau_id
                );
                return Ok(SubmissionReceipt {
                    outcome: SubmissionOutcome::Unchanged,
                    report,
                    status: stored.tally.status,
                });
            }
            Some(_) => SubmissionOutcome::Updated,
            None => SubmissionOutcome::Inserted,
        };

        let status = report.status();
        if !report.filled {
            info!(
                "submit: {}/{}: no voters yet, kept pending",
                key.election_id, key.bureau_id
            );
        } else if !report.consistent {
            warn!(
                "submit: {}/{}: stored as anomaly: {:?}",
                key.election_id, key.bureau_id, report.violations
            );
        }
        debug!(
            "submit: {}/{}: {:?} -> {}",
            key.election_id,
            key.bureau_id,
            outcome,
            status.as_str()
        );
        let mut stored = tally;
        stored.status = status;
        stored.entered_at = Some(now);
        stored.validated_at = None;
        self.tallies.insert(
            key,
            StoredTally {
                tally: stored,
                fingerprint,
            },
        );
        Ok(SubmissionReceipt {
            outcome,
            report,
            status,
        })
    }

    /// A reviewer confirms an entered tally.
    pub fn validate(
        &mut self,
        election_id: &ElectionId,
        bureau_id: &BureauId,
        now: NaiveDateTime,
    ) -> Result<TallyStatus, ResultsError> {
        self.review(election_id, bureau_id, TallyStatus::Validated, Some(now))
    }

    /// A reviewer rejects an entered or validated tally.
    pub fn flag(
        &mut self,
        election_id: &ElectionId,
        bureau_id: &BureauId,
    ) -> Result<TallyStatus, ResultsError> {
        self.review(election_id, bureau_id, TallyStatus::Anomaly, None)
    }

    pub fn publish(
        &mut self,
        election_id: &ElectionId,
        bureau_id: &BureauId,
    ) -> Result<TallyStatus, ResultsError> {
        self.review(election_id, bureau_id, TallyStatus::Published, None)
    }

    fn review(
        &mut self,
        election_id: &ElectionId,
        bureau_id: &BureauId,
        to: TallyStatus,
        now: Option<NaiveDateTime>,
    ) -> Result<TallyStatus, ResultsError> {
        let key = TallyKey {
            election_id: election_id.clone(),
            bureau_id: bureau_id.clone(),
        };
        let stored = match self.tallies.get_mut(&key) {
            Some(st) => st,
            None => return Err(ResultsError::MissingTally(key)),
        };
        let from = stored.tally.status;
        if !from.can_review_to(to) {
            return Err(ResultsError::ForbiddenTransition { key, from, to });
        }
        info!(
            "review: {}/{}: {} -> {}",
            election_id,
            bureau_id,
            from.as_str(),
            to.as_str()
        );
        stored.tally.status = to;
        match to {
            TallyStatus::Validated => stored.tally.validated_at = now,
            TallyStatus::Anomaly => stored.tally.validated_at = None,
            _ => {}
        }
        Ok(to)
    }
}

impl ResultsRepository for MemoryStore {
    fn fetch_election(&self, id: &ElectionId) -> Option<Election> {
        self.elections.get(id).cloned()
    }

    fn fetch_elections(&self) -> Vec<Election> {
        self.elections.values().cloned().collect()
    }

    fn fetch_candidates_for_election(&self, id: &ElectionId) -> Vec<Candidate> {
        self.election_candidates
            .get(id)
            .map(|cids| {
                cids.iter()
                    .filter_map(|cid| self.candidates.get(cid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn fetch_center(&self, id: &CenterId) -> Option<VotingCenter> {
        self.centers.get(id).cloned()
    }

    fn fetch_center_bureaus(&self, id: &CenterId) -> Vec<Bureau> {
        self.bureaus
            .values()
            .filter(|b| b.center_id == *id)
            .cloned()
            .collect()
    }

    fn fetch_bureaus_for_election(&self, id: &ElectionId) -> Vec<Bureau> {
        let centers = match self.election_centers.get(id) {
            Some(cs) => cs,
            None => return Vec::new(),
        };
        self.bureaus
            .values()
            .filter(|b| centers.contains(&b.center_id))
            .cloned()
            .collect()
    }

    fn fetch_bureaus(&self, ids: &BTreeSet<BureauId>) -> Vec<Bureau> {
        ids.iter()
            .filter_map(|bid| self.bureaus.get(bid).cloned())
            .collect()
    }

    fn fetch_tallies_for_bureaus(
        &self,
        election: &ElectionId,
        bureaus: &BTreeSet<BureauId>,
    ) -> Vec<Tally> {
        bureaus
            .iter()
            .filter_map(|bid| {
                self.tallies.get(&TallyKey {
                    election_id: election.clone(),
                    bureau_id: bid.clone(),
                })
            })
            .map(|st| st.tally.clone())
            .collect()
    }
}
