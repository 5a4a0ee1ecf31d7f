use log::{debug, info};

use std::collections::HashMap;

use crate::config::*;
use crate::{percentage, VoteCount};

/// The result of one candidate over a set of PVs.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateTotal {
    pub candidate_id: CandidateId,
    pub votes: u64,
    /// Share of all the candidate votes of the set, between 0 and 100.
    pub percentage: f64,
}

/// Turnout figures over a set of PVs.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct TurnoutSummary {
    pub tallies: usize,
    pub registered: u64,
    pub voters: u64,
    pub null_ballots: u64,
    pub valid_ballots: u64,
    /// voters / registered, in percent.
    pub participation_rate: f64,
    /// valid / voters, in percent.
    pub valid_ballot_rate: f64,
}

// Tallies are visited by bureau so that the first-seen order of the candidates,
// used to break ties, does not depend on how the caller listed them.
fn canonical_order(tallies: &[Tally]) -> Vec<&Tally> {
    let mut ordered: Vec<&Tally> = tallies.iter().collect();
    ordered.sort_by(|a, b| {
        (&a.bureau_id, &a.election_id).cmp(&(&b.bureau_id, &b.election_id))
    });
    ordered
}

/// Sums the votes of each candidate over the given PVs and ranks them.
///
/// Negative counts are treated as zero. The list is sorted by decreasing
/// votes; candidates with the same number of votes keep the order in which
/// they first appear.
pub fn aggregate(tallies: &[Tally]) -> Vec<CandidateTotal> {
    let mut seen_order: Vec<CandidateId> = Vec::new();
    let mut sums: HashMap<CandidateId, VoteCount> = HashMap::new();

    for t in canonical_order(tallies) {
        for r in t.results.iter() {
            let count = VoteCount::clamped(
                r.votes,
                &format!("aggregate: {}/{} {}", t.election_id, t.bureau_id, r.candidate_id),
            );
            match sums.get_mut(&r.candidate_id) {
                Some(vc) => *vc += count,
                None => {
                    seen_order.push(r.candidate_id.clone());
                    sums.insert(r.candidate_id.clone(), count);
                }
            }
        }
    }

    let total: VoteCount = sums.values().cloned().sum();
    debug!("aggregate: sums: {:?} total: {:?}", sums, total);

    let mut res: Vec<CandidateTotal> = seen_order
        .into_iter()
        .map(|cid| {
            let votes = sums.get(&cid).cloned().unwrap_or_default().0;
            CandidateTotal {
                candidate_id: cid,
                votes,
                percentage: percentage(votes, total.0),
            }
        })
        .collect();
    // Stable sort: ties keep the first-seen order.
    res.sort_by(|a, b| b.votes.cmp(&a.votes));
    info!(
        "aggregate: {} tallies, {} candidates, {} votes",
        tallies.len(),
        res.len(),
        total.0
    );
    res
}

/// Sums the turnout figures of the given PVs.
pub fn summarize_turnout(tallies: &[Tally]) -> TurnoutSummary {
    let mut registered = VoteCount::EMPTY;
    let mut voters = VoteCount::EMPTY;
    let mut null_ballots = VoteCount::EMPTY;
    let mut valid_ballots = VoteCount::EMPTY;
    for t in tallies.iter() {
        let what = format!("summarize_turnout: {}/{}", t.election_id, t.bureau_id);
        registered += VoteCount::clamped(t.registered, &what);
        voters += VoteCount::clamped(t.voters, &what);
        null_ballots += VoteCount::clamped(t.null_ballots, &what);
        valid_ballots += VoteCount::clamped(t.valid_ballots, &what);
    }
    TurnoutSummary {
        tallies: tallies.len(),
        registered: registered.0,
        voters: voters.0,
        null_ballots: null_ballots.0,
        valid_ballots: valid_ballots.0,
        participation_rate: percentage(voters.0, registered.0),
        valid_ballot_rate: percentage(valid_ballots.0, voters.0),
    }
}
