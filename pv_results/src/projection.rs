use log::{debug, info, warn};

use std::collections::BTreeMap;

use crate::aggregation::aggregate;
use crate::config::*;
use crate::{percentage, VoteCount};

/// Assumptions for the bureaus that have not reported. All values are
/// percentages.
#[derive(PartialEq, Debug, Clone)]
pub struct SimulationParams {
    pub participation_rate: f64,
    pub valid_ballot_rate: f64,
    /// Expected share of the valid ballots for each candidate. Meant to sum to
    /// 100; it is used as given.
    pub candidate_share: BTreeMap<CandidateId, f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProjectedCandidate {
    pub candidate_id: CandidateId,
    pub confirmed_votes: u64,
    pub simulated_votes: u64,
    pub projected_votes: u64,
    pub projected_percentage: f64,
}

/// The candidate shares do not add up to 100.
#[derive(PartialEq, Debug, Clone)]
pub struct ShareDiscrepancy {
    pub share_sum: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Projection {
    /// By decreasing projected votes.
    pub candidates: Vec<ProjectedCandidate>,
    pub confirmed_total: u64,
    pub pending_bureaus: usize,
    pub simulated_voters: u64,
    pub simulated_valid: u64,
    /// `confirmed_total + simulated_valid`
    pub projected_total: u64,
    pub share_discrepancy: Option<ShareDiscrepancy>,
}

impl Projection {
    pub fn candidate_votes_sum(&self) -> u64 {
        self.candidates.iter().map(|c| c.projected_votes).sum()
    }

    /// Distance between the projected total and the sum of the projected
    /// candidate votes. It comes from rounding the candidate shares, and stays
    /// within the number of candidates when the shares add up to 100.
    pub fn rounding_gap(&self) -> u64 {
        let sum = self.candidate_votes_sum();
        sum.max(self.projected_total) - sum.min(self.projected_total)
    }
}

const SHARE_TOLERANCE: f64 = 1e-6;

// Half up. Values are never negative here.
fn round_count(x: f64) -> VoteCount {
    if !x.is_finite() || x <= 0.0 {
        VoteCount::EMPTY
    } else {
        VoteCount(x.round() as u64)
    }
}

fn sanitize_rate(rate: f64, name: &str) -> f64 {
    if !rate.is_finite() || rate < 0.0 {
        warn!("project: {} {} treated as 0", name, rate);
        0.0
    } else if rate > 100.0 {
        warn!("project: {} {} capped at 100", name, rate);
        100.0
    } else {
        rate
    }
}

fn sanitize_share(share: f64, candidate_id: &CandidateId) -> f64 {
    if !share.is_finite() || share < 0.0 {
        warn!("project: share {} of {} treated as 0", share, candidate_id);
        0.0
    } else {
        share
    }
}

/// Projects the final result of an election.
///
/// The confirmed tallies are counted as they are. Each pending bureau gets
/// `round(registered × participation)` voters and `round(voters × valid rate)`
/// valid ballots; the valid ballots of all the pending bureaus are then split
/// between the candidates along `candidate_share`, rounding each candidate's
/// part. Shares are not renormalized: when they do not sum to 100 the
/// projection says so in `share_discrepancy`.
pub fn project(
    election: &Election,
    confirmed: &[Tally],
    pending_bureaus: &[Bureau],
    params: &SimulationParams,
) -> Projection {
    let confirmed_totals = aggregate(confirmed);
    let confirmed_total: VoteCount = confirmed_totals.iter().map(|ct| VoteCount(ct.votes)).sum();

    let participation = sanitize_rate(params.participation_rate, "participation rate");
    let valid_rate = sanitize_rate(params.valid_ballot_rate, "valid ballot rate");

    let mut simulated_voters = VoteCount::EMPTY;
    let mut simulated_valid = VoteCount::EMPTY;
    for b in pending_bureaus.iter() {
        let registered =
            VoteCount::clamped(b.registered_voters, &format!("project: bureau {}", b.id));
        let voters = round_count(registered.0 as f64 * participation / 100.0);
        let valid = round_count(voters.0 as f64 * valid_rate / 100.0);
        debug!(
            "project: {}: bureau {}: registered {:?} voters {:?} valid {:?}",
            election.id, b.id, registered, voters, valid
        );
        simulated_voters += voters;
        simulated_valid += valid;
    }

    let shares: BTreeMap<CandidateId, f64> = params
        .candidate_share
        .iter()
        .map(|(cid, s)| (cid.clone(), sanitize_share(*s, cid)))
        .collect();
    let share_sum: f64 = shares.values().sum();
    let share_discrepancy = if (share_sum - 100.0).abs() > SHARE_TOLERANCE {
        warn!(
            "project: {}: candidate shares sum to {} instead of 100",
            election.id, share_sum
        );
        Some(ShareDiscrepancy { share_sum })
    } else {
        None
    };

    // Confirmed candidates first, in their ranking order, then the candidates
    // that only appear in the shares.
    let mut order: Vec<(CandidateId, VoteCount)> = confirmed_totals
        .iter()
        .map(|ct| (ct.candidate_id.clone(), VoteCount(ct.votes)))
        .collect();
    for cid in shares.keys() {
        if !order.iter().any(|(c, _)| c == cid) {
            order.push((cid.clone(), VoteCount::EMPTY));
        }
    }

    let simulated: Vec<(CandidateId, VoteCount, VoteCount)> = order
        .into_iter()
        .map(|(cid, confirmed_votes)| {
            let share = shares.get(&cid).cloned().unwrap_or(0.0);
            let sim = round_count(simulated_valid.0 as f64 * share / 100.0);
            (cid, confirmed_votes, sim)
        })
        .collect();
    let grand_total: VoteCount = simulated.iter().map(|(_, c, s)| *c + *s).sum();

    let mut candidates: Vec<ProjectedCandidate> = simulated
        .into_iter()
        .map(|(cid, confirmed_votes, sim)| {
            let projected = confirmed_votes + sim;
            ProjectedCandidate {
                candidate_id: cid,
                confirmed_votes: confirmed_votes.0,
                simulated_votes: sim.0,
                projected_votes: projected.0,
                projected_percentage: percentage(projected.0, grand_total.0),
            }
        })
        .collect();
    candidates.sort_by(|a, b| b.projected_votes.cmp(&a.projected_votes));

    let projection = Projection {
        candidates,
        confirmed_total: confirmed_total.0,
        pending_bureaus: pending_bureaus.len(),
        simulated_voters: simulated_voters.0,
        simulated_valid: simulated_valid.0,
        projected_total: (confirmed_total + simulated_valid).0,
        share_discrepancy,
    };
    info!(
        "project: {}: {} pending bureaus, {} simulated valid ballots, projected total {} (gap {})",
        election.id,
        projection.pending_bureaus,
        projection.simulated_valid,
        projection.projected_total,
        projection.rounding_gap()
    );
    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TallyBuilder;
    use chrono::NaiveDate;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn election() -> Election {
        Election {
            id: "E".into(),
            name: "Locales".to_string(),
            election_type: ElectionType::Local,
            anchor: GeoAnchor::default(),
            date: NaiveDate::from_ymd_opt(2023, 8, 26).unwrap(),
            status: ElectionStatus::Ongoing,
        }
    }

    fn bureau(id: &str, registered: i64) -> Bureau {
        Bureau {
            id: id.into(),
            name: id.to_string(),
            center_id: "C".into(),
            registered_voters: registered,
        }
    }

    fn confirmed() -> Vec<Tally> {
        vec![TallyBuilder::new(&"E".into(), &"B1".into())
            .registered(300)
            .voters(250)
            .null_ballots(10)
            .valid_ballots(240)
            .candidate(&"A".into(), 140)
            .candidate(&"B".into(), 100)
            .build()]
    }

    fn params(participation: f64, valid: f64, shares: &[(&str, f64)]) -> SimulationParams {
        SimulationParams {
            participation_rate: participation,
            valid_ballot_rate: valid,
            candidate_share: shares.iter().map(|(c, s)| ((*c).into(), *s)).collect(),
        }
    }

    #[test]
    fn full_turnout_adds_registered_voters() {
        init();
        let p = project(
            &election(),
            &confirmed(),
            &[bureau("B2", 417)],
            &params(100.0, 100.0, &[("A", 50.0), ("B", 50.0)]),
        );
        assert_eq!(p.confirmed_total, 240);
        assert_eq!(p.simulated_voters, 417);
        assert_eq!(p.simulated_valid, 417);
        assert_eq!(p.projected_total, 240 + 417);
        assert_eq!(p.share_discrepancy, None);
    }

    #[test]
    fn rounding_at_each_step() {
        init();
        // 333 * 0.65 = 216.45 -> 216 voters, 216 * 0.9 = 194.4 -> 194 valid.
        let p = project(
            &election(),
            &[],
            &[bureau("B2", 333)],
            &params(65.0, 90.0, &[("A", 55.0), ("B", 45.0)]),
        );
        assert_eq!(p.simulated_voters, 216);
        assert_eq!(p.simulated_valid, 194);
        // 194 * 0.55 = 106.7 -> 107, 194 * 0.45 = 87.3 -> 87
        assert_eq!(p.candidates[0].candidate_id, "A".into());
        assert_eq!(p.candidates[0].simulated_votes, 107);
        assert_eq!(p.candidates[1].simulated_votes, 87);
        assert_eq!(p.rounding_gap(), 0);
    }

    #[test]
    fn rounding_gap_is_bounded() {
        init();
        let shares = [("A", 100.0 / 3.0), ("B", 100.0 / 3.0), ("C", 100.0 / 3.0)];
        let pending: Vec<Bureau> = (1..=25)
            .map(|i| bureau(&format!("P{:02}", i), 7 * i + 3))
            .collect();
        for participation in [10.0, 33.0, 47.5, 61.0, 88.8, 100.0] {
            for valid in [80.0, 91.0, 99.5] {
                let p = project(
                    &election(),
                    &confirmed(),
                    &pending,
                    &params(participation, valid, &shares),
                );
                assert!(p.share_discrepancy.is_none());
                assert!(
                    p.rounding_gap() <= p.candidates.len() as u64,
                    "{:?}",
                    p
                );
            }
        }
    }

    #[test]
    fn shares_are_not_renormalized() {
        init();
        let p = project(
            &election(),
            &confirmed(),
            &[bureau("B2", 100)],
            &params(100.0, 100.0, &[("A", 60.0), ("B", 20.0)]),
        );
        assert_eq!(p.share_discrepancy, Some(ShareDiscrepancy { share_sum: 80.0 }));
        assert_eq!(p.projected_total, 340);
        assert_eq!(p.candidate_votes_sum(), 320);
        assert_eq!(p.rounding_gap(), 20);
        let total: f64 = p.candidates.iter().map(|c| c.projected_percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn new_candidates_and_ranking() {
        init();
        let p = project(
            &election(),
            &confirmed(),
            &[bureau("B2", 1000)],
            &params(50.0, 100.0, &[("A", 10.0), ("B", 10.0), ("C", 80.0)]),
        );
        let ranking: Vec<(String, u64)> = p
            .candidates
            .iter()
            .map(|c| (c.candidate_id.to_string(), c.projected_votes))
            .collect();
        assert_eq!(
            ranking,
            vec![
                ("C".to_string(), 400),
                ("A".to_string(), 190),
                ("B".to_string(), 150)
            ]
        );
        assert_eq!(p.candidates[0].confirmed_votes, 0);
    }

    #[test]
    fn malformed_parameters_have_no_effect() {
        init();
        let p = project(
            &election(),
            &confirmed(),
            &[bureau("B2", 100), bureau("B3", -50)],
            &params(f64::NAN, 100.0, &[("A", f64::INFINITY), ("B", -3.0)]),
        );
        assert_eq!(p.simulated_voters, 0);
        assert_eq!(p.projected_total, 240);
        assert!(p
            .candidates
            .iter()
            .all(|c| c.projected_percentage.is_finite()));
        assert_eq!(p.share_discrepancy, Some(ShareDiscrepancy { share_sum: 0.0 }));

        let p = project(
            &election(),
            &[],
            &[bureau("B2", 100)],
            &params(150.0, 100.0, &[("A", 100.0)]),
        );
        assert_eq!(p.simulated_voters, 100);
    }

    #[test]
    fn nothing_to_project() {
        init();
        let p = project(&election(), &[], &[], &params(50.0, 90.0, &[]));
        assert_eq!(p.projected_total, 0);
        assert!(p.candidates.is_empty());
        assert!(p.share_discrepancy.is_some());
    }
}
