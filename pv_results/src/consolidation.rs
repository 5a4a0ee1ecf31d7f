use log::info;

use std::collections::BTreeSet;

use crate::aggregation::{aggregate, summarize_turnout, CandidateTotal, TurnoutSummary};
use crate::config::*;
use crate::percentage;
use crate::projection::{project, Projection, SimulationParams};
use crate::scope::{resolve_bureau_set, Scope, ScopeResolution};
use crate::store::ResultsRepository;

/// How far the bureaus of a scope have reported.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportingProgress {
    pub bureaus_in_scope: usize,
    /// Bureaus whose tally is counted.
    pub counted: usize,
    /// Bureaus whose tally is flagged as an anomaly.
    pub anomalies: usize,
    /// Bureaus without a counted tally, in identifier order.
    pub outstanding: Vec<BureauId>,
}

impl ReportingProgress {
    pub fn completion_rate(&self) -> f64 {
        percentage(self.counted as u64, self.bureaus_in_scope as u64)
    }
}

/// The results of one scope of an election.
#[derive(PartialEq, Debug, Clone)]
pub struct Consolidation {
    pub election: Election,
    pub scope: Scope,
    pub counting: Counting,
    pub resolution: ScopeResolution,
    /// The tallies that were counted.
    pub tallies: Vec<Tally>,
    pub results: Vec<CandidateTotal>,
    pub turnout: TurnoutSummary,
    pub progress: ReportingProgress,
}

/// Resolves the scope, collects the tallies that count and aggregates them.
pub fn consolidate<R: ResultsRepository + ?Sized>(
    repo: &R,
    election_id: &ElectionId,
    scope: &Scope,
    config: &ResolverConfig,
    counting: Counting,
) -> Result<Consolidation, ResultsError> {
    let election = repo
        .fetch_election(election_id)
        .ok_or_else(|| ResultsError::UnknownElection(election_id.clone()))?;
    match scope {
        Scope::Center(cid) => {
            repo.fetch_center(cid)
                .ok_or_else(|| ResultsError::UnknownCenter(cid.clone()))?;
        }
        Scope::Bureau(bid) => {
            let wanted: BTreeSet<BureauId> = [bid.clone()].into_iter().collect();
            if repo.fetch_bureaus(&wanted).is_empty() {
                return Err(ResultsError::UnknownBureau(bid.clone()));
            }
        }
        _ => {}
    }

    let resolution = resolve_bureau_set(repo, &election, scope, config);
    let (tallies, others): (Vec<Tally>, Vec<Tally>) = repo
        .fetch_tallies_for_bureaus(&election.id, &resolution.bureaus)
        .into_iter()
        .partition(|t| counting.counts(t.status));

    let counted_bureaus: BTreeSet<&BureauId> = tallies.iter().map(|t| &t.bureau_id).collect();
    let progress = ReportingProgress {
        bureaus_in_scope: resolution.bureaus.len(),
        counted: tallies.len(),
        anomalies: others
            .iter()
            .filter(|t| t.status == TallyStatus::Anomaly)
            .count(),
        outstanding: resolution
            .bureaus
            .iter()
            .filter(|bid| !counted_bureaus.contains(bid))
            .cloned()
            .collect(),
    };
    info!(
        "consolidate: {} {:?}: {}/{} bureaus counted, {} anomalies",
        election.id, scope, progress.counted, progress.bureaus_in_scope, progress.anomalies
    );

    let results = aggregate(&tallies);
    let turnout = summarize_turnout(&tallies);
    Ok(Consolidation {
        election,
        scope: scope.clone(),
        counting,
        resolution,
        tallies,
        results,
        turnout,
        progress,
    })
}

/// Consolidates the confirmed tallies of a scope and projects the outstanding
/// bureaus with the given assumptions.
pub fn simulate<R: ResultsRepository + ?Sized>(
    repo: &R,
    election_id: &ElectionId,
    scope: &Scope,
    config: &ResolverConfig,
    params: &SimulationParams,
) -> Result<(Consolidation, Projection), ResultsError> {
    let consolidation = consolidate(repo, election_id, scope, config, Counting::Confirmed)?;
    let outstanding: BTreeSet<BureauId> =
        consolidation.progress.outstanding.iter().cloned().collect();
    let pending = repo.fetch_bureaus(&outstanding);
    let projection = project(
        &consolidation.election,
        &consolidation.tallies,
        &pending,
        params,
    );
    Ok((consolidation, projection))
}
