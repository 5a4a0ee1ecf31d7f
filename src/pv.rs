use log::{debug, info, warn};

use pv_results::builder::TallyBuilder;
use pv_results::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::pv::config_reader::*;

mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum PvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Unexpected cell in row {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Unexpected JSON value for {field} of bureau {bureau}"))]
    JsonWrongValue { field: String, bureau: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Missing bureau identifier on line {lineno}"))]
    MissingBureau { lineno: usize },
    #[snafu(display("Malformed PV on line {lineno}: {source}"))]
    MalformedPv { source: ResultsError, lineno: usize },
    #[snafu(display("Invalid dataset: {source}"))]
    Dataset { source: ResultsError },
    #[snafu(display("Invalid date {date} for election {election}"))]
    ParsingDate {
        source: chrono::ParseError,
        date: String,
        election: String,
    },
    #[snafu(display("Cannot understand scope {scope:?}"))]
    UnknownScope { scope: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error writing summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PvResult<T> = Result<T, PvError>;

pub mod config_reader {
    use crate::pv::*;
    use std::collections::BTreeMap;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputSettings {
        #[serde(rename = "electionId")]
        pub election_id: String,
        /// `election`, `commune`, `department`, `bureau:<id>` or `center:<id>`
        pub scope: Option<String>,
        /// `confirmed` or `entered`
        pub counting: Option<String>,
        pub simulate: Option<bool>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ElectionConfig {
        pub id: String,
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub election_type: String,
        pub province: Option<String>,
        pub department: Option<String>,
        pub commune: Option<String>,
        pub date: String,
        pub status: Option<String>,
        #[serde(default)]
        pub candidates: Vec<String>,
        #[serde(default)]
        pub centers: Vec<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct CandidateConfig {
        pub id: String,
        pub name: String,
        pub party: Option<String>,
        #[serde(rename = "isOurs")]
        pub is_ours: Option<bool>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct BureauConfig {
        pub id: String,
        pub name: Option<String>,
        #[serde(rename = "registeredVoters")]
        pub registered_voters: i64,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct CenterConfig {
        pub id: String,
        pub name: String,
        pub address: Option<String>,
        pub province: Option<String>,
        pub department: Option<String>,
        pub commune: Option<String>,
        /// Computed from the bureaus when missing.
        #[serde(rename = "registeredVoters")]
        pub registered_voters: Option<i64>,
        #[serde(default)]
        pub bureaus: Vec<BureauConfig>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ResolverSettings {
        #[serde(rename = "minDepartmentBureaus")]
        pub min_department_bureaus: Option<usize>,
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SimulationSettings {
        #[serde(rename = "participationRate")]
        pub participation_rate: f64,
        #[serde(rename = "validBallotRate")]
        pub valid_ballot_rate: f64,
        #[serde(rename = "candidateShare")]
        pub candidate_share: BTreeMap<String, f64>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct PvSource {
        /// `json`, `csv` or `xlsx`
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        /// Defaults to the election of the output settings.
        #[serde(rename = "electionId")]
        pub election_id: Option<String>,
        #[serde(rename = "worksheetName")]
        pub worksheet_name: Option<String>,
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        #[serde(rename = "outputSettings")]
        pub output_settings: OutputSettings,
        pub elections: Vec<ElectionConfig>,
        pub candidates: Vec<CandidateConfig>,
        pub centers: Vec<CenterConfig>,
        pub resolver: Option<ResolverSettings>,
        pub simulation: Option<SimulationSettings>,
        #[serde(rename = "pvSources", default)]
        pub pv_sources: Vec<PvSource>,
    }

    pub fn read_config(path: &str) -> PvResult<DatasetConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
    }

    pub fn read_summary(path: &str) -> PvResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        debug!("read content: {:?}", contents);
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }
}

/// A PV as read from a sheet, before any check.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedPv {
    pub lineno: usize,
    pub bureau: String,
    /// (field, raw value): `registered`, `voters`, `null`, `valid` or a
    /// candidate identifier.
    pub counts: Vec<(String, String)>,
    pub submitter: Option<String>,
    pub document: Option<String>,
    /// `validated` or `published` when the sheet records a review.
    pub review: Option<String>,
}

/// How the command line tailors a run.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunOptions {
    pub scope: Option<String>,
    pub counting: Option<String>,
    pub simulate: bool,
    pub out: Option<String>,
}

fn read_pv_data(root_path: &Path, source: &PvSource) -> PvResult<Vec<ParsedPv>> {
    let p: PathBuf = root_path.join(&source.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read PV file {:?}", p2);
    match source.provider.as_str() {
        "csv" => io_csv::read_csv_pvs(&p2),
        "json" => io_json::read_json_pvs(&p2),
        "xlsx" => io_xlsx::read_excel_pvs(&p2, source),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn validate_election(e: &ElectionConfig) -> PvResult<Election> {
    let election_type = match ElectionType::parse(&e.election_type) {
        Some(t) => t,
        None => whatever!(
            "Unknown type {:?} for election {}",
            e.election_type,
            e.id
        ),
    };
    let status = match e.status.as_deref().map(ElectionStatus::parse) {
        None => ElectionStatus::Upcoming,
        Some(Some(s)) => s,
        Some(None) => whatever!("Unknown status {:?} for election {}", e.status, e.id),
    };
    let date = NaiveDate::parse_from_str(&e.date, "%Y-%m-%d").context(ParsingDateSnafu {
        date: e.date.clone(),
        election: e.id.clone(),
    })?;
    Ok(Election {
        id: ElectionId::new(e.id.as_str()),
        name: e.name.clone().unwrap_or_else(|| e.id.clone()),
        election_type,
        anchor: GeoAnchor {
            province: e.province.clone(),
            department: e.department.clone(),
            commune: e.commune.clone(),
        },
        date,
        status,
    })
}

fn build_store(config: &DatasetConfig) -> PvResult<MemoryStore> {
    let mut store = MemoryStore::new();

    for c in config.candidates.iter() {
        store.add_candidate(Candidate {
            id: CandidateId::new(c.id.as_str()),
            name: c.name.clone(),
            party: match c.party.clone() {
                Some(x) if x.is_empty() => None,
                x => x,
            },
            is_ours: c.is_ours.unwrap_or(false),
        });
    }

    for c in config.centers.iter() {
        let center_id = CenterId::new(c.id.as_str());
        let bureaus: Vec<Bureau> = c
            .bureaus
            .iter()
            .map(|b| Bureau {
                id: BureauId::new(b.id.as_str()),
                name: b.name.clone().unwrap_or_else(|| b.id.clone()),
                center_id: center_id.clone(),
                registered_voters: b.registered_voters,
            })
            .collect();
        let computed: i64 = bureaus
            .iter()
            .fold(0_i64, |acc, b| acc.saturating_add(b.registered_voters));
        let center = VotingCenter {
            id: center_id,
            name: c.name.clone(),
            address: c.address.clone(),
            anchor: GeoAnchor {
                province: c.province.clone(),
                department: c.department.clone(),
                commune: c.commune.clone(),
            },
            registered_voters: c.registered_voters.unwrap_or(computed),
        };
        if let Some(m) = check_center_registration(&center, &bureaus) {
            warn!(
                "Center {}: {} registered voters cached, {} in its bureaus",
                m.center_id, m.cached, m.computed
            );
        }
        store.add_center(center);
        for b in bureaus {
            store.add_bureau(b).context(DatasetSnafu {})?;
        }
    }

    for e in config.elections.iter() {
        let election = validate_election(e)?;
        let eid = election.id.clone();
        store.add_election(election);
        for cid in e.candidates.iter() {
            store
                .register_candidate(&eid, &CandidateId::new(cid.as_str()))
                .context(DatasetSnafu {})?;
        }
        for cid in e.centers.iter() {
            store
                .register_center(&eid, &CenterId::new(cid.as_str()))
                .context(DatasetSnafu {})?;
        }
    }
    Ok(store)
}

fn create_tally(election_id: &ElectionId, pv: &ParsedPv, store: &MemoryStore) -> PvResult<Tally> {
    let bureau_id = BureauId::new(pv.bureau.as_str());
    let wanted: BTreeSet<BureauId> = [bureau_id.clone()].into_iter().collect();
    // The registered count of the bureau stands in for a blank cell.
    let registered = store
        .fetch_bureaus(&wanted)
        .first()
        .map(|b| b.registered_voters)
        .unwrap_or(0);
    let mut builder = TallyBuilder::new(election_id, &bureau_id).registered(registered);
    for (field, raw) in pv.counts.iter() {
        if field == "registered" && raw.trim().is_empty() {
            continue;
        }
        builder
            .add_raw_count(field, raw)
            .context(MalformedPvSnafu { lineno: pv.lineno })?;
    }
    if let Some(s) = pv.submitter.as_deref() {
        builder = builder.submitter(s);
    }
    if let Some(d) = pv.document.as_deref() {
        builder = builder.document(d);
    }
    Ok(builder.build())
}

fn apply_review(
    store: &mut MemoryStore,
    election_id: &ElectionId,
    pv: &ParsedPv,
    now: chrono::NaiveDateTime,
) -> Result<(), ResultsError> {
    let bureau_id = BureauId::new(pv.bureau.as_str());
    match pv.review.as_deref() {
        Some("validated") => {
            store.validate(election_id, &bureau_id, now)?;
        }
        Some("published") => {
            store.validate(election_id, &bureau_id, now)?;
            store.publish(election_id, &bureau_id)?;
        }
        Some(x) => warn!("Bureau {}: unknown review {:?}, ignored", pv.bureau, x),
        None => {}
    }
    Ok(())
}

pub fn parse_scope(s: &str) -> PvResult<Scope> {
    let res = match s.trim().split_once(':') {
        None if s.trim() == "election" => Scope::Election,
        None if s.trim() == "commune" => Scope::Zone(ZoneKind::Commune),
        None if s.trim() == "department" => Scope::Zone(ZoneKind::Department),
        Some(("bureau", id)) if !id.is_empty() => Scope::Bureau(BureauId::new(id)),
        Some(("center", id)) if !id.is_empty() => Scope::Center(CenterId::new(id)),
        _ => return UnknownScopeSnafu { scope: s }.fail(),
    };
    Ok(res)
}

fn parse_counting(s: &str) -> PvResult<Counting> {
    match s {
        "confirmed" => Ok(Counting::Confirmed),
        "entered" => Ok(Counting::Entered),
        x => whatever!("Cannot use counting mode {:?}", x),
    }
}

fn simulation_params(s: &SimulationSettings) -> SimulationParams {
    SimulationParams {
        participation_rate: s.participation_rate,
        valid_ballot_rate: s.valid_ballot_rate,
        candidate_share: s
            .candidate_share
            .iter()
            .map(|(cid, share)| (CandidateId::new(cid.as_str()), *share))
            .collect(),
    }
}

fn scope_label(scope: &Scope) -> String {
    match scope {
        Scope::Election => "election".to_string(),
        Scope::Bureau(bid) => format!("bureau:{}", bid),
        Scope::Center(cid) => format!("center:{}", cid),
        Scope::Zone(z) => z.as_str().to_string(),
    }
}

fn provenance_label(p: &Provenance) -> String {
    match p {
        Provenance::Own => "own".to_string(),
        Provenance::Sibling(eid) => format!("sibling:{}", eid),
        Provenance::Fallback => "fallback".to_string(),
    }
}

fn describe_violation(v: &Violation) -> String {
    match v {
        Violation::ParticipationBound { voters, registered } => {
            format!("{} voters for {} registered", voters, registered)
        }
        Violation::BallotPartition {
            null_ballots,
            valid_ballots,
            voters,
        } => format!(
            "{} null + {} valid ballots differ from {} voters",
            null_ballots, valid_ballots, voters
        ),
        Violation::CandidateSumMismatch {
            candidate_sum,
            valid_ballots,
        } => format!(
            "candidate votes {} differ from valid ballots {}",
            candidate_sum, valid_ballots
        ),
        Violation::NegativeCount { field, value } => {
            let name = match field {
                CountField::Registered => "registered".to_string(),
                CountField::NullBallots => "null".to_string(),
                CountField::ValidBallots => "valid".to_string(),
                CountField::Candidate(cid) => cid.to_string(),
            };
            format!("negative count {} for {}", value, name)
        }
    }
}

const FLAGGED_BY_REVIEW: &str = "flagged by review";

// A tally flagged by a reviewer may be arithmetically consistent.
fn anomaly_messages(t: &Tally) -> Vec<String> {
    let messages: Vec<String> = validate(t)
        .violations
        .iter()
        .map(describe_violation)
        .collect();
    if messages.is_empty() {
        vec![FLAGGED_BY_REVIEW.to_string()]
    } else {
        messages
    }
}

fn pct(x: f64) -> String {
    format!("{:.1}", round_to(x, 1))
}

fn candidate_js(store: &MemoryStore, cid: &CandidateId) -> (JSValue, JSValue, JSValue) {
    match store.candidate(cid) {
        Some(c) => (json!(c.name), json!(c.party), json!(c.is_ours)),
        None => (json!(cid.to_string()), JSValue::Null, json!(false)),
    }
}

fn results_to_json(store: &MemoryStore, results: &[CandidateTotal]) -> Vec<JSValue> {
    results
        .iter()
        .map(|ct| {
            let (name, party, ours) = candidate_js(store, &ct.candidate_id);
            json!({
                "candidate": ct.candidate_id.to_string(),
                "name": name,
                "party": party,
                "ours": ours,
                "votes": ct.votes.to_string(),
                "percentage": pct(ct.percentage),
            })
        })
        .collect()
}

fn projection_to_json(store: &MemoryStore, p: &Projection) -> JSValue {
    let candidates: Vec<JSValue> = p
        .candidates
        .iter()
        .map(|pc| {
            let (name, _, ours) = candidate_js(store, &pc.candidate_id);
            json!({
                "candidate": pc.candidate_id.to_string(),
                "name": name,
                "ours": ours,
                "confirmed": pc.confirmed_votes.to_string(),
                "simulated": pc.simulated_votes.to_string(),
                "projected": pc.projected_votes.to_string(),
                "percentage": pct(pc.projected_percentage),
            })
        })
        .collect();
    json!({
        "pendingBureaus": p.pending_bureaus.to_string(),
        "simulatedVoters": p.simulated_voters.to_string(),
        "simulatedValid": p.simulated_valid.to_string(),
        "confirmedTotal": p.confirmed_total.to_string(),
        "projectedTotal": p.projected_total.to_string(),
        "roundingGap": p.rounding_gap().to_string(),
        "shareSum": p.share_discrepancy.as_ref().map(|d| format!("{}", d.share_sum)),
        "results": candidates,
    })
}

fn build_summary_js(
    store: &MemoryStore,
    c: &Consolidation,
    projection: Option<&Projection>,
    rejected: &[(String, String)],
) -> JSValue {
    let anomalies: Vec<JSValue> = store
        .fetch_tallies_for_bureaus(&c.election.id, &c.resolution.bureaus)
        .iter()
        .filter(|t| t.status == TallyStatus::Anomaly)
        .map(|t| json!({"bureau": t.bureau_id.to_string(), "violations": anomaly_messages(t)}))
        .collect();
    let rejected_js: Vec<JSValue> = rejected
        .iter()
        .map(|(bureau, reason)| json!({"bureau": bureau, "reason": reason}))
        .collect();
    let bureaus: Vec<String> = c.resolution.bureaus.iter().map(|b| b.to_string()).collect();
    let outstanding: Vec<String> = c.progress.outstanding.iter().map(|b| b.to_string()).collect();

    let mut js = json!({
        "config": {
            "election": c.election.id.to_string(),
            "name": c.election.name,
            "type": c.election.election_type.as_str(),
            "date": c.election.date.format("%Y-%m-%d").to_string(),
            "scope": scope_label(&c.scope),
            "counting": match c.counting {
                Counting::Confirmed => "confirmed",
                Counting::Entered => "entered",
            },
        },
        "scope": {
            "provenance": provenance_label(&c.resolution.provenance),
            "padded": c.resolution.padded.to_string(),
            "bureaus": bureaus,
        },
        "progress": {
            "bureaus": c.progress.bureaus_in_scope.to_string(),
            "counted": c.progress.counted.to_string(),
            "anomalies": c.progress.anomalies.to_string(),
            "outstanding": outstanding,
            "completion": pct(c.progress.completion_rate()),
        },
        "turnout": {
            "registered": c.turnout.registered.to_string(),
            "voters": c.turnout.voters.to_string(),
            "null": c.turnout.null_ballots.to_string(),
            "valid": c.turnout.valid_ballots.to_string(),
            "participation": pct(c.turnout.participation_rate),
            "validBallotRate": pct(c.turnout.valid_ballot_rate),
        },
        "results": results_to_json(store, &c.results),
        "anomalies": anomalies,
        "rejected": rejected_js,
    });
    if let Some(p) = projection {
        js["projection"] = projection_to_json(store, p);
    }
    js
}

fn write_output(out: Option<&str>, content: &str) -> PvResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", content);
            Ok(())
        }
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, content).context(WritingOutputSnafu { path })
        }
    }
}

pub fn run_election(
    config_path: &str,
    options: &RunOptions,
    check_summary_path: Option<&str>,
) -> PvResult<()> {
    let config_p = Path::new(config_path);
    let config = read_config(config_path)?;
    info!("config: {:?}", config);

    let mut store = build_store(&config)?;
    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let default_election = ElectionId::new(config.output_settings.election_id.as_str());
    let now = chrono::Utc::now().naive_utc();

    let mut rejected: Vec<(String, String)> = Vec::new();
    for source in config.pv_sources.iter() {
        let election_id = source
            .election_id
            .as_deref()
            .map(ElectionId::new)
            .unwrap_or_else(|| default_election.clone());
        let pvs = read_pv_data(root_p, source)?;
        info!("Read {} PVs from {}", pvs.len(), source.file_path);
        for pv in pvs.iter() {
            let tally = create_tally(&election_id, pv, &store)?;
            let submitted = store
                .submit(tally, now)
                .and_then(|_| apply_review(&mut store, &election_id, pv, now));
            if let Err(e) = submitted {
                warn!("Bureau {}: PV rejected: {}", pv.bureau, e);
                rejected.push((pv.bureau.clone(), e.to_string()));
            }
        }
    }

    let scope = parse_scope(
        options
            .scope
            .as_deref()
            .or(config.output_settings.scope.as_deref())
            .unwrap_or("election"),
    )?;
    let counting = parse_counting(
        options
            .counting
            .as_deref()
            .or(config.output_settings.counting.as_deref())
            .unwrap_or("confirmed"),
    )?;
    let resolver = ResolverConfig {
        min_department_bureaus: config
            .resolver
            .as_ref()
            .and_then(|r| r.min_department_bureaus)
            .unwrap_or(ResolverConfig::DEFAULT_CONFIG.min_department_bureaus),
    };
    let simulate_requested = options.simulate || config.output_settings.simulate.unwrap_or(false);

    let consolidation = match consolidate(&store, &default_election, &scope, &resolver, counting) {
        Result::Ok(x) => x,
        Result::Err(x) => {
            whatever!("Consolidation error: {}", x)
        }
    };
    if consolidation.resolution.used_fallback() {
        warn!(
            "No sibling election found for the {} scope: showing the bureaus of {}",
            scope_label(&scope),
            default_election
        );
    }

    let projection: Option<Projection> = if simulate_requested {
        let settings = match config.simulation.as_ref() {
            Some(s) => s,
            None => whatever!("Simulation requested but the dataset has no simulation block"),
        };
        let params = simulation_params(settings);
        match simulate(&store, &default_election, &scope, &resolver, &params) {
            Result::Ok((_, p)) => Some(p),
            Result::Err(x) => whatever!("Simulation error: {}", x),
        }
    } else {
        None
    };

    let result_js = build_summary_js(&store, &consolidation, projection.as_ref(), &rejected);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(options.out.as_deref(), &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

pub fn report_error(e: &PvError) {
    eprintln!("An error occured: {}", e);
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

#[cfg(test)]
fn run_dataset_test(test_name: &str, options: &RunOptions) {
    let _ = env_logger::builder().is_test(true).try_init();
    let test_dir = format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), test_name);
    info!("Running test {}", test_name);
    let res = run_election(
        &format!("{}/{}_config.json", test_dir, test_name),
        options,
        Some(&format!("{}/{}_expected_summary.json", test_dir, test_name)),
    );
    if let Err(e) = res {
        report_error(&e);
        panic!("test {} failed: {}", test_name, e);
    }
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    run_dataset_test(
        test_name,
        &RunOptions {
            out: Some(
                std::env::temp_dir()
                    .join(format!("{}_summary.json", test_name))
                    .display()
                    .to_string(),
            ),
            ..RunOptions::default()
        },
    )
}
