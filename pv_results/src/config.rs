// ********* Identifiers ***********

use std::error::Error;
use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> $name {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> $name {
                $name(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of an election.
    ElectionId
);
string_id!(
    /// Identifier of a candidate. The same candidate may run in several elections.
    CandidateId
);
string_id!(
    /// Identifier of a voting center (a physical site).
    CenterId
);
string_id!(
    /// Identifier of a voting bureau (a single polling station).
    BureauId
);

// ********* Elections and geography ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ElectionType {
    Legislative,
    Local,
    Presidential,
}

impl ElectionType {
    pub fn parse(s: &str) -> Option<ElectionType> {
        match s.trim().to_lowercase().as_str() {
            "legislative" | "legislatives" => Some(ElectionType::Legislative),
            "local" | "locales" => Some(ElectionType::Local),
            "presidential" | "presidentielle" => Some(ElectionType::Presidential),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionType::Legislative => "legislative",
            ElectionType::Local => "local",
            ElectionType::Presidential => "presidential",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ElectionStatus {
    Upcoming,
    Ongoing,
    Finished,
    Cancelled,
}

impl ElectionStatus {
    pub fn parse(s: &str) -> Option<ElectionStatus> {
        match s.trim().to_lowercase().as_str() {
            "upcoming" => Some(ElectionStatus::Upcoming),
            "ongoing" => Some(ElectionStatus::Ongoing),
            "finished" => Some(ElectionStatus::Finished),
            "cancelled" | "canceled" => Some(ElectionStatus::Cancelled),
            _ => None,
        }
    }
}

/// The administrative levels an election or a center is attached to.
/// Any level may be unknown.
#[derive(Eq, PartialEq, Debug, Clone, Default, Hash)]
pub struct GeoAnchor {
    pub province: Option<String>,
    pub department: Option<String>,
    pub commune: Option<String>,
}

/// A geographic level used to match sibling elections.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum AnchorLevel {
    Commune,
    Department,
}

impl GeoAnchor {
    pub fn level(&self, level: AnchorLevel) -> Option<&str> {
        match level {
            AnchorLevel::Commune => self.commune.as_deref(),
            AnchorLevel::Department => self.department.as_deref(),
        }
    }

    /// True if both anchors name the same, known, entity at this level.
    pub fn shares(&self, other: &GeoAnchor, level: AnchorLevel) -> bool {
        match (self.level(level), other.level(level)) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    pub id: ElectionId,
    pub name: String,
    pub election_type: ElectionType,
    pub anchor: GeoAnchor,
    pub date: NaiveDate,
    pub status: ElectionStatus,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: Option<String>,
    /// Marks the candidate supported by the campaign running the dashboard.
    pub is_ours: bool,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VotingCenter {
    pub id: CenterId,
    pub name: String,
    pub address: Option<String>,
    pub anchor: GeoAnchor,
    /// Cached sum of the registered voters of its bureaus.
    pub registered_voters: i64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Bureau {
    pub id: BureauId,
    pub name: String,
    pub center_id: CenterId,
    pub registered_voters: i64,
}

// ********* Tallies ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TallyStatus {
    Pending,
    Entered,
    Validated,
    Anomaly,
    Published,
}

impl TallyStatus {
    pub fn parse(s: &str) -> Option<TallyStatus> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(TallyStatus::Pending),
            "entered" => Some(TallyStatus::Entered),
            "validated" => Some(TallyStatus::Validated),
            "anomaly" => Some(TallyStatus::Anomaly),
            "published" => Some(TallyStatus::Published),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TallyStatus::Pending => "pending",
            TallyStatus::Entered => "entered",
            TallyStatus::Validated => "validated",
            TallyStatus::Anomaly => "anomaly",
            TallyStatus::Published => "published",
        }
    }

    /// Validated and published tallies are the confirmed results.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TallyStatus::Validated | TallyStatus::Published)
    }

    /// The transitions a human review action may trigger.
    ///
    /// Submissions are handled separately: they always land on `Entered` or
    /// `Anomaly`, whatever the previous state, except for published tallies.
    pub fn can_review_to(&self, next: TallyStatus) -> bool {
        matches!(
            (self, next),
            (TallyStatus::Entered, TallyStatus::Validated)
                | (TallyStatus::Entered, TallyStatus::Anomaly)
                | (TallyStatus::Validated, TallyStatus::Anomaly)
                | (TallyStatus::Validated, TallyStatus::Published)
        )
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub votes: i64,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct TallyKey {
    pub election_id: ElectionId,
    pub bureau_id: BureauId,
}

/// The PV of one bureau for one election.
///
/// Counts are kept signed so that malformed field data can be stored and
/// reported instead of being lost at the boundary.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Tally {
    pub election_id: ElectionId,
    pub bureau_id: BureauId,
    pub registered: i64,
    pub voters: i64,
    pub null_ballots: i64,
    pub valid_ballots: i64,
    pub status: TallyStatus,
    pub submitter: Option<String>,
    /// Reference to the scanned document in the object store.
    pub document: Option<String>,
    pub entered_at: Option<NaiveDateTime>,
    pub validated_at: Option<NaiveDateTime>,
    pub results: Vec<CandidateResult>,
}

impl Tally {
    /// An empty, pending tally.
    pub fn new(election_id: &ElectionId, bureau_id: &BureauId) -> Tally {
        Tally {
            election_id: election_id.clone(),
            bureau_id: bureau_id.clone(),
            registered: 0,
            voters: 0,
            null_ballots: 0,
            valid_ballots: 0,
            status: TallyStatus::Pending,
            submitter: None,
            document: None,
            entered_at: None,
            validated_at: None,
            results: Vec::new(),
        }
    }

    pub fn key(&self) -> TallyKey {
        TallyKey {
            election_id: self.election_id.clone(),
            bureau_id: self.bureau_id.clone(),
        }
    }

    pub fn candidate_sum(&self) -> i64 {
        self.results
            .iter()
            .fold(0_i64, |acc, r| acc.saturating_add(r.votes))
    }

    /// A digest of the submitted content of the PV.
    ///
    /// Status, submitter and timestamps are not part of it: two submissions
    /// with the same figures and document have the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let results: Vec<String> = self
            .results
            .iter()
            .map(|r| format!("{}={}", r.candidate_id, r.votes))
            .collect();
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.election_id,
            self.bureau_id,
            self.registered,
            self.voters,
            self.null_ballots,
            self.valid_ballots,
            self.document.clone().unwrap_or_default(),
            results.join(";")
        );
        sha256::digest(canonical.as_str())
    }
}

// ********* Errors **********

/// Errors raised by the store and the consolidation entry points.
///
/// The computations themselves (validation, aggregation, scope resolution,
/// projection) never fail.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ResultsError {
    UnknownElection(ElectionId),
    UnknownCandidate(CandidateId),
    UnknownCenter(CenterId),
    UnknownBureau(BureauId),
    BureauNotInElection(ElectionId, BureauId),
    MissingTally(TallyKey),
    /// A review action that the current status does not allow.
    ForbiddenTransition {
        key: TallyKey,
        from: TallyStatus,
        to: TallyStatus,
    },
    /// Published tallies are final.
    PublishedTally(TallyKey),
    MalformedCount {
        field: String,
        raw: String,
    },
}

impl Error for ResultsError {}

impl Display for ResultsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultsError::UnknownElection(id) => write!(f, "unknown election {}", id),
            ResultsError::UnknownCandidate(id) => write!(f, "unknown candidate {}", id),
            ResultsError::UnknownCenter(id) => write!(f, "unknown voting center {}", id),
            ResultsError::UnknownBureau(id) => write!(f, "unknown voting bureau {}", id),
            ResultsError::BureauNotInElection(e, b) => {
                write!(f, "bureau {} does not take part in election {}", b, e)
            }
            ResultsError::MissingTally(k) => {
                write!(f, "no tally for bureau {} in election {}", k.bureau_id, k.election_id)
            }
            ResultsError::ForbiddenTransition { key, from, to } => write!(
                f,
                "tally {}/{}: cannot go from {} to {}",
                key.election_id,
                key.bureau_id,
                from.as_str(),
                to.as_str()
            ),
            ResultsError::PublishedTally(k) => write!(
                f,
                "tally {}/{} is published and cannot be submitted again",
                k.election_id, k.bureau_id
            ),
            ResultsError::MalformedCount { field, raw } => {
                write!(f, "malformed count for {}: {:?}", field, raw)
            }
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResolverConfig {
    /// The smallest department set left after removing the commune bureaus.
    /// Below it, bureaus of the commune are added back.
    pub min_department_bureaus: usize,
}

impl ResolverConfig {
    pub const DEFAULT_CONFIG: ResolverConfig = ResolverConfig {
        min_department_bureaus: 1,
    };
}

impl Default for ResolverConfig {
    fn default() -> ResolverConfig {
        ResolverConfig::DEFAULT_CONFIG
    }
}

/// Which tallies count toward a consolidation.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Counting {
    /// Only validated and published tallies.
    Confirmed,
    /// Every tally entered without anomaly, plus the confirmed ones.
    Entered,
}

impl Counting {
    pub fn counts(&self, status: TallyStatus) -> bool {
        match self {
            Counting::Confirmed => status.is_confirmed(),
            Counting::Entered => status.is_confirmed() || status == TallyStatus::Entered,
        }
    }
}
