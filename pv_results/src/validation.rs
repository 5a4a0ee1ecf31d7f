use log::debug;

use crate::config::*;

/// A count that should never be negative.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum CountField {
    Registered,
    NullBallots,
    ValidBallots,
    Candidate(CandidateId),
}

/// One inconsistency found in a PV.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Violation {
    /// More voters than registered voters, or a negative number of voters.
    ParticipationBound { voters: i64, registered: i64 },
    /// Null and valid ballots do not add up to the number of voters.
    BallotPartition {
        null_ballots: i64,
        valid_ballots: i64,
        voters: i64,
    },
    /// The candidate votes do not add up to the valid ballots.
    CandidateSumMismatch {
        candidate_sum: i64,
        valid_ballots: i64,
    },
    NegativeCount { field: CountField, value: i64 },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ValidationResult {
    pub consistent: bool,
    /// False when the PV has no voter yet.
    pub filled: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// The status under which the checked tally should be stored. An unfilled
    /// PV stays pending, so it can neither be reviewed nor counted.
    pub fn status(&self) -> TallyStatus {
        if !self.filled {
            TallyStatus::Pending
        } else if self.consistent {
            TallyStatus::Entered
        } else {
            TallyStatus::Anomaly
        }
    }
}

/// Checks the internal arithmetic of a PV.
///
/// All the checks run, so that a reviewer sees every problem at once. A PV with
/// no voter is considered not filled yet and is never flagged.
pub fn validate(tally: &Tally) -> ValidationResult {
    let mut violations: Vec<Violation> = Vec::new();

    if tally.voters == 0 {
        debug!(
            "validate: {}/{}: no voters, tally not filled yet",
            tally.election_id, tally.bureau_id
        );
        return ValidationResult {
            consistent: true,
            filled: false,
            violations,
        };
    }

    if tally.voters < 0 || tally.voters > tally.registered {
        violations.push(Violation::ParticipationBound {
            voters: tally.voters,
            registered: tally.registered,
        });
    }

    // Sums are taken in i128: field data may hold any i64.
    let ballots = tally.null_ballots as i128 + tally.valid_ballots as i128;
    if tally.voters > 0 && ballots != tally.voters as i128 {
        violations.push(Violation::BallotPartition {
            null_ballots: tally.null_ballots,
            valid_ballots: tally.valid_ballots,
            voters: tally.voters,
        });
    }

    // Partially filled forms have no valid ballots yet.
    let candidate_sum: i128 = tally.results.iter().map(|r| r.votes as i128).sum();
    if tally.valid_ballots > 0 && candidate_sum != tally.valid_ballots as i128 {
        violations.push(Violation::CandidateSumMismatch {
            candidate_sum: tally.candidate_sum(),
            valid_ballots: tally.valid_ballots,
        });
    }

    let counts = [
        (CountField::Registered, tally.registered),
        (CountField::NullBallots, tally.null_ballots),
        (CountField::ValidBallots, tally.valid_ballots),
    ];
    for (field, value) in counts {
        if value < 0 {
            violations.push(Violation::NegativeCount { field, value });
        }
    }
    for r in tally.results.iter().filter(|r| r.votes < 0) {
        violations.push(Violation::NegativeCount {
            field: CountField::Candidate(r.candidate_id.clone()),
            value: r.votes,
        });
    }

    debug!(
        "validate: {}/{}: violations: {:?}",
        tally.election_id, tally.bureau_id, violations
    );
    ValidationResult {
        consistent: violations.is_empty(),
        filled: true,
        violations,
    }
}

/// The cached registered count of a center differs from its bureaus.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegistrationMismatch {
    pub center_id: CenterId,
    pub cached: i64,
    pub computed: i64,
}

/// Compares the cached registered-voter count of a center with the sum over
/// the bureaus it owns. Bureaus of other centers in `bureaus` are ignored.
pub fn check_center_registration(
    center: &VotingCenter,
    bureaus: &[Bureau],
) -> Option<RegistrationMismatch> {
    let computed: i64 = bureaus
        .iter()
        .filter(|b| b.center_id == center.id)
        .fold(0_i64, |acc, b| acc.saturating_add(b.registered_voters));
    if computed == center.registered_voters {
        None
    } else {
        Some(RegistrationMismatch {
            center_id: center.id.clone(),
            cached: center.registered_voters,
            computed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TallyBuilder;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tally(registered: i64, voters: i64, null: i64, valid: i64, votes: &[i64]) -> Tally {
        let mut b = TallyBuilder::new(&"E".into(), &"B1".into())
            .registered(registered)
            .voters(voters)
            .null_ballots(null)
            .valid_ballots(valid);
        for (idx, v) in votes.iter().enumerate() {
            b = b.candidate(&CandidateId::new(format!("C{}", idx + 1)), *v);
        }
        b.build()
    }

    #[test]
    fn unfilled_tally_is_never_flagged() {
        init();
        let cases = [
            tally(0, 0, 0, 0, &[]),
            tally(10, 0, 5, 85, &[80]),
            tally(-3, 0, -1, 12, &[-4, 2]),
        ];
        for t in cases.iter() {
            let r = validate(t);
            assert!(r.consistent, "{:?}", r);
            assert!(r.violations.is_empty());
            assert!(!r.filled);
            assert_eq!(r.status(), TallyStatus::Pending);
        }
    }

    #[test]
    fn participation_bound() {
        init();
        let r = validate(&tally(50, 100, 0, 100, &[100]));
        assert_eq!(
            r.violations,
            vec![Violation::ParticipationBound {
                voters: 100,
                registered: 50
            }]
        );
        assert_eq!(r.status(), TallyStatus::Anomaly);
    }

    #[test]
    fn ballot_partition() {
        init();
        let r = validate(&tally(200, 100, 10, 85, &[85]));
        assert_eq!(
            r.violations,
            vec![Violation::BallotPartition {
                null_ballots: 10,
                valid_ballots: 85,
                voters: 100
            }]
        );
    }

    #[test]
    fn candidate_sum() {
        init();
        let r = validate(&tally(200, 95, 10, 85, &[50, 30]));
        assert_eq!(
            r.violations,
            vec![Violation::CandidateSumMismatch {
                candidate_sum: 80,
                valid_ballots: 85
            }]
        );
    }

    #[test]
    fn candidate_sum_skipped_without_valid_ballots() {
        init();
        let r = validate(&tally(200, 10, 10, 0, &[3]));
        assert!(r.consistent, "{:?}", r);
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        init();
        let r = validate(&tally(i64::MAX, 5, i64::MAX, 5, &[5]));
        assert_eq!(
            r.violations,
            vec![Violation::BallotPartition {
                null_ballots: i64::MAX,
                valid_ballots: 5,
                voters: 5
            }]
        );
        let r = validate(&tally(100, 10, 0, 10, &[i64::MAX, i64::MAX, 10]));
        assert_eq!(
            r.violations,
            vec![Violation::CandidateSumMismatch {
                candidate_sum: i64::MAX,
                valid_ballots: 10
            }]
        );
        // The wrapped sum would be exactly 10.
        let r = validate(&tally(100, 10, 0, 10, &[i64::MAX, i64::MAX, 12]));
        assert!(!r.consistent);
    }

    #[test]
    fn all_violations_reported_at_once() {
        init();
        let r = validate(&tally(50, 100, 10, 85, &[-5, 20]));
        assert!(!r.consistent);
        assert_eq!(r.violations.len(), 4);
        assert!(matches!(r.violations[0], Violation::ParticipationBound { .. }));
        assert!(matches!(r.violations[1], Violation::BallotPartition { .. }));
        assert!(matches!(r.violations[2], Violation::CandidateSumMismatch { .. }));
        assert_eq!(
            r.violations[3],
            Violation::NegativeCount {
                field: CountField::Candidate("C1".into()),
                value: -5
            }
        );
    }

    #[test]
    fn consistent_local_tally() {
        init();
        let r = validate(&tally(300, 250, 10, 240, &[140, 100]));
        assert!(r.consistent);
        assert_eq!(r.violations, vec![]);
    }

    #[test]
    fn single_candidate_sum_anomaly() {
        init();
        let r = validate(&tally(300, 250, 10, 240, &[140, 90]));
        assert_eq!(
            r.violations,
            vec![Violation::CandidateSumMismatch {
                candidate_sum: 230,
                valid_ballots: 240
            }]
        );
    }

    #[test]
    fn center_registration_cache() {
        init();
        let center = VotingCenter {
            id: "C1".into(),
            name: "Ecole publique".to_string(),
            address: None,
            anchor: GeoAnchor::default(),
            registered_voters: 500,
        };
        let bureaus = vec![
            Bureau {
                id: "B1".into(),
                name: "Bureau 1".to_string(),
                center_id: "C1".into(),
                registered_voters: 300,
            },
            Bureau {
                id: "B2".into(),
                name: "Bureau 2".to_string(),
                center_id: "C1".into(),
                registered_voters: 150,
            },
            Bureau {
                id: "B9".into(),
                name: "Bureau 9".to_string(),
                center_id: "C2".into(),
                registered_voters: 1000,
            },
        ];
        assert_eq!(
            check_center_registration(&center, &bureaus),
            Some(RegistrationMismatch {
                center_id: "C1".into(),
                cached: 500,
                computed: 450
            })
        );
        let fixed = VotingCenter {
            registered_voters: 450,
            ..center
        };
        assert_eq!(check_center_registration(&fixed, &bureaus), None);
    }
}
