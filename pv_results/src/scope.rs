use log::{debug, info, warn};

use std::collections::BTreeSet;

use crate::config::*;
use crate::store::ResultsRepository;

/// An aggregation level above the center.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ZoneKind {
    Commune,
    Department,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Commune => "commune",
            ZoneKind::Department => "department",
        }
    }
}

/// The part of an election a view is about.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Scope {
    /// All the bureaus of the election.
    Election,
    Bureau(BureauId),
    Center(CenterId),
    Zone(ZoneKind),
}

/// Where a resolved bureau set comes from.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Provenance {
    /// The election's own bureaus (or the requested bureau or center).
    Own,
    /// The bureaus of another election covering the zone.
    Sibling(ElectionId),
    /// No sibling election could be used: the election's own bureaus stand in.
    Fallback,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScopeResolution {
    pub bureaus: BTreeSet<BureauId>,
    pub provenance: Provenance,
    /// Number of excluded bureaus added back to reach the configured minimum.
    pub padded: usize,
}

impl ScopeResolution {
    pub fn used_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BureauSource {
    Own,
    /// The most recent election of the given type sharing an anchor, tried in
    /// order.
    Sibling {
        kind: ElectionType,
        anchors: &'static [AnchorLevel],
    },
}

/// How a zone is computed for the elections of some types.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ZoneRule {
    pub zone: ZoneKind,
    pub applies_to: &'static [ElectionType],
    pub source: BureauSource,
    /// The bureaus of this zone are removed from the source set.
    pub exclude: Option<ZoneKind>,
}

/// The zone policy. The first rule matching the zone and the election type
/// applies.
pub const ZONE_RULES: &[ZoneRule] = &[
    ZoneRule {
        zone: ZoneKind::Commune,
        applies_to: &[ElectionType::Local],
        source: BureauSource::Own,
        exclude: None,
    },
    ZoneRule {
        zone: ZoneKind::Commune,
        applies_to: &[ElectionType::Legislative, ElectionType::Presidential],
        source: BureauSource::Sibling {
            kind: ElectionType::Local,
            anchors: &[AnchorLevel::Commune, AnchorLevel::Department],
        },
        exclude: None,
    },
    ZoneRule {
        zone: ZoneKind::Department,
        applies_to: &[ElectionType::Legislative],
        source: BureauSource::Own,
        exclude: Some(ZoneKind::Commune),
    },
    ZoneRule {
        zone: ZoneKind::Department,
        applies_to: &[ElectionType::Local, ElectionType::Presidential],
        source: BureauSource::Sibling {
            kind: ElectionType::Legislative,
            anchors: &[AnchorLevel::Department, AnchorLevel::Commune],
        },
        exclude: Some(ZoneKind::Commune),
    },
];

/// Computes the bureaus covered by a scope of an election, with the default
/// zone policy.
pub fn resolve_bureau_set<R: ResultsRepository + ?Sized>(
    repo: &R,
    election: &Election,
    scope: &Scope,
    config: &ResolverConfig,
) -> ScopeResolution {
    resolve_bureau_set_with(repo, election, scope, config, ZONE_RULES)
}

/// Same as [`resolve_bureau_set`] with an explicit zone policy.
pub fn resolve_bureau_set_with<R: ResultsRepository + ?Sized>(
    repo: &R,
    election: &Election,
    scope: &Scope,
    config: &ResolverConfig,
    rules: &[ZoneRule],
) -> ScopeResolution {
    let res = match scope {
        Scope::Election => own(own_bureaus(repo, election)),
        Scope::Bureau(bid) => own([bid.clone()].into_iter().collect()),
        Scope::Center(cid) => {
            let bureaus = bureau_ids(&repo.fetch_center_bureaus(cid));
            if bureaus.is_empty() {
                warn!("resolve_bureau_set: center {} has no bureau", cid);
            }
            own(bureaus)
        }
        Scope::Zone(zone) => resolve_zone(repo, election, *zone, config, rules, true),
    };
    info!(
        "resolve_bureau_set: election {} scope {:?}: {} bureaus ({:?}, padded {})",
        election.id,
        scope,
        res.bureaus.len(),
        res.provenance,
        res.padded
    );
    res
}

fn own(bureaus: BTreeSet<BureauId>) -> ScopeResolution {
    ScopeResolution {
        bureaus,
        provenance: Provenance::Own,
        padded: 0,
    }
}

fn fallback<R: ResultsRepository + ?Sized>(repo: &R, election: &Election) -> ScopeResolution {
    ScopeResolution {
        bureaus: own_bureaus(repo, election),
        provenance: Provenance::Fallback,
        padded: 0,
    }
}

fn bureau_ids(bureaus: &[Bureau]) -> BTreeSet<BureauId> {
    bureaus.iter().map(|b| b.id.clone()).collect()
}

fn own_bureaus<R: ResultsRepository + ?Sized>(repo: &R, election: &Election) -> BTreeSet<BureauId> {
    bureau_ids(&repo.fetch_bureaus_for_election(&election.id))
}

// The exclusion step is skipped when computing the excluded zone itself.
fn resolve_zone<R: ResultsRepository + ?Sized>(
    repo: &R,
    election: &Election,
    zone: ZoneKind,
    config: &ResolverConfig,
    rules: &[ZoneRule],
    apply_exclusion: bool,
) -> ScopeResolution {
    let rule = match rules
        .iter()
        .find(|r| r.zone == zone && r.applies_to.contains(&election.election_type))
    {
        Some(r) => r,
        None => {
            warn!(
                "resolve_zone: no rule for zone {} in {} election {}, using its own bureaus",
                zone.as_str(),
                election.election_type.as_str(),
                election.id
            );
            return fallback(repo, election);
        }
    };
    debug!("resolve_zone: {} {:?} -> rule {:?}", election.id, zone, rule);

    let (superset, provenance) = match rule.source {
        BureauSource::Own => (own_bureaus(repo, election), Provenance::Own),
        BureauSource::Sibling { kind, anchors } => {
            match find_sibling(repo, election, kind, anchors) {
                Some(sibling) => {
                    let bureaus = bureau_ids(&repo.fetch_bureaus_for_election(&sibling.id));
                    if bureaus.is_empty() {
                        warn!(
                            "resolve_zone: sibling {} has no bureau, using the bureaus of {}",
                            sibling.id, election.id
                        );
                        return fallback(repo, election);
                    }
                    (bureaus, Provenance::Sibling(sibling.id))
                }
                None => {
                    warn!(
                        "resolve_zone: no {} election for the {} of {}, using its own bureaus",
                        kind.as_str(),
                        zone.as_str(),
                        election.id
                    );
                    return fallback(repo, election);
                }
            }
        }
    };

    let excluded_zone = match rule.exclude {
        Some(z) if apply_exclusion => z,
        _ => {
            return ScopeResolution {
                bureaus: superset,
                provenance,
                padded: 0,
            }
        }
    };

    let excluded_res = resolve_zone(repo, election, excluded_zone, config, rules, false);
    // A fallback stands for the whole election, not for the excluded zone.
    if excluded_res.used_fallback() {
        warn!(
            "resolve_zone: {} of {}: the {} is unknown, nothing excluded",
            zone.as_str(),
            election.id,
            excluded_zone.as_str()
        );
        return ScopeResolution {
            bureaus: superset,
            provenance,
            padded: 0,
        };
    }
    let excluded = excluded_res.bureaus;
    let mut bureaus: BTreeSet<BureauId> = superset.difference(&excluded).cloned().collect();
    let mut padded: usize = 0;
    if bureaus.len() < config.min_department_bureaus {
        for bid in superset.iter().filter(|bid| excluded.contains(*bid)) {
            if bureaus.len() >= config.min_department_bureaus {
                break;
            }
            bureaus.insert(bid.clone());
            padded += 1;
        }
        warn!(
            "resolve_zone: {} of {}: only {} bureaus outside the {}, added back {}",
            zone.as_str(),
            election.id,
            bureaus.len() - padded,
            excluded_zone.as_str(),
            padded
        );
    }
    ScopeResolution {
        bureaus,
        provenance,
        padded,
    }
}

/// The most recent election of the given type that shares an anchor with
/// `election`. Anchors are tried in order; on the same date the lowest
/// identifier wins. Cancelled elections are never picked.
pub fn find_sibling<R: ResultsRepository + ?Sized>(
    repo: &R,
    election: &Election,
    kind: ElectionType,
    anchors: &[AnchorLevel],
) -> Option<Election> {
    let candidates: Vec<Election> = repo
        .fetch_elections()
        .into_iter()
        .filter(|e| {
            e.id != election.id
                && e.election_type == kind
                && e.status != ElectionStatus::Cancelled
        })
        .collect();
    for level in anchors.iter() {
        let best = candidates
            .iter()
            .filter(|e| e.anchor.shares(&election.anchor, *level))
            .max_by(|a, b| a.date.cmp(&b.date).then_with(|| b.id.cmp(&a.id)));
        if let Some(e) = best {
            debug!(
                "find_sibling: {} -> {} ({:?}, {})",
                election.id, e.id, level, e.date
            );
            return Some(e.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn election(id: &str, kind: ElectionType, commune: &str, date: (i32, u32, u32)) -> Election {
        Election {
            id: id.into(),
            name: id.to_string(),
            election_type: kind,
            anchor: GeoAnchor {
                province: Some("Estuaire".to_string()),
                department: Some("Komo-Mondah".to_string()),
                commune: Some(commune.to_string()),
            },
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            status: ElectionStatus::Finished,
        }
    }

    // Adds one center per election, holding the given bureaus.
    fn add_bureaus(store: &mut MemoryStore, election: &str, bureaus: &[&str]) {
        let cid = CenterId::new(format!("center-{}", election));
        store.add_center(VotingCenter {
            id: cid.clone(),
            name: cid.to_string(),
            address: None,
            anchor: GeoAnchor::default(),
            registered_voters: 0,
        });
        for b in bureaus.iter() {
            store
                .add_bureau(Bureau {
                    id: (*b).into(),
                    name: b.to_string(),
                    center_id: cid.clone(),
                    registered_voters: 100,
                })
                .unwrap();
        }
        store.register_center(&election.into(), &cid).unwrap();
    }

    fn ids(set: &BTreeSet<BureauId>) -> Vec<&str> {
        set.iter().map(|b| b.as_str()).collect()
    }

    fn nested_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_election(election("local-2023", ElectionType::Local, "Ntoum", (2023, 8, 26)));
        store.add_election(election(
            "legis-2023",
            ElectionType::Legislative,
            "Ntoum",
            (2023, 8, 26),
        ));
        store.add_election(election(
            "legis-2018",
            ElectionType::Legislative,
            "Ntoum",
            (2018, 10, 6),
        ));
        add_bureaus(&mut store, "local-2023", &["B1", "B2"]);
        add_bureaus(&mut store, "legis-2023", &["B3", "B4", "B5"]);
        add_bureaus(&mut store, "legis-2018", &["B9"]);
        // The legislative bureaus cover the commune ones too.
        store
            .register_center(&"legis-2023".into(), &"center-local-2023".into())
            .unwrap();
        store
    }

    #[test]
    fn bureau_and_center() {
        init();
        let store = nested_store();
        let e = store.election(&"local-2023".into()).unwrap().clone();
        let cfg = ResolverConfig::default();
        let r = resolve_bureau_set(&store, &e, &Scope::Bureau("B7".into()), &cfg);
        assert_eq!(ids(&r.bureaus), vec!["B7"]);
        assert_eq!(r.provenance, Provenance::Own);
        let r = resolve_bureau_set(&store, &e, &Scope::Center("center-legis-2023".into()), &cfg);
        assert_eq!(ids(&r.bureaus), vec!["B3", "B4", "B5"]);
        let r = resolve_bureau_set(&store, &e, &Scope::Election, &cfg);
        assert_eq!(ids(&r.bureaus), vec!["B1", "B2"]);
    }

    #[test]
    fn commune_of_a_local_election_is_itself() {
        init();
        let store = nested_store();
        let e = store.election(&"local-2023".into()).unwrap().clone();
        let r = resolve_bureau_set(
            &store,
            &e,
            &Scope::Zone(ZoneKind::Commune),
            &ResolverConfig::default(),
        );
        assert_eq!(ids(&r.bureaus), vec!["B1", "B2"]);
        assert_eq!(r.provenance, Provenance::Own);
    }

    #[test]
    fn commune_of_a_legislative_election_borrows_the_local_one() {
        init();
        let store = nested_store();
        let e = store.election(&"legis-2023".into()).unwrap().clone();
        let r = resolve_bureau_set(
            &store,
            &e,
            &Scope::Zone(ZoneKind::Commune),
            &ResolverConfig::default(),
        );
        assert_eq!(ids(&r.bureaus), vec!["B1", "B2"]);
        assert_eq!(r.provenance, Provenance::Sibling("local-2023".into()));
    }

    #[test]
    fn department_excludes_commune() {
        init();
        let store = nested_store();
        let e = store.election(&"local-2023".into()).unwrap().clone();
        let cfg = ResolverConfig::default();
        let dep = resolve_bureau_set(&store, &e, &Scope::Zone(ZoneKind::Department), &cfg);
        let com = resolve_bureau_set(&store, &e, &Scope::Zone(ZoneKind::Commune), &cfg);
        // The most recent legislative election is picked.
        assert_eq!(dep.provenance, Provenance::Sibling("legis-2023".into()));
        assert_eq!(ids(&dep.bureaus), vec!["B3", "B4", "B5"]);
        assert_eq!(dep.padded, 0);
        assert!(dep.bureaus.is_disjoint(&com.bureaus));
    }

    #[test]
    fn department_of_a_legislative_election() {
        init();
        let store = nested_store();
        let e = store.election(&"legis-2023".into()).unwrap().clone();
        let r = resolve_bureau_set(
            &store,
            &e,
            &Scope::Zone(ZoneKind::Department),
            &ResolverConfig::default(),
        );
        assert_eq!(r.provenance, Provenance::Own);
        assert_eq!(ids(&r.bureaus), vec!["B3", "B4", "B5"]);
    }

    #[test]
    fn department_padding() {
        init();
        let store = nested_store();
        let e = store.election(&"local-2023".into()).unwrap().clone();
        let cfg = ResolverConfig {
            min_department_bureaus: 5,
        };
        let r = resolve_bureau_set(&store, &e, &Scope::Zone(ZoneKind::Department), &cfg);
        assert_eq!(ids(&r.bureaus), vec!["B1", "B2", "B3", "B4", "B5"]);
        assert_eq!(r.padded, 2);

        let cfg = ResolverConfig {
            min_department_bureaus: 4,
        };
        let r = resolve_bureau_set(&store, &e, &Scope::Zone(ZoneKind::Department), &cfg);
        assert_eq!(ids(&r.bureaus), vec!["B1", "B3", "B4", "B5"]);
        assert_eq!(r.padded, 1);
    }

    #[test]
    fn fallback_without_sibling() {
        init();
        let mut store = MemoryStore::new();
        store.add_election(election("local-2023", ElectionType::Local, "Ntoum", (2023, 8, 26)));
        store.add_election(election(
            "legis-2023",
            ElectionType::Legislative,
            "Owendo",
            (2023, 8, 26),
        ));
        add_bureaus(&mut store, "local-2023", &["B1", "B2"]);
        add_bureaus(&mut store, "legis-2023", &["B3"]);
        // Different communes. Without its department the local election has
        // no anchor in common with the legislative one.
        let mut e = store.election(&"local-2023".into()).unwrap().clone();
        e.anchor.department = None;

        let r = resolve_bureau_set(
            &store,
            &e,
            &Scope::Zone(ZoneKind::Department),
            &ResolverConfig::default(),
        );
        assert!(r.used_fallback());
        assert_eq!(ids(&r.bureaus), vec!["B1", "B2"]);

        let legis = store.election(&"legis-2023".into()).unwrap().clone();
        let mut legis_alone = legis.clone();
        legis_alone.anchor = GeoAnchor::default();
        let r = resolve_bureau_set(
            &store,
            &legis_alone,
            &Scope::Zone(ZoneKind::Commune),
            &ResolverConfig::default(),
        );
        assert!(r.used_fallback());
        assert_eq!(ids(&r.bureaus), vec!["B3"]);

        // With the department anchor, the commune falls back to the department.
        let r = resolve_bureau_set(
            &store,
            &legis,
            &Scope::Zone(ZoneKind::Commune),
            &ResolverConfig::default(),
        );
        assert_eq!(r.provenance, Provenance::Sibling("local-2023".into()));
    }

    #[test]
    fn department_keeps_everything_when_the_commune_is_unknown() {
        init();
        let mut store = MemoryStore::new();
        store.add_election(election("presid", ElectionType::Presidential, "Ntoum", (2023, 8, 26)));
        store.add_election(election("legis", ElectionType::Legislative, "Ntoum", (2023, 8, 26)));
        add_bureaus(&mut store, "presid", &["B1", "B2", "B3", "B4", "B5"]);
        store
            .register_center(&"legis".into(), &"center-presid".into())
            .unwrap();
        let e = store.election(&"presid".into()).unwrap().clone();
        let cfg = ResolverConfig::default();

        let com = resolve_bureau_set(&store, &e, &Scope::Zone(ZoneKind::Commune), &cfg);
        assert!(com.used_fallback());

        let dep = resolve_bureau_set(&store, &e, &Scope::Zone(ZoneKind::Department), &cfg);
        assert_eq!(dep.provenance, Provenance::Sibling("legis".into()));
        assert_eq!(ids(&dep.bureaus), vec!["B1", "B2", "B3", "B4", "B5"]);
        assert_eq!(dep.padded, 0);
    }

    #[test]
    fn sibling_ties_pick_lowest_id() {
        init();
        let mut store = MemoryStore::new();
        store.add_election(election("legis-b", ElectionType::Legislative, "Ntoum", (2023, 8, 26)));
        store.add_election(election("legis-a", ElectionType::Legislative, "Ntoum", (2023, 8, 26)));
        let mut cancelled = election("legis-0", ElectionType::Legislative, "Ntoum", (2024, 1, 1));
        cancelled.status = ElectionStatus::Cancelled;
        store.add_election(cancelled);
        let local = election("local", ElectionType::Local, "Ntoum", (2023, 8, 26));
        let s = find_sibling(&store, &local, ElectionType::Legislative, &[AnchorLevel::Department]);
        assert_eq!(s.map(|e| e.id), Some("legis-a".into()));
    }

    #[test]
    fn custom_policy() {
        init();
        let store = nested_store();
        let e = store.election(&"local-2023".into()).unwrap().clone();
        let rules = [ZoneRule {
            zone: ZoneKind::Department,
            applies_to: &[ElectionType::Local],
            source: BureauSource::Own,
            exclude: None,
        }];
        let r = resolve_bureau_set_with(
            &store,
            &e,
            &Scope::Zone(ZoneKind::Department),
            &ResolverConfig::default(),
            &rules,
        );
        assert_eq!(r.provenance, Provenance::Own);
        assert_eq!(ids(&r.bureaus), vec!["B1", "B2"]);
        // No rule for the commune: fallback.
        let r = resolve_bureau_set_with(
            &store,
            &e,
            &Scope::Zone(ZoneKind::Commune),
            &ResolverConfig::default(),
            &rules,
        );
        assert!(r.used_fallback());
    }
}
