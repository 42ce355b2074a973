//! Observations and the per-institution timelines built from them.
//!
//! RULE: Rows with no institution number never reach a timeline.
//! Each timeline is owned by exactly one institution; nothing is
//! shared across institutions once the arena is built.

use crate::{
    error::IdentityResult,
    types::{InstitutionNumber, Period, Role},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Trim a raw source value. Empty means absent.
pub fn normalize_value(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// One distinct (role, number, name, period) fact and the number of source
/// rows behind it. `institution_name` is `None` for rows that carried the
/// number but no name: they count toward the period's records only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub role: Role,
    pub institution_number: InstitutionNumber,
    pub institution_name: Option<String>,
    pub period: Period,
    pub record_count: u64,
}

/// Everything observed in one period for one institution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodObservation {
    pub period: Period,
    /// Distinct non-absent values. Sorted by construction.
    pub values: BTreeSet<String>,
    pub record_count: u64,
}

/// The period-ordered observations sharing one institution number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub institution_number: InstitutionNumber,
    pub rows: Vec<PeriodObservation>,
}

impl Timeline {
    pub fn periods(&self) -> Vec<Period> {
        self.rows.iter().map(|r| r.period).collect()
    }
}

/// Arena of timelines keyed by institution number.
pub type TimelineArena = BTreeMap<InstitutionNumber, Timeline>;

fn build_arena<'a, I>(facts: I) -> TimelineArena
where
    I: Iterator<Item = (&'a str, Option<&'a str>, Period, u64)>,
{
    let mut grouped: BTreeMap<&str, BTreeMap<Period, PeriodObservation>> = BTreeMap::new();
    for (number, value, period, count) in facts {
        let row = grouped
            .entry(number)
            .or_default()
            .entry(period)
            .or_insert_with(|| PeriodObservation {
                period,
                values: BTreeSet::new(),
                record_count: 0,
            });
        if let Some(v) = value {
            row.values.insert(v.to_string());
        }
        row.record_count += count;
    }

    grouped
        .into_iter()
        .map(|(number, rows)| {
            let timeline = Timeline {
                institution_number: number.to_string(),
                rows: rows.into_values().collect(),
            };
            (number.to_string(), timeline)
        })
        .collect()
}

// ── Role observations ─────────────────────────────────────────────

type FactKey = (InstitutionNumber, Option<String>, Period);

/// All observations of one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSet {
    pub role: Role,
    observations: Vec<Observation>,
    index: HashMap<FactKey, usize>,
}

impl ObservationSet {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            observations: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add source rows. Values are normalised; rows without a number are
    /// dropped. Duplicate (number, name, period) facts are merged.
    pub fn record(&mut self, number: &str, name: Option<&str>, period: Period, record_count: u64) {
        let Some(number) = normalize_value(Some(number)) else {
            return;
        };
        let name = normalize_value(name);
        let key = (number, name, period);
        if let Some(&idx) = self.index.get(&key) {
            self.observations[idx].record_count += record_count;
            return;
        }
        self.index.insert(key.clone(), self.observations.len());
        let (institution_number, institution_name, period) = key;
        self.observations.push(Observation {
            role: self.role,
            institution_number,
            institution_name,
            period,
            record_count,
        });
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Group into per-institution name timelines.
    pub fn timelines(&self) -> TimelineArena {
        build_arena(self.observations.iter().map(|o| {
            (
                o.institution_number.as_str(),
                o.institution_name.as_deref(),
                o.period,
                o.record_count,
            )
        }))
    }
}

// ── Ownership observations ────────────────────────────────────────

/// One distinct (originator, sponsor number, period) fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipObservation {
    pub originator_number: InstitutionNumber,
    pub sponsor_number: Option<InstitutionNumber>,
    pub period: Period,
    pub record_count: u64,
}

/// Sponsor numbers linked to each originator, per period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipSet {
    observations: Vec<OwnershipObservation>,
}

impl OwnershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        originator_number: &str,
        sponsor_number: Option<&str>,
        period: Period,
        record_count: u64,
    ) {
        let Some(originator_number) = normalize_value(Some(originator_number)) else {
            return;
        };
        self.observations.push(OwnershipObservation {
            originator_number,
            sponsor_number: normalize_value(sponsor_number),
            period,
            record_count,
        });
    }

    pub fn observations(&self) -> &[OwnershipObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Group into per-originator timelines whose values are sponsor numbers.
    pub fn timelines(&self) -> TimelineArena {
        build_arena(self.observations.iter().map(|o| {
            (
                o.originator_number.as_str(),
                o.sponsor_number.as_deref(),
                o.period,
                o.record_count,
            )
        }))
    }
}

// ── Loader seam ───────────────────────────────────────────────────

/// Anything that can produce grouped observations from the longitudinal
/// dataset. Implementations must verify the schema before scanning.
pub trait ObservationSource {
    fn role_observations(&self, role: Role) -> IdentityResult<ObservationSet>;
    fn ownership_observations(&self) -> IdentityResult<OwnershipSet>;
}

/// The complete input to one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInput {
    pub originators: ObservationSet,
    pub sponsors: ObservationSet,
    pub ownership: OwnershipSet,
}

impl AnalysisInput {
    pub fn empty() -> Self {
        Self {
            originators: ObservationSet::new(Role::Originator),
            sponsors: ObservationSet::new(Role::Sponsor),
            ownership: OwnershipSet::new(),
        }
    }

    /// One bulk read of the source. Schema errors abort here.
    pub fn load(source: &dyn ObservationSource) -> IdentityResult<Self> {
        let originators = source.role_observations(Role::Originator)?;
        let sponsors = source.role_observations(Role::Sponsor)?;
        let ownership = source.ownership_observations()?;
        for set in [&originators, &sponsors] {
            if set.is_empty() {
                log::warn!("No qualifying {} observations in source", set.role);
            }
        }
        log::info!(
            "Loaded {} originator, {} sponsor and {} ownership observations",
            originators.len(),
            sponsors.len(),
            ownership.len()
        );
        Ok(Self { originators, sponsors, ownership })
    }

    pub fn for_role(&self, role: Role) -> &ObservationSet {
        match role {
            Role::Originator => &self.originators,
            Role::Sponsor => &self.sponsors,
        }
    }

    /// Record one source row: both roles and the ownership link.
    /// Mirrors what a grouped scan of the source table produces.
    pub fn record_row(&mut self, row: &SourceRow) {
        self.originators.record(
            row.originator_number.as_deref().unwrap_or(""),
            row.originator_name.as_deref(),
            row.period,
            1,
        );
        self.sponsors.record(
            row.sponsor_number.as_deref().unwrap_or(""),
            row.sponsor_name.as_deref(),
            row.period,
            1,
        );
        self.ownership.record(
            row.originator_number.as_deref().unwrap_or(""),
            row.sponsor_number.as_deref(),
            row.period,
            1,
        );
    }
}

/// One silver-layer row, restricted to the identity columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub period: Period,
    pub originator_name: Option<String>,
    pub originator_number: Option<String>,
    pub sponsor_name: Option<String>,
    pub sponsor_number: Option<String>,
}

impl SourceRow {
    pub fn originator(period: Period, number: &str, name: &str) -> Self {
        Self {
            period,
            originator_name: Some(name.to_string()),
            originator_number: Some(number.to_string()),
            sponsor_name: None,
            sponsor_number: None,
        }
    }

    pub fn with_sponsor(mut self, number: &str, name: &str) -> Self {
        self.sponsor_number = Some(number.to_string());
        self.sponsor_name = Some(name.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(m: u32) -> Period {
        Period::new(2020, m).unwrap()
    }

    #[test]
    fn blank_numbers_never_reach_a_timeline() {
        let mut set = ObservationSet::new(Role::Originator);
        set.record("  ", Some("GHOST LENDER"), p(1), 4);
        set.record("100", Some(" ACME "), p(1), 2);
        let arena = set.timelines();
        assert_eq!(arena.len(), 1);
        let t = &arena["100"];
        assert_eq!(t.rows[0].values.iter().next().unwrap(), "ACME");
    }

    #[test]
    fn nameless_rows_still_count_records() {
        let mut set = ObservationSet::new(Role::Sponsor);
        set.record("7", Some("SPONSOR"), p(3), 2);
        set.record("7", None, p(3), 5);
        set.record("7", Some("SPONSOR"), p(3), 1);
        assert_eq!(set.len(), 2);
        let row = &set.timelines()["7"].rows[0];
        assert_eq!(row.record_count, 8);
        assert_eq!(row.values.len(), 1);
    }

    #[test]
    fn timeline_rows_are_period_ordered() {
        let mut set = ObservationSet::new(Role::Originator);
        set.record("1", Some("B"), p(5), 1);
        set.record("1", Some("A"), p(2), 1);
        set.record("1", Some("C"), p(9), 1);
        let periods = set.timelines()["1"].periods();
        assert_eq!(periods, vec![p(2), p(5), p(9)]);
    }
}
