//! Crosswalk subsystem: number/name crosswalk and mapping error table.
//!
//! The crosswalk groups raw observations, not segments: it answers
//! "has this number ever meant this name", over the full observed range.
//! Whether that range was contiguous is the oscillation detector's job.
//!
//! Mapping errors are the union of two independent checks:
//!   (a) more than one name for a number within one month (per role)
//!   (b) every oscillation detected earlier in the run

use crate::{
    error::IdentityResult,
    observation::{AnalysisInput, ObservationSet},
    oscillation_subsystem::OscillationRecord,
    report::AnalysisReport,
    subsystem::IdentitySubsystem,
    types::{InstitutionNumber, Period, Role},
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswalkEntry {
    pub institution_number: InstitutionNumber,
    pub institution_name: String,
    pub role: Role,
    pub first_period: Period,
    pub last_period: Period,
    pub period_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingIssue {
    MultipleNamesInMonth,
    Oscillation,
}

impl MappingIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleNamesInMonth => "Multiple names for same number in one month",
            Self::Oscillation          => "Temporary name change (oscillation)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingError {
    pub institution_number: InstitutionNumber,
    pub role: Role,
    pub date: Period,
    pub names: String,
    pub issue: MappingIssue,
}

/// One row per distinct (number, name, role) ever observed.
pub fn build_crosswalk(sets: &[&ObservationSet]) -> Vec<CrosswalkEntry> {
    let mut groups: BTreeMap<(&str, &str, Role), BTreeSet<Period>> = BTreeMap::new();
    for set in sets {
        for obs in set.observations() {
            let Some(name) = obs.institution_name.as_deref() else {
                continue;
            };
            groups
                .entry((obs.institution_number.as_str(), name, obs.role))
                .or_default()
                .insert(obs.period);
        }
    }

    let mut rows: Vec<CrosswalkEntry> = groups
        .into_iter()
        .filter_map(|((number, name, role), periods)| {
            let first_period = *periods.first()?;
            let last_period = *periods.last()?;
            Some(CrosswalkEntry {
                institution_number: number.to_string(),
                institution_name: name.to_string(),
                role,
                first_period,
                last_period,
                period_count: periods.len(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        (&a.institution_number, a.role, a.first_period, &a.institution_name).cmp(&(
            &b.institution_number,
            b.role,
            b.first_period,
            &b.institution_name,
        ))
    });
    rows
}

/// (number, role, month) groups carrying more than one distinct name.
pub fn multiple_name_months(sets: &[&ObservationSet]) -> Vec<MappingError> {
    let mut months: BTreeMap<(&str, Role, Period), BTreeSet<&str>> = BTreeMap::new();
    for set in sets {
        for obs in set.observations() {
            if let Some(name) = obs.institution_name.as_deref() {
                months
                    .entry((obs.institution_number.as_str(), obs.role, obs.period))
                    .or_default()
                    .insert(name);
            }
        }
    }

    months
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|((number, role, period), names)| MappingError {
            institution_number: number.to_string(),
            role,
            date: period,
            names: names.into_iter().collect::<Vec<_>>().join(","),
            issue: MappingIssue::MultipleNamesInMonth,
        })
        .collect()
}

pub fn find_mapping_errors(
    sets: &[&ObservationSet],
    oscillations: &[OscillationRecord],
) -> Vec<MappingError> {
    let mut errors = multiple_name_months(sets);
    log::info!("Found {} instances of multiple names in same month", errors.len());

    let mut oscillation_rows: Vec<MappingError> = oscillations
        .iter()
        .map(|o| MappingError {
            institution_number: o.institution_number.clone(),
            role: o.role,
            date: o.displaced_at,
            names: o.evidence(),
            issue: MappingIssue::Oscillation,
        })
        .collect();
    oscillation_rows.sort_by(|a, b| {
        (&a.institution_number, a.role, a.date, &a.names).cmp(&(
            &b.institution_number,
            b.role,
            b.date,
            &b.names,
        ))
    });
    log::info!("Found {} instances of name oscillations", oscillation_rows.len());

    errors.extend(oscillation_rows);
    errors
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct CrosswalkSubsystem;

impl CrosswalkSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CrosswalkSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySubsystem for CrosswalkSubsystem {
    fn name(&self) -> &'static str {
        "crosswalk"
    }

    fn run(&mut self, input: &AnalysisInput, report: &mut AnalysisReport) -> IdentityResult<()> {
        let sets = [&input.originators, &input.sponsors];
        report.crosswalk = build_crosswalk(&sets);
        log::info!("Crosswalk: {} institution-name pairs", report.crosswalk.len());
        report.mapping_errors = find_mapping_errors(&sets, &report.oscillations);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
