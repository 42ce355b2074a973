//! Oscillation subsystem: names that come back after being displaced.
//!
//! For one institution, each name maps to the start periods of the
//! segments it is part of. A name oscillates when, between two of its
//! consecutive occurrences, some segment carries other names. A clean
//! one-way rename never oscillates; fewer than three segments cannot.
//!
//! Runs once per role. Sponsor oscillation and originator oscillation
//! are unrelated even when the same loans carry both.

use crate::{
    config::OscillationMode,
    error::IdentityResult,
    observation::AnalysisInput,
    report::AnalysisReport,
    segmenter::Segmentation,
    subsystem::IdentitySubsystem,
    types::{InstitutionNumber, Period, Role},
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscillationRecord {
    pub role: Role,
    pub institution_number: InstitutionNumber,
    pub oscillating_name: String,
    /// Start periods of every segment that includes the name.
    pub periods: Vec<Period>,
    /// Every other name seen between flagged occurrences, sorted.
    pub intermediate_names: Vec<String>,
    /// Start of the first segment that displaced the name.
    pub displaced_at: Period,
    /// Names of that displacing segment.
    pub displaced_by: Vec<String>,
}

impl OscillationRecord {
    /// Minimal evidence of the back-and-forth, `prev -> curr -> prev`.
    pub fn evidence(&self) -> String {
        format!(
            "{0} -> {1} -> {0}",
            self.oscillating_name,
            self.displaced_by.join(",")
        )
    }
}

/// Scan one institution's segments for oscillating names.
pub fn detect_oscillations(
    role: Role,
    number: &str,
    segmentation: &Segmentation,
    mode: OscillationMode,
) -> Vec<OscillationRecord> {
    let segments = &segmentation.segments;
    if segments.len() < 3 {
        return Vec::new();
    }

    // Names in order of first appearance, each with the segments holding it.
    let mut order: Vec<&str> = Vec::new();
    let mut occurrences: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, segment) in segments.iter().enumerate() {
        for name in &segment.value {
            let slots = occurrences.entry(name.as_str()).or_insert_with(|| {
                order.push(name.as_str());
                Vec::new()
            });
            slots.push(idx);
        }
    }

    let mut records = Vec::new();
    for name in order {
        let slots = &occurrences[name];
        if slots.len() < 2 {
            continue;
        }

        let mut intermediate: BTreeSet<&str> = BTreeSet::new();
        let mut first_displacement: Option<usize> = None;
        for pair in slots.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let between: BTreeSet<&str> = segments[from + 1..to]
                .iter()
                .flat_map(|s| s.value.iter().map(String::as_str))
                .filter(|n| *n != name)
                .collect();
            if between.is_empty() {
                continue;
            }
            if first_displacement.is_none() {
                first_displacement = segments[from + 1..to]
                    .iter()
                    .position(|s| !s.value.is_empty())
                    .map(|offset| from + 1 + offset);
            }
            intermediate.extend(between);
            if mode == OscillationMode::FirstPerInstitution {
                break;
            }
        }

        let Some(displacing) = first_displacement else {
            continue;
        };
        records.push(OscillationRecord {
            role,
            institution_number: number.to_string(),
            oscillating_name: name.to_string(),
            periods: slots.iter().map(|&i| segments[i].start_period).collect(),
            intermediate_names: intermediate.into_iter().map(str::to_string).collect(),
            displaced_at: segments[displacing].start_period,
            displaced_by: segments[displacing].value.clone(),
        });
        if mode == OscillationMode::FirstPerInstitution {
            break;
        }
    }
    records
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct OscillationSubsystem {
    mode: OscillationMode,
}

impl OscillationSubsystem {
    pub fn new(mode: OscillationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OscillationMode {
        self.mode
    }
}

impl IdentitySubsystem for OscillationSubsystem {
    fn name(&self) -> &'static str {
        "oscillation"
    }

    fn run(&mut self, _input: &AnalysisInput, report: &mut AnalysisReport) -> IdentityResult<()> {
        for role in Role::ALL {
            let found: Vec<OscillationRecord> = report
                .segmentations(role)
                .iter()
                .flat_map(|(number, seg)| detect_oscillations(role, number, seg, self.mode))
                .collect();
            if found.is_empty() {
                log::info!("No oscillating patterns found for {role}s");
            } else {
                log::info!("Found {} {role} oscillations", found.len());
                for rec in found.iter().take(5) {
                    log::debug!(
                        "ID {}: '{}' with intermediate names {:?}",
                        rec.institution_number,
                        rec.oscillating_name,
                        rec.intermediate_names
                    );
                }
            }
            report.oscillations.extend(found);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
