//! The output of one analysis run, and its human-readable rendering.

use crate::{
    crosswalk_subsystem::{CrosswalkEntry, MappingError, MappingIssue},
    event::IdentityEvent,
    id_space_subsystem::IdSpaceStats,
    oscillation_subsystem::OscillationRecord,
    segmenter::Segmentation,
    types::{InstitutionNumber, Period, RunId, Role},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

pub type RoleSegmentations = BTreeMap<InstitutionNumber, Segmentation>;

#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub run_id: RunId,
    /// Sorted into export order by the engine once every subsystem ran.
    pub events: Vec<IdentityEvent>,
    pub oscillations: Vec<OscillationRecord>,
    pub crosswalk: Vec<CrosswalkEntry>,
    pub mapping_errors: Vec<MappingError>,
    pub id_space: IdSpaceStats,
    originator_segments: RoleSegmentations,
    sponsor_segments: RoleSegmentations,
}

/// One run of stable names in an institution's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSpan {
    pub start_period: Period,
    pub end_period: Period,
    pub names: Vec<String>,
    pub record_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub run_id: RunId,
    pub unique_institution_numbers: usize,
    pub unique_institution_names: usize,
    pub crosswalk_rows: usize,
    pub mapping_errors: usize,
    pub multiple_name_months: usize,
    pub events: usize,
    pub events_by_type: BTreeMap<String, usize>,
    pub originator_oscillations: usize,
    pub sponsor_oscillations: usize,
    pub originators_with_name_changes: usize,
    pub sponsors_with_name_changes: usize,
}

impl AnalysisSummary {
    /// Data-quality findings. Nonzero is not a failure.
    pub fn anomaly_count(&self) -> usize {
        self.mapping_errors
    }
}

impl AnalysisReport {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id, ..Self::default() }
    }

    pub fn segmentations(&self, role: Role) -> &RoleSegmentations {
        match role {
            Role::Originator => &self.originator_segments,
            Role::Sponsor => &self.sponsor_segments,
        }
    }

    pub fn segmentations_mut(&mut self, role: Role) -> &mut RoleSegmentations {
        match role {
            Role::Originator => &mut self.originator_segments,
            Role::Sponsor => &mut self.sponsor_segments,
        }
    }

    pub fn oscillations_for(&self, role: Role) -> impl Iterator<Item = &OscillationRecord> {
        self.oscillations.iter().filter(move |o| o.role == role)
    }

    pub fn events_for(&self, number: &str) -> impl Iterator<Item = &IdentityEvent> + '_ {
        let number = number.to_string();
        self.events.iter().filter(move |e| e.institution_number == number)
    }

    /// Distinct consecutive name sets of one institution, oldest first.
    pub fn describe_institution(&self, role: Role, number: &str) -> Option<Vec<NameSpan>> {
        let seg = self.segmentations(role).get(number)?;
        Some(
            seg.segments
                .iter()
                .map(|s| NameSpan {
                    start_period: s.start_period,
                    end_period: s.end_period,
                    names: s.value.clone(),
                    record_count: s.total_records,
                })
                .collect(),
        )
    }

    pub fn summary(&self) -> AnalysisSummary {
        let numbers: BTreeSet<&str> = self.crosswalk.iter().map(|c| c.institution_number.as_str()).collect();
        let names: BTreeSet<&str> = self.crosswalk.iter().map(|c| c.institution_name.as_str()).collect();
        let mut events_by_type = BTreeMap::new();
        for e in &self.events {
            *events_by_type.entry(e.event_type().to_string()).or_insert(0) += 1;
        }
        AnalysisSummary {
            run_id: self.run_id.clone(),
            unique_institution_numbers: numbers.len(),
            unique_institution_names: names.len(),
            crosswalk_rows: self.crosswalk.len(),
            mapping_errors: self.mapping_errors.len(),
            multiple_name_months: self
                .mapping_errors
                .iter()
                .filter(|e| e.issue == MappingIssue::MultipleNamesInMonth)
                .count(),
            events: self.events.len(),
            events_by_type,
            originator_oscillations: self.oscillations_for(Role::Originator).count(),
            sponsor_oscillations: self.oscillations_for(Role::Sponsor).count(),
            originators_with_name_changes: renamed(&self.originator_segments),
            sponsors_with_name_changes: renamed(&self.sponsor_segments),
        }
    }

    /// Plain-text analysis report.
    pub fn render_text(&self, notable: &[String]) -> String {
        let rule = "=".repeat(80);
        let summary = self.summary();
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "{rule}\nCOMPREHENSIVE INSTITUTION ANALYSIS REPORT\n{rule}");
        let _ = writeln!(out, "Run: {}", self.run_id);

        let _ = writeln!(out, "\n1. Institution Crosswalk");
        let _ = writeln!(out, "   Total unique institution-name pairs: {}", summary.crosswalk_rows);

        let _ = writeln!(out, "\n2. Mapping Errors");
        let _ = writeln!(out, "   Total errors detected: {}", summary.mapping_errors);
        let _ = writeln!(out, "   Multiple names in one month: {}", summary.multiple_name_months);

        let s = &self.id_space;
        let _ = writeln!(out, "\n3. ID Spaces");
        let _ = writeln!(out, "   Unique originator names: {}", s.unique_originator_names);
        let _ = writeln!(out, "   Unique originator IDs: {}", s.unique_originator_ids);
        let _ = writeln!(out, "   Unique sponsor names: {}", s.unique_sponsor_names);
        let _ = writeln!(out, "   Unique sponsor IDs: {}", s.unique_sponsor_ids);
        let _ = writeln!(out, "   Names appearing as both originator and sponsor: {}", s.overlapping_names);
        let _ = writeln!(out, "   IDs appearing as both originator and sponsor: {}", s.overlapping_ids);
        for name in &s.sample_overlapping_names {
            let _ = writeln!(out, "     - {name}");
        }

        let _ = writeln!(out, "\n4. Name Changes Over Time");
        for number in notable {
            match self.describe_institution(Role::Originator, number) {
                None => {
                    let _ = writeln!(out, "   ID {number}: no data found");
                }
                Some(spans) => {
                    let _ = writeln!(out, "   ID {number}: {} distinct name periods", spans.len());
                    for span in spans {
                        let _ = writeln!(
                            out,
                            "     {}..{}: {} ({} loans)",
                            span.start_period,
                            span.end_period,
                            span.names.join(", "),
                            span.record_count
                        );
                    }
                }
            }
        }
        for (ty, n) in &summary.events_by_type {
            let _ = writeln!(out, "   {ty}: {n}");
        }

        let _ = writeln!(out, "\n5. Name Oscillations");
        for role in Role::ALL {
            let found: Vec<&OscillationRecord> = self.oscillations_for(role).collect();
            let _ = writeln!(out, "   {role}s with oscillating names: {}", found.len());
            for rec in found.iter().take(5) {
                let periods: Vec<String> = rec.periods.iter().take(5).map(|p| p.to_string()).collect();
                let _ = writeln!(
                    out,
                    "     ID {}: '{}' appears in {}; intermediate: {}",
                    rec.institution_number,
                    rec.oscillating_name,
                    periods.join(", "),
                    rec.intermediate_names.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
                );
            }
        }

        let _ = writeln!(out, "\n{rule}\nSUMMARY STATISTICS\n{rule}");
        let _ = writeln!(out, "Unique institution numbers: {}", summary.unique_institution_numbers);
        let _ = writeln!(out, "Unique institution names: {}", summary.unique_institution_names);
        let _ = writeln!(out, "Originator IDs with name changes: {}", summary.originators_with_name_changes);
        let _ = writeln!(out, "Sponsor IDs with name changes: {}", summary.sponsors_with_name_changes);
        let _ = writeln!(out, "Mapping errors detected: {}", summary.mapping_errors);
        let _ = writeln!(out, "Originator oscillations: {}", summary.originator_oscillations);
        let _ = writeln!(out, "Sponsor oscillations: {}", summary.sponsor_oscillations);
        let _ = writeln!(out, "{rule}");
        out
    }
}

/// Institutions whose history under one role holds more than one name segment.
fn renamed(segments: &RoleSegmentations) -> usize {
    segments.values().filter(|s| s.segments.len() > 1).count()
}
