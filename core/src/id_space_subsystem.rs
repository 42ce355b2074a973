//! Identifier space subsystem: how the originator and sponsor name and
//! number spaces overlap.

use crate::{
    error::IdentityResult,
    observation::{AnalysisInput, ObservationSet},
    report::AnalysisReport,
    subsystem::IdentitySubsystem,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;

const SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSpaceStats {
    pub unique_originator_names: usize,
    pub unique_originator_ids: usize,
    pub unique_sponsor_names: usize,
    pub unique_sponsor_ids: usize,
    pub overlapping_names: usize,
    pub overlapping_ids: usize,
    pub sample_overlapping_names: Vec<String>,
    pub sample_overlapping_ids: Vec<String>,
}

fn names_and_ids(set: &ObservationSet) -> (BTreeSet<&str>, BTreeSet<&str>) {
    let names = set
        .observations()
        .iter()
        .filter_map(|o| o.institution_name.as_deref())
        .collect();
    let ids = set
        .observations()
        .iter()
        .map(|o| o.institution_number.as_str())
        .collect();
    (names, ids)
}

pub fn id_space_stats(originators: &ObservationSet, sponsors: &ObservationSet) -> IdSpaceStats {
    let (orig_names, orig_ids) = names_and_ids(originators);
    let (sponsor_names, sponsor_ids) = names_and_ids(sponsors);

    let name_overlap: Vec<&str> = orig_names.intersection(&sponsor_names).copied().collect();
    let id_overlap: Vec<&str> = orig_ids.intersection(&sponsor_ids).copied().collect();

    IdSpaceStats {
        unique_originator_names: orig_names.len(),
        unique_originator_ids: orig_ids.len(),
        unique_sponsor_names: sponsor_names.len(),
        unique_sponsor_ids: sponsor_ids.len(),
        overlapping_names: name_overlap.len(),
        overlapping_ids: id_overlap.len(),
        sample_overlapping_names: name_overlap.iter().take(SAMPLE_SIZE).map(|s| s.to_string()).collect(),
        sample_overlapping_ids: id_overlap.iter().take(SAMPLE_SIZE).map(|s| s.to_string()).collect(),
    }
}

pub struct IdSpaceSubsystem;

impl IdSpaceSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IdSpaceSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySubsystem for IdSpaceSubsystem {
    fn name(&self) -> &'static str {
        "id_space"
    }

    fn run(&mut self, input: &AnalysisInput, report: &mut AnalysisReport) -> IdentityResult<()> {
        let stats = id_space_stats(&input.originators, &input.sponsors);
        log::info!(
            "ID spaces: {} originator ids, {} sponsor ids, {} shared",
            stats.unique_originator_ids,
            stats.unique_sponsor_ids,
            stats.overlapping_ids
        );
        report.id_space = stats;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
