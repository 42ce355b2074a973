//! The identity event log.
//!
//! RULE: Events are derived, never edited. Every event traces back to
//! a segment pair or an ambiguous observation of the current run.

use crate::{
    segmenter::Segment,
    types::{InstitutionNumber, Period, Role},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One side of a rename-shaped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSide {
    /// `None` marks a name that could not be resolved.
    pub names: Vec<Option<String>>,
    pub start_period: Period,
    pub end_period: Period,
    pub duration_months: usize,
    pub observation_count: u64,
}

impl SegmentSide {
    pub fn from_segment(segment: &Segment) -> Self {
        Self::with_names(segment, segment.value.iter().cloned().map(Some).collect())
    }

    pub fn with_names(segment: &Segment, names: Vec<Option<String>>) -> Self {
        Self {
            names,
            start_period: segment.start_period,
            end_period: segment.end_period,
            duration_months: segment.duration(),
            observation_count: segment.total_records,
        }
    }
}

/// Kind-specific payload.
/// Variants are added, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Appearance {
        new: SegmentSide,
    },
    Rename {
        previous: SegmentSide,
        new: SegmentSide,
    },
    AmbiguousIdentity {
        context: Vec<Option<String>>,
        observed: Vec<Option<String>>,
        record_count: u64,
    },
    OwnershipTransition {
        previous: SegmentSide,
        new: SegmentSide,
    },
    MultipleSponsorsInPeriod {
        context: Vec<Option<String>>,
        observed: Vec<Option<String>>,
        record_count: u64,
    },
}

impl EventKind {
    /// Stable tag for the `event_type` column.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Appearance { .. }               => "appearance",
            Self::Rename { .. }                   => "rename",
            Self::AmbiguousIdentity { .. }        => "ambiguous_identity",
            Self::OwnershipTransition { .. }      => "ownership_transition",
            Self::MultipleSponsorsInPeriod { .. } => "multiple_sponsors_in_period",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEvent {
    pub entity_type: Role,
    pub institution_number: InstitutionNumber,
    pub effective_period: Period,
    pub kind: EventKind,
    /// Raw auxiliary values. BTreeMap keeps serialisation order stable.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl IdentityEvent {
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// Sort key for the exported log.
    pub fn sort_key(&self) -> (&str, Period, &'static str) {
        (self.institution_number.as_str(), self.effective_period, self.event_type())
    }

    pub fn new_names(&self) -> &[Option<String>] {
        match &self.kind {
            EventKind::Appearance { new }
            | EventKind::Rename { new, .. }
            | EventKind::OwnershipTransition { new, .. } => &new.names,
            EventKind::AmbiguousIdentity { observed, .. }
            | EventKind::MultipleSponsorsInPeriod { observed, .. } => observed,
        }
    }

    pub fn previous_names(&self) -> &[Option<String>] {
        match &self.kind {
            EventKind::Appearance { .. } => &[],
            EventKind::Rename { previous, .. }
            | EventKind::OwnershipTransition { previous, .. } => &previous.names,
            EventKind::AmbiguousIdentity { context, .. }
            | EventKind::MultipleSponsorsInPeriod { context, .. } => context,
        }
    }

    /// Flatten into the exported column layout.
    pub fn to_row(&self) -> EventLogRow {
        let (previous, new): (Option<&SegmentSide>, SegmentSide) = match &self.kind {
            EventKind::Appearance { new } => (None, new.clone()),
            EventKind::Rename { previous, new }
            | EventKind::OwnershipTransition { previous, new } => (Some(previous), new.clone()),
            EventKind::AmbiguousIdentity { observed, record_count, .. }
            | EventKind::MultipleSponsorsInPeriod { observed, record_count, .. } => (
                None,
                SegmentSide {
                    names: observed.clone(),
                    start_period: self.effective_period,
                    end_period: self.effective_period,
                    duration_months: 1,
                    observation_count: *record_count,
                },
            ),
        };

        EventLogRow {
            entity_type: self.entity_type,
            event_type: self.event_type().to_string(),
            institution_number: self.institution_number.clone(),
            effective_period: self.effective_period.to_string(),
            previous_names: self.previous_names().to_vec(),
            new_names: new.names,
            previous_start_period: previous.map(|p| p.start_period.to_string()),
            previous_end_period: previous.map(|p| p.end_period.to_string()),
            new_start_period: Some(new.start_period.to_string()),
            new_end_period: Some(new.end_period.to_string()),
            previous_duration_months: previous.map_or(0, |p| p.duration_months),
            new_duration_months: new.duration_months,
            previous_observation_count: previous.map_or(0, |p| p.observation_count),
            new_observation_count: new.observation_count,
            metadata: self.metadata.clone(),
        }
    }
}

/// The event log entry as exported and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogRow {
    pub entity_type: Role,
    pub event_type: String,
    pub institution_number: InstitutionNumber,
    pub effective_period: String,
    pub previous_names: Vec<Option<String>>,
    pub new_names: Vec<Option<String>>,
    pub previous_start_period: Option<String>,
    pub previous_end_period: Option<String>,
    pub new_start_period: Option<String>,
    pub new_end_period: Option<String>,
    pub previous_duration_months: usize,
    pub new_duration_months: usize,
    pub previous_observation_count: u64,
    pub new_observation_count: u64,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EventLogRow {
    pub const COLUMNS: [&'static str; 15] = [
        "entity_type",
        "event_type",
        "institution_number",
        "effective_period",
        "previous_names",
        "new_names",
        "previous_start_period",
        "previous_end_period",
        "new_start_period",
        "new_end_period",
        "previous_duration_months",
        "new_duration_months",
        "previous_observation_count",
        "new_observation_count",
        "metadata",
    ];
}

/// Sort events into export order. Stable, so generation order breaks ties.
pub fn sort_events(events: &mut [IdentityEvent]) {
    events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Period lists are kept in metadata as `YYYY-MM` strings.
pub fn periods_value(periods: &[Period]) -> serde_json::Value {
    serde_json::Value::from(periods.iter().map(|p| p.to_string()).collect::<Vec<_>>())
}
