//! Name change subsystem: appearance, rename and ambiguous identity events.
//!
//! For each role, every institution timeline is segmented once. The
//! segmentations are kept on the report for later subsystems; the
//! events are appended to the run's event log:
//!   1. first segment           → one `appearance`
//!   2. each adjacent pair      → one `rename`
//!   3. each ambiguous period   → one `ambiguous_identity`

use crate::{
    error::IdentityResult,
    event::{periods_value, EventKind, IdentityEvent, SegmentSide},
    observation::AnalysisInput,
    report::AnalysisReport,
    segmenter::{segment_timeline, Segmentation},
    subsystem::IdentitySubsystem,
    types::Role,
};
use std::any::Any;
use std::collections::BTreeMap;

pub struct NameChangeSubsystem;

impl NameChangeSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NameChangeSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySubsystem for NameChangeSubsystem {
    fn name(&self) -> &'static str {
        "name_change"
    }

    fn run(&mut self, input: &AnalysisInput, report: &mut AnalysisReport) -> IdentityResult<()> {
        for role in Role::ALL {
            let timelines = input.for_role(role).timelines();
            let mut generated = 0usize;
            let mut renamed = 0usize;
            for (number, timeline) in &timelines {
                let segmentation = segment_timeline(timeline);
                if segmentation.segments.len() > 1 {
                    renamed += 1;
                }
                let events = name_events(role, number, &segmentation);
                generated += events.len();
                report.events.extend(events);
                report.segmentations_mut(role).insert(number.clone(), segmentation);
            }
            log::info!(
                "{role}: {} institutions, {renamed} with name changes, {generated} events",
                timelines.len()
            );
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Turn one institution's segmentation into its name events.
pub fn name_events(role: Role, number: &str, segmentation: &Segmentation) -> Vec<IdentityEvent> {
    let segments = &segmentation.segments;
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let mut events = Vec::with_capacity(segments.len() + segmentation.ambiguous.len());

    events.push(IdentityEvent {
        entity_type: role,
        institution_number: number.to_string(),
        effective_period: first.start_period,
        kind: EventKind::Appearance {
            new: SegmentSide::from_segment(first),
        },
        metadata: BTreeMap::from([("segment_periods".to_string(), periods_value(&first.periods))]),
    });

    for pair in segments.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        events.push(IdentityEvent {
            entity_type: role,
            institution_number: number.to_string(),
            effective_period: curr.start_period,
            kind: EventKind::Rename {
                previous: SegmentSide::from_segment(prev),
                new: SegmentSide::from_segment(curr),
            },
            metadata: BTreeMap::from([
                ("previous_segment_periods".to_string(), periods_value(&prev.periods)),
                ("new_segment_periods".to_string(), periods_value(&curr.periods)),
            ]),
        });
    }

    for ambiguous in &segmentation.ambiguous {
        let context = segments
            .get(ambiguous.segment_index)
            .map(|s| s.value.iter().cloned().map(Some).collect())
            .unwrap_or_default();
        events.push(IdentityEvent {
            entity_type: role,
            institution_number: number.to_string(),
            effective_period: ambiguous.period,
            kind: EventKind::AmbiguousIdentity {
                context,
                observed: ambiguous.values.iter().cloned().map(Some).collect(),
                record_count: ambiguous.record_count,
            },
            metadata: BTreeMap::from([(
                "observed_names".to_string(),
                serde_json::Value::from(ambiguous.values.clone()),
            )]),
        });
    }

    events
}
