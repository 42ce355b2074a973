//! Ownership subsystem: sponsor transitions per originator.
//!
//! The value tracked for each originator is the set of sponsor numbers
//! linked to it in a period. Segmentation is the same as for names; the
//! events are `ownership_transition` and `multiple_sponsors_in_period`.
//!
//! Sponsor numbers are shown to humans through SponsorNameResolver,
//! a best-effort lookup that may answer "unknown".

use crate::{
    error::IdentityResult,
    event::{periods_value, EventKind, IdentityEvent, SegmentSide},
    observation::{AnalysisInput, ObservationSet},
    report::AnalysisReport,
    segmenter::{segment_timeline, Segmentation},
    subsystem::IdentitySubsystem,
    types::Role,
};
use std::any::Any;
use std::collections::BTreeMap;

// ── Sponsor name resolution ──────────────────────────────────────────────────

/// Most frequently co-occurring name per sponsor number, across the whole
/// dataset. Ties go to the lexicographically smallest name.
#[derive(Debug, Clone, Default)]
pub struct SponsorNameResolver {
    canonical: BTreeMap<String, String>,
}

impl SponsorNameResolver {
    pub fn from_observations(sponsors: &ObservationSet) -> Self {
        let mut counts: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
        for obs in sponsors.observations() {
            if let Some(name) = obs.institution_name.as_deref() {
                *counts
                    .entry(obs.institution_number.as_str())
                    .or_default()
                    .entry(name)
                    .or_insert(0) += obs.record_count;
            }
        }

        let canonical = counts
            .into_iter()
            .filter_map(|(number, names)| {
                // Iteration is name-ascending; strict `>` keeps the smallest on ties.
                let mut best: Option<(&str, u64)> = None;
                for (name, count) in names {
                    if best.map_or(true, |(_, c)| count > c) {
                        best = Some((name, count));
                    }
                }
                best.map(|(name, _)| (number.to_string(), name.to_string()))
            })
            .collect();
        Self { canonical }
    }

    /// `None` when the number never co-occurred with a name.
    pub fn resolve(&self, sponsor_number: &str) -> Option<String> {
        self.canonical.get(sponsor_number).cloned()
    }

    pub fn resolve_all(&self, sponsor_numbers: &[String]) -> Vec<Option<String>> {
        sponsor_numbers.iter().map(|n| self.resolve(n)).collect()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct OwnershipSubsystem;

impl OwnershipSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OwnershipSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySubsystem for OwnershipSubsystem {
    fn name(&self) -> &'static str {
        "ownership"
    }

    fn run(&mut self, input: &AnalysisInput, report: &mut AnalysisReport) -> IdentityResult<()> {
        if input.ownership.is_empty() {
            log::warn!("No originator/sponsor links in source, skipping ownership transitions");
            return Ok(());
        }

        let resolver = SponsorNameResolver::from_observations(&input.sponsors);
        let mut generated = 0usize;
        for (number, timeline) in &input.ownership.timelines() {
            let segmentation = segment_timeline(timeline);
            let events = ownership_events(number, &segmentation, &resolver);
            generated += events.len();
            report.events.extend(events);
        }
        log::info!(
            "Ownership: {generated} events, {} sponsor names resolved",
            resolver.len()
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Turn one originator's sponsor-number segmentation into ownership events.
/// No appearance event: an originator's first sponsor set is not a transition.
pub fn ownership_events(
    originator_number: &str,
    segmentation: &Segmentation,
    resolver: &SponsorNameResolver,
) -> Vec<IdentityEvent> {
    let segments = &segmentation.segments;
    let mut events = Vec::new();

    for pair in segments.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        events.push(IdentityEvent {
            entity_type: Role::Originator,
            institution_number: originator_number.to_string(),
            effective_period: curr.start_period,
            kind: EventKind::OwnershipTransition {
                previous: SegmentSide::with_names(prev, resolver.resolve_all(&prev.value)),
                new: SegmentSide::with_names(curr, resolver.resolve_all(&curr.value)),
            },
            metadata: BTreeMap::from([
                ("previous_sponsor_numbers".to_string(), serde_json::Value::from(prev.value.clone())),
                ("new_sponsor_numbers".to_string(), serde_json::Value::from(curr.value.clone())),
                ("previous_segment_periods".to_string(), periods_value(&prev.periods)),
                ("new_segment_periods".to_string(), periods_value(&curr.periods)),
            ]),
        });
    }

    for ambiguous in &segmentation.ambiguous {
        let observed = resolver.resolve_all(&ambiguous.values);
        let context = segments
            .get(ambiguous.segment_index)
            .map(|s| resolver.resolve_all(&s.value))
            .unwrap_or_default();
        events.push(IdentityEvent {
            entity_type: Role::Originator,
            institution_number: originator_number.to_string(),
            effective_period: ambiguous.period,
            kind: EventKind::MultipleSponsorsInPeriod {
                context,
                observed: observed.clone(),
                record_count: ambiguous.record_count,
            },
            metadata: BTreeMap::from([
                ("sponsor_numbers".to_string(), serde_json::Value::from(ambiguous.values.clone())),
                ("observed_sponsor_names".to_string(), serde_json::to_value(&observed).unwrap_or_default()),
            ]),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;

    #[test]
    fn resolver_prefers_most_frequent_then_smallest_name() {
        let p = Period::new(2019, 1).unwrap();
        let mut sponsors = ObservationSet::new(Role::Sponsor);
        sponsors.record("10", Some("BETA BANK"), p, 3);
        sponsors.record("10", Some("ALPHA BANK"), p, 5);
        sponsors.record("20", Some("ZED"), p, 2);
        sponsors.record("20", Some("YAK"), p, 2);
        sponsors.record("30", None, p, 9);

        let resolver = SponsorNameResolver::from_observations(&sponsors);
        assert_eq!(resolver.resolve("10").as_deref(), Some("ALPHA BANK"));
        assert_eq!(resolver.resolve("20").as_deref(), Some("YAK"));
        assert_eq!(resolver.resolve("30"), None);
        assert_eq!(resolver.resolve("99"), None);
    }
}
