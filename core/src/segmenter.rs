//! Sequence segmentation: collapse a timeline into stable runs.
//!
//! A segment is a maximal run of consecutive timeline rows whose value
//! sets are equal. Values are compared as sorted, deduplicated sets, so
//! record order inside a period can never cause a spurious boundary.
//! The empty set is a value like any other.
//!
//! Independently of boundaries, every row with more than one value is
//! reported as an `AmbiguousObservation`.

use crate::{observation::Timeline, types::Period};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The stable value set, sorted.
    pub value: Vec<String>,
    pub start_period: Period,
    pub end_period: Period,
    /// Every period in the run. Not necessarily calendar-contiguous.
    pub periods: Vec<Period>,
    pub total_records: u64,
}

impl Segment {
    pub fn duration(&self) -> usize {
        self.periods.len()
    }
}

/// A single period whose observed value set has more than one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousObservation {
    pub period: Period,
    pub values: Vec<String>,
    pub record_count: u64,
    /// Index of the segment covering this period.
    pub segment_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub ambiguous: Vec<AmbiguousObservation>,
}

impl Segmentation {
    /// Concatenated segment periods. Equals the input timeline's periods.
    pub fn periods(&self) -> Vec<Period> {
        self.segments.iter().flat_map(|s| s.periods.iter().copied()).collect()
    }
}

/// Segment one institution's timeline. Rows must already be period-ordered,
/// which `Timeline` guarantees.
pub fn segment_timeline(timeline: &Timeline) -> Segmentation {
    let mut out = Segmentation::default();
    let mut current: Option<Segment> = None;

    for row in &timeline.rows {
        let value: Vec<String> = row.values.iter().cloned().collect();

        match current.as_mut() {
            Some(seg) if seg.value == value => {
                seg.end_period = row.period;
                seg.periods.push(row.period);
                seg.total_records += row.record_count;
            }
            _ => {
                let next = Segment {
                    value: value.clone(),
                    start_period: row.period,
                    end_period: row.period,
                    periods: vec![row.period],
                    total_records: row.record_count,
                };
                if let Some(done) = current.replace(next) {
                    out.segments.push(done);
                }
            }
        }

        if value.len() > 1 {
            out.ambiguous.push(AmbiguousObservation {
                period: row.period,
                values: value,
                record_count: row.record_count,
                segment_index: out.segments.len(),
            });
        }
    }

    if let Some(done) = current {
        out.segments.push(done);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::PeriodObservation;
    use std::collections::BTreeSet;

    fn row(month: u32, names: &[&str], count: u64) -> PeriodObservation {
        PeriodObservation {
            period: Period::new(2020, month).unwrap(),
            values: names.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            record_count: count,
        }
    }

    fn timeline(rows: Vec<PeriodObservation>) -> Timeline {
        Timeline { institution_number: "1".into(), rows }
    }

    #[test]
    fn empty_set_does_not_merge_with_neighbours() {
        let t = timeline(vec![row(1, &["A"], 1), row(2, &[], 3), row(3, &["A"], 1)]);
        let seg = segment_timeline(&t);
        assert_eq!(seg.segments.len(), 3);
        assert!(seg.segments[1].value.is_empty());
        assert_eq!(seg.segments[1].total_records, 3);
    }

    #[test]
    fn stable_multi_name_segment_still_flags_each_period() {
        let t = timeline(vec![row(1, &["B", "A"], 2), row(2, &["A", "B"], 2), row(3, &["A"], 1)]);
        let seg = segment_timeline(&t);
        assert_eq!(seg.segments.len(), 2);
        assert_eq!(seg.segments[0].value, vec!["A", "B"]);
        assert_eq!(seg.ambiguous.len(), 2);
        assert!(seg.ambiguous.iter().all(|a| a.segment_index == 0));
    }

    #[test]
    fn empty_timeline_has_no_segments() {
        let seg = segment_timeline(&timeline(vec![]));
        assert!(seg.segments.is_empty());
        assert!(seg.ambiguous.is_empty());
    }
}
