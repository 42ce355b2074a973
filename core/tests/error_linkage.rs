//! Every mapping error points at an event of the same role, number and
//! period, whatever the seed or oscillation mode.

use lender_identity_core::{
    config::{AnalysisConfig, OscillationMode},
    crosswalk_subsystem::{MappingError, MappingIssue},
    engine::IdentityEngine,
    observation::AnalysisInput,
    report::AnalysisReport,
    synthetic::{generate, SyntheticParams},
    types::Role,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn synthetic_report(seed: u64, mode: OscillationMode) -> AnalysisReport {
    let mut input = AnalysisInput::empty();
    for row in generate(&SyntheticParams::new(seed, 60)) {
        input.record_row(&row);
    }
    let config = AnalysisConfig::default().with_oscillation_mode(mode);
    IdentityEngine::build(format!("linkage-{seed}"), config)
        .analyze(&input)
        .unwrap()
}

/// The event type an error of this issue is dated by.
fn linked_event_type(issue: MappingIssue) -> &'static str {
    match issue {
        MappingIssue::MultipleNamesInMonth => "ambiguous_identity",
        MappingIssue::Oscillation => "rename",
    }
}

fn has_linked_event(report: &AnalysisReport, error: &MappingError) -> bool {
    let wanted = linked_event_type(error.issue);
    report.events.iter().any(|e| {
        e.event_type() == wanted
            && e.entity_type == error.role
            && e.institution_number == error.institution_number
            && e.effective_period == error.date
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Multi-name errors land on an ambiguous_identity event and oscillation
/// errors on the rename that displaced the name, for both roles.
#[test]
fn every_error_row_links_to_a_same_role_event() {
    let mut seen = Vec::new();
    for seed in 0..10 {
        for mode in [OscillationMode::FirstPerInstitution, OscillationMode::Exhaustive] {
            let report = synthetic_report(seed, mode);
            for error in &report.mapping_errors {
                assert!(
                    has_linked_event(&report, error),
                    "seed {seed}, {mode:?}: no linked event for {error:?}"
                );
                if !seen.contains(&(error.role, error.issue)) {
                    seen.push((error.role, error.issue));
                }
            }
        }
    }

    for issue in [MappingIssue::MultipleNamesInMonth, MappingIssue::Oscillation] {
        assert!(
            seen.contains(&(Role::Originator, issue)),
            "sweep produced no originator {issue:?} errors"
        );
    }
    assert!(
        seen.iter().any(|(role, _)| *role == Role::Sponsor),
        "sweep produced no sponsor errors"
    );
}
