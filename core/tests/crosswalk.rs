//! Crosswalk rows, mapping errors and their flat-file rendering.

use lender_identity_core::{
    config::AnalysisConfig,
    crosswalk_subsystem::{build_crosswalk, MappingIssue},
    engine::IdentityEngine,
    export::{crosswalk_csv, events_csv, mapping_errors_csv},
    observation::{AnalysisInput, ObservationSet, SourceRow},
    types::{Period, Role},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn p(year: i32, month: u32) -> Period {
    Period::new(year, month).expect("valid period")
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// One row per (number, name): first and last month observed, and unnamed
/// months add nothing.
#[test]
fn crosswalk_row_spans_first_to_last_observation() {
    let mut set = ObservationSet::new(Role::Originator);
    for period in p(2013, 1).range_to(p(2014, 12)) {
        set.record("71970", Some("QUICKEN LOANS"), period, 10);
    }
    for period in p(2015, 1).range_to(p(2020, 12)) {
        set.record("71970", Some("ROCKET MORTGAGE"), period, 10);
    }
    // A month with the number but no name adds nothing to the crosswalk.
    set.record("71970", None, p(2021, 1), 1);

    let rows = build_crosswalk(&[&set]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].institution_name, "QUICKEN LOANS");
    assert_eq!((rows[0].first_period, rows[0].last_period), (p(2013, 1), p(2014, 12)));
    assert_eq!(rows[0].period_count, 24);
    assert_eq!(rows[1].institution_name, "ROCKET MORTGAGE");
    assert_eq!(rows[1].period_count, 72);

    let csv = crosswalk_csv(&rows);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "institution_number,institution_name,type,first_date,last_date,num_months"
    );
    assert_eq!(lines[1], "71970,QUICKEN LOANS,Originator,2013-01-01,2014-12-01,24");
    assert_eq!(lines[2], "71970,ROCKET MORTGAGE,Originator,2015-01-01,2020-12-01,72");
}

/// num_months is the count of distinct observed months, so gaps are not filled.
#[test]
fn period_count_counts_distinct_months_not_the_span() {
    let mut set = ObservationSet::new(Role::Sponsor);
    set.record("5", Some("GAPPY BANK"), p(2010, 1), 1);
    set.record("5", Some("GAPPY BANK"), p(2010, 6), 1);
    set.record("5", Some("GAPPY BANK"), p(2010, 6), 3);

    let rows = build_crosswalk(&[&set]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].period_count, 2);
    assert_eq!(rows[0].last_period, p(2010, 6));
    assert_eq!(rows[0].role, Role::Sponsor);
}

/// A number reported as both originator and sponsor keeps separate rows,
/// and its errors stay with the role that produced them.
#[test]
fn same_number_in_both_roles_gets_one_row_per_role() {
    let mut input = AnalysisInput::empty();
    input.record_row(&SourceRow::originator(p(2019, 1), "500", "BIG BANK").with_sponsor("500", "BIG BANK"));
    input.record_row(&SourceRow::originator(p(2019, 2), "500", "BIG BANK NA").with_sponsor("500", "BIG BANK"));
    input.record_row(&SourceRow::originator(p(2019, 2), "500", "BIG BANK"));

    let report = IdentityEngine::build("xwalk".into(), AnalysisConfig::default())
        .analyze(&input)
        .expect("analysis");

    let roles: Vec<(Role, &str)> = report
        .crosswalk
        .iter()
        .map(|c| (c.role, c.institution_name.as_str()))
        .collect();
    assert_eq!(
        roles,
        vec![
            (Role::Originator, "BIG BANK"),
            (Role::Originator, "BIG BANK NA"),
            (Role::Sponsor, "BIG BANK"),
        ]
    );

    // The two-name month is only an originator problem.
    assert_eq!(report.mapping_errors.len(), 1);
    let error = &report.mapping_errors[0];
    assert_eq!(error.role, Role::Originator);
    assert_eq!(error.issue, MappingIssue::MultipleNamesInMonth);
    assert_eq!(error.names, "BIG BANK,BIG BANK NA");

    let errors = mapping_errors_csv(&report.mapping_errors);
    assert_eq!(
        errors.lines().nth(1),
        Some("500,Originator,2019-02-01,\"BIG BANK,BIG BANK NA\",Multiple names for same number in one month")
    );

    let summary = report.summary();
    assert_eq!(summary.unique_institution_numbers, 1);
    assert_eq!(summary.unique_institution_names, 2);
    assert_eq!(report.id_space.overlapping_ids, 1);
    assert_eq!(report.id_space.overlapping_names, 1);
}

/// The error table lists multi-name rows before oscillation rows.
#[test]
fn multi_name_errors_precede_oscillation_errors() {
    let mut input = AnalysisInput::empty();
    for (m, name) in [(1, "A"), (2, "B"), (3, "A")] {
        input.record_row(&SourceRow::originator(p(2020, m), "1", name));
    }
    input.record_row(&SourceRow::originator(p(2020, 1), "2", "X"));
    input.record_row(&SourceRow::originator(p(2020, 1), "2", "Y"));

    let report = IdentityEngine::build("order".into(), AnalysisConfig::default())
        .analyze(&input)
        .expect("analysis");
    let issues: Vec<MappingIssue> = report.mapping_errors.iter().map(|e| e.issue).collect();
    assert_eq!(issues, vec![MappingIssue::MultipleNamesInMonth, MappingIssue::Oscillation]);
}

/// The event log header is fixed and name lists are JSON-quoted inside the CSV.
#[test]
fn event_log_columns_are_stable() {
    let mut input = AnalysisInput::empty();
    input.record_row(&SourceRow::originator(p(2020, 1), "1", "SMITH, JONES & CO"));
    let report = IdentityEngine::build("cols".into(), AnalysisConfig::default())
        .analyze(&input)
        .expect("analysis");

    let csv = events_csv(&report.events).expect("render events");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some(
            "entity_type,event_type,institution_number,effective_period,previous_names,new_names,\
             previous_start_period,previous_end_period,new_start_period,new_end_period,\
             previous_duration_months,new_duration_months,previous_observation_count,\
             new_observation_count,metadata"
        )
    );
    let appearance = lines.next().expect("appearance row");
    assert!(appearance.starts_with("Originator,appearance,1,2020-01,[],"));
    assert!(appearance.contains(r#""[""SMITH, JONES & CO""]""#));
}
