//! Loading from the silver-layer table and persisting run outputs.

use lender_identity_core::{
    config::{AnalysisConfig, SourceConfig},
    engine::IdentityEngine,
    error::IdentityError,
    observation::{AnalysisInput, SourceRow},
    store::IdentityStore,
    types::{Period, Role},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn p(year: i32, month: u32) -> Period {
    Period::new(year, month).expect("valid period")
}

fn store() -> IdentityStore {
    let store = IdentityStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn seed_rows() -> Vec<SourceRow> {
    let mut rows = Vec::new();
    for period in p(2013, 1).range_to(p(2013, 6)) {
        rows.push(SourceRow::originator(period, "71970", "QUICKEN LOANS").with_sponsor("500", "BIG BANK"));
        rows.push(SourceRow::originator(period, "71970", "QUICKEN LOANS"));
    }
    for period in p(2013, 7).range_to(p(2013, 9)) {
        rows.push(SourceRow::originator(period, "71970", "ROCKET MORTGAGE"));
    }
    // Padding and a blank number: trimmed, and dropped respectively.
    rows.push(SourceRow::originator(p(2013, 10), " 71970 ", " QUICKEN LOANS "));
    rows.push(SourceRow::originator(p(2013, 10), "   ", "NOBODY"));
    rows
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Source rows are trimmed, grouped into distinct facts and counted.
#[test]
fn loads_grouped_observations_from_sqlite() {
    let store = store();
    let config = SourceConfig::default();
    store.create_source_table(&config).expect("create");
    store.insert_source_rows(&config, &seed_rows()).expect("insert");
    assert_eq!(store.source_row_count(&config).expect("count"), 17);

    let input = AnalysisInput::load(&store.source(&config)).expect("load");
    // 6 + 3 + 1 distinct (number, name, month) facts; the blank number is gone.
    assert_eq!(input.originators.len(), 10);
    assert_eq!(input.sponsors.len(), 6);
    let jan = input
        .originators
        .observations()
        .iter()
        .find(|o| o.period == p(2013, 1))
        .expect("january");
    assert_eq!(jan.record_count, 2);

    let timelines = input.for_role(Role::Originator).timelines();
    assert_eq!(timelines.len(), 1);
    assert_eq!(timelines["71970"].rows.len(), 10);
}

/// A missing source table is a schema error naming the table.
#[test]
fn missing_table_is_a_schema_error() {
    let store = store();
    let config = SourceConfig {
        table: "hecm".into(),
        ..SourceConfig::default()
    };
    let err = AnalysisInput::load(&store.source(&config)).expect_err("no table");
    assert!(matches!(err, IdentityError::SourceTableMissing { ref table } if table == "hecm"));
    assert!(err.is_schema_error());
}

/// Every missing column is named in the error.
#[test]
fn missing_columns_are_named() {
    let store = store();
    let written = SourceConfig::default();
    store.create_source_table(&written).expect("create");

    let mut expected = SourceConfig::default();
    expected.columns.sponsor_number = "Sponsor ID".into();
    expected.columns.month = "Period Month".into();

    let err = store.source(&expected).verify().expect_err("columns missing");
    match &err {
        IdentityError::MissingColumns { table, columns } => {
            assert_eq!(table, "single_family");
            assert_eq!(columns.len(), 2);
            assert!(columns.contains(&"Sponsor ID".to_string()));
            assert!(columns.contains(&"Period Month".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Sponsor ID"));
}

/// A run that fails on the schema leaves no run row behind.
#[test]
fn schema_failure_records_no_run() {
    let store = store();
    let mut engine = IdentityEngine::build("doomed".into(), AnalysisConfig::default());
    let err = engine.run_with_store(&store).expect_err("no source table");
    assert!(err.is_schema_error());
    assert_eq!(store.run_count().expect("count"), 0);
}

/// An empty source table is a successful run with empty outputs.
#[test]
fn empty_source_table_is_a_successful_empty_run() {
    let store = store();
    let config = AnalysisConfig::default();
    store.create_source_table(&config.source).expect("create");

    let mut engine = IdentityEngine::build("empty".into(), config);
    let report = engine.run_with_store(&store).expect("empty run succeeds");
    assert!(report.events.is_empty());
    assert!(report.crosswalk.is_empty());
    assert!(store.run_exists("empty").expect("lookup"));
}

/// Every output table is stored under the run id and later runs leave
/// earlier rows untouched.
#[test]
fn run_outputs_are_persisted_under_the_run_id() {
    let store = store();
    let config = AnalysisConfig::default();
    store.create_source_table(&config.source).expect("create");
    store.insert_source_rows(&config.source, &seed_rows()).expect("insert");

    let mut engine = IdentityEngine::build("persisted".into(), config);
    let report = engine.run_with_store(&store).expect("run");

    assert!(store.run_exists("persisted").expect("lookup"));
    assert_eq!(store.crosswalk_count("persisted").expect("count") as usize, report.crosswalk.len());
    assert_eq!(
        store.mapping_error_count("persisted").expect("count") as usize,
        report.mapping_errors.len()
    );
    assert_eq!(
        store.oscillation_count("persisted").expect("count") as usize,
        report.oscillations.len()
    );
    assert_eq!(report.oscillations.len(), 1);

    let logged = store.events_for_run("persisted").expect("events");
    assert_eq!(logged.len(), report.events.len());
    for (entry, event) in logged.iter().zip(&report.events) {
        assert_eq!(entry.event_type, event.event_type());
        assert_eq!(entry.institution_number, event.institution_number);
        let payload: serde_json::Value = serde_json::from_str(&entry.payload).expect("payload json");
        assert_eq!(payload["event_type"], event.event_type());
    }

    // A second run leaves the first one's rows alone.
    let mut again = IdentityEngine::build("persisted-2".into(), AnalysisConfig::default());
    again.run_with_store(&store).expect("second run");
    assert_eq!(store.run_count().expect("count"), 2);
    assert_eq!(store.crosswalk_count("persisted").expect("count") as usize, report.crosswalk.len());
}
