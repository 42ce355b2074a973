//! Flat-file export of the run's output tables.
//!
//! RULE: Same columns every run, same row order for the same input.
//! List-valued cells (names, metadata) are written as compact JSON.

use crate::{
    config::AnalysisConfig,
    crosswalk_subsystem::{CrosswalkEntry, MappingError},
    error::IdentityResult,
    event::{EventLogRow, IdentityEvent},
    report::AnalysisReport,
};
use std::path::{Path, PathBuf};

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn header(columns: &[&str]) -> String {
    csv_line(&columns.iter().map(|c| c.to_string()).collect::<Vec<_>>())
}

pub const CROSSWALK_COLUMNS: [&str; 6] = [
    "institution_number",
    "institution_name",
    "type",
    "first_date",
    "last_date",
    "num_months",
];

pub const ERROR_COLUMNS: [&str; 5] = ["institution_number", "type", "date", "names", "issue"];

pub fn crosswalk_csv(rows: &[CrosswalkEntry]) -> String {
    let mut out = header(&CROSSWALK_COLUMNS);
    for r in rows {
        out.push_str(&csv_line(&[
            r.institution_number.clone(),
            r.institution_name.clone(),
            r.role.to_string(),
            r.first_period.first_day().to_string(),
            r.last_period.first_day().to_string(),
            r.period_count.to_string(),
        ]));
    }
    out
}

pub fn mapping_errors_csv(rows: &[MappingError]) -> String {
    let mut out = header(&ERROR_COLUMNS);
    for r in rows {
        out.push_str(&csv_line(&[
            r.institution_number.clone(),
            r.role.to_string(),
            r.date.first_day().to_string(),
            r.names.clone(),
            r.issue.as_str().to_string(),
        ]));
    }
    out
}

fn event_fields(row: &EventLogRow) -> IdentityResult<Vec<String>> {
    Ok(vec![
        row.entity_type.to_string(),
        row.event_type.clone(),
        row.institution_number.clone(),
        row.effective_period.clone(),
        serde_json::to_string(&row.previous_names)?,
        serde_json::to_string(&row.new_names)?,
        row.previous_start_period.clone().unwrap_or_default(),
        row.previous_end_period.clone().unwrap_or_default(),
        row.new_start_period.clone().unwrap_or_default(),
        row.new_end_period.clone().unwrap_or_default(),
        row.previous_duration_months.to_string(),
        row.new_duration_months.to_string(),
        row.previous_observation_count.to_string(),
        row.new_observation_count.to_string(),
        serde_json::to_string(&row.metadata)?,
    ])
}

pub fn events_csv(events: &[IdentityEvent]) -> IdentityResult<String> {
    let mut out = header(&EventLogRow::COLUMNS);
    for e in events {
        out.push_str(&csv_line(&event_fields(&e.to_row())?));
    }
    Ok(out)
}

/// Paths of the files written by `export_report`.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub crosswalk: PathBuf,
    pub errors: PathBuf,
    pub events: PathBuf,
    pub report: PathBuf,
}

/// Write the crosswalk only.
pub fn export_crosswalk(report: &AnalysisReport, config: &AnalysisConfig, out_dir: &Path) -> IdentityResult<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&config.output.crosswalk_file);
    std::fs::write(&path, crosswalk_csv(&report.crosswalk))?;
    log::info!("Crosswalk saved to {}", path.display());
    Ok(path)
}

/// Write all three tables and the text report. Existing files are replaced.
pub fn export_report(report: &AnalysisReport, config: &AnalysisConfig, out_dir: &Path) -> IdentityResult<ExportPaths> {
    let crosswalk = export_crosswalk(report, config, out_dir)?;

    let errors = out_dir.join(&config.output.errors_file);
    std::fs::write(&errors, mapping_errors_csv(&report.mapping_errors))?;

    let events = out_dir.join(&config.output.events_file);
    std::fs::write(&events, events_csv(&report.events)?)?;

    let text = out_dir.join(&config.output.report_file);
    std::fs::write(&text, report.render_text(&config.notable_institutions))?;

    log::info!("Report complete. All results saved to {}", out_dir.display());
    Ok(ExportPaths {
        crosswalk,
        errors,
        events,
        report: text,
    })
}
