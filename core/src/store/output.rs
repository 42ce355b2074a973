use super::IdentityStore;
use crate::{error::IdentityResult, report::AnalysisReport, types::RunId};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub entity_type: String,
    pub event_type: String,
    pub institution_number: String,
    pub effective_period: String,
    pub payload: String, // JSON-serialized EventLogRow
}

impl IdentityStore {
    /// Record the run and every output table in a single transaction.
    /// On any failure nothing is kept: a run is either complete or absent.
    pub fn save_run(&self, report: &AnalysisReport, version: &str, config_json: &str) -> IdentityResult<()> {
        let run_id = report.run_id.as_str();
        let tx = self.conn.unchecked_transaction()?;
        {
            tx.execute(
                "INSERT INTO analysis_run (run_id, version, config_json, started_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![run_id, version, config_json, chrono::Utc::now().to_rfc3339()],
            )?;

            let mut stmt = tx.prepare(
                "INSERT INTO crosswalk (run_id, institution_number, institution_name, role,
                                        first_date, last_date, num_months)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for c in &report.crosswalk {
                stmt.execute(params![
                    run_id,
                    c.institution_number,
                    c.institution_name,
                    c.role.as_str(),
                    c.first_period.first_day().to_string(),
                    c.last_period.first_day().to_string(),
                    c.period_count as i64,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO mapping_error (run_id, institution_number, role, date, names, issue)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for e in &report.mapping_errors {
                stmt.execute(params![
                    run_id,
                    e.institution_number,
                    e.role.as_str(),
                    e.date.first_day().to_string(),
                    e.names,
                    e.issue.as_str(),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO event_log (run_id, entity_type, event_type, institution_number,
                                        effective_period, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in &report.events {
                stmt.execute(params![
                    run_id,
                    event.entity_type.as_str(),
                    event.event_type(),
                    event.institution_number,
                    event.effective_period.to_string(),
                    serde_json::to_string(&event.to_row())?,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO oscillation (run_id, role, institution_number, oscillating_name,
                                          periods, intermediate_names)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for o in &report.oscillations {
                let periods: Vec<String> = o.periods.iter().map(|p| p.to_string()).collect();
                stmt.execute(params![
                    run_id,
                    o.role.as_str(),
                    o.institution_number,
                    o.oscillating_name,
                    serde_json::to_string(&periods)?,
                    serde_json::to_string(&o.intermediate_names)?,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("Saved report for run {run_id}");
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> IdentityResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, entity_type, event_type, institution_number, effective_period, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    entity_type: row.get(2)?,
                    event_type: row.get(3)?,
                    institution_number: row.get(4)?,
                    effective_period: row.get(5)?,
                    payload: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn crosswalk_count(&self, run_id: &str) -> IdentityResult<i64> {
        self.count_for_run("crosswalk", run_id)
    }

    pub fn mapping_error_count(&self, run_id: &str) -> IdentityResult<i64> {
        self.count_for_run("mapping_error", run_id)
    }

    pub fn oscillation_count(&self, run_id: &str) -> IdentityResult<i64> {
        self.count_for_run("oscillation", run_id)
    }

    fn count_for_run(&self, table: &'static str, run_id: &str) -> IdentityResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE run_id = ?1"),
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
