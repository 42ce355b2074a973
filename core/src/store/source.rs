use super::IdentityStore;
use crate::{
    config::{SourceColumns, SourceConfig},
    error::{IdentityError, IdentityResult},
    observation::{normalize_value, ObservationSet, ObservationSource, OwnershipSet, SourceRow},
    types::{Period, Role},
};
use rusqlite::{params, types::Value};
use std::collections::BTreeSet;

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn value_as_int(column: &str, value: &Value) -> IdentityResult<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Real(f) if f.fract() == 0.0 => Ok(*f as i64),
        Value::Text(s) => s.trim().parse().map_err(|_| IdentityError::ColumnType {
            column: column.to_string(),
            detail: format!("expected an integer, found '{s}'"),
        }),
        Value::Null => Err(IdentityError::ColumnType {
            column: column.to_string(),
            detail: "expected an integer, found NULL".into(),
        }),
        other => Err(IdentityError::ColumnType {
            column: column.to_string(),
            detail: format!("expected an integer, found {other:?}"),
        }),
    }
}

/// Identifiers and names arrive as text or numbers; both become trimmed text.
fn value_as_text(column: &str, value: &Value) -> IdentityResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(i.to_string())),
        Value::Real(f) if f.fract() == 0.0 => Ok(Some(format!("{}", *f as i64))),
        Value::Real(f) => Ok(Some(f.to_string())),
        Value::Text(s) => Ok(normalize_value(Some(s))),
        Value::Blob(_) => Err(IdentityError::ColumnType {
            column: column.to_string(),
            detail: "expected text or a number, found a blob".into(),
        }),
    }
}

fn period_of(columns: &SourceColumns, year: &Value, month: &Value) -> IdentityResult<Period> {
    let y = value_as_int(&columns.year, year)?;
    let m = value_as_int(&columns.month, month)?;
    Period::from_raw(y, m)
}

/// The silver-layer table read through the store.
pub struct SourceTable<'a> {
    store: &'a IdentityStore,
    config: &'a SourceConfig,
}

impl<'a> SourceTable<'a> {
    /// Fails if the table or any required column is absent.
    pub fn verify(&self) -> IdentityResult<()> {
        let mut stmt = self
            .store
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(&self.config.table)))?;
        let present: BTreeSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;

        if present.is_empty() {
            return Err(IdentityError::SourceTableMissing {
                table: self.config.table.clone(),
            });
        }
        let missing: Vec<String> = self
            .config
            .columns
            .required()
            .iter()
            .filter(|c| !present.contains(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IdentityError::MissingColumns {
                table: self.config.table.clone(),
                columns: missing,
            });
        }
        Ok(())
    }

    /// Grouped scan: (year, month, key, value, rows) for non-null keys.
    fn grouped(&self, key: &str, value: &str) -> IdentityResult<Vec<(Value, Value, Value, Value, i64)>> {
        let c = &self.config.columns;
        let sql = format!(
            "SELECT {y}, {m}, {k}, {v}, COUNT(*) FROM {t}
             WHERE {k} IS NOT NULL
             GROUP BY {y}, {m}, {k}, {v}",
            y = quote_ident(&c.year),
            m = quote_ident(&c.month),
            k = quote_ident(key),
            v = quote_ident(value),
            t = quote_ident(&self.config.table),
        );
        let mut stmt = self.store.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl ObservationSource for SourceTable<'_> {
    fn role_observations(&self, role: Role) -> IdentityResult<ObservationSet> {
        self.verify()?;
        let c = &self.config.columns;
        let (number_col, name_col) = match role {
            Role::Originator => (&c.originator_number, &c.originator_name),
            Role::Sponsor => (&c.sponsor_number, &c.sponsor_name),
        };

        let mut set = ObservationSet::new(role);
        for (year, month, number, name, count) in self.grouped(number_col, name_col)? {
            let period = period_of(c, &year, &month)?;
            let Some(number) = value_as_text(number_col, &number)? else {
                continue;
            };
            let name = value_as_text(name_col, &name)?;
            set.record(&number, name.as_deref(), period, count.max(0) as u64);
        }
        Ok(set)
    }

    fn ownership_observations(&self) -> IdentityResult<OwnershipSet> {
        self.verify()?;
        let c = &self.config.columns;

        let mut set = OwnershipSet::new();
        for (year, month, orig, sponsor, count) in self.grouped(&c.originator_number, &c.sponsor_number)? {
            let period = period_of(c, &year, &month)?;
            let Some(orig) = value_as_text(&c.originator_number, &orig)? else {
                continue;
            };
            let sponsor = value_as_text(&c.sponsor_number, &sponsor)?;
            set.record(&orig, sponsor.as_deref(), period, count.max(0) as u64);
        }
        Ok(set)
    }
}

impl IdentityStore {
    pub fn source<'a>(&'a self, config: &'a SourceConfig) -> SourceTable<'a> {
        SourceTable { store: self, config }
    }

    // ── Source table writes (synthetic data and tests) ─────────────────────

    pub fn create_source_table(&self, config: &SourceConfig) -> IdentityResult<()> {
        let c = &config.columns;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                {y} INTEGER, {m} INTEGER,
                {on} TEXT, {onum} TEXT,
                {sn} TEXT, {snum} TEXT
            )",
            t = quote_ident(&config.table),
            y = quote_ident(&c.year),
            m = quote_ident(&c.month),
            on = quote_ident(&c.originator_name),
            onum = quote_ident(&c.originator_number),
            sn = quote_ident(&c.sponsor_name),
            snum = quote_ident(&c.sponsor_number),
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    pub fn insert_source_rows(&self, config: &SourceConfig, rows: &[SourceRow]) -> IdentityResult<()> {
        let c = &config.columns;
        let sql = format!(
            "INSERT INTO {t} ({y}, {m}, {on}, {onum}, {sn}, {snum})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            t = quote_ident(&config.table),
            y = quote_ident(&c.year),
            m = quote_ident(&c.month),
            on = quote_ident(&c.originator_name),
            onum = quote_ident(&c.originator_number),
            sn = quote_ident(&c.sponsor_name),
            snum = quote_ident(&c.sponsor_number),
        );
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for r in rows {
                stmt.execute(params![
                    r.period.year,
                    r.period.month,
                    r.originator_name,
                    r.originator_number,
                    r.sponsor_name,
                    r.sponsor_number,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn source_row_count(&self, config: &SourceConfig) -> IdentityResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&config.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_identifiers_render_without_fraction() {
        assert_eq!(value_as_text("n", &Value::Real(71970.0)).unwrap().as_deref(), Some("71970"));
        assert_eq!(value_as_text("n", &Value::Integer(5)).unwrap().as_deref(), Some("5"));
        assert_eq!(value_as_text("n", &Value::Text("  ".into())).unwrap(), None);
    }

    #[test]
    fn non_numeric_year_is_a_type_error() {
        let err = value_as_int("Year", &Value::Text("FY2020".into())).unwrap_err();
        assert!(err.is_schema_error());
    }
}
