//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Subsystems never execute SQL; the engine hands them loaded
//! observations and persists what they produce.

use crate::error::IdentityResult;
use rusqlite::{params, Connection, OptionalExtension};

mod output;
mod source;

pub use output::EventLogEntry;
pub use source::SourceTable;

pub struct IdentityStore {
    conn: Connection,
}

impl IdentityStore {
    pub fn open(path: &str) -> IdentityResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> IdentityResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> IdentityResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn run_exists(&self, run_id: &str) -> IdentityResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM analysis_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn run_count(&self) -> IdentityResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM analysis_run", [], |row| row.get(0))?;
        Ok(n)
    }
}
