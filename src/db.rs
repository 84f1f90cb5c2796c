//! Database module
//!
//! Durable checkpoints: one `sessions` row per session holding the cursor
//! and a version counter, plus the session's turns in `turns`, one row each.

mod schema;

pub use schema::*;

use crate::history::{MessageHistory, Turn};
use crate::runtime::Checkpoint;
use crate::state_machine::{Cursor, SessionState};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Version conflict for session {session_id}: expected {expected}, found {actual}")]
    Conflict {
        session_id: String,
        expected: u64,
        actual: u64,
    },
    #[error("Session {session_id} would rewrite stored turns: stored {stored}, writing {writing}")]
    HistoryRewrite {
        session_id: String,
        stored: usize,
        writing: usize,
    },
    #[error("Session {session_id} is corrupt: {message}")]
    Corrupt { session_id: String, message: String },
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Load the latest checkpoint for a session
    pub fn load_session(&self, id: &str) -> DbResult<Option<Checkpoint>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT cursor, version, updated_at FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((cursor, version, updated_at)) = row else {
            return Ok(None);
        };

        let cursor = Cursor::parse(&cursor).ok_or_else(|| DbError::Corrupt {
            session_id: id.to_string(),
            message: format!("unknown cursor '{cursor}'"),
        })?;

        let mut stmt = conn.prepare(
            "SELECT sequence_id, body FROM turns WHERE session_id = ?1 ORDER BY sequence_id ASC",
        )?;
        let rows = stmt
            .query_map(params![id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut turns = Vec::with_capacity(rows.len());
        for (expected_seq, (seq, body)) in (0_i64..).zip(rows) {
            if seq != expected_seq {
                return Err(DbError::Corrupt {
                    session_id: id.to_string(),
                    message: format!("turn sequence gap at {expected_seq} (found {seq})"),
                });
            }
            let turn: Turn = serde_json::from_str(&body).map_err(|e| DbError::Corrupt {
                session_id: id.to_string(),
                message: format!("turn {seq} is unreadable: {e}"),
            })?;
            turns.push(turn);
        }

        Ok(Some(Checkpoint {
            state: SessionState {
                session_id: id.to_string(),
                history: MessageHistory::from(turns),
                cursor,
            },
            version: to_u64(version),
            updated_at: Some(parse_datetime(&updated_at)),
        }))
    }

    /// Write a session if the stored version still equals `expected_version`.
    ///
    /// Turns already stored are kept; only the new tail is inserted. Returns
    /// the new version.
    pub fn save_session(&self, state: &SessionState, expected_version: u64) -> DbResult<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let id = state.session_id.as_str();

        let current: Option<i64> = tx
            .query_row(
                "SELECT version FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let actual = current.map_or(0, to_u64);

        if actual != expected_version {
            return Err(DbError::Conflict {
                session_id: id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        // Stored turns must be an unchanged prefix of the history being written
        let stored_bodies = {
            let mut stmt = tx.prepare(
                "SELECT body FROM turns WHERE session_id = ?1 ORDER BY sequence_id ASC",
            )?;
            let rows = stmt
                .query_map(params![id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        let stored = stored_bodies.len();
        let writing = state.history.len();
        let history = state.history.all();
        for (seq, body) in stored_bodies.iter().enumerate() {
            let turn: Turn = serde_json::from_str(body).map_err(|e| DbError::Corrupt {
                session_id: id.to_string(),
                message: format!("turn {seq} is unreadable: {e}"),
            })?;
            if history.get(seq) != Some(&turn) {
                return Err(DbError::HistoryRewrite {
                    session_id: id.to_string(),
                    stored,
                    writing,
                });
            }
        }

        let new_version = actual + 1;
        if current.is_some() {
            tx.execute(
                "UPDATE sessions SET cursor = ?1, version = ?2, updated_at = ?3 WHERE id = ?4",
                params![state.cursor.as_str(), to_i64(new_version), now, id],
            )?;
        } else {
            tx.execute(
                "INSERT INTO sessions (id, cursor, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, state.cursor.as_str(), to_i64(new_version), now],
            )?;
        }

        {
            let mut insert = tx.prepare(
                "INSERT INTO turns (session_id, sequence_id, role, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (seq, turn) in state.history.all().iter().enumerate().skip(stored) {
                let body = serde_json::to_string(turn)?;
                insert.execute(params![id, seq_id(seq), turn.role().as_str(), body, now])?;
            }
        }

        tx.commit()?;
        Ok(new_version)
    }

    /// List sessions, most recently updated first
    pub fn list_sessions(&self) -> DbResult<Vec<SessionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.cursor, s.version, s.created_at, s.updated_at,
                    (SELECT COUNT(*) FROM turns t WHERE t.session_id = s.id) as turn_count
             FROM sessions s
             ORDER BY s.updated_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SessionSummary {
                id: row.get(0)?,
                cursor: row.get(1)?,
                version: to_u64(row.get(2)?),
                created_at: parse_datetime(&row.get::<_, String>(3)?),
                updated_at: parse_datetime(&row.get::<_, String>(4)?),
                turn_count: to_u64(row.get(5)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

// SQLite integers are signed; versions and sequence ids never go negative
#[allow(clippy::cast_sign_loss)]
fn to_u64(v: i64) -> u64 {
    v.max(0) as u64
}

#[allow(clippy::cast_possible_wrap)]
fn to_i64(v: u64) -> i64 {
    v as i64
}

#[allow(clippy::cast_possible_wrap)]
fn seq_id(index: usize) -> i64 {
    index as i64
}
