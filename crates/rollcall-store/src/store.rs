use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use thiserror::Error;

use rollcall_core::{Entry, Person, SessionRecord, SessionState, Status};

use crate::schema;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("person {0} is already enrolled")]
    DuplicateId(String),
    #[error("no session for {course} on {date}")]
    SessionNotFound { course: String, date: NaiveDate },
    #[error("session for {course} on {date} is posted; refusing to recreate it")]
    SessionPosted { course: String, date: NaiveDate },
    #[error("session for {course} on {date} was changed by another writer (had version {version})")]
    VersionConflict {
        course: String,
        date: NaiveDate,
        version: i64,
    },
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// A pending attendance dispute. Course and date are what the student
/// supplied at intake; the queue itself is keyed by person only and the
/// reviewer applies it to whichever session they have open.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispute {
    pub person_id: String,
    pub course: String,
    pub date: String,
    pub raised_at: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database and prepare the schema. Any failure
    /// here is fatal to the caller: no operation may run on top of a
    /// database that did not open cleanly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        schema::apply_pragmas(&conn)?;
        schema::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::apply_pragmas(&conn)?;
        schema::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    // --- roster ---

    /// Enroll a new person. A reused id is rejected and the roster is
    /// left untouched.
    pub fn enroll(&self, person: &Person) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO people (id, name, email, photo_path) VALUES (?1, ?2, ?3, ?4)",
            params![person.id, person.name, person.email, person.photo_path],
        );
        match result {
            Ok(_) => {
                tracing::info!(person_id = %person.id, "enrolled");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId(person.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The roster in enrollment order. Gallery order, and therefore
    /// first-match behavior, follows from this.
    pub fn roster(&self) -> Result<Vec<Person>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, photo_path FROM people ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(Person {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                photo_path: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    // --- sessions ---

    /// Persist a freshly started session. An Active record for the same
    /// (course, date) is replaced wholesale; a Posted one refuses.
    pub fn create_session(&mut self, session: &SessionRecord) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT state FROM sessions WHERE course = ?1 AND date = ?2",
                params![session.course, session.date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if existing.as_deref() == Some(SessionState::Posted.as_str()) {
            return Err(StoreError::SessionPosted {
                course: session.course.clone(),
                date: session.date,
            });
        }
        tx.execute(
            "DELETE FROM sessions WHERE course = ?1 AND date = ?2",
            params![session.course, session.date.to_string()],
        )?;
        tx.execute(
            "INSERT INTO sessions (course, date, state, version) VALUES (?1, ?2, ?3, 0)",
            params![
                session.course,
                session.date.to_string(),
                session.state.as_str()
            ],
        )?;
        insert_entries(&tx, session)?;
        tx.commit()?;
        tracing::info!(
            course = %session.course,
            date = %session.date,
            entries = session.entries.len(),
            "session created"
        );
        Ok(())
    }

    pub fn load_session(&self, course: &str, date: NaiveDate) -> Result<SessionRecord, StoreError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT state, version FROM sessions WHERE course = ?1 AND date = ?2",
                params![course, date.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((state_str, version)) = row else {
            return Err(StoreError::SessionNotFound {
                course: course.to_string(),
                date,
            });
        };
        let state = SessionState::parse(&state_str)
            .ok_or_else(|| StoreError::Corrupt(format!("session state {state_str:?}")))?;

        let mut stmt = self.conn.prepare(
            "SELECT seq, person_id, name, status FROM entries
             WHERE course = ?1 AND date = ?2 ORDER BY seq",
        )?;
        let entries = stmt
            .query_map(params![course, date.to_string()], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(seq, person_id, name, status_str)| {
                let status = Status::parse(&status_str)
                    .ok_or_else(|| StoreError::Corrupt(format!("entry status {status_str:?}")))?;
                Ok(Entry {
                    seq,
                    person_id,
                    name,
                    status,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(SessionRecord {
            course: course.to_string(),
            date,
            state,
            entries,
            version,
        })
    }

    /// Write back a mutated session, but only if nobody else wrote it in
    /// the meantime. On success the record's version is bumped to match
    /// the stored one.
    pub fn save_session(&mut self, session: &mut SessionRecord) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE sessions SET state = ?1, version = version + 1
             WHERE course = ?2 AND date = ?3 AND version = ?4",
            params![
                session.state.as_str(),
                session.course,
                session.date.to_string(),
                session.version
            ],
        )?;
        if changed == 0 {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT version FROM sessions WHERE course = ?1 AND date = ?2",
                    params![session.course, session.date.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match exists {
                Some(_) => StoreError::VersionConflict {
                    course: session.course.clone(),
                    date: session.date,
                    version: session.version,
                },
                None => StoreError::SessionNotFound {
                    course: session.course.clone(),
                    date: session.date,
                },
            });
        }
        tx.execute(
            "DELETE FROM entries WHERE course = ?1 AND date = ?2",
            params![session.course, session.date.to_string()],
        )?;
        insert_entries(&tx, session)?;
        tx.commit()?;
        session.version += 1;
        Ok(())
    }

    // --- disputes ---

    /// Queue a dispute. Returns `false` when the person already has one
    /// pending (set semantics; the duplicate changes nothing).
    pub fn raise_dispute(
        &self,
        person_id: &str,
        course: &str,
        date: &str,
    ) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO disputes (person_id, course, date, raised_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                person_id,
                course,
                date,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn disputes(&self) -> Result<Vec<Dispute>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT person_id, course, date, raised_at FROM disputes ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Dispute {
                person_id: row.get(0)?,
                course: row.get(1)?,
                date: row.get(2)?,
                raised_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn clear_disputes(&self) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM disputes", [])?)
    }
}

fn insert_entries(
    tx: &rusqlite::Transaction<'_>,
    session: &SessionRecord,
) -> Result<(), StoreError> {
    let mut stmt = tx.prepare(
        "INSERT INTO entries (course, date, seq, person_id, name, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for entry in &session.entries {
        stmt.execute(params![
            session.course,
            session.date.to_string(),
            entry.seq,
            entry.person_id,
            entry.name,
            entry.status.as_str()
        ])?;
    }
    Ok(())
}
