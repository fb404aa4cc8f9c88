//! The attendance session record and its lifecycle.
//!
//! A record is created Active with one Absent entry per enrolled person
//! (a snapshot — people enrolled later are never added retroactively),
//! mutated by recognition matches and manual overrides, and finally
//! posted. Posting is irreversible: a posted record is an auditable
//! artifact and rejects every further mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Person;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("person {0} is not in this session's entry set")]
    UnknownPerson(String),
    #[error("session {course} on {date} is posted and cannot be modified")]
    InvalidState { course: String, date: NaiveDate },
}

/// Attendance status, persisted as the literal strings below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Absent,
    Present,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Absent => "Absent",
            Status::Present => "Present",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "Absent" => Some(Status::Absent),
            "Present" => Some(Status::Present),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Posted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "Active",
            SessionState::Posted => "Posted",
        }
    }

    pub fn parse(s: &str) -> Option<SessionState> {
        match s {
            "Active" => Some(SessionState::Active),
            "Posted" => Some(SessionState::Posted),
            _ => None,
        }
    }
}

/// One row of the attendance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// 1-based position, fixed at session creation.
    pub seq: u32,
    pub person_id: String,
    pub name: String,
    pub status: Status,
}

/// The attendance table for one (course, date) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub course: String,
    pub date: NaiveDate,
    pub state: SessionState,
    pub entries: Vec<Entry>,
    /// Store-side optimistic-concurrency counter. Bumped on every
    /// successful save; a stale save is rejected.
    pub version: i64,
}

impl SessionRecord {
    /// Create a fresh Active record from a roster snapshot, all Absent,
    /// entries in roster order.
    pub fn start(course: &str, date: NaiveDate, roster: &[Person]) -> Self {
        let entries = roster
            .iter()
            .enumerate()
            .map(|(i, p)| Entry {
                seq: (i + 1) as u32,
                person_id: p.id.clone(),
                name: p.name.clone(),
                status: Status::Absent,
            })
            .collect();
        Self {
            course: course.to_string(),
            date,
            state: SessionState::Active,
            entries,
            version: 0,
        }
    }

    pub fn is_posted(&self) -> bool {
        self.state == SessionState::Posted
    }

    pub fn entry(&self, person_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.person_id == person_id)
    }

    fn reject_if_posted(&self) -> Result<(), SessionError> {
        if self.is_posted() {
            return Err(SessionError::InvalidState {
                course: self.course.clone(),
                date: self.date,
            });
        }
        Ok(())
    }

    fn entry_mut(&mut self, person_id: &str) -> Result<&mut Entry, SessionError> {
        self.entries
            .iter_mut()
            .find(|e| e.person_id == person_id)
            .ok_or_else(|| SessionError::UnknownPerson(person_id.to_string()))
    }

    /// Apply a recognition match: Absent becomes Present; an entry that
    /// is already Present stays Present (no error, no change).
    ///
    /// Recognition never moves an entry back to Absent. Returns `true`
    /// when the status actually changed.
    pub fn mark_recognized(&mut self, person_id: &str) -> Result<bool, SessionError> {
        self.reject_if_posted()?;
        let entry = self.entry_mut(person_id)?;
        if entry.status == Status::Present {
            return Ok(false);
        }
        entry.status = Status::Present;
        Ok(true)
    }

    /// Manual override: set the status directly, in either direction.
    /// Unlike recognition, an operator may uncheck a Present entry.
    pub fn set_present(&mut self, person_id: &str, present: bool) -> Result<(), SessionError> {
        self.reject_if_posted()?;
        let entry = self.entry_mut(person_id)?;
        entry.status = if present { Status::Present } else { Status::Absent };
        Ok(())
    }

    /// Seal the record. Irreversible; every later mutation attempt fails.
    pub fn post(&mut self) -> Result<(), SessionError> {
        self.reject_if_posted()?;
        self.state = SessionState::Posted;
        Ok(())
    }

    pub fn absent_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.status == Status::Absent)
    }
}
