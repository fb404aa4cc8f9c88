//! Store-backed command bodies, kept free of terminal and transport
//! concerns so they can be exercised against an in-memory database.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use rollcall_core::{Person, SessionRecord};
use rollcall_store::Store;

pub fn enroll(store: &Store, id: &str, name: &str, email: &str, photo: &str) -> Result<Person> {
    if !std::path::Path::new(photo).exists() {
        tracing::warn!(photo, "reference photo does not exist yet; enrolling anyway");
    }
    let person = Person {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        photo_path: photo.to_string(),
    };
    store.enroll(&person)?;
    Ok(person)
}

/// Start (or restart) the session for (course, date) from the current
/// roster snapshot.
pub fn start(store: &mut Store, course: &str, date: NaiveDate) -> Result<SessionRecord> {
    let roster = store.roster()?;
    if roster.is_empty() {
        bail!("the roster is empty; enroll students before starting a session");
    }
    let session = SessionRecord::start(course, date, &roster);
    store.create_session(&session)?;
    Ok(session)
}

pub fn mark(
    store: &mut Store,
    course: &str,
    date: NaiveDate,
    person_id: &str,
    present: bool,
) -> Result<SessionRecord> {
    let mut session = store.load_session(course, date)?;
    session.set_present(person_id, present)?;
    store.save_session(&mut session)?;
    Ok(session)
}

pub fn post(store: &mut Store, course: &str, date: NaiveDate) -> Result<SessionRecord> {
    let mut session = store.load_session(course, date)?;
    session.post()?;
    store.save_session(&mut session)?;
    Ok(session)
}

pub struct ReviewOutcome {
    /// Queued ids marked Present in this session.
    pub applied: Vec<String>,
    /// Queued ids with no entry in this session, dropped with the rest
    /// of the queue.
    pub unmatched: Vec<String>,
}

/// Work the dispute queue against one session: every queued id with an
/// entry here is marked Present, then the whole queue is cleared —
/// including ids that matched nothing, mirroring how a reviewer empties
/// their inbox. The queue has no session linkage, so "this session" is
/// whichever one the operator names.
pub fn review(store: &mut Store, course: &str, date: NaiveDate) -> Result<ReviewOutcome> {
    let disputes = store.disputes()?;
    if disputes.is_empty() {
        return Ok(ReviewOutcome {
            applied: Vec::new(),
            unmatched: Vec::new(),
        });
    }

    let mut session = store.load_session(course, date)?;
    let mut outcome = ReviewOutcome {
        applied: Vec::new(),
        unmatched: Vec::new(),
    };
    for dispute in &disputes {
        if session.entry(&dispute.person_id).is_some() {
            session
                .set_present(&dispute.person_id, true)
                .with_context(|| format!("applying dispute for {}", dispute.person_id))?;
            outcome.applied.push(dispute.person_id.clone());
        } else {
            tracing::warn!(person_id = %dispute.person_id, "dispute does not match this session");
            outcome.unmatched.push(dispute.person_id.clone());
        }
    }
    store.save_session(&mut session)?;
    store.clear_disputes()?;
    Ok(outcome)
}
