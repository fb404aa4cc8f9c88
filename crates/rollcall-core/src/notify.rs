//! Absence notifications.
//!
//! One message per Absent entry, fire-and-forget: a recipient whose
//! delivery fails is logged and counted, and the batch carries on.
//! There is no send log and no idempotency key, so invoking the
//! dispatcher again on an unchanged record mails everyone again. That
//! is accepted behavior, not a bug to fix here.

use std::collections::HashMap;

use thiserror::Error;

use crate::session::SessionRecord;
use crate::types::Person;

#[derive(Error, Debug)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Mail seam. The CLI plugs in an SMTP transport; tests use a recorder.
pub trait MailTransport {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Default, PartialEq)]
pub struct DispatchReport {
    pub sent: u32,
    pub failed: u32,
    /// Absent entries with no contact address on the roster.
    pub skipped: u32,
}

/// Send one notice to every Absent entry of the record.
///
/// Works on any session state: a posted record can still be notified.
pub fn dispatch_absence_notices<T: MailTransport>(
    session: &SessionRecord,
    roster: &[Person],
    transport: &mut T,
    dispute_link: &str,
) -> DispatchReport {
    let by_id: HashMap<&str, &Person> =
        roster.iter().map(|p| (p.id.as_str(), p)).collect();

    let subject = format!(
        "Attendance Notification - {} ({})",
        session.course, session.date
    );

    let mut report = DispatchReport::default();
    for entry in session.absent_entries() {
        let Some(person) = by_id.get(entry.person_id.as_str()) else {
            tracing::warn!(person_id = %entry.person_id, "absent entry has no roster contact; skipped");
            report.skipped += 1;
            continue;
        };
        let body = format!(
            "Hello {},\n\n\
             You were marked absent today for {} ({}).\n\n\
             If you think this is a mistake, click the link below to raise a query:\n\
             {}\n\n\
             - Attendance System\n",
            entry.name, session.course, session.date, dispute_link
        );
        match transport.send(&person.email, &subject, &body) {
            Ok(()) => {
                tracing::info!(person_id = %entry.person_id, to = %person.email, "notice sent");
                report.sent += 1;
            }
            Err(err) => {
                tracing::warn!(
                    person_id = %entry.person_id,
                    to = %person.email,
                    error = %err,
                    "notice failed; continuing with remaining recipients"
                );
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRecord;
    use chrono::NaiveDate;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<(String, String, String)>,
        fail_to: Vec<String>,
    }

    impl MailTransport for Recorder {
        fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
            if self.fail_to.iter().any(|f| f == to) {
                return Err(DeliveryError("smtp refused".into()));
            }
            self.sent.push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    fn person(id: &str, email: &str) -> Person {
        Person {
            id: id.into(),
            name: format!("Student {id}"),
            email: email.into(),
            photo_path: format!("{id}.jpg"),
        }
    }

    fn setup() -> (SessionRecord, Vec<Person>) {
        let roster = vec![
            person("R1", "r1@example.edu"),
            person("R2", "r2@example.edu"),
            person("R3", "r3@example.edu"),
        ];
        let session = SessionRecord::start(
            "CS101",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &roster,
        );
        (session, roster)
    }

    #[test]
    fn test_one_notice_per_absent_entry() {
        let (mut session, roster) = setup();
        session.mark_recognized("R2").unwrap();

        let mut transport = Recorder::default();
        let report = dispatch_absence_notices(&session, &roster, &mut transport, "https://example.edu/query");

        assert_eq!(report, DispatchReport { sent: 2, failed: 0, skipped: 0 });
        let recipients: Vec<_> = transport.sent.iter().map(|(to, _, _)| to.as_str()).collect();
        assert_eq!(recipients, vec!["r1@example.edu", "r3@example.edu"]);
    }

    #[test]
    fn test_message_names_course_date_and_link() {
        let (session, roster) = setup();
        let mut transport = Recorder::default();
        dispatch_absence_notices(&session, &roster, &mut transport, "https://example.edu/query");

        let (_, subject, body) = &transport.sent[0];
        assert_eq!(subject, "Attendance Notification - CS101 (2024-01-01)");
        assert!(body.contains("Hello Student R1,"));
        assert!(body.contains("CS101 (2024-01-01)"));
        assert!(body.contains("https://example.edu/query"));
    }

    #[test]
    fn test_one_failure_does_not_stop_the_batch() {
        let (session, roster) = setup();
        let mut transport = Recorder {
            fail_to: vec!["r1@example.edu".into()],
            ..Default::default()
        };
        let report = dispatch_absence_notices(&session, &roster, &mut transport, "https://x");

        assert_eq!(report, DispatchReport { sent: 2, failed: 1, skipped: 0 });
    }

    #[test]
    fn test_entry_missing_from_roster_is_skipped() {
        let (session, mut roster) = setup();
        roster.retain(|p| p.id != "R3");

        let mut transport = Recorder::default();
        let report = dispatch_absence_notices(&session, &roster, &mut transport, "https://x");
        assert_eq!(report, DispatchReport { sent: 2, failed: 0, skipped: 1 });
    }

    #[test]
    fn test_second_invocation_sends_again() {
        let (session, roster) = setup();
        let mut transport = Recorder::default();
        dispatch_absence_notices(&session, &roster, &mut transport, "https://x");
        dispatch_absence_notices(&session, &roster, &mut transport, "https://x");
        assert_eq!(transport.sent.len(), 6);
    }
}
