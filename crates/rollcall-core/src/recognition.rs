//! The recognition loop: consume frame observations, match faces
//! against the gallery, mark session entries Present.
//!
//! Capture pacing belongs to the device behind the stream; the loop
//! processes observations as fast as they arrive and checks the stop
//! flag once per frame. There is no timeout on an individual frame.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::matcher::MatchPolicy;
use crate::session::{SessionError, SessionRecord};
use crate::types::{CapabilityError, Encoding, KnownFace};

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Everything the external capability saw in one frame: zero or more
/// face embeddings. Detection and embedding happen on the other side of
/// the seam; by the time an observation arrives the pixels are gone.
#[derive(Debug, Clone)]
pub struct FrameObservation {
    pub faces: Vec<Encoding>,
}

/// Blocking source of frame observations. `None` means the stream ended
/// on its own (device closed, file source exhausted).
pub trait FrameStream {
    fn next_observation(&mut self) -> Result<Option<FrameObservation>, CapabilityError>;
}

#[derive(Debug, Default, PartialEq)]
pub struct RecognitionSummary {
    pub frames: u64,
    /// Entries newly moved to Present during this run.
    pub marked: u32,
    /// Faces that matched no gallery entry.
    pub unknown_sightings: u64,
}

/// Drive the loop until the stop flag is raised or the stream ends.
///
/// The session record is mutated in place; the caller persists it after
/// the run. Fails upfront if the session is already posted, before a
/// single frame is read.
pub fn run_recognition<S, P>(
    session: &mut SessionRecord,
    stream: &mut S,
    gallery: &[KnownFace],
    policy: &P,
    tolerance: f32,
    stop: &AtomicBool,
) -> Result<RecognitionSummary, RecognitionError>
where
    S: FrameStream,
    P: MatchPolicy,
{
    if session.is_posted() {
        return Err(SessionError::InvalidState {
            course: session.course.clone(),
            date: session.date,
        }
        .into());
    }

    let mut summary = RecognitionSummary::default();

    while !stop.load(Ordering::Relaxed) {
        let Some(observation) = stream.next_observation()? else {
            tracing::info!("frame stream ended");
            break;
        };
        summary.frames += 1;

        for probe in &observation.faces {
            match policy.select(probe, gallery, tolerance) {
                Some(known) => match session.mark_recognized(&known.person_id) {
                    Ok(true) => {
                        summary.marked += 1;
                        tracing::info!(
                            person_id = %known.person_id,
                            name = %known.name,
                            "marked present"
                        );
                    }
                    Ok(false) => {}
                    // A gallery member outside the session's snapshot
                    // (enrolled after start). Reject the single mark,
                    // keep the run going.
                    Err(SessionError::UnknownPerson(id)) => {
                        tracing::warn!(person_id = %id, "match outside session snapshot; ignored");
                    }
                    Err(err) => return Err(err.into()),
                },
                None => {
                    summary.unknown_sightings += 1;
                    tracing::debug!("unknown face");
                }
            }
        }
    }

    tracing::info!(
        frames = summary.frames,
        marked = summary.marked,
        unknown = summary.unknown_sightings,
        "recognition run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::FirstBelowTolerance;
    use crate::session::Status;
    use crate::types::Person;
    use chrono::NaiveDate;

    struct Scripted(Vec<FrameObservation>);

    impl FrameStream for Scripted {
        fn next_observation(&mut self) -> Result<Option<FrameObservation>, CapabilityError> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.remove(0)))
            }
        }
    }

    fn person(id: &str) -> Person {
        Person {
            id: id.into(),
            name: id.into(),
            email: format!("{id}@example.edu"),
            photo_path: format!("{id}.jpg"),
        }
    }

    fn known(id: &str, v: f32) -> KnownFace {
        KnownFace {
            person_id: id.into(),
            name: id.into(),
            encoding: Encoding::new(vec![v]),
        }
    }

    fn session(ids: &[&str]) -> SessionRecord {
        let roster: Vec<Person> = ids.iter().map(|id| person(id)).collect();
        SessionRecord::start("CS101", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &roster)
    }

    #[test]
    fn test_matching_face_marks_present() {
        let mut s = session(&["R1", "R2"]);
        let gallery = vec![known("R1", 0.0), known("R2", 10.0)];
        let mut stream = Scripted(vec![FrameObservation {
            faces: vec![Encoding::new(vec![0.1])],
        }]);

        let summary = run_recognition(
            &mut s,
            &mut stream,
            &gallery,
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.frames, 1);
        assert_eq!(summary.marked, 1);
        assert_eq!(s.entry("R1").unwrap().status, Status::Present);
        assert_eq!(s.entry("R2").unwrap().status, Status::Absent);
    }

    #[test]
    fn test_repeat_sightings_mark_once() {
        let mut s = session(&["R1"]);
        let gallery = vec![known("R1", 0.0)];
        let frame = FrameObservation {
            faces: vec![Encoding::new(vec![0.0])],
        };
        let mut stream = Scripted(vec![frame.clone(), frame.clone(), frame]);

        let summary = run_recognition(
            &mut s,
            &mut stream,
            &gallery,
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.marked, 1);
    }

    #[test]
    fn test_unknown_faces_counted_not_marked() {
        let mut s = session(&["R1"]);
        let gallery = vec![known("R1", 0.0)];
        let mut stream = Scripted(vec![FrameObservation {
            faces: vec![Encoding::new(vec![9.0])],
        }]);

        let summary = run_recognition(
            &mut s,
            &mut stream,
            &gallery,
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.unknown_sightings, 1);
        assert_eq!(s.entry("R1").unwrap().status, Status::Absent);
    }

    #[test]
    fn test_faceless_frames_are_normal() {
        let mut s = session(&["R1"]);
        let mut stream = Scripted(vec![
            FrameObservation { faces: vec![] },
            FrameObservation { faces: vec![] },
        ]);

        let summary = run_recognition(
            &mut s,
            &mut stream,
            &[known("R1", 0.0)],
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.marked, 0);
        assert_eq!(summary.unknown_sightings, 0);
    }

    #[test]
    fn test_stop_flag_checked_before_first_frame() {
        let mut s = session(&["R1"]);
        let mut stream = Scripted(vec![FrameObservation {
            faces: vec![Encoding::new(vec![0.0])],
        }]);

        let summary = run_recognition(
            &mut s,
            &mut stream,
            &[known("R1", 0.0)],
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(true),
        )
        .unwrap();

        assert_eq!(summary.frames, 0);
        assert_eq!(s.entry("R1").unwrap().status, Status::Absent);
    }

    #[test]
    fn test_posted_session_rejected_before_reading_frames() {
        let mut s = session(&["R1"]);
        s.post().unwrap();
        let mut stream = Scripted(vec![FrameObservation {
            faces: vec![Encoding::new(vec![0.0])],
        }]);

        let err = run_recognition(
            &mut s,
            &mut stream,
            &[known("R1", 0.0)],
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(false),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RecognitionError::Session(SessionError::InvalidState { .. })
        ));
        // The scripted frame was never consumed.
        assert_eq!(stream.0.len(), 1);
    }

    #[test]
    fn test_gallery_member_outside_snapshot_is_ignored() {
        // "R9" enrolled after the session started: in the gallery, not
        // in the entry set. The sighting must not abort the run.
        let mut s = session(&["R1"]);
        let gallery = vec![known("R9", 0.0), known("R1", 1.0)];
        let mut stream = Scripted(vec![FrameObservation {
            faces: vec![Encoding::new(vec![0.0]), Encoding::new(vec![1.0])],
        }]);

        let summary = run_recognition(
            &mut s,
            &mut stream,
            &gallery,
            &FirstBelowTolerance,
            0.5,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.marked, 1);
        assert_eq!(s.entry("R1").unwrap().status, Status::Present);
    }
}
