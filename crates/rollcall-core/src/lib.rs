//! rollcall-core — attendance domain logic.
//!
//! Holds the roster types, the session-record state machine, the
//! embedding match policy, the recognition loop driver, and the
//! absence-notification dispatcher. Persistence, the face capability
//! and mail transport live behind traits; the other crates plug in.

pub mod gallery;
pub mod matcher;
pub mod notify;
pub mod recognition;
pub mod session;
pub mod types;

pub use gallery::{build_gallery, GalleryError, ReferenceEncoder};
pub use matcher::{FirstBelowTolerance, MatchPolicy};
pub use notify::{dispatch_absence_notices, DispatchReport, MailTransport};
pub use recognition::{run_recognition, FrameObservation, FrameStream, RecognitionSummary};
pub use session::{Entry, SessionError, SessionRecord, SessionState, Status};
pub use types::{CapabilityError, Encoding, KnownFace, Person, DEFAULT_TOLERANCE};
