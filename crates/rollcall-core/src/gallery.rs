//! Building the in-memory gallery from roster reference photos.
//!
//! The gallery is session-scoped: rebuilt from scratch at the start of
//! every recognition run, never persisted. Order mirrors roster order,
//! which the first-match policy depends on.

use thiserror::Error;

use crate::types::{CapabilityError, Encoding, KnownFace, Person};

#[derive(Error, Debug)]
pub enum GalleryError {
    /// The reference photo exists but the backend found no face in it.
    /// Surfaced with the offending person so the operator can re-enroll;
    /// a silently skipped person could never be marked present.
    #[error("no face found in reference photo for {person_id} ({photo_path})")]
    ExtractionFailure { person_id: String, photo_path: String },
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Turns a reference photo into face encodings. Implemented by the
/// vision-service client; the model behind it is opaque here.
pub trait ReferenceEncoder {
    fn encode_photo(&mut self, photo_path: &str) -> Result<Vec<Encoding>, CapabilityError>;
}

/// Encode every roster member's reference photo, in roster order.
///
/// A photo with several faces contributes its first one. A photo with
/// none aborts the whole build.
pub fn build_gallery<E: ReferenceEncoder>(
    roster: &[Person],
    encoder: &mut E,
) -> Result<Vec<KnownFace>, GalleryError> {
    let mut gallery = Vec::with_capacity(roster.len());
    for person in roster {
        let mut encodings = encoder.encode_photo(&person.photo_path)?;
        if encodings.is_empty() {
            return Err(GalleryError::ExtractionFailure {
                person_id: person.id.clone(),
                photo_path: person.photo_path.clone(),
            });
        }
        if encodings.len() > 1 {
            tracing::warn!(
                person_id = %person.id,
                faces = encodings.len(),
                "reference photo contains several faces; using the first"
            );
        }
        gallery.push(KnownFace {
            person_id: person.id.clone(),
            name: person.name.clone(),
            encoding: encodings.swap_remove(0),
        });
    }
    tracing::info!(people = gallery.len(), "gallery built");
    Ok(gallery)
}
