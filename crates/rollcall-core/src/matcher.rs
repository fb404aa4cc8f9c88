//! Match policy for comparing a probe embedding against the gallery.

use crate::types::{Encoding, KnownFace};

/// Strategy for picking a gallery entry for a probe embedding.
///
/// The policy is a seam on purpose: the session lifecycle never looks at
/// distances, so a nearest-match policy can be swapped in here without
/// touching anything else.
pub trait MatchPolicy {
    /// Return the matched gallery entry, or `None` for an unknown face.
    fn select<'g>(
        &self,
        probe: &Encoding,
        gallery: &'g [KnownFace],
        tolerance: f32,
    ) -> Option<&'g KnownFace>;
}

/// Linear scan returning the FIRST gallery entry within tolerance — not
/// the closest. The outcome for a probe near two enrolled faces is
/// therefore decided by enrollment order. That is a known correctness
/// risk (two visually similar people can cross-assign), kept because the
/// rest of the pipeline is calibrated against this exact behavior.
pub struct FirstBelowTolerance;

impl MatchPolicy for FirstBelowTolerance {
    fn select<'g>(
        &self,
        probe: &Encoding,
        gallery: &'g [KnownFace],
        tolerance: f32,
    ) -> Option<&'g KnownFace> {
        gallery
            .iter()
            .find(|known| probe.distance(&known.encoding) <= tolerance)
    }
}
