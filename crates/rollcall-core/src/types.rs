use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Euclidean-distance tolerance used when none is configured.
/// Lower is stricter; 0.5 is deliberately tighter than the usual 0.6
/// default for 128-dim face embeddings.
pub const DEFAULT_TOLERANCE: f32 = 0.5;

/// An enrolled person: stable roll number, display name, contact
/// address and the reference photo used to build their encoding.
///
/// Immutable after enrollment; there is no update or delete operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo_path: String,
}

/// Face embedding vector (128-dimensional for the dlib-style backend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings. Dimensions beyond the
    /// shorter vector are ignored; callers are expected to compare
    /// encodings produced by the same backend.
    pub fn distance(&self, other: &Encoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One gallery slot: a person's identity plus their reference encoding.
/// Gallery order is roster order, which the first-match policy depends on.
#[derive(Debug, Clone)]
pub struct KnownFace {
    pub person_id: String,
    pub name: String,
    pub encoding: Encoding,
}

/// Failures from the external face capability (capture device plus
/// detection/embedding service). The concrete backend maps its own
/// transport errors into this.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("service: {0}")]
    Service(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        let a = Encoding::new(vec![0.3, 0.4, 0.0]);
        assert!(a.distance(&a) < 1e-6);
    }

    #[test]
    fn test_distance_unit_apart() {
        let a = Encoding::new(vec![0.0, 0.0]);
        let b = Encoding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Encoding::new(vec![0.1, 0.9, 0.3]);
        let b = Encoding::new(vec![0.7, 0.2, 0.5]);
        assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-6);
    }
}
