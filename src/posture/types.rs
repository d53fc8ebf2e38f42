//! Feature vectors, verdicts and the verdict mapping.

use super::classifier::PostureClassifier;
use crate::error::MonitorError;
use serde::{Deserialize, Serialize};

/// Landmarks kept per hand (wrist, thumb CMC/MCP, and the four finger MCPs).
pub const LANDMARKS_PER_HAND: usize = 7;

/// Values per landmark (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;

/// Vector length for one detected hand.
pub const ONE_HAND_LEN: usize = LANDMARKS_PER_HAND * COORDS_PER_LANDMARK;

/// Vector length for two detected hands. This is the classifier input size.
pub const TWO_HANDS_LEN: usize = 2 * ONE_HAND_LEN;

/// Probabilities strictly above this are "correct posture".
pub const CORRECT_THRESHOLD: f32 = 0.5;

/// Flattened landmark coordinates for one frame.
///
/// A coordinate the extractor could not report is kept as `None`; it is never
/// replaced by a numeric stand-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<Option<f32>>);

impl FeatureVector {
    pub fn new(coords: Vec<Option<f32>>) -> Self {
        Self(coords)
    }

    /// Builds a vector where every coordinate is present.
    pub fn from_values(values: &[f32]) -> Self {
        Self(values.iter().copied().map(Some).collect())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn coords(&self) -> &[Option<f32>] {
        &self.0
    }

    /// Number of absent coordinates.
    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|c| c.is_none()).count()
    }

    /// Classifies the vector by its length.
    pub fn shape(&self) -> ReadingShape {
        match self.0.len() {
            0 => ReadingShape::NoHands,
            ONE_HAND_LEN => ReadingShape::OneHand,
            TWO_HANDS_LEN => ReadingShape::TwoHands,
            other => ReadingShape::Anomalous(other),
        }
    }
}

/// What the length of a [`FeatureVector`] says about the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingShape {
    NoHands,
    OneHand,
    TwoHands,
    Anomalous(usize),
}

/// Outcome of monitoring one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostureVerdict {
    NoHands,
    OneHand,
    CorrectPosture,
    IncorrectPosture,
    AnomalousReading,
}

impl PostureVerdict {
    /// Maps a classifier probability to a verdict.
    pub fn from_probability(probability: f32) -> Self {
        if probability > CORRECT_THRESHOLD {
            PostureVerdict::CorrectPosture
        } else {
            PostureVerdict::IncorrectPosture
        }
    }

    /// Detection-log message, or `None` for readings that are not logged.
    pub fn log_message(&self) -> Option<&'static str> {
        match self {
            PostureVerdict::NoHands => Some("No hands detected"),
            PostureVerdict::OneHand => Some("One hand detected"),
            PostureVerdict::CorrectPosture => Some("Correct hand posture"),
            PostureVerdict::IncorrectPosture => Some("Incorrect hand posture detected"),
            PostureVerdict::AnomalousReading => None,
        }
    }

    /// Whether this verdict may raise a user alert.
    pub fn is_alertable(&self) -> bool {
        matches!(
            self,
            PostureVerdict::NoHands | PostureVerdict::OneHand | PostureVerdict::IncorrectPosture
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostureVerdict::NoHands => "no_hands",
            PostureVerdict::OneHand => "one_hand",
            PostureVerdict::CorrectPosture => "correct",
            PostureVerdict::IncorrectPosture => "incorrect",
            PostureVerdict::AnomalousReading => "anomalous",
        }
    }
}

impl std::fmt::Display for PostureVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one frame, plus what went wrong if it degraded.
#[derive(Debug)]
pub struct Assessment {
    pub verdict: PostureVerdict,
    /// Classifier output, present only for two-hand readings that classified.
    pub probability: Option<f32>,
    /// Why the verdict is `AnomalousReading`.
    pub anomaly: Option<MonitorError>,
}

impl Assessment {
    fn plain(verdict: PostureVerdict) -> Self {
        Self {
            verdict,
            probability: None,
            anomaly: None,
        }
    }

    fn anomalous(anomaly: MonitorError) -> Self {
        Self {
            verdict: PostureVerdict::AnomalousReading,
            probability: None,
            anomaly: Some(anomaly),
        }
    }
}

/// Turns a feature vector into a verdict.
///
/// The classifier is only consulted for two-hand readings. A classifier
/// failure degrades the verdict to `AnomalousReading`.
pub fn assess(features: &FeatureVector, classifier: &dyn PostureClassifier) -> Assessment {
    match features.shape() {
        ReadingShape::NoHands => Assessment::plain(PostureVerdict::NoHands),
        ReadingShape::OneHand => Assessment::plain(PostureVerdict::OneHand),
        ReadingShape::Anomalous(len) => Assessment::anomalous(MonitorError::ExtractionAnomaly(len)),
        ReadingShape::TwoHands => match classifier.classify(features) {
            Ok(probability) => Assessment {
                verdict: PostureVerdict::from_probability(probability),
                probability: Some(probability),
                anomaly: None,
            },
            Err(e) => Assessment::anomalous(MonitorError::Classification(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifierError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        probability: f32,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(probability: f32) -> Self {
            Self {
                probability,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PostureClassifier for FixedClassifier {
        fn probability_correct(&self, _row: &[f32]) -> Result<f32, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }
    }

    struct FailingClassifier;

    impl PostureClassifier for FailingClassifier {
        fn probability_correct(&self, _row: &[f32]) -> Result<f32, ClassifierError> {
            Err(ClassifierError::InvalidModel("corrupt".into()))
        }
    }

    fn vector(len: usize) -> FeatureVector {
        FeatureVector::from_values(&vec![0.25; len])
    }

    #[test]
    fn test_lengths_map_to_verdicts() {
        let classifier = FixedClassifier::new(0.9);

        assert_eq!(assess(&vector(0), &classifier).verdict, PostureVerdict::NoHands);
        assert_eq!(assess(&vector(21), &classifier).verdict, PostureVerdict::OneHand);
        assert_eq!(
            assess(&vector(42), &classifier).verdict,
            PostureVerdict::CorrectPosture
        );
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_other_lengths_are_anomalous_without_classifier_call() {
        let classifier = FixedClassifier::new(0.9);

        for len in [1, 3, 20, 22, 41, 43, 63, 84] {
            let assessment = assess(&vector(len), &classifier);
            assert_eq!(assessment.verdict, PostureVerdict::AnomalousReading);
            assert!(matches!(
                assessment.anomaly,
                Some(MonitorError::ExtractionAnomaly(l)) if l == len
            ));
            assert!(!assessment.verdict.is_alertable());
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_threshold_is_exclusive_on_high_side() {
        assert_eq!(
            PostureVerdict::from_probability(0.5),
            PostureVerdict::IncorrectPosture
        );
        assert_eq!(
            PostureVerdict::from_probability(0.500_001),
            PostureVerdict::CorrectPosture
        );
        assert_eq!(
            PostureVerdict::from_probability(0.0),
            PostureVerdict::IncorrectPosture
        );
        assert_eq!(
            PostureVerdict::from_probability(1.0),
            PostureVerdict::CorrectPosture
        );
    }

    #[test]
    fn test_classifier_failure_degrades_to_anomalous() {
        let assessment = assess(&vector(42), &FailingClassifier);
        assert_eq!(assessment.verdict, PostureVerdict::AnomalousReading);
        assert!(matches!(
            assessment.anomaly,
            Some(MonitorError::Classification(_))
        ));
    }

    #[test]
    fn test_missing_coordinate_in_two_hand_reading_is_anomalous() {
        let mut coords = vec![Some(0.1); 42];
        coords[5] = None;
        let features = FeatureVector::new(coords);
        let classifier = FixedClassifier::new(0.9);

        let assessment = assess(&features, &classifier);
        assert_eq!(assessment.verdict, PostureVerdict::AnomalousReading);
        assert!(matches!(
            assessment.anomaly,
            Some(MonitorError::Classification(ClassifierError::MissingFeature(5)))
        ));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_coordinate_is_kept_as_absent() {
        let mut coords = vec![Some(0.3); 21];
        coords[2] = None;
        let features = FeatureVector::new(coords);

        assert_eq!(features.shape(), ReadingShape::OneHand);
        assert_eq!(features.missing_count(), 1);
        assert_eq!(features.coords()[2], None);
    }

    #[test]
    fn test_log_messages() {
        assert_eq!(
            PostureVerdict::IncorrectPosture.log_message(),
            Some("Incorrect hand posture detected")
        );
        assert_eq!(PostureVerdict::AnomalousReading.log_message(), None);
        assert!(!PostureVerdict::CorrectPosture.is_alertable());
    }

    #[test]
    fn test_feature_vector_json_uses_null_for_absent() {
        let features = FeatureVector::new(vec![Some(0.5), None]);
        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, "[0.5,null]");

        let parsed: FeatureVector = serde_json::from_str("[1.0,null,2.5]").unwrap();
        assert_eq!(parsed.coords(), &[Some(1.0), None, Some(2.5)]);
    }
}
