use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::CLASS_NAMES;

/// Object classes the weapon model was trained on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Gun,
    Person,
}

impl ClassLabel {
    /// Maps a model class index to a label; indices outside the model's
    /// class list have no label.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ClassLabel::Gun),
            1 => Some(ClassLabel::Person),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClassLabel::Gun => CLASS_NAMES[0],
            ClassLabel::Person => CLASS_NAMES[1],
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One object reported by the detector for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: usize, confidence: f32) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
        }
    }

    pub fn label(&self) -> Option<ClassLabel> {
        ClassLabel::from_index(self.class_id)
    }

    /// Confidence rounded up to two decimals, the value thresholds compare
    /// against. Computed in `f32` so that a raw `0.4` stays `0.4`.
    pub fn rounded_confidence(&self) -> f32 {
        (self.confidence * 100.0).ceil() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn detection(class_id: usize, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(0, 0, 10, 10), class_id, confidence)
    }

    #[test]
    fn test_class_indices() {
        assert_eq!(ClassLabel::from_index(0), Some(ClassLabel::Gun));
        assert_eq!(ClassLabel::from_index(1), Some(ClassLabel::Person));
        assert_eq!(ClassLabel::from_index(2), None);
        assert_eq!(ClassLabel::from_index(usize::MAX), None);
    }

    #[test]
    fn test_label_names_match_model_classes() {
        assert_eq!(ClassLabel::Gun.to_string(), "gun");
        assert_eq!(ClassLabel::Person.to_string(), "person");
    }

    #[test]
    fn test_detection_label() {
        assert_eq!(detection(0, 0.5).label(), Some(ClassLabel::Gun));
        assert_eq!(detection(7, 0.5).label(), None);
    }

    #[rstest]
    #[case::exact(0.4, 0.4)]
    #[case::rounds_up(0.401, 0.41)]
    #[case::already_two_places(0.41, 0.41)]
    #[case::binary_exact(0.25, 0.25)]
    #[case::one(1.0, 1.0)]
    #[case::tiny(0.0001, 0.01)]
    fn test_rounded_confidence(#[case] raw: f32, #[case] expected: f32) {
        assert_relative_eq!(detection(0, raw).rounded_confidence(), expected, epsilon = 1e-6);
    }
}
