use crate::detection::domain::detection::{ClassLabel, Detection};
use crate::shared::bounding_box::BoundingBox;

/// Detections of one frame split by role.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassifiedDetections {
    pub persons: Vec<BoundingBox>,
    pub weapons: Vec<BoundingBox>,
    /// Detections whose class index the model's class list doesn't cover.
    pub ignored: usize,
}

/// Sort raw detections into persons and weapons.
///
/// Persons are kept at any confidence. Guns are kept only when their
/// rounded confidence is strictly above `weapon_confidence`.
pub fn classify(detections: &[Detection], weapon_confidence: f32) -> ClassifiedDetections {
    let mut out = ClassifiedDetections::default();
    for det in detections {
        match det.label() {
            Some(ClassLabel::Person) => out.persons.push(det.bbox),
            Some(ClassLabel::Gun) => {
                if det.rounded_confidence() > weapon_confidence {
                    out.weapons.push(det.bbox);
                }
            }
            None => {
                log::debug!("Ignoring detection with unknown class index {}", det.class_id);
                out.ignored += 1;
            }
        }
    }
    out
}
