use crate::shared::bounding_box::BoundingBox;

use super::threat_policy::DEFAULT_EXTENSION;

/// Decides whether a weapon is close enough to a person to be a threat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProximityJudge {
    extension: i32,
}

impl Default for ProximityJudge {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl ProximityJudge {
    pub fn new(extension: i32) -> Self {
        Self { extension }
    }

    /// True when `weapon` overlaps `person` grown by the extension on every
    /// side. Touching edges don't count.
    pub fn is_threat(&self, person: &BoundingBox, weapon: &BoundingBox) -> bool {
        person.expanded(self.extension).intersects(weapon)
    }

    /// Person boxes to highlight, person-major over every person×weapon pair.
    ///
    /// Without `dedupe` a person near two weapons is returned twice.
    pub fn find_threats(
        &self,
        persons: &[BoundingBox],
        weapons: &[BoundingBox],
        dedupe: bool,
    ) -> Vec<BoundingBox> {
        let mut threats = Vec::new();
        for person in persons {
            for weapon in weapons {
                if self.is_threat(person, weapon) {
                    threats.push(*person);
                    if dedupe {
                        break;
                    }
                }
            }
        }
        threats
    }
}
