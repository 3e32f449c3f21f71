/// One detected object, bounding box in normalized 0..1 coordinates.
#[derive(Clone, Debug)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class: ObjectClass,
}

/// Coarse object classes, mapped from COCO class ids.
///
/// Only `Person` participates in counting; the rest exist so detections from
/// a general-purpose model stay inspectable in logs.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectClass {
    Person,
    Vehicle,
    Animal,
    Unknown,
}

impl ObjectClass {
    /// Map a COCO class id (person is id 0) to the coarse class.
    pub fn from_coco_id(id: u32) -> Self {
        match id {
            0 => ObjectClass::Person,
            1..=8 => ObjectClass::Vehicle,
            14..=23 => ObjectClass::Animal,
            _ => ObjectClass::Unknown,
        }
    }

    pub fn is_person(self) -> bool {
        matches!(self, ObjectClass::Person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_person_is_class_zero() {
        assert_eq!(ObjectClass::from_coco_id(0), ObjectClass::Person);
        assert!(ObjectClass::from_coco_id(0).is_person());
    }

    #[test]
    fn coco_vehicles_and_animals_are_not_people() {
        assert_eq!(ObjectClass::from_coco_id(2), ObjectClass::Vehicle);
        assert_eq!(ObjectClass::from_coco_id(16), ObjectClass::Animal);
        assert_eq!(ObjectClass::from_coco_id(63), ObjectClass::Unknown);
        assert!(!ObjectClass::from_coco_id(2).is_person());
    }
}
