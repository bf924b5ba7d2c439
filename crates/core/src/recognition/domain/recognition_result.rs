use std::collections::BTreeMap;

/// Engine-assigned identifier of a detected face within one result.
pub type FaceId = i64;

/// What the recognition engine reports for one frame.
///
/// `face_assignments` maps each detected face to the identity it matched,
/// or `None` when the face was detected but not recognised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionResult {
    pub detected_count: usize,
    pub face_assignments: BTreeMap<FaceId, Option<String>>,
}

impl RecognitionResult {
    pub fn new(detected_count: usize, face_assignments: BTreeMap<FaceId, Option<String>>) -> Self {
        Self {
            detected_count,
            face_assignments,
        }
    }

    /// No faces in view.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Exactly one face, optionally matched to `identity`.
    pub fn single(face_id: FaceId, identity: Option<&str>) -> Self {
        Self::new(
            1,
            BTreeMap::from([(face_id, identity.map(str::to_string))]),
        )
    }

    /// `count` unmatched faces with ids `0..count`.
    pub fn crowd(count: usize) -> Self {
        Self::new(count, (0..count as FaceId).map(|id| (id, None)).collect())
    }

    pub fn faces_detected(&self) -> usize {
        self.detected_count
    }

    /// Faces whose assignment is present and non-empty.
    pub fn faces_recognised(&self) -> usize {
        self.face_assignments
            .values()
            .filter(|identity| identity.as_deref().is_some_and(|s| !s.is_empty()))
            .count()
    }

    pub fn first_face_id(&self) -> Option<FaceId> {
        self.face_assignments.keys().next().copied()
    }

    /// True when exactly one face carries an identity.
    pub fn single_recognised(&self) -> bool {
        self.faces_recognised() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let result = RecognitionResult::empty();
        assert_eq!(result.faces_detected(), 0);
        assert_eq!(result.faces_recognised(), 0);
        assert!(result.first_face_id().is_none());
    }

    #[test]
    fn test_single_matched() {
        let result = RecognitionResult::single(7, Some("alice"));
        assert_eq!(result.faces_detected(), 1);
        assert_eq!(result.first_face_id(), Some(7));
        assert!(result.single_recognised());
    }

    #[test]
    fn test_single_unmatched() {
        let result = RecognitionResult::single(7, None);
        assert_eq!(result.faces_recognised(), 0);
        assert!(!result.single_recognised());
    }

    #[test]
    fn test_empty_identity_is_not_recognised() {
        let result = RecognitionResult::single(1, Some(""));
        assert_eq!(result.faces_recognised(), 0);
    }

    #[test]
    fn test_crowd_counts() {
        let mut result = RecognitionResult::crowd(3);
        assert_eq!(result.faces_detected(), 3);
        assert_eq!(result.faces_recognised(), 0);

        result.face_assignments.insert(1, Some("bob".into()));
        assert_eq!(result.faces_recognised(), 1);
    }
}
