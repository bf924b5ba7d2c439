use crate::recognition::domain::recognition_result::{FaceId, RecognitionResult};
use crate::shared::frame::Frame;

/// Domain interface for the face detection/recognition engine.
///
/// The engine owns the enrolled-identity store. Failures are reported as
/// plain outcomes (`false`, an empty result), never as errors.
pub trait RecognitionEngine: Send {
    fn detect_faces(&mut self, frame: &Frame) -> RecognitionResult;

    /// Enrolls the face `face_id` from the most recent detection under `label`.
    fn enroll(&mut self, face_id: FaceId, label: &str) -> bool;

    /// Forgets every enrolled identity.
    fn reset_enrollment(&mut self);
}
