use crate::recognition::domain::recognition_engine::RecognitionEngine;
use crate::recognition::domain::recognition_result::{FaceId, RecognitionResult};
use crate::shared::frame::Frame;

const PRIMARY_FACE: FaceId = 1;
const BYSTANDER_FACE: FaceId = 2;

/// Deterministic engine standing in for a real recogniser.
///
/// Every frame shows the same single face; every `crowd_every`-th frame a
/// bystander joins it. Once enrolled, the primary face is matched to the
/// enrolled label. The first `reject_first` enrollment attempts fail, as a
/// real engine does with poor-quality samples.
pub struct SimulatedRecognitionEngine {
    crowd_every: Option<u64>,
    reject_first: usize,
    rejected: usize,
    enrolled: Option<String>,
    last_faces: Vec<FaceId>,
}

impl SimulatedRecognitionEngine {
    pub fn new() -> Self {
        Self {
            crowd_every: None,
            reject_first: 0,
            rejected: 0,
            enrolled: None,
            last_faces: Vec::new(),
        }
    }

    pub fn with_crowd_every(mut self, frames: u64) -> Self {
        self.crowd_every = (frames > 0).then_some(frames);
        self
    }

    pub fn with_rejected_enrollments(mut self, attempts: usize) -> Self {
        self.reject_first = attempts;
        self
    }

    pub fn enrolled_label(&self) -> Option<&str> {
        self.enrolled.as_deref()
    }

    fn is_crowded(&self, frame: &Frame) -> bool {
        self.crowd_every
            .is_some_and(|n| (frame.index() + 1) % n == 0)
    }
}

impl Default for SimulatedRecognitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionEngine for SimulatedRecognitionEngine {
    fn detect_faces(&mut self, frame: &Frame) -> RecognitionResult {
        let mut result = RecognitionResult::single(PRIMARY_FACE, self.enrolled.as_deref());
        if self.is_crowded(frame) {
            result.detected_count += 1;
            result.face_assignments.insert(BYSTANDER_FACE, None);
        }
        self.last_faces = result.face_assignments.keys().copied().collect();
        result
    }

    fn enroll(&mut self, face_id: FaceId, label: &str) -> bool {
        if !self.last_faces.contains(&face_id) {
            return false;
        }
        if self.rejected < self.reject_first {
            self.rejected += 1;
            return false;
        }
        self.enrolled = Some(label.to_string());
        true
    }

    fn reset_enrollment(&mut self) {
        self.enrolled = None;
    }
}
