use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::recognition::domain::recognition_engine::RecognitionEngine;
use crate::recognition::domain::recognition_result::{FaceId, RecognitionResult};
use crate::shared::frame::Frame;

/// Calls observed by a [`ScriptedRecognitionEngine`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptedCalls {
    pub detections: usize,
    pub enrollments: Vec<(FaceId, String)>,
    pub resets: usize,
}

/// Replays a fixed sequence of results, one per `detect_faces` call.
///
/// Once the script runs out every frame yields an empty result. Enrollment
/// outcomes are replayed the same way and default to success.
pub struct ScriptedRecognitionEngine {
    results: VecDeque<RecognitionResult>,
    enroll_outcomes: VecDeque<bool>,
    calls: Arc<Mutex<ScriptedCalls>>,
}

impl ScriptedRecognitionEngine {
    pub fn new(results: Vec<RecognitionResult>) -> Self {
        Self {
            results: results.into(),
            enroll_outcomes: VecDeque::new(),
            calls: Arc::new(Mutex::new(ScriptedCalls::default())),
        }
    }

    pub fn with_enroll_outcomes(mut self, outcomes: Vec<bool>) -> Self {
        self.enroll_outcomes = outcomes.into();
        self
    }

    /// Shared handle for inspecting calls after the engine has been moved.
    pub fn calls(&self) -> Arc<Mutex<ScriptedCalls>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, f: impl FnOnce(&mut ScriptedCalls)) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *calls);
    }
}

impl RecognitionEngine for ScriptedRecognitionEngine {
    fn detect_faces(&mut self, _frame: &Frame) -> RecognitionResult {
        self.record(|c| c.detections += 1);
        self.results.pop_front().unwrap_or_default()
    }

    fn enroll(&mut self, face_id: FaceId, label: &str) -> bool {
        let accepted = self.enroll_outcomes.pop_front().unwrap_or(true);
        if accepted {
            self.record(|c| c.enrollments.push((face_id, label.to_string())));
        }
        accepted
    }

    fn reset_enrollment(&mut self) {
        self.record(|c| c.resets += 1);
    }
}
