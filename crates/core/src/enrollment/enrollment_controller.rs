use crossbeam_channel::Sender;

use crate::enrollment::domain::enrollment_error::EnrollmentError;
use crate::enrollment::domain::enrollment_phase::{EnrollmentPhase, EnrollmentStepState};
use crate::enrollment::domain::enrollment_state_machine::{next_phase, Transition};
use crate::recognition::domain::recognition_engine::RecognitionEngine;
use crate::recognition::domain::recognition_result::RecognitionResult;
use crate::shared::frame::Frame;

/// Notifications emitted to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentEvent {
    PhaseChanged(EnrollmentPhase),
    /// Fired once per transition into `Registered`.
    RegistrationCompleted,
    /// The engine refused the step-0 sample; registration stays at step 0.
    EnrollmentRejected,
}

/// What the UI reads: the phase plus the counters from the latest result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrollmentSnapshot {
    pub phase: EnrollmentPhase,
    pub faces_detected: usize,
    pub faces_recognised: usize,
}

/// Single owner of the enrollment phase.
///
/// Recognition results and user intents both go through `&mut self`, so
/// whoever owns the controller serializes them.
pub struct EnrollmentController {
    engine: Box<dyn RecognitionEngine>,
    label: String,
    phase: EnrollmentPhase,
    last_result: RecognitionResult,
    events: Option<Sender<EnrollmentEvent>>,
}

impl EnrollmentController {
    pub fn new(engine: Box<dyn RecognitionEngine>, label: impl Into<String>) -> Self {
        Self {
            engine,
            label: label.into(),
            phase: EnrollmentPhase::Recognising,
            last_result: RecognitionResult::empty(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<EnrollmentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn phase(&self) -> EnrollmentPhase {
        self.phase
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn snapshot(&self) -> EnrollmentSnapshot {
        EnrollmentSnapshot {
            phase: self.phase,
            faces_detected: self.last_result.faces_detected(),
            faces_recognised: self.last_result.faces_recognised(),
        }
    }

    /// Starts a fresh registration of `max_steps` recognised frames.
    ///
    /// Valid only while recognising. A rejected call leaves the phase as it was.
    pub fn begin_registration(&mut self, max_steps: i64) -> Result<(), EnrollmentError> {
        if !self.phase.is_recognising() {
            return Err(EnrollmentError::InvalidPhase(self.phase.name()));
        }
        let state = EnrollmentStepState::new(max_steps)?;
        log::info!("Registration started ({max_steps} steps)");
        self.set_phase(EnrollmentPhase::Registering(state));
        Ok(())
    }

    /// Forgets the enrolled identity and returns to recognising. Idempotent.
    pub fn delete_registered_face(&mut self) {
        self.engine.reset_enrollment();
        if !self.phase.is_recognising() {
            log::info!("Registered face deleted");
        }
        self.set_phase(EnrollmentPhase::Recognising);
    }

    /// Runs recognition on `frame` and feeds the result to the state machine.
    pub fn process_frame(&mut self, frame: &Frame) -> Transition {
        let result = self.engine.detect_faces(frame);
        log::debug!(
            "Frame {}: {} face(s), {} recognised",
            frame.index(),
            result.faces_detected(),
            result.faces_recognised()
        );
        self.apply_result(result)
    }

    pub fn apply_result(&mut self, result: RecognitionResult) -> Transition {
        let engine = &mut self.engine;
        let label = self.label.as_str();
        let transition = next_phase(&self.phase, &result, &mut |face_id| {
            engine.enroll(face_id, label)
        });
        self.last_result = result;

        if transition.enrollment_attempt == Some(false) {
            log::warn!("{}", EnrollmentError::EngineEnrollmentFailed);
            self.emit(EnrollmentEvent::EnrollmentRejected);
        }
        self.set_phase(transition.phase);
        if transition.completed {
            log::info!("Registration completed");
            self.emit(EnrollmentEvent::RegistrationCompleted);
        }
        transition
    }

    pub fn into_engine(self) -> Box<dyn RecognitionEngine> {
        self.engine
    }

    fn set_phase(&mut self, phase: EnrollmentPhase) {
        if phase != self.phase {
            self.phase = phase;
            self.emit(EnrollmentEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: EnrollmentEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }
}
