use crate::enrollment::domain::enrollment_phase::{EnrollmentPhase, EnrollmentStepState};
use crate::recognition::domain::recognition_result::{FaceId, RecognitionResult};

/// Outcome of feeding one recognition result to [`next_phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub phase: EnrollmentPhase,
    /// Set exactly when this step moved the phase into `Registered`.
    pub completed: bool,
    /// Outcome of the step-0 enrollment call, when one was made.
    pub enrollment_attempt: Option<bool>,
}

impl Transition {
    fn to(phase: EnrollmentPhase) -> Self {
        Self {
            phase,
            completed: false,
            enrollment_attempt: None,
        }
    }

    fn registering(state: EnrollmentStepState) -> Self {
        Self::to(EnrollmentPhase::Registering(state))
    }
}

/// Computes the phase that follows `phase` once `result` has been observed.
///
/// Only `Registering` reacts to results. `enroll` is invoked at most once,
/// at step 0, with the id of the single detected face. Progress never goes
/// backwards. A completed step state yields `Registered` on the next result
/// showing exactly one face; ambiguous scenes hold it in `Registering`.
pub fn next_phase(
    phase: &EnrollmentPhase,
    result: &RecognitionResult,
    enroll: &mut dyn FnMut(FaceId) -> bool,
) -> Transition {
    let state = match phase {
        EnrollmentPhase::Registering(state) => state,
        other => return Transition::to(*other),
    };

    if result.faces_detected() != 1 {
        return Transition::registering(state.stalled());
    }

    if state.is_complete() {
        return Transition {
            phase: EnrollmentPhase::Registered,
            completed: true,
            enrollment_attempt: None,
        };
    }

    if state.step() == 0 {
        let Some(face_id) = result.first_face_id() else {
            return Transition::registering(state.stalled());
        };
        let accepted = enroll(face_id);
        let next = if accepted {
            state.advanced()
        } else {
            state.stalled()
        };
        return Transition {
            enrollment_attempt: Some(accepted),
            ..Transition::registering(next)
        };
    }

    if result.single_recognised() {
        Transition::registering(state.advanced())
    } else {
        Transition::registering(state.stalled())
    }
}
