use std::fmt;

use crate::enrollment::domain::enrollment_error::EnrollmentError;

/// Progress through a multi-step registration.
///
/// Fields are private so `step <= max_steps` and `max_steps > 0` hold for
/// every value in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentStepState {
    step: u32,
    max_steps: u32,
    recognised_this_step: bool,
}

impl EnrollmentStepState {
    /// Fresh state at step 0. Rejects non-positive or out-of-range `max_steps`.
    pub fn new(max_steps: i64) -> Result<Self, EnrollmentError> {
        let max = u32::try_from(max_steps)
            .ok()
            .filter(|&m| m > 0)
            .ok_or(EnrollmentError::InvalidConfiguration { max_steps })?;
        Ok(Self {
            step: 0,
            max_steps: max,
            recognised_this_step: false,
        })
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn recognised_this_step(&self) -> bool {
        self.recognised_this_step
    }

    pub fn progress(&self) -> f64 {
        self.step as f64 / self.max_steps as f64
    }

    pub fn is_complete(&self) -> bool {
        self.step >= self.max_steps
    }

    /// One step further, saturating at `max_steps`.
    pub(crate) fn advanced(&self) -> Self {
        Self {
            step: self.step.saturating_add(1).min(self.max_steps),
            max_steps: self.max_steps,
            recognised_this_step: true,
        }
    }

    /// Same step, not recognised this time.
    pub(crate) fn stalled(&self) -> Self {
        Self {
            recognised_this_step: false,
            ..*self
        }
    }
}

/// The single source of truth for what the enrollment UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrollmentPhase {
    #[default]
    Recognising,
    Registering(EnrollmentStepState),
    Registered,
}

impl EnrollmentPhase {
    pub fn is_recognising(&self) -> bool {
        matches!(self, EnrollmentPhase::Recognising)
    }

    pub fn is_registering(&self) -> bool {
        matches!(self, EnrollmentPhase::Registering(_))
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, EnrollmentPhase::Registered)
    }

    pub fn step_state(&self) -> Option<&EnrollmentStepState> {
        match self {
            EnrollmentPhase::Registering(state) => Some(state),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EnrollmentPhase::Recognising => "recognising",
            EnrollmentPhase::Registering(_) => "registering",
            EnrollmentPhase::Registered => "registered",
        }
    }
}

impl fmt::Display for EnrollmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentPhase::Registering(s) => write!(
                f,
                "registering {}/{}{}",
                s.step,
                s.max_steps,
                if s.recognised_this_step { " (recognised)" } else { "" }
            ),
            other => f.write_str(other.name()),
        }
    }
}
