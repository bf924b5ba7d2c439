pub mod enrollment_error;
pub mod enrollment_phase;
pub mod enrollment_state_machine;
