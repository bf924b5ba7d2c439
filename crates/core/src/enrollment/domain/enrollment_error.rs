use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    #[error("max_steps must be positive, got {max_steps}")]
    InvalidConfiguration { max_steps: i64 },
    #[error("cannot begin registration while {0}")]
    InvalidPhase(&'static str),
    #[error("recognition engine rejected the enrollment sample")]
    EngineEnrollmentFailed,
    #[error("recognition loop is not running")]
    LoopStopped,
}
