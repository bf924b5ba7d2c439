use thiserror::Error;

/// Faults raised while bringing up a capture session.
///
/// None of these escape `CapturePipeline`: they are absorbed and surfaced as
/// `CaptureStatus::fault` with no session attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera access was denied")]
    AuthorizationDenied,
    #[error("no suitable capture device is available")]
    DeviceUnavailable,
    #[error("capture session configuration failed: {0}")]
    SessionConfigurationFailed(String),
    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(u32),
}
