use crate::capture::domain::capture_error::CaptureError;
use crate::shared::media_time::MediaTime;

/// Admits at most one frame per `period`.
///
/// Stateless: the caller owns the last accepted timestamp and updates it
/// whenever `should_accept` returns true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGate {
    period: MediaTime,
}

impl FrameGate {
    pub fn new(period: MediaTime) -> Result<Self, &'static str> {
        if period <= MediaTime::ZERO {
            return Err("period must be positive");
        }
        Ok(Self { period })
    }

    pub fn from_frame_rate(fps: u32) -> Result<Self, CaptureError> {
        let period = MediaTime::from_frame_rate(fps).ok_or(CaptureError::InvalidFrameRate(fps))?;
        Ok(Self { period })
    }

    pub fn period(&self) -> MediaTime {
        self.period
    }

    /// Accepts iff at least one period has elapsed since `last_accepted`.
    ///
    /// With nothing accepted yet the frame is always admitted. A timestamp
    /// earlier than `last_accepted` yields a negative delta and is rejected.
    pub fn should_accept(&self, timestamp: MediaTime, last_accepted: Option<MediaTime>) -> bool {
        match last_accepted {
            None => true,
            Some(last) => timestamp.has_elapsed(last, self.period),
        }
    }
}
