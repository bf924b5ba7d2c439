use serde::{Deserialize, Serialize};

use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::PixelFormat;
use crate::shared::media_time::MediaTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    Front,
    Back,
    External,
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::External => write!(f, "external"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOrientation {
    Portrait,
    Landscape,
}

/// What a capture session is asked to deliver.
///
/// `min_frame_duration` and `max_frame_duration` are pinned to the same
/// interval so the device cannot drift away from the processing rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    pub position: DevicePosition,
    pub min_frame_duration: MediaTime,
    pub max_frame_duration: MediaTime,
    pub pixel_format: PixelFormat,
    pub orientation: VideoOrientation,
}

impl CaptureConfiguration {
    pub fn new(position: DevicePosition, frame_rate: u32) -> Result<Self, CaptureError> {
        let interval =
            MediaTime::from_frame_rate(frame_rate).ok_or(CaptureError::InvalidFrameRate(frame_rate))?;
        Ok(Self {
            position,
            min_frame_duration: interval,
            max_frame_duration: interval,
            pixel_format: PixelFormat::Bgra32,
            orientation: VideoOrientation::Portrait,
        })
    }

    /// Picks the first device at the requested position.
    pub fn select_device<'a>(&self, devices: &'a [CaptureDevice]) -> Option<&'a CaptureDevice> {
        devices.iter().find(|d| d.position == self.position)
    }
}
