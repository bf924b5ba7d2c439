use crate::capture::domain::capture_device::CaptureDevice;
use crate::capture::domain::capture_error::CaptureError;

/// Lifecycle of a `CapturePipeline`.
///
/// `Uninitialized → Authorizing → Configuring → Running ⇄ Stopped`; a
/// `start()` from `Stopped` goes back through authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Uninitialized,
    Authorizing,
    Configuring,
    Running,
    Stopped,
}

/// Opaque token for a configured, running capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSessionHandle {
    id: u64,
    device: CaptureDevice,
}

impl CaptureSessionHandle {
    pub(crate) fn new(id: u64, device: CaptureDevice) -> Self {
        Self { id, device }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }
}

/// Read-only view of the pipeline for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub camera_access: bool,
    pub session: Option<CaptureSessionHandle>,
    /// Why the last `start()` ended without a session, if it did.
    pub fault: Option<CaptureError>,
}

impl CaptureStatus {
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}
