use crate::capture::domain::capture_device::{CaptureConfiguration, CaptureDevice};
use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Per-frame delivery callback.
///
/// Owned by the session's delivery thread and invoked there for every frame,
/// in arrival order, never concurrently with itself.
pub type FrameSink = Box<dyn FnMut(Frame) + Send>;

/// Domain interface for the platform capture subsystem.
pub trait CaptureBackend: Send + Sync {
    fn enumerate_devices(&self) -> Vec<CaptureDevice>;

    /// Builds a session with `device` as input and a frame output using `configuration`.
    fn open_session(
        &self,
        device: &CaptureDevice,
        configuration: &CaptureConfiguration,
    ) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

/// A configured capture session.
pub trait CaptureSession: Send {
    /// Starts frame delivery into `sink`. A running session keeps its current sink.
    fn start_running(&mut self, sink: FrameSink) -> Result<(), CaptureError>;

    /// Stops delivery. Returns once no further sink invocation can happen.
    fn stop_running(&mut self);

    fn is_running(&self) -> bool;

    /// Removes all inputs and outputs and detaches the sink.
    fn teardown(&mut self);
}
