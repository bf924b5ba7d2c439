use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::domain::capture_authorizer::{AuthorizationStatus, CaptureAuthorizer};
use crate::capture::domain::capture_backend::{CaptureBackend, CaptureSession, FrameSink};
use crate::capture::domain::capture_device::{
    CaptureConfiguration, CaptureDevice, DevicePosition,
};
use crate::capture::domain::capture_error::CaptureError;
use crate::shared::constants::{SYNTHETIC_FRAME_HEIGHT, SYNTHETIC_FRAME_WIDTH};
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::media_time::MediaTime;

/// Permission prompt stand-in with a fixed answer.
pub struct SyntheticAuthorizer {
    status: Mutex<AuthorizationStatus>,
    grant_on_request: bool,
}

impl SyntheticAuthorizer {
    pub fn new(status: AuthorizationStatus, grant_on_request: bool) -> Self {
        Self {
            status: Mutex::new(status),
            grant_on_request,
        }
    }

    pub fn authorized() -> Self {
        Self::new(AuthorizationStatus::Authorized, true)
    }
}

impl CaptureAuthorizer for SyntheticAuthorizer {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_access(&self) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        *status = if self.grant_on_request {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        self.grant_on_request
    }
}

/// Camera backend that generates BGRA frames on a delivery thread.
///
/// Frame `n` of a session carries the timestamp `n / source_fps`, so the
/// source runs at its own native rate regardless of what the configuration
/// asks for.
pub struct SyntheticCaptureBackend {
    devices: Vec<CaptureDevice>,
    source_fps: u32,
    width: u32,
    height: u32,
    session_failure: Option<String>,
}

impl SyntheticCaptureBackend {
    /// A backend exposing one front camera.
    pub fn new(source_fps: u32) -> Self {
        Self {
            devices: vec![CaptureDevice {
                id: "synthetic-front".to_string(),
                name: "Synthetic Front Camera".to_string(),
                position: DevicePosition::Front,
            }],
            source_fps: source_fps.max(1),
            width: SYNTHETIC_FRAME_WIDTH,
            height: SYNTHETIC_FRAME_HEIGHT,
            session_failure: None,
        }
    }

    pub fn with_devices(mut self, devices: Vec<CaptureDevice>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Makes every `open_session` fail with `reason`.
    pub fn with_session_failure(mut self, reason: &str) -> Self {
        self.session_failure = Some(reason.to_string());
        self
    }
}

impl CaptureBackend for SyntheticCaptureBackend {
    fn enumerate_devices(&self) -> Vec<CaptureDevice> {
        self.devices.clone()
    }

    fn open_session(
        &self,
        device: &CaptureDevice,
        configuration: &CaptureConfiguration,
    ) -> Result<Box<dyn CaptureSession>, CaptureError> {
        if let Some(reason) = &self.session_failure {
            return Err(CaptureError::SessionConfigurationFailed(reason.clone()));
        }
        if !self.devices.iter().any(|d| d.id == device.id) {
            return Err(CaptureError::DeviceUnavailable);
        }
        log::debug!(
            "Opening synthetic session on {} ({}x{} {:?}, source {} fps)",
            device.id,
            self.width,
            self.height,
            configuration.pixel_format,
            self.source_fps
        );
        Ok(Box::new(SyntheticSession {
            source_fps: self.source_fps,
            width: self.width,
            height: self.height,
            pixel_format: configuration.pixel_format,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            next_index: 0,
            torn_down: false,
        }))
    }
}

struct SyntheticSession {
    source_fps: u32,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    running: Arc<AtomicBool>,
    /// Delivery thread; yields the next frame index when it exits.
    thread: Option<JoinHandle<u64>>,
    next_index: u64,
    torn_down: bool,
}

impl CaptureSession for SyntheticSession {
    fn start_running(&mut self, mut sink: FrameSink) -> Result<(), CaptureError> {
        if self.torn_down {
            return Err(CaptureError::SessionConfigurationFailed(
                "session has no inputs".to_string(),
            ));
        }
        if self.thread.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let (fps, width, height, format) =
            (self.source_fps, self.width, self.height, self.pixel_format);
        let mut index = self.next_index;
        let frame_len = width as usize * height as usize * format.bytes_per_pixel();
        let interval = Duration::from_secs_f64(1.0 / fps as f64);

        self.thread = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let frame = Frame::new(
                    vec![(index % 256) as u8; frame_len],
                    width,
                    height,
                    format,
                    MediaTime::new(index as i64, fps),
                    index,
                );
                sink(frame);
                index += 1;
                thread::sleep(interval);
            }
            index
        }));
        Ok(())
    }

    fn stop_running(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(next) => self.next_index = next,
                Err(_) => log::error!("Synthetic delivery thread panicked"),
            }
        }
    }

    fn is_running(&self) -> bool {
        self.thread.is_some() && self.running.load(Ordering::SeqCst)
    }

    fn teardown(&mut self) {
        self.stop_running();
        self.torn_down = true;
    }
}

impl Drop for SyntheticSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}
