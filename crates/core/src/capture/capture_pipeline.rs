use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::capture::domain::capture_authorizer::{AuthorizationStatus, CaptureAuthorizer};
use crate::capture::domain::capture_backend::{CaptureBackend, CaptureSession, FrameSink};
use crate::capture::domain::capture_device::{CaptureConfiguration, CaptureDevice, DevicePosition};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_state::{CaptureSessionHandle, CaptureState, CaptureStatus};
use crate::capture::domain::frame_gate::FrameGate;
use crate::capture::domain::frame_mailbox::FrameMailbox;
use crate::capture::frame_ingest::{FrameIngest, IngestCounters};

struct ActiveSession {
    handle: CaptureSessionHandle,
    session: Box<dyn CaptureSession>,
}

struct PipelineInner {
    state: CaptureState,
    camera_access: bool,
    fault: Option<CaptureError>,
    active: Option<ActiveSession>,
    /// Bumped by every `start()` attempt and every `finish()`; a `start()`
    /// that finds its generation stale abandons its work.
    generation: u64,
    next_session_id: u64,
}

/// Owns the camera session lifecycle and feeds rate-gated frames into a
/// [`FrameMailbox`].
///
/// Capture faults never escape: a failed `start()` leaves the pipeline
/// without a session and records the reason in [`CaptureStatus::fault`].
/// `start()` may block on the permission prompt and on device configuration,
/// so callers should run it off their UI thread. `finish()` may be called
/// concurrently with it.
pub struct CapturePipeline {
    authorizer: Arc<dyn CaptureAuthorizer>,
    backend: Arc<dyn CaptureBackend>,
    configuration: CaptureConfiguration,
    gate: FrameGate,
    mailbox: Arc<FrameMailbox>,
    counters: Arc<IngestCounters>,
    inner: Mutex<PipelineInner>,
}

impl CapturePipeline {
    pub fn new(
        authorizer: Arc<dyn CaptureAuthorizer>,
        backend: Arc<dyn CaptureBackend>,
        mailbox: Arc<FrameMailbox>,
        position: DevicePosition,
        frame_rate: u32,
    ) -> Result<Self, CaptureError> {
        Ok(Self {
            authorizer,
            backend,
            configuration: CaptureConfiguration::new(position, frame_rate)?,
            gate: FrameGate::from_frame_rate(frame_rate)?,
            mailbox,
            counters: Arc::new(IngestCounters::default()),
            inner: Mutex::new(PipelineInner {
                state: CaptureState::Uninitialized,
                camera_access: false,
                fault: None,
                active: None,
                generation: 0,
                next_session_id: 0,
            }),
        })
    }

    pub fn start(&self) {
        let generation = {
            let mut guard = self.lock();
            let inner = &mut *guard;

            if let Some(active) = inner.active.as_mut() {
                if active.session.is_running() {
                    log::debug!("Capture session {} already running", active.handle.id());
                    return;
                }
                match active.session.start_running(self.new_sink()) {
                    Ok(()) => {
                        log::info!("Resumed capture session {}", active.handle.id());
                        inner.state = CaptureState::Running;
                        return;
                    }
                    Err(e) => {
                        log::warn!("Failed to resume capture session: {e}");
                        inner.state = CaptureState::Stopped;
                        inner.fault = Some(e);
                        let stale = inner.active.take();
                        drop(guard);
                        if let Some(stale) = stale {
                            shutdown_session(stale.session);
                        }
                        self.mailbox.clear();
                        return;
                    }
                }
            }

            if matches!(
                inner.state,
                CaptureState::Authorizing | CaptureState::Configuring
            ) {
                log::debug!("Capture start already in progress");
                return;
            }

            inner.generation += 1;
            inner.state = CaptureState::Authorizing;
            inner.fault = None;
            inner.generation
        };

        if !self.authorize(generation) {
            return;
        }
        if !self.transition(generation, CaptureState::Configuring) {
            return;
        }
        match self.configure() {
            Ok((session, device)) => self.publish_session(generation, session, device),
            Err(e) => self.record_fault(generation, e),
        }
    }

    /// Stops and releases the running session. No-op when already stopped.
    pub fn finish(&self) {
        let active = {
            let mut inner = self.lock();
            let idle = inner.active.is_none()
                && matches!(
                    inner.state,
                    CaptureState::Stopped | CaptureState::Uninitialized
                );
            if idle {
                return;
            }
            inner.generation += 1;
            inner.state = CaptureState::Stopped;
            inner.active.take()
        };

        if let Some(active) = active {
            let id = active.handle.id();
            shutdown_session(active.session);
            log::info!("Capture session {id} stopped");
        }
        self.mailbox.clear();
    }

    pub fn status(&self) -> CaptureStatus {
        let inner = self.lock();
        CaptureStatus {
            state: inner.state,
            camera_access: inner.camera_access,
            session: inner.active.as_ref().map(|a| a.handle.clone()),
            fault: inner.fault.clone(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.lock().state
    }

    pub fn session_handle(&self) -> Option<CaptureSessionHandle> {
        self.lock().active.as_ref().map(|a| a.handle.clone())
    }

    pub fn mailbox(&self) -> Arc<FrameMailbox> {
        Arc::clone(&self.mailbox)
    }

    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    pub fn configuration(&self) -> &CaptureConfiguration {
        &self.configuration
    }

    fn authorize(&self, generation: u64) -> bool {
        let granted = match self.authorizer.authorization_status() {
            AuthorizationStatus::Authorized => true,
            AuthorizationStatus::NotDetermined => self.authorizer.request_access(),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => false,
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.camera_access = granted;
        if !granted {
            log::warn!("Camera access not granted");
            inner.state = CaptureState::Stopped;
            inner.fault = Some(CaptureError::AuthorizationDenied);
        }
        granted
    }

    fn transition(&self, generation: u64, state: CaptureState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = state;
        true
    }

    fn configure(&self) -> Result<(Box<dyn CaptureSession>, CaptureDevice), CaptureError> {
        let devices = self.backend.enumerate_devices();
        let device = self
            .configuration
            .select_device(&devices)
            .cloned()
            .ok_or(CaptureError::DeviceUnavailable)?;

        log::info!(
            "Configuring {} ({}) at {} per frame",
            device.name,
            device.position,
            self.configuration.min_frame_duration
        );
        let mut session = self.backend.open_session(&device, &self.configuration)?;
        if let Err(e) = session.start_running(self.new_sink()) {
            session.teardown();
            self.mailbox.clear();
            return Err(e);
        }
        Ok((session, device))
    }

    fn publish_session(
        &self,
        generation: u64,
        session: Box<dyn CaptureSession>,
        device: CaptureDevice,
    ) {
        let mut inner = self.lock();
        if inner.generation != generation {
            drop(inner);
            log::info!("Capture finished during configuration; discarding new session");
            shutdown_session(session);
            // The discarded session was live between finish() and here.
            self.mailbox.clear();
            return;
        }

        inner.next_session_id += 1;
        let handle = CaptureSessionHandle::new(inner.next_session_id, device);
        log::info!("Capture session {} running", handle.id());
        inner.active = Some(ActiveSession { handle, session });
        inner.state = CaptureState::Running;
    }

    fn record_fault(&self, generation: u64, fault: CaptureError) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        log::warn!("Capture unavailable: {fault}");
        inner.state = CaptureState::Stopped;
        inner.fault = Some(fault);
    }

    fn new_sink(&self) -> FrameSink {
        FrameIngest::new(
            self.gate,
            Arc::clone(&self.mailbox),
            Arc::clone(&self.counters),
        )
        .into_sink()
    }

    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.finish();
    }
}

fn shutdown_session(mut session: Box<dyn CaptureSession>) {
    session.stop_running();
    session.teardown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::{Frame, PixelFormat};
    use crate::shared::media_time::MediaTime;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;

    // --- Fakes ---

    struct FakeAuthorizer {
        status: AuthorizationStatus,
        grant: AtomicBool,
        requests: AtomicUsize,
        gate: Option<Arc<Barrier>>,
    }

    impl FakeAuthorizer {
        fn new(status: AuthorizationStatus, grant: bool) -> Self {
            Self {
                status,
                grant: AtomicBool::new(grant),
                requests: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    impl CaptureAuthorizer for FakeAuthorizer {
        fn authorization_status(&self) -> AuthorizationStatus {
            self.status
        }

        fn request_access(&self) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.wait(); // start() is now in flight
                gate.wait(); // finish() has returned
            }
            self.grant.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct SessionTrace {
        running: AtomicBool,
        starts: AtomicUsize,
        torn_down: AtomicBool,
        sink: Mutex<Option<FrameSink>>,
    }

    struct FakeSession {
        trace: Arc<SessionTrace>,
        fail_start: bool,
        start_gate: Option<Arc<Barrier>>,
    }

    impl CaptureSession for FakeSession {
        fn start_running(&mut self, mut sink: FrameSink) -> Result<(), CaptureError> {
            if self.fail_start {
                return Err(CaptureError::SessionConfigurationFailed("no output".into()));
            }
            self.trace.starts.fetch_add(1, Ordering::SeqCst);
            self.trace.running.store(true, Ordering::SeqCst);
            if let Some(gate) = &self.start_gate {
                gate.wait(); // start() is configuring
                gate.wait(); // finish() has returned
                sink(frame(0, 0, 30));
            }
            *self.trace.sink.lock().unwrap() = Some(sink);
            Ok(())
        }

        fn stop_running(&mut self) {
            self.trace.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.trace.running.load(Ordering::SeqCst)
        }

        fn teardown(&mut self) {
            self.trace.torn_down.store(true, Ordering::SeqCst);
            *self.trace.sink.lock().unwrap() = None;
        }
    }

    struct FakeBackend {
        devices: Vec<CaptureDevice>,
        open_error: Option<CaptureError>,
        fail_start: bool,
        start_gate: Option<Arc<Barrier>>,
        trace: Arc<SessionTrace>,
    }

    impl FakeBackend {
        fn with_front_camera() -> Self {
            Self {
                devices: vec![CaptureDevice {
                    id: "front-0".into(),
                    name: "Front Camera".into(),
                    position: DevicePosition::Front,
                }],
                open_error: None,
                fail_start: false,
                start_gate: None,
                trace: Arc::new(SessionTrace::default()),
            }
        }
    }

    impl CaptureBackend for FakeBackend {
        fn enumerate_devices(&self) -> Vec<CaptureDevice> {
            self.devices.clone()
        }

        fn open_session(
            &self,
            _device: &CaptureDevice,
            configuration: &CaptureConfiguration,
        ) -> Result<Box<dyn CaptureSession>, CaptureError> {
            assert_eq!(configuration.pixel_format, PixelFormat::Bgra32);
            if let Some(e) = &self.open_error {
                return Err(e.clone());
            }
            Ok(Box::new(FakeSession {
                trace: Arc::clone(&self.trace),
                fail_start: self.fail_start,
                start_gate: self.start_gate.clone(),
            }))
        }
    }

    fn pipeline(authorizer: FakeAuthorizer, backend: FakeBackend) -> CapturePipeline {
        CapturePipeline::new(
            Arc::new(authorizer),
            Arc::new(backend),
            Arc::new(FrameMailbox::new()),
            DevicePosition::Front,
            20,
        )
        .unwrap()
    }

    fn authorized() -> FakeAuthorizer {
        FakeAuthorizer::new(AuthorizationStatus::Authorized, true)
    }

    fn frame(index: u64, num: i64, den: u32) -> Frame {
        Frame::new(
            vec![0u8; 4],
            1,
            1,
            PixelFormat::Bgra32,
            MediaTime::new(num, den),
            index,
        )
    }

    // --- Lifecycle ---

    #[test]
    fn test_initial_status() {
        let p = pipeline(authorized(), FakeBackend::with_front_camera());
        let status = p.status();
        assert_eq!(status.state, CaptureState::Uninitialized);
        assert!(!status.has_session());
        assert!(status.fault.is_none());
    }

    #[test]
    fn test_start_runs_session() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);

        p.start();

        let status = p.status();
        assert_eq!(status.state, CaptureState::Running);
        assert!(status.camera_access);
        assert_eq!(status.session.unwrap().device().id, "front-0");
        assert!(trace.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_start_twice_is_idempotent() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);

        p.start();
        let first = p.session_handle().unwrap();
        p.start();

        assert_eq!(p.session_handle().unwrap(), first);
        assert_eq!(trace.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_resumes_stopped_session() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);

        p.start();
        let handle = p.session_handle().unwrap();
        trace.running.store(false, Ordering::SeqCst); // interrupted by the system
        p.start();

        assert_eq!(p.session_handle().unwrap(), handle);
        assert_eq!(trace.starts.load(Ordering::SeqCst), 2);
        assert_eq!(p.state(), CaptureState::Running);
    }

    #[test]
    fn test_finish_stops_and_releases() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);

        p.start();
        p.finish();

        let status = p.status();
        assert_eq!(status.state, CaptureState::Stopped);
        assert!(!status.has_session());
        assert!(!trace.running.load(Ordering::SeqCst));
        assert!(trace.torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_finish_when_stopped_is_noop() {
        let p = pipeline(authorized(), FakeBackend::with_front_camera());
        p.finish();
        assert_eq!(p.state(), CaptureState::Uninitialized);
        p.start();
        p.finish();
        p.finish();
        assert_eq!(p.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_restart_after_finish_builds_new_session() {
        let p = pipeline(authorized(), FakeBackend::with_front_camera());

        p.start();
        let first = p.session_handle().unwrap();
        p.finish();
        p.start();
        let second = p.session_handle().unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(p.state(), CaptureState::Running);
    }

    // --- Authorization ---

    #[test]
    fn test_not_determined_prompts_and_grants() {
        let authorizer = Arc::new(FakeAuthorizer::new(AuthorizationStatus::NotDetermined, true));
        let p = CapturePipeline::new(
            authorizer.clone(),
            Arc::new(FakeBackend::with_front_camera()),
            Arc::new(FrameMailbox::new()),
            DevicePosition::Front,
            20,
        )
        .unwrap();

        p.start();

        assert_eq!(authorizer.requests.load(Ordering::SeqCst), 1);
        assert!(p.status().has_session());
    }

    #[test]
    fn test_prompt_declined_means_no_access() {
        let p = pipeline(
            FakeAuthorizer::new(AuthorizationStatus::NotDetermined, false),
            FakeBackend::with_front_camera(),
        );

        p.start();

        let status = p.status();
        assert!(!status.camera_access);
        assert!(!status.has_session());
        assert_eq!(status.fault, Some(CaptureError::AuthorizationDenied));
    }

    #[test]
    fn test_denied_does_not_prompt() {
        let authorizer = Arc::new(FakeAuthorizer::new(AuthorizationStatus::Denied, true));
        let p = CapturePipeline::new(
            authorizer.clone(),
            Arc::new(FakeBackend::with_front_camera()),
            Arc::new(FrameMailbox::new()),
            DevicePosition::Front,
            20,
        )
        .unwrap();

        p.start();

        assert_eq!(authorizer.requests.load(Ordering::SeqCst), 0);
        assert_eq!(p.status().fault, Some(CaptureError::AuthorizationDenied));
    }

    // --- Configuration faults ---

    #[test]
    fn test_missing_front_camera_is_absorbed() {
        let mut backend = FakeBackend::with_front_camera();
        backend.devices[0].position = DevicePosition::Back;
        let p = pipeline(authorized(), backend);

        p.start();

        let status = p.status();
        assert_eq!(status.state, CaptureState::Stopped);
        assert!(!status.has_session());
        assert_eq!(status.fault, Some(CaptureError::DeviceUnavailable));
    }

    #[test]
    fn test_session_open_failure_is_absorbed() {
        let mut backend = FakeBackend::with_front_camera();
        backend.open_error = Some(CaptureError::SessionConfigurationFailed(
            "cannot add input".into(),
        ));
        let p = pipeline(authorized(), backend);

        p.start();

        assert!(!p.status().has_session());
        assert!(matches!(
            p.status().fault,
            Some(CaptureError::SessionConfigurationFailed(_))
        ));
    }

    #[test]
    fn test_session_start_failure_tears_down() {
        let mut backend = FakeBackend::with_front_camera();
        backend.fail_start = true;
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);

        p.start();

        assert!(!p.status().has_session());
        assert!(trace.torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_denial_sticks_until_next_start() {
        let authorizer = Arc::new(FakeAuthorizer::new(AuthorizationStatus::NotDetermined, false));
        let p = CapturePipeline::new(
            authorizer.clone(),
            Arc::new(FakeBackend::with_front_camera()),
            Arc::new(FrameMailbox::new()),
            DevicePosition::Front,
            20,
        )
        .unwrap();
        p.start();
        assert_eq!(p.status().fault, Some(CaptureError::AuthorizationDenied));

        authorizer.grant.store(true, Ordering::SeqCst);
        assert_eq!(p.status().fault, Some(CaptureError::AuthorizationDenied));
        p.start();

        let status = p.status();
        assert!(status.fault.is_none());
        assert!(status.camera_access);
        assert!(status.has_session());
        assert_eq!(authorizer.requests.load(Ordering::SeqCst), 2);
    }

    // --- Frame delivery ---

    #[test]
    fn test_sink_gates_frames_into_mailbox() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);
        p.start();

        {
            let mut guard = trace.sink.lock().unwrap();
            let sink = guard.as_mut().unwrap();
            sink(frame(0, 0, 30));
            sink(frame(1, 1, 30));
            sink(frame(2, 2, 30));
            sink(frame(3, 3, 30));
        }

        assert_eq!(p.mailbox().peek_latest().unwrap().index(), 2);
        assert_eq!(p.counters().delivered(), 4);
        assert_eq!(p.counters().accepted(), 2);
    }

    #[test]
    fn test_finish_clears_mailbox() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);
        p.start();
        {
            let mut guard = trace.sink.lock().unwrap();
            (guard.as_mut().unwrap())(frame(0, 0, 30));
        }

        p.finish();

        assert!(p.mailbox().peek_latest().is_none());
    }

    // --- Concurrency ---

    #[test]
    fn test_finish_during_start_converges_to_stopped() {
        let barrier = Arc::new(Barrier::new(2));
        let mut authorizer = FakeAuthorizer::new(AuthorizationStatus::NotDetermined, true);
        authorizer.gate = Some(Arc::clone(&barrier));
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = Arc::new(pipeline(authorizer, backend));

        let starter = {
            let p = Arc::clone(&p);
            std::thread::spawn(move || p.start())
        };

        barrier.wait();
        assert_eq!(p.state(), CaptureState::Authorizing);
        p.finish();
        barrier.wait();
        starter.join().unwrap();

        let status = p.status();
        assert_eq!(status.state, CaptureState::Stopped);
        assert!(!status.has_session());
        assert!(!trace.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_finish_during_configuration_leaves_mailbox_empty() {
        let barrier = Arc::new(Barrier::new(2));
        let mut backend = FakeBackend::with_front_camera();
        backend.start_gate = Some(Arc::clone(&barrier));
        let trace = Arc::clone(&backend.trace);
        let p = Arc::new(pipeline(authorized(), backend));

        let starter = {
            let p = Arc::clone(&p);
            std::thread::spawn(move || p.start())
        };

        barrier.wait();
        assert_eq!(p.state(), CaptureState::Configuring);
        p.finish();
        barrier.wait();
        starter.join().unwrap();

        let status = p.status();
        assert_eq!(status.state, CaptureState::Stopped);
        assert!(!status.has_session());
        assert!(trace.torn_down.load(Ordering::SeqCst));
        assert_eq!(p.counters().accepted(), 1);
        assert!(p.mailbox().peek_latest().is_none());
    }

    #[test]
    fn test_drop_stops_running_session() {
        let backend = FakeBackend::with_front_camera();
        let trace = Arc::clone(&backend.trace);
        let p = pipeline(authorized(), backend);
        p.start();

        drop(p);

        assert!(!trace.running.load(Ordering::SeqCst));
        assert!(trace.torn_down.load(Ordering::SeqCst));
    }
}
