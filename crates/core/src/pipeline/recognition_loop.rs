use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::capture::domain::frame_mailbox::FrameMailbox;
use crate::enrollment::domain::enrollment_error::EnrollmentError;
use crate::enrollment::enrollment_controller::{
    EnrollmentController, EnrollmentEvent, EnrollmentSnapshot,
};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::frame::Frame;

enum Command {
    BeginRegistration {
        max_steps: i64,
        reply: Sender<Result<(), EnrollmentError>>,
    },
    DeleteRegisteredFace,
}

/// Consumer side of the frame mailbox.
///
/// Runs on its own thread and owns the [`EnrollmentController`], so user
/// intents and recognition results are applied one at a time in arrival
/// order. Between intents it polls the mailbox and processes each published
/// frame at most once.
pub struct RecognitionLoop {
    mailbox: Arc<FrameMailbox>,
    poll_interval: Duration,
    logger: Box<dyn PipelineLogger>,
}

impl RecognitionLoop {
    pub fn new(mailbox: Arc<FrameMailbox>, poll_interval: Duration) -> Self {
        Self {
            mailbox,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Moves `controller` onto a new thread and starts consuming frames.
    ///
    /// The controller's event sender is replaced by the handle's channel.
    pub fn spawn(self, controller: EnrollmentController) -> RecognitionLoopHandle {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let controller = controller.with_events(event_tx);
        let snapshot = Arc::new(Mutex::new(controller.snapshot()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            controller,
            mailbox: self.mailbox,
            poll_interval: self.poll_interval,
            logger: self.logger,
            commands: command_rx,
            snapshot: Arc::clone(&snapshot),
            cancelled: Arc::clone(&cancelled),
            last_frame: Weak::new(),
        };
        let thread = std::thread::spawn(move || worker.run());

        RecognitionLoopHandle {
            commands: command_tx,
            events: event_rx,
            snapshot,
            cancelled,
            thread: Some(thread),
        }
    }
}

struct Worker {
    controller: EnrollmentController,
    mailbox: Arc<FrameMailbox>,
    poll_interval: Duration,
    logger: Box<dyn PipelineLogger>,
    commands: Receiver<Command>,
    snapshot: Arc<Mutex<EnrollmentSnapshot>>,
    cancelled: Arc<AtomicBool>,
    last_frame: Weak<Frame>,
}

impl Worker {
    fn run(mut self) -> EnrollmentController {
        self.logger.info("Recognition loop started");
        while !self.cancelled.load(Ordering::Acquire) {
            match self.commands.recv_timeout(self.poll_interval) {
                Ok(Command::BeginRegistration { max_steps, reply }) => {
                    let result = self.controller.begin_registration(max_steps);
                    if let Err(e) = &result {
                        log::warn!("Registration not started: {e}");
                    }
                    self.publish_snapshot();
                    let _ = reply.send(result);
                }
                Ok(Command::DeleteRegisteredFace) => {
                    self.controller.delete_registered_face();
                    self.publish_snapshot();
                }
                Err(RecvTimeoutError::Timeout) => self.process_latest(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.logger.info("Recognition loop stopped");
        self.logger.summary();
        self.controller
    }

    fn process_latest(&mut self) {
        let Some(frame) = self.mailbox.peek_latest() else {
            return;
        };
        let weak = Arc::downgrade(&frame);
        if self.last_frame.ptr_eq(&weak) {
            return;
        }
        self.last_frame = weak;

        let started = Instant::now();
        let transition = self.controller.process_frame(&frame);
        self.logger.frame_processed();
        self.logger
            .timing("recognise", started.elapsed().as_secs_f64() * 1000.0);

        let snapshot = self.controller.snapshot();
        self.logger
            .metric("faces_detected", snapshot.faces_detected as f64);
        if let Some(state) = transition.phase.step_state() {
            self.logger.progress(state.step(), state.max_steps());
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        let snapshot = self.controller.snapshot();
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// Caller-side handle to a running [`RecognitionLoop`].
///
/// Dropping the handle stops the loop and joins its thread.
pub struct RecognitionLoopHandle {
    commands: Sender<Command>,
    events: Receiver<EnrollmentEvent>,
    snapshot: Arc<Mutex<EnrollmentSnapshot>>,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<EnrollmentController>>,
}

impl RecognitionLoopHandle {
    /// Asks the loop to start registering and waits for its answer.
    pub fn begin_registration(&self, max_steps: i64) -> Result<(), EnrollmentError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(Command::BeginRegistration {
                max_steps,
                reply: reply_tx,
            })
            .map_err(|_| EnrollmentError::LoopStopped)?;
        reply_rx.recv().map_err(|_| EnrollmentError::LoopStopped)?
    }

    pub fn delete_registered_face(&self) -> Result<(), EnrollmentError> {
        self.commands
            .send(Command::DeleteRegisteredFace)
            .map_err(|_| EnrollmentError::LoopStopped)
    }

    /// Phase and face counters as of the last processed frame or intent.
    pub fn snapshot(&self) -> EnrollmentSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Receiver<EnrollmentEvent> {
        self.events.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the loop and hands back the controller.
    ///
    /// Returns `None` if the loop thread panicked.
    pub fn shutdown(mut self) -> Option<EnrollmentController> {
        self.stop()
    }

    fn stop(&mut self) -> Option<EnrollmentController> {
        self.cancelled.store(true, Ordering::Release);
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(controller) => Some(controller),
            Err(_) => {
                log::error!("Recognition loop thread panicked");
                None
            }
        }
    }
}

impl Drop for RecognitionLoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
