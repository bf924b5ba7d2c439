use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use faceenroll_core::capture::capture_pipeline::CapturePipeline;
use faceenroll_core::capture::domain::capture_authorizer::{AuthorizationStatus, CaptureAuthorizer};
use faceenroll_core::capture::domain::capture_device::{CaptureDevice, DevicePosition};
use faceenroll_core::capture::domain::frame_mailbox::FrameMailbox;
use faceenroll_core::capture::infrastructure::synthetic_camera::{
    SyntheticAuthorizer, SyntheticCaptureBackend,
};
use faceenroll_core::enrollment::domain::enrollment_phase::EnrollmentPhase;
use faceenroll_core::enrollment::enrollment_controller::{EnrollmentController, EnrollmentEvent};
use faceenroll_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use faceenroll_core::pipeline::recognition_loop::{RecognitionLoop, RecognitionLoopHandle};
use faceenroll_core::recognition::infrastructure::simulated_engine::SimulatedRecognitionEngine;
use faceenroll_core::shared::settings::Settings;

/// How long to wait for the loop to confirm a deleted face.
const DELETE_CONFIRM_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs a face enrollment session against a simulated camera.
#[derive(Parser)]
#[command(name = "faceenroll")]
struct Cli {
    /// Settings file (defaults to the per-user config file).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Processing rate in frames per second.
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Native rate of the simulated camera.
    #[arg(long, default_value = "30")]
    source_fps: u32,

    /// Recognised frames required to complete registration.
    #[arg(long, allow_negative_numbers = true)]
    max_steps: Option<i64>,

    /// Give up if registration has not completed after this many seconds.
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Put a second face in view every Nth frame.
    #[arg(long)]
    crowd_every: Option<u64>,

    /// Reject the first N enrollment samples.
    #[arg(long, default_value = "0")]
    reject_first: usize,

    /// Simulate the user refusing camera access.
    #[arg(long)]
    deny_camera: bool,

    /// Simulate a device with only a back camera.
    #[arg(long)]
    no_front_camera: bool,

    /// Delete the registered face once registration completes.
    #[arg(long)]
    delete_after: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    let max_steps = cli.max_steps.unwrap_or(i64::from(settings.max_steps));

    let authorizer: Arc<dyn CaptureAuthorizer> = if cli.deny_camera {
        Arc::new(SyntheticAuthorizer::new(
            AuthorizationStatus::NotDetermined,
            false,
        ))
    } else {
        Arc::new(SyntheticAuthorizer::authorized())
    };
    let mut backend = SyntheticCaptureBackend::new(cli.source_fps);
    if cli.no_front_camera {
        backend = backend.with_devices(vec![CaptureDevice {
            id: "synthetic-back".to_string(),
            name: "Synthetic Back Camera".to_string(),
            position: DevicePosition::Back,
        }]);
    }

    let mailbox = Arc::new(FrameMailbox::new());
    let pipeline = Arc::new(CapturePipeline::new(
        authorizer,
        Arc::new(backend),
        Arc::clone(&mailbox),
        settings.camera_position,
        settings.frame_rate,
    )?);

    // start() blocks on the permission prompt and device configuration.
    let starter = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || pipeline.start())
    };
    starter
        .join()
        .map_err(|_| "capture start thread panicked")?;

    let status = pipeline.status();
    if !status.has_session() {
        let reason = status
            .fault
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no session".to_string());
        return Err(format!("Camera unavailable: {reason}").into());
    }
    log::info!(
        "Capturing at {} fps from {}",
        settings.frame_rate,
        status
            .session
            .as_ref()
            .map(|s| s.device().name.as_str())
            .unwrap_or("unknown device")
    );

    let mut engine = SimulatedRecognitionEngine::new().with_rejected_enrollments(cli.reject_first);
    if let Some(n) = cli.crowd_every {
        engine = engine.with_crowd_every(n);
    }
    let controller = EnrollmentController::new(Box::new(engine), settings.enrollment_label.clone());
    let handle = RecognitionLoop::new(mailbox, Duration::from_millis(settings.poll_interval_ms))
        .with_logger(Box::new(SummaryPipelineLogger::new()))
        .spawn(controller);

    let outcome = enroll(
        &handle,
        max_steps,
        Duration::from_secs(cli.timeout_secs),
        cli.delete_after,
    );

    pipeline.finish();
    let counters = pipeline.counters();
    log::info!(
        "Frames delivered: {}, accepted: {}",
        counters.delivered(),
        counters.accepted()
    );
    if let Some(controller) = handle.shutdown() {
        println!("Final phase: {}", controller.phase());
    }
    outcome
}

fn resolve_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    if let Some(rate) = cli.frame_rate {
        settings.frame_rate = rate;
    }
    settings.validate()?;
    if cli.source_fps == 0 {
        return Err("Source fps must be positive".into());
    }
    Ok(settings)
}

fn enroll(
    handle: &RecognitionLoopHandle,
    max_steps: i64,
    timeout: Duration,
    delete_after: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = handle.events();
    handle.begin_registration(max_steps)?;
    println!("Registration started: hold still in front of the camera");

    wait_for(&events, timeout, |event| match event {
        EnrollmentEvent::PhaseChanged(phase) => {
            println!("{phase}");
            false
        }
        EnrollmentEvent::EnrollmentRejected => {
            eprintln!("Sample rejected, retrying");
            false
        }
        EnrollmentEvent::RegistrationCompleted => true,
    })
    .map_err(|_| format!("Registration did not complete within {}s", timeout.as_secs()))?;
    println!("Registration completed");

    if delete_after {
        handle.delete_registered_face()?;
        wait_for(&events, DELETE_CONFIRM_TIMEOUT, |event| {
            *event == EnrollmentEvent::PhaseChanged(EnrollmentPhase::Recognising)
        })
        .map_err(|_| "Registered face was not deleted")?;
        println!("Registered face deleted");
    }
    Ok(())
}

/// Consumes events until `done` returns true or `timeout` elapses.
fn wait_for(
    events: &Receiver<EnrollmentEvent>,
    timeout: Duration,
    mut done: impl FnMut(&EnrollmentEvent) -> bool,
) -> Result<(), RecvTimeoutError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = events.recv_timeout(remaining)?;
        if done(&event) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("faceenroll").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_negative_max_steps_parses() {
        let cli = parse(&["--max-steps", "-2"]);
        assert_eq!(cli.max_steps, Some(-2));
    }

    #[test]
    fn test_frame_rate_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings::default().save_to(&path).unwrap();

        let ok = parse(&["--settings", path.to_str().unwrap(), "--frame-rate", "15"]);
        assert_eq!(resolve_settings(&ok).unwrap().frame_rate, 15);

        let zero = parse(&["--settings", path.to_str().unwrap(), "--frame-rate", "0"]);
        assert!(resolve_settings(&zero).is_err());
    }

    #[test]
    fn test_wait_for_stops_on_match() {
        let (tx, rx) = unbounded();
        tx.send(EnrollmentEvent::EnrollmentRejected).unwrap();
        tx.send(EnrollmentEvent::RegistrationCompleted).unwrap();

        let mut seen = 0;
        let result = wait_for(&rx, Duration::from_millis(100), |e| {
            seen += 1;
            *e == EnrollmentEvent::RegistrationCompleted
        });

        assert!(result.is_ok());
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_wait_for_times_out() {
        let (_tx, rx) = unbounded::<EnrollmentEvent>();
        assert_eq!(
            wait_for(&rx, Duration::from_millis(10), |_| true),
            Err(RecvTimeoutError::Timeout)
        );
    }
}
