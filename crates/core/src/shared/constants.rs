/// Frames per second forwarded to recognition; also the rate requested from the device.
pub const DEFAULT_FRAME_RATE: u32 = 20;

/// Matched frames required to complete a registration.
pub const DEFAULT_MAX_STEPS: u32 = 50;

/// Identity label the single detected face is enrolled under at step 0.
pub const ENROLLMENT_LABEL: &str = "SampleAppUser";

/// How long the recognition loop waits for an intent before polling the mailbox.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Frame size produced by the synthetic camera.
pub const SYNTHETIC_FRAME_WIDTH: u32 = 64;
pub const SYNTHETIC_FRAME_HEIGHT: u32 = 48;
