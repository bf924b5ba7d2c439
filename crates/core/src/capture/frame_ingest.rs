use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::capture::domain::capture_backend::FrameSink;
use crate::capture::domain::frame_gate::FrameGate;
use crate::capture::domain::frame_mailbox::FrameMailbox;
use crate::shared::frame::Frame;
use crate::shared::media_time::MediaTime;

/// Delivered/accepted frame counts, readable from any thread.
#[derive(Debug, Default)]
pub struct IngestCounters {
    delivered: AtomicU64,
    accepted: AtomicU64,
}

impl IngestCounters {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

/// The per-frame capture callback: rate-gates frames into the mailbox.
///
/// `last_accepted` is owned here and the ingest itself is moved into the
/// session's delivery thread, so it is only ever touched from there.
pub struct FrameIngest {
    gate: FrameGate,
    mailbox: Arc<FrameMailbox>,
    counters: Arc<IngestCounters>,
    last_accepted: Option<MediaTime>,
}

impl FrameIngest {
    pub fn new(gate: FrameGate, mailbox: Arc<FrameMailbox>, counters: Arc<IngestCounters>) -> Self {
        Self {
            gate,
            mailbox,
            counters,
            last_accepted: None,
        }
    }

    /// Returns whether the frame was forwarded to the mailbox.
    pub fn on_frame(&mut self, frame: Frame) -> bool {
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);

        let timestamp = frame.timestamp();
        if !self.gate.should_accept(timestamp, self.last_accepted) {
            log::trace!("Dropping frame {} at {timestamp}", frame.index());
            return false;
        }

        self.last_accepted = Some(timestamp);
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        self.mailbox.publish(frame);
        true
    }

    pub fn into_sink(mut self) -> FrameSink {
        Box::new(move |frame| {
            self.on_frame(frame);
        })
    }
}
