// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fire-and-forget request to re-evaluate due reminders.
pub trait ReminderSignal {
    fn request_recheck(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSignal;

impl ReminderSignal for NoopSignal {
    fn request_recheck(&self, delay: Duration) {
        debug!(?delay, "reminder recheck requested with no listener");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecheckRequest {
    pub not_before: Instant,
}

#[derive(Debug, Clone)]
pub struct ChannelSignal {
    tx: Sender<RecheckRequest>,
}

impl ChannelSignal {
    pub fn new(tx: Sender<RecheckRequest>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, Receiver<RecheckRequest>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl ReminderSignal for ChannelSignal {
    fn request_recheck(&self, delay: Duration) {
        let request = RecheckRequest {
            not_before: Instant::now() + delay,
        };
        if self.tx.send(request).is_err() {
            warn!("reminder checker is gone; recheck request dropped");
        }
    }
}
