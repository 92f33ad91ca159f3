/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Diagnostic channel events emitted by the session controller.
//!
//! Events are fire-and-forget: emitting never fails and never blocks, and a
//! sink whose state was dropped just discards them.

use std::collections::BTreeMap;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Serialize;

pub const CHANNEL_NAVIGATION_STARTED: &str = "session.navigation.started";
pub const CHANNEL_NAVIGATION_FINISHED: &str = "session.navigation.finished";
pub const CHANNEL_NAVIGATION_FAILED: &str = "session.navigation.failed";
pub const CHANNEL_NAVIGATION_DETACHED_SURFACE: &str = "session.navigation.detached_surface";
pub const CHANNEL_CONTENT_INJECTION_SUBMITTED: &str = "content.injection.submitted";
pub const CHANNEL_CONTENT_INJECTION_COMPLETED: &str = "content.injection.completed";
pub const CHANNEL_CONTENT_INJECTION_FAILED: &str = "content.injection.failed";
pub const CHANNEL_CONTENT_INJECTION_STALE: &str = "content.injection.stale";
pub const CHANNEL_CONTENT_MESSAGE_UNKNOWN: &str = "content.message.unknown_channel";
pub const CHANNEL_CONTENT_MESSAGE_MALFORMED: &str = "content.message.malformed";
pub const CHANNEL_CONTENT_SELECTION: &str = "content.selection";
pub const CHANNEL_CONTENT_PROBE: &str = "content.credential_probe";
pub const CHANNEL_POPUP_OPENED: &str = "popup.opened";
pub const CHANNEL_POPUP_OPEN_FAILED: &str = "popup.open_failed";
pub const CHANNEL_POPUP_OPENER_DETACHED: &str = "popup.opener_detached";
pub const CHANNEL_POPUP_CLOSING: &str = "popup.closing";
pub const CHANNEL_POPUP_RELEASED: &str = "popup.released";
pub const CHANNEL_POPUP_TEARDOWN_REJECTED: &str = "popup.teardown.rejected";
pub const CHANNEL_POPUP_TEARDOWN_IGNORED: &str = "popup.teardown.ignored";
pub const CHANNEL_FILE_DIALOG_PRESENTED: &str = "file_dialog.presented";
pub const CHANNEL_FILE_DIALOG_RESOLVED: &str = "file_dialog.resolved";
pub const CHANNEL_FILE_DIALOG_CANCELLED: &str = "file_dialog.cancelled";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    MessageSent {
        channel_id: &'static str,
        byte_len: usize,
    },
    MessageReceived {
        channel_id: &'static str,
        latency_us: u64,
    },
}

impl DiagnosticEvent {
    fn channel_id(&self) -> &'static str {
        match self {
            Self::MessageSent { channel_id, .. } | Self::MessageReceived { channel_id, .. } => {
                channel_id
            }
        }
    }
}

/// Cloneable emitter half handed out through the surface environment.
#[derive(Clone, Debug)]
pub struct DiagnosticsSink {
    tx: Sender<DiagnosticEvent>,
}

impl DiagnosticsSink {
    pub fn emit(&self, event: DiagnosticEvent) {
        let _ = self.tx.send(event);
    }

    pub fn sent(&self, channel_id: &'static str, byte_len: usize) {
        self.emit(DiagnosticEvent::MessageSent {
            channel_id,
            byte_len,
        });
    }

    pub fn received(&self, channel_id: &'static str, latency_us: u64) {
        self.emit(DiagnosticEvent::MessageReceived {
            channel_id,
            latency_us,
        });
    }

    /// A sink nobody listens to.
    pub fn detached() -> Self {
        let (tx, _rx) = unbounded();
        Self { tx }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub count: u64,
    pub bytes: u64,
    pub latency_us_total: u64,
}

/// Receiver half plus per-channel aggregates.
pub struct DiagnosticsState {
    rx: Receiver<DiagnosticEvent>,
    channels: BTreeMap<&'static str, ChannelStats>,
}

impl DiagnosticsState {
    pub fn new() -> (Self, DiagnosticsSink) {
        let (tx, rx) = unbounded();
        (
            Self {
                rx,
                channels: BTreeMap::new(),
            },
            DiagnosticsSink { tx },
        )
    }

    /// Fold every queued event into the aggregates. Returns how many were drained.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(event) = self.rx.try_recv() {
            let stats = self.channels.entry(event.channel_id()).or_default();
            stats.count += 1;
            match event {
                DiagnosticEvent::MessageSent { byte_len, .. } => {
                    stats.bytes = stats.bytes.saturating_add(byte_len as u64);
                }
                DiagnosticEvent::MessageReceived { latency_us, .. } => {
                    stats.latency_us_total = stats.latency_us_total.saturating_add(latency_us);
                }
            }
            drained += 1;
        }
        drained
    }

    pub fn count(&self, channel_id: &str) -> u64 {
        self.channels
            .get(channel_id)
            .map(|stats| stats.count)
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, ChannelStats> {
        self.channels.clone()
    }
}
