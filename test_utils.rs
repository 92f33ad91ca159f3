/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Helpers for driving a headless session from tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedshell_core::WindowId;
use embedshell_runtime::{FileUploadRequest, UploadResult};

use crate::prefs::AppPreferences;
use crate::shell::desktop::host::headless::{HeadlessHost, HeadlessPopup, HeadlessSurfaceProbe};
use crate::shell::desktop::host::session_controller::{SessionController, SessionUpdateKind};

/// A controller over a headless host with a manual clock.
pub struct ScenarioSession {
    pub host: HeadlessHost,
    pub controller: SessionController,
    pub primary: HeadlessSurfaceProbe,
    now: Instant,
}

impl ScenarioSession {
    pub fn new() -> Self {
        Self::with_preferences(AppPreferences::default())
    }

    pub fn with_preferences(preferences: AppPreferences) -> Self {
        Self::build(preferences, None)
    }

    /// A session whose primary surface lives in `window`.
    pub fn with_host_window(window: WindowId) -> Self {
        Self::build(AppPreferences::default(), Some(window))
    }

    fn build(preferences: AppPreferences, host_window: Option<WindowId>) -> Self {
        let host = HeadlessHost::new(preferences);
        let controller = SessionController::new(host.environment(), host_window)
            .expect("headless factory always creates a primary surface");
        let primary = host.primary().expect("primary probe recorded");
        Self {
            host,
            controller,
            primary,
            now: Instant::now(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn pump(&mut self) -> usize {
        self.controller.pump(self.now)
    }

    /// Move the clock forward and pump.
    pub fn advance(&mut self, by: Duration) -> usize {
        self.now += by;
        self.controller.pump(self.now)
    }

    /// Drain pending updates, keeping only their kinds.
    pub fn updates(&mut self) -> Vec<SessionUpdateKind> {
        self.controller
            .take_pending_updates()
            .into_iter()
            .map(|update| update.kind)
            .collect()
    }

    pub fn popup(&self, index: usize) -> HeadlessPopup {
        self.host.factory.popup(index).expect("popup was opened")
    }

    /// Drain diagnostics, then count events on `channel`.
    pub fn diagnostics_count(&mut self, channel: &str) -> u64 {
        self.host.diagnostics.drain();
        self.host.diagnostics.count(channel)
    }
}

impl Default for ScenarioSession {
    fn default() -> Self {
        Self::new()
    }
}

pub type UploadLog = Arc<Mutex<Vec<UploadResult>>>;

/// An upload request whose completions are recorded in the returned log.
pub fn recorded_upload(allows_multiple: bool) -> (UploadLog, FileUploadRequest) {
    let log = UploadLog::default();
    let sink = log.clone();
    let request = FileUploadRequest::new(allows_multiple, false, move |result| {
        sink.lock().expect("upload log poisoned").push(result)
    });
    (log, request)
}
