/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Replays a recorded trace of host events against a headless session.
//!
//! A trace is a JSON array of `{"at_ms": u64, "event": {...}}`. Host events
//! are emitted through the headless surfaces exactly as an engine would, so
//! they take the same queue path as live callbacks. Commands call the
//! controller directly.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedshell_core::{FileKind, NavigationOutcome};
use embedshell_runtime::{FileUploadRequest, SurfaceError, UploadResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::prefs::AppPreferences;
use crate::shell::desktop::host::headless::{
    ChooserAnswer, HeadlessHost, HeadlessSurfaceProbe, HeadlessWindowProbe,
};
use crate::shell::desktop::host::session_controller::{
    SessionController, SessionSnapshot, SessionUpdate,
};
use crate::shell::desktop::runtime::diagnostics::ChannelStats;

/// Which surface a host event comes from. Popups are numbered in the order
/// they were opened, starting at 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceTarget {
    #[default]
    Primary,
    Popup(usize),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Navigation {
        #[serde(default)]
        target: TraceTarget,
        outcome: NavigationOutcome,
    },
    UrlChanged {
        #[serde(default)]
        target: TraceTarget,
        url: Url,
    },
    Message {
        #[serde(default)]
        target: TraceTarget,
        channel: String,
        #[serde(default)]
        payload: Value,
    },
    PopupRequested {
        #[serde(default)]
        target: TraceTarget,
        #[serde(default)]
        url: Option<Url>,
    },
    WindowClosing {
        popup: usize,
    },
    WindowClosed {
        popup: usize,
    },
    FileChooser {
        #[serde(default)]
        target: TraceTarget,
        #[serde(default)]
        allows_multiple: bool,
        #[serde(default)]
        allows_directories: bool,
        /// `accept` attribute tokens: extensions or MIME types.
        #[serde(default)]
        accept: Vec<String>,
        answer: ChooserAnswer,
    },
    LoadUrl {
        url: Url,
    },
    Reload,
    StopLoading,
    ClearSelection,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TraceEntry {
    #[serde(default)]
    pub at_ms: u64,
    pub event: TraceEvent,
}

#[derive(Debug)]
pub enum ReplayError {
    Read { path: PathBuf, error: std::io::Error },
    Parse(serde_json::Error),
    Surface(SurfaceError),
    UnknownPopup { popup: usize, at_ms: u64 },
    Homepage(url::ParseError),
    Encode(serde_json::Error),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, error } => {
                write!(f, "could not read trace {}: {error}", path.display())
            }
            Self::Parse(error) => write!(f, "invalid trace: {error}"),
            Self::Surface(error) => write!(f, "could not create session: {error}"),
            Self::UnknownPopup { popup, at_ms } => {
                write!(f, "trace refers to popup {popup} at {at_ms}ms before it was opened")
            }
            Self::Homepage(error) => write!(f, "invalid homepage preference: {error}"),
            Self::Encode(error) => write!(f, "could not encode replay report: {error}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { error, .. } => Some(error),
            Self::Parse(error) | Self::Encode(error) => Some(error),
            Self::Surface(error) => Some(error),
            Self::Homepage(error) => Some(error),
            Self::UnknownPopup { .. } => None,
        }
    }
}

impl From<SurfaceError> for ReplayError {
    fn from(error: SurfaceError) -> Self {
        Self::Surface(error)
    }
}

/// Everything a replay observed.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub session: SessionSnapshot,
    pub updates: Vec<SessionUpdate>,
    /// Upload completions in the order they fired.
    pub uploads: Vec<UploadResult>,
    /// Host events a detached surface refused to deliver.
    pub dropped_events: usize,
    pub diagnostics: BTreeMap<&'static str, ChannelStats>,
}

pub fn parse_trace(source: &str) -> Result<Vec<TraceEntry>, ReplayError> {
    serde_json::from_str(source).map_err(ReplayError::Parse)
}

pub fn read_trace(path: &Path) -> Result<Vec<TraceEntry>, ReplayError> {
    let source = fs::read_to_string(path).map_err(|error| ReplayError::Read {
        path: path.to_owned(),
        error,
    })?;
    parse_trace(&source)
}

struct Replay {
    host: HeadlessHost,
    controller: SessionController,
    primary: HeadlessSurfaceProbe,
    uploads: Arc<Mutex<Vec<UploadResult>>>,
    updates: Vec<SessionUpdate>,
    dropped_events: usize,
}

impl Replay {
    fn surface(&self, target: TraceTarget, at_ms: u64) -> Result<HeadlessSurfaceProbe, ReplayError> {
        match target {
            TraceTarget::Primary => Ok(self.primary.clone()),
            TraceTarget::Popup(popup) => self
                .host
                .factory
                .popup(popup)
                .map(|parts| parts.surface)
                .ok_or(ReplayError::UnknownPopup { popup, at_ms }),
        }
    }

    fn window(&self, popup: usize, at_ms: u64) -> Result<HeadlessWindowProbe, ReplayError> {
        self.host
            .factory
            .popup(popup)
            .map(|parts| parts.window)
            .ok_or(ReplayError::UnknownPopup { popup, at_ms })
    }

    fn delivered(&mut self, delivered: bool, at_ms: u64) {
        if !delivered {
            debug!("Event at {at_ms}ms dropped by a detached surface");
            self.dropped_events += 1;
        }
    }

    fn apply(&mut self, entry: TraceEntry) -> Result<(), ReplayError> {
        let at_ms = entry.at_ms;
        match entry.event {
            TraceEvent::Navigation { target, outcome } => {
                let delivered = self.surface(target, at_ms)?.emit_navigation(outcome);
                self.delivered(delivered, at_ms);
            }
            TraceEvent::UrlChanged { target, url } => {
                let delivered = self.surface(target, at_ms)?.emit_url_changed(url);
                self.delivered(delivered, at_ms);
            }
            TraceEvent::Message {
                target,
                channel,
                payload,
            } => {
                let delivered = self.surface(target, at_ms)?.emit_message(&channel, payload);
                self.delivered(delivered, at_ms);
            }
            TraceEvent::PopupRequested { target, url } => {
                let delivered = self.surface(target, at_ms)?.emit_popup_request(url);
                self.delivered(delivered, at_ms);
            }
            TraceEvent::WindowClosing { popup } => {
                let delivered = self.window(popup, at_ms)?.emit_will_close();
                self.delivered(delivered, at_ms);
            }
            TraceEvent::WindowClosed { popup } => {
                let delivered = self.window(popup, at_ms)?.emit_did_close();
                self.delivered(delivered, at_ms);
            }
            TraceEvent::FileChooser {
                target,
                allows_multiple,
                allows_directories,
                accept,
                answer,
            } => {
                let surface = self.surface(target, at_ms)?;
                self.host.chooser.push_answer(answer);
                let uploads = self.uploads.clone();
                let request =
                    FileUploadRequest::new(allows_multiple, allows_directories, move |result| {
                        if let Ok(mut uploads) = uploads.lock() {
                            uploads.push(result);
                        }
                    })
                    .with_kinds(accept.iter().filter_map(|token| FileKind::from_accept_token(token)));
                let delivered = surface.emit_file_chooser(request);
                self.delivered(delivered, at_ms);
            }
            TraceEvent::LoadUrl { url } => self.controller.load_url(&url),
            TraceEvent::Reload => self.controller.reload(),
            TraceEvent::StopLoading => self.controller.stop_loading(),
            TraceEvent::ClearSelection => self.controller.clear_selection(),
        }
        Ok(())
    }

    fn pump(&mut self, now: Instant) {
        self.controller.pump(now);
        self.updates.extend(self.controller.take_pending_updates());
    }
}

/// Run `trace` against a fresh headless session that starts on the
/// configured homepage. Entries run in order; an entry timestamped earlier
/// than its predecessor runs at the predecessor's time. A selection clear
/// falling due between entries settles at its deadline, and one still
/// pending at the end settles before reporting.
pub fn run_replay(
    preferences: AppPreferences,
    trace: Vec<TraceEntry>,
) -> Result<ReplayReport, ReplayError> {
    let host = HeadlessHost::new(preferences);
    let controller = SessionController::new(host.environment(), None)?;
    let primary = host.primary().ok_or_else(|| {
        ReplayError::Surface(SurfaceError::CreationFailed(
            "headless factory kept no primary surface".to_owned(),
        ))
    })?;
    let mut replay = Replay {
        host,
        controller,
        primary,
        uploads: Arc::default(),
        updates: Vec::new(),
        dropped_events: 0,
    };

    let start = Instant::now();
    replay
        .controller
        .load_homepage()
        .map_err(ReplayError::Homepage)?;
    replay.pump(start);

    let mut now = start;
    let entries = trace.len();
    for entry in trace {
        now = now.max(start + Duration::from_millis(entry.at_ms));
        if let Some(deadline) = replay.controller.next_deadline().filter(|due| *due <= now) {
            replay.pump(deadline);
        }
        replay.pump(now);
        replay.apply(entry)?;
        replay.pump(now);
    }
    if let Some(deadline) = replay.controller.next_deadline() {
        replay.pump(deadline.max(now));
    }
    info!(
        "Replayed {entries} entries; {} update(s)",
        replay.updates.len()
    );

    replay.host.diagnostics.drain();
    let uploads = replay
        .uploads
        .lock()
        .map(|uploads| uploads.clone())
        .unwrap_or_default();
    Ok(ReplayReport {
        session: replay.controller.snapshot(),
        updates: replay.updates,
        uploads,
        dropped_events: replay.dropped_events,
        diagnostics: replay.host.diagnostics.snapshot(),
    })
}
