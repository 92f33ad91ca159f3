/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The session controller: one per primary surface.
//!
//! Host callbacks only enqueue. All session state is touched from
//! [`SessionController::pump`], which drains the queue in delivery order and
//! routes each task through the capability traits below.

use std::time::Instant;

use embedshell_core::{
    LoadingState, NavigationOutcome, NavigationPhase, PopupId, SelectionEvent, Session, SurfaceId,
    WindowId,
};
use embedshell_runtime::{
    ContentMessageObserver, ContentSurface, FileChooserRequester, FileUploadRequest,
    NavigationObserver, PopupRequest, PopupRequester, ScriptError, SurfaceError, SurfaceEvent,
    WindowCloseObserver,
};
use log::{debug, info, trace, warn};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::shell::desktop::content::script_injector::{
    ContentScriptInjector, InjectionError, ScriptFragment,
};
use crate::shell::desktop::content::selection_bridge::SelectionBridge;
use crate::shell::desktop::dialogs::file_dialog::{FileDialogMediator, Resolution};
use crate::shell::desktop::host::delegate::{HostDelegate, SessionTask, TaskQueue};
use crate::shell::desktop::host::environment::SurfaceEnvironment;
use crate::shell::desktop::lifecycle::navigation_state::NavigationStateStore;
use crate::shell::desktop::lifecycle::popup_lifecycle::{
    PopupLifecycleManager, PopupPhase, TeardownOutcome,
};
use crate::shell::desktop::runtime::diagnostics::{
    CHANNEL_CONTENT_INJECTION_COMPLETED, CHANNEL_CONTENT_INJECTION_FAILED,
    CHANNEL_CONTENT_INJECTION_STALE, CHANNEL_CONTENT_INJECTION_SUBMITTED,
    CHANNEL_CONTENT_MESSAGE_MALFORMED, CHANNEL_CONTENT_MESSAGE_UNKNOWN, CHANNEL_CONTENT_PROBE,
    CHANNEL_CONTENT_SELECTION, CHANNEL_FILE_DIALOG_CANCELLED, CHANNEL_FILE_DIALOG_PRESENTED,
    CHANNEL_FILE_DIALOG_RESOLVED, CHANNEL_NAVIGATION_DETACHED_SURFACE, CHANNEL_NAVIGATION_FAILED,
    CHANNEL_NAVIGATION_FINISHED, CHANNEL_NAVIGATION_STARTED, CHANNEL_POPUP_CLOSING,
    CHANNEL_POPUP_OPEN_FAILED, CHANNEL_POPUP_OPENED, CHANNEL_POPUP_OPENER_DETACHED,
    CHANNEL_POPUP_RELEASED, CHANNEL_POPUP_TEARDOWN_IGNORED, CHANNEL_POPUP_TEARDOWN_REJECTED,
};

/// Set to log every task the controller handles.
pub const TRACE_SESSION_EVENTS_ENV: &str = "EMBEDSHELL_TRACE_SESSION_EVENTS";

/// A change the presentation layer can observe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionUpdateKind {
    LoadingChanged {
        state: LoadingState,
    },
    UrlChanged {
        url: Url,
    },
    SelectionChanged {
        selection: Option<SelectionEvent>,
    },
    NavigationFailed {
        phase: NavigationPhase,
        description: String,
        code: Option<i64>,
    },
    PopupOpened {
        popup: PopupId,
        opener: SurfaceId,
    },
    PopupClosed {
        popup: PopupId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionUpdate {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: SessionUpdateKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PopupSummary {
    pub popup: PopupId,
    pub opener: SurfaceId,
    pub window: WindowId,
    pub surface: SurfaceId,
    pub url: Option<Url>,
    pub phase: PopupPhase,
    pub loading: LoadingState,
}

/// Serializable view of everything the controller tracks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub primary: SurfaceId,
    #[serde(flatten)]
    pub session: Session,
    pub popups: Vec<PopupSummary>,
    pub pending_uploads: usize,
}

pub struct SessionController {
    env: SurfaceEnvironment,
    queue: TaskQueue,
    delegate: HostDelegate,
    host_window: Option<WindowId>,
    primary: Box<dyn ContentSurface>,
    session: Session,
    navigation: NavigationStateStore,
    selection: SelectionBridge,
    popups: PopupLifecycleManager,
    dialogs: FileDialogMediator,
    pending_updates: Vec<SessionUpdate>,
    next_seq: u64,
    /// Document and turn of the latest content script submission.
    injected: Option<(u64, Instant)>,
    turn: Instant,
    started: Instant,
    handled_tasks: u64,
    trace_events: bool,
}

impl SessionController {
    /// Create the primary surface, hosted in `host_window` if there is one,
    /// and wire its callbacks to this controller's queue.
    pub fn new(
        env: SurfaceEnvironment,
        host_window: Option<WindowId>,
    ) -> Result<Self, SurfaceError> {
        let queue = TaskQueue::new();
        let delegate = queue.delegate();
        let primary = env
            .surface_factory()
            .create_primary(host_window, delegate.surface_delegate())?;
        let selection = SelectionBridge::new(env.preferences().selection_settle());
        info!("Session created for {}", primary.id());
        let now = Instant::now();

        Ok(Self {
            env,
            queue,
            delegate,
            host_window,
            primary,
            session: Session::new(),
            navigation: NavigationStateStore::new(),
            selection,
            popups: PopupLifecycleManager::new(),
            dialogs: FileDialogMediator::new(),
            pending_updates: Vec::new(),
            next_seq: 0,
            injected: None,
            turn: now,
            started: now,
            handled_tasks: 0,
            trace_events: std::env::var_os(TRACE_SESSION_EVENTS_ENV).is_some(),
        })
    }

    /// Handle every queued task in delivery order, then settle anything due
    /// at `now`. Returns the number of tasks handled.
    ///
    /// Tasks carry no arrival time: they are handled as if they arrived at
    /// `now`. A host must therefore [`Self::tick`] (or pump) at
    /// [`Self::next_deadline`], otherwise a selection that arrives after a
    /// clear fell due cancels that clear before anyone observes it.
    pub fn pump(&mut self, now: Instant) -> usize {
        self.turn = now;
        let mut handled = 0;
        while let Some(task) = self.queue.try_next() {
            self.handled_tasks += 1;
            if self.trace_events {
                debug!(
                    "session task #{} at +{}ms ({} queued): {task:?}",
                    self.handled_tasks,
                    now.saturating_duration_since(self.started).as_millis(),
                    self.queue.len()
                );
            }
            self.handle_task(task);
            handled += 1;
        }
        self.tick(now);
        handled
    }

    /// Finalize a pending selection clear whose settle delay has passed.
    pub fn tick(&mut self, now: Instant) {
        self.turn = now;
        if let Some(cleared) = self.selection.poll_due(now) {
            trace!("Selection clear settled");
            self.apply_selection(cleared);
        }
    }

    /// When the controller next needs a [`Self::tick`], if ever. Hosts
    /// schedule a timer for this instant.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.selection.next_deadline()
    }

    fn handle_task(&mut self, task: SessionTask) {
        match task {
            SessionTask::Surface(event) => self.handle_surface_event(event),
            SessionTask::ScriptEvaluated {
                surface,
                document,
                fragment,
                result,
            } => self.handle_script_evaluated(surface, document, fragment, result),
            SessionTask::FileChooserResolved { ticket, paths } => {
                match self.dialogs.resolve(ticket, paths) {
                    Resolution::Selected { surface, count } => {
                        debug!("{surface} received {count} file(s)");
                        self.env
                            .diagnostics()
                            .sent(CHANNEL_FILE_DIALOG_RESOLVED, count);
                    }
                    Resolution::Cancelled { surface } => {
                        debug!("File chooser for {surface} cancelled");
                        self.env.diagnostics().sent(CHANNEL_FILE_DIALOG_CANCELLED, 0);
                    }
                    Resolution::Stale => {}
                }
            }
        }
    }

    fn handle_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Navigation { surface, outcome } => {
                self.on_navigation_event(surface, outcome)
            }
            SurfaceEvent::UrlChanged { surface, url } => self.on_url_changed(surface, url),
            SurfaceEvent::ContentMessage {
                surface,
                channel,
                payload,
            } => self.on_content_message(surface, &channel, payload),
            SurfaceEvent::PopupRequested(request) => {
                self.on_popup_requested(request);
            }
            SurfaceEvent::FileChooserRequested { surface, request } => {
                self.on_file_chooser_requested(surface, request)
            }
            SurfaceEvent::WindowClosing(window) => self.on_window_closing(window),
            SurfaceEvent::WindowClosed(window) => self.on_window_closed(window),
        }
    }

    fn handle_script_evaluated(
        &mut self,
        surface: SurfaceId,
        document: u64,
        fragment: ScriptFragment,
        result: Result<Value, ScriptError>,
    ) {
        let current = self.navigation.current_document(surface);
        if document != current {
            debug!("{fragment} completed for superseded document {document} (now {current})");
            self.env.diagnostics().sent(CHANNEL_CONTENT_INJECTION_STALE, 0);
            return;
        }
        if let Some((_, submitted)) = self.injected.filter(|(injected, _)| *injected == document) {
            let latency = self.turn.saturating_duration_since(submitted);
            self.env.diagnostics().received(
                CHANNEL_CONTENT_INJECTION_COMPLETED,
                u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
            );
        }
        match result {
            Ok(value) => trace!("{fragment} installed in {surface}: {value}"),
            Err(error) => {
                let error = InjectionError {
                    fragment,
                    document,
                    error,
                };
                warn!("Content injection into {surface}: {error}");
                self.env
                    .diagnostics()
                    .sent(CHANNEL_CONTENT_INJECTION_FAILED, 0);
            }
        }
    }

    fn push_update(&mut self, kind: SessionUpdateKind) {
        self.next_seq += 1;
        self.pending_updates.push(SessionUpdate {
            seq: self.next_seq,
            kind,
        });
    }

    fn apply_selection(&mut self, event: SelectionEvent) {
        if self.session.set_selection(event) {
            let selection = self.session.selection().cloned();
            self.push_update(SessionUpdateKind::SelectionChanged { selection });
        }
    }

    fn install_content_scripts(&mut self, document: u64) {
        self.injected = Some((document, self.turn));
        let submitted = ContentScriptInjector::install(
            self.primary.as_ref(),
            self.env.preferences(),
            document,
            &self.delegate,
        );
        debug!(
            "Submitted {submitted} fragment(s) to {} for document {document}",
            self.primary.id()
        );
        self.env
            .diagnostics()
            .sent(CHANNEL_CONTENT_INJECTION_SUBMITTED, submitted);
    }

    // Commands from the presentation layer.

    pub fn load_url(&mut self, url: &Url) {
        info!("Loading {url} in {}", self.primary.id());
        if self.session.set_current_url(url.clone()) {
            self.push_update(SessionUpdateKind::UrlChanged { url: url.clone() });
        }
        self.primary.load(url);
    }

    /// Load the configured homepage.
    pub fn load_homepage(&mut self) -> Result<(), url::ParseError> {
        let url = Url::parse(&self.env.preferences().homepage)?;
        self.load_url(&url);
        Ok(())
    }

    pub fn reload(&mut self) {
        self.primary.reload();
    }

    pub fn stop_loading(&mut self) {
        self.primary.stop_loading();
    }

    pub fn clear_selection(&mut self) {
        self.selection.cancel_pending();
        self.apply_selection(SelectionEvent::cleared());
    }

    /// Ask the window system to close a popup. Returns false if the popup
    /// is unknown or already closing.
    pub fn close_popup(&mut self, popup: PopupId) -> bool {
        self.popups.request_close(popup)
    }

    pub fn take_pending_updates(&mut self) -> Vec<SessionUpdate> {
        std::mem::take(&mut self.pending_updates)
    }

    // Observation.

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    pub fn selection(&self) -> Option<&SelectionEvent> {
        self.session.selection()
    }

    pub fn current_url(&self) -> Option<&Url> {
        self.session.current_url()
    }

    pub fn primary_surface_id(&self) -> SurfaceId {
        self.primary.id()
    }

    pub fn host_window(&self) -> Option<WindowId> {
        self.host_window
    }

    pub fn popups(&self) -> &PopupLifecycleManager {
        &self.popups
    }

    pub fn pending_uploads(&self) -> usize {
        self.dialogs.pending_count()
    }

    /// A `Send` handle for posting tasks to this controller from any thread.
    pub fn host_delegate(&self) -> HostDelegate {
        self.delegate.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            primary: self.primary.id(),
            session: self.session.clone(),
            popups: self
                .popups
                .in_creation_order()
                .map(|handle| PopupSummary {
                    popup: handle.id(),
                    opener: handle.opener(),
                    window: handle.window_id(),
                    surface: handle.surface_id(),
                    url: handle.url(),
                    phase: handle.phase(),
                    loading: self.navigation.state(handle.surface_id()),
                })
                .collect(),
            pending_uploads: self.dialogs.pending_count(),
        }
    }
}

impl NavigationObserver for SessionController {
    fn on_navigation_event(&mut self, surface: SurfaceId, outcome: NavigationOutcome) {
        let is_primary = surface == self.primary.id();
        if !is_primary && self.popups.active_for_surface(surface).is_none() {
            debug!("Dropping navigation event for detached {surface}");
            self.env
                .diagnostics()
                .sent(CHANNEL_NAVIGATION_DETACHED_SURFACE, 0);
            return;
        }

        let transition = self.navigation.apply(surface, &outcome);
        let channel = match &outcome {
            NavigationOutcome::Started => CHANNEL_NAVIGATION_STARTED,
            NavigationOutcome::Finished => CHANNEL_NAVIGATION_FINISHED,
            NavigationOutcome::FailedProvisional(_) | NavigationOutcome::FailedCommitted(_) => {
                CHANNEL_NAVIGATION_FAILED
            }
        };
        self.env.diagnostics().sent(channel, 0);

        if !is_primary {
            trace!("{surface} is now {:?}", transition.state);
            return;
        }

        if let Some((phase, error)) = outcome.error() {
            warn!("Navigation in {surface} failed ({phase:?}): {error}");
            self.push_update(SessionUpdateKind::NavigationFailed {
                phase,
                description: error.description.clone(),
                code: error.code,
            });
        }
        if self.session.set_loading_state(transition.state.clone()) {
            self.push_update(SessionUpdateKind::LoadingChanged {
                state: transition.state,
            });
        }
        if matches!(outcome, NavigationOutcome::Finished) {
            self.install_content_scripts(transition.document);
        }
    }

    fn on_url_changed(&mut self, surface: SurfaceId, url: Url) {
        if surface != self.primary.id() {
            trace!("{surface} moved to {url}");
            return;
        }
        if self.session.set_current_url(url.clone()) {
            self.push_update(SessionUpdateKind::UrlChanged { url });
        }
    }
}

impl ContentMessageObserver for SessionController {
    fn on_content_message(&mut self, surface: SurfaceId, channel: &str, payload: Value) {
        if surface != self.primary.id() {
            trace!("Ignoring {channel} message from non-primary {surface}");
            return;
        }
        let prefs = self.env.preferences();
        let is_selection = channel == prefs.selection_channel;
        let is_diagnostic = channel == prefs.diagnostic_channel;
        let byte_len = payload.to_string().len();

        if is_selection {
            self.env
                .diagnostics()
                .sent(CHANNEL_CONTENT_SELECTION, byte_len);
            match self.selection.receive(&payload, self.turn) {
                Ok(Some(event)) => self.apply_selection(event),
                Ok(None) => trace!("Selection clear armed"),
                Err(error) => {
                    warn!("Dropping selection message from {surface}: {error}");
                    self.env
                        .diagnostics()
                        .sent(CHANNEL_CONTENT_MESSAGE_MALFORMED, byte_len);
                }
            }
        } else if is_diagnostic {
            info!("Content probe from {surface}: {payload}");
            self.env.diagnostics().sent(CHANNEL_CONTENT_PROBE, byte_len);
        } else {
            debug!("Ignoring message on unknown channel {channel:?}");
            self.env
                .diagnostics()
                .sent(CHANNEL_CONTENT_MESSAGE_UNKNOWN, byte_len);
        }
    }
}

impl PopupRequester for SessionController {
    fn on_popup_requested(&mut self, request: PopupRequest) -> Option<PopupId> {
        let opener = request.opener;
        if opener != self.primary.id() && self.popups.active_for_surface(opener).is_none() {
            debug!("Popup requested by detached {opener}; refusing");
            self.env
                .diagnostics()
                .sent(CHANNEL_POPUP_OPENER_DETACHED, 0);
            return None;
        }
        let prefs = self.env.preferences();
        let default_size = (prefs.popup_width, prefs.popup_height);
        let opened = self.popups.open(
            self.env.ids(),
            self.env.surface_factory(),
            &request,
            default_size,
            self.delegate.surface_delegate(),
        );
        match opened {
            Ok(popup) => {
                info!("Opened {popup} for {}", request.opener);
                self.env.diagnostics().sent(CHANNEL_POPUP_OPENED, 0);
                self.push_update(SessionUpdateKind::PopupOpened {
                    popup,
                    opener: request.opener,
                });
                Some(popup)
            }
            Err(error) => {
                warn!("Popup requested by {} not opened: {error}", request.opener);
                self.env.diagnostics().sent(CHANNEL_POPUP_OPEN_FAILED, 0);
                None
            }
        }
    }
}

impl FileChooserRequester for SessionController {
    fn on_file_chooser_requested(&mut self, surface: SurfaceId, request: FileUploadRequest) {
        let parent = if surface == self.primary.id() {
            self.host_window
        } else if let Some(handle) = self.popups.active_for_surface(surface) {
            Some(handle.window_id())
        } else {
            debug!("File chooser requested by detached {surface}; cancelling");
            request.completion.fire(None);
            return;
        };
        let ticket = self.dialogs.present(
            surface,
            request,
            parent,
            self.env.file_chooser(),
            &self.delegate,
        );
        debug!("Presented file chooser {ticket} for {surface}");
        self.env.diagnostics().sent(CHANNEL_FILE_DIALOG_PRESENTED, 0);
    }
}

impl WindowCloseObserver for SessionController {
    fn on_window_closing(&mut self, window: WindowId) {
        match self.popups.will_close(window) {
            Some(popup) => {
                debug!("{popup} closing");
                self.env.diagnostics().sent(CHANNEL_POPUP_CLOSING, 0);
            }
            None => trace!("will-close for untracked {window}"),
        }
    }

    fn on_window_closed(&mut self, window: WindowId) {
        let surface = self.popups.get(window).map(|handle| handle.surface_id());
        match self.popups.did_close(window) {
            TeardownOutcome::Released(popup) => {
                if let Some(surface) = surface {
                    self.navigation.forget(surface);
                }
                info!("Released {popup}");
                self.env.diagnostics().sent(CHANNEL_POPUP_RELEASED, 0);
                self.push_update(SessionUpdateKind::PopupClosed { popup });
            }
            TeardownOutcome::NotClosing(popup) => {
                warn!("{window} closed without will-close; keeping {popup}");
                self.env
                    .diagnostics()
                    .sent(CHANNEL_POPUP_TEARDOWN_REJECTED, 0);
            }
            TeardownOutcome::Unknown => {
                trace!("did-close for untracked {window}");
                self.env
                    .diagnostics()
                    .sent(CHANNEL_POPUP_TEARDOWN_IGNORED, 0);
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.primary.stop_loading();
        self.primary.detach_delegates();
    }
}
