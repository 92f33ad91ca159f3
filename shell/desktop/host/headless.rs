/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-memory host used for headless runs and tests.
//!
//! Every port records what it was asked to do. Probes share state with the
//! owned objects handed to the controller, so a caller can drive host events
//! and inspect effects after ownership moved.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use embedshell_core::{IdSource, NavigationOutcome, SurfaceId, WindowId};
use embedshell_runtime::{
    ContentSurface, FileChooserOptions, FileChooserPort, FileChooserReply, FileUploadRequest,
    HostWindow, PopupParts, PopupRequest, ScriptCompletion, ScriptError, SurfaceDelegate,
    SurfaceError, SurfaceEvent, SurfaceFactory,
};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::prefs::AppPreferences;
use crate::shell::desktop::host::environment::SurfaceEnvironment;
use crate::shell::desktop::runtime::diagnostics::DiagnosticsState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
    Load(Url),
    Reload,
    StopLoading,
    DetachDelegates,
    /// A script evaluation, with the document URL at the time it was submitted.
    Evaluate { url: Option<Url>, source_len: usize },
}

#[derive(Default)]
struct SurfaceState {
    url: Option<Url>,
    delegate: Option<SurfaceDelegate>,
    calls: Vec<SurfaceCall>,
    released: bool,
    fail_scripts: bool,
    defer_scripts: bool,
    deferred_scripts: Vec<ScriptCompletion>,
}

/// The owned surface handed to a controller. Dropping it marks the shared
/// state as released.
pub struct HeadlessSurface {
    id: SurfaceId,
    state: Rc<RefCell<SurfaceState>>,
}

impl ContentSurface for HeadlessSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn url(&self) -> Option<Url> {
        self.state.borrow().url.clone()
    }

    fn load(&self, url: &Url) {
        let mut state = self.state.borrow_mut();
        state.url = Some(url.clone());
        state.calls.push(SurfaceCall::Load(url.clone()));
    }

    fn reload(&self) {
        self.state.borrow_mut().calls.push(SurfaceCall::Reload);
    }

    fn stop_loading(&self) {
        self.state.borrow_mut().calls.push(SurfaceCall::StopLoading);
    }

    fn detach_delegates(&self) {
        let mut state = self.state.borrow_mut();
        state.delegate = None;
        state.calls.push(SurfaceCall::DetachDelegates);
    }

    fn evaluate_script(&self, source: &str, completion: ScriptCompletion) {
        let fail = {
            let mut state = self.state.borrow_mut();
            let url = state.url.clone();
            state.calls.push(SurfaceCall::Evaluate {
                url,
                source_len: source.len(),
            });
            if state.defer_scripts {
                state.deferred_scripts.push(completion);
                return;
            }
            state.fail_scripts
        };
        complete_script(completion, fail);
    }
}

fn complete_script(completion: ScriptCompletion, fail: bool) {
    if fail {
        completion(Err(ScriptError::Evaluation("ReferenceError: window is not defined".to_owned())));
    } else {
        completion(Ok(Value::Null));
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        self.state.borrow_mut().released = true;
    }
}

/// Test-side view of a [`HeadlessSurface`]. Emits host events through the
/// surface's delegate for as long as one is attached.
#[derive(Clone)]
pub struct HeadlessSurfaceProbe {
    id: SurfaceId,
    state: Rc<RefCell<SurfaceState>>,
}

impl HeadlessSurfaceProbe {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn evaluations(&self) -> Vec<Option<Url>> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Evaluate { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_released(&self) -> bool {
        self.state.borrow().released
    }

    pub fn has_delegate(&self) -> bool {
        self.state.borrow().delegate.is_some()
    }

    pub fn set_fail_scripts(&self, fail: bool) {
        self.state.borrow_mut().fail_scripts = fail;
    }

    /// Hold script completions until [`Self::complete_deferred_scripts`].
    pub fn set_defer_scripts(&self, defer: bool) {
        self.state.borrow_mut().defer_scripts = defer;
    }

    /// Run every held script completion in submission order. Returns how many ran.
    pub fn complete_deferred_scripts(&self) -> usize {
        let (completions, fail) = {
            let mut state = self.state.borrow_mut();
            (std::mem::take(&mut state.deferred_scripts), state.fail_scripts)
        };
        let count = completions.len();
        for completion in completions {
            complete_script(completion, fail);
        }
        count
    }

    /// Deliver `event` through the attached delegate. Returns false, and
    /// delivers nothing, when delegates were detached.
    pub fn emit(&self, event: SurfaceEvent) -> bool {
        let delegate = self.state.borrow().delegate.clone();
        match delegate {
            Some(delegate) => {
                delegate.notify(event);
                true
            }
            None => false,
        }
    }

    pub fn emit_navigation(&self, outcome: NavigationOutcome) -> bool {
        self.emit(SurfaceEvent::Navigation {
            surface: self.id,
            outcome,
        })
    }

    /// Commit `url` as the surface's document and report the change.
    pub fn emit_url_changed(&self, url: Url) -> bool {
        self.state.borrow_mut().url = Some(url.clone());
        self.emit(SurfaceEvent::UrlChanged {
            surface: self.id,
            url,
        })
    }

    pub fn emit_message(&self, channel: &str, payload: Value) -> bool {
        self.emit(SurfaceEvent::ContentMessage {
            surface: self.id,
            channel: channel.to_owned(),
            payload,
        })
    }

    pub fn emit_popup_request(&self, url: Option<Url>) -> bool {
        self.emit(SurfaceEvent::PopupRequested(PopupRequest {
            opener: self.id,
            url,
            width: None,
            height: None,
        }))
    }

    pub fn emit_file_chooser(&self, request: FileUploadRequest) -> bool {
        self.emit(SurfaceEvent::FileChooserRequested {
            surface: self.id,
            request,
        })
    }
}

#[derive(Default)]
struct WindowState {
    presented: bool,
    close_requested: bool,
    size: (u32, u32),
    delegate: Option<SurfaceDelegate>,
}

pub struct HeadlessWindow {
    id: WindowId,
    state: Rc<RefCell<WindowState>>,
}

impl HostWindow for HeadlessWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn present(&self) {
        self.state.borrow_mut().presented = true;
    }

    fn close(&self) {
        self.state.borrow_mut().close_requested = true;
    }
}

#[derive(Clone)]
pub struct HeadlessWindowProbe {
    id: WindowId,
    state: Rc<RefCell<WindowState>>,
}

impl HeadlessWindowProbe {
    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn is_presented(&self) -> bool {
        self.state.borrow().presented
    }

    pub fn close_requested(&self) -> bool {
        self.state.borrow().close_requested
    }

    pub fn size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    fn emit(&self, event: SurfaceEvent) -> bool {
        let delegate = self.state.borrow().delegate.clone();
        delegate.map(|delegate| delegate.notify(event)).is_some()
    }

    pub fn emit_will_close(&self) -> bool {
        self.emit(SurfaceEvent::WindowClosing(self.id))
    }

    pub fn emit_did_close(&self) -> bool {
        self.emit(SurfaceEvent::WindowClosed(self.id))
    }
}

#[derive(Clone)]
pub struct HeadlessPopup {
    pub surface: HeadlessSurfaceProbe,
    pub window: HeadlessWindowProbe,
}

/// Hands out headless surfaces and windows and keeps a probe for each.
pub struct HeadlessSurfaceFactory {
    ids: IdSource,
    primaries: RefCell<Vec<HeadlessSurfaceProbe>>,
    popups: RefCell<Vec<HeadlessPopup>>,
    deny_popups: Cell<bool>,
    fixed_window_id: Cell<Option<WindowId>>,
}

impl HeadlessSurfaceFactory {
    pub fn new(ids: IdSource) -> Self {
        Self {
            ids,
            primaries: RefCell::default(),
            popups: RefCell::default(),
            deny_popups: Cell::new(false),
            fixed_window_id: Cell::new(None),
        }
    }

    pub fn set_deny_popups(&self, deny: bool) {
        self.deny_popups.set(deny);
    }

    pub fn primary(&self, index: usize) -> Option<HeadlessSurfaceProbe> {
        self.primaries.borrow().get(index).cloned()
    }

    pub fn popup(&self, index: usize) -> Option<HeadlessPopup> {
        self.popups.borrow().get(index).cloned()
    }

    /// Hand every new popup the same window id, as a misbehaving host would.
    pub fn set_fixed_window_id(&self, window: Option<WindowId>) {
        self.fixed_window_id.set(window);
    }

    fn new_surface(&self, delegate: SurfaceDelegate) -> (HeadlessSurface, HeadlessSurfaceProbe) {
        let id = self.ids.next_surface_id();
        let state = Rc::new(RefCell::new(SurfaceState {
            delegate: Some(delegate),
            ..SurfaceState::default()
        }));
        (
            HeadlessSurface {
                id,
                state: state.clone(),
            },
            HeadlessSurfaceProbe { id, state },
        )
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create_primary(
        &self,
        _window: Option<WindowId>,
        delegate: SurfaceDelegate,
    ) -> Result<Box<dyn ContentSurface>, SurfaceError> {
        let (surface, probe) = self.new_surface(delegate);
        self.primaries.borrow_mut().push(probe);
        Ok(Box::new(surface))
    }

    fn create_popup(
        &self,
        _request: &PopupRequest,
        width: u32,
        height: u32,
        delegate: SurfaceDelegate,
    ) -> Result<PopupParts, SurfaceError> {
        if self.deny_popups.get() {
            return Err(SurfaceError::Denied);
        }
        let (surface, surface_probe) = self.new_surface(delegate.clone());
        let window_id = self
            .fixed_window_id
            .get()
            .unwrap_or_else(|| self.ids.next_window_id());
        let window_state = Rc::new(RefCell::new(WindowState {
            size: (width, height),
            delegate: Some(delegate),
            ..WindowState::default()
        }));
        self.popups.borrow_mut().push(HeadlessPopup {
            surface: surface_probe,
            window: HeadlessWindowProbe {
                id: window_id,
                state: window_state.clone(),
            },
        });
        Ok(PopupParts {
            surface: Box::new(surface),
            window: Box::new(HeadlessWindow {
                id: window_id,
                state: window_state,
            }),
        })
    }
}

/// Scripted answer for the next presented chooser.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChooserAnswer {
    Select(Vec<PathBuf>),
    Cancel,
    /// Keep the reply until [`HeadlessFileChooser::answer_deferred`].
    Defer,
    /// Drop the reply without ever calling it.
    Abandon,
}

/// File chooser that answers from a script. With an empty script it cancels.
#[derive(Default)]
pub struct HeadlessFileChooser {
    answers: RefCell<VecDeque<ChooserAnswer>>,
    presented: RefCell<Vec<FileChooserOptions>>,
    deferred: RefCell<VecDeque<FileChooserReply>>,
}

impl HeadlessFileChooser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_answer(&self, answer: ChooserAnswer) {
        self.answers.borrow_mut().push_back(answer);
    }

    pub fn presented(&self) -> Vec<FileChooserOptions> {
        self.presented.borrow().clone()
    }

    /// Answer the oldest deferred chooser. Returns false if none is waiting.
    pub fn answer_deferred(&self, paths: Option<Vec<PathBuf>>) -> bool {
        let reply = self.deferred.borrow_mut().pop_front();
        match reply {
            Some(reply) => {
                reply(paths);
                true
            }
            None => false,
        }
    }
}

impl FileChooserPort for HeadlessFileChooser {
    fn present(&self, options: FileChooserOptions, reply: FileChooserReply) {
        self.presented.borrow_mut().push(options);
        let answer = self
            .answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(ChooserAnswer::Cancel);
        match answer {
            ChooserAnswer::Select(paths) => reply(Some(paths)),
            ChooserAnswer::Cancel => reply(None),
            ChooserAnswer::Defer => self.deferred.borrow_mut().push_back(reply),
            ChooserAnswer::Abandon => drop(reply),
        }
    }
}

/// A complete in-memory host: headless ports, a diagnostics receiver, and
/// the environment sessions are created from.
pub struct HeadlessHost {
    pub factory: Rc<HeadlessSurfaceFactory>,
    pub chooser: Rc<HeadlessFileChooser>,
    pub diagnostics: DiagnosticsState,
    environment: SurfaceEnvironment,
}

impl HeadlessHost {
    pub fn new(preferences: AppPreferences) -> Self {
        let ids = IdSource::new();
        let factory = Rc::new(HeadlessSurfaceFactory::new(ids.clone()));
        let chooser = Rc::new(HeadlessFileChooser::new());
        let (diagnostics, sink) = DiagnosticsState::new();
        let environment = SurfaceEnvironment::new(
            ids,
            preferences,
            factory.clone(),
            chooser.clone(),
            sink,
        );
        Self {
            factory,
            chooser,
            diagnostics,
            environment,
        }
    }

    pub fn environment(&self) -> SurfaceEnvironment {
        self.environment.clone()
    }

    /// Probe for the first primary surface created from this host.
    pub fn primary(&self) -> Option<HeadlessSurfaceProbe> {
        self.factory.primary(0)
    }
}
