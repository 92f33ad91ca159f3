/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;

use embedshell_core::{FileKind, SurfaceId, WindowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{ScriptError, SurfaceError};
use crate::events::SurfaceDelegate;

/// Completion for an asynchronous script evaluation. It may run on any thread.
pub type ScriptCompletion = Box<dyn FnOnce(Result<Value, ScriptError>) + Send>;

/// Reply from a native file chooser. `None` means the user cancelled.
pub type FileChooserReply = Box<dyn FnOnce(Option<Vec<PathBuf>>) + Send>;

/// A script-capable document surface (a web view).
pub trait ContentSurface {
    fn id(&self) -> SurfaceId;
    fn url(&self) -> Option<Url>;
    fn load(&self, url: &Url);
    fn reload(&self);
    fn stop_loading(&self);
    /// Point the surface's navigation and UI delegates at nothing. After this
    /// returns, the surface must not call back into the host.
    fn detach_delegates(&self);
    /// Evaluate `source` in the current document once it has loaded.
    fn evaluate_script(&self, source: &str, completion: ScriptCompletion);
}

/// A native window hosting a surface.
pub trait HostWindow {
    fn id(&self) -> WindowId;
    /// Show the window and run whatever entrance animation the host uses.
    fn present(&self);
    /// Ask the window system to close the window. Closing is confirmed later
    /// through will-close/did-close notifications.
    fn close(&self);
}

/// Content asked for a new top-level surface (`target=_blank`, `window.open`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupRequest {
    pub opener: SurfaceId,
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// The owned pieces of a freshly created popup.
pub struct PopupParts {
    pub surface: Box<dyn ContentSurface>,
    pub window: Box<dyn HostWindow>,
}

/// Allocates surfaces. Every surface a factory hands out shares one content
/// store and process pool, so popups see the primary surface's cookies.
pub trait SurfaceFactory {
    /// Create the primary surface of a session, hosted in `window` if the
    /// session has one.
    fn create_primary(
        &self,
        window: Option<WindowId>,
        delegate: SurfaceDelegate,
    ) -> Result<Box<dyn ContentSurface>, SurfaceError>;

    /// Create a popup surface in its own window. Both report through
    /// `delegate`.
    fn create_popup(
        &self,
        request: &PopupRequest,
        width: u32,
        height: u32,
        delegate: SurfaceDelegate,
    ) -> Result<PopupParts, SurfaceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChooserOptions {
    pub allows_multiple: bool,
    pub allows_directories: bool,
    pub kinds: Vec<FileKind>,
    /// Window to attach the chooser to. `None` presents an unattached modal.
    pub parent: Option<WindowId>,
}

/// Native file-selection dialogs.
pub trait FileChooserPort {
    /// Present a chooser. `reply` must be called at most once, from any thread.
    fn present(&self, options: FileChooserOptions, reply: FileChooserReply);
}
