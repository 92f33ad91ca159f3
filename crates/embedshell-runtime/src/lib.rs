/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Host-port trait surface for embedshell.
//!
//! A host (wry, a native toolkit, the headless test host) implements the
//! port traits; the session controller implements the capability traits.
//! Everything that crosses between the two is declared here.

mod capabilities;
mod error;
mod events;
mod ports;
mod upload;

pub use capabilities::{
    ContentMessageObserver, FileChooserRequester, NavigationObserver, PopupRequester,
    WindowCloseObserver,
};
pub use error::{ScriptError, SurfaceError};
pub use events::{SurfaceDelegate, SurfaceEvent};
pub use ports::{
    ContentSurface, FileChooserOptions, FileChooserPort, FileChooserReply, HostWindow,
    PopupParts, PopupRequest, ScriptCompletion, SurfaceFactory,
};
pub use upload::{FileUploadRequest, UploadCompletion, UploadResult};
