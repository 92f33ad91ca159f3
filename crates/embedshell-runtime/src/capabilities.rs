/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use embedshell_core::{NavigationOutcome, PopupId, SurfaceId, WindowId};
use serde_json::Value;
use url::Url;

use crate::ports::PopupRequest;
use crate::upload::FileUploadRequest;

/// Navigation lifecycle callbacks of a surface.
pub trait NavigationObserver {
    fn on_navigation_event(&mut self, surface: SurfaceId, outcome: NavigationOutcome);
    fn on_url_changed(&mut self, surface: SurfaceId, url: Url);
}

/// Messages posted by script running inside a surface.
pub trait ContentMessageObserver {
    fn on_content_message(&mut self, surface: SurfaceId, channel: &str, payload: Value);
}

/// Requests for new top-level surfaces.
pub trait PopupRequester {
    /// Returns the id of the tracked popup, or `None` if none was opened.
    fn on_popup_requested(&mut self, request: PopupRequest) -> Option<PopupId>;
}

/// Requests for native file choosers. The answer arrives through the
/// request's completion, never synchronously.
pub trait FileChooserRequester {
    fn on_file_chooser_requested(&mut self, surface: SurfaceId, request: FileUploadRequest);
}

/// Window-system close notifications.
pub trait WindowCloseObserver {
    fn on_window_closing(&mut self, window: WindowId);
    fn on_window_closed(&mut self, window: WindowId);
}
