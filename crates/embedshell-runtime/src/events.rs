/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::sync::Arc;

use embedshell_core::{NavigationOutcome, SurfaceId, WindowId};
use serde_json::Value;
use url::Url;

use crate::ports::PopupRequest;
use crate::upload::FileUploadRequest;

/// Something a host observed on a surface or window.
#[derive(Debug)]
pub enum SurfaceEvent {
    Navigation {
        surface: SurfaceId,
        outcome: NavigationOutcome,
    },
    UrlChanged {
        surface: SurfaceId,
        url: Url,
    },
    ContentMessage {
        surface: SurfaceId,
        channel: String,
        payload: Value,
    },
    PopupRequested(PopupRequest),
    FileChooserRequested {
        surface: SurfaceId,
        request: FileUploadRequest,
    },
    WindowClosing(WindowId),
    WindowClosed(WindowId),
}

/// The callback table a host hands its surfaces and windows.
///
/// Cloneable and callable from any thread; whoever built it decides how the
/// event gets back to the controller thread.
#[derive(Clone)]
pub struct SurfaceDelegate {
    sink: Arc<dyn Fn(SurfaceEvent) + Send + Sync>,
}

impl SurfaceDelegate {
    pub fn new(sink: impl Fn(SurfaceEvent) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn notify(&self, event: SurfaceEvent) {
        (self.sink)(event)
    }

    pub fn notify_navigation(&self, surface: SurfaceId, outcome: NavigationOutcome) {
        self.notify(SurfaceEvent::Navigation { surface, outcome });
    }

    pub fn notify_url_changed(&self, surface: SurfaceId, url: Url) {
        self.notify(SurfaceEvent::UrlChanged { surface, url });
    }

    pub fn notify_content_message(&self, surface: SurfaceId, channel: impl Into<String>, payload: Value) {
        self.notify(SurfaceEvent::ContentMessage {
            surface,
            channel: channel.into(),
            payload,
        });
    }
}

impl fmt::Debug for SurfaceDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SurfaceDelegate")
    }
}
