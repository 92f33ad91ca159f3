/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Native file choosers for content upload requests.
//!
//! The mediator owns each request's completion from presentation until the
//! chooser answers. Answers come back as [`SessionTask::FileChooserResolved`]
//! keyed by ticket, so a reply can arrive from any thread, and a chooser that
//! drops its reply still reports a cancellation.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use embedshell_core::{FileKind, SurfaceId, WindowId};
use embedshell_runtime::{
    FileChooserOptions, FileChooserPort, FileUploadRequest, UploadCompletion, UploadResult,
};
use log::{debug, warn};

use crate::shell::desktop::host::delegate::{HostDelegate, SessionTask};

struct PendingUpload {
    surface: SurfaceId,
    allows_multiple: bool,
    completion: UploadCompletion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Selected { surface: SurfaceId, count: usize },
    Cancelled { surface: SurfaceId },
    /// No pending request has that ticket; it was already answered.
    Stale,
}

/// Posts the chooser's answer back to the controller. Dropped unanswered,
/// it posts a cancellation.
struct ReplyGuard {
    ticket: u64,
    delegate: Option<HostDelegate>,
}

impl ReplyGuard {
    fn send(mut self, paths: UploadResult) {
        if let Some(delegate) = self.delegate.take() {
            delegate.post(SessionTask::FileChooserResolved {
                ticket: self.ticket,
                paths,
            });
        }
    }
}

impl Drop for ReplyGuard {
    fn drop(&mut self) {
        if let Some(delegate) = self.delegate.take() {
            debug!("File chooser {} dropped its reply", self.ticket);
            delegate.post(SessionTask::FileChooserResolved {
                ticket: self.ticket,
                paths: None,
            });
        }
    }
}

#[derive(Default)]
pub struct FileDialogMediator {
    pending: HashMap<u64, PendingUpload>,
    next_ticket: u64,
}

impl FileDialogMediator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooser configuration for `request`: the default kinds, office
    /// documents, and whatever the request itself accepts.
    pub fn chooser_options(
        request: &FileUploadRequest,
        parent: Option<WindowId>,
    ) -> FileChooserOptions {
        let mut kinds: BTreeSet<FileKind> = FileKind::defaults().into_iter().collect();
        kinds.extend(FileKind::office_documents());
        kinds.extend(request.allowed_kinds.iter().cloned());
        FileChooserOptions {
            allows_multiple: request.allows_multiple,
            allows_directories: request.allows_directories,
            kinds: kinds.into_iter().collect(),
            parent,
        }
    }

    /// Present a chooser for `request`. Returns the ticket its answer will carry.
    pub fn present(
        &mut self,
        surface: SurfaceId,
        request: FileUploadRequest,
        parent: Option<WindowId>,
        chooser: &dyn FileChooserPort,
        delegate: &HostDelegate,
    ) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let options = Self::chooser_options(&request, parent);
        self.pending.insert(
            ticket,
            PendingUpload {
                surface,
                allows_multiple: request.allows_multiple,
                completion: request.completion,
            },
        );

        let guard = ReplyGuard {
            ticket,
            delegate: Some(delegate.clone()),
        };
        chooser.present(options, Box::new(move |paths| guard.send(paths)));
        ticket
    }

    /// Fire the completion for `ticket`. Later answers for the same ticket
    /// are ignored.
    pub fn resolve(&mut self, ticket: u64, paths: UploadResult) -> Resolution {
        let Some(pending) = self.pending.remove(&ticket) else {
            warn!("Ignoring answer for unknown file chooser {ticket}");
            return Resolution::Stale;
        };
        let result = normalize(paths, pending.allows_multiple);
        let resolution = match &result {
            Some(paths) => Resolution::Selected {
                surface: pending.surface,
                count: paths.len(),
            },
            None => Resolution::Cancelled {
                surface: pending.surface,
            },
        };
        pending.completion.fire(result);
        resolution
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Empty selections count as cancellation. Single-file requests keep only
/// the first path.
fn normalize(paths: UploadResult, allows_multiple: bool) -> UploadResult {
    let mut paths: Vec<PathBuf> = paths?;
    if paths.is_empty() {
        return None;
    }
    if !allows_multiple {
        paths.truncate(1);
    }
    Some(paths)
}
