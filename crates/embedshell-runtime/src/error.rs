/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use embedshell_core::WindowId;

/// Failure of a script evaluated inside a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptError {
    /// The engine evaluated the script and it threw.
    Evaluation(String),
    /// The document went away before evaluation finished.
    DocumentGone,
    /// The engine refused to evaluate (content policy, unsupported result type).
    Rejected(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluation(message) => write!(f, "script threw: {message}"),
            Self::DocumentGone => f.write_str("document was torn down before evaluation finished"),
            Self::Rejected(reason) => write!(f, "script evaluation rejected: {reason}"),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Failure to allocate a secondary surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// The host declined to open a new window (popup blocking, policy).
    Denied,
    CreationFailed(String),
    /// The host handed out a window that already hosts a live popup.
    WindowInUse(WindowId),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied => f.write_str("host declined to open a secondary surface"),
            Self::CreationFailed(reason) => write!(f, "failed to create secondary surface: {reason}"),
            Self::WindowInUse(window) => write!(f, "{window} already hosts a popup"),
        }
    }
}

impl std::error::Error for SurfaceError {}
