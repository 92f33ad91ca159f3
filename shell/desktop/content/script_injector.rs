/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Behavior installed into every loaded primary document.
//!
//! Two independent fragments are submitted per load: the selection watcher
//! and the read-only credential probe. Evaluation is fire-and-forget; each
//! completion comes back to the controller as a [`SessionTask`] tagged with
//! the document it was submitted for.

use std::fmt;

use embedshell_runtime::{ContentSurface, ScriptError};
use serde::Serialize;

use crate::prefs::AppPreferences;
use crate::shell::desktop::host::delegate::{HostDelegate, SessionTask};

const SELECTION_WATCHER_SOURCE: &str = include_str!("scripts/selection_watcher.js");
const CREDENTIAL_PROBE_SOURCE: &str = include_str!("scripts/credential_probe.js");

const CHANNEL_PLACEHOLDER: &str = "__CHANNEL__";
const SETTLE_PLACEHOLDER: &str = "__SETTLE_MS__";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFragment {
    SelectionWatcher,
    CredentialProbe,
}

impl ScriptFragment {
    pub fn name(self) -> &'static str {
        match self {
            Self::SelectionWatcher => "selection_watcher",
            Self::CredentialProbe => "credential_probe",
        }
    }

    /// Source with the channel name and settle delay filled in.
    pub fn render(self, prefs: &AppPreferences) -> String {
        let (template, channel) = match self {
            Self::SelectionWatcher => (SELECTION_WATCHER_SOURCE, &prefs.selection_channel),
            Self::CredentialProbe => (CREDENTIAL_PROBE_SOURCE, &prefs.diagnostic_channel),
        };
        // A JSON string literal is a valid JS string literal.
        let channel = serde_json::Value::String(channel.clone()).to_string();
        template
            .replace(CHANNEL_PLACEHOLDER, &channel)
            .replace(SETTLE_PLACEHOLDER, &prefs.selection_settle_ms.to_string())
    }
}

impl fmt::Display for ScriptFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fragment failed to evaluate. Logged, never surfaced as a session failure.
#[derive(Debug)]
pub struct InjectionError {
    pub fragment: ScriptFragment,
    pub document: u64,
    pub error: ScriptError,
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed in document {}: {}",
            self.fragment, self.document, self.error
        )
    }
}

impl std::error::Error for InjectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct ContentScriptInjector;

impl ContentScriptInjector {
    pub const FRAGMENTS: [ScriptFragment; 2] =
        [ScriptFragment::SelectionWatcher, ScriptFragment::CredentialProbe];

    /// Submit every fragment to `surface` for `document`. Returns how many
    /// evaluations were submitted.
    pub fn install(
        surface: &dyn ContentSurface,
        prefs: &AppPreferences,
        document: u64,
        delegate: &HostDelegate,
    ) -> usize {
        let surface_id = surface.id();
        for fragment in Self::FRAGMENTS {
            let delegate = delegate.clone();
            let source = fragment.render(prefs);
            log::trace!("Injecting {fragment} into {surface_id} (document {document})");
            surface.evaluate_script(
                &source,
                Box::new(move |result| {
                    delegate.post(SessionTask::ScriptEvaluated {
                        surface: surface_id,
                        document,
                        fragment,
                        result,
                    });
                }),
            );
        }
        Self::FRAGMENTS.len()
    }
}
