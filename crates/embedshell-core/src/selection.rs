/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};

/// Text the user selected inside the embedded document.
///
/// An empty `text` is the "no active selection" sentinel. Values are never
/// patched in place; each report replaces the previous one wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionEvent {
    #[serde(default)]
    pub text: String,
    /// Origin the selection came from, usually the document host.
    #[serde(default)]
    pub source: String,
}

impl SelectionEvent {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn is_cleared(&self) -> bool {
        self.text.is_empty()
    }
}
