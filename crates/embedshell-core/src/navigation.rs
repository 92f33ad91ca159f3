/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Loading state of one surface as the presentation layer sees it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Which half of a navigation failed.
///
/// Provisional failures happen before the new document commits (DNS, TLS,
/// refused connection); committed failures happen while the committed
/// document is still loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPhase {
    Provisional,
    Committed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationError {
    /// Human readable description from the underlying transport.
    pub description: String,
    /// Transport error code, when the engine exposes one.
    #[serde(default)]
    pub code: Option<i64>,
}

impl NavigationError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.description),
            None => f.write_str(&self.description),
        }
    }
}

impl std::error::Error for NavigationError {}

/// A navigation lifecycle signal emitted by a surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Started,
    Finished,
    FailedProvisional(NavigationError),
    FailedCommitted(NavigationError),
}

impl NavigationOutcome {
    /// The loading state a surface is in right after this outcome.
    ///
    /// Every outcome maps to an absolute state, never a delta, so applying a
    /// stale outcome late simply overwrites.
    pub fn resulting_state(&self) -> LoadingState {
        match self {
            Self::Started => LoadingState::Loading,
            Self::Finished => LoadingState::Loaded,
            Self::FailedProvisional(error) | Self::FailedCommitted(error) => {
                LoadingState::Failed(error.to_string())
            }
        }
    }

    pub fn error(&self) -> Option<(NavigationPhase, &NavigationError)> {
        match self {
            Self::FailedProvisional(error) => Some((NavigationPhase::Provisional, error)),
            Self::FailedCommitted(error) => Some((NavigationPhase::Committed, error)),
            Self::Started | Self::Finished => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(NavigationOutcome::Started, true)]
    #[case(NavigationOutcome::Finished, false)]
    #[case(NavigationOutcome::FailedProvisional(NavigationError::new("dns")), false)]
    #[case(NavigationOutcome::FailedCommitted(NavigationError::new("reset")), false)]
    fn only_started_leaves_surface_loading(
        #[case] outcome: NavigationOutcome,
        #[case] loading: bool,
    ) {
        assert_eq!(outcome.resulting_state().is_loading(), loading);
    }

    #[test]
    fn failure_reason_carries_transport_code() {
        let outcome =
            NavigationOutcome::FailedProvisional(NavigationError::new("host unreachable").with_code(-1003));
        assert_eq!(
            outcome.resulting_state().failure_reason(),
            Some("host unreachable (code -1003)")
        );
        assert_eq!(outcome.error().map(|(phase, _)| phase), Some(NavigationPhase::Provisional));
    }

    #[test]
    fn outcome_decodes_from_tagged_json() {
        let outcome: NavigationOutcome = serde_json::from_str(
            r#"{"kind":"failed_committed","description":"connection reset"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            NavigationOutcome::FailedCommitted(NavigationError::new("connection reset"))
        );
    }
}
