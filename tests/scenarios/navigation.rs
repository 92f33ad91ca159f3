/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use embedshell::shell::desktop::runtime::diagnostics::CHANNEL_CONTENT_INJECTION_SUBMITTED;
use embedshell::test_utils::ScenarioSession;
use embedshell_core::{LoadingState, NavigationError, NavigationOutcome};
use proptest::prelude::*;
use url::Url;

fn outcome_strategy() -> impl Strategy<Value = NavigationOutcome> {
    prop_oneof![
        Just(NavigationOutcome::Started),
        Just(NavigationOutcome::Finished),
        "[a-z ]{1,12}".prop_map(|reason| NavigationOutcome::FailedProvisional(NavigationError::new(reason))),
        "[a-z ]{1,12}".prop_map(|reason| NavigationOutcome::FailedCommitted(NavigationError::new(reason))),
    ]
}

proptest! {
    #[test]
    fn loading_state_is_last_write_wins(outcomes in prop::collection::vec(outcome_strategy(), 1..24)) {
        let mut scenario = ScenarioSession::new();
        for outcome in &outcomes {
            scenario.primary.emit_navigation(outcome.clone());
        }
        scenario.pump();

        let last = outcomes.last().map(NavigationOutcome::resulting_state).unwrap_or_default();
        prop_assert_eq!(scenario.controller.session().loading_state(), &last);
    }
}

#[test]
fn superseded_navigation_injects_once_for_the_latest_document() {
    let mut scenario = ScenarioSession::new();
    let a = Url::parse("https://a.example/").unwrap();
    let b = Url::parse("https://b.example/").unwrap();

    scenario.primary.emit_navigation(NavigationOutcome::Started);
    scenario.primary.emit_url_changed(a);
    scenario.primary.emit_navigation(NavigationOutcome::Started);
    scenario.primary.emit_url_changed(b.clone());
    scenario.primary.emit_navigation(NavigationOutcome::Finished);
    scenario.pump();

    assert!(!scenario.controller.is_loading());
    assert_eq!(scenario.controller.session().loading_state(), &LoadingState::Loaded);
    assert_eq!(scenario.controller.current_url(), Some(&b));
    assert_eq!(scenario.diagnostics_count(CHANNEL_CONTENT_INJECTION_SUBMITTED), 1);
    assert!(
        scenario
            .primary
            .evaluations()
            .iter()
            .all(|url| url.as_ref() == Some(&b))
    );
}

#[test]
fn failure_reports_description_until_next_start() {
    let mut scenario = ScenarioSession::new();
    scenario.primary.emit_navigation(NavigationOutcome::Started);
    scenario
        .primary
        .emit_navigation(NavigationOutcome::FailedProvisional(NavigationError::new("host not found")));
    scenario.pump();
    assert_eq!(
        scenario.controller.session().loading_state().failure_reason(),
        Some("host not found")
    );

    scenario.primary.emit_navigation(NavigationOutcome::Started);
    scenario.pump();
    assert!(scenario.controller.is_loading());
}
