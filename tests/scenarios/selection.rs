/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use embedshell::SessionUpdateKind;
use embedshell::prefs::AppPreferences;
use embedshell::test_utils::ScenarioSession;
use embedshell_core::SelectionEvent;
use rstest::rstest;
use serde_json::json;

fn selection_updates(scenario: &mut ScenarioSession) -> Vec<Option<SelectionEvent>> {
    scenario
        .updates()
        .into_iter()
        .filter_map(|kind| match kind {
            SessionUpdateKind::SelectionChanged { selection } => Some(selection),
            _ => None,
        })
        .collect()
}

#[rstest]
#[case::debounced(100)]
#[case::immediate(0)]
fn set_then_clear_observes_cleared(#[case] settle_ms: u64) {
    let mut scenario = ScenarioSession::with_preferences(AppPreferences {
        selection_settle_ms: settle_ms,
        ..AppPreferences::default()
    });
    scenario
        .primary
        .emit_message("selection", json!({"text": "hello", "source": "example.com"}));
    scenario
        .primary
        .emit_message("selection", json!({"text": "", "source": ""}));
    scenario.pump();
    scenario.advance(Duration::from_millis(settle_ms));

    assert_eq!(scenario.controller.selection(), None);
    assert_eq!(
        selection_updates(&mut scenario),
        vec![Some(SelectionEvent::new("hello", "example.com")), None]
    );
}

#[test]
fn same_selection_twice_is_observed_once() {
    let mut scenario = ScenarioSession::new();
    for _ in 0..2 {
        scenario
            .primary
            .emit_message("selection", json!({"text": "hello", "source": "example.com"}));
        scenario.pump();
    }

    assert_eq!(selection_updates(&mut scenario).len(), 1);
}

#[test]
fn reselection_inside_settle_window_suppresses_clear() {
    let mut scenario = ScenarioSession::new();
    let hello = json!({"text": "hello", "source": "example.com"});

    scenario.primary.emit_message("selection", hello.clone());
    scenario.pump();
    scenario
        .primary
        .emit_message("selection", json!({"text": "", "source": ""}));
    scenario.advance(Duration::from_millis(30));
    scenario.primary.emit_message("selection", hello);
    scenario.advance(Duration::from_millis(30));
    scenario.advance(Duration::from_millis(500));

    assert_eq!(
        scenario.controller.selection(),
        Some(&SelectionEvent::new("hello", "example.com"))
    );
    assert_eq!(
        selection_updates(&mut scenario),
        vec![Some(SelectionEvent::new("hello", "example.com"))]
    );
}
