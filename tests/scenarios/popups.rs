/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use embedshell::shell::desktop::host::headless::SurfaceCall;
use embedshell::shell::desktop::lifecycle::popup_lifecycle::PopupPhase;
use embedshell::shell::desktop::runtime::diagnostics::{
    CHANNEL_POPUP_TEARDOWN_IGNORED, CHANNEL_POPUP_TEARDOWN_REJECTED,
};
use embedshell::test_utils::ScenarioSession;
use embedshell_core::NavigationOutcome;
use serde_json::json;
use url::Url;

fn open_popup(scenario: &mut ScenarioSession) {
    scenario
        .primary
        .emit_popup_request(Some(Url::parse("https://idp.example/authorize").unwrap()));
    scenario.pump();
}

#[test]
fn closing_popup_cannot_be_mutated() {
    let mut scenario = ScenarioSession::new();
    open_popup(&mut scenario);
    let popup = scenario.popup(0);
    let popup_id = scenario.controller.snapshot().popups[0].popup;

    popup.window.emit_will_close();
    scenario.pump();
    let calls_at_close = popup.surface.calls();

    assert!(!popup.surface.emit_navigation(NavigationOutcome::Started));
    assert!(!popup.surface.emit_message("selection", json!({"text": "x"})));
    assert!(!scenario.controller.close_popup(popup_id));
    let handle = scenario.controller.popups().get(popup.window.id()).unwrap();
    assert_eq!(handle.phase(), PopupPhase::Closing);
    assert!(handle.surface().is_none());
    scenario.pump();

    assert_eq!(popup.surface.calls(), calls_at_close);
    assert_eq!(
        &calls_at_close[calls_at_close.len() - 2..],
        &[SurfaceCall::StopLoading, SurfaceCall::DetachDelegates]
    );
}

#[test]
fn active_popup_is_not_released_without_will_close() {
    let mut scenario = ScenarioSession::new();
    open_popup(&mut scenario);
    let popup = scenario.popup(0);

    popup.window.emit_did_close();
    scenario.pump();

    assert_eq!(scenario.controller.popups().len(), 1);
    assert!(!popup.surface.is_released());
    assert_eq!(scenario.diagnostics_count(CHANNEL_POPUP_TEARDOWN_REJECTED), 1);

    popup.window.emit_will_close();
    popup.window.emit_did_close();
    popup.window.emit_did_close();
    scenario.pump();

    assert!(scenario.controller.popups().is_empty());
    assert!(popup.surface.is_released());
    assert_eq!(scenario.diagnostics_count(CHANNEL_POPUP_TEARDOWN_IGNORED), 1);
}

#[test]
fn close_command_goes_through_the_window_system() {
    let mut scenario = ScenarioSession::new();
    open_popup(&mut scenario);
    open_popup(&mut scenario);
    let first = scenario.popup(0);
    let second = scenario.popup(1);
    let first_id = scenario.controller.snapshot().popups[0].popup;

    assert!(scenario.controller.close_popup(first_id));
    assert!(first.window.close_requested());
    assert_eq!(scenario.controller.popups().len(), 2);

    first.window.emit_will_close();
    first.window.emit_did_close();
    scenario.pump();

    assert_eq!(scenario.controller.popups().len(), 1);
    assert!(second.surface.has_delegate());
    assert!(!second.window.close_requested());
}
