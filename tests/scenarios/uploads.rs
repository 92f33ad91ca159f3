/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;

use embedshell::shell::desktop::host::headless::ChooserAnswer;
use embedshell::test_utils::{ScenarioSession, recorded_upload};
use embedshell_core::FileKind;
use embedshell_runtime::UploadResult;
use rstest::rstest;

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[rstest]
#[case::two_files(true, ChooserAnswer::Select(paths(&["/docs/a.pdf", "/docs/b.docx"])), Some(paths(&["/docs/a.pdf", "/docs/b.docx"])))]
#[case::cancelled(true, ChooserAnswer::Cancel, None)]
#[case::single(false, ChooserAnswer::Select(paths(&["/docs/a.pdf"])), Some(paths(&["/docs/a.pdf"])))]
fn completion_fires_exactly_once(
    #[case] allows_multiple: bool,
    #[case] answer: ChooserAnswer,
    #[case] expected: UploadResult,
) {
    let mut scenario = ScenarioSession::new();
    scenario.host.chooser.push_answer(answer);
    let (uploads, request) = recorded_upload(allows_multiple);

    scenario.primary.emit_file_chooser(request);
    scenario.pump();
    scenario.pump();

    assert_eq!(*uploads.lock().unwrap(), vec![expected]);
    assert_eq!(scenario.controller.pending_uploads(), 0);
}

#[test]
fn deferred_chooser_answers_on_a_later_turn() {
    let mut scenario = ScenarioSession::new();
    scenario.host.chooser.push_answer(ChooserAnswer::Defer);
    let (uploads, request) = recorded_upload(true);

    scenario.primary.emit_file_chooser(request);
    scenario.pump();
    assert!(uploads.lock().unwrap().is_empty());
    assert_eq!(scenario.controller.pending_uploads(), 1);

    assert!(scenario.host.chooser.answer_deferred(Some(paths(&["/a"]))));
    scenario.pump();

    assert_eq!(*uploads.lock().unwrap(), vec![Some(paths(&["/a"]))]);
}

#[test]
fn chooser_offers_default_and_office_kinds() {
    let mut scenario = ScenarioSession::new();
    let (_uploads, request) = recorded_upload(false);
    scenario.primary.emit_file_chooser(request);
    scenario.pump();

    let presented = scenario.host.chooser.presented();
    assert_eq!(presented.len(), 1);
    assert!(presented[0].kinds.contains(&FileKind::Data));
    for kind in FileKind::office_documents() {
        assert!(presented[0].kinds.contains(&kind));
    }
}
