/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use embedshell_core::FileKind;

/// Chosen paths in selection order, or `None` when cancelled.
pub type UploadResult = Option<Vec<PathBuf>>;

/// One-shot completion for a [`FileUploadRequest`].
///
/// Firing consumes it. Dropping it unfired reports a cancellation, so the
/// content side is always answered exactly once.
pub struct UploadCompletion {
    callback: Option<Box<dyn FnOnce(UploadResult) + Send>>,
}

impl UploadCompletion {
    pub fn new(callback: impl FnOnce(UploadResult) + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn fire(mut self, result: UploadResult) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl Drop for UploadCompletion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(None);
        }
    }
}

impl fmt::Debug for UploadCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCompletion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// Content asked for a file chooser (an `<input type=file>` activation).
#[derive(Debug)]
pub struct FileUploadRequest {
    pub allows_multiple: bool,
    pub allows_directories: bool,
    pub allowed_kinds: BTreeSet<FileKind>,
    pub completion: UploadCompletion,
}

impl FileUploadRequest {
    pub fn new(
        allows_multiple: bool,
        allows_directories: bool,
        completion: impl FnOnce(UploadResult) + Send + 'static,
    ) -> Self {
        Self {
            allows_multiple,
            allows_directories,
            allowed_kinds: BTreeSet::new(),
            completion: UploadCompletion::new(completion),
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = FileKind>) -> Self {
        self.allowed_kinds.extend(kinds);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recording() -> (Arc<Mutex<Vec<UploadResult>>>, UploadCompletion) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let completion = UploadCompletion::new(move |result| sink.lock().unwrap().push(result));
        (calls, completion)
    }

    #[test]
    fn firing_reports_result_once() {
        let (calls, completion) = recording();
        completion.fire(Some(vec![PathBuf::from("/tmp/a.txt")]));
        assert_eq!(*calls.lock().unwrap(), vec![Some(vec![PathBuf::from("/tmp/a.txt")])]);
    }

    #[test]
    fn dropping_unfired_completion_reports_cancellation() {
        let (calls, completion) = recording();
        drop(completion);
        assert_eq!(*calls.lock().unwrap(), vec![None]);
    }
}
