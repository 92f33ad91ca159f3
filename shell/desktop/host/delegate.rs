/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The queue between host callbacks and the controller thread.
//!
//! Host callbacks never touch session state. They enqueue a [`SessionTask`]
//! here, from whatever thread they run on, and the controller drains the
//! queue in order on its own turn.

use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use embedshell_core::SurfaceId;
use embedshell_runtime::{ScriptError, SurfaceDelegate, SurfaceEvent};
use serde_json::Value;

use crate::shell::desktop::content::script_injector::ScriptFragment;

#[derive(Debug)]
pub enum SessionTask {
    /// Something a surface or window reported.
    Surface(SurfaceEvent),
    /// An injected fragment finished evaluating.
    ScriptEvaluated {
        surface: SurfaceId,
        document: u64,
        fragment: ScriptFragment,
        result: Result<Value, ScriptError>,
    },
    /// A native file chooser answered.
    FileChooserResolved {
        ticket: u64,
        paths: Option<Vec<PathBuf>>,
    },
}

/// Cloneable, `Send` handle for posting tasks to one controller.
#[derive(Clone, Debug)]
pub struct HostDelegate {
    tx: Sender<SessionTask>,
}

impl HostDelegate {
    pub fn post(&self, task: SessionTask) {
        if self.tx.send(task).is_err() {
            log::debug!("Session controller is gone; dropping task");
        }
    }

    /// The callback table to hand to surfaces and windows of this session.
    pub fn surface_delegate(&self) -> SurfaceDelegate {
        let tx = self.tx.clone();
        SurfaceDelegate::new(move |event| {
            let _ = tx.send(SessionTask::Surface(event));
        })
    }
}

pub(crate) struct TaskQueue {
    tx: Sender<SessionTask>,
    rx: Receiver<SessionTask>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub(crate) fn delegate(&self) -> HostDelegate {
        HostDelegate {
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn try_next(&self) -> Option<SessionTask> {
        match self.rx.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use embedshell_core::NavigationOutcome;

    use super::*;

    #[test]
    fn tasks_posted_from_other_threads_keep_their_order() {
        let queue = TaskQueue::new();
        let delegate = queue.delegate().surface_delegate();
        let surface = SurfaceId::from(1);

        thread::spawn(move || {
            delegate.notify_navigation(surface, NavigationOutcome::Started);
            delegate.notify_navigation(surface, NavigationOutcome::Finished);
        })
        .join()
        .unwrap();

        let outcomes: Vec<_> = std::iter::from_fn(|| queue.try_next())
            .map(|task| match task {
                SessionTask::Surface(SurfaceEvent::Navigation { outcome, .. }) => outcome,
                other => panic!("unexpected task {other:?}"),
            })
            .collect();
        assert_eq!(
            outcomes,
            vec![NavigationOutcome::Started, NavigationOutcome::Finished]
        );
    }
}
