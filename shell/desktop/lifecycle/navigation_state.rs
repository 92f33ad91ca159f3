/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use embedshell_core::{LoadingState, NavigationOutcome, SurfaceId};

#[derive(Clone, Debug, Default)]
struct SurfaceNavigation {
    state: LoadingState,
    /// Bumped on every `Started`; identifies the document a later
    /// completion belongs to.
    document: u64,
}

/// Result of applying one navigation outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationTransition {
    pub state: LoadingState,
    pub document: u64,
}

/// Loading state per surface. Holds no policy: each outcome overwrites.
#[derive(Debug, Default)]
pub struct NavigationStateStore {
    surfaces: HashMap<SurfaceId, SurfaceNavigation>,
}

impl NavigationStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, surface: SurfaceId, outcome: &NavigationOutcome) -> NavigationTransition {
        let entry = self.surfaces.entry(surface).or_default();
        if matches!(outcome, NavigationOutcome::Started) {
            entry.document += 1;
        }
        let state = outcome.resulting_state();
        entry.state = state.clone();
        NavigationTransition {
            state,
            document: entry.document,
        }
    }

    /// Loading state of `surface`; `Idle` for surfaces never seen.
    pub fn state(&self, surface: SurfaceId) -> LoadingState {
        self.surfaces
            .get(&surface)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    pub fn current_document(&self, surface: SurfaceId) -> u64 {
        self.surfaces
            .get(&surface)
            .map(|entry| entry.document)
            .unwrap_or(0)
    }

    pub fn forget(&mut self, surface: SurfaceId) {
        self.surfaces.remove(&surface);
    }
}

#[cfg(test)]
mod tests {
    use embedshell_core::NavigationError;
    use proptest::prelude::*;

    use super::*;

    fn outcome_strategy() -> impl Strategy<Value = NavigationOutcome> {
        prop_oneof![
            Just(NavigationOutcome::Started),
            Just(NavigationOutcome::Finished),
            "[a-z]{1,8}".prop_map(|reason| NavigationOutcome::FailedProvisional(NavigationError::new(reason))),
            "[a-z]{1,8}".prop_map(|reason| NavigationOutcome::FailedCommitted(NavigationError::new(reason))),
        ]
    }

    proptest! {
        #[test]
        fn loading_state_reflects_only_the_last_outcome(
            outcomes in prop::collection::vec(outcome_strategy(), 1..40)
        ) {
            let surface = SurfaceId::from(1);
            let mut store = NavigationStateStore::new();
            for outcome in &outcomes {
                store.apply(surface, outcome);
            }
            let last = outcomes.last().unwrap();
            prop_assert_eq!(store.state(surface), last.resulting_state());
        }
    }

    #[test]
    fn restarting_navigation_opens_a_new_document() {
        let surface = SurfaceId::from(4);
        let mut store = NavigationStateStore::new();

        let first = store.apply(surface, &NavigationOutcome::Started);
        let second = store.apply(surface, &NavigationOutcome::Started);
        let finished = store.apply(surface, &NavigationOutcome::Finished);

        assert_eq!(first.state, second.state);
        assert_eq!((first.document, second.document, finished.document), (1, 2, 2));
        assert_eq!(store.state(surface), LoadingState::Loaded);
    }

    #[test]
    fn surfaces_are_tracked_independently() {
        let mut store = NavigationStateStore::new();
        store.apply(SurfaceId::from(1), &NavigationOutcome::Started);
        store.apply(SurfaceId::from(2), &NavigationOutcome::Finished);
        store.forget(SurfaceId::from(2));

        assert!(store.state(SurfaceId::from(1)).is_loading());
        assert_eq!(store.state(SurfaceId::from(2)), LoadingState::Idle);
    }
}
