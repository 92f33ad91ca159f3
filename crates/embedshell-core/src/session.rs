/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::Serialize;
use url::Url;

use crate::navigation::LoadingState;
use crate::selection::SelectionEvent;

/// State of one primary surface.
///
/// Setters return whether the observable value changed; callers publish an
/// update only when it did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    loading_state: LoadingState,
    current_url: Option<Url>,
    selection: Option<SelectionEvent>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loading_state(&self) -> &LoadingState {
        &self.loading_state
    }

    pub fn is_loading(&self) -> bool {
        self.loading_state.is_loading()
    }

    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    pub fn selection(&self) -> Option<&SelectionEvent> {
        self.selection.as_ref()
    }

    pub fn set_loading_state(&mut self, state: LoadingState) -> bool {
        if self.loading_state == state {
            return false;
        }
        self.loading_state = state;
        true
    }

    pub fn set_current_url(&mut self, url: Url) -> bool {
        if self.current_url.as_ref() == Some(&url) {
            return false;
        }
        self.current_url = Some(url);
        true
    }

    /// Replace the selection. A cleared event removes it.
    pub fn set_selection(&mut self, event: SelectionEvent) -> bool {
        let next = (!event.is_cleared()).then_some(event);
        if self.selection == next {
            return false;
        }
        self.selection = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn cleared_event_removes_previous_selection() {
        let mut session = Session::new();
        assert!(session.set_selection(SelectionEvent::new("hello", "example.com")));
        assert!(session.set_selection(SelectionEvent::cleared()));
        assert_eq!(session.selection(), None);
        assert!(!session.set_selection(SelectionEvent::new("", "example.com")));
    }

    proptest! {
        #[test]
        fn repeating_a_selection_is_not_a_change(text in "[a-z ]{1,24}", source in "[a-z.]{0,16}") {
            let mut session = Session::new();
            let event = SelectionEvent::new(text, source);
            prop_assert!(session.set_selection(event.clone()));
            let before = session.clone();
            prop_assert!(!session.set_selection(event));
            prop_assert_eq!(before, session);
        }
    }
}
