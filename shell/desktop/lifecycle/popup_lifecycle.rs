/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Popup surfaces opened by content.
//!
//! Each popup moves through `Active → Closing → released`. Teardown has two
//! phases driven by the window system: will-close stops loads and detaches
//! delegates, did-close drops the handle. A popup is never released without
//! going through will-close first.

use std::collections::HashMap;

use embedshell_core::{IdSource, PopupId, SurfaceId, WindowId};
use embedshell_runtime::{
    ContentSurface, HostWindow, PopupRequest, SurfaceDelegate, SurfaceError, SurfaceFactory,
};
use log::debug;
use serde::Serialize;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupPhase {
    Active,
    Closing,
}

pub struct PopupHandle {
    id: PopupId,
    opener: SurfaceId,
    surface_id: SurfaceId,
    window_id: WindowId,
    phase: PopupPhase,
    // Field order is drop order: the surface goes before the window hosting it.
    surface: Box<dyn ContentSurface>,
    window: Box<dyn HostWindow>,
}

impl PopupHandle {
    pub fn id(&self) -> PopupId {
        self.id
    }

    pub fn opener(&self) -> SurfaceId {
        self.opener
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn phase(&self) -> PopupPhase {
        self.phase
    }

    pub fn is_closing(&self) -> bool {
        self.phase == PopupPhase::Closing
    }

    /// The document the popup shows, still readable while closing.
    pub fn url(&self) -> Option<Url> {
        self.surface.url()
    }

    /// The popup's surface while the popup is active. Once closing has begun
    /// the surface is unreachable.
    pub fn surface(&self) -> Option<&dyn ContentSurface> {
        match self.phase {
            PopupPhase::Active => Some(self.surface.as_ref()),
            PopupPhase::Closing => None,
        }
    }

    fn begin_closing(&mut self) {
        self.surface.stop_loading();
        self.surface.detach_delegates();
        self.phase = PopupPhase::Closing;
    }
}

/// What a did-close notification did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownOutcome {
    Released(PopupId),
    /// The window closed without a will-close first; the handle is kept.
    NotClosing(PopupId),
    /// No tracked popup lives in that window (already released, or never ours).
    Unknown,
}

/// Tracks popups by window identity. Popups are independent of each other.
#[derive(Default)]
pub struct PopupLifecycleManager {
    popups: HashMap<WindowId, PopupHandle>,
    window_for_surface: HashMap<SurfaceId, WindowId>,
    creation_order: Vec<WindowId>,
}

impl PopupLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a popup surface and window, start loading the requested URL,
    /// and present the window. A window the manager already tracks is
    /// refused: the new surface is detached and dropped unloaded.
    pub fn open(
        &mut self,
        ids: &IdSource,
        factory: &dyn SurfaceFactory,
        request: &PopupRequest,
        default_size: (u32, u32),
        delegate: SurfaceDelegate,
    ) -> Result<PopupId, SurfaceError> {
        let width = request.width.unwrap_or(default_size.0);
        let height = request.height.unwrap_or(default_size.1);
        let parts = factory.create_popup(request, width, height, delegate)?;
        let window_id = parts.window.id();
        if self.popups.contains_key(&window_id) {
            parts.surface.detach_delegates();
            return Err(SurfaceError::WindowInUse(window_id));
        }

        let handle = PopupHandle {
            id: ids.next_popup_id(),
            opener: request.opener,
            surface_id: parts.surface.id(),
            window_id,
            phase: PopupPhase::Active,
            surface: parts.surface,
            window: parts.window,
        };
        if let Some(url) = &request.url {
            handle.surface.load(url);
        }
        handle.window.present();

        let id = handle.id;
        debug!(
            "Opened {id} in {} for opener {}",
            handle.window_id, handle.opener
        );
        self.window_for_surface
            .insert(handle.surface_id, handle.window_id);
        self.creation_order.push(handle.window_id);
        self.popups.insert(handle.window_id, handle);
        Ok(id)
    }

    /// Window-will-close: stop loads and detach delegates before anything
    /// else happens to the window. Returns the popup that entered closing.
    pub fn will_close(&mut self, window: WindowId) -> Option<PopupId> {
        let handle = self.popups.get_mut(&window)?;
        if handle.is_closing() {
            debug!("Duplicate will-close for {}", handle.id);
            return None;
        }
        handle.begin_closing();
        Some(handle.id)
    }

    /// Window-did-close: release the popup that lives in `window`, provided
    /// it already went through will-close.
    pub fn did_close(&mut self, window: WindowId) -> TeardownOutcome {
        match self.popups.get(&window) {
            None => TeardownOutcome::Unknown,
            Some(handle) if !handle.is_closing() => TeardownOutcome::NotClosing(handle.id),
            Some(_) => match self.release(window) {
                Some(id) => TeardownOutcome::Released(id),
                None => TeardownOutcome::Unknown,
            },
        }
    }

    fn release(&mut self, window: WindowId) -> Option<PopupId> {
        let handle = self.popups.remove(&window)?;
        self.window_for_surface.remove(&handle.surface_id);
        self.creation_order.retain(|id| *id != window);
        Some(handle.id)
    }

    /// Ask the window system to close a popup. Teardown follows from the
    /// close notifications.
    pub fn request_close(&self, popup: PopupId) -> bool {
        match self.popups.values().find(|handle| handle.id == popup) {
            Some(handle) if !handle.is_closing() => {
                handle.window.close();
                true
            }
            _ => false,
        }
    }

    /// The active popup whose surface is `surface`, if any.
    pub fn active_for_surface(&self, surface: SurfaceId) -> Option<&PopupHandle> {
        let window = self.window_for_surface.get(&surface)?;
        self.popups
            .get(window)
            .filter(|handle| !handle.is_closing())
    }

    pub fn get(&self, window: WindowId) -> Option<&PopupHandle> {
        self.popups.get(&window)
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }

    pub fn in_creation_order(&self) -> impl Iterator<Item = &PopupHandle> {
        self.creation_order
            .iter()
            .filter_map(move |window| self.popups.get(window))
    }
}

impl Drop for PopupLifecycleManager {
    fn drop(&mut self) {
        // The session is going away with popups still open: run the
        // will-close phase so nothing calls back into a dead controller.
        for handle in self.popups.values_mut() {
            if !handle.is_closing() {
                handle.begin_closing();
            }
            handle.window.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use embedshell_runtime::SurfaceDelegate;
    use rstest::rstest;
    use url::Url;

    use super::*;
    use crate::shell::desktop::host::headless::{HeadlessSurfaceFactory, SurfaceCall};

    fn noop_delegate() -> SurfaceDelegate {
        SurfaceDelegate::new(|_| {})
    }

    fn open_one(
        manager: &mut PopupLifecycleManager,
        factory: &HeadlessSurfaceFactory,
        ids: &IdSource,
    ) -> PopupId {
        let request = PopupRequest {
            opener: SurfaceId::from(100),
            url: Some(Url::parse("https://accounts.example/login").unwrap()),
            width: None,
            height: Some(700),
        };
        manager
            .open(ids, factory, &request, (480, 640), noop_delegate())
            .unwrap()
    }

    #[test]
    fn open_loads_requested_url_and_presents_window() {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        let mut manager = PopupLifecycleManager::new();

        open_one(&mut manager, &factory, &ids);

        let popup = factory.popup(0).unwrap();
        assert_eq!(
            popup.surface.calls(),
            vec![SurfaceCall::Load(Url::parse("https://accounts.example/login").unwrap())]
        );
        assert!(popup.window.is_presented());
        assert_eq!(popup.window.size(), (480, 700));
    }

    #[test]
    fn will_close_stops_then_detaches_before_release() {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        let mut manager = PopupLifecycleManager::new();
        let id = open_one(&mut manager, &factory, &ids);
        let popup = factory.popup(0).unwrap();

        assert_eq!(manager.will_close(popup.window.id()), Some(id));
        let calls = popup.surface.calls();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[SurfaceCall::StopLoading, SurfaceCall::DetachDelegates]
        );
        assert!(manager.get(popup.window.id()).unwrap().surface().is_none());
        assert!(!popup.surface.is_released());

        assert_eq!(manager.did_close(popup.window.id()), TeardownOutcome::Released(id));
        assert!(popup.surface.is_released());
        assert!(manager.is_empty());
    }

    #[test]
    fn did_close_without_will_close_is_rejected() {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        let mut manager = PopupLifecycleManager::new();
        let id = open_one(&mut manager, &factory, &ids);
        let window = factory.popup(0).unwrap().window.id();

        assert_eq!(manager.did_close(window), TeardownOutcome::NotClosing(id));
        assert_eq!(manager.len(), 1);
        assert!(manager.get(window).unwrap().surface().is_some());
    }

    #[rstest]
    #[case::after_release(true)]
    #[case::foreign_window(false)]
    fn stray_close_notifications_are_ignored(#[case] release_first: bool) {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        let mut manager = PopupLifecycleManager::new();
        open_one(&mut manager, &factory, &ids);
        let window = factory.popup(0).unwrap().window.id();

        let target = if release_first {
            manager.will_close(window);
            manager.did_close(window);
            window
        } else {
            WindowId::from(9_999)
        };

        assert_eq!(manager.will_close(target), None);
        assert_eq!(manager.did_close(target), TeardownOutcome::Unknown);
    }

    #[test]
    fn closing_one_popup_leaves_the_other_active() {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        let mut manager = PopupLifecycleManager::new();
        open_one(&mut manager, &factory, &ids);
        let second = open_one(&mut manager, &factory, &ids);
        let first_window = factory.popup(0).unwrap().window.id();
        let second_surface = factory.popup(1).unwrap().surface.id();

        manager.will_close(first_window);
        manager.did_close(first_window);

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active_for_surface(second_surface).map(|handle| handle.id()), Some(second));
    }

    #[test]
    fn reused_window_id_is_refused_and_leaves_the_live_popup_alone() {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        factory.set_fixed_window_id(Some(WindowId::from(777)));
        let mut manager = PopupLifecycleManager::new();
        let first = open_one(&mut manager, &factory, &ids);

        let request = PopupRequest {
            opener: SurfaceId::from(100),
            url: Some(Url::parse("https://other.example/").unwrap()),
            width: None,
            height: None,
        };
        let refused = manager.open(&ids, &factory, &request, (480, 640), noop_delegate());

        assert_eq!(refused, Err(SurfaceError::WindowInUse(WindowId::from(777))));
        let live = factory.popup(0).unwrap();
        let rejected = factory.popup(1).unwrap();
        assert!(!live.surface.is_released());
        assert!(!live.surface.calls().contains(&SurfaceCall::DetachDelegates));
        assert!(rejected.surface.is_released());
        assert!(!rejected.surface.calls().iter().any(|call| matches!(call, SurfaceCall::Load(_))));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.in_creation_order().count(), 1);
        assert_eq!(manager.active_for_surface(live.surface.id()).map(|handle| handle.id()), Some(first));
        assert!(manager.active_for_surface(rejected.surface.id()).is_none());
    }

    #[test]
    fn dropping_manager_runs_will_close_phase() {
        let ids = IdSource::new();
        let factory = HeadlessSurfaceFactory::new(ids.clone());
        let mut manager = PopupLifecycleManager::new();
        open_one(&mut manager, &factory, &ids);
        let popup = factory.popup(0).unwrap();

        drop(manager);

        assert!(popup.surface.calls().contains(&SurfaceCall::DetachDelegates));
        assert!(popup.window.close_requested());
        assert!(popup.surface.is_released());
    }
}
