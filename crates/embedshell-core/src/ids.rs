/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! host_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

host_id!(SurfaceId, "surface");
host_id!(WindowId, "window");
host_id!(PopupId, "popup");

/// Process-wide identity source.
///
/// One counter backs all three id kinds so ids stay unique across kinds in
/// logs, and so two hosts built from the same environment never collide.
#[derive(Clone, Debug, Default)]
pub struct IdSource {
    next: Arc<AtomicU64>,
}

impl IdSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn next_surface_id(&self) -> SurfaceId {
        SurfaceId(self.bump())
    }

    pub fn next_window_id(&self) -> WindowId {
        WindowId(self.bump())
    }

    pub fn next_popup_id(&self) -> PopupId {
        PopupId(self.bump())
    }
}
