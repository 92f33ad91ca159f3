/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Portable kernel shared by every embedshell host.
//!
//! Nothing in here knows about a concrete web engine or window system: these
//! are the identities, navigation outcomes, selection values, and upload
//! kinds that the session controller and its ports exchange.

pub mod file_kind;
pub mod ids;
pub mod navigation;
pub mod selection;
pub mod session;

pub use file_kind::FileKind;
pub use ids::{IdSource, PopupId, SurfaceId, WindowId};
pub use navigation::{LoadingState, NavigationError, NavigationOutcome, NavigationPhase};
pub use selection::SelectionEvent;
pub use session::Session;
