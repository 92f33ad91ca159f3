/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use embedshell_core::IdSource;
use embedshell_runtime::{FileChooserPort, SurfaceFactory};

use crate::prefs::AppPreferences;
use crate::shell::desktop::runtime::diagnostics::DiagnosticsSink;

/// Process-wide surface state, built once at startup and handed to every
/// session.
///
/// The factory stands for the shared content store and process pool; every
/// session created from the same environment shares them.
#[derive(Clone)]
pub struct SurfaceEnvironment {
    ids: IdSource,
    preferences: Rc<AppPreferences>,
    surface_factory: Rc<dyn SurfaceFactory>,
    file_chooser: Rc<dyn FileChooserPort>,
    diagnostics: DiagnosticsSink,
}

impl SurfaceEnvironment {
    pub fn new(
        ids: IdSource,
        preferences: AppPreferences,
        surface_factory: Rc<dyn SurfaceFactory>,
        file_chooser: Rc<dyn FileChooserPort>,
        diagnostics: DiagnosticsSink,
    ) -> Self {
        Self {
            ids,
            preferences: Rc::new(preferences),
            surface_factory,
            file_chooser,
            diagnostics,
        }
    }

    pub fn ids(&self) -> &IdSource {
        &self.ids
    }

    pub fn preferences(&self) -> &AppPreferences {
        &self.preferences
    }

    pub fn surface_factory(&self) -> &dyn SurfaceFactory {
        self.surface_factory.as_ref()
    }

    pub fn file_chooser(&self) -> &dyn FileChooserPort {
        self.file_chooser.as_ref()
    }

    pub fn diagnostics(&self) -> &DiagnosticsSink {
        &self.diagnostics
    }
}
