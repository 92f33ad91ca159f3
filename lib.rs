/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Session controller for a script-capable content surface embedded in a
//! native window.

pub mod prefs;
pub mod shell;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use shell::desktop::host::session_controller::{
    SessionController, SessionSnapshot, SessionUpdate, SessionUpdateKind,
};

pub const VERSION: &str = concat!("embedshell ", env!("CARGO_PKG_VERSION"));

pub fn main() {
    shell::desktop::runtime::cli::main()
}

/// Install the fmt subscriber. `log` records are forwarded to it.
pub fn init_tracing(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(filter.unwrap_or("info")).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter: {e}");
        EnvFilter::new("info")
    });
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}
