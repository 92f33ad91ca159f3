/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Preferences and command line parsing.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bpaf::{Args, Bpaf, ParseFailure};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Environment variable consulted for a log filter when none is given on the
/// command line.
pub const LOG_FILTER_ENV: &str = "EMBEDSHELL_LOG";

/// embedshell specific preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppPreferences {
    /// How long an empty selection must persist before the host treats it as
    /// final. Zero clears immediately.
    pub selection_settle_ms: u64,
    pub selection_channel: String,
    pub diagnostic_channel: String,
    pub popup_width: u32,
    pub popup_height: u32,
    pub homepage: String,
    pub log_filter: Option<String>,
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            selection_settle_ms: 100,
            selection_channel: "selection".to_owned(),
            diagnostic_channel: "diagnostics".to_owned(),
            popup_width: 480,
            popup_height: 640,
            homepage: "about:blank".to_owned(),
            log_filter: None,
        }
    }
}

impl AppPreferences {
    pub fn selection_settle(&self) -> Duration {
        Duration::from_millis(self.selection_settle_ms)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, PrefsError> {
        toml::from_str(source).map_err(PrefsError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, PrefsError> {
        let source = fs::read_to_string(path).map_err(|error| PrefsError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load preferences from `explicit`, else the default config location if
    /// a file exists there, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, PrefsError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_prefs_path() {
            Some(path) if path.is_file() => {
                info!("Loading preferences from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("embedshell"))
}

fn default_prefs_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("prefs.toml"))
}

#[derive(Debug)]
pub enum PrefsError {
    Read { path: PathBuf, error: std::io::Error },
    Parse(toml::de::Error),
}

impl fmt::Display for PrefsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, error } => {
                write!(f, "could not read preferences from {}: {error}", path.display())
            }
            Self::Parse(error) => write!(f, "invalid preferences: {error}"),
        }
    }
}

impl std::error::Error for PrefsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { error, .. } => Some(error),
            Self::Parse(error) => Some(error),
        }
    }
}

/// Replay a recorded trace of host events against a headless session.
#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version)]
pub struct CommandLine {
    /// Preferences file (TOML).
    #[bpaf(argument("PATH"))]
    pub prefs: Option<PathBuf>,
    /// Log filter, for example `debug` or `embedshell=trace`.
    #[bpaf(argument("FILTER"))]
    pub log_filter: Option<String>,
    /// JSON trace of host events to replay.
    #[bpaf(argument("TRACE"))]
    pub replay: PathBuf,
}

pub enum ArgumentParsingResult {
    Run(CommandLine, AppPreferences),
    Exit,
    ErrorParsing,
}

pub fn parse_command_line_arguments(args: &[String]) -> ArgumentParsingResult {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command_line = match command_line().run_inner(Args::from(args.as_slice())) {
        Ok(command_line) => command_line,
        Err(failure) => {
            failure.print_mesage(100);
            return match failure {
                ParseFailure::Stdout(..) | ParseFailure::Completion(..) => {
                    ArgumentParsingResult::Exit
                }
                ParseFailure::Stderr(..) => ArgumentParsingResult::ErrorParsing,
            };
        }
    };

    match AppPreferences::resolve(command_line.prefs.as_deref()) {
        Ok(mut preferences) => {
            if command_line.log_filter.is_some() {
                preferences.log_filter = command_line.log_filter.clone();
            }
            ArgumentParsingResult::Run(command_line, preferences)
        }
        Err(error) => {
            warn!("{error}");
            eprintln!("{error}");
            ArgumentParsingResult::ErrorParsing
        }
    }
}
