/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::{env, process};

use log::{error, info};

use crate::prefs::{
    AppPreferences, ArgumentParsingResult, CommandLine, LOG_FILTER_ENV,
    parse_command_line_arguments,
};
use crate::shell::desktop::runtime::replay::{ReplayError, read_trace, run_replay};

/// The log filter, by precedence: command line, environment, preferences.
fn log_filter(command_line: &CommandLine, preferences: &AppPreferences) -> Option<String> {
    command_line
        .log_filter
        .clone()
        .or_else(|| env::var(LOG_FILTER_ENV).ok())
        .or_else(|| preferences.log_filter.clone())
}

fn run(command_line: &CommandLine, preferences: AppPreferences) -> Result<String, ReplayError> {
    let trace = read_trace(&command_line.replay)?;
    info!(
        "Replaying {} entries from {}",
        trace.len(),
        command_line.replay.display()
    );
    let report = run_replay(preferences, trace)?;
    serde_json::to_string_pretty(&report).map_err(ReplayError::Encode)
}

pub fn main() {
    // Skip the first argument, which is the binary name.
    let args: Vec<String> = env::args().skip(1).collect();
    let (command_line, preferences) = match parse_command_line_arguments(&args) {
        ArgumentParsingResult::Run(command_line, preferences) => (command_line, preferences),
        ArgumentParsingResult::Exit => {
            process::exit(0);
        },
        ArgumentParsingResult::ErrorParsing => {
            process::exit(1);
        },
    };

    crate::init_tracing(log_filter(&command_line, &preferences).as_deref());

    match run(&command_line, preferences) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            error!("{e}");
            eprintln!("embedshell: {e}");
            process::exit(2);
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    fn command_line(log_filter: Option<&str>, replay: PathBuf) -> CommandLine {
        CommandLine {
            prefs: None,
            log_filter: log_filter.map(str::to_owned),
            replay,
        }
    }

    #[test]
    fn command_line_filter_beats_preferences() {
        let preferences = AppPreferences {
            log_filter: Some("warn".to_owned()),
            ..AppPreferences::default()
        };
        let filter = log_filter(&command_line(Some("trace"), PathBuf::new()), &preferences);
        assert_eq!(filter.as_deref(), Some("trace"));
    }

    #[test]
    fn run_prints_report_json() {
        let mut trace = tempfile::NamedTempFile::new().unwrap();
        write!(
            trace,
            r#"[{{"event": {{"type": "navigation", "outcome": {{"kind": "started"}}}}}}]"#
        )
        .unwrap();

        let output = run(
            &command_line(None, trace.path().to_owned()),
            AppPreferences::default(),
        )
        .unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(report["session"]["loading_state"]["state"], "loading");
        assert_eq!(report["session"]["current_url"], "about:blank");
        assert_eq!(report["updates"][0]["kind"], "url_changed");
        assert_eq!(report["updates"][1]["kind"], "loading_changed");
    }

    #[test]
    fn missing_trace_is_a_read_error() {
        let result = run(
            &command_line(None, PathBuf::from("/nonexistent/trace.json")),
            AppPreferences::default(),
        );
        assert!(matches!(result, Err(ReplayError::Read { .. })));
    }
}
