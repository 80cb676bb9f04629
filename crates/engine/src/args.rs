//! Command-line argument parsing for Arclight Engine
//
// This module handles parsing of the engine's few command-line switches.

use std::path::PathBuf;

/// Result of parsing command-line arguments.
#[derive(Clone, Default)]
pub struct ParsedArgs {
    pub verbose: bool,
    /// Subsystem configuration file overriding the app-data default
    pub config_path: Option<PathBuf>,
    /// Stop the main loop after this many engine cycles (0 = run forever)
    pub frame_limit: Option<u64>,
}

/// Parse command-line arguments.
pub fn parse_args() -> ParsedArgs {
    parse_from(std::env::args().skip(1))
}

fn parse_from(args: impl Iterator<Item = String>) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" | "--verbose" => parsed.verbose = true,
            "--config" => parsed.config_path = args.next().map(PathBuf::from),
            "--frames" => parsed.frame_limit = args.next().and_then(|v| v.parse().ok()),
            other => tracing::warn!("Ignoring unrecognized argument '{}'", other),
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedArgs {
        parse_from(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn parses_all_switches() {
        let parsed = parse(&["--verbose", "--config", "custom.toml", "--frames", "60"]);
        assert!(parsed.verbose);
        assert_eq!(parsed.config_path, Some(PathBuf::from("custom.toml")));
        assert_eq!(parsed.frame_limit, Some(60));
    }

    #[test]
    fn defaults_when_no_arguments() {
        let parsed = parse(&[]);
        assert!(!parsed.verbose);
        assert_eq!(parsed.config_path, None);
        assert_eq!(parsed.frame_limit, None);
    }

    #[test]
    fn malformed_frame_count_is_ignored() {
        let parsed = parse(&["--frames", "soon"]);
        assert_eq!(parsed.frame_limit, None);
    }
}
