//! `-v` / `GATEHOUSE_LOG_LEVEL`: how chatty the service is.
//!
//! The flag counts (`-vvv`); the environment variable takes either that count
//! or a level name. Both end up as the same `u8` in the matches.

use clap::{Arg, ArgAction, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names, indexed by verbosity count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

const MAX_VERBOSITY: u8 = 5;

/// Turn `GATEHOUSE_LOG_LEVEL` into a verbosity count.
fn parse_log_level(value: &str) -> Result<u8, String> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u8>() {
        return if count <= MAX_VERBOSITY {
            Ok(count)
        } else {
            Err(format!("verbosity must be 0-{MAX_VERBOSITY}, got {count}"))
        };
    }

    LEVEL_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level {value:?}, expected one of {LEVEL_NAMES:?}"))
}

/// Tracing level for a verbosity count. `None` keeps the default filter
/// (errors only).
#[must_use]
pub const fn level_for(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("GATEHOUSE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::from(parse_log_level)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_counts_agree() {
        for (count, name) in LEVEL_NAMES.iter().enumerate() {
            assert_eq!(parse_log_level(name).ok(), u8::try_from(count).ok());
        }
        assert_eq!(parse_log_level("DEBUG"), Ok(3));
        assert_eq!(parse_log_level(" info "), Ok(2));
        assert_eq!(parse_log_level("5"), Ok(5));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(parse_log_level("6").is_err());
        assert!(parse_log_level("verbose").is_err());
        assert!(parse_log_level("").is_err());
    }

    #[test]
    fn count_maps_to_level() {
        assert_eq!(level_for(0), None);
        assert_eq!(level_for(1), Some(Level::WARN));
        assert_eq!(level_for(2), Some(Level::INFO));
        assert_eq!(level_for(3), Some(Level::DEBUG));
        assert_eq!(level_for(9), Some(Level::TRACE));
    }
}
