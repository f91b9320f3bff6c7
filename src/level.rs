// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-publisher.
//
// gelf-publisher is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// gelf-publisher is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with gelf-publisher.  If
// not, see <http://www.gnu.org/licenses/>.

//! GELF severity levels.
//!
//! GELF took its `level` field from syslog, so [`Level`] replicates the eight severities defined
//! in RFCs [5424] & [3164] (and `<syslog.h>`), numerically identical to the constants documented
//! in the `syslog()` manual [page].
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424
//! [3164]: https://datatracker.ietf.org/doc/html/rfc3164
//! [page]: https://man7.org/linux/man-pages/man3/syslog.3.html

use crate::error::{Error, Result};

use backtrace::Backtrace;

type StdResult<T, E> = std::result::Result<T, E>;

/// The eight syslog severities carried in a GELF message's `level` field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// system is unusable
    Emergency = 0,
    /// action must be taken immediately
    Alert = 1,
    /// critical conditions
    Critical = 2,
    /// error conditions
    Error = 3,
    /// warning conditions
    Warning = 4,
    /// normal, but significant condition
    Notice = 5,
    /// informational message
    Informational = 6,
    /// debug-level message
    Debug = 7,
}

impl Level {
    /// Normalize a caller-supplied severity label.
    ///
    /// Accepts the standard syslog level names, case-insensitively, as well as integer strings
    /// already in `[0, 7]`. Anything else is an [`Error::InvalidLevel`] -- an unrecognized level
    /// is a hard error, never a silent default.
    pub fn from_label(label: &str) -> Result<Level> {
        let trimmed = label.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return u8::try_from(n)
                .ok()
                .and_then(|n| Level::try_from(n).ok())
                .ok_or_else(|| Error::InvalidLevel {
                    label: label.to_string(),
                    back: Backtrace::new(),
                });
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "emergency" => Ok(Level::Emergency),
            "alert" => Ok(Level::Alert),
            "critical" => Ok(Level::Critical),
            "error" => Ok(Level::Error),
            "warning" => Ok(Level::Warning),
            "notice" => Ok(Level::Notice),
            "info" => Ok(Level::Informational),
            "debug" => Ok(Level::Debug),
            _ => Err(Error::InvalidLevel {
                label: label.to_string(),
                back: Backtrace::new(),
            }),
        }
    }

    /// The canonical lowercase label for this severity (the form [`from_label`] documents).
    ///
    /// [`from_label`]: Level::from_label
    pub fn label(&self) -> &'static str {
        match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Informational => "info",
            Level::Debug => "debug",
        }
    }
}

impl std::default::Default for Level {
    /// The default severity is `Informational`.
    fn default() -> Self {
        Level::Informational
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.label())
    }
}

impl std::convert::From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level as u8
    }
}

impl std::convert::TryFrom<u8> for Level {
    type Error = Error;
    fn try_from(n: u8) -> StdResult<Self, <Self as std::convert::TryFrom<u8>>::Error> {
        match n {
            0 => Ok(Level::Emergency),
            1 => Ok(Level::Alert),
            2 => Ok(Level::Critical),
            3 => Ok(Level::Error),
            4 => Ok(Level::Warning),
            5 => Ok(Level::Notice),
            6 => Ok(Level::Informational),
            7 => Ok(Level::Debug),
            _ => Err(Error::InvalidLevel {
                label: n.to_string(),
                back: Backtrace::new(),
            }),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> StdResult<Self, Self::Err> {
        Level::from_label(s)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_known_names() {
        for (label, level) in [
            ("emergency", Level::Emergency),
            ("alert", Level::Alert),
            ("critical", Level::Critical),
            ("error", Level::Error),
            ("warning", Level::Warning),
            ("notice", Level::Notice),
            ("info", Level::Informational),
            ("debug", Level::Debug),
        ] {
            assert_eq!(Level::from_label(label).unwrap(), level);
            assert_eq!(Level::from_label(&label.to_uppercase()).unwrap(), level);
            assert_eq!(u8::from(level), level as u8);
        }
        // mixed case & surrounding whitespace
        assert_eq!(Level::from_label("Emergency").unwrap(), Level::Emergency);
        assert_eq!(Level::from_label(" error ").unwrap(), Level::Error);
    }

    #[test]
    fn test_numeric_labels() {
        assert_eq!(Level::from_label("0").unwrap(), Level::Emergency);
        assert_eq!(Level::from_label("3").unwrap(), Level::Error);
        assert_eq!(Level::from_label("7").unwrap(), Level::Debug);
    }

    #[test]
    fn test_unrecognized_labels() {
        for label in ["fatal", "emerg", "warn", "8", "-1", "", "3.0", "trace"] {
            assert!(
                matches!(Level::from_label(label), Err(Error::InvalidLevel { .. })),
                "'{}' should not normalize",
                label
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Level::Informational), "info");
        assert_eq!(Level::from_label(&format!("{}", Level::Warning)).unwrap(), Level::Warning);
    }
}
