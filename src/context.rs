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

//! Call-site context handed to enrichment processors.
//!
//! [`Context`] is a tagged variant rather than an open bag of values: the set of enrichable
//! contexts is small, and a processor matches on the variant it recognizes instead of probing an
//! untyped map. A processor that doesn't recognize the variant leaves the message alone.

use crate::level::Level;

use backtrace::Backtrace;

use std::collections::BTreeMap;

/// What the caller knew at the log site, beyond level & message text.
#[derive(Default)]
pub enum Context<'a> {
    /// Nothing to enrich from
    #[default]
    Plain,
    /// The event describes an error whose origin was captured
    WithError(&'a CapturedError),
    /// The event occurred while serving the given request
    WithRequest(&'a dyn RequestSnapshot),
}

/// An error together with its captured origin.
///
/// Rust errors carry no source location or stack trace of their own, so both are captured here,
/// at the point the error is wrapped: `file` & `line` via `#[track_caller]`, the trace via
/// [`backtrace::Backtrace`].
pub struct CapturedError {
    message: String,
    file: String,
    line: u32,
    trace: String,
    level: Level,
}

impl CapturedError {
    /// Capture an error described only by its message text. `file`/`line` are the caller's.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> CapturedError {
        let location = std::panic::Location::caller();
        CapturedError {
            message: message.into(),
            file: location.file().to_string(),
            line: location.line(),
            trace: format!("{:?}", Backtrace::new()),
            level: Level::Error,
        }
    }

    /// Capture a [`std::error::Error`], rendering its source chain into the trace text.
    #[track_caller]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> CapturedError {
        let mut rendered = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            rendered.push_str("\ncaused by: ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        let mut captured = CapturedError::new(err.to_string());
        captured.trace = format!("{}\n{:?}", rendered, Backtrace::new());
        captured
    }

    pub fn with_level(mut self, level: Level) -> CapturedError {
        self.level = level;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl std::fmt::Display for CapturedError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({}:{})", self.message, self.file, self.line)
    }
}

impl std::fmt::Debug for CapturedError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}\n{}", self, self.trace)
    }
}

/// Read-only view of the host's HTTP request, as much of it as request enrichment needs.
///
/// The host application adapts whatever request type its framework uses; parameter maps are
/// returned owned so the adapter is free in how it stores them.
pub trait RequestSnapshot {
    /// HTTP method, e.g. `GET`
    fn method(&self) -> &str;
    /// Full request URL
    fn url(&self) -> &str;
    /// Client IP address, as text
    fn client_ip(&self) -> &str;
    /// Query-string parameters
    fn query_params(&self) -> BTreeMap<String, serde_json::Value>;
    /// Body (form/POST) parameters
    fn body_params(&self) -> BTreeMap<String, serde_json::Value>;
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_captured_origin() {
        let expected_line = line!() + 1;
        let err = CapturedError::new("boom");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.file(), file!());
        assert_eq!(err.line(), expected_line);
        assert_eq!(err.level(), Level::Error);
        assert!(!err.trace().is_empty());
    }

    #[test]
    fn test_from_error_renders_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let expected_line = line!() + 1;
        let err = CapturedError::from_error(&io).with_level(Level::Critical);
        assert_eq!(err.message(), "connection refused");
        assert_eq!(err.line(), expected_line);
        assert_eq!(err.level(), Level::Critical);
        assert!(err.trace().starts_with("connection refused"));
    }
}
