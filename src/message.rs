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

//! The GELF message entity.
//!
//! [`GelfMessage`] represents one log event in [GELF] shape. On the wire it is a JSON object with
//! required keys `version`, `host`, `short_message`, `timestamp` & `level`; the optional
//! `full_message`; and an underscore-prefixed key for every additional field. Additional field
//! names are prefixed on insertion, so they can never collide with the reserved top-level keys,
//! and `_id` is refused outright (the GELF spec forbids client libraries from setting it).
//!
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! A message is constructed fresh per log call (or supplied pre-built by the caller), mutated only
//! by enrichment processors, and read-only once it reaches the transports -- all transports share
//! the one instance.

use crate::error::{Error, Result};
use crate::level::Level;

use chrono::prelude::*;
use serde::{Serialize, Serializer};

use std::collections::BTreeMap;

/// The GELF spec version stamped into every message.
pub const GELF_VERSION: &str = "1.1";

fn level_as_u8<S: Serializer>(level: &Level, ser: S) -> std::result::Result<S::Ok, S::Error> {
    ser.serialize_u8(*level as u8)
}

/// One log event in GELF shape.
#[derive(Clone, Debug, Serialize)]
pub struct GelfMessage {
    version: &'static str,
    host: String,
    short_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_message: Option<String>,
    /// Seconds since the epoch, with fractional part
    timestamp: f64,
    #[serde(serialize_with = "level_as_u8")]
    level: Level,
    #[serde(rename = "_facility", skip_serializing_if = "Option::is_none")]
    facility: Option<String>,
    #[serde(rename = "_file", skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(rename = "_line", skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    /// Additional fields, keyed by their wire name (underscore-prefixed)
    #[serde(flatten)]
    additional: BTreeMap<String, serde_json::Value>,
}

impl GelfMessage {
    /// Construct a wire-complete message: `host` is discovered, `timestamp` is now, `level`
    /// defaults to [`Level::Informational`].
    pub fn new(short_message: impl Into<String>) -> GelfMessage {
        GelfMessage {
            version: GELF_VERSION,
            host: default_host(),
            short_message: short_message.into(),
            full_message: None,
            timestamp: now_timestamp(),
            level: Level::default(),
            facility: None,
            file: None,
            line: None,
            additional: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    pub fn short_message(&self) -> &str {
        &self.short_message
    }

    pub fn set_short_message(&mut self, short_message: impl Into<String>) {
        self.short_message = short_message.into();
    }

    pub fn full_message(&self) -> Option<&str> {
        self.full_message.as_deref()
    }

    pub fn set_full_message(&mut self, full_message: impl Into<String>) {
        self.full_message = Some(full_message.into());
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = timestamp;
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    pub fn facility(&self) -> Option<&str> {
        self.facility.as_deref()
    }

    pub fn set_facility(&mut self, facility: impl Into<String>) {
        self.facility = Some(facility.into());
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn set_file(&mut self, file: impl Into<String>) {
        self.file = Some(file.into());
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn set_line(&mut self, line: u32) {
        self.line = Some(line);
    }

    /// Look up an additional field; the key may be given with or without its underscore prefix.
    pub fn additional(&self, key: &str) -> Option<&serde_json::Value> {
        self.additional.get(&wire_key(key))
    }

    /// Set an additional field, prefixing the key with `_` if the caller didn't.
    ///
    /// Later insertions win, which is what gives processor-set fields precedence over caller-set
    /// fields of the same name. A key of `id` is refused: Graylog reserves `_id` and client
    /// libraries must not send it.
    pub fn set_additional(&mut self, key: &str, value: serde_json::Value) {
        let key = wire_key(key);
        if key == "_id" {
            tracing::warn!("refusing to set the reserved GELF field '_id'");
            return;
        }
        self.additional.insert(key, value);
    }

    /// Iterate over the additional fields by wire name.
    pub fn additional_fields(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.additional.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encode this message as GELF JSON. Framing (null delimiters, chunk headers) is each
    /// transport's concern.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| Error::Serialization {
            source: err,
            back: backtrace::Backtrace::new(),
        })
    }

    /// Encode this message as a GELF JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Error::Serialization {
            source: err,
            back: backtrace::Backtrace::new(),
        })
    }
}

fn wire_key(key: &str) -> String {
    if key.starts_with('_') {
        key.to_string()
    } else {
        format!("_{}", key)
    }
}

/// Seconds since the epoch with microsecond resolution, GELF's `timestamp` shape.
pub fn now_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
}

/// Figure out an origin-host identifier for the `host` field.
///
/// Tries `gethostname()` first, then falls back to a local IP address, then to a fixed label, so
/// it cannot fail.
pub fn default_host() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            local_ip_address::local_ip()
                .ok()
                .map(|ip| ip.to_string())
        })
        .unwrap_or_else(|| String::from("localhost"))
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_wire_format() {
        let mut message = GelfMessage::new("orders down");
        message.set_host("bree.local");
        message.set_level(Level::Critical);
        message.set_timestamp(1733590800.123456);
        message.set_full_message("orders down\nat worker 3");
        message.set_file("src/orders.rs");
        message.set_line(42);
        message.set_additional("request_id", serde_json::json!("req-123"));
        message.set_additional("_retries", serde_json::json!(2));

        let value: serde_json::Value =
            serde_json::from_slice(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], "1.1");
        assert_eq!(value["host"], "bree.local");
        assert_eq!(value["short_message"], "orders down");
        assert_eq!(value["full_message"], "orders down\nat worker 3");
        assert_eq!(value["level"], 2);
        assert!((value["timestamp"].as_f64().unwrap() - 1733590800.123456).abs() < 1e-6);
        assert_eq!(value["_file"], "src/orders.rs");
        assert_eq!(value["_line"], 42);
        assert_eq!(value["_request_id"], "req-123");
        assert_eq!(value["_retries"], 2);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let message = GelfMessage::new("hello");
        let value: serde_json::Value =
            serde_json::from_slice(&message.to_json().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("full_message"));
        assert!(!object.contains_key("_file"));
        assert!(!object.contains_key("_line"));
        assert!(!object.contains_key("_facility"));
        assert_eq!(value["level"], 6);
        assert!(!message.host().is_empty());
    }

    #[test]
    fn test_additional_field_prefixing() {
        let mut message = GelfMessage::new("hello");
        message.set_additional("environment", serde_json::json!("production"));
        message.set_additional("_datacenter", serde_json::json!("us-east-1"));

        assert_eq!(message.additional("environment").unwrap(), "production");
        assert_eq!(message.additional("_environment").unwrap(), "production");
        assert_eq!(message.additional("datacenter").unwrap(), "us-east-1");

        let value: serde_json::Value =
            serde_json::from_slice(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["_environment"], "production");
        assert_eq!(value["_datacenter"], "us-east-1");
        assert!(!value.as_object().unwrap().contains_key("environment"));
    }

    #[test]
    fn test_id_field_refused() {
        let mut message = GelfMessage::new("hello");
        message.set_additional("id", serde_json::json!("nope"));
        message.set_additional("_id", serde_json::json!("nope"));
        assert!(message.additional("id").is_none());
    }

    #[test]
    fn test_later_insertion_wins() {
        // The precedence contract: processors run after message construction, so a
        // processor-set field overwrites a caller-set field of the same name.
        let mut message = GelfMessage::new("hello");
        message.set_additional("request_url", serde_json::json!("caller"));
        message.set_additional("request_url", serde_json::json!("processor"));
        assert_eq!(message.additional("request_url").unwrap(), "processor");
    }

    #[test]
    fn test_timestamp_is_fractional_seconds() {
        let before = now_timestamp();
        let message = GelfMessage::new("hello");
        let after = now_timestamp();
        assert!(message.timestamp() >= before);
        assert!(message.timestamp() <= after);
        // sanity: seconds since the epoch, not millis
        assert!(message.timestamp() < 1e11);
    }
}
