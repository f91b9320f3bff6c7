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

//! Publisher configuration.
//!
//! These types are the crate's configuration surface: plain serde-deserializable structs the host
//! binds from whatever source it likes (a config file, the environment, hard-coded test values).
//! A [`TransportConfig`] is untrusted input -- its `type` discriminator is validated once, when
//! the publisher resolves its transports, not at deserialization time.

use serde::Deserialize;

/// The default GELF input port on a Graylog server.
pub const DEFAULT_GELF_PORT: u16 = 12201;

/// Everything a [`Publisher`](crate::publisher::Publisher) is built from.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Origin-host identifier stamped into every message; discovered when absent
    pub host: Option<String>,
    /// One descriptor per destination
    pub transports: Vec<TransportConfig>,
    /// Request-enrichment options
    pub request: RequestLogging,
}

/// Describes one transport: a `type` discriminator plus type-specific connection parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport kind: `tcp`, `udp`, `http` or `noop`
    #[serde(rename = "type")]
    pub kind: String,
    /// Collector host
    pub host: String,
    /// Collector port
    pub port: u16,
    /// URL scheme for the `http` kind (`http` or `https`)
    pub scheme: Option<String>,
    /// URL path for the `http` kind
    pub path: Option<String>,
}

impl std::default::Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            kind: String::from("udp"),
            host: String::from("localhost"),
            port: DEFAULT_GELF_PORT,
            scheme: None,
            path: None,
        }
    }
}

impl TransportConfig {
    pub fn tcp(host: impl Into<String>, port: u16) -> TransportConfig {
        TransportConfig {
            kind: String::from("tcp"),
            host: host.into(),
            port,
            ..TransportConfig::default()
        }
    }

    pub fn udp(host: impl Into<String>, port: u16) -> TransportConfig {
        TransportConfig {
            kind: String::from("udp"),
            host: host.into(),
            port,
            ..TransportConfig::default()
        }
    }

    pub fn http(host: impl Into<String>, port: u16) -> TransportConfig {
        TransportConfig {
            kind: String::from("http"),
            host: host.into(),
            port,
            ..TransportConfig::default()
        }
    }

    pub fn noop() -> TransportConfig {
        TransportConfig {
            kind: String::from("noop"),
            ..TransportConfig::default()
        }
    }

    /// The endpoint URL for the `http` kind: scheme defaults to `http`, path to `/gelf`.
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme.as_deref().unwrap_or("http"),
            self.host,
            self.port,
            self.path.as_deref().unwrap_or("/gelf")
        )
    }
}

/// Options gating what request enrichment may record.
///
/// Both capture flags default to off; query & body parameters frequently carry data that doesn't
/// belong in a log pipeline. Parameters named in `redacted_parameters` are removed before
/// serialization either way.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RequestLogging {
    /// Capture query parameters into `request_get_data`
    pub log_request_get_data: bool,
    /// Capture body parameters into `request_post_data`
    pub log_request_post_data: bool,
    /// Parameter names stripped before capture
    pub redacted_parameters: Vec<String>,
}

impl std::default::Default for RequestLogging {
    fn default() -> Self {
        RequestLogging {
            log_request_get_data: false,
            log_request_post_data: false,
            redacted_parameters: vec![String::from("username")],
        }
    }
}
