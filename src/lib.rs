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

//! Convert application log events into [GELF] messages & ship them to one or more
//! network-attached collectors (such as a [Graylog] server).
//!
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//! [Graylog]: https://graylog.org/
//!
//! # Introduction
//!
//! GELF (the Graylog Extended Log Format) is a JSON-based structured log schema: a handful of
//! required keys (`version`, `host`, `short_message`, `timestamp`, `level`) plus arbitrary
//! underscore-prefixed additional fields. This crate is the egress side of that story. The
//! journey from a log call to a collector happens in three steps:
//!
//! 1. normalizing the caller's severity label & building a [`GelfMessage`]
//!
//! 2. enriching the message from the call-site [`Context`] through an ordered chain of
//!    [`Processor`]s (exception origins, HTTP request data, whatever the host registers)
//!
//! 3. fanning the finished message out to every configured [`Transport`]
//!
//! [`GelfMessage`]: crate::message::GelfMessage
//! [`Context`]: crate::context::Context
//! [`Processor`]: crate::processor::Processor
//! [`Transport`]: crate::transport::Transport
//!
//! The [`Publisher`] drives all three. Enrichment runs strictly before transport I/O, and
//! enrichment failures abort the call -- a half-built message is never shipped. Fan-out, on the
//! other hand, isolates failures per transport: one broken destination neither crashes the caller
//! nor starves the healthy destinations, and the aggregate error names exactly which sinks
//! failed.
//!
//! [`Publisher`]: crate::publisher::Publisher
//!
//! # Usage
//!
//! Construct a [`Publisher`], give it transports (explicitly, or as configuration descriptors
//! resolved on first use), and log:
//!
//! ```rust
//! use gelf_publisher::context::Context;
//! use gelf_publisher::publisher::Publisher;
//! use gelf_publisher::transport::NoopTransport;
//!
//! let publisher = Publisher::new();
//! publisher.add_transport(Box::new(NoopTransport));
//! publisher.log("error", "order import failed", &Context::Plain).unwrap();
//! ```
//!
//! Or from configuration, with the standard processors registered:
//!
//! ```no_run
//! use gelf_publisher::config::{PublisherConfig, TransportConfig};
//! use gelf_publisher::context::{CapturedError, Context};
//! use gelf_publisher::publisher::Publisher;
//!
//! let publisher = Publisher::from_config(PublisherConfig {
//!     transports: vec![TransportConfig::udp("graylog.example.com", 12201)],
//!     ..PublisherConfig::default()
//! });
//!
//! // the error's captured origin becomes _file/_line, its trace the full_message
//! let err = CapturedError::new("order import failed");
//! publisher.log_error(&err).unwrap();
//! ```
//!
//! Hosts logging through the [`tracing`] facade can instead stack the crate's
//! [`GelfLayer`] into their subscriber:
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`GelfLayer`]: crate::layer::GelfLayer
//!
//! ```no_run
//! use gelf_publisher::config::{PublisherConfig, TransportConfig};
//! use gelf_publisher::layer::GelfLayer;
//! use gelf_publisher::publisher::Publisher;
//! use std::sync::Arc;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! let publisher = Arc::new(Publisher::from_config(PublisherConfig {
//!     transports: vec![TransportConfig::tcp("graylog.example.com", 12201)],
//!     ..PublisherConfig::default()
//! }));
//! let subscriber = Registry::default().with(GelfLayer::new(publisher));
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! tracing::info!(order_id = 42, "order imported");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod layer;
pub mod level;
pub mod message;
pub mod processor;
pub mod publisher;
pub mod transport;
