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

//! [gelf-publisher](crate)'s [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! Hosts that log through the [`tracing`] facade rather than calling the
//! [`Publisher`] directly can stack a [`GelfLayer`] into their subscriber: each [`Event`]'s
//! `message` field becomes the `short_message`, every other event field becomes an additional
//! field, the callsite's file & line ride along as `_file`/`_line`, and the finished message goes
//! through the publisher's usual enrichment & fan-out.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html

use crate::level::Level;
use crate::message::GelfMessage;
use crate::publisher::Publisher;

use tracing::Event;
use tracing_core::field::{Field, Visit};
use tracing_subscriber::layer::Context;

use std::cell::Cell;
use std::sync::Arc;

thread_local! {
    // The publisher itself emits tracing events (e.g. a warning per failing transport). Without
    // this guard those events would re-enter the layer and, on a persistently failing sink,
    // recurse without bound.
    static PUBLISHING: Cell<bool> = Cell::new(false);
}

fn default_level_mapping(level: &tracing::Level) -> Level {
    match level {
        &tracing::Level::TRACE | &tracing::Level::DEBUG => Level::Debug,
        &tracing::Level::INFO => Level::Informational,
        &tracing::Level::WARN => Level::Warning,
        &tracing::Level::ERROR => Level::Error,
    }
}

/// A [`tracing-subscriber`]-compliant [`Layer`] that publishes [`Event`]s as GELF messages.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct GelfLayer {
    publisher: Arc<Publisher>,
}

impl GelfLayer {
    pub fn new(publisher: Arc<Publisher>) -> GelfLayer {
        GelfLayer { publisher }
    }
}

/// Pulls the `message` field out of an [`Event`] and collects every other field as a GELF
/// additional field.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
#[derive(Default)]
struct GelfEventVisitor {
    message: Option<String>,
    fields: Vec<(String, serde_json::Value)>,
}

impl Visit for GelfEventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields
            .push((field.name().to_string(), serde_json::Value::from(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .push((field.name().to_string(), serde_json::Value::from(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .push((field.name().to_string(), serde_json::Value::from(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .push((field.name().to_string(), serde_json::Value::from(value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .push((field.name().to_string(), serde_json::Value::from(value)));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // The tracing macros "pre-format" the message field so that `value` refers to a
            // `std::fmt::Arguments`, which prints to a debug format without enclosing
            // double-quotes.
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push((
                field.name().to_string(),
                serde_json::Value::from(format!("{:?}", value)),
            ));
        }
    }
}

impl<S> tracing_subscriber::layer::Layer<S> for GelfLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if PUBLISHING.with(Cell::get) {
            return;
        }
        let mut visitor = GelfEventVisitor::default();
        event.record(&mut visitor);
        // An event without a message field is not a log line; nothing to publish.
        let text = match visitor.message {
            Some(text) => text,
            None => return,
        };

        let meta = event.metadata();
        let mut message = GelfMessage::new(text);
        message.set_host(self.publisher.host().to_string());
        message.set_level(default_level_mapping(meta.level()));
        if let Some(file) = meta.file() {
            message.set_file(file);
        }
        if let Some(line) = meta.line() {
            message.set_line(line);
        }
        message.set_additional("logger", serde_json::Value::from(meta.target()));
        for (name, value) in visitor.fields {
            message.set_additional(&name, value);
        }

        PUBLISHING.with(|flag| flag.set(true));
        self.publisher
            .log_gelf_message(message)
            .unwrap_or_else(|_err| {
                // still visible to the subscriber's other layers; suppressed from this one
                ::tracing::error!("gelf-publisher failed to publish an event");
            });
        PUBLISHING.with(|flag| flag.set(false));
    }
}
