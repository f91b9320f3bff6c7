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

//! The publisher: enrichment plus fan-out.
//!
//! [`Publisher`] owns the processor pipeline and the transport set. A log call normalizes its
//! severity, builds a fresh [`GelfMessage`], runs the enrichment pipeline to completion, and only
//! then fans the finished message out to every registered transport.
//!
//! Fan-out isolates failures per transport: every transport's `send` is attempted exactly once,
//! a failing sink never prevents delivery to the healthy ones, and if anything failed the call
//! returns [`Error::Delivery`] naming each failing transport -- after all of them were attempted.
//! There is no retry logic here; a transport that fails fails once for that call.
//!
//! Transports described by configuration are resolved lazily, on the first dispatch. Resolution
//! is all-or-nothing: nothing is committed on failure, so a misconfigured publisher fails with
//! the same error on every log call rather than only the first.

use crate::config::PublisherConfig;
use crate::context::{CapturedError, Context};
use crate::error::{Error, Result, TransportFailure};
use crate::level::Level;
use crate::message::{default_host, GelfMessage};
use crate::processor::{ExceptionProcessor, Pipeline, Processor, RequestProcessor};
use crate::transport::{self, Transport};

use backtrace::Backtrace;

use std::sync::{Mutex, PoisonError, RwLock};

/// Converts log events into GELF messages and ships them to every registered transport.
///
/// The processor & transport sets are read-mostly: concurrent log calls only read them, and the
/// registration operations take write locks, so registering at runtime is safe -- though most
/// hosts will register everything during startup and only log afterwards.
pub struct Publisher {
    host: String,
    /// Transport descriptors awaiting resolution; drained into `transports` on first dispatch
    pending: Mutex<Vec<crate::config::TransportConfig>>,
    transports: RwLock<Vec<Box<dyn Transport>>>,
    pipeline: RwLock<Pipeline>,
}

impl std::default::Default for Publisher {
    fn default() -> Self {
        Publisher::new()
    }
}

impl Publisher {
    /// An empty publisher: no transports, no processors, discovered origin host.
    pub fn new() -> Publisher {
        Publisher {
            host: default_host(),
            pending: Mutex::new(Vec::new()),
            transports: RwLock::new(Vec::new()),
            pipeline: RwLock::new(Pipeline::new()),
        }
    }

    /// Build a publisher from configuration.
    ///
    /// The transport descriptors are kept unresolved until the first log call; the standard
    /// [`ExceptionProcessor`] & [`RequestProcessor`] are registered, in that order.
    pub fn from_config(config: PublisherConfig) -> Publisher {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(ExceptionProcessor));
        pipeline.register(Box::new(RequestProcessor::new(config.request)));
        Publisher {
            host: config.host.unwrap_or_else(default_host),
            pending: Mutex::new(config.transports),
            transports: RwLock::new(Vec::new()),
            pipeline: RwLock::new(pipeline),
        }
    }

    /// The origin-host identifier stamped into every message this publisher builds.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Log one event: normalize `level`, build a message around `short_message`, enrich it from
    /// `context`, fan it out.
    pub fn log(&self, level: &str, short_message: &str, context: &Context) -> Result<()> {
        let level = Level::from_label(level)?;
        let mut message = GelfMessage::new(short_message);
        message.set_host(self.host.clone());
        message.set_level(level);
        self.enrich_and_dispatch(message, context)
    }

    /// Log a captured error: its message text & level become the message's, and the context is
    /// seeded so [`ExceptionProcessor`] activates.
    pub fn log_error(&self, error: &CapturedError) -> Result<()> {
        let mut message = GelfMessage::new(error.message());
        message.set_host(self.host.clone());
        message.set_level(error.level());
        self.enrich_and_dispatch(message, &Context::WithError(error))
    }

    /// Ship a caller-constructed message: no level or short-message synthesis, but the processor
    /// pipeline still runs.
    pub fn log_gelf_message(&self, message: GelfMessage) -> Result<()> {
        self.enrich_and_dispatch(message, &Context::Plain)
    }

    /// Append a transport without reconstructing the publisher.
    pub fn add_transport(&self, transport: Box<dyn Transport>) {
        self.transports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transport);
    }

    /// Append a processor; it will run after every previously registered one.
    pub fn register_processor(&self, processor: Box<dyn Processor>) {
        self.pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(processor);
    }

    fn enrich_and_dispatch(&self, mut message: GelfMessage, context: &Context) -> Result<()> {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(&mut message, context)?;
        if message.short_message().is_empty() {
            return Err(Error::EmptyShortMessage {
                back: Backtrace::new(),
            });
        }
        self.resolve_transports()?;

        let transports = self
            .transports
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut failures = Vec::new();
        for transport in transports.iter() {
            if let Err(err) = transport.send(&message) {
                tracing::warn!(transport = transport.name(), "failed to deliver GELF message: {}", err);
                failures.push(TransportFailure {
                    transport: transport.name().to_string(),
                    cause: err.to_string(),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Delivery {
                failures,
                back: Backtrace::new(),
            })
        }
    }

    // All-or-nothing: the descriptors stay pending on failure, so the next call fails the same
    // way instead of delivering to a partial set.
    fn resolve_transports(&self) -> Result<()> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.is_empty() {
            return Ok(());
        }
        for config in pending.iter() {
            transport::validate_kind(&config.kind)?;
        }
        let mut built = Vec::with_capacity(pending.len());
        for config in pending.iter() {
            built.push(transport::from_config(config)?);
        }
        self.transports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .append(&mut built);
        pending.clear();
        Ok(())
    }
}
