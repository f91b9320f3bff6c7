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

//! Message enrichment.
//!
//! A [`Processor`] is one pluggable enrichment step: given a message and the call-site
//! [`Context`], it may add or override fields. [`Pipeline`] holds the registered processors and
//! applies them strictly in registration order, each seeing the previous one's output --
//! enrichment runs to completion before any transport is invoked, and an enrichment failure
//! aborts the log call rather than shipping a half-built message.

use crate::config::RequestLogging;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::message::GelfMessage;

use backtrace::Backtrace;

use std::collections::BTreeMap;

type StdResult<T, E> = std::result::Result<T, E>;

/// What a [`Processor`] may fail with; wrapped into [`Error::Processor`] by the pipeline.
pub type ProcessorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One enrichment step.
///
/// A processor that doesn't recognize the context variant must return `Ok` without touching the
/// message -- a no-op is valid and common.
pub trait Processor: Send + Sync {
    /// Stable name, used in error reports
    fn name(&self) -> &'static str;
    /// Enrich `message` from `context`
    fn apply(&self, message: &mut GelfMessage, context: &Context) -> StdResult<(), ProcessorError>;
}

/// An ordered set of [`Processor`]s; insertion order is application order.
#[derive(Default)]
pub struct Pipeline {
    processors: Vec<Box<dyn Processor>>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline {
            processors: Vec::new(),
        }
    }

    /// Append a processor. Duplicates are legal & apply twice.
    pub fn register(&mut self, processor: Box<dyn Processor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Run every registered processor over `message`, in registration order, each consuming the
    /// same context. The first failure aborts the run.
    pub fn apply(&self, message: &mut GelfMessage, context: &Context) -> Result<()> {
        for processor in &self.processors {
            processor
                .apply(message, context)
                .map_err(|err| Error::Processor {
                    processor: processor.name(),
                    source: err,
                    back: Backtrace::new(),
                })?;
        }
        Ok(())
    }
}

/// Enriches a message from a [`CapturedError`](crate::context::CapturedError).
///
/// Sets `_file`/`_line` from the error's captured origin, the stack trace as `full_message` when
/// none was supplied, and the error's message text as `short_message` when the caller left it
/// empty.
pub struct ExceptionProcessor;

impl Processor for ExceptionProcessor {
    fn name(&self) -> &'static str {
        "exception"
    }

    fn apply(&self, message: &mut GelfMessage, context: &Context) -> StdResult<(), ProcessorError> {
        if let Context::WithError(err) = context {
            message.set_file(err.file());
            message.set_line(err.line());
            if message.full_message().is_none() {
                message.set_full_message(err.trace());
            }
            if message.short_message().is_empty() {
                message.set_short_message(err.message());
            }
        }
        Ok(())
    }
}

/// Enriches a message from a [`RequestSnapshot`](crate::context::RequestSnapshot).
///
/// `request_url`, `request_method` & `request_ip` are always set. Query & body parameters are
/// captured only when the corresponding [`RequestLogging`] flag is on, serialized as JSON strings
/// into `request_get_data` / `request_post_data` -- after removing every redacted parameter.
pub struct RequestProcessor {
    options: RequestLogging,
}

impl RequestProcessor {
    pub fn new(options: RequestLogging) -> RequestProcessor {
        RequestProcessor { options }
    }
}

impl std::default::Default for RequestProcessor {
    fn default() -> Self {
        RequestProcessor::new(RequestLogging::default())
    }
}

impl Processor for RequestProcessor {
    fn name(&self) -> &'static str {
        "request"
    }

    fn apply(&self, message: &mut GelfMessage, context: &Context) -> StdResult<(), ProcessorError> {
        if let Context::WithRequest(request) = context {
            message.set_additional("request_url", serde_json::Value::from(request.url()));
            message.set_additional("request_method", serde_json::Value::from(request.method()));
            message.set_additional("request_ip", serde_json::Value::from(request.client_ip()));
            if self.options.log_request_get_data {
                self.capture(message, "request_get_data", request.query_params());
            }
            if self.options.log_request_post_data {
                self.capture(message, "request_post_data", request.body_params());
            }
        }
        Ok(())
    }
}

impl RequestProcessor {
    // Trouble serializing one parameter map skips that field only; it must never suppress the
    // rest of the message.
    fn capture(
        &self,
        message: &mut GelfMessage,
        field: &str,
        mut params: BTreeMap<String, serde_json::Value>,
    ) {
        for name in &self.options.redacted_parameters {
            params.remove(name);
        }
        match serde_json::to_string(&params) {
            Ok(serialized) => message.set_additional(field, serde_json::Value::from(serialized)),
            Err(err) => tracing::warn!(field, "could not serialize request parameters: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::context::{CapturedError, RequestSnapshot};
    use crate::level::Level;

    struct TagProcessor {
        tag: &'static str,
    }

    impl Processor for TagProcessor {
        fn name(&self) -> &'static str {
            "tag"
        }
        fn apply(
            &self,
            message: &mut GelfMessage,
            _context: &Context,
        ) -> StdResult<(), ProcessorError> {
            let seen = message
                .additional("order")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_default();
            let tagged = if seen.is_empty() {
                self.tag.to_string()
            } else {
                format!("{},{}", seen, self.tag)
            };
            message.set_additional("order", serde_json::Value::from(tagged));
            Ok(())
        }
    }

    struct FailingProcessor;

    impl Processor for FailingProcessor {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn apply(
            &self,
            _message: &mut GelfMessage,
            _context: &Context,
        ) -> StdResult<(), ProcessorError> {
            Err("no can do".into())
        }
    }

    struct TestRequest;

    impl RequestSnapshot for TestRequest {
        fn method(&self) -> &str {
            "GET"
        }
        fn url(&self) -> &str {
            "http://localhost"
        }
        fn client_ip(&self) -> &str {
            "127.0.0.1"
        }
        fn query_params(&self) -> BTreeMap<String, serde_json::Value> {
            BTreeMap::from([(String::from("test"), serde_json::Value::from(true))])
        }
        fn body_params(&self) -> BTreeMap<String, serde_json::Value> {
            BTreeMap::from([
                (String::from("test_post"), serde_json::Value::from(true)),
                (String::from("username"), serde_json::Value::from("henk")),
            ])
        }
    }

    #[test]
    fn test_pipeline_preserves_registration_order() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(TagProcessor { tag: "p1" }));
        pipeline.register(Box::new(TagProcessor { tag: "p2" }));

        let mut message = GelfMessage::new("test");
        pipeline.apply(&mut message, &Context::Plain).unwrap();
        assert_eq!(message.additional("order").unwrap(), "p1,p2");
    }

    #[test]
    fn test_pipeline_aborts_on_failure() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(FailingProcessor));
        pipeline.register(Box::new(TagProcessor { tag: "after" }));

        let mut message = GelfMessage::new("test");
        let err = pipeline.apply(&mut message, &Context::Plain).unwrap_err();
        assert!(matches!(err, Error::Processor { processor: "failing", .. }));
        // the second processor never ran
        assert!(message.additional("order").is_none());
    }

    #[test]
    fn test_exception_processor() {
        let expected_line = line!() + 1;
        let err = CapturedError::new("test Exception");

        let mut message = GelfMessage::new("test");
        ExceptionProcessor
            .apply(&mut message, &Context::WithError(&err))
            .unwrap();

        assert_eq!(message.file().unwrap(), file!());
        assert_eq!(message.line().unwrap(), expected_line);
        assert!(message.full_message().is_some());
        // the caller supplied a short message; the error's text must not replace it
        assert_eq!(message.short_message(), "test");
    }

    #[test]
    fn test_exception_processor_fills_empty_short_message() {
        let err = CapturedError::new("test Exception").with_level(Level::Alert);
        let mut message = GelfMessage::new("");
        ExceptionProcessor
            .apply(&mut message, &Context::WithError(&err))
            .unwrap();
        assert_eq!(message.short_message(), "test Exception");
    }

    #[test]
    fn test_exception_processor_ignores_other_contexts() {
        let mut message = GelfMessage::new("test");
        ExceptionProcessor
            .apply(&mut message, &Context::Plain)
            .unwrap();
        assert!(message.file().is_none());
        assert!(message.full_message().is_none());
    }

    #[test]
    fn test_request_processor_defaults() {
        let mut message = GelfMessage::new("test");
        RequestProcessor::default()
            .apply(&mut message, &Context::WithRequest(&TestRequest))
            .unwrap();

        assert_eq!(message.additional("request_url").unwrap(), "http://localhost");
        assert_eq!(message.additional("request_method").unwrap(), "GET");
        assert_eq!(message.additional("request_ip").unwrap(), "127.0.0.1");
        // both capture flags default off
        assert!(message.additional("request_get_data").is_none());
        assert!(message.additional("request_post_data").is_none());
    }

    #[test]
    fn test_request_processor_captures_parameters() {
        let options = RequestLogging {
            log_request_get_data: true,
            log_request_post_data: true,
            ..RequestLogging::default()
        };

        let mut message = GelfMessage::new("test");
        RequestProcessor::new(options)
            .apply(&mut message, &Context::WithRequest(&TestRequest))
            .unwrap();

        assert_eq!(message.additional("request_get_data").unwrap(), r#"{"test":true}"#);
        // `username` is redacted by default, regardless of the flags
        assert_eq!(message.additional("request_post_data").unwrap(), r#"{"test_post":true}"#);
    }

    #[test]
    fn test_request_processor_custom_redaction() {
        let options = RequestLogging {
            log_request_post_data: true,
            redacted_parameters: vec![String::from("test_post"), String::from("username")],
            ..RequestLogging::default()
        };

        let mut message = GelfMessage::new("test");
        RequestProcessor::new(options)
            .apply(&mut message, &Context::WithRequest(&TestRequest))
            .unwrap();

        assert_eq!(message.additional("request_post_data").unwrap(), "{}");
    }
}
