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

//! [gelf-publisher](crate) errors

use backtrace::Backtrace;

/// One transport's failure during fan-out, as recorded in [`Error::Delivery`].
///
/// The cause is carried in rendered form; the live error values aren't `Clone` and the caller
/// only needs to know which sink failed and why.
pub struct TransportFailure {
    /// The failing transport's [`name`](crate::transport::Transport::name)
    pub transport: String,
    /// Rendered cause of the failure
    pub cause: String,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.transport, self.cause)
    }
}

impl std::fmt::Debug for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// [gelf-publisher](crate) error type
///
/// [gelf-publisher](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of a
/// straightforward enumeration with a few match arms chosen on the basis of what the caller will
/// need to respond.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// A severity label that is neither a known syslog level name nor an in-range integer
    InvalidLevel {
        label: String,
        back: Backtrace,
    },
    /// A transport descriptor whose `type` discriminator names no known transport
    UnsupportedTransportKind {
        kind: String,
        back: Backtrace,
    },
    /// An enrichment processor failed; the message was never handed to any transport
    Processor {
        processor: &'static str,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A message reached dispatch with an empty `short_message`
    EmptyShortMessage {
        back: Backtrace,
    },
    /// Failed to encode a message as GELF JSON
    Serialization {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// A message too large for the transport even after chunking
    MessageTooLarge {
        size: usize,
        limit: usize,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// One or more transports failed during fan-out; every transport was still attempted
    Delivery {
        failures: Vec<TransportFailure>,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidLevel { label, .. } => {
                write!(f, "'{}' is neither a syslog level name nor 0-7", label)
            }
            Error::UnsupportedTransportKind { kind, .. } => {
                write!(f, "'{}' does not name a supported transport kind", kind)
            }
            Error::Processor { processor, source, .. } => {
                write!(f, "Processor '{}' failed: {}", processor, source)
            }
            Error::EmptyShortMessage { .. } => {
                write!(f, "A GELF message must carry a non-empty short_message")
            }
            Error::Serialization { source, .. } => {
                write!(f, "Failed to encode GELF message: {}", source)
            }
            Error::MessageTooLarge { size, limit, .. } => {
                write!(f, "Message of {} bytes exceeds the transport limit of {}", size, limit)
            }
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            Error::Delivery { failures, .. } => {
                write!(f, "Delivery failed on {} transport(s): ", failures.len())?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                Ok(())
            }
            _ => write!(f, "Other gelf-publisher error"),
        }
    }
}

impl std::fmt::Debug for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidLevel { label: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::UnsupportedTransportKind { kind: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Processor { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::EmptyShortMessage { back } => write!(f, "{}\n{:?}", self, back),
            Error::Serialization { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::MessageTooLarge { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Delivery { failures: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "gelf-publisher error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Processor { source, .. } => Some(&**source),
            Error::Serialization { source, .. } => Some(source),
            Error::Transport { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
