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

//! The GELF transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, the
//! TCP, UDP, HTTP & no-op implementations, and [`from_config`], the factory that turns a
//! validated [`TransportConfig`] into a running transport.
//!
//! Wire details (frame delimiters, datagram chunking, HTTP verbs) live entirely here; the
//! enrichment pipeline upstream knows transports only through [`Transport::send`].
//!
//! # Examples
//!
//! To ship GELF messages over UDP to a Graylog input on port 12201 (the default) on localhost:
//!
//! ```rust
//! use gelf_publisher::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! On another host, from configuration:
//!
//! ```rust
//! use gelf_publisher::config::TransportConfig;
//! use gelf_publisher::transport::from_config;
//! let transpo = from_config(&TransportConfig::udp("some-host.domain.io", 12201));
//! assert!(transpo.is_err()); // no such host, after all
//! ```

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::message::GelfMessage;

use backtrace::Backtrace;
use bytes::{BufMut, BytesMut};
use rand::Rng;

use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
///
/// `send` takes the message by shared reference: every transport in a fan-out set consumes the
/// same instance, so implementations must not mutate it.
pub trait Transport: Send + Sync {
    /// Identifies this transport in failure reports.
    fn name(&self) -> &str;
    /// Deliver one finished GELF message.
    fn send(&self, message: &GelfMessage) -> Result<()>;
}

/// The transport kinds [`from_config`] recognizes.
const KNOWN_KINDS: [&str; 4] = ["tcp", "udp", "http", "noop"];

/// Check a `type` discriminator without constructing anything.
///
/// Pure, so a bad kind surfaces deterministically even when some other descriptor's socket
/// happens to be unreachable at the moment.
pub fn validate_kind(kind: &str) -> Result<()> {
    if KNOWN_KINDS.contains(&kind.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(Error::UnsupportedTransportKind {
            kind: kind.to_string(),
            back: Backtrace::new(),
        })
    }
}

/// Build a [`Transport`] from one configuration descriptor.
pub fn from_config(config: &TransportConfig) -> Result<Box<dyn Transport>> {
    match config.kind.to_ascii_lowercase().as_str() {
        "tcp" => Ok(Box::new(TcpTransport::new((
            config.host.as_str(),
            config.port,
        ))?)),
        "udp" => Ok(Box::new(UdpTransport::new((
            config.host.as_str(),
            config.port,
        ))?)),
        "http" => Ok(Box::new(HttpTransport::new(config.url())?)),
        "noop" => Ok(Box::new(NoopTransport)),
        _ => Err(Error::UnsupportedTransportKind {
            kind: config.kind.clone(),
            back: Backtrace::new(),
        }),
    }
}

fn transport_err(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Transport {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                               UDP                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The largest datagram a Graylog UDP input accepts without chunking.
pub const MAX_DATAGRAM: usize = 8192;

const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];
const CHUNK_HEADER_LEN: usize = 12;
const MAX_CHUNKS: usize = 128;

/// Sending GELF messages via UDP datagrams.
///
/// A message that fits in one datagram is sent as-is; larger messages use GELF chunking: each
/// chunk carries the magic bytes, an 8-byte message id, its sequence number and the chunk count,
/// and at most 128 chunks may make up one message.
pub struct UdpTransport {
    name: String,
    socket: UdpSocket,
    max_datagram: usize,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        // Bind to any available port...
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(transport_err)?;
        // and connect to the collector at `addr`:
        socket.connect(addr).map_err(transport_err)?;
        let name = socket
            .peer_addr()
            .map(|addr| format!("udp://{}", addr))
            .unwrap_or_else(|_| String::from("udp"));
        Ok(UdpTransport {
            name,
            socket,
            max_datagram: MAX_DATAGRAM,
        })
    }

    /// Construct a [`Transport`] implementation via UDP at localhost:12201.
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new(("localhost", crate::config::DEFAULT_GELF_PORT))
    }

    /// Lower the datagram budget, e.g. to 1420 for WAN paths with a smaller MTU.
    pub fn with_max_datagram(mut self, max_datagram: usize) -> UdpTransport {
        self.max_datagram = max_datagram;
        self
    }

    fn send_chunked(&self, buf: &[u8]) -> Result<()> {
        let chunk_data_len = self.max_datagram - CHUNK_HEADER_LEN;
        let count = buf.len().div_ceil(chunk_data_len);
        if count > MAX_CHUNKS {
            return Err(Error::MessageTooLarge {
                size: buf.len(),
                limit: chunk_data_len * MAX_CHUNKS,
                back: Backtrace::new(),
            });
        }
        // The message id only has to be unique among messages in flight to one input.
        let message_id: [u8; 8] = rand::thread_rng().gen();
        for (seq, part) in buf.chunks(chunk_data_len).enumerate() {
            let mut chunk = BytesMut::with_capacity(CHUNK_HEADER_LEN + part.len());
            chunk.put_slice(&CHUNK_MAGIC);
            chunk.put_slice(&message_id);
            chunk.put_u8(seq as u8);
            chunk.put_u8(count as u8);
            chunk.put_slice(part);
            self.socket.send(&chunk).map_err(transport_err)?;
        }
        Ok(())
    }
}

impl Transport for UdpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &GelfMessage) -> Result<()> {
        let buf = message.to_json()?;
        if buf.len() <= self.max_datagram {
            self.socket.send(&buf).map_err(transport_err)?;
            Ok(())
        } else {
            self.send_chunked(&buf)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                               TCP                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

const TCP_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sending GELF messages via TCP streams; frames are delimited by a null byte.
pub struct TcpTransport {
    name: String,
    socket: TcpStream,
}

impl TcpTransport {
    /// Construct a [`Transport`] implementation via TCP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<TcpTransport> {
        let socket = TcpStream::connect(addr).map_err(transport_err)?;
        socket
            .set_write_timeout(Some(TCP_WRITE_TIMEOUT))
            .map_err(transport_err)?;
        let name = socket
            .peer_addr()
            .map(|addr| format!("tcp://{}", addr))
            .unwrap_or_else(|_| String::from("tcp"));
        Ok(TcpTransport { name, socket })
    }

    /// Construct a [`Transport`] implementation via TCP at localhost:12201.
    pub fn local() -> Result<TcpTransport> {
        TcpTransport::new(("localhost", crate::config::DEFAULT_GELF_PORT))
    }
}

impl Transport for TcpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &GelfMessage) -> Result<()> {
        use std::io::Write;
        let buf = message.to_json()?;
        // Trick I learned from tracing-subscriber.
        // <https://docs.rs/tracing-subscriber/0.3.11/src/tracing_subscriber/fmt/fmt_layer.rs.html#867-903>
        // `std::io::Write` takes a `&mut self` and we just have a `&self`; but `Write` is
        // implemented on `&TcpStream` as well as `TcpStream`, so a mutable *reference* to the
        // stream serves as the writer.
        let mut writer: &TcpStream = &self.socket;
        writer.write_all(&buf).map_err(transport_err)?;
        // GELF over TCP delimits frames with a null byte
        writer.write_all(&[0]).map_err(transport_err)?;
        writer.flush().map_err(transport_err)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                              HTTP                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Sending GELF messages by POSTing them to a Graylog HTTP input.
pub struct HttpTransport {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Construct a [`Transport`] implementation POSTing to `url` (e.g.
    /// `http://graylog.example.com:12201/gelf`).
    pub fn new(url: impl Into<String>) -> Result<HttpTransport> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(transport_err)?;
        Ok(HttpTransport {
            url: url.into(),
            client,
        })
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.url
    }

    fn send(&self, message: &GelfMessage) -> Result<()> {
        let buf = message.to_json()?;
        self.client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(buf)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(transport_err)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                              noop                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Discards every message; a disabled sink in production, a stand-in in tests.
pub struct NoopTransport;

impl Transport for NoopTransport {
    fn name(&self) -> &str {
        "noop"
    }

    fn send(&self, _message: &GelfMessage) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use std::io::Read;

    #[test]
    fn test_validate_kind() {
        for kind in ["tcp", "udp", "http", "noop", "TCP", "Udp"] {
            assert!(validate_kind(kind).is_ok(), "'{}' should be recognized", kind);
        }
        assert!(matches!(
            validate_kind("INVALID"),
            Err(Error::UnsupportedTransportKind { .. })
        ));
    }

    #[test]
    fn test_from_config_rejects_unknown_kinds() {
        let mut config = TransportConfig::noop();
        config.kind = String::from("carrier-pigeon");
        match from_config(&config) {
            Err(Error::UnsupportedTransportKind { kind, .. }) => {
                assert_eq!(kind, "carrier-pigeon")
            }
            _ => panic!("expected UnsupportedTransportKind"),
        }
    }

    #[test]
    fn test_from_config_noop() {
        let transport = from_config(&TransportConfig::noop()).unwrap();
        assert_eq!(transport.name(), "noop");
        transport.send(&GelfMessage::new("test")).unwrap();
    }

    #[test]
    fn test_udp_single_datagram() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let transpo = UdpTransport::new(listener.local_addr().unwrap()).unwrap();

        let mut message = GelfMessage::new("over the wire");
        message.set_host("bree.local");
        transpo.send(&message).unwrap();

        let mut buf = [0u8; MAX_DATAGRAM];
        let received = listener.recv(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..received]).unwrap();
        assert_eq!(value["short_message"], "over the wire");
        assert_eq!(value["host"], "bree.local");
    }

    #[test]
    fn test_udp_chunked_datagrams() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let transpo = UdpTransport::new(listener.local_addr().unwrap())
            .unwrap()
            .with_max_datagram(256);

        let message = GelfMessage::new("x".repeat(1024));
        transpo.send(&message).unwrap();

        let mut reassembled = Vec::new();
        let mut buf = [0u8; MAX_DATAGRAM];
        let mut expected_count = None;
        let mut chunks = 0u8;
        loop {
            let received = listener.recv(&mut buf).unwrap();
            let chunk = &buf[..received];
            assert_eq!(&chunk[..2], &CHUNK_MAGIC);
            assert!(received <= 256);
            assert_eq!(chunk[10], chunks); // sequence numbers arrive in order on loopback
            let count = chunk[11];
            assert_eq!(*expected_count.get_or_insert(count), count);
            reassembled.extend_from_slice(&chunk[CHUNK_HEADER_LEN..]);
            chunks += 1;
            if chunks == count {
                break;
            }
        }
        let value: serde_json::Value = serde_json::from_slice(&reassembled).unwrap();
        assert_eq!(value["short_message"], "x".repeat(1024));
    }

    #[test]
    fn test_udp_message_too_large() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transpo = UdpTransport::new(listener.local_addr().unwrap())
            .unwrap()
            .with_max_datagram(16);
        // 128 chunks of 4 payload bytes tops out at 512 bytes
        let message = GelfMessage::new("x".repeat(4096));
        assert!(matches!(
            transpo.send(&message),
            Err(Error::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_tcp_null_delimited_frames() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let transpo = TcpTransport::new(listener.local_addr().unwrap()).unwrap();
        assert!(transpo.name().starts_with("tcp://"));

        let mut message = GelfMessage::new("over the stream");
        message.set_host("bree.local");
        transpo.send(&message).unwrap();
        transpo.send(&message).unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut received = Vec::new();
        while received.iter().filter(|&&b| b == 0).count() < 2 {
            let mut buf = [0u8; 4096];
            let n = peer.read(&mut buf).unwrap();
            assert!(n > 0, "peer closed early");
            received.extend_from_slice(&buf[..n]);
        }
        let frames: Vec<_> = received.split(|&b| b == 0).filter(|f| !f.is_empty()).collect();
        assert_eq!(frames.len(), 2);
        for frame in frames {
            let value: serde_json::Value = serde_json::from_slice(frame).unwrap();
            assert_eq!(value["short_message"], "over the stream");
        }
    }
}
