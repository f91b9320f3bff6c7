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

//! Test writing to a GELF TCP input on port 12201 on the local host, exercising the publisher
//! directly (no tracing layer).

use gelf_publisher::{
    config::PublisherConfig,
    context::{CapturedError, Context},
    publisher::Publisher,
    transport::TcpTransport,
};

pub fn main() {
    // from_config registers the standard processors; the transport set starts empty
    let publisher = Publisher::from_config(PublisherConfig::default());
    publisher.add_transport(Box::new(TcpTransport::local().unwrap()));

    publisher
        .log("notice", "Hello from the TCP transport", &Context::Plain)
        .unwrap();

    let err = CapturedError::new("a test exception, with its origin attached");
    publisher.log_error(&err).unwrap();
}
