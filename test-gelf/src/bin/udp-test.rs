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

//! Test writing to a GELF UDP input on port 12201 on the local host.

use gelf_publisher::{layer::GelfLayer, publisher::Publisher, transport::UdpTransport};

use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::sync::Arc;

pub fn main() {
    let publisher = Arc::new(Publisher::new());
    publisher.add_transport(Box::new(UdpTransport::local().unwrap()));

    // Setup the real subscriber...
    let subscriber = Registry::default().with(GelfLayer::new(publisher));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, 世界!");
    debug!("Hello, 世界!");
    info!("Hello, 世界!");
    warn!("Hello, 世界!");
    error!("Hello, 世界!");
}
