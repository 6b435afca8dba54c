// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::net::{SocketAddr, TcpListener};

/// A loopback address nobody is listening on at the time of the call.
pub fn free_local_socket() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap_or_else(|e| panic!("cannot bind ephemeral port: {}", e));
	listener.local_addr().unwrap_or_else(|e| panic!("cannot read local addr: {}", e))
}
