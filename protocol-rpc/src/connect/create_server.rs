//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::io;

use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};

use crate::connect::channel::{Channel, ChannelError};
use crate::connect::session::ActiveSession;

/// Listener for `party_count` passive parties, backlog `party_count + 1`
pub async fn bind(addr: &str, party_count: usize) -> io::Result<TcpListener> {
    let addr = lookup_host(addr).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} does not resolve to an address", addr),
        )
    })?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let backlog = u32::try_from(party_count + 1).unwrap_or(u32::MAX);
    let listener = socket.listen(backlog)?;
    info!("Server listening at {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts exactly `party_count` connections, the n-th accepted becomes
/// party `n`
pub async fn accept_parties(
    listener: &TcpListener,
    party_count: usize,
    read_buffer_size: usize,
) -> Result<ActiveSession<TcpStream>, ChannelError> {
    let mut peers = Vec::with_capacity(party_count);
    while peers.len() < party_count {
        let (stream, peer_addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        info!("Passive party {} connected from {}", peers.len(), peer_addr);
        peers.push(Channel::new(stream, read_buffer_size));
    }
    Ok(ActiveSession::from_channels(peers))
}
