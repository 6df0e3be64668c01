//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Connections of one party to its counterparts
//!
//! The active party keeps one channel per passive party, indexed in the
//! order the parties connected. That index is the party's identity for the
//! whole run and is never renegotiated, so passive parties must connect in
//! an agreed order.

use futures::future::try_join_all;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::connect::channel::{Channel, ChannelError, Health};
use crate::connect::{create_client, create_server};
use crate::proto::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTarget {
    All,
    Index(usize),
}

/// Result of a receive, a single message when one peer was addressed
#[derive(Debug, Clone, PartialEq)]
pub enum Gathered<T> {
    One(T),
    All(Vec<T>),
}

impl<T> Gathered<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Gathered::One(t) => vec![t],
            Gathered::All(v) => v,
        }
    }
}

#[derive(Debug)]
pub struct ActiveSession<S> {
    peers: Vec<Channel<S>>,
}

impl ActiveSession<TcpStream> {
    /// Binds `addr` and waits for exactly `party_count` passive parties
    pub async fn listen(
        addr: &str,
        party_count: usize,
        read_buffer_size: usize,
    ) -> Result<ActiveSession<TcpStream>, ChannelError> {
        let listener = create_server::bind(addr, party_count).await?;
        create_server::accept_parties(&listener, party_count, read_buffer_size).await
    }
}

impl<S> ActiveSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    /// Channels in party index order
    pub fn from_channels(peers: Vec<Channel<S>>) -> ActiveSession<S> {
        ActiveSession { peers }
    }

    pub fn party_count(&self) -> usize {
        self.peers.len()
    }

    pub fn set_max_frame_length(&mut self, max_frame_length: usize) {
        for peer in self.peers.iter_mut() {
            peer.codec_mut().set_max_frame_length(max_frame_length);
        }
    }

    /// Every channel in party index order, for rounds that run per party
    pub fn peers_mut(&mut self) -> &mut [Channel<S>] {
        &mut self.peers
    }

    pub fn peer_mut(&mut self, index: usize) -> Result<&mut Channel<S>, ChannelError> {
        let count = self.peers.len();
        self.peers.get_mut(index).ok_or_else(|| {
            error!("peer index {} out of range 0..{}", index, count);
            ChannelError::PeerIndex { index, count }
        })
    }

    /// `All` writes to every party in index order
    pub async fn send_to_peer(
        &mut self,
        target: PeerTarget,
        message: &Message,
    ) -> Result<(), ChannelError> {
        match target {
            PeerTarget::All => {
                for peer in self.peers.iter_mut() {
                    peer.send(message).await?;
                }
                Ok(())
            }
            PeerTarget::Index(index) => self.peer_mut(index)?.send(message).await,
        }
    }

    /// `All` reads from every party concurrently and returns the messages in
    /// index order
    pub async fn receive_from_peer(
        &mut self,
        target: PeerTarget,
    ) -> Result<Gathered<Message>, ChannelError> {
        match target {
            PeerTarget::All => {
                let messages = try_join_all(self.peers.iter_mut().map(|p| p.receive())).await?;
                Ok(Gathered::All(messages))
            }
            PeerTarget::Index(index) => {
                let message = self.peer_mut(index)?.receive().await?;
                Ok(Gathered::One(message))
            }
        }
    }
}

#[derive(Debug)]
pub struct PassiveSession<S> {
    active: Channel<S>,
}

impl PassiveSession<TcpStream> {
    pub async fn connect(
        addr: &str,
        read_buffer_size: usize,
    ) -> Result<PassiveSession<TcpStream>, ChannelError> {
        let stream = create_client::connect(addr).await?;
        Ok(PassiveSession::from_channel(Channel::new(
            stream,
            read_buffer_size,
        )))
    }
}

impl<S> PassiveSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    pub fn from_channel(active: Channel<S>) -> PassiveSession<S> {
        PassiveSession { active }
    }

    pub fn set_max_frame_length(&mut self, max_frame_length: usize) {
        self.active.codec_mut().set_max_frame_length(max_frame_length);
    }

    pub async fn send_to_active(&mut self, message: &Message) -> Result<(), ChannelError> {
        self.active.send(message).await
    }

    pub async fn receive_from_active(&mut self) -> Result<Message, ChannelError> {
        self.active.receive().await
    }
}
