//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Length framed message channel
//!
//! Every frame is a 16 byte ASCII header holding the payload length in
//! decimal, left justified and padded with spaces, followed by the payload.
//! The codec keeps surplus bytes buffered, so frames written back to back
//! decode correctly, but the training exchange is strictly request and
//! response: a party never sends twice on one connection without reading
//! in between.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::proto::Message;

pub const HEADER_LEN: usize = 16;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1 << 30;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("connection is in an error state: {0}")]
    Unhealthy(#[source] io::Error),
    #[error("channel I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("peer closed the connection")]
    Closed,
    #[error("cannot serialize message: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("peer index {index} is out of range, {count} peers are connected")]
    PeerIndex { index: usize, count: usize },
    #[error("expected a {expected} message, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
}

/// Pending error indicator of the underlying connection
pub trait Health {
    fn check(&self) -> io::Result<()>;
}

impl Health for TcpStream {
    fn check(&self) -> io::Result<()> {
        match self.take_error()? {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Health for DuplexStream {
    fn check(&self) -> io::Result<()> {
        Ok(())
    }
}

fn write_header(len: usize) -> io::Result<[u8; HEADER_LEN]> {
    let text = format!("{:<width$}", len, width = HEADER_LEN);
    if text.len() != HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame length {} does not fit the header", len),
        ));
    }
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

fn parse_header(header: &[u8]) -> io::Result<usize> {
    std::str::from_utf8(header)
        .ok()
        .and_then(|s| s.trim_end_matches(' ').parse::<usize>().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed frame header {:?}", String::from_utf8_lossy(header)),
            )
        })
}

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_length: usize,
    // payload length of a frame whose header is already consumed
    pending: Option<usize>,
}

impl FrameCodec {
    pub fn new(max_frame_length: usize) -> FrameCodec {
        FrameCodec {
            max_frame_length,
            pending: None,
        }
    }

    pub fn set_max_frame_length(&mut self, max_frame_length: usize) {
        self.max_frame_length = max_frame_length;
    }

    fn check_length(&self, len: usize) -> io::Result<()> {
        if len > self.max_frame_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame of {} bytes exceeds the limit of {} bytes",
                    len, self.max_frame_length
                ),
            ));
        }
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        FrameCodec::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.check_length(payload.len())?;
        let header = write_header(payload.len())?;
        dst.reserve(HEADER_LEN + payload.len());
        dst.put_slice(&header);
        dst.put(payload);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let len = match self.pending {
            Some(len) => len,
            None => {
                if src.len() < HEADER_LEN {
                    return Ok(None);
                }
                let header = src.split_to(HEADER_LEN);
                let len = parse_header(&header)?;
                self.check_length(len)?;
                self.pending = Some(len);
                len
            }
        };

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }
        self.pending = None;
        Ok(Some(src.split_to(len)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        match self.pending {
            None if buf.is_empty() => Ok(None),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed after {} of {} header bytes",
                    buf.len(),
                    HEADER_LEN
                ),
            )),
            Some(len) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed after {} of {} payload bytes",
                    buf.len(),
                    len
                ),
            )),
        }
    }
}

/// One framed connection to a peer
#[derive(Debug)]
pub struct Channel<S> {
    framed: Framed<S, FrameCodec>,
}

impl<S> Channel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health,
{
    /// `read_buffer_size` is the initial capacity of the read buffer, larger
    /// frames grow it as needed
    pub fn new(stream: S, read_buffer_size: usize) -> Channel<S> {
        Channel::with_codec(stream, FrameCodec::default(), read_buffer_size)
    }

    pub fn with_codec(stream: S, codec: FrameCodec, read_buffer_size: usize) -> Channel<S> {
        Channel {
            framed: Framed::with_capacity(stream, codec, read_buffer_size),
        }
    }

    pub fn codec_mut(&mut self) -> &mut FrameCodec {
        self.framed.codec_mut()
    }

    fn check_health(&self) -> Result<(), ChannelError> {
        self.framed.get_ref().check().map_err(|e| {
            error!("connection is unhealthy: {}", e);
            ChannelError::Unhealthy(e)
        })
    }

    pub async fn send_frame(&mut self, payload: Bytes) -> Result<(), ChannelError> {
        self.check_health()?;
        trace!("sending frame of {} bytes", payload.len());
        self.framed.send(payload).await?;
        Ok(())
    }

    pub async fn receive_frame(&mut self) -> Result<BytesMut, ChannelError> {
        self.check_health()?;
        match self.framed.next().await {
            Some(Ok(frame)) => {
                trace!("received frame of {} bytes", frame.len());
                Ok(frame)
            }
            Some(Err(e)) => Err(ChannelError::Io(e)),
            None => Err(ChannelError::Closed),
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), ChannelError> {
        let payload = message.encode()?;
        self.send_frame(payload).await
    }

    pub async fn receive(&mut self) -> Result<Message, ChannelError> {
        let frame = self.receive_frame().await?;
        Message::decode(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_left_justified() {
        assert_eq!(&write_header(42).unwrap(), b"42              ");
        assert_eq!(&write_header(0).unwrap(), b"0               ");
    }

    #[test]
    fn header_must_be_decimal() {
        assert_eq!(parse_header(b"1234            ").unwrap(), 1234);
        for bad in [
            &b"12a4            "[..],
            &b"                "[..],
            &b" -3             "[..],
        ] {
            let e = parse_header(bad).unwrap_err();
            assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        }
    }

    #[test]
    fn decode_waits_for_the_whole_frame() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        buf.put_slice(b"5      ");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.put_slice(b"         he");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.put_slice(b"llo3               ");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"hello");
        // the next frame is left in the buffer
        assert_eq!(&buf[..], b"3               ");
    }

    #[test]
    fn back_to_back_frames() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"ab"), &mut buf).unwrap();
        codec.encode(Bytes::new(), &mut buf).unwrap();
        codec.encode(Bytes::from_static(b"c"), &mut buf).unwrap();
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"ab");
        assert!(codec.decode(&mut buf).unwrap().unwrap().is_empty());
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"c");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut codec = FrameCodec::new(4);
        let mut buf = BytesMut::new();
        let e = codec
            .encode(Bytes::from_static(b"12345"), &mut buf)
            .unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);

        buf.put_slice(b"5               12345");
        let e = codec.decode(&mut buf).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn eof_inside_a_frame() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        buf.put_slice(b"10              abc");
        let e = codec.decode_eof(&mut buf).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        assert!(e.to_string().contains("3 of 10"));

        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }
}
