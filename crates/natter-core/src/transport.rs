//! Frame I/O over a byte stream.
//!
//! One connection is split into a [`FrameReader`] owned by the dispatcher and
//! a [`FrameWriter`] shared by the dispatcher and the heartbeat task. Reads
//! are unlocked because there is a single reader. Writes go through a mutex
//! held for exactly one frame so concurrent senders never interleave bytes.
//!
//! Both halves tolerate partial I/O: a frame may arrive one byte at a time
//! and a write may accept fewer bytes than offered.
//!
//! [`ConnectionCloser`] forces the socket closed from either task. Shutting
//! down both directions makes the dispatcher's pending read return end of
//! stream, which is how a heartbeat timeout ends the session.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::BytesMut;
use natter_proto::{Frame, FrameHeader, PacketType, Payload, ProtocolError};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::Mutex,
};

use crate::error::TransportError;

/// Result of a completed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Whole frame written; number of bytes on the wire
    Sent(usize),
    /// A write accepted zero bytes: the peer is gone
    PeerClosed,
}

/// Shared, serialized write path for one connection.
///
/// Cloning yields another handle to the same underlying writer.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for FrameWriter<W> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { inner: Arc::new(Mutex::new(writer)) }
    }

    /// Write one complete frame.
    ///
    /// Holds the write lock until every byte is accepted, looping over short
    /// writes.
    ///
    /// # Errors
    ///
    /// - `TransportError::Network` if a write or flush fails
    pub async fn send_frame(&self, frame: &Frame) -> Result<SendOutcome, TransportError> {
        let mut buf = BytesMut::with_capacity(frame.encoded_len());
        frame.encode(&mut buf);

        let mut writer = self.inner.lock().await;
        let mut written = 0;

        while written < buf.len() {
            let n = writer.write(&buf[written..]).await?;
            if n == 0 {
                return Ok(SendOutcome::PeerClosed);
            }
            written += n;
        }

        writer.flush().await?;

        tracing::trace!(packet_type = ?frame.packet_type(), bytes = written, "frame sent");

        Ok(SendOutcome::Sent(written))
    }

    /// Encode a payload and send it as one frame.
    ///
    /// # Errors
    ///
    /// - `TransportError::Protocol` if the payload cannot be encoded
    /// - `TransportError::Network` if the write fails
    pub async fn send(&self, payload: Payload) -> Result<SendOutcome, TransportError> {
        let frame = payload.into_frame()?;
        self.send_frame(&frame).await
    }
}

/// Buffered read path for one connection.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: BufReader<R>,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self { inner: BufReader::new(reader) }
    }

    /// Inspect the next frame's type byte without consuming it.
    ///
    /// Waits until at least one byte is available. `None` means the peer
    /// closed the stream.
    ///
    /// # Errors
    ///
    /// - `TransportError::Network` if the read fails
    /// - `TransportError::Protocol` if the byte is not a known packet type
    pub async fn peek_packet_type(&mut self) -> Result<Option<PacketType>, TransportError> {
        let buf = self.inner.fill_buf().await?;
        let Some(&tag) = buf.first() else {
            return Ok(None);
        };

        match PacketType::from_u8(tag) {
            Some(packet_type) => Ok(Some(packet_type)),
            None => Err(ProtocolError::UnknownType(tag).into()),
        }
    }

    /// Read the next complete frame.
    ///
    /// Never returns a frame before all of its payload bytes arrived. `None`
    /// means the peer closed the stream, including mid-frame.
    ///
    /// # Errors
    ///
    /// - `TransportError::Network` if a read fails
    /// - `TransportError::Protocol` if the header names an unknown type
    /// - `TransportError::Resource` if the payload buffer cannot be allocated
    pub async fn recv_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        if self.peek_packet_type().await?.is_none() {
            return Ok(None);
        }

        let mut header = [0u8; FrameHeader::SIZE];
        if !self.read_full(&mut header).await? {
            return Ok(None);
        }
        let header = FrameHeader::from_bytes(&header)?;

        let len = header.payload_len();
        let mut payload = Vec::new();
        payload
            .try_reserve_exact(len)
            .map_err(|_| TransportError::Resource { requested: len })?;
        payload.resize(len, 0);

        if !self.read_full(&mut payload).await? {
            return Ok(None);
        }

        Ok(Some(Frame::from_parts(header, payload)?))
    }

    /// Fill `buf` completely. `false` if the stream ended first.
    async fn read_full(&mut self, buf: &mut [u8]) -> Result<bool, TransportError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Ok(false);
            }
            filled += n;
        }
        Ok(true)
    }
}

/// Socket handle that can shut down both directions of a connection.
pub trait Disconnect: Send + Sync + 'static {
    /// Shut down reads and writes.
    fn disconnect(&self) -> io::Result<()>;
}

impl Disconnect for std::net::TcpStream {
    fn disconnect(&self) -> io::Result<()> {
        self.shutdown(std::net::Shutdown::Both)
    }
}

/// Closes a connection at most once, from whichever task gets there first.
#[derive(Debug)]
pub struct ConnectionCloser<D> {
    handle: D,
    closed: AtomicBool,
}

impl<D: Disconnect> ConnectionCloser<D> {
    /// Wrap a disconnect handle for a live connection.
    pub fn new(handle: D) -> Self {
        Self { handle, closed: AtomicBool::new(false) }
    }

    /// True once the connection has been closed by either side.
    pub fn is_disconnected(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut down both directions.
    ///
    /// Returns `false` without touching the socket if it was already closed,
    /// either through this closer or by the peer.
    ///
    /// # Errors
    ///
    /// Propagates shutdown failures other than "not connected".
    pub fn close(&self) -> io::Result<bool> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }

        match self.handle.disconnect() {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(false),
            Err(err) => Err(err),
        }
    }
}
