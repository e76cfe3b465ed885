//! Packet framing over blocking I/O.
//!
//! This module provides three framing types, all built on plain
//! `std::io::{Read, Write}` transports and the inherent `TdsCodec` methods:
//! - `PacketStream<T>` - combined read/write framing for bidirectional I/O
//! - `PacketReader<T>` - read-only framing for receiving packets
//! - `PacketWriter<T>` - write-only framing for sending packets
//!
//! The split types are used by `Connection` to hold independent handles to
//! the two directions of a transport, so a cancelling write can proceed
//! while a read is blocked (ADR-005).

use std::io::{self, Read, Write};

use bytes::BytesMut;

use crate::error::CodecError;
use crate::packet_codec::{Packet, TdsCodec};

/// Bytes read from the transport per `read` syscall while filling the codec buffer.
const READ_CHUNK: usize = 8192;

fn map_read_error(err: io::Error) -> CodecError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => CodecError::Timeout,
        _ => CodecError::Io(err),
    }
}

/// A combined packet stream over a blocking transport that is both
/// readable and writable (used before a connection is split).
pub struct PacketStream<T> {
    transport: T,
    codec: TdsCodec,
    buffer: BytesMut,
}

impl<T> PacketStream<T>
where
    T: Read + Write,
{
    /// Create a new packet stream over the given transport.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, TdsCodec::new())
    }

    /// Create a new packet stream with a custom codec.
    pub fn with_codec(transport: T, codec: TdsCodec) -> Self {
        Self {
            transport,
            codec,
            buffer: BytesMut::new(),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get a reference to the codec.
    pub fn codec(&self) -> &TdsCodec {
        &self.codec
    }

    /// Get a mutable reference to the codec.
    pub fn codec_mut(&mut self) -> &mut TdsCodec {
        &mut self.codec
    }

    /// Consume the stream and return the underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Get a reference to the read buffer.
    pub fn read_buffer(&self) -> &BytesMut {
        &self.buffer
    }

    /// Get a mutable reference to the read buffer.
    pub fn read_buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Block until one full packet has been read, or the transport is
    /// exhausted. Returns `Ok(None)` on clean EOF with no partial message
    /// buffered; a read that hits EOF mid-message surfaces as an error from
    /// the caller's message assembler, not from this layer.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, CodecError> {
        read_next_packet(&mut self.transport, &mut self.codec, &mut self.buffer)
    }

    /// Encode and write one packet to the transport. Does not flush.
    pub fn send_packet(&mut self, packet: Packet) -> Result<(), CodecError> {
        write_packet(&mut self.transport, &mut self.codec, packet)
    }

    /// Flush any buffered writes to the transport.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.transport.flush().map_err(CodecError::Io)
    }
}

impl<T> std::fmt::Debug for PacketStream<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketStream")
            .field("transport", &self.transport)
            .finish()
    }
}

/// A read-only packet framer for receiving TDS packets.
///
/// This is used for the read half of a split connection, so a concurrent
/// cancelling write can reach the transport without waiting on an
/// in-progress blocking read (ADR-005).
pub struct PacketReader<T> {
    transport: T,
    codec: TdsCodec,
    buffer: BytesMut,
}

impl<T> PacketReader<T>
where
    T: Read,
{
    /// Create a new packet reader over the given transport.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, TdsCodec::new())
    }

    /// Create a new packet reader with a custom codec.
    pub fn with_codec(transport: T, codec: TdsCodec) -> Self {
        Self {
            transport,
            codec,
            buffer: BytesMut::new(),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get a reference to the codec.
    pub fn codec(&self) -> &TdsCodec {
        &self.codec
    }

    /// Get a mutable reference to the codec.
    pub fn codec_mut(&mut self) -> &mut TdsCodec {
        &mut self.codec
    }

    /// Get a reference to the read buffer.
    pub fn read_buffer(&self) -> &BytesMut {
        &self.buffer
    }

    /// Get a mutable reference to the read buffer.
    pub fn read_buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Block on the transport until one full packet is decoded, or EOF.
    ///
    /// A transport configured with a read timeout (`set_read_timeout`)
    /// surfaces `CodecError::Timeout` instead of blocking forever, so the
    /// caller can re-check a cancellation flag between attempts.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, CodecError> {
        read_next_packet(&mut self.transport, &mut self.codec, &mut self.buffer)
    }
}

impl<T> std::fmt::Debug for PacketReader<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketReader")
            .field("transport", &self.transport)
            .finish()
    }
}

/// A write-only packet framer for sending TDS packets.
///
/// This is used for the write half of a split connection (ADR-005).
pub struct PacketWriter<T> {
    transport: T,
    codec: TdsCodec,
}

impl<T> PacketWriter<T>
where
    T: Write,
{
    /// Create a new packet writer over the given transport.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, TdsCodec::new())
    }

    /// Create a new packet writer with a custom codec.
    pub fn with_codec(transport: T, codec: TdsCodec) -> Self {
        Self { transport, codec }
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get a reference to the codec.
    pub fn codec(&self) -> &TdsCodec {
        &self.codec
    }

    /// Get a mutable reference to the codec.
    pub fn codec_mut(&mut self) -> &mut TdsCodec {
        &mut self.codec
    }

    /// Encode and write one packet to the transport. Does not flush.
    pub fn send_packet(&mut self, packet: Packet) -> Result<(), CodecError> {
        write_packet(&mut self.transport, &mut self.codec, packet)
    }

    /// Flush any buffered writes to the transport.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.transport.flush().map_err(CodecError::Io)
    }
}

impl<T> std::fmt::Debug for PacketWriter<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketWriter")
            .field("transport", &self.transport)
            .finish()
    }
}

fn read_next_packet<T: Read>(
    transport: &mut T,
    codec: &mut TdsCodec,
    buffer: &mut BytesMut,
) -> Result<Option<Packet>, CodecError> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(packet) = codec.decode(buffer)? {
            return Ok(Some(packet));
        }
        match transport.read(&mut chunk) {
            Ok(0) => {
                return if buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(CodecError::ConnectionClosed)
                };
            }
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(map_read_error(e)),
        }
    }
}

fn write_packet<T: Write>(
    transport: &mut T,
    codec: &mut TdsCodec,
    packet: Packet,
) -> Result<(), CodecError> {
    let mut dst = BytesMut::new();
    codec.encode(packet, &mut dst)?;
    transport.write_all(&dst).map_err(CodecError::Io)
}
