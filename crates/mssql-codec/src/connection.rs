//! Split I/O connection for cancellation safety.
//!
//! Per ADR-005, the transport is split into independent read and write
//! halves so an Attention packet can be sent on a different OS thread while
//! the connection's owning thread is blocked reading results.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::{Condvar, Mutex};
use tds_protocol::packet::{PacketHeader, PacketStatus, PacketType, PACKET_HEADER_SIZE};

use crate::error::CodecError;
use crate::framed::{PacketReader, PacketWriter};
use crate::message::{Message, MessageAssembler};
use crate::packet_codec::{Packet, TdsCodec};

/// A transport that can be split into an independently readable half and an
/// independently writable half, both usable from different OS threads at the
/// same time.
///
/// Plain TCP sockets support this natively via `try_clone`: the two clones
/// share one underlying file descriptor, so a write on one proceeds even
/// while the other is blocked in `read`. A shared session object (such as a
/// TLS stream) cannot give that guarantee for free; its halves are expected
/// to coordinate internally (see `mssql-tls`'s split wrapper).
pub trait SplitTransport {
    /// The read half of the transport.
    type Reader: Read + Send + 'static;
    /// The write half of the transport.
    type Writer: Write + Send + 'static;

    /// Split this transport into its read and write halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}

impl SplitTransport for std::net::TcpStream {
    type Reader = std::net::TcpStream;
    type Writer = std::net::TcpStream;

    fn split(self) -> (Self::Reader, Self::Writer) {
        let writer = self
            .try_clone()
            .expect("TcpStream::try_clone should not fail on an open socket");
        (self, writer)
    }
}

/// A TDS connection with split I/O for cancellation safety.
///
/// The underlying transport is split into read and write halves, allowing
/// Attention packets to be sent even while a different thread is blocked
/// reading results.
///
/// # Cancellation
///
/// SQL Server uses out-of-band "Attention" packets to cancel running
/// queries. Without split I/O, the driver would have no way to push a
/// cancellation through while a read thread is blocked on a large result
/// set.
///
/// # Example
///
/// ```rust,ignore
/// use mssql_codec::Connection;
/// use std::net::TcpStream;
///
/// let stream = TcpStream::connect("localhost:1433")?;
/// let mut conn = Connection::new(stream);
///
/// // Can cancel from another OS thread while this thread reads.
/// let cancel_handle = conn.cancel_handle();
/// std::thread::spawn(move || {
///     std::thread::sleep(Duration::from_secs(5));
///     cancel_handle.cancel().unwrap();
/// });
/// ```
pub struct Connection<T: SplitTransport> {
    /// Read half wrapped in a packet reader. Owned by whichever thread
    /// drives the connection; never shared.
    reader: PacketReader<T::Reader>,
    /// Write half protected by a mutex for concurrent cancel access.
    writer: Arc<Mutex<PacketWriter<T::Writer>>>,
    /// Message assembler for multi-packet messages.
    assembler: MessageAssembler,
    /// Mutex + condition variable signalling cancellation completion.
    cancel_done: Arc<(Mutex<bool>, Condvar)>,
    /// Flag indicating cancellation is in progress.
    cancelling: Arc<AtomicBool>,
}

impl<T: SplitTransport> Connection<T> {
    /// Create a new connection from a transport.
    ///
    /// The transport is immediately split into read and write halves.
    pub fn new(transport: T) -> Self {
        Self::with_codecs(transport, TdsCodec::new(), TdsCodec::new())
    }

    /// Create a new connection with custom codecs.
    pub fn with_codecs(transport: T, read_codec: TdsCodec, write_codec: TdsCodec) -> Self {
        let (read_half, write_half) = transport.split();

        Self {
            reader: PacketReader::with_codec(read_half, read_codec),
            writer: Arc::new(Mutex::new(PacketWriter::with_codec(write_half, write_codec))),
            assembler: MessageAssembler::new(),
            cancel_done: Arc::new((Mutex::new(false), Condvar::new())),
            cancelling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle for cancelling queries on this connection.
    ///
    /// The handle can be cloned and sent to other threads.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle<T> {
        CancelHandle {
            writer: Arc::clone(&self.writer),
            cancel_done: Arc::clone(&self.cancel_done),
            cancelling: Arc::clone(&self.cancelling),
        }
    }

    /// Check if a cancellation is currently in progress.
    #[must_use]
    pub fn is_cancelling(&self) -> bool {
        self.cancelling.load(Ordering::Acquire)
    }

    /// Block until the next complete message is read from the connection.
    ///
    /// This handles multi-packet message reassembly automatically.
    pub fn read_message(&mut self) -> Result<Option<Message>, CodecError> {
        loop {
            if self.is_cancelling() {
                return self.drain_after_cancel();
            }

            match self.reader.next_packet()? {
                Some(packet) => {
                    if let Some(message) = self.assembler.push(packet) {
                        return Ok(Some(message));
                    }
                    // Continue reading packets until message complete
                }
                None => {
                    if self.assembler.has_partial() {
                        return Err(CodecError::ConnectionClosed);
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Block for a single packet from the connection.
    ///
    /// This is lower-level than `read_message` and doesn't perform
    /// reassembly.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, CodecError> {
        self.reader.next_packet()
    }

    /// Send a packet on the connection.
    pub fn send_packet(&mut self, packet: Packet) -> Result<(), CodecError> {
        self.writer.lock().send_packet(packet)
    }

    /// Send a complete message, splitting into multiple packets if needed.
    pub fn send_message(
        &mut self,
        packet_type: PacketType,
        payload: Bytes,
        max_packet_size: usize,
    ) -> Result<(), CodecError> {
        self.send_message_with_reset(packet_type, payload, max_packet_size, false)
    }

    /// Send a complete message with optional connection reset.
    ///
    /// If `reset_connection` is true, the RESETCONNECTION flag is set on the
    /// first packet. This causes SQL Server to reset connection state (temp
    /// tables, SET options, isolation level, etc.) before executing the
    /// command. Per TDS spec, this flag MUST only be set on the first packet
    /// of a message.
    pub fn send_message_with_reset(
        &mut self,
        packet_type: PacketType,
        payload: Bytes,
        max_packet_size: usize,
        reset_connection: bool,
    ) -> Result<(), CodecError> {
        let max_payload = max_packet_size - PACKET_HEADER_SIZE;
        let chunks: Vec<_> = payload.chunks(max_payload).collect();
        let total_chunks = chunks.len();

        let mut writer = self.writer.lock();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let is_first = i == 0;
            let is_last = i == total_chunks - 1;

            let mut status = if is_last {
                PacketStatus::END_OF_MESSAGE
            } else {
                PacketStatus::NORMAL
            };

            if is_first && reset_connection {
                status |= PacketStatus::RESET_CONNECTION;
            }

            let header = PacketHeader::new(packet_type, status, 0);
            let packet = Packet::new(header, BytesMut::from(chunk));

            writer.send_packet(packet)?;
        }

        Ok(())
    }

    /// Flush the write buffer.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.writer.lock().flush()
    }

    /// Drain packets after cancellation until DONE with ATTENTION is
    /// received.
    fn drain_after_cancel(&mut self) -> Result<Option<Message>, CodecError> {
        tracing::debug!("draining packets after cancellation");

        self.assembler.clear();

        loop {
            match self.reader.next_packet() {
                Ok(Some(packet)) => {
                    if packet.header.packet_type == PacketType::TabularResult
                        && !packet.payload.is_empty()
                        && self.check_attention_done(&packet)
                    {
                        tracing::debug!("received DONE with ATTENTION, cancellation complete");
                        self.cancelling.store(false, Ordering::Release);
                        let (lock, condvar) = &*self.cancel_done;
                        *lock.lock() = true;
                        condvar.notify_all();
                        return Ok(None);
                    }
                    // Continue draining
                }
                Ok(None) => {
                    self.cancelling.store(false, Ordering::Release);
                    return Ok(None);
                }
                Err(e) => {
                    self.cancelling.store(false, Ordering::Release);
                    return Err(e);
                }
            }
        }
    }

    /// Check if a packet contains a DONE token with ATTENTION flag.
    fn check_attention_done(&self, packet: &Packet) -> bool {
        // DONE token: token_type(1) + status(2) + cur_cmd(2) + row_count(8)
        // DONE_ATTN = 0x0020
        let payload = &packet.payload;

        for i in 0..payload.len() {
            if payload[i] == 0xFD && i + 3 <= payload.len() {
                let status = u16::from_le_bytes([payload[i + 1], payload[i + 2]]);
                if status & 0x0020 != 0 {
                    return true;
                }
            }
        }

        false
    }

    /// Get a reference to the read codec.
    pub fn read_codec(&self) -> &TdsCodec {
        self.reader.codec()
    }

    /// Get a mutable reference to the read codec.
    pub fn read_codec_mut(&mut self) -> &mut TdsCodec {
        self.reader.codec_mut()
    }
}

impl<T: SplitTransport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("cancelling", &self.is_cancelling())
            .field("has_partial_message", &self.assembler.has_partial())
            .finish_non_exhaustive()
    }
}

/// Handle for cancelling queries on a connection.
///
/// This can be cloned and sent to other threads to enable cancellation
/// from a thread other than the one driving the connection's reads.
pub struct CancelHandle<T: SplitTransport> {
    writer: Arc<Mutex<PacketWriter<T::Writer>>>,
    cancel_done: Arc<(Mutex<bool>, Condvar)>,
    cancelling: Arc<AtomicBool>,
}

impl<T: SplitTransport> CancelHandle<T> {
    /// Send an Attention packet to cancel the current query.
    ///
    /// This can be called from a different thread while the connection's
    /// owning thread is blocked reading results.
    pub fn cancel(&self) -> Result<(), CodecError> {
        self.cancelling.store(true, Ordering::Release);
        *self.cancel_done.0.lock() = false;

        tracing::debug!("sending Attention packet for query cancellation");

        let mut writer = self.writer.lock();

        let header = PacketHeader::new(
            PacketType::Attention,
            PacketStatus::END_OF_MESSAGE,
            PACKET_HEADER_SIZE as u16,
        );
        let packet = Packet::new(header, BytesMut::new());

        writer.send_packet(packet)?;
        writer.flush()?;

        Ok(())
    }

    /// Block until the cancellation completes.
    ///
    /// Waits until the server acknowledges the cancellation with a DONE
    /// token containing the ATTENTION flag.
    pub fn wait_cancelled(&self) {
        if self.cancelling.load(Ordering::Acquire) {
            let (lock, condvar) = &*self.cancel_done;
            let mut done = lock.lock();
            while !*done {
                condvar.wait(&mut done);
            }
        }
    }

    /// Check if a cancellation is currently in progress.
    #[must_use]
    pub fn is_cancelling(&self) -> bool {
        self.cancelling.load(Ordering::Acquire)
    }
}

impl<T: SplitTransport> Clone for CancelHandle<T> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            cancel_done: Arc::clone(&self.cancel_done),
            cancelling: Arc::clone(&self.cancelling),
        }
    }
}

impl<T: SplitTransport> std::fmt::Debug for CancelHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelling", &self.is_cancelling())
            .finish_non_exhaustive()
    }
}
