//! TDS PreLogin wrapper for TLS handshake.
//!
//! In TDS 7.x, the TLS handshake is wrapped inside TDS PreLogin packets.
//! This wrapper intercepts TLS traffic during the handshake and wraps/unwraps
//! the TDS packet framing.

use std::cmp;
use std::io::{self, Read, Write};

/// TDS packet header size.
const HEADER_SIZE: usize = 8;

/// TDS packet type for PreLogin.
const PACKET_TYPE_PRELOGIN: u8 = 0x12;

/// TDS packet status for end of message.
const PACKET_STATUS_EOM: u8 = 0x01;

/// Wrapper for TLS streams that handles TDS packet framing during handshake.
///
/// During the TLS handshake phase, this wrapper:
/// - Wraps outgoing TLS data in TDS PreLogin packets
/// - Unwraps incoming TDS PreLogin packets before passing to TLS
///
/// After handshake is complete, it becomes a transparent pass-through.
pub struct TlsPreloginWrapper<S> {
    stream: S,
    pending_handshake: bool,

    // Read state
    header_buf: [u8; HEADER_SIZE],
    header_pos: usize,
    read_remaining: usize,

    // Write state
    write_buf: Vec<u8>,
    write_pos: usize,
    header_written: bool,
}

impl<S> TlsPreloginWrapper<S> {
    /// Create a new TLS prelogin wrapper.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending_handshake: true,
            header_buf: [0u8; HEADER_SIZE],
            header_pos: 0,
            read_remaining: 0,
            write_buf: vec![0u8; HEADER_SIZE], // Pre-allocate header space
            write_pos: HEADER_SIZE,            // Start after header
            header_written: false,
        }
    }

    /// Mark the handshake as complete.
    ///
    /// After this is called, the wrapper becomes a transparent pass-through.
    pub fn handshake_complete(&mut self) {
        self.pending_handshake = false;
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the wrapper and return the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read> Read for TlsPreloginWrapper<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.pending_handshake {
            return self.stream.read(buf);
        }

        // First, read the header if we haven't yet
        while self.header_pos < HEADER_SIZE {
            let n = self.stream.read(&mut self.header_buf[self.header_pos..])?;
            if n == 0 {
                return Ok(0);
            }
            self.header_pos += n;
        }

        // Parse the header to get payload length
        if self.read_remaining == 0 {
            let packet_type = self.header_buf[0];
            if packet_type != PACKET_TYPE_PRELOGIN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Expected PreLogin packet (0x12), got 0x{:02X}", packet_type),
                ));
            }

            // Length is big-endian u16 at bytes 2-3
            let length = u16::from_be_bytes([self.header_buf[2], self.header_buf[3]]) as usize;
            self.read_remaining = length.saturating_sub(HEADER_SIZE);

            tracing::trace!("TLS wrapper: reading {} bytes of payload", self.read_remaining);
        }

        // Read the payload (TLS data)
        let max_read = cmp::min(self.read_remaining, buf.len());
        if max_read == 0 {
            return Ok(0);
        }

        let n = self.stream.read(&mut buf[..max_read])?;
        self.read_remaining -= n;

        // If we've read all data for this packet, reset for next packet
        if self.read_remaining == 0 {
            self.header_pos = 0;
        }

        Ok(n)
    }
}

impl<S: Write> Write for TlsPreloginWrapper<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.pending_handshake {
            return self.stream.write(buf);
        }

        // During handshake, buffer the data (we'll wrap it on flush)
        self.write_buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // If in handshake mode and we have buffered data, wrap it in a TDS packet
        if self.pending_handshake && self.write_buf.len() > HEADER_SIZE {
            if !self.header_written {
                let total_length = self.write_buf.len();

                self.write_buf[0] = PACKET_TYPE_PRELOGIN;
                self.write_buf[1] = PACKET_STATUS_EOM;
                self.write_buf[2] = (total_length >> 8) as u8;
                self.write_buf[3] = total_length as u8;
                self.write_buf[4] = 0; // SPID
                self.write_buf[5] = 0; // SPID
                self.write_buf[6] = 1; // Packet ID
                self.write_buf[7] = 0; // Window

                self.header_written = true;
                self.write_pos = 0;

                tracing::trace!("TLS wrapper: sending {} bytes", total_length);
            }

            // Write all buffered data
            while self.write_pos < self.write_buf.len() {
                let n = self.stream.write(&self.write_buf[self.write_pos..])?;
                self.write_pos += n;
            }

            // Reset for next write
            self.write_buf.truncate(HEADER_SIZE);
            self.write_pos = HEADER_SIZE;
            self.header_written = false;
        }

        self.stream.flush()
    }
}
