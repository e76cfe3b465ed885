//! # mssql-codec
//!
//! Blocking framing layer for TDS packet handling.
//!
//! This crate transforms raw byte streams into high-level TDS packets,
//! handling packet reassembly across TCP segment boundaries and packet
//! continuation for large messages. All I/O is blocking: a `Connection`
//! is driven by whichever OS thread owns it, and reads/writes go straight
//! through `std::io::{Read, Write}` with no hidden suspension points.
//!
//! ## Features
//!
//! - Packet reassembly across TCP segments
//! - Message reassembly from multiple packets
//! - IO splitting for cancellation safety (ADR-005)
//!
//! ## Architecture
//!
//! The codec layer sits between raw TCP streams and the higher-level client:
//!
//! ```text
//! TCP Stream → TdsCodec (packet framing) → MessageAssembler → Client
//! ```
//!
//! ### Cancellation Safety
//!
//! Per ADR-005, the connection splits the transport into read and write
//! halves. This allows sending Attention packets for query cancellation
//! from a different OS thread even while the connection's owning thread is
//! blocked reading a large result set.
//!
//! ```rust,ignore
//! use mssql_codec::Connection;
//!
//! let mut conn = Connection::new(tcp_stream);
//! let cancel = conn.cancel_handle();
//!
//! std::thread::spawn(move || {
//!     cancel.cancel().unwrap();
//! });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod framed;
pub mod message;
pub mod packet_codec;

pub use connection::{CancelHandle, Connection, SplitTransport};
pub use error::CodecError;
pub use framed::{PacketReader, PacketStream, PacketWriter};
pub use message::{Message, MessageAssembler};
pub use packet_codec::{Packet, TdsCodec};
