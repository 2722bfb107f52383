//! Wire protocol for Gamehall.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientFrame`], [`ServerFrame`], [`ClientId`], etc.):
//!   the JSON frames that travel on the wire, one frame per logical event.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the room and
//! session layers. It doesn't know about connections or rooms: it only
//! knows how to serialize and deserialize frames.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientFrame / ServerFrame) → Router
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientFrame, ClientId, GameEndReason, MemberSummary, RoomMessage,
    RoomSummary, ServerFrame,
};
