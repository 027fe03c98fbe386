//! WebRTC signaling over a broadcast relay.
//!
//! Peers exchange session descriptions and ICE candidates through a hub
//! that fans every message out to all other peers:
//! - on connect a peer learns its identifier (`client-id`) and everyone
//!   learns the new connection count (`user-count`)
//! - inbound envelopes are stamped with the sender's identifier and relayed
//!   to everyone except the sender
//! - when a peer leaves, the remaining peers get a fresh `user-count`
//!   followed by a synthetic `stop-sharing` on the departed peer's behalf
//!
//! The hub treats payloads as opaque JSON; filtering by `targetId` is the
//! clients' business.

mod envelope;
mod hub;


pub use envelope::{Envelope, PeerId, CLIENT_ID, STOP_SHARING, USER_COUNT};
pub use hub::SignalingHub;
