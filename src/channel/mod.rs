//! Channel I/O Manager
//!
//! Owns per-channel cursors, counters, and quota enforcement for the Read
//! and Write traps.
//!
//! # Design
//! - Channels are addressed by their index in the session manifest
//! - Direction capabilities decide whether the caller offset is honoured
//! - Byte movement is delegated to a [`ChannelIo`] backend
//!
//! # Security Properties
//! - Quota counters never exceed their limits
//! - No bytes move when a check fails

mod buffered;
mod desc;
mod handler;

pub use buffered::{BufferedChannels, STORE_LIMIT};
pub use desc::{Access, ChannelDesc, DirectionQuota, Quota};
pub use handler::{read, write, ChannelIo, IoRequest};
