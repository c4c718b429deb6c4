//! Channel Read/Write Handlers
//!
//! Implements the Read and Write traps against a session's manifest.
//!
//! # Security Considerations
//! - Checks run in a fixed order and the first failure wins
//! - Untrusted buffers are range-checked for the full requested size
//!   before any byte moves
//! - Quotas are enforced before the transfer; when one fires nothing is
//!   transferred
//! - A write may never start beyond the declared size plus the remaining
//!   write allowance, so channels cannot be extended sparsely

use log::{debug, trace};

use super::desc::ChannelDesc;
use crate::mem::{validate_user_read, validate_user_write, UserAddr, UserMemory};
use crate::session::Manifest;
use crate::trap::{TrapError, TrapResult};

/// Underlying channel I/O collaborator.
///
/// Implementations move the bytes and then account for them through
/// [`ChannelDesc::account_read`] / [`ChannelDesc::account_write`], which
/// advance the cursor and both counters.
pub trait ChannelIo {
    /// Read into `buf` from `offset`; may transfer fewer bytes than asked.
    fn read(
        &mut self,
        id: usize,
        channel: &mut ChannelDesc,
        buf: &mut [u8],
        offset: i64,
    ) -> Result<usize, TrapError>;

    /// Write `buf` at `offset`; may transfer fewer bytes than asked.
    fn write(
        &mut self,
        id: usize,
        channel: &mut ChannelDesc,
        buf: &[u8],
        offset: i64,
    ) -> Result<usize, TrapError>;
}

/// Arguments of a Read or Write trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoRequest {
    /// Channel id (index into the manifest).
    pub channel: i32,
    /// Untrusted buffer.
    pub buffer: UserAddr,
    /// Requested size in bytes.
    pub size: i32,
    /// Requested offset (ignored by sequential channels).
    pub offset: i64,
}

/// Read from a channel into an untrusted buffer.
///
/// Returns the number of bytes read.
pub fn read(
    manifest: &mut Manifest,
    memory: &mut dyn UserMemory,
    io: &mut dyn ChannelIo,
    req: IoRequest,
) -> TrapResult {
    let (id, channel) = lookup(manifest, &req)?;
    trace!(
        "channel {}, buffer={}, size={}, offset={}",
        channel.alias(),
        req.buffer,
        req.size,
        req.offset
    );

    if req.size < 0 {
        return Err(TrapError::Fault);
    }
    if req.offset < 0 {
        return Err(TrapError::InvalidArgument);
    }
    if req.size == 0 {
        return Ok(0);
    }

    let mut buf = validate_user_write(memory, req.buffer, req.size as usize)?;

    let mut size = i64::from(req.size);
    let mut offset = req.offset;

    if channel.is_seq_readable() {
        offset = channel.getpos();
    } else {
        // never past the end of a random access channel
        size = size.min(channel.size() - offset);
        if size <= 0 {
            return Ok(0);
        }
    }

    if channel.eof() {
        return Ok(0);
    }

    let quota = channel.read_quota();
    if quota.ops.is_exhausted() {
        return Err(TrapError::QuotaExceeded);
    }
    size = size.min(quota.bytes.remaining());
    if size < 1 {
        return Err(TrapError::QuotaExceeded);
    }

    let n = io.read(id, channel, &mut buf.as_bytes_mut()[..size as usize], offset)?;
    Ok(n as i32)
}

/// Write an untrusted buffer to a channel.
///
/// Returns the number of bytes written.
pub fn write(
    manifest: &mut Manifest,
    memory: &dyn UserMemory,
    io: &mut dyn ChannelIo,
    req: IoRequest,
) -> TrapResult {
    let (id, channel) = lookup(manifest, &req)?;
    trace!(
        "channel {}, buffer={}, size={}, offset={}",
        channel.alias(),
        req.buffer,
        req.size,
        req.offset
    );

    if req.size < 0 {
        return Err(TrapError::Fault);
    }
    if req.offset < 0 {
        return Err(TrapError::InvalidArgument);
    }
    if req.size == 0 {
        return Ok(0);
    }

    let buf = validate_user_read(memory, req.buffer, req.size as usize)?;

    let offset = if channel.is_seq_writable() {
        channel.putpos()
    } else {
        req.offset
    };

    let quota = channel.write_quota();
    if quota.ops.is_exhausted() {
        return Err(TrapError::QuotaExceeded);
    }
    let tail = quota.bytes.remaining();

    if channel.is_rnd_writable() && offset >= quota.bytes.limit {
        return Err(TrapError::InvalidArgument);
    }
    if offset >= channel.size().saturating_add(tail) {
        return Err(TrapError::InvalidArgument);
    }

    let size = i64::from(req.size).min(tail);
    if size < 1 {
        return Err(TrapError::QuotaExceeded);
    }

    let n = io.write(id, channel, &buf.as_bytes()[..size as usize], offset)?;
    Ok(n as i32)
}

/// Resolve a channel id against the manifest.
fn lookup<'m>(
    manifest: &'m mut Manifest,
    req: &IoRequest,
) -> Result<(usize, &'m mut ChannelDesc), TrapError> {
    let found = usize::try_from(req.channel)
        .ok()
        .and_then(|id| manifest.channel_mut(id).map(|channel| (id, channel)));

    found.ok_or_else(|| {
        debug!(
            "channel_id={}, buffer={}, size={}, offset={}",
            req.channel, req.buffer, req.size, req.offset
        );
        TrapError::InvalidArgument
    })
}
