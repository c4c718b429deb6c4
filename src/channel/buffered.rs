//! In-Memory Channel Backend
//!
//! A [`ChannelIo`] implementation keeping one byte store per channel.
//! Useful for hosts that stage channel contents in memory and for tests.
//!
//! # Behaviour
//! - Sequential reads that find nothing mark the channel EOF
//! - Writes past the end of a store zero-fill the gap
//! - Stores never grow beyond [`STORE_LIMIT`]

use alloc::vec::Vec;

use super::desc::ChannelDesc;
use super::handler::ChannelIo;
use crate::trap::error::errno;
use crate::trap::TrapError;

/// Largest size a single store may reach (1 GiB).
pub const STORE_LIMIT: usize = 1 << 30;

/// Byte stores indexed by channel id.
#[derive(Debug, Default)]
pub struct BufferedChannels {
    stores: Vec<Vec<u8>>,
}

impl BufferedChannels {
    /// Create a backend with no staged data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the contents of channel `id`, replacing what was there.
    pub fn stage(&mut self, id: usize, data: impl Into<Vec<u8>>) {
        *self.store_mut(id) = data.into();
    }

    /// Current contents of channel `id`.
    pub fn contents(&self, id: usize) -> &[u8] {
        self.stores.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn store_mut(&mut self, id: usize) -> &mut Vec<u8> {
        if self.stores.len() <= id {
            self.stores.resize_with(id + 1, Vec::new);
        }
        &mut self.stores[id]
    }
}

impl ChannelIo for BufferedChannels {
    fn read(
        &mut self,
        id: usize,
        channel: &mut ChannelDesc,
        buf: &mut [u8],
        offset: i64,
    ) -> Result<usize, TrapError> {
        let start = usize::try_from(offset).map_err(|_| TrapError::InvalidArgument)?;
        let store = self.contents(id);
        let available = store.len().saturating_sub(start);
        let n = buf.len().min(available);

        if n > 0 {
            buf[..n].copy_from_slice(&store[start..start + n]);
        } else if channel.is_seq_readable() {
            channel.set_eof();
        }
        channel.account_read(offset, n);
        Ok(n)
    }

    fn write(
        &mut self,
        id: usize,
        channel: &mut ChannelDesc,
        buf: &[u8],
        offset: i64,
    ) -> Result<usize, TrapError> {
        let start = usize::try_from(offset).map_err(|_| TrapError::InvalidArgument)?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= STORE_LIMIT)
            .ok_or(TrapError::Os(errno::EFBIG))?;

        let store = self.store_mut(id);
        if store.len() < end {
            store.resize(end, 0);
        }
        store[start..end].copy_from_slice(buf);
        channel.account_write(offset, buf.len());
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Access;

    #[test]
    fn test_sequential_read_sets_eof_when_drained() {
        let mut io = BufferedChannels::new();
        io.stage(0, b"abc".to_vec());
        let mut ch = ChannelDesc::new("stdin", Access::SEQ_READ);
        let mut buf = [0u8; 8];

        assert_eq!(io.read(0, &mut ch, &mut buf, 0), Ok(3));
        assert_eq!(&buf[..3], b"abc");
        assert!(!ch.eof());

        let pos = ch.getpos();
        assert_eq!(io.read(0, &mut ch, &mut buf, pos), Ok(0));
        assert!(ch.eof());
    }

    #[test]
    fn test_write_zero_fills_gap() {
        let mut io = BufferedChannels::new();
        let mut ch = ChannelDesc::new("image", Access::RND_WRITE);
        assert_eq!(io.write(2, &mut ch, b"xy", 3), Ok(2));
        assert_eq!(io.contents(2), &[0, 0, 0, b'x', b'y']);
        assert_eq!(ch.size(), 5);
        assert!(io.contents(1).is_empty());
    }

    #[test]
    fn test_store_limit() {
        let mut io = BufferedChannels::new();
        let mut ch = ChannelDesc::new("image", Access::RND_WRITE);
        assert_eq!(
            io.write(0, &mut ch, b"x", STORE_LIMIT as i64),
            Err(TrapError::Os(errno::EFBIG))
        );
        assert_eq!(ch.write_quota().ops.count, 0);
    }
}
