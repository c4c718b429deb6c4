//! Channel Descriptors and Quotas
//!
//! A channel is one managed I/O endpoint. Its descriptor carries the
//! direction capabilities, cursors, and two quota pairs per direction.
//!
//! # Descriptor Structure
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ChannelDesc                         │
//! ├──────────────────────────────────────────────────────────┤
//! │  alias, size             - name and declared size        │
//! │  access: Access          - seq/rnd x read/write          │
//! │  getpos, putpos, eof     - cursors                       │
//! │  read:  {ops, bytes}     - (limit, counter) pairs        │
//! │  write: {ops, bytes}     - (limit, counter) pairs        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//! - `counter <= limit` after every completed operation
//! - Cursors only move through `account_read` / `account_write`

use alloc::string::String;

use bitflags::bitflags;

bitflags! {
    /// Direction capabilities of a channel.
    ///
    /// Read and write flags are independent: a channel may be sequentially
    /// readable and randomly writable at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        /// Reads ignore the caller offset and follow `getpos`.
        const SEQ_READ = 1 << 0;
        /// Reads honour the caller offset within the declared size.
        const RND_READ = 1 << 1;
        /// Writes ignore the caller offset and follow `putpos`.
        const SEQ_WRITE = 1 << 2;
        /// Writes honour the caller offset within the byte limit.
        const RND_WRITE = 1 << 3;
    }
}

/// A (limit, counter) budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Maximum allowed value of the counter.
    pub limit: i64,
    /// Amount consumed so far.
    pub count: i64,
}

impl Quota {
    /// A budget that cannot be exhausted in practice.
    pub const UNLIMITED: Self = Self::new(i64::MAX);

    /// A fresh budget with nothing consumed.
    #[inline]
    pub const fn new(limit: i64) -> Self {
        Self { limit, count: 0 }
    }

    /// Whether the counter has reached the limit.
    #[inline]
    pub const fn is_exhausted(&self) -> bool {
        self.count >= self.limit
    }

    /// Budget left before the limit.
    #[inline]
    pub const fn remaining(&self) -> i64 {
        self.limit - self.count
    }

    fn charge(&mut self, amount: i64) {
        debug_assert!(amount <= self.remaining(), "quota overrun");
        self.count = self.count.saturating_add(amount).min(self.limit);
    }
}

/// Operation-count and cumulative-byte budgets for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionQuota {
    /// Number of operations.
    pub ops: Quota,
    /// Cumulative bytes transferred.
    pub bytes: Quota,
}

impl DirectionQuota {
    /// Budgets with the given limits.
    #[inline]
    pub const fn new(ops: i64, bytes: i64) -> Self {
        Self {
            ops: Quota::new(ops),
            bytes: Quota::new(bytes),
        }
    }

    /// No effective limit on either budget.
    pub const UNLIMITED: Self = Self {
        ops: Quota::UNLIMITED,
        bytes: Quota::UNLIMITED,
    };

    /// Both budgets already spent; every operation is refused.
    pub const CLOSED: Self = Self::new(0, 0);

    /// Default budget for a direction the channel may or may not serve.
    const fn open_if(allowed: bool) -> Self {
        if allowed {
            Self::UNLIMITED
        } else {
            Self::CLOSED
        }
    }

    fn charge(&mut self, bytes: i64) {
        self.ops.charge(1);
        self.bytes.charge(bytes);
    }
}

/// One I/O endpoint of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDesc {
    alias: String,
    size: i64,
    access: Access,
    getpos: i64,
    putpos: i64,
    eof: bool,
    read: DirectionQuota,
    write: DirectionQuota,
}

impl ChannelDesc {
    /// Create a channel with zero declared size.
    ///
    /// Directions granted by `access` start unlimited; the others start
    /// [`DirectionQuota::CLOSED`], so the quota check refuses them.
    pub fn new(alias: impl Into<String>, access: Access) -> Self {
        let readable = access.intersects(Access::SEQ_READ.union(Access::RND_READ));
        let writable = access.intersects(Access::SEQ_WRITE.union(Access::RND_WRITE));
        Self {
            alias: alias.into(),
            size: 0,
            access,
            getpos: 0,
            putpos: 0,
            eof: false,
            read: DirectionQuota::open_if(readable),
            write: DirectionQuota::open_if(writable),
        }
    }

    /// Set the declared size.
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    /// Set the read-direction limits.
    pub fn with_read_quota(mut self, ops: i64, bytes: i64) -> Self {
        self.read = DirectionQuota::new(ops, bytes);
        self
    }

    /// Set the write-direction limits.
    pub fn with_write_quota(mut self, ops: i64, bytes: i64) -> Self {
        self.write = DirectionQuota::new(ops, bytes);
        self
    }

    /// Install both budgets as-is, counters included (session restore).
    pub fn with_quotas(mut self, read: DirectionQuota, write: DirectionQuota) -> Self {
        self.read = read;
        self.write = write;
        self
    }

    #[inline]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[inline]
    pub fn size(&self) -> i64 {
        self.size
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    #[inline]
    pub fn getpos(&self) -> i64 {
        self.getpos
    }

    #[inline]
    pub fn putpos(&self) -> i64 {
        self.putpos
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.eof
    }

    #[inline]
    pub fn read_quota(&self) -> &DirectionQuota {
        &self.read
    }

    #[inline]
    pub fn write_quota(&self) -> &DirectionQuota {
        &self.write
    }

    #[inline]
    pub fn is_seq_readable(&self) -> bool {
        self.access.contains(Access::SEQ_READ)
    }

    #[inline]
    pub fn is_seq_writable(&self) -> bool {
        self.access.contains(Access::SEQ_WRITE)
    }

    #[inline]
    pub fn is_rnd_writable(&self) -> bool {
        self.access.contains(Access::RND_WRITE)
    }

    /// Record a completed read of `transferred` bytes at `offset`.
    ///
    /// Called by I/O backends; advances `getpos` and charges one read
    /// operation plus the bytes.
    pub fn account_read(&mut self, offset: i64, transferred: usize) {
        let n = transferred as i64;
        self.getpos = offset.saturating_add(n);
        self.read.charge(n);
    }

    /// Record a completed write of `transferred` bytes at `offset`.
    ///
    /// A random-writable channel grows its declared size when the write
    /// ends past it.
    pub fn account_write(&mut self, offset: i64, transferred: usize) {
        let n = transferred as i64;
        self.putpos = offset.saturating_add(n);
        self.write.charge(n);
        if self.is_rnd_writable() && self.putpos > self.size {
            self.size = self.putpos;
        }
    }

    /// Mark the channel as exhausted for reading.
    #[inline]
    pub fn set_eof(&mut self) {
        self.eof = true;
    }
}
