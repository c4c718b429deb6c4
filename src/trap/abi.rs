//! Trap ABI
//!
//! The untrusted program issues one trap carrying a pointer to six
//! consecutive 64-bit words:
//!
//! ```text
//! ┌────────────┬──────────┬──────┬──────┬──────┬──────┐
//! │ syscall_id │ reserved │ arg1 │ arg2 │ arg3 │ arg4 │
//! └────────────┴──────────┴──────┴──────┴──────┴──────┘
//! ```
//!
//! The block is decoded once into a [`TrapRequest`]; every field is
//! narrowed to its type here and nowhere else.

use crate::channel::IoRequest;
use crate::config::TRAP_BLOCK_WORDS;
use crate::mem::UserAddr;

/// Build a syscall identifier from its four-byte ASCII tag.
const fn tag(name: &[u8; 4]) -> u64 {
    u32::from_le_bytes(*name) as u64
}

/// Supported syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    Fork,
    Exit,
    Read,
    Write,
    Prot,
    Test,
}

impl Syscall {
    /// Syscall identifiers
    pub const FORK_ID: u64 = tag(b"Fork");
    pub const EXIT_ID: u64 = tag(b"Exit");
    pub const READ_ID: u64 = tag(b"Read");
    pub const WRITE_ID: u64 = tag(b"Writ");
    pub const PROT_ID: u64 = tag(b"Prot");
    pub const TEST_ID: u64 = tag(b"Test");

    /// Look up a raw identifier. Unknown ids yield `None`.
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            Self::FORK_ID => Some(Self::Fork),
            Self::EXIT_ID => Some(Self::Exit),
            Self::READ_ID => Some(Self::Read),
            Self::WRITE_ID => Some(Self::Write),
            Self::PROT_ID => Some(Self::Prot),
            Self::TEST_ID => Some(Self::Test),
            _ => None,
        }
    }

    /// Raw identifier of this syscall.
    pub const fn id(self) -> u64 {
        match self {
            Self::Fork => Self::FORK_ID,
            Self::Exit => Self::EXIT_ID,
            Self::Read => Self::READ_ID,
            Self::Write => Self::WRITE_ID,
            Self::Prot => Self::PROT_ID,
            Self::Test => Self::TEST_ID,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fork => "Fork",
            Self::Exit => "Exit",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Prot => "Prot",
            Self::Test => "Test",
        }
    }
}

/// Display name for a raw identifier.
pub fn syscall_name(id: u64) -> &'static str {
    Syscall::from_id(id).map_or("unknown", Syscall::name)
}

/// Raw request block as copied out of untrusted memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapBlock {
    words: [u64; TRAP_BLOCK_WORDS],
}

impl TrapBlock {
    /// Wrap already-decoded words.
    #[inline]
    pub const fn new(words: [u64; TRAP_BLOCK_WORDS]) -> Self {
        Self { words }
    }

    /// Decode a block from native-endian bytes.
    ///
    /// Returns `None` if fewer than 48 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut words = [0u64; TRAP_BLOCK_WORDS];
        let mut chunks = bytes.chunks_exact(8);
        for word in words.iter_mut() {
            let chunk = chunks.next()?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *word = u64::from_ne_bytes(raw);
        }
        Some(Self { words })
    }

    /// Syscall identifier (word 0).
    #[inline]
    pub const fn id(&self) -> u64 {
        self.words[0]
    }

    /// Argument words 2..=5.
    #[inline]
    pub fn args(&self) -> [u64; 4] {
        [self.words[2], self.words[3], self.words[4], self.words[5]]
    }

    /// Decode into a typed request.
    pub fn decode(&self) -> TrapRequest {
        let [a1, a2, a3, a4] = self.args();
        match Syscall::from_id(self.id()) {
            Some(Syscall::Fork) => TrapRequest::Fork,
            Some(Syscall::Exit) => TrapRequest::Exit { code: a1 },
            Some(Syscall::Read) => TrapRequest::Read(io_request(a1, a2, a3, a4)),
            Some(Syscall::Write) => TrapRequest::Write(io_request(a1, a2, a3, a4)),
            Some(Syscall::Prot) => TrapRequest::Prot {
                addr: UserAddr::new(u64::from(a1 as u32)),
                size: a2 as u32,
                prot: a3 as u32 as i32,
            },
            Some(Syscall::Test) => TrapRequest::Test,
            None => TrapRequest::Unsupported { id: self.id() },
        }
    }
}

/// Channel id and size are signed 32-bit; the offset is a full signed word.
fn io_request(channel: u64, buffer: u64, size: u64, offset: u64) -> IoRequest {
    IoRequest {
        channel: channel as u32 as i32,
        buffer: UserAddr::new(buffer),
        size: size as u32 as i32,
        offset: offset as i64,
    }
}

/// A decoded trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapRequest {
    /// Duplicate the session; the caller's context ends on success.
    Fork,
    /// End the session.
    Exit { code: u64 },
    /// Read from a channel.
    Read(IoRequest),
    /// Write to a channel.
    Write(IoRequest),
    /// Change memory protection.
    Prot { addr: UserAddr, size: u32, prot: i32 },
    /// Snapshot the session, then end it.
    Test,
    /// Identifier outside the supported set.
    Unsupported { id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_ascii_tags() {
        assert_eq!(Syscall::READ_ID, 0x6461_6552);
        assert_eq!(Syscall::WRITE_ID, 0x7469_7257);
        assert_eq!(Syscall::from_id(Syscall::PROT_ID), Some(Syscall::Prot));
        assert_eq!(Syscall::from_id(0), None);
        assert_eq!(syscall_name(Syscall::TEST_ID), "Test");
        assert_eq!(syscall_name(7), "unknown");
    }

    #[test]
    fn test_from_bytes_needs_full_block() {
        let mut bytes = [0u8; 48];
        bytes[..8].copy_from_slice(&Syscall::EXIT_ID.to_ne_bytes());
        bytes[16..24].copy_from_slice(&9u64.to_ne_bytes());

        let block = TrapBlock::from_bytes(&bytes).unwrap();
        assert_eq!(block.decode(), TrapRequest::Exit { code: 9 });
        assert!(TrapBlock::from_bytes(&bytes[..40]).is_none());
    }

    #[test]
    fn test_io_arguments_are_narrowed() {
        let block = TrapBlock::new([
            Syscall::READ_ID,
            0xffff,
            0x1_0000_0002,
            0x2000,
            0xffff_ffff,
            u64::MAX,
        ]);
        let TrapRequest::Read(req) = block.decode() else {
            panic!("expected a read");
        };
        assert_eq!(req.channel, 2);
        assert_eq!(req.buffer, UserAddr::new(0x2000));
        assert_eq!(req.size, -1);
        assert_eq!(req.offset, -1);
    }

    #[test]
    fn test_prot_arguments_are_narrowed() {
        let block = TrapBlock::new([Syscall::PROT_ID, 0, 0x7_0001_0000, 0x1_0001_0000, 5, 0]);
        assert_eq!(
            block.decode(),
            TrapRequest::Prot {
                addr: UserAddr::new(0x1_0000),
                size: 0x1_0000,
                prot: 5
            }
        );
    }

    #[test]
    fn test_unknown_id() {
        let block = TrapBlock::new([0x1234, 0, 0, 0, 0, 0]);
        assert_eq!(block.decode(), TrapRequest::Unsupported { id: 0x1234 });
    }
}
