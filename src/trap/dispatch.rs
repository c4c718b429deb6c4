//! Trap Dispatcher
//!
//! Decodes the untrusted request block and routes it to a handler.
//!
//! # Security Considerations
//! - The block pointer must leave room for all 48 bytes below the top of
//!   the address space; this is checked before translation
//! - Unknown syscall ids are refused with EPERM and the session continues
//! - Each handler validates its own arguments
//! - Exit, a successful Fork, and Test consume the session; no trap result
//!   is produced for them

use log::{debug, error};

use super::abi::{syscall_name, Syscall, TrapBlock, TrapRequest};
use super::error::{into_retcode, TrapError};
use crate::channel::{self, ChannelIo};
use crate::config::{TrapConfig, TRAP_BLOCK_SIZE};
use crate::mem::{self, CodeValidator, UserAddr, UserMemory};
use crate::session::{Lifecycle, Session, SessionReport};
use crate::trace::{TraceRecord, Tracer};

/// Collaborators the dispatcher drives.
pub struct Host<'a> {
    /// Address translation, range checks, protection changes.
    pub memory: &'a mut dyn UserMemory,
    /// Instruction-stream validator.
    pub validator: &'a dyn CodeValidator,
    /// Channel byte movement.
    pub io: &'a mut dyn ChannelIo,
    /// Fork, save, teardown.
    pub lifecycle: &'a mut dyn Lifecycle,
    /// Diagnostic trace sink.
    pub tracer: &'a dyn Tracer,
}

/// What became of the session after a trap.
#[derive(Debug)]
pub enum TrapOutcome {
    /// Control returns to the untrusted program with `retcode`.
    Resume { session: Session, retcode: i32 },
    /// The session ended; this is its final report.
    Exited(SessionReport),
}

impl TrapOutcome {
    /// Return code, if the session resumes.
    pub fn retcode(&self) -> Option<i32> {
        match self {
            Self::Resume { retcode, .. } => Some(*retcode),
            Self::Exited(_) => None,
        }
    }
}

/// Trap dispatcher for one host.
pub struct Dispatcher<'a> {
    config: TrapConfig,
    host: Host<'a>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(config: TrapConfig, host: Host<'a>) -> Self {
        Self { config, host }
    }

    /// Handle one trap whose request block sits at untrusted address `args`.
    pub fn handle(&mut self, mut session: Session, args: u64) -> TrapOutcome {
        let block = match self.fetch(args) {
            Ok(block) => block,
            Err(e) => {
                debug!("trap block at {:#x} rejected: {}", args, e);
                return TrapOutcome::Resume {
                    session,
                    retcode: e.code(),
                };
            }
        };

        let id = block.id();
        let name = syscall_name(id);
        debug!("{} called", name);

        let result = match block.decode() {
            TrapRequest::Fork => match self.host.lifecycle.fork(&session) {
                Ok(()) => {
                    self.trace(Syscall::FORK_ID, block.args(), 0);
                    self.trace(Syscall::EXIT_ID, [0; 4], 0);
                    return self.exit(session, 0);
                }
                Err(e) => Err(e),
            },
            TrapRequest::Exit { code } => {
                self.trace(id, block.args(), code as i64);
                return self.exit(session, code);
            }
            TrapRequest::Read(req) => channel::read(
                session.manifest_mut(),
                &mut *self.host.memory,
                &mut *self.host.io,
                req,
            ),
            TrapRequest::Write(req) => channel::write(
                session.manifest_mut(),
                &*self.host.memory,
                &mut *self.host.io,
                req,
            ),
            TrapRequest::Prot { addr, size, prot } => mem::protect(
                &self.config,
                &mut *self.host.memory,
                self.host.validator,
                addr,
                size,
                prot,
            ),
            TrapRequest::Test => {
                session.save_for_test(&mut *self.host.lifecycle);
                return self.exit(session, 0);
            }
            TrapRequest::Unsupported { id } => {
                error!("function {:#x} is not supported", id);
                Err(TrapError::NotPermitted)
            }
        };

        let retcode = into_retcode(result);
        debug!("{} returned {}", name, retcode);
        self.trace(id, block.args(), i64::from(retcode));
        TrapOutcome::Resume { session, retcode }
    }

    /// Bounds-check, translate, and copy out the request block.
    fn fetch(&self, args: u64) -> Result<TrapBlock, TrapError> {
        if args > self.config.last_block_address() {
            return Err(TrapError::Fault);
        }
        let sys = self.host.memory.to_sys(UserAddr::new(args));
        let bytes = self
            .host
            .memory
            .bytes(sys, TRAP_BLOCK_SIZE as usize)
            .ok_or(TrapError::Fault)?;
        TrapBlock::from_bytes(bytes).ok_or(TrapError::Fault)
    }

    fn exit(&mut self, session: Session, code: u64) -> TrapOutcome {
        TrapOutcome::Exited(session.terminate(code, &mut *self.host.lifecycle))
    }

    fn trace(&self, id: u64, args: [u64; 4], result: i64) {
        self.host.tracer.record(&TraceRecord { id, args, result });
    }
}
