//! Session Lifecycle
//!
//! A [`Session`] is one running instance of the untrusted program: its
//! [`Manifest`] and its terminal [`SessionReport`].
//!
//! # State Machine
//! ```text
//!   Running ──terminate()──▶ Exited
//! ```
//! `terminate` consumes the session, so no further operation on it can be
//! expressed. The report it returns is the only thing left.

use alloc::string::String;
use alloc::vec::Vec;

use log::debug;

use crate::channel::ChannelDesc;
use crate::config::OK_STATE;
use crate::trap::TrapError;

/// Process-wide configuration of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    node: String,
    channels: Vec<ChannelDesc>,
}

impl Manifest {
    /// Create a manifest with no channels.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            channels: Vec::new(),
        }
    }

    /// Append a channel, returning its id.
    pub fn push(&mut self, channel: ChannelDesc) -> usize {
        self.channels.push(channel);
        self.channels.len() - 1
    }

    /// Node identifier.
    #[inline]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Number of channels.
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[inline]
    pub fn channel(&self, id: usize) -> Option<&ChannelDesc> {
        self.channels.get(id)
    }

    #[inline]
    pub fn channel_mut(&mut self, id: usize) -> Option<&mut ChannelDesc> {
        self.channels.get_mut(id)
    }
}

/// Terminal state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// System-level failure code; zero when the host saw no failure.
    pub system_code: i32,
    /// Exit code supplied by the untrusted program.
    pub user_code: u64,
    /// Status string.
    pub state: String,
}

/// Session lifecycle collaborator.
pub trait Lifecycle {
    /// Duplicate the session. The duplicate continues on its own.
    fn fork(&mut self, session: &Session) -> Result<(), TrapError>;

    /// Persist session state for inspection.
    fn save(&mut self, session: &Session);

    /// Irreversibly tear the session down with its final report.
    fn teardown(&mut self, report: &SessionReport);
}

/// One running instance of the untrusted program.
#[derive(Debug)]
pub struct Session {
    manifest: Manifest,
    report: SessionReport,
}

impl Session {
    /// Create a running session.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            report: SessionReport::default(),
        }
    }

    #[inline]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[inline]
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Report as it stands while the session runs.
    #[inline]
    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Record a host-side failure; the final status string is then kept.
    pub fn record_system_failure(&mut self, code: i32, state: impl Into<String>) {
        self.report.system_code = code;
        self.report.state = state.into();
    }

    /// Snapshot the session for diagnostics.
    pub fn save_for_test(&self, lifecycle: &mut dyn Lifecycle) {
        debug!("saving session {}", self.manifest.node());
        lifecycle.save(self);
    }

    /// End the session with the user exit code.
    pub fn terminate(mut self, code: u64, lifecycle: &mut dyn Lifecycle) -> SessionReport {
        self.report.user_code = code;
        if self.report.system_code == 0 {
            self.report.state = String::from(OK_STATE);
        }
        debug!("session {} returned {}", self.manifest.node(), code);
        lifecycle.teardown(&self.report);
        self.report
    }
}
