//! Syscall Tracing
//!
//! Each non-terminating trap (and the terminal Fork/Exit transitions) is
//! recorded with its identifier, first four argument words, and result.
//! Tracing is diagnostic only and never feeds back into dispatch.

use alloc::vec::Vec;

use log::debug;
use spin::Mutex;

use crate::trap::abi::syscall_name;

/// One traced trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Raw syscall identifier.
    pub id: u64,
    /// Argument words 2..=5 of the request block.
    pub args: [u64; 4],
    /// Value returned to the caller, or the exit code for Exit.
    pub result: i64,
}

impl TraceRecord {
    /// Display name of the traced syscall.
    #[inline]
    pub fn name(&self) -> &'static str {
        syscall_name(self.id)
    }
}

/// Sink for trace records.
pub trait Tracer {
    fn record(&self, record: &TraceRecord);
}

/// Tracer that forwards records to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn record(&self, record: &TraceRecord) {
        let [a, b, c, d] = record.args;
        debug!(
            target: "trapgate::trace",
            "{}({:#x}, {:#x}, {:#x}, {:#x}) = {}",
            record.name(),
            a,
            b,
            c,
            d,
            record.result
        );
    }
}

/// Tracer that keeps records in memory.
///
/// Shareable across sessions (wrap it in an `Arc`); forks of one session
/// may append to the same trace.
///
/// The list is unbounded. Long-running hosts must drain it with
/// [`take`](Self::take), or use [`LogTracer`] instead.
#[derive(Debug, Default)]
pub struct MemoryTracer {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<TraceRecord> {
        core::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Tracer for MemoryTracer {
    fn record(&self, record: &TraceRecord) {
        self.records.lock().push(*record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trap::Syscall;

    #[test]
    fn test_memory_tracer_collects_in_order() {
        let tracer = MemoryTracer::new();
        assert!(tracer.is_empty());

        tracer.record(&TraceRecord { id: Syscall::Read.id(), args: [0, 1, 2, 3], result: 2 });
        tracer.record(&TraceRecord { id: 0xdead, args: [0; 4], result: -1 });

        let records = tracer.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "Read");
        assert_eq!(records[1].name(), "unknown");

        assert_eq!(tracer.take().len(), 2);
        assert_eq!(tracer.len(), 0);
    }

    #[test]
    fn test_memory_tracer_shared_between_threads() {
        let tracer = std::sync::Arc::new(MemoryTracer::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tracer = tracer.clone();
                std::thread::spawn(move || {
                    tracer.record(&TraceRecord { id: Syscall::Write.id(), args: [i; 4], result: 0 });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracer.len(), 4);
    }

    #[test]
    fn test_log_tracer_does_not_panic_without_logger() {
        LogTracer.record(&TraceRecord { id: Syscall::Prot.id(), args: [1, 2, 3, 4], result: 0 });
    }
}
