use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Still running, or never started.
    None,
    Normal,
    SendError,
    RecvError,
    ConnectError,
    /// The control task ended without producing a report.
    Aborted,
}

impl ExitCode {
    const fn to_u8(self) -> u8 {
        match self {
            ExitCode::None => 0,
            ExitCode::Normal => 1,
            ExitCode::SendError => 2,
            ExitCode::RecvError => 3,
            ExitCode::ConnectError => 4,
            ExitCode::Aborted => 5,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => ExitCode::Normal,
            2 => ExitCode::SendError,
            3 => ExitCode::RecvError,
            4 => ExitCode::ConnectError,
            5 => ExitCode::Aborted,
            _ => ExitCode::None,
        }
    }

    /// Whether this code counts toward the run's error tally.
    #[must_use]
    pub const fn is_abnormal(self) -> bool {
        matches!(
            self,
            ExitCode::SendError | ExitCode::RecvError | ExitCode::ConnectError | ExitCode::Aborted
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExitCode::None => "none",
            ExitCode::Normal => "normal",
            ExitCode::SendError => "send-error",
            ExitCode::RecvError => "recv-error",
            ExitCode::ConnectError => "connect-error",
            ExitCode::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Created → Connected → Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerPhase {
    Created,
    Connected,
    Running,
    Draining,
    Stopped,
}

impl WorkerPhase {
    const fn to_u8(self) -> u8 {
        match self {
            WorkerPhase::Created => 0,
            WorkerPhase::Connected => 1,
            WorkerPhase::Running => 2,
            WorkerPhase::Draining => 3,
            WorkerPhase::Stopped => 4,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerPhase::Connected,
            2 => WorkerPhase::Running,
            3 => WorkerPhase::Draining,
            4 => WorkerPhase::Stopped,
            _ => WorkerPhase::Created,
        }
    }
}

/// Per-worker counters.
///
/// Written only by the worker's control task; anyone holding the `Arc` may
/// read them at any time. Reads during a run can be stale but never go
/// backwards.
#[derive(Debug)]
pub struct WorkerCounters {
    sent: AtomicU64,
    received: AtomicU64,
    exit_code: AtomicU8,
    phase: AtomicU8,
}

impl Default for WorkerCounters {
    fn default() -> Self {
        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            exit_code: AtomicU8::new(ExitCode::None.to_u8()),
            phase: AtomicU8::new(WorkerPhase::Created.to_u8()),
        }
    }
}

impl WorkerCounters {
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_u8(self.exit_code.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn phase(&self) -> WorkerPhase {
        WorkerPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(super) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn set_phase(&self, phase: WorkerPhase) {
        self.phase.store(phase.to_u8(), Ordering::Release);
    }

    /// Stores the exit code unless one is already set. Returns the code that
    /// is in effect afterwards.
    pub(super) fn finish(&self, code: ExitCode) -> ExitCode {
        match self.exit_code.compare_exchange(
            ExitCode::None.to_u8(),
            code.to_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => code,
            Err(existing) => ExitCode::from_u8(existing),
        }
    }
}
