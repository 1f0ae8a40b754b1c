use crate::cycle::ForecastCycle;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// What one HTTP exchange produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { status: u16, bytes: u64 },
    /// 404: the run is not on the server yet.
    NotYetPublished,
    ServerError(u16),
    Timeout,
    Connection(String),
    UnexpectedStatus(u16),
    TransportFailure(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success { status, bytes } => write!(f, "HTTP {status} ({bytes} bytes)"),
            AttemptOutcome::NotYetPublished => f.write_str("HTTP 404 (not yet published)"),
            AttemptOutcome::ServerError(status) => write!(f, "HTTP {status} (server error)"),
            AttemptOutcome::Timeout => f.write_str("timed out"),
            AttemptOutcome::Connection(msg) => write!(f, "connection failed: {msg}"),
            AttemptOutcome::UnexpectedStatus(status) => write!(f, "HTTP {status} (unexpected)"),
            AttemptOutcome::TransportFailure(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub url: String,
    pub cycle: ForecastCycle,
    /// 1-based, counted per URL.
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub timestamp: DateTime<Utc>,
    pub elapsed: Duration,
    /// Wait scheduled before retrying the same URL.
    pub backoff: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every candidate was tried and none succeeded.
    Exhausted,
    /// The session deadline passed (or a wait could not finish before it).
    TimedOut,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Exhausted => f.write_str("all candidates exhausted"),
            FailureKind::TimedOut => f.write_str("session timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success {
        body: Vec<u8>,
        cycle: ForecastCycle,
        url: String,
        attempts: Vec<FetchAttempt>,
        elapsed: Duration,
    },
    Failure {
        kind: FailureKind,
        attempts: Vec<FetchAttempt>,
        elapsed: Duration,
    },
}

impl FetchResult {
    pub fn attempts(&self) -> &[FetchAttempt] {
        match self {
            FetchResult::Success { attempts, .. } | FetchResult::Failure { attempts, .. } => {
                attempts
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            FetchResult::Success { elapsed, .. } | FetchResult::Failure { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }
}
