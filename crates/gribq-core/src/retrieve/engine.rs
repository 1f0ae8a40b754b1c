//! Sequential fetch over an ordered candidate list.
//!
//! The first 2xx wins. A 404 advances to the next candidate; 5xx, timeouts
//! and connection failures retry the same URL with backoff until the policy
//! gives up; anything else abandons the URL. All requests of one session are
//! spaced by the rate limit, and the whole session is bounded by a deadline.

use super::attempt::{AttemptOutcome, FailureKind, FetchAttempt, FetchResult};
use super::classify::{classify_exchange, error_kind};
use super::clock::{Clock, SystemClock};
use super::policy::{RetryDecision, RetryPolicy};
use super::transport::Transport;
use crate::query::CandidateUrl;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub retry: RetryPolicy,
    /// Minimum gap between the end of one request and the start of the next.
    pub rate_limit: Duration,
    pub request_timeout: Duration,
    pub session_timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            rate_limit: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            session_timeout: Duration::from_secs(600),
        }
    }
}

pub struct RetrievalEngine<T, C = SystemClock> {
    transport: T,
    clock: C,
    policy: FetchPolicy,
}

impl<T: Transport> RetrievalEngine<T, SystemClock> {
    pub fn new(transport: T, policy: FetchPolicy) -> Self {
        Self::with_clock(transport, SystemClock, policy)
    }
}

/// Per-session state; dropped when `fetch` returns.
struct Session {
    started: Instant,
    deadline: Instant,
    last_request_end: Option<Instant>,
    attempts: Vec<FetchAttempt>,
}

struct DeadlineReached;

impl<T: Transport, C: Clock> RetrievalEngine<T, C> {
    pub fn with_clock(transport: T, clock: C, policy: FetchPolicy) -> Self {
        Self {
            transport,
            clock,
            policy,
        }
    }

    /// Walk `plan` in order until one candidate returns 2xx.
    pub fn fetch(&self, plan: &[CandidateUrl]) -> FetchResult {
        let started = self.clock.now();
        let mut session = Session {
            started,
            deadline: started + self.policy.session_timeout,
            last_request_end: None,
            attempts: Vec::new(),
        };
        tracing::info!(
            candidates = plan.len(),
            timeout_secs = self.policy.session_timeout.as_secs(),
            "fetch session started"
        );

        for candidate in plan {
            match self.fetch_candidate(candidate, &mut session) {
                Ok(Some(body)) => {
                    let elapsed = self.clock.now() - session.started;
                    tracing::info!(
                        cycle = %candidate.cycle,
                        bytes = body.len(),
                        attempts = session.attempts.len(),
                        "fetch succeeded"
                    );
                    return FetchResult::Success {
                        body,
                        cycle: candidate.cycle,
                        url: candidate.url.clone(),
                        attempts: session.attempts,
                        elapsed,
                    };
                }
                Ok(None) => {
                    tracing::info!(cycle = %candidate.cycle, "advancing to older cycle");
                }
                Err(DeadlineReached) => return self.fail(FailureKind::TimedOut, session),
            }
        }
        self.fail(FailureKind::Exhausted, session)
    }

    /// `Ok(Some(body))` on success, `Ok(None)` when the URL is abandoned.
    fn fetch_candidate(
        &self,
        candidate: &CandidateUrl,
        session: &mut Session,
    ) -> Result<Option<Vec<u8>>, DeadlineReached> {
        let mut attempt = 1u32;
        loop {
            if let Some(end) = session.last_request_end {
                let ready = end + self.policy.rate_limit;
                let now = self.clock.now();
                if ready > now {
                    tracing::debug!(wait_ms = (ready - now).as_millis() as u64, "rate limit");
                    self.wait(ready - now, session.deadline)?;
                }
            }

            let now = self.clock.now();
            let remaining = session.deadline.saturating_duration_since(now);
            if remaining.is_zero() {
                return Err(DeadlineReached);
            }
            let timeout = self.policy.request_timeout.min(remaining);

            tracing::info!(url = %candidate.url, cycle = %candidate.cycle, attempt, "requesting");
            let timestamp = self.clock.wall();
            let result = self.transport.send(&candidate.url, timeout);
            let end = self.clock.now();
            session.last_request_end = Some(end);

            let outcome = classify_exchange(&result);
            let mut record = FetchAttempt {
                url: candidate.url.clone(),
                cycle: candidate.cycle,
                attempt,
                outcome: outcome.clone(),
                timestamp,
                elapsed: end - now,
                backoff: None,
            };

            let Some(kind) = error_kind(&outcome) else {
                session.attempts.push(record);
                // Success outcomes only come from Ok responses.
                return Ok(result.ok().map(|response| response.body));
            };

            let decision = self.policy.retry.decide(attempt, kind);
            match &outcome {
                AttemptOutcome::NotYetPublished => {
                    tracing::info!(cycle = %candidate.cycle, "not yet published (404)")
                }
                other => tracing::warn!(url = %candidate.url, attempt, outcome = %other, "attempt failed"),
            }

            match decision {
                RetryDecision::NoRetry => {
                    session.attempts.push(record);
                    return Ok(None);
                }
                RetryDecision::RetryAfter(delay) => {
                    record.backoff = Some(delay);
                    session.attempts.push(record);
                    tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "backing off");
                    self.wait(delay, session.deadline)?;
                    attempt += 1;
                }
            }
        }
    }

    /// Sleep for `duration` unless that would pass `deadline`.
    fn wait(&self, duration: Duration, deadline: Instant) -> Result<(), DeadlineReached> {
        if self.clock.now() + duration > deadline {
            tracing::warn!(
                wait_ms = duration.as_millis() as u64,
                "wait would pass the session deadline"
            );
            return Err(DeadlineReached);
        }
        self.clock.sleep(duration);
        Ok(())
    }

    fn fail(&self, kind: FailureKind, session: Session) -> FetchResult {
        let elapsed = self.clock.now() - session.started;
        tracing::warn!(%kind, attempts = session.attempts.len(), "fetch failed");
        FetchResult::Failure {
            kind,
            attempts: session.attempts,
            elapsed,
        }
    }
}
