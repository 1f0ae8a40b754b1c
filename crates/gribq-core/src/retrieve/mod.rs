//! Retrieval: retry policy, transport, and the session engine.

mod attempt;
pub mod classify;
pub mod clock;
mod engine;
pub mod policy;
pub mod transport;

pub use attempt::{AttemptOutcome, FailureKind, FetchAttempt, FetchResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{FetchPolicy, RetrievalEngine};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use transport::{CurlTransport, Response, Transport, TransportError};
