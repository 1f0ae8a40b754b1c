//! Transport seam: one blocking HTTP GET per call.
//!
//! The engine only needs a status code and the body; `CurlTransport` is the
//! production implementation (libcurl easy handle, redirects followed).

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("transport error: {0}")]
    Other(String),
}

pub trait Transport {
    /// GET `url`, giving up after `timeout`.
    fn send(&self, url: &str, timeout: Duration) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        (**self).send(url, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        (**self).send(url, timeout)
    }
}

/// libcurl-backed transport.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
    user_agent: String,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            user_agent: concat!("gribq/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for CurlTransport {
    fn send(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        // libcurl works in whole milliseconds and treats 0 as "no timeout".
        let timeout = timeout.max(Duration::from_millis(1));
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout.min(timeout))?;
        easy.timeout(timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        let status = u16::try_from(status)
            .map_err(|_| TransportError::Other(format!("invalid status code {status}")))?;
        Ok(Response { status, body })
    }
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        classify_curl_error(&e)
    }
}

/// Map a curl error onto the engine's transport classes.
pub fn classify_curl_error(e: &curl::Error) -> TransportError {
    if e.is_operation_timedout() {
        return TransportError::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransportError::Connection(e.to_string());
    }
    TransportError::Other(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_connection_error() {
        // Port 1 on loopback is closed on any sane test machine.
        let err = CurlTransport::new()
            .send("http://127.0.0.1:1/", Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)), "{err:?}");
    }

    #[test]
    fn malformed_url_is_not_retryable() {
        let err = CurlTransport::new()
            .send("notascheme://", Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, TransportError::Other(_)), "{err:?}");
    }
}
