use super::attempt::AttemptOutcome;
use super::policy::ErrorKind;
use super::transport::{Response, TransportError};

/// Classify the result of one exchange. The filter service answers 404 for
/// runs that are not published yet.
pub fn classify_exchange(result: &Result<Response, TransportError>) -> AttemptOutcome {
    match result {
        Ok(response) => classify_http_status(response.status, response.body.len()),
        Err(TransportError::Timeout) => AttemptOutcome::Timeout,
        Err(TransportError::Connection(msg)) => AttemptOutcome::Connection(msg.clone()),
        Err(TransportError::Other(msg)) => AttemptOutcome::TransportFailure(msg.clone()),
    }
}

pub fn classify_http_status(status: u16, bytes: usize) -> AttemptOutcome {
    match status {
        200..=299 => AttemptOutcome::Success {
            status,
            bytes: bytes as u64,
        },
        404 => AttemptOutcome::NotYetPublished,
        500..=599 => AttemptOutcome::ServerError(status),
        _ => AttemptOutcome::UnexpectedStatus(status),
    }
}

/// Retry class of a failed outcome; `None` for success.
pub fn error_kind(outcome: &AttemptOutcome) -> Option<ErrorKind> {
    let kind = match outcome {
        AttemptOutcome::Success { .. } => return None,
        AttemptOutcome::NotYetPublished => ErrorKind::NotFound,
        AttemptOutcome::ServerError(code) => ErrorKind::Http5xx(*code),
        AttemptOutcome::Timeout => ErrorKind::Timeout,
        AttemptOutcome::Connection(_) => ErrorKind::Connection,
        AttemptOutcome::UnexpectedStatus(_) | AttemptOutcome::TransportFailure(_) => {
            ErrorKind::Other
        }
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert!(matches!(
            classify_http_status(200, 10),
            AttemptOutcome::Success { status: 200, bytes: 10 }
        ));
        assert!(matches!(
            classify_http_status(206, 0),
            AttemptOutcome::Success { .. }
        ));
        assert_eq!(classify_http_status(404, 0), AttemptOutcome::NotYetPublished);
        assert_eq!(classify_http_status(503, 0), AttemptOutcome::ServerError(503));
        assert_eq!(classify_http_status(500, 0), AttemptOutcome::ServerError(500));
        assert_eq!(classify_http_status(403, 0), AttemptOutcome::UnexpectedStatus(403));
        assert_eq!(classify_http_status(429, 0), AttemptOutcome::UnexpectedStatus(429));
        assert_eq!(classify_http_status(302, 0), AttemptOutcome::UnexpectedStatus(302));
    }

    #[test]
    fn transport_errors() {
        assert_eq!(
            classify_exchange(&Err(TransportError::Timeout)),
            AttemptOutcome::Timeout
        );
        assert_eq!(
            classify_exchange(&Err(TransportError::Connection("reset".into()))),
            AttemptOutcome::Connection("reset".into())
        );
        assert_eq!(
            error_kind(&AttemptOutcome::TransportFailure("bad url".into())),
            Some(ErrorKind::Other)
        );
    }

    #[test]
    fn retry_kinds() {
        assert_eq!(error_kind(&AttemptOutcome::NotYetPublished), Some(ErrorKind::NotFound));
        assert_eq!(
            error_kind(&AttemptOutcome::ServerError(502)),
            Some(ErrorKind::Http5xx(502))
        );
        assert_eq!(error_kind(&AttemptOutcome::UnexpectedStatus(403)), Some(ErrorKind::Other));
        assert_eq!(
            error_kind(&AttemptOutcome::Success { status: 200, bytes: 1 }),
            None
        );
    }
}
