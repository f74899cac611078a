use thiserror::Error;

pub(crate) const HTTP_RETURNED_ERROR: &str = "HTTP response code said error";
pub(crate) const OPERATION_TIMED_OUT: &str = "Timeout was reached";
pub(crate) const COULDNT_CONNECT: &str = "Couldn't connect to server";
pub(crate) const TOO_MANY_REDIRECTS: &str = "Number of redirects hit maximum amount";
pub(crate) const URL_MALFORMAT: &str = "URL using bad/illegal format or missing URL";
pub(crate) const RECV_ERROR: &str = "Failure when receiving data from the peer";
pub(crate) const SEND_ERROR: &str = "Failed sending data to the peer";
pub(crate) const CA_CERT_ERROR: &str = "Problem with the SSL CA cert (path? access rights?)";
pub(crate) const FAILED_INIT: &str = "Failed initialization";

/// A network or HTTP-level failure.
///
/// Displays as the transport description, followed by the HTTP status when the
/// server answered with an error code (e.g. `HTTP response code said error 404`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}{}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
pub struct TransportError {
    description: &'static str,
    status: Option<u16>,
}

impl TransportError {
    pub(crate) fn new(description: &'static str) -> Self {
        Self {
            description,
            status: None,
        }
    }

    pub(crate) fn http_status(status: u16) -> Self {
        Self {
            description: HTTP_RETURNED_ERROR,
            status: Some(status),
        }
    }

    pub(crate) fn timeout() -> Self {
        Self::new(OPERATION_TIMED_OUT)
    }

    /// Classifies a reqwest failure, logging the underlying detail.
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let description = if err.is_timeout() {
            OPERATION_TIMED_OUT
        } else if err.is_connect() {
            COULDNT_CONNECT
        } else if err.is_redirect() {
            TOO_MANY_REDIRECTS
        } else if err.is_builder() {
            URL_MALFORMAT
        } else if err.is_body() || err.is_decode() {
            RECV_ERROR
        } else if err.is_request() {
            SEND_ERROR
        } else {
            RECV_ERROR
        };
        tracing::debug!(error = %err, description, "Transport failure");

        if let Some(status) = err.status() {
            return Self::http_status(status.as_u16());
        }
        Self::new(description)
    }

    /// Transport-level description without the status code.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// HTTP status, present only for HTTP-level errors.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_message_includes_status() {
        let err = TransportError::http_status(404);
        assert_eq!(err.to_string(), "HTTP response code said error 404");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_non_http_error_message_is_description_only() {
        let err = TransportError::timeout();
        assert_eq!(err.to_string(), "Timeout was reached");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_transport_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(TransportError::new(CA_CERT_ERROR));
        assert_eq!(err.to_string(), "Problem with the SSL CA cert (path? access rights?)");
        assert!(err.source().is_none());
    }
}
