//! Failure classification.
//!
//! Every [`Fault`] raised by a collaborator is mapped to exactly one
//! [`ErrorKind`] here, once, at the point it is caught. Everything downstream
//! (retry, photo deletion, notification) looks only at the kind.

use crate::error::Fault;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Closed set of failure causes surfaced out of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Auth,
    Server,
    RateLimit,
    Parse,
    PermissionDenied,
    Validation,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Network,
        ErrorKind::Auth,
        ErrorKind::Server,
        ErrorKind::RateLimit,
        ErrorKind::Parse,
        ErrorKind::PermissionDenied,
        ErrorKind::Validation,
    ];

    /// Only transient transport and server trouble is worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Server)
    }

    /// The user-facing message for this kind. No other module carries these strings.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Network => "Couldn't reach the analysis service. Check your connection.",
            ErrorKind::Auth => "The analysis service rejected your API key. Update it in settings.",
            ErrorKind::Server => "The analysis service is having trouble. Please try again later.",
            ErrorKind::RateLimit => "Too many requests. Please wait a moment before trying again.",
            ErrorKind::Parse => "The analysis service sent an unexpected response.",
            ErrorKind::PermissionDenied => {
                "Health data access was denied. Grant permission to save meals."
            }
            ErrorKind::Validation => "No food could be identified in this photo.",
        }
    }

    /// Stable snake_case name, as used in logs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::Server => "server",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Parse => "parse",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a collaborator fault to its kind.
///
/// Pure and deterministic; anything without a specific mapping falls back to
/// [`ErrorKind::Parse`], which is non-retryable.
pub fn classify(fault: &Fault) -> ErrorKind {
    match fault {
        Fault::Timeout { .. } | Fault::Connection(_) => ErrorKind::Network,
        Fault::Http { status, .. } => classify_status(*status),
        Fault::Decode(_) => ErrorKind::Parse,
        Fault::PermissionDenied(_) => ErrorKind::PermissionDenied,
        Fault::OutOfRange { .. } | Fault::NoFoodDetected | Fault::ResourceMissing(_) => {
            ErrorKind::Validation
        }
        Fault::Io(e) => classify_io(e),
        Fault::Other(_) => ErrorKind::Parse,
    }
}

/// Convenience wrapper mirroring [`ErrorKind::user_message`].
pub fn user_message(kind: ErrorKind) -> &'static str {
    kind.user_message()
}

/// Convenience wrapper mirroring [`ErrorKind::is_retryable`].
pub fn is_retryable(kind: ErrorKind) -> bool {
    kind.is_retryable()
}

fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Auth,
        429 => ErrorKind::RateLimit,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Parse,
    }
}

fn classify_io(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
        io::ErrorKind::TimedOut
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::AddrNotAvailable => ErrorKind::Network,
        _ => ErrorKind::Parse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> Fault {
        Fault::Http {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_timeout_and_connection_are_network() {
        assert_eq!(classify(&Fault::Timeout { timeout_ms: 100 }), ErrorKind::Network);
        assert_eq!(
            classify(&Fault::Connection("dns failure".into())),
            ErrorKind::Network
        );
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(classify(&http(401)), ErrorKind::Auth);
        assert_eq!(classify(&http(403)), ErrorKind::Auth);
        assert_eq!(classify(&http(429)), ErrorKind::RateLimit);
        assert_eq!(classify(&http(500)), ErrorKind::Server);
        assert_eq!(classify(&http(503)), ErrorKind::Server);
        assert_eq!(classify(&http(599)), ErrorKind::Server);
    }

    #[test]
    fn test_unmapped_status_defaults_to_parse() {
        assert_eq!(classify(&http(400)), ErrorKind::Parse);
        assert_eq!(classify(&http(404)), ErrorKind::Parse);
        assert_eq!(classify(&http(302)), ErrorKind::Parse);
    }

    #[test]
    fn test_decode_permission_and_validation() {
        assert_eq!(classify(&Fault::Decode("eof".into())), ErrorKind::Parse);
        assert_eq!(
            classify(&Fault::PermissionDenied("health write".into())),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            classify(&Fault::OutOfRange {
                field: "calories".into(),
                value: "-5".into()
            }),
            ErrorKind::Validation
        );
        assert_eq!(classify(&Fault::NoFoodDetected), ErrorKind::Validation);
        assert_eq!(
            classify(&Fault::ResourceMissing("p1".into())),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_io_faults_classified_by_io_kind() {
        let denied = Fault::Io(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        let reset = Fault::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        let other = Fault::Io(io::Error::new(io::ErrorKind::InvalidData, "junk"));
        assert_eq!(classify(&denied), ErrorKind::PermissionDenied);
        assert_eq!(classify(&reset), ErrorKind::Network);
        assert_eq!(classify(&other), ErrorKind::Parse);
    }

    #[test]
    fn test_unrecognized_fault_is_parse_and_not_retryable() {
        let kind = classify(&Fault::Other("something strange".into()));
        assert_eq!(kind, ErrorKind::Parse);
        assert!(!is_retryable(kind));
    }

    #[test]
    fn test_only_network_and_server_are_retryable() {
        for kind in ErrorKind::ALL {
            let expected = matches!(kind, ErrorKind::Network | ErrorKind::Server);
            assert_eq!(is_retryable(kind), expected, "{kind}");
        }
    }

    #[test]
    fn test_user_messages_are_distinct_and_non_empty() {
        let messages: std::collections::HashSet<_> =
            ErrorKind::ALL.iter().map(|k| user_message(*k)).collect();
        assert_eq!(messages.len(), ErrorKind::ALL.len());
        assert!(messages.iter().all(|m| !m.is_empty()));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission_denied\"");
        assert_eq!(ErrorKind::RateLimit.to_string(), "rate_limit");
    }
}
