//! Gate rejection taxonomy.

use std::fmt::Display;

use axum::http::StatusCode;
use thiserror::Error;

/// Why a gate refused to pass a request on.
///
/// `Display` carries diagnostic detail for logs; callers only ever see
/// [`GateError::public_message`].
#[derive(Debug, Error)]
pub enum GateError {
    #[error("rate limit exceeded")]
    RateLimited,

    /// Malformed, unknown or expired credential. Deliberately one variant.
    #[error("invalid or missing authentication token")]
    InvalidCredential,

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("account inactive")]
    AccountInactive,

    #[error("permission not granted")]
    NotPermitted,

    #[error("internal error: {0}")]
    Internal(String),

    /// The pipeline was composed incorrectly. Never user-recoverable.
    #[error("pipeline wiring fault: {0}")]
    Wiring(#[from] WiringFault),
}

/// Programming errors in how stages were composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WiringFault {
    #[error("principal attached twice")]
    PrincipalAlreadyAttached,

    #[error("principal read before it was attached")]
    PrincipalMissing,
}

impl GateError {
    pub fn internal(detail: impl Display) -> Self {
        GateError::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GateError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GateError::InvalidCredential | GateError::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            GateError::AccountInactive | GateError::NotPermitted => StatusCode::FORBIDDEN,
            GateError::Internal(_) | GateError::Wiring(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            GateError::RateLimited => "rate limit exceeded",
            GateError::InvalidCredential => "invalid or missing authentication token",
            GateError::AuthenticationRequired => {
                "you must be authenticated to access this resource"
            }
            GateError::AccountInactive => {
                "your user account must be activated to access this resource"
            }
            GateError::NotPermitted => {
                "your user account doesn't have the necessary permissions to access this resource"
            }
            GateError::Internal(_) | GateError::Wiring(_) => {
                "the server encountered a problem and could not process your request"
            }
        }
    }

    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            GateError::RateLimited => "rate_limited",
            GateError::InvalidCredential => "invalid_credential",
            GateError::AuthenticationRequired => "authentication_required",
            GateError::AccountInactive => "account_inactive",
            GateError::NotPermitted => "not_permitted",
            GateError::Internal(_) => "internal",
            GateError::Wiring(_) => "wiring",
        }
    }

    /// Whether the connection must not be reused after this error.
    pub fn closes_connection(&self) -> bool {
        matches!(self, GateError::Wiring(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(GateError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(GateError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GateError::AuthenticationRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GateError::AccountInactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(GateError::NotPermitted.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GateError::internal("db down").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_stays_out_of_public_message() {
        let err = GateError::internal("connection refused to 10.1.2.3:5432");
        assert!(err.to_string().contains("10.1.2.3"));
        assert!(!err.public_message().contains("10.1.2.3"));
    }

    #[test]
    fn only_wiring_faults_close_the_connection() {
        assert!(GateError::from(WiringFault::PrincipalMissing).closes_connection());
        assert!(!GateError::internal("boom").closes_connection());
        assert!(!GateError::RateLimited.closes_connection());
    }
}
