//! Unified error system for the VRE hub
//!
//! Every fatal condition of a login or launch attempt is one variant of
//! [`VreError`]. Recoverable conditions (a malformed catalog entry, a missing
//! compute endpoint) are never errors; they travel as values and only reduce
//! what the user is offered.
//!
//! All fatal variants collapse into an [`AccessDenial`] at exactly one point,
//! [`AccessDenial::from_error`], which is what the host platform shows the user.

use serde::{Deserialize, Serialize};

/// Unified error type for all hub operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VreError {
    /// Identity provider discovery document or key set could not be fetched
    #[error("Discovery failed: {message}")]
    Discovery {
        /// What went wrong while discovering signing keys
        message: String,
    },

    /// The ticket endpoint refused or failed the exchange
    #[error("Ticket exchange failed: {message}")]
    TicketExchange {
        /// What went wrong during the exchange
        message: String,
    },

    /// The returned ticket could not be verified
    #[error("Ticket verification failed: {message}")]
    TicketVerification {
        /// Why the ticket was rejected
        message: String,
    },

    /// The login flow did not supply a context
    #[error("Missing context: {message}")]
    MissingContext {
        /// Description of the missing parameter
        message: String,
    },

    /// The resource catalog could not be fetched
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable {
        /// What went wrong while fetching the catalog
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl VreError {
    /// Create a discovery error
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a ticket exchange error
    pub fn ticket_exchange(message: impl Into<String>) -> Self {
        Self::TicketExchange {
            message: message.into(),
        }
    }

    /// Create a ticket verification error
    pub fn ticket_verification(message: impl Into<String>) -> Self {
        Self::TicketVerification {
            message: message.into(),
        }
    }

    /// Create a missing context error
    pub fn missing_context(message: impl Into<String>) -> Self {
        Self::MissingContext {
            message: message.into(),
        }
    }

    /// Create a catalog unavailable error
    pub fn catalog_unavailable(message: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error denies the attempt to the end user rather than
    /// signalling a broken deployment.
    pub fn is_access_denial(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::Internal { .. })
    }

    /// Fixed reason shown to the end user. Carries none of the message text.
    pub fn public_reason(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "access denied: authorization service unavailable",
            Self::TicketExchange { .. } => "access denied: authorization refused",
            Self::TicketVerification { .. } => "access denied: authorization could not be verified",
            Self::MissingContext { .. } => "access denied: no context selected",
            Self::CatalogUnavailable { .. } => "access denied: resource catalog unavailable",
            Self::Config { .. } | Self::Internal { .. } => "internal server error",
        }
    }
}

/// Standard Result type for hub operations
pub type VreResult<T> = std::result::Result<T, VreError>;

impl From<std::io::Error> for VreError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

/// What the end user sees when an attempt fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDenial {
    /// HTTP-style status: 403 for denials, 500 for deployment faults
    pub status: u16,
    /// Short reason, safe to show to the user
    pub reason: String,
}

impl AccessDenial {
    /// Collapse a fatal error into the user-facing denial.
    pub fn from_error(err: &VreError) -> Self {
        let status = if err.is_access_denial() { 403 } else { 500 };
        tracing::warn!(status, error = %err, "denying access");
        Self {
            status,
            reason: err.public_reason().to_string(),
        }
    }
}

impl std::fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            403 => write!(f, "403 Forbidden: {}", self.reason),
            status => write!(f, "{status} {}", self.reason),
        }
    }
}

impl std::error::Error for AccessDenial {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = VreError::ticket_exchange("upstream returned 401");
        assert!(matches!(err, VreError::TicketExchange { .. }));
        assert_eq!(err.to_string(), "Ticket exchange failed: upstream returned 401");
    }

    #[test]
    fn test_fatal_errors_become_forbidden() {
        for err in [
            VreError::discovery("x"),
            VreError::ticket_exchange("x"),
            VreError::ticket_verification("x"),
            VreError::missing_context("x"),
            VreError::catalog_unavailable("x"),
        ] {
            assert_eq!(AccessDenial::from_error(&err).status, 403, "{err}");
        }
    }

    #[test]
    fn test_deployment_faults_are_not_forbidden() {
        let denial = AccessDenial::from_error(&VreError::config("bad url"));
        assert_eq!(denial.status, 500);
        assert_eq!(denial.to_string(), "500 internal server error");
    }

    #[test]
    fn test_denial_reason_hides_upstream_detail() {
        let url = "https://accounts.example.org/auth/realms/d4science/.well-known/openid-configuration";
        let err = VreError::discovery(format!("failed to reach {url}: error sending request"));

        let denial = AccessDenial::from_error(&err);
        assert_eq!(denial.reason, "access denied: authorization service unavailable");
        assert!(!denial.reason.contains("accounts.example.org"));
        assert!(!denial.to_string().contains("error sending request"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(matches!(VreError::from(io_err), VreError::Internal { .. }));
    }
}
