//! Error types for hopswap

use thiserror::Error;

use crate::types::{Amount, TokenRoot};

/// Core errors that can occur in hopswap
#[derive(Debug, Error)]
pub enum Error {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Ledger transport errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger unreachable: {message}")]
    Unreachable { message: String },

    #[error("Signing declined: {reason}")]
    Rejected { reason: String },

    #[error("Message submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("Transaction subscription failed: {message}")]
    SubscriptionFailed { message: String },
}

/// Route discovery and quoting errors
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Quote failed at hop {hop} (pool {pool}): {reason}")]
    QuoteFailure {
        hop: usize,
        pool: String,
        reason: String,
    },

    #[error("No cross-pair route between {left} and {right}")]
    NoRouteFound { left: TokenRoot, right: TokenRoot },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid route: {reason}")]
    InvalidRoute { reason: String },

    #[error("Pair discovery failed: {message}")]
    Discovery { message: String },

    #[error("Route computation already in progress")]
    Busy,
}

/// Errors surfaced from a submitted multi-hop operation
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Submission rejected before reaching the ledger: {reason}")]
    SubmissionRejected { reason: String },

    #[error(
        "Route stopped at hop {step_index}: {stranded_amount} of {stranded_root} left in \
         intermediate token"
    )]
    PartialExecution {
        step_index: usize,
        stranded_root: TokenRoot,
        stranded_amount: Amount,
    },

    #[error("First hop cancelled, nothing was exchanged")]
    Failed,

    #[error("Operation did not reach a terminal state: {reason}")]
    Unresolved { reason: String },
}

/// Result type alias for hopswap operations
pub type Result<T> = std::result::Result<T, Error>;

impl RouteError {
    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QuoteFailure { .. } => "quote_failure",
            Self::NoRouteFound { .. } => "no_route_found",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidRoute { .. } => "invalid_route",
            Self::Discovery { .. } => "discovery_failed",
            Self::Busy => "busy",
        }
    }
}

impl ExecutionError {
    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::PartialExecution { .. } => "partial_execution",
            Self::Failed => "execution_failed",
            Self::Unresolved { .. } => "unresolved",
        }
    }

    /// Whether the whole operation can be retried as a unit
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SubmissionRejected { .. } | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_error_codes() {
        let err = RouteError::QuoteFailure {
            hop: 1,
            pool: "0:ab".into(),
            reason: "timeout".into(),
        };
        assert_eq!(err.error_code(), "quote_failure");

        let err = RouteError::NoRouteFound {
            left: TokenRoot::new("x"),
            right: TokenRoot::new("z"),
        };
        assert_eq!(err.error_code(), "no_route_found");
    }

    #[test]
    fn test_partial_execution_not_retryable() {
        let err = ExecutionError::PartialExecution {
            step_index: 2,
            stranded_root: TokenRoot::new("y"),
            stranded_amount: 940,
        };
        assert_eq!(err.error_code(), "partial_execution");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("940 of y"));

        let err = ExecutionError::SubmissionRejected {
            reason: "user declined".into(),
        };
        assert!(err.is_retryable());
    }
}
