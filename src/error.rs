//! Error types for the swap SDK

use thiserror::Error;

/// Main error type for swap execution and negotiation
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Remote error ({status}): {title}{}", .detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default())]
    Problem {
        status: u16,
        title: String,
        detail: Option<String>,
    },

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Unsupported ledger action: {0}")]
    UnsupportedLedgerAction(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No {ledger} wallet configured")]
    WalletNotConfigured { ledger: &'static str },

    #[error("Lightning node mismatch on {field}: expected {expected}, got {actual}")]
    LightningNodeMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Inconsistent chain state for tx {tx_id}: {message}")]
    InconsistentChainState { tx_id: String, message: String },

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Swap {swap} reached terminal status {status}")]
    SwapTerminated { swap: String, status: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SdkError {
    /// Check if error is retryable
    ///
    /// Only transport failures qualify. A remote error object or a protocol
    /// violation will be returned again on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SdkError::Transport(_))
    }

    /// Check if error stems from a wallet call
    pub fn is_wallet_error(&self) -> bool {
        matches!(self, SdkError::Wallet(_))
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        SdkError::Transport(e.to_string())
    }
}

/// Failure of a wallet capability call, with everything needed to reproduce it
#[derive(Error, Debug)]
#[error("Wallet call for {action} failed with parameters {parameters}: {source}")]
pub struct WalletError {
    /// Ledger action tag that was being executed
    pub action: &'static str,
    /// Exact arguments handed to the wallet
    pub parameters: serde_json::Value,
    /// Underlying wallet failure
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl WalletError {
    pub fn new(action: &'static str, parameters: serde_json::Value, source: anyhow::Error) -> Self {
        Self {
            action,
            parameters,
            source: source.into(),
        }
    }
}

/// Negotiation validation failures; these abort before any side effect
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Order {0} is incomplete or has non-numeric amounts")]
    InvalidOrder(String),

    #[error("Order {0} does not satisfy the matching criteria")]
    CriteriaMismatch(String),

    #[error("Execution parameters for order {0} fail the expiry safety check")]
    UnsafeExecutionParams(String),

    #[error("Unsupported asset {asset} on ledger {ledger}")]
    UnsupportedAsset { ledger: String, asset: String },

    #[error("Swap {swap_id} does not match order {order_id}")]
    SwapOrderMismatch { swap_id: String, order_id: String },
}

/// Result type for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(SdkError::Transport("connection reset".into()).is_retryable());
        assert!(!SdkError::ProtocolViolation("two actions".into()).is_retryable());
        assert!(!SdkError::Problem {
            status: 400,
            title: "Bad Request".into(),
            detail: None
        }
        .is_retryable());
        assert!(!SdkError::Timeout {
            operation: "fund".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_wallet_error_carries_call_context() {
        let err: SdkError = WalletError::new(
            "bitcoin-send-amount-to-address",
            serde_json::json!({ "to": "bcrt1qxyz", "amount": 1000 }),
            anyhow::anyhow!("insufficient funds"),
        )
        .into();

        let rendered = err.to_string();
        assert!(err.is_wallet_error());
        assert!(rendered.contains("bitcoin-send-amount-to-address"));
        assert!(rendered.contains("bcrt1qxyz"));
        assert!(rendered.contains("insufficient funds"));
    }

    #[test]
    fn test_problem_display_includes_detail() {
        let err = SdkError::Problem {
            status: 404,
            title: "Swap not found".into(),
            detail: Some("no swap with id abc".into()),
        };
        assert_eq!(
            err.to_string(),
            "Remote error (404): Swap not found: no swap with id abc"
        );
    }
}
