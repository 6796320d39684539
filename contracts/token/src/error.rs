use crate::host::HostError;
use thiserror::Error;

/// Errors surfaced by ledger operations.
///
/// Every variant is reported to the immediate caller; nothing is retried
/// inside the core.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("incorrect number of parameters for {operation}: expected {expected}, got {got}")]
    Arity {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("failed to convert {field}: {reason}")]
    Conversion { field: String, reason: String },

    #[error("insufficient balance: {address} has {balance}, needs {amount}")]
    InsufficientBalance {
        address: String,
        balance: i64,
        amount: i64,
    },

    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}'s tokens, needs {amount}")]
    InsufficientAllowance {
        owner: String,
        spender: String,
        allowance: i64,
        amount: i64,
    },

    #[error("{field} overflows a 64-bit amount")]
    Overflow { field: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("store failure: {0}")]
    Store(#[from] HostError),

    #[error("failed to encode {what}: {source}")]
    Encoding {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to transfer {ledger}: {message}")]
    CrossLedger { ledger: String, message: String },

    #[error("{0} is reserved and not enabled on this ledger")]
    Reserved(&'static str),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

impl TokenError {
    pub(crate) fn conversion(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Status code reported through the invocation boundary.
    pub fn status(&self) -> u16 {
        match self {
            Self::UnknownOperation(_) => crate::operation::STATUS_NOT_FOUND,
            _ => crate::operation::STATUS_ERROR,
        }
    }
}

pub type TokenResult<T> = Result<T, TokenError>;
