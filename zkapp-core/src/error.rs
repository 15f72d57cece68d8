//! Error types for the zkApp engine
//!
//! Two layers:
//! - [`Error`]: crate-level failures (configuration, codecs, authorization,
//!   rejected command construction)
//! - [`ApplyError`]: per-update findings collected by the engine and the
//!   transaction context, never raised mid-walk

use crate::authorization::{AuthorizationKind, AuthorizationLevel, PermissionAspect};
use crate::trace::ZkappCommandErrorTrace;
use crate::types::{Field, SignedAmount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Codec error (field or JSON projection)
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid input value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authorization could not be produced
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Command construction failed; carries the full error trace
    #[error("zkApp command rejected:\n{0}")]
    CommandRejected(Box<ZkappCommandErrorTrace>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::InvalidInput(msg)
    }
}

/// Category of an [`ApplyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Precondition, permission, identity or verification-key mismatch
    Validation,
    /// Overflow, underflow or negative balance
    Arithmetic,
    /// Transaction-scoped fee excess failure
    FeeExcess,
    /// Update not evaluated because its account already failed
    Skipped,
}

/// Finding produced while checking or applying an account update
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyError {
    /// Update targets a different account
    #[error("account id in account update does not match actual account id")]
    AccountIdMismatch,

    /// Update was built against another program
    #[error("account verification key does not match account update's verification key (account has {account}, account update referenced {update})")]
    VerificationKeyMismatch {
        /// Hash stored on the account
        account: Field,
        /// Hash referenced by the update
        update: Field,
    },

    /// A precondition did not hold
    #[error("{name} precondition failed: {value} does not satisfy \"{constraint}\"")]
    PreconditionFailed {
        /// Precondition name
        name: String,
        /// Live value
        value: String,
        /// Human-readable constraint
        constraint: String,
    },

    /// Declared authorization does not meet the required level
    #[error("{aspect} permission was violated: account update has authorization kind {kind}, but required auth level is {required}")]
    PermissionViolated {
        /// Aspect acted upon
        aspect: PermissionAspect,
        /// Declared authorization
        kind: AuthorizationKind,
        /// Required level
        required: AuthorizationLevel,
    },

    /// Fee payer has no stored account
    #[error("zkapp fee payer account not found")]
    FeePayerNotFound,

    /// Both token-use flags were set
    #[error("mayUseToken cannot both inherit from parent and use parent's own token")]
    InvalidMayUseToken,

    /// Implicit creation fee exceeds the representable range
    #[error("balance change underflowed when subtracting the account creation fee")]
    CreationFeeUnderflow,

    /// Balance arithmetic left the representable range
    #[error("account balance overflowed or underflowed when applying balance change")]
    BalanceOverflow,

    /// Balance would go below zero
    #[error("account balance was negative after applying balance change")]
    NegativeBalance,

    /// Nonce would exceed its 32-bit range
    #[error("account nonce overflowed when incrementing")]
    NonceOverflow,

    /// Post-update balance below the vesting minimum
    #[error("account has an insufficient minimum balance after applying update (balance {balance}, minimum {minimum})")]
    InsufficientMinimumBalance {
        /// Post-update balance
        balance: u64,
        /// Minimum required at the current slot
        minimum: u64,
    },

    /// Accumulator left the representable range
    #[error("fee excess {0} when accumulating account update")]
    FeeExcessOverflow(String),

    /// Accumulator already dead at finalization
    #[error("fee excess could not be computed due to other errors")]
    FeeExcessUnavailable,

    /// Net value was minted or burned
    #[error("fee excess does not equal 0 (this transaction is attempting to either burn or mint new Mina tokens, which is disallowed): {0}")]
    FeeExcessNonZero(SignedAmount),

    /// Account already failed earlier in this transaction
    #[error("skipping account update because a previous account update failed when accessing the same account")]
    Skipped,

    /// Ancestor failed under the skip-descendants policy
    #[error("skipping account update because an ancestor account update failed")]
    SkippedAncestorFailed,
}

impl ApplyError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplyError::AccountIdMismatch
            | ApplyError::VerificationKeyMismatch { .. }
            | ApplyError::PreconditionFailed { .. }
            | ApplyError::PermissionViolated { .. }
            | ApplyError::FeePayerNotFound
            | ApplyError::InvalidMayUseToken => ErrorKind::Validation,
            ApplyError::CreationFeeUnderflow
            | ApplyError::BalanceOverflow
            | ApplyError::NegativeBalance
            | ApplyError::NonceOverflow
            | ApplyError::InsufficientMinimumBalance { .. } => ErrorKind::Arithmetic,
            ApplyError::FeeExcessOverflow(_)
            | ApplyError::FeeExcessUnavailable
            | ApplyError::FeeExcessNonZero(_) => ErrorKind::FeeExcess,
            ApplyError::Skipped | ApplyError::SkippedAncestorFailed => ErrorKind::Skipped,
        }
    }

    /// Name of the failed precondition, if any
    pub fn precondition_name(&self) -> Option<&str> {
        match self {
            ApplyError::PreconditionFailed { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Violated permission aspect, if any
    pub fn permission_aspect(&self) -> Option<PermissionAspect> {
        match self {
            ApplyError::PermissionViolated { aspect, .. } => Some(*aspect),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ApplyError::AccountIdMismatch.kind(), ErrorKind::Validation);
        assert_eq!(ApplyError::NegativeBalance.kind(), ErrorKind::Arithmetic);
        assert_eq!(ApplyError::FeeExcessUnavailable.kind(), ErrorKind::FeeExcess);
        assert_eq!(ApplyError::Skipped.kind(), ErrorKind::Skipped);
    }

    #[test]
    fn test_precondition_message() {
        let err = ApplyError::PreconditionFailed {
            name: "nonce".to_string(),
            value: "3".to_string(),
            constraint: "5 <= x <= 5".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "nonce precondition failed: 3 does not satisfy \"5 <= x <= 5\""
        );
        assert_eq!(err.precondition_name(), Some("nonce"));
    }
}
