//! Claim decision outcomes

use hyper::StatusCode;

/// Why a claim request was denied or failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Deal not found")]
    DealNotFound,

    #[error("Verification required for locked deals")]
    VerificationRequired,

    #[error("Deal already claimed")]
    DuplicateClaim,

    /// Store detail is kept for logs only; `Display` stays generic
    #[error("Internal server error")]
    StoreFailure(String),
}

impl ClaimError {
    /// HTTP status for this outcome
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::DealNotFound => StatusCode::NOT_FOUND,
            Self::VerificationRequired => StatusCode::FORBIDDEN,
            Self::DuplicateClaim => StatusCode::CONFLICT,
            Self::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::DealNotFound => "DEAL_NOT_FOUND",
            Self::VerificationRequired => "VERIFICATION_REQUIRED",
            Self::DuplicateClaim => "DUPLICATE_CLAIM",
            Self::StoreFailure(_) => "INTERNAL_ERROR",
        }
    }
}
