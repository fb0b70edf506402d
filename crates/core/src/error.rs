use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid root hash: expected {expected} bytes, got {actual}")]
    InvalidRootHash { expected: usize, actual: usize },

    #[error("Missing session header on claim from supplier {0}")]
    MissingSessionHeader(String),

    #[error("Denom mismatch: expected {expected}, got {actual}")]
    DenomMismatch { expected: String, actual: String },

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Insufficient amount: need {needed}, have {available}")]
    InsufficientAmount { needed: u64, available: u64 },

    #[error("Invalid target hash: {0}")]
    InvalidTargetHash(String),

    #[error("Missing param: {0}")]
    MissingParam(&'static str),

    #[error("Invalid params: {0}")]
    InvalidParams(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_root_hash() {
        let err = CoreError::InvalidRootHash { expected: 48, actual: 12 };
        assert_eq!(err.to_string(), "Invalid root hash: expected 48 bytes, got 12");
    }

    #[test]
    fn test_error_display_denom_mismatch() {
        let err = CoreError::DenomMismatch {
            expected: "ucraft".to_string(),
            actual: "uatom".to_string(),
        };
        assert_eq!(err.to_string(), "Denom mismatch: expected ucraft, got uatom");
    }

    #[test]
    fn test_error_display_missing_param() {
        let err = CoreError::MissingParam("proof_missing_penalty");
        assert_eq!(err.to_string(), "Missing param: proof_missing_penalty");
    }

    #[test]
    fn test_error_display_insufficient_amount() {
        let err = CoreError::InsufficientAmount { needed: 10, available: 3 };
        assert_eq!(err.to_string(), "Insufficient amount: need 10, have 3");
    }
}
