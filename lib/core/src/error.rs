use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these —
// never on the human-readable message string.

/// Stable error code constants.
///
/// Codes never change; messages may be reworded.
pub mod error_code {
    pub const INVALID_ALGORITHM: &str = "INVALID_ALGORITHM";
    pub const MISSING_PARAMETER: &str = "MISSING_PARAMETER";
    pub const MALFORMED_INPUT: &str = "MALFORMED_INPUT";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const PADDING_ERROR: &str = "PADDING_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified error type used across the crypto and catalog crates.
///
/// Each variant maps to a stable error code (see [`error_code`]). The
/// service layer translates these into user-facing responses; nothing
/// in this workspace panics on them.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Unknown cipher or hash algorithm name.
    #[error("{0}")]
    InvalidAlgorithm(String),

    /// A required parameter is absent (e.g. AES decrypt without an IV).
    #[error("{0}")]
    MissingParameter(String),

    /// Input bytes or strings do not parse (non-hex key, short header).
    #[error("{0}")]
    MalformedInput(String),

    /// Unknown firmware id or missing backing file.
    #[error("{0}")]
    NotFound(String),

    /// Storage backend read/write failure.
    #[error("{0}")]
    Storage(String),

    /// Invalid PKCS7 padding encountered on decrypt.
    #[error("{0}")]
    Padding(String),

    /// Unexpected internal error.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::InvalidAlgorithm(_) => error_code::INVALID_ALGORITHM,
            ServiceError::MissingParameter(_) => error_code::MISSING_PARAMETER,
            ServiceError::MalformedInput(_) => error_code::MALFORMED_INPUT,
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Padding(_) => error_code::PADDING_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_mapping() {
        assert_eq!(ServiceError::InvalidAlgorithm("x".into()).error_code(), "INVALID_ALGORITHM");
        assert_eq!(ServiceError::MissingParameter("x".into()).error_code(), "MISSING_PARAMETER");
        assert_eq!(ServiceError::MalformedInput("x".into()).error_code(), "MALFORMED_INPUT");
        assert_eq!(ServiceError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(ServiceError::Storage("x".into()).error_code(), "STORAGE_ERROR");
        assert_eq!(ServiceError::Padding("x".into()).error_code(), "PADDING_ERROR");
        assert_eq!(ServiceError::Internal("x".into()).error_code(), "INTERNAL");
    }

    #[test]
    fn error_display_is_just_message() {
        assert_eq!(
            ServiceError::NotFound("firmware 'fw_1' not found".into()).to_string(),
            "firmware 'fw_1' not found"
        );
        assert_eq!(
            ServiceError::InvalidAlgorithm("unsupported: rot13".into()).to_string(),
            "unsupported: rot13"
        );
    }
}
