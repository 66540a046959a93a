use thiserror::Error;

/// Errors raised while parsing or verifying identity material.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid key bytes")]
    InvalidKeyBytes,

    #[error("Invalid identity envelope format")]
    InvalidFormat,

    #[error("Unsupported identity envelope version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Base64 decode error")]
    Base64Decode,
}
