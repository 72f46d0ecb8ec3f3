use thiserror::Error;

/// Errors from credential handling, URL signing and signature checks.
///
/// Signing itself can only fail with `InvalidArgument`. `MissingEnvVar` comes
/// from `ApiCredentials::from_env`, the rest from `UrlSigner::verify`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Empty API key or secret.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// The URL carries no trailing `sig=...&ts=...` pair.
    #[error("Malformed signed URL: {0}")]
    MalformedSignedUrl(String),

    /// The `ts` parameter is not a decimal epoch second count.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The timestamp lies outside the accepted window.
    #[error("Timestamp {ts} is outside the allowed skew of {max_skew} s (now {now})")]
    ClockSkew { ts: i64, now: i64, max_skew: u64 },

    /// The signature does not match the key, secret and timestamp.
    #[error("Signature mismatch")]
    SignatureMismatch,
}
