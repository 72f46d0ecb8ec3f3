//! HMAC-SHA1 URL signing for the Baron weather API.
//!
//! A signed URL carries two extra query parameters appended to the original:
//!
//! - `sig`: HMAC-SHA1 of `"{key}:{ts}"` keyed with the API secret, standard
//!   base64 with `/` replaced by `_` and `+` by `-`
//! - `ts`: the signing time in seconds since the Unix epoch
//!
//! The server rejects signatures whose `ts` is too far from its own clock, so a
//! signed URL is only good for a short while and must be built per request.

use crate::credentials::ApiCredentials;
use crate::error::AuthError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Accepts signatures with or without trailing `=`.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Source of the signing timestamp.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> i64;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignerConfig {
    /// Drop trailing `=` padding from the signature.
    pub strip_padding: bool,
}

/// Result of one signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub signature: String,
    pub timestamp: i64,
}

/// A signed URL that passed `UrlSigner::verify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUrl {
    /// The URL without its trailing `sig`/`ts` pair.
    pub base_url: String,
    pub timestamp: i64,
}

/// Signs URLs with the configured padding rule and clock.
///
/// Holds no mutable state, so one signer can be shared freely across tasks.
#[derive(Debug, Clone)]
pub struct UrlSigner<C = SystemClock> {
    config: SignerConfig,
    clock: C,
}

impl UrlSigner<SystemClock> {
    pub fn new(config: SignerConfig) -> Self {
        Self {
            config,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> UrlSigner<C> {
    /// Create a signer that reads time from `clock`.
    pub fn with_clock(config: SignerConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> SignerConfig {
        self.config
    }

    /// Append `sig=...&ts=...` to `url`.
    ///
    /// The parameters are joined with `?` when `url` has no query string and
    /// with `&` otherwise. The original URL text is kept unchanged.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidArgument` if `key` or `secret` is empty.
    pub fn sign(&self, url: &str, key: &str, secret: &str) -> Result<String, AuthError> {
        Ok(self.sign_parts(url, key, secret)?.url)
    }

    /// Like `sign`, but also returns the signature and timestamp that were used.
    pub fn sign_parts(&self, url: &str, key: &str, secret: &str) -> Result<SignedUrl, AuthError> {
        check_not_empty(key, secret)?;
        Ok(self.sign_at(url, key, secret, self.clock.now_secs()))
    }

    /// Sign with already validated credentials.
    pub fn sign_with(&self, url: &str, credentials: &ApiCredentials) -> String {
        self.sign_at(
            url,
            credentials.api_key(),
            credentials.expose_secret(),
            self.clock.now_secs(),
        )
        .url
    }

    fn sign_at(&self, url: &str, key: &str, secret: &str, ts: i64) -> SignedUrl {
        let signature = compute_signature(key, secret, ts, self.config.strip_padding);
        let join = if url.contains('?') { '&' } else { '?' };

        SignedUrl {
            url: format!("{url}{join}sig={signature}&ts={ts}"),
            signature,
            timestamp: ts,
        }
    }

    /// Check the trailing `sig`/`ts` pair of a signed URL.
    ///
    /// Padded and unpadded signatures are both accepted. The timestamp must
    /// be within `max_skew_secs` of this signer's clock.
    pub fn verify(
        &self,
        signed_url: &str,
        key: &str,
        secret: &str,
        max_skew_secs: u64,
    ) -> Result<VerifiedUrl, AuthError> {
        check_not_empty(key, secret)?;

        let (base_url, sig, ts_str) = split_signature(signed_url)?;

        if ts_str.is_empty() || !ts_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuthError::InvalidTimestamp(ts_str.to_string()));
        }
        let ts: i64 = ts_str
            .parse()
            .map_err(|_| AuthError::InvalidTimestamp(ts_str.to_string()))?;

        let now = self.clock.now_secs();
        if now.abs_diff(ts) > max_skew_secs {
            return Err(AuthError::ClockSkew {
                ts,
                now,
                max_skew: max_skew_secs,
            });
        }

        let sig_bytes = URL_SAFE_LENIENT
            .decode(sig)
            .map_err(|_| AuthError::SignatureMismatch)?;

        let mut mac = new_mac(secret);
        mac.update(signing_message(key, ts).as_bytes());
        mac.verify_slice(&sig_bytes)
            .map_err(|_| AuthError::SignatureMismatch)?;

        Ok(VerifiedUrl {
            base_url: base_url.to_string(),
            timestamp: ts,
        })
    }
}

/// Sign `url` with the default configuration and the wall clock.
pub fn sign_request(url: &str, key: &str, secret: &str) -> Result<String, AuthError> {
    UrlSigner::new(SignerConfig::default()).sign(url, key, secret)
}

/// Compute the URL-safe signature for `key` at `ts`.
pub fn compute_signature(key: &str, secret: &str, ts: i64, strip_padding: bool) -> String {
    let mut mac = new_mac(secret);
    mac.update(signing_message(key, ts).as_bytes());

    let encoded = STANDARD.encode(mac.finalize().into_bytes());
    let signature = encoded.replace('/', "_").replace('+', "-");

    if strip_padding {
        signature.trim_end_matches('=').to_string()
    } else {
        signature
    }
}

fn new_mac(secret: &str) -> HmacSha1 {
    HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

fn signing_message(key: &str, ts: i64) -> String {
    format!("{key}:{ts}")
}

fn check_not_empty(key: &str, secret: &str) -> Result<(), AuthError> {
    if key.is_empty() {
        return Err(AuthError::InvalidArgument("API key must not be empty".into()));
    }
    if secret.is_empty() {
        return Err(AuthError::InvalidArgument("API secret must not be empty".into()));
    }
    Ok(())
}

/// Split a signed URL into (base, sig, ts) at its last `sig` parameter.
///
/// Signature values never contain `?` or `&`, so the last `?sig=` / `&sig=`
/// before the final `&ts=` is the real one.
fn split_signature(url: &str) -> Result<(&str, &str, &str), AuthError> {
    let ts_pos = url
        .rfind("&ts=")
        .ok_or_else(|| AuthError::MalformedSignedUrl("missing ts parameter".into()))?;
    let head = &url[..ts_pos];
    let ts = &url[ts_pos + "&ts=".len()..];

    let sig_pos = ["?sig=", "&sig="]
        .iter()
        .filter_map(|p| head.rfind(p))
        .max()
        .ok_or_else(|| AuthError::MalformedSignedUrl("missing sig parameter".into()))?;
    let sig = &head[sig_pos + "?sig=".len()..];

    if sig.is_empty() || sig.contains('&') {
        return Err(AuthError::MalformedSignedUrl(
            "sig must directly precede ts".into(),
        ));
    }

    Ok((&head[..sig_pos], sig, ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(ts: i64) -> UrlSigner<FixedClock> {
        UrlSigner::with_clock(SignerConfig::default(), FixedClock(ts))
    }

    fn fixed_stripped(ts: i64) -> UrlSigner<FixedClock> {
        UrlSigner::with_clock(SignerConfig { strip_padding: true }, FixedClock(ts))
    }

    #[test]
    fn test_golden_signature() {
        assert_eq!(
            compute_signature("abc", "xyz", 1_700_000_000, false),
            "bs0y100RlU13c4JhrIJEMjZZTW0="
        );
    }

    #[test]
    fn test_golden_signature_stripped() {
        assert_eq!(
            compute_signature("abc", "xyz", 1_700_000_000, true),
            "bs0y100RlU13c4JhrIJEMjZZTW0"
        );
    }

    #[test]
    fn test_url_unsafe_chars_substituted() {
        // standard base64 for this input is "3+/oyaPYtRI+MRFKVzCkhbfnSQk="
        let sig = compute_signature("K", "S", 1017, false);
        assert_eq!(sig, "3-_oyaPYtRI-MRFKVzCkhbfnSQk=");
        assert!(!sig.contains('/'));
        assert!(!sig.contains('+'));
    }

    #[test]
    fn test_sign_example_url() {
        let signed = fixed(1000).sign("http://x/y", "K", "S").unwrap();
        assert_eq!(signed, "http://x/y?sig=c3L18prqchNoZcviprU5evhPotE=&ts=1000");
    }

    #[test]
    fn test_sign_without_query_uses_question_mark() {
        let signed = fixed(1_700_000_000)
            .sign("http://api.example.com/v1/abc/reports/metar/station/egll.json", "abc", "xyz")
            .unwrap();

        assert_eq!(signed.matches('?').count(), 1);
        let sig_pos = signed.find("?sig=").unwrap();
        let ts_pos = signed.find("&ts=").unwrap();
        assert!(sig_pos < ts_pos);
        assert!(signed.ends_with("&ts=1700000000"));
    }

    #[test]
    fn test_sign_with_query_appends_ampersand() {
        let url = "http://x/y/metar/nearest.json?lat=38&lon=-96&within_radius=500";
        let signed = fixed(1_700_000_000).sign(url, "abc", "xyz").unwrap();

        assert_eq!(
            signed,
            format!("{url}&sig=bs0y100RlU13c4JhrIJEMjZZTW0=&ts=1700000000")
        );
    }

    #[test]
    fn test_strip_padding_variant() {
        let signed = fixed_stripped(1000).sign("http://x/y", "K", "S").unwrap();
        assert_eq!(signed, "http://x/y?sig=c3L18prqchNoZcviprU5evhPotE&ts=1000");
    }

    #[test]
    fn test_different_timestamps_differ() {
        let a = fixed(1_700_000_000).sign_parts("http://x/y", "abc", "xyz").unwrap();
        let b = fixed(1_700_000_001).sign_parts("http://x/y", "abc", "xyz").unwrap();

        assert_ne!(a.signature, b.signature);
        assert_ne!(a.url, b.url);
        assert_eq!(b.signature, "wm2Y4zuU_ZcH5ZjeK4BxwrwL6NE=");
    }

    #[test]
    fn test_empty_key_or_secret_rejected() {
        let signer = fixed(1000);
        assert!(matches!(
            signer.sign("http://x/y", "", "S"),
            Err(AuthError::InvalidArgument(_))
        ));
        assert!(matches!(
            signer.sign("http://x/y", "K", ""),
            Err(AuthError::InvalidArgument(_))
        ));
        assert!(matches!(
            sign_request("http://x/y", "", ""),
            Err(AuthError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sign_parts_fields() {
        let parts = fixed(1000).sign_parts("http://x/y", "K", "S").unwrap();
        assert_eq!(parts.signature, "c3L18prqchNoZcviprU5evhPotE=");
        assert_eq!(parts.timestamp, 1000);
        assert!(parts.url.ends_with("sig=c3L18prqchNoZcviprU5evhPotE=&ts=1000"));
    }

    #[test]
    fn test_sign_with_credentials_matches_sign() {
        let creds = ApiCredentials::new("K", "S").unwrap();
        let signer = fixed(1000);
        assert_eq!(
            signer.sign_with("http://x/y", &creds),
            signer.sign("http://x/y", "K", "S").unwrap()
        );
    }

    #[test]
    fn test_resigning_appends_second_pair() {
        let signer = fixed(1000);
        let once = signer.sign("http://x/y", "K", "S").unwrap();
        let twice = signer.sign(&once, "K", "S").unwrap();

        assert!(twice.starts_with(&once));
        assert_eq!(twice.matches("sig=").count(), 2);
        assert_eq!(twice.matches('?').count(), 1);
    }

    #[test]
    fn test_sign_request_uses_wall_clock() {
        let before = chrono::Utc::now().timestamp();
        let signed = sign_request("http://x/y", "K", "S").unwrap();
        let after = chrono::Utc::now().timestamp();

        let ts: i64 = signed.rsplit("&ts=").next().unwrap().parse().unwrap();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_verify_accepts_own_signature() {
        let signer = fixed(1000);
        let url = "http://x/v1/K/reports/lightning/count/region.json?w_lon=-160&e_lon=0";
        let signed = signer.sign(url, "K", "S").unwrap();

        let verified = signer.verify(&signed, "K", "S", 300).unwrap();
        assert_eq!(verified.base_url, url);
        assert_eq!(verified.timestamp, 1000);
    }

    #[test]
    fn test_verify_accepts_stripped_padding() {
        let signed = fixed_stripped(1000).sign("http://x/y", "K", "S").unwrap();
        assert!(fixed(1000).verify(&signed, "K", "S", 0).is_ok());
    }

    #[test]
    fn test_verify_wrong_secret() {
        let signed = fixed(1000).sign("http://x/y", "K", "S").unwrap();
        assert_eq!(
            fixed(1000).verify(&signed, "K", "other", 300),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn test_verify_tampered_timestamp() {
        let signed = fixed(1000).sign("http://x/y", "K", "S").unwrap();
        let tampered = signed.replace("&ts=1000", "&ts=1001");
        assert_eq!(
            fixed(1000).verify(&tampered, "K", "S", 300),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn test_verify_clock_skew() {
        let signed = fixed(1000).sign("http://x/y", "K", "S").unwrap();
        assert_eq!(
            fixed(1301).verify(&signed, "K", "S", 300),
            Err(AuthError::ClockSkew {
                ts: 1000,
                now: 1301,
                max_skew: 300
            })
        );
        assert!(fixed(1300).verify(&signed, "K", "S", 300).is_ok());
        assert!(fixed(700).verify(&signed, "K", "S", 300).is_ok());
    }

    #[test]
    fn test_verify_malformed() {
        let signer = fixed(1000);
        assert!(matches!(
            signer.verify("http://x/y", "K", "S", 300),
            Err(AuthError::MalformedSignedUrl(_))
        ));
        assert!(matches!(
            signer.verify("http://x/y?a=1&ts=1000", "K", "S", 300),
            Err(AuthError::MalformedSignedUrl(_))
        ));
        assert!(matches!(
            signer.verify("http://x/y?sig=abc&x=1&ts=1000", "K", "S", 300),
            Err(AuthError::MalformedSignedUrl(_))
        ));
        assert!(matches!(
            signer.verify("http://x/y?sig=abc&ts=10a0", "K", "S", 300),
            Err(AuthError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_verify_checks_last_pair() {
        let first = fixed(1000).sign("http://x/y", "K", "S").unwrap();
        let second = fixed(1010).sign(&first, "K", "S").unwrap();

        let verified = fixed(1010).verify(&second, "K", "S", 5).unwrap();
        assert_eq!(verified.base_url, first);
        assert_eq!(verified.timestamp, 1010);
    }

    #[test]
    fn test_signed_url_serializes() {
        let parts = fixed(1000).sign_parts("http://x/y", "K", "S").unwrap();
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json["timestamp"], 1000);
        assert_eq!(json["signature"], "c3L18prqchNoZcviprU5evhPotE=");
    }
}
