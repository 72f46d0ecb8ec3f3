//! Signed-URL access to the Baron weather API.
//!
//! Requests are authenticated by appending `sig` and `ts` query parameters:
//! an HMAC-SHA1 of `"{key}:{ts}"` under the API secret, base64 encoded with
//! URL-safe substitutions. The secret itself is never transmitted.
//!
//! # Example
//!
//! ```rust,ignore
//! use baron_wx_client::{ApiClient, ApiCredentials, SignerConfig, UrlSigner};
//!
//! let credentials = ApiCredentials::new(key, secret)?;
//! let signer = UrlSigner::new(SignerConfig::default());
//! let signed = signer.sign_with("http://api.velocityweather.com/v1/KEY/reports/metar/station/egll.json", &credentials);
//!
//! let client = ApiClient::new(config::DEFAULT_API_HOST, credentials, signer, 30)?;
//! let metar = client.get_json("/reports/metar/station/egll.json").await?;
//! ```

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod signer;

pub use api::{ApiClient, Payload};
pub use config::Config;
pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::{
    compute_signature, sign_request, Clock, FixedClock, SignedUrl, SignerConfig, SystemClock,
    UrlSigner, VerifiedUrl,
};
