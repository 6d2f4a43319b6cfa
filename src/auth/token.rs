use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;

/// The subset of JWT claims the client cares about.
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    /// Expiration timestamp (seconds since epoch).
    #[serde(default)]
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT without verifying its signature.
///
/// The signing secret lives on the server; the client only needs to know
/// when the credential stops being accepted. Returns `None` for opaque
/// (non-JWT) tokens and for tokens without an `exp` claim.
pub fn token_expiration(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    data.claims
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}
