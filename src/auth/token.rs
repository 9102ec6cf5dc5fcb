//! HS256 JSON Web Tokens carrying the user id.
//!
//! Format is the usual `header.payload.signature`, each part base64url without
//! padding, signature = HMAC-SHA256(secret, "header.payload").

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("Invalid signing key")]
    InvalidKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)
}

/// Signs a token for `user_id` valid for `ttl` from `now`.
pub fn issue_token(
    user_id: Uuid,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = Claims {
        user_id,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Checks signature then expiry and returns the claims.
pub fn verify_token(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
    let (header, payload) = signing_input.split_once('.').ok_or(TokenError::Malformed)?;

    let header = URL_SAFE_NO_PAD.decode(header).map_err(|_| TokenError::Malformed)?;
    if header != HEADER.as_bytes() {
        return Err(TokenError::Malformed);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;
    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &[u8] = b"test-secret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, SECRET, Duration::hours(1), now()).unwrap();
        assert_eq!(token.matches('.').count(), 2);

        let claims = verify_token(&token, SECRET, now() + Duration::minutes(59)).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token() {
        let token = issue_token(Uuid::new_v4(), SECRET, Duration::hours(1), now()).unwrap();
        assert_eq!(
            verify_token(&token, SECRET, now() + Duration::hours(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_token(Uuid::new_v4(), SECRET, Duration::days(7), now()).unwrap();
        assert_eq!(
            verify_token(&token, b"other-secret", now()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_payload() {
        let token = issue_token(Uuid::new_v4(), SECRET, Duration::days(7), now()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = Claims {
            user_id: Uuid::new_v4(),
            iat: now().timestamp(),
            exp: (now() + Duration::days(7)).timestamp(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(verify_token(&forged, SECRET, now()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_garbage_token() {
        assert_eq!(verify_token("garbage", SECRET, now()), Err(TokenError::Malformed));
        assert_eq!(verify_token("a.b.c", SECRET, now()), Err(TokenError::Malformed));
    }
}
