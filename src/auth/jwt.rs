use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Lifetime of the signed `state` parameter of an OAuth round trip.
const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    OauthState,
}

/// Session token payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // account ID
    pub email: String,
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

/// Payload of the CSRF `state` value sent through the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateClaims {
    pub nonce: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("jwt secret is not configured")]
    MissingSecret,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    configured: bool,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = cfg.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            session_ttl: Duration::from_secs((ttl_minutes.max(0) as u64) * 60),
            configured: !secret.is_empty(),
        }
    }

    fn ensure_configured(&self) -> Result<(), TokenError> {
        if self.configured {
            Ok(())
        } else {
            Err(TokenError::MissingSecret)
        }
    }

    fn encode<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        self.ensure_configured()?;
        encode(&Header::default(), claims, &self.encoding).map_err(TokenError::Signing)
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        self.ensure_configured()?;
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// Same lifetime for password and OAuth logins.
    pub fn sign_session(&self, account_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.sign_session_at(account_id, email, OffsetDateTime::now_utc())
    }

    pub(crate) fn sign_session_at(
        &self,
        account_id: Uuid,
        email: &str,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let exp = issued_at + TimeDuration::seconds(self.session_ttl.as_secs() as i64);
        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Session,
        };
        let token = self.encode(&claims)?;
        debug!(account_id = %account_id, "session token signed");
        Ok(token)
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims, TokenError> {
        let claims: Claims = self.decode(token)?;
        if claims.kind != TokenKind::Session {
            return Err(TokenError::Invalid("not a session token".into()));
        }
        debug!(account_id = %claims.sub, "session token verified");
        Ok(claims)
    }

    /// `nonce` is also handed to the browser; the callback accepts the state only
    /// together with that browser's copy.
    pub fn sign_oauth_state(&self, nonce: &str) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(OAUTH_STATE_TTL.as_secs() as i64);
        self.encode(&StateClaims {
            nonce: nonce.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::OauthState,
        })
    }

    pub fn verify_oauth_state(&self, state: &str, nonce: &str) -> Result<StateClaims, TokenError> {
        let claims: StateClaims = self.decode(state)?;
        if claims.kind != TokenKind::OauthState {
            return Err(TokenError::Invalid("not an oauth state".into()));
        }
        if nonce.is_empty() || claims.nonce != nonce {
            return Err(TokenError::Invalid("oauth state issued to another browser".into()));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 24 * 60,
        })
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let id = Uuid::new_v4();
        let token = keys.sign_session(id, "a@b.com").expect("sign session");
        let claims = keys.verify_session(&token).expect("verify token");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn session_valid_just_before_24h_and_expired_just_after() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let now = OffsetDateTime::now_utc();

        let almost = now - TimeDuration::hours(23) - TimeDuration::minutes(59);
        let token = keys.sign_session_at(Uuid::new_v4(), "a@b.com", almost).unwrap();
        assert!(keys.verify_session(&token).is_ok());

        let past = now - TimeDuration::hours(24) - TimeDuration::minutes(1);
        let token = keys.sign_session_at(Uuid::new_v4(), "a@b.com", past).unwrap();
        assert!(matches!(keys.verify_session(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn verify_rejects_other_secret_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let token = good.sign_session(Uuid::new_v4(), "x@y.io").unwrap();

        let other_secret = make_keys("other-secret", "good-iss", "good-aud");
        assert!(matches!(other_secret.verify_session(&token), Err(TokenError::Invalid(_))));

        let other_claims = make_keys("same-secret", "bad-iss", "bad-aud");
        assert!(matches!(other_claims.verify_session(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.verify_session("not.a.jwt"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn state_and_session_tokens_are_not_interchangeable() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let state = keys.sign_oauth_state("n-1").unwrap();
        assert!(keys.verify_oauth_state(&state, "n-1").is_ok());
        assert!(keys.verify_session(&state).is_err());

        let session = keys.sign_session(Uuid::new_v4(), "a@b.com").unwrap();
        assert!(keys.verify_oauth_state(&session, "n-1").is_err());
    }

    #[test]
    fn oauth_state_is_bound_to_its_nonce() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let state = keys.sign_oauth_state("browser-a").unwrap();
        let claims = keys.verify_oauth_state(&state, "browser-a").unwrap();
        assert_eq!(claims.nonce, "browser-a");
        assert!(matches!(
            keys.verify_oauth_state(&state, "browser-b"),
            Err(TokenError::Invalid(_))
        ));
        assert!(keys.verify_oauth_state(&state, "").is_err());
    }

    #[test]
    fn empty_secret_is_reported() {
        let keys = make_keys("", "iss", "aud");
        assert!(matches!(
            keys.sign_session(Uuid::new_v4(), "a@b.com"),
            Err(TokenError::MissingSecret)
        ));
        assert!(matches!(keys.verify_session("a.b.c"), Err(TokenError::MissingSecret)));
    }
}
