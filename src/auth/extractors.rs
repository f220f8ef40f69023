use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{accounts::Account, error::AppError, state::AppState};

/// Verified bearer token resolved to the current account.
pub struct CurrentAccount(pub Account);

/// `Authorization: Bearer <token>`. No header or no credentials is 403; credentials
/// under another scheme are rejected like a bad token.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let not_provided = || AppError::Forbidden("token not provided".into());
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(not_provided)?;
    let (scheme, token) = auth.trim().split_once(' ').ok_or_else(not_provided)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(not_provided());
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        warn!(%scheme, "unsupported authorization scheme");
        return Err(AppError::unauthorized("invalid token"));
    }
    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_session(token).map_err(|e| {
            warn!(error = %e, "session token rejected");
            AppError::from(e)
        })?;

        let account = state
            .accounts
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(account_id = %claims.sub, "token for unknown account");
                AppError::unauthorized("user not found")
            })?;

        Ok(CurrentAccount(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewAccount;
    use axum::http::{Request, StatusCode};
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/me");
        if let Some(v) = auth {
            req = req.header(AUTHORIZATION, v);
        }
        req.body(()).unwrap().into_parts().0
    }

    async fn seeded() -> (AppState, Account) {
        let state = AppState::fake();
        let acc = state
            .accounts
            .create_with_profile(NewAccount {
                fullname: "Alice".into(),
                email: "a@b.com".into(),
                password_hash: Some("hash".into()),
                google_id: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        (state, acc)
    }

    #[test]
    fn bearer_token_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h).unwrap_err().status(), StatusCode::FORBIDDEN);
        h.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&h).unwrap(), "abc.def");
        h.insert(AUTHORIZATION, "bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&h).unwrap(), "abc.def");
        h.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&h).unwrap_err().status(), StatusCode::FORBIDDEN);
        h.insert(AUTHORIZATION, "Bearer".parse().unwrap());
        assert_eq!(bearer_token(&h).unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn other_scheme_with_credentials_is_unauthorized() {
        let (state, _) = seeded().await;
        let err = CurrentAccount::from_request_parts(&mut parts_with(Some("Basic Zm9v")), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "invalid token");
    }

    #[tokio::test]
    async fn missing_token_is_forbidden() {
        let (state, _) = seeded().await;
        let err = CurrentAccount::from_request_parts(&mut parts_with(None), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "token not provided");
    }

    #[tokio::test]
    async fn valid_token_loads_account() {
        let (state, acc) = seeded().await;
        let token = JwtKeys::from_ref(&state).sign_session(acc.id, &acc.email).unwrap();
        let header = format!("Bearer {}", token);
        let CurrentAccount(current) =
            CurrentAccount::from_request_parts(&mut parts_with(Some(&header)), &state)
                .await
                .ok()
                .unwrap();
        assert_eq!(current.id, acc.id);
        assert_eq!(current.email, "a@b.com");
    }

    #[tokio::test]
    async fn bad_and_expired_tokens_are_unauthorized() {
        let (state, acc) = seeded().await;
        let err = CurrentAccount::from_request_parts(&mut parts_with(Some("Bearer nope")), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "invalid token");

        let old = OffsetDateTime::now_utc() - Duration::hours(25);
        let token = JwtKeys::from_ref(&state)
            .sign_session_at(acc.id, &acc.email, old)
            .unwrap();
        let header = format!("Bearer {}", token);
        let err = CurrentAccount::from_request_parts(&mut parts_with(Some(&header)), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "expired token");
    }

    #[tokio::test]
    async fn token_for_missing_account_is_unauthorized() {
        let (state, _) = seeded().await;
        let token = JwtKeys::from_ref(&state)
            .sign_session(Uuid::new_v4(), "ghost@b.com")
            .unwrap();
        let header = format!("Bearer {}", token);
        let err = CurrentAccount::from_request_parts(&mut parts_with(Some(&header)), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
