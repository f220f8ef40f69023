use axum::{
    extract::{FromRef, Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap,
    },
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::linker::link_account;
use crate::{auth::jwt::JwtKeys, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Browser half of the OAuth `state`; scoped to the oauth routes.
const NONCE_COOKIE: &str = "oauth_nonce";
const NONCE_COOKIE_ATTRS: &str = "Path=/api/v1/oauth; HttpOnly; SameSite=Lax";

fn nonce_cookie(nonce: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; {}; Max-Age={}",
        NONCE_COOKIE, nonce, NONCE_COOKIE_ATTRS, max_age_secs
    )
}

/// Value of cookie `name` across all `Cookie` headers.
pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/oauth/start", get(start))
        .route("/oauth/callback", get(callback))
}

/// 307 → provider consent page; the nonce inside `state` is also set as a cookie.
#[instrument(skip(state))]
pub async fn start(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let nonce = Uuid::new_v4().simple().to_string();
    let oauth_state = JwtKeys::from_ref(&state).sign_oauth_state(&nonce)?;
    Ok((
        [(SET_COOKIE, nonce_cookie(&nonce, 10 * 60))],
        Redirect::temporary(&state.identity.authorize_url(&oauth_state)),
    ))
}

/// Provider redirect target. Links the account, then 303 → `<frontend>/?token=<token>`.
#[instrument(skip(state, headers, q))]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(err) = q.error.as_deref() {
        warn!(error = %err, "provider returned an error");
        return Err(AppError::unauthorized("oauth login was cancelled or failed"));
    }
    let (Some(code), Some(oauth_state)) = (q.code.as_deref(), q.state.as_deref()) else {
        return Err(AppError::unauthorized("oauth login was cancelled or failed"));
    };

    let keys = JwtKeys::from_ref(&state);
    let nonce = cookie_value(&headers, NONCE_COOKIE).unwrap_or_default();
    keys.verify_oauth_state(oauth_state, nonce).map_err(|e| {
        warn!(error = %e, "oauth state rejected");
        AppError::unauthorized("invalid oauth state")
    })?;

    let profile = state.identity.fetch_profile(code).await.map_err(|e| {
        warn!(error = %e, "provider profile fetch failed");
        AppError::unauthorized("could not verify identity with provider")
    })?;

    let account = link_account(&state, &profile).await?;
    let token = keys.sign_session(account.id, &account.email)?;

    info!(account_id = %account.id, "oauth login");
    Ok((
        [(SET_COOKIE, nonce_cookie("", 0))],
        Redirect::to(&format!(
            "{}/?token={}",
            state.config.frontend_url.trim_end_matches('/'),
            urlencoding::encode(&token)
        )),
    ))
}
