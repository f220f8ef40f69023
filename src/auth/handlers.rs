use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::{
    dto::{LoginRequest, LoginResponse, RegisterRequest},
    extractors::CurrentAccount,
    services,
};
use crate::{
    accounts::Account,
    response::{created, ok, ApiJson, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<Account> {
    let account = services::register(&state, payload).await?;
    created("User created successfully", account)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let res = services::login(&state, payload).await?;
    ok("success", res)
}

#[instrument(skip_all)]
pub async fn get_me(CurrentAccount(account): CurrentAccount) -> ApiResult<Account> {
    ok("User authenticated successfully", account)
}
