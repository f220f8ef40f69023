use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, LoginResponse, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};
use crate::{
    accounts::{Account, NewAccount},
    error::AppError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Treat absent and empty inputs alike.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<Account, AppError> {
    let (Some(fullname), Some(email), Some(password), Some(confirm)) = (
        present(req.username),
        present(req.email),
        present(req.password),
        present(req.confirm_password),
    ) else {
        return Err(AppError::validation("input required"));
    };

    if st.accounts.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("email already registered".into()));
    }

    if password != confirm {
        return Err(AppError::validation("password and confirm password do not match"));
    }

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("invalid email format"));
    }

    let password_hash = hash_password(&password)?;
    let account = st
        .accounts
        .create_with_profile(NewAccount {
            fullname,
            email,
            password_hash: Some(password_hash),
            google_id: None,
            avatar_url: None,
        })
        .await?;

    info!(account_id = %account.id, email = %account.email, "account registered");
    Ok(account)
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(AppError::validation("input required"));
    };

    let Some(account) = st.accounts.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if account.is_oauth_only() {
        warn!(account_id = %account.id, "password login on oauth-only account");
        return Err(AppError::unauthorized(
            "authentication failed, please use Google OAuth to log in",
        ));
    }

    let ok = match account.password_hash.as_deref() {
        Some(hash) => verify_password(&password, hash)?,
        None => false,
    };
    if !ok {
        warn!(account_id = %account.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(st).sign_session(account.id, &account.email)?;
    info!(account_id = %account.id, "account logged in");
    Ok(LoginResponse { account, token })
}
