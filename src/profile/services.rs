use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{ChangePasswordRequest, ProfileForm};
use crate::{
    accounts::{Account, ProfileUpdate},
    auth::{
        password::{hash_password, verify_password},
        services::present,
    },
    dates::parse_birth_date,
    error::AppError,
    images::services::upload_avatar,
    state::AppState,
};

fn not_found() -> AppError {
    AppError::NotFound("user not found".into())
}

pub async fn get_profile(st: &AppState, account_id: Uuid) -> Result<Account, AppError> {
    st.accounts
        .find_by_id(account_id)
        .await?
        .ok_or_else(not_found)
}

pub async fn update_profile(
    st: &AppState,
    account_id: Uuid,
    form: ProfileForm,
) -> Result<Account, AppError> {
    let birth_date = match present(form.birth_date) {
        Some(raw) => Some(parse_birth_date(&raw).ok_or_else(|| {
            AppError::validation("invalid birth date format, use YYYY-MM-DD")
        })?),
        None => None,
    };

    let mut changes = ProfileUpdate {
        fullname: present(form.fullname),
        birth_date,
        city: present(form.city),
        avatar_url: None,
    };

    if let Some(item) = form.avatar {
        match upload_avatar(st, account_id, item).await {
            Ok(uploaded) => changes.avatar_url = Some(uploaded.url),
            Err(e) => warn!(error = %e, %account_id, "avatar upload failed; keeping current avatar"),
        }
    }

    if changes.is_empty() {
        return Err(AppError::validation("at least one field must be updated"));
    }

    let account = st
        .accounts
        .update_profile(account_id, &changes)
        .await?
        .ok_or_else(not_found)?;
    info!(%account_id, "profile updated");
    Ok(account)
}

pub async fn change_password(
    st: &AppState,
    account_id: Uuid,
    req: ChangePasswordRequest,
) -> Result<Account, AppError> {
    let (Some(old), Some(new), Some(confirm)) = (
        present(req.old_password),
        present(req.new_password),
        present(req.new_password_confirmation),
    ) else {
        return Err(AppError::validation("input required"));
    };

    let account = get_profile(st, account_id).await?;
    let Some(current_hash) = account.password_hash.as_deref() else {
        return Err(AppError::validation(
            "password update is not available for accounts signed in with Google, \
             use the provider's password reset instead",
        ));
    };

    if !verify_password(&old, current_hash)? {
        warn!(%account_id, "password change with wrong old password");
        return Err(AppError::unauthorized("incorrect old password"));
    }
    if new != confirm {
        return Err(AppError::validation(
            "new password and password confirmation do not match",
        ));
    }
    if new == old {
        return Err(AppError::validation(
            "new password must be different from old password",
        ));
    }

    let hash = hash_password(&new)?;
    let account = st
        .accounts
        .update_password(account_id, &hash)
        .await?
        .ok_or_else(not_found)?;
    info!(%account_id, "password changed");
    Ok(account)
}
