use tracing::{info, warn};
use uuid::Uuid;

use super::ProviderProfile;
use crate::{
    accounts::{Account, NewAccount, StoreError},
    error::AppError,
    state::AppState,
};

/// Reconcile a provider profile with a local account by email: link an
/// existing account or create a new password-less one with its profile.
pub async fn link_account(st: &AppState, profile: &ProviderProfile) -> Result<Account, AppError> {
    let Some(email) = profile.email.as_deref().filter(|e| !e.is_empty()) else {
        warn!(provider_id = %profile.id, "provider profile without verified email");
        return Err(AppError::unauthorized("no email found in provider profile"));
    };

    if let Some(existing) = st.accounts.find_by_email(email).await? {
        return relink(st, existing.id, profile).await;
    }

    let new = NewAccount {
        fullname: profile
            .display_name
            .clone()
            .unwrap_or_else(|| email.to_string()),
        email: email.to_string(),
        password_hash: None,
        google_id: Some(profile.id.clone()),
        avatar_url: profile.photo.clone(),
    };
    match st.accounts.create_with_profile(new).await {
        Ok(account) => {
            info!(account_id = %account.id, "account created from provider profile");
            Ok(account)
        }
        // a concurrent first login created it in between
        Err(StoreError::DuplicateEmail) => {
            let existing = st.accounts.find_by_email(email).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("account vanished while linking {email}"))
            })?;
            relink(st, existing.id, profile).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn relink(st: &AppState, id: Uuid, profile: &ProviderProfile) -> Result<Account, AppError> {
    let account = st
        .accounts
        .link_external_identity(id, &profile.id, profile.photo.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    info!(account_id = %account.id, "provider identity linked");
    Ok(account)
}
