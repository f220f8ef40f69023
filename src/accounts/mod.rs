//! Credential store: accounts, their password hashes and linked identities,
//! and the one-to-one profile records.

use axum::async_trait;
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod memory;
pub mod repo;
pub mod repo_types;

pub use repo::PgAccountStore;
pub use repo_types::{Account, NewAccount, ProfileUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Every multi-row write is a single transaction; a failed call leaves no partial state.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert an account and its profile (city defaults to "").
    async fn create_with_profile(&self, new: NewAccount) -> Result<Account, StoreError>;

    /// Set the linked external identity and, when given, the avatar. Name, city and birth date stay.
    async fn link_external_identity(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<Option<Account>, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileUpdate,
    ) -> Result<Option<Account>, StoreError>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError>;
}
