use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::{Account, NewAccount, Profile, ProfileUpdate},
    AccountStore, StoreError,
};

/// In-process store used by unit tests. Counts successful writes.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
    writes: AtomicUsize,
}

impl MemoryAccountStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut Account)) -> Option<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let acc = accounts.get_mut(&id)?;
        f(acc);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Some(acc.clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn create_with_profile(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.values().any(|a| a.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let account = Account {
            id: Uuid::new_v4(),
            fullname: new.fullname,
            email: new.email,
            password_hash: new.password_hash,
            google_id: new.google_id,
            created_at: OffsetDateTime::now_utc(),
            profile: Profile {
                id: Uuid::new_v4(),
                avatar_url: new.avatar_url,
                birth_date: None,
                city: String::new(),
            },
        };
        accounts.insert(account.id, account.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(account)
    }

    async fn link_external_identity(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.modify(id, |acc| {
            acc.google_id = Some(google_id.to_string());
            if let Some(url) = avatar_url {
                acc.profile.avatar_url = Some(url.to_string());
            }
        }))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileUpdate,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.modify(id, |acc| {
            if let Some(name) = &changes.fullname {
                acc.fullname = name.clone();
            }
            if let Some(d) = changes.birth_date {
                acc.profile.birth_date = Some(d);
            }
            if let Some(city) = &changes.city {
                acc.profile.city = city.clone();
            }
            if let Some(url) = &changes.avatar_url {
                acc.profile.avatar_url = Some(url.clone());
            }
        }))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.modify(id, |acc| acc.password_hash = Some(password_hash.to_string())))
    }
}
