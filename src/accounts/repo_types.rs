use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::dates::serialize_date_only;

/// Account with its one-to-one profile, as returned by the credential store.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // Argon2 hash, None for OAuth-only accounts
    pub google_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub profile: Profile,
}

impl Account {
    pub fn is_oauth_only(&self) -> bool {
        self.password_hash.is_none() && self.google_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub avatar_url: Option<String>,
    #[serde(serialize_with = "serialize_date_only")]
    pub birth_date: Option<Date>,
    pub city: String,
}

/// Input for creating an account together with its profile.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub fullname: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
}

/// Partial update over the account and profile tables. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub birth_date: Option<Date>,
    pub city: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.birth_date.is_none()
            && self.city.is_none()
            && self.avatar_url.is_none()
    }
}

/// Flat row of `accounts JOIN profiles`.
#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub profile_id: Uuid,
    pub avatar_url: Option<String>,
    pub birth_date: Option<Date>,
    pub city: String,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Self {
            id: r.id,
            fullname: r.fullname,
            email: r.email,
            password_hash: r.password_hash,
            google_id: r.google_id,
            created_at: r.created_at,
            profile: Profile {
                id: r.profile_id,
                avatar_url: r.avatar_url,
                birth_date: r.birth_date,
                city: r.city,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample() -> Account {
        Account {
            id: Uuid::new_v4(),
            fullname: "Alice".into(),
            email: "a@b.com".into(),
            password_hash: Some("$argon2id$secret".into()),
            google_id: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            profile: Profile {
                id: Uuid::new_v4(),
                avatar_url: None,
                birth_date: Some(date!(1990 - 01 - 31)),
                city: String::new(),
            },
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["profile"]["birth_date"], "1990-01-31");
        assert_eq!(json["profile"]["city"], "");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn oauth_only_requires_missing_hash_and_linked_id() {
        let mut acc = sample();
        assert!(!acc.is_oauth_only());
        acc.google_id = Some("g-1".into());
        assert!(!acc.is_oauth_only());
        acc.password_hash = None;
        assert!(acc.is_oauth_only());
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(ProfileUpdate::default().is_empty());
        let upd = ProfileUpdate {
            city: Some("Jakarta".into()),
            ..Default::default()
        };
        assert!(!upd.is_empty());
    }
}
