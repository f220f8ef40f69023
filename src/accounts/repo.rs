use axum::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{
    repo_types::{Account, AccountRow, NewAccount, ProfileUpdate},
    AccountStore, StoreError,
};

const SELECT_ACCOUNT: &str = r#"
    SELECT a.id, a.fullname, a.email, a.password_hash, a.google_id, a.created_at,
           p.id AS profile_id, p.avatar_url, p.birth_date, p.city
      FROM accounts a
      JOIN profiles p ON p.account_id = a.id
"#;

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn classify(e: sqlx::Error) -> StoreError {
    let unique_violation = e
        .as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "23505");
    if unique_violation {
        StoreError::DuplicateEmail
    } else {
        StoreError::Database(e)
    }
}

async fn fetch_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Account>, StoreError> {
    let row = sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Account::from))
}

/// Lock the account row for the rest of the transaction; false when it does not exist.
async fn lock_account(conn: &mut PgConnection, id: Uuid) -> Result<bool, StoreError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut conn = self.db.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE a.email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn create_with_profile(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut tx = self.db.begin().await?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO accounts (fullname, email, password_hash, google_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&new.fullname)
        .bind(&new.email)
        .bind(new.password_hash.as_deref())
        .bind(new.google_id.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            INSERT INTO profiles (account_id, avatar_url, city)
            VALUES ($1, $2, '')
            "#,
        )
        .bind(id)
        .bind(new.avatar_url.as_deref())
        .execute(&mut *tx)
        .await?;

        let account = fetch_by_id(&mut tx, id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        tx.commit().await?;

        debug!(account_id = %id, "account and profile created");
        Ok(account)
    }

    async fn link_external_identity(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query("UPDATE accounts SET google_id = $2 WHERE id = $1")
            .bind(id)
            .bind(google_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE profiles
               SET avatar_url = COALESCE($2, avatar_url)
             WHERE account_id = $1
            "#,
        )
        .bind(id)
        .bind(avatar_url)
        .execute(&mut *tx)
        .await?;

        let account = fetch_by_id(&mut tx, id).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileUpdate,
    ) -> Result<Option<Account>, StoreError> {
        let mut tx = self.db.begin().await?;
        if !lock_account(&mut tx, id).await? {
            return Ok(None);
        }

        if let Some(fullname) = &changes.fullname {
            sqlx::query("UPDATE accounts SET fullname = $2 WHERE id = $1")
                .bind(id)
                .bind(fullname)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO profiles (account_id, birth_date, city, avatar_url)
            VALUES ($1, $2, COALESCE($3, ''), $4)
            ON CONFLICT (account_id) DO UPDATE
               SET birth_date = COALESCE(EXCLUDED.birth_date, profiles.birth_date),
                   city       = COALESCE($3, profiles.city),
                   avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url)
            "#,
        )
        .bind(id)
        .bind(changes.birth_date)
        .bind(changes.city.as_deref())
        .bind(changes.avatar_url.as_deref())
        .execute(&mut *tx)
        .await?;

        let account = fetch_by_id(&mut tx, id).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let account = fetch_by_id(&mut tx, id).await?;
        tx.commit().await?;
        Ok(account)
    }
}
