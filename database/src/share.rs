use crate::{access, Database, DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use model::access::{Caller, Permission};
use sqlx::FromRow;
use uuid::Uuid;

pub type ShareDatabase = Database<Share>;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Share {
    pub id: Uuid,
    pub list_id: Uuid,
    pub email: String,
    pub role: String,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ShareDatabase {
    /// Shares a list with `email`.
    ///
    /// An expired share for the same email is replaced, an active one is a
    /// [`DatabaseError::Conflict`].
    pub async fn insert_share(
        &self,
        caller: &Caller,
        list_id: Uuid,
        email: &str,
        role: &str,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<Share> {
        let mut tx = self.begin().await?;
        access::require(&mut *tx, list_id, caller, Permission::Manage).await?;

        if email == caller.email {
            return Err(DatabaseError::Invalid(
                "a list cannot be shared with its owner".to_owned(),
            ));
        }

        let share = sqlx::query_as::<_, Share>(
            "
            INSERT INTO list_shares (id, list_id, email, role, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (list_id, email) DO UPDATE
            SET id = EXCLUDED.id,
                role = EXCLUDED.role,
                created_by = EXCLUDED.created_by,
                expires_at = EXCLUDED.expires_at,
                created_at = now()
            WHERE list_shares.expires_at <= now()
            RETURNING id, list_id, email, role, created_by, expires_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(list_id)
        .bind(email)
        .bind(role)
        .bind(caller.user_id)
        .bind(expires_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DatabaseError::Conflict)?;

        tx.commit().await?;
        info!(
            "user {} shared list {} with {} ({})",
            caller.user_id, list_id, share.email, share.role
        );
        Ok(share)
    }

    /// Unexpired shares of a list, newest first.
    pub async fn get_shares(&self, caller: &Caller, list_id: Uuid) -> DatabaseResult<Vec<Share>> {
        let mut db = self.get_connection().await?;
        access::require(&mut *db, list_id, caller, Permission::Manage).await?;

        let shares = sqlx::query_as::<_, Share>(
            "
            SELECT id, list_id, email, role, created_by, expires_at, created_at
            FROM list_shares
            WHERE list_id = $1 AND expires_at > now()
            ORDER BY created_at DESC, id",
        )
        .bind(list_id)
        .fetch_all(&mut *db)
        .await?;

        Ok(shares)
    }

    pub async fn revoke_shares(&self, caller: &Caller, list_id: Uuid) -> DatabaseResult<u64> {
        let mut tx = self.begin().await?;
        access::require(&mut *tx, list_id, caller, Permission::Manage).await?;

        let query_result = sqlx::query("DELETE FROM list_shares WHERE list_id = $1")
            .bind(list_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            "user {} revoked {} shares of list {}",
            caller.user_id,
            query_result.rows_affected(),
            list_id
        );
        Ok(query_result.rows_affected())
    }
}
