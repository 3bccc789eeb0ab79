use crate::{access, Database, DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use model::access::{Caller, Permission};
use sqlx::FromRow;
use uuid::Uuid;

pub type ListDatabase = Database<List>;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct List {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub list_type: String,
    pub title: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const LIST_COLUMNS: &str = "l.id, l.owner_id, l.list_type, l.title, l.is_private, l.created_at, l.updated_at";

impl ListDatabase {
    /// Creates a list owned by the caller, unless the caller already owns `max_lists`.
    pub async fn insert_list(
        &self,
        caller: &Caller,
        list_type: &str,
        title: &str,
        is_private: bool,
        max_lists: u32,
    ) -> DatabaseResult<List> {
        let mut tx = self.begin().await?;

        // serializes concurrent creations by the same owner so the cap holds
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(caller.user_id)
            .execute(&mut *tx)
            .await?;

        let owned: i64 = sqlx::query_scalar("SELECT count(*) FROM lists WHERE owner_id = $1")
            .bind(caller.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if owned >= i64::from(max_lists) {
            return Err(DatabaseError::LimitExceeded(format!(
                "a user can own at most {} lists",
                max_lists
            )));
        }

        let list = sqlx::query_as::<_, List>(
            "
            INSERT INTO lists (id, owner_id, list_type, title, is_private)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, list_type, title, is_private, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(caller.user_id)
        .bind(list_type)
        .bind(title)
        .bind(is_private)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("user {} created list {}", caller.user_id, list.id);
        Ok(list)
    }

    /// Lists the caller owns or holds an unexpired share on.
    pub async fn get_lists(&self, caller: &Caller) -> DatabaseResult<Vec<List>> {
        let mut db = self.get_connection().await?;

        let lists = sqlx::query_as::<_, List>(&format!(
            "
            SELECT {columns}
            FROM lists l
            WHERE l.owner_id = $1 OR EXISTS (
                SELECT 1 FROM list_shares s
                WHERE s.list_id = l.id AND s.email = $2 AND s.expires_at > now())
            ORDER BY l.created_at, l.id",
            columns = LIST_COLUMNS
        ))
        .bind(caller.user_id)
        .bind(&caller.email)
        .fetch_all(&mut *db)
        .await?;

        Ok(lists)
    }

    pub async fn update_list(
        &self,
        caller: &Caller,
        id: Uuid,
        title: Option<&str>,
        is_private: Option<bool>,
    ) -> DatabaseResult<List> {
        let mut tx = self.begin().await?;
        access::require(&mut *tx, id, caller, Permission::Manage).await?;

        let list = sqlx::query_as::<_, List>(
            "
            UPDATE lists
            SET title = COALESCE($2, title),
                is_private = COALESCE($3, is_private),
                updated_at = now()
            WHERE id = $1
            RETURNING id, owner_id, list_type, title, is_private, created_at, updated_at",
        )
        .bind(id)
        .bind(title)
        .bind(is_private)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(list)
    }

    /// Deletes the list together with its items, shares and history.
    pub async fn delete_list(&self, caller: &Caller, id: Uuid) -> DatabaseResult<bool> {
        let mut tx = self.begin().await?;
        access::require(&mut *tx, id, caller, Permission::Manage).await?;

        let query_result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("user {} deleted list {}", caller.user_id, id);
        Ok(query_result.rows_affected() == 1)
    }
}
