use crate::{access, Database, DatabaseResult};
use chrono::{DateTime, Utc};
use model::{
    access::{Caller, Permission},
    item::normalize_content,
};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

pub type HistoryDatabase = Database<ItemSuggestion>;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ItemSuggestion {
    pub content: String,
    pub frequency: i64,
    pub last_used_at: DateTime<Utc>,
}

impl HistoryDatabase {
    /// Most frequently completed contents of a list, optionally starting with `prefix`.
    pub async fn get_suggestions(
        &self,
        caller: &Caller,
        list_id: Uuid,
        prefix: Option<&str>,
        limit: u32,
    ) -> DatabaseResult<Vec<ItemSuggestion>> {
        let mut db = self.get_connection().await?;
        access::require(&mut *db, list_id, caller, Permission::Read).await?;

        let pattern = prefix.map(|prefix| format!("{}%", escape_like(prefix)));

        let suggestions = sqlx::query_as::<_, ItemSuggestion>(
            "
            SELECT content, frequency, last_used_at
            FROM item_history
            WHERE list_id = $1 AND ($2::text IS NULL OR normalized_content LIKE $2)
            ORDER BY frequency DESC, last_used_at DESC
            LIMIT $3",
        )
        .bind(list_id)
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&mut *db)
        .await?;

        Ok(suggestions)
    }
}

/// Counts one more completion of `content` in the list.
pub(crate) async fn record_completion(
    conn: &mut PgConnection,
    list_id: Uuid,
    content: &str,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    let normalized = normalize_content(content);
    trace!("recording completion of '{}' in list {}", normalized, list_id);

    sqlx::query(
        "
        INSERT INTO item_history (list_id, normalized_content, content, frequency, last_used_at)
        VALUES ($1, $2, $3, 1, $4)
        ON CONFLICT (list_id, normalized_content) DO UPDATE
        SET frequency = item_history.frequency + 1,
            content = EXCLUDED.content,
            last_used_at = EXCLUDED.last_used_at",
    )
    .bind(list_id)
    .bind(normalized)
    .bind(content)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Escapes the `LIKE` wildcards of `value`, using the default `\` escape character.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
