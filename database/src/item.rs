use crate::{access, history, Database, DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use model::{
    access::{Caller, Permission},
    links::LinkedItems,
    status::ItemStatus,
};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

pub type ItemDatabase = Database<Item>;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub list_id: Uuid,
    pub content: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub sort_order: i32,
    pub target_date: Option<DateTime<Utc>>,
    pub linked_items: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Relation sets of the item, whatever shape they were stored in.
    pub fn links(&self) -> LinkedItems {
        LinkedItems::from_json(self.linked_items.as_ref())
    }

    pub fn status(&self) -> ItemStatus {
        ItemStatus::from_completed(self.is_completed)
    }
}

const ITEM_COLUMNS: &str = "id, list_id, content, is_completed, completed_at, sort_order, \
    target_date, linked_items, created_at, updated_at";

/// Fields of an item to change. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub content: Option<String>,
    pub is_completed: Option<bool>,
    /// `Some(None)` clears the target date.
    pub target_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub item: Item,
    /// Children that were reset to pending because the item was reopened.
    pub reset_children: Vec<Uuid>,
}

impl ItemDatabase {
    /// Appends an item to the end of a list.
    pub async fn insert_item(
        &self,
        caller: &Caller,
        list_id: Uuid,
        content: &str,
        target_date: Option<DateTime<Utc>>,
        max_items: u32,
    ) -> DatabaseResult<Item> {
        let mut tx = self.begin().await?;
        access::require(&mut *tx, list_id, caller, Permission::EditItems).await?;

        // lock the list so concurrent inserts agree on the next sort order
        let list_type: String =
            sqlx::query_scalar("SELECT list_type FROM lists WHERE id = $1 FOR UPDATE")
                .bind(list_id)
                .fetch_one(&mut *tx)
                .await?;
        if target_date.is_some() {
            check_target_date_allowed(&list_type)?;
        }

        let (count, next_sort_order): (i64, i32) = sqlx::query_as(
            "SELECT count(*), COALESCE(MAX(sort_order) + 1, 0) FROM list_items WHERE list_id = $1",
        )
        .bind(list_id)
        .fetch_one(&mut *tx)
        .await?;
        if count >= i64::from(max_items) {
            return Err(DatabaseError::LimitExceeded(format!(
                "a list can hold at most {} items",
                max_items
            )));
        }

        let item = sqlx::query_as::<_, Item>(&format!(
            "
            INSERT INTO list_items (id, list_id, content, sort_order, target_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(list_id)
        .bind(content)
        .bind(next_sort_order)
        .bind(target_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn get_items(&self, caller: &Caller, list_id: Uuid) -> DatabaseResult<Vec<Item>> {
        let mut db = self.get_connection().await?;
        access::require(&mut *db, list_id, caller, Permission::Read).await?;

        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM list_items WHERE list_id = $1 ORDER BY sort_order",
            ITEM_COLUMNS
        ))
        .bind(list_id)
        .fetch_all(&mut *db)
        .await?;

        Ok(items)
    }

    /// Applies `changes` to an item in one transaction.
    ///
    /// Reopening a completed item resets its completed direct children to pending.
    /// Completing an item records it in the list's item history.
    pub async fn update_item(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: ItemChanges,
    ) -> DatabaseResult<ItemUpdate> {
        let mut tx = self.begin().await?;

        // a reopen may cascade, so the children are locked with the item, in id order
        let mut lock_ids = vec![id];
        if changes.is_completed == Some(false) {
            let linked_items: Option<JsonValue> =
                sqlx::query_scalar("SELECT linked_items FROM list_items WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(DatabaseError::NotFound)?;
            lock_ids.extend(LinkedItems::from_json(linked_items.as_ref()).children);
        }
        let mut locked = lock_in_id_order(&mut tx, &lock_ids).await?;

        let current = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM list_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DatabaseError::NotFound)?;

        access::require(&mut *tx, current.list_id, caller, Permission::EditItems).await?;

        if let Some(Some(_)) = changes.target_date {
            let list_type: String = sqlx::query_scalar("SELECT list_type FROM lists WHERE id = $1")
                .bind(current.list_id)
                .fetch_one(&mut *tx)
                .await?;
            check_target_date_allowed(&list_type)?;
        }

        let now = Utc::now();
        let transition = current.status().transition_to(
            changes
                .is_completed
                .map(ItemStatus::from_completed)
                .unwrap_or_else(|| current.status()),
        );
        let content = changes.content.unwrap_or_else(|| current.content.clone());
        let target_date = changes.target_date.unwrap_or(current.target_date);

        let item = sqlx::query_as::<_, Item>(&format!(
            "
            UPDATE list_items
            SET content = $2, is_completed = $3, completed_at = $4, target_date = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(&content)
        .bind(transition.to.is_completed())
        .bind(transition.completed_at(current.completed_at, now))
        .bind(target_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if transition.completes() {
            history::record_completion(&mut tx, item.list_id, &item.content, now).await?;
        }

        let reset_children = if transition.reopens() {
            let children = current.links().children;
            let unlocked: Vec<Uuid> = children
                .iter()
                .filter(|child| !locked.iter().any(|(locked_id, _)| locked_id == *child))
                .copied()
                .collect();
            if !unlocked.is_empty() {
                // linked between the first read and the lock
                locked.extend(lock_in_id_order(&mut tx, &unlocked).await?);
            }
            let states = locked
                .into_iter()
                .filter(|(locked_id, _)| children.contains(locked_id));
            reset_completed_children(&mut tx, states, now).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;

        if !reset_children.is_empty() {
            info!(
                "reopening item {} reset {} children to pending",
                id,
                reset_children.len()
            );
        }
        Ok(ItemUpdate {
            item,
            reset_children,
        })
    }

    pub async fn delete_item(&self, caller: &Caller, id: Uuid) -> DatabaseResult<bool> {
        let mut tx = self.begin().await?;
        let list_id = access::item_list_id(&mut *tx, id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        access::require(&mut *tx, list_id, caller, Permission::EditItems).await?;

        // references to the item in other rows are left for readers to drop
        let query_result = sqlx::query("DELETE FROM list_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(query_result.rows_affected() == 1)
    }

    /// Moves `item_ids` to the front of the list in the given order. Items not named keep
    /// their relative order behind them.
    pub async fn reorder_items(
        &self,
        caller: &Caller,
        list_id: Uuid,
        item_ids: &[Uuid],
    ) -> DatabaseResult<u64> {
        let mut tx = self.begin().await?;
        access::require(&mut *tx, list_id, caller, Permission::EditItems).await?;

        let known: i64 =
            sqlx::query_scalar("SELECT count(*) FROM list_items WHERE list_id = $1 AND id = ANY($2)")
                .bind(list_id)
                .bind(item_ids)
                .fetch_one(&mut *tx)
                .await?;
        if known != item_ids.len() as i64 {
            return Err(DatabaseError::Invalid(format!(
                "{} of the given items are not in list {}",
                item_ids.len() as i64 - known,
                list_id
            )));
        }

        let query_result = sqlx::query(
            "
            WITH ordered AS (
                SELECT id, ord FROM unnest($2::uuid[]) WITH ORDINALITY AS t(id, ord)
            ), ranked AS (
                SELECT i.id,
                    (ROW_NUMBER() OVER (ORDER BY o.ord NULLS LAST, i.sort_order) - 1)::int AS pos
                FROM list_items i
                LEFT JOIN ordered o ON o.id = i.id
                WHERE i.list_id = $1
            )
            UPDATE list_items
            SET sort_order = ranked.pos, updated_at = now()
            FROM ranked
            WHERE list_items.id = ranked.id AND list_items.sort_order <> ranked.pos",
        )
        .bind(list_id)
        .bind(item_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(query_result.rows_affected())
    }
}

fn check_target_date_allowed(list_type: &str) -> DatabaseResult<()> {
    let allowed = list_type
        .parse::<model::list::ListType>()
        .map(|list_type| list_type.allows_target_date())
        .unwrap_or(false);
    if allowed {
        Ok(())
    } else {
        Err(DatabaseError::Invalid(format!(
            "target dates are not allowed on {} lists",
            list_type
        )))
    }
}

/// Locks the rows in id order, the same order link writes lock them in.
async fn lock_in_id_order(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> DatabaseResult<Vec<(Uuid, bool)>> {
    let states: Vec<(Uuid, bool)> = sqlx::query_as(
        "SELECT id, is_completed FROM list_items WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(states)
}

/// Sets the completed ones among the locked children back to pending.
async fn reset_completed_children<I>(
    conn: &mut PgConnection,
    children: I,
    now: DateTime<Utc>,
) -> DatabaseResult<Vec<Uuid>>
where
    I: IntoIterator<Item = (Uuid, bool)>,
{
    let reset = ItemStatus::Completed.transition_to(ItemStatus::Pending).cascade(
        children
            .into_iter()
            .map(|(id, is_completed)| (id, ItemStatus::from_completed(is_completed))),
    );
    if reset.is_empty() {
        return Ok(reset);
    }

    sqlx::query(
        "
        UPDATE list_items
        SET is_completed = FALSE, completed_at = NULL, updated_at = $2
        WHERE id = ANY($1)",
    )
    .bind(&reset)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{steak_dinner::*, HistoryDatabase, LinkDatabase};
    use model::links::ChildLimit;
    use serde_json::json;
    use sqlx::PgPool;

    fn completed(is_completed: bool) -> ItemChanges {
        ItemChanges {
            is_completed: Some(is_completed),
            ..Default::default()
        }
    }

    async fn item_in(db: &ItemDatabase, list_id: Uuid, id: Uuid) -> DatabaseResult<Item> {
        db.get_items(&cook(), list_id)
            .await?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(DatabaseError::NotFound)
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("steak_dinner")))]
    async fn reopening_resets_only_completed_children(pool: PgPool) -> DatabaseResult<()> {
        let db = ItemDatabase::with_pool(pool);
        let carrots_before = item_in(&db, GROCERIES, CARROTS).await?;

        let update = db.update_item(&cook(), STEAK_DINNER, completed(false)).await?;
        assert_eq!(update.reset_children, vec![STEAK, POTATOES]);
        assert!(!update.item.is_completed);
        assert_eq!(update.item.completed_at, None);

        let potatoes = item_in(&db, GROCERIES, POTATOES).await?;
        assert!(!potatoes.is_completed);
        assert_eq!(potatoes.completed_at, None);
        assert_eq!(potatoes.updated_at, update.item.updated_at);

        // carrots were still pending and are not touched
        assert_eq!(item_in(&db, GROCERIES, CARROTS).await?, carrots_before);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("steak_dinner")))]
    async fn steak_dinner_evening(pool: PgPool) -> DatabaseResult<()> {
        let items = ItemDatabase::with_pool(pool.clone());
        let links = LinkDatabase::with_pool(pool.clone());
        let history = HistoryDatabase::with_pool(pool);

        let butter = ChildLimit::default().apply(vec![BUTTER]).unwrap();
        links.create_links(&cook(), POTATOES, &butter).await?.unwrap();
        items.update_item(&cook(), BUTTER, completed(true)).await?;

        // finishing the carrots leaves the dinner alone
        let update = items.update_item(&cook(), CARROTS, completed(true)).await?;
        assert!(update.item.completed_at.is_some());
        assert!(update.reset_children.is_empty());
        assert!(item_in(&items, DINNER_LIST, STEAK_DINNER).await?.is_completed);

        let suggestions = history
            .get_suggestions(&cook(), GROCERIES, Some("car"), 10)
            .await?;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].content, "Carrots");

        // guests are late, dinner is back on
        let update = items
            .update_item(&cook(), STEAK_DINNER, completed(false))
            .await?;
        assert_eq!(update.reset_children, vec![STEAK, POTATOES, CARROTS]);
        for child in [POTATOES, CARROTS] {
            assert!(!item_in(&items, GROCERIES, child).await?.is_completed);
        }

        // one level only, the butter under the potatoes stays done
        assert!(item_in(&items, GROCERIES, BUTTER).await?.is_completed);

        let again = items
            .update_item(&cook(), STEAK_DINNER, completed(false))
            .await?;
        assert!(again.reset_children.is_empty());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("steak_dinner")))]
    async fn reopening_while_linking_the_same_rows_completes(pool: PgPool) -> DatabaseResult<()> {
        let items = ItemDatabase::with_pool(pool.clone());
        let links = LinkDatabase::with_pool(pool);
        let candidates = ChildLimit::default()
            .apply(vec![STEAK, STEAK_DINNER])
            .unwrap();

        for _ in 0..25 {
            items.update_item(&cook(), STEAK, completed(true)).await?;
            items.update_item(&cook(), STEAK_DINNER, completed(true)).await?;

            let caller = cook();
            let (reopened, linked) = tokio::join!(
                items.update_item(&caller, STEAK_DINNER, completed(false)),
                links.create_links(&caller, SET_THE_TABLE, &candidates),
            );
            assert!(reopened?.reset_children.contains(&STEAK));
            assert!(linked?.is_some());

            links.remove_link(&cook(), SET_THE_TABLE, STEAK).await?;
            links.remove_link(&cook(), SET_THE_TABLE, STEAK_DINNER).await?;
        }
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("steak_dinner")))]
    async fn missing_items_are_not_found(pool: PgPool) -> DatabaseResult<()> {
        let db = ItemDatabase::with_pool(pool);
        let result = db.update_item(&cook(), GONE, completed(false)).await;
        assert!(matches!(result, Err(DatabaseError::NotFound)));
        Ok(())
    }

    fn item(linked_items: Option<JsonValue>) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            content: "Steak".to_owned(),
            is_completed: true,
            completed_at: Some(now),
            sort_order: 0,
            target_date: None,
            linked_items,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stored_links_are_normalized() {
        let child = Uuid::new_v4();
        let structured = item(Some(json!({"children": [child.to_string()]})));
        assert_eq!(structured.links().children, vec![child]);

        let legacy = item(Some(json!([child.to_string()])));
        assert!(legacy.links().children.is_empty());
        assert_eq!(legacy.links().bidirectional, vec![child]);

        assert!(item(None).links().is_empty());
        assert_eq!(item(None).status(), ItemStatus::Completed);
    }

    #[test]
    fn target_dates_only_on_countdowns() {
        assert!(check_target_date_allowed("countdown").is_ok());
        assert!(matches!(
            check_target_date_allowed("grocery"),
            Err(DatabaseError::Invalid(_))
        ));
        assert!(check_target_date_allowed("bogus").is_err());
    }
}
