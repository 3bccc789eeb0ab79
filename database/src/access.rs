use crate::{DatabaseError, DatabaseResult};
use model::access::{Access, Caller, Permission, ShareRole};
use sqlx::{FromRow, PgExecutor};
use std::str::FromStr;
use uuid::Uuid;

/// SQL predicate over `lists l` that holds when the caller (user id in `$owner_param`,
/// lowercased email in `$email_param`) may read the list.
pub(crate) fn readable_by(owner_param: usize, email_param: usize) -> String {
    format!(
        "(l.owner_id = ${owner} OR NOT l.is_private OR EXISTS (\
            SELECT 1 FROM list_shares s \
            WHERE s.list_id = l.id AND s.email = ${email} AND s.expires_at > now()))",
        owner = owner_param,
        email = email_param,
    )
}

/// Like [`readable_by`], for callers allowed to change items.
pub(crate) fn editable_by(owner_param: usize, email_param: usize) -> String {
    format!(
        "(l.owner_id = ${owner} OR EXISTS (\
            SELECT 1 FROM list_shares s \
            WHERE s.list_id = l.id AND s.email = ${email} AND s.role = 'edit' \
            AND s.expires_at > now()))",
        owner = owner_param,
        email = email_param,
    )
}

#[derive(FromRow)]
struct ListAccessRow {
    owner_id: Uuid,
    is_private: bool,
    share_role: Option<String>,
}

/// Checks that `caller` holds `permission` on the list.
///
/// A missing list is [`DatabaseError::NotFound`], insufficient access is
/// [`DatabaseError::Forbidden`].
pub(crate) async fn require<'e, E>(
    executor: E,
    list_id: Uuid,
    caller: &Caller,
    permission: Permission,
) -> DatabaseResult<Access>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ListAccessRow>(
        "
        SELECT l.owner_id, l.is_private,
            (SELECT s.role FROM list_shares s
             WHERE s.list_id = l.id AND s.email = $2 AND s.expires_at > now()
             ORDER BY s.role = 'edit' DESC
             LIMIT 1) AS share_role
        FROM lists l
        WHERE l.id = $1",
    )
    .bind(list_id)
    .bind(&caller.email)
    .fetch_optional(executor)
    .await?
    .ok_or(DatabaseError::NotFound)?;

    let share = row
        .share_role
        .as_deref()
        .and_then(|role| ShareRole::from_str(role).ok());

    match Access::resolve(row.owner_id, caller.user_id, share, row.is_private) {
        Some(access) if access.permits(permission) => Ok(access),
        _ => {
            info!(
                "user {} lacks {:?} permission on list {}",
                caller.user_id, permission, list_id
            );
            Err(DatabaseError::Forbidden)
        }
    }
}

/// List id of the item, if the item exists.
pub(crate) async fn item_list_id<'e, E>(executor: E, item_id: Uuid) -> DatabaseResult<Option<Uuid>>
where
    E: PgExecutor<'e>,
{
    let list_id = sqlx::query_scalar::<_, Uuid>("SELECT list_id FROM list_items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(executor)
        .await?;

    Ok(list_id)
}
