use crate::{access, Database, DatabaseError, DatabaseResult};
use model::{
    access::Caller,
    links::{
        Candidates, ItemNode, LinkGraph, LinkPlan, LinkValidation, LinkedItems, MissingEndpoint,
        MAX_TRAVERSAL_NODES,
    },
};
use serde_json::Value as JsonValue;
use sqlx::{types::Json, FromRow, PgConnection};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

pub type LinkDatabase = Database<LinkedItem>;

/// An item on the other end of a link, with the list it lives in.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LinkedItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub content: String,
    pub is_completed: bool,
    pub list_title: String,
    pub list_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    Removed,
    /// The pair was not linked; nothing changed.
    NotLinked,
    Missing(MissingEndpoint),
}

#[derive(FromRow)]
struct NodeRow {
    id: Uuid,
    list_id: Uuid,
    owner_id: Uuid,
    editable: bool,
    linked_items: Option<JsonValue>,
}

impl From<NodeRow> for ItemNode {
    fn from(row: NodeRow) -> Self {
        ItemNode {
            id: row.id,
            list_id: row.list_id,
            owner_id: row.owner_id,
            editable: row.editable,
            links: LinkedItems::from_json(row.linked_items.as_ref()),
        }
    }
}

fn node_select() -> String {
    format!(
        "SELECT i.id, i.list_id, l.owner_id, i.linked_items, {} AS editable \
         FROM list_items i JOIN lists l ON l.id = i.list_id",
        access::editable_by(2, 3)
    )
}

#[derive(Clone, Copy)]
enum Direction {
    Children,
    Parents,
}

impl LinkDatabase {
    /// Classifies each candidate child of `parent` without changing anything.
    pub async fn validate_links(
        &self,
        caller: &Caller,
        parent: Uuid,
        candidates: &Candidates,
    ) -> DatabaseResult<LinkValidation> {
        let mut db = self.get_connection().await?;

        let ids = endpoint_ids(parent, &candidates.ids);
        let mut graph = LinkGraph::new();
        for node in fetch_nodes(&mut db, &ids, &[], caller, false).await? {
            graph.insert(node);
        }
        if let Some(parent_node) = graph.get(parent) {
            if !parent_node.editable {
                return Err(DatabaseError::Forbidden);
            }
            load_ancestry(&mut db, &mut graph, parent, caller).await?;
        }

        Ok(graph.validate(parent, candidates))
    }

    /// Links `parent` to every valid candidate in one transaction.
    ///
    /// Returns `None` when the parent item does not exist.
    pub async fn create_links(
        &self,
        caller: &Caller,
        parent: Uuid,
        candidates: &Candidates,
    ) -> DatabaseResult<Option<LinkPlan>> {
        let mut tx = self.begin().await?;

        let ids = endpoint_ids(parent, &candidates.ids);
        let mut graph = LinkGraph::new();
        for node in fetch_nodes(&mut tx, &ids, &[], caller, true).await? {
            graph.insert(node);
        }
        match graph.get(parent) {
            None => {
                info!("cannot link children to missing parent {}", parent);
                return Ok(None);
            }
            Some(parent_node) if !parent_node.editable => return Err(DatabaseError::Forbidden),
            Some(_) => (),
        }
        load_ancestry(&mut tx, &mut graph, parent, caller).await?;

        let plan = match graph.plan_links(parent, candidates) {
            Some(plan) => plan,
            None => return Ok(None),
        };
        write_links(&mut tx, &plan.updates).await?;
        tx.commit().await?;

        info!(
            "created {} links from {} ({} warnings)",
            plan.links_created,
            parent,
            plan.warnings.len()
        );
        Ok(Some(plan))
    }

    /// Removes the `parent` -> `child` pair from both items.
    pub async fn remove_link(
        &self,
        caller: &Caller,
        parent: Uuid,
        child: Uuid,
    ) -> DatabaseResult<UnlinkOutcome> {
        let mut tx = self.begin().await?;

        let mut graph = LinkGraph::new();
        for node in fetch_nodes(&mut tx, &endpoint_ids(parent, &[child]), &[], caller, true).await? {
            graph.insert(node);
        }

        let plan = match graph.plan_unlink(parent, child) {
            Ok(plan) => plan,
            Err(missing) => {
                info!("cannot unlink {} -> {}: {}", parent, child, missing);
                return Ok(UnlinkOutcome::Missing(missing));
            }
        };

        let editable = [parent, child]
            .iter()
            .all(|id| graph.get(*id).map_or(false, |node| node.editable));
        if !editable {
            return Err(DatabaseError::Forbidden);
        }

        if plan.updates.is_empty() {
            return Ok(UnlinkOutcome::NotLinked);
        }
        write_links(&mut tx, &plan.updates).await?;
        tx.commit().await?;

        info!("removed link {} -> {}", parent, child);
        Ok(UnlinkOutcome::Removed)
    }

    /// Direct children of an item, ordered by list title and then position.
    pub async fn get_children(&self, caller: &Caller, parent: Uuid) -> DatabaseResult<Vec<LinkedItem>> {
        self.related(caller, parent, Direction::Children).await
    }

    /// Direct parents of an item, ordered by list title and then position.
    pub async fn get_parents(&self, caller: &Caller, child: Uuid) -> DatabaseResult<Vec<LinkedItem>> {
        self.related(caller, child, Direction::Parents).await
    }

    async fn related(
        &self,
        caller: &Caller,
        id: Uuid,
        direction: Direction,
    ) -> DatabaseResult<Vec<LinkedItem>> {
        let mut db = self.get_connection().await?;

        let anchor: Option<(Option<JsonValue>, bool)> = sqlx::query_as(&format!(
            "
            SELECT i.linked_items, {} AS readable
            FROM list_items i JOIN lists l ON l.id = i.list_id
            WHERE i.id = $1",
            access::readable_by(2, 3)
        ))
        .bind(id)
        .bind(caller.user_id)
        .bind(&caller.email)
        .fetch_optional(&mut *db)
        .await?;

        let (linked_items, readable) = match anchor {
            Some(anchor) => anchor,
            None => {
                trace!("item {} does not exist, it has no relations", id);
                return Ok(Vec::new());
            }
        };
        if !readable {
            return Err(DatabaseError::Forbidden);
        }

        let links = LinkedItems::from_json(linked_items.as_ref());
        let ids = match direction {
            Direction::Children => links.children,
            Direction::Parents => links.parents,
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // ids without a row are dropped by the join
        let items = sqlx::query_as::<_, LinkedItem>(&format!(
            "
            SELECT i.id, i.list_id, i.content, i.is_completed, l.title AS list_title, l.list_type
            FROM list_items i JOIN lists l ON l.id = i.list_id
            WHERE i.id = ANY($1) AND {}
            ORDER BY l.title, i.sort_order, i.id",
            access::readable_by(2, 3)
        ))
        .bind(&ids)
        .bind(caller.user_id)
        .bind(&caller.email)
        .fetch_all(&mut *db)
        .await?;

        Ok(items)
    }
}

fn endpoint_ids(parent: Uuid, children: &[Uuid]) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(children.len() + 1);
    ids.push(parent);
    for child in children {
        if !ids.contains(child) {
            ids.push(*child);
        }
    }
    ids
}

/// Loads the items with the given ids, plus every item whose `children` reference one of
/// `referenced`. With `lock`, the rows are locked in id order for the transaction.
async fn fetch_nodes(
    conn: &mut PgConnection,
    ids: &[Uuid],
    referenced: &[String],
    caller: &Caller,
    lock: bool,
) -> DatabaseResult<Vec<ItemNode>> {
    let query = format!(
        "{} WHERE i.id = ANY($1) OR i.linked_items -> 'children' ?| $4 ORDER BY i.id{}",
        node_select(),
        if lock { " FOR UPDATE OF i" } else { "" }
    );

    let rows = sqlx::query_as::<_, NodeRow>(&query)
        .bind(ids)
        .bind(caller.user_id)
        .bind(&caller.email)
        .bind(referenced)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(ItemNode::from).collect())
}

/// Pulls the ancestors of `start` into the snapshot, level by level, until none are left
/// or the traversal bound is reached.
async fn load_ancestry(
    conn: &mut PgConnection,
    graph: &mut LinkGraph,
    start: Uuid,
    caller: &Caller,
) -> DatabaseResult<()> {
    let mut frontier = vec![start];
    let mut expanded = HashSet::new();

    while !frontier.is_empty() && expanded.len() <= MAX_TRAVERSAL_NODES {
        expanded.extend(frontier.iter().copied());

        let declared: Vec<Uuid> = frontier
            .iter()
            .filter_map(|id| graph.get(*id))
            .flat_map(|node| node.links.parents.iter().copied())
            .filter(|id| !graph.contains(*id))
            .collect();
        let referenced: Vec<String> = frontier.iter().map(Uuid::to_string).collect();

        for node in fetch_nodes(conn, &declared, &referenced, caller, false).await? {
            if !graph.contains(node.id) {
                graph.insert(node);
            }
        }

        let mut next = Vec::new();
        for id in &frontier {
            for parent in graph.parents_of(*id) {
                if graph.contains(parent) && !expanded.contains(&parent) && !next.contains(&parent)
                {
                    next.push(parent);
                }
            }
        }
        frontier = next;
    }

    trace!("loaded {} ancestors of {}", expanded.len() - 1, start);
    Ok(())
}

async fn write_links(
    conn: &mut PgConnection,
    updates: &BTreeMap<Uuid, LinkedItems>,
) -> DatabaseResult<()> {
    for (id, links) in updates {
        sqlx::query("UPDATE list_items SET linked_items = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(links))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
