use crate::{ClientError, ListsClient};
use model::{item::update_item, JsonRpcRequest, JsonRpcResponse, Method};
use std::collections::HashSet;
use uuid::Uuid;

/// Requests made while offline, waiting to be replayed in order.
///
/// Every queued request carries an id, so that a replayed batch tells which ones the
/// server answered. An `update_item` for the item updated by the last queued request is
/// folded into it, with later fields winning. Completion changes are never folded, since
/// replaying them reopens children on the server.
#[derive(Debug, Default)]
pub struct ReplayQueue {
    requests: Vec<JsonRpcRequest>,
}

impl ReplayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[JsonRpcRequest] {
        &self.requests
    }

    /// Queues `request`, giving it an id if it has none.
    pub fn push(&mut self, mut request: JsonRpcRequest) {
        if request.id.is_none() {
            request.id = Some(Uuid::new_v4().to_string());
        }

        if let Some(update) = as_item_update(&request) {
            if self.coalesce(update) {
                return;
            }
        }

        self.requests.push(request);
    }

    fn coalesce(&mut self, newer: update_item::Params) -> bool {
        if newer.is_completed.is_some() {
            return false;
        }
        let queued = match self.requests.last_mut() {
            Some(queued) => queued,
            None => return false,
        };
        let mut older = match as_item_update(queued) {
            Some(older) if older.id == newer.id && older.is_completed.is_none() => older,
            _ => return false,
        };

        older.merge(newer);
        match serde_json::to_value(&older) {
            Ok(params) => {
                trace!("coalesced queued update of item {}", older.id);
                queued.params = params;
                true
            }
            Err(e) => {
                warn!("could not coalesce update of item {}: {}", older.id, e);
                false
            }
        }
    }

    /// Drops every queued request that `responses` answered, successfully or not.
    pub fn acknowledge(&mut self, responses: &[JsonRpcResponse]) {
        let answered: HashSet<&str> = responses
            .iter()
            .filter_map(|response| response.id.as_deref())
            .collect();
        self.requests
            .retain(|request| !matches!(&request.id, Some(id) if answered.contains(id.as_str())));
    }

    /// Sends the queue as one batch. Requests left unanswered stay queued, and nothing is
    /// dropped if the batch could not be sent.
    pub async fn replay(
        &mut self,
        client: &ListsClient,
    ) -> Result<Vec<JsonRpcResponse>, ClientError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        info!("replaying {} queued requests", self.len());
        let responses = client.send_batch(self.requests.clone()).await?;
        self.acknowledge(&responses);
        if !self.is_empty() {
            warn!("{} queued requests got no response", self.len());
        }

        Ok(responses)
    }
}

fn as_item_update(request: &JsonRpcRequest) -> Option<update_item::Params> {
    if request.method != Method::UpdateItem.to_string() {
        return None;
    }
    serde_json::from_value(request.params.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::JsonRpcError;
    use serde_json::json;

    fn update(id: Uuid, params: serde_json::Value) -> JsonRpcRequest {
        let mut params = params;
        params["id"] = json!(id);
        JsonRpcRequest::new(Method::UpdateItem.to_string(), params, None)
    }

    fn params_of(request: &JsonRpcRequest) -> update_item::Params {
        serde_json::from_value(request.params.clone()).unwrap()
    }

    #[test]
    fn consecutive_edits_of_the_same_item_are_merged() {
        let item = Uuid::new_v4();
        let mut queue = ReplayQueue::new();
        queue.push(update(item, json!({"content": "Milk"})));
        queue.push(update(item, json!({"content": "Oat milk", "target_date": "2026-12-24T18:00:00Z"})));

        assert_eq!(queue.len(), 1);
        let merged = params_of(&queue.requests()[0]);
        assert_eq!(merged.content.as_deref(), Some("Oat milk"));
        assert!(merged.target_date.is_some());
    }

    #[test]
    fn clearing_a_target_date_wins_over_an_earlier_one() {
        let item = Uuid::new_v4();
        let mut queue = ReplayQueue::new();
        queue.push(update(item, json!({"target_date": "2026-12-24T18:00:00Z"})));
        queue.push(update(item, json!({"clear_target_date": true})));

        assert_eq!(queue.len(), 1);
        let merged = params_of(&queue.requests()[0]);
        assert!(merged.target_date.is_none());
        assert!(merged.clear_target_date);
    }

    #[test]
    fn completion_toggles_are_replayed_one_by_one() {
        let item = Uuid::new_v4();
        let mut queue = ReplayQueue::new();
        queue.push(update(item, json!({"content": "Steak", "is_completed": true})));
        queue.push(update(item, json!({"is_completed": false})));
        queue.push(update(item, json!({"content": "Ribeye"})));

        assert_eq!(queue.len(), 3);
        let completed: Vec<Option<bool>> = queue
            .requests()
            .iter()
            .map(|r| params_of(r).is_completed)
            .collect();
        assert_eq!(completed, vec![Some(true), Some(false), None]);
    }

    #[test]
    fn updates_are_not_moved_across_other_requests() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut queue = ReplayQueue::new();
        queue.push(update(a, json!({"content": "Eggs"})));
        queue.push(JsonRpcRequest::new(
            Method::CreateParentChildLink.to_string(),
            json!({ "parent_item_id": a, "child_item_ids": [b] }),
            None,
        ));
        queue.push(update(a, json!({"content": "Free range eggs"})));
        queue.push(update(b, json!({"content": "Bacon"})));

        let methods: Vec<&str> = queue.requests().iter().map(|r| r.method.as_str()).collect();
        assert_eq!(
            methods,
            vec![
                "update_item",
                "create_parent_child_link",
                "update_item",
                "update_item"
            ]
        );
        assert_eq!(params_of(&queue.requests()[0]).content.as_deref(), Some("Eggs"));
        assert!(queue.requests().iter().all(|r| r.id.is_some()));
    }

    #[test]
    fn only_answered_requests_are_dropped() {
        let mut queue = ReplayQueue::new();
        queue.push(update(Uuid::new_v4(), json!({"content": "Bread"})));
        queue.push(update(Uuid::new_v4(), json!({"content": "Jam"})));
        queue.push(update(Uuid::new_v4(), json!({"content": "Tea"})));

        let ids: Vec<Option<String>> = queue.requests().iter().map(|r| r.id.clone()).collect();
        let responses = vec![
            JsonRpcResponse::success(json!({}), ids[0].clone()),
            JsonRpcResponse::error(JsonRpcError::not_found(), ids[2].clone()),
        ];
        queue.acknowledge(&responses);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.requests()[0].id, ids[1]);
    }
}
