//! Parent/child relations between items.
//!
//! Relations are stored on every item row as a JSON document. Two shapes occur in
//! stored data: the current `{"children": [..], "parents": [..], "bidirectional": [..]}`
//! object and an older flat array of ids without direction. [`StoredLinks`] is what was
//! read from a row, [`LinkedItems`] is the canonical form the rest of the crate works with.
//!
//! [`LinkGraph`] is a snapshot of the rows involved in one link operation. Validation and
//! planning run against the snapshot only; the caller persists the resulting updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    error::Error,
    fmt::Display,
    str::FromStr,
};
use uuid::Uuid;

pub const DEFAULT_MAX_CHILDREN: usize = 20;

/// Upper bound on the number of ancestors visited by a cycle check.
pub const MAX_TRAVERSAL_NODES: usize = 256;

pub const LINK_ALREADY_EXISTS: &str = "link already exists";

/// Relation data as found in the `linked_items` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredLinks {
    Absent,
    /// Flat array of ids, written before links had a direction.
    Legacy(Vec<Uuid>),
    Structured(LinkedItems),
    Malformed,
}

impl StoredLinks {
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => StoredLinks::Absent,
            Some(Value::Array(values)) => StoredLinks::Legacy(id_list(values)),
            Some(Value::Object(map)) => StoredLinks::Structured(LinkedItems {
                children: map.get("children").map(id_set).unwrap_or_default(),
                parents: map.get("parents").map(id_set).unwrap_or_default(),
                bidirectional: map.get("bidirectional").map(id_set).unwrap_or_default(),
            }),
            Some(other) => {
                warn!("ignoring malformed linked items: {}", other);
                StoredLinks::Malformed
            }
        }
    }

    pub fn normalize(self) -> LinkedItems {
        match self {
            StoredLinks::Absent | StoredLinks::Malformed => LinkedItems::default(),
            StoredLinks::Legacy(ids) => LinkedItems {
                bidirectional: ids,
                ..LinkedItems::default()
            },
            StoredLinks::Structured(links) => links,
        }
    }
}

fn id_set(value: &Value) -> Vec<Uuid> {
    match value {
        Value::Array(values) => id_list(values),
        _ => Vec::new(),
    }
}

fn id_list(values: &[Value]) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        match value.as_str().and_then(|s| Uuid::from_str(s).ok()) {
            Some(id) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            None => warn!("skipping unparseable linked item id: {}", value),
        }
    }
    ids
}

/// Canonical relation sets of one item. Each set keeps insertion order and holds no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedItems {
    #[serde(default)]
    pub children: Vec<Uuid>,
    #[serde(default)]
    pub parents: Vec<Uuid>,
    #[serde(default)]
    pub bidirectional: Vec<Uuid>,
}

impl LinkedItems {
    pub fn from_json(value: Option<&Value>) -> Self {
        StoredLinks::from_json(value).normalize()
    }

    pub fn has_child(&self, id: Uuid) -> bool {
        self.children.contains(&id)
    }

    pub fn has_parent(&self, id: Uuid) -> bool {
        self.parents.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.parents.is_empty() && self.bidirectional.is_empty()
    }

    fn add_child(&mut self, id: Uuid) -> bool {
        insert_unique(&mut self.children, id)
    }

    fn add_parent(&mut self, id: Uuid) -> bool {
        insert_unique(&mut self.parents, id)
    }

    fn remove_child(&mut self, id: Uuid) -> bool {
        remove_all(&mut self.children, id)
    }

    fn remove_parent(&mut self, id: Uuid) -> bool {
        remove_all(&mut self.parents, id)
    }
}

fn insert_unique(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    if ids.contains(&id) {
        false
    } else {
        ids.push(id);
        true
    }
}

fn remove_all(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    ids.len() != before
}

/// Why a candidate child cannot be linked to a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    SelfLink,
    ItemNotFound,
    PermissionDenied,
    CircularDependency,
}

impl Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidReason::SelfLink => "an item cannot be linked to itself",
            InvalidReason::ItemNotFound => "item not found",
            InvalidReason::PermissionDenied => "permission denied",
            InvalidReason::CircularDependency => "link would create a circular dependency",
        };
        write!(f, "{}", output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidLink {
    pub child_id: Uuid,
    pub reason: InvalidReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Valid { already_linked: bool },
    Invalid(InvalidReason),
}

/// One item row as seen by a link operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub id: Uuid,
    pub list_id: Uuid,
    /// Owner of the list containing the item.
    pub owner_id: Uuid,
    /// Whether the caller may change the item.
    pub editable: bool,
    pub links: LinkedItems,
}

#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    nodes: HashMap<Uuid, ItemNode>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: ItemNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn get(&self, id: Uuid) -> Option<&ItemNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Direct parents of `id`, from its own `parents` set and from the `children` sets of
    /// every node in the snapshot.
    pub fn parents_of(&self, id: Uuid) -> Vec<Uuid> {
        let mut parents = self
            .nodes
            .get(&id)
            .map(|node| node.links.parents.clone())
            .unwrap_or_default();
        for node in self.nodes.values() {
            if node.links.has_child(id) && !parents.contains(&node.id) {
                parents.push(node.id);
            }
        }
        parents
    }

    /// Ancestor ids of `id` that are referenced but not loaded into the snapshot.
    pub fn unloaded_ancestors(&self, id: Uuid) -> Vec<Uuid> {
        let mut missing = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) || visited.len() > MAX_TRAVERSAL_NODES {
                continue;
            }
            if !self.contains(current) {
                missing.push(current);
                continue;
            }
            stack.extend(self.parents_of(current));
        }
        missing
    }

    /// Depth-first walk up from `item`; true when `candidate` is one of its ancestors.
    ///
    /// A walk that exceeds [`MAX_TRAVERSAL_NODES`] is treated as reaching the candidate.
    pub fn is_ancestor(&self, candidate: Uuid, item: Uuid) -> bool {
        let mut visited = HashSet::new();
        let mut stack = self.parents_of(item);
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if visited.len() > MAX_TRAVERSAL_NODES {
                warn!(
                    "ancestor walk from {} exceeded {} nodes, assuming a cycle",
                    item, MAX_TRAVERSAL_NODES
                );
                return true;
            }
            stack.extend(
                self.parents_of(current)
                    .into_iter()
                    .filter(|id| !visited.contains(id)),
            );
        }
        false
    }

    pub fn classify(&self, parent: Uuid, candidate: Uuid) -> Classification {
        if candidate == parent {
            return Classification::Invalid(InvalidReason::SelfLink);
        }
        let (parent_node, child_node) = match (self.get(parent), self.get(candidate)) {
            (Some(p), Some(c)) => (p, c),
            _ => return Classification::Invalid(InvalidReason::ItemNotFound),
        };
        if child_node.owner_id != parent_node.owner_id || !child_node.editable {
            return Classification::Invalid(InvalidReason::PermissionDenied);
        }
        if self.is_ancestor(candidate, parent) {
            return Classification::Invalid(InvalidReason::CircularDependency);
        }
        Classification::Valid {
            already_linked: parent_node.links.has_child(candidate)
                && child_node.links.has_parent(parent),
        }
    }

    /// Classifies every candidate without changing anything. Nothing can be linked to a
    /// parent that is not in the snapshot, even with no candidates left.
    pub fn validate(&self, parent: Uuid, candidates: &Candidates) -> LinkValidation {
        let mut validation = LinkValidation {
            can_link: self.contains(parent),
            valid_links: Vec::new(),
            invalid_links: Vec::new(),
            warnings: candidates.warnings.clone(),
        };

        for &child_id in &candidates.ids {
            match self.classify(parent, child_id) {
                Classification::Valid { already_linked } => {
                    if already_linked {
                        validation
                            .warnings
                            .push(format!("{}: {} -> {}", LINK_ALREADY_EXISTS, parent, child_id));
                    }
                    validation.valid_links.push(child_id);
                }
                Classification::Invalid(reason) => {
                    validation.can_link = false;
                    validation.invalid_links.push(InvalidLink { child_id, reason });
                }
            }
        }

        validation
    }

    /// Works out the relation updates that link `parent` to each valid candidate.
    ///
    /// Returns `None` when the parent is not in the snapshot. Invalid candidates are skipped
    /// with a warning each; candidates that are already linked add nothing.
    pub fn plan_links(&self, parent: Uuid, candidates: &Candidates) -> Option<LinkPlan> {
        if !self.contains(parent) {
            return None;
        }

        let mut working = self.clone();
        let mut plan = LinkPlan {
            links_created: 0,
            warnings: candidates.warnings.clone(),
            updates: BTreeMap::new(),
        };

        for &child_id in &candidates.ids {
            if let Classification::Invalid(reason) = working.classify(parent, child_id) {
                plan.warnings
                    .push(format!("skipped child {}: {}", child_id, reason));
                continue;
            }

            if let Some(node) = working.nodes.get_mut(&parent) {
                if node.links.add_child(child_id) {
                    plan.links_created += 1;
                    plan.updates.insert(parent, node.links.clone());
                }
            }
            if let Some(node) = working.nodes.get_mut(&child_id) {
                if node.links.add_parent(parent) {
                    plan.updates.insert(child_id, node.links.clone());
                }
            }
        }

        Some(plan)
    }

    /// Works out the relation updates that remove the `parent` -> `child` pair.
    pub fn plan_unlink(&self, parent: Uuid, child: Uuid) -> Result<UnlinkPlan, MissingEndpoint> {
        let mut parent_links = self
            .get(parent)
            .ok_or(MissingEndpoint::Parent(parent))?
            .links
            .clone();
        let mut child_links = self
            .get(child)
            .ok_or(MissingEndpoint::Child(child))?
            .links
            .clone();

        let mut updates = BTreeMap::new();
        if parent_links.remove_child(child) {
            updates.insert(parent, parent_links);
        }
        if child_links.remove_parent(parent) {
            updates.insert(child, child_links);
        }

        Ok(UnlinkPlan { updates })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkValidation {
    pub can_link: bool,
    pub valid_links: Vec<Uuid>,
    pub invalid_links: Vec<InvalidLink>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkPlan {
    pub links_created: usize,
    pub warnings: Vec<String>,
    /// New relation sets, keyed by item id.
    pub updates: BTreeMap<Uuid, LinkedItems>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnlinkPlan {
    pub updates: BTreeMap<Uuid, LinkedItems>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEndpoint {
    Parent(Uuid),
    Child(Uuid),
}

impl Display for MissingEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingEndpoint::Parent(id) => write!(f, "parent item {} not found", id),
            MissingEndpoint::Child(id) => write!(f, "child item {} not found", id),
        }
    }
}

impl Error for MissingEndpoint {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLimitPolicy {
    /// Requests over the limit fail as a whole.
    Reject,
    /// Ids past the limit are dropped with a warning.
    Truncate,
}

impl FromStr for ChildLimitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ChildLimitPolicy::Reject),
            "truncate" => Ok(ChildLimitPolicy::Truncate),
            invalid => Err(format!(
                "invalid child limit policy '{}', expected 'reject' or 'truncate'",
                invalid
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLimit {
    pub max: usize,
    pub policy: ChildLimitPolicy,
}

impl Default for ChildLimit {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_CHILDREN,
            policy: ChildLimitPolicy::Reject,
        }
    }
}

impl ChildLimit {
    /// Deduplicates `ids` and enforces the limit.
    pub fn apply(&self, ids: Vec<Uuid>) -> Result<Candidates, TooManyChildren> {
        let mut candidates = Candidates::default();
        let mut seen = HashSet::new();
        for id in ids {
            if seen.insert(id) {
                candidates.ids.push(id);
            } else {
                candidates
                    .warnings
                    .push(format!("duplicate child id {} ignored", id));
            }
        }

        if candidates.ids.len() > self.max {
            match self.policy {
                ChildLimitPolicy::Reject => {
                    return Err(TooManyChildren {
                        given: candidates.ids.len(),
                        max: self.max,
                    })
                }
                ChildLimitPolicy::Truncate => {
                    let ignored = candidates.ids.len() - self.max;
                    candidates.ids.truncate(self.max);
                    candidates.warnings.push(format!(
                        "{} child ids beyond the limit of {} were ignored",
                        ignored, self.max
                    ));
                }
            }
        }

        Ok(candidates)
    }
}

/// Candidate child ids after deduplication and limiting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub ids: Vec<Uuid>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooManyChildren {
    pub given: usize,
    pub max: usize,
}

impl Display for TooManyChildren {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} child ids given, at most {} can be linked at once",
            self.given, self.max
        )
    }
}

impl Error for TooManyChildren {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    const OWNER: u128 = 1000;

    fn node(n: u128) -> ItemNode {
        ItemNode {
            id: id(n),
            list_id: id(500),
            owner_id: id(OWNER),
            editable: true,
            links: LinkedItems::default(),
        }
    }

    fn graph(nodes: Vec<ItemNode>) -> LinkGraph {
        let mut graph = LinkGraph::new();
        for n in nodes {
            graph.insert(n);
        }
        graph
    }

    fn candidates(ids: &[u128]) -> Candidates {
        ChildLimit::default()
            .apply(ids.iter().map(|n| id(*n)).collect())
            .unwrap()
    }

    /// Applies a plan's updates to the snapshot, as persisting it would.
    fn commit(graph: &mut LinkGraph, updates: &BTreeMap<Uuid, LinkedItems>) {
        for (item, links) in updates {
            graph.nodes.get_mut(item).unwrap().links = links.clone();
        }
    }

    #[test]
    fn absent_null_and_malformed_normalize_to_empty() {
        assert_eq!(LinkedItems::from_json(None), LinkedItems::default());
        assert_eq!(LinkedItems::from_json(Some(&Value::Null)), LinkedItems::default());
        assert_eq!(LinkedItems::from_json(Some(&json!("oops"))), LinkedItems::default());
        assert_eq!(LinkedItems::from_json(Some(&json!(17))), LinkedItems::default());
    }

    #[test]
    fn legacy_array_moves_into_bidirectional() {
        let stored = json!([id(1).to_string(), id(2).to_string()]);
        let links = LinkedItems::from_json(Some(&stored));
        assert_eq!(links.bidirectional, vec![id(1), id(2)]);
        assert!(links.children.is_empty());
        assert!(links.parents.is_empty());
    }

    #[test]
    fn malformed_sub_keys_are_empty() {
        let stored = json!({
            "children": "not-an-array",
            "parents": [id(3).to_string(), 42, "garbage", id(3).to_string()],
        });
        let links = LinkedItems::from_json(Some(&stored));
        assert!(links.children.is_empty());
        assert_eq!(links.parents, vec![id(3)]);
        assert!(links.bidirectional.is_empty());
    }

    #[test]
    fn linking_is_bidirectional() {
        let mut g = graph(vec![node(1), node(2)]);
        let plan = g.plan_links(id(1), &candidates(&[2])).unwrap();
        assert_eq!(plan.links_created, 1);
        assert!(plan.warnings.is_empty());
        commit(&mut g, &plan.updates);

        assert_eq!(g.get(id(1)).unwrap().links.children, vec![id(2)]);
        assert_eq!(g.get(id(2)).unwrap().links.parents, vec![id(1)]);
    }

    #[test]
    fn linking_twice_creates_nothing_the_second_time() {
        let mut g = graph(vec![node(1), node(2)]);
        let first = g.plan_links(id(1), &candidates(&[2])).unwrap();
        commit(&mut g, &first.updates);

        let second = g.plan_links(id(1), &candidates(&[2])).unwrap();
        assert_eq!(second.links_created, 0);
        assert!(second.updates.is_empty());
        assert!(second.warnings.is_empty());
        assert_eq!(g.get(id(1)).unwrap().links.children, vec![id(2)]);
    }

    #[test]
    fn self_link_is_skipped_with_a_warning() {
        let g = graph(vec![node(1)]);
        let plan = g.plan_links(id(1), &candidates(&[1])).unwrap();
        assert_eq!(plan.links_created, 0);
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn missing_parent_has_no_plan() {
        let g = graph(vec![node(2)]);
        assert!(g.plan_links(id(1), &candidates(&[2])).is_none());

        let validation = g.validate(id(1), &candidates(&[2]));
        assert!(!validation.can_link);
        assert_eq!(
            validation.invalid_links,
            vec![InvalidLink {
                child_id: id(2),
                reason: InvalidReason::ItemNotFound
            }]
        );
    }

    #[test]
    fn missing_parent_cannot_link_even_without_candidates() {
        let g = graph(vec![node(2)]);
        let validation = g.validate(id(1), &Candidates::default());
        assert!(!validation.can_link);
        assert!(validation.valid_links.is_empty());
        assert!(validation.invalid_links.is_empty());

        let validation = g.validate(id(2), &Candidates::default());
        assert!(validation.can_link);
    }

    #[test]
    fn partial_success_keeps_valid_candidates() {
        let g = graph(vec![node(1), node(2), node(3)]);
        let plan = g.plan_links(id(1), &candidates(&[2, 1, 99, 3])).unwrap();
        assert_eq!(plan.links_created, 2);
        assert_eq!(plan.warnings.len(), 2);
        assert_eq!(plan.updates[&id(1)].children, vec![id(2), id(3)]);
    }

    #[test]
    fn cycles_are_detected() {
        let mut g = graph(vec![node(1), node(2), node(3)]);
        let plan = g.plan_links(id(1), &candidates(&[2])).unwrap();
        commit(&mut g, &plan.updates);

        let validation = g.validate(id(2), &candidates(&[1]));
        assert!(!validation.can_link);
        assert_eq!(validation.invalid_links[0].reason, InvalidReason::CircularDependency);

        let validation = g.validate(id(1), &candidates(&[3]));
        assert!(validation.can_link);
        assert_eq!(validation.valid_links, vec![id(3)]);
    }

    #[test]
    fn transitive_cycles_are_detected() {
        let mut g = graph(vec![node(1), node(2), node(3)]);
        for (p, c) in [(1, 2), (2, 3)].iter() {
            let plan = g.plan_links(id(*p), &candidates(&[*c])).unwrap();
            commit(&mut g, &plan.updates);
        }
        assert_eq!(
            g.classify(id(3), id(1)),
            Classification::Invalid(InvalidReason::CircularDependency)
        );
    }

    #[test]
    fn one_sided_children_still_count_as_edges() {
        let mut parent = node(1);
        parent.links.children.push(id(2));
        let g = graph(vec![parent, node(2)]);
        assert_eq!(
            g.classify(id(2), id(1)),
            Classification::Invalid(InvalidReason::CircularDependency)
        );
    }

    #[test]
    fn other_owners_and_read_only_items_are_denied() {
        let mut foreign = node(2);
        foreign.owner_id = id(2000);
        let mut read_only = node(3);
        read_only.editable = false;
        let g = graph(vec![node(1), foreign, read_only]);

        let validation = g.validate(id(1), &candidates(&[2, 3]));
        assert!(!validation.can_link);
        assert!(validation
            .invalid_links
            .iter()
            .all(|invalid| invalid.reason == InvalidReason::PermissionDenied));
    }

    #[test]
    fn existing_link_is_valid_with_a_warning() {
        let mut g = graph(vec![node(1), node(2)]);
        let plan = g.plan_links(id(1), &candidates(&[2])).unwrap();
        commit(&mut g, &plan.updates);

        let validation = g.validate(id(1), &candidates(&[2]));
        assert!(validation.can_link);
        assert_eq!(validation.valid_links, vec![id(2)]);
        assert!(validation.warnings[0].starts_with(LINK_ALREADY_EXISTS));
    }

    #[test]
    fn legacy_parent_keeps_its_old_links() {
        let mut parent = node(1);
        parent.links = LinkedItems::from_json(Some(&json!([id(7).to_string()])));
        let g = graph(vec![parent, node(2)]);

        let plan = g.plan_links(id(1), &candidates(&[2])).unwrap();
        let updated = &plan.updates[&id(1)];
        assert_eq!(updated.bidirectional, vec![id(7)]);
        assert_eq!(updated.children, vec![id(2)]);
    }

    #[test]
    fn unlinking_removes_only_the_pair() {
        let mut g = graph(vec![node(1), node(2), node(3)]);
        let plan = g.plan_links(id(1), &candidates(&[2, 3])).unwrap();
        commit(&mut g, &plan.updates);

        let unlink = g.plan_unlink(id(1), id(2)).unwrap();
        commit(&mut g, &unlink.updates);
        assert_eq!(g.get(id(1)).unwrap().links.children, vec![id(3)]);
        assert!(g.get(id(2)).unwrap().links.parents.is_empty());
        assert_eq!(g.get(id(3)).unwrap().links.parents, vec![id(1)]);
    }

    #[test]
    fn unlinking_a_missing_pair_is_a_no_op() {
        let g = graph(vec![node(1), node(2)]);
        let unlink = g.plan_unlink(id(1), id(2)).unwrap();
        assert!(unlink.updates.is_empty());
    }

    #[test]
    fn unlinking_missing_items_names_the_endpoint() {
        let g = graph(vec![node(1)]);
        assert_eq!(
            g.plan_unlink(id(1), id(2)),
            Err(MissingEndpoint::Child(id(2)))
        );
        assert_eq!(
            g.plan_unlink(id(3), id(1)),
            Err(MissingEndpoint::Parent(id(3)))
        );
    }

    #[test]
    fn unloaded_ancestors_are_reported() {
        let mut parent = node(1);
        parent.links.parents.push(id(8));
        let g = graph(vec![parent]);
        assert_eq!(g.unloaded_ancestors(id(1)), vec![id(8)]);
    }

    #[test]
    fn child_limit_rejects_or_truncates() {
        let ids: Vec<Uuid> = (1..=25).map(id).collect();

        let reject = ChildLimit::default();
        assert_eq!(
            reject.apply(ids.clone()),
            Err(TooManyChildren { given: 25, max: 20 })
        );

        let truncate = ChildLimit {
            max: 20,
            policy: ChildLimitPolicy::Truncate,
        };
        let candidates = truncate.apply(ids).unwrap();
        assert_eq!(candidates.ids.len(), 20);
        assert_eq!(candidates.warnings.len(), 1);
    }

    #[test]
    fn duplicate_candidates_collapse() {
        let candidates = candidates(&[2, 2, 3]);
        assert_eq!(candidates.ids, vec![id(2), id(3)]);
        assert_eq!(candidates.warnings.len(), 1);
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!("reject".parse(), Ok(ChildLimitPolicy::Reject));
        assert_eq!(" Truncate ".parse(), Ok(ChildLimitPolicy::Truncate));
        assert!("warn".parse::<ChildLimitPolicy>().is_err());
    }

    #[test]
    fn stored_form_serializes_all_sets() {
        let links = LinkedItems {
            children: vec![id(2)],
            ..LinkedItems::default()
        };
        let value = serde_json::to_value(&links).unwrap();
        assert_eq!(value["children"], json!([id(2).to_string()]));
        assert_eq!(value["parents"], json!([]));
        assert_eq!(LinkedItems::from_json(Some(&value)), links);
    }

    #[test]
    fn walks_past_the_traversal_bound_count_as_cycles() {
        let chain = |len: u128| {
            let mut nodes: Vec<ItemNode> = (0..len).map(node).collect();
            for n in 1..len as usize {
                nodes[n].links.parents.push(id(n as u128 - 1));
            }
            graph(nodes)
        };
        let unrelated = id(9999);

        let short = chain(MAX_TRAVERSAL_NODES as u128);
        assert!(!short.is_ancestor(unrelated, id(MAX_TRAVERSAL_NODES as u128 - 1)));

        let long = chain(MAX_TRAVERSAL_NODES as u128 + 2);
        assert!(long.is_ancestor(unrelated, id(MAX_TRAVERSAL_NODES as u128 + 1)));
    }

    #[test]
    fn steak_dinner() {
        use crate::status::ItemStatus::{Completed, Pending};

        const DINNER: u128 = 1;
        const STEAK: u128 = 2;
        const POTATOES: u128 = 3;
        const BUTTER: u128 = 4;
        const CARROTS: u128 = 5;
        let mut g = graph(vec![
            node(DINNER),
            node(STEAK),
            node(POTATOES),
            node(BUTTER),
            node(CARROTS),
        ]);

        let plan = g
            .plan_links(id(DINNER), &candidates(&[STEAK, POTATOES, CARROTS]))
            .unwrap();
        assert_eq!(plan.links_created, 3);
        commit(&mut g, &plan.updates);
        let plan = g.plan_links(id(POTATOES), &candidates(&[BUTTER])).unwrap();
        commit(&mut g, &plan.updates);

        // butter sits below dinner, so it can never become dinner's parent
        assert_eq!(
            g.classify(id(BUTTER), id(DINNER)),
            Classification::Invalid(InvalidReason::CircularDependency)
        );

        let children_of = |g: &LinkGraph, parent: u128, done: &[u128]| {
            g.get(id(parent))
                .unwrap()
                .links
                .children
                .iter()
                .map(|child| {
                    let completed = done.iter().any(|d| id(*d) == *child);
                    (*child, if completed { Completed } else { Pending })
                })
                .collect::<Vec<_>>()
        };

        // everything but the carrots cooked, then dinner gets reopened
        let done = [DINNER, STEAK, POTATOES, BUTTER];
        let reset = Completed
            .transition_to(Pending)
            .cascade(children_of(&g, DINNER, &done));
        assert_eq!(reset, vec![id(STEAK), id(POTATOES)]);

        // the carrots were still pending, so they are left alone
        assert!(!reset.contains(&id(CARROTS)));

        // one level only: butter is not touched
        assert!(!reset.contains(&id(BUTTER)));

        // completing a child never reaches the parent
        let reset = Pending
            .transition_to(Completed)
            .cascade(children_of(&g, STEAK, &done));
        assert!(reset.is_empty());
    }
}
