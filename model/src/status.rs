//! Completion state of items and how a change spreads to linked children.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Completed,
    Pending,
}

impl ItemStatus {
    pub fn from_completed(is_completed: bool) -> Self {
        if is_completed {
            ItemStatus::Completed
        } else {
            ItemStatus::Pending
        }
    }

    pub fn is_completed(self) -> bool {
        self == ItemStatus::Completed
    }

    pub fn transition_to(self, to: ItemStatus) -> Transition {
        Transition { from: self, to }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ItemStatus,
    pub to: ItemStatus,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Pending to completed.
    pub fn completes(&self) -> bool {
        self.from == ItemStatus::Pending && self.to == ItemStatus::Completed
    }

    /// Completed to pending.
    pub fn reopens(&self) -> bool {
        self.from == ItemStatus::Completed && self.to == ItemStatus::Pending
    }

    /// Ids of the direct children that have to be reset to pending.
    ///
    /// Only reopening a parent cascades, and only to children that are completed. Nothing
    /// ever flows from a child to its parent, and grandchildren are not visited.
    pub fn cascade<I>(&self, children: I) -> Vec<Uuid>
    where
        I: IntoIterator<Item = (Uuid, ItemStatus)>,
    {
        if !self.reopens() {
            return Vec::new();
        }
        children
            .into_iter()
            .filter(|(_, status)| status.is_completed())
            .map(|(id, _)| id)
            .collect()
    }

    /// New `completed_at` value after this transition.
    pub fn completed_at(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match self.to {
            ItemStatus::Pending => None,
            ItemStatus::Completed if self.completes() => Some(now),
            ItemStatus::Completed => previous.or(Some(now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ItemStatus::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn reopening_resets_only_completed_children() {
        let children = vec![(id(1), Completed), (id(2), Pending), (id(3), Completed)];
        let reset = Completed.transition_to(Pending).cascade(children);
        assert_eq!(reset, vec![id(1), id(3)]);
    }

    #[test]
    fn completing_never_cascades() {
        let children = vec![(id(1), Completed), (id(2), Pending)];
        assert!(Pending.transition_to(Completed).cascade(children).is_empty());
    }

    #[test]
    fn unchanged_status_never_cascades() {
        let children = vec![(id(1), Completed)];
        assert!(Pending.transition_to(Pending).cascade(children.clone()).is_empty());
        assert!(Completed.transition_to(Completed).cascade(children).is_empty());
    }

    #[test]
    fn completed_at_follows_the_status() {
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();

        assert_eq!(Pending.transition_to(Completed).completed_at(None, now), Some(now));
        assert_eq!(Completed.transition_to(Pending).completed_at(Some(earlier), now), None);
        assert_eq!(
            Completed.transition_to(Completed).completed_at(Some(earlier), now),
            Some(earlier)
        );
        assert_eq!(Pending.transition_to(Pending).completed_at(None, now), None);
    }

    #[test]
    fn transitions_are_classified() {
        assert!(Pending.transition_to(Completed).completes());
        assert!(Completed.transition_to(Pending).reopens());
        assert!(!Completed.transition_to(Completed).is_change());
        assert_eq!(ItemStatus::from_completed(true), Completed);
    }
}
