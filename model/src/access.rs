use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Role granted by a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareRole {
    Read,
    Edit,
}

impl ShareRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareRole::Read => "read",
            ShareRole::Edit => "edit",
        }
    }
}

impl FromStr for ShareRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(ShareRole::Read),
            "edit" => Ok(ShareRole::Edit),
            invalid => {
                error!("failed to parse '{}' as a share role", invalid);
                Err(())
            }
        }
    }
}

impl Display for ShareRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    /// Lowercased, shares are matched against it.
    pub email: String,
}

impl Caller {
    pub fn new(user_id: Uuid, email: &str) -> Self {
        Self {
            user_id,
            email: email.trim().to_lowercase(),
        }
    }
}

/// What an operation needs from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    EditItems,
    /// Renaming, deleting and sharing the list itself.
    Manage,
}

/// What a caller may do with a list and its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Edit,
    Read,
}

impl Access {
    /// `share` is the best unexpired share the caller holds on the list, if any.
    pub fn resolve(
        owner_id: Uuid,
        caller: Uuid,
        share: Option<ShareRole>,
        is_private: bool,
    ) -> Option<Access> {
        if owner_id == caller {
            return Some(Access::Owner);
        }
        match share {
            Some(ShareRole::Edit) => Some(Access::Edit),
            Some(ShareRole::Read) => Some(Access::Read),
            None if !is_private => Some(Access::Read),
            None => None,
        }
    }

    pub fn is_owner(self) -> bool {
        self == Access::Owner
    }

    pub fn can_edit_items(self) -> bool {
        matches!(self, Access::Owner | Access::Edit)
    }

    pub fn permits(self, permission: Permission) -> bool {
        match permission {
            Permission::Read => true,
            Permission::EditItems => self.can_edit_items(),
            Permission::Manage => self.is_owner(),
        }
    }
}
