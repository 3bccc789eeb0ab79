use chrono::{DateTime, Utc};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

pub mod create_list;
pub mod delete_list;
pub mod get_lists;
pub mod update_list;

pub const TITLE_MAX_LEN: usize = 100;

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Simple,
    Grocery,
    Countdown,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Simple => "simple",
            ListType::Grocery => "grocery",
            ListType::Countdown => "countdown",
        }
    }

    /// Only countdown lists give meaning to an item's target date.
    pub fn allows_target_date(&self) -> bool {
        *self == ListType::Countdown
    }
}

impl FromStr for ListType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ListType::Simple),
            "grocery" => Ok(ListType::Grocery),
            "countdown" => Ok(ListType::Countdown),
            invalid => {
                error!("failed to parse '{}' as a list type", invalid);
                Err(())
            }
        }
    }
}

impl Display for ListType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct List {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub list_type: ListType,
    pub title: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl List {
    pub fn new(
        id: Uuid,
        owner_id: Uuid,
        list_type: ListType,
        title: String,
        is_private: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            list_type,
            title,
            is_private,
            created_at,
            updated_at,
        }
    }
}
