use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

use crate::data::in_org;

pub static TASK_COLLECTION_NAME: &str = "task";

/// Board column. Any status may follow any other; there is deliberately no
/// transition check (drag-and-drop moves cards freely).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    InProgress,
    Testing,
    Close,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl std::default::Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub organization: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Manual ordering within a status column; assigned as max sibling + 1 at
    /// creation. The read-then-write is not transactional, so concurrent
    /// creates can produce duplicate ranks.
    pub rank_id: i64,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assignee: Option<Uuid>,
    pub created_by: Uuid,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

pub fn next_rank(current_max: Option<i64>) -> i64 {
    current_max.map(|rank| rank + 1).unwrap_or(1)
}

/// Visibility filter: a task can be seen only by its creator or assignee.
/// Every read path, including by-id fetches, must go through this filter or it
/// leaks tasks between users.
pub fn visible_to(org: Uuid, user: Uuid) -> Document {
    let mut filter = in_org(org);
    filter.insert(
        "$or",
        vec![
            doc! { "created_by": user.to_string() },
            doc! { "assignee": user.to_string() },
        ],
    );
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_task_in_column_gets_rank_one() {
        assert_eq!(next_rank(None), 1);
    }

    #[test]
    fn rank_is_strictly_greater_than_max_sibling() {
        assert_eq!(next_rank(Some(1)), 2);
        assert_eq!(next_rank(Some(41)), 42);
    }

    #[test]
    fn visibility_filter_is_org_scoped_and_ored() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let filter = visible_to(org, user);

        assert_eq!(filter.get_str("organization").unwrap(), org.to_string());

        let or = filter.get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
    }

    #[test]
    fn status_serializes_with_board_column_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"InProgress\""
        );
        assert_eq!(serde_json::to_string(&TaskStatus::Close).unwrap(), "\"Close\"");
    }
}
