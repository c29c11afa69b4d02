use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

use crate::resp::fail::{self, ApiError};

pub static EXAM_COLLECTION_NAME: &str = "exam";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub organization: Uuid,
    pub class: Uuid,
    pub subject: Uuid,
    pub name: String,
    pub total_mark: u32,
    /// Student id (as string key) to awarded mark, bounded by `total_mark`.
    #[serde(default)]
    pub marks: HashMap<String, u32>,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl Exam {
    pub fn new(
        organization: Uuid,
        class: Uuid,
        subject: Uuid,
        name: impl ToString,
        total_mark: u32,
    ) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            organization,
            class,
            subject,
            name: name.to_string(),
            total_mark,
            marks: HashMap::new(),
            created: Utc::now(),
        }
    }
}

pub fn check_mark(total_mark: u32, mark: u32) -> Result<(), ApiError> {
    if mark > total_mark {
        return Err(fail::validation(format!(
            "Mark {} exceeds totalMark {}.",
            mark, total_mark
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::fail::ErrorCode;

    #[test]
    fn mark_above_total_is_rejected() {
        let err = check_mark(100, 150).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.msg.contains("150"));
        assert!(err.msg.contains("totalMark 100"));
    }

    #[test]
    fn boundary_mark_is_accepted() {
        assert!(check_mark(100, 100).is_ok());
        assert!(check_mark(100, 0).is_ok());
    }
}
