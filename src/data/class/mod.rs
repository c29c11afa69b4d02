use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "class";
pub static SUBJECT_COLLECTION_NAME: &str = "subject";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub organization: Uuid,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<Uuid>,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl Class {
    pub fn new(organization: Uuid, name: impl ToString) -> Class {
        Class {
            id: Uuid::new_v4(),
            organization,
            name: name.to_string(),
            subjects: vec![],
            created: Utc::now(),
        }
    }
}

/// Subjects form a shared catalog: they carry no organization reference and
/// are reused across tenants. See DESIGN.md before "fixing" this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub name: String,
}

impl Subject {
    pub fn new(name: impl ToString) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }
}
