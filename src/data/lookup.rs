//! Shared "name or id" resolution. Clients routinely send either a UUID or a
//! human-readable name for classes and subjects; every controller resolves
//! through this single contract instead of reimplementing it.

use bson::Document;
use mongodb::Database;
use uuid::Uuid;

use crate::data::class::{CLASS_COLLECTION_NAME, SUBJECT_COLLECTION_NAME};
use crate::data::{in_org, uuid_bson, uuid_from_bson};
use crate::resp::fail::{self, ApiError};

/// Resolution contract: a value that parses as a UUID is treated as an id and
/// must exist within `scope`; anything else is matched against the `name`
/// field exactly. Missing either way reports not-found for `what`.
async fn resolve(
    db: &Database,
    collection: &str,
    mut scope: Document,
    value: &str,
    what: &str,
) -> Result<Uuid, ApiError> {
    match Uuid::parse_str(value) {
        Ok(id) => {
            scope.insert("_id", uuid_bson(id));
        }
        Err(_) => {
            scope.insert("name", value);
        }
    }

    let found = db
        .collection::<Document>(collection)
        .find_one(scope, None)
        .await?;

    found
        .as_ref()
        .and_then(|doc| doc.get("_id"))
        .and_then(uuid_from_bson)
        .ok_or_else(|| fail::not_found(what))
}

pub async fn resolve_class(db: &Database, org: Uuid, value: &str) -> Result<Uuid, ApiError> {
    resolve(db, CLASS_COLLECTION_NAME, in_org(org), value, "Class").await
}

/// Subjects are global, so resolution is intentionally unscoped.
pub async fn resolve_subject(db: &Database, value: &str) -> Result<Uuid, ApiError> {
    resolve(db, SUBJECT_COLLECTION_NAME, Document::new(), value, "Subject").await
}
