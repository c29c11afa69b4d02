use bson::spec::BinarySubtype;
use bson::{doc, Bson, Document};
use rocket::futures::StreamExt;
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub mod chat;
pub mod class;
pub mod exam;
pub mod homework;
pub mod lookup;
pub mod org;
pub mod task;
pub mod user;

/// Document ids are UUIDs stored as BSON binary (subtype 4); reference fields
/// are stored as plain UUID strings.
#[inline]
pub fn uuid_bson(id: Uuid) -> Bson {
    Bson::Binary(bson::Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.as_bytes().to_vec(),
    })
}

#[inline]
pub fn by_id(id: Uuid) -> Document {
    doc! { "_id": uuid_bson(id) }
}

/// Tenant scope filter. Every query against org-owned collections starts from
/// this; a query that skips it reads across tenants.
#[inline]
pub fn in_org(org: Uuid) -> Document {
    doc! { "organization": org.to_string() }
}

pub fn uuid_from_bson(value: &Bson) -> Option<Uuid> {
    match value {
        Bson::Binary(bin) => bin
            .bytes
            .as_slice()
            .try_into()
            .ok()
            .map(Uuid::from_bytes),
        Bson::String(s) => Uuid::parse_str(s).ok(),
        _ => None,
    }
}

/// Drains a cursor, skipping documents that fail to decode.
pub async fn drain_cursor<T>(mut cursor: mongodb::Cursor<T>) -> Vec<T>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut out = Vec::new();

    while let Some(item) = cursor.next().await {
        match item {
            Ok(value) => out.push(value),
            Err(e) => {
                // show must go on?
                tracing::warn!("Unable to deserialize document: {}", e);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_bson_roundtrips() {
        let id = Uuid::new_v4();
        assert_eq!(uuid_from_bson(&uuid_bson(id)), Some(id));
    }

    #[test]
    fn uuid_from_string_bson() {
        let id = Uuid::new_v4();
        assert_eq!(uuid_from_bson(&Bson::String(id.to_string())), Some(id));
        assert_eq!(uuid_from_bson(&Bson::String("nope".to_string())), None);
    }

    #[test]
    fn org_filter_uses_string_representation() {
        let org = Uuid::new_v4();
        assert_eq!(
            in_org(org).get_str("organization").unwrap(),
            org.to_string()
        );
    }
}
