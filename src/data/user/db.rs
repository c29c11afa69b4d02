use bson::{doc, Document};
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use super::{User, USER_COLLECTION_NAME};
use crate::data::{by_id, drain_cursor, in_org};
use crate::middleware::paging::PageState;
use crate::resp::fail::ApiError;

pub trait UserDbExt {
    async fn insert_user(&self, user: &User) -> Result<(), ApiError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn find_user_by_email(&self, email: impl AsRef<str> + Send)
        -> Result<Option<User>, ApiError>;

    /// Org-scoped fetch; returns `None` for a user id that exists but belongs
    /// to a different organization.
    async fn find_user_in_org(&self, org: Uuid, id: Uuid) -> Result<Option<User>, ApiError>;

    async fn list_org_users(&self, org: Uuid, page: PageState) -> Result<Vec<User>, ApiError>;

    /// Approved members only; pending registrations don't consume capacity.
    async fn count_approved_org_users(&self, org: Uuid) -> Result<u64, ApiError>;

    async fn update_user_in_org(
        &self,
        org: Uuid,
        id: Uuid,
        update: Document,
    ) -> Result<Option<User>, ApiError>;

    async fn replace_user(&self, user: &User) -> Result<(), ApiError>;

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn delete_user_in_org(&self, org: Uuid, id: Uuid) -> Result<Option<User>, ApiError>;
}

fn in_org_with_id(org: Uuid, id: Uuid) -> Document {
    let mut filter = in_org(org);
    filter.extend(by_id(id));
    filter
}

fn approved_in_org(org: Uuid) -> Document {
    let mut filter = in_org(org);
    filter.insert("approved", true);
    filter
}

impl UserDbExt for Database {
    async fn insert_user(&self, user: &User) -> Result<(), ApiError> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .insert_one(user, None)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(ApiError::from)
    }

    async fn find_user_by_email(
        &self,
        email: impl AsRef<str> + Send,
    ) -> Result<Option<User>, ApiError> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(doc! { "email": email.as_ref() }, None)
            .await
            .map_err(ApiError::from)
    }

    async fn find_user_in_org(&self, org: Uuid, id: Uuid) -> Result<Option<User>, ApiError> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(in_org_with_id(org, id), None)
            .await
            .map_err(ApiError::from)
    }

    async fn list_org_users(&self, org: Uuid, page: PageState) -> Result<Vec<User>, ApiError> {
        let cursor = self
            .collection(USER_COLLECTION_NAME)
            .find(
                in_org(org),
                FindOptions::builder()
                    .sort(doc! { "username": 1 })
                    .skip(page.skip())
                    .limit(page.limit())
                    .build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }

    async fn count_approved_org_users(&self, org: Uuid) -> Result<u64, ApiError> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .count_documents(approved_in_org(org), None)
            .await
            .map_err(ApiError::from)
    }

    async fn update_user_in_org(
        &self,
        org: Uuid,
        id: Uuid,
        update: Document,
    ) -> Result<Option<User>, ApiError> {
        self.collection(USER_COLLECTION_NAME)
            .find_one_and_update(
                in_org_with_id(org, id),
                doc! { "$set": update },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn replace_user(&self, user: &User) -> Result<(), ApiError> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .replace_one(by_id(user.id), user, None)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        self.collection(USER_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(ApiError::from)
    }

    async fn delete_user_in_org(&self, org: Uuid, id: Uuid) -> Result<Option<User>, ApiError> {
        self.collection(USER_COLLECTION_NAME)
            .find_one_and_delete(in_org_with_id(org, id), None)
            .await
            .map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_count_filters_on_approval() {
        let org = Uuid::new_v4();
        let filter = approved_in_org(org);

        assert_eq!(filter.get_str("organization").unwrap(), org.to_string());
        assert_eq!(filter.get_bool("approved").unwrap(), true);
    }
}
