use bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::Database;
use uuid::Uuid;

use super::{Organization, SubscriptionStatus, ORG_COLLECTION_NAME};
use crate::data::by_id;
use crate::resp::fail::ApiError;

pub trait OrgDbExt {
    async fn insert_org(&self, org: &Organization) -> Result<(), ApiError>;

    async fn get_org(&self, id: Uuid) -> Result<Option<Organization>, ApiError>;
    async fn find_org_by_domain(
        &self,
        domain: impl AsRef<str> + Send,
    ) -> Result<Option<Organization>, ApiError>;

    async fn update_org(
        &self,
        id: Uuid,
        update: bson::Document,
    ) -> Result<Option<Organization>, ApiError>;

    async fn set_subscription_status(
        &self,
        domain: impl AsRef<str> + Send,
        status: SubscriptionStatus,
    ) -> Result<Option<Organization>, ApiError>;

    async fn delete_org(&self, id: Uuid) -> Result<Option<Organization>, ApiError>;
}

impl OrgDbExt for Database {
    async fn insert_org(&self, org: &Organization) -> Result<(), ApiError> {
        self.collection::<Organization>(ORG_COLLECTION_NAME)
            .insert_one(org, None)
            .await?;
        Ok(())
    }

    async fn get_org(&self, id: Uuid) -> Result<Option<Organization>, ApiError> {
        self.collection(ORG_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(ApiError::from)
    }

    async fn find_org_by_domain(
        &self,
        domain: impl AsRef<str> + Send,
    ) -> Result<Option<Organization>, ApiError> {
        self.collection(ORG_COLLECTION_NAME)
            .find_one(doc! { "domain": domain.as_ref().to_lowercase() }, None)
            .await
            .map_err(ApiError::from)
    }

    async fn update_org(
        &self,
        id: Uuid,
        update: bson::Document,
    ) -> Result<Option<Organization>, ApiError> {
        self.collection(ORG_COLLECTION_NAME)
            .find_one_and_update(
                by_id(id),
                doc! { "$set": update },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn set_subscription_status(
        &self,
        domain: impl AsRef<str> + Send,
        status: SubscriptionStatus,
    ) -> Result<Option<Organization>, ApiError> {
        self.collection(ORG_COLLECTION_NAME)
            .find_one_and_update(
                doc! { "domain": domain.as_ref().to_lowercase() },
                doc! { "$set": { "subscription_status": bson::to_bson(&status)? } },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn delete_org(&self, id: Uuid) -> Result<Option<Organization>, ApiError> {
        self.collection(ORG_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(ApiError::from)
    }
}
