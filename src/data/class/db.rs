use bson::doc;
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use super::{Class, Subject, CLASS_COLLECTION_NAME, SUBJECT_COLLECTION_NAME};
use crate::data::{by_id, drain_cursor, in_org};
use crate::resp::fail::ApiError;

pub trait ClassDbExt {
    async fn insert_class(&self, class: &Class) -> Result<(), ApiError>;
    async fn get_class(&self, org: Uuid, id: Uuid) -> Result<Option<Class>, ApiError>;
    async fn list_classes(&self, org: Uuid) -> Result<Vec<Class>, ApiError>;
    async fn attach_subject(
        &self,
        org: Uuid,
        class: Uuid,
        subject: Uuid,
    ) -> Result<Option<Class>, ApiError>;
    async fn delete_class(&self, org: Uuid, id: Uuid) -> Result<Option<Class>, ApiError>;

    async fn insert_subject(&self, subject: &Subject) -> Result<(), ApiError>;
    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, ApiError>;
    async fn find_subject_by_name(
        &self,
        name: impl AsRef<str> + Send,
    ) -> Result<Option<Subject>, ApiError>;
    async fn list_subjects(&self) -> Result<Vec<Subject>, ApiError>;
}

impl ClassDbExt for Database {
    async fn insert_class(&self, class: &Class) -> Result<(), ApiError> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .insert_one(class, None)
            .await?;
        Ok(())
    }

    async fn get_class(&self, org: Uuid, id: Uuid) -> Result<Option<Class>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(CLASS_COLLECTION_NAME)
            .find_one(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn list_classes(&self, org: Uuid) -> Result<Vec<Class>, ApiError> {
        let cursor = self
            .collection(CLASS_COLLECTION_NAME)
            .find(
                in_org(org),
                FindOptions::builder().sort(doc! { "name": 1 }).build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }

    async fn attach_subject(
        &self,
        org: Uuid,
        class: Uuid,
        subject: Uuid,
    ) -> Result<Option<Class>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(class));

        self.collection(CLASS_COLLECTION_NAME)
            .find_one_and_update(
                filter,
                // $addToSet keeps the subject list free of duplicates.
                doc! { "$addToSet": { "subjects": subject.to_string() } },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn delete_class(&self, org: Uuid, id: Uuid) -> Result<Option<Class>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(CLASS_COLLECTION_NAME)
            .find_one_and_delete(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn insert_subject(&self, subject: &Subject) -> Result<(), ApiError> {
        self.collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .insert_one(subject, None)
            .await?;
        Ok(())
    }

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, ApiError> {
        self.collection(SUBJECT_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(ApiError::from)
    }

    async fn find_subject_by_name(
        &self,
        name: impl AsRef<str> + Send,
    ) -> Result<Option<Subject>, ApiError> {
        self.collection(SUBJECT_COLLECTION_NAME)
            .find_one(doc! { "name": name.as_ref() }, None)
            .await
            .map_err(ApiError::from)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, ApiError> {
        let cursor = self
            .collection(SUBJECT_COLLECTION_NAME)
            .find(
                None,
                FindOptions::builder().sort(doc! { "name": 1 }).build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }
}
