use bson::doc;
use mongodb::options::FindOptions;
use mongodb::Database;
use uuid::Uuid;

use super::{Homework, HOMEWORK_COLLECTION_NAME};
use crate::data::{by_id, drain_cursor, in_org};
use crate::resp::fail::ApiError;

pub trait HomeworkDbExt {
    async fn insert_homework(&self, homework: &Homework) -> Result<(), ApiError>;
    async fn get_homework(&self, org: Uuid, id: Uuid) -> Result<Option<Homework>, ApiError>;
    async fn list_homework(
        &self,
        org: Uuid,
        class: Option<Uuid>,
        subject: Option<Uuid>,
    ) -> Result<Vec<Homework>, ApiError>;
    async fn delete_homework(&self, org: Uuid, id: Uuid) -> Result<Option<Homework>, ApiError>;
}

impl HomeworkDbExt for Database {
    async fn insert_homework(&self, homework: &Homework) -> Result<(), ApiError> {
        self.collection::<Homework>(HOMEWORK_COLLECTION_NAME)
            .insert_one(homework, None)
            .await?;
        Ok(())
    }

    async fn get_homework(&self, org: Uuid, id: Uuid) -> Result<Option<Homework>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(HOMEWORK_COLLECTION_NAME)
            .find_one(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn list_homework(
        &self,
        org: Uuid,
        class: Option<Uuid>,
        subject: Option<Uuid>,
    ) -> Result<Vec<Homework>, ApiError> {
        let mut filter = in_org(org);
        if let Some(class) = class {
            filter.insert("class", class.to_string());
        }
        if let Some(subject) = subject {
            filter.insert("subject", subject.to_string());
        }

        let cursor = self
            .collection(HOMEWORK_COLLECTION_NAME)
            .find(
                filter,
                FindOptions::builder().sort(doc! { "created": -1 }).build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }

    async fn delete_homework(&self, org: Uuid, id: Uuid) -> Result<Option<Homework>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(HOMEWORK_COLLECTION_NAME)
            .find_one_and_delete(filter, None)
            .await
            .map_err(ApiError::from)
    }
}
