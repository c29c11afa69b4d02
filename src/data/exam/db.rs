use bson::doc;
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use super::{Exam, EXAM_COLLECTION_NAME};
use crate::data::{by_id, drain_cursor, in_org};
use crate::resp::fail::ApiError;

pub trait ExamDbExt {
    async fn insert_exam(&self, exam: &Exam) -> Result<(), ApiError>;
    async fn get_exam(&self, org: Uuid, id: Uuid) -> Result<Option<Exam>, ApiError>;
    async fn list_exams(
        &self,
        org: Uuid,
        class: Option<Uuid>,
        subject: Option<Uuid>,
    ) -> Result<Vec<Exam>, ApiError>;
    async fn set_mark(
        &self,
        org: Uuid,
        exam: Uuid,
        student: Uuid,
        mark: u32,
    ) -> Result<Option<Exam>, ApiError>;
    async fn delete_exam(&self, org: Uuid, id: Uuid) -> Result<Option<Exam>, ApiError>;
}

impl ExamDbExt for Database {
    async fn insert_exam(&self, exam: &Exam) -> Result<(), ApiError> {
        self.collection::<Exam>(EXAM_COLLECTION_NAME)
            .insert_one(exam, None)
            .await?;
        Ok(())
    }

    async fn get_exam(&self, org: Uuid, id: Uuid) -> Result<Option<Exam>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(EXAM_COLLECTION_NAME)
            .find_one(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn list_exams(
        &self,
        org: Uuid,
        class: Option<Uuid>,
        subject: Option<Uuid>,
    ) -> Result<Vec<Exam>, ApiError> {
        let mut filter = in_org(org);
        if let Some(class) = class {
            filter.insert("class", class.to_string());
        }
        if let Some(subject) = subject {
            filter.insert("subject", subject.to_string());
        }

        let cursor = self
            .collection(EXAM_COLLECTION_NAME)
            .find(
                filter,
                FindOptions::builder().sort(doc! { "created": -1 }).build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }

    async fn set_mark(
        &self,
        org: Uuid,
        exam: Uuid,
        student: Uuid,
        mark: u32,
    ) -> Result<Option<Exam>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(exam));

        self.collection(EXAM_COLLECTION_NAME)
            .find_one_and_update(
                filter,
                doc! { "$set": { format!("marks.{}", student): mark } },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn delete_exam(&self, org: Uuid, id: Uuid) -> Result<Option<Exam>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(EXAM_COLLECTION_NAME)
            .find_one_and_delete(filter, None)
            .await
            .map_err(ApiError::from)
    }
}
