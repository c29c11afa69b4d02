use bson::{doc, Document};
use mongodb::options::{FindOneOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use super::{next_rank, visible_to, Task, TaskStatus, TASK_COLLECTION_NAME};
use crate::data::{by_id, drain_cursor, in_org};
use crate::resp::fail::ApiError;

pub trait TaskDbExt {
    /// Highest rank among `(org, status)` siblings, if any exist.
    async fn max_rank(&self, org: Uuid, status: TaskStatus) -> Result<Option<i64>, ApiError>;

    /// Inserts the task after assigning it the next rank in its column.
    async fn insert_task(&self, task: &mut Task) -> Result<(), ApiError>;

    async fn list_tasks(&self, org: Uuid, user: Uuid) -> Result<Vec<Task>, ApiError>;
    async fn get_task(&self, org: Uuid, user: Uuid, id: Uuid) -> Result<Option<Task>, ApiError>;

    async fn update_task(
        &self,
        org: Uuid,
        user: Uuid,
        id: Uuid,
        update: Document,
    ) -> Result<Option<Task>, ApiError>;

    async fn delete_task(&self, org: Uuid, creator: Uuid, id: Uuid)
        -> Result<Option<Task>, ApiError>;
}

impl TaskDbExt for Database {
    async fn max_rank(&self, org: Uuid, status: TaskStatus) -> Result<Option<i64>, ApiError> {
        let mut filter = in_org(org);
        filter.insert("status", bson::to_bson(&status)?);

        let top: Option<Task> = self
            .collection(TASK_COLLECTION_NAME)
            .find_one(
                filter,
                FindOneOptions::builder()
                    .sort(doc! { "rank_id": -1 })
                    .build(),
            )
            .await?;

        Ok(top.map(|task| task.rank_id))
    }

    async fn insert_task(&self, task: &mut Task) -> Result<(), ApiError> {
        // Read-then-write rank assignment; concurrent creates in the same
        // column can produce duplicate ranks (accepted).
        task.rank_id = next_rank(self.max_rank(task.organization, task.status).await?);

        self.collection::<Task>(TASK_COLLECTION_NAME)
            .insert_one(&*task, None)
            .await?;
        Ok(())
    }

    async fn list_tasks(&self, org: Uuid, user: Uuid) -> Result<Vec<Task>, ApiError> {
        let cursor = self
            .collection(TASK_COLLECTION_NAME)
            .find(
                visible_to(org, user),
                FindOptions::builder()
                    .sort(doc! { "status": 1, "rank_id": 1 })
                    .build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }

    async fn get_task(&self, org: Uuid, user: Uuid, id: Uuid) -> Result<Option<Task>, ApiError> {
        let mut filter = visible_to(org, user);
        filter.extend(by_id(id));

        self.collection(TASK_COLLECTION_NAME)
            .find_one(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn update_task(
        &self,
        org: Uuid,
        user: Uuid,
        id: Uuid,
        update: Document,
    ) -> Result<Option<Task>, ApiError> {
        let mut filter = visible_to(org, user);
        filter.extend(by_id(id));

        self.collection(TASK_COLLECTION_NAME)
            .find_one_and_update(
                filter,
                doc! { "$set": update },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn delete_task(
        &self,
        org: Uuid,
        creator: Uuid,
        id: Uuid,
    ) -> Result<Option<Task>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));
        filter.insert("created_by", creator.to_string());

        self.collection(TASK_COLLECTION_NAME)
            .find_one_and_delete(filter, None)
            .await
            .map_err(ApiError::from)
    }
}
