use bson::doc;
use chrono::Utc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::org::Feature;
use crate::data::task::db::TaskDbExt;
use crate::data::task::{Task, TaskPriority, TaskStatus};
use crate::data::user::db::UserDbExt;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub organization: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub rank_id: i64,
    pub priority: TaskPriority,
    pub assignee: Option<Uuid>,
    pub created_by: Uuid,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        TaskResponse {
            id: task.id,
            organization: task.organization,
            title: task.title,
            description: task.description,
            status: task.status,
            rank_id: task.rank_id,
            priority: task.priority,
            assignee: task.assignee,
            created_by: task.created_by,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskData {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub assignee: Option<Uuid>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Open
}

#[post("/", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn task_create(
    create: Json<CreateTaskData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<TaskResponse>, ApiError> {
    tenant.require_feature(Feature::Tasks)?;

    let create = create.into_inner();
    if create.title.is_empty() {
        return Err(fail::validation("Task title can't be empty."));
    }

    if let Some(assignee) = create.assignee {
        db.find_user_in_org(tenant.org.id, assignee)
            .await?
            .ok_or_else(|| fail::not_found("Assignee"))?;
    }

    let mut task = Task {
        id: Uuid::new_v4(),
        organization: tenant.org.id,
        title: create.title,
        description: create.description,
        status: create.status,
        // Placeholder; insert_task assigns the real column rank.
        rank_id: 0,
        priority: create.priority,
        assignee: create.assignee,
        created_by: tenant.user.id,
        created: Utc::now(),
    };
    db.insert_task(&mut task).await?;

    Ok(Json(TaskResponse::from(task)))
}

/// Board listing; only tasks the caller created or is assigned to, ordered by
/// column then rank.
#[get("/")]
#[tracing::instrument(skip_all)]
pub async fn task_list(
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    tenant.require_feature(Feature::Tasks)?;

    let tasks = db.list_tasks(tenant.org.id, tenant.user.id).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn task_get(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<TaskResponse>, ApiError> {
    tenant.require_feature(Feature::Tasks)?;

    let task = db
        .get_task(tenant.org.id, tenant.user.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Task"))?;

    Ok(Json(TaskResponse::from(task)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub rank_id: Option<i64>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<Uuid>,
}

#[put("/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip_all)]
pub async fn task_update(
    id: Uuid,
    update: Json<UpdateTaskData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<TaskResponse>, ApiError> {
    tenant.require_feature(Feature::Tasks)?;

    let update = update.into_inner();
    let mut set = doc! {};

    if let Some(title) = update.title {
        if title.is_empty() {
            return Err(fail::validation("Task title can't be empty."));
        }
        set.insert("title", title);
    }
    if let Some(description) = update.description {
        set.insert("description", description);
    }
    if let Some(status) = update.status {
        set.insert("status", bson::to_bson(&status)?);
    }
    if let Some(rank_id) = update.rank_id {
        set.insert("rank_id", rank_id);
    }
    if let Some(priority) = update.priority {
        set.insert("priority", bson::to_bson(&priority)?);
    }
    if let Some(assignee) = update.assignee {
        db.find_user_in_org(tenant.org.id, assignee)
            .await?
            .ok_or_else(|| fail::not_found("Assignee"))?;
        set.insert("assignee", assignee.to_string());
    }

    if set.is_empty() {
        return Err(fail::validation("Nothing to update."));
    }

    let task = db
        .update_task(tenant.org.id, tenant.user.id, id, set)
        .await?
        .ok_or_else(|| fail::not_found("Task"))?;

    Ok(Json(TaskResponse::from(task)))
}

/// Only the creator may delete; an assignee gets not-found, same as an
/// outsider.
#[delete("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn task_delete(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<String, ApiError> {
    tenant.require_feature(Feature::Tasks)?;

    let removed = db
        .delete_task(tenant.org.id, tenant.user.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Task"))?;

    Ok(removed.id.to_string())
}
