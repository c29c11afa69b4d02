use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::homework::db::HomeworkDbExt;
use crate::data::homework::{Homework, Question};
use crate::data::lookup;
use crate::data::org::Feature;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};
use crate::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeworkResponse {
    pub id: Uuid,
    pub organization: Uuid,
    pub class: Uuid,
    pub subject: Uuid,
    pub title: String,
    pub questions: Vec<Question>,
}

impl From<Homework> for HomeworkResponse {
    fn from(homework: Homework) -> Self {
        HomeworkResponse {
            id: homework.id,
            organization: homework.organization,
            class: homework.class,
            subject: homework.subject,
            title: homework.title,
            questions: homework.questions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHomeworkData {
    pub title: String,
    /// Class name or id; resolved through the shared lookup.
    pub class: String,
    /// Subject name or id; resolved through the shared lookup.
    pub subject: String,
    pub questions: Vec<Question>,
}

#[post("/", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn homework_create(
    create: Json<CreateHomeworkData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<HomeworkResponse>, ApiError> {
    tenant.require_feature(Feature::Homework)?;
    tenant.require_role(db, Role::STAFF).await?;

    let create = create.into_inner();
    if create.title.is_empty() {
        return Err(fail::validation("Homework title can't be empty."));
    }

    let class = lookup::resolve_class(db, tenant.org.id, &create.class).await?;
    let subject = lookup::resolve_subject(db, &create.subject).await?;

    let homework = Homework::new(tenant.org.id, class, subject, create.title, create.questions)?;
    db.insert_homework(&homework).await?;

    Ok(Json(HomeworkResponse::from(homework)))
}

#[get("/?<class>&<subject>")]
#[tracing::instrument(skip_all)]
pub async fn homework_list(
    class: Option<String>,
    subject: Option<String>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<Vec<HomeworkResponse>>, ApiError> {
    tenant.require_feature(Feature::Homework)?;

    let class = match class {
        Some(value) => Some(lookup::resolve_class(db, tenant.org.id, &value).await?),
        None => None,
    };
    let subject = match subject {
        Some(value) => Some(lookup::resolve_subject(db, &value).await?),
        None => None,
    };

    let homework = db.list_homework(tenant.org.id, class, subject).await?;
    Ok(Json(
        homework.into_iter().map(HomeworkResponse::from).collect(),
    ))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn homework_get(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<HomeworkResponse>, ApiError> {
    tenant.require_feature(Feature::Homework)?;

    let homework = db
        .get_homework(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Homework"))?;

    Ok(Json(HomeworkResponse::from(homework)))
}

#[delete("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn homework_delete(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<String, ApiError> {
    tenant.require_feature(Feature::Homework)?;
    tenant.require_role(db, Role::STAFF).await?;

    let removed = db
        .delete_homework(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Homework"))?;

    Ok(removed.id.to_string())
}
