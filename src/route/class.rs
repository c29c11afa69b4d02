use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::class::db::ClassDbExt;
use crate::data::class::{Class, Subject};
use crate::data::lookup;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};
use crate::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassResponse {
    pub id: Uuid,
    pub organization: Uuid,
    pub name: String,
    pub subjects: Vec<Uuid>,
}

impl From<Class> for ClassResponse {
    fn from(class: Class) -> Self {
        ClassResponse {
            id: class.id,
            organization: class.organization,
            name: class.name,
            subjects: class.subjects,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        SubjectResponse {
            id: subject.id,
            name: subject.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassData {
    pub name: String,
}

#[post("/", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn class_create(
    create: Json<CreateClassData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, ApiError> {
    tenant.require_role(db, Role::STAFF).await?;

    let create = create.into_inner();
    if create.name.is_empty() {
        return Err(fail::validation("Class name can't be empty."));
    }

    let class = Class::new(tenant.org.id, create.name);
    db.insert_class(&class).await?;

    Ok(Json(ClassResponse::from(class)))
}

#[get("/")]
#[tracing::instrument(skip_all)]
pub async fn class_list(
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<Vec<ClassResponse>>, ApiError> {
    let classes = db.list_classes(tenant.org.id).await?;
    Ok(Json(classes.into_iter().map(ClassResponse::from).collect()))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn class_get(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, ApiError> {
    let class = db
        .get_class(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Class"))?;

    Ok(Json(ClassResponse::from(class)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachSubjectData {
    /// Subject name or id; resolved through the shared lookup.
    pub subject: String,
}

#[put("/<id>/subjects", format = "application/json", data = "<attach>")]
#[tracing::instrument(skip_all)]
pub async fn class_attach_subject(
    id: Uuid,
    attach: Json<AttachSubjectData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, ApiError> {
    tenant.require_role(db, Role::STAFF).await?;

    let subject_id = lookup::resolve_subject(db, &attach.subject).await?;
    let class = db
        .attach_subject(tenant.org.id, id, subject_id)
        .await?
        .ok_or_else(|| fail::not_found("Class"))?;

    Ok(Json(ClassResponse::from(class)))
}

#[delete("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn class_delete(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<String, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    let removed = db
        .delete_class(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Class"))?;

    Ok(removed.id.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubjectData {
    pub name: String,
}

/// Subjects are a shared catalog; creating one with a name that already
/// exists returns the existing entry instead of a duplicate.
#[post("/", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn subject_create(
    create: Json<CreateSubjectData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<SubjectResponse>, ApiError> {
    tenant.require_role(db, Role::STAFF).await?;

    let create = create.into_inner();
    if create.name.is_empty() {
        return Err(fail::validation("Subject name can't be empty."));
    }

    if let Some(existing) = db.find_subject_by_name(&create.name).await? {
        return Ok(Json(SubjectResponse::from(existing)));
    }

    let subject = Subject::new(create.name);
    db.insert_subject(&subject).await?;

    Ok(Json(SubjectResponse::from(subject)))
}

#[get("/")]
#[tracing::instrument(skip_all)]
pub async fn subject_list(
    _tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = db.list_subjects().await?;
    Ok(Json(
        subjects.into_iter().map(SubjectResponse::from).collect(),
    ))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn subject_get(
    id: Uuid,
    _tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = db
        .get_subject(id)
        .await?
        .ok_or_else(|| fail::not_found("Subject"))?;

    Ok(Json(SubjectResponse::from(subject)))
}
