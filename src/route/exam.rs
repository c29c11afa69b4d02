use std::collections::HashMap;

use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::exam::db::ExamDbExt;
use crate::data::exam::{check_mark, Exam};
use crate::data::lookup;
use crate::data::org::Feature;
use crate::data::user::db::UserDbExt;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};
use crate::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResponse {
    pub id: Uuid,
    pub organization: Uuid,
    pub class: Uuid,
    pub subject: Uuid,
    pub name: String,
    pub total_mark: u32,
    pub marks: HashMap<String, u32>,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        ExamResponse {
            id: exam.id,
            organization: exam.organization,
            class: exam.class,
            subject: exam.subject,
            name: exam.name,
            total_mark: exam.total_mark,
            marks: exam.marks,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExamData {
    pub name: String,
    /// Class name or id; resolved through the shared lookup.
    pub class: String,
    /// Subject name or id; resolved through the shared lookup.
    pub subject: String,
    pub total_mark: u32,
}

#[post("/", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn exam_create(
    create: Json<CreateExamData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ExamResponse>, ApiError> {
    tenant.require_feature(Feature::Exams)?;
    tenant.require_role(db, Role::STAFF).await?;

    let create = create.into_inner();
    if create.name.is_empty() {
        return Err(fail::validation("Exam name can't be empty."));
    }
    if create.total_mark == 0 {
        return Err(fail::validation("totalMark must be greater than zero."));
    }

    let class = lookup::resolve_class(db, tenant.org.id, &create.class).await?;
    let subject = lookup::resolve_subject(db, &create.subject).await?;

    let exam = Exam::new(tenant.org.id, class, subject, create.name, create.total_mark);
    db.insert_exam(&exam).await?;

    Ok(Json(ExamResponse::from(exam)))
}

#[get("/?<class>&<subject>")]
#[tracing::instrument(skip_all)]
pub async fn exam_list(
    class: Option<String>,
    subject: Option<String>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    tenant.require_feature(Feature::Exams)?;

    let class = match class {
        Some(value) => Some(lookup::resolve_class(db, tenant.org.id, &value).await?),
        None => None,
    };
    let subject = match subject {
        Some(value) => Some(lookup::resolve_subject(db, &value).await?),
        None => None,
    };

    let exams = db.list_exams(tenant.org.id, class, subject).await?;
    Ok(Json(exams.into_iter().map(ExamResponse::from).collect()))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn exam_get(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ExamResponse>, ApiError> {
    tenant.require_feature(Feature::Exams)?;

    let exam = db
        .get_exam(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Exam"))?;

    Ok(Json(ExamResponse::from(exam)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetMarkData {
    pub student: Uuid,
    pub mark: u32,
}

/// Records one student's mark. The bound against `total_mark` is checked
/// before the update is sent, so an oversized mark never reaches the store.
#[post("/<id>/marks", format = "application/json", data = "<data>")]
#[tracing::instrument(skip_all)]
pub async fn exam_set_mark(
    id: Uuid,
    data: Json<SetMarkData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ExamResponse>, ApiError> {
    tenant.require_feature(Feature::Exams)?;
    tenant.require_role(db, Role::STAFF).await?;

    let data = data.into_inner();

    let exam = db
        .get_exam(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Exam"))?;
    check_mark(exam.total_mark, data.mark)?;

    db.find_user_in_org(tenant.org.id, data.student)
        .await?
        .ok_or_else(|| fail::not_found("Student"))?;

    let updated = db
        .set_mark(tenant.org.id, id, data.student, data.mark)
        .await?
        .ok_or_else(|| fail::not_found("Exam"))?;

    Ok(Json(ExamResponse::from(updated)))
}

#[delete("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn exam_delete(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<String, ApiError> {
    tenant.require_feature(Feature::Exams)?;
    tenant.require_role(db, Role::STAFF).await?;

    let removed = db
        .delete_exam(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("Exam"))?;

    Ok(removed.id.to_string())
}
