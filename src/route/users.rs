use bson::doc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::lookup;
use crate::data::org::db::OrgDbExt;
use crate::data::org::domain_of_email;
use crate::data::user::db::UserDbExt;
use crate::data::user::{PasswordHash, User, UserResponse};
use crate::mail::{credentials_mail, Mailer};
use crate::middleware::paging::PageState;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};
use crate::resp::jwt::AuthClaims;
use crate::role::Role;
use crate::security::Security;
use crate::util;

#[derive(Clone, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegisterData:{}", self.username)
    }
}

impl RegisterData {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.email.contains('@') {
            return Err(fail::validation("Not a valid e-mail address."));
        }
        if self.username.len() < 3 || self.username.len() > 32 {
            return Err(fail::validation(
                "Username must be between 3 and 32 characters (bytes) long.",
            ));
        }
        if self.password.len() < 8 {
            return Err(fail::validation(
                "Password must be at least 8 characters (bytes) long.",
            ));
        }
        if self.password.len() > 1024 {
            return Err(fail::validation(
                "Passwords longer than 1024 characters aren't supported.",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoginData:{}", self.email)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Self-service registration. The new account lands unapproved in the
/// organization owning the email domain.
#[post("/register", format = "application/json", data = "<register>")]
#[tracing::instrument(skip_all)]
pub async fn user_register(
    register: Json<RegisterData>,
    db: &State<Database>,
    security: &State<Security>,
) -> Result<Json<UserResponse>, ApiError> {
    let register = register.into_inner();
    register.validate()?;

    let domain = domain_of_email(&register.email)
        .ok_or_else(|| fail::validation("Not a valid e-mail address."))?;
    let org = db
        .find_org_by_domain(&domain)
        .await?
        .ok_or_else(|| fail::validation("No organization is registered for this email domain."))?;

    if let Some(existing) = db.find_user_by_email(&register.email).await? {
        if existing.approved {
            return Err(fail::email_exists_approved());
        }

        // Pending registration for the same address: refresh it in place.
        let mut refreshed = existing;
        refreshed.username = register.username;
        refreshed.pw_hash = PasswordHash::new(&register.password, &security.salt);
        db.replace_user(&refreshed).await?;
        return Ok(Json(UserResponse::from(refreshed)));
    }

    let user = User::new(
        register.email,
        register.username,
        register.password,
        &security.salt,
        Some(org.id),
    );
    db.insert_user(&user).await?;

    Ok(Json(UserResponse::from(user)))
}

#[post("/login", format = "application/json", data = "<login>")]
#[tracing::instrument(skip_all)]
pub async fn user_login(
    login: Json<LoginData>,
    db: &State<Database>,
    security: &State<Security>,
) -> Result<Json<LoginResponse>, ApiError> {
    let login = login.into_inner();

    let user = db
        .find_user_by_email(&login.email)
        .await?
        .ok_or_else(fail::bad_login)?;

    if user.pw_hash != PasswordHash::new(&login.password, &security.salt) {
        return Err(fail::bad_login());
    }

    if !user.approved {
        return Err(fail::account_not_approved());
    }

    let token = AuthClaims::new(&user).encode(security)?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

#[get("/")]
#[tracing::instrument(skip_all)]
pub async fn user_list(
    tenant: Tenant,
    page: PageState,
    db: &State<Database>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    let users = db.list_org_users(tenant.org.id, page).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn user_get(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = db
        .find_user_in_org(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("User"))?;

    Ok(Json(UserResponse::from(user)))
}

/// Approves a pending account: flips the flag, generates credentials and
/// mails them out.
#[put("/<id>/approve")]
#[tracing::instrument(skip_all)]
pub async fn user_approve(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
    security: &State<Security>,
    mailer: &State<Box<dyn Mailer>>,
) -> Result<Json<UserResponse>, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    let mut user = db
        .find_user_in_org(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("User"))?;

    if user.approved {
        return Ok(Json(UserResponse::from(user)));
    }

    let approved_count = db.count_approved_org_users(tenant.org.id).await?;
    if approved_count >= tenant.org.max_users as u64 {
        return Err(fail::validation("Organization user limit reached."));
    }

    let password = util::random_password(12);
    user.approved = true;
    user.pw_hash = PasswordHash::new(&password, &security.salt);
    db.replace_user(&user).await?;

    mailer
        .send(
            &user.email,
            "Your account has been approved",
            &credentials_mail(&user.username, &password),
        )
        .await;

    Ok(Json(UserResponse::from(user)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserData {
    pub role: Option<Role>,
    /// Class name or id; resolved through the shared lookup.
    pub class: Option<String>,
    /// Subject name or id; resolved through the shared lookup.
    pub subject: Option<String>,
}

#[put("/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip_all)]
pub async fn user_update(
    id: Uuid,
    update: Json<UpdateUserData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<UserResponse>, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    let update = update.into_inner();
    let mut set = doc! {};

    if let Some(role) = update.role {
        set.insert("role", bson::to_bson(&role)?);
    }
    if let Some(class) = &update.class {
        let class_id = lookup::resolve_class(db, tenant.org.id, class).await?;
        set.insert("class", class_id.to_string());
    }
    if let Some(subject) = &update.subject {
        let subject_id = lookup::resolve_subject(db, subject).await?;
        set.insert("subject", subject_id.to_string());
    }

    if set.is_empty() {
        return Err(fail::validation("Nothing to update."));
    }

    let user = db
        .update_user_in_org(tenant.org.id, id, set)
        .await?
        .ok_or_else(|| fail::not_found("User"))?;

    Ok(Json(UserResponse::from(user)))
}

/// Explicit admin action; the only way a user is hard-deleted.
#[delete("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn user_delete(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<String, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    let removed = db
        .delete_user_in_org(tenant.org.id, id)
        .await?
        .ok_or_else(|| fail::not_found("User"))?;

    Ok(removed.id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::fail::ErrorCode;

    fn register(email: &str, username: &str, password: &str) -> RegisterData {
        RegisterData {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_validates_fields() {
        assert!(register("a@b.edu", "alice", "longenough").validate().is_ok());
        assert!(register("not-an-email", "alice", "longenough")
            .validate()
            .is_err());
        assert!(register("a@b.edu", "al", "longenough").validate().is_err());
        assert!(register("a@b.edu", "alice", "short").validate().is_err());
    }

    #[test]
    fn approved_email_conflict_uses_the_404_quirk() {
        let err = fail::email_exists_approved();
        assert_eq!(err.code, ErrorCode::EmailExists);
        assert_eq!(err.status(), rocket::http::Status::NotFound);
        assert_eq!(err.msg, "Email already exists and is approved");
    }
}
