use bson::doc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::{Compensation, CompensationLog, PaymentGateway};
use crate::data::org::db::OrgDbExt;
use crate::data::org::{Feature, Organization, SubscriptionStatus, Tier};
use crate::data::user::db::UserDbExt;
use crate::data::user::{User, UserResponse};
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError, ErrorCode};
use crate::resp::jwt::AuthClaims;
use crate::role::Role;
use crate::security::Security;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgResponse {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub tier: Tier,
    pub subscription_status: SubscriptionStatus,
    pub max_users: u32,
    pub features: Vec<Feature>,
}

impl From<Organization> for OrgResponse {
    fn from(org: Organization) -> Self {
        OrgResponse {
            id: org.id,
            name: org.name,
            domain: org.domain,
            tier: org.tier,
            subscription_status: org.subscription_status,
            max_users: org.max_users,
            features: org.features,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct SignupData {
    pub name: String,
    pub domain: String,
    pub tier: Tier,
    pub admin_email: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl std::fmt::Debug for SignupData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignupData:{}", self.domain)
    }
}

impl SignupData {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_empty() {
            return Err(fail::validation("Organization name can't be empty."));
        }
        if self.domain.is_empty() || self.domain.contains('@') || self.domain.contains(' ') {
            return Err(fail::validation("Not a valid domain."));
        }
        if !self.admin_email.contains('@') {
            return Err(fail::validation("Not a valid e-mail address."));
        }
        if self.admin_password.len() < 8 {
            return Err(fail::validation(
                "Password must be at least 8 characters (bytes) long.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub token: String,
    pub organization: OrgResponse,
    pub user: UserResponse,
}

/// Saga body: each completed step records its undo action before the next
/// step runs. Failures bubble up to `org_signup`, which drains the log.
async fn run_signup(
    signup: SignupData,
    db: &Database,
    security: &Security,
    gateway: &dyn PaymentGateway,
    log: &mut CompensationLog,
) -> Result<SignupResponse, ApiError> {
    let domain = signup.domain.to_lowercase();

    if db.find_org_by_domain(&domain).await?.is_some() {
        return Err(fail::validation("Domain already registered."));
    }
    if let Some(existing) = db.find_user_by_email(&signup.admin_email).await? {
        return Err(if existing.approved {
            fail::email_exists_approved()
        } else {
            fail::validation("Email already registered.")
        });
    }

    let price = signup.tier.price_cents();
    if price > 0 {
        let charge = gateway.charge(&domain, price).await.map_err(|e| {
            tracing::warn!("signup charge for '{}' failed: {}", domain, e);
            ApiError::new(ErrorCode::PaymentFailed, "Payment was not accepted.")
        })?;
        log.record(Compensation::RefundCharge(charge));
    }

    let org = Organization::new(&signup.name, &domain, signup.tier);
    db.insert_org(&org).await?;
    log.record(Compensation::DeleteOrganization(org.id));

    let mut admin = User::new(
        &signup.admin_email,
        &signup.admin_username,
        &signup.admin_password,
        &security.salt,
        Some(org.id),
    );
    admin.role = Role::Admin;
    admin.approved = true;
    db.insert_user(&admin).await?;
    log.record(Compensation::DeleteUser(admin.id));

    let token = AuthClaims::new(&admin).encode(security)?;

    Ok(SignupResponse {
        token,
        organization: OrgResponse::from(org),
        user: UserResponse::from(admin),
    })
}

/// Undo completed steps in reverse. A compensation that fails is logged and
/// dropped, not retried; an orphaned charge is possible and must be visible
/// in the logs.
async fn compensate(db: &Database, gateway: &dyn PaymentGateway, log: &mut CompensationLog) {
    for action in log.drain_reverse() {
        let result = match &action {
            Compensation::RefundCharge(charge) => {
                gateway.refund(charge).await.map_err(|e| e.to_string())
            }
            Compensation::DeleteOrganization(id) => {
                db.delete_org(*id).await.map(|_| ()).map_err(|e| e.msg)
            }
            Compensation::DeleteUser(id) => {
                db.delete_user(*id).await.map(|_| ()).map_err(|e| e.msg)
            }
        };

        match result {
            Ok(()) => tracing::info!("signup compensation applied: {:?}", action),
            Err(e) => tracing::error!("signup compensation {:?} failed: {}", action, e),
        }
    }
}

/// Self-service organization signup: uniqueness checks, charge (skipped for
/// free tiers), organization + admin creation, token issuance.
#[post("/signup", format = "application/json", data = "<signup>")]
#[tracing::instrument(skip_all)]
pub async fn org_signup(
    signup: Json<SignupData>,
    db: &State<Database>,
    security: &State<Security>,
    gateway: &State<Box<dyn PaymentGateway>>,
) -> Result<Json<SignupResponse>, ApiError> {
    let signup = signup.into_inner();
    signup.validate()?;

    let mut log = CompensationLog::new();
    match run_signup(signup, db, security, gateway.as_ref(), &mut log).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if !log.is_empty() {
                compensate(db, gateway.as_ref(), &mut log).await;
            }
            Err(e)
        }
    }
}

#[get("/me")]
#[tracing::instrument(skip_all)]
pub async fn org_get(
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<OrgResponse>, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    Ok(Json(OrgResponse::from(tenant.org)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrgData {
    pub name: Option<String>,
    /// Changing tier re-applies the tier's default max_users and features.
    pub tier: Option<Tier>,
    pub subscription_status: Option<SubscriptionStatus>,
}

#[put("/me", format = "application/json", data = "<update>")]
#[tracing::instrument(skip_all)]
pub async fn org_update(
    update: Json<UpdateOrgData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<OrgResponse>, ApiError> {
    tenant.require_role(db, Role::ADMIN_ONLY).await?;

    let update = update.into_inner();
    let mut set = doc! {};

    if let Some(name) = update.name {
        set.insert("name", name);
    }
    if let Some(tier) = update.tier {
        set.insert("tier", bson::to_bson(&tier)?);
        set.insert("max_users", tier.max_users());
        set.insert("features", bson::to_bson(&tier.features())?);
    }
    if let Some(status) = update.subscription_status {
        set.insert("subscription_status", bson::to_bson(&status)?);
    }

    if set.is_empty() {
        return Err(fail::validation("Nothing to update."));
    }

    let org = db
        .update_org(tenant.org.id, set)
        .await?
        .ok_or_else(|| fail::not_found("Organization"))?;

    Ok(Json(OrgResponse::from(org)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(domain: &str, tier: Tier) -> SignupData {
        SignupData {
            name: "Acme Primary".to_string(),
            domain: domain.to_string(),
            tier,
            admin_email: format!("admin@{}", domain),
            admin_username: "acme_admin".to_string(),
            admin_password: "longenough".to_string(),
        }
    }

    #[test]
    fn signup_validates_domain_shape() {
        assert!(signup("acme.edu", Tier::Primary).validate().is_ok());
        assert!(signup("", Tier::Primary).validate().is_err());
        assert!(signup("has space", Tier::Primary).validate().is_err());
        assert!(signup("has@sign", Tier::Primary).validate().is_err());
    }

    #[test]
    fn signup_rejects_short_admin_password() {
        let mut data = signup("acme.edu", Tier::University);
        data.admin_password = "short".to_string();
        assert!(data.validate().is_err());
    }
}
