use mongodb::Database;
use rocket::outcome::{try_outcome, Outcome};
use rocket::request::{self, FromRequest, Request};

use super::auth::AuthedUser;
use crate::data::org::db::OrgDbExt;
use crate::data::org::{Feature, Organization};
use crate::data::user::db::UserDbExt;
use crate::data::user::User;
use crate::resp::fail::{self, ApiError};
use crate::role::Role;

/// Resolved tenant context: the authenticated user plus their organization
/// with an active subscription. Every downstream query must filter by
/// `self.org.id`; this guard is the sole tenant-isolation mechanism.
#[derive(Debug)]
pub struct Tenant {
    pub user: User,
    pub org: Organization,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Tenant {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = try_outcome!(req.guard::<AuthedUser>().await);
        let db: &Database = req
            .rocket()
            .state()
            .expect("Database is managed at startup");

        let org_id = match auth.user.organization {
            Some(id) => id,
            None => {
                let e = fail::org_not_found();
                return Outcome::Error((e.status(), e));
            }
        };

        let org = match db.get_org(org_id).await {
            Ok(Some(org)) => org,
            Ok(None) => {
                let e = fail::org_not_found();
                return Outcome::Error((e.status(), e));
            }
            Err(e) => return Outcome::Error((e.status(), e)),
        };

        if !org.is_active() {
            let e = fail::org_inactive();
            return Outcome::Error((e.status(), e));
        }

        Outcome::Success(Tenant {
            user: auth.user,
            org,
        })
    }
}

impl Tenant {
    /// Feature gate: locks a route behind the organization's plan.
    pub fn require_feature(&self, feature: Feature) -> Result<(), ApiError> {
        if !self.org.has_feature(feature) {
            return Err(fail::feature_not_available(feature));
        }
        Ok(())
    }

    /// Role gate. Re-fetches the user scoped to the resolved organization so
    /// a token minted for a user of a different org can't pass on id alone.
    pub async fn require_role(&self, db: &Database, allowed: &[Role]) -> Result<(), ApiError> {
        let member = db
            .find_user_in_org(self.org.id, self.user.id)
            .await?
            .ok_or_else(fail::role_access_denied)?;

        if !allowed.contains(&member.role) {
            return Err(fail::role_access_denied());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::org::Tier;
    use crate::resp::fail::ErrorCode;

    fn tenant_on(tier: Tier) -> Tenant {
        let org = Organization::new("Acme", "acme.edu", tier);
        let mut user = User::new("admin@acme.edu", "acme_admin", "pw", &[0u8; 16], Some(org.id));
        user.approved = true;
        user.role = Role::Admin;
        Tenant { user, org }
    }

    #[test]
    fn primary_tier_tenant_cannot_use_chat() {
        let tenant = tenant_on(Tier::Primary);

        let err = tenant.require_feature(Feature::Chat).unwrap_err();
        assert_eq!(err.code, ErrorCode::FeatureNotAvailable);
        assert_eq!(
            err.extra.get("requiredFeature"),
            Some(&serde_json::json!("chat"))
        );
    }

    #[test]
    fn university_tier_tenant_can_use_chat() {
        let tenant = tenant_on(Tier::University);
        assert!(tenant.require_feature(Feature::Chat).is_ok());
        assert!(tenant.require_feature(Feature::Basic).is_ok());
    }
}
