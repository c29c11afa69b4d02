use mongodb::Database;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::data::user::db::UserDbExt;
use crate::data::user::User;
use crate::resp::fail::{self, ApiError};
use crate::resp::jwt::{AuthClaims, TOKEN_HEADER};
use crate::security::Security;

/// Authenticated requester. Verifies the `token` header, loads the user and
/// rejects unapproved accounts. Terminal on failure; there are no retries.
#[derive(Debug)]
pub struct AuthedUser {
    pub claims: AuthClaims,
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthedUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security: &Security = req
            .rocket()
            .state()
            .expect("Security is managed at startup");
        let db: &Database = req
            .rocket()
            .state()
            .expect("Database is managed at startup");

        let token = match req.headers().get_one(TOKEN_HEADER) {
            Some(token) => token,
            None => {
                let e = fail::token_missing();
                return Outcome::Error((e.status(), e));
            }
        };

        let claims = match AuthClaims::decode(token, security) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("rejected auth token: {}", e.msg);
                return Outcome::Error((e.status(), e));
            }
        };

        let user = match db.get_user(claims.user).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                let e = fail::user_not_found();
                return Outcome::Error((e.status(), e));
            }
            Err(e) => return Outcome::Error((e.status(), e)),
        };

        if !user.approved {
            let e = fail::account_not_approved();
            return Outcome::Error((e.status(), e));
        }

        Outcome::Success(AuthedUser { claims, user })
    }
}
