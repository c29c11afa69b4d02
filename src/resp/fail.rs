use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::org::Feature;

/// Machine-readable failure kind. Every failure the API can produce is one of
/// these; the HTTP status is derived from the code so the two can't drift
/// apart between controllers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication (401)
    TokenMissing,
    InvalidToken,
    TokenExpired,
    UserNotFound,
    BadCredentials,
    // Authorization (403)
    AccountNotApproved,
    OrgNotFound,
    OrgInactive,
    FeatureNotAvailable,
    RoleAccessDenied,
    ChatAccessDenied,
    // Request failures
    ValidationFailed,
    PaymentFailed,
    NotFound,
    // Registering an already-approved email reports 404, mirroring the
    // behavior existing clients depend on.
    EmailExists,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> Status {
        use ErrorCode::*;

        match self {
            TokenMissing | InvalidToken | TokenExpired | UserNotFound | BadCredentials => {
                Status::Unauthorized
            }
            AccountNotApproved | OrgNotFound | OrgInactive | FeatureNotAvailable
            | RoleAccessDenied | ChatAccessDenied => Status::Forbidden,
            ValidationFailed | PaymentFailed => Status::BadRequest,
            NotFound | EmailExists => Status::NotFound,
            Internal => Status::InternalServerError,
        }
    }
}

/// API failure response, serialized as `{ "msg": ..., "code": ..., ...extra }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub msg: String,
    pub extra: Map<String, Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, msg: impl ToString) -> ApiError {
        ApiError {
            code,
            msg: msg.to_string(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl ToString, value: impl Serialize) -> ApiError {
        self.extra.insert(
            key.to_string(),
            serde_json::to_value(value).expect("extra error data must be JSON serializable"),
        );
        self
    }

    pub fn status(&self) -> Status {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status(), self.msg)
    }
}

impl std::error::Error for ApiError {}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.extra;
        body.insert("msg".to_string(), Value::String(self.msg));
        body.insert(
            "code".to_string(),
            serde_json::to_value(self.code).expect("error codes are plain strings"),
        );

        let body_string =
            serde_json::to_string(&body).expect("JSON map keys and values must be serializable");

        Response::build()
            .status(self.code.status())
            .header(ContentType::JSON)
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub fn token_missing() -> ApiError {
    ApiError::new(ErrorCode::TokenMissing, "No auth token provided.")
}

pub fn invalid_token() -> ApiError {
    ApiError::new(ErrorCode::InvalidToken, "Auth token is invalid.")
}

pub fn token_expired() -> ApiError {
    ApiError::new(ErrorCode::TokenExpired, "Auth token has expired.")
}

pub fn bad_login() -> ApiError {
    ApiError::new(ErrorCode::BadCredentials, "Bad email or password.")
}

pub fn user_not_found() -> ApiError {
    ApiError::new(ErrorCode::UserNotFound, "Token subject no longer exists.")
}

pub fn account_not_approved() -> ApiError {
    ApiError::new(
        ErrorCode::AccountNotApproved,
        "Account has not been approved yet.",
    )
}

pub fn org_not_found() -> ApiError {
    ApiError::new(
        ErrorCode::OrgNotFound,
        "User does not belong to an organization.",
    )
}

pub fn org_inactive() -> ApiError {
    ApiError::new(
        ErrorCode::OrgInactive,
        "Organization subscription is not active.",
    )
}

pub fn feature_not_available(feature: Feature) -> ApiError {
    ApiError::new(
        ErrorCode::FeatureNotAvailable,
        "Feature is not enabled for this organization.",
    )
    .with("requiredFeature", feature)
}

pub fn role_access_denied() -> ApiError {
    ApiError::new(
        ErrorCode::RoleAccessDenied,
        "User role is not allowed to perform this action.",
    )
}

pub fn chat_access_denied() -> ApiError {
    ApiError::new(
        ErrorCode::ChatAccessDenied,
        "User is not a participant of this chat.",
    )
}

pub fn validation(msg: impl ToString) -> ApiError {
    ApiError::new(ErrorCode::ValidationFailed, msg)
}

pub fn not_found(what: &str) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("{} doesn't exist.", what))
}

pub fn email_exists_approved() -> ApiError {
    ApiError::new(ErrorCode::EmailExists, "Email already exists and is approved")
}

fn internal() -> ApiError {
    ApiError::new(ErrorCode::Internal, "Internal server error.")
}

impl From<mongodb::error::Error> for ApiError {
    fn from(e: mongodb::error::Error) -> Self {
        tracing::error!("mongodb failure: {}", e);
        internal()
    }
}

impl From<bson::de::Error> for ApiError {
    fn from(e: bson::de::Error) -> Self {
        tracing::error!("bson deserialization failure: {}", e);
        internal()
    }
}

impl From<bson::ser::Error> for ApiError {
    fn from(e: bson::ser::Error) -> Self {
        tracing::error!("bson serialization failure: {}", e);
        internal()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!("json failure: {}", e);
        internal()
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.into_kind() {
            ErrorKind::ExpiredSignature => token_expired(),
            _ => invalid_token(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_expected_statuses() {
        assert_eq!(ErrorCode::TokenMissing.status(), Status::Unauthorized);
        assert_eq!(ErrorCode::TokenExpired.status(), Status::Unauthorized);
        assert_eq!(ErrorCode::OrgInactive.status(), Status::Forbidden);
        assert_eq!(ErrorCode::FeatureNotAvailable.status(), Status::Forbidden);
        assert_eq!(ErrorCode::RoleAccessDenied.status(), Status::Forbidden);
        assert_eq!(ErrorCode::ValidationFailed.status(), Status::BadRequest);
        // Conflict reported as 404 on purpose.
        assert_eq!(ErrorCode::EmailExists.status(), Status::NotFound);
    }

    #[test]
    fn codes_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::FeatureNotAvailable).unwrap(),
            "\"FEATURE_NOT_AVAILABLE\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::TokenMissing).unwrap(),
            "\"TOKEN_MISSING\""
        );
    }

    #[test]
    fn feature_gate_failure_names_the_feature() {
        let err = feature_not_available(Feature::Chat);
        assert_eq!(err.code, ErrorCode::FeatureNotAvailable);
        assert_eq!(
            err.extra.get("requiredFeature"),
            Some(&serde_json::json!("chat"))
        );
    }

    #[test]
    fn expired_jwt_maps_to_token_expired() {
        let e = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::ExpiredSignature,
        );
        assert_eq!(ApiError::from(e).code, ErrorCode::TokenExpired);

        let e =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature);
        assert_eq!(ApiError::from(e).code, ErrorCode::InvalidToken);
    }
}
