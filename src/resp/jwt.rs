use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::user::User;
use crate::resp::fail::ApiError;
use crate::role::Role;
use crate::security::Security;

/// Custom request header carrying the auth token. The frontend sends `token`
/// rather than a standard `Authorization` header.
pub static TOKEN_HEADER: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    #[serde(with = "jwt_numeric_date")]
    iat: DateTime<Utc>,
    #[serde(with = "jwt_numeric_date")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub role: Role,
}

impl AuthClaims {
    pub fn new(user: &User) -> AuthClaims {
        let now = Utc::now();
        AuthClaims {
            iat: now,
            exp: now + Duration::weeks(1),
            user: user.id,
            role: user.role,
        }
    }

    pub fn encode(&self, security: &Security) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), &self, &security.jwt_encoding)
    }

    /// Verifies signature and expiry; failures map onto
    /// `TOKEN_EXPIRED`/`INVALID_TOKEN`.
    pub fn decode(token: &str, security: &Security) -> Result<AuthClaims, ApiError> {
        let claims = decode::<AuthClaims>(
            token,
            &security.jwt_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)?;

        tracing::debug!("decoded auth claims for user: {}", claims.user);
        Ok(claims)
    }
}

mod jwt_numeric_date {
    //! Serialization of DateTime<Utc> to the JWT "Numeric Date" format
    //! (RFC 7519 section 2).
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(date.timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Utc.timestamp_opt(i64::deserialize(deserializer)?, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("Invalid Unix timestamp value."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::fail::ErrorCode;
    use chrono::SubsecRound;

    fn test_security() -> Security {
        use jsonwebtoken::{DecodingKey, EncodingKey};

        Security {
            salt: [0u8; 16],
            jwt_encoding: EncodingKey::from_secret(b"test-secret"),
            jwt_decoding: DecodingKey::from_secret(b"test-secret"),
        }
    }

    #[test]
    fn jwt_roundtrips() {
        let now = Utc::now().round_subsecs(0);
        let user = Uuid::new_v4();

        let claims = AuthClaims {
            iat: now,
            exp: now + Duration::weeks(1),
            user,
            role: Role::Teacher,
        };

        let security = test_security();
        let token = claims
            .encode(&security)
            .expect("encoding should work for example");

        let decoded = AuthClaims::decode(&token, &security).expect("token should decode");

        assert_eq!(now, decoded.iat);
        assert_eq!(now + Duration::weeks(1), decoded.exp);
        assert_eq!(user, decoded.user);
        assert_eq!(decoded.role, Role::Teacher);
    }

    #[test]
    fn expired_jwt_is_rejected() {
        let past = Utc::now() - Duration::weeks(2);
        let claims = AuthClaims {
            iat: past,
            exp: past + Duration::weeks(1),
            user: Uuid::new_v4(),
            role: Role::Student,
        };

        let security = test_security();
        let token = claims.encode(&security).unwrap();

        let err = AuthClaims::decode(&token, &security).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn garbage_jwt_is_rejected() {
        let err = AuthClaims::decode("not.a.token", &test_security()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }
}
