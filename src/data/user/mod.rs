use chrono::{DateTime, Utc};
use crypto::bcrypt::bcrypt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub mod db;

use crate::config::Salt;
use crate::role::Role;

pub static USER_COLLECTION_NAME: &str = "user";

/// Password digest: SHA-256 pre-hash fed through bcrypt with the server salt.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PasswordHash([u8; 24]);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>, salt: &Salt) -> PasswordHash {
        let mut pw_hash: [u8; 24] = [0; 24];

        let mut sha = Sha256::new();
        sha2::Digest::update(&mut sha, password.as_ref().as_bytes());

        bcrypt(10, salt, sha.finalize().as_slice(), &mut pw_hash);

        PasswordHash(pw_hash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub pw_hash: PasswordHash,
    pub role: Role,
    /// Set by an admin; unapproved accounts can't log in or pass the auth
    /// guard.
    #[serde(default)]
    pub approved: bool,
    pub organization: Option<Uuid>,
    #[serde(default)]
    pub class: Option<Uuid>,
    #[serde(default)]
    pub subject: Option<Uuid>,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl ToString,
        username: impl ToString,
        password: impl AsRef<str>,
        salt: &Salt,
        organization: Option<Uuid>,
    ) -> User {
        let id = Uuid::new_v4();
        tracing::info!("Creating a new user with UUID: {}", id);

        User {
            id,
            email: email.to_string(),
            username: username.to_string(),
            pw_hash: PasswordHash::new(password, salt),
            role: Role::default(),
            approved: false,
            organization,
            class: None,
            subject: None,
            created: Utc::now(),
        }
    }
}

/// User payload returned to clients; never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub approved: bool,
    pub organization: Option<Uuid>,
    pub class: Option<Uuid>,
    pub subject: Option<Uuid>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
            approved: user.approved,
            organization: user.organization,
            class: user.class,
            subject: user.subject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_omits_password_hash() {
        let user = User::new("a@acme.edu", "alice", "secret-pw", &[1u8; 16], None);
        let value = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(value.get("pw_hash").is_none());
        assert_eq!(value["username"], "alice");
    }

    #[test]
    fn same_password_same_salt_matches() {
        let salt = [9u8; 16];
        assert_eq!(
            PasswordHash::new("hunter22", &salt),
            PasswordHash::new("hunter22", &salt)
        );
        assert_ne!(
            PasswordHash::new("hunter22", &salt),
            PasswordHash::new("hunter23", &salt)
        );
    }

    #[test]
    fn new_users_start_unapproved_as_students() {
        let user = User::new("b@acme.edu", "bob", "pw", &[0u8; 16], None);
        assert!(!user.approved);
        assert_eq!(user.role, Role::Student);
    }
}
