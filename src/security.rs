use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::config::{Config, Salt};

/// Key material shared by the auth path: HS256 signing keys derived from
/// `JWT_SECRET` and the server-wide password salt.
#[derive(Clone)]
pub struct Security {
    pub salt: Salt,
    pub jwt_encoding: EncodingKey,
    pub jwt_decoding: DecodingKey,
}

impl Security {
    pub fn from_config(config: &Config) -> Security {
        tracing::info!("Loading JWT signing keys...");

        Security {
            salt: config.password_salt,
            jwt_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            jwt_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security").finish_non_exhaustive()
    }
}
