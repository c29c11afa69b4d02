use std::env;

use base64::Engine;

use crate::error::ConfigurationError;
use crate::util;

/// Server-wide salt mixed into every password hash.
pub type Salt = [u8; 16];

/// Outbound mail relay settings. All-or-nothing: mail is disabled unless the
/// full set of SMTP variables is present.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub jwt_secret: String,
    pub password_salt: Salt,

    pub stripe_webhook_secret: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

fn required(name: &'static str) -> Result<String, ConfigurationError> {
    env::var(name).map_err(|_| ConfigurationError::MissingVar(name))
}

fn decode_salt(value: &str) -> Result<Salt, ConfigurationError> {
    let bytes = util::base64_engine()
        .decode(value)
        .map_err(|e| ConfigurationError::InvalidVar("PASSWORD_SALT", e.to_string()))?;

    bytes.try_into().map_err(|_| {
        ConfigurationError::InvalidVar(
            "PASSWORD_SALT",
            "must decode to exactly 16 bytes".to_string(),
        )
    })
}

impl Config {
    /// Loads configuration from the process environment. The caller is
    /// expected to exit when this fails; there is no file-based fallback.
    pub fn from_env() -> Result<Config, ConfigurationError> {
        let smtp = match (
            env::var("SMTP_HOST"),
            env::var("SMTP_USERNAME"),
            env::var("SMTP_PASSWORD"),
            env::var("SMTP_FROM"),
        ) {
            (Ok(host), Ok(username), Ok(password), Ok(from)) => Some(SmtpConfig {
                host,
                username,
                password,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_db: env::var("MONGODB_DB_NAME").unwrap_or("campus".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            password_salt: decode_salt(&required("PASSWORD_SALT")?)?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
            smtp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salt_roundtrips_through_base64() {
        let salt: Salt = [7u8; 16];
        let encoded = util::base64_engine().encode(salt);
        assert_eq!(decode_salt(&encoded).unwrap(), salt);
    }

    #[test]
    fn short_salt_is_rejected() {
        let encoded = util::base64_engine().encode([1u8; 4]);
        assert!(decode_salt(&encoded).is_err());
    }

    #[test]
    fn garbage_salt_is_rejected() {
        assert!(decode_salt("not base64 at all!").is_err());
    }
}
