use base64::engine::GeneralPurpose;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub fn base64_engine() -> GeneralPurpose {
    base64::engine::GeneralPurpose::new(
        &base64::alphabet::URL_SAFE,
        base64::engine::GeneralPurposeConfig::new(),
    )
}

/// Generates an alphanumeric password for accounts approved by an admin.
pub fn random_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_password_has_requested_length() {
        assert_eq!(random_password(12).len(), 12);
        assert_eq!(random_password(0).len(), 0);
    }

    #[test]
    fn random_passwords_differ() {
        assert_ne!(random_password(16), random_password(16));
    }
}
