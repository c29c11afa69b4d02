use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

pub static ORG_COLLECTION_NAME: &str = "organization";

/// Capability unlocked by a subscription tier. Routes behind a feature gate
/// name one of these.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Basic,
    Attendance,
    Exams,
    Homework,
    Tasks,
    Chat,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::Basic => write!(f, "basic"),
            Feature::Attendance => write!(f, "attendance"),
            Feature::Exams => write!(f, "exams"),
            Feature::Homework => write!(f, "homework"),
            Feature::Tasks => write!(f, "tasks"),
            Feature::Chat => write!(f, "chat"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    HighSchool,
    University,
}

impl Tier {
    /// Fixed tier lookup table; a tier change re-applies these defaults.
    pub fn features(self) -> Vec<Feature> {
        use Feature::*;

        match self {
            Tier::Primary => vec![Basic, Attendance],
            Tier::HighSchool => vec![Basic, Attendance, Exams, Homework, Tasks],
            Tier::University => vec![Basic, Attendance, Exams, Homework, Tasks, Chat],
        }
    }

    pub fn max_users(self) -> u32 {
        match self {
            Tier::Primary => 100,
            Tier::HighSchool => 500,
            Tier::University => 2000,
        }
    }

    /// Monthly price in cents. Signup skips the payment charge when this is 0.
    pub fn price_cents(self) -> u32 {
        match self {
            Tier::Primary => 0,
            Tier::HighSchool => 4900,
            Tier::University => 9900,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Trial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub name: String,
    /// Unique, always lowercase. Users are attached to an organization by the
    /// domain of their email address.
    pub domain: String,
    pub tier: Tier,
    pub subscription_status: SubscriptionStatus,
    pub max_users: u32,
    pub features: Vec<Feature>,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl ToString, domain: impl AsRef<str>, tier: Tier) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.as_ref().to_lowercase(),
            tier,
            subscription_status: SubscriptionStatus::Active,
            max_users: tier.max_users(),
            features: tier.features(),
            created: Utc::now(),
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn is_active(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Active
    }
}

/// Lowercased domain part of an email address, if it has one.
pub fn domain_of_email(email: &str) -> Option<String> {
    let (_, domain) = email.rsplit_once('@')?;
    if domain.is_empty() {
        return None;
    }
    Some(domain.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_tier_has_no_chat() {
        let features = Tier::Primary.features();
        assert_eq!(features, vec![Feature::Basic, Feature::Attendance]);
        assert!(!features.contains(&Feature::Chat));
    }

    #[test]
    fn university_tier_unlocks_chat() {
        assert!(Tier::University.features().contains(&Feature::Chat));
        assert!(Tier::HighSchool.features().contains(&Feature::Tasks));
        assert!(!Tier::HighSchool.features().contains(&Feature::Chat));
    }

    #[test]
    fn only_primary_is_free() {
        assert_eq!(Tier::Primary.price_cents(), 0);
        assert!(Tier::HighSchool.price_cents() > 0);
        assert!(Tier::University.price_cents() > Tier::HighSchool.price_cents());
    }

    #[test]
    fn new_org_applies_tier_defaults() {
        let org = Organization::new("Acme", "ACME.edu", Tier::Primary);
        assert_eq!(org.domain, "acme.edu");
        assert_eq!(org.max_users, 100);
        assert_eq!(org.features, Tier::Primary.features());
        assert!(org.is_active());
    }

    #[test]
    fn email_domain_extraction() {
        assert_eq!(
            domain_of_email("staff@Acme.EDU"),
            Some("acme.edu".to_string())
        );
        assert_eq!(domain_of_email("not-an-email"), None);
        assert_eq!(domain_of_email("trailing@"), None);
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Tier::HighSchool).unwrap(),
            "\"high_school\""
        );
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Trial).unwrap(),
            "\"trial\""
        );
    }
}
