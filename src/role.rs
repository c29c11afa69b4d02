use serde::{Deserialize, Serialize};

/// Account role within an organization.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Parent,
    Teacher,
    Admin,
}

impl Role {
    /// Roles allowed to manage classes, subjects, exams and homework.
    pub const STAFF: &'static [Role] = &[Role::Admin, Role::Teacher];
    /// Roles allowed to manage users and organization settings.
    pub const ADMIN_ONLY: &'static [Role] = &[Role::Admin];

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl std::default::Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Parent => write!(f, "parent"),
            Role::Teacher => write!(f, "teacher"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Parent).unwrap(), "\"parent\"");
    }

    #[test]
    fn staff_list_excludes_students() {
        assert!(Role::STAFF.contains(&Role::Teacher));
        assert!(!Role::STAFF.contains(&Role::Student));
        assert!(!Role::STAFF.contains(&Role::Parent));
    }
}
