use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

pub static CHAT_COLLECTION_NAME: &str = "chat";
pub static MESSAGE_COLLECTION_NAME: &str = "chat.message";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Direct,
    Group,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user: Uuid,
    pub role: ParticipantRole,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub joined: DateTime<Utc>,
}

impl Participant {
    pub fn new(user: Uuid, role: ParticipantRole) -> Participant {
        Participant {
            user,
            role,
            joined: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub organization: Uuid,
    pub kind: ChatKind,
    #[serde(default)]
    pub name: Option<String>,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub last_message: Option<Uuid>,
    /// A chat emptied of participants is deactivated, never deleted.
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Chat {
    pub fn new(
        organization: Uuid,
        kind: ChatKind,
        name: Option<String>,
        participants: Vec<Participant>,
    ) -> Chat {
        Chat {
            id: Uuid::new_v4(),
            organization,
            kind,
            name,
            participants,
            last_message: None,
            active: true,
            created: Utc::now(),
        }
    }

    pub fn participant(&self, user: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user == user)
    }

    pub fn is_participant(&self, user: Uuid) -> bool {
        self.participant(user).is_some()
    }

    pub fn is_chat_admin(&self, user: Uuid) -> bool {
        self.participant(user)
            .map(|p| p.role == ParticipantRole::Admin)
            .unwrap_or(false)
    }

    /// Exact participant-set match, used to recognize a duplicate direct
    /// chat regardless of participant order.
    pub fn has_exact_participants(&self, users: &[Uuid]) -> bool {
        self.participants.len() == users.len()
            && users.iter().all(|u| self.is_participant(*u))
    }
}

/// Messages are immutable and totally ordered within a chat by `created`
/// (millisecond precision; same-millisecond writers have no tie-break).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub chat: Uuid,
    pub sender: Uuid,
    pub body: String,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl Message {
    pub fn new(chat: Uuid, sender: Uuid, body: impl ToString) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat,
            sender,
            body: body.to_string(),
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_with(users: &[Uuid]) -> Chat {
        let participants = users
            .iter()
            .enumerate()
            .map(|(i, u)| {
                Participant::new(
                    *u,
                    if i == 0 {
                        ParticipantRole::Admin
                    } else {
                        ParticipantRole::Member
                    },
                )
            })
            .collect();
        Chat::new(Uuid::new_v4(), ChatKind::Direct, None, participants)
    }

    #[test]
    fn exact_participant_match_ignores_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let chat = chat_with(&[a, b]);

        assert!(chat.has_exact_participants(&[b, a]));
        assert!(!chat.has_exact_participants(&[a]));
        assert!(!chat.has_exact_participants(&[a, b, Uuid::new_v4()]));
    }

    #[test]
    fn only_first_participant_is_chat_admin() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let chat = chat_with(&[a, b]);

        assert!(chat.is_chat_admin(a));
        assert!(!chat.is_chat_admin(b));
        assert!(!chat.is_chat_admin(Uuid::new_v4()));
    }
}
