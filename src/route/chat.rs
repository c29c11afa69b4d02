use std::sync::Arc;

use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::chat::db::ChatDbExt;
use crate::data::chat::{Chat, ChatKind, Message, Participant, ParticipantRole};
use crate::data::org::Feature;
use crate::data::user::db::UserDbExt;
use crate::live::event::{MessagePayload, ServerEvent};
use crate::live::hub::ChatHub;
use crate::middleware::paging::PageState;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub user: Uuid,
    pub role: ParticipantRole,
}

impl From<&Participant> for ParticipantResponse {
    fn from(p: &Participant) -> Self {
        ParticipantResponse {
            user: p.user,
            role: p.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: Uuid,
    pub organization: Uuid,
    pub kind: ChatKind,
    pub name: Option<String>,
    pub participants: Vec<ParticipantResponse>,
    pub last_message: Option<Uuid>,
    pub active: bool,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        ChatResponse {
            id: chat.id,
            organization: chat.organization,
            kind: chat.kind,
            name: chat.name,
            participants: chat.participants.iter().map(ParticipantResponse::from).collect(),
            last_message: chat.last_message,
            active: chat.active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChatData {
    pub kind: ChatKind,
    pub name: Option<String>,
    /// Other members; the creator is added implicitly as chat admin.
    pub participants: Vec<Uuid>,
}

/// Loads the chat and verifies the caller is a participant. Outsiders get the
/// same denial whether the chat exists or not.
async fn participant_chat(
    db: &Database,
    tenant: &Tenant,
    id: Uuid,
) -> Result<Chat, ApiError> {
    let chat = db
        .get_chat(tenant.org.id, id)
        .await?
        .ok_or_else(fail::chat_access_denied)?;

    if !chat.is_participant(tenant.user.id) {
        return Err(fail::chat_access_denied());
    }
    Ok(chat)
}

/// Creates a chat. A direct chat names exactly one other member and is
/// deduplicated: asking for the same pair again returns the existing chat.
#[post("/", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn chat_create(
    create: Json<CreateChatData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ChatResponse>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    let create = create.into_inner();

    let others: Vec<Uuid> = create
        .participants
        .iter()
        .copied()
        .filter(|id| *id != tenant.user.id)
        .collect();
    if others.is_empty() {
        return Err(fail::validation("A chat needs at least one other member."));
    }

    for member in &others {
        db.find_user_in_org(tenant.org.id, *member)
            .await?
            .ok_or_else(|| fail::not_found("User"))?;
    }

    match create.kind {
        ChatKind::Direct => {
            if others.len() != 1 {
                return Err(fail::validation(
                    "A direct chat has exactly two participants.",
                ));
            }
            let other = others[0];

            if let Some(existing) = db
                .find_direct_chat(tenant.org.id, tenant.user.id, other)
                .await?
            {
                return Ok(Json(ChatResponse::from(existing)));
            }

            let chat = Chat::new(
                tenant.org.id,
                ChatKind::Direct,
                None,
                vec![
                    Participant::new(tenant.user.id, ParticipantRole::Admin),
                    Participant::new(other, ParticipantRole::Member),
                ],
            );
            db.insert_chat(&chat).await?;
            Ok(Json(ChatResponse::from(chat)))
        }
        ChatKind::Group => {
            let name = match create.name {
                Some(name) if !name.is_empty() => name,
                _ => return Err(fail::validation("A group chat needs a name.")),
            };

            let mut participants = vec![Participant::new(tenant.user.id, ParticipantRole::Admin)];
            participants.extend(
                others
                    .into_iter()
                    .map(|user| Participant::new(user, ParticipantRole::Member)),
            );

            let chat = Chat::new(tenant.org.id, ChatKind::Group, Some(name), participants);
            db.insert_chat(&chat).await?;
            Ok(Json(ChatResponse::from(chat)))
        }
    }
}

#[get("/")]
#[tracing::instrument(skip_all)]
pub async fn chat_list(
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<Vec<ChatResponse>>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    let chats = db.list_chats_for(tenant.org.id, tenant.user.id).await?;
    Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
}

#[get("/<id>")]
#[tracing::instrument(skip_all)]
pub async fn chat_get(
    id: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ChatResponse>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    let chat = participant_chat(db, &tenant, id).await?;
    Ok(Json(ChatResponse::from(chat)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddParticipantData {
    pub user: Uuid,
}

/// Adds a member to a group chat; chat admins only. Adding someone already in
/// the chat is a no-op returning the current state.
#[post("/<id>/participants", format = "application/json", data = "<add>")]
#[tracing::instrument(skip_all)]
pub async fn chat_add_participant(
    id: Uuid,
    add: Json<AddParticipantData>,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ChatResponse>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    let chat = participant_chat(db, &tenant, id).await?;
    if chat.kind != ChatKind::Group {
        return Err(fail::validation("Direct chats have a fixed member pair."));
    }
    if !chat.is_chat_admin(tenant.user.id) {
        return Err(fail::chat_access_denied());
    }

    db.find_user_in_org(tenant.org.id, add.user)
        .await?
        .ok_or_else(|| fail::not_found("User"))?;

    let participant = Participant::new(add.user, ParticipantRole::Member);
    let updated = db
        .add_participant(tenant.org.id, id, &participant)
        .await?
        // Filter misses when the user is already a member; report as-is.
        .unwrap_or(chat);

    Ok(Json(ChatResponse::from(updated)))
}

/// Removes a member. Anyone may remove themselves (leave); removing someone
/// else takes chat admin. A chat emptied this way is deactivated.
#[delete("/<id>/participants/<user>")]
#[tracing::instrument(skip_all)]
pub async fn chat_remove_participant(
    id: Uuid,
    user: Uuid,
    tenant: Tenant,
    db: &State<Database>,
) -> Result<Json<ChatResponse>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    let chat = participant_chat(db, &tenant, id).await?;
    if user != tenant.user.id && !chat.is_chat_admin(tenant.user.id) {
        return Err(fail::chat_access_denied());
    }
    if !chat.is_participant(user) {
        return Err(fail::not_found("Participant"));
    }

    let updated = db
        .remove_participant(tenant.org.id, id, user)
        .await?
        .ok_or_else(|| fail::not_found("Chat"))?;

    Ok(Json(ChatResponse::from(updated)))
}

#[get("/<id>/messages")]
#[tracing::instrument(skip_all)]
pub async fn message_list(
    id: Uuid,
    tenant: Tenant,
    page: PageState,
    db: &State<Database>,
) -> Result<Json<Vec<MessagePayload>>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    participant_chat(db, &tenant, id).await?;

    let messages = db.list_messages(id, page).await?;
    Ok(Json(messages.iter().map(MessagePayload::from).collect()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageData {
    pub text: String,
}

/// REST send path; the message also fans out to live socket subscribers so
/// both transports observe the same stream.
#[post("/<id>/messages", format = "application/json", data = "<send>")]
#[tracing::instrument(skip_all)]
pub async fn message_send(
    id: Uuid,
    send: Json<SendMessageData>,
    tenant: Tenant,
    db: &State<Database>,
    hub: &State<Arc<ChatHub>>,
) -> Result<Json<MessagePayload>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    if send.text.is_empty() {
        return Err(fail::validation("Message text can't be empty."));
    }

    participant_chat(db, &tenant, id).await?;

    let message = Message::new(id, tenant.user.id, &send.text);
    db.insert_message(&message).await?;

    let payload = MessagePayload::from(&message);
    hub.broadcast(id, ServerEvent::MsgRecieve(payload.clone()))
        .await;

    Ok(Json(payload))
}
