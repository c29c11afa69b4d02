use std::collections::HashSet;
use std::sync::Arc;

use mongodb::Database;
use rocket::futures::{SinkExt, StreamExt};
use rocket::State;
use rocket_ws as ws;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::data::chat::db::ChatDbExt;
use crate::data::chat::Message;
use crate::data::org::Feature;
use crate::live::event::{ClientEvent, MessagePayload, ServerEvent};
use crate::live::hub::ChatHub;
use crate::middleware::tenant::Tenant;
use crate::resp::fail::{self, ApiError};

/// Upgrades to the live chat socket. Auth, tenancy and the feature gate run
/// before the upgrade, so an unauthorized client never holds a socket.
#[get("/socket")]
#[tracing::instrument(skip_all)]
pub async fn chat_socket(
    socket: ws::WebSocket,
    tenant: Tenant,
    db: &State<Database>,
    hub: &State<Arc<ChatHub>>,
) -> Result<ws::Channel<'static>, ApiError> {
    tenant.require_feature(Feature::Chat)?;

    let db = db.inner().clone();
    let hub = hub.inner().clone();
    let org = tenant.org.id;
    let user = tenant.user.id;

    Ok(socket.channel(move |stream| {
        Box::pin(async move {
            run_session(stream, db, hub, org, user).await;
            Ok(())
        })
    }))
}

/// One socket session: reads client event frames, pushes room broadcasts back
/// out, and tears down presence and room membership on close.
async fn run_session(
    mut stream: ws::stream::DuplexStream,
    db: Database,
    hub: Arc<ChatHub>,
    org: Uuid,
    user: Uuid,
) {
    let conn = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let mut joined: HashSet<Uuid> = HashSet::new();
    let mut registered = false;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let frame = match incoming {
                    Some(Ok(ws::Message::Text(text))) => text,
                    Some(Ok(ws::Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("socket read failed for {}: {}", user, e);
                        break;
                    }
                };

                let event = match serde_json::from_str::<ClientEvent>(&frame) {
                    Ok(event) => event,
                    Err(_) => {
                        let e = fail::validation("Unrecognized event frame.");
                        send_event(&mut stream, &ServerEvent::from_error(&e)).await;
                        continue;
                    }
                };

                match handle_event(event, &db, &hub, org, user, conn, &tx, &mut joined, &mut registered).await {
                    Ok(()) => {}
                    Err(e) => send_event(&mut stream, &ServerEvent::from_error(&e)).await,
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(event) => send_event(&mut stream, &event).await,
                    None => break,
                }
            }
        }
    }

    for chat in joined {
        hub.leave(chat, conn).await;
    }
    if registered {
        hub.disconnect(user, conn).await;
    }
}

async fn send_event(stream: &mut ws::stream::DuplexStream, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(text) => {
            if let Err(e) = stream.send(ws::Message::Text(text)).await {
                tracing::debug!("socket write failed: {}", e);
            }
        }
        Err(e) => tracing::error!("unserializable server event: {}", e),
    }
}

/// Checks the caller still is a participant of the chat. Membership can change
/// while a socket is open, so this runs on every join and every send.
async fn require_participant(db: &Database, org: Uuid, chat: Uuid, user: Uuid) -> Result<(), ApiError> {
    let chat = db
        .get_chat(org, chat)
        .await?
        .ok_or_else(fail::chat_access_denied)?;

    if !chat.is_participant(user) {
        return Err(fail::chat_access_denied());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_event(
    event: ClientEvent,
    db: &Database,
    hub: &Arc<ChatHub>,
    org: Uuid,
    user: Uuid,
    conn: Uuid,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    joined: &mut HashSet<Uuid>,
    registered: &mut bool,
) -> Result<(), ApiError> {
    match event {
        ClientEvent::AddUser => {
            if !*registered {
                hub.connect(user).await;
                *registered = true;
            }
            Ok(())
        }
        ClientEvent::JoinChat { chat } => {
            require_participant(db, org, chat, user).await?;
            hub.join(chat, conn, tx.clone()).await;
            joined.insert(chat);
            Ok(())
        }
        ClientEvent::LeaveChat { chat } => {
            hub.leave(chat, conn).await;
            joined.remove(&chat);
            Ok(())
        }
        ClientEvent::SendMsg { chat, text } => {
            if text.is_empty() {
                return Err(fail::validation("Message text can't be empty."));
            }
            require_participant(db, org, chat, user).await?;

            let message = Message::new(chat, user, text);
            db.insert_message(&message).await?;

            hub.broadcast(chat, ServerEvent::MsgRecieve(MessagePayload::from(&message)))
                .await;
            Ok(())
        }
    }
}
