use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::event::ServerEvent;

pub type ConnId = Uuid;
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Owned, injected presence and room-fanout service for the chat socket.
/// Rooms are keyed by chat id; each connection registers an outbound channel
/// per room it joins. Managed as Rocket state rather than process globals so
/// it can be constructed per test.
#[derive(Default)]
pub struct ChatHub {
    rooms: RwLock<HashMap<Uuid, HashMap<ConnId, EventSender>>>,
    online: RwLock<HashMap<Uuid, usize>>,
}

impl ChatHub {
    pub fn new() -> ChatHub {
        ChatHub::default()
    }

    /// Marks a user's connection online. Counted, since one user may hold
    /// several sockets.
    pub async fn connect(&self, user: Uuid) {
        *self.online.write().await.entry(user).or_insert(0) += 1;
    }

    /// Drops the connection from presence and from every joined room.
    pub async fn disconnect(&self, user: Uuid, conn: ConnId) {
        {
            let mut online = self.online.write().await;
            if let Some(count) = online.get_mut(&user) {
                *count -= 1;
                if *count == 0 {
                    online.remove(&user);
                }
            }
        }

        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    pub async fn join(&self, chat: Uuid, conn: ConnId, sender: EventSender) {
        self.rooms
            .write()
            .await
            .entry(chat)
            .or_default()
            .insert(conn, sender);
    }

    pub async fn leave(&self, chat: Uuid, conn: ConnId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(&chat) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(&chat);
            }
        }
    }

    /// Fans an event out to every connection joined to the chat's room.
    /// Closed receivers are skipped; they get cleaned up on disconnect.
    pub async fn broadcast(&self, chat: Uuid, event: ServerEvent) {
        if let Some(members) = self.rooms.read().await.get(&chat) {
            for sender in members.values() {
                let _ = sender.send(event.clone());
            }
        }
    }

    pub async fn is_online(&self, user: Uuid) -> bool {
        self.online.read().await.contains_key(&user)
    }

    pub async fn room_size(&self, chat: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .get(&chat)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chat::Message;
    use crate::live::event::MessagePayload;

    fn message_event(chat: Uuid) -> ServerEvent {
        let message = Message::new(chat, Uuid::new_v4(), "hello room");
        ServerEvent::MsgRecieve(MessagePayload::from(&message))
    }

    #[rocket::async_test]
    async fn broadcast_reaches_joined_connections_only() {
        let hub = ChatHub::new();
        let chat = Uuid::new_v4();
        let other_chat = Uuid::new_v4();

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        hub.join(chat, Uuid::new_v4(), tx_a).await;
        hub.join(other_chat, Uuid::new_v4(), tx_b).await;

        hub.broadcast(chat, message_event(chat)).await;

        assert!(matches!(
            rx_a.try_recv(),
            Ok(ServerEvent::MsgRecieve(_))
        ));
        assert!(rx_b.try_recv().is_err(), "other room must not receive");
    }

    #[rocket::async_test]
    async fn leaving_a_room_stops_delivery() {
        let hub = ChatHub::new();
        let chat = Uuid::new_v4();
        let conn = Uuid::new_v4();

        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.join(chat, conn, tx).await;
        assert_eq!(hub.room_size(chat).await, 1);

        hub.leave(chat, conn).await;
        assert_eq!(hub.room_size(chat).await, 0);

        hub.broadcast(chat, message_event(chat)).await;
        assert!(rx.try_recv().is_err());
    }

    #[rocket::async_test]
    async fn presence_counts_multiple_sockets_per_user() {
        let hub = ChatHub::new();
        let user = Uuid::new_v4();
        let (conn_a, conn_b) = (Uuid::new_v4(), Uuid::new_v4());

        hub.connect(user).await;
        hub.connect(user).await;
        assert!(hub.is_online(user).await);

        hub.disconnect(user, conn_a).await;
        assert!(hub.is_online(user).await, "second socket still open");

        hub.disconnect(user, conn_b).await;
        assert!(!hub.is_online(user).await);
    }

    #[rocket::async_test]
    async fn disconnect_removes_connection_from_rooms() {
        let hub = ChatHub::new();
        let user = Uuid::new_v4();
        let conn = Uuid::new_v4();
        let chat = Uuid::new_v4();

        let (tx, _rx) = mpsc::unbounded_channel();
        hub.connect(user).await;
        hub.join(chat, conn, tx).await;

        hub.disconnect(user, conn).await;
        assert_eq!(hub.room_size(chat).await, 0);
    }
}
