use bson::doc;
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use super::{Chat, Message, Participant, CHAT_COLLECTION_NAME, MESSAGE_COLLECTION_NAME};
use crate::data::{by_id, drain_cursor, in_org};
use crate::middleware::paging::PageState;
use crate::resp::fail::ApiError;

pub trait ChatDbExt {
    async fn insert_chat(&self, chat: &Chat) -> Result<(), ApiError>;

    async fn get_chat(&self, org: Uuid, id: Uuid) -> Result<Option<Chat>, ApiError>;

    /// Existing direct chat between exactly this participant pair, if any.
    async fn find_direct_chat(&self, org: Uuid, a: Uuid, b: Uuid)
        -> Result<Option<Chat>, ApiError>;

    async fn list_chats_for(&self, org: Uuid, user: Uuid) -> Result<Vec<Chat>, ApiError>;

    async fn add_participant(
        &self,
        org: Uuid,
        chat: Uuid,
        participant: &Participant,
    ) -> Result<Option<Chat>, ApiError>;

    /// Pulls the user; a chat left without participants is marked inactive.
    async fn remove_participant(
        &self,
        org: Uuid,
        chat: Uuid,
        user: Uuid,
    ) -> Result<Option<Chat>, ApiError>;

    /// Persists the message and moves the chat's `last_message` pointer.
    async fn insert_message(&self, message: &Message) -> Result<(), ApiError>;

    async fn list_messages(&self, chat: Uuid, page: PageState) -> Result<Vec<Message>, ApiError>;
}

impl ChatDbExt for Database {
    async fn insert_chat(&self, chat: &Chat) -> Result<(), ApiError> {
        self.collection::<Chat>(CHAT_COLLECTION_NAME)
            .insert_one(chat, None)
            .await?;
        Ok(())
    }

    async fn get_chat(&self, org: Uuid, id: Uuid) -> Result<Option<Chat>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(id));

        self.collection(CHAT_COLLECTION_NAME)
            .find_one(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn find_direct_chat(
        &self,
        org: Uuid,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<Chat>, ApiError> {
        let mut filter = in_org(org);
        filter.insert("kind", "direct");
        filter.insert("participants", doc! { "$size": 2 });
        filter.insert(
            "participants.user",
            doc! { "$all": [a.to_string(), b.to_string()] },
        );

        self.collection(CHAT_COLLECTION_NAME)
            .find_one(filter, None)
            .await
            .map_err(ApiError::from)
    }

    async fn list_chats_for(&self, org: Uuid, user: Uuid) -> Result<Vec<Chat>, ApiError> {
        let mut filter = in_org(org);
        filter.insert("participants.user", user.to_string());
        filter.insert("active", true);

        let cursor = self
            .collection(CHAT_COLLECTION_NAME)
            .find(
                filter,
                FindOptions::builder().sort(doc! { "created": -1 }).build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }

    async fn add_participant(
        &self,
        org: Uuid,
        chat: Uuid,
        participant: &Participant,
    ) -> Result<Option<Chat>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(chat));
        // Guard against adding the same user twice.
        filter.insert(
            "participants.user",
            doc! { "$ne": participant.user.to_string() },
        );

        self.collection(CHAT_COLLECTION_NAME)
            .find_one_and_update(
                filter,
                doc! { "$push": { "participants": bson::to_bson(participant)? } },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(ApiError::from)
    }

    async fn remove_participant(
        &self,
        org: Uuid,
        chat: Uuid,
        user: Uuid,
    ) -> Result<Option<Chat>, ApiError> {
        let mut filter = in_org(org);
        filter.extend(by_id(chat));

        let updated: Option<Chat> = self
            .collection(CHAT_COLLECTION_NAME)
            .find_one_and_update(
                filter,
                doc! { "$pull": { "participants": { "user": user.to_string() } } },
                mongodb::options::FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;

        if let Some(chat) = &updated {
            if chat.participants.is_empty() && chat.active {
                self.collection::<Chat>(CHAT_COLLECTION_NAME)
                    .update_one(by_id(chat.id), doc! { "$set": { "active": false } }, None)
                    .await?;
            }
        }

        Ok(updated)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), ApiError> {
        self.collection::<Message>(MESSAGE_COLLECTION_NAME)
            .insert_one(message, None)
            .await?;

        self.collection::<Chat>(CHAT_COLLECTION_NAME)
            .update_one(
                by_id(message.chat),
                doc! { "$set": { "last_message": message.id.to_string() } },
                None,
            )
            .await?;

        Ok(())
    }

    async fn list_messages(&self, chat: Uuid, page: PageState) -> Result<Vec<Message>, ApiError> {
        let cursor = self
            .collection(MESSAGE_COLLECTION_NAME)
            .find(
                doc! { "chat": chat.to_string() },
                FindOptions::builder()
                    .sort(doc! { "created": 1 })
                    .skip(page.skip())
                    .limit(page.limit())
                    .build(),
            )
            .await?;

        Ok(drain_cursor(cursor).await)
    }
}
