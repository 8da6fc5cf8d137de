//! 存储端口的内存实现。
//!
//! 集合都在进程内的 RwLock 后面。需要跨多个判定保持一致的写
//! 操作在同一把写锁内完成，例如私聊查重与写入。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use application::repository::{
    ChatRepository, CreateChatOutcome, MessageRepository, ScheduledRepository,
};
use domain::{
    Chat, ChatId, ChatKind, Message, MessageId, RepositoryError, ScheduledMessage, Timestamp,
    UserId,
};

/// 聊天集合的内存存储。
#[derive(Default)]
pub struct InMemoryChatRepository {
    chats: RwLock<HashMap<ChatId, Chat>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_chats(chats: &mut [Chat]) {
    chats.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn insert(&self, chat: Chat) -> Result<CreateChatOutcome, RepositoryError> {
        let mut chats = self.chats.write().await;

        // 查重与写入在同一把写锁内，并发创建同一对成员不会产生重复私聊
        if chat.kind == ChatKind::Direct {
            if let Some(existing) = chats
                .values()
                .find(|candidate| candidate.is_direct_with(&chat.members))
            {
                return Ok(CreateChatOutcome::DuplicateDirect(existing.id));
            }
        }

        if chats.contains_key(&chat.id) {
            return Err(RepositoryError::Conflict);
        }
        chats.insert(chat.id, chat.clone());
        Ok(CreateChatOutcome::Created(chat))
    }

    async fn update(&self, chat: Chat) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.write().await;
        match chats.get_mut(&chat.id) {
            Some(slot) => {
                *slot = chat.clone();
                Ok(chat)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn remove(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.chats.write().await.remove(&id))
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.chats.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Chat>, RepositoryError> {
        let chats = self.chats.read().await;
        let mut all: Vec<Chat> = chats.values().cloned().collect();
        sort_chats(&mut all);
        Ok(all)
    }

    async fn list_for_member(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
        let chats = self.chats.read().await;
        let mut visible: Vec<Chat> = chats
            .values()
            .filter(|chat| chat.is_member(user_id))
            .cloned()
            .collect();
        sort_chats(&mut visible);
        Ok(visible)
    }
}

/// 按聊天分桶的消息历史存储，桶内保持追加顺序。
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<HashMap<ChatId, Vec<Message>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        messages
            .entry(message.chat_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn history(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        let mut history = messages.get(&chat_id).cloned().unwrap_or_default();
        // 追加已按时间入桶，稳定排序只兜住时钟回拨的罕见情形
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(history)
    }

    async fn find(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(&chat_id)
            .and_then(|bucket| bucket.iter().find(|message| message.id == message_id))
            .cloned())
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        let bucket = messages
            .get_mut(&message.chat_id)
            .ok_or(RepositoryError::NotFound)?;
        let slot = bucket
            .iter_mut()
            .find(|candidate| candidate.id == message.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = message.clone();
        Ok(message)
    }

    async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError> {
        self.messages.write().await.remove(&chat_id);
        Ok(())
    }
}

/// 待投递定时条目的内存存储。
#[derive(Default)]
pub struct InMemoryScheduledRepository {
    entries: RwLock<Vec<ScheduledMessage>>,
}

impl InMemoryScheduledRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduledRepository for InMemoryScheduledRepository {
    async fn insert(&self, entry: ScheduledMessage) -> Result<ScheduledMessage, RepositoryError> {
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn take_due(&self, now: Timestamp) -> Result<Vec<ScheduledMessage>, RepositoryError> {
        let mut entries = self.entries.write().await;
        let due: Vec<ScheduledMessage> = entries
            .iter()
            .filter(|entry| entry.is_due(now))
            .cloned()
            .collect();
        entries.retain(|entry| !entry.is_due(now));
        Ok(due)
    }

    async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError> {
        self.entries.write().await.retain(|entry| entry.chat_id != chat_id);
        Ok(())
    }

    async fn count_pending(&self) -> Result<usize, RepositoryError> {
        Ok(self.entries.read().await.len())
    }
}
