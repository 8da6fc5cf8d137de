//! 服务测试共用的内存装配。
//!
//! 端口的测试替身都手写在这里，不依赖 infrastructure 的适配器，
//! 单元测试因此只链接本 crate 自身。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use domain::{
    Chat, ChatId, ChatKind, Message, MessageId, RepositoryError, ScheduledMessage, Timestamp,
    User, UserId,
};

use crate::broadcaster::{BroadcastError, EventBroadcaster, ServerEvent};
use crate::clock::ManualClock;
use crate::locks::ChatLocks;
use crate::repository::{
    ChatRepository, CreateChatOutcome, MessageRepository, ScheduledRepository,
};
use crate::services::{
    ChatService, ChatServiceDependencies, MessageService, MessageServiceDependencies, Scheduler,
    SchedulerDependencies,
};

/// 测试的固定起始时刻。
pub(crate) fn fixed_start() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

/// 创建测试用户。
pub(crate) fn test_user(code: &str, name: &str) -> User {
    User::new(code, name)
}

/// 聊天存储的测试替身。查重与写入同在一次锁内，语义与正式
/// 实现一致。
#[derive(Default)]
pub(crate) struct MemoryChatRepository {
    chats: Mutex<HashMap<ChatId, Chat>>,
}

impl MemoryChatRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRepository for MemoryChatRepository {
    async fn insert(&self, chat: Chat) -> Result<CreateChatOutcome, RepositoryError> {
        let mut chats = self.chats.lock().await;
        if chat.kind == ChatKind::Direct {
            if let Some(existing) = chats
                .values()
                .find(|candidate| candidate.is_direct_with(&chat.members))
            {
                return Ok(CreateChatOutcome::DuplicateDirect(existing.id));
            }
        }
        chats.insert(chat.id, chat.clone());
        Ok(CreateChatOutcome::Created(chat))
    }

    async fn update(&self, chat: Chat) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.lock().await;
        if !chats.contains_key(&chat.id) {
            return Err(RepositoryError::NotFound);
        }
        chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn remove(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.chats.lock().await.remove(&id))
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.chats.lock().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Chat>, RepositoryError> {
        Ok(self.chats.lock().await.values().cloned().collect())
    }

    async fn list_for_member(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
        Ok(self
            .chats
            .lock()
            .await
            .values()
            .filter(|chat| chat.is_member(user_id))
            .cloned()
            .collect())
    }
}

/// 消息历史的测试替身。
#[derive(Default)]
pub(crate) struct MemoryMessageRepository {
    messages: Mutex<Vec<Message>>,
}

impl MemoryMessageRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        self.messages.lock().await.push(message.clone());
        Ok(message)
    }

    async fn history(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().await;
        let mut history: Vec<Message> = messages
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect();
        history.sort_by_key(|message| message.created_at);
        Ok(history)
    }

    async fn find(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .await
            .iter()
            .find(|message| message.chat_id == chat_id && message.id == message_id)
            .cloned())
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let slot = messages
            .iter_mut()
            .find(|candidate| candidate.chat_id == message.chat_id && candidate.id == message.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = message.clone();
        Ok(message)
    }

    async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError> {
        self.messages
            .lock()
            .await
            .retain(|message| message.chat_id != chat_id);
        Ok(())
    }
}

/// 待投递定时条目的测试替身。
#[derive(Default)]
pub(crate) struct MemoryScheduledRepository {
    entries: Mutex<Vec<ScheduledMessage>>,
}

impl MemoryScheduledRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduledRepository for MemoryScheduledRepository {
    async fn insert(&self, entry: ScheduledMessage) -> Result<ScheduledMessage, RepositoryError> {
        self.entries.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn take_due(&self, now: Timestamp) -> Result<Vec<ScheduledMessage>, RepositoryError> {
        let mut entries = self.entries.lock().await;
        let (due, rest): (Vec<ScheduledMessage>, Vec<ScheduledMessage>) =
            entries.drain(..).partition(|entry| entry.is_due(now));
        *entries = rest;
        Ok(due)
    }

    async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .await
            .retain(|entry| entry.chat_id != chat_id);
        Ok(())
    }

    async fn count_pending(&self) -> Result<usize, RepositoryError> {
        Ok(self.entries.lock().await.len())
    }
}

/// 记录每次扇出的广播器，测试据此断言收件人与事件内容。
#[derive(Default)]
pub(crate) struct RecordingBroadcaster {
    sent: Mutex<Vec<(BTreeSet<UserId>, ServerEvent)>>,
}

impl RecordingBroadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn sent(&self) -> Vec<(BTreeSet<UserId>, ServerEvent)> {
        self.sent.lock().await.clone()
    }

    pub(crate) async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl EventBroadcaster for RecordingBroadcaster {
    async fn notify(
        &self,
        recipients: &BTreeSet<UserId>,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        self.sent.lock().await.push((recipients.clone(), event));
        Ok(())
    }
}

/// 组装好的内存后端，各测试从这里取所需的服务。
pub(crate) struct TestBackend {
    pub chat_repository: Arc<MemoryChatRepository>,
    pub message_repository: Arc<MemoryMessageRepository>,
    pub scheduled_repository: Arc<MemoryScheduledRepository>,
    pub clock: Arc<ManualClock>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub chat_locks: Arc<ChatLocks>,
}

impl TestBackend {
    pub(crate) fn new() -> Self {
        Self {
            chat_repository: Arc::new(MemoryChatRepository::new()),
            message_repository: Arc::new(MemoryMessageRepository::new()),
            scheduled_repository: Arc::new(MemoryScheduledRepository::new()),
            clock: Arc::new(ManualClock::new(fixed_start())),
            broadcaster: Arc::new(RecordingBroadcaster::new()),
            chat_locks: Arc::new(ChatLocks::new()),
        }
    }

    pub(crate) fn chat_service(&self) -> ChatService {
        ChatService::new(ChatServiceDependencies {
            chat_repository: self.chat_repository.clone(),
            message_repository: self.message_repository.clone(),
            scheduled_repository: self.scheduled_repository.clone(),
            clock: self.clock.clone(),
            broadcaster: self.broadcaster.clone(),
            chat_locks: self.chat_locks.clone(),
        })
    }

    pub(crate) fn message_service(&self) -> MessageService {
        MessageService::new(MessageServiceDependencies {
            chat_repository: self.chat_repository.clone(),
            message_repository: self.message_repository.clone(),
            clock: self.clock.clone(),
            broadcaster: self.broadcaster.clone(),
            chat_locks: self.chat_locks.clone(),
        })
    }

    pub(crate) fn scheduler(&self) -> Scheduler {
        Scheduler::new(SchedulerDependencies {
            chat_repository: self.chat_repository.clone(),
            message_repository: self.message_repository.clone(),
            scheduled_repository: self.scheduled_repository.clone(),
            clock: self.clock.clone(),
            broadcaster: self.broadcaster.clone(),
            chat_locks: self.chat_locks.clone(),
        })
    }

    /// 直接向存储写入一个聊天，绕过服务层的广播。
    pub(crate) async fn seed_chat(
        &self,
        name: &str,
        kind: ChatKind,
        members: &[&User],
        creator: &User,
    ) -> Chat {
        let member_ids: BTreeSet<UserId> =
            members.iter().map(|user| user.id.clone()).collect();
        let chat = Chat::new(
            ChatId::from(Uuid::new_v4()),
            name,
            kind,
            member_ids,
            creator.id.clone(),
            fixed_start(),
        )
        .unwrap();

        match self.chat_repository.insert(chat).await.unwrap() {
            CreateChatOutcome::Created(chat) => chat,
            CreateChatOutcome::DuplicateDirect(_) => panic!("种子聊天不应命中既有私聊"),
        }
    }
}
