//! 聊天生命周期服务。

use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use domain::{Chat, ChatId, ChatKind, DomainError, UserId};

use crate::broadcaster::{EventBroadcaster, ServerEvent};
use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::locks::ChatLocks;
use crate::repository::{ChatRepository, CreateChatOutcome, MessageRepository, ScheduledRepository};

/// 创建聊天请求。
#[derive(Debug, Clone)]
pub struct CreateChatRequest {
    pub actor: UserId,
    pub name: String,
    pub kind: ChatKind,
    pub members: Vec<UserId>,
}

/// 重命名聊天请求。
#[derive(Debug, Clone)]
pub struct RenameChatRequest {
    pub chat_id: ChatId,
    pub new_name: String,
}

/// 删除聊天请求。
#[derive(Debug, Clone)]
pub struct DeleteChatRequest {
    pub chat_id: ChatId,
}

/// create_chat 的两种结束方式：新建成功，或命中已有私聊。
/// 命中不是错误，调用方应给发起者一个指向既有聊天的提示。
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCreation {
    Created(Chat),
    Exists(ChatId),
}

/// ChatService 的依赖集合。
pub struct ChatServiceDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub scheduled_repository: Arc<dyn ScheduledRepository>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub chat_locks: Arc<ChatLocks>,
}

/// 聊天的创建、重命名、删除，以及成员聊天列表快照的下发。
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建聊天。发起者不在成员列表时自动补入；私聊按无序成员对
    /// 去重，命中时返回 [`ChatCreation::Exists`]。
    pub async fn create_chat(
        &self,
        request: CreateChatRequest,
    ) -> Result<ChatCreation, ApplicationError> {
        let mut members: BTreeSet<UserId> = request.members.into_iter().collect();
        members.insert(request.actor.clone());

        let chat = Chat::new(
            ChatId::from(Uuid::new_v4()),
            request.name,
            request.kind,
            members,
            request.actor,
            self.deps.clock.now(),
        )?;

        match self.deps.chat_repository.insert(chat).await? {
            CreateChatOutcome::Created(chat) => {
                tracing::info!(chat_id = %chat.id, kind = ?chat.kind, "聊天已创建");
                self.refresh_chat_lists(&chat.members).await?;
                Ok(ChatCreation::Created(chat))
            }
            CreateChatOutcome::DuplicateDirect(existing) => {
                tracing::info!(chat_id = %existing, "成员对已有私聊，不再新建");
                Ok(ChatCreation::Exists(existing))
            }
        }
    }

    /// 重命名聊天并向成员推送新的聊天列表快照。
    pub async fn rename_chat(&self, request: RenameChatRequest) -> Result<Chat, ApplicationError> {
        let _guard = self.deps.chat_locks.acquire(request.chat_id).await;

        let mut chat = self
            .deps
            .chat_repository
            .find_by_id(request.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        chat.rename(request.new_name)?;
        let updated = self.deps.chat_repository.update(chat).await?;

        tracing::info!(chat_id = %updated.id, name = %updated.name, "聊天已重命名");
        self.refresh_chat_lists(&updated.members).await?;
        Ok(updated)
    }

    /// 删除聊天，级联清掉整段历史和未到期的定时条目，再用删除前
    /// 的成员集通知各成员刷新列表。
    pub async fn delete_chat(&self, request: DeleteChatRequest) -> Result<(), ApplicationError> {
        let guard = self.deps.chat_locks.acquire(request.chat_id).await;

        let removed = self
            .deps
            .chat_repository
            .remove(request.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        self.deps
            .message_repository
            .remove_chat(request.chat_id)
            .await?;
        self.deps
            .scheduled_repository
            .remove_chat(request.chat_id)
            .await?;

        tracing::info!(chat_id = %request.chat_id, "聊天与其消息已删除");
        self.refresh_chat_lists(&removed.members).await?;

        drop(guard);
        self.deps.chat_locks.discard(&request.chat_id).await;
        Ok(())
    }

    /// 某用户可见的聊天列表。
    pub async fn chats_for(&self, user_id: &UserId) -> Result<Vec<Chat>, ApplicationError> {
        Ok(self.deps.chat_repository.list_for_member(user_id).await?)
    }

    /// 给每个受影响成员推送按其成员身份过滤后的聊天快照。
    async fn refresh_chat_lists(&self, members: &BTreeSet<UserId>) -> Result<(), ApplicationError> {
        for member in members {
            let chats = self.deps.chat_repository.list_for_member(member).await?;
            let recipient = BTreeSet::from([member.clone()]);
            self.deps
                .broadcaster
                .notify(&recipient, ServerEvent::UpdateChats { chats })
                .await?;
        }
        Ok(())
    }
}
