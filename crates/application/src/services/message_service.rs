//! 消息读写服务。

use std::sync::Arc;

use uuid::Uuid;

use domain::{ChatId, DomainError, Message, MessageId, User, UserId};

use crate::broadcaster::{EventBroadcaster, ServerEvent};
use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::locks::ChatLocks;
use crate::repository::{ChatRepository, MessageRepository};

/// 发送消息请求。
#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub sender: User,
    pub text: String,
    pub attachment: Option<String>,
}

/// 编辑消息请求。
#[derive(Debug, Clone)]
pub struct EditMessageRequest {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub actor: UserId,
    pub new_text: String,
}

/// 删除消息请求。
#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub actor: UserId,
}

/// MessageService 的依赖集合。
pub struct MessageServiceDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub chat_locks: Arc<ChatLocks>,
}

/// 消息的追加、历史查询，以及只许发送者本人的编辑与删除。
pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 追加一条消息并广播给聊天成员。追加与广播在聊天锁内完成，
    /// 同一聊天的广播顺序与存储顺序一致。
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let _guard = self.deps.chat_locks.acquire(request.chat_id).await;

        let chat = self
            .deps
            .chat_repository
            .find_by_id(request.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            chat.id,
            request.sender.id.clone(),
            request.sender.display_name.clone(),
            request.text,
            request.attachment,
            self.deps.clock.now(),
        );
        let stored = self.deps.message_repository.append(message).await?;

        tracing::info!(
            chat_id = %chat.id,
            message_id = %stored.id,
            sender_id = %stored.sender_id,
            "消息已追加"
        );

        self.deps
            .broadcaster
            .notify(
                &chat.members,
                ServerEvent::NewMsg {
                    chat_id: chat.id,
                    message: stored.clone(),
                },
            )
            .await?;

        Ok(stored)
    }

    /// 整段历史，升序。未知聊天得到空序列。
    pub async fn history(&self, chat_id: ChatId) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.deps.message_repository.history(chat_id).await?)
    }

    /// 编辑消息正文。只有发送者本人可以编辑，身份按相等比较，
    /// 与聊天成员身份无关；已删除的消息不可编辑。
    pub async fn edit_message(
        &self,
        request: EditMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let _guard = self.deps.chat_locks.acquire(request.chat_id).await;

        let chat = self
            .deps
            .chat_repository
            .find_by_id(request.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        let mut message = self
            .deps
            .message_repository
            .find(request.chat_id, request.message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        if message.sender_id != request.actor {
            return Err(DomainError::NotMessageSender.into());
        }

        message.edit(request.new_text)?;
        let stored = self.deps.message_repository.update(message).await?;

        tracing::info!(chat_id = %chat.id, message_id = %stored.id, "消息已编辑");

        self.deps
            .broadcaster
            .notify(
                &chat.members,
                ServerEvent::MsgEdited {
                    chat_id: chat.id,
                    message: stored.clone(),
                },
            )
            .await?;

        Ok(stored)
    }

    /// 软删除消息。记录原位保留，正文与附件清空并打上删除标记，
    /// 同样只许发送者本人操作。
    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let _guard = self.deps.chat_locks.acquire(request.chat_id).await;

        let chat = self
            .deps
            .chat_repository
            .find_by_id(request.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        let mut message = self
            .deps
            .message_repository
            .find(request.chat_id, request.message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        if message.sender_id != request.actor {
            return Err(DomainError::NotMessageSender.into());
        }

        message.soft_delete();
        let stored = self.deps.message_repository.update(message).await?;

        tracing::info!(chat_id = %chat.id, message_id = %stored.id, "消息已软删除");

        self.deps
            .broadcaster
            .notify(
                &chat.members,
                ServerEvent::MsgDeleted {
                    chat_id: chat.id,
                    message: stored.clone(),
                },
            )
            .await?;

        Ok(stored)
    }
}
