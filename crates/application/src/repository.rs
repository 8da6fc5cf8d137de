//! 存储端口定义。

use async_trait::async_trait;

use domain::{
    Chat, ChatId, Message, MessageId, RepositoryError, ScheduledMessage, Timestamp, UserId,
};

/// 插入聊天的结果。
///
/// 私聊按无序成员对去重：命中既有私聊时不新建，返回既有聊天的
/// 标识，由调用方转成非致命的提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateChatOutcome {
    Created(Chat),
    DuplicateDirect(ChatId),
}

/// 聊天文档的存取。
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// 写入聊天。私聊的成员对查重与写入必须是一个原子步骤，
    /// 并发创建同一对成员的私聊不会产生重复。
    async fn insert(&self, chat: Chat) -> Result<CreateChatOutcome, RepositoryError>;

    /// 覆盖既有聊天，不存在时返回 `RepositoryError::NotFound`。
    async fn update(&self, chat: Chat) -> Result<Chat, RepositoryError>;

    /// 移除聊天并返回被删文档，调用方用其成员集通知删除前的成员。
    async fn remove(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Chat>, RepositoryError>;

    /// 某用户可见的聊天，即成员集包含该用户的全部聊天。
    async fn list_for_member(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError>;
}

/// 消息历史的存取。
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError>;

    /// 按 created_at 升序返回整段历史。未知聊天返回空序列而不是
    /// 错误，查询历史是非致命操作。
    async fn history(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError>;

    async fn find(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Option<Message>, RepositoryError>;

    /// 覆盖既有消息，不存在时返回 `RepositoryError::NotFound`。
    async fn update(&self, message: Message) -> Result<Message, RepositoryError>;

    /// 随聊天删除级联清掉整段历史。
    async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError>;
}

/// 待投递定时条目的存取。
#[async_trait]
pub trait ScheduledRepository: Send + Sync {
    async fn insert(&self, entry: ScheduledMessage) -> Result<ScheduledMessage, RepositoryError>;

    /// 原子地移除并返回所有到期条目。即使扫描重叠，每个条目也
    /// 至多被取出一次，这是投递至多一次的根据。
    async fn take_due(&self, now: Timestamp) -> Result<Vec<ScheduledMessage>, RepositoryError>;

    /// 随聊天删除级联清掉未到期条目。
    async fn remove_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError>;

    async fn count_pending(&self) -> Result<usize, RepositoryError>;
}
