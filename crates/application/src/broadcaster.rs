//! 事件扇出端口。

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use domain::{Chat, ChatId, Message, User, UserId};

/// 推送给客户端的事件。变体名经 snake_case 转换后即线上的
/// 事件名，字段按 camelCase 序列化。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    LoginSuccess { user: User },
    LoginFail,
    UserList { users: Vec<User> },
    UpdateChats { chats: Vec<Chat> },
    HistoryData { chat_id: ChatId, messages: Vec<Message> },
    NewMsg { chat_id: ChatId, message: Message },
    ChatExists { chat_id: ChatId },
    MsgEdited { chat_id: ChatId, message: Message },
    MsgDeleted { chat_id: ChatId, message: Message },
    Error { code: &'static str, message: String },
}

/// 广播失败。
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("事件广播失败: {reason}")]
    Failed { reason: String },
}

impl BroadcastError {
    pub fn failed(reason: impl Into<String>) -> Self {
        BroadcastError::Failed {
            reason: reason.into(),
        }
    }
}

/// 按成员集合扇出事件的能力。
///
/// 只投递给集合中当前在线的用户，不在线的成员被静默跳过，没有
/// 离线队列；每个在线会话对同一事件至多收到一次。
#[async_trait]
pub trait EventBroadcaster: Send + Sync {
    async fn notify(
        &self,
        recipients: &BTreeSet<UserId>,
        event: ServerEvent,
    ) -> Result<(), BroadcastError>;
}
