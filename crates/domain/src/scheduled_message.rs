use crate::value_objects::{ChatId, ScheduledMessageId, Timestamp, UserId};

/// 等待到点投递的消息条目。
///
/// 条目只存在到 `due_at <= now` 为止，到点后被原子地提升为正式
/// 消息并从集合中移除，没有取消或编辑路径。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMessage {
    pub id: ScheduledMessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub due_at: Timestamp,
}

impl ScheduledMessage {
    pub fn new(
        id: ScheduledMessageId,
        chat_id: ChatId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        due_at: Timestamp,
    ) -> Self {
        Self {
            id,
            chat_id,
            sender_id,
            sender_name: sender_name.into(),
            text: text.into(),
            due_at,
        }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.due_at <= now
    }
}
