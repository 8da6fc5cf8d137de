use crate::errors::DomainError;
use crate::value_objects::{ChatId, MessageId, Timestamp, UserId};

/// 定时发送确认占位消息的正文，占位消息与之后真正投递的消息长期共存。
pub const SCHEDULED_PLACEHOLDER_TEXT: &str = "Scheduled message pending delivery";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub attachment: Option<String>,
    pub created_at: Timestamp,
    pub edited: bool,
    pub deleted: bool,
    pub is_placeholder: bool,
}

impl Message {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        attachment: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            chat_id,
            sender_id,
            sender_name: sender_name.into(),
            text: text.into(),
            attachment,
            created_at,
            edited: false,
            deleted: false,
            is_placeholder: false,
        }
    }

    /// 定时发送的确认占位条目，正文为固定提示文案。
    pub fn placeholder(
        id: MessageId,
        chat_id: ChatId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        let mut message = Self::new(
            id,
            chat_id,
            sender_id,
            sender_name,
            SCHEDULED_PLACEHOLDER_TEXT,
            None,
            created_at,
        );
        message.is_placeholder = true;
        message
    }

    pub fn edit(&mut self, new_text: impl Into<String>) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::OperationNotAllowed);
        }
        self.text = new_text.into();
        self.edited = true;
        Ok(())
    }

    /// 软删除：清空正文与附件，保留条目本身以维持历史顺序。
    pub fn soft_delete(&mut self) {
        self.text.clear();
        self.attachment = None;
        self.deleted = true;
    }
}
