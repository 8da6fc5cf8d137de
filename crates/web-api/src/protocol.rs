//! 客户端命令的线格式。

use serde::Deserialize;

use domain::{ChatId, ChatKind, MessageId, UserId};

/// 客户端发来的命令帧。`type` 字段区分命令，变体名经 snake_case
/// 转换后即线上的命令名，其余字段按 camelCase 解析。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    Login {
        code: String,
    },
    GetMessages {
        chat_id: ChatId,
    },
    SendMsg {
        chat_id: ChatId,
        text: String,
        #[serde(default)]
        attachment: Option<String>,
    },
    ScheduleMsg {
        chat_id: ChatId,
        text: String,
        delay_ms: i64,
    },
    CreateChat {
        name: String,
        kind: ChatKind,
        #[serde(default)]
        members: Vec<UserId>,
    },
    RenameChat {
        chat_id: ChatId,
        new_name: String,
    },
    DeleteChat {
        chat_id: ChatId,
    },
    EditMsg {
        chat_id: ChatId,
        message_id: MessageId,
        new_text: String,
    },
    DeleteMsg {
        chat_id: ChatId,
        message_id: MessageId,
    },
}
