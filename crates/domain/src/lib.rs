//! classchat 核心领域模型。
//!
//! 包含用户、聊天、消息、定时消息等核心实体，以及消息所有权、
//! 私聊去重等同步规则。
pub mod chat;
pub mod errors;
pub mod message;
pub mod scheduled_message;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat::{Chat, ChatKind};
pub use errors::{DomainError, RepositoryError};
pub use message::{Message, SCHEDULED_PLACEHOLDER_TEXT};
pub use scheduled_message::ScheduledMessage;
pub use user::User;
pub use value_objects::{ChatId, MessageId, ScheduledMessageId, Timestamp, UserId};
