use thiserror::Error;

/// 领域规则错误。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("参数无效 {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("聊天不存在")]
    ChatNotFound,

    #[error("消息不存在")]
    MessageNotFound,

    /// 只有消息发送者本人可以编辑或删除消息，与聊天成员身份无关。
    #[error("只有发送者可以修改该消息")]
    NotMessageSender,

    #[error("操作不被允许")]
    OperationNotAllowed,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误，由各仓储实现映射为统一形态。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("记录不存在")]
    NotFound,

    #[error("记录冲突")]
    Conflict,

    #[error("存储失败: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        RepositoryError::Storage {
            message: message.into(),
        }
    }
}
