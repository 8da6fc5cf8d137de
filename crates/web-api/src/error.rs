//! 用例错误到线上 error 事件的映射。

use application::{ApplicationError, ServerEvent};
use domain::{DomainError, RepositoryError};

/// error 事件里的机器可读码。
pub mod codes {
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const FORBIDDEN: &str = "forbidden";
    pub const INVALID_ARGUMENT: &str = "invalid_argument";
    pub const INTERNAL: &str = "internal";
}

/// 把用例错误翻译成回给发起者的 error 事件。
///
/// 指向不存在聊天或消息的命令是客户端陈旧视图的正常产物，
/// 静默忽略并返回 `None`。
pub fn error_event(error: &ApplicationError) -> Option<ServerEvent> {
    match error {
        ApplicationError::Domain(DomainError::ChatNotFound)
        | ApplicationError::Domain(DomainError::MessageNotFound)
        | ApplicationError::Repository(RepositoryError::NotFound) => None,
        ApplicationError::Domain(DomainError::NotMessageSender) => Some(ServerEvent::Error {
            code: codes::FORBIDDEN,
            message: "not the message sender".to_string(),
        }),
        ApplicationError::Domain(DomainError::OperationNotAllowed) => Some(ServerEvent::Error {
            code: codes::FORBIDDEN,
            message: "operation not allowed".to_string(),
        }),
        ApplicationError::Domain(DomainError::InvalidArgument { field, reason }) => {
            Some(ServerEvent::Error {
                code: codes::INVALID_ARGUMENT,
                message: format!("{}: {}", field, reason),
            })
        }
        ApplicationError::Repository(_) | ApplicationError::Broadcast(_) => {
            Some(ServerEvent::Error {
                code: codes::INTERNAL,
                message: "internal error".to_string(),
            })
        }
    }
}
