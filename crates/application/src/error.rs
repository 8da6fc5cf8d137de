//! 应用层错误定义。

use thiserror::Error;

use domain::{DomainError, RepositoryError};

use crate::broadcaster::BroadcastError;

/// 用例执行失败的统一出口，网关层据此决定回给客户端什么事件。
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("领域规则错误: {0}")]
    Domain(#[from] DomainError),

    #[error("存储错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("广播错误: {0}")]
    Broadcast(#[from] BroadcastError),
}
