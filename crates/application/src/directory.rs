//! 用户名册目录。

use async_trait::async_trait;

use domain::{RepositoryError, User};

/// 登录码到用户身份的解析能力。
///
/// 纯查询、无副作用：未知登录码返回 `None`，不产生任何用户记录，
/// 是否据此建立会话由网关层决定。
#[async_trait]
pub trait Directory: Send + Sync {
    /// 按登录码查找用户。
    async fn resolve(&self, code: &str) -> Result<Option<User>, RepositoryError>;

    /// 全量名册，登录成功后随初始快照下发。
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;
}
