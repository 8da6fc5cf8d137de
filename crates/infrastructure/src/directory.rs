//! 静态名册目录。

use std::collections::HashMap;

use async_trait::async_trait;

use application::directory::Directory;
use domain::{RepositoryError, User};

/// 启动时装载、运行期只读的用户名册。
///
/// 登录码同时就是用户标识，名册之外的登录码一律解析为 `None`，
/// 不会凭空产生用户记录。
pub struct StaticDirectory {
    users: HashMap<String, User>,
}

impl StaticDirectory {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.id.as_str().to_owned(), user))
                .collect(),
        }
    }

    /// 预置的班级名册。
    pub fn class_roster() -> Self {
        Self::new([
            User::new("Vinden4554", "Matteus Aydin"),
            User::new("6767", "Andrej Petrov"),
            User::new("1234", "Felix Nydén Leander"),
        ])
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn resolve(&self, code: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(code).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}
