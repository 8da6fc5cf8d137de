//! 聊天粒度的串行化锁。

use std::collections::HashMap;
use std::sync::Arc;

use domain::ChatId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 按聊天串行化「变更 + 广播」单元的锁表。
///
/// 同一聊天里命令处理与定时提升互不交错，广播顺序因此与存储
/// 顺序一致；不同聊天之间不做全局串行化。外层锁表只在取锁的
/// 瞬间短暂持有。
#[derive(Default)]
pub struct ChatLocks {
    locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得某个聊天的锁，guard 存活期间该聊天的其他操作排队等待。
    pub async fn acquire(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// 聊天删除后回收锁条目。仍持有旧 guard 的操作不受影响。
    pub async fn discard(&self, chat_id: &ChatId) {
        self.locks.lock().await.remove(chat_id);
    }
}
