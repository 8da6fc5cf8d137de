//! 会话注册表与事件扇出。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use application::broadcaster::{BroadcastError, EventBroadcaster, ServerEvent};
use domain::UserId;

/// 按用户分组的会话通道注册表。
///
/// 同一用户可以同时持有多个会话（例如多个标签页），扇出事件
/// 会送达该用户的每个在线会话。注册表只回答「谁在线」，事件的
/// 编码与套接字写出都在网关层。
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<UserId, HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>>>,
}

/// 一次登录会话的句柄，连接收尾时用它注销。
pub struct SessionHandle {
    user_id: UserId,
    session_id: Uuid,
}

impl SessionHandle {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个新会话，返回句柄与该会话的事件接收端。同一用户
    /// 的既有会话不受影响。
    pub async fn register(
        &self,
        user_id: UserId,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        let handle = SessionHandle {
            user_id: user_id.clone(),
            session_id,
        };
        self.sessions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(session_id, sender);
        (handle, receiver)
    }

    /// 注销句柄指向的那一个会话。该用户的其他会话保持在线。
    pub async fn unregister(&self, handle: &SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if let Some(channels) = sessions.get_mut(&handle.user_id) {
            channels.remove(&handle.session_id);
            if channels.is_empty() {
                sessions.remove(&handle.user_id);
            }
        }
    }

    /// 至少有一个在线会话的用户数。
    pub async fn online_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// 通过会话注册表扇出事件。
///
/// 不在线的收件人被静默跳过；发送失败说明通道已经关闭，顺手
/// 摘掉过期会话。
pub struct SessionBroadcaster {
    registry: Arc<SessionRegistry>,
}

impl SessionBroadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EventBroadcaster for SessionBroadcaster {
    async fn notify(
        &self,
        recipients: &BTreeSet<UserId>,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        let mut stale: Vec<(UserId, Uuid)> = Vec::new();
        {
            let sessions = self.registry.sessions.read().await;
            for user_id in recipients {
                let Some(channels) = sessions.get(user_id) else {
                    continue;
                };
                for (session_id, sender) in channels {
                    if sender.send(event.clone()).is_err() {
                        stale.push((user_id.clone(), *session_id));
                    }
                }
            }
        }

        if !stale.is_empty() {
            let mut sessions = self.registry.sessions.write().await;
            for (user_id, session_id) in stale {
                // 会话标识不会复用，按标识摘除不会误伤期间新建的会话
                if let Some(channels) = sessions.get_mut(&user_id) {
                    tracing::debug!(user_id = %user_id, session_id = %session_id, "会话通道已关闭，移除过期会话");
                    channels.remove(&session_id);
                    if channels.is_empty() {
                        sessions.remove(&user_id);
                    }
                }
            }
        }
        Ok(())
    }
}
