//! 定时消息的登记与扫描投递。

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use domain::{ChatId, DomainError, Message, MessageId, ScheduledMessage, ScheduledMessageId, User};

use crate::broadcaster::{EventBroadcaster, ServerEvent};
use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::locks::ChatLocks;
use crate::repository::{ChatRepository, MessageRepository, ScheduledRepository};

/// 定时消息请求。delay_ms 为相对当前时刻的毫秒延迟。
#[derive(Debug, Clone)]
pub struct ScheduleMessageRequest {
    pub chat_id: ChatId,
    pub sender: User,
    pub text: String,
    pub delay_ms: i64,
}

/// Scheduler 的依赖集合。
pub struct SchedulerDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub scheduled_repository: Arc<dyn ScheduledRepository>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub chat_locks: Arc<ChatLocks>,
}

/// 定时投递：登记时立即落一条占位消息，到期扫描把正文作为新
/// 消息追加。占位消息永久保留，不会被提升替换。
pub struct Scheduler {
    deps: SchedulerDependencies,
}

impl Scheduler {
    pub fn new(deps: SchedulerDependencies) -> Self {
        Self { deps }
    }

    /// 登记定时消息。先追加并广播占位消息，再写入待投递条目，
    /// 到期时刻取登记时刻加上延迟。
    pub async fn schedule(
        &self,
        request: ScheduleMessageRequest,
    ) -> Result<Message, ApplicationError> {
        if request.delay_ms < 0 {
            return Err(
                DomainError::invalid_argument("delayMs", "must not be negative").into(),
            );
        }

        let _guard = self.deps.chat_locks.acquire(request.chat_id).await;

        let chat = self
            .deps
            .chat_repository
            .find_by_id(request.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        let now = self.deps.clock.now();
        // 到期时刻必须先算出来：溢出的延迟在落占位消息之前拒绝，
        // 不留下没有对应条目的占位记录
        let Some(due_at) = now.checked_add_signed(Duration::milliseconds(request.delay_ms))
        else {
            return Err(
                DomainError::invalid_argument("delayMs", "overflows the clock").into(),
            );
        };

        let placeholder = Message::placeholder(
            MessageId::from(Uuid::new_v4()),
            chat.id,
            request.sender.id.clone(),
            request.sender.display_name.clone(),
            now,
        );
        let stored = self.deps.message_repository.append(placeholder).await?;

        self.deps
            .broadcaster
            .notify(
                &chat.members,
                ServerEvent::NewMsg {
                    chat_id: chat.id,
                    message: stored.clone(),
                },
            )
            .await?;

        let entry = ScheduledMessage::new(
            ScheduledMessageId::from(Uuid::new_v4()),
            chat.id,
            request.sender.id,
            request.sender.display_name,
            request.text,
            due_at,
        );
        self.deps.scheduled_repository.insert(entry).await?;

        tracing::info!(
            chat_id = %chat.id,
            delay_ms = request.delay_ms,
            "消息已进入定时队列"
        );
        Ok(stored)
    }

    /// 单轮扫描：取出全部到期条目并逐一提升。取出即从待投递集
    /// 移除，因此每个条目至多投递一次；单个条目失败只记日志，
    /// 不影响同轮的其余条目。返回成功提升的条数。
    pub async fn sweep(&self) -> usize {
        let now = self.deps.clock.now();
        let due = match self.deps.scheduled_repository.take_due(now).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!(error = %err, "读取到期定时条目失败");
                return 0;
            }
        };

        let mut promoted = 0;
        for entry in due {
            let entry_id = entry.id;
            match self.promote(entry).await {
                Ok(true) => promoted += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(entry_id = %entry_id, error = %err, "定时条目提升失败");
                }
            }
        }
        promoted
    }

    /// 把一个到期条目提升为普通消息。聊天在等待期间被删除时条目
    /// 被丢弃，返回 Ok(false)。
    async fn promote(&self, entry: ScheduledMessage) -> Result<bool, ApplicationError> {
        let _guard = self.deps.chat_locks.acquire(entry.chat_id).await;

        let Some(chat) = self.deps.chat_repository.find_by_id(entry.chat_id).await? else {
            tracing::warn!(chat_id = %entry.chat_id, "定时条目的聊天已不存在，条目被丢弃");
            return Ok(false);
        };

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            chat.id,
            entry.sender_id,
            entry.sender_name,
            entry.text,
            None,
            self.deps.clock.now(),
        );
        let stored = self.deps.message_repository.append(message).await?;

        self.deps
            .broadcaster
            .notify(
                &chat.members,
                ServerEvent::NewMsg {
                    chat_id: chat.id,
                    message: stored,
                },
            )
            .await?;

        tracing::info!(chat_id = %chat.id, "定时消息已投递");
        Ok(true)
    }

    /// 固定节奏的后台扫描循环。节奏只影响投递的及时性，改动它
    /// 不改变至多一次与占位保留的语义。
    pub async fn run(self: Arc<Self>, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let promoted = self.sweep().await;
            if promoted > 0 {
                tracing::debug!(promoted, "定时扫描完成");
            }
        }
    }
}
