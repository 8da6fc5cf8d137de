//! 主应用程序入口
//!
//! 装配内存存储、静态名册与会话扇出，预置班级数据，然后启动
//! 定时投递扫描任务和 Axum Web API 服务。

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use application::{
    ChatLocks, ChatRepository, ChatService, ChatServiceDependencies, Clock, CreateChatOutcome,
    Directory, EventBroadcaster, MessageService, MessageServiceDependencies, Scheduler,
    SchedulerDependencies, SystemClock,
};
use config::AppConfig;
use domain::{Chat, ChatId, ChatKind, UserId};
use infrastructure::{
    InMemoryChatRepository, InMemoryMessageRepository, InMemoryScheduledRepository,
    SessionBroadcaster, SessionRegistry, StaticDirectory,
};
use web_api::{router, AppState};

/// 预置群聊的名称，启动时不存在则创建。
const DEFAULT_CHAT_NAME: &str = "General Class";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 读取配置；日志过滤的缺省值来自配置，因此先加载
    let config = AppConfig::load()?;

    // 初始化日志，RUST_LOG 优先于配置里的过滤指令
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    // 装配存储与适配器
    let chat_repository = Arc::new(InMemoryChatRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let scheduled_repository = Arc::new(InMemoryScheduledRepository::new());
    let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::class_roster());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sessions = Arc::new(SessionRegistry::new());
    let broadcaster: Arc<dyn EventBroadcaster> =
        Arc::new(SessionBroadcaster::new(sessions.clone()));
    let chat_locks = Arc::new(ChatLocks::new());

    seed_default_chat(chat_repository.as_ref(), directory.as_ref(), clock.as_ref()).await?;

    // 创建应用层服务
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        chat_repository: chat_repository.clone(),
        message_repository: message_repository.clone(),
        scheduled_repository: scheduled_repository.clone(),
        clock: clock.clone(),
        broadcaster: broadcaster.clone(),
        chat_locks: chat_locks.clone(),
    }));

    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        chat_repository: chat_repository.clone(),
        message_repository: message_repository.clone(),
        clock: clock.clone(),
        broadcaster: broadcaster.clone(),
        chat_locks: chat_locks.clone(),
    }));

    let scheduler = Arc::new(Scheduler::new(SchedulerDependencies {
        chat_repository,
        message_repository,
        scheduled_repository,
        clock,
        broadcaster,
        chat_locks,
    }));

    // 启动定时投递扫描任务
    let sweep_interval = Duration::from_millis(config.scheduler.sweep_interval_ms);
    tokio::spawn(scheduler.clone().run(sweep_interval));
    tracing::info!(interval_ms = config.scheduler.sweep_interval_ms, "定时投递扫描已启动");

    // 启动 Web 服务器
    let state = AppState::new(directory, chat_service, message_service, scheduler, sessions);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    tracing::info!("classchat 服务器启动在 http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// 预置包含全部名册成员的班级群聊。已存在同名聊天时跳过，
/// 换用持久后端重启进程不会重复建群。
async fn seed_default_chat(
    chat_repository: &dyn ChatRepository,
    directory: &dyn Directory,
    clock: &dyn Clock,
) -> anyhow::Result<()> {
    let existing = chat_repository.list_all().await?;
    if existing.iter().any(|chat| chat.name == DEFAULT_CHAT_NAME) {
        tracing::info!("预置班级群聊已存在，跳过");
        return Ok(());
    }

    let roster = directory.list_users().await?;
    let members: BTreeSet<UserId> = roster.iter().map(|user| user.id.clone()).collect();
    let Some(creator) = members.first().cloned() else {
        tracing::warn!("名册为空，跳过预置班级群聊");
        return Ok(());
    };

    let chat = Chat::new(
        ChatId::from(Uuid::new_v4()),
        DEFAULT_CHAT_NAME,
        ChatKind::Group,
        members,
        creator,
        clock.now(),
    )?;
    if let CreateChatOutcome::Created(chat) = chat_repository.insert(chat).await? {
        tracing::info!(chat_id = %chat.id, "预置班级群聊已创建");
    }
    Ok(())
}
