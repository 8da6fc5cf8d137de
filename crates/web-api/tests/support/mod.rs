//! 集成测试公共装配：全内存后端、预置名册与帧收发辅助。

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use application::{
    ChatLocks, ChatRepository, ChatService, ChatServiceDependencies, Clock, Directory,
    EventBroadcaster, MessageService, MessageServiceDependencies, Scheduler,
    SchedulerDependencies, SystemClock,
};
use domain::{Chat, ChatId, ChatKind, UserId};
use infrastructure::{
    InMemoryChatRepository, InMemoryMessageRepository, InMemoryScheduledRepository,
    SessionBroadcaster, SessionRegistry, StaticDirectory,
};
use web_api::{router, AppState};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 组装一套全内存后端：预置班级名册与 "General Class" 群聊，
/// 并以 50ms 周期启动到期扫描任务。
pub async fn build_router() -> Router {
    let chat_repository = Arc::new(InMemoryChatRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let scheduled_repository = Arc::new(InMemoryScheduledRepository::new());

    // 预置的班级群聊包含全部名册成员
    let members: BTreeSet<UserId> = ["Vinden4554", "6767", "1234"]
        .into_iter()
        .map(UserId::from)
        .collect();
    let seeded = Chat::new(
        ChatId::new(Uuid::new_v4()),
        "General Class",
        ChatKind::Group,
        members,
        UserId::from("Vinden4554"),
        Utc::now(),
    )
    .expect("seed chat");
    chat_repository.insert(seeded).await.expect("seed insert");

    let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::class_roster());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sessions = Arc::new(SessionRegistry::new());
    let broadcaster: Arc<dyn EventBroadcaster> =
        Arc::new(SessionBroadcaster::new(sessions.clone()));
    let chat_locks = Arc::new(ChatLocks::new());

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

    tokio::spawn(scheduler.clone().run(Duration::from_millis(50)));

    let state = AppState::new(directory, chat_service, message_service, scheduler, sessions);
    router(state)
}

/// 建立到 /ws 的连接。
pub async fn connect(addr: std::net::SocketAddr) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("ws connect");
    ws
}

/// 发送一帧 JSON 命令。
pub async fn send_json(ws: &mut WsStream, payload: Value) {
    ws.send(TungsteniteMessage::Text(payload.to_string().into()))
        .await
        .expect("send frame");
}

/// 读取下一帧文本并解析为 JSON。
pub async fn recv_json(ws: &mut WsStream) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout waiting for frame")
        .expect("stream closed")
        .expect("ws error");
    match frame {
        TungsteniteMessage::Text(payload) => serde_json::from_str(&payload).expect("frame json"),
        other => panic!("unexpected frame {other:?}"),
    }
}

/// 跳过无关帧直到读到指定类型的事件。
pub async fn recv_event(ws: &mut WsStream, event_type: &str) -> Value {
    for _ in 0..20 {
        let event = recv_json(ws).await;
        if event["type"] == event_type {
            return event;
        }
    }
    panic!("no {event_type} event within 20 frames");
}

/// 登录并消化初始快照，返回 update_chats 事件。
pub async fn login(ws: &mut WsStream, code: &str) -> Value {
    send_json(ws, json!({"type": "login", "code": code})).await;
    let success = recv_event(ws, "login_success").await;
    assert_eq!(success["user"]["id"], code);
    recv_event(ws, "update_chats").await
}

/// 在 update_chats 快照里按名字找聊天 ID。
pub fn chat_id_by_name(update_chats: &Value, name: &str) -> String {
    update_chats["chats"]
        .as_array()
        .expect("chats array")
        .iter()
        .find(|chat| chat["name"] == name)
        .unwrap_or_else(|| panic!("chat {name} not in snapshot"))["id"]
        .as_str()
        .expect("chat id")
        .to_owned()
}
