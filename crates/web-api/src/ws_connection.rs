use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use application::{
    ApplicationError, ChatCreation, CreateChatRequest, DeleteChatRequest, DeleteMessageRequest,
    EditMessageRequest, RenameChatRequest, ScheduleMessageRequest, SendMessageRequest,
    ServerEvent,
};
use domain::User;
use infrastructure::SessionHandle;

use crate::error::{codes, error_event};
use crate::protocol::ClientCommand;
use crate::state::AppState;

/// WebSocket 连接管理器
///
/// 封装单个连接的全部状态和逻辑，包括：
/// - 命令帧的解析与分发
/// - 登录会话的登记与注销
/// - 服务广播事件的写回
/// - 断开时的资源清理
pub struct WebSocketConnection {
    socket: Option<WebSocket>,
    state: AppState,
}

/// 登录后的连接状态。
struct ActiveSession {
    user: User,
    handle: SessionHandle,
}

/// WebSocket 写操作命令
///
/// 所有对套接字的写出都经由这个命令通道串行化。
#[derive(Debug)]
enum WsCommand {
    SendText(String),
    SendPong(Vec<u8>),
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState) -> Self {
        Self {
            socket: Some(socket),
            state,
        }
    }

    /// 运行连接的主循环。
    ///
    /// 发送任务独占套接字的写端；接收循环持有会话状态并分发
    /// 命令；登录后另起一个转发任务把会话事件灌进命令通道。
    pub async fn run(mut self) {
        let socket = self.socket.take().expect("socket already taken");
        let (mut sender, mut incoming) = socket.split();

        tracing::info!("WebSocket 连接已建立");

        // 创建 mpsc channel 来解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let send_task = tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let outcome = match cmd {
                    WsCommand::SendText(text) => sender.send(WsMessage::Text(text.into())).await,
                    WsCommand::SendPong(data) => sender.send(WsMessage::Pong(data.into())).await,
                };
                if outcome.is_err() {
                    tracing::debug!("套接字写出失败，发送任务结束");
                    break;
                }
            }
        });

        // 接收循环：解析客户端帧并分发
        let mut session: Option<ActiveSession> = None;
        while let Some(Ok(message)) = incoming.next().await {
            if Self::handle_incoming(&self.state, &cmd_tx, &mut session, message)
                .await
                .is_err()
            {
                break;
            }
        }

        // 连接断开时注销会话
        if let Some(active) = session.take() {
            self.state.sessions.unregister(&active.handle).await;
            let online = self.state.sessions.online_count().await;
            tracing::info!(user_id = %active.handle.user_id(), online, "用户已离线");
        }

        drop(cmd_tx);
        let _ = send_task.await;
        tracing::info!("WebSocket 连接已断开");
    }

    /// 处理来自客户端的一帧。
    async fn handle_incoming(
        state: &AppState,
        cmd_tx: &mpsc::Sender<WsCommand>,
        session: &mut Option<ActiveSession>,
        message: WsMessage,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => {
                tracing::info!("收到关闭帧");
                Err(())
            }
            WsMessage::Ping(data) => cmd_tx
                .send(WsCommand::SendPong(data.to_vec()))
                .await
                .map_err(|_| ()),
            WsMessage::Pong(_) => Ok(()),
            WsMessage::Binary(_) => {
                tracing::debug!("忽略二进制帧");
                Ok(())
            }
            WsMessage::Text(text) => {
                let command = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => command,
                    Err(err) => {
                        tracing::debug!(error = %err, "无法解析的命令帧");
                        return Self::send_event(
                            cmd_tx,
                            &ServerEvent::Error {
                                code: codes::INVALID_ARGUMENT,
                                message: "malformed command".to_string(),
                            },
                        )
                        .await;
                    }
                };
                Self::handle_command(state, cmd_tx, session, command).await
            }
        }
    }

    /// 分发一条命令。除 login 外的命令都要求已登录。
    async fn handle_command(
        state: &AppState,
        cmd_tx: &mpsc::Sender<WsCommand>,
        session: &mut Option<ActiveSession>,
        command: ClientCommand,
    ) -> Result<(), ()> {
        // login 是唯一不要求会话的命令
        let command = match command {
            ClientCommand::Login { code } => {
                return Self::handle_login(state, cmd_tx, session, code).await;
            }
            command => command,
        };

        let Some(active) = session.as_ref() else {
            return Self::send_event(
                cmd_tx,
                &ServerEvent::Error {
                    code: codes::UNAUTHENTICATED,
                    message: "login required".to_string(),
                },
            )
            .await;
        };
        let user = active.user.clone();

        match command {
            ClientCommand::Login { .. } => unreachable!("login handled above"),
            ClientCommand::GetMessages { chat_id } => {
                match state.message_service.history(chat_id).await {
                    Ok(messages) => {
                        Self::send_event(
                            cmd_tx,
                            &ServerEvent::HistoryData { chat_id, messages },
                        )
                        .await
                    }
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::SendMsg {
                chat_id,
                text,
                attachment,
            } => {
                let request = SendMessageRequest {
                    chat_id,
                    sender: user,
                    text,
                    attachment,
                };
                match state.message_service.send_message(request).await {
                    Ok(_) => Ok(()),
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::ScheduleMsg {
                chat_id,
                text,
                delay_ms,
            } => {
                let request = ScheduleMessageRequest {
                    chat_id,
                    sender: user,
                    text,
                    delay_ms,
                };
                match state.scheduler.schedule(request).await {
                    Ok(_) => Ok(()),
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::CreateChat {
                name,
                kind,
                members,
            } => {
                let request = CreateChatRequest {
                    actor: user.id,
                    name,
                    kind,
                    members,
                };
                match state.chat_service.create_chat(request).await {
                    // 新建成功时成员列表快照由服务扇出，这里无需回帧
                    Ok(ChatCreation::Created(_)) => Ok(()),
                    Ok(ChatCreation::Exists(chat_id)) => {
                        Self::send_event(cmd_tx, &ServerEvent::ChatExists { chat_id }).await
                    }
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::RenameChat { chat_id, new_name } => {
                let request = RenameChatRequest { chat_id, new_name };
                match state.chat_service.rename_chat(request).await {
                    Ok(_) => Ok(()),
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::DeleteChat { chat_id } => {
                let request = DeleteChatRequest { chat_id };
                match state.chat_service.delete_chat(request).await {
                    Ok(()) => Ok(()),
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::EditMsg {
                chat_id,
                message_id,
                new_text,
            } => {
                let request = EditMessageRequest {
                    chat_id,
                    message_id,
                    actor: user.id,
                    new_text,
                };
                match state.message_service.edit_message(request).await {
                    Ok(_) => Ok(()),
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
            ClientCommand::DeleteMsg {
                chat_id,
                message_id,
            } => {
                let request = DeleteMessageRequest {
                    chat_id,
                    message_id,
                    actor: user.id,
                };
                match state.message_service.delete_message(request).await {
                    Ok(_) => Ok(()),
                    Err(error) => Self::report(cmd_tx, error).await,
                }
            }
        }
    }

    /// 处理登录：解析登录码、登记会话、回放初始快照。
    async fn handle_login(
        state: &AppState,
        cmd_tx: &mpsc::Sender<WsCommand>,
        session: &mut Option<ActiveSession>,
        code: String,
    ) -> Result<(), ()> {
        let resolved = match state.directory.resolve(&code).await {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::error!(error = %error, "名册查询失败");
                return Self::send_event(
                    cmd_tx,
                    &ServerEvent::Error {
                        code: codes::INTERNAL,
                        message: "internal error".to_string(),
                    },
                )
                .await;
            }
        };

        let Some(user) = resolved else {
            tracing::info!("登录码未命中名册");
            return Self::send_event(cmd_tx, &ServerEvent::LoginFail).await;
        };

        // 同一连接换号重登时先注销旧会话
        if let Some(previous) = session.take() {
            state.sessions.unregister(&previous.handle).await;
        }

        let (handle, events) = state.sessions.register(user.id.clone()).await;
        Self::spawn_session_pump(cmd_tx.clone(), events);

        let online = state.sessions.online_count().await;
        tracing::info!(user_id = %user.id, online, "用户已登录");

        Self::send_event(cmd_tx, &ServerEvent::LoginSuccess { user: user.clone() }).await?;

        match state.directory.list_users().await {
            Ok(users) => Self::send_event(cmd_tx, &ServerEvent::UserList { users }).await?,
            Err(error) => tracing::error!(error = %error, "名册查询失败"),
        }

        match state.chat_service.chats_for(&user.id).await {
            Ok(chats) => Self::send_event(cmd_tx, &ServerEvent::UpdateChats { chats }).await?,
            Err(error) => tracing::error!(error = %error, "聊天列表查询失败"),
        }

        *session = Some(ActiveSession { user, handle });
        Ok(())
    }

    /// 把会话事件逐条转发进写命令通道。会话注销后事件通道随之
    /// 关闭，任务自然结束。
    fn spawn_session_pump(
        cmd_tx: mpsc::Sender<WsCommand>,
        mut events: mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "事件序列化失败");
                        continue;
                    }
                };
                if cmd_tx.send(WsCommand::SendText(payload)).await.is_err() {
                    break;
                }
            }
            tracing::debug!("会话事件转发任务结束");
        });
    }

    /// 按错误类别回帧：可恢复的给发起者一个 error 事件，指向已
    /// 消失资源的静默忽略。
    async fn report(
        cmd_tx: &mpsc::Sender<WsCommand>,
        error: ApplicationError,
    ) -> Result<(), ()> {
        match error_event(&error) {
            Some(event) => {
                tracing::warn!(error = %error, "命令执行失败");
                Self::send_event(cmd_tx, &event).await
            }
            None => {
                tracing::debug!(error = %error, "指向已消失资源的命令被忽略");
                Ok(())
            }
        }
    }

    /// 给本连接回一个事件帧。
    async fn send_event(
        cmd_tx: &mpsc::Sender<WsCommand>,
        event: &ServerEvent,
    ) -> Result<(), ()> {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "事件序列化失败");
                return Ok(());
            }
        };
        cmd_tx
            .send(WsCommand::SendText(payload))
            .await
            .map_err(|_| ())
    }
}
