use std::sync::Arc;

use application::{ChatService, Directory, MessageService, Scheduler};
use infrastructure::SessionRegistry;

/// 各连接共享的服务句柄。
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn Directory>,
    pub chat_service: Arc<ChatService>,
    pub message_service: Arc<MessageService>,
    pub scheduler: Arc<Scheduler>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn Directory>,
        chat_service: Arc<ChatService>,
        message_service: Arc<MessageService>,
        scheduler: Arc<Scheduler>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            directory,
            chat_service,
            message_service,
            scheduler,
            sessions,
        }
    }
}
