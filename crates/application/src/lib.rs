//! classchat 应用层。
//!
//! 围绕领域模型提供用例服务：聊天生命周期、消息所有权规则、
//! 定时投递扫描，以及对外部适配器（名册目录、存储、扇出广播）
//! 的抽象接口。具体适配器由 infrastructure 提供。

pub mod broadcaster;
pub mod clock;
pub mod directory;
pub mod error;
pub mod locks;
pub mod repository;
pub mod services;

pub use broadcaster::{BroadcastError, EventBroadcaster, ServerEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::Directory;
pub use error::ApplicationError;
pub use locks::ChatLocks;
pub use repository::{ChatRepository, CreateChatOutcome, MessageRepository, ScheduledRepository};
pub use services::{
    ChatCreation, ChatService, ChatServiceDependencies, CreateChatRequest, DeleteChatRequest,
    DeleteMessageRequest, EditMessageRequest, MessageService, MessageServiceDependencies,
    RenameChatRequest, ScheduleMessageRequest, Scheduler, SchedulerDependencies,
    SendMessageRequest,
};
