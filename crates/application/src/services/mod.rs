//! 用例服务。

mod chat_service;
mod message_service;
mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat_service::{
    ChatCreation, ChatService, ChatServiceDependencies, CreateChatRequest, DeleteChatRequest,
    RenameChatRequest,
};
pub use message_service::{
    DeleteMessageRequest, EditMessageRequest, MessageService, MessageServiceDependencies,
    SendMessageRequest,
};
pub use scheduler::{ScheduleMessageRequest, Scheduler, SchedulerDependencies};
