//! classchat 基础设施适配器。
//!
//! 应用层端口的进程内实现：聊天、消息、定时条目的内存存储，
//! 启动时装载的静态名册，以及基于会话通道的事件扇出。

pub mod directory;
pub mod repository;
pub mod session;

pub use directory::StaticDirectory;
pub use repository::{
    InMemoryChatRepository, InMemoryMessageRepository, InMemoryScheduledRepository,
};
pub use session::{SessionBroadcaster, SessionHandle, SessionRegistry};
