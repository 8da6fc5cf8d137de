//! Web API 层。
//!
//! 提供 Axum 路由，把 WebSocket 命令委托给应用层的用例服务，
//! 并把服务广播的事件写回各自的套接字。

mod error;
mod protocol;
mod routes;
mod state;
mod ws_connection;

pub use protocol::ClientCommand;
pub use routes::router;
pub use state::AppState;
