//! `patrol_websocket_utils` 是一个提供 WebSocket 通信实用功能的 Rust Crate。
//!
//! 它为 `PatrolPlatform` 项目的操作台 (`patrol_console`) 与机器人模拟服务器
//! (`robotsim`) 提供统一的消息信封编解码与底层传输能力，特别关注与
//! `patrol_models` 一起使用时的消息处理和序列化/反序列化。
//!
//! 主要模块包括：
//! - `message`: 定义核心消息信封结构 `WsMessage`。
//! - `error`: 定义库中使用的统一错误类型 `WsError`。
//! - `client`: 提供 WebSocket 客户端传输层（连接、收发消息）。
//! - `server`: 提供 WebSocket 服务端传输层（监听、接受连接、收发消息）。

pub mod client;
pub mod error;
pub mod message;
pub mod server;
