//! WebSocket 客户端相关功能模块。

pub mod transport;
