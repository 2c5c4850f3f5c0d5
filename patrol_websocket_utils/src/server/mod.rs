//! WebSocket 服务端相关功能模块。

pub mod transport;
