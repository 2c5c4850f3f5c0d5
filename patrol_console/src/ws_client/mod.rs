//! WebSocket 链路客户端模块。
//!
//! 包含链路服务 (`service`，连接生命周期、心跳、自动重连) 与
//! 入站消息路由器 (`router`)。

pub mod router;
pub mod service;
