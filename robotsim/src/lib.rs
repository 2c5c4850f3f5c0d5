//! `robotsim` 巡逻机器人模拟服务器库。
//!
//! 在本地端口上模拟一台巡逻机器人的 WebSocket 端点：
//! 周期性推送遥测、应答心跳、接受控制与摄像头指令。
//! 供操作台 (`patrol_console`) 在没有真实机器人时开发与联调使用。

pub mod config;
pub mod session;
pub mod sim;
