//! `patrol_console` 巡逻机器人操作台核心库。
//!
//! 本 crate 实现操作台与远程巡逻机器人之间的连接/会话管理层，
//! 以及由它供数据的中央状态存储。上层表现层（页面、表单、视图）
//! 只通过两种方式与本核心交互：
//! (a) 读取状态存储当前持有的内容并订阅其变更事件；
//! (b) 调用指令 API 下发控制意图。
//!
//! 主要模块：
//! - `ws_client`: WebSocket 链路服务 (`RobotLinkService`，连接、心跳、
//!   自动重连) 与消息路由器 (`MessageRouter`)。
//! - `commands`: 类型化指令门面 (`RobotCommander`)。
//! - `store`: 机器人状态存储 (`RobotStore`) 与持久化适配器 (`SnapshotStore`)。
//! - `event`: 状态存储对外广播的变更事件定义。
//! - `config`: 链路配置 (`LinkConfig`) 及其加载/保存。
//!
//! 数据流：链路服务收到原始帧 → 信封解码 → 路由分发 → 内建处理器写入
//! 状态存储或更新链路质量指标 → UI 观察存储。出站方向：UI 调用指令
//! API → 编码为信封 → 链路打开时发送，否则返回失败。

pub mod commands;
pub mod config;
pub mod event;
pub mod store;
pub mod ws_client;

pub use commands::RobotCommander;
pub use config::LinkConfig;
pub use event::StoreEvent;
pub use store::persistence::{PersistedSnapshot, SnapshotStore};
pub use store::robot_store::RobotStore;
pub use ws_client::router::{InboundMessage, MessageRouter, RouterEnvelope, Subscription};
pub use ws_client::service::RobotLinkService;
