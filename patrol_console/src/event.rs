//! 操作台状态存储事件定义模块。
//!
//! 本模块集中定义了状态存储 (`RobotStore`) 对外广播的所有变更事件。
//! 表现层通过 `RobotStore::subscribe` 获得一个 `tokio::sync::broadcast`
//! 接收端，监听这些事件以实时刷新界面；副作用（告警、历史记录的产生）
//! 也通过事件显式可观察，而不是隐藏在字段赋值里。

use patrol_models::{Alert, HistoryItem};

/// 状态存储的变更事件。
///
/// 每当某个动作方法修改了存储内容，就会广播对应的事件。
/// 携带负载的事件（告警、历史）直接附带新建的条目，
/// 其余事件只作为"该区域已变化"的信号，订阅方自行读取最新快照。
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// 与机器人的连接状态发生变化。
    ConnectionChanged { connected: bool },
    /// 一批遥测数据已合并进机器人状态。
    TelemetryUpdated,
    /// 机器人状态被部分更新（非遥测通道）。
    StatusUpdated,
    /// 操控意图状态（摇杆、旋转、速度、模式开关）发生变化。
    ControlChanged,
    /// 摄像头设置发生变化。
    CameraSettingsChanged,
    /// 新增了一条告警。
    AlertAdded(Alert),
    /// 新增了一条历史记录。
    HistoryAdded(HistoryItem),
    /// 应用设置被更新。
    SettingsUpdated,
    /// 应用设置被重置为默认值。
    SettingsReset,
    /// 触发了紧急停止（本地副作用已生效）。
    EmergencyStopTriggered,
}
