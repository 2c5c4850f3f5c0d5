//! 通用枚举模块。
//!
//! 本模块定义了在 `PatrolPlatform` 项目中多个组件之间共享的通用枚举类型。
//! 这些枚举旨在提供类型安全，并确保对于如链路质量、告警级别等概念
//! 在整个系统中有一致的表示。
//!
//! 其中与线上协议相关的枚举（如 `CameraQuality`、`MoveDirection`）通过
//! `#[serde(rename)]` 与 JSON 线上格式中使用的字符串保持一致。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 表示 WebSocket 链路的粗粒度质量分级。
///
/// 分级依据心跳 Ping/Pong 往返时延 (RTT)：RTT 越低，质量越高。
/// 边界值 (50/100/200 毫秒) 归入时延更低的一档。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    /// 优：RTT ≤ 50 毫秒。
    Excellent,
    /// 良：RTT ≤ 100 毫秒。
    Good,
    /// 中：RTT ≤ 200 毫秒。
    Fair,
    /// 差：RTT > 200 毫秒。
    Poor,
}

impl ConnectionQuality {
    /// 返回该质量分级在线上协议及日志中使用的小写字符串表示。
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionQuality::Excellent => "excellent",
            ConnectionQuality::Good => "good",
            ConnectionQuality::Fair => "fair",
            ConnectionQuality::Poor => "poor",
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 表示连接管理器的链路生命周期状态。
///
/// 状态机：`Idle → Connecting → Open → Closing → Closed`，
/// 另有 `Reconnecting` 子状态，表示已断开且正在等待下一次自动重连。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 初始状态，从未发起过连接。
    Idle,
    /// 正在建立 WebSocket 连接。
    Connecting,
    /// 连接已建立，可以收发消息。
    Open,
    /// 用户主动断开，正在关闭连接。
    Closing,
    /// 连接已关闭（被动断开或主动断开后的终态）。
    Closed,
    /// 连接已断开，等待自动重连计时器触发。
    Reconnecting,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 告警级别。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// 一般信息。
    Info,
    /// 警告（例如连接丢失）。
    Warning,
    /// 错误（例如紧急停止）。
    Error,
    /// 成功提示。
    Success,
}

/// 历史记录条目的分类。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryCategory {
    /// 移动相关操作。
    Movement,
    /// 告警相关事件。
    Alert,
    /// 系统级事件（模式切换、录制开关等）。
    System,
    /// 巡逻任务相关事件。
    Patrol,
}

/// 摄像头画质档位。
///
/// 线上格式使用 `"480p"` / `"720p"` / `"1080p"` 字符串。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraQuality {
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Fhd1080,
}

/// 摄像头成像模式。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// 常规模式。
    Normal,
    /// 夜视模式。
    Night,
    /// 热成像模式。
    Thermal,
}

/// 移动指令的方向。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

/// 旋转指令的方向。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    #[serde(rename = "clockwise")]
    Clockwise,
    #[serde(rename = "counter-clockwise")]
    CounterClockwise,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 测试与线上协议相关的枚举是否序列化为约定的字符串。
    fn test_wire_enum_string_representation() {
        assert_eq!(
            serde_json::to_string(&CameraQuality::Hd720).unwrap(),
            "\"720p\""
        );
        assert_eq!(
            serde_json::to_string(&CameraMode::Night).unwrap(),
            "\"night\""
        );
        assert_eq!(
            serde_json::to_string(&MoveDirection::Forward).unwrap(),
            "\"forward\""
        );
        assert_eq!(
            serde_json::to_string(&RotateDirection::CounterClockwise).unwrap(),
            "\"counter-clockwise\""
        );
        assert_eq!(
            serde_json::to_string(&AlertSeverity::Warning).unwrap(),
            "\"warning\""
        );
        assert_eq!(
            serde_json::to_string(&HistoryCategory::Movement).unwrap(),
            "\"movement\""
        );
    }

    #[test]
    /// 测试 `ConnectionQuality` 的字符串表示与反序列化往返。
    fn test_connection_quality_roundtrip() {
        assert_eq!(ConnectionQuality::Excellent.as_str(), "excellent");
        let parsed: ConnectionQuality = serde_json::from_str("\"poor\"").unwrap();
        assert_eq!(parsed, ConnectionQuality::Poor);
    }
}
