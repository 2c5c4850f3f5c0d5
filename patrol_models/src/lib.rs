//! `patrol_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了 `PatrolPlatform` 项目各个 Rust 组件（如 `patrol_console`
//! 操作台核心库、`robotsim` 机器人模拟服务器）之间共享的核心数据结构和枚举类型。
//!
//! 主要包含以下类型的模型：
//! - **机器人状态 (`robot_state`)**: 机器人实时状态、操控状态、摄像头设置、
//!   告警、历史记录以及应用设置等结构体。
//! - **WebSocket 消息负载 (`ws_payloads`)**: 操作台与机器人之间通过 WebSocket
//!   通信时传输的各类消息的 Payload 结构体，例如遥测、控制指令、Ping/Pong 等。
//! - **通用枚举 (`enums`)**: 定义了项目中广泛使用的枚举类型，如链路质量
//!   (`ConnectionQuality`)、告警级别 (`AlertSeverity`) 等，以保证类型安全和一致性。
//!
//! 设计原则：
//! - **共享性**: 所有在此 crate 中定义的模型都旨在被多个其他 crate 共享使用。
//! - **序列化/反序列化**: 所有模型（结构体和枚举）都必须派生 `serde::Serialize`
//!   和 `serde::Deserialize` traits，以便能够轻松地在 JSON 等格式之间进行转换，
//!   这对于网络通信和持久化至关重要。
//! - **可调试性与克隆**: 所有模型也必须派生 `Debug` 和 `Clone` traits，
//!   以方便调试输出和创建副本。

pub mod enums;
pub mod robot_state;
pub mod ws_payloads;

pub use enums::{
    AlertSeverity, CameraMode, CameraQuality, ConnectionQuality, HistoryCategory, LinkState,
    MoveDirection, RotateDirection,
};
pub use robot_state::{
    Alert, AppSettings, CameraSettings, ControlState, HistoryItem, MotorHealth, MotorPowers,
    Position, ProximitySensors, RobotStatus, SettingsPatch,
};
